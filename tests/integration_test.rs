//! End-to-end tests: CSV in, replay, filtered CSV out.
//!
//! Run with:
//! ```bash
//! cargo test --test integration_test
//! ```

use std::fs;
use std::path::Path;

use offer_book_reconstructor::{
    CarryForwardPolicy, CsvSnapshotWriter, CsvSource, EventSource, OutputConfig, PipelineConfig,
    PositionalSink, ReconError, ReconstructionEngine, ReplayConfig, SnapshotColumns,
    WarningCategory,
};

const HEADER: &str = "cusip,order_type,action,price,amount,company_id,identifier,time_stamp,\
firm_time,sharp_time,link_identifier,settlement_date,status,yield";

const ADMIN: [&str; 8] = [
    "action",
    "firm_time",
    "sharp_time",
    "identifier",
    "link_identifier",
    "settlement_date",
    "status",
    "company_id",
];

/// Two contiguous instruments. Rows from counterparty 99: 2, 4, 5, 7, 8.
const ROWS: [&str; 10] = [
    "X,OFFERING,INSERT,101,500,7,Q1,2024-03-01 09:30:00,F,S,L,2024-03-05,A,3.10",
    "X,OFFERING,INSERT,100.5,250,12,Q2,2024-03-01 09:31:00,F,S,L,2024-03-05,A,3.12",
    "X,SALE,,100.75,1000,99,,2024-03-01 09:32:00,F,S,L,2024-03-05,A,3.11",
    "X,OFFERING,DELETE,,,,Q2,2024-03-01 09:33:00,F,S,L,2024-03-05,A,",
    "X,PURCHASE,,101,500,99,,2024-03-01 09:34:00,F,S,L,2024-03-05,A,3.10",
    "Y,PURCHASE,,98,100,99,,2024-03-01 09:35:00,F,S,L,2024-03-05,A,2.90",
    "Y,OFFERING,INSERT,97.5,300,7,Q1,2024-03-01 09:36:00,F,S,L,2024-03-05,A,2.95",
    "Y,SALE,,97.5,300,99,,2024-03-01 09:37:00,F,S,L,2024-03-05,A,2.95",
    "Y,INQUIRY,,,,99,,2024-03-01 09:38:00,F,S,L,2024-03-05,A,",
    "Y,SALE,,97.5,100,42,,2024-03-01 09:39:00,F,S,L,2024-03-05,A,2.95",
];

fn write_input(dir: &Path, rows: &[&str]) -> std::path::PathBuf {
    let path = dir.join("quotes.csv");
    let mut text = String::from(HEADER);
    for row in rows {
        text.push('\n');
        text.push_str(row);
    }
    text.push('\n');
    fs::write(&path, text).unwrap();
    path
}

fn read_output(path: &Path) -> (csv::StringRecord, Vec<csv::StringRecord>) {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let headers = reader.headers().unwrap().clone();
    let rows = reader.records().map(|r| r.unwrap()).collect();
    (headers, rows)
}

fn column(headers: &csv::StringRecord, name: &str) -> usize {
    headers
        .iter()
        .position(|h| h == name)
        .unwrap_or_else(|| panic!("missing column {name}"))
}

// ============================================================================
// Test: Full pipeline
// ============================================================================

#[test]
fn test_csv_pipeline_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), &ROWS);
    let output = dir.path().join("offers.csv");

    let config = PipelineConfig::default();
    let (table, events) = CsvSource::from_path(&input).unwrap().into_parts().unwrap();
    assert_eq!(events.len(), 10);

    let mut engine = ReconstructionEngine::with_config(config.replay.clone());
    let snapshots = engine.replay(&events).unwrap();

    let stats = CsvSnapshotWriter::new(config.output)
        .write_to_path(&table, &snapshots, &output)
        .unwrap();
    assert_eq!(stats.rows_in, 10);
    assert_eq!(stats.rows_written, 5);

    let (headers, rows) = read_output(&output);

    // 6 pass-through columns + 40 snapshot columns, no admin columns
    assert_eq!(headers.len(), 46);
    for admin in ADMIN {
        assert!(!headers.iter().any(|h| h == admin), "{admin} not dropped");
    }
    for name in SnapshotColumns::new(10).names() {
        column(&headers, &name);
    }

    let order_type = column(&headers, "order_type");
    let cusip = column(&headers, "cusip");
    let price1 = column(&headers, "offerprice1");
    let price2 = column(&headers, "offerprice2");
    let size1 = column(&headers, "offersize1");
    let dealer1 = column(&headers, "offerdealer1");
    let time1 = column(&headers, "offertime1");
    let time_stamp = column(&headers, "time_stamp");

    assert_eq!(rows.len(), 5);
    let kinds: Vec<(&str, &str)> = rows
        .iter()
        .map(|r| (&r[cusip], &r[order_type]))
        .collect();
    assert_eq!(
        kinds,
        vec![
            ("X", "SALE"),
            ("X", "PURCHASE"),
            ("Y", "PURCHASE"),
            ("Y", "SALE"),
            ("Y", "INQUIRY"),
        ]
    );

    // SALE copies the two-offer view of the row before it
    assert_eq!(&rows[0][price1], "100.5");
    assert_eq!(&rows[0][price2], "101.0");
    assert_eq!(&rows[0][size1], "250.0");
    assert_eq!(&rows[0][dealer1], "12");
    assert_eq!(&rows[0][time1], "09:31:00");
    assert_eq!(&rows[0][time_stamp], "09:32:00");

    // PURCHASE after the delete sees only Q1
    assert_eq!(&rows[1][price1], "101.0");
    assert_eq!(&rows[1][price2], "");

    // PURCHASE opening Y resets even though Y later gets a quote
    assert!((price1..headers.len()).all(|c| rows[2][c].is_empty()));

    assert_eq!(&rows[3][price1], "97.5");

    // Unrecognized kind: no snapshot written
    assert!((price1..headers.len()).all(|c| rows[4][c].is_empty()));

    let replay = engine.stats();
    assert_eq!(replay.instruments, 2);
    assert_eq!(replay.resets, 1);
    assert_eq!(replay.untouched_rows, 1);
    assert_eq!(
        engine
            .warnings()
            .count_by_category(WarningCategory::UnrecognizedOrderType),
        1
    );
}

#[test]
fn test_unfiltered_output_keeps_every_row() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), &ROWS);
    let output = dir.path().join("all.csv");

    let (table, events) = CsvSource::from_path(&input).unwrap().into_parts().unwrap();
    let snapshots = ReconstructionEngine::new(10).replay(&events).unwrap();

    let stats = CsvSnapshotWriter::new(OutputConfig::default().without_filter())
        .write_to_path(&table, &snapshots, &output)
        .unwrap();
    assert_eq!(stats.rows_written, 10);

    let (headers, rows) = read_output(&output);
    let price1 = column(&headers, "offerprice1");

    // Row 3 (delete of Q2) shows the remaining offer
    assert_eq!(&rows[3][price1], "101.0");
    // Row 9 copies the INQUIRY row's missing snapshot
    assert!(rows[9][price1].is_empty());
}

#[test]
fn test_same_instrument_carry_through_csv() {
    let rows = [
        "X,OFFERING,INSERT,101,500,7,Q1,2024-03-01 09:30:00,F,S,L,2024-03-05,A,",
        "Y,OFFERING,INSERT,98,100,7,Q9,2024-03-01 09:31:00,F,S,L,2024-03-05,A,",
        "X,SALE,,101,500,99,,2024-03-01 09:32:00,F,S,L,2024-03-05,A,",
    ];

    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), &rows);

    let events: Vec<_> = CsvSource::from_path(&input)
        .unwrap()
        .events()
        .unwrap()
        .collect();

    let global = ReconstructionEngine::new(10).replay(&events).unwrap();
    assert_eq!(global[2].as_ref().unwrap().prices(), vec![98.0]);

    let config = ReplayConfig::new(10).with_carry_forward(CarryForwardPolicy::SameInstrument);
    let own = ReconstructionEngine::with_config(config)
        .replay(&events)
        .unwrap();
    assert_eq!(own[2].as_ref().unwrap().prices(), vec![101.0]);
}

#[test]
fn test_replay_source_into_positional_sink() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), &ROWS);

    let mut engine = ReconstructionEngine::new(10);
    let (events, snapshots) = engine
        .replay_source(CsvSource::from_path(&input).unwrap())
        .unwrap();

    let mut sink = PositionalSink::with_rows(events.len());
    let emitted = engine.replay_into(&events, &mut sink).unwrap();
    assert_eq!(emitted, 10);
    assert_eq!(sink.into_inner(), snapshots);
}

// ============================================================================
// Test: Failure paths
// ============================================================================

#[test]
fn test_malformed_timestamp_aborts_batch() {
    let mut rows = ROWS.to_vec();
    rows[6] = "Y,OFFERING,INSERT,97.5,300,7,Q1,09:36:00,F,S,L,2024-03-05,A,";

    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), &rows);

    let result = CsvSource::from_path(&input).unwrap().into_parts();
    match result {
        Err(ReconError::MalformedRecord { row, field, .. }) => {
            assert_eq!(row, 6);
            assert_eq!(field, "time_stamp");
        }
        other => panic!("expected MalformedRecord, got {other:?}"),
    }
}

#[test]
fn test_missing_company_column_with_filter() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nocompany.csv");
    fs::write(&path, "cusip,order_type\nX,SALE\n").unwrap();

    let source = CsvSource::from_path(&path).unwrap();
    let table = source.table().clone();

    let result = CsvSnapshotWriter::default().write(&table, &[None], Vec::new());
    assert!(matches!(result, Err(ReconError::MissingColumn(c)) if c == "company_id"));

    // Parsing needs the full column set too
    assert!(matches!(
        source.into_parts(),
        Err(ReconError::MissingColumn(_))
    ));
}

#[test]
fn test_missing_input_file() {
    let dir = tempfile::tempdir().unwrap();
    assert!(CsvSource::from_path(dir.path().join("absent.csv")).is_err());
}

#[test]
fn test_warning_export() {
    let rows = [
        "X,OFFERING,INSERT,101,500,7,Q1,2024-03-01 09:30:00,F,S,L,2024-03-05,A,",
        "X,OFFERING,INSERT,100,500,7,Q1,2024-03-01 09:31:00,F,S,L,2024-03-05,A,",
        "X,OFFERING,DELETE,,,,Q7,2024-03-01 09:32:00,F,S,L,2024-03-05,A,",
    ];

    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), &rows);
    let (_, events) = CsvSource::from_path(&input).unwrap().into_parts().unwrap();

    let mut engine = ReconstructionEngine::new(10);
    let snapshots = engine.replay(&events).unwrap();
    assert_eq!(snapshots[2].as_ref().unwrap().prices(), vec![100.0]);

    let warnings = engine.warnings();
    assert_eq!(warnings.count_by_category(WarningCategory::DuplicateIdentifier), 1);
    assert_eq!(warnings.count_by_category(WarningCategory::UnknownIdentifier), 1);

    let path = dir.path().join("warnings.json");
    warnings.export_to_file(&path).unwrap();
    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert!(json.is_object() || json.is_array());
}
