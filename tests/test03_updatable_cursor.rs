use std::sync::{Arc, Mutex};

use sql_driver_core::prelude::*;
use sql_driver_core::test_utils::{GatewayLog, RecordingGateway};

fn updatable_cursor() -> (Cursor, Arc<Mutex<GatewayLog>>) {
    let log = Arc::new(Mutex::new(GatewayLog::default()));
    let gateway = RecordingGateway::new(Arc::clone(&log), true);
    let stream = MemoryResult::new(vec![
        ColumnInfo::sourced("ID", "T", "ID"),
        ColumnInfo::sourced("NAME", "T", "NAME"),
    ])
    .with_rows([
        vec![CellValue::Int(1), CellValue::Text("a".into())],
        vec![CellValue::Int(2), CellValue::Text("b".into())],
    ]);
    (Cursor::over(Box::new(stream), Some(Box::new(gateway))), log)
}

#[test]
fn staged_insert_reaches_the_gateway_densely() {
    let (cursor, log) = updatable_cursor();
    cursor.move_to_insert_row().unwrap();
    cursor.update_value(1, CellValue::Int(3)).unwrap();
    cursor.insert_row().unwrap();

    let log = log.lock().unwrap();
    assert_eq!(
        log.inserted,
        vec![vec![CellValue::Int(3), CellValue::Null]]
    );
}

#[test]
fn insert_buffer_resets_after_each_flush() {
    let (cursor, log) = updatable_cursor();
    cursor.move_to_insert_row().unwrap();
    cursor.update_value(2, CellValue::Text("x".into())).unwrap();
    cursor.insert_row().unwrap();
    // still in insert mode with a fresh all-NULL buffer
    cursor.insert_row().unwrap();

    let log = log.lock().unwrap();
    assert_eq!(log.inserted.len(), 2);
    assert_eq!(
        log.inserted[1],
        vec![CellValue::Null, CellValue::Null]
    );
}

#[test]
fn insert_row_outside_insert_mode_is_rejected() {
    let (cursor, _) = updatable_cursor();
    cursor.next().unwrap();
    assert!(matches!(
        cursor.insert_row(),
        Err(SqlDriverError::NotUpdatable(_))
    ));
}

#[test]
fn update_row_sends_snapshot_and_sparse_changes() {
    let (cursor, log) = updatable_cursor();
    cursor.next().unwrap();
    cursor.update_value(2, CellValue::Text("renamed".into())).unwrap();
    cursor.update_row().unwrap();

    {
        let log = log.lock().unwrap();
        let (current, touched) = &log.updated[0];
        assert_eq!(current[0], CellValue::Int(1));
        assert_eq!(touched[0], None);
        assert_eq!(touched[1], Some(CellValue::Text("renamed".into())));
    }
    // later reads at this position see the merged row
    assert_eq!(cursor.get_string(2).unwrap().as_deref(), Some("renamed"));
    // and the patch survives a replay
    cursor.next().unwrap();
    cursor.first().unwrap();
    assert_eq!(cursor.get_string(2).unwrap().as_deref(), Some("renamed"));
}

#[test]
fn explicit_null_write_is_not_an_untouched_slot() {
    let (cursor, log) = updatable_cursor();
    cursor.next().unwrap();
    cursor.update_value(2, CellValue::Null).unwrap();
    cursor.update_row().unwrap();

    let log = log.lock().unwrap();
    let (_, touched) = &log.updated[0];
    assert_eq!(touched[1], Some(CellValue::Null));
}

#[test]
fn moving_away_discards_the_update_stage() {
    let (cursor, log) = updatable_cursor();
    cursor.next().unwrap();
    cursor.update_value(2, CellValue::Text("lost".into())).unwrap();
    cursor.next().unwrap();
    // nothing staged for the new row, so this flushes nothing
    cursor.update_row().unwrap();

    assert!(log.lock().unwrap().updated.is_empty());
    assert_eq!(cursor.get_string(2).unwrap().as_deref(), Some("b"));
}

#[test]
fn cancel_row_updates_drops_the_stage() {
    let (cursor, log) = updatable_cursor();
    cursor.next().unwrap();
    cursor.update_value_named("NAME", CellValue::Text("no".into())).unwrap();
    cursor.cancel_row_updates().unwrap();
    cursor.update_row().unwrap();

    assert!(log.lock().unwrap().updated.is_empty());
}

#[test]
fn update_off_row_reports_no_data() {
    let (cursor, _) = updatable_cursor();
    assert!(matches!(
        cursor.update_value(1, CellValue::Int(0)),
        Err(SqlDriverError::NoData(_))
    ));
    assert!(matches!(
        cursor.update_row(),
        Err(SqlDriverError::NoData(_))
    ));
    assert!(matches!(
        cursor.delete_row(),
        Err(SqlDriverError::NoData(_))
    ));
}

#[test]
fn delete_row_sends_the_current_snapshot() {
    let (cursor, log) = updatable_cursor();
    cursor.absolute(2).unwrap();
    cursor.delete_row().unwrap();

    assert_eq!(
        log.lock().unwrap().deleted,
        vec![vec![CellValue::Int(2), CellValue::Text("b".into())]]
    );
}

#[test]
fn refresh_row_replaces_local_values() {
    let log = Arc::new(Mutex::new(GatewayLog::default()));
    let mut gateway = RecordingGateway::new(Arc::clone(&log), true);
    gateway.refreshed = Some(vec![CellValue::Int(1), CellValue::Text("fresh".into())]);
    let stream = MemoryResult::new(vec![
        ColumnInfo::sourced("ID", "T", "ID"),
        ColumnInfo::sourced("NAME", "T", "NAME"),
    ])
    .with_rows([vec![CellValue::Int(1), CellValue::Text("stale".into())]]);
    let cursor = Cursor::over(Box::new(stream), Some(Box::new(gateway)));

    cursor.next().unwrap();
    cursor.refresh_row().unwrap();
    assert_eq!(cursor.get_string(2).unwrap().as_deref(), Some("fresh"));
}

#[test]
fn read_only_results_reject_mutation() {
    let log = Arc::new(Mutex::new(GatewayLog::default()));
    let gateway = RecordingGateway::new(log, false);
    let stream = MemoryResult::new(vec![ColumnInfo::aliased("X")])
        .with_rows([vec![CellValue::Int(1)]]);
    let cursor = Cursor::over(Box::new(stream), Some(Box::new(gateway)));

    assert!(!cursor.is_updatable());
    cursor.next().unwrap();
    assert!(matches!(
        cursor.update_value(1, CellValue::Int(2)),
        Err(SqlDriverError::NotUpdatable(_))
    ));
    assert!(matches!(
        cursor.move_to_insert_row(),
        Err(SqlDriverError::NotUpdatable(_))
    ));
}

#[test]
fn move_to_current_row_leaves_insert_mode() {
    let (cursor, log) = updatable_cursor();
    cursor.next().unwrap();
    cursor.move_to_insert_row().unwrap();
    cursor.update_value(1, CellValue::Int(9)).unwrap();
    cursor.move_to_current_row().unwrap();

    assert!(matches!(
        cursor.insert_row(),
        Err(SqlDriverError::NotUpdatable(_))
    ));
    assert!(log.lock().unwrap().inserted.is_empty());
    // the pre-insert position is still current
    assert_eq!(cursor.get_i64(1).unwrap(), 1);
}
