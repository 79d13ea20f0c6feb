use sql_driver_core::prelude::*;

fn five_rows() -> Cursor {
    let stream = MemoryResult::new(vec![
        ColumnInfo::sourced("ID", "T", "ID"),
        ColumnInfo::aliased("NAME"),
    ])
    .with_rows((1..=5).map(|i| {
        vec![
            CellValue::Int(i),
            CellValue::Text(format!("row{i}")),
        ]
    }));
    Cursor::over(Box::new(stream), None)
}

#[test]
fn starts_before_first_and_walks_forward() {
    let cursor = five_rows();
    assert!(cursor.is_before_first().unwrap());
    assert_eq!(cursor.row().unwrap(), 0);

    let mut seen = Vec::new();
    while cursor.next().unwrap() {
        seen.push(cursor.get_i64(1).unwrap());
    }
    assert_eq!(seen, vec![1, 2, 3, 4, 5]);
    assert!(cursor.is_after_last().unwrap());
    assert_eq!(cursor.row().unwrap(), 0);
}

#[test]
fn absolute_negative_counts_from_the_end() {
    let cursor = five_rows();
    assert!(cursor.absolute(-1).unwrap());
    assert_eq!(cursor.get_i64(1).unwrap(), 5);
    assert!(cursor.is_last().unwrap());

    assert!(cursor.absolute(-5).unwrap());
    assert_eq!(cursor.get_i64(1).unwrap(), 1);
    assert!(cursor.is_first().unwrap());
}

#[test]
fn absolute_out_of_range_parks_on_the_sentinel() {
    let cursor = five_rows();
    assert!(!cursor.absolute(100).unwrap());
    assert!(cursor.is_after_last().unwrap());

    assert!(!cursor.absolute(-100).unwrap());
    assert!(cursor.is_before_first().unwrap());
}

#[test]
fn relative_zero_reports_current_validity() {
    let cursor = five_rows();
    assert!(!cursor.relative(0).unwrap());

    assert!(cursor.absolute(3).unwrap());
    assert!(cursor.relative(0).unwrap());
    assert_eq!(cursor.get_i64(1).unwrap(), 3);

    assert!(cursor.relative(-2).unwrap());
    assert_eq!(cursor.row().unwrap(), 1);
    assert!(!cursor.relative(10).unwrap());
    assert!(cursor.is_after_last().unwrap());
}

#[test]
fn previous_replays_the_stream_backwards() {
    let cursor = five_rows();
    assert!(cursor.last().unwrap());
    assert!(cursor.previous().unwrap());
    assert_eq!(cursor.get_i64(1).unwrap(), 4);
    assert!(cursor.first().unwrap());
    assert!(!cursor.previous().unwrap());
    assert!(cursor.is_before_first().unwrap());
}

#[test]
fn reads_off_row_report_no_data() {
    let cursor = five_rows();
    assert!(matches!(
        cursor.get_value(1),
        Err(SqlDriverError::NoData(_))
    ));
    cursor.after_last().unwrap();
    assert!(matches!(
        cursor.get_value(1),
        Err(SqlDriverError::NoData(_))
    ));
}

#[test]
fn column_index_is_validated_before_position() {
    let cursor = five_rows();
    cursor.next().unwrap();
    assert!(matches!(
        cursor.get_value(0),
        Err(SqlDriverError::InvalidValue { .. })
    ));
    assert!(matches!(
        cursor.get_value(3),
        Err(SqlDriverError::InvalidValue { .. })
    ));
}

#[test]
fn was_null_tracks_the_last_read_only() {
    let stream = MemoryResult::new(vec![
        ColumnInfo::aliased("A"),
        ColumnInfo::aliased("B"),
    ])
    .with_rows([vec![CellValue::Null, CellValue::Int(7)]]);
    let cursor = Cursor::over(Box::new(stream), None);
    cursor.next().unwrap();

    assert_eq!(cursor.get_i64(1).unwrap(), 0);
    assert!(cursor.was_null().unwrap());
    assert_eq!(cursor.get_i64(2).unwrap(), 7);
    assert!(!cursor.was_null().unwrap());
}

#[test]
fn find_column_matches_aliases_case_insensitively() {
    let cursor = five_rows();
    assert_eq!(cursor.find_column("name").unwrap(), 2);
    assert_eq!(cursor.find_column("NAME").unwrap(), 2);
    assert_eq!(cursor.find_column("Id").unwrap(), 1);
    assert!(matches!(
        cursor.find_column("missing"),
        Err(SqlDriverError::ColumnNotFound(_))
    ));
}

#[test]
fn qualified_lookup_is_table_case_sensitive() {
    let stream = MemoryResult::new(vec![ColumnInfo::sourced("X", "Orders", "total")])
        .with_rows([vec![CellValue::Int(9)]]);
    let cursor = Cursor::over(Box::new(stream), None);
    cursor.next().unwrap();

    assert_eq!(cursor.find_column("Orders.TOTAL").unwrap(), 1);
    assert!(matches!(
        cursor.find_column("orders.total"),
        Err(SqlDriverError::ColumnNotFound(_))
    ));
    assert_eq!(cursor.get_value_named("X").unwrap(), CellValue::Int(9));
}

#[test]
fn closed_cursor_rejects_everything_but_close() {
    let cursor = five_rows();
    cursor.close();
    assert!(cursor.is_closed());
    assert!(matches!(cursor.next(), Err(SqlDriverError::ObjectClosed)));
    assert!(matches!(
        cursor.get_value(1),
        Err(SqlDriverError::ObjectClosed)
    ));
    // idempotent
    cursor.close();
}
