use pretty_assertions::assert_eq;
use std::io::Write;
use tidyframe::{Column, Frame, Value};
use tidyframe_io::{
    read_csv_path, read_csv_str, write_csv_path, CsvOptions, CsvWriteOptions, FieldSpec,
    FieldType, IoError, RowSchema,
};

fn trades_schema() -> RowSchema {
    RowSchema::new(vec![
        FieldSpec::required("id", FieldType::Int),
        FieldSpec::required("at", FieldType::DateTime),
        FieldSpec::nullable("price", FieldType::Float),
        FieldSpec::optional("venue", FieldType::Str),
        FieldSpec::nullable("ok", FieldType::Bool),
    ])
}

#[test]
fn reads_typed_columns_with_both_missing_kinds() {
    let text = "\
id,at,price,venue,ok
1,2024-01-02 09:30:00,10.5,XNYS,true
2,2024-01-02T09:31:00Z,NULL,NA,
3,2024-01-02,11,,false
";
    let frame = read_csv_str(text, &trades_schema(), &CsvOptions::default()).unwrap();

    assert_eq!(frame.len(), 3);
    assert_eq!(frame.extract("id").unwrap(), vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
    assert_eq!(
        frame.extract("price").unwrap(),
        vec![Value::Float(10.5), Value::Null, Value::Float(11.0)]
    );
    assert_eq!(
        frame.extract("venue").unwrap(),
        vec!["XNYS".into(), Value::Absent, Value::Absent]
    );
    assert_eq!(
        frame.extract("ok").unwrap(),
        vec![Value::Bool(true), Value::Null, Value::Bool(false)]
    );
    assert_eq!(
        frame.extract_nth("at", 1).unwrap(),
        Value::from_millis(1_704_187_860_000)
    );
    assert!(frame.column("venue").unwrap().is_optional());
}

#[test]
fn required_na_aborts_with_the_row_number() {
    let text = "id,at,price\n1,2024-01-02,1\nNA,2024-01-02,2\n";
    let schema = trades_schema().select(&["id", "at", "price"]).unwrap();
    match read_csv_str(text, &schema, &CsvOptions::default()) {
        Err(IoError::Validation { row, column, .. }) => {
            assert_eq!((row, column.as_str()), (2, "id"));
        }
        other => panic!("expected a validation error, got {other:?}"),
    }
}

#[test]
fn unparseable_values_abort() {
    let text = "id,at\n1,yesterday\n";
    let schema = trades_schema().select(&["id", "at"]).unwrap();
    let err = read_csv_str(text, &schema, &CsvOptions::default()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "row 1, column at: cannot parse \"yesterday\" as datetime"
    );
}

#[test]
fn missing_columns_depend_on_presence() {
    let text = "id,at,price\n1,2024-01-02,1\n";
    let frame = read_csv_str(text, &trades_schema(), &CsvOptions::default());
    // `ok` is nullable, so the header must name it
    assert!(matches!(frame, Err(IoError::MissingField(name)) if name == "ok"));

    let schema = trades_schema().select(&["id", "venue"]).unwrap();
    let frame = read_csv_str(text, &schema, &CsvOptions::default()).unwrap();
    assert_eq!(frame.extract("venue").unwrap(), vec![Value::Absent]);
}

#[test]
fn allow_list_limits_materialized_columns() {
    let text = "id,at,price,venue,ok\n1,2024-01-02,1,X,true\n";
    let options = CsvOptions {
        columns: Some(vec!["price".to_string(), "id".to_string()]),
        ..CsvOptions::default()
    };
    let frame = read_csv_str(text, &trades_schema(), &options).unwrap();
    assert_eq!(frame.names(), &["id", "price"]);

    let options = CsvOptions {
        columns: Some(vec!["nope".to_string()]),
        ..CsvOptions::default()
    };
    assert!(matches!(
        read_csv_str(text, &trades_schema(), &options),
        Err(IoError::UnknownColumn(_))
    ));
}

#[test]
fn custom_na_tokens_and_trimming() {
    let schema = RowSchema::new(vec![
        FieldSpec::required("id", FieldType::Int),
        FieldSpec::nullable("v", FieldType::Int),
    ]);
    let options = CsvOptions {
        na_tokens: vec!["-".to_string()],
        trim: true,
        ..CsvOptions::default()
    };
    let frame = read_csv_str("id, v\n 1 , - \n2,3\n", &schema, &options).unwrap();
    assert_eq!(frame.extract("v").unwrap(), vec![Value::Null, Value::Int(3)]);
}

#[test]
fn write_then_read_through_a_file() {
    let frame = Frame::from_columns([
        ("id", Column::from_iter([1, 2])),
        ("name", Column::from_iter(["a,b", "c"])),
        ("score", Column::new(vec![Value::Float(0.25), Value::Null])),
    ])
    .unwrap();
    let schema = RowSchema::from_frame(&frame).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.csv");
    write_csv_path(&frame, &path, &CsvWriteOptions::default()).unwrap();
    let back = read_csv_path(&path, &schema, &CsvOptions::default()).unwrap();
    assert_eq!(back, frame);
}

#[test]
fn reads_from_a_file_handle() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "id;at").unwrap();
    writeln!(file, "5;2024-03-01T00:00:00+01:00").unwrap();
    let options = CsvOptions {
        delimiter: b';',
        ..CsvOptions::default()
    };
    let schema = trades_schema().select(&["id", "at"]).unwrap();
    let frame = read_csv_path(file.path(), &schema, &options).unwrap();
    assert_eq!(
        frame.extract_nth("at", 0).unwrap(),
        Value::from_millis(1_709_247_600_000)
    );
}
