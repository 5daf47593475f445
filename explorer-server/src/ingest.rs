//! Ingestion adapter
//!
//! Turns an uploaded export file into a uniform list of records. A file is
//! accepted whole or rejected whole; there is no partial acceptance.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::{Collection, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Csv,
    Json,
}

impl Format {
    /// Detect from the file extension.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let lower = file_name.to_lowercase();
        if lower.ends_with(".csv") {
            Some(Format::Csv)
        } else if lower.ends_with(".json") {
            Some(Format::Json)
        } else {
            None
        }
    }
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("unsupported file format: {0} (expected .csv or .json)")]
    UnsupportedFormat(String),
    #[error("cannot tell which collection {0} belongs to")]
    UnknownFileType(String),
    #[error("malformed record: {0}")]
    Malformed(String),
    #[error("invalid CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// A parsed upload, ready to be appended to its collection.
#[derive(Debug)]
pub struct IngestedFile {
    pub file_name: String,
    pub collection: Collection,
    pub format: Format,
    pub records: Vec<Record>,
}

/// Parse an uploaded file. The collection comes from `declared` when given,
/// otherwise from the file name.
pub fn ingest(
    file_name: &str,
    bytes: &[u8],
    declared: Option<Collection>,
) -> Result<IngestedFile, IngestError> {
    let format = Format::from_file_name(file_name)
        .ok_or_else(|| IngestError::UnsupportedFormat(file_name.to_string()))?;
    let collection = declared
        .or_else(|| Collection::detect_from_file_name(file_name))
        .ok_or_else(|| IngestError::UnknownFileType(file_name.to_string()))?;

    let records = parse(bytes, format)?;
    tracing::debug!("Parsed {} as {} ({} records)", file_name, collection, records.len());

    Ok(IngestedFile {
        file_name: file_name.to_string(),
        collection,
        format,
        records,
    })
}

pub fn parse(bytes: &[u8], format: Format) -> Result<Vec<Record>, IngestError> {
    match format {
        Format::Csv => parse_csv(bytes),
        Format::Json => parse_json(bytes),
    }
}

/// Header row names the fields; every cell is kept as a string. Short rows
/// simply lack the trailing fields.
fn parse_csv(bytes: &[u8]) -> Result<Vec<Record>, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers = reader.headers()?.clone();
    let mut records = Vec::new();

    for row in reader.records() {
        let row = row?;
        if row.iter().all(str::is_empty) {
            continue;
        }
        let fields: Map<String, Value> = headers
            .iter()
            .zip(row.iter())
            .map(|(h, cell)| (h.to_string(), Value::String(cell.to_string())))
            .collect();
        records.push(Record::new(fields));
    }

    Ok(records)
}

/// Either one object or an array of objects.
fn parse_json(bytes: &[u8]) -> Result<Vec<Record>, IngestError> {
    match serde_json::from_slice::<Value>(bytes)? {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| {
                Record::from_value(item)
                    .ok_or_else(|| IngestError::Malformed(format!("element {i} is not an object")))
            })
            .collect(),
        value @ Value::Object(_) => Ok(Record::from_value(value).into_iter().collect()),
        other => Err(IngestError::Malformed(format!(
            "expected an object or array, found {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_detection() {
        assert_eq!(Format::from_file_name("Workloads.CSV"), Some(Format::Csv));
        assert_eq!(Format::from_file_name("rulesets.json"), Some(Format::Json));
        assert_eq!(Format::from_file_name("labels.xlsx"), None);
    }

    #[test]
    fn test_csv_uses_header_names() {
        let csv = "href,name,environment\n/w/1,web,prod\n\n/w/2,db\n";
        let records = parse(csv.as_bytes(), Format::Csv).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].str_field("environment"), Some("prod"));
        assert_eq!(records[0].keys().collect::<Vec<_>>(), vec!["href", "name", "environment"]);
        assert_eq!(records[1].get("environment"), None);
        assert_eq!(records[1].str_field("name"), Some("db"));
    }

    #[test]
    fn test_json_single_object_is_normalized() {
        let records = parse(br#"{"href": "/r/1", "rules": []}"#, Format::Json).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("rules"), Some(&json!([])));
    }

    #[test]
    fn test_json_rejects_whole_file_on_bad_element() {
        let err = parse(br#"[{"href": "/w/1"}, 42]"#, Format::Json).unwrap_err();
        assert!(matches!(err, IngestError::Malformed(ref m) if m.contains("element 1")));

        assert!(matches!(parse(b"\"text\"", Format::Json), Err(IngestError::Malformed(_))));
        assert!(matches!(parse(b"{not json", Format::Json), Err(IngestError::Json(_))));
    }

    #[test]
    fn test_ingest_detects_collection() {
        let file = ingest("prod_workloads.json", br#"[{"href": "/w/1"}]"#, None).unwrap();
        assert_eq!(file.collection, Collection::Workloads);
        assert_eq!(file.format, Format::Json);

        let declared = ingest("export.json", b"[]", Some(Collection::Services)).unwrap();
        assert_eq!(declared.collection, Collection::Services);

        assert!(matches!(ingest("export.json", b"[]", None), Err(IngestError::UnknownFileType(_))));
        assert!(matches!(ingest("labels.txt", b"", None), Err(IngestError::UnsupportedFormat(_))));
    }
}
