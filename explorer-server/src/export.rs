//! CSV / JSON export of record lists and chart data

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::models::text_of;

/// Download format; CSV unless the request asks for JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl ExportFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv;charset=utf-8",
            ExportFormat::Json => "application/json;charset=utf-8",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

pub fn export<T: Serialize>(items: &[T], format: ExportFormat) -> Result<String, ExportError> {
    match format {
        ExportFormat::Csv => to_csv(items),
        ExportFormat::Json => to_json(items),
    }
}

/// Header row is the keys of the first item, in order. Later items are
/// written against that header; missing fields are empty cells and nested
/// values are compact JSON.
pub fn to_csv<T: Serialize>(items: &[T]) -> Result<String, ExportError> {
    let rows = items
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()?;

    let Some(header) = rows.first().and_then(Value::as_object).map(|o| o.keys().cloned().collect::<Vec<_>>()) else {
        return Ok(String::new());
    };

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&header)?;
    for row in &rows {
        writer.write_record(header.iter().map(|key| cell(row.get(key))))?;
    }

    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

pub fn to_json<T: Serialize>(items: &[T]) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(items)?)
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(v) => text_of(v),
    }
}
