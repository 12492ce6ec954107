use chrono::DateTime;

use crate::error::EngineError;
use crate::model::{Field, FieldKind, FieldValue};

/// Pattern for date-time field values as exported by the collection tool,
/// e.g. `2014-03-04T12:00:00.000+0000`.
pub const DEFAULT_DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%z";

/// Convert a raw field value to its declared kind.
///
/// A failure here is recoverable for that field only: the caller logs it,
/// counts an error, and keeps the record.
pub fn convert(field: &Field, date_time_format: &str) -> Result<FieldValue, EngineError> {
    let raw = field.raw_value.trim();
    match field.kind {
        FieldKind::Text => Ok(FieldValue::Text(field.raw_value.clone())),
        FieldKind::DateTime => DateTime::parse_from_str(raw, date_time_format)
            .map(FieldValue::DateTime)
            .map_err(|e| field_error(field, e.to_string())),
        FieldKind::Number => raw
            .parse::<f64>()
            .map(FieldValue::Number)
            .map_err(|e| field_error(field, e.to_string())),
        FieldKind::Boolean => match raw.to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(FieldValue::Boolean(true)),
            "false" | "0" => Ok(FieldValue::Boolean(false)),
            _ => Err(field_error(field, "not a boolean".into())),
        },
    }
}

fn field_error(field: &Field, message: String) -> EngineError {
    EngineError::FieldConvert {
        field: field.name.clone(),
        value: field.raw_value.clone(),
        message,
    }
}
