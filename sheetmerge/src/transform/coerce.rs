//! Cell type coercion.
//!
//! [`coerce`] never fails: anything that cannot be converted becomes the
//! target type's missing sentinel (see [`DataType::missing`]).
//!
//! | target   | accepted                                           | fallback            |
//! |----------|----------------------------------------------------|---------------------|
//! | string   | anything, stringified                              | `""`                |
//! | category | same as string                                     | `""`                |
//! | integer  | integers, finite floats (truncated), numeric text  | `Missing(Numeric)`  |
//! | float    | numbers, numeric text                              | `Missing(Numeric)`  |
//! | boolean  | booleans, numbers, `true/yes/1`, `false/no/0`      | `Missing(Boolean)`  |
//! | date     | date-times, ISO 8601 then locale text, serials     | `Missing(Date)`     |
//! | auto     | returned unchanged                                 | -                   |

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};

use crate::models::{DataType, MissingKind, Value};

/// Date-time layouts tried after RFC 3339, in order.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
];

/// Date-only layouts. Month-first wins over day-first for ambiguous input.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%d.%m.%Y",
    "%d-%m-%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
    "%B %d %Y",
];

/// Largest serial day Excel can represent (9999-12-31).
const MAX_EXCEL_SERIAL: f64 = 2_958_465.0;

/// Convert `value` to `target`.
///
/// Idempotent: `coerce(&coerce(v, t), t) == coerce(v, t)`.
pub fn coerce(value: &Value, target: DataType) -> Value {
    match target {
        DataType::Auto => value.clone(),
        DataType::String => Value::Text(value.as_string().unwrap_or_default()),
        DataType::Category => Value::Category(value.as_string().unwrap_or_default()),
        DataType::Integer => to_integer(value).map(Value::Integer).unwrap_or(Value::Missing(MissingKind::Numeric)),
        DataType::Float => to_float(value).map(Value::Float).unwrap_or(Value::Missing(MissingKind::Numeric)),
        DataType::Boolean => to_boolean(value).map(Value::Boolean).unwrap_or(Value::Missing(MissingKind::Boolean)),
        DataType::Date => to_datetime(value).map(Value::DateTime).unwrap_or(Value::Missing(MissingKind::Date)),
    }
}

/// Integer view of a cell. Floats are truncated toward zero.
pub fn to_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Integer(i) => Some(*i),
        Value::Float(f) => truncate(*f),
        Value::Boolean(b) => Some(i64::from(*b)),
        Value::Text(s) | Value::Category(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| parse_number(s).and_then(truncate))
        }
        _ => None,
    }
}

/// Float view of a cell. Non-finite results are rejected.
pub fn to_float(value: &Value) -> Option<f64> {
    match value {
        Value::Integer(i) => Some(*i as f64),
        Value::Float(f) if f.is_finite() => Some(*f),
        Value::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Text(s) | Value::Category(s) => parse_number(s),
        _ => None,
    }
}

/// Boolean view of a cell.
pub fn to_boolean(value: &Value) -> Option<bool> {
    match value {
        Value::Boolean(b) => Some(*b),
        Value::Integer(i) => Some(*i != 0),
        Value::Float(f) if f.is_finite() => Some(*f != 0.0),
        Value::Text(s) | Value::Category(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Date-time view of a cell. Numbers are read as Excel serial dates.
pub fn to_datetime(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::DateTime(dt) => Some(*dt),
        Value::Integer(i) => from_excel_serial(*i as f64),
        Value::Float(f) => from_excel_serial(*f),
        Value::Text(s) | Value::Category(s) => parse_datetime(s),
        _ => None,
    }
}

/// Parse a finite number from text.
pub fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    text.parse::<f64>().ok().filter(|f| f.is_finite())
}

/// Parse a date or date-time from text, ISO 8601 first.
pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

fn truncate(f: f64) -> Option<i64> {
    if !f.is_finite() {
        return None;
    }
    let t = f.trunc();
    if t >= i64::MIN as f64 && t < i64::MAX as f64 {
        Some(t as i64)
    } else {
        None
    }
}

/// Excel 1900 date system, including the phantom 1900-02-29.
fn from_excel_serial(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 1.0 || serial > MAX_EXCEL_SERIAL {
        return None;
    }
    let days = serial.trunc() as i64;
    let seconds = ((serial - serial.trunc()) * 86_400.0).round() as i64;
    let epoch = if days < 60 {
        NaiveDate::from_ymd_opt(1899, 12, 31)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    };
    let base = epoch.and_hms_opt(0, 0, 0)?;
    base.checked_add_signed(Duration::days(days))?
        .checked_add_signed(Duration::seconds(seconds))
}
