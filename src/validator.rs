// ✅ Validator - Required fields + column type coercion
// Turns an inbound JSON object into values ready to bind

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{BankingError, Result};
use crate::schema::{EntityDescriptor, FieldDef, FieldType, FieldValue};

/// Inbound request body
pub type Payload = Map<String, Value>;

/// How strictly "missing" is judged for required fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationPolicy {
    /// Any falsy JSON value counts as missing: null, false, "", 0, 0.0, [], {}.
    /// Numeric identifiers and amounts of zero are therefore rejected.
    #[default]
    Compat,
    /// Only absent, null, and blank strings count as missing
    Strict,
}

// ============================================================================
// VALIDATED FIELDS
// ============================================================================

/// Coerced values keyed by JSON field name, in descriptor order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidatedFields {
    values: Vec<(&'static str, FieldValue)>,
}

impl ValidatedFields {
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.values.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(&'static str, FieldValue)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn push(&mut self, key: &'static str, value: FieldValue) {
        self.values.push((key, value));
    }
}

// ============================================================================
// VALIDATION
// ============================================================================

/// Validate a create payload.
///
/// Every required field must be present and non-missing under `policy`;
/// when any are missing the error names all of them and carries the
/// descriptor's message. Optional fields that are absent become NULL.
/// Keys the descriptor does not know are ignored.
pub fn validate(
    payload: &Payload,
    descriptor: &'static EntityDescriptor,
    policy: ValidationPolicy,
) -> Result<ValidatedFields> {
    let missing: Vec<&'static str> = descriptor
        .fields
        .iter()
        .filter(|f| f.required && is_missing(payload.get(f.key), policy))
        .map(|f| f.key)
        .collect();

    if !missing.is_empty() {
        return Err(BankingError::MissingFields {
            message: descriptor.missing_message,
            fields: missing,
        });
    }

    let mut validated = ValidatedFields::default();
    for field in descriptor.fields.iter() {
        let value = match payload.get(field.key) {
            None | Some(Value::Null) => FieldValue::Null,
            Some(raw) => coerce(field, raw)?,
        };
        validated.push(field.key, value);
    }

    Ok(validated)
}

/// Validate an update payload: the non-key fields that are present.
///
/// The identifier comes from the route, so a key in the body is ignored.
/// At least one updatable field must be present.
pub fn validate_update(
    payload: &Payload,
    descriptor: &'static EntityDescriptor,
    policy: ValidationPolicy,
) -> Result<ValidatedFields> {
    let mut validated = ValidatedFields::default();

    for field in descriptor.updatable_fields() {
        let raw = payload.get(field.key);
        if is_missing(raw, policy) {
            continue;
        }
        if let Some(raw) = raw {
            validated.push(field.key, coerce(field, raw)?);
        }
    }

    if validated.is_empty() {
        return Err(BankingError::MissingFields {
            message: descriptor.update_message,
            fields: descriptor.updatable_fields().iter().map(|f| f.key).collect(),
        });
    }

    Ok(validated)
}

/// Parse a path segment as the descriptor's identifier
pub fn parse_key(raw: &str, descriptor: &'static EntityDescriptor) -> Result<FieldValue> {
    coerce(descriptor.key(), &Value::String(raw.to_string()))
}

fn is_missing(value: Option<&Value>, policy: ValidationPolicy) -> bool {
    match (value, policy) {
        (None, _) | (Some(Value::Null), _) => true,
        (Some(Value::String(s)), ValidationPolicy::Strict) => s.trim().is_empty(),
        (Some(_), ValidationPolicy::Strict) => false,
        (Some(v), ValidationPolicy::Compat) => is_falsy(v),
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

// ============================================================================
// COERCION
// ============================================================================

fn coerce(field: &FieldDef, raw: &Value) -> Result<FieldValue> {
    let invalid = |reason: &str| BankingError::InvalidField {
        field: field.key,
        reason: reason.to_string(),
    };

    match field.field_type {
        FieldType::Integer => match raw {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(FieldValue::Integer(i))
                } else {
                    match n.as_f64() {
                        Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                            Ok(FieldValue::Integer(f as i64))
                        }
                        _ => Err(invalid("expected an integer")),
                    }
                }
            }
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(FieldValue::Integer)
                .map_err(|_| invalid("expected an integer")),
            _ => Err(invalid("expected an integer")),
        },

        FieldType::Real => match raw {
            Value::Number(n) => n
                .as_f64()
                .map(FieldValue::Real)
                .ok_or_else(|| invalid("expected a number")),
            Value::String(s) => match s.trim().parse::<f64>() {
                Ok(f) if f.is_finite() => Ok(FieldValue::Real(f)),
                _ => Err(invalid("expected a number")),
            },
            _ => Err(invalid("expected a number")),
        },

        FieldType::Text => match raw {
            Value::String(s) => Ok(FieldValue::Text(s.clone())),
            Value::Number(n) => Ok(FieldValue::Text(n.to_string())),
            _ => Err(invalid("expected text")),
        },

        FieldType::Date => match raw {
            Value::String(s) => parse_date(s)
                .map(|d| FieldValue::Text(d.format("%Y-%m-%d").to_string()))
                .ok_or_else(|| invalid("expected an ISO-8601 date (YYYY-MM-DD)")),
            _ => Err(invalid("expected an ISO-8601 date (YYYY-MM-DD)")),
        },
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}
