// 🔁 Row Mapper - positional rows <-> named JSON objects

use rusqlite::types::{Type, ValueRef};
use serde_json::{Map, Value};

use crate::error::{BankingError, Result};
use crate::schema::{EntityDescriptor, FieldDef, FieldType, FieldValue};
use crate::validator::ValidatedFields;

/// One store row, in descriptor column order
pub type Row = Vec<FieldValue>;

/// Zip a row with the descriptor's JSON keys.
pub fn to_object(row: &[FieldValue], descriptor: &EntityDescriptor) -> Result<Map<String, Value>> {
    if row.len() != descriptor.arity() {
        return Err(BankingError::ShapeMismatch {
            expected: descriptor.arity(),
            actual: row.len(),
        });
    }

    Ok(descriptor
        .fields
        .iter()
        .zip(row)
        .map(|(field, value)| (field.key.to_string(), value.to_json()))
        .collect())
}

/// Project validated fields into INSERT column order; absent fields bind NULL.
pub fn to_insert_args(validated: &ValidatedFields, descriptor: &EntityDescriptor) -> Row {
    descriptor
        .fields
        .iter()
        .map(|field| validated.get(field.key).cloned().unwrap_or(FieldValue::Null))
        .collect()
}

/// Read a row produced by `descriptor.select_sql()`
pub fn read_row(row: &rusqlite::Row<'_>, descriptor: &EntityDescriptor) -> rusqlite::Result<Row> {
    descriptor
        .fields
        .iter()
        .enumerate()
        .map(|(idx, field)| decode(row.get_ref(idx)?, idx, field))
        .collect()
}

fn decode(value: ValueRef<'_>, idx: usize, field: &FieldDef) -> rusqlite::Result<FieldValue> {
    Ok(match value {
        ValueRef::Null => FieldValue::Null,
        ValueRef::Integer(i) => match field.field_type {
            FieldType::Integer => FieldValue::Integer(i),
            FieldType::Real => FieldValue::Real(i as f64),
            FieldType::Text | FieldType::Date => FieldValue::Text(i.to_string()),
        },
        ValueRef::Real(f) => match field.field_type {
            FieldType::Integer if f.fract() == 0.0 => FieldValue::Integer(f as i64),
            FieldType::Text | FieldType::Date => FieldValue::Text(f.to_string()),
            _ => FieldValue::Real(f),
        },
        ValueRef::Text(bytes) => {
            let text = std::str::from_utf8(bytes).map_err(rusqlite::Error::Utf8Error)?;
            // columns declared INTEGER can still hold text in SQLite
            match field.field_type {
                FieldType::Integer => text
                    .parse::<i64>()
                    .map(FieldValue::Integer)
                    .unwrap_or_else(|_| FieldValue::Text(text.to_string())),
                _ => FieldValue::Text(text.to_string()),
            }
        }
        ValueRef::Blob(_) => {
            return Err(rusqlite::Error::InvalidColumnType(
                idx,
                field.column.to_string(),
                Type::Blob,
            ))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Catalog, Entity, SchemaVariant};
    use crate::validator::{validate, ValidationPolicy};
    use rusqlite::Connection;
    use serde_json::json;

    fn employees() -> &'static EntityDescriptor {
        Catalog::new(SchemaVariant::A)
            .descriptor(Entity::Employee)
            .unwrap()
    }

    #[test]
    fn test_to_object() {
        let row = vec![FieldValue::Integer(1), FieldValue::Text("John Doe".into())];
        let object = to_object(&row, employees()).unwrap();

        assert_eq!(Value::Object(object), json!({"employee_ID": 1, "name": "John Doe"}));
    }

    #[test]
    fn test_shape_mismatch() {
        let row = vec![FieldValue::Integer(1)];
        let err = to_object(&row, employees()).unwrap_err();

        assert!(matches!(
            err,
            BankingError::ShapeMismatch { expected: 2, actual: 1 }
        ));
    }

    #[test]
    fn test_insert_args_follow_column_order() {
        let d = Catalog::new(SchemaVariant::A)
            .descriptor(Entity::Client)
            .unwrap();
        // keys deliberately out of column order
        let body = json!({
            "phone": "555-0100",
            "client_Manager_Employee_ID": 7,
            "email": "ada@example.com",
            "name": "Ada",
            "client_ID": 3
        });
        let validated = validate(body.as_object().unwrap(), d, ValidationPolicy::Compat).unwrap();

        assert_eq!(
            to_insert_args(&validated, d),
            vec![
                FieldValue::Integer(3),
                FieldValue::Text("Ada".into()),
                FieldValue::Text("ada@example.com".into()),
                FieldValue::Text("555-0100".into()),
                FieldValue::Integer(7),
            ]
        );
    }

    #[test]
    fn test_round_trip_through_sqlite() {
        let d = Catalog::new(SchemaVariant::A)
            .descriptor(Entity::Transaction)
            .unwrap();
        let conn = Connection::open_in_memory().unwrap();
        // only Transactions exists, so parent tables cannot be checked
        conn.pragma_update(None, "foreign_keys", "OFF").unwrap();
        conn.execute(&d.create_table_sql(), []).unwrap();

        let body = json!({
            "transaction_ID": 10,
            "client_ID": 1,
            "product_ID": 2,
            "transaction_Amount": 99,
            "transaction_Date": "2024-05-06"
        });
        let validated = validate(body.as_object().unwrap(), d, ValidationPolicy::Compat).unwrap();
        let args = to_insert_args(&validated, d);

        conn.execute(&d.insert_sql(), rusqlite::params_from_iter(args.iter()))
            .unwrap();
        let stored = conn
            .query_row(&d.select_by_key_sql(), [&args[0]], |row| read_row(row, d))
            .unwrap();

        assert_eq!(stored, args);
        assert_eq!(to_object(&stored, d).unwrap(), to_object(&args, d).unwrap());
        assert_eq!(
            to_object(&stored, d).unwrap().get("transaction_Amount"),
            Some(&json!(99.0))
        );
    }

    #[test]
    fn test_blob_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        let err = conn
            .query_row("SELECT x'00', 'n'", [], |row| read_row(row, employees()))
            .unwrap_err();

        assert!(matches!(err, rusqlite::Error::InvalidColumnType(0, _, Type::Blob)));
    }
}
