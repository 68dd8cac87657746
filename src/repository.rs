// 🗄️ Entity Repository - SELECT / INSERT / UPDATE / DELETE for one table
//
// One generic repository, instantiated per entity descriptor. Every write
// re-reads its row inside the same transaction before reporting success.

use rusqlite::{params_from_iter, Connection, OptionalExtension};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::db::{constraint_violation, Constraint};
use crate::error::{BankingError, Result};
use crate::mapper::{read_row, to_insert_args, to_object, Row};
use crate::schema::{EntityDescriptor, FieldValue};
use crate::validator::{validate, validate_update, Payload, ValidationPolicy};

pub struct EntityRepository<'a> {
    conn: &'a mut Connection,
    descriptor: &'static EntityDescriptor,
    policy: ValidationPolicy,
}

impl<'a> EntityRepository<'a> {
    pub fn new(
        conn: &'a mut Connection,
        descriptor: &'static EntityDescriptor,
        policy: ValidationPolicy,
    ) -> Self {
        EntityRepository {
            conn,
            descriptor,
            policy,
        }
    }

    /// Every row, in whatever order the store returns them.
    ///
    /// An empty table is reported as `EmptyResult`, not an empty vector.
    pub fn list(&self) -> Result<Vec<Map<String, Value>>> {
        let d = self.descriptor;
        let mut stmt = self.conn.prepare(&d.select_sql())?;
        let rows = stmt
            .query_map([], |row| read_row(row, d))?
            .collect::<rusqlite::Result<Vec<Row>>>()?;

        if rows.is_empty() {
            return Err(BankingError::EmptyResult { entity: d.entity });
        }

        rows.iter().map(|row| to_object(row, d)).collect()
    }

    pub fn get(&self, id: &FieldValue) -> Result<Map<String, Value>> {
        match fetch_by_key(&*self.conn, self.descriptor, id)? {
            Some(row) => to_object(&row, self.descriptor),
            None => Err(BankingError::NotFound {
                entity: self.descriptor.entity,
            }),
        }
    }

    /// Validate, insert, and read the row back before committing.
    pub fn create(&mut self, payload: &Payload) -> Result<Map<String, Value>> {
        let d = self.descriptor;
        let validated = validate(payload, d, self.policy)?;
        let args = to_insert_args(&validated, d);
        let id = args[0].clone();

        let tx = self.conn.transaction()?;
        tx.execute(&d.insert_sql(), params_from_iter(args.iter()))
            .map_err(|e| write_error(e, d, &id))?;

        let Some(row) = fetch_by_key(&tx, d, &id)? else {
            warn!(entity = d.entity.singular(), id = %id, "inserted row not visible on re-read");
            return Err(BankingError::PersistFailure { entity: d.entity });
        };
        tx.commit()?;

        info!(entity = d.entity.singular(), id = %id, "created");
        to_object(&row, d)
    }

    /// Overwrite the non-key fields present in `payload`.
    pub fn update(&mut self, id: &FieldValue, payload: &Payload) -> Result<Map<String, Value>> {
        let d = self.descriptor;
        let validated = validate_update(payload, d, self.policy)?;

        let fields: Vec<_> = validated
            .iter()
            .filter_map(|(key, _)| d.field(key))
            .collect();
        let mut args: Vec<&FieldValue> = validated.iter().map(|(_, v)| v).collect();
        args.push(id);

        let tx = self.conn.transaction()?;
        let changed = tx
            .execute(&d.update_sql(&fields), params_from_iter(args))
            .map_err(|e| write_error(e, d, id))?;
        if changed == 0 {
            return Err(BankingError::NotFound { entity: d.entity });
        }

        let Some(row) = fetch_by_key(&tx, d, id)? else {
            return Err(BankingError::PersistFailure { entity: d.entity });
        };
        tx.commit()?;

        info!(entity = d.entity.singular(), id = %id, fields = fields.len(), "updated");
        to_object(&row, d)
    }

    pub fn delete(&mut self, id: &FieldValue) -> Result<()> {
        let d = self.descriptor;
        let removed = self
            .conn
            .execute(&d.delete_sql(), [id])
            .map_err(|e| match constraint_violation(&e) {
                Some(Constraint::ForeignKey) => BankingError::InUse {
                    entity: d.entity,
                    id: id.to_string(),
                },
                _ => BankingError::Store(e),
            })?;

        if removed == 0 {
            return Err(BankingError::NotFound { entity: d.entity });
        }

        info!(entity = d.entity.singular(), id = %id, "deleted");
        Ok(())
    }
}

fn fetch_by_key(
    conn: &Connection,
    descriptor: &EntityDescriptor,
    id: &FieldValue,
) -> Result<Option<Row>> {
    Ok(conn
        .query_row(&descriptor.select_by_key_sql(), [id], |row| {
            read_row(row, descriptor)
        })
        .optional()?)
}

fn write_error(err: rusqlite::Error, descriptor: &EntityDescriptor, id: &FieldValue) -> BankingError {
    match constraint_violation(&err) {
        Some(Constraint::Unique) => BankingError::Conflict {
            entity: descriptor.entity,
            id: id.to_string(),
        },
        Some(Constraint::ForeignKey) => BankingError::InvalidReference {
            entity: descriptor.entity,
        },
        _ => BankingError::Store(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::setup_database;
    use crate::schema::{Catalog, Entity, SchemaVariant};
    use serde_json::json;

    fn setup(variant: SchemaVariant) -> (Connection, Catalog) {
        let conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "foreign_keys", "ON").unwrap();
        let catalog = Catalog::new(variant);
        setup_database(&conn, &catalog).unwrap();
        (conn, catalog)
    }

    fn payload(value: Value) -> Payload {
        value.as_object().cloned().unwrap()
    }

    fn repo<'a>(conn: &'a mut Connection, catalog: &Catalog, entity: Entity) -> EntityRepository<'a> {
        EntityRepository::new(
            conn,
            catalog.descriptor(entity).unwrap(),
            ValidationPolicy::Compat,
        )
    }

    #[test]
    fn test_list_empty_table() {
        let (mut conn, catalog) = setup(SchemaVariant::A);
        let err = repo(&mut conn, &catalog, Entity::Employee).list().unwrap_err();

        assert!(matches!(err, BankingError::EmptyResult { entity: Entity::Employee }));
        assert_eq!(err.to_string(), "No employees found");
    }

    #[test]
    fn test_create_then_list_contains_row_once() {
        let (mut conn, catalog) = setup(SchemaVariant::A);
        let mut employees = repo(&mut conn, &catalog, Entity::Employee);

        let created = employees
            .create(&payload(json!({"employee_ID": 1, "name": "John Doe"})))
            .unwrap();
        employees
            .create(&payload(json!({"employee_ID": 2, "name": "Jane Smith"})))
            .unwrap();

        assert_eq!(Value::Object(created.clone()), json!({"employee_ID": 1, "name": "John Doe"}));

        let all = employees.list().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all.iter().filter(|row| **row == created).count(), 1);

        println!("✅ Create-then-list test PASSED: {} rows", all.len());
    }

    #[test]
    fn test_missing_field_inserts_nothing() {
        let (mut conn, catalog) = setup(SchemaVariant::A);
        let mut products = repo(&mut conn, &catalog, Entity::Product);

        products
            .create(&payload(json!({"product_ID": 1, "product_Type": "Bond"})))
            .unwrap();
        let before = products.list().unwrap();

        let err = products
            .create(&payload(json!({"product_ID": 2})))
            .unwrap_err();
        assert!(matches!(err, BankingError::MissingFields { .. }));
        assert_eq!(products.list().unwrap(), before);
    }

    #[test]
    fn test_duplicate_identifier_is_conflict() {
        let (mut conn, catalog) = setup(SchemaVariant::A);
        let mut employees = repo(&mut conn, &catalog, Entity::Employee);
        let body = payload(json!({"employee_ID": 1, "name": "John Doe"}));

        employees.create(&body).unwrap();
        let err = employees.create(&body).unwrap_err();

        assert!(matches!(err, BankingError::Conflict { entity: Entity::Employee, .. }));
        assert_eq!(err.to_string(), "Employee with ID 1 already exists");
        assert_eq!(employees.list().unwrap().len(), 1);

        println!("✅ Duplicate identifier test PASSED: {}", err);
    }

    #[test]
    fn test_unknown_reference_is_rejected() {
        let (mut conn, catalog) = setup(SchemaVariant::A);
        let err = repo(&mut conn, &catalog, Entity::Client)
            .create(&payload(json!({
                "client_ID": 1,
                "name": "Ada",
                "email": "ada@example.com",
                "phone": "555-0100",
                "client_Manager_Employee_ID": 42
            })))
            .unwrap_err();

        assert!(matches!(err, BankingError::InvalidReference { entity: Entity::Client }));
    }

    #[test]
    fn test_create_round_trip_matches_insert_args() {
        let (mut conn, catalog) = setup(SchemaVariant::A);
        let d = catalog.descriptor(Entity::Transaction).unwrap();

        repo(&mut conn, &catalog, Entity::Employee)
            .create(&payload(json!({"employee_ID": 1, "name": "Manager"})))
            .unwrap();
        repo(&mut conn, &catalog, Entity::Client)
            .create(&payload(json!({
                "client_ID": 1,
                "name": "Ada",
                "email": "ada@example.com",
                "phone": "555-0100",
                "client_Manager_Employee_ID": 1
            })))
            .unwrap();
        repo(&mut conn, &catalog, Entity::Product)
            .create(&payload(json!({"product_ID": 1, "product_Type": "Equity"})))
            .unwrap();

        let body = payload(json!({
            "transaction_ID": 100,
            "client_ID": 1,
            "product_ID": 1,
            "transaction_Amount": 1500.5,
            "transaction_Date": "2024-06-30"
        }));
        let created = repo(&mut conn, &catalog, Entity::Transaction)
            .create(&body)
            .unwrap();

        let validated = validate(&body, d, ValidationPolicy::Compat).unwrap();
        let as_row = to_insert_args(&validated, d);
        assert_eq!(to_object(&as_row, d).unwrap(), created);
    }

    #[test]
    fn test_get_by_identifier() {
        let (mut conn, catalog) = setup(SchemaVariant::A);
        let mut employees = repo(&mut conn, &catalog, Entity::Employee);
        employees
            .create(&payload(json!({"employee_ID": 5, "name": "Eve"})))
            .unwrap();

        let found = employees.get(&FieldValue::Integer(5)).unwrap();
        assert_eq!(found.get("name"), Some(&json!("Eve")));

        let err = employees.get(&FieldValue::Integer(6)).unwrap_err();
        assert!(matches!(err, BankingError::NotFound { .. }));
    }

    #[test]
    fn test_update_and_delete() {
        let (mut conn, catalog) = setup(SchemaVariant::A);
        let mut employees = repo(&mut conn, &catalog, Entity::Employee);
        employees
            .create(&payload(json!({"employee_ID": 1, "name": "John Doe"})))
            .unwrap();

        let updated = employees
            .update(&FieldValue::Integer(1), &payload(json!({"name": "Updated Name"})))
            .unwrap();
        assert_eq!(Value::Object(updated), json!({"employee_ID": 1, "name": "Updated Name"}));

        let err = employees
            .update(&FieldValue::Integer(999), &payload(json!({"name": "Nobody"})))
            .unwrap_err();
        assert_eq!(err.to_string(), "Employee not found");

        let err = employees
            .update(&FieldValue::Integer(1), &Payload::new())
            .unwrap_err();
        assert_eq!(err.to_string(), "Name is required");

        employees.delete(&FieldValue::Integer(1)).unwrap();
        let err = employees.delete(&FieldValue::Integer(1)).unwrap_err();
        assert!(matches!(err, BankingError::NotFound { entity: Entity::Employee }));
    }

    #[test]
    fn test_delete_referenced_employee_is_blocked() {
        let (mut conn, catalog) = setup(SchemaVariant::A);
        repo(&mut conn, &catalog, Entity::Employee)
            .create(&payload(json!({"employee_ID": 1, "name": "Manager"})))
            .unwrap();
        repo(&mut conn, &catalog, Entity::Client)
            .create(&payload(json!({
                "client_ID": 1,
                "name": "Ada",
                "email": "ada@example.com",
                "phone": "555-0100",
                "client_Manager_Employee_ID": 1
            })))
            .unwrap();

        let err = repo(&mut conn, &catalog, Entity::Employee)
            .delete(&FieldValue::Integer(1))
            .unwrap_err();
        assert!(matches!(err, BankingError::InUse { .. }));
    }

    #[test]
    fn test_variant_b_cash_flow() {
        let (mut conn, catalog) = setup(SchemaVariant::B);
        repo(&mut conn, &catalog, Entity::Employee)
            .create(&payload(json!({"employee_ID": 1})))
            .unwrap();
        repo(&mut conn, &catalog, Entity::Client)
            .create(&payload(json!({
                "client_ID": 1,
                "address": "1 Bank St",
                "client_Manager_Employee_ID": 1
            })))
            .unwrap();

        let flow = repo(&mut conn, &catalog, Entity::CashFlow)
            .create(&payload(json!({"cash_Flow_ID": 1, "client_ID": 1})))
            .unwrap();
        assert_eq!(Value::Object(flow), json!({"cash_Flow_ID": 1, "client_ID": 1}));
    }

    #[test]
    fn test_invisible_insert_is_persist_failure() {
        let (mut conn, catalog) = setup(SchemaVariant::A);
        // the insert "succeeds" but no row is written
        conn.execute_batch(
            "CREATE TRIGGER swallow_products BEFORE INSERT ON Products
             BEGIN SELECT RAISE(IGNORE); END;",
        )
        .unwrap();

        let mut products = repo(&mut conn, &catalog, Entity::Product);
        let err = products
            .create(&payload(json!({"product_ID": 1, "product_Type": "Bond"})))
            .unwrap_err();

        assert!(matches!(err, BankingError::PersistFailure { entity: Entity::Product }));
        assert_eq!(err.to_string(), "Failed to retrieve the added product");
        assert!(matches!(
            products.list().unwrap_err(),
            BankingError::EmptyResult { entity: Entity::Product }
        ));
    }
}
