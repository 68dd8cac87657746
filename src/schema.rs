// 📐 Shape Layer - Entity Descriptors
// Static description of every banking table: fields, column order, keys

use rusqlite::types::{ToSql, ToSqlOutput};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// ENTITIES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    Employee,
    Client,
    Product,
    Transaction,
    CashFlow,
}

impl Entity {
    /// Capitalized name used at the start of error messages
    pub fn name(&self) -> &'static str {
        match self {
            Entity::Employee => "Employee",
            Entity::Client => "Client",
            Entity::Product => "Product",
            Entity::Transaction => "Transaction",
            Entity::CashFlow => "Cash flow",
        }
    }

    pub fn singular(&self) -> &'static str {
        match self {
            Entity::Employee => "employee",
            Entity::Client => "client",
            Entity::Product => "product",
            Entity::Transaction => "transaction",
            Entity::CashFlow => "cash flow",
        }
    }

    pub fn plural(&self) -> &'static str {
        match self {
            Entity::Employee => "employees",
            Entity::Client => "clients",
            Entity::Product => "products",
            Entity::Transaction => "transactions",
            Entity::CashFlow => "cash flows",
        }
    }
}

// ============================================================================
// SCHEMA VARIANTS
// ============================================================================

/// The two table layouts served under the same route names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaVariant {
    /// Employees with names, clients with contact details, amounts on transactions
    #[default]
    A,
    /// Clients with address/bank references, richer transactions, cash flows
    B,
}

impl FromStr for SchemaVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a" => Ok(SchemaVariant::A),
            "b" => Ok(SchemaVariant::B),
            other => Err(format!("unknown schema variant '{}' (expected 'a' or 'b')", other)),
        }
    }
}

impl fmt::Display for SchemaVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaVariant::A => write!(f, "a"),
            SchemaVariant::B => write!(f, "b"),
        }
    }
}

// ============================================================================
// FIELD TYPES & VALUES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Integer,
    Real,
    Text,
    /// ISO-8601 calendar date, stored as `YYYY-MM-DD` text
    Date,
}

impl FieldType {
    pub fn sql_type(&self) -> &'static str {
        match self {
            FieldType::Integer => "INTEGER",
            FieldType::Real => "REAL",
            FieldType::Text | FieldType::Date => "TEXT",
        }
    }
}

/// A single column value, typed the way the store holds it
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl FieldValue {
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Null => Value::Null,
            FieldValue::Integer(i) => Value::from(*i),
            FieldValue::Real(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            FieldValue::Text(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, "null"),
            FieldValue::Integer(i) => write!(f, "{}", i),
            FieldValue::Real(r) => write!(f, "{}", r),
            FieldValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl ToSql for FieldValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            FieldValue::Null => ToSqlOutput::from(rusqlite::types::Null),
            FieldValue::Integer(i) => ToSqlOutput::from(*i),
            FieldValue::Real(f) => ToSqlOutput::from(*f),
            FieldValue::Text(s) => ToSqlOutput::from(s.as_str()),
        })
    }
}

// ============================================================================
// FIELD & ENTITY DESCRIPTORS
// ============================================================================

/// Foreign key target (table + key column)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Reference {
    pub table: &'static str,
    pub column: &'static str,
}

const EMPLOYEES: Reference = Reference { table: "Employees", column: "Employee_ID" };
const CLIENTS: Reference = Reference { table: "Clients", column: "Client_ID" };
const PRODUCTS: Reference = Reference { table: "Products", column: "Product_ID" };

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FieldDef {
    /// JSON key used in request and response bodies
    pub key: &'static str,
    /// SQL column name
    pub column: &'static str,
    pub field_type: FieldType,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub references: Option<Reference>,
}

impl FieldDef {
    const fn new(key: &'static str, column: &'static str, field_type: FieldType) -> Self {
        FieldDef {
            key,
            column,
            field_type,
            required: true,
            references: None,
        }
    }

    const fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    const fn references(mut self, target: Reference) -> Self {
        self.references = Some(target);
        self
    }
}

/// Everything the validator, row mapper and repository need to know about a table.
///
/// `fields` is in SELECT/INSERT column order and the first field is always
/// the identifier.
#[derive(Debug, Serialize)]
pub struct EntityDescriptor {
    pub entity: Entity,
    pub table: &'static str,
    /// Route segment, e.g. `employees` for `/employees`
    pub path: &'static str,
    pub fields: &'static [FieldDef],
    /// Error body when a create payload lacks required fields
    pub missing_message: &'static str,
    /// Error body when an update payload carries no updatable field
    pub update_message: &'static str,
    /// Whether update/delete by identifier are exposed
    pub mutable: bool,
}

impl EntityDescriptor {
    pub fn key(&self) -> &FieldDef {
        &self.fields[0]
    }

    pub fn field(&self, key: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.key == key)
    }

    pub fn arity(&self) -> usize {
        self.fields.len()
    }

    /// Non-key fields (the ones an update may touch)
    pub fn updatable_fields(&self) -> &[FieldDef] {
        &self.fields[1..]
    }

    fn column_list(&self) -> String {
        self.fields
            .iter()
            .map(|f| f.column)
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn select_sql(&self) -> String {
        format!("SELECT {} FROM {}", self.column_list(), self.table)
    }

    pub fn select_by_key_sql(&self) -> String {
        format!("{} WHERE {} = ?1", self.select_sql(), self.key().column)
    }

    pub fn insert_sql(&self) -> String {
        let placeholders = (1..=self.arity())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table,
            self.column_list(),
            placeholders
        )
    }

    /// UPDATE statement for the given columns; the key binds last
    pub fn update_sql(&self, fields: &[&FieldDef]) -> String {
        let assignments = fields
            .iter()
            .enumerate()
            .map(|(i, f)| format!("{} = ?{}", f.column, i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "UPDATE {} SET {} WHERE {} = ?{}",
            self.table,
            assignments,
            self.key().column,
            fields.len() + 1
        )
    }

    pub fn delete_sql(&self) -> String {
        format!("DELETE FROM {} WHERE {} = ?1", self.table, self.key().column)
    }

    pub fn create_table_sql(&self) -> String {
        let mut lines: Vec<String> = self
            .fields
            .iter()
            .enumerate()
            .map(|(i, f)| {
                let mut line = format!("{} {}", f.column, f.field_type.sql_type());
                if i == 0 {
                    line.push_str(" PRIMARY KEY");
                } else if f.required {
                    line.push_str(" NOT NULL");
                }
                line
            })
            .collect();

        for f in self.fields.iter() {
            if let Some(target) = f.references {
                lines.push(format!(
                    "FOREIGN KEY ({}) REFERENCES {}({})",
                    f.column, target.table, target.column
                ));
            }
        }

        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
            self.table,
            lines.join(",\n    ")
        )
    }
}

// ============================================================================
// VARIANT A
// ============================================================================

const MISSING_FIELDS: &str = "Missing required fields";
const NO_UPDATES: &str = "At least one field is required";

static VARIANT_A: [EntityDescriptor; 4] = [
    EntityDescriptor {
        entity: Entity::Employee,
        table: "Employees",
        path: "employees",
        fields: &[
            FieldDef::new("employee_ID", "Employee_ID", FieldType::Integer),
            FieldDef::new("name", "Name", FieldType::Text),
        ],
        missing_message: "Employee ID and name are required",
        update_message: "Name is required",
        mutable: true,
    },
    EntityDescriptor {
        entity: Entity::Client,
        table: "Clients",
        path: "clients",
        fields: &[
            FieldDef::new("client_ID", "Client_ID", FieldType::Integer),
            FieldDef::new("name", "Name", FieldType::Text),
            FieldDef::new("email", "Email", FieldType::Text),
            FieldDef::new("phone", "Phone", FieldType::Text),
            FieldDef::new(
                "client_Manager_Employee_ID",
                "Client_Manager_Employee_ID",
                FieldType::Integer,
            )
            .references(EMPLOYEES),
        ],
        missing_message: MISSING_FIELDS,
        update_message: NO_UPDATES,
        mutable: false,
    },
    EntityDescriptor {
        entity: Entity::Product,
        table: "Products",
        path: "products",
        fields: &[
            FieldDef::new("product_ID", "Product_ID", FieldType::Integer),
            FieldDef::new("product_Type", "Product_Type", FieldType::Text),
        ],
        missing_message: MISSING_FIELDS,
        update_message: NO_UPDATES,
        mutable: false,
    },
    EntityDescriptor {
        entity: Entity::Transaction,
        table: "Transactions",
        path: "transactions",
        fields: &[
            FieldDef::new("transaction_ID", "Transaction_ID", FieldType::Integer),
            FieldDef::new("client_ID", "Client_ID", FieldType::Integer).references(CLIENTS),
            FieldDef::new("product_ID", "Product_ID", FieldType::Integer).references(PRODUCTS),
            FieldDef::new("transaction_Amount", "Transaction_Amount", FieldType::Real),
            FieldDef::new("transaction_Date", "Transaction_Date", FieldType::Date),
        ],
        missing_message: MISSING_FIELDS,
        update_message: NO_UPDATES,
        mutable: false,
    },
];

// ============================================================================
// VARIANT B
// ============================================================================

static VARIANT_B: [EntityDescriptor; 5] = [
    EntityDescriptor {
        entity: Entity::Employee,
        table: "Employees",
        path: "employees",
        fields: &[FieldDef::new("employee_ID", "Employee_ID", FieldType::Integer)],
        missing_message: "Employee ID is required",
        update_message: "Employee has no updatable fields",
        mutable: true,
    },
    EntityDescriptor {
        entity: Entity::Client,
        table: "Clients",
        path: "clients",
        fields: &[
            FieldDef::new("client_ID", "Client_ID", FieldType::Integer),
            FieldDef::new("address", "Address", FieldType::Text),
            FieldDef::new("bank_Reference", "Bank_Reference", FieldType::Text).optional(),
            FieldDef::new(
                "client_Manager_Employee_ID",
                "Client_Manager_Employee_ID",
                FieldType::Integer,
            )
            .references(EMPLOYEES),
        ],
        missing_message: MISSING_FIELDS,
        update_message: NO_UPDATES,
        mutable: false,
    },
    EntityDescriptor {
        entity: Entity::Product,
        table: "Products",
        path: "products",
        fields: &[
            FieldDef::new("product_ID", "Product_ID", FieldType::Integer),
            FieldDef::new("product_Type", "Product_Type", FieldType::Text),
        ],
        missing_message: MISSING_FIELDS,
        update_message: NO_UPDATES,
        mutable: false,
    },
    EntityDescriptor {
        entity: Entity::Transaction,
        table: "Transactions",
        path: "transactions",
        fields: &[
            FieldDef::new("transaction_ID", "Transaction_ID", FieldType::Integer),
            FieldDef::new("client_ID", "Client_ID", FieldType::Integer).references(CLIENTS),
            FieldDef::new("product_ID", "Product_ID", FieldType::Integer).references(PRODUCTS),
            // contacts and partners live outside this schema; no FK
            FieldDef::new("contact_ID", "Contact_ID", FieldType::Integer),
            FieldDef::new("employee_ID", "Employee_ID", FieldType::Integer).references(EMPLOYEES),
            FieldDef::new("partner_ID", "Partner_ID", FieldType::Integer),
            FieldDef::new("stock_Symbol", "Stock_Symbol", FieldType::Text),
            FieldDef::new("transaction_Date", "Transaction_Date", FieldType::Date),
            FieldDef::new("transaction_Type", "Transaction_Type", FieldType::Text),
        ],
        missing_message: MISSING_FIELDS,
        update_message: NO_UPDATES,
        mutable: false,
    },
    EntityDescriptor {
        entity: Entity::CashFlow,
        table: "Cash_Flows",
        path: "cash_flows",
        fields: &[
            FieldDef::new("cash_Flow_ID", "Cash_Flow_ID", FieldType::Integer),
            FieldDef::new("client_ID", "Client_ID", FieldType::Integer).references(CLIENTS),
        ],
        missing_message: MISSING_FIELDS,
        update_message: NO_UPDATES,
        mutable: false,
    },
];

// ============================================================================
// CATALOG
// ============================================================================

/// The descriptor set for one schema variant
#[derive(Debug, Clone, Copy)]
pub struct Catalog {
    variant: SchemaVariant,
    descriptors: &'static [EntityDescriptor],
}

impl Catalog {
    pub fn new(variant: SchemaVariant) -> Self {
        let descriptors: &'static [EntityDescriptor] = match variant {
            SchemaVariant::A => &VARIANT_A,
            SchemaVariant::B => &VARIANT_B,
        };
        Catalog {
            variant,
            descriptors,
        }
    }

    pub fn variant(&self) -> SchemaVariant {
        self.variant
    }

    pub fn descriptors(&self) -> &'static [EntityDescriptor] {
        self.descriptors
    }

    pub fn descriptor(&self, entity: Entity) -> Option<&'static EntityDescriptor> {
        self.descriptors.iter().find(|d| d.entity == entity)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new(SchemaVariant::default())
    }
}
