// Private Banking - Core Library
// Exposes all modules for use in the admin CLI, the API server, and tests

pub mod schema;     // Entity descriptors for both schema variants
pub mod validator;  // Required fields + type coercion
pub mod mapper;     // Rows <-> JSON objects
pub mod db;         // Store handle, schema setup, constraint classification
pub mod repository; // Per-entity SELECT/INSERT/UPDATE/DELETE
pub mod api;        // Axum routes
pub mod config;
pub mod error;

// Re-export commonly used types
pub use api::{router, AppState, BANNER};
pub use config::{Config, ConfigError};
pub use db::{setup_database, table_counts, Store};
pub use error::{BankingError, Result};
pub use mapper::{read_row, to_insert_args, to_object, Row};
pub use repository::EntityRepository;
pub use schema::{
    Catalog, Entity, EntityDescriptor, FieldDef, FieldType, FieldValue, SchemaVariant,
};
pub use validator::{validate, validate_update, Payload, ValidatedFields, ValidationPolicy};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
