//! Schema Generator: object definitions -> deterministic table schemas and DDL.

mod ddl;
mod generator;
mod init;
mod order;
mod types;

pub use ddl::{create_index, create_table, create_trigger, render_ddl, render_statements};
pub use generator::{
    generate_schema, schema_version, sql_type_for, SchemaGenerator, CREATED_AT_COLUMN, ID_COLUMN, SYSTEM_COLUMNS,
    UPDATED_AT_COLUMN,
};
pub use init::TableInitializer;
pub use order::order_by_dependencies;
pub use types::*;
