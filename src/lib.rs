//! Object SDK: object definitions to relational schema, a collection query engine, and API manifests.

pub mod case;
pub mod definition;
pub mod error;
pub mod handlers;
pub mod manifest;
pub mod registry;
pub mod response;
pub mod routes;
pub mod schema;
pub mod service;
pub mod settings;
pub mod sql;
pub mod state;

pub use definition::{load_manifest, parse_manifest, FieldDefinition, FieldType, Manifest, ObjectDefinition};
pub use error::{AppError, ConfigError, QueryError};
pub use manifest::ManifestGenerator;
pub use registry::{extract_fields, register_from_sample, MetadataRegistry};
pub use response::{success_many, success_one, success_one_ok};
pub use routes::{app_router, collection_routes, common_routes, manifest_routes};
pub use schema::{order_by_dependencies, render_ddl, SchemaDefinition, SchemaGenerator, TableInitializer};
pub use service::{Collection, GetFilter, Instance, ListOptions, Related, SqlExecutor, SqliteExecutor, UpsertAction};
pub use settings::Settings;
pub use state::AppState;
