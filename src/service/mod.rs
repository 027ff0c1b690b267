//! Collection query engine over an injected SQL executor.

mod collection;
mod eager;
mod executor;
mod instance;
mod validation;
pub use collection::{Collection, GetFilter, ListOptions, UpsertAction};
pub use executor::{Row, SqlExecutor, SqliteExecutor};
pub use instance::{hydrate_row, hydrate_value, normalize_datetime, Instance, Related};
pub use validation::RequestValidator;
