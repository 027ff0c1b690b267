//! Safe SQL builder: identifiers from definitions only, values as parameters.

mod builder;
pub mod filter;
pub mod params;
pub use builder::*;
pub use filter::{parse_order_by, parse_where, Operator, OrderBy, Predicate};
pub use params::*;
