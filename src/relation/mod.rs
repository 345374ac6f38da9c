#![forbid(unsafe_code)]

//! Relational data model: column types, schemas, tuples, and bags.
//!
//! Schemas are ordered lists of uniquely named columns. Compatibility between
//! schemas only looks at arity and column types, which is what set operations,
//! rename targets, and store inserts require.

/// Schema catalog operations.
pub mod schema;

/// Typed atoms and tuples.
pub mod tuple;

/// Tuple multisets.
pub mod bag;

pub use bag::Bag;
pub use schema::{Column, ColumnType, Schema};
pub use tuple::{Atom, Tuple, FIELD_DELIMITER};
