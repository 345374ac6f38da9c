//! Bag-semantics relational query engine.
//!
//! A program is a sequence of statements over named relations. The
//! [`syntax`] layer parses program text, [`query::analyze`] turns each
//! expression into a schema-checked [`query::PlanNode`], and
//! [`query::Executor`] evaluates plans as pull-based tuple streams against a
//! keyed relation store. [`query::Driver`] ties these together, including
//! `DO ... WHILE` fixpoint loops and the eager/lazy binding modes.
//!
//! ```
//! use myrial::query::{Driver, DriverOptions, ExecutorOptions, Output};
//!
//! let mut driver = Driver::new(DriverOptions::default(), ExecutorOptions::default());
//! let mut out: Vec<Output> = Vec::new();
//! driver
//!     .run_source(
//!         "T = TABLE [(1, 1), (1, 1), (2, 2)] AS (a:int, b:int); DUMP DISTINCT T;",
//!         &mut out,
//!     )
//!     .unwrap();
//! assert_eq!(out[0].to_string(), "[(1, 1),(2, 2)]");
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod logging;
pub mod query;
pub mod relation;
pub mod syntax;

pub use error::{ErrorKind, MyrialError, Result};
