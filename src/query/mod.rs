#![forbid(unsafe_code)]

//! Query analysis, planning, and evaluation.
//!
//! Programs flow through this module as syntax trees ([`ast`]), which the
//! analyzer turns into shared logical plans ([`logical`]); the executor
//! evaluates those plans against a relation store, and the driver sequences
//! statements and fixpoint loops.

/// Syntax tree consumed by the analyzer.
pub mod ast;

/// Semantic analysis and the program symbol table.
pub mod analyze;

/// Statement driver and fixpoint loops.
///
/// Owns the symbol table and executor for one program run.
pub mod driver;

/// Plan evaluation over pull-based tuple streams.
pub mod executor;

/// Explain trees for `EXPLAIN`.
pub mod explain;

/// Logical plan representation.
pub mod logical;

/// Keyed relation storage.
pub mod store;

pub use analyze::{analyze, Analyzer, Bindings};
pub use driver::{Driver, DriverOptions, EvalMode, Output, OutputSink};
pub use executor::{Executor, ExecutorOptions, Pass, ResultStream, TupleStream};
pub use explain::{ExplainNode, PlanExplain};
pub use logical::{LogicalOp, PlanNode, PlanRef, RelationKey};
pub use store::{MemoryStore, RelationStore, StoredRelation};
