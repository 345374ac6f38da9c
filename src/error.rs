//! Error taxonomy shared by the analyzer, evaluator, store, and syntax layer.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::relation::ColumnType;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MyrialError>;

/// Errors raised while building or running a program.
///
/// Schema and column problems are detected while plan nodes are constructed,
/// so a query either fails before producing output or runs to completion.
/// Load failures and missing relations surface while a statement evaluates.
#[derive(Debug, Error)]
pub enum MyrialError {
    /// Two schemas that must line up differ in arity or per-position type.
    #[error("schema {left} is not compatible with {right}")]
    SchemaCompatibility {
        /// Rendered left-hand schema.
        left: String,
        /// Rendered right-hand schema.
        right: String,
    },
    /// Join arguments named a different number of attributes on each side.
    #[error("join attribute lists differ in length ({left} vs {right})")]
    JoinArity {
        /// Attribute count on the left side.
        left: usize,
        /// Attribute count on the right side.
        right: usize,
    },
    /// Join attributes were paired across columns of different types.
    #[error("join attributes '{left}' ({left_type}) and '{right}' ({right_type}) differ in type")]
    JoinTypeMismatch {
        /// Left column name.
        left: String,
        /// Left column type.
        left_type: ColumnType,
        /// Right column name.
        right: String,
        /// Right column type.
        right_type: ColumnType,
    },
    /// A referenced column name is absent from the schema.
    #[error("no column '{column}' in schema {schema}")]
    NoSuchColumn {
        /// Column that could not be resolved.
        column: String,
        /// Rendered schema that was searched.
        schema: String,
    },
    /// A schema would contain the same column name twice.
    #[error("duplicate column '{column}'")]
    DuplicateColumn {
        /// Repeated column name.
        column: String,
    },
    /// A tuple disagrees with its schema in arity or atom type.
    #[error("tuple does not match schema: {reason}")]
    TupleType {
        /// Human readable description of the mismatch.
        reason: String,
    },
    /// A column definition string could not be parsed.
    #[error("invalid column definition: {0}")]
    ColumnDefinition(String),
    /// An identifier has no binding in the current symbol table.
    #[error("unknown symbol '{name}'")]
    UnknownSymbol {
        /// Identifier that was referenced.
        name: String,
    },
    /// A scan referenced a relation key absent from the store.
    #[error("unknown relation {key}")]
    UnknownRelation {
        /// Rendered relation key.
        key: String,
    },
    /// A plan node was assembled with the wrong inputs for its operator.
    #[error("invalid plan: {0}")]
    InvalidPlan(&'static str),
    /// A single-pass tuple stream was asked to rewind.
    #[error("{0} stream cannot be restarted")]
    NotRestartable(&'static str),
    /// The program text could not be parsed.
    #[error("syntax error at {line}:{column}: {message}")]
    Syntax {
        /// 1-based line of the offending token.
        line: usize,
        /// 1-based column of the offending token.
        column: usize,
        /// Description of what was expected.
        message: String,
    },
    /// An input relation file could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Load {
        /// File that failed to open or read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// Program output could not be written.
    #[error("failed to write output: {0}")]
    Output(#[source] io::Error),
    /// A DO ... WHILE loop exceeded the configured iteration cap.
    #[error("loop did not converge within {limit} iterations")]
    IterationLimit {
        /// Configured cap.
        limit: u64,
    },
}

/// Coarse classification of [`MyrialError`] variants.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ErrorKind {
    /// Schemas, join attributes, or rename targets fail to line up.
    SchemaCompatibility,
    /// A column name could not be resolved.
    NoSuchColumn,
    /// A tuple disagrees with its schema.
    TupleType,
    /// An identifier or relation key is unbound.
    UnknownSymbol,
    /// Program text was rejected by the parser.
    Syntax,
    /// Input files could not be read.
    Io,
    /// Plan assembly or stream misuse.
    Plan,
    /// Configured resource limits were exceeded.
    Limit,
}

impl ErrorKind {
    /// Returns a machine-readable code for the kind.
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::SchemaCompatibility => "SchemaCompatibilityError",
            ErrorKind::NoSuchColumn => "NoSuchColumnError",
            ErrorKind::TupleType => "TupleTypeError",
            ErrorKind::UnknownSymbol => "UnknownSymbolError",
            ErrorKind::Syntax => "SyntaxError",
            ErrorKind::Io => "IoError",
            ErrorKind::Plan => "PlanError",
            ErrorKind::Limit => "LimitError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl MyrialError {
    /// Classifies the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MyrialError::SchemaCompatibility { .. }
            | MyrialError::JoinArity { .. }
            | MyrialError::JoinTypeMismatch { .. }
            | MyrialError::DuplicateColumn { .. } => ErrorKind::SchemaCompatibility,
            MyrialError::NoSuchColumn { .. } => ErrorKind::NoSuchColumn,
            MyrialError::TupleType { .. } => ErrorKind::TupleType,
            MyrialError::UnknownSymbol { .. } | MyrialError::UnknownRelation { .. } => {
                ErrorKind::UnknownSymbol
            }
            MyrialError::Syntax { .. } | MyrialError::ColumnDefinition(_) => ErrorKind::Syntax,
            MyrialError::Load { .. } | MyrialError::Output(_) => ErrorKind::Io,
            MyrialError::InvalidPlan(_) | MyrialError::NotRestartable(_) => ErrorKind::Plan,
            MyrialError::IterationLimit { .. } => ErrorKind::Limit,
        }
    }

    /// Returns the machine-readable code of the error's kind.
    pub fn code(&self) -> &'static str {
        self.kind().code()
    }

    /// Builds a [`MyrialError::TupleType`] from any displayable reason.
    pub fn tuple_type(reason: impl Into<String>) -> Self {
        MyrialError::TupleType {
            reason: reason.into(),
        }
    }

    /// Builds a [`MyrialError::UnknownSymbol`] for an identifier.
    pub fn unknown_symbol(name: impl Into<String>) -> Self {
        MyrialError::UnknownSymbol { name: name.into() }
    }
}
