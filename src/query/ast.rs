//! Syntax tree consumed by the analyzer.
//!
//! The parser in [`crate::syntax`] produces these structures, but callers may
//! also assemble them directly. Identifiers are unresolved here; the analyzer
//! binds them against the program's symbol table.

use crate::relation::ColumnType;

/// Identifier bound by an assignment (`Emp = ...`).
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Ident(pub String);

impl Ident {
    /// Identifier text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Ident {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Literal value written inside a `TABLE [...]` expression.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Literal {
    /// Integer literal.
    Int(i64),
    /// String literal.
    String(String),
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

/// `name:type` entry of a schema literal.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ColumnDef {
    /// Column name.
    pub name: String,
    /// Declared type.
    pub ty: ColumnType,
}

impl ColumnDef {
    /// Creates a column definition.
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// One side of a `JOIN`: an identifier and the attributes it joins on.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct JoinArg {
    /// Relation being joined; also the prefix of its output columns.
    pub ident: Ident,
    /// Join attributes, positionally paired with the other side.
    pub columns: Vec<String>,
}

/// Binary multiset operators sharing one shape.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SetOp {
    /// Multiset sum.
    Union,
    /// Multiset minimum.
    Intersect,
    /// Multiset difference.
    Diff,
}

/// Relational expression.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Expr {
    /// `LOAD "<path>" AS <schema>`.
    Load {
        /// Path of the tab-delimited input file.
        path: String,
        /// Declared schema.
        schema: Vec<ColumnDef>,
    },
    /// `TABLE [ (...), ... ] AS <schema>`.
    Table {
        /// Literal rows.
        rows: Vec<Vec<Literal>>,
        /// Declared schema.
        schema: Vec<ColumnDef>,
    },
    /// Bare identifier.
    Alias(Ident),
    /// `DISTINCT <expr>`.
    Distinct(Box<Expr>),
    /// `LIMIT <id>, <n>`.
    Limit {
        /// Input relation.
        input: Ident,
        /// Maximum number of tuples.
        count: u64,
    },
    /// `UNION|INTERSECT|DIFF <id>, <id>`.
    SetOp {
        /// Operator.
        op: SetOp,
        /// Left operand.
        left: Ident,
        /// Right operand.
        right: Ident,
    },
    /// `FOREACH <id> EMIT (<col>, ...) [AS <schema>]`.
    Foreach {
        /// Input relation.
        input: Ident,
        /// Emitted columns, duplicates and reordering allowed.
        columns: Vec<String>,
        /// Optional rename schema.
        rename: Option<Vec<ColumnDef>>,
    },
    /// `JOIN <id> BY (...), <id> BY (...)`.
    Join {
        /// Left side.
        left: JoinArg,
        /// Right side.
        right: JoinArg,
    },
}

impl Expr {
    /// Shorthand for [`Expr::Alias`].
    pub fn alias(name: &str) -> Self {
        Expr::Alias(Ident::from(name))
    }

    /// Shorthand for [`Expr::Distinct`].
    pub fn distinct(inner: Expr) -> Self {
        Expr::Distinct(Box::new(inner))
    }

    /// Shorthand for [`Expr::SetOp`].
    pub fn set_op(op: SetOp, left: &str, right: &str) -> Self {
        Expr::SetOp {
            op,
            left: Ident::from(left),
            right: Ident::from(right),
        }
    }
}

/// Top-level program statement.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Statement {
    /// `<id> = <expr>;`
    Assign {
        /// Identifier being (re)bound.
        target: Ident,
        /// Bound expression.
        expr: Expr,
    },
    /// `DUMP <expr>;`
    Dump(Expr),
    /// `DESCRIBE <id>;`
    Describe(Ident),
    /// `EXPLAIN <id>;`
    Explain(Ident),
    /// `DO <statement>* WHILE <expr>;`
    DoWhile {
        /// Loop body.
        body: Vec<Statement>,
        /// Loop continues while this evaluates to a non-empty bag.
        condition: Expr,
    },
}

impl Statement {
    /// Shorthand for [`Statement::Assign`].
    pub fn assign(target: &str, expr: Expr) -> Self {
        Statement::Assign {
            target: Ident::from(target),
            expr,
        }
    }
}
