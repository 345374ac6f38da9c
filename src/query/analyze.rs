#![forbid(unsafe_code)]

//! Semantic analysis: syntax-tree expressions to validated plan nodes.
//!
//! Identifiers resolve through [`Bindings`], the per-program symbol table.
//! Every schema, column, and type check happens here (or in the plan node
//! constructors it calls), so a malformed expression fails before any
//! evaluation runs.

use std::collections::HashMap;

use crate::error::{MyrialError, Result};
use crate::query::ast::{ColumnDef, Expr, Ident, JoinArg, Literal, SetOp};
use crate::query::logical::{PlanNode, PlanRef};
use crate::relation::{Atom, Column, Schema, Tuple};

/// Symbol table mapping identifiers to plan nodes.
///
/// Rebinding an identifier overwrites the previous entry. Cloning is cheap:
/// it copies the map of shared node handles, which is how the driver takes
/// a snapshot at the end of a loop iteration.
#[derive(Clone, Debug, Default)]
pub struct Bindings {
    symbols: HashMap<String, PlanRef>,
}

impl Bindings {
    /// Creates an empty symbol table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `ident` to `node`, returning the previous binding.
    pub fn bind(&mut self, ident: &Ident, node: PlanRef) -> Option<PlanRef> {
        self.symbols.insert(ident.as_str().to_owned(), node)
    }

    /// Node bound to `ident`.
    pub fn resolve(&self, ident: &Ident) -> Result<PlanRef> {
        self.symbols
            .get(ident.as_str())
            .cloned()
            .ok_or_else(|| MyrialError::unknown_symbol(ident.as_str()))
    }

    /// Whether `ident` is bound.
    pub fn contains(&self, ident: &Ident) -> bool {
        self.symbols.contains_key(ident.as_str())
    }

    /// Number of bound identifiers.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Whether nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Point-in-time copy of the table.
    pub fn snapshot(&self) -> Bindings {
        self.clone()
    }
}

/// Translates expressions against one symbol table.
pub struct Analyzer<'b> {
    bindings: &'b Bindings,
}

/// Analyzes `expr` against `bindings`.
pub fn analyze(expr: &Expr, bindings: &Bindings) -> Result<PlanRef> {
    Analyzer::new(bindings).expr(expr)
}

impl<'b> Analyzer<'b> {
    /// Creates an analyzer reading from `bindings`.
    pub fn new(bindings: &'b Bindings) -> Self {
        Self { bindings }
    }

    /// Builds the plan for `expr`.
    pub fn expr(&self, expr: &Expr) -> Result<PlanRef> {
        match expr {
            Expr::Load { path, schema } => Ok(PlanNode::load(path, schema_from_defs(schema)?)),
            Expr::Table { rows, schema } => {
                let schema = schema_from_defs(schema)?;
                let tuples = rows.iter().map(|row| tuple_from_literals(row)).collect();
                PlanNode::table(tuples, schema)
            }
            Expr::Alias(ident) => self.bindings.resolve(ident),
            Expr::Distinct(inner) => PlanNode::distinct(self.expr(inner)?),
            Expr::Limit { input, count } => {
                PlanNode::limit(self.bindings.resolve(input)?, *count)
            }
            Expr::SetOp { op, left, right } => {
                let left = self.bindings.resolve(left)?;
                let right = self.bindings.resolve(right)?;
                match op {
                    SetOp::Union => PlanNode::union(left, right),
                    SetOp::Intersect => PlanNode::intersect(left, right),
                    SetOp::Diff => PlanNode::diff(left, right),
                }
            }
            Expr::Foreach {
                input,
                columns,
                rename,
            } => self.foreach(input, columns, rename.as_deref()),
            Expr::Join { left, right } => self.join(left, right),
        }
    }

    fn foreach(
        &self,
        input: &Ident,
        columns: &[String],
        rename: Option<&[ColumnDef]>,
    ) -> Result<PlanRef> {
        let node = self.bindings.resolve(input)?;
        let indexes = columns
            .iter()
            .map(|name| node.schema().column_index(name))
            .collect::<Result<Vec<_>>>()?;
        let rename = rename.map(schema_from_defs).transpose()?;
        PlanNode::foreach(node, indexes, rename)
    }

    fn join(&self, left: &JoinArg, right: &JoinArg) -> Result<PlanRef> {
        if left.columns.len() != right.columns.len() {
            return Err(MyrialError::JoinArity {
                left: left.columns.len(),
                right: right.columns.len(),
            });
        }
        let lnode = self.bindings.resolve(&left.ident)?;
        let rnode = self.bindings.resolve(&right.ident)?;
        let offset = lnode.schema().len();
        let attributes = left
            .columns
            .iter()
            .zip(&right.columns)
            .map(|(lc, rc)| {
                let l = lnode.schema().column_index(lc)?;
                let r = rnode.schema().column_index(rc)?;
                Ok((l, r + offset))
            })
            .collect::<Result<Vec<_>>>()?;
        PlanNode::join(
            lnode,
            rnode,
            attributes,
            [left.ident.as_str(), right.ident.as_str()],
        )
    }
}

/// Builds a schema from parsed column definitions.
pub fn schema_from_defs(defs: &[ColumnDef]) -> Result<Schema> {
    Schema::new(
        defs.iter()
            .map(|def| Column::new(def.name.clone(), def.ty))
            .collect(),
    )
}

fn tuple_from_literals(row: &[Literal]) -> Tuple {
    row.iter()
        .map(|lit| match lit {
            Literal::Int(v) => Atom::Int(*v),
            Literal::String(s) => Atom::String(s.clone()),
        })
        .collect::<Vec<_>>()
        .into()
}
