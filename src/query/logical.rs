//! Logical plan nodes produced by the analyzer and consumed by the executor.
//!
//! Nodes are immutable and reference-counted: binding one identifier twice
//! reuses the same node, so a program's plans form a DAG. Every constructor
//! validates its inputs and fixes the output schema up front; the executor
//! never re-derives a schema from a node's children.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{MyrialError, Result};
use crate::query::store::RelationStore;
use crate::relation::{Column, Schema, Tuple};

/// Shared handle to a plan node.
pub type PlanRef = Arc<PlanNode>;

/// Identifies a relation held by a [`RelationStore`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelationKey {
    /// Owning user.
    pub owner: String,
    /// Program (run) namespace.
    pub program: String,
    /// Relation name within the program.
    pub relation: String,
}

impl RelationKey {
    /// Creates a key from its three components.
    pub fn new(
        owner: impl Into<String>,
        program: impl Into<String>,
        relation: impl Into<String>,
    ) -> Self {
        Self {
            owner: owner.into(),
            program: program.into(),
            relation: relation.into(),
        }
    }
}

impl fmt::Display for RelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.owner, self.program, self.relation)
    }
}

/// Closed set of logical operators.
#[derive(Clone, Debug)]
pub enum LogicalOp {
    /// Reads a tab-delimited file.
    Load {
        /// Input path.
        path: PathBuf,
    },
    /// Replays literal tuples already validated against the schema.
    Table {
        /// Literal tuples in input order.
        tuples: Arc<[Tuple]>,
    },
    /// Reads a stored relation.
    Scan {
        /// Stored relation key.
        key: RelationKey,
    },
    /// Nested-loop equi-join over the concatenation of both inputs.
    Join {
        /// `(left, right)` column pairs; right indexes are already offset by
        /// the left arity.
        attributes: Vec<(usize, usize)>,
    },
    /// Emits the listed input columns.
    Foreach {
        /// Indexes into the input schema.
        column_indexes: Vec<usize>,
    },
    /// Multiset sum.
    Union,
    /// Multiset minimum.
    Intersect,
    /// Multiset difference.
    Diff,
    /// Caps multiplicities at one.
    Distinct,
    /// Keeps the first `count` tuples.
    Limit {
        /// Maximum number of tuples.
        count: u64,
    },
    /// Merges the input into a stored relation.
    Insert {
        /// Target key.
        key: RelationKey,
    },
    /// Overwrites a stored relation with the input.
    Replace {
        /// Target key.
        key: RelationKey,
    },
}

impl LogicalOp {
    /// Upper-case operator tag.
    pub fn name(&self) -> &'static str {
        match self {
            LogicalOp::Load { .. } => "LOAD",
            LogicalOp::Table { .. } => "TABLE",
            LogicalOp::Scan { .. } => "SCAN",
            LogicalOp::Join { .. } => "JOIN",
            LogicalOp::Foreach { .. } => "FOREACH",
            LogicalOp::Union => "UNION",
            LogicalOp::Intersect => "INTERSECT",
            LogicalOp::Diff => "DIFF",
            LogicalOp::Distinct => "DISTINCT",
            LogicalOp::Limit { .. } => "LIMIT",
            LogicalOp::Insert { .. } => "INSERT",
            LogicalOp::Replace { .. } => "REPLACE",
        }
    }
}

/// Node within the logical plan.
#[derive(Clone, Debug)]
pub struct PlanNode {
    op: LogicalOp,
    schema: Schema,
    inputs: Vec<PlanRef>,
}

impl PlanNode {
    fn build(op: LogicalOp, schema: Schema, inputs: Vec<PlanRef>) -> PlanRef {
        Arc::new(Self { op, schema, inputs })
    }

    /// Operator at this node.
    pub fn op(&self) -> &LogicalOp {
        &self.op
    }

    /// Output schema; empty for store mutations.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Child nodes in operator order.
    pub fn inputs(&self) -> &[PlanRef] {
        &self.inputs
    }

    /// Whether this node mutates the store instead of producing tuples.
    pub fn is_mutation(&self) -> bool {
        matches!(self.op, LogicalOp::Insert { .. } | LogicalOp::Replace { .. })
    }

    /// `LOAD` with an explicitly declared schema.
    pub fn load(path: impl Into<PathBuf>, schema: Schema) -> PlanRef {
        Self::build(LogicalOp::Load { path: path.into() }, schema, Vec::new())
    }

    /// `TABLE`; every tuple must satisfy `schema`.
    pub fn table(tuples: Vec<Tuple>, schema: Schema) -> Result<PlanRef> {
        for tuple in &tuples {
            schema.validate_tuple(tuple)?;
        }
        Ok(Self::build(
            LogicalOp::Table {
                tuples: tuples.into(),
            },
            schema,
            Vec::new(),
        ))
    }

    /// `SCAN` of a stored relation, typed by the store's current schema.
    pub fn scan(key: RelationKey, store: &dyn RelationStore) -> Result<PlanRef> {
        let schema = store.schema(&key)?;
        Ok(Self::build(LogicalOp::Scan { key }, schema, Vec::new()))
    }

    /// `JOIN` of two inputs whose columns are prefixed by `labels`.
    pub fn join(
        left: PlanRef,
        right: PlanRef,
        attributes: Vec<(usize, usize)>,
        labels: [&str; 2],
    ) -> Result<PlanRef> {
        require_query(&left)?;
        require_query(&right)?;
        let schema = Schema::join(&[left.schema(), right.schema()], &labels)?;
        let offset = left.schema().len();
        for &(l, r) in &attributes {
            if l >= offset || r < offset || r >= schema.len() {
                return Err(MyrialError::InvalidPlan(
                    "join attribute index outside its input",
                ));
            }
            let (lc, rc) = (&schema.columns()[l], &schema.columns()[r]);
            if lc.ty != rc.ty {
                return Err(MyrialError::JoinTypeMismatch {
                    left: lc.name.clone(),
                    left_type: lc.ty,
                    right: rc.name.clone(),
                    right_type: rc.ty,
                });
            }
        }
        Ok(Self::build(
            LogicalOp::Join { attributes },
            schema,
            vec![left, right],
        ))
    }

    /// `FOREACH` emitting `column_indexes`, optionally renamed by `rename`.
    ///
    /// Without a rename the emitted column names must be unique.
    pub fn foreach(
        input: PlanRef,
        column_indexes: Vec<usize>,
        rename: Option<Schema>,
    ) -> Result<PlanRef> {
        require_query(&input)?;
        let columns = column_indexes
            .iter()
            .map(|&idx| {
                input.schema().columns().get(idx).cloned().ok_or(
                    MyrialError::InvalidPlan("foreach column index outside its input"),
                )
            })
            .collect::<Result<Vec<Column>>>()?;
        let schema = match rename {
            Some(rename) => {
                let same_types = rename.len() == columns.len()
                    && rename.types().eq(columns.iter().map(|c| c.ty));
                if !same_types {
                    return Err(MyrialError::SchemaCompatibility {
                        left: render_columns(&columns),
                        right: rename.to_string(),
                    });
                }
                rename
            }
            None => Schema::new(columns)?,
        };
        Ok(Self::build(
            LogicalOp::Foreach { column_indexes },
            schema,
            vec![input],
        ))
    }

    /// `UNION` of compatible inputs.
    pub fn union(left: PlanRef, right: PlanRef) -> Result<PlanRef> {
        Self::binary(LogicalOp::Union, left, right)
    }

    /// `INTERSECT` of compatible inputs.
    pub fn intersect(left: PlanRef, right: PlanRef) -> Result<PlanRef> {
        Self::binary(LogicalOp::Intersect, left, right)
    }

    /// `DIFF` of compatible inputs.
    pub fn diff(left: PlanRef, right: PlanRef) -> Result<PlanRef> {
        Self::binary(LogicalOp::Diff, left, right)
    }

    fn binary(op: LogicalOp, left: PlanRef, right: PlanRef) -> Result<PlanRef> {
        require_query(&left)?;
        require_query(&right)?;
        left.schema().check_compatible(right.schema())?;
        let schema = left.schema().clone();
        Ok(Self::build(op, schema, vec![left, right]))
    }

    /// `DISTINCT` over `input`.
    pub fn distinct(input: PlanRef) -> Result<PlanRef> {
        require_query(&input)?;
        let schema = input.schema().clone();
        Ok(Self::build(LogicalOp::Distinct, schema, vec![input]))
    }

    /// `LIMIT` over `input`.
    pub fn limit(input: PlanRef, count: u64) -> Result<PlanRef> {
        require_query(&input)?;
        let schema = input.schema().clone();
        Ok(Self::build(LogicalOp::Limit { count }, schema, vec![input]))
    }

    /// `INSERT` of `input` into the relation at `key`.
    pub fn insert(key: RelationKey, input: PlanRef) -> Result<PlanRef> {
        require_query(&input)?;
        Ok(Self::build(
            LogicalOp::Insert { key },
            Schema::empty(),
            vec![input],
        ))
    }

    /// `REPLACE` of the relation at `key` with `input`.
    pub fn replace(key: RelationKey, input: PlanRef) -> Result<PlanRef> {
        require_query(&input)?;
        Ok(Self::build(
            LogicalOp::Replace { key },
            Schema::empty(),
            vec![input],
        ))
    }
}

fn require_query(node: &PlanNode) -> Result<()> {
    if node.is_mutation() {
        return Err(MyrialError::InvalidPlan(
            "store mutations cannot feed another operator",
        ));
    }
    Ok(())
}

fn render_columns(columns: &[Column]) -> String {
    let parts: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
    format!("({})", parts.join(","))
}
