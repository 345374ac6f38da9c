//! Human- and machine-readable rendering of logical plans for `EXPLAIN`.

use std::fmt;

use serde::Serialize;

use crate::query::logical::{LogicalOp, PlanNode};

/// Explain tree rooted at one plan node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PlanExplain {
    /// Root of the tree.
    pub root: ExplainNode,
}

impl PlanExplain {
    /// Builds the explain tree for `node` and its inputs.
    pub fn new(node: &PlanNode) -> Self {
        Self {
            root: build_explain_tree(node),
        }
    }
}

/// One operator in the explain tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExplainNode {
    /// Operator tag, e.g. `JOIN`.
    pub op: String,
    /// Operator properties in display order.
    pub props: Vec<ExplainProp>,
    /// Input operators.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<ExplainNode>,
}

/// `key=value` property of an [`ExplainNode`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExplainProp {
    /// Property key.
    pub key: String,
    /// Rendered value.
    pub value: String,
}

impl ExplainProp {
    fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

fn build_explain_tree(node: &PlanNode) -> ExplainNode {
    let mut props = op_props(node.op());
    if !node.is_mutation() {
        props.push(ExplainProp::new("schema", node.schema().to_string()));
    }
    ExplainNode {
        op: node.op().name().to_owned(),
        props,
        inputs: node
            .inputs()
            .iter()
            .map(|child| build_explain_tree(child))
            .collect(),
    }
}

fn op_props(op: &LogicalOp) -> Vec<ExplainProp> {
    match op {
        LogicalOp::Load { path } => vec![ExplainProp::new("path", path.display().to_string())],
        LogicalOp::Table { tuples } => vec![ExplainProp::new("rows", tuples.len().to_string())],
        LogicalOp::Scan { key }
        | LogicalOp::Insert { key }
        | LogicalOp::Replace { key } => vec![ExplainProp::new("key", key.to_string())],
        LogicalOp::Join { attributes } => {
            let pairs: Vec<String> = attributes.iter().map(|(l, r)| format!("{l}={r}")).collect();
            vec![ExplainProp::new("on", format!("[{}]", pairs.join(",")))]
        }
        LogicalOp::Foreach { column_indexes } => {
            let cols: Vec<String> = column_indexes.iter().map(|i| i.to_string()).collect();
            vec![ExplainProp::new("columns", format!("[{}]", cols.join(",")))]
        }
        LogicalOp::Limit { count } => vec![ExplainProp::new("count", count.to_string())],
        LogicalOp::Union | LogicalOp::Intersect | LogicalOp::Diff | LogicalOp::Distinct => {
            Vec::new()
        }
    }
}

impl ExplainNode {
    fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        write!(f, "{:indent$}{}", "", self.op, indent = depth * 2)?;
        for prop in &self.props {
            write!(f, " {}={}", prop.key, prop.value)?;
        }
        for input in &self.inputs {
            writeln!(f)?;
            input.write_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for ExplainNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(f, 0)
    }
}

impl fmt::Display for PlanExplain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.root.fmt(f)
    }
}
