//! Statement execution, symbol bindings, and `DO ... WHILE` fixpoints.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{MyrialError, Result};
use crate::query::analyze::{analyze, Bindings};
use crate::query::ast::{Expr, Ident, Statement};
use crate::query::executor::{Executor, ExecutorOptions};
use crate::query::explain::PlanExplain;
use crate::query::logical::{LogicalOp, PlanNode, PlanRef, RelationKey};
use crate::query::store::{MemoryStore, RelationStore};
use crate::relation::{Schema, Tuple};

/// How assignments are bound.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvalMode {
    /// Identifiers are bound to their plan; work happens when a DUMP pulls.
    #[default]
    Lazy,
    /// Every assignment is materialized into the store and rebound to a scan.
    Eager,
}

/// Driver configuration.
#[derive(Clone, Debug)]
pub struct DriverOptions {
    /// Evaluation mode.
    pub mode: EvalMode,
    /// Owner component of materialized relation keys.
    pub owner: String,
    /// Program name; the run id is this name plus a random suffix.
    pub program: Option<String>,
    /// Maximum `DO ... WHILE` iterations; unbounded when `None`.
    pub max_iterations: Option<u64>,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            mode: EvalMode::Lazy,
            owner: "local".to_owned(),
            program: None,
            max_iterations: None,
        }
    }
}

/// Event surfaced by DUMP, DESCRIBE, and EXPLAIN.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Output {
    /// Tuples produced by `DUMP`.
    Dump {
        /// Schema of `tuples`.
        schema: Schema,
        /// Tuples in stream order.
        tuples: Vec<Tuple>,
    },
    /// Schema reported by `DESCRIBE`.
    Describe {
        /// Described identifier.
        ident: String,
        /// Its schema.
        schema: Schema,
    },
    /// Plan reported by `EXPLAIN`.
    Explain {
        /// Explained identifier.
        ident: String,
        /// Its plan tree.
        plan: PlanExplain,
    },
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Output::Dump { tuples, .. } => {
                f.write_str("[")?;
                for (idx, tuple) in tuples.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{tuple}")?;
                }
                f.write_str("]")
            }
            Output::Describe { ident, schema } => write!(f, "{ident} : {schema}"),
            Output::Explain { ident, plan } => write!(f, "{ident} : \n{plan}"),
        }
    }
}

/// Receives driver output as statements complete.
pub trait OutputSink {
    /// Handles one output event.
    fn emit(&mut self, output: Output) -> Result<()>;
}

impl OutputSink for Vec<Output> {
    fn emit(&mut self, output: Output) -> Result<()> {
        self.push(output);
        Ok(())
    }
}

/// Runs programs against one symbol table and one store.
pub struct Driver<S: RelationStore = MemoryStore> {
    executor: Executor<S>,
    bindings: Bindings,
    options: DriverOptions,
    run_id: String,
    materialized: u64,
}

impl Driver<MemoryStore> {
    /// Driver over a fresh in-memory store.
    pub fn new(options: DriverOptions, executor_options: ExecutorOptions) -> Self {
        Self::with_executor(Executor::new(MemoryStore::new(), executor_options), options)
    }
}

impl<S: RelationStore> Driver<S> {
    /// Driver over an existing executor.
    pub fn with_executor(executor: Executor<S>, options: DriverOptions) -> Self {
        let run_id = fresh_run_id(options.program.as_deref().unwrap_or("program"));
        Self {
            executor,
            bindings: Bindings::new(),
            options,
            run_id,
            materialized: 0,
        }
    }

    /// Namespace used for relations materialized by this run.
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Current symbol table.
    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    /// Underlying executor.
    pub fn executor(&self) -> &Executor<S> {
        &self.executor
    }

    /// Parses `source` and runs every statement in order.
    pub fn run_source(&mut self, source: &str, sink: &mut dyn OutputSink) -> Result<()> {
        let program = crate::syntax::parse_program(source)?;
        self.run(&program, sink)
    }

    /// Runs `statements` in order, stopping at the first error.
    pub fn run(&mut self, statements: &[Statement], sink: &mut dyn OutputSink) -> Result<()> {
        for statement in statements {
            self.execute(statement, sink)?;
        }
        Ok(())
    }

    /// Runs one statement.
    pub fn execute(&mut self, statement: &Statement, sink: &mut dyn OutputSink) -> Result<()> {
        match statement {
            Statement::Assign { target, expr } => self.assign(target, expr),
            Statement::Dump(expr) => {
                let node = analyze(expr, &self.bindings)?;
                let stream = self.executor.evaluate(&node)?;
                let schema = stream.schema().clone();
                let tuples = stream.collect::<Result<Vec<_>>>()?;
                debug!(tuples = tuples.len(), "driver.dump");
                sink.emit(Output::Dump { schema, tuples })
            }
            Statement::Describe(ident) => {
                let node = self.bindings.resolve(ident)?;
                sink.emit(Output::Describe {
                    ident: ident.as_str().to_owned(),
                    schema: node.schema().clone(),
                })
            }
            Statement::Explain(ident) => {
                let node = self.bindings.resolve(ident)?;
                sink.emit(Output::Explain {
                    ident: ident.as_str().to_owned(),
                    plan: PlanExplain::new(&node),
                })
            }
            Statement::DoWhile { body, condition } => self.do_while(body, condition, sink),
        }
    }

    fn assign(&mut self, target: &Ident, expr: &Expr) -> Result<()> {
        let node = analyze(expr, &self.bindings)?;
        let bound = match self.options.mode {
            EvalMode::Lazy => node,
            EvalMode::Eager => self.materialize(target, node)?,
        };
        if let Some(displaced) = self.bindings.bind(target, bound) {
            self.release(displaced);
        }
        Ok(())
    }

    /// Drops the relation behind a displaced eager binding once no plan refers to it.
    fn release(&mut self, displaced: PlanRef) {
        if Arc::strong_count(&displaced) != 1 {
            return;
        }
        if let LogicalOp::Scan { key } = displaced.op() {
            if key.owner == self.options.owner
                && key.program == self.run_id
                && self.executor.store_mut().remove(key)
            {
                debug!(relation = %key, "driver.assign.released");
            }
        }
    }

    fn materialize(&mut self, target: &Ident, node: PlanRef) -> Result<PlanRef> {
        self.materialized += 1;
        let key = RelationKey::new(
            self.options.owner.clone(),
            self.run_id.clone(),
            format!("{}#{}", target.as_str(), self.materialized),
        );
        let plan = PlanNode::replace(key.clone(), node)?;
        self.executor.evaluate(&plan)?;
        info!(ident = target.as_str(), relation = %key, "driver.assign.materialized");
        PlanNode::scan(key, self.executor.store())
    }

    fn do_while(
        &mut self,
        body: &[Statement],
        condition: &Expr,
        sink: &mut dyn OutputSink,
    ) -> Result<()> {
        let mut iteration: u64 = 0;
        loop {
            iteration += 1;
            self.run(body, sink)?;
            let snapshot = self.bindings.snapshot();
            let delta = analyze(condition, &snapshot)?;
            let remaining = self.executor.evaluate_to_bag(&delta)?.len();
            debug!(iteration, remaining, "driver.dowhile.iteration");
            if remaining == 0 {
                info!(iterations = iteration, "driver.dowhile.converged");
                return Ok(());
            }
            if let Some(limit) = self.options.max_iterations {
                if iteration >= limit {
                    return Err(MyrialError::IterationLimit { limit });
                }
            }
        }
    }
}

fn fresh_run_id(name: &str) -> String {
    format!("{name}-{:016x}", rand::random::<u64>())
}
