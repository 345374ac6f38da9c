//! Plan evaluation over pull-based tuple streams.
//!
//! Each operator becomes a [`TupleStream`] that computes tuples only when its
//! consumer pulls. JOIN materializes its right input, INTERSECT and DIFF
//! materialize both inputs, and everything else streams. Every stream states
//! whether it can be replayed: LOAD and SCAN are single-pass, TABLE and
//! materialized results are restartable, and composite streams inherit the
//! weakest pass of their inputs.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{MyrialError, Result};
use crate::query::logical::{LogicalOp, PlanNode, RelationKey};
use crate::query::store::{MemoryStore, RelationStore};
use crate::relation::{Bag, Schema, Tuple};

/// Whether a stream can be replayed from the start.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pass {
    /// Tuples are produced once; rewinding fails.
    Single,
    /// [`TupleStream::rewind`] restarts from the first tuple.
    Restartable,
}

impl Pass {
    fn combine(self, other: Pass) -> Pass {
        match (self, other) {
            (Pass::Restartable, Pass::Restartable) => Pass::Restartable,
            _ => Pass::Single,
        }
    }
}

/// Pull-based producer of tuples.
pub trait TupleStream {
    /// Next tuple, or `None` once exhausted.
    fn try_next(&mut self) -> Result<Option<Tuple>>;

    /// Replay capability of this stream.
    fn pass(&self) -> Pass;

    /// Restarts the stream from its first tuple.
    fn rewind(&mut self) -> Result<()> {
        Err(MyrialError::NotRestartable("single-pass"))
    }
}

type BoxTupleStream = Box<dyn TupleStream>;

/// Evaluation result: a stream of tuples conforming to `schema`.
pub struct ResultStream {
    schema: Schema,
    tuples: BoxTupleStream,
}

impl ResultStream {
    fn new(schema: Schema, tuples: BoxTupleStream) -> Self {
        Self { schema, tuples }
    }

    fn empty(schema: Schema) -> Self {
        Self::new(schema, Box::new(VecTupleStream::new(Vec::new())))
    }

    /// Schema of every produced tuple.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Replay capability of the underlying stream.
    pub fn pass(&self) -> Pass {
        self.tuples.pass()
    }

    /// Restarts a restartable stream.
    pub fn rewind(&mut self) -> Result<()> {
        self.tuples.rewind()
    }

    /// Drains the remaining tuples into a bag.
    pub fn into_bag(self) -> Result<Bag> {
        self.collect()
    }
}

impl Iterator for ResultStream {
    type Item = Result<Tuple>;

    fn next(&mut self) -> Option<Self::Item> {
        self.tuples.try_next().transpose()
    }
}

/// Evaluation settings.
#[derive(Clone, Debug, Default)]
pub struct ExecutorOptions {
    /// Base directory for relative LOAD paths; the working directory when unset.
    pub data_dir: Option<PathBuf>,
}

/// Evaluates plan nodes against a relation store.
pub struct Executor<S: RelationStore = MemoryStore> {
    store: S,
    options: ExecutorOptions,
}

impl Executor<MemoryStore> {
    /// Executor over a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new(), ExecutorOptions::default())
    }
}

impl<S: RelationStore> Executor<S> {
    /// Creates an executor owning `store`.
    pub fn new(store: S, options: ExecutorOptions) -> Self {
        Self { store, options }
    }

    /// Backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Mutable access to the backing store.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Evaluates `node`.
    ///
    /// Store mutations run to completion here and return an empty stream;
    /// queries return a lazy stream that reads inputs as it is pulled.
    pub fn evaluate(&mut self, node: &PlanNode) -> Result<ResultStream> {
        match node.op() {
            LogicalOp::Insert { key } => {
                self.apply_insert(key, single_input(node)?)?;
                Ok(ResultStream::empty(node.schema().clone()))
            }
            LogicalOp::Replace { key } => {
                self.apply_replace(key, single_input(node)?)?;
                Ok(ResultStream::empty(node.schema().clone()))
            }
            _ => {
                let tuples = self.build_stream(node)?;
                Ok(ResultStream::new(node.schema().clone(), tuples))
            }
        }
    }

    /// Evaluates `node` to completion as a multiset.
    pub fn evaluate_to_bag(&mut self, node: &PlanNode) -> Result<Bag> {
        self.evaluate(node)?.into_bag()
    }

    fn apply_insert(&mut self, key: &RelationKey, input: &PlanNode) -> Result<()> {
        let bag = drain(self.build_stream(input)?)?;
        let tuples = bag.len();
        self.store.insert(key, input.schema(), bag)?;
        info!(relation = %key, tuples, "executor.insert.completed");
        Ok(())
    }

    fn apply_replace(&mut self, key: &RelationKey, input: &PlanNode) -> Result<()> {
        let bag = drain(self.build_stream(input)?)?;
        let tuples = bag.len();
        self.store.replace(key, input.schema().clone(), bag)?;
        info!(relation = %key, tuples, "executor.replace.completed");
        Ok(())
    }

    fn build_stream(&self, node: &PlanNode) -> Result<BoxTupleStream> {
        match node.op() {
            LogicalOp::Load { path } => {
                let path = self.resolve_path(path);
                debug!(path = %path.display(), "executor.load.open");
                Ok(Box::new(LoadStream::open(path, node.schema().clone())?))
            }
            LogicalOp::Table { tuples } => Ok(Box::new(VecTupleStream::shared(Arc::clone(tuples)))),
            LogicalOp::Scan { key } => {
                // A later REPLACE may have changed the stored schema.
                node.schema().check_compatible(&self.store.schema(key)?)?;
                let bag = self.store.scan(key)?;
                debug!(relation = %key, tuples = bag.len(), "executor.scan.snapshot");
                Ok(Box::new(ScanStream::new(bag)))
            }
            LogicalOp::Join { attributes } => {
                let [left, right] = two_inputs(node)?;
                let left = self.build_stream(left)?;
                let right = drain_vec(self.build_stream(right)?)?;
                Ok(Box::new(JoinStream::new(left, right, attributes.clone())))
            }
            LogicalOp::Foreach { column_indexes } => {
                let input = self.build_stream(single_input(node)?)?;
                Ok(Box::new(ForeachStream::new(input, column_indexes.clone())))
            }
            LogicalOp::Union => {
                let [left, right] = two_inputs(node)?;
                let inputs = vec![self.build_stream(left)?, self.build_stream(right)?];
                Ok(Box::new(UnionStream::new(inputs)))
            }
            LogicalOp::Intersect | LogicalOp::Diff => {
                let [left, right] = two_inputs(node)?;
                let left = drain(self.build_stream(left)?)?;
                let right = drain(self.build_stream(right)?)?;
                let out = if matches!(node.op(), LogicalOp::Intersect) {
                    left.intersection(&right)
                } else {
                    left.difference(&right)
                };
                Ok(Box::new(VecTupleStream::new(out.into_elements())))
            }
            LogicalOp::Distinct => {
                let input = self.build_stream(single_input(node)?)?;
                Ok(Box::new(DistinctStream::new(input)))
            }
            LogicalOp::Limit { count } => {
                let input = self.build_stream(single_input(node)?)?;
                Ok(Box::new(LimitStream::new(input, *count)))
            }
            LogicalOp::Insert { .. } | LogicalOp::Replace { .. } => Err(MyrialError::InvalidPlan(
                "store mutation nested inside a query",
            )),
        }
    }

    fn resolve_path(&self, path: &Path) -> PathBuf {
        match &self.options.data_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }
}

fn single_input(node: &PlanNode) -> Result<&PlanNode> {
    match node.inputs() {
        [input] => Ok(input),
        _ => Err(MyrialError::InvalidPlan("operator expects a single input")),
    }
}

fn two_inputs(node: &PlanNode) -> Result<[&PlanNode; 2]> {
    match node.inputs() {
        [left, right] => Ok([left, right]),
        _ => Err(MyrialError::InvalidPlan("operator expects two inputs")),
    }
}

fn drain(mut stream: BoxTupleStream) -> Result<Bag> {
    let mut bag = Bag::new();
    while let Some(tuple) = stream.try_next()? {
        bag.insert(tuple);
    }
    Ok(bag)
}

fn drain_vec(mut stream: BoxTupleStream) -> Result<Vec<Tuple>> {
    let mut out = Vec::new();
    while let Some(tuple) = stream.try_next()? {
        out.push(tuple);
    }
    Ok(out)
}

struct LoadStream {
    path: PathBuf,
    schema: Schema,
    reader: BufReader<File>,
    line: String,
    line_no: usize,
}

impl LoadStream {
    fn open(path: PathBuf, schema: Schema) -> Result<Self> {
        let file = File::open(&path).map_err(|source| MyrialError::Load {
            path: path.clone(),
            source,
        })?;
        Ok(Self {
            path,
            schema,
            reader: BufReader::new(file),
            line: String::new(),
            line_no: 0,
        })
    }
}

impl TupleStream for LoadStream {
    fn try_next(&mut self) -> Result<Option<Tuple>> {
        loop {
            self.line.clear();
            let read = self
                .reader
                .read_line(&mut self.line)
                .map_err(|source| MyrialError::Load {
                    path: self.path.clone(),
                    source,
                })?;
            if read == 0 {
                return Ok(None);
            }
            self.line_no += 1;
            let record = self
                .line
                .strip_suffix('\n')
                .map(|l| l.strip_suffix('\r').unwrap_or(l))
                .unwrap_or(&self.line);
            let trimmed = record.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            return match self.schema.tuple_from_string(record) {
                Ok(tuple) => Ok(Some(tuple)),
                Err(MyrialError::TupleType { reason }) => Err(MyrialError::tuple_type(format!(
                    "{}:{}: {reason}",
                    self.path.display(),
                    self.line_no
                ))),
                Err(other) => Err(other),
            };
        }
    }

    fn pass(&self) -> Pass {
        Pass::Single
    }

    fn rewind(&mut self) -> Result<()> {
        Err(MyrialError::NotRestartable("LOAD"))
    }
}

struct VecTupleStream {
    tuples: Arc<[Tuple]>,
    pos: usize,
}

impl VecTupleStream {
    fn new(tuples: Vec<Tuple>) -> Self {
        Self::shared(tuples.into())
    }

    fn shared(tuples: Arc<[Tuple]>) -> Self {
        Self { tuples, pos: 0 }
    }
}

impl TupleStream for VecTupleStream {
    fn try_next(&mut self) -> Result<Option<Tuple>> {
        let next = self.tuples.get(self.pos).cloned();
        if next.is_some() {
            self.pos += 1;
        }
        Ok(next)
    }

    fn pass(&self) -> Pass {
        Pass::Restartable
    }

    fn rewind(&mut self) -> Result<()> {
        self.pos = 0;
        Ok(())
    }
}

struct ScanStream {
    tuples: std::vec::IntoIter<Tuple>,
}

impl ScanStream {
    fn new(bag: Bag) -> Self {
        Self {
            tuples: bag.into_elements().into_iter(),
        }
    }
}

impl TupleStream for ScanStream {
    fn try_next(&mut self) -> Result<Option<Tuple>> {
        Ok(self.tuples.next())
    }

    fn pass(&self) -> Pass {
        Pass::Single
    }

    fn rewind(&mut self) -> Result<()> {
        Err(MyrialError::NotRestartable("SCAN"))
    }
}

/// Nested-loop join: streams the left input against the buffered right input.
struct JoinStream {
    left: BoxTupleStream,
    right: Vec<Tuple>,
    attributes: Vec<(usize, usize)>,
    current: Option<Tuple>,
    right_pos: usize,
}

impl JoinStream {
    fn new(left: BoxTupleStream, right: Vec<Tuple>, attributes: Vec<(usize, usize)>) -> Self {
        Self {
            left,
            right,
            attributes,
            current: None,
            right_pos: 0,
        }
    }

    fn matches(&self, joined: &Tuple) -> bool {
        self.attributes
            .iter()
            .all(|&(l, r)| joined.get(l).is_some() && joined.get(l) == joined.get(r))
    }
}

impl TupleStream for JoinStream {
    fn try_next(&mut self) -> Result<Option<Tuple>> {
        loop {
            let Some(left) = self.current.as_ref() else {
                match self.left.try_next()? {
                    Some(tuple) => {
                        self.current = Some(tuple);
                        self.right_pos = 0;
                        continue;
                    }
                    None => return Ok(None),
                }
            };
            let Some(right) = self.right.get(self.right_pos) else {
                self.current = None;
                continue;
            };
            self.right_pos += 1;
            let joined = left.concat(right);
            if self.matches(&joined) {
                return Ok(Some(joined));
            }
        }
    }

    fn pass(&self) -> Pass {
        self.left.pass()
    }

    fn rewind(&mut self) -> Result<()> {
        self.left.rewind()?;
        self.current = None;
        self.right_pos = 0;
        Ok(())
    }
}

struct ForeachStream {
    input: BoxTupleStream,
    indexes: Vec<usize>,
}

impl ForeachStream {
    fn new(input: BoxTupleStream, indexes: Vec<usize>) -> Self {
        Self { input, indexes }
    }
}

impl TupleStream for ForeachStream {
    fn try_next(&mut self) -> Result<Option<Tuple>> {
        match self.input.try_next()? {
            Some(tuple) => tuple
                .select(&self.indexes)
                .map(Some)
                .ok_or(MyrialError::InvalidPlan("foreach index outside input tuple")),
            None => Ok(None),
        }
    }

    fn pass(&self) -> Pass {
        self.input.pass()
    }

    fn rewind(&mut self) -> Result<()> {
        self.input.rewind()
    }
}

struct UnionStream {
    inputs: Vec<BoxTupleStream>,
    current: usize,
}

impl UnionStream {
    fn new(inputs: Vec<BoxTupleStream>) -> Self {
        Self { inputs, current: 0 }
    }
}

impl TupleStream for UnionStream {
    fn try_next(&mut self) -> Result<Option<Tuple>> {
        while self.current < self.inputs.len() {
            match self.inputs[self.current].try_next()? {
                Some(tuple) => return Ok(Some(tuple)),
                None => self.current += 1,
            }
        }
        Ok(None)
    }

    fn pass(&self) -> Pass {
        self.inputs
            .iter()
            .fold(Pass::Restartable, |acc, input| acc.combine(input.pass()))
    }

    fn rewind(&mut self) -> Result<()> {
        for input in &mut self.inputs {
            input.rewind()?;
        }
        self.current = 0;
        Ok(())
    }
}

struct DistinctStream {
    input: BoxTupleStream,
    seen: HashSet<Tuple>,
}

impl DistinctStream {
    fn new(input: BoxTupleStream) -> Self {
        Self {
            input,
            seen: HashSet::new(),
        }
    }
}

impl TupleStream for DistinctStream {
    fn try_next(&mut self) -> Result<Option<Tuple>> {
        while let Some(tuple) = self.input.try_next()? {
            if !self.seen.contains(&tuple) {
                self.seen.insert(tuple.clone());
                return Ok(Some(tuple));
            }
        }
        Ok(None)
    }

    fn pass(&self) -> Pass {
        self.input.pass()
    }

    fn rewind(&mut self) -> Result<()> {
        self.input.rewind()?;
        self.seen.clear();
        Ok(())
    }
}

struct LimitStream {
    input: BoxTupleStream,
    limit: u64,
    emitted: u64,
}

impl LimitStream {
    fn new(input: BoxTupleStream, limit: u64) -> Self {
        Self {
            input,
            limit,
            emitted: 0,
        }
    }
}

impl TupleStream for LimitStream {
    fn try_next(&mut self) -> Result<Option<Tuple>> {
        if self.emitted >= self.limit {
            return Ok(None);
        }
        let next = self.input.try_next()?;
        if next.is_some() {
            self.emitted += 1;
        }
        Ok(next)
    }

    fn pass(&self) -> Pass {
        self.input.pass()
    }

    fn rewind(&mut self) -> Result<()> {
        self.input.rewind()?;
        self.emitted = 0;
        Ok(())
    }
}
