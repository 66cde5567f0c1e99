//! # Chain
//! The pipeline composition core: a small expression algebra for LLM call chains.
//!
//! ## Stage
//! A [Stage] is an atomic unit of computation: template filling, an LLM call, output
//! parsing or a plain function. A stage consumes one [ChainValue] and produces one
//! [ChainValue], or fails with a [StageError](errors::StageError). Stages are stateless
//! and reentrant; the only side effect a built-in stage performs is the network call an
//! LLM stage wraps.
//!
//! ## Node
//! Stages compose into a [Node] tree with one binary operator. `a | b` (or
//! [Node::pipe]) chains `b` after `a` and flattens nested sequences, so composition is
//! associative. A [FanOut] maps names to independent branches that all receive the same
//! input and merge into one JSON object.
//!
//! ## Pipeline
//! A [Pipeline] wraps a root node behind a single `evaluate` entry point. The graph is
//! immutable once built; every `evaluate` call is independent, with no caching and no
//! state carried across calls.
//!
//! ## Failure
//! Evaluation is fail-fast. The first stage to fail aborts the enclosing sequence or
//! fan-out and its error propagates to the caller of `evaluate` untouched. There is no
//! retry and no partial result.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, warn};

use crate::chain::errors::StageError;
use crate::utils::JsonMap;

/// Schema-less value flowing between stages. Stage contracts on the shape of this value
/// are documented per stage, not statically enforced.
pub type ChainValue = serde_json::Value;

/// Boxed future returned by chain evaluation.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// An atomic unit of computation in a chain.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Identity of the stage, carried by errors originating from it.
    fn name(&self) -> &str;

    /// Consume one input value and produce one output value.
    async fn apply(&self, input: ChainValue) -> Result<ChainValue, StageError>;
}

/// A composed computation graph: a single stage, a sequence or a fan-out.
pub enum Node {
    Stage(Arc<dyn Stage>),
    Sequence(Vec<Node>),
    FanOut(Vec<(String, Node)>),
}

impl Node {
    /// Append `next` after this node. Nested sequences are flattened, which makes
    /// composition associative.
    pub fn pipe(self, next: impl Into<Node>) -> Node {
        let mut nodes = match self {
            Node::Sequence(nodes) => nodes,
            other => vec![other],
        };
        match next.into() {
            Node::Sequence(tail) => nodes.extend(tail),
            other => nodes.push(other),
        }
        Node::Sequence(nodes)
    }

    /// Evaluate this node against one input value.
    ///
    /// Sequences feed each stage's output into the next and short-circuit on the first
    /// error. Fan-outs evaluate every branch against a clone of the same input, in
    /// declaration order; the first failing branch aborts the whole fan-out.
    pub fn evaluate<'a>(&'a self, input: ChainValue) -> BoxFuture<'a, Result<ChainValue, StageError>> {
        Box::pin(async move {
            match self {
                Node::Stage(stage) => stage.apply(input).await,
                Node::Sequence(nodes) => {
                    let mut value = input;
                    for node in nodes {
                        value = node.evaluate(value).await?;
                    }
                    Ok(value)
                }
                Node::FanOut(branches) => {
                    let mut merged = JsonMap::new();
                    for (key, node) in branches {
                        let branch_output = node.evaluate(input.clone()).await?;
                        merged.insert(key.clone(), branch_output);
                    }
                    Ok(ChainValue::Object(merged))
                }
            }
        })
    }

    /// One-line description of the graph shape, for logging and debugging.
    pub fn describe(&self) -> String {
        match self {
            Node::Stage(stage) => stage.name().to_string(),
            Node::Sequence(nodes) => nodes
                .iter()
                .map(Node::describe)
                .collect::<Vec<_>>()
                .join(" | "),
            Node::FanOut(branches) => {
                let inner = branches
                    .iter()
                    .map(|(key, node)| format!("{}: {}", key, node.describe()))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{{{}}}", inner)
            }
        }
    }
}

/// Any stage is a one-node graph.
impl<S: Stage + 'static> From<S> for Node {
    fn from(stage: S) -> Self {
        Node::Stage(Arc::new(stage))
    }
}

impl<R: Into<Node>> std::ops::BitOr<R> for Node {
    type Output = Node;

    fn bitor(self, rhs: R) -> Node {
        self.pipe(rhs)
    }
}

/// Builder for a fan-out: named branches evaluated independently against the same
/// input and merged into one JSON object, keyed by branch name.
#[derive(Default)]
pub struct FanOut {
    branches: Vec<(String, Node)>,
}

impl FanOut {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a branch. Branch keys are unique; adding a key twice replaces the earlier
    /// branch and logs a warning.
    pub fn branch(mut self, key: impl Into<String>, node: impl Into<Node>) -> Self {
        let key = key.into();
        if let Some(existing) = self.branches.iter_mut().find(|(k, _)| *k == key) {
            warn!("fan-out branch {} is defined twice, replacing the earlier branch", key);
            existing.1 = node.into();
        } else {
            self.branches.push((key, node.into()));
        }
        self
    }
}

impl From<FanOut> for Node {
    fn from(fan_out: FanOut) -> Self {
        Node::FanOut(fan_out.branches)
    }
}

/// Top-level entry point wrapping a composed graph.
pub struct Pipeline {
    root: Node,
}

impl Pipeline {
    pub fn new(root: impl Into<Node>) -> Self {
        Self { root: root.into() }
    }

    /// Evaluate the graph once against `input`. Each call is independent and safely
    /// repeatable as long as the wrapped collaborator calls are.
    pub async fn evaluate(&self, input: impl Into<ChainValue>) -> Result<ChainValue, StageError> {
        debug!("evaluating pipeline: {}", self.root.describe());
        self.root.evaluate(input.into()).await
    }
}

pub mod errors {
    use std::error::Error;
    use std::fmt;
    use std::fmt::Formatter;

    /// What went wrong inside a stage.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum StageErrorKind {
        /// The input value did not match the shape the stage requires.
        Validation,
        /// The external call a stage wraps failed (transport or provider error).
        ExternalCall,
        /// The stage could not parse an upstream output.
        Parse,
    }

    impl fmt::Display for StageErrorKind {
        fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
            match self {
                StageErrorKind::Validation => write!(f, "validation failed"),
                StageErrorKind::ExternalCall => write!(f, "external call failed"),
                StageErrorKind::Parse => write!(f, "parse failed"),
            }
        }
    }

    /// Error raised by a failing stage. Aborts the enclosing sequence or fan-out and
    /// propagates to the caller of `evaluate` unchanged.
    #[derive(Debug, Clone)]
    pub struct StageError {
        /// Name of the stage the error originated from.
        pub stage: String,
        pub kind: StageErrorKind,
        pub message: String,
    }

    impl StageError {
        pub fn validation(stage: impl Into<String>, message: impl Into<String>) -> Self {
            Self {
                stage: stage.into(),
                kind: StageErrorKind::Validation,
                message: message.into(),
            }
        }

        pub fn external_call(stage: impl Into<String>, message: impl Into<String>) -> Self {
            Self {
                stage: stage.into(),
                kind: StageErrorKind::ExternalCall,
                message: message.into(),
            }
        }

        pub fn parse(stage: impl Into<String>, message: impl Into<String>) -> Self {
            Self {
                stage: stage.into(),
                kind: StageErrorKind::Parse,
                message: message.into(),
            }
        }
    }

    impl fmt::Display for StageError {
        fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
            write!(f, "stage `{}` {}: {}", self.stage, self.kind, self.message)
        }
    }

    impl Error for StageError {}
}

#[cfg(test)]
mod test_chain {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use futures::executor::block_on;
    use serde_json::json;

    use super::errors::{StageError, StageErrorKind};
    use super::{ChainValue, FanOut, Node, Pipeline, Stage};

    struct AddOne {
        calls: Arc<AtomicUsize>,
    }

    impl AddOne {
        fn new() -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (Self { calls: calls.clone() }, calls)
        }
    }

    #[async_trait]
    impl Stage for AddOne {
        fn name(&self) -> &str {
            "add_one"
        }

        async fn apply(&self, input: ChainValue) -> Result<ChainValue, StageError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let n = input
                .as_i64()
                .ok_or_else(|| StageError::validation(self.name(), "expected a number"))?;
            Ok(json!(n + 1))
        }
    }

    struct AlwaysFail;

    #[async_trait]
    impl Stage for AlwaysFail {
        fn name(&self) -> &str {
            "always_fail"
        }

        async fn apply(&self, _input: ChainValue) -> Result<ChainValue, StageError> {
            Err(StageError::external_call(self.name(), "boom"))
        }
    }

    struct Double;

    #[async_trait]
    impl Stage for Double {
        fn name(&self) -> &str {
            "double"
        }

        async fn apply(&self, input: ChainValue) -> Result<ChainValue, StageError> {
            let n = input
                .as_i64()
                .ok_or_else(|| StageError::validation(self.name(), "expected a number"))?;
            Ok(json!(n * 2))
        }
    }

    #[test]
    fn test_compose_is_associative() {
        let left = Node::from(AddOne::new().0)
            .pipe(Double)
            .pipe(AddOne::new().0);
        let right = Node::from(AddOne::new().0).pipe(Node::from(Double).pipe(AddOne::new().0));
        assert_eq!(left.describe(), right.describe());
        assert_eq!(left.describe(), "add_one | double | add_one");

        let left_result = block_on(left.evaluate(json!(3))).unwrap();
        let right_result = block_on(right.evaluate(json!(3))).unwrap();
        assert_eq!(left_result, right_result);
        assert_eq!(left_result, json!(9));
    }

    #[test]
    fn test_bitor_builds_the_same_sequence() {
        let piped = Node::from(Double) | Double | AddOne::new().0;
        assert_eq!(piped.describe(), "double | double | add_one");
        assert_eq!(block_on(piped.evaluate(json!(2))).unwrap(), json!(9));
    }

    #[test]
    fn test_sequence_fails_fast() {
        let (head, head_calls) = AddOne::new();
        let (tail, tail_calls) = AddOne::new();
        let chain = Node::from(head) | AlwaysFail | tail;

        let error = block_on(chain.evaluate(json!(0))).unwrap_err();
        assert_eq!(error.stage, "always_fail");
        assert_eq!(error.kind, StageErrorKind::ExternalCall);
        assert_eq!(head_calls.load(Ordering::SeqCst), 1);
        assert_eq!(tail_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_fan_out_merges_branch_outputs() {
        let fan_out = FanOut::new()
            .branch("plus", AddOne::new().0)
            .branch("times", Double);
        let pipeline = Pipeline::new(fan_out);

        let merged = block_on(pipeline.evaluate(json!(5))).unwrap();
        assert_eq!(merged, json!({"plus": 6, "times": 10}));
    }

    #[test]
    fn test_fan_out_key_order_does_not_change_contents() {
        let forward = Node::from(FanOut::new().branch("a", AddOne::new().0).branch("b", Double));
        let backward = Node::from(FanOut::new().branch("b", Double).branch("a", AddOne::new().0));

        let forward_result = block_on(forward.evaluate(json!(7))).unwrap();
        let backward_result = block_on(backward.evaluate(json!(7))).unwrap();
        // serde_json object equality ignores iteration order
        assert_eq!(forward_result, backward_result);
    }

    #[test]
    fn test_fan_out_aborts_on_first_branch_failure() {
        let (ok_branch, ok_calls) = AddOne::new();
        let fan_out = FanOut::new().branch("a", ok_branch).branch("b", AlwaysFail);

        let error = block_on(Node::from(fan_out).evaluate(json!(5))).unwrap_err();
        assert_eq!(error.stage, "always_fail");
        // branch `a` ran, but its result is discarded with the whole fan-out
        assert_eq!(ok_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_fan_out_feeds_every_branch_the_same_input() {
        let fan_out = FanOut::new()
            .branch("a", Double)
            .branch("b", Node::from(Double) | Double);
        let merged = block_on(Node::from(fan_out).evaluate(json!(3))).unwrap();
        assert_eq!(merged, json!({"a": 6, "b": 12}));
    }

    #[test]
    fn test_duplicate_branch_key_replaces_earlier_branch() {
        let fan_out = FanOut::new().branch("a", AddOne::new().0).branch("a", Double);
        let merged = block_on(Node::from(fan_out).evaluate(json!(4))).unwrap();
        assert_eq!(merged, json!({"a": 8}));
    }

    #[test]
    fn test_pipeline_is_repeatable() {
        let pipeline = Pipeline::new(Node::from(Double) | Double);
        assert_eq!(block_on(pipeline.evaluate(json!(1))).unwrap(), json!(4));
        assert_eq!(block_on(pipeline.evaluate(json!(2))).unwrap(), json!(8));
    }

    #[test]
    fn test_stage_error_display() {
        let error = StageError::parse("content", "no `content` field");
        assert_eq!(
            error.to_string(),
            "stage `content` parse failed: no `content` field"
        );
    }
}
