use async_trait::async_trait;
use graphcore::{
    EventBus, GraphBuilder, GraphError, PartialUpdate, StateSchema, StateStore, Step, StepContext,
    StepError, END, START,
};
use graphruntime::{ExecutionPlan, Executor, ExecutorConfig, NodeStatus, RunOutcome};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// Writes one fixed value to one field after an optional delay.
struct EchoStep {
    name: String,
    field: String,
    value: String,
    delay_ms: u64,
}

impl EchoStep {
    fn new(name: &str, field: &str, value: &str, delay_ms: u64) -> Arc<dyn Step> {
        Arc::new(Self {
            name: name.to_string(),
            field: field.to_string(),
            value: value.to_string(),
            delay_ms,
        })
    }
}

#[async_trait]
impl Step for EchoStep {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, _ctx: StepContext) -> Result<PartialUpdate, StepError> {
        if self.delay_ms > 0 {
            sleep(Duration::from_millis(self.delay_ms)).await;
        }
        Ok(PartialUpdate::new().set(&self.field, self.value.as_str()))
    }
}

/// Always fails.
struct FailStep {
    name: String,
}

impl FailStep {
    fn new(name: &str) -> Arc<dyn Step> {
        Arc::new(Self {
            name: name.to_string(),
        })
    }
}

#[async_trait]
impl Step for FailStep {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, _ctx: StepContext) -> Result<PartialUpdate, StepError> {
        Err(StepError::Failed("deliberate test failure".to_string()))
    }
}

/// Reads required input fields and concatenates them; fails when any
/// input is missing from its snapshot.
struct JoinStep {
    name: String,
    inputs: Vec<String>,
    output: String,
}

impl JoinStep {
    fn new(name: &str, inputs: &[&str], output: &str) -> Arc<dyn Step> {
        Arc::new(Self {
            name: name.to_string(),
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            output: output.to_string(),
        })
    }
}

#[async_trait]
impl Step for JoinStep {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: StepContext) -> Result<PartialUpdate, StepError> {
        let mut parts = Vec::new();
        for input in &self.inputs {
            parts.push(ctx.require_str(input)?.to_string());
        }
        Ok(PartialUpdate::new().set(&self.output, parts.join("|")))
    }
}

/// Appends one entry to the accumulating "log" field.
struct AppendStep {
    name: String,
    value: String,
    delay_ms: u64,
}

impl AppendStep {
    fn new(name: &str, value: &str, delay_ms: u64) -> Arc<dyn Step> {
        Arc::new(Self {
            name: name.to_string(),
            value: value.to_string(),
            delay_ms,
        })
    }
}

#[async_trait]
impl Step for AppendStep {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, _ctx: StepContext) -> Result<PartialUpdate, StepError> {
        sleep(Duration::from_millis(self.delay_ms)).await;
        Ok(PartialUpdate::new().set("log", self.value.as_str()))
    }
}

async fn run_with_config(
    graph: &graphcore::GraphDefinition,
    schema: StateSchema,
    config: ExecutorConfig,
) -> RunOutcome {
    let plan = ExecutionPlan::compile(graph).expect("graph should compile");
    let executor = Executor::new(config);
    let events = EventBus::new(100);
    executor
        .run(graph, &plan, StateStore::new(schema), &events)
        .await
        .expect("run should not raise an engine error")
}

async fn run(graph: &graphcore::GraphDefinition, schema: StateSchema) -> RunOutcome {
    run_with_config(graph, schema, ExecutorConfig::default()).await
}

#[tokio::test]
async fn linear_chain_runs_to_completion() {
    let mut builder = GraphBuilder::new();
    builder.add_node("a", EchoStep::new("a", "first", "1", 0)).unwrap();
    builder.add_node("b", EchoStep::new("b", "second", "2", 0)).unwrap();
    builder.add_edge(START, "a").unwrap();
    builder.add_edge("a", "b").unwrap();
    builder.add_edge("b", END).unwrap();
    let graph = builder.build();

    let outcome = run(&graph, StateSchema::new().field("first").field("second")).await;

    assert!(outcome.success);
    assert_eq!(outcome.statuses["a"], NodeStatus::Done);
    assert_eq!(outcome.statuses["b"], NodeStatus::Done);
    assert_eq!(outcome.state.get_str("first"), Some("1"));
    assert_eq!(outcome.state.get_str("second"), Some("2"));
    assert!(outcome.failures.is_empty());
}

#[tokio::test]
async fn cycle_fails_compilation() {
    let mut builder = GraphBuilder::new();
    builder.add_node("a", EchoStep::new("a", "x", "1", 0)).unwrap();
    builder.add_node("b", EchoStep::new("b", "y", "2", 0)).unwrap();
    builder.add_edge(START, "a").unwrap();
    builder.add_edge("a", "b").unwrap();
    builder.add_edge("b", "a").unwrap();
    builder.add_edge("b", END).unwrap();

    assert_eq!(
        ExecutionPlan::compile(&builder.build()).unwrap_err(),
        GraphError::Cycle
    );
}

#[tokio::test]
async fn node_cut_off_from_start_fails_compilation() {
    let mut builder = GraphBuilder::new();
    builder.add_node("a", EchoStep::new("a", "x", "1", 0)).unwrap();
    builder.add_node("orphan", EchoStep::new("orphan", "y", "2", 0)).unwrap();
    builder.add_edge(START, "a").unwrap();
    builder.add_edge("a", END).unwrap();
    builder.add_edge("orphan", END).unwrap();

    assert!(matches!(
        ExecutionPlan::compile(&builder.build()).unwrap_err(),
        GraphError::Unreachable { node, .. } if node == "orphan"
    ));
}

#[tokio::test]
async fn node_that_cannot_reach_end_fails_compilation() {
    let mut builder = GraphBuilder::new();
    builder.add_node("a", EchoStep::new("a", "x", "1", 0)).unwrap();
    builder.add_node("dead_end", EchoStep::new("dead_end", "y", "2", 0)).unwrap();
    builder.add_edge(START, "a").unwrap();
    builder.add_edge(START, "dead_end").unwrap();
    builder.add_edge("a", END).unwrap();

    assert!(matches!(
        ExecutionPlan::compile(&builder.build()).unwrap_err(),
        GraphError::Unreachable { node, .. } if node == "dead_end"
    ));
}

#[tokio::test]
async fn compilation_is_idempotent() {
    let mut builder = GraphBuilder::new();
    builder.add_node("a", EchoStep::new("a", "x", "1", 0)).unwrap();
    builder.add_node("b", EchoStep::new("b", "y", "2", 0)).unwrap();
    builder.add_edge(START, "a").unwrap();
    builder.add_edge("a", "b").unwrap();
    builder.add_edge("b", END).unwrap();
    let graph = builder.build();

    let first = ExecutionPlan::compile(&graph).unwrap();
    let second = ExecutionPlan::compile(&graph).unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn barrier_node_sees_every_predecessor() {
    // Three independent writers with shuffled delays; the join fails
    // itself if any input is missing from its snapshot, so success of
    // the run is the barrier assertion.
    for delays in [[10u64, 20, 30], [30, 10, 20], [20, 30, 10]] {
        let mut builder = GraphBuilder::new();
        builder.add_node("p1", EchoStep::new("p1", "f1", "a", delays[0])).unwrap();
        builder.add_node("p2", EchoStep::new("p2", "f2", "b", delays[1])).unwrap();
        builder.add_node("p3", EchoStep::new("p3", "f3", "c", delays[2])).unwrap();
        builder
            .add_node("join", JoinStep::new("join", &["f1", "f2", "f3"], "joined"))
            .unwrap();
        for p in ["p1", "p2", "p3"] {
            builder.add_edge(START, p).unwrap();
            builder.add_edge(p, "join").unwrap();
        }
        builder.add_edge("join", END).unwrap();
        let graph = builder.build();

        let schema = StateSchema::new()
            .field("f1")
            .field("f2")
            .field("f3")
            .field("joined");
        let outcome = run(&graph, schema).await;

        assert!(outcome.success, "join must only run after all predecessors");
        let joined = outcome.state.get_str("joined").unwrap();
        for part in ["a", "b", "c"] {
            assert!(joined.contains(part));
        }
    }
}

#[tokio::test]
async fn accumulating_field_keeps_every_contribution() {
    // Arrival order varies run to run; that nondeterminism is accepted.
    // What must hold is that no entry is lost or duplicated.
    for delays in [[5u64, 15, 25], [25, 5, 15], [15, 25, 5]] {
        let mut builder = GraphBuilder::new();
        builder.add_node("w1", AppendStep::new("w1", "a", delays[0])).unwrap();
        builder.add_node("w2", AppendStep::new("w2", "b", delays[1])).unwrap();
        builder.add_node("w3", AppendStep::new("w3", "c", delays[2])).unwrap();
        for w in ["w1", "w2", "w3"] {
            builder.add_edge(START, w).unwrap();
            builder.add_edge(w, END).unwrap();
        }
        let graph = builder.build();

        let outcome = run(&graph, StateSchema::new().accumulating("log")).await;

        assert!(outcome.success);
        let mut entries: Vec<&str> = outcome
            .state
            .get_array("log")
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        entries.sort();
        assert_eq!(entries, vec!["a", "b", "c"]);
    }
}

#[tokio::test]
async fn failure_skips_dependents_but_not_siblings() {
    // x -> y fails upstream; z -> y succeeds independently. y must be
    // skipped, z's contribution must survive, and the outcome must
    // list exactly one failure and one skip.
    let mut builder = GraphBuilder::new();
    builder.add_node("x", FailStep::new("x")).unwrap();
    builder.add_node("z", EchoStep::new("z", "z_out", "from-z", 20)).unwrap();
    builder.add_node("y", JoinStep::new("y", &["z_out"], "y_out")).unwrap();
    builder.add_edge(START, "x").unwrap();
    builder.add_edge(START, "z").unwrap();
    builder.add_edge("x", "y").unwrap();
    builder.add_edge("z", "y").unwrap();
    builder.add_edge("y", END).unwrap();
    let graph = builder.build();

    let schema = StateSchema::new().field("z_out").field("y_out");
    let outcome = run(&graph, schema).await;

    assert!(!outcome.success);
    assert_eq!(outcome.statuses["x"], NodeStatus::Failed);
    assert_eq!(outcome.statuses["z"], NodeStatus::Done);
    assert_eq!(outcome.statuses["y"], NodeStatus::Skipped);
    assert_eq!(outcome.state.get_str("z_out"), Some("from-z"));
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].node, "x");
    assert_eq!(outcome.skipped(), vec!["y"]);
}

#[tokio::test]
async fn fail_fast_cancels_in_flight_siblings() {
    let mut builder = GraphBuilder::new();
    builder.add_node("bad", FailStep::new("bad")).unwrap();
    builder.add_node("slow", EchoStep::new("slow", "slow_out", "v", 5_000)).unwrap();
    builder.add_edge(START, "bad").unwrap();
    builder.add_edge(START, "slow").unwrap();
    builder.add_edge("bad", END).unwrap();
    builder.add_edge("slow", END).unwrap();
    let graph = builder.build();

    let config = ExecutorConfig {
        fail_fast: true,
        ..Default::default()
    };
    let outcome = run_with_config(&graph, StateSchema::new().field("slow_out"), config).await;

    assert!(!outcome.success);
    assert_eq!(outcome.statuses["bad"], NodeStatus::Failed);
    assert_eq!(outcome.statuses["slow"], NodeStatus::Cancelled);
    assert_eq!(outcome.state.get("slow_out"), None);
}

#[tokio::test]
async fn deadline_preserves_completed_work() {
    let mut builder = GraphBuilder::new();
    builder.add_node("fast", EchoStep::new("fast", "fast_out", "done", 10)).unwrap();
    builder.add_node("slow", EchoStep::new("slow", "slow_out", "never", 5_000)).unwrap();
    builder.add_edge(START, "fast").unwrap();
    builder.add_edge(START, "slow").unwrap();
    builder.add_edge("fast", END).unwrap();
    builder.add_edge("slow", END).unwrap();
    let graph = builder.build();

    let config = ExecutorConfig {
        deadline: Some(Duration::from_millis(200)),
        ..Default::default()
    };
    let schema = StateSchema::new().field("fast_out").field("slow_out");
    let outcome = run_with_config(&graph, schema, config).await;

    assert!(!outcome.success);
    assert_eq!(outcome.statuses["fast"], NodeStatus::Done);
    assert_eq!(outcome.statuses["slow"], NodeStatus::Cancelled);
    assert_eq!(outcome.state.get_str("fast_out"), Some("done"));
    assert_eq!(outcome.state.get("slow_out"), None);
}

#[tokio::test]
async fn max_parallel_cap_does_not_change_results() {
    let mut builder = GraphBuilder::new();
    for (node, field) in [("a", "fa"), ("b", "fb"), ("c", "fc"), ("d", "fd")] {
        builder.add_node(node, EchoStep::new(node, field, node, 5)).unwrap();
        builder.add_edge(START, node).unwrap();
        builder.add_edge(node, END).unwrap();
    }
    let graph = builder.build();

    let config = ExecutorConfig {
        max_parallel: Some(1),
        ..Default::default()
    };
    let schema = StateSchema::new().field("fa").field("fb").field("fc").field("fd");
    let outcome = run_with_config(&graph, schema, config).await;

    assert!(outcome.success);
    for field in ["fa", "fb", "fc", "fd"] {
        assert!(outcome.state.contains(field));
    }
}

#[tokio::test]
async fn panicking_step_is_contained_as_failure() {
    struct PanicStep;

    #[async_trait]
    impl Step for PanicStep {
        fn name(&self) -> &str {
            "panic"
        }

        async fn run(&self, _ctx: StepContext) -> Result<PartialUpdate, StepError> {
            panic!("boom");
        }
    }

    let mut builder = GraphBuilder::new();
    builder.add_node("p", Arc::new(PanicStep)).unwrap();
    builder.add_node("ok", EchoStep::new("ok", "ok_out", "fine", 20)).unwrap();
    builder.add_edge(START, "p").unwrap();
    builder.add_edge(START, "ok").unwrap();
    builder.add_edge("p", END).unwrap();
    builder.add_edge("ok", END).unwrap();
    let graph = builder.build();

    let outcome = run(&graph, StateSchema::new().field("ok_out")).await;

    assert!(!outcome.success);
    assert_eq!(outcome.statuses["p"], NodeStatus::Failed);
    assert_eq!(outcome.statuses["ok"], NodeStatus::Done);
    assert!(matches!(
        &outcome.failures[0].error,
        StepError::Failed(msg) if msg.contains("panicked")
    ));
}
