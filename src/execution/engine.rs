//! Request Execution Engine
//!
//! Runs one logical execution of a statement:
//! - takes coordinators from the load balancing policy's query plan
//! - sends attempts through the transport, each bounded by a timeout
//! - asks the retry policy what to do after every failed attempt
//! - optionally starts speculative executions on further nodes
//! - accumulates the execution record returned to the caller

use crate::cluster::{Node, Topology};
use crate::config::DriverConfig;
use crate::error::{DriverError, NodeError, Result};
use crate::execution::cancel::{cancelled, CancelHandle};
use crate::execution::info::AttemptOutcome;
use crate::execution::record::SharedRecord;
use crate::observability::EngineMetrics;
use crate::policies::{
    load_balancing_policy_from_name, retry_policy_from_name, speculative_policy_from_config,
    LoadBalancingPolicy, QueryPlan, RetryDecision, RetryPolicy, SpeculativeExecutionPolicy,
};
use crate::response::{ExecutionResult, Response};
use crate::statement::Statement;
use crate::transport::Transport;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio::task::JoinSet;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Executes statements against the cluster.
pub struct RequestEngine {
    config: DriverConfig,
    load_balancing: Arc<dyn LoadBalancingPolicy>,
    retry: Arc<dyn RetryPolicy>,
    speculative: Arc<dyn SpeculativeExecutionPolicy>,
    transport: Arc<dyn Transport>,
    metrics: Arc<EngineMetrics>,
}

/// Assembles a `RequestEngine` from a transport, policies and config.
pub struct RequestEngineBuilder {
    config: DriverConfig,
    transport: Arc<dyn Transport>,
    load_balancing: Option<Arc<dyn LoadBalancingPolicy>>,
    retry: Option<Arc<dyn RetryPolicy>>,
    speculative: Option<Arc<dyn SpeculativeExecutionPolicy>>,
    metrics: Option<Arc<EngineMetrics>>,
}

impl RequestEngineBuilder {
    pub fn config(mut self, config: DriverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn load_balancing_policy(mut self, policy: Arc<dyn LoadBalancingPolicy>) -> Self {
        self.load_balancing = Some(policy);
        self
    }

    pub fn retry_policy(mut self, policy: Arc<dyn RetryPolicy>) -> Self {
        self.retry = Some(policy);
        self
    }

    pub fn speculative_execution_policy(mut self, policy: Arc<dyn SpeculativeExecutionPolicy>) -> Self {
        self.speculative = Some(policy);
        self
    }

    pub fn metrics(mut self, metrics: Arc<EngineMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Policies that were not set explicitly are resolved from the config.
    /// The load balancing policy needs a topology, so it must be set.
    pub fn build(self) -> Result<RequestEngine> {
        self.config.validate()?;

        let load_balancing = self.load_balancing.ok_or_else(|| {
            DriverError::Config("a load balancing policy is required to build an engine".to_string())
        })?;
        let retry = match self.retry {
            Some(policy) => policy,
            None => retry_policy_from_name(&self.config.retry_policy)?,
        };
        let speculative = self
            .speculative
            .unwrap_or_else(|| speculative_policy_from_config(self.config.speculative_execution.as_ref()));

        info!(
            "Request engine ready: load balancing = {}, retry = {}, speculative = {}",
            load_balancing.name(),
            retry.name(),
            speculative.name()
        );

        Ok(RequestEngine {
            config: self.config,
            load_balancing,
            retry,
            speculative,
            transport: self.transport,
            metrics: self.metrics.unwrap_or_default(),
        })
    }
}

impl RequestEngine {
    pub fn builder(transport: Arc<dyn Transport>) -> RequestEngineBuilder {
        RequestEngineBuilder {
            config: DriverConfig::default(),
            transport,
            load_balancing: None,
            retry: None,
            speculative: None,
            metrics: None,
        }
    }

    /// Build an engine with every policy resolved by name from `config`.
    pub fn from_config(
        config: DriverConfig,
        topology: Arc<dyn Topology>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let load_balancing = load_balancing_policy_from_name(&config.load_balancing_policy, topology)?;
        Self::builder(transport)
            .config(config)
            .load_balancing_policy(load_balancing)
            .build()
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<EngineMetrics> {
        &self.metrics
    }

    pub async fn execute(&self, statement: impl Into<Arc<Statement>>) -> Result<ExecutionResult> {
        let cancel = CancelHandle::new();
        self.execute_cancellable(statement, &cancel).await
    }

    /// Like `execute`, but gives up as soon as `cancel` fires. The error
    /// then carries the errors recorded so far and no coordinator.
    pub async fn execute_cancellable(
        &self,
        statement: impl Into<Arc<Statement>>,
        cancel: &CancelHandle,
    ) -> Result<ExecutionResult> {
        let statement = statement.into();
        let span = info_span!("request", query = %statement.query);
        self.run(statement, cancel.subscribe()).instrument(span).await
    }

    async fn run(&self, statement: Arc<Statement>, mut cancel: watch::Receiver<bool>) -> Result<ExecutionResult> {
        let idempotent = statement.idempotent.unwrap_or(self.config.default_idempotence);
        let attempt_timeout = statement.timeout.unwrap_or_else(|| self.config.request_timeout());
        let record = SharedRecord::new(Arc::clone(&statement));

        let mut plan = self.load_balancing.new_query_plan(&statement);
        let first = match plan.next() {
            Some(node) => node,
            None => {
                warn!("Query plan is empty, no node to send the request to");
                return Err(DriverError::NoNodeAvailable {
                    execution_info: Box::new(record.update(|r| r.failure(None))),
                });
            }
        };

        let lane = Arc::new(Lane {
            statement: Arc::clone(&statement),
            plan: Mutex::new(plan),
            record: record.clone(),
            retry: Arc::clone(&self.retry),
            transport: Arc::clone(&self.transport),
            metrics: Arc::clone(&self.metrics),
            attempt_timeout,
            idempotent,
        });

        let mut executions = JoinSet::new();
        executions.spawn(Arc::clone(&lane).run(0, Arc::clone(&first)).in_current_span());
        let mut started = 1usize;
        let mut running = 1usize;
        // Speculative executions could apply a non-idempotent statement twice
        let mut next_speculative = if idempotent {
            self.speculative
                .next_execution(&first, &statement, started)
                .map(|delay| Instant::now() + delay)
        } else {
            None
        };

        loop {
            tokio::select! {
                joined = executions.join_next() => {
                    let outcome = match joined {
                        Some(Ok(outcome)) => outcome,
                        Some(Err(join_error)) => {
                            error!("Execution task failed: {}", join_error);
                            running -= 1;
                            if running == 0 {
                                return Err(DriverError::Internal(join_error.to_string()));
                            }
                            continue;
                        }
                        None => return Err(DriverError::Internal("no execution in progress".to_string())),
                    };

                    match outcome {
                        LaneOutcome::Completed { node, attempt_index, response } => {
                            executions.abort_all();
                            debug!("Request completed by {} on attempt {}", node, attempt_index);
                            let info = record.update(|r| r.success(node, attempt_index, &response));
                            return Ok(ExecutionResult { response, info });
                        }
                        LaneOutcome::Rethrown { node, error } => {
                            executions.abort_all();
                            debug!("Request failed on {}: {}", node, error);
                            let coordinator = error.is_server_response().then_some(node);
                            let info = record.update(|r| r.failure(coordinator));
                            return Err(DriverError::Query {
                                error,
                                execution_info: Box::new(info),
                            });
                        }
                        LaneOutcome::Exhausted { node, attempt_index, error } => {
                            running -= 1;
                            if running > 0 {
                                // another execution may still succeed
                                record.update(|r| r.record_error(attempt_index, node, error));
                                continue;
                            }
                            warn!("All nodes of the query plan failed, last error on {}: {}", node, error);
                            let coordinator = error.is_server_response().then_some(node);
                            let info = record.update(|r| r.failure(coordinator));
                            return Err(DriverError::AllNodesFailed {
                                last: error,
                                execution_info: Box::new(info),
                            });
                        }
                    }
                }
                _ = sleep_or_pending(next_speculative) => {
                    next_speculative = None;
                    if let Some(node) = lane.next_node() {
                        debug!("Starting speculative execution {} on {}", started, node);
                        record.update(|r| r.speculative_started());
                        self.metrics.record_speculative_execution(&node);
                        executions.spawn(Arc::clone(&lane).run(started, Arc::clone(&node)).in_current_span());
                        started += 1;
                        running += 1;
                        next_speculative = self
                            .speculative
                            .next_execution(&node, &statement, started)
                            .map(|delay| Instant::now() + delay);
                    }
                }
                _ = cancelled(&mut cancel) => {
                    executions.abort_all();
                    info!("Request cancelled with {} execution(s) in flight", running);
                    let info = record.update(|r| r.failure(None));
                    return Err(DriverError::Cancelled {
                        execution_info: Box::new(info),
                    });
                }
            }
        }
    }
}

async fn sleep_or_pending(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

/// How one execution ended.
enum LaneOutcome {
    /// Response received, or error ignored by the retry policy
    Completed {
        node: Arc<Node>,
        attempt_index: usize,
        response: Response,
    },
    /// Retry policy rethrew the error
    Rethrown { node: Arc<Node>, error: NodeError },
    /// Retry policy asked for the next node but the plan was empty
    Exhausted {
        node: Arc<Node>,
        attempt_index: usize,
        error: NodeError,
    },
}

/// State shared by all executions of one logical request.
struct Lane {
    statement: Arc<Statement>,
    plan: Mutex<QueryPlan>,
    record: SharedRecord,
    retry: Arc<dyn RetryPolicy>,
    transport: Arc<dyn Transport>,
    metrics: Arc<EngineMetrics>,
    attempt_timeout: Duration,
    idempotent: bool,
}

impl Lane {
    fn next_node(&self) -> Option<Arc<Node>> {
        self.plan.lock().unwrap_or_else(PoisonError::into_inner).next()
    }

    /// Sequential attempts of one execution, starting on `node`.
    async fn run(self: Arc<Self>, execution: usize, mut node: Arc<Node>) -> LaneOutcome {
        let mut retry_count: u32 = 0;

        loop {
            let attempt_index = self
                .record
                .update(|r| r.begin_attempt(&node, execution, retry_count));
            debug!("Attempt {} (execution {}) sent to {}", attempt_index, execution, node);

            let started = Instant::now();
            let result = match tokio::time::timeout(
                self.attempt_timeout,
                self.transport.send(&node, &self.statement),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(NodeError::Timeout(self.attempt_timeout)),
            };
            let elapsed = started.elapsed();

            let error = match result {
                Ok(response) => {
                    self.record
                        .update(|r| r.finish_attempt(attempt_index, AttemptOutcome::Succeeded, elapsed));
                    self.metrics.record_success(&node, elapsed);
                    return LaneOutcome::Completed {
                        node,
                        attempt_index,
                        response,
                    };
                }
                Err(error) => error,
            };

            let kind = error.kind();
            self.metrics.record_error(&node, kind);
            let decision = self
                .retry
                .on_error(&error, &self.statement, retry_count, self.idempotent);
            debug!(
                "Attempt {} on {} failed with {} (retry count {}), decision: {}",
                attempt_index, node, error, retry_count, decision
            );

            match decision {
                RetryDecision::Rethrow => {
                    self.record
                        .update(|r| r.finish_attempt(attempt_index, AttemptOutcome::Failed(kind), elapsed));
                    return LaneOutcome::Rethrown { node, error };
                }
                RetryDecision::Ignore => {
                    self.record
                        .update(|r| r.finish_attempt(attempt_index, AttemptOutcome::Ignored, elapsed));
                    self.metrics.record_ignore(&node);
                    return LaneOutcome::Completed {
                        node,
                        attempt_index,
                        response: Response::empty(),
                    };
                }
                RetryDecision::RetrySame => {
                    self.record.update(|r| {
                        r.finish_attempt(attempt_index, AttemptOutcome::Failed(kind), elapsed);
                        r.record_error(attempt_index, Arc::clone(&node), error);
                    });
                    self.metrics.record_retry(&node);
                }
                RetryDecision::RetryNext => {
                    self.record
                        .update(|r| r.finish_attempt(attempt_index, AttemptOutcome::Failed(kind), elapsed));
                    match self.next_node() {
                        Some(next) => {
                            self.record
                                .update(|r| r.record_error(attempt_index, Arc::clone(&node), error));
                            self.metrics.record_retry(&node);
                            node = next;
                        }
                        None => {
                            return LaneOutcome::Exhausted {
                                node,
                                attempt_index,
                                error,
                            };
                        }
                    }
                }
            }

            retry_count += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::StaticTopology;
    use crate::execution::info::UNKNOWN_SIZE;
    use crate::policies::{ConstantSpeculativeExecutionPolicy, SortingLoadBalancingPolicy};
    use crate::statement::Consistency;
    use async_trait::async_trait;
    use std::collections::{HashMap, VecDeque};
    use std::net::SocketAddr;

    struct Scripted {
        delay: Duration,
        result: std::result::Result<Response, NodeError>,
    }

    /// Answers from a per-address script, then with empty successes.
    #[derive(Default)]
    struct ScriptedTransport {
        script: Mutex<HashMap<SocketAddr, VecDeque<Scripted>>>,
    }

    impl ScriptedTransport {
        fn push(&self, node: &Node, delay: Duration, result: std::result::Result<Response, NodeError>) {
            self.script
                .lock()
                .unwrap()
                .entry(node.connect_address)
                .or_default()
                .push_back(Scripted { delay, result });
        }

        fn fail(&self, node: &Node, error: NodeError) {
            self.push(node, Duration::ZERO, Err(error));
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, node: &Node, _statement: &Statement) -> std::result::Result<Response, NodeError> {
            let next = self
                .script
                .lock()
                .unwrap()
                .get_mut(&node.connect_address)
                .and_then(|queue| queue.pop_front());
            match next {
                Some(scripted) => {
                    tokio::time::sleep(scripted.delay).await;
                    scripted.result
                }
                None => Ok(Response::empty()),
            }
        }
    }

    struct IgnoreAll;

    impl RetryPolicy for IgnoreAll {
        fn name(&self) -> &'static str {
            "IgnoreAll"
        }

        fn on_error(&self, _: &NodeError, _: &Statement, _: u32, _: bool) -> RetryDecision {
            RetryDecision::Ignore
        }
    }

    struct Fixture {
        nodes: Vec<Arc<Node>>,
        transport: Arc<ScriptedTransport>,
        topology: Arc<StaticTopology>,
    }

    impl Fixture {
        fn new(size: u8) -> Self {
            let topology = Arc::new(StaticTopology::new());
            let nodes = (1..=size)
                .map(|i| topology.add_node(Node::new(format!("127.0.0.{}:9042", i).parse().unwrap())))
                .collect();
            Self {
                nodes,
                transport: Arc::new(ScriptedTransport::default()),
                topology,
            }
        }

        fn builder(&self) -> RequestEngineBuilder {
            RequestEngine::builder(self.transport.clone())
                .load_balancing_policy(Arc::new(SortingLoadBalancingPolicy::new(self.topology.clone())))
        }

        fn engine(&self) -> RequestEngine {
            self.builder().build().unwrap()
        }
    }

    fn unavailable() -> NodeError {
        NodeError::Unavailable {
            consistency: Consistency::One,
            required: 1,
            alive: 0,
        }
    }

    #[tokio::test]
    async fn test_unavailable_then_invalid_query() {
        let fixture = Fixture::new(2);
        fixture.transport.fail(&fixture.nodes[0], unavailable());
        fixture
            .transport
            .fail(&fixture.nodes[1], NodeError::InvalidQuery("Mock error message".to_string()));

        let err = fixture.engine().execute(Statement::new("mock query")).await.unwrap_err();
        assert_eq!(err.node_error(), Some(&NodeError::InvalidQuery("Mock error message".to_string())));

        let info = err.execution_info().unwrap();
        assert_eq!(info.coordinator(), Some(&fixture.nodes[1]));
        assert_eq!(info.errors().len(), 1);
        assert_eq!(info.errors()[0].0, fixture.nodes[0]);
        assert_eq!(info.errors()[0].1, unavailable());
        assert_eq!(info.successful_execution_index(), None);
        assert_eq!(info.statement().query, "mock query");
        assert_eq!(info.attempt_count(), 2);
        assert_eq!(info.response_size_in_bytes(), UNKNOWN_SIZE);
        assert!(info.warnings().is_empty());
        assert!(info.is_schema_in_agreement());
    }

    #[tokio::test]
    async fn test_retry_same_stays_on_node() {
        let fixture = Fixture::new(2);
        let read_timeout = NodeError::ReadTimeout {
            consistency: Consistency::Quorum,
            received: 2,
            block_for: 2,
            data_present: false,
        };
        fixture.transport.fail(&fixture.nodes[0], read_timeout.clone());
        fixture.transport.push(
            &fixture.nodes[0],
            Duration::ZERO,
            Ok(Response::with_rows(vec![vec![serde_json::json!("row")]])),
        );

        let result = fixture.engine().execute(Statement::new("q")).await.unwrap();
        let info = result.execution_info();
        assert_eq!(result.rows().len(), 1);
        assert_eq!(info.coordinator(), Some(&fixture.nodes[0]));
        assert_eq!(info.successful_execution_index(), Some(1));
        assert_eq!(info.errors(), &[(Arc::clone(&fixture.nodes[0]), read_timeout)][..]);
        assert_eq!(info.attempts()[1].retry_count, 1);
        assert_eq!(info.attempts()[1].node, fixture.nodes[0]);
    }

    #[tokio::test]
    async fn test_ignore_completes_with_empty_response() {
        let fixture = Fixture::new(2);
        fixture.transport.fail(&fixture.nodes[0], NodeError::ServerError("boom".to_string()));
        let engine = fixture.builder().retry_policy(Arc::new(IgnoreAll)).build().unwrap();

        let result = engine.execute(Statement::new("q")).await.unwrap();
        let info = result.execution_info();
        assert!(result.rows().is_empty());
        assert_eq!(info.coordinator(), Some(&fixture.nodes[0]));
        assert_eq!(info.successful_execution_index(), Some(0));
        assert!(info.errors().is_empty());
        assert_eq!(info.attempts()[0].outcome, AttemptOutcome::Ignored);
        assert_eq!(engine.metrics().node(&fixture.nodes[0].id).unwrap().ignores, 1);
    }

    #[tokio::test]
    async fn test_exhausted_plan_reports_last_error() {
        let fixture = Fixture::new(2);
        fixture.transport.fail(&fixture.nodes[0], NodeError::Bootstrapping);
        fixture.transport.fail(&fixture.nodes[1], NodeError::Bootstrapping);

        let err = fixture.engine().execute(Statement::new("q")).await.unwrap_err();
        assert!(matches!(err, DriverError::AllNodesFailed { last: NodeError::Bootstrapping, .. }));
        assert_eq!(err.kind(), crate::error::ErrorKind::PolicyExhausted);

        let info = err.execution_info().unwrap();
        assert_eq!(info.errors().len(), 1);
        assert_eq!(info.errors()[0].0, fixture.nodes[0]);
        assert_eq!(info.coordinator(), Some(&fixture.nodes[1]));
    }

    #[tokio::test]
    async fn test_empty_plan() {
        let fixture = Fixture::new(0);
        let err = fixture.engine().execute(Statement::new("q")).await.unwrap_err();
        assert!(matches!(err, DriverError::NoNodeAvailable { .. }));

        let info = err.execution_info().unwrap();
        assert!(info.coordinator().is_none());
        assert!(info.errors().is_empty());
        assert_eq!(info.attempt_count(), 0);
    }

    #[tokio::test]
    async fn test_attempt_timeout_moves_on_when_idempotent() {
        let fixture = Fixture::new(2);
        fixture
            .transport
            .push(&fixture.nodes[0], Duration::from_millis(500), Ok(Response::empty()));

        let statement = Statement::new("q")
            .with_idempotence(true)
            .with_timeout(Duration::from_millis(30));
        let result = fixture.engine().execute(statement).await.unwrap();
        let info = result.execution_info();

        assert_eq!(info.coordinator(), Some(&fixture.nodes[1]));
        assert_eq!(info.errors()[0].1, NodeError::Timeout(Duration::from_millis(30)));
        assert_eq!(
            info.attempts()[0].outcome,
            AttemptOutcome::Failed(crate::error::ErrorKind::Timeout)
        );
    }

    #[tokio::test]
    async fn test_attempt_timeout_rethrown_without_coordinator() {
        let fixture = Fixture::new(2);
        fixture
            .transport
            .push(&fixture.nodes[0], Duration::from_millis(500), Ok(Response::empty()));

        let statement = Statement::new("q").with_timeout(Duration::from_millis(30));
        let err = fixture.engine().execute(statement).await.unwrap_err();

        assert_eq!(err.node_error(), Some(&NodeError::Timeout(Duration::from_millis(30))));
        let info = err.execution_info().unwrap();
        assert!(info.coordinator().is_none());
        assert!(info.errors().is_empty());
    }

    #[tokio::test]
    async fn test_cancellation_returns_partial_record() {
        let fixture = Fixture::new(2);
        fixture.transport.fail(&fixture.nodes[0], unavailable());
        fixture
            .transport
            .push(&fixture.nodes[1], Duration::from_secs(5), Ok(Response::empty()));

        let engine = fixture.engine();
        let cancel = CancelHandle::new();
        let remote = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            remote.cancel();
        });

        let err = engine
            .execute_cancellable(Statement::new("q"), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::Cancelled { .. }));

        let info = err.execution_info().unwrap();
        assert!(info.coordinator().is_none());
        assert_eq!(info.errors().len(), 1);
        assert_eq!(info.attempts()[1].outcome, AttemptOutcome::Cancelled);
    }

    #[tokio::test]
    async fn test_speculative_execution_wins() {
        let fixture = Fixture::new(2);
        fixture
            .transport
            .push(&fixture.nodes[0], Duration::from_millis(500), Ok(Response::empty()));
        let engine = fixture
            .builder()
            .speculative_execution_policy(Arc::new(ConstantSpeculativeExecutionPolicy::new(
                2,
                Duration::from_millis(20),
            )))
            .build()
            .unwrap();

        let result = engine.execute(Statement::new("q").with_idempotence(true)).await.unwrap();
        let info = result.execution_info();

        assert_eq!(info.coordinator(), Some(&fixture.nodes[1]));
        assert_eq!(info.speculative_execution_count(), 1);
        assert_eq!(info.successful_execution_index(), Some(1));
        assert_eq!(info.attempts()[0].outcome, AttemptOutcome::Cancelled);
        assert_eq!(info.attempts()[1].execution, 1);
        assert_eq!(
            engine
                .metrics()
                .node(&fixture.nodes[1].id)
                .unwrap()
                .speculative_executions,
            1
        );
    }

    #[tokio::test]
    async fn test_no_speculation_for_non_idempotent_statements() {
        let fixture = Fixture::new(2);
        fixture
            .transport
            .push(&fixture.nodes[0], Duration::from_millis(100), Ok(Response::empty()));
        let engine = fixture
            .builder()
            .speculative_execution_policy(Arc::new(ConstantSpeculativeExecutionPolicy::new(
                2,
                Duration::from_millis(10),
            )))
            .build()
            .unwrap();

        let result = engine.execute(Statement::new("q")).await.unwrap();
        let info = result.execution_info();
        assert_eq!(info.coordinator(), Some(&fixture.nodes[0]));
        assert_eq!(info.speculative_execution_count(), 0);
        assert_eq!(info.attempt_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_speculative_execution_does_not_end_request() {
        let fixture = Fixture::new(3);
        fixture
            .transport
            .push(&fixture.nodes[0], Duration::from_millis(150), Ok(Response::empty()));
        fixture.transport.fail(&fixture.nodes[1], NodeError::Bootstrapping);
        let engine = fixture
            .builder()
            .speculative_execution_policy(Arc::new(ConstantSpeculativeExecutionPolicy::new(
                2,
                Duration::from_millis(20),
            )))
            .build()
            .unwrap();

        // node1 fails and its execution moves on to node2, which answers first
        let result = engine.execute(Statement::new("q").with_idempotence(true)).await.unwrap();
        let info = result.execution_info();
        assert_eq!(info.coordinator(), Some(&fixture.nodes[2]));
        assert_eq!(info.errors().len(), 1);
        assert_eq!(info.errors()[0].0, fixture.nodes[1]);
    }

    #[tokio::test]
    async fn test_exhausted_speculative_execution_waits_for_others() {
        let fixture = Fixture::new(2);
        fixture
            .transport
            .push(&fixture.nodes[0], Duration::from_millis(150), Ok(Response::empty()));
        fixture.transport.fail(&fixture.nodes[1], NodeError::Bootstrapping);
        let engine = fixture
            .builder()
            .speculative_execution_policy(Arc::new(ConstantSpeculativeExecutionPolicy::new(
                2,
                Duration::from_millis(20),
            )))
            .build()
            .unwrap();

        // node1 runs out of plan while node0 is still pending
        let result = engine.execute(Statement::new("q").with_idempotence(true)).await.unwrap();
        let info = result.execution_info();
        assert_eq!(info.coordinator(), Some(&fixture.nodes[0]));
        assert_eq!(info.successful_execution_index(), Some(0));
        assert_eq!(info.speculative_execution_count(), 1);
        assert_eq!(
            info.errors(),
            &[(Arc::clone(&fixture.nodes[1]), NodeError::Bootstrapping)][..]
        );
        assert_eq!(
            info.attempts()[1].outcome,
            AttemptOutcome::Failed(crate::error::ErrorKind::CoordinatorUnavailable)
        );
    }

    #[tokio::test]
    async fn test_builder_requires_load_balancing_policy() {
        let transport: Arc<dyn Transport> = Arc::new(ScriptedTransport::default());
        assert!(matches!(
            RequestEngine::builder(transport).build(),
            Err(DriverError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_from_config_resolves_policies() {
        let fixture = Fixture::new(1);
        let config = DriverConfig {
            load_balancing_policy: "SortingLoadBalancingPolicy".to_string(),
            retry_policy: "FallthroughRetryPolicy".to_string(),
            ..DriverConfig::default()
        };
        let engine = RequestEngine::from_config(config, fixture.topology.clone(), fixture.transport.clone()).unwrap();
        fixture.transport.fail(&fixture.nodes[0], unavailable());

        let err = engine.execute(Statement::new("q")).await.unwrap_err();
        assert!(matches!(err, DriverError::Query { .. }));
        assert_eq!(engine.config().retry_policy, "FallthroughRetryPolicy");
    }
}
