// dataguard-core/src/application/orchestrator.rs

use chrono::{NaiveDate, Utc};
use futures::StreamExt;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::aggregator::{DimensionFindings, DomainOutcome, ViolationAggregator};
use super::report::Report;
use super::router::{RemediationRouter, RoutingScope};
use crate::domain::error::{ConfigError, DomainError, SnapshotError};
use crate::domain::evaluators::{EvaluationInput, Evaluator, standard_evaluators};
use crate::domain::graph::ReferenceGraph;
use crate::domain::model::{Dataset, DomainName};
use crate::domain::policy::{DomainPolicy, EvaluationContext, PolicyRegistry};
use crate::domain::quality::Dimension;
use crate::ports::snapshot::SnapshotProvider;

/// Concurrent loads and evaluator tasks in flight.
pub const DEFAULT_WORKERS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Initializing,
    Evaluating,
    Aggregating,
    Routing,
    Completed,
    Aborted,
}

impl RunState {
    /// Next state on the happy path. Terminal states have none.
    pub fn next(self) -> Option<RunState> {
        match self {
            Self::Initializing => Some(Self::Evaluating),
            Self::Evaluating => Some(Self::Aggregating),
            Self::Aggregating => Some(Self::Routing),
            Self::Routing => Some(Self::Completed),
            Self::Completed | Self::Aborted => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self.next().is_none()
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub context: EvaluationContext,
    pub scope: RoutingScope,
    /// Reference date for "not in future" checks, fixed once per run.
    pub as_of: NaiveDate,
    pub workers: usize,
    /// Upper bound on records read per snapshot. `None` reads sources to the end.
    pub record_limit: Option<usize>,
    pub cancel: CancellationToken,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            context: EvaluationContext::default(),
            scope: RoutingScope::default(),
            as_of: Utc::now().date_naive(),
            workers: DEFAULT_WORKERS,
            record_limit: None,
            cancel: CancellationToken::new(),
        }
    }
}

impl RunOptions {
    pub fn with_context(mut self, context: EvaluationContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_scope(mut self, scope: RoutingScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_as_of(mut self, as_of: NaiveDate) -> Self {
        self.as_of = as_of;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_record_limit(mut self, limit: usize) -> Self {
        self.record_limit = Some(limit);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Logs state transitions of one run.
struct RunTracker {
    state: RunState,
}

impl RunTracker {
    fn start() -> Self {
        debug!(state = ?RunState::Initializing, "Run created");
        Self {
            state: RunState::Initializing,
        }
    }

    fn advance(&mut self, next: RunState) {
        debug_assert_eq!(self.state.next(), Some(next));
        debug!(from = ?self.state, to = ?next, "Run state transition");
        self.state = next;
    }

    fn abort(&mut self, reason: &dyn std::fmt::Display) {
        warn!(target: "audit", operation = "run", status = "aborted", from = ?self.state, reason = %reason);
        self.state = RunState::Aborted;
    }
}

type Snapshots = BTreeMap<DomainName, Dataset>;

/// Root of the engine: loads snapshots, fans out evaluators, scores and routes.
pub struct EvaluationOrchestrator {
    registry: Arc<PolicyRegistry>,
    graph: ReferenceGraph,
    evaluators: Vec<Arc<dyn Evaluator>>,
}

impl EvaluationOrchestrator {
    pub fn new(registry: PolicyRegistry) -> Self {
        let graph = ReferenceGraph::from_registry(&registry);
        Self {
            registry: Arc::new(registry),
            graph,
            evaluators: standard_evaluators().into_iter().map(Arc::from).collect(),
        }
    }

    /// Replaces the evaluator set. New dimensions plug in here.
    pub fn with_evaluators(mut self, evaluators: Vec<Box<dyn Evaluator>>) -> Self {
        self.evaluators = evaluators.into_iter().map(Arc::from).collect();
        self
    }

    pub fn registry(&self) -> &PolicyRegistry {
        &self.registry
    }

    pub fn graph(&self) -> &ReferenceGraph {
        &self.graph
    }

    /// Evaluates `domains` (every registered domain when empty) and returns one report.
    ///
    /// Fails only on configuration errors, when no requested snapshot could be read,
    /// or on cancellation. Cancellation never yields a partial report.
    #[instrument(skip_all, fields(context = %options.context, domains = domains.len()))]
    pub async fn run(
        &self,
        domains: &BTreeSet<DomainName>,
        provider: &dyn SnapshotProvider,
        options: &RunOptions,
    ) -> Result<Report, DomainError> {
        let mut run = RunTracker::start();

        let requested = match self.resolve_domains(domains) {
            Ok(requested) => requested,
            Err(e) => {
                run.abort(&e);
                return Err(e.into());
            }
        };
        info!(
            target: "audit",
            operation = "run_start",
            status = "started",
            domains = ?requested,
            as_of = %options.as_of,
        );

        // --- EVALUATING ---
        run.advance(RunState::Evaluating);
        let (snapshots, failures) = self.load_snapshots(&requested, provider, options).await;
        if options.cancel.is_cancelled() {
            run.abort(&DomainError::Cancelled);
            return Err(DomainError::Cancelled);
        }

        if !requested.is_empty() && requested.iter().all(|d| failures.contains_key(d)) {
            let first = requested
                .iter()
                .find_map(|d| failures.get(d).cloned())
                .unwrap_or_else(|| SnapshotError::Missing(String::new()));
            run.abort(&first);
            return Err(first.into());
        }

        let snapshots = Arc::new(snapshots);
        let mut findings = self.evaluate(&requested, &snapshots, options).await;
        if options.cancel.is_cancelled() {
            run.abort(&DomainError::Cancelled);
            return Err(DomainError::Cancelled);
        }

        // --- AGGREGATING ---
        run.advance(RunState::Aggregating);
        let mut diagnostics = Vec::new();
        let mut outcomes = Vec::with_capacity(requested.len());
        for domain in &requested {
            match (failures.get(domain), snapshots.get(domain)) {
                (Some(e), _) => outcomes.push(DomainOutcome::Aborted {
                    domain: domain.clone(),
                    reason: e.to_string(),
                }),
                (None, Some(dataset)) => outcomes.push(DomainOutcome::Evaluated {
                    domain: domain.clone(),
                    total_records: dataset.len(),
                    findings: findings.remove(domain).unwrap_or_default(),
                }),
                (None, None) => outcomes.push(DomainOutcome::Aborted {
                    domain: domain.clone(),
                    reason: SnapshotError::Missing(domain.to_string()).to_string(),
                }),
            }
        }
        for (domain, e) in &failures {
            if !requested.contains(domain) {
                diagnostics.push(format!("referenced snapshot '{}' unavailable: {}", domain, e));
            }
        }

        let aggregator = ViolationAggregator::new(&self.registry);
        let mut report = match aggregator.assemble(options.context, options.as_of, outcomes) {
            Ok(report) => report,
            Err(e) => {
                run.abort(&e);
                return Err(e.into());
            }
        };

        // --- ROUTING ---
        run.advance(RunState::Routing);
        let router = RemediationRouter::new(&self.registry, options.context);
        let (mut actions, notes) = router.dispatch(&report, options.scope);
        actions.sort();
        report.actions = actions;
        diagnostics.extend(notes);
        report.diagnostics = diagnostics;

        run.advance(RunState::Completed);
        for (domain, verdict) in &report.domains {
            let status = if verdict.passed { "passed" } else { "failed" };
            info!(
                target: "audit",
                operation = "verdict",
                status,
                domain = %domain,
                records = verdict.records_evaluated,
            );
        }
        info!(
            target: "audit",
            operation = "run_end",
            status = "completed",
            passed = report.passed,
            violations = report.violations.len(),
            actions = report.actions.len(),
        );

        Ok(report)
    }

    fn resolve_domains(&self, domains: &BTreeSet<DomainName>) -> Result<BTreeSet<DomainName>, ConfigError> {
        if domains.is_empty() {
            return Ok(self.registry.domain_names());
        }
        for domain in domains {
            self.registry.domain(domain)?;
        }
        Ok(domains.clone())
    }

    /// Fixes every snapshot the run reads, requested domains and the domains they reference,
    /// before any evaluator starts.
    async fn load_snapshots(
        &self,
        requested: &BTreeSet<DomainName>,
        provider: &dyn SnapshotProvider,
        options: &RunOptions,
    ) -> (Snapshots, BTreeMap<DomainName, SnapshotError>) {
        let closure = self.graph.closure(requested);
        let layers = self.graph.load_layers(&closure);

        let mut snapshots = BTreeMap::new();
        let mut failures = BTreeMap::new();

        for (i, layer) in layers.iter().enumerate() {
            if options.cancel.is_cancelled() {
                break;
            }
            debug!(layer = i, domains = layer.len(), "Loading snapshot layer");

            let loads = layer.iter().map(|domain| async move {
                let result = match self.registry.domain(domain) {
                    Ok(policy) => {
                        load_snapshot(provider, policy, options.record_limit, &options.cancel).await
                    }
                    Err(_) => Err(SnapshotError::Missing(domain.to_string())),
                };
                (domain.clone(), result)
            });

            let results: Vec<_> = futures::stream::iter(loads)
                .buffer_unordered(options.workers.max(1))
                .collect()
                .await;

            for (domain, result) in results {
                match result {
                    Ok(dataset) => {
                        info!(
                            target: "audit",
                            operation = "snapshot_load",
                            status = "ok",
                            domain = %domain,
                            records = dataset.len(),
                        );
                        snapshots.insert(domain, dataset);
                    }
                    Err(e) => {
                        error!(
                            target: "audit",
                            operation = "snapshot_load",
                            status = "failed",
                            domain = %domain,
                            error = %e,
                        );
                        failures.insert(domain, e);
                    }
                }
            }
        }

        (snapshots, failures)
    }

    /// One blocking task per (domain, evaluator). Tasks share the snapshots read-only and
    /// only communicate through the findings they return.
    async fn evaluate(
        &self,
        requested: &BTreeSet<DomainName>,
        snapshots: &Arc<Snapshots>,
        options: &RunOptions,
    ) -> BTreeMap<DomainName, BTreeMap<Dimension, DimensionFindings>> {
        let jobs = requested
            .iter()
            .filter(|d| snapshots.contains_key(*d))
            .flat_map(|d| self.evaluators.iter().map(move |e| (d.clone(), Arc::clone(e))));

        let tasks = jobs.map(|(domain, evaluator)| {
            let registry = Arc::clone(&self.registry);
            let snapshots = Arc::clone(snapshots);
            let cancel = options.cancel.clone();
            let as_of = options.as_of;
            let dimension = evaluator.dimension();

            async move {
                let task_domain = domain.clone();
                let handle = tokio::task::spawn_blocking(move || {
                    run_evaluator(
                        evaluator.as_ref(),
                        &registry,
                        &snapshots,
                        &task_domain,
                        as_of,
                        &cancel,
                    )
                });
                let findings = match handle.await {
                    Ok(findings) => findings,
                    Err(e) => DimensionFindings::Unavailable {
                        reason: format!("evaluator task failed: {}", e),
                    },
                };
                (domain, dimension, findings)
            }
        });

        let results: Vec<_> = futures::stream::iter(tasks)
            .buffer_unordered(options.workers.max(1))
            .collect()
            .await;

        let mut grouped: BTreeMap<DomainName, BTreeMap<Dimension, DimensionFindings>> = BTreeMap::new();
        for (domain, dimension, findings) in results {
            grouped.entry(domain).or_default().insert(dimension, findings);
        }
        grouped
    }
}

async fn load_snapshot(
    provider: &dyn SnapshotProvider,
    policy: &DomainPolicy,
    record_limit: Option<usize>,
    cancel: &CancellationToken,
) -> Result<Dataset, SnapshotError> {
    let mut source = provider.open(&policy.name, &policy.schema).await?;
    let mut rows = Vec::new();
    // Suspension points sit on record boundaries only.
    while !cancel.is_cancelled() {
        match source.next().await? {
            Some(raw) => {
                if let Some(limit) = record_limit
                    && rows.len() >= limit
                {
                    return Err(SnapshotError::TooLarge {
                        domain: policy.name.to_string(),
                        limit,
                    });
                }
                rows.push(raw);
            }
            None => break,
        }
    }
    Ok(Dataset::from_raw(policy.name.clone(), &policy.schema, rows))
}

fn run_evaluator(
    evaluator: &dyn Evaluator,
    registry: &PolicyRegistry,
    snapshots: &Snapshots,
    domain: &DomainName,
    as_of: NaiveDate,
    cancel: &CancellationToken,
) -> DimensionFindings {
    let (Ok(policy), Some(dataset)) = (registry.domain(domain), snapshots.get(domain)) else {
        return DimensionFindings::Unavailable {
            reason: format!("no snapshot for '{}'", domain),
        };
    };

    let input = EvaluationInput {
        dataset,
        policy,
        snapshots,
        as_of,
        cancel,
    };

    match evaluator.evaluate(input) {
        Ok(stream) => DimensionFindings::Evaluated {
            violations: stream.collect(),
            evaluated: evaluator.denominator(&input),
        },
        Err(e) => {
            warn!(domain = %domain, dimension = %evaluator.dimension(), error = %e, "Dimension unavailable");
            DimensionFindings::Unavailable {
                reason: e.to_string(),
            }
        }
    }
}
