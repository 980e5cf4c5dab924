//! Batch audit orchestration.
//!
//! A submitted job gets its own pool of `concurrency_limit` tokio tasks. The
//! workers share one atomic cursor over the job's targets, so each target is
//! claimed exactly once and a slow or failing target only ever occupies the
//! worker that claimed it. Per-target failures are recorded as data on the
//! target's result; only store failures fail the job itself.

use std::{
    collections::HashSet,
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU32, AtomicUsize, Ordering},
    },
    time::Instant,
};

use auditgate_model::{
    FindingRef, Job, JobId, JobStatus, ModelError, RecommendedAction,
    ResultsMode, ScoringContext, SubmitRequest, TargetResult,
};
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::{
    error::{AuditError, Result},
    remediation::RemediationDrafter,
    resilience::{BreakerRegistry, DOM_SCANNER, RetryOutcome, with_retry},
    review::{ReviewSubmission, ReviewWorkflow},
    scoring::ScoringEngine,
};

use super::{
    checker::AccessibilityChecker,
    config::{MAX_CONCURRENCY_LIMIT, OrchestratorConfig},
    event_bus::InProcJobEventBus,
    events::{JobEvent, JobEventPayload, JobEventPublisher},
    store::JobStore,
};

/// Reason recorded on jobs stopped through `cancel`.
pub const CANCELLED_REASON: &str = "cancelled";

/// Where successful targets' findings go when the review feed is enabled.
#[derive(Clone, Debug)]
pub struct ReviewFeed {
    pub workflow: ReviewWorkflow,
    /// Drafts suggested fixes for findings routed to human review.
    pub drafter: Option<RemediationDrafter>,
}

struct ServiceInner {
    config: OrchestratorConfig,
    store: Arc<dyn JobStore>,
    checker: Arc<dyn AccessibilityChecker>,
    breakers: BreakerRegistry,
    scoring: ScoringEngine,
    events: Arc<InProcJobEventBus>,
    review_feed: Option<ReviewFeed>,
    running: DashMap<JobId, CancellationToken>,
}

/// Entry point for submitting and observing batch audits. Clones share the
/// same jobs, breakers and event bus.
#[derive(Clone)]
pub struct BatchAuditService {
    inner: Arc<ServiceInner>,
}

impl fmt::Debug for BatchAuditService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchAuditService")
            .field("config", &self.inner.config)
            .field("running_jobs", &self.inner.running.len())
            .field("review_feed", &self.inner.review_feed.is_some())
            .finish()
    }
}

/// Builder for [`BatchAuditService`]; only the store and checker are
/// mandatory.
pub struct BatchAuditServiceBuilder {
    config: OrchestratorConfig,
    store: Arc<dyn JobStore>,
    checker: Arc<dyn AccessibilityChecker>,
    breakers: BreakerRegistry,
    scoring: ScoringEngine,
    events: Option<Arc<InProcJobEventBus>>,
    review_feed: Option<ReviewFeed>,
}

impl fmt::Debug for BatchAuditServiceBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchAuditServiceBuilder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl BatchAuditServiceBuilder {
    pub fn config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn breakers(mut self, breakers: BreakerRegistry) -> Self {
        self.breakers = breakers;
        self
    }

    pub fn scoring(mut self, scoring: ScoringEngine) -> Self {
        self.scoring = scoring;
        self
    }

    pub fn events(mut self, events: Arc<InProcJobEventBus>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn review_feed(mut self, feed: ReviewFeed) -> Self {
        self.review_feed = Some(feed);
        self
    }

    pub fn build(self) -> BatchAuditService {
        let events = self.events.unwrap_or_else(|| {
            Arc::new(InProcJobEventBus::new(self.config.event_channel_capacity))
        });
        BatchAuditService {
            inner: Arc::new(ServiceInner {
                config: self.config,
                store: self.store,
                checker: self.checker,
                breakers: self.breakers,
                scoring: self.scoring,
                events,
                review_feed: self.review_feed,
                running: DashMap::new(),
            }),
        }
    }
}

impl BatchAuditService {
    pub fn builder(
        store: Arc<dyn JobStore>,
        checker: Arc<dyn AccessibilityChecker>,
    ) -> BatchAuditServiceBuilder {
        BatchAuditServiceBuilder {
            config: OrchestratorConfig::default(),
            store,
            checker,
            breakers: BreakerRegistry::default(),
            scoring: ScoringEngine::default(),
            events: None,
            review_feed: None,
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.inner.config
    }

    pub fn breakers(&self) -> &BreakerRegistry {
        &self.inner.breakers
    }

    pub fn events(&self) -> Arc<InProcJobEventBus> {
        Arc::clone(&self.inner.events)
    }

    /// Validates the request, stores a queued job and starts its worker pool
    /// in the background. Returns as soon as the job is stored.
    pub async fn submit(&self, request: SubmitRequest) -> Result<JobId> {
        let targets = parse_targets(&request.targets)?;
        let limit = request
            .concurrency_limit
            .unwrap_or(self.inner.config.default_concurrency);
        self.submit_targets(targets, limit, request.context).await
    }

    pub async fn status(&self, job_id: JobId) -> Result<Job> {
        self.inner
            .store
            .get(job_id)
            .await?
            .ok_or_else(|| AuditError::NotFound(format!("job {job_id}")))
    }

    /// Per-target results in submission order. `Final` refuses jobs that are
    /// still queued or running; `Partial` returns whatever has finished.
    pub async fn results(
        &self,
        job_id: JobId,
        mode: ResultsMode,
    ) -> Result<Vec<TargetResult>> {
        let job = self.status(job_id).await?;
        if mode == ResultsMode::Final && !job.status.is_terminal() {
            let (done, total) = job.progress();
            return Err(AuditError::NotReady(format!(
                "job {job_id} is {} ({done}/{total} targets finished)",
                job.status
            )));
        }
        Ok(job.ordered_results())
    }

    /// Stops workers from claiming further targets. In-flight targets finish
    /// or hit their own timeout; the job then ends `failed` with reason
    /// `cancelled`. Cancelling a finished job is a no-op.
    pub async fn cancel(&self, job_id: JobId) -> Result<Job> {
        let job = self.status(job_id).await?;
        if let Some(token) = self.inner.running.get(&job_id) {
            info!(job_id = %job_id, "cancelling job");
            token.cancel();
        }
        Ok(job)
    }

    /// Starts a new job covering only the targets of a finished job that
    /// errored or never ran. Jobs are never retried automatically.
    pub async fn resubmit_failed(&self, job_id: JobId) -> Result<JobId> {
        let job = self.status(job_id).await?;
        if !job.status.is_terminal() {
            return Err(AuditError::NotReady(format!(
                "job {job_id} is still {}",
                job.status
            )));
        }

        let retry = job.retryable_targets();
        if retry.is_empty() {
            return Err(AuditError::InvalidInput(format!(
                "job {job_id} has no failed targets"
            )));
        }

        info!(
            job_id = %job_id,
            targets = retry.len(),
            "resubmitting failed targets"
        );
        self.submit_targets(retry, job.concurrency_limit, job.context)
            .await
    }

    /// Waits until the job reaches `completed` or `failed`.
    pub async fn wait_until_finished(&self, job_id: JobId) -> Result<Job> {
        let mut rx = self.inner.events.subscribe();
        loop {
            let job = self.status(job_id).await?;
            if job.status.is_terminal() {
                return Ok(job);
            }
            match rx.recv().await {
                Ok(_) | Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => {
                    return Err(AuditError::Internal(
                        "job event bus closed".into(),
                    ));
                }
            }
        }
    }

    async fn submit_targets(
        &self,
        targets: Vec<Url>,
        concurrency_limit: usize,
        context: Option<ScoringContext>,
    ) -> Result<JobId> {
        if !(1..=MAX_CONCURRENCY_LIMIT).contains(&concurrency_limit) {
            return Err(AuditError::InvalidInput(format!(
                "concurrency_limit must be within 1..={MAX_CONCURRENCY_LIMIT}, got {concurrency_limit}"
            )));
        }

        let job = Job::new(targets, concurrency_limit, context);
        let job_id = job.id;
        let total = job.targets.len();
        self.inner.store.insert(job).await?;

        let token = CancellationToken::new();
        self.inner.running.insert(job_id, token.clone());
        self.inner
            .publish(
                job_id,
                JobEventPayload::Submitted {
                    targets: total,
                    concurrency_limit,
                },
            )
            .await;
        info!(
            job_id = %job_id,
            targets = total,
            concurrency_limit,
            "job submitted"
        );

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { inner.run_job(job_id, token).await });
        Ok(job_id)
    }
}

impl ServiceInner {
    async fn run_job(self: Arc<Self>, job_id: JobId, token: CancellationToken) {
        let job = match self.store.get(job_id).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                error!(job_id = %job_id, "submitted job vanished from store");
                self.running.remove(&job_id);
                return;
            }
            Err(err) => {
                error!(job_id = %job_id, error = %err, "failed to load job");
                self.running.remove(&job_id);
                return;
            }
        };

        // A job cancelled before its first target still passes through
        // Running; the workers see the token and claim nothing.
        if let Err(err) =
            self.store.transition(job_id, JobStatus::Running, None).await
        {
            error!(job_id = %job_id, error = %err, "failed to start job");
            self.running.remove(&job_id);
            return;
        }
        self.publish(job_id, JobEventPayload::Started).await;

        let run = Arc::new(JobRun {
            job_id,
            targets: job.targets,
            context: job.context,
            cursor: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            store_failure: Mutex::new(None),
            token,
        });

        let workers = job.concurrency_limit.min(run.targets.len()).max(1);
        let mut handles = Vec::with_capacity(workers);
        for worker in 0..workers {
            let inner = Arc::clone(&self);
            let run = Arc::clone(&run);
            handles.push(tokio::spawn(async move {
                inner.worker_loop(worker, run).await;
            }));
        }
        for joined in futures::future::join_all(handles).await {
            if let Err(join_err) = joined {
                error!(job_id = %job_id, error = %join_err, "audit worker aborted");
                run.fail(format!("worker aborted: {join_err}"));
            }
        }

        let (status, reason) = if let Some(reason) = run.store_failure.lock().take()
        {
            (JobStatus::Failed, Some(reason))
        } else if run.token.is_cancelled() {
            (JobStatus::Failed, Some(CANCELLED_REASON.to_string()))
        } else {
            (JobStatus::Completed, None)
        };
        self.finish(job_id, status, reason).await;
    }

    async fn worker_loop(&self, worker: usize, run: Arc<JobRun>) {
        loop {
            if run.token.is_cancelled() || run.has_failed() {
                debug!(job_id = %run.job_id, worker, "worker stopping early");
                break;
            }
            let index = run.cursor.fetch_add(1, Ordering::SeqCst);
            let Some(target) = run.targets.get(index) else {
                break;
            };

            let result = self.audit_target(&run, target).await;
            let ok = result.outcome.is_ok();
            let attempts = result.attempts;
            let outcome = result.outcome.clone();

            if let Err(err) =
                self.store.record_result(run.job_id, result.clone()).await
            {
                error!(
                    job_id = %run.job_id,
                    url = %target,
                    error = %err,
                    "failed to store target result"
                );
                run.fail(err.to_string());
                break;
            }

            let completed = run.completed.fetch_add(1, Ordering::SeqCst) + 1;
            self.publish(
                run.job_id,
                JobEventPayload::TargetCompleted {
                    target: target.clone(),
                    outcome,
                    attempts,
                    completed,
                    total: run.targets.len(),
                },
            )
            .await;

            if ok {
                self.feed_reviews(run.job_id, &result).await;
            }
        }
    }

    /// Audits one target within a single `target_timeout` budget. Retries
    /// and their backoff share the budget; each attempt gets what is left.
    async fn audit_target(&self, run: &JobRun, target: &Url) -> TargetResult {
        let started = Instant::now();
        let breaker = self.breakers.get(DOM_SCANNER);
        let breaker = breaker.as_ref();
        let checker = self.checker.as_ref();
        let timeout = self.config.target_timeout;
        let deadline = tokio::time::Instant::now() + timeout;
        let attempts_made = AtomicU32::new(0);
        let attempts_made = &attempts_made;
        let timed_out = move || AuditError::Timeout {
            dependency: DOM_SCANNER.to_string(),
            after: timeout,
        };

        let retried = with_retry(&self.config.retry, move |attempt| async move {
            attempts_made.store(attempt, Ordering::SeqCst);
            let remaining = deadline
                .saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return Err(timed_out());
            }
            debug!(url = %target, attempt, ?remaining, "checking target");
            breaker
                .call(move || async move {
                    tokio::time::timeout_at(
                        deadline,
                        checker.check(target, remaining),
                    )
                    .await
                    .unwrap_or_else(|_| Err(timed_out()))
                })
                .await
        });

        let RetryOutcome { result, attempts } =
            match tokio::time::timeout_at(deadline, retried).await {
                Ok(outcome) => outcome,
                Err(_) => RetryOutcome {
                    result: Err(timed_out()),
                    attempts: attempts_made.load(Ordering::SeqCst).max(1),
                },
            };

        let duration_ms = started.elapsed().as_millis() as u64;
        match result {
            Ok(findings) => {
                let findings: Vec<_> =
                    findings.into_iter().map(|f| f.normalized()).collect();
                let score = self.scoring.score(&findings, run.context.as_ref());
                debug!(
                    job_id = %run.job_id,
                    url = %target,
                    findings = findings.len(),
                    score = score.score,
                    "target audited"
                );
                TargetResult::ok(
                    target.clone(),
                    findings,
                    score,
                    duration_ms,
                    attempts,
                )
            }
            Err(err) => {
                warn!(
                    job_id = %run.job_id,
                    url = %target,
                    attempts,
                    error = %err,
                    "target audit failed"
                );
                TargetResult::error(
                    target.clone(),
                    err.target_reason(),
                    duration_ms,
                    attempts,
                )
            }
        }
    }

    async fn feed_reviews(&self, job_id: JobId, result: &TargetResult) {
        if !self.config.auto_enqueue_reviews {
            return;
        }
        let (Some(feed), Some(score)) = (&self.review_feed, &result.score)
        else {
            return;
        };

        for (index, finding) in result.raw_findings.iter().enumerate() {
            let suggested_fix = match &feed.drafter {
                Some(drafter)
                    if score.recommended_action
                        == RecommendedAction::HumanReview =>
                {
                    drafter.draft(&result.target, finding).await
                }
                _ => None,
            };

            let submission = ReviewSubmission {
                finding_ref: FindingRef {
                    job_id,
                    target: result.target.clone(),
                    index,
                    criterion_id: finding.criterion_id.clone(),
                },
                finding: finding.clone(),
                score: score.clone(),
                suggested_fix,
            };
            if let Err(err) = feed.workflow.enqueue(submission).await {
                warn!(
                    job_id = %job_id,
                    url = %result.target,
                    error = %err,
                    "failed to enqueue finding for review"
                );
            }
        }
    }

    async fn finish(
        &self,
        job_id: JobId,
        status: JobStatus,
        reason: Option<String>,
    ) {
        self.running.remove(&job_id);
        match self.store.transition(job_id, status, reason.clone()).await {
            Ok(job) => {
                let (done, total) = job.progress();
                info!(
                    job_id = %job_id,
                    status = %job.status,
                    done,
                    total,
                    reason = reason.as_deref().unwrap_or(""),
                    "job finished"
                );
            }
            Err(err) => {
                error!(
                    job_id = %job_id,
                    status = %status,
                    error = %err,
                    "failed to record job outcome"
                );
            }
        }
        self.publish(
            job_id,
            JobEventPayload::Finished {
                status,
                failure_reason: reason,
            },
        )
        .await;
    }

    async fn publish(&self, job_id: JobId, payload: JobEventPayload) {
        if let Err(err) = self.events.publish(JobEvent::now(job_id, payload)).await
        {
            debug!(job_id = %job_id, error = %err, "dropping job event");
        }
    }
}

/// Shared state of one job's worker pool.
struct JobRun {
    job_id: JobId,
    targets: Vec<Url>,
    context: Option<ScoringContext>,
    cursor: AtomicUsize,
    completed: AtomicUsize,
    store_failure: Mutex<Option<String>>,
    token: CancellationToken,
}

impl JobRun {
    fn fail(&self, reason: String) {
        let mut failure = self.store_failure.lock();
        if failure.is_none() {
            *failure = Some(reason);
        }
    }

    fn has_failed(&self) -> bool {
        self.store_failure.lock().is_some()
    }
}

/// Parses raw targets as absolute http(s) URLs and drops duplicates, keeping
/// the first occurrence.
pub fn parse_targets(raw: &[String]) -> Result<Vec<Url>> {
    if raw.is_empty() {
        return Err(AuditError::InvalidInput(
            "at least one target is required".into(),
        ));
    }

    let mut seen = HashSet::with_capacity(raw.len());
    let mut targets = Vec::with_capacity(raw.len());
    for candidate in raw {
        let trimmed = candidate.trim();
        let url = Url::parse(trimmed).map_err(|err| {
            ModelError::InvalidTarget(format!("{trimmed}: {err}"))
        })?;
        if !matches!(url.scheme(), "http" | "https") || !url.has_host() {
            return Err(ModelError::InvalidTarget(format!(
                "{trimmed}: only http(s) URLs with a host can be audited"
            ))
            .into());
        }
        if seen.insert(url.clone()) {
            targets.push(url);
        }
    }
    Ok(targets)
}
