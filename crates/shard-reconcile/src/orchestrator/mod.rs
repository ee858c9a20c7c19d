//! Verification coordinator: plans partitions and fans them out to verifiers.

mod summary;

pub use summary::RunSummary;

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::{Config, ReconcileConfig};
use crate::core::identifier::validate_identifier;
use crate::core::{Partition, RecordStore, TableTemplate};
use crate::drivers;
use crate::error::{ReconcileError, Result};
use crate::fetch::BatchFetcher;
use crate::verify::{
    OutcomeKind, PartitionReport, PartitionScope, PartitionVerifier, VerifierSettings,
    VerifyProgressUpdate,
};

/// What to verify.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRequest {
    /// Partition identifiers, `YYYY` or `YYYY-MM`.
    pub partitions: Vec<String>,
    /// Source table name template, e.g. `kline_{year}`.
    pub source_template: TableTemplate,
    /// Target table base name; the partition suffix is appended.
    pub target_table: String,
}

impl VerificationRequest {
    /// Request from the defaults in the `reconcile` config section.
    pub fn from_config(config: &ReconcileConfig) -> Result<Self> {
        let source_template = config.source_template.clone().ok_or_else(|| {
            ReconcileError::Config("reconcile.source_template is not set".into())
        })?;
        let target_table = config
            .target_table
            .clone()
            .ok_or_else(|| ReconcileError::Config("reconcile.target_table is not set".into()))?;
        Ok(Self {
            partitions: config.partitions.clone(),
            source_template: TableTemplate::new(source_template),
            target_table,
        })
    }

    /// Resolve into physical table pairs, one per month, sorted by partition.
    ///
    /// The target table of each partition is `target_table` followed by the
    /// rendered `target_suffix`.
    pub fn plan(&self, target_suffix: &TableTemplate) -> Result<Vec<PartitionScope>> {
        if self.partitions.is_empty() {
            return Err(ReconcileError::Config(
                "no partitions requested (expected YYYY or YYYY-MM)".into(),
            ));
        }

        Partition::expand(&self.partitions)?
            .into_iter()
            .map(|partition| {
                let source_table = self.source_template.render(&partition)?;
                let target_table =
                    format!("{}{}", self.target_table, target_suffix.render(&partition)?);
                validate_identifier(&source_table)?;
                validate_identifier(&target_table)?;
                Ok(PartitionScope {
                    partition,
                    source_table,
                    target_table,
                })
            })
            .collect()
    }
}

/// Health check result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub source_connected: bool,
    pub source_latency_ms: u64,
    pub source_error: Option<String>,
    pub target_connected: bool,
    pub target_latency_ms: u64,
    pub target_error: Option<String>,
    pub healthy: bool,
}

/// Handle to a run started with [`Coordinator::start`].
pub struct VerificationHandle {
    run_id: String,
    partitions: usize,
    task: JoinHandle<RunSummary>,
}

impl VerificationHandle {
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Partitions accepted for this run.
    pub fn partitions(&self) -> usize {
        self.partitions
    }

    /// Wait for every partition to finish.
    pub async fn wait(self) -> Result<RunSummary> {
        self.task
            .await
            .map_err(|e| ReconcileError::Task(format!("run {}: {}", self.run_id, e)))
    }
}

/// Plans and dispatches partition verifications.
pub struct Coordinator {
    config: ReconcileConfig,
    config_hash: String,
    source: Arc<dyn RecordStore>,
    target: Arc<dyn RecordStore>,
    progress_tx: Option<mpsc::Sender<VerifyProgressUpdate>>,
    cancel: CancellationToken,
}

impl Coordinator {
    /// Connect both stores described by `config`.
    pub async fn new(config: Config) -> Result<Self> {
        let reconcile = config.reconcile.clone();
        let source = drivers::connect(
            &config.source,
            reconcile.get_max_source_connections(),
            reconcile.key_order,
        )
        .await?;
        let target = drivers::connect(
            &config.target,
            reconcile.get_max_target_connections(),
            reconcile.key_order,
        )
        .await?;

        Ok(Self::with_stores(reconcile, source, target).with_config_hash(config.hash()))
    }

    /// Build over already-open stores.
    pub fn with_stores(
        config: ReconcileConfig,
        source: Arc<dyn RecordStore>,
        target: Arc<dyn RecordStore>,
    ) -> Self {
        Self {
            config,
            config_hash: String::new(),
            source,
            target,
            progress_tx: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = hash.into();
        self
    }

    /// Set progress channel for updates.
    pub fn with_progress(mut self, tx: mpsc::Sender<VerifyProgressUpdate>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    /// Cancel pending and running partitions when `token` fires.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Resolve a request against this coordinator's target suffix.
    pub fn plan(&self, request: &VerificationRequest) -> Result<Vec<PartitionScope>> {
        request.plan(&self.config.target_partition_suffix)
    }

    /// Plan the request and dispatch it in the background.
    ///
    /// Returns once the run is accepted; results arrive through
    /// [`VerificationHandle::wait`]. Planning errors are returned here and
    /// nothing is dispatched.
    pub fn start(&self, request: &VerificationRequest) -> Result<VerificationHandle> {
        let scopes = self.plan(request)?;
        let run_id = uuid::Uuid::new_v4().to_string();
        let partitions = scopes.len();

        info!(
            "Accepted verification run {}: {} partitions, {} workers, batch size {}",
            run_id,
            partitions,
            self.config.get_workers(),
            self.config.get_batch_size()
        );

        let dispatch = Dispatch {
            run_id: run_id.clone(),
            config_hash: self.config_hash.clone(),
            workers: self.config.get_workers(),
            verifier: self.verifier(),
            cancel: self.cancel.clone(),
        };
        let task = tokio::spawn(dispatch.run(scopes));

        Ok(VerificationHandle {
            run_id,
            partitions,
            task,
        })
    }

    /// Start and wait.
    pub async fn run(&self, request: &VerificationRequest) -> Result<RunSummary> {
        self.start(request)?.wait().await
    }

    fn verifier(&self) -> PartitionVerifier {
        let fetcher = BatchFetcher::new(self.source.clone(), self.target.clone());
        let settings = VerifierSettings {
            batch_size: self.config.get_batch_size(),
            sample_cap: self.config.sample_cap,
            progress_interval: self.config.progress_interval,
        };
        let mut verifier =
            PartitionVerifier::new(fetcher, settings).with_cancellation(self.cancel.clone());
        if let Some(tx) = &self.progress_tx {
            verifier = verifier.with_progress(tx.clone());
        }
        verifier
    }

    /// Round-trip both stores.
    pub async fn health_check(&self) -> HealthCheckResult {
        let (source_connected, source_latency_ms, source_error) =
            probe(self.source.as_ref()).await;
        let (target_connected, target_latency_ms, target_error) =
            probe(self.target.as_ref()).await;

        HealthCheckResult {
            source_connected,
            source_latency_ms,
            source_error,
            target_connected,
            target_latency_ms,
            target_error,
            healthy: source_connected && target_connected,
        }
    }

    /// Close both store pools.
    pub async fn close(&self) {
        self.source.close().await;
        self.target.close().await;
    }
}

async fn probe(store: &dyn RecordStore) -> (bool, u64, Option<String>) {
    let start = Instant::now();
    let result = store.test_connection().await;
    let latency = start.elapsed().as_millis() as u64;
    match result {
        Ok(()) => (true, latency, None),
        Err(e) => (false, latency, Some(e.to_string())),
    }
}

/// State moved into the background run task.
struct Dispatch {
    run_id: String,
    config_hash: String,
    workers: usize,
    verifier: PartitionVerifier,
    cancel: CancellationToken,
}

impl Dispatch {
    async fn run(self, scopes: Vec<PartitionScope>) -> RunSummary {
        let started_at = Utc::now();
        let semaphore = Arc::new(Semaphore::new(self.workers.max(1)));
        let mut reports = Vec::with_capacity(scopes.len());
        let mut handles = Vec::with_capacity(scopes.len());

        info!(
            "Run {}: verifying {} partitions with {} workers",
            self.run_id,
            scopes.len(),
            self.workers
        );

        for scope in scopes {
            let permit = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                permit = semaphore.clone().acquire_owned() => permit.ok(),
            };
            let Some(permit) = permit else {
                warn!("{}: not started, run cancelled", scope.partition);
                reports.push(PartitionReport::failed(
                    &scope,
                    ReconcileError::Cancelled.to_string(),
                ));
                continue;
            };

            let verifier = self.verifier.clone();
            let task_scope = scope.clone();
            let handle = tokio::spawn(async move {
                let report = verifier.verify(&task_scope).await;
                drop(permit);
                report
            });
            handles.push((scope, handle));
        }

        for (scope, handle) in handles {
            match handle.await {
                Ok(report) => reports.push(report),
                Err(e) => {
                    error!("{}: task panicked - {}", scope.partition, e);
                    reports.push(PartitionReport::failed(
                        &scope,
                        format!("Task panicked: {}", e),
                    ));
                }
            }
        }

        let summary = RunSummary::from_reports(self.run_id, self.config_hash, started_at, reports);
        for report in &summary.reports {
            match report.outcome.kind() {
                OutcomeKind::Clean => info!("{}", report),
                OutcomeKind::CountMismatch | OutcomeKind::RowDiff => warn!("{}", report),
                OutcomeKind::Error => error!("{}", report),
            }
        }
        info!("Run {} finished: {}", summary.run_id, summary);
        summary
    }
}
