//! One detection cycle, end to end
//!
//! Fetch candidates, resolve their tables, score and estimate, commit the
//! reconciled records in one batch, then emit scripts for records that owe
//! one. A run holds the ledger lease from start to finish, so overlapping
//! runs are rejected rather than interleaved.

use crate::classifier::{classify, resolve_tables, table_keys, TableCatalog};
use crate::error::{EngineError, EngineResult};
use crate::estimator::{elapsed_shares, estimate};
use crate::priority::score;
use crate::shutdown::Shutdown;
use crate::summary::RunSummary;
use crate::workload::classify_schemas;
use std::sync::Arc;
use sw_core::{merge_duplicates, Assessment, EngineConfig, QueryRecord, RemediationRecord, RunStamp};
use sw_db::{QueryStatsSource, TableMetadataSource, TelemetrySource};
use sw_ledger::{Ledger, RemediationLedgerStore};
use sw_script::{ArtifactSink, ScriptRenderer};

/// Composes the engine stages over concrete adapters
pub struct CycleRunner {
    stats: Arc<dyn QueryStatsSource>,
    metadata: Arc<dyn TableMetadataSource>,
    ledger: Ledger,
    renderer: ScriptRenderer,
    sink: Option<Arc<dyn ArtifactSink>>,
    config: EngineConfig,
    dry_run: bool,
}

impl CycleRunner {
    pub fn new(
        stats: Arc<dyn QueryStatsSource>,
        metadata: Arc<dyn TableMetadataSource>,
        store: Arc<dyn RemediationLedgerStore>,
        config: EngineConfig,
    ) -> EngineResult<Self> {
        let ledger = Ledger::new(store, config.adapter_timeout(), config.conflict_retries);
        Ok(Self {
            stats,
            metadata,
            ledger,
            renderer: ScriptRenderer::new()?,
            sink: None,
            config,
            dry_run: false,
        })
    }

    /// Runner over a source that provides both statistics and metadata
    pub fn from_source<S: TelemetrySource + 'static>(
        source: Arc<S>,
        store: Arc<dyn RemediationLedgerStore>,
        config: EngineConfig,
    ) -> EngineResult<Self> {
        let stats: Arc<dyn QueryStatsSource> = source.clone();
        Self::new(stats, source, store, config)
    }

    pub fn with_sink(mut self, sink: Arc<dyn ArtifactSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Reconcile as usual but never emit artifacts
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Run one cycle under a fresh run id
    pub async fn run_cycle(&self, shutdown: &Shutdown) -> EngineResult<RunSummary> {
        self.run_cycle_as(RunStamp::new(), shutdown).await
    }

    /// Run one cycle under the given run stamp
    pub async fn run_cycle_as(&self, run: RunStamp, shutdown: &Shutdown) -> EngineResult<RunSummary> {
        log::info!(
            "Starting run {} (source: {}, ledger: {})",
            run.run_id,
            self.stats.source_type(),
            self.ledger.store_type()
        );
        self.ledger.begin_run(&run, self.config.run_lease()).await?;

        let outcome = self.run_leased(&run, shutdown).await;

        if let Err(e) = self.ledger.end_run(&run).await {
            log::warn!("Failed to release run lease {}: {}", run.run_id, e);
        }
        match &outcome {
            Ok(summary) => log::info!(
                "Run {} finished in {:.2}s: {} new, {} recurring, {} resolved, {} degraded, {} artifacts emitted",
                summary.run_id,
                summary.duration_secs(),
                summary.new,
                summary.recurring,
                summary.resolved,
                summary.degraded,
                summary.emitted
            ),
            Err(e) => log::error!("Run {} failed: {}", run.run_id, e),
        }
        outcome
    }

    async fn run_leased(&self, run: &RunStamp, shutdown: &Shutdown) -> EngineResult<RunSummary> {
        let first_run = self.ledger.list().await?.is_empty();
        if first_run {
            log::info!("First run: the ledger has no records yet");
        }
        let mut summary = RunSummary::start(run, first_run, self.dry_run);

        let queries = self.fetch_candidates().await?;
        summary.candidates = queries.len();
        summary.schema_load = classify_schemas(&queries);

        let catalog = resolve_tables(
            Arc::clone(&self.metadata),
            table_keys(&queries),
            self.config.t1_t2_threshold_bytes,
            self.config.concurrency_limit,
            self.config.adapter_timeout(),
            shutdown,
        )
        .await?;

        // Everything is scored first and committed as one batch, so a failed
        // or cancelled run leaves the ledger exactly as it found it.
        let assessments = assess(&queries, &catalog, self.config.max_priority);
        if shutdown.is_cancelled() {
            log::warn!("Shutdown requested, nothing committed for run {}", run.run_id);
            return Err(EngineError::Cancelled);
        }
        for outcome in self.ledger.reconcile_all(assessments, run).await? {
            log::debug!(
                "{} {:?} -> {} (count {})",
                outcome.record.query_id.short(12),
                outcome.transition,
                outcome.record.status,
                outcome.record.occurrence_count
            );
            summary.record(&outcome);
        }
        summary.prioritize();

        if self.dry_run {
            log::info!("Dry run: {} artifacts not emitted", summary.to_emit.len());
        } else {
            self.emit_all(&mut summary, shutdown).await?;
        }

        summary.resolved = self
            .ledger
            .list()
            .await?
            .iter()
            .filter(|r| r.is_resolved())
            .count();
        summary.finish();
        Ok(summary)
    }

    async fn fetch_candidates(&self) -> EngineResult<Vec<QueryRecord>> {
        let timeout = self.config.adapter_timeout();
        let rows = match tokio::time::timeout(timeout, self.stats.fetch_current_fts_candidates()).await {
            Ok(Ok(rows)) => rows,
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                return Err(EngineError::SourceUnavailable(format!(
                    "candidate fetch timed out after {}s",
                    timeout.as_secs_f64()
                )))
            }
        };
        let fetched = rows.len();
        let queries = merge_duplicates(rows);
        log::info!(
            "Fetched {} full-scan candidates ({} distinct)",
            fetched,
            queries.len()
        );
        Ok(queries)
    }

    async fn emit_all(&self, summary: &mut RunSummary, shutdown: &Shutdown) -> EngineResult<()> {
        let Some(sink) = &self.sink else {
            if !summary.to_emit.is_empty() {
                log::debug!("No artifact sink configured; {} artifacts stay pending", summary.to_emit.len());
            }
            return Ok(());
        };

        for record in &summary.to_emit {
            if shutdown.is_cancelled() {
                log::warn!("Shutdown requested, remaining artifacts stay pending");
                return Err(EngineError::Cancelled);
            }
            match self.emit_one(sink.as_ref(), record).await {
                Ok(location) => {
                    summary.emitted += 1;
                    log::debug!("Emitted {} to {}", record.query_id.short(12), location);
                    if let Err(e) = self.ledger.mark_emitted(&record.query_id).await {
                        log::warn!(
                            "Emitted {} but could not clear its pending flag: {}",
                            record.query_id.short(12),
                            e
                        );
                    }
                }
                Err(message) => {
                    summary.emit_failures += 1;
                    log::warn!(
                        "Artifact for {} not emitted, will retry next run: {}",
                        record.query_id.short(12),
                        message
                    );
                }
            }
        }
        Ok(())
    }

    async fn emit_one(&self, sink: &dyn ArtifactSink, record: &RemediationRecord) -> Result<String, String> {
        let script = self.renderer.render(record).map_err(|e| e.to_string())?;
        let timeout = self.config.adapter_timeout();
        match tokio::time::timeout(timeout, sink.emit(record, &script)).await {
            Ok(result) => result.map_err(|e| e.to_string()),
            Err(_) => Err(format!("sink timed out after {}s", timeout.as_secs_f64())),
        }
    }
}

/// Classify, score and estimate every query. Pure over its inputs.
pub fn assess(queries: &[QueryRecord], catalog: &TableCatalog, max_priority: u8) -> Vec<Assessment> {
    let shares = elapsed_shares(queries);
    queries
        .iter()
        .zip(shares)
        .map(|(query, share)| {
            let class = classify(query, catalog);
            let priority = score(query, class.tier, &class.tables, max_priority);
            let est = estimate(query, class.tier, &class.tables, share);
            Assessment {
                query_id: query.query_id.clone(),
                tier: class.tier,
                priority,
                improvement_pct: est.improvement_pct,
                tables: class.tables,
                remediation: est.remediation,
                degraded: class.degraded,
                sample_sql: query.sql_text.clone(),
                schema: query.schema.clone(),
                executions: query.executions,
                elapsed_us: query.elapsed_us,
            }
        })
        .collect()
}
