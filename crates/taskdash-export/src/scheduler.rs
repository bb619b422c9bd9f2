//! The recurring export worker and its control surface. One `Exporter`
//! exists per destination; instances share nothing and each writes to its
//! own namespace, so overlapping cycles across instances need no
//! coordination.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use taskdash_core::{artifact, config, ExportSettings, TaskSource};
use taskdash_store::{s3::RETENTION_DAYS, ObjectStore, StoredObject};

use crate::{Error, Result};

/// Bounded wait for the worker to exit after a stop request.
const STOP_GRACE: Duration = Duration::from_secs(5);
/// Pause after an unhandled cycle error before the loop resumes.
const ERROR_COOLDOWN: Duration = Duration::from_secs(60);
const LIST_PREFIX: &str = "exports/";
const POINTER_KEY: &str = "latest/index.json";

/// Result of a control operation, surfaced to the HTTP layer as-is.
#[derive(Debug, Clone, Serialize)]
pub struct OpOutcome {
    pub success: bool,
    pub message: String,
}

impl OpOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Read-only exporter state for the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ExportStatus {
    pub enabled: bool,
    pub running: bool,
    pub client_available: bool,
    pub destination: Option<String>,
    pub interval_minutes: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactFormat {
    Tabular,
    Structured,
    Report,
}

impl std::str::FromStr for ArtifactFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "csv" => Ok(ArtifactFormat::Tabular),
            "json" => Ok(ArtifactFormat::Structured),
            "report" => Ok(ArtifactFormat::Report),
            _ => Err(Error::UnknownFormat(s.to_string())),
        }
    }
}

/// A single artifact rendered on demand, outside any cycle.
#[derive(Debug, Clone, Serialize)]
pub struct RenderedArtifact {
    pub content: String,
    pub filename: String,
    pub content_type: &'static str,
}

struct Worker {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Periodic export scheduler for one destination. A cheap-to-clone handle
/// around shared state, constructed by the composition root; control calls
/// arrive from request-handling tasks while the running flag is read by the
/// background loop, hence the atomics.
#[derive(Clone)]
pub struct Exporter {
    inner: Arc<Inner>,
}

struct Inner {
    label: String,
    source: Arc<dyn TaskSource>,
    store: Option<Arc<dyn ObjectStore>>,
    enabled: bool,
    interval_minutes: AtomicU32,
    running: AtomicBool,
    worker: Mutex<Option<Worker>>,
}

impl Exporter {
    pub fn new(
        label: impl Into<String>,
        source: Arc<dyn TaskSource>,
        store: Option<Arc<dyn ObjectStore>>,
        settings: ExportSettings,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                label: label.into(),
                source,
                store,
                enabled: settings.enabled,
                interval_minutes: AtomicU32::new(settings.interval_minutes),
                running: AtomicBool::new(false),
                worker: Mutex::new(None),
            }),
        }
    }

    pub fn status(&self) -> ExportStatus {
        let inner = &self.inner;
        ExportStatus {
            enabled: inner.enabled,
            running: inner.running.load(Ordering::SeqCst),
            client_available: inner.store.is_some(),
            destination: inner.store.as_ref().map(|s| s.destination()),
            interval_minutes: inner.interval_minutes.load(Ordering::SeqCst),
        }
    }

    /// Spawn the recurring worker. Safe to call while running: the second
    /// call warns and leaves the existing worker untouched.
    pub async fn start(&self) -> OpOutcome {
        let inner = &self.inner;
        if !inner.enabled {
            return OpOutcome::fail(format!("{} auto-export is disabled", inner.label));
        }
        if inner.store.is_none() {
            return OpOutcome::fail(format!("{} store client unavailable", inner.label));
        }

        let mut slot = inner.worker.lock().await;
        if let Some(worker) = slot.as_ref() {
            if !worker.handle.is_finished() {
                tracing::warn!(exporter = %inner.label, "Auto-export already running");
                return OpOutcome::ok("Auto-export already running");
            }
        }

        inner.running.store(true, Ordering::SeqCst);
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let worker_state = Arc::clone(inner);
        let handle = tokio::spawn(async move {
            worker_loop(worker_state, token).await;
        });
        *slot = Some(Worker { cancel, handle });

        tracing::info!(
            exporter = %inner.label,
            interval_minutes = inner.interval_minutes.load(Ordering::SeqCst),
            "Auto-export started"
        );
        OpOutcome::ok("Auto-export started")
    }

    /// Clear the running flag, interrupt the worker's sleep, and wait a
    /// bounded time for it to finish. Always ends in the stopped state.
    pub async fn stop(&self) -> OpOutcome {
        let inner = &self.inner;
        inner.running.store(false, Ordering::SeqCst);

        let worker = inner.worker.lock().await.take();
        if let Some(worker) = worker {
            worker.cancel.cancel();
            if tokio::time::timeout(STOP_GRACE, worker.handle).await.is_err() {
                tracing::warn!(
                    exporter = %inner.label,
                    "Worker did not finish within the stop grace period"
                );
            }
        }

        tracing::info!(exporter = %inner.label, "Auto-export stopped");
        OpOutcome::ok("Auto-export stopped")
    }

    /// Run one cycle on the caller, regardless of scheduler state.
    pub async fn trigger_manual(&self) -> OpOutcome {
        if self.inner.store.is_none() {
            return OpOutcome::fail(format!("{} store client unavailable", self.inner.label));
        }

        match self.inner.run_cycle().await {
            Ok(()) => OpOutcome::ok("Manual export completed"),
            Err(e) => {
                tracing::error!(exporter = %self.inner.label, error = %e, "Manual export failed");
                OpOutcome::fail(format!("Export failed: {}", e))
            }
        }
    }

    /// Apply a new interval. Rejecting an out-of-range value leaves the
    /// running state untouched; accepting one restarts a running worker so
    /// the new period takes effect on the next wake.
    pub async fn set_interval(&self, minutes: i64) -> taskdash_core::Result<()> {
        let validated = config::validate_interval(minutes)?;
        self.inner.interval_minutes.store(validated, Ordering::SeqCst);

        if self.inner.running.load(Ordering::SeqCst) {
            self.stop().await;
            self.start().await;
        }

        tracing::info!(
            exporter = %self.inner.label,
            interval_minutes = validated,
            "Interval updated"
        );
        Ok(())
    }

    pub async fn test_connection(&self) -> OpOutcome {
        let Some(store) = &self.inner.store else {
            return OpOutcome::fail(format!("{} store client unavailable", self.inner.label));
        };

        match store.health_check().await {
            Ok(()) => OpOutcome::ok(format!(
                "Connection OK ({}: {})",
                store.provider(),
                store.destination()
            )),
            Err(e) => OpOutcome::fail(format!("Connection failed: {}", e)),
        }
    }

    /// Most recent export artifacts at the destination, newest first.
    pub async fn list_recent(&self, limit: usize) -> Result<Vec<StoredObject>> {
        let store = self.inner.store.as_ref().ok_or(Error::StoreUnavailable)?;
        Ok(store.list(LIST_PREFIX, limit).await?)
    }

    /// Render one artifact inline, with a timestamped suggested filename.
    pub async fn render(&self, format: ArtifactFormat) -> Result<RenderedArtifact> {
        let inner = &self.inner;
        let now = Utc::now();
        let stamp = now.format("%Y%m%d_%H%M%S");
        let destination = inner
            .store
            .as_ref()
            .map(|s| s.destination())
            .unwrap_or_default();

        let tasks = inner.source.fetch_all().await?;

        let rendered = match format {
            ArtifactFormat::Tabular => RenderedArtifact {
                content: artifact::tabular(&tasks),
                filename: format!("tasks_{}.csv", stamp),
                content_type: "text/csv",
            },
            ArtifactFormat::Structured => RenderedArtifact {
                content: artifact::structured(&tasks, now, &destination),
                filename: format!("backup_{}.json", stamp),
                content_type: "application/json",
            },
            ArtifactFormat::Report => {
                let totals = inner.source.totals().await?;
                RenderedArtifact {
                    content: artifact::report(&tasks, &totals, now, &destination, RETENTION_DAYS),
                    filename: format!("report_{}.txt", stamp),
                    content_type: "text/plain",
                }
            }
        };

        Ok(rendered)
    }
}

impl Inner {
    /// One complete generation-and-upload pass: three data artifacts plus
    /// the pointer. Each upload is attempted independently; a failed source
    /// read degrades the affected artifact to "not generated" instead of
    /// propagating. There is no atomicity across the four uploads.
    async fn run_cycle(&self) -> Result<()> {
        let store = self.store.as_ref().ok_or(Error::StoreUnavailable)?;
        let now = Utc::now();
        let stamp = now.format("%Y%m%d_%H%M%S");
        let date_folder = now.format("%Y/%m/%d");
        let destination = store.destination();

        tracing::info!(exporter = %self.label, "Starting export cycle");

        let csv_key = format!("exports/{}/tasks_{}.csv", date_folder, stamp);
        let csv = match self.source.fetch_all().await {
            Ok(tasks) => Some(artifact::tabular(&tasks)),
            Err(e) => {
                tracing::error!(exporter = %self.label, error = %e, "Tabular snapshot failed");
                None
            }
        };
        if let Some(content) = &csv {
            self.try_upload(store.as_ref(), content, &csv_key, "text/csv")
                .await;
        }

        let json_key = format!("exports/{}/backup_{}.json", date_folder, stamp);
        let json = match self.source.fetch_all().await {
            Ok(tasks) => {
                let content = artifact::structured(&tasks, now, &destination);
                (!content.is_empty()).then_some(content)
            }
            Err(e) => {
                tracing::error!(exporter = %self.label, error = %e, "Structured snapshot failed");
                None
            }
        };
        if let Some(content) = &json {
            self.try_upload(store.as_ref(), content, &json_key, "application/json")
                .await;
        }

        let report_key = format!("reports/{}/report_{}.txt", date_folder, stamp);
        let report = match self.source.fetch_all().await {
            Ok(tasks) => match self.source.totals().await {
                Ok(totals) => Some(artifact::report(
                    &tasks,
                    &totals,
                    now,
                    &destination,
                    RETENTION_DAYS,
                )),
                Err(e) => {
                    tracing::error!(exporter = %self.label, error = %e, "Summary report failed");
                    None
                }
            },
            Err(e) => {
                tracing::error!(exporter = %self.label, error = %e, "Summary report failed");
                None
            }
        };
        if let Some(content) = &report {
            self.try_upload(store.as_ref(), content, &report_key, "text/plain")
                .await;
        }

        let total_tasks = match self.source.count().await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(exporter = %self.label, error = %e, "Task count unavailable");
                0
            }
        };

        let pointer = artifact::Pointer {
            last_export: now.to_rfc3339(),
            files: artifact::PointerFiles {
                csv: csv.map(|_| csv_key),
                json: json.map(|_| json_key),
                report: report.map(|_| report_key),
            },
            destination,
            total_tasks,
        };
        self.try_upload(
            store.as_ref(),
            &pointer.render(),
            POINTER_KEY,
            "application/json",
        )
        .await;

        tracing::info!(exporter = %self.label, "Export cycle finished");
        Ok(())
    }

    async fn try_upload(
        &self,
        store: &dyn ObjectStore,
        content: &str,
        key: &str,
        content_type: &str,
    ) -> bool {
        match store.upload(content, key, content_type).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(exporter = %self.label, key, error = %e, "Upload failed");
                false
            }
        }
    }
}

/// The background unit: sleep for the configured interval, then run one
/// cycle if still running. Cancellation interrupts both the interval sleep
/// and the error cooldown; nothing here ever tears the loop down besides
/// the flag and the token.
async fn worker_loop(state: Arc<Inner>, cancel: CancellationToken) {
    loop {
        let minutes = state.interval_minutes.load(Ordering::SeqCst) as u64;
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(Duration::from_secs(minutes * 60)) => {}
        }

        if !state.running.load(Ordering::SeqCst) {
            break;
        }

        if let Err(e) = state.run_cycle().await {
            tracing::error!(exporter = %state.label, error = %e, "Export cycle error");
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(ERROR_COOLDOWN) => {}
            }
        }
    }

    tracing::debug!(exporter = %state.label, "Export worker exited");
}
