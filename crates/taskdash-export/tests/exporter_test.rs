use std::str::FromStr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use taskdash_core::{BusinessArea, ExportSettings, Phase, PriceTotals, Task, TaskSource};
use taskdash_export::{ArtifactFormat, Exporter};
use taskdash_store::{ObjectStore, StoredObject};

struct StaticSource {
    tasks: Vec<Task>,
    fail: bool,
}

impl StaticSource {
    fn new(tasks: Vec<Task>) -> Self {
        Self { tasks, fail: false }
    }

    fn failing() -> Self {
        Self {
            tasks: Vec::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl TaskSource for StaticSource {
    async fn fetch_all(&self) -> taskdash_core::Result<Vec<Task>> {
        if self.fail {
            return Err(taskdash_core::Error::Source("source offline".to_string()));
        }
        Ok(self.tasks.clone())
    }

    async fn totals(&self) -> taskdash_core::Result<PriceTotals> {
        if self.fail {
            return Err(taskdash_core::Error::Source("source offline".to_string()));
        }
        Ok(PriceTotals {
            purchase: self.tasks.iter().map(|t| t.purchase_price).sum(),
            sale: self.tasks.iter().map(|t| t.sale_price).sum(),
        })
    }

    async fn count(&self) -> taskdash_core::Result<u64> {
        if self.fail {
            return Err(taskdash_core::Error::Source("source offline".to_string()));
        }
        Ok(self.tasks.len() as u64)
    }
}

#[derive(Default)]
struct RecordingStore {
    uploads: Mutex<Vec<(String, String, String)>>,
    fail_suffix: Option<&'static str>,
}

impl RecordingStore {
    fn keys(&self) -> Vec<String> {
        self.uploads
            .lock()
            .unwrap()
            .iter()
            .map(|(key, _, _)| key.clone())
            .collect()
    }

    fn content_for(&self, key: &str) -> Option<String> {
        self.uploads
            .lock()
            .unwrap()
            .iter()
            .find(|(k, _, _)| k == key)
            .map(|(_, _, content)| content.clone())
    }
}

#[async_trait]
impl ObjectStore for RecordingStore {
    fn provider(&self) -> &'static str {
        "memory"
    }

    fn destination(&self) -> String {
        "test-bucket".to_string()
    }

    async fn upload(
        &self,
        content: &str,
        key: &str,
        content_type: &str,
    ) -> taskdash_store::Result<()> {
        if let Some(suffix) = self.fail_suffix {
            if key.ends_with(suffix) {
                return Err(taskdash_store::Error::Provider {
                    status: 500,
                    message: "injected failure".to_string(),
                });
            }
        }

        self.uploads.lock().unwrap().push((
            key.to_string(),
            content_type.to_string(),
            content.to_string(),
        ));
        Ok(())
    }

    async fn list(&self, prefix: &str, limit: usize) -> taskdash_store::Result<Vec<StoredObject>> {
        let objects = self
            .uploads
            .lock()
            .unwrap()
            .iter()
            .filter(|(key, _, _)| key.starts_with(prefix))
            .rev()
            .take(limit)
            .map(|(key, _, content)| StoredObject {
                key: key.clone(),
                size: content.len() as u64,
                last_modified: String::new(),
                url: format!("memory://{}", key),
            })
            .collect();

        Ok(objects)
    }

    async fn health_check(&self) -> taskdash_store::Result<()> {
        Ok(())
    }
}

fn sample_task(id: i64, phase: Phase, area: BusinessArea) -> Task {
    Task {
        id,
        title: format!("Task {}", id),
        client: None,
        description: None,
        business_area: area,
        phase,
        responsible: None,
        deadline: None,
        purchase_price: 100.0,
        sale_price: 140.0,
        markup_margin: 40.0,
        created_at: None,
        updated_at: None,
    }
}

fn exporter_with(source: StaticSource, store: Arc<RecordingStore>, enabled: bool) -> Exporter {
    let settings = ExportSettings::new(enabled, 1).unwrap();
    Exporter::new(
        "test",
        Arc::new(source),
        Some(store as Arc<dyn ObjectStore>),
        settings,
    )
}

#[tokio::test]
async fn test_manual_cycle_uploads_four_artifacts() {
    let store = Arc::new(RecordingStore::default());
    let tasks = vec![
        sample_task(1, Phase::Prospecting, BusinessArea::Solar),
        sample_task(2, Phase::Execution, BusinessArea::Solvent),
    ];
    let exporter = exporter_with(StaticSource::new(tasks), store.clone(), true);

    let outcome = exporter.trigger_manual().await;
    assert!(outcome.success, "{}", outcome.message);

    let keys = store.keys();
    assert_eq!(keys.len(), 4);
    assert!(keys[0].starts_with("exports/") && keys[0].ends_with(".csv"));
    assert!(keys[1].starts_with("exports/") && keys[1].ends_with(".json"));
    assert!(keys[2].starts_with("reports/") && keys[2].ends_with(".txt"));
    assert_eq!(keys[3], "latest/index.json");

    let pointer: serde_json::Value =
        serde_json::from_str(&store.content_for("latest/index.json").unwrap()).unwrap();
    assert_eq!(pointer["total_tasks"], 2);
    assert_eq!(pointer["destination"], "test-bucket");
    assert_eq!(pointer["files"]["csv"], serde_json::json!(keys[0]));
    assert!(!pointer["files"]["report"].is_null());
}

#[tokio::test]
async fn test_failed_source_still_writes_pointer() {
    let store = Arc::new(RecordingStore::default());
    let exporter = exporter_with(StaticSource::failing(), store.clone(), true);

    let outcome = exporter.trigger_manual().await;
    assert!(outcome.success, "cycle must absorb source failures");

    let keys = store.keys();
    assert_eq!(keys, vec!["latest/index.json".to_string()]);

    let pointer: serde_json::Value =
        serde_json::from_str(&store.content_for("latest/index.json").unwrap()).unwrap();
    assert!(pointer["files"]["csv"].is_null());
    assert!(pointer["files"]["json"].is_null());
    assert!(pointer["files"]["report"].is_null());
    assert_eq!(pointer["total_tasks"], 0);
}

#[tokio::test]
async fn test_one_failed_upload_does_not_block_the_rest() {
    let store = Arc::new(RecordingStore {
        fail_suffix: Some(".csv"),
        ..Default::default()
    });
    let tasks = vec![sample_task(1, Phase::Proposal, BusinessArea::Solar)];
    let exporter = exporter_with(StaticSource::new(tasks), store.clone(), true);

    let outcome = exporter.trigger_manual().await;
    assert!(outcome.success);

    let keys = store.keys();
    assert_eq!(keys.len(), 3);
    assert!(keys.iter().all(|k| !k.ends_with(".csv")));

    // The CSV was generated; only its delivery failed, so the pointer
    // still records it.
    let pointer: serde_json::Value =
        serde_json::from_str(&store.content_for("latest/index.json").unwrap()).unwrap();
    assert!(!pointer["files"]["csv"].is_null());
}

#[tokio::test]
async fn test_start_without_client_fails_fast() {
    let settings = ExportSettings::new(true, 5).unwrap();
    let exporter = Exporter::new("test", Arc::new(StaticSource::new(Vec::new())), None, settings);

    let outcome = exporter.start().await;
    assert!(!outcome.success);
    assert!(!exporter.status().running);
    assert!(!exporter.status().client_available);
}

#[tokio::test]
async fn test_start_when_disabled_fails_fast() {
    let store = Arc::new(RecordingStore::default());
    let exporter = exporter_with(StaticSource::new(Vec::new()), store, false);

    let outcome = exporter.start().await;
    assert!(!outcome.success);
    assert!(!exporter.status().running);
}

#[tokio::test]
async fn test_start_is_idempotent() {
    let store = Arc::new(RecordingStore::default());
    let exporter = exporter_with(StaticSource::new(Vec::new()), store, true);

    assert!(exporter.start().await.success);
    assert!(exporter.status().running);

    let second = exporter.start().await;
    assert!(second.success);
    assert!(second.message.contains("already"));
    assert!(exporter.status().running);

    exporter.stop().await;
}

#[tokio::test]
async fn test_stop_then_start_resumes() {
    let store = Arc::new(RecordingStore::default());
    let exporter = exporter_with(StaticSource::new(Vec::new()), store, true);

    assert!(exporter.start().await.success);
    exporter.stop().await;
    assert!(!exporter.status().running);

    assert!(exporter.start().await.success);
    assert!(exporter.status().running);

    exporter.stop().await;
}

#[tokio::test]
async fn test_stop_when_not_running_is_harmless() {
    let store = Arc::new(RecordingStore::default());
    let exporter = exporter_with(StaticSource::new(Vec::new()), store, true);

    let outcome = exporter.stop().await;
    assert!(outcome.success);
    assert!(!exporter.status().running);
}

#[tokio::test]
async fn test_interval_update_rejects_out_of_range() {
    let store = Arc::new(RecordingStore::default());
    let exporter = exporter_with(StaticSource::new(Vec::new()), store, true);

    assert!(exporter.start().await.success);
    assert!(exporter.set_interval(1441).await.is_err());
    assert!(exporter.set_interval(0).await.is_err());

    // A rejected update leaves the worker and the old interval alone.
    let status = exporter.status();
    assert!(status.running);
    assert_eq!(status.interval_minutes, 1);

    exporter.stop().await;
}

#[tokio::test]
async fn test_interval_update_while_running_restarts() {
    let store = Arc::new(RecordingStore::default());
    let exporter = exporter_with(StaticSource::new(Vec::new()), store, true);

    assert!(exporter.start().await.success);
    exporter.set_interval(10).await.unwrap();

    let status = exporter.status();
    assert!(status.running);
    assert_eq!(status.interval_minutes, 10);

    exporter.stop().await;
}

#[tokio::test]
async fn test_interval_update_while_stopped() {
    let store = Arc::new(RecordingStore::default());
    let exporter = exporter_with(StaticSource::new(Vec::new()), store, true);

    exporter.set_interval(30).await.unwrap();

    let status = exporter.status();
    assert!(!status.running);
    assert_eq!(status.interval_minutes, 30);
}

#[tokio::test]
async fn test_list_recent_only_sees_export_prefix() {
    let store = Arc::new(RecordingStore::default());
    let tasks = vec![sample_task(1, Phase::PostSale, BusinessArea::FreeEnergyMarket)];
    let exporter = exporter_with(StaticSource::new(tasks), store.clone(), true);

    exporter.trigger_manual().await;

    let recent = exporter.list_recent(10).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert!(recent.iter().all(|o| o.key.starts_with("exports/")));
}

#[tokio::test]
async fn test_render_formats() {
    let store = Arc::new(RecordingStore::default());
    let tasks = vec![sample_task(7, Phase::Proposal, BusinessArea::Solar)];
    let exporter = exporter_with(StaticSource::new(tasks), store, true);

    let csv = exporter.render(ArtifactFormat::Tabular).await.unwrap();
    assert!(csv.filename.starts_with("tasks_") && csv.filename.ends_with(".csv"));
    assert_eq!(csv.content.lines().count(), 2);

    let json = exporter.render(ArtifactFormat::Structured).await.unwrap();
    assert!(json.filename.ends_with(".json"));
    let value: serde_json::Value = serde_json::from_str(&json.content).unwrap();
    assert_eq!(value["total_tasks"], 1);

    let report = exporter.render(ArtifactFormat::Report).await.unwrap();
    assert!(report.filename.ends_with(".txt"));
    assert!(report.content.contains("Total tasks: 1"));
}

#[tokio::test]
async fn test_render_fails_when_source_down() {
    let store = Arc::new(RecordingStore::default());
    let exporter = exporter_with(StaticSource::failing(), store, true);

    assert!(exporter.render(ArtifactFormat::Tabular).await.is_err());
}

#[test]
fn test_format_parsing() {
    assert_eq!(
        ArtifactFormat::from_str("csv").unwrap(),
        ArtifactFormat::Tabular
    );
    assert_eq!(
        ArtifactFormat::from_str("json").unwrap(),
        ArtifactFormat::Structured
    );
    assert_eq!(
        ArtifactFormat::from_str("report").unwrap(),
        ArtifactFormat::Report
    );
    assert!(ArtifactFormat::from_str("xml").is_err());
}
