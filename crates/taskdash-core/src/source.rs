use async_trait::async_trait;

use crate::{PriceTotals, Result, Task};

/// Read-only view of the task table, as consumed by the export layer.
#[async_trait]
pub trait TaskSource: Send + Sync {
    /// All tasks, in the source's stable order.
    async fn fetch_all(&self) -> Result<Vec<Task>>;

    /// Aggregate purchase/sale sums across all tasks.
    async fn totals(&self) -> Result<PriceTotals>;

    /// Current number of tasks.
    async fn count(&self) -> Result<u64>;
}
