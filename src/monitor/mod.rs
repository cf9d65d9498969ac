use anyhow::Result;
use async_trait::async_trait;

use crate::config::CategoryConfig;

pub mod diff;
pub mod scanner;

pub use diff::{apply_products, diff_products, ProductChange};
pub use scanner::{CycleReport, Scanner};

/// Destination for change notifications produced by a scan.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, change: &ProductChange, category: &CategoryConfig) -> Result<()>;
}
