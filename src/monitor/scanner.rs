use anyhow::{Context, Result};
use chrono::{Local, Utc};
use futures::future::join_all;
use reqwest::Client;
use std::sync::Arc;
use tokio::sync::watch;
use std::time::Duration;
use tokio::time::{interval, sleep, Interval, MissedTickBehavior};
use tracing::{error, info, warn};
use url::Url;

use crate::config::{CategoryConfig, Config};
use crate::models::Product;
use crate::monitor::{apply_products, diff_products, Notifier};
use crate::parsers::ProductExtractor;
use crate::storage::Storage;
use crate::utils::http::fetch_html;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub first_run: bool,
    pub categories_scanned: usize,
    pub categories_failed: usize,
    pub products_seen: usize,
    pub changes: usize,
    pub notified: usize,
}

/// Ticks every `period`, first tick immediately. A cycle that overruns
/// drops the ticks it missed instead of firing them back to back.
fn scan_ticker(period: Duration) -> Interval {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

/// Periodically scans the configured category pages and reports new products
/// and price changes. Cycles run one after another, never concurrently.
pub struct Scanner {
    client: Arc<Client>,
    config: Arc<Config>,
    extractor: Arc<ProductExtractor>,
    storage: Arc<dyn Storage>,
    notifier: Arc<dyn Notifier>,
}

impl Scanner {
    pub fn new(
        client: Arc<Client>,
        config: Arc<Config>,
        extractor: Arc<ProductExtractor>,
        storage: Arc<dyn Storage>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            client,
            config,
            extractor,
            storage,
            notifier,
        }
    }

    async fn scan_category(&self, category: &CategoryConfig) -> Result<Vec<Product>> {
        info!("Processing category: {}", category.name);

        let url = Url::parse(&category.url)
            .with_context(|| format!("Invalid URL for category {}", category.name))?;
        let page = fetch_html(&self.client, &url, &self.config.http).await?;
        let extraction = self.extractor.extract(&page.html, &page.url);

        if extraction.products.is_empty() {
            warn!(category = %category.name, url = %page.url, "No products recognised on category page");
        }

        Ok(extraction.products)
    }

    /// One pass over every category. Categories are fetched concurrently, then
    /// diffed and recorded in configuration order so a product listed in two
    /// categories is reported once.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let categories = &self.config.monitor.categories;

        let mut snapshots = self.storage.load().await.context("Failed to load product snapshots")?;
        let first_run = snapshots.is_empty();
        let notify = !first_run || self.config.monitor.notify_on_first_run;
        let delay = self.config.monitor.notify_delay();

        let results = join_all(categories.iter().map(|category| self.scan_category(category))).await;

        let mut report = CycleReport {
            first_run,
            ..CycleReport::default()
        };
        let seen_at = Utc::now();

        for (category, result) in categories.iter().zip(results) {
            let products = match result {
                Ok(products) => products,
                Err(e) => {
                    report.categories_failed += 1;
                    error!(category = %category.name, "Failed to scan category: {:#}", e);
                    continue;
                }
            };

            report.categories_scanned += 1;
            report.products_seen += products.len();

            let changes = diff_products(&snapshots, &products);
            report.changes += changes.len();

            if changes.is_empty() {
                info!("No changes found in {}", category.name);
            } else if !notify {
                info!(
                    "First run: recording {} products from {} without notifying",
                    changes.len(),
                    category.name
                );
            } else {
                info!("Found {} changes in {}", changes.len(), category.name);

                for change in &changes {
                    match self.notifier.notify(change, category).await {
                        Ok(()) => report.notified += 1,
                        Err(e) => error!("Failed to send notification for {}: {:#}", change.product().name, e),
                    }

                    // Small delay between notifications
                    if !delay.is_zero() {
                        sleep(delay).await;
                    }
                }
            }

            apply_products(&mut snapshots, &products, seen_at);
        }

        self.storage
            .save(&snapshots)
            .await
            .context("Failed to save product snapshots")?;

        Ok(report)
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let period = self.config.monitor.scan_interval();
        let mut ticker = scan_ticker(period);

        info!(
            categories = self.config.monitor.categories.len(),
            "Scanner started, interval {} seconds",
            period.as_secs()
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => {
                    info!("Scanner stopping");
                    break;
                }
            }

            info!("--- Starting new scan cycle at {} ---", Local::now().format("%Y-%m-%d %H:%M:%S"));

            // An abandoned cycle saves nothing and is redone on the next start.
            let result = tokio::select! {
                result = self.run_cycle() => result,
                _ = shutdown.changed() => {
                    info!("Scanner stopping, abandoning the running cycle");
                    break;
                }
            };

            match result {
                Ok(report) => info!(
                    scanned = report.categories_scanned,
                    failed = report.categories_failed,
                    products = report.products_seen,
                    changes = report.changes,
                    notified = report.notified,
                    "Scan cycle completed, waiting {} seconds",
                    period.as_secs()
                ),
                Err(e) => error!("Scan cycle failed: {:#}", e),
            }
        }
    }
}
