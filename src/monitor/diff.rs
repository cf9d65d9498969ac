//! Snapshot comparison.
//!
//! Compares freshly extracted products against the last-seen snapshot:
//! - unknown ids are new products
//! - known ids whose price differs are price changes
//! - products missing from the page are not reported

use chrono::{DateTime, Utc};

use crate::models::{Price, Product, ProductSnapshot, SnapshotMap};

#[derive(Debug, Clone, PartialEq)]
pub enum ProductChange {
    New(Product),
    PriceChanged { product: Product, old_price: Price },
}

impl ProductChange {
    pub fn product(&self) -> &Product {
        match self {
            ProductChange::New(product) => product,
            ProductChange::PriceChanged { product, .. } => product,
        }
    }
}

/// Changes in the order products appear in `current`.
pub fn diff_products(previous: &SnapshotMap, current: &[Product]) -> Vec<ProductChange> {
    let mut changes: Vec<ProductChange> = Vec::new();

    for product in current {
        let id = product.id();

        // same product listed twice on one page is reported once
        if changes.iter().any(|c| c.product().id() == id) {
            continue;
        }

        match previous.get(&id) {
            None => changes.push(ProductChange::New(product.clone())),
            Some(seen) if !seen.price.same_as(&product.price) => {
                changes.push(ProductChange::PriceChanged {
                    product: product.clone(),
                    old_price: seen.price.clone(),
                });
            }
            Some(_) => {}
        }
    }

    changes
}

/// Record `current` into the snapshot map. Entries are never removed.
pub fn apply_products(snapshots: &mut SnapshotMap, current: &[Product], seen_at: DateTime<Utc>) {
    for product in current {
        snapshots.insert(product.id(), ProductSnapshot::from_product(product, seen_at));
    }
}
