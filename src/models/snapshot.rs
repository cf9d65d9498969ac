use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{Price, Product, ProductId};

/// Last-seen state of one product, keyed by [`ProductId`] in the snapshot file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub name: String,
    pub price: Price,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub link_url: Option<String>,
    #[serde(default = "Utc::now")]
    pub last_seen: DateTime<Utc>,
}

pub type SnapshotMap = BTreeMap<ProductId, ProductSnapshot>;

impl ProductSnapshot {
    pub fn from_product(product: &Product, seen_at: DateTime<Utc>) -> Self {
        Self {
            name: product.name.clone(),
            price: product.price.clone(),
            image_url: product.image_url.clone(),
            link_url: product.link_url.clone(),
            last_seen: seen_at,
        }
    }
}
