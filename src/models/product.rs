use serde::{Deserialize, Serialize};
use std::fmt;

// NewType pattern for type safety
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(pub String);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Price {
    pub fn new(value: impl Into<String>) -> Self {
        Price(value.into())
    }

    pub fn as_number(&self) -> Option<f64> {
        self.0.trim().parse::<f64>().ok().filter(|n| n.is_finite())
    }

    /// Two prices are the same when they are numerically equal ("100" and
    /// "100.00"), or textually equal when either side is not a number.
    pub fn same_as(&self, other: &Price) -> bool {
        match (self.as_number(), other.as_number()) {
            (Some(a), Some(b)) => (a - b).abs() < 1e-9,
            _ => self.0.trim() == other.0.trim(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    pub price: Price,
    pub image_url: Option<String>,
    pub link_url: Option<String>,
}

impl Product {
    /// Snapshot key: the absolute link when there is one, otherwise a digest of
    /// the normalised name.
    pub fn id(&self) -> ProductId {
        match self.link_url.as_deref().map(str::trim) {
            Some(link) if !link.is_empty() => ProductId(link.to_string()),
            _ => {
                let name_norm = self.name.to_lowercase().trim().to_string();
                let digest = md5::compute(name_norm.as_bytes());
                ProductId(format!("name:{:x}", digest))
            }
        }
    }
}
