//! Product catalog: provider product id to domain effect.
//!
//! Loaded from a JSON file so provider plan ids never appear in code:
//!
//! ```json
//! {"products": [
//!   {"provider": "afdian", "productId": "6f73a48e", "kind": "membership", "tier": "premium"},
//!   {"provider": "kofi", "productId": "donation", "kind": "point_package", "points": 100}
//! ]}
//! ```

use super::LineItem;
use crate::domain::{ProductEffect, ProductKind, Provider, Tier, POINT_MAX};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Longest membership a single line item may buy.
pub const MAX_MEMBERSHIP_MONTHS: i64 = 120;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid catalog: {0}")]
    Json(#[from] serde_json::Error),
    #[error("duplicate catalog entry {provider}/{product_id}")]
    Duplicate {
        provider: Provider,
        product_id: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported product {product_id:?}: {reason}")]
pub struct UnsupportedProduct {
    pub product_id: String,
    pub reason: &'static str,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    products: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogEntry {
    provider: Provider,
    product_id: String,
    #[serde(flatten)]
    kind: ProductKind,
}

#[derive(Debug, Clone, Default)]
pub struct ProductCatalog {
    products: HashMap<(Provider, String), ProductKind>,
}

impl ProductCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a product; later registrations replace earlier ones.
    pub fn with_product(mut self, provider: Provider, product_id: &str, kind: ProductKind) -> Self {
        self.products.insert((provider, product_id.to_string()), kind);
        self
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        let mut products = HashMap::with_capacity(file.products.len());
        for entry in file.products {
            let key = (entry.provider, entry.product_id.trim().to_string());
            if products.contains_key(&key) {
                return Err(CatalogError::Duplicate {
                    provider: key.0,
                    product_id: key.1,
                });
            }
            products.insert(key, entry.kind);
        }
        Ok(Self { products })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Map one purchased line to its effect.
    pub fn classify(
        &self,
        provider: Provider,
        item: &LineItem,
    ) -> Result<ProductEffect, UnsupportedProduct> {
        let unsupported = |reason| UnsupportedProduct {
            product_id: item.product_id.clone(),
            reason,
        };

        let kind = self
            .products
            .get(&(provider, item.product_id.clone()))
            .ok_or_else(|| unsupported("unknown product"))?;

        match *kind {
            ProductKind::Membership { tier } => {
                if item.months <= 0 {
                    return Err(unsupported("month count must be positive"));
                }
                if item.months > MAX_MEMBERSHIP_MONTHS {
                    return Err(unsupported("month count out of range"));
                }
                Ok(match tier {
                    Tier::Normal => ProductEffect::NormalMembership {
                        months: item.months,
                    },
                    Tier::Premium => ProductEffect::PremiumMembership {
                        months: item.months,
                    },
                })
            }
            ProductKind::PointPackage { points } => {
                if item.units <= 0 || points <= 0 {
                    return Err(unsupported("quantity must be positive"));
                }
                points
                    .checked_mul(item.units)
                    .filter(|total| *total <= POINT_MAX)
                    .map(|points| ProductEffect::PointPackage { points })
                    .ok_or_else(|| unsupported("point total out of range"))
            }
            ProductKind::OneTimeReset => Ok(ProductEffect::OneTimeReset),
        }
    }

    /// Classify every line; fails on the first unsupported one.
    pub fn classify_all(
        &self,
        provider: Provider,
        items: &[LineItem],
    ) -> Result<Vec<ProductEffect>, UnsupportedProduct> {
        if items.is_empty() {
            return Err(UnsupportedProduct {
                product_id: String::new(),
                reason: "no products in event",
            });
        }
        items
            .iter()
            .map(|item| self.classify(provider, item))
            .collect()
    }
}
