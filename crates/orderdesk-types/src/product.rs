//! Product catalog.
//!
//! The catalog is read-only configuration: the lifecycle engine looks
//! products up by code and copies the entry into the order it creates.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ProductCode;

/// An immutable catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub code: ProductCode,
    pub name: String,
    pub price: Decimal,
    /// Human-readable subscription length (e.g. "7 days").
    pub duration: String,
}

impl Product {
    #[must_use]
    pub fn new(
        code: impl AsRef<str>,
        name: impl Into<String>,
        price: Decimal,
        duration: impl Into<String>,
    ) -> Self {
        Self {
            code: ProductCode::new(code),
            name: name.into(),
            price,
            duration: duration.into(),
        }
    }
}

impl std::fmt::Display for Product {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (${})", self.name, self.price)
    }
}

/// Lookup table of products keyed by [`ProductCode`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    products: Vec<Product>,
}

impl Catalog {
    #[must_use]
    pub fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    /// The four subscription tiers the desk has always sold.
    #[must_use]
    pub fn standard() -> Self {
        Self::new(vec![
            Product::new("day", "1 Day", Decimal::new(10, 0), "24 hours"),
            Product::new("week", "1 Week", Decimal::new(30, 0), "7 days"),
            Product::new("month", "1 Month", Decimal::new(50, 0), "30 days"),
            Product::new("year", "1 Year", Decimal::new(150, 0), "365 days"),
        ])
    }

    #[must_use]
    pub fn get(&self, code: &ProductCode) -> Option<&Product> {
        self.products.iter().find(|p| &p.code == code)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Product> {
        self.products.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}
