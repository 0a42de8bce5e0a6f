use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cpq::catalog::{Catalog, CatalogRow};
use crate::domain::product::{Package, ProductId};
use crate::domain::slots::{parse_scope, SlotName, SlotState};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolvedProduct {
    pub product_name: ProductId,
    pub package: Package,
    pub scope: f64,
    pub price: Decimal,
    pub renewal_price: Decimal,
    /// True when only the product-level query matched.
    pub relaxed: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Resolution {
    Matched(ResolvedProduct),
    NoMatch,
}

impl Resolution {
    pub fn matched(&self) -> Option<&ResolvedProduct> {
        match self {
            Self::Matched(product) => Some(product),
            Self::NoMatch => None,
        }
    }
}

/// Missing or non-numeric scope resolves as threshold 0, the most permissive.
pub fn parse_scope_or_default(value: Option<&str>) -> f64 {
    value.and_then(parse_scope).unwrap_or(0.0)
}

/// Catalog queries used at submission time and for cross-slot prediction.
/// Every lookup is first-match in catalog order.
#[derive(Clone, Copy, Debug)]
pub struct CatalogResolver<'a> {
    catalog: &'a Catalog,
}

impl<'a> CatalogResolver<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    pub fn resolve(&self, slots: &SlotState) -> Resolution {
        let Some(product) = slots.product_name() else {
            return Resolution::NoMatch;
        };
        let scope = parse_scope_or_default(slots.get(SlotName::Scope));

        let strict = slots
            .package()
            .and_then(|package| {
                self.catalog.first_for_product_package_at_scope(product, package, scope)
            })
            .map(|row| resolved(row, scope, false));

        let resolution = strict
            .or_else(|| {
                self.catalog
                    .first_for_product_at_scope(product, scope)
                    .map(|row| resolved(row, scope, true))
            })
            .map(Resolution::Matched)
            .unwrap_or(Resolution::NoMatch);

        debug!(
            event_name = "dialog.catalog.resolved",
            product_name = product,
            scope,
            matched = resolution.matched().is_some(),
            relaxed = resolution.matched().map(|product| product.relaxed).unwrap_or(false),
            "catalog resolution finished"
        );
        resolution
    }

    /// Package of the first row of `product` covering `scope`.
    pub fn predict_package_for_scope(&self, product: &str, scope: f64) -> Option<Package> {
        self.catalog.first_for_product_at_scope(product, scope).map(|row| row.package)
    }

    /// Scope threshold of the first `(product, package)` row.
    pub fn predict_scope_for_package(&self, product: &str, package: Package) -> Option<u32> {
        self.catalog.first_for_product_package(product, package).map(|row| row.scope_threshold)
    }

    /// Package of the first row of any product covering `scope`.
    pub fn predict_package_any_product(&self, scope: f64) -> Option<Package> {
        self.catalog.first_at_scope(scope).map(|row| row.package)
    }
}

fn resolved(row: &CatalogRow, scope: f64, relaxed: bool) -> ResolvedProduct {
    ResolvedProduct {
        product_name: row.product_name.clone(),
        package: row.package,
        scope,
        price: row.price,
        renewal_price: row.renewal_price,
        relaxed,
    }
}
