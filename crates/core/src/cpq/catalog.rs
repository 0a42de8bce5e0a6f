use std::fs::File;
use std::io::Read;
use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::data::DataError;
use crate::domain::product::{Package, ProductId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogRow {
    #[serde(alias = "pname")]
    pub product_name: ProductId,
    #[serde(alias = "ppack")]
    pub package: Package,
    #[serde(alias = "pscopes")]
    pub scope_threshold: u32,
    #[serde(alias = "pprice")]
    pub price: Decimal,
    #[serde(alias = "puprice")]
    pub renewal_price: Decimal,
}

impl CatalogRow {
    pub fn covers(&self, scope: f64) -> bool {
        f64::from(self.scope_threshold) >= scope
    }
}

/// Ordered product rows. Every query returns the first matching row in
/// source order, so reordering the file changes resolution outcomes.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    rows: Vec<CatalogRow>,
}

impl Catalog {
    pub fn new(rows: Vec<CatalogRow>) -> Self {
        Self { rows }
    }

    pub fn load(path: &Path) -> Result<Self, DataError> {
        let file = File::open(path)
            .map_err(|source| DataError::ReadFile { path: path.to_path_buf(), source })?;
        Self::from_reader(file, path)
    }

    /// Parses CSV rows; `origin` names the source in errors.
    pub fn from_reader<R: Read>(reader: R, origin: &Path) -> Result<Self, DataError> {
        let mut csv = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut rows = Vec::new();
        for record in csv.deserialize::<CatalogRow>() {
            let mut row = record
                .map_err(|source| DataError::ParseCatalog { path: origin.to_path_buf(), source })?;
            row.product_name = ProductId(row.product_name.0.trim().to_lowercase());
            rows.push(row);
        }

        if rows.is_empty() {
            return Err(DataError::EmptyCatalog(origin.to_path_buf()));
        }
        Ok(Self::new(rows))
    }

    pub fn rows(&self) -> &[CatalogRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_product(&self, product: &str) -> bool {
        self.rows.iter().any(|row| row.product_name.as_str() == product)
    }

    pub fn products(&self) -> Vec<&ProductId> {
        let mut products: Vec<&ProductId> = Vec::new();
        for row in &self.rows {
            if !products.contains(&&row.product_name) {
                products.push(&row.product_name);
            }
        }
        products
    }

    /// The highest scope threshold: the scope code that implies the top tier.
    pub fn max_scope(&self) -> Option<u32> {
        self.rows.iter().map(|row| row.scope_threshold).max()
    }

    /// The top-tier scope code for `product`: its own highest threshold.
    /// Falls back to [`Catalog::max_scope`] when the product is unknown.
    pub fn max_scope_for(&self, product: Option<&str>) -> Option<u32> {
        product
            .and_then(|product| {
                self.rows
                    .iter()
                    .filter(|row| row.product_name.as_str() == product)
                    .map(|row| row.scope_threshold)
                    .max()
            })
            .or_else(|| self.max_scope())
    }

    pub fn first_at_scope(&self, scope: f64) -> Option<&CatalogRow> {
        self.rows.iter().find(|row| row.covers(scope))
    }

    pub fn first_for_product_at_scope(&self, product: &str, scope: f64) -> Option<&CatalogRow> {
        self.rows.iter().find(|row| row.product_name.as_str() == product && row.covers(scope))
    }

    pub fn first_for_product_package(
        &self,
        product: &str,
        package: Package,
    ) -> Option<&CatalogRow> {
        self.rows.iter().find(|row| row.product_name.as_str() == product && row.package == package)
    }

    pub fn first_for_product_package_at_scope(
        &self,
        product: &str,
        package: Package,
        scope: f64,
    ) -> Option<&CatalogRow> {
        self.rows.iter().find(|row| {
            row.product_name.as_str() == product && row.package == package && row.covers(scope)
        })
    }
}
