//! Synonym tables that turn raw extracted entity values into canonical
//! product, package and scope identifiers.
//!
//! Tables are built once at start-up and never mutated afterwards, so they
//! can be shared across sessions behind an `Arc` without locking.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::data::DataError;
use crate::domain::product::{Package, ProductId};
use crate::domain::slots::parse_scope;

/// Case-folds and trims a raw value the way every table key is stored.
pub fn normalize_key(raw: &str) -> String {
    raw.trim().to_lowercase()
}

#[derive(Clone, Debug, Default)]
pub struct MappingTables {
    packages: HashMap<String, Package>,
    products: HashMap<String, ProductId>,
    scopes: HashMap<ProductId, HashMap<String, String>>,
}

impl MappingTables {
    pub fn load(
        package_path: &Path,
        product_path: &Path,
        scope_path: &Path,
    ) -> Result<Self, DataError> {
        let packages: HashMap<String, String> = read_json(package_path)?;
        let products: HashMap<String, String> = read_json(product_path)?;
        let scopes: HashMap<String, HashMap<String, String>> = read_json(scope_path)?;
        Self::from_parts(packages, products, scopes)
    }

    /// Builds the tables from raw synonym maps. Canonical values always map
    /// to themselves, and every scope synonym also names its product.
    pub fn from_parts(
        packages: HashMap<String, String>,
        products: HashMap<String, String>,
        scopes: HashMap<String, HashMap<String, String>>,
    ) -> Result<Self, DataError> {
        let mut package_index = HashMap::new();
        for (synonym, canonical) in packages {
            let package = canonical.parse::<Package>().map_err(|_| DataError::UnknownPackage {
                key: synonym.clone(),
                value: canonical.clone(),
            })?;
            package_index.insert(normalize_key(&synonym), package);
        }
        for package in Package::ALL {
            package_index.entry(package.as_str().to_string()).or_insert(package);
        }

        let mut product_index = HashMap::new();
        for (synonym, canonical) in products {
            let canonical = normalize_key(&canonical);
            product_index.entry(canonical.clone()).or_insert_with(|| ProductId(canonical.clone()));
            product_index.insert(normalize_key(&synonym), ProductId(canonical));
        }

        let mut scope_index = HashMap::new();
        for (product, synonyms) in scopes {
            let product = ProductId(normalize_key(&product));
            let mut codes = HashMap::new();
            for (synonym, code) in synonyms {
                if parse_scope(&code).is_none() {
                    return Err(DataError::InvalidScopeCode { product: product.0.clone(), code });
                }
                let synonym = normalize_key(&synonym);
                product_index.insert(synonym.clone(), product.clone());
                codes.insert(synonym, code.trim().to_string());
            }
            product_index.entry(product.0.clone()).or_insert_with(|| product.clone());
            scope_index.insert(product, codes);
        }

        Ok(Self { packages: package_index, products: product_index, scopes: scope_index })
    }

    pub fn package(&self, raw: &str) -> Option<Package> {
        self.packages.get(&normalize_key(raw)).copied()
    }

    pub fn product(&self, raw: &str) -> Option<&ProductId> {
        self.products.get(&normalize_key(raw))
    }

    /// Scope code for a raw phrase, if it is a scope synonym of `product`.
    pub fn scope_code(&self, product: &str, raw: &str) -> Option<&str> {
        self.scopes
            .get(&ProductId(product.to_string()))
            .and_then(|codes| codes.get(&normalize_key(raw)))
            .map(String::as_str)
    }

    pub fn package_synonyms(&self) -> usize {
        self.packages.len()
    }

    pub fn product_synonyms(&self) -> usize {
        self.products.len()
    }

    pub fn scope_synonyms(&self) -> usize {
        self.scopes.values().map(HashMap::len).sum()
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, DataError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| DataError::ReadFile { path: path.to_path_buf(), source })?;
    serde_json::from_str(&raw)
        .map_err(|source| DataError::ParseMapping { path: path.to_path_buf(), source })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::fs;

    use tempfile::TempDir;

    use super::MappingTables;
    use crate::data::DataError;
    use crate::domain::product::Package;

    fn tables() -> MappingTables {
        MappingTables::from_parts(
            HashMap::from([
                ("Small Business".to_string(), "standard".to_string()),
                ("trading company".to_string(), "professional".to_string()),
            ]),
            HashMap::from([("misa sme".to_string(), "sme".to_string())]),
            HashMap::from([(
                "sme".to_string(),
                HashMap::from([("SME Pro".to_string(), "13".to_string())]),
            )]),
        )
        .expect("tables should build")
    }

    #[test]
    fn lookups_case_fold_and_trim() {
        let tables = tables();
        assert_eq!(tables.package("  small business "), Some(Package::Standard));
        assert_eq!(tables.product("MISA SME").map(|id| id.as_str()), Some("sme"));
    }

    #[test]
    fn canonical_values_map_to_themselves() {
        let tables = tables();
        assert_eq!(tables.package("Enterprise"), Some(Package::Enterprise));
        assert_eq!(tables.product("sme").map(|id| id.as_str()), Some("sme"));
    }

    #[test]
    fn scope_synonyms_are_flattened_into_product_index() {
        let tables = tables();
        assert_eq!(tables.product("sme pro").map(|id| id.as_str()), Some("sme"));
        assert_eq!(tables.scope_code("sme", "SME PRO"), Some("13"));
        assert_eq!(tables.scope_code("sme", "sme"), None);
    }

    #[test]
    fn unknown_values_are_not_echoed_back() {
        let tables = tables();
        assert_eq!(tables.package("gold"), None);
        assert_eq!(tables.product("crm"), None);
    }

    #[test]
    fn unknown_canonical_package_fails_at_load() {
        let error = MappingTables::from_parts(
            HashMap::from([("startup".to_string(), "platinum".to_string())]),
            HashMap::new(),
            HashMap::new(),
        )
        .expect_err("platinum is not a package");
        assert!(matches!(error, DataError::UnknownPackage { .. }));
    }

    #[test]
    fn non_numeric_scope_code_fails_at_load() {
        let error = MappingTables::from_parts(
            HashMap::new(),
            HashMap::new(),
            HashMap::from([(
                "sme".to_string(),
                HashMap::from([("sme pro".to_string(), "pro".to_string())]),
            )]),
        )
        .expect_err("scope codes must be numeric");
        assert!(matches!(error, DataError::InvalidScopeCode { .. }));
    }

    #[test]
    fn load_reads_json_files() {
        let dir = TempDir::new().expect("temp dir");
        let packages = dir.path().join("package_mapping.json");
        let products = dir.path().join("product_mapping.json");
        let scopes = dir.path().join("scope_mapping.json");
        fs::write(&packages, r#"{"manufacturing": "professional"}"#).expect("write");
        fs::write(&products, r#"{"sme.net": "sme"}"#).expect("write");
        fs::write(&scopes, r#"{"sme": {"sme full": "16"}}"#).expect("write");

        let tables = MappingTables::load(&packages, &products, &scopes).expect("load");
        assert_eq!(tables.package("Manufacturing"), Some(Package::Professional));
        assert_eq!(tables.scope_synonyms(), 1);
    }

    #[test]
    fn malformed_json_reports_the_file() {
        let dir = TempDir::new().expect("temp dir");
        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{not json").expect("write");

        let error = MappingTables::load(&broken, &broken, &broken).expect_err("parse failure");
        assert!(error.to_string().contains("broken.json"));
    }
}
