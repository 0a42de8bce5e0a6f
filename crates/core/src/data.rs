use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tracing::info;

use crate::config::DataConfig;
    use crate::cpq::catalog::Catalog;
use crate::mapping::MappingTables;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("could not read data file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: io::Error },
    #[error("could not parse mapping file `{path}`: {source}")]
    ParseMapping { path: PathBuf, source: serde_json::Error },
    #[error("could not parse catalog `{path}`: {source}")]
    ParseCatalog { path: PathBuf, source: csv::Error },
    #[error("catalog `{0}` has no rows")]
    EmptyCatalog(PathBuf),
    #[error("package mapping `{key}` points at unknown package `{value}`")]
    UnknownPackage { key: String, value: String },
    #[error("scope code `{code}` for product `{product}` is not numeric")]
    InvalidScopeCode { product: String, code: String },
}

/// Read-only reference data shared by every session.
#[derive(Clone, Debug, Default)]
pub struct DialogData {
    pub catalog: Catalog,
    pub mappings: MappingTables,
}

impl DialogData {
    pub fn new(catalog: Catalog, mappings: MappingTables) -> Self {
        Self { catalog, mappings }
    }

    pub fn load(config: &DataConfig) -> Result<Self, DataError> {
        let catalog = Catalog::load(&config.catalog_path)?;
        let mappings = MappingTables::load(
            &config.package_mapping_path,
            &config.product_mapping_path,
            &config.scope_mapping_path,
        )?;

        info!(
            event_name = "system.data.loaded",
            correlation_id = "bootstrap",
            catalog_rows = catalog.len(),
            package_synonyms = mappings.package_synonyms(),
            product_synonyms = mappings.product_synonyms(),
            scope_synonyms = mappings.scope_synonyms(),
            "reference data loaded"
        );
        Ok(Self::new(catalog, mappings))
    }
}
