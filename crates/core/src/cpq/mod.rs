pub mod catalog;
pub mod pricing;
pub mod resolver;

pub use catalog::{Catalog, CatalogRow};
pub use pricing::{format_amount, format_price};
pub use resolver::{parse_scope_or_default, CatalogResolver, Resolution, ResolvedProduct};
