use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProductId(pub String);

impl ProductId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Product tier. Declaration order is tier order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Package {
    Standard,
    Professional,
    Enterprise,
}

impl Package {
    pub const ALL: [Package; 3] = [Package::Standard, Package::Professional, Package::Enterprise];
    pub const TOP_TIER: Package = Package::Enterprise;

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Professional => "professional",
            Self::Enterprise => "enterprise",
        }
    }

    pub fn is_top_tier(&self) -> bool {
        *self == Self::TOP_TIER
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unknown package `{0}` (expected standard|professional|enterprise)")]
pub struct UnknownPackage(pub String);

impl FromStr for Package {
    type Err = UnknownPackage;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "standard" => Ok(Self::Standard),
            "professional" => Ok(Self::Professional),
            "enterprise" => Ok(Self::Enterprise),
            other => Err(UnknownPackage(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Package;

    #[test]
    fn package_parsing_is_case_insensitive() {
        assert_eq!(" Professional ".parse::<Package>(), Ok(Package::Professional));
        assert!("gold".parse::<Package>().is_err());
    }

    #[test]
    fn enterprise_is_the_only_top_tier() {
        let top: Vec<_> = Package::ALL.iter().filter(|package| package.is_top_tier()).collect();
        assert_eq!(top, vec![&Package::Enterprise]);
    }
}
