use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use dealbot_core::mapping::normalize_key;
use serde::{Deserialize, Serialize};

/// One sales campaign for a product, inclusive on both ends.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Promotion {
    pub product_name: String,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
    pub offers: Vec<String>,
}

impl Promotion {
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        self.starts_on <= date && date <= self.ends_on
    }

    pub fn applies_to(&self, product_name: &str) -> bool {
        normalize_key(&self.product_name) == normalize_key(product_name)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PromotionCalendar {
    promotions: Vec<Promotion>,
}

impl PromotionCalendar {
    pub fn new(promotions: Vec<Promotion>) -> Self {
        Self { promotions }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("could not read promotions `{}`", path.display()))?;
        Self::from_json(&raw)
            .with_context(|| format!("could not parse promotions `{}`", path.display()))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let promotions: Vec<Promotion> = serde_json::from_str(raw)?;
        if let Some(invalid) = promotions.iter().find(|promo| promo.ends_on < promo.starts_on) {
            anyhow::bail!(
                "promotion for `{}` ends on {} before it starts on {}",
                invalid.product_name,
                invalid.ends_on,
                invalid.starts_on
            );
        }
        Ok(Self::new(promotions))
    }

    /// Campaigns for `product_name` running on `date`, in file order.
    pub fn active_on(&self, product_name: &str, date: NaiveDate) -> Vec<&Promotion> {
        self.promotions
            .iter()
            .filter(|promo| promo.applies_to(product_name) && promo.is_active_on(date))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.promotions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.promotions.is_empty()
    }
}
