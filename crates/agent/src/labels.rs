use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Human-readable names for intents, used when the bot asks the user to
/// confirm what they meant. Unlabelled intents fall back to their raw name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IntentLabels {
    labels: HashMap<String, String>,
}

impl IntentLabels {
    pub fn new(labels: HashMap<String, String>) -> Self {
        Self { labels }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("could not read intent labels `{}`", path.display()))?;
        let labels = serde_json::from_str(&raw)
            .with_context(|| format!("could not parse intent labels `{}`", path.display()))?;
        Ok(Self::new(labels))
    }

    pub fn label<'a>(&'a self, intent: &'a str) -> &'a str {
        self.labels.get(intent).map(String::as_str).unwrap_or(intent)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
