use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use dealbot_core::config::{AppConfig, LoadOptions};
use toml::Value;

/// Where a config file, if any, was picked up from.
struct FileSource {
    path: Option<PathBuf>,
    doc: Option<Value>,
}

impl FileSource {
    fn detect() -> Self {
        let path = ["dealbot.toml", "config/dealbot.toml"]
            .into_iter()
            .map(PathBuf::from)
            .find(|path| path.exists());
        let doc = path.as_deref().and_then(load_doc);
        Self { path, doc }
    }

    /// `env` beats `file` beats `default`. Any of `env_keys` counts.
    fn source(&self, key_path: &str, env_keys: &[&str]) -> String {
        if let Some(key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
            return format!("env ({key})");
        }
        let in_file = self.doc.as_ref().is_some_and(|doc| {
            contains_path(doc, key_path)
                || (is_data_key(key_path) && contains_path(doc, "data.dir"))
        });
        if in_file {
            let file = self.path.as_ref().map(|path| path.display().to_string());
            return format!("file ({})", file.unwrap_or_else(|| "config file".to_string()));
        }
        "default".to_string()
    }
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };
    render(&config, &FileSource::detect())
}

fn render(config: &AppConfig, file: &FileSource) -> String {
    let data = &config.data;
    let dialog = &config.dialog;
    let server = &config.server;
    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    let mut push = |key: &str, value: String, env_keys: &[&str]| {
        lines.push(render_line(key, &value, file.source(key, env_keys)));
    };

    push(
        "data.catalog_path",
        data.catalog_path.display().to_string(),
        &["DEALBOT_DATA_CATALOG_PATH", "DEALBOT_DATA_DIR"],
    );
    push(
        "data.package_mapping_path",
        data.package_mapping_path.display().to_string(),
        &["DEALBOT_DATA_PACKAGE_MAPPING_PATH", "DEALBOT_DATA_DIR"],
    );
    push(
        "data.product_mapping_path",
        data.product_mapping_path.display().to_string(),
        &["DEALBOT_DATA_PRODUCT_MAPPING_PATH", "DEALBOT_DATA_DIR"],
    );
    push(
        "data.scope_mapping_path",
        data.scope_mapping_path.display().to_string(),
        &["DEALBOT_DATA_SCOPE_MAPPING_PATH", "DEALBOT_DATA_DIR"],
    );
    push(
        "data.promotions_path",
        optional_path(data.promotions_path.as_deref()),
        &["DEALBOT_DATA_PROMOTIONS_PATH", "DEALBOT_DATA_DIR"],
    );
    push(
        "data.intent_labels_path",
        optional_path(data.intent_labels_path.as_deref()),
        &["DEALBOT_DATA_INTENT_LABELS_PATH", "DEALBOT_DATA_DIR"],
    );

    push("session.ttl_secs", config.session.ttl_secs.to_string(), &["DEALBOT_SESSION_TTL_SECS"]);

    push("dialog.trial_days", dialog.trial_days.to_string(), &["DEALBOT_DIALOG_TRIAL_DAYS"]);
    push(
        "dialog.training_days",
        dialog.training_days.to_string(),
        &["DEALBOT_DIALOG_TRAINING_DAYS"],
    );
    push("dialog.purchase_url", dialog.purchase_url.clone(), &["DEALBOT_DIALOG_PURCHASE_URL"]);
    push("dialog.trial_url", dialog.trial_url.clone(), &["DEALBOT_DIALOG_TRIAL_URL"]);

    push("server.bind_address", server.bind_address.clone(), &["DEALBOT_SERVER_BIND_ADDRESS"]);
    push("server.port", server.port.to_string(), &["DEALBOT_SERVER_PORT"]);
    push(
        "server.graceful_shutdown_secs",
        server.graceful_shutdown_secs.to_string(),
        &["DEALBOT_SERVER_GRACEFUL_SHUTDOWN_SECS"],
    );

    push(
        "logging.level",
        config.logging.level.clone(),
        &["DEALBOT_LOGGING_LEVEL", "DEALBOT_LOG_LEVEL"],
    );
    push(
        "logging.format",
        format!("{:?}", config.logging.format),
        &["DEALBOT_LOGGING_FORMAT", "DEALBOT_LOG_FORMAT"],
    );

    lines.join("\n")
}

fn optional_path(path: Option<&Path>) -> String {
    path.map(|path| path.display().to_string()).unwrap_or_else(|| "<unset>".to_string())
}

fn load_doc(path: &Path) -> Option<Value> {
    fs::read_to_string(path).ok()?.parse::<Value>().ok()
}

fn is_data_key(key_path: &str) -> bool {
    key_path.starts_with("data.")
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

#[cfg(test)]
mod tests {
    use dealbot_core::config::AppConfig;

    use super::{contains_path, render, FileSource};

    #[test]
    fn file_keys_are_attributed_to_the_file() {
        let doc: toml::Value = "[session]\nttl_secs = 60\n[data]\ndir = \"fixtures\"\n"
            .parse()
            .expect("valid toml");
        let file = FileSource { path: Some("dealbot.toml".into()), doc: Some(doc) };

        assert_eq!(file.source("session.ttl_secs", &[]), "file (dealbot.toml)");
        assert_eq!(file.source("data.catalog_path", &[]), "file (dealbot.toml)");
        assert_eq!(file.source("server.port", &[]), "default");
    }

    #[test]
    fn render_lists_every_section() {
        let output = render(&AppConfig::default(), &FileSource { path: None, doc: None });

        assert!(output.starts_with("effective config"));
        assert!(output.contains("- data.catalog_path = data/catalog.csv (source: default)"));
        assert!(output.contains("- session.ttl_secs = 3000 (source: default)"));
        assert!(output.contains("- dialog.trial_days = 15 (source: default)"));
        assert!(output.contains("- logging.format = Compact (source: default)"));
    }

    #[test]
    fn nested_paths_are_found() {
        let doc: toml::Value = "[server]\nport = 8080\n".parse().expect("valid toml");
        assert!(contains_path(&doc, "server.port"));
        assert!(!contains_path(&doc, "server.bind_address"));
    }
}
