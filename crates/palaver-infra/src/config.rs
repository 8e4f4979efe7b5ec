//! Gateway configuration loader.
//!
//! Reads `config.toml` from the data directory (`~/.palaver/` in
//! production) and deserializes it into [`GatewayConfig`]. Falls back to
//! defaults when the file is missing or malformed -- a broken config file
//! should degrade the relay to its defaults, not keep it from starting.

use std::path::Path;

use palaver_types::config::GatewayConfig;
use palaver_types::model::ModelCatalog;

/// Load gateway configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`GatewayConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns
///   the default.
/// - If the file exists and parses successfully, returns the parsed
///   config.
pub async fn load_gateway_config(data_dir: &Path) -> GatewayConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return GatewayConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return GatewayConfig::default();
        }
    };

    match toml::from_str::<GatewayConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            GatewayConfig::default()
        }
    }
}

/// Build the model catalog: the built-in table plus any `[[models]]`
/// entries from the config (same id replaces, new id appends).
pub fn build_catalog(config: &GatewayConfig) -> ModelCatalog {
    let mut catalog = ModelCatalog::builtin();
    catalog.extend(config.models.iter().cloned());
    catalog
}
