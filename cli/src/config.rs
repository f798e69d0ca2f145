use error_stack::{Report, ResultExt};
use std::path::Path;
use thiserror::Error;
use topology_core::TopologyConfig;

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("could not read config file")]
    Read,
    #[error("config file is not valid JSON")]
    Parse,
    #[error("config failed validation")]
    Invalid,
}

/// Loads and validates a `TopologyConfig` from a JSON file, mirroring the
/// teacher's `osm_tool::config` loader: read, parse, validate, each stage
/// wrapped in its own `error-stack` context so a failure names exactly
/// which step broke.
pub fn load_config(path: &Path) -> Result<TopologyConfig, Report<ConfigLoadError>> {
    let text = std::fs::read_to_string(path).change_context(ConfigLoadError::Read).attach_printable_lazy(|| format!("path: {}", path.display()))?;
    let config: TopologyConfig = serde_json::from_str(&text).change_context(ConfigLoadError::Parse)?;
    config.validate().change_context(ConfigLoadError::Invalid)?;
    Ok(config)
}
