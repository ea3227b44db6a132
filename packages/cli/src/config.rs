//! Column layout configuration.

use std::path::Path;

use crime_olap_crime_models::ColumnLayout;

/// Errors reading a layout file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read layout file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid layout file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Loads the column layout from `path`, or the default layout when no
/// file is given. Fields missing from the file keep their defaults.
///
/// # Errors
///
/// Returns [`ConfigError`] if the file cannot be read or parsed.
pub fn load_layout(path: Option<&Path>) -> Result<ColumnLayout, ConfigError> {
    let Some(path) = path else {
        return Ok(ColumnLayout::default());
    };

    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let layout: ColumnLayout = toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })?;

    log::debug!("Using layout from {}: {layout:?}", path.display());

    Ok(layout)
}
