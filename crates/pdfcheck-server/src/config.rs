// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Configuration loading for the server binary.

use std::path::Path;

use pdfcheck_core::ServerConfig;
use pdfcheck_core::error::{PdfCheckError, Result};
use tracing::info;

/// Environment variable naming a JSON config file.
pub const CONFIG_ENV: &str = "PDFCHECK_CONFIG";

/// Environment variable overriding the listen port.
pub const PORT_ENV: &str = "PDFCHECK_PORT";

/// Load the config named by `PDFCHECK_CONFIG` (defaults when unset), then
/// apply `PDFCHECK_PORT`.
pub fn load() -> Result<ServerConfig> {
    let file = std::env::var_os(CONFIG_ENV);
    let port = std::env::var(PORT_ENV).ok();
    load_from(file.as_deref().map(Path::new), port.as_deref())
}

/// Load from an optional JSON file and an optional port override.
pub fn load_from(file: Option<&Path>, port: Option<&str>) -> Result<ServerConfig> {
    let mut config = match file {
        Some(path) => {
            let data = std::fs::read_to_string(path)?;
            let config: ServerConfig = serde_json::from_str(&data)?;
            info!(path = %path.display(), "configuration loaded");
            config
        }
        None => ServerConfig::default(),
    };

    if let Some(port) = port {
        config.port = port
            .trim()
            .parse()
            .map_err(|_| PdfCheckError::Server(format!("invalid {PORT_ENV}: {port:?}")))?;
    }

    Ok(config)
}
