// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Settings for a single verification pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    /// Directory that receives extracted `image_{page}_{xref}.{ext}` files.
    pub image_dir: PathBuf,
    /// Directory where decoded blobs are staged (system temp dir when unset).
    pub staging_dir: Option<PathBuf>,
    /// Whether a salvage that stopped part-way may still be used to rebuild.
    pub accept_partial_salvage: bool,
    /// Number of trailing bytes searched for the `%%EOF` marker.
    pub eof_search_window: usize,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            image_dir: PathBuf::from("."),
            staging_dir: None,
            accept_partial_salvage: true,
            eof_search_window: 1024,
        }
    }
}

impl VerifierConfig {
    /// Resolve the staging directory for decoded blobs.
    pub fn staging_dir(&self) -> PathBuf {
        self.staging_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Settings for the JSON request server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind the listener to.
    pub bind_address: String,
    /// TCP port (default 5000).
    pub port: u16,
    /// Maximum bytes read from one connection before it is rejected.
    pub max_request_bytes: usize,
    /// Pipeline settings handed to every request-scoped verifier.
    pub verifier: VerifierConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".into(),
            port: 5000,
            max_request_bytes: 64 * 1024 * 1024,
            verifier: VerifierConfig::default(),
        }
    }
}
