// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pdfcheck — PDF verification and repair service.
//
// Entry point. Initialises logging, loads configuration, and serves requests
// until interrupted.

use pdfcheck_server::{PdfCheckServer, config};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("pdfcheck starting");

    let config = match config::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "cannot load configuration");
            std::process::exit(2);
        }
    };

    let mut server = PdfCheckServer::new(config);
    if let Err(e) = server.start().await {
        tracing::error!(error = %e, "cannot start server");
        std::process::exit(1);
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "cannot listen for shutdown signal");
    }

    if let Err(e) = server.stop().await {
        tracing::warn!(error = %e, "unclean shutdown");
    }
}
