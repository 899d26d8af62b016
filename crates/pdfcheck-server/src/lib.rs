// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pdfcheck-server — JSON-over-HTTP front end for the verification pipeline.
//
// One request per TCP connection. Requests are framed just enough to find the
// JSON body; each pipeline run happens on the blocking thread pool.

pub mod config;
pub mod http;
pub mod routes;
pub mod server;

pub use server::PdfCheckServer;
