// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Logging setup.
//
// Verbosity comes from `PLATEN_LOG` (EnvFilter syntax, default `error`);
// `PLATEN_LOG_FILE` redirects output from stderr to a file, appending.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

/// Environment variable controlling log verbosity.
pub const LOG_LEVEL_ENV: &str = "PLATEN_LOG";

/// Environment variable naming an append-mode log file.
pub const LOG_FILE_ENV: &str = "PLATEN_LOG_FILE";

/// Install the global tracing subscriber.
///
/// Host dialogs that install their own subscriber can skip this entirely;
/// calling it after another subscriber is installed is a no-op.
pub fn init() {
    let filter =
        EnvFilter::try_from_env(LOG_LEVEL_ENV).unwrap_or_else(|_| EnvFilter::new("error"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let log_file = std::env::var(LOG_FILE_ENV).ok().and_then(|path| {
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .ok()
    });

    match log_file {
        Some(file) => {
            let _ = builder.with_writer(Arc::new(file)).with_ansi(false).try_init();
        }
        None => {
            let _ = builder.with_writer(std::io::stderr).try_init();
        }
    }
}
