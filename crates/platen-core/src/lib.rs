// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platen — core types, settings store, and error definitions shared across
// the frontend crates.

pub mod config;
pub mod error;
pub mod logging;
pub mod settings;
pub mod types;

pub use config::FrontendConfig;
pub use error::{Error, Result};
pub use settings::Settings;
pub use types::*;
