// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Prashna: Core types, configuration and error definitions shared across all crates.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod types;

pub use config::PipelineConfig;
pub use error::PrashnaError;
pub use types::*;
