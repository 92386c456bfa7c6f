//! TDP Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared error handling and logging for the TDP workspace.
//!
//! # Overview
//!
//! This crate provides the infrastructure used by every TDP workspace member:
//!
//! - **Error Handling**: the [`TdpError`] type and [`Result`] alias
//! - **Logging**: [`logging`] configuration and `tracing` initialization
//!
//! # Example
//!
//! ```no_run
//! use tdp_common::logging::{init_logging, LogConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = LogConfig::from_env()?;
//!     init_logging(&config)?;
//!     tracing::info!("ready");
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{Result, TdpError};
