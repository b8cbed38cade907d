//! # PICU Common Library
//!
//! Shared code for the PICU loader tools including:
//! - Common error type
//! - Configuration file resolution and TOML loading
//! - Logging initialisation
//! - Clinical timestamp parsing and formatting

pub mod config;
pub mod error;
pub mod logging;
pub mod time;

pub use error::{Error, Result};
