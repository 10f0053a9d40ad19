//! ESCO Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, logging and error handling for the ESCO ingest workspace.
//!
//! # Overview
//!
//! - **Error Handling**: [`CommonError`] and the [`Result`] alias
//! - **Logging**: tracing subscriber setup shared by every binary
//! - **Types**: the taxonomy [`Version`] triple
//!
//! # Example
//!
//! ```no_run
//! use esco_common::{Result, Version};
//!
//! fn newest(text: &str) -> Result<Option<Version>> {
//!     Ok(Version::find_all(text).into_iter().max())
//! }
//! ```

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{CommonError, Result};
pub use types::Version;
