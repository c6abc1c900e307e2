//! Centralized error handling for the logo resolver
//!
//! Every layer has its own error enum and converts into [`AppError`] at the
//! service boundary. Provider and storage failures are recoverable by design of
//! the resolution flow, so most of them never reach a caller: they are logged,
//! collected, or treated as a cache miss.
//!
//! # Error Categories
//!
//! - **Provider Errors**: a single provider attempt failed (always soft)
//! - **Storage Errors**: key-value or blob backend failures
//! - **Validation Errors**: malformed resolution requests
//! - **Not Found / Rate Limited**: the two user-visible failure outcomes
//!
//! # Usage
//!
//! ```rust
//! use logo_resolver::errors::{AppError, AppResult};
//!
//! fn check_size(size: u32) -> AppResult<u32> {
//!     if size == 0 {
//!         return Err(AppError::validation("size must be positive"));
//!     }
//!     Ok(size)
//! }
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for store adapter Results
pub type StorageResult<T> = Result<T, StorageError>;
