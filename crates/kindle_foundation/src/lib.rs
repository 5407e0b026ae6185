//! Core values, types, and errors for Kindle.
//!
//! This crate provides:
//! - [`Value`] - The value bound to every fact
//! - [`Type`] - Type descriptors used in runtime type errors
//! - [`Error`] - Rich error types with context

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod types;
pub mod value;

pub use error::{Error, ErrorContext, ErrorKind, StoreFailure};
pub use types::Type;
pub use value::{FactList, FactMap, Value};

/// Result type for Kindle operations.
pub type Result<T> = std::result::Result<T, Error>;
