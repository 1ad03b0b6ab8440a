//! # Artifact Common Library
//!
//! Shared code for the artifact explorer service:
//! - Error taxonomy (data access, validation, query execution)
//! - Configuration loading and root folder resolution
//! - Schema model for the three artifact tables
//! - Database initialization and schema synchronization

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
