//! modelrepo-core: Core types shared by the modelrepo crates
//!
//! This crate provides the vocabulary of the model repository:
//! - Model keys and name validation
//! - Version tags, version requests and "latest" resolution
//! - Configuration types
//! - Error handling

pub mod config;
pub mod error;
pub mod model;
pub mod version;

pub use config::*;
pub use error::*;
pub use model::*;
pub use version::*;
