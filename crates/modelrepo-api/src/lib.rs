//! modelrepo-api: REST API server for modelrepo
//!
//! This crate exposes the model repository over HTTP:
//! - Version listing
//! - Availability checks
//! - Model loading (fetching and promoting artifacts)

pub mod rest;

pub use rest::{create_router, SharedRepository};
