//! HTTP handlers for collection CRUD and manifests.

pub mod collection;
pub mod manifest;
