//! Core traits and types for ftpgate back-ends and control planes.

pub mod auth;
pub mod controlplane;
pub mod path;
pub mod storage;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
