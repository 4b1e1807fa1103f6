//! Data access layer for the backend.
//!
//! Each repository owns the SQL for one entity family and exposes typed
//! operations to the service layer.

pub mod role_repository;
pub mod session_repository;
pub mod user_repository;
