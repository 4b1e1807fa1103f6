//! Service-layer collaborators consumed by the auth subsystem.

pub mod audit_service;
