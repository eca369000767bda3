//! Core crate for the lending platform's application review pipeline.
//!
//! The interesting machinery lives under [`workflows::loan`]: a status state
//! machine with terminal guards, a document verification ledger that locks
//! evidentiary documents to the application that verified them, an append-only
//! audit trail, and audience-scoped timeline projections derived from it.
//! Storage, identity resolution, and the document profile store are consumed
//! through ports so the HTTP layer and tests can supply their own adapters.

pub mod config;
pub mod telemetry;
pub mod workflows;
