#![deny(missing_docs)]

//! Core library for citecheck: grounding generated answers in their source documents.

/// Environment-driven configuration management.
pub mod config;
/// Pipeline events and sinks.
pub mod events;
/// Text extraction and coordinate search collaborator.
pub mod extraction;
/// Structured logging and tracing setup.
pub mod logging;
/// Pipeline metrics helpers.
pub mod metrics;
/// Chunking, retrieval and citation verification.
pub mod processing;
/// Page and chunk storage collaborator.
pub mod store;
