//! drivesink ingest - ingestion sink adapter
//!
//! Implements the `IIngestionSink` port against a Dify-style dataset API:
//! multipart document upload (`create-by-file`) with source metadata, and
//! document deletion. The API key and dataset id come from configuration.

pub mod client;

pub use client::IngestClient;
