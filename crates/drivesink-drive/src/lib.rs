//! drivesink drive - remote tree provider adapter
//!
//! Implements the `IRemoteTreeProvider` port against a Google Drive-style
//! REST API: recursive folder listing (normalized to snapshot entries at
//! this boundary) and content download.
//!
//! ## Key Components
//!
//! - [`DriveClient`] - authenticated HTTP client with typed error mapping
//!   and client-side rate limiting
//! - [`DriveTreeProvider`] - the port implementation walking the watched
//!   folder tree
//!
//! Authentication is a bearer token taken from configuration; obtaining
//! and refreshing that token is outside this crate's scope.

pub mod client;
pub mod provider;

pub use client::DriveClient;
pub use provider::DriveTreeProvider;
