//! Package metadata resolution against remote registries
//!
//! This module fetches the published metadata of a package from a NuGet V3
//! registry, picks the single best-matching version, and augments it with the
//! owners reported by the registry's search service.
//!
//! # Modules
//!
//! - [`source`]: registry endpoint identity ([`source::RegistrySource`])
//! - [`feed`]: traits for opening a feed and querying it
//! - [`nuget`]: NuGet V3 implementation of those traits
//! - [`connection`]: per-source feed cache with create-once semantics
//! - [`select`]: version selection policy (exact match or absolute latest)
//! - [`resolver`]: ties the above together into one resolution call
//! - [`types`]: candidate and resolved metadata types
//! - [`error`]: error types for connection and fetch failures

pub mod connection;
pub mod error;
pub mod feed;
pub mod nuget;
pub mod resolver;
pub mod select;
pub mod source;
pub mod types;
