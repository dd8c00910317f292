//! Concrete collaborators.
//!
//! - [`dataset::Dataset`]: survey data loaded from a JSON file.
//! - [`platform::PlatformClient`]: survey data fetched from the platform REST API.
//! - [`store`]: snapshot stores backed by memory, the filesystem or S3.

pub mod dataset;
pub mod platform;
pub mod store;
