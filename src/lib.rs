pub mod analyzers;
pub mod config;
pub mod error;
pub mod infra;
pub mod models;
pub mod output;
pub mod services;
pub mod stats;

pub use analyzers::AnalyticsService;
pub use config::AnalyticsConfig;
pub use error::{AnalyticsError, Result};
