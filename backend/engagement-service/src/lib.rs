pub mod config;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod repository;
pub mod services;

pub use config::Config;
pub use error::{ServiceError, ServiceResult};
pub use repository::{ContentSeed, MemoryBackend};
pub use services::{EngagementService, FanoutConfig, Stores};
