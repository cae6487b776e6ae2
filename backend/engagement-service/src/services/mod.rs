/// Business logic layer for engagement-service
pub mod engagement;
pub mod fanout;

pub use engagement::{build_threads, EngagementService, Stores};
pub use fanout::{excerpt, FanoutConfig, FanoutEvent, NotificationFanout};
