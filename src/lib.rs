pub mod config;
pub mod cost;
pub mod db;
pub mod eligibility;
pub mod engine;
pub mod error;
pub mod fidelity;
pub mod gains;
pub mod hierarchy;
pub mod logging;
pub mod models;
pub mod normalize;
pub mod quality;
pub mod rate_limiter;
pub mod report;
pub mod tree;

pub use config::EngineConfig;
pub use engine::{Engine, EngineReport};
pub use error::EngineError;
pub use models::{RawRecord, ReportPeriod, Scope, Snapshot};
