//! A minimal configurable HTTP load generator.
//!
//! A run resolves a [`RunConfig`] from the environment, derives a [`Schedule`], and then either
//! starts requests at a constant arrival rate across a bounded worker pool or paces them one at a
//! time over the run window. Every response is classified into a status family and the run ends
//! with a threshold verdict.
//!
//! # Example
//! ```no_run
//! use volley::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), VolleyError> {
//!     let report = Scenario::new(RunConfig::from_env()).await?;
//!     println!("{report}");
//!     Ok(())
//! }
//! ```
pub mod classifier;
pub mod context;
pub mod counters;
pub mod error;
pub mod executor;
pub(crate) mod pace;
pub(crate) mod pool;
pub mod scenario;

pub use error::VolleyError;
pub use scenario::Scenario;
pub use volley_core as core;

pub mod prelude {
    pub use crate::error::VolleyError;
    pub use crate::scenario::Scenario;
    pub use volley_core::{
        CounterSink, Mode, RunConfig, RunReport, Schedule, StatusFamily, ThresholdResult,
        TransportFailurePolicy,
    };
}
