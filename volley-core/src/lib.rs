//! Core types for the volley HTTP load generator.
//!
//! Everything in this crate is pure: resolving a [`RunConfig`] from environment values, deriving a
//! [`Schedule`] from it, classifying status codes, and evaluating [`Thresholds`] over a finished
//! run. The engine that actually issues requests lives in the `volley` crate.
mod config;
mod constants;
mod data;
mod report;
mod schedule;
mod threshold;

pub use config::*;
pub use constants::*;
pub use data::*;
pub use report::*;
pub use schedule::*;
pub use threshold::*;
