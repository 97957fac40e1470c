//! # stackprobe-core
//!
//! Shared building blocks for the stackprobe acceptance checks.
//!
//! ## Pieces
//!
//! - [`ReadinessWaiter`]: poll a status source until it is ready or the
//!   budget runs out
//! - [`RetryPolicy`]: re-run an interactive action that failed only because
//!   the page was not ready for input
//! - [`StackConfig`]: file-backed settings with working defaults
//! - [`StackError`]: the one error type, with the transient/permanent split

pub mod config;
mod error;
pub mod best_effort;
pub mod retry;
mod types;
pub mod wait;

pub use config::{
    BrowserConfig, CloudConfig, DashboardConfig, LoginLocators, SectionConfig, StackConfig,
    WaitConfig, WizardLocators,
};
pub use error::{Result, StackError};
pub use retry::RetryPolicy;
pub use types::*;
pub use wait::{Readiness, ReadinessWaiter, WaitPolicy};
