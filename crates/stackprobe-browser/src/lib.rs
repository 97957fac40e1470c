//! Browser automation for the Horizon dashboard check
//!
//! This crate drives Chrome/Chromium over the DevTools protocol to log in
//! to the OpenStack dashboard and launch an instance through its wizard.
//!
//! # Example
//!
//! ```no_run
//! use stackprobe_browser::{BrowserSession, DashboardCheck, DashboardLogin, LaunchRequest};
//! use stackprobe_core::StackConfig;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = StackConfig::default();
//!     let session = BrowserSession::launch(&config.browser).await?;
//!
//!     let login = DashboardLogin {
//!         username: "demo".to_string(),
//!         password: "demo".to_string(),
//!         domain: "admin_domain".to_string(),
//!     };
//!     let request = LaunchRequest::new("test-vm").select("flavor", "m1.small");
//!
//!     let report = DashboardCheck::new(&session, &config, "10.5.0.20")
//!         .run_and_release(&login, &request)
//!         .await?;
//!     println!("{:?}", report);
//!     Ok(())
//! }
//! ```
//!
//! # Requirements
//!
//! - Chrome or Chromium browser installed, or its path set in
//!   `browser.executable`
//!
//! # Architecture
//!
//! - [`page`]: the page/element interfaces the check is written against
//! - [`browser`]: DevTools-backed [`BrowserSession`]
//! - [`navigation`]: page change and element presence waits
//! - [`screenshot`]: diagnostic capture on failure
//! - [`verification`]: post-login assertions
//! - [`dashboard`]: the check itself
//! - [`mock`]: scripted page for tests

pub mod browser;
pub mod dashboard;
pub mod element;
pub mod error;
pub mod mock;
pub mod navigation;
pub mod page;
pub mod screenshot;
pub mod verification;

// Re-export commonly used types
pub use browser::BrowserSession;
pub use dashboard::{DashboardCheck, DashboardLogin, DashboardReport, LaunchRequest, SectionChoice};
pub use error::{classify_interaction_error, Result};
pub use mock::{MockPage, PageAction};
pub use navigation::{wait_for_element, wait_for_page_change};
pub use page::{ElementHandle, PageDriver};
pub use screenshot::capture_diagnostic;
pub use verification::assert_title;
