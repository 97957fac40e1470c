//! Narrow page and element interfaces
//!
//! The dashboard check talks to the browser only through these two traits,
//! so it can run against [`crate::mock::MockPage`] in tests.

use async_trait::async_trait;
use stackprobe_core::{Locator, Result};
use std::path::Path;

/// An interactive control on the current page
///
/// Valid for a single page load. Using it after the page changed fails
/// with `StackError::StaleElement`.
#[async_trait]
pub trait ElementHandle: Send + Sync {
    async fn click(&self) -> Result<()>;

    /// Type `text` into the control
    async fn send_text(&self, text: &str) -> Result<()>;

    async fn attribute(&self, name: &str) -> Result<Option<String>>;

    /// Short description for logs and errors
    fn describe(&self) -> String;
}

/// A browser tab
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate to `url` and wait for the load to finish
    async fn open(&self, url: &str) -> Result<()>;

    async fn current_url(&self) -> Result<String>;

    async fn title(&self) -> Result<String>;

    /// All elements matching `locator`, empty when nothing matches
    async fn find_elements(&self, locator: &Locator) -> Result<Vec<Box<dyn ElementHandle>>>;

    /// Write a PNG of the current viewport to `path`
    async fn screenshot(&self, path: &Path) -> Result<()>;

    /// Release the browser
    async fn close(&self) -> Result<()>;
}
