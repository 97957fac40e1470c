//! Diagnostic screenshot capture

use crate::error::Result;
use crate::page::PageDriver;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Save what the browser shows to `path`
///
/// Missing parent directories are created. An existing file is
/// overwritten, so only the latest failure is kept.
///
/// # Example
/// ```no_run
/// use stackprobe_browser::{capture_diagnostic, BrowserSession};
/// use stackprobe_core::BrowserConfig;
/// use std::path::Path;
///
/// #[tokio::main]
/// async fn main() {
///     let session = BrowserSession::launch(&BrowserConfig::default()).await.unwrap();
///     capture_diagnostic(&session, Path::new("/tmp/screenshot.png")).await.unwrap();
/// }
/// ```
#[instrument(skip(page, path), fields(path = %path.display()))]
pub async fn capture_diagnostic(page: &dyn PageDriver, path: &Path) -> Result<PathBuf> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    page.screenshot(path).await?;

    info!("Saved diagnostic screenshot to {}", path.display());
    Ok(path.to_path_buf())
}
