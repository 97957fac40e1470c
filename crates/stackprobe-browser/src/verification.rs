//! Page assertions

use crate::error::Result;
use crate::page::PageDriver;
use stackprobe_core::StackError;
use tracing::{debug, info};

/// Check the page title against the one a logged-in session lands on
///
/// A mismatch usually means the login form was rejected and the login page
/// was shown again.
pub async fn assert_title(page: &dyn PageDriver, expected: &str) -> Result<()> {
    let actual = page.title().await?;
    debug!("Page title: {}", actual);

    if actual != expected {
        return Err(StackError::Assertion(format!(
            "{} != {} login probably failed",
            actual, expected
        )));
    }

    info!("Title verified: {}", expected);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockPage;

    #[tokio::test]
    async fn test_title_matches() {
        let page = MockPage::new().with_title("Projects - OpenStack Dashboard");
        assert_title(&page, "Projects - OpenStack Dashboard").await.unwrap();
    }

    #[tokio::test]
    async fn test_title_mismatch_message() {
        let page = MockPage::new().with_title("Login - OpenStack Dashboard");
        let err = assert_title(&page, "Projects - OpenStack Dashboard")
            .await
            .unwrap_err();

        match err {
            StackError::Assertion(msg) => assert_eq!(
                msg,
                "Login - OpenStack Dashboard != Projects - OpenStack Dashboard login probably failed"
            ),
            other => panic!("expected assertion error, got {:?}", other),
        }
    }
}
