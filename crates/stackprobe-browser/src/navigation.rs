//! Page transition and element presence waits

use crate::error::Result;
use crate::page::{ElementHandle, PageDriver};
use stackprobe_core::{Locator, Readiness, ReadinessWaiter, StackError};
use url::Url;

/// Path component of `location`, or the whole string if it is not a URL
pub fn url_path(location: &str) -> String {
    Url::parse(location)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| location.to_string())
}

/// Wait until the page path differs from the one of `old_url`
///
/// Query string and fragment changes do not count as a new page.
/// Returns the new location.
pub async fn wait_for_page_change(
    page: &dyn PageDriver,
    old_url: &str,
    waiter: &ReadinessWaiter,
) -> Result<String> {
    let old_path = url_path(old_url);
    let what = format!("page change from {}", old_path);
    let old_path = old_path.as_str();

    waiter
        .until(&what, move || async move {
            let current = page.current_url().await?;
            if url_path(&current) == old_path {
                Ok(Readiness::NotReady(current))
            } else {
                Ok(Readiness::Ready(current))
            }
        })
        .await
}

/// Wait until `locator` matches at least one element
///
/// Running out of polls is reported as [`StackError::ElementNotFound`].
pub async fn wait_for_elements(
    page: &dyn PageDriver,
    locator: &Locator,
    waiter: &ReadinessWaiter,
) -> Result<Vec<Box<dyn ElementHandle>>> {
    let result = waiter
        .until(&format!("element {}", locator), move || async move {
            let found = page.find_elements(locator).await?;
            if found.is_empty() {
                Ok(Readiness::NotReady("no match".to_string()))
            } else {
                Ok(Readiness::Ready(found))
            }
        })
        .await;

    match result {
        Err(StackError::Timeout { .. }) => Err(StackError::ElementNotFound {
            locator: locator.to_string(),
        }),
        other => other,
    }
}

/// First element matching `locator`, waiting for it to appear
pub async fn wait_for_element(
    page: &dyn PageDriver,
    locator: &Locator,
    waiter: &ReadinessWaiter,
) -> Result<Box<dyn ElementHandle>> {
    wait_for_elements(page, locator, waiter)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| StackError::ElementNotFound {
            locator: locator.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockPage;
    use stackprobe_core::WaitPolicy;
    use std::time::Duration;

    fn waiter(polls: u32) -> ReadinessWaiter {
        ReadinessWaiter::new(WaitPolicy::fixed(Duration::from_millis(1), polls))
    }

    #[test]
    fn test_url_path_ignores_query_and_fragment() {
        assert_eq!(
            url_path("http://10.5.0.20/horizon/auth/login/?next=/horizon/#top"),
            "/horizon/auth/login/"
        );
        assert_eq!(url_path("not a url"), "not a url");
    }

    #[tokio::test]
    async fn test_page_change_after_redirect() {
        let page = MockPage::new().with_urls(&[
            "http://h/horizon/auth/login/",
            "http://h/horizon/auth/login/?next=x",
            "http://h/horizon/project/",
        ]);

        let now = wait_for_page_change(&page, "http://h/horizon/auth/login/", &waiter(5))
            .await
            .unwrap();
        assert_eq!(now, "http://h/horizon/project/");
        assert_eq!(page.url_reads(), 3);
    }

    #[tokio::test]
    async fn test_page_never_changes() {
        let page = MockPage::new().with_urls(&["http://h/horizon/auth/login/"]);

        let err = wait_for_page_change(&page, "http://h/horizon/auth/login/", &waiter(3))
            .await
            .unwrap_err();
        assert!(matches!(err, StackError::Timeout { polls: 3, .. }));
        assert_eq!(page.url_reads(), 3);
    }

    #[tokio::test]
    async fn test_missing_element_is_not_found() {
        let page = MockPage::new();
        let err = wait_for_element(&page, &Locator::id("loginBtn"), &waiter(2))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, StackError::ElementNotFound { ref locator } if locator == "id=loginBtn"));
    }
}
