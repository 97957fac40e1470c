//! DevTools-backed element handle

use crate::error::{classify_interaction_error, Result};
use crate::page::ElementHandle;
use async_trait::async_trait;
use headless_chrome::{Element, Tab};
use stackprobe_core::StackError;
use std::sync::Arc;
use tracing::debug;

/// Element on the page a [`crate::BrowserSession`] currently shows
///
/// Only the DOM node id is kept. Every action resolves the id against the
/// live document first, so a node from an earlier page load fails with
/// [`StackError::StaleElement`] rather than hitting whatever replaced it.
pub struct ChromeElement {
    tab: Arc<Tab>,
    node_id: u32,
    description: String,
}

impl ChromeElement {
    pub(crate) fn new(tab: Arc<Tab>, node_id: u32, description: String) -> Self {
        Self {
            tab,
            node_id,
            description,
        }
    }

    fn resolve(&self) -> Result<Element<'_>> {
        Element::new(&self.tab, self.node_id).map_err(|e| {
            StackError::StaleElement(format!("{}: {}", self.description, e))
        })
    }
}

#[async_trait]
impl ElementHandle for ChromeElement {
    async fn click(&self) -> Result<()> {
        debug!("Clicking {}", self.description);
        let element = self.resolve()?;
        element
            .click()
            .map_err(|e| classify_interaction_error(&self.description, e))?;
        Ok(())
    }

    async fn send_text(&self, text: &str) -> Result<()> {
        debug!("Typing into {}", self.description);
        let element = self.resolve()?;
        element
            .type_into(text)
            .map_err(|e| classify_interaction_error(&self.description, e))?;
        Ok(())
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>> {
        let element = self.resolve()?;
        element.get_attribute_value(name).map_err(|e| {
            StackError::Browser(format!(
                "Failed to read attribute {} of {}: {}",
                name, self.description, e
            ))
        })
    }

    fn describe(&self) -> String {
        self.description.clone()
    }
}
