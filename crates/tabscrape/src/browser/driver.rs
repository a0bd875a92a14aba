use fantoccini::error::{CmdError, NewSessionError};

use super::locator::Locator;

#[derive(Debug, thiserror::Error)]
pub enum BrowserError {
    #[error("Failed to start WebDriver session: {0}")]
    Session(#[from] NewSessionError),
    #[error("WebDriver command failed: {0}")]
    Command(#[from] CmdError),
    #[error("No element matched {0}")]
    ElementNotFound(String),
}

/// The browser operations a form lookup needs. Element operations act on the
/// first element matching the locator.
#[allow(async_fn_in_trait)]
pub trait Driver {
    async fn goto(&self, url: &str) -> Result<(), BrowserError>;

    async fn find_count(&self, locator: &Locator) -> Result<usize, BrowserError>;

    async fn click(&self, locator: &Locator) -> Result<(), BrowserError>;

    async fn clear(&self, locator: &Locator) -> Result<(), BrowserError>;

    async fn send_keys(&self, locator: &Locator, text: &str) -> Result<(), BrowserError>;

    /// Rendered text of the element, `None` when it is not in the DOM yet.
    async fn text(&self, locator: &Locator) -> Result<Option<String>, BrowserError>;

    async fn inner_html(&self, locator: &Locator) -> Result<Option<String>, BrowserError>;

    async fn attributes(
        &self,
        locator: &Locator,
        name: &str,
    ) -> Result<Vec<Option<String>>, BrowserError>;

    async fn enter_frame(&self, locator: &Locator) -> Result<(), BrowserError>;

    async fn leave_frame(&self) -> Result<(), BrowserError>;
}
