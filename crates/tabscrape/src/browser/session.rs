use fantoccini::elements::Element;
use fantoccini::{Client, ClientBuilder};
use serde_json::json;

use super::driver::{BrowserError, Driver};
use super::locator::Locator;

pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:4444";

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub webdriver_url: String,
    pub headless: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            webdriver_url: DEFAULT_WEBDRIVER_URL.to_string(),
            headless: false,
        }
    }
}

/// A live WebDriver session. Call [`BrowserSession::close`] when done; the
/// browser process outlives a dropped session.
pub struct BrowserSession {
    client: Client,
}

impl BrowserSession {
    pub async fn connect(config: &SessionConfig) -> Result<Self, BrowserError> {
        let mut capabilities = serde_json::Map::new();
        if config.headless {
            capabilities.insert(
                "goog:chromeOptions".to_string(),
                json!({ "args": ["--headless=new", "--disable-gpu"] }),
            );
            capabilities.insert(
                "moz:firefoxOptions".to_string(),
                json!({ "args": ["-headless"] }),
            );
        }

        log::info!("Connecting to WebDriver at {}...", config.webdriver_url);
        let client = ClientBuilder::native()
            .capabilities(capabilities)
            .connect(&config.webdriver_url)
            .await
            .inspect_err(|e| log::error!("WebDriver session error: {e:?}"))?;

        Ok(Self { client })
    }

    pub async fn close(self) -> Result<(), BrowserError> {
        log::info!("Closing browser session");
        self.client.close().await?;
        Ok(())
    }

    async fn first(&self, locator: &Locator) -> Result<Element, BrowserError> {
        self.client
            .find_all(locator.as_webdriver())
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BrowserError::ElementNotFound(locator.to_string()))
    }

    async fn first_opt(&self, locator: &Locator) -> Result<Option<Element>, BrowserError> {
        Ok(self
            .client
            .find_all(locator.as_webdriver())
            .await?
            .into_iter()
            .next())
    }
}

impl Driver for BrowserSession {
    async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        log::debug!("Navigating to {}", url);
        Ok(self.client.goto(url).await?)
    }

    async fn find_count(&self, locator: &Locator) -> Result<usize, BrowserError> {
        Ok(self.client.find_all(locator.as_webdriver()).await?.len())
    }

    async fn click(&self, locator: &Locator) -> Result<(), BrowserError> {
        Ok(self.first(locator).await?.click().await?)
    }

    async fn clear(&self, locator: &Locator) -> Result<(), BrowserError> {
        Ok(self.first(locator).await?.clear().await?)
    }

    async fn send_keys(&self, locator: &Locator, text: &str) -> Result<(), BrowserError> {
        Ok(self.first(locator).await?.send_keys(text).await?)
    }

    async fn text(&self, locator: &Locator) -> Result<Option<String>, BrowserError> {
        match self.first_opt(locator).await? {
            Some(element) => Ok(Some(element.text().await?)),
            None => Ok(None),
        }
    }

    async fn inner_html(&self, locator: &Locator) -> Result<Option<String>, BrowserError> {
        match self.first_opt(locator).await? {
            Some(element) => Ok(Some(element.html(true).await?)),
            None => Ok(None),
        }
    }

    async fn attributes(
        &self,
        locator: &Locator,
        name: &str,
    ) -> Result<Vec<Option<String>>, BrowserError> {
        let elements = self.client.find_all(locator.as_webdriver()).await?;
        let mut values = Vec::with_capacity(elements.len());
        for element in elements {
            values.push(element.attr(name).await?);
        }
        Ok(values)
    }

    async fn enter_frame(&self, locator: &Locator) -> Result<(), BrowserError> {
        Ok(self.first(locator).await?.enter_frame().await?)
    }

    async fn leave_frame(&self) -> Result<(), BrowserError> {
        Ok(self.client.enter_frame(None).await?)
    }
}
