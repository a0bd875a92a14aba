use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Locator {
    Css(String),
    #[serde(rename = "xpath")]
    XPath(String),
    Id(String),
}

impl Locator {
    pub fn as_webdriver(&self) -> fantoccini::Locator<'_> {
        match self {
            Locator::Css(css) => fantoccini::Locator::Css(css),
            Locator::XPath(xpath) => fantoccini::Locator::XPath(xpath),
            Locator::Id(id) => fantoccini::Locator::Id(id),
        }
    }
}

impl Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Locator::Css(css) => write!(f, "css `{}`", css),
            Locator::XPath(xpath) => write!(f, "xpath `{}`", xpath),
            Locator::Id(id) => write!(f, "id `{}`", id),
        }
    }
}
