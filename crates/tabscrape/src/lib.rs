pub mod browser;
pub mod scraper;
pub mod stats;
pub mod table;
pub mod utils;

pub use self::scraper::{ScraperError, WebScraper};
