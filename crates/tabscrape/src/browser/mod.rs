mod driver;
mod locator;
mod lookup;
mod poll;
mod session;
pub mod types;

pub use driver::{BrowserError, Driver};
pub use locator::Locator;
pub use lookup::{BatchOptions, FormLookup, LookupError, LookupState};
pub use poll::{PollError, poll_until};
pub use session::{BrowserSession, DEFAULT_WEBDRIVER_URL, SessionConfig};
