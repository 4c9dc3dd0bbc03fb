//! Browser capability used by the acquisition run.
//!
//! The run only needs a handful of operations: navigate, find elements
//! (optionally inside another element), click, read text/attributes, and wait
//! for visibility. `WebDriver` implements them over the W3C WebDriver
//! protocol; tests substitute an in-memory page.

pub mod webdriver;

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

pub use webdriver::WebDriver;

/// Default visibility wait for `click_when_visible`.
pub const DEFAULT_VISIBLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Polling interval inside `wait_until_visible`.
const VISIBILITY_POLL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    Css(String),
    XPath(String),
    Id(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    pub fn xpath(expr: impl Into<String>) -> Self {
        Self::XPath(expr.into())
    }

    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css(s) => write!(f, "css:{s}"),
            Self::XPath(s) => write!(f, "xpath:{s}"),
            Self::Id(s) => write!(f, "id:{s}"),
        }
    }
}

/// Opaque handle to an element on the current page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Element(pub String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserError {
    /// Element never became visible within the timeout.
    ElementNotVisible { locator: String, timeout_secs: u64 },
    /// Nothing matched the locator.
    ElementNotFound(String),
    /// Page load / navigation failed.
    Navigation(String),
    /// WebDriver session could not be created or was lost.
    Session(String),
    /// Unexpected WebDriver response.
    Protocol(String),
}

impl fmt::Display for BrowserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ElementNotVisible { locator, timeout_secs } => {
                write!(f, "element {locator} not visible after {timeout_secs}s")
            }
            Self::ElementNotFound(locator) => write!(f, "no element matches {locator}"),
            Self::Navigation(msg) => write!(f, "navigation failed: {msg}"),
            Self::Session(msg) => write!(f, "browser session error: {msg}"),
            Self::Protocol(msg) => write!(f, "webdriver protocol error: {msg}"),
        }
    }
}

impl std::error::Error for BrowserError {}

pub trait Browser {
    /// Where downloads land. Applies to the current and any later session.
    fn set_download_directory(&mut self, dir: &Path) -> Result<(), BrowserError>;

    /// Navigate to `url`, starting a session if none is open.
    fn open_site(&mut self, url: &str) -> Result<(), BrowserError>;

    /// All elements matching `locator`, searched inside `scope` when given.
    fn find_elements(
        &mut self,
        locator: &Locator,
        scope: Option<&Element>,
    ) -> Result<Vec<Element>, BrowserError>;

    fn is_displayed(&mut self, element: &Element) -> Result<bool, BrowserError>;

    fn click_element(&mut self, element: &Element) -> Result<(), BrowserError>;

    fn text(&mut self, element: &Element) -> Result<String, BrowserError>;

    fn attribute(&mut self, element: &Element, name: &str) -> Result<Option<String>, BrowserError>;

    /// Tear down every session. Must not fail; errors are logged.
    fn close_all(&mut self);

    fn find_element(&mut self, locator: &Locator, scope: Option<&Element>) -> Result<Element, BrowserError> {
        self.find_elements(locator, scope)?
            .into_iter()
            .next()
            .ok_or_else(|| BrowserError::ElementNotFound(locator.to_string()))
    }

    fn click(&mut self, locator: &Locator) -> Result<(), BrowserError> {
        let element = self.find_element(locator, None)?;
        self.click_element(&element)
    }

    /// First displayed match for `locator`, polling until `timeout`.
    fn wait_until_visible(&mut self, locator: &Locator, timeout: Duration) -> Result<Element, BrowserError> {
        let start = Instant::now();
        loop {
            for element in self.find_elements(locator, None)? {
                if self.is_displayed(&element)? {
                    return Ok(element);
                }
            }
            if start.elapsed() >= timeout {
                return Err(BrowserError::ElementNotVisible {
                    locator: locator.to_string(),
                    timeout_secs: timeout.as_secs(),
                });
            }
            thread::sleep(VISIBILITY_POLL.min(timeout.saturating_sub(start.elapsed())));
        }
    }

    fn click_when_visible(&mut self, locator: &Locator) -> Result<(), BrowserError> {
        let element = self.wait_until_visible(locator, DEFAULT_VISIBLE_TIMEOUT)?;
        self.click_element(&element)
    }

    /// Text of every element matching `locator` inside `scope`, in page order.
    fn texts(&mut self, locator: &Locator, scope: Option<&Element>) -> Result<Vec<String>, BrowserError> {
        let elements = self.find_elements(locator, scope)?;
        elements.iter().map(|e| self.text(e)).collect()
    }
}

/// Exclusive use of a browser for one run. Dropping the guard closes every
/// session, on success, error or panic alike.
pub struct Teardown<'a, B: Browser + ?Sized> {
    browser: &'a mut B,
}

impl<'a, B: Browser + ?Sized> Teardown<'a, B> {
    pub fn new(browser: &'a mut B) -> Self {
        Self { browser }
    }
}

impl<B: Browser + ?Sized> Deref for Teardown<'_, B> {
    type Target = B;

    fn deref(&self) -> &B {
        self.browser
    }
}

impl<B: Browser + ?Sized> DerefMut for Teardown<'_, B> {
    fn deref_mut(&mut self) -> &mut B {
        self.browser
    }
}

impl<B: Browser + ?Sized> Drop for Teardown<'_, B> {
    fn drop(&mut self) {
        log::debug!("closing browser sessions");
        self.browser.close_all();
    }
}

/// Quote `s` as an XPath string literal, falling back to `concat()` when it
/// holds both quote kinds.
pub fn xpath_literal(s: &str) -> String {
    if !s.contains('\'') {
        format!("'{s}'")
    } else if !s.contains('"') {
        format!("\"{s}\"")
    } else {
        let parts: Vec<String> = s.split('\'').map(|p| format!("'{p}'")).collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xpath_literals() {
        assert_eq!(xpath_literal("NASA"), "'NASA'");
        assert_eq!(xpath_literal("Farmer's Aid"), "\"Farmer's Aid\"");
        assert_eq!(xpath_literal(r#"a'b"c"#), r#"concat('a', "'", 'b"c')"#);
    }

    #[test]
    fn locator_display() {
        assert_eq!(Locator::id("agency-tiles-container").to_string(), "id:agency-tiles-container");
        assert_eq!(Locator::css("tbody > tr").to_string(), "css:tbody > tr");
    }
}
