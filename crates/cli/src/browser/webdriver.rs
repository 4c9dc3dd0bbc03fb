//! Minimal W3C WebDriver client (chromedriver, geckodriver, Selenium grid).
//!
//! Speaks the JSON wire protocol over `reqwest::blocking`. Every response is
//! `{"value": ...}`; errors carry `value.error` (a WebDriver error code) and
//! `value.message`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Method;
use serde_json::{json, Value};

use super::{Browser, BrowserError, Element, Locator};

/// W3C element reference key.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

const USER_AGENT: &str = concat!("itdash/", env!("CARGO_PKG_VERSION"));
const DEFAULT_TIMEOUT_SECS: u64 = 120;

pub struct WebDriver {
    http: reqwest::blocking::Client,
    base: url::Url,
    headless: bool,
    download_dir: Option<PathBuf>,
    session: Option<String>,
}

impl WebDriver {
    pub fn new(base_url: &str, headless: bool) -> Result<Self, BrowserError> {
        // Trailing slash so relative joins keep path prefixes like /wd/hub
        let normalized = format!("{}/", base_url.trim_end_matches('/'));
        let base = url::Url::parse(&normalized)
            .map_err(|e| BrowserError::Session(format!("invalid webdriver url '{base_url}': {e}")))?;

        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| BrowserError::Session(format!("cannot build HTTP client: {e}")))?;

        Ok(Self { http, base, headless, download_dir: None, session: None })
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session.as_deref()
    }

    fn endpoint(&self, path: &str) -> Result<url::Url, BrowserError> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| BrowserError::Protocol(format!("bad endpoint {path}: {e}")))
    }

    /// Send one command and unwrap `value`.
    fn command(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, BrowserError> {
        let url = self.endpoint(path)?;
        log::trace!("webdriver {} {}", method, url);

        let mut req = self.http.request(method, url);
        if let Some(body) = body {
            req = req.json(&body);
        }

        let resp = req
            .send()
            .map_err(|e| BrowserError::Session(format!("webdriver unreachable: {e}")))?;
        let status = resp.status().as_u16();
        let payload: Value = resp
            .json()
            .map_err(|e| BrowserError::Protocol(format!("non-JSON response ({status}): {e}")))?;

        let value = payload.get("value").cloned().unwrap_or(Value::Null);
        if status >= 400 {
            return Err(classify_error(&value, status));
        }
        Ok(value)
    }

    fn session_path(&self, suffix: &str) -> Result<String, BrowserError> {
        let id = self
            .session
            .as_deref()
            .ok_or_else(|| BrowserError::Session("no open session".to_string()))?;
        Ok(format!("session/{id}/{suffix}"))
    }

    fn ensure_session(&mut self) -> Result<(), BrowserError> {
        if self.session.is_some() {
            return Ok(());
        }

        let value = self.command(Method::POST, "session", Some(self.capabilities()))?;
        let id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| BrowserError::Session("new session response lacks sessionId".to_string()))?;
        log::info!("webdriver session {id} started");
        self.session = Some(id.to_string());

        if let Some(dir) = self.download_dir.clone() {
            self.apply_download_behavior(&dir);
        }
        Ok(())
    }

    fn capabilities(&self) -> Value {
        let mut args = vec!["--disable-gpu", "--window-size=1920,1080"];
        if self.headless {
            args.push("--headless=new");
        }

        let mut chrome = json!({ "args": args });
        if let Some(dir) = &self.download_dir {
            chrome["prefs"] = json!({
                "download.default_directory": dir.to_string_lossy(),
                "download.prompt_for_download": false,
                "plugins.always_open_pdf_externally": true,
            });
        }

        json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": chrome,
                }
            }
        })
    }

    /// Headless Chrome ignores the download prefs; the CDP command covers it.
    /// Other drivers reject the endpoint, which is harmless.
    fn apply_download_behavior(&self, dir: &Path) {
        let body = json!({
            "cmd": "Page.setDownloadBehavior",
            "params": { "behavior": "allow", "downloadPath": dir.to_string_lossy() },
        });
        let result = self
            .session_path("goog/cdp/execute")
            .and_then(|path| self.command(Method::POST, &path, Some(body)));
        if let Err(e) = result {
            log::debug!("download behavior not applied: {e}");
        }
    }
}

impl Browser for WebDriver {
    fn set_download_directory(&mut self, dir: &Path) -> Result<(), BrowserError> {
        self.download_dir = Some(dir.to_path_buf());
        if self.session.is_some() {
            self.apply_download_behavior(dir);
        }
        Ok(())
    }

    fn open_site(&mut self, url: &str) -> Result<(), BrowserError> {
        self.ensure_session()?;
        let path = self.session_path("url")?;
        self.command(Method::POST, &path, Some(json!({ "url": url })))
            .map_err(|e| BrowserError::Navigation(format!("{url}: {e}")))?;
        log::debug!("opened {url}");
        Ok(())
    }

    fn find_elements(
        &mut self,
        locator: &Locator,
        scope: Option<&Element>,
    ) -> Result<Vec<Element>, BrowserError> {
        let path = match scope {
            Some(Element(id)) => self.session_path(&format!("element/{id}/elements"))?,
            None => self.session_path("elements")?,
        };
        let (using, value) = strategy(locator);
        let found = self.command(Method::POST, &path, Some(json!({ "using": using, "value": value })))?;

        let items = found
            .as_array()
            .ok_or_else(|| BrowserError::Protocol("find elements did not return an array".to_string()))?;
        items
            .iter()
            .map(|item| {
                item.get(ELEMENT_KEY)
                    .and_then(Value::as_str)
                    .map(|id| Element(id.to_string()))
                    .ok_or_else(|| BrowserError::Protocol(format!("malformed element reference: {item}")))
            })
            .collect()
    }

    fn is_displayed(&mut self, element: &Element) -> Result<bool, BrowserError> {
        let path = self.session_path(&format!("element/{}/displayed", element.0))?;
        match self.command(Method::GET, &path, None) {
            Ok(value) => Ok(value.as_bool().unwrap_or(false)),
            // Element detached between lookup and check
            Err(BrowserError::ElementNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn click_element(&mut self, element: &Element) -> Result<(), BrowserError> {
        let path = self.session_path(&format!("element/{}/click", element.0))?;
        self.command(Method::POST, &path, Some(json!({})))?;
        Ok(())
    }

    fn text(&mut self, element: &Element) -> Result<String, BrowserError> {
        let path = self.session_path(&format!("element/{}/text", element.0))?;
        let value = self.command(Method::GET, &path, None)?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    fn attribute(&mut self, element: &Element, name: &str) -> Result<Option<String>, BrowserError> {
        let path = self.session_path(&format!("element/{}/attribute/{name}", element.0))?;
        let value = self.command(Method::GET, &path, None)?;
        Ok(value.as_str().map(str::to_string))
    }

    fn close_all(&mut self) {
        let Some(id) = self.session.take() else {
            return;
        };
        match self.command(Method::DELETE, &format!("session/{id}"), None) {
            Ok(_) => log::info!("webdriver session {id} closed"),
            Err(e) => log::warn!("failed to close webdriver session {id}: {e}"),
        }
    }
}

fn strategy(locator: &Locator) -> (&'static str, String) {
    match locator {
        Locator::Css(s) => ("css selector", s.clone()),
        Locator::XPath(s) => ("xpath", s.clone()),
        Locator::Id(id) => ("css selector", format!("[id=\"{}\"]", id.replace('"', "\\\""))),
    }
}

fn classify_error(value: &Value, status: u16) -> BrowserError {
    let code = value.get("error").and_then(Value::as_str).unwrap_or("unknown error");
    let message = value.get("message").and_then(Value::as_str).unwrap_or("");
    let detail = format!("{code} ({status}): {message}");

    match code {
        "no such element" | "stale element reference" => BrowserError::ElementNotFound(detail),
        "invalid session id" | "session not created" => BrowserError::Session(detail),
        "timeout" | "unknown error" if message.contains("net::") => BrowserError::Navigation(detail),
        _ => BrowserError::Protocol(detail),
    }
}
