//! The run's two wait loops: table readiness and download materialization.

use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use itdash_io::fs::file_ready;

use crate::browser::{Browser, BrowserError, Element, Locator};
use crate::CliError;

/// Wait for the investments table to show at least `min_rows` rows.
///
/// Sleeps double from `initial` up to `max` between checks; the whole wait is
/// bounded by `timeout`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableWait {
    pub min_rows: usize,
    pub timeout: Duration,
    pub initial: Duration,
    pub max: Duration,
}

impl TableWait {
    fn next_delay(&self, current: Duration) -> Duration {
        (current * 2).min(self.max)
    }
}

/// Check for a downloaded file `attempts` more times, `interval` apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadWait {
    pub attempts: u32,
    pub interval: Duration,
}

/// Re-locate the table and count its rows until the page size is reached.
///
/// The table element is looked up again on every check since the page
/// re-renders it after a page-size change. A handle that goes stale between
/// the two lookups counts as "not ready yet".
pub fn wait_for_table<B: Browser + ?Sized>(
    browser: &mut B,
    table: &Locator,
    rows: &Locator,
    wait: &TableWait,
) -> Result<Element, CliError> {
    let start = Instant::now();
    let mut delay = wait.initial;
    let mut seen = 0;

    loop {
        if let Some(element) = browser.find_elements(table, None)?.into_iter().next() {
            match browser.find_elements(rows, Some(&element)) {
                Ok(found) => {
                    seen = found.len();
                    log::debug!("table has {seen} row(s), want {}", wait.min_rows);
                    if seen >= wait.min_rows {
                        return Ok(element);
                    }
                }
                Err(BrowserError::ElementNotFound(e)) => log::debug!("table re-rendered mid-check: {e}"),
                Err(e) => return Err(e.into()),
            }
        } else {
            log::debug!("table {table} not present yet");
        }

        let elapsed = start.elapsed();
        if elapsed >= wait.timeout {
            return Err(CliError::load_timeout(seen, wait.min_rows, elapsed.as_secs()));
        }
        thread::sleep(delay.min(wait.timeout - elapsed));
        delay = wait.next_delay(delay);
    }
}

/// True once `path` exists with nonzero size. Returns false after the last
/// attempt; a missing download is not an error here, it surfaces when the
/// document is read.
pub fn wait_for_download(path: &Path, wait: &DownloadWait) -> bool {
    let mut remaining = wait.attempts;
    while !file_ready(path) {
        if remaining == 0 {
            log::warn!(
                "download {} not complete after {} check(s)",
                path.display(),
                wait.attempts + 1
            );
            return false;
        }
        thread::sleep(wait.interval);
        remaining -= 1;
    }
    log::debug!("download ready: {}", path.display());
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit_codes::{EXIT_BROWSER, EXIT_TABLE_TIMEOUT};

    /// Table whose handle changes on every lookup. Row lookups against a
    /// handle listed in `stale` fail the way a detached element does.
    struct RerenderingTable {
        generation: usize,
        rows: usize,
        stale: Vec<usize>,
        row_error: Option<BrowserError>,
        row_lookups: usize,
    }

    impl RerenderingTable {
        fn new(rows: usize) -> Self {
            Self { generation: 0, rows, stale: Vec::new(), row_error: None, row_lookups: 0 }
        }
    }

    impl Browser for RerenderingTable {
        fn set_download_directory(&mut self, _: &Path) -> Result<(), BrowserError> {
            Ok(())
        }

        fn open_site(&mut self, _: &str) -> Result<(), BrowserError> {
            Ok(())
        }

        fn find_elements(&mut self, locator: &Locator, scope: Option<&Element>) -> Result<Vec<Element>, BrowserError> {
            match scope {
                None => {
                    self.generation += 1;
                    Ok(vec![Element(format!("table-{}", self.generation))])
                }
                Some(_) => {
                    self.row_lookups += 1;
                    if let Some(err) = &self.row_error {
                        return Err(err.clone());
                    }
                    if self.stale.contains(&self.generation) {
                        return Err(BrowserError::ElementNotFound(locator.to_string()));
                    }
                    Ok((0..self.rows).map(|i| Element(format!("row-{i}"))).collect())
                }
            }
        }

        fn is_displayed(&mut self, _: &Element) -> Result<bool, BrowserError> {
            Ok(true)
        }

        fn click_element(&mut self, _: &Element) -> Result<(), BrowserError> {
            Ok(())
        }

        fn text(&mut self, _: &Element) -> Result<String, BrowserError> {
            Ok(String::new())
        }

        fn attribute(&mut self, _: &Element, _: &str) -> Result<Option<String>, BrowserError> {
            Ok(None)
        }

        fn close_all(&mut self) {}
    }

    fn quick_wait(min_rows: usize) -> TableWait {
        TableWait {
            min_rows,
            timeout: Duration::from_millis(200),
            initial: Duration::from_millis(1),
            max: Duration::from_millis(4),
        }
    }

    #[test]
    fn stale_table_handle_keeps_polling() {
        let mut browser = RerenderingTable::new(11);
        browser.stale = vec![1, 2];
        let table = wait_for_table(&mut browser, &Locator::css("table"), &Locator::css("tbody > tr"), &quick_wait(11))
            .unwrap();
        assert_eq!(table, Element("table-3".into()));
        assert_eq!(browser.row_lookups, 3);
    }

    #[test]
    fn always_stale_table_times_out() {
        let mut browser = RerenderingTable::new(11);
        browser.stale = (1..100_000).collect();
        let err = wait_for_table(&mut browser, &Locator::css("table"), &Locator::css("tbody > tr"), &quick_wait(11))
            .unwrap_err();
        assert_eq!(err.code, EXIT_TABLE_TIMEOUT);
    }

    #[test]
    fn lost_session_during_row_count_aborts() {
        let mut browser = RerenderingTable::new(11);
        browser.row_error = Some(BrowserError::Session("gone".into()));
        let err = wait_for_table(&mut browser, &Locator::css("table"), &Locator::css("tbody > tr"), &quick_wait(11))
            .unwrap_err();
        assert_eq!(err.code, EXIT_BROWSER);
        assert_eq!(browser.row_lookups, 1);
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let wait = TableWait {
            min_rows: 11,
            timeout: Duration::from_secs(10),
            initial: Duration::from_millis(250),
            max: Duration::from_millis(1000),
        };
        let d1 = wait.next_delay(wait.initial);
        let d2 = wait.next_delay(d1);
        let d3 = wait.next_delay(d2);
        assert_eq!(d1, Duration::from_millis(500));
        assert_eq!(d2, Duration::from_millis(1000));
        assert_eq!(d3, Duration::from_millis(1000));
    }

    #[test]
    fn download_already_present() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("UII-1.pdf");
        std::fs::write(&path, b"%PDF-1.4").unwrap();
        let wait = DownloadWait { attempts: 0, interval: Duration::from_secs(3) };
        assert!(wait_for_download(&path, &wait));
    }

    #[test]
    fn download_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let wait = DownloadWait { attempts: 3, interval: Duration::from_millis(1) };
        let start = Instant::now();
        assert!(!wait_for_download(&dir.path().join("never.pdf"), &wait));
        assert!(start.elapsed() >= Duration::from_millis(3));
    }

    #[test]
    fn download_appears_midway() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("late.pdf");
        let writer_path = path.clone();
        let writer = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            std::fs::write(writer_path, b"%PDF").unwrap();
        });
        let wait = DownloadWait { attempts: 200, interval: Duration::from_millis(5) };
        assert!(wait_for_download(&path, &wait));
        writer.join().unwrap();
    }
}
