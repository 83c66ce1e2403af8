use crate::{browser::config::{ConnectionOptions, LaunchOptions},
            browser::events::TabEventSource,
            error::{CaptureError, Result}};
use headless_chrome::{Browser, Tab};
use std::{ffi::OsStr,
          sync::Arc,
          time::{Duration, Instant}};

/// Browser session that manages a Chrome/Chromium instance
pub struct BrowserSession {
    /// The underlying headless_chrome Browser instance
    browser: Browser,
}

impl BrowserSession {
    /// Launch a new browser instance with the given options
    pub fn launch(options: LaunchOptions) -> Result<Self> {
        let mut launch_opts = headless_chrome::LaunchOptions::default();

        // Ignore default arguments to prevent detection by anti-bot services
        launch_opts.ignore_default_args.push(OsStr::new("--enable-automation"));
        launch_opts.args.push(OsStr::new("--disable-blink-features=AutomationControlled"));

        // A capture lasts as long as the user keeps scrolling
        launch_opts.idle_browser_timeout = Duration::from_secs(60 * 60);

        launch_opts.headless = options.headless;
        launch_opts.window_size = Some((options.window_width, options.window_height));

        if let Some(path) = options.chrome_path {
            launch_opts.path = Some(path);
        }

        if let Some(dir) = options.user_data_dir {
            launch_opts.user_data_dir = Some(dir);
        }

        launch_opts.sandbox = options.sandbox;

        let browser = Browser::new(launch_opts).map_err(|e| CaptureError::LaunchFailed(e.to_string()))?;

        browser.new_tab().map_err(|e| CaptureError::LaunchFailed(format!("Failed to create tab: {}", e)))?;

        Ok(Self { browser })
    }

    /// Attach to a browser started with `--remote-debugging-port`, waiting up
    /// to `options.timeout` for its existing tabs to be discovered
    pub fn connect(options: ConnectionOptions) -> Result<Self> {
        let browser = Browser::connect(options.ws_url).map_err(|e| CaptureError::ConnectionFailed(e.to_string()))?;
        let session = Self { browser };

        let deadline = Instant::now() + Duration::from_millis(options.timeout);
        while session.get_tabs()?.is_empty() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(100));
        }

        Ok(session)
    }

    /// Get the active tab
    pub fn tab(&self) -> Result<Arc<Tab>> {
        self.get_active_tab()
    }

    /// Create a new tab
    pub fn new_tab(&self) -> Result<Arc<Tab>> {
        let tab = self
            .browser
            .new_tab()
            .map_err(|e| CaptureError::TabOperationFailed(format!("Failed to create tab: {}", e)))?;
        Ok(tab)
    }

    /// Get all tabs
    pub fn get_tabs(&self) -> Result<Vec<Arc<Tab>>> {
        let tabs = self
            .browser
            .get_tabs()
            .lock()
            .map_err(|e| CaptureError::TabOperationFailed(format!("Failed to get tabs: {}", e)))?
            .clone();

        Ok(tabs)
    }

    /// Get the currently active tab by checking the document visibility and focus state
    pub fn get_active_tab(&self) -> Result<Arc<Tab>> {
        let tabs = self.get_tabs()?;

        // First pass: check for both visibility and focus (strongest signal)
        for tab in &tabs {
            match tab.evaluate("document.visibilityState === 'visible' && document.hasFocus()", false) {
                Ok(remote_object) => {
                    if remote_object.value.and_then(|v| v.as_bool()).unwrap_or(false) {
                        return Ok(tab.clone());
                    }
                }
                Err(e) => {
                    log::debug!("Failed to check tab status: {}", e);
                    continue;
                }
            }
        }

        // Second pass: visibility only
        for tab in &tabs {
            if let Ok(remote_object) = tab.evaluate("document.visibilityState === 'visible'", false) {
                if remote_object.value.and_then(|v| v.as_bool()).unwrap_or(false) {
                    return Ok(tab.clone());
                }
            }
        }

        Err(CaptureError::TabOperationFailed("No active tab found".to_string()))
    }

    /// The active tab, or a new one when none is visible
    pub fn active_or_new_tab(&self) -> Result<Arc<Tab>> {
        match self.get_active_tab() {
            Ok(tab) => Ok(tab),
            Err(e) => {
                log::debug!("{}; opening a new tab", e);
                self.new_tab()
            }
        }
    }

    /// Get the underlying Browser instance
    pub fn browser(&self) -> &Browser {
        &self.browser
    }

    /// Navigate a tab to a URL
    pub fn navigate(&self, tab: &Tab, url: &str) -> Result<()> {
        tab.navigate_to(url)
            .map_err(|e| CaptureError::NavigationFailed(format!("Failed to navigate to {}: {}", url, e)))?;

        Ok(())
    }

    /// Wait for a tab's navigation to complete
    pub fn wait_for_navigation(&self, tab: &Tab) -> Result<()> {
        tab.wait_until_navigated()
            .map_err(|e| CaptureError::NavigationFailed(format!("Navigation timeout: {}", e)))?;

        Ok(())
    }

    /// Network event source for a tab
    pub fn event_source(&self, tab: Arc<Tab>) -> TabEventSource {
        TabEventSource::new(tab)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_options_builder() {
        let opts = LaunchOptions::new()
            .headless(true)
            .window_size(800, 600)
            .user_data_dir("chrome_profile");

        assert!(opts.headless);
        assert_eq!(opts.window_width, 800);
        assert_eq!(opts.window_height, 600);
        assert_eq!(opts.user_data_dir.as_deref(), Some(std::path::Path::new("chrome_profile")));
    }

    #[test]
    fn test_launch_options_default_is_headed() {
        let opts = LaunchOptions::default();
        assert!(!opts.headless);
        assert_eq!((opts.window_width, opts.window_height), (1280, 900));
    }

    #[test]
    fn test_connection_options() {
        let opts = ConnectionOptions::new("ws://localhost:9222").timeout(5000);

        assert_eq!(opts.ws_url, "ws://localhost:9222");
        assert_eq!(opts.timeout, 5000);
    }

    // Integration tests (require Chrome to be installed)
    #[test]
    #[ignore] // Ignore by default, run with: cargo test -- --ignored
    fn test_launch_browser() {
        let result = BrowserSession::launch(LaunchOptions::new().headless(true));
        assert!(result.is_ok());
    }

    #[test]
    #[ignore]
    fn test_navigate() {
        let session = BrowserSession::launch(LaunchOptions::new().headless(true)).expect("Failed to launch browser");
        let tab = session.active_or_new_tab().expect("Failed to get tab");

        let result = session.navigate(&tab, "about:blank");
        assert!(result.is_ok());
    }
}
