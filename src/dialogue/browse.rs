//! Open URLs in the user's default browser.

use anyhow::Context;
use tracing::debug;

use super::Browser;

/// Hands the URL to the desktop's default browser and returns without
/// waiting for it.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBrowser;

impl Browser for SystemBrowser {
    fn open(&self, url: &str) -> anyhow::Result<()> {
        debug!(url, "Launching browser");
        webbrowser::open(url).with_context(|| format!("Failed to open {url}"))
    }
}
