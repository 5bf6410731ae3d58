//! Headless Chrome page printing via chromiumoxide

use crate::error::FetchError;
use anyhow::{Context, Result};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::path::Path;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// One headless browser, reused for every page of a run
pub struct ChromeRenderer {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl ChromeRenderer {
    /// Launch Chrome/Chromium
    pub async fn launch() -> Result<Self> {
        let config = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-setuid-sandbox")
            .arg("--no-first-run")
            .arg("--headless=new")
            .build()
            .map_err(|e| anyhow::anyhow!("Browser config error: {}", e))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("Failed to launch Chrome. Is Chrome/Chromium installed?")?;

        let handler = tokio::spawn(async move { while handler.next().await.is_some() {} });

        Ok(Self { browser, handler })
    }

    /// Load `url` and print it to `output` as PDF
    pub async fn print_to_pdf(
        &self,
        url: &str,
        output: &Path,
        timeout: Duration,
    ) -> Result<(), FetchError> {
        let page = match tokio::time::timeout(timeout, self.browser.new_page("about:blank")).await {
            Ok(page) => page.map_err(cdp_error)?,
            Err(_) => return Err(FetchError::Timeout(timeout)),
        };

        let printed = tokio::time::timeout(timeout, print_page(&page, url)).await;

        // closed on every path, tabs otherwise live until the browser exits
        if let Ok(Err(e)) = tokio::time::timeout(timeout, page.close()).await {
            debug!(url, error = %e, "could not close page");
        }

        let bytes = printed.map_err(|_| FetchError::Timeout(timeout))??;

        if bytes.is_empty() {
            return Err(FetchError::Render("Chrome produced an empty PDF".to_string()));
        }

        tokio::fs::write(output, &bytes)
            .await
            .map_err(|e| FetchError::io(output, e))
    }

    /// Close the browser
    pub async fn close(mut self) -> Result<()> {
        self.browser.close().await?;
        self.handler.abort();
        Ok(())
    }
}

async fn print_page(page: &Page, url: &str) -> Result<Vec<u8>, FetchError> {
    page.execute(SetUserAgentOverrideParams::new(USER_AGENT))
        .await
        .map_err(cdp_error)?;
    page.goto(url).await.map_err(cdp_error)?;

    let params = PrintToPdfParams::builder().print_background(true).build();
    page.pdf(params).await.map_err(cdp_error)
}

fn cdp_error(err: chromiumoxide::error::CdpError) -> FetchError {
    FetchError::Render(describe_cdp_error(&err.to_string()))
}

/// Short label for common navigation failures, the raw message otherwise
fn describe_cdp_error(error: &str) -> String {
    let label = if error.contains("ERR_NAME_NOT_RESOLVED") {
        "DNS_FAILED"
    } else if error.contains("ERR_CONNECTION_REFUSED") {
        "CONNECTION_REFUSED"
    } else if error.contains("ERR_CONNECTION_TIMED_OUT") {
        "TIMEOUT"
    } else if error.contains("ERR_CERT") || error.contains("SSL") {
        "SSL_ERROR"
    } else {
        return error.to_string();
    };
    format!("{} ({})", label, error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_cdp_error() {
        assert!(describe_cdp_error("net::ERR_NAME_NOT_RESOLVED").starts_with("DNS_FAILED"));
        assert!(describe_cdp_error("ERR_CONNECTION_REFUSED").starts_with("CONNECTION_REFUSED"));
        assert_eq!(describe_cdp_error("random error"), "random error");
    }
}
