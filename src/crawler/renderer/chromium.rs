//! Chromium-based renderer using chromiumoxide

use super::{RenderError, RenderedPage, Renderer};
use async_trait::async_trait;
use super::OnDrop;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use std::time::Duration;
use tokio::task::JoinHandle;
use url::Url;

/// Headless Chromium shared by all workers; each render opens its own tab
pub struct ChromiumRenderer {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl ChromiumRenderer {
    /// Starts a headless Chromium found on the system
    pub async fn launch() -> Result<Self, RenderError> {
        let config = BrowserConfig::builder()
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .build()
            .map_err(RenderError::Unavailable)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| RenderError::Unavailable(e.to_string()))?;

        // The CDP event loop must be polled for the browser to make progress
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        tracing::info!("Headless Chromium started");
        Ok(Self { browser, handler })
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn render(&self, url: &Url, timeout: Duration) -> Result<RenderedPage, RenderError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| RenderError::Unavailable(e.to_string()))?;

        // Runs on success, error and cancellation alike
        let _close_tab = OnDrop::new({
            let page = page.clone();
            let url = url.clone();
            move || close_in_background(page, url)
        });

        let loaded = tokio::time::timeout(timeout, async {
            page.goto(url.as_str()).await?;
            page.wait_for_navigation().await?;
            page.content().await
        })
        .await;

        let final_url = page
            .url()
            .await
            .ok()
            .flatten()
            .and_then(|u| Url::parse(&u).ok())
            .unwrap_or_else(|| url.clone());

        match loaded {
            Ok(Ok(html)) => Ok(RenderedPage { final_url, html }),
            Ok(Err(e)) => Err(RenderError::Navigation(e.to_string())),
            Err(_) => Err(RenderError::Timeout(timeout)),
        }
    }
}

/// Spawns the close, since drop cannot await it
fn close_in_background(page: Page, url: Url) {
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        return;
    };
    runtime.spawn(async move {
        if let Err(e) = page.close().await {
            tracing::debug!("Failed to close tab for {}: {}", url, e);
        }
    });
}

impl Drop for ChromiumRenderer {
    fn drop(&mut self) {
        self.handler.abort();
    }
}
