//! JavaScript-capable page rendering
//!
//! The dispatcher falls back to a [`Renderer`] for pages that plain HTTP
//! cannot retrieve (anti-bot responses) or that carry almost no text until
//! scripts run. A headless Chromium implementation is compiled in with the
//! `browser` cargo feature.

#[cfg(feature = "browser")]
mod chromium;

#[cfg(feature = "browser")]
pub use chromium::ChromiumRenderer;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("browser unavailable: {0}")]
    Unavailable(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("rendering timed out after {0:?}")]
    Timeout(Duration),
}

/// HTML of a page after its scripts ran
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub final_url: Url,
    pub html: String,
}

#[async_trait]
pub trait Renderer: Send + Sync {
    /// Loads `url` and returns the resulting document
    async fn render(&self, url: &Url, timeout: Duration) -> Result<RenderedPage, RenderError>;
}

/// Runs an action once when dropped
///
/// Renderers hold one of these per open tab so the tab is released even when
/// the render future is dropped mid-await by a shutdown.
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
pub(crate) struct OnDrop<F: FnOnce()> {
    action: Option<F>,
}

#[cfg_attr(not(feature = "browser"), allow(dead_code))]
impl<F: FnOnce()> OnDrop<F> {
    pub(crate) fn new(action: F) -> Self {
        Self {
            action: Some(action),
        }
    }
}

impl<F: FnOnce()> Drop for OnDrop<F> {
    fn drop(&mut self) {
        if let Some(action) = self.action.take() {
            action();
        }
    }
}

/// Launches the renderer compiled into this build, if any
///
/// Returns `None` when the crate was built without the `browser` feature or
/// when no Chromium binary could be started.
pub async fn launch_default() -> Option<Arc<dyn Renderer>> {
    #[cfg(feature = "browser")]
    {
        match ChromiumRenderer::launch().await {
            Ok(renderer) => return Some(Arc::new(renderer)),
            Err(e) => tracing::warn!("Headless browser not started: {}", e),
        }
    }

    #[cfg(not(feature = "browser"))]
    tracing::debug!("Built without the browser feature, no renderer available");

    None
}
