//! Output module: writers for crawled pages and the final crawl report
//!
//! Pages are written as they complete, either as CSV or as JSON Lines, to
//! `<output-dir>/<site>/<YYYYmmdd_HHMMSS>.<ext>`. Writing happens on a
//! blocking task fed through a channel, so workers never touch the file.

mod csv_output;
mod json_output;
pub mod stats;
mod traits;

pub use csv_output::CsvOutput;
pub use json_output::JsonLinesOutput;
pub use stats::{print_report, CrawlReport};
pub use traits::{FetchMethod, OutputError, OutputFormat, OutputHandler, OutputResult, PageResult};

use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use url::Url;

/// Pages buffered between workers and the writer task
const OUTPUT_CHANNEL_CAPACITY: usize = 64;

/// Folder name for a crawl: the explicit name, or the seed host
///
/// A non-default port is kept with `_` in place of `:` so the name stays a
/// valid directory name everywhere.
pub fn site_folder(seed: &Url, name: Option<&str>) -> String {
    if let Some(name) = name {
        return name.to_string();
    }

    let host = seed.host_str().unwrap_or("site").to_lowercase();
    match seed.port() {
        Some(port) => format!("{}_{}", host, port),
        None => host,
    }
}

/// Builds `<root>/<folder>/<YYYYmmdd_HHMMSS>.<ext>`
pub fn output_path(
    root: &Path,
    folder: &str,
    started: DateTime<Local>,
    format: OutputFormat,
) -> PathBuf {
    root.join(folder).join(format!(
        "{}.{}",
        started.format("%Y%m%d_%H%M%S"),
        format.extension()
    ))
}

/// Creates the output directory and the writer for `format` at `path`
pub fn create_output(format: OutputFormat, path: &Path) -> OutputResult<Box<dyn OutputHandler>> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    Ok(match format {
        OutputFormat::Csv => Box::new(CsvOutput::create(path)?),
        OutputFormat::Json => Box::new(JsonLinesOutput::create(path)?),
    })
}

/// Background writer that owns an [`OutputHandler`]
pub struct OutputWriter {
    tx: mpsc::Sender<PageResult>,
    task: JoinHandle<OutputResult<u64>>,
    path: PathBuf,
}

impl OutputWriter {
    /// Moves `handler` onto a blocking task and returns the feeding side
    pub fn spawn(mut handler: Box<dyn OutputHandler>) -> Self {
        let (tx, mut rx) = mpsc::channel::<PageResult>(OUTPUT_CHANNEL_CAPACITY);
        let path = handler.path().to_path_buf();

        let task = tokio::task::spawn_blocking(move || {
            let mut written = 0u64;
            while let Some(page) = rx.blocking_recv() {
                handler.write_page(&page)?;
                written += 1;
            }
            handler.finish()?;
            Ok(written)
        });

        Self { tx, task, path }
    }

    /// Channel end that workers send finished pages to
    pub fn sender(&self) -> mpsc::Sender<PageResult> {
        self.tx.clone()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Closes the channel and waits for every queued page to be written
    ///
    /// Every other sender must be dropped first or this waits forever.
    pub async fn finish(self) -> OutputResult<u64> {
        drop(self.tx);
        self.task
            .await
            .map_err(|e| OutputError::Write(format!("writer task failed: {}", e)))?
    }
}
