//! End-of-crawl report

use crate::extract::ContentKind;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Summary of one finished crawl
#[derive(Debug, Clone, Default)]
pub struct CrawlReport {
    /// Seed URL the crawl started from
    pub seed: String,

    pub fetched: u64,
    pub failed: u64,
    pub skipped: u64,

    /// Pages fetched through the headless renderer
    pub rendered: u64,

    pub bytes_processed: u64,

    /// Records the output writer persisted
    pub pages_written: u64,

    /// URLs seeded from sitemaps (0 when the base URL was seeded instead)
    pub sitemap_urls: usize,

    /// Completed records per content kind
    pub kinds: BTreeMap<&'static str, u64>,

    pub elapsed: Duration,
    pub output_path: Option<PathBuf>,
    pub config_hash: Option<String>,

    /// Whether the crawl was interrupted before the frontier was exhausted
    pub cancelled: bool,
}

impl CrawlReport {
    /// Number of URL records that reached a terminal state
    pub fn total(&self) -> u64 {
        self.fetched + self.failed + self.skipped
    }

    /// Fetched records as a percentage of all fetch attempts (skips excluded)
    pub fn success_rate(&self) -> f64 {
        let attempted = self.fetched + self.failed;
        if attempted == 0 {
            return 0.0;
        }
        (self.fetched as f64 / attempted as f64) * 100.0
    }

    /// Adds `count` completed records of `kind`
    pub fn record_kind(&mut self, kind: ContentKind, count: u64) {
        *self.kinds.entry(kind.as_str()).or_insert(0) += count;
    }
}

/// Prints the report to stdout in a formatted manner
pub fn print_report(report: &CrawlReport) {
    println!("=== Crawl Report ===\n");

    println!("Overview:");
    println!("  Seed: {}", report.seed);
    println!("  Elapsed: {:.1}s", report.elapsed.as_secs_f64());
    if report.sitemap_urls > 0 {
        println!("  Seeded from sitemap: {} URLs", report.sitemap_urls);
    }
    if let Some(hash) = &report.config_hash {
        println!("  Config hash: {}", hash);
    }
    if report.cancelled {
        println!("  Status: interrupted");
    }
    println!();

    println!("URLs:");
    println!("  Fetched: {}", report.fetched);
    println!("  Failed: {}", report.failed);
    println!("  Skipped: {}", report.skipped);
    if report.rendered > 0 {
        println!("  Rendered in browser: {}", report.rendered);
    }
    println!(
        "  Data processed: {:.2} MiB",
        report.bytes_processed as f64 / (1024.0 * 1024.0)
    );
    println!();

    if !report.kinds.is_empty() {
        println!("By Kind:");
        let mut kinds: Vec<_> = report.kinds.iter().collect();
        kinds.sort_by(|a, b| b.1.cmp(a.1));
        for (kind, count) in kinds {
            println!("  {}: {}", kind, count);
        }
        println!();
    }

    if let Some(path) = &report.output_path {
        println!(
            "Output: {} ({} records)",
            path.display(),
            report.pages_written
        );
    }

    println!(
        "Success Rate: {:.1}% ({} / {} fetches succeeded)",
        report.success_rate(),
        report.fetched,
        report.fetched + report.failed
    );
}
