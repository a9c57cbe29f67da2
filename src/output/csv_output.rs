use crate::output::traits::{OutputHandler, OutputResult, PageResult};
use std::fs::File;
use std::path::{Path, PathBuf};

const HEADER: [&str; 5] = ["url", "kind", "title", "content", "discovered_urls"];

/// CSV writer with one row per page
///
/// Discovered links are joined into a single cell separated by `, `.
pub struct CsvOutput {
    writer: csv::Writer<File>,
    path: PathBuf,
}

impl CsvOutput {
    /// Creates the file and writes the header row
    pub fn create(path: &Path) -> OutputResult<Self> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(HEADER)?;
        writer.flush()?;

        Ok(Self {
            writer,
            path: path.to_path_buf(),
        })
    }
}

impl OutputHandler for CsvOutput {
    fn write_page(&mut self, page: &PageResult) -> OutputResult<()> {
        let links = page.discovered_urls.join(", ");
        self.writer.write_record([
            page.url.as_str(),
            page.kind.as_str(),
            page.title.as_deref().unwrap_or(""),
            page.content.as_str(),
            links.as_str(),
        ])?;
        self.writer.flush()?;
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        self.writer.flush()?;
        Ok(())
    }

    fn path(&self) -> &Path {
        &self.path
    }
}
