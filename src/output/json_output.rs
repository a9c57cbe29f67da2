use crate::output::traits::{OutputHandler, OutputResult, PageResult};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// JSON Lines writer: one serialized [`PageResult`] per line
pub struct JsonLinesOutput {
    writer: BufWriter<File>,
    path: PathBuf,
}

impl JsonLinesOutput {
    pub fn create(path: &Path) -> OutputResult<Self> {
        Ok(Self {
            writer: BufWriter::new(File::create(path)?),
            path: path.to_path_buf(),
        })
    }
}

impl OutputHandler for JsonLinesOutput {
    fn write_page(&mut self, page: &PageResult) -> OutputResult<()> {
        serde_json::to_writer(&mut self.writer, page)?;
        self.writer.write_all(b"\n")?;
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
