//! JSON report export

use crate::output::{CrawlReport, OutputResult};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes the report as pretty-printed JSON
pub fn generate_json_report(report: &CrawlReport, output_path: &Path) -> OutputResult<()> {
    let mut writer = BufWriter::new(File::create(output_path)?);
    serde_json::to_writer_pretty(&mut writer, report)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

pub fn format_json_report(report: &CrawlReport) -> OutputResult<String> {
    Ok(serde_json::to_string_pretty(report)?)
}
