// EDB - Ethereum Debugger
// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Report rendering and writing.

use clap::ValueEnum;
use eyre::{Result, WrapErr};
use statediff_report::{
    render_markdown, to_pretty_json, FormattedReport, TaskMetadata, ToolReport, ValidationReport,
};
use std::{
    fs,
    io::{self, Write},
    path::Path,
};
use tracing::info;

/// Available report formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// JSON read by the signing tool
    Tool,
    /// JSON with task metadata
    Json,
    /// Markdown validation document
    Markdown,
}

/// Render `report` in `format`.
pub fn render(
    report: &ValidationReport,
    format: OutputFormat,
    metadata: TaskMetadata,
) -> Result<String> {
    let rendered = match format {
        OutputFormat::Tool => to_pretty_json(&ToolReport::from(report))?,
        OutputFormat::Json => to_pretty_json(&FormattedReport::new(report, metadata))?,
        OutputFormat::Markdown => render_markdown(report),
    };
    Ok(rendered)
}

/// Write the report to `path`, or to stdout.
pub fn write_report(content: &str, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            fs::write(path, content)
                .wrap_err_with(|| format!("Failed to write report to {}", path.display()))?;
            info!("Report written to {}", path.display());
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(content.as_bytes()).wrap_err("Failed to write report to stdout")?;
            stdout.flush()?;
        }
    }
    Ok(())
}
