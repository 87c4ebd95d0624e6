// This file contains the code that turns a finished CheckM run into packaged archives and an HTML
// report.

// Copyright 2026 the checkm-runner authors

// This file is part of checkm-runner. checkm-runner is free software: you can redistribute it
// and/or modify it under the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option) any later version.
// checkm-runner is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See
// the GNU General Public License for more details. You should have received a copy of the GNU
// General Public License along with checkm-runner. If not, see <http://www.gnu.org/licenses/>.

use regex::Regex;
use std::fmt::Write as FmtWrite;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CheckmError, Result};
use crate::log::log_message;
use crate::misc::{create_dir, list_dir_files};
use crate::services::{BlobStore, OutputPackage, PackFormat};
use crate::stats::{load_bin_stats, round_to, BinStatsRecord, StatValue};


/// Relative to the output directory. Any of these may be missing, depending on how CheckM ran.
pub const CRITICAL_FILES: [&str; 6] = ["lineage.ms",
                                       "storage/bin_stats.analyze.tsv",
                                       "storage/bin_stats.tree.tsv",
                                       "storage/bin_stats_ext.tsv",
                                       "storage/marker_gene_stats.tsv",
                                       "storage/tree/concatenated.tre"];

pub const BIN_STATS_FILE: &str = "storage/bin_stats_ext.tsv";
pub const BIN_QA_PLOT: &str = "bin_qa_plot.png";
pub const REPORT_HTML: &str = "report.html";

struct SummaryField {
    id: &'static str,
    display: &'static str,
    round: Option<u32>,
}

const SUMMARY_FIELDS: [SummaryField; 12] = [
    SummaryField { id: "marker lineage", display: "Marker Lineage", round: None },
    SummaryField { id: "# genomes",      display: "# Genomes",      round: None },
    SummaryField { id: "# markers",      display: "# Markers",      round: None },
    SummaryField { id: "# marker sets",  display: "# Marker Sets",  round: None },
    SummaryField { id: "0",              display: "0",              round: None },
    SummaryField { id: "1",              display: "1",              round: None },
    SummaryField { id: "2",              display: "2",              round: None },
    SummaryField { id: "3",              display: "3",              round: None },
    SummaryField { id: "4",              display: "4",              round: None },
    SummaryField { id: "5+",             display: "5+",             round: None },
    SummaryField { id: "Completeness",   display: "Completeness",   round: None },
    SummaryField { id: "Contamination",  display: "Contamination",  round: Some(3) },
];

const REPORT_STYLE: &str = "
        <style style=\"text/css\">
            table {
                border: 1px solid #bbb;
                border-collapse: collapse;
            }

            th, td {
                text-align: left;
                border: 1px solid #bbb;
                padding: 8px;
            }

            tr:nth-child(odd) {
                background-color: #f9f9f9;
            }

            tr:hover {
                background-color: #f5f5f5;
            }
        </style>
";


pub struct OutputBuilder<'a> {
    output_dir: PathBuf,
    plots_dir: PathBuf,
    scratch: PathBuf,
    blob_store: &'a dyn BlobStore,
}

impl<'a> OutputBuilder<'a> {
    pub fn new(output_dir: &Path, plots_dir: &Path, scratch: &Path, blob_store: &'a dyn BlobStore)
            -> Self {
        OutputBuilder { output_dir: output_dir.to_path_buf(), plots_dir: plots_dir.to_path_buf(),
                        scratch: scratch.to_path_buf(), blob_store }
    }

    pub fn package_folder(&self, folder: &Path, name: &str, description: &str)
            -> Result<OutputPackage> {
        let handle = self.blob_store.upload(folder, PackFormat::default())?;
        Ok(OutputPackage { handle, name: name.to_string(), description: description.to_string() })
    }

    pub fn package_full_output(&self) -> Result<OutputPackage> {
        self.package_folder(&self.output_dir, "full_output", "Full output of CheckM")
    }

    pub fn package_plots(&self) -> Result<OutputPackage> {
        self.package_folder(&self.plots_dir, "plots", "Output plots from CheckM")
    }

    /// Copies the critical files into scratch/critical_output_<suffix> and packages that.
    pub fn package_critical_output(&self, suffix: &str) -> Result<OutputPackage> {
        let critical_out_dir = self.scratch.join(format!("critical_output_{}", suffix));
        self.build_critical_output(&critical_out_dir)?;
        self.package_folder(&critical_out_dir, "selected_output",
                            "Selected summary output of CheckM")
    }

    /// Only failing to create critical_out_dir is an error. Each file copy is best effort.
    pub fn build_critical_output(&self, critical_out_dir: &Path) -> Result<()> {
        create_dir(critical_out_dir)?;
        for filename in CRITICAL_FILES {
            copy_file_ignore_errors(filename, &self.output_dir, critical_out_dir);
        }
        Ok(())
    }

    /// Returns the summary table as HTML, or None if CheckM wrote no statistics file.
    pub fn build_summary_table(&self) -> Result<Option<String>> {
        let records = load_bin_stats(&self.output_dir.join(BIN_STATS_FILE))?;
        Ok(records.map(|r| render_summary_table(&r)))
    }

    /// Per-bin reference distribution plots in the plots directory, sorted by bin name.
    pub fn find_dist_plots(&self) -> Result<Vec<(String, PathBuf)>> {
        let re = Regex::new(r"^(.+)\.ref_dist_plots\.png$")
            .map_err(|e| CheckmError::validation(e.to_string()))?;
        let mut plots = Vec::new();
        if !self.plots_dir.is_dir() {
            return Ok(plots);
        }
        for file in list_dir_files(&self.plots_dir)? {
            let file_name = file.file_name().unwrap_or_default().to_string_lossy().into_owned();
            if let Some(caps) = re.captures(&file_name) {
                plots.push((caps[1].to_string(), file));
            }
        }
        plots.sort();
        Ok(plots)
    }

    /// Builds html_dir/report.html around the bin QA plot and packages html_dir. The bin QA plot
    /// must exist, but the summary table and distribution plots are included only if present.
    pub fn build_html_report(&self, html_dir: &Path, object_name: &str) -> Result<OutputPackage> {
        create_dir(html_dir)?;
        let plot_src = self.plots_dir.join(BIN_QA_PLOT);
        fs::copy(&plot_src, html_dir.join(BIN_QA_PLOT))
            .map_err(CheckmError::io_path("copy", &plot_src))?;

        let mut html = String::new();
        write_html_header(&mut html, object_name);
        html.push_str("<body>\n");
        let _ = writeln!(html, "<img src=\"{}\" width=\"90%\" />", BIN_QA_PLOT);
        html.push_str("<br><br><br>\n");
        if let Some(table) = self.build_summary_table()? {
            html.push_str(&table);
        }

        let mut linked = Vec::new();
        for (bin, plot) in self.find_dist_plots()? {
            let file_name = plot.file_name().unwrap_or_default().to_string_lossy().into_owned();
            match fs::copy(&plot, html_dir.join(&file_name)) {
                Ok(_)  => linked.push((bin, file_name)),
                Err(e) => log_message(&format!("copy of {} failed: {}", plot.display(), e)),
            }
        }
        if !linked.is_empty() {
            html.push_str("<br><br>\n<h3>Reference distribution plots</h3>\n<ul>\n");
            for (bin, file_name) in &linked {
                let _ = writeln!(html, "  <li><a href=\"{}\">{}</a></li>",
                                 html_escape(file_name), html_escape(bin));
            }
            html.push_str("</ul>\n");
        }
        html.push_str("</body>\n</html>\n");

        let report_file = html_dir.join(REPORT_HTML);
        fs::write(&report_file, html).map_err(CheckmError::io_path("write", &report_file))?;
        self.package_folder(html_dir, REPORT_HTML, "Assembled report from CheckM")
    }
}


fn copy_file_ignore_errors(filename: &str, src_dir: &Path, dest_dir: &Path) {
    let src = src_dir.join(filename);
    let dest = dest_dir.join(filename);
    log_message(&format!("copying {} to {}", src.display(), dest.display()));
    let result = match dest.parent() {
        Some(parent) => fs::create_dir_all(parent).and_then(|_| fs::copy(&src, &dest)),
        None         => fs::copy(&src, &dest),
    };
    if let Err(e) = result {
        log_message(&format!("copy failed: {}", e));
    }
}


fn write_html_header(html: &mut String, object_name: &str) {
    html.push_str("<html>\n<head>\n");
    let _ = write!(html, "<title>CheckM Report for {}</title>", html_escape(object_name));
    html.push_str(REPORT_STYLE);
    html.push_str("</head>\n");
}


pub fn render_summary_table(records: &[BinStatsRecord]) -> String {
    let mut html = String::new();
    html.push_str("<table>\n  <tr>\n    <th><b>Bin Name</b></th>\n");
    for field in &SUMMARY_FIELDS {
        let _ = writeln!(html, "    <th>{}</th>", field.display);
    }
    html.push_str("  </tr>\n");
    for record in records {
        html.push_str("  <tr>\n");
        let _ = writeln!(html, "    <td>{}</td>", html_escape(&record.bin_id));
        for field in &SUMMARY_FIELDS {
            match record.metrics.get(field.id) {
                Some(value) => {
                    let _ = writeln!(html, "    <td>{}</td>",
                                     html_escape(&format_cell(value, field.round)));
                }
                None => html.push_str("    <td></td>\n"),
            }
        }
        html.push_str("  </tr>\n");
    }
    html.push_str("</table>\n");
    html
}


fn format_cell(value: &StatValue, round: Option<u32>) -> String {
    match (value, round) {
        (StatValue::Float(v), Some(places)) => {
            StatValue::Float(round_to(*v, places)).to_string()
        }
        _ => value.to_string(),
    }
}


fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
        .replace('"', "&quot;").replace('\'', "&#39;")
}
