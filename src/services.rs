// This file contains the interfaces to the blob store (where packaged directories go) and the
// report publisher, plus local filesystem implementations of both.

// Copyright 2026 the checkm-runner authors

// This file is part of checkm-runner. checkm-runner is free software: you can redistribute it
// and/or modify it under the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option) any later version.
// checkm-runner is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See
// the GNU General Public License for more details. You should have received a copy of the GNU
// General Public License along with checkm-runner. If not, see <http://www.gnu.org/licenses/>.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::command::CommandInvocation;
use crate::error::{CheckmError, Result};
use crate::log::log_message;
use crate::misc::{check_if_dir_exists, create_dir, unique_suffix};
use crate::runner::run_command;


#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PackFormat {
    #[default]
    TarGz,
    Zip,
}

impl PackFormat {
    pub fn file_extension(&self) -> &'static str {
        match self {
            PackFormat::TarGz => "tar.gz",
            PackFormat::Zip   => "zip",
        }
    }
}


/// A packaged directory as it appears in a report: the store's handle plus what to call it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputPackage {
    pub handle: String,
    pub name: String,
    pub description: String,
}


pub trait BlobStore {
    /// Packs the directory into a single archive, stores it and returns an opaque handle.
    fn upload(&self, dir: &Path, format: PackFormat) -> Result<String>;
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub message: String,
    pub html_links: Vec<OutputPackage>,
    pub file_links: Vec<OutputPackage>,
    pub direct_html_link_index: usize,
    pub report_name: String,
    pub workspace_name: String,
}


#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedReport {
    pub report_name: String,
    pub report_ref: String,
}


pub trait ReportPublisher {
    fn publish(&self, report: &Report) -> Result<PublishedReport>;
}


/// Stores archives as <blob_dir>/<handle>.<format extension>, built with the system tar or zip.
pub struct LocalBlobStore {
    blob_dir: PathBuf,
}

impl LocalBlobStore {
    pub fn new(blob_dir: &Path) -> Self {
        LocalBlobStore { blob_dir: blob_dir.to_path_buf() }
    }

    pub fn archive_path(&self, handle: &str, format: PackFormat) -> PathBuf {
        self.blob_dir.join(format!("{}.{}", handle, format.file_extension()))
    }
}

impl BlobStore for LocalBlobStore {
    fn upload(&self, dir: &Path, format: PackFormat) -> Result<String> {
        check_if_dir_exists(dir)?;
        create_dir(&self.blob_dir)?;
        let handle = format!("blob_{}", unique_suffix());
        let archive = self.archive_path(&handle, format);
        let archive_arg = archive.to_string_lossy().into_owned();

        // Both archivers run from inside the directory so its contents sit at the archive root.
        let command = match format {
            PackFormat::TarGz => CommandInvocation::new("tar", vec!["-czf".to_string(),
                                                                    archive_arg, ".".to_string()]),
            PackFormat::Zip => CommandInvocation::new("zip", vec!["-q".to_string(),
                                                                  "-r".to_string(), archive_arg,
                                                                  ".".to_string()]),
        };
        run_command(&command, dir, None)?;
        log_message(&format!("packaged {} as {}", dir.display(), handle));
        Ok(handle)
    }
}


/// Writes each report as <report_dir>/<report_name>.json. The returned reference is that path.
pub struct LocalReportPublisher {
    report_dir: PathBuf,
}

impl LocalReportPublisher {
    pub fn new(report_dir: &Path) -> Self {
        LocalReportPublisher { report_dir: report_dir.to_path_buf() }
    }
}

impl ReportPublisher for LocalReportPublisher {
    fn publish(&self, report: &Report) -> Result<PublishedReport> {
        if report.report_name.is_empty() || report.report_name.contains('/') {
            return Err(CheckmError::validation(
                format!("invalid report name: '{}'", report.report_name)));
        }
        create_dir(&self.report_dir)?;
        let report_file = self.report_dir.join(format!("{}.json", report.report_name));
        let json = serde_json::to_string_pretty(report).map_err(|e| CheckmError::validation(
            format!("failed to serialise report {}\n{}", report.report_name, e)))?;
        fs::write(&report_file, json).map_err(CheckmError::io_path("write", &report_file))?;
        log_message(&format!("report written to {}", report_file.display()));
        Ok(PublishedReport { report_name: report.report_name.clone(),
                             report_ref: report_file.to_string_lossy().into_owned() })
    }
}
