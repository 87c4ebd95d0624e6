// This file contains the run configuration that is handed to every component.

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

use crate::error::{CheckmError, Result};


pub const DEFAULT_CHECKM_PROGRAM: &str = "checkm";
pub const DEFAULT_FASTA_EXTENSION: &str = "fna";


#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Root of all per-run directories. Every run creates its own suffixed subtree here.
    pub scratch: PathBuf,
    pub checkm_program: String,
    pub threads: Option<u32>,
    pub reduced_tree: bool,
    pub quiet: bool,
    pub fasta_extension: String,
    /// Where the local blob store keeps packaged archives (defaults to scratch/blobs).
    pub blob_dir: Option<PathBuf>,
    /// Where the local report publisher writes report objects (defaults to scratch/reports).
    pub report_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            scratch: PathBuf::from("."),
            checkm_program: DEFAULT_CHECKM_PROGRAM.to_string(),
            threads: None,
            reduced_tree: false,
            quiet: false,
            fasta_extension: DEFAULT_FASTA_EXTENSION.to_string(),
            blob_dir: None,
            report_dir: None,
        }
    }
}

impl Config {
    pub fn new(scratch: &Path) -> Self {
        Config { scratch: scratch.to_path_buf(), ..Default::default() }
    }

    pub fn load_yaml(filename: &Path) -> Result<Self> {
        let content = fs::read_to_string(filename)
            .map_err(CheckmError::io_path("read config file", filename))?;
        serde_yaml::from_str(&content).map_err(|e| CheckmError::validation(
            format!("failed to parse config file {}\n{}", filename.display(), e)))
    }

    /// Checks the values and makes the scratch path absolute so that child processes with a
    /// different working directory see the same paths.
    pub fn finalise(mut self) -> Result<Self> {
        if self.checkm_program.is_empty() {
            return Err(CheckmError::validation("checkm program cannot be empty"));
        }
        let extension = self.fasta_extension.trim_start_matches('.').to_string();
        if extension.is_empty() || extension.contains('/') {
            return Err(CheckmError::validation(
                format!("invalid FASTA extension: '{}'", self.fasta_extension)));
        }
        self.fasta_extension = extension;
        if self.threads == Some(0) {
            return Err(CheckmError::validation("--threads must be at least 1"));
        }
        crate::misc::create_dir(&self.scratch)?;
        self.scratch = fs::canonicalize(&self.scratch)
            .map_err(CheckmError::io_path("resolve scratch directory", &self.scratch))?;
        Ok(self)
    }

    pub fn blob_dir(&self) -> PathBuf {
        self.blob_dir.clone().unwrap_or_else(|| self.scratch.join("blobs"))
    }

    pub fn report_dir(&self) -> PathBuf {
        self.report_dir.clone().unwrap_or_else(|| self.scratch.join("reports"))
    }
}
