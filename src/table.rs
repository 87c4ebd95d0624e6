// This file contains the code for the checkm-runner table subcommand.

// Copyright 2026 the checkm-runner authors

// This file is part of checkm-runner. checkm-runner is free software: you can redistribute it
// and/or modify it under the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option) any later version.
// checkm-runner is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See
// the GNU General Public License for more details. You should have received a copy of the GNU
// General Public License along with checkm-runner. If not, see <http://www.gnu.org/licenses/>.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::misc::{check_if_dir_exists, quit_with_error};
use crate::output::{render_summary_table, BIN_STATS_FILE};
use crate::stats::load_bin_stats;


pub fn table(out_dir: PathBuf) {
    check_if_dir_exists(&out_dir).unwrap_or_else(|e| quit_with_error(&e.to_string()));
    match summary_table(&out_dir).unwrap_or_else(|e| quit_with_error(&e.to_string())) {
        Some(html) => print!("{}", html),
        None       => eprintln!("No summary table: {} not found", BIN_STATS_FILE),
    }
}


/// The HTML summary table for a CheckM output directory, or None if it has no statistics file.
pub fn summary_table(out_dir: &Path) -> Result<Option<String>> {
    let records = load_bin_stats(&out_dir.join(BIN_STATS_FILE))?;
    Ok(records.map(|r| render_summary_table(&r)))
}
