// This file contains the functions used to print progress information to stderr.

// Copyright 2026 the checkm-runner authors

// This file is part of checkm-runner. checkm-runner is free software: you can redistribute it
// and/or modify it under the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option) any later version.
// checkm-runner is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See
// the GNU General Public License for more details. You should have received a copy of the GNU
// General Public License along with checkm-runner. If not, see <http://www.gnu.org/licenses/>.

use chrono::Local;
use colored::Colorize;
use std::time::{SystemTime, UNIX_EPOCH};
use textwrap::fill;


pub fn section_header(text: &str) {
    let date = format!("({})", Local::now().format("%Y-%m-%d %H:%M:%S"));
    eprintln!();
    eprintln!("{} {}", text.bold().bright_yellow().underline(), date.dimmed());
}


pub fn explanation(text: &str) {
    let term_width = term_size::dimensions().map(|(w, _)| w).unwrap_or(80);
    let wrapped_text = fill(text, term_width.clamp(40, 100));
    eprintln!("{}", wrapped_text.dimmed());
    eprintln!();
}


pub fn log_message(text: &str) {
    // One line of step-level detail, prefixed with seconds since the epoch.
    let seconds = SystemTime::now().duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64()).unwrap_or(0.0);
    eprintln!("{} {}", format!("{:.2}:", seconds).dimmed(), text);
}
