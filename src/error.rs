// This file defines the errors that abort a checkm-runner job.

// Copyright 2026 the checkm-runner authors

// This file is part of checkm-runner. checkm-runner is free software: you can redistribute it
// and/or modify it under the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option) any later version.
// checkm-runner is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See
// the GNU General Public License for more details. You should have received a copy of the GNU
// General Public License along with checkm-runner. If not, see <http://www.gnu.org/licenses/>.

use std::io;
use std::path::Path;
use thiserror::Error;


/// Everything that can stop a job. Soft conditions (a missing optional output file, a missing
/// statistics file) are logged where they happen and never become one of these.
#[derive(Error, Debug)]
pub enum CheckmError {
    /// A required parameter or option is missing or out of range.
    #[error("{0}")]
    Validation(String),

    /// The input could not be turned into a bin directory.
    #[error("{0}")]
    Staging(String),

    /// A child process exited with a non-zero code (or was killed, in which case code is -1).
    #[error("error running command:\n{command}\nexit code: {code}")]
    Execution { command: String, code: i32 },

    #[error("{context}\n{source}")]
    Io { context: String, source: io::Error },

    /// A line of a statistics file could not be decoded.
    #[error("failed to parse line {line}: {message}")]
    Parse { line: usize, message: String },
}

impl CheckmError {
    pub fn validation(text: impl Into<String>) -> Self { CheckmError::Validation(text.into()) }

    pub fn staging(text: impl Into<String>) -> Self { CheckmError::Staging(text.into()) }

    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        CheckmError::Io { context: context.into(), source }
    }

    /// Shortcut for `map_err` on filesystem calls that concern a single path.
    pub fn io_path(action: &str, path: &Path) -> impl FnOnce(io::Error) -> Self {
        let context = format!("failed to {} {}", action, path.display());
        move |source| CheckmError::Io { context, source }
    }
}


pub type Result<T> = std::result::Result<T, CheckmError>;
