// This file contains miscellaneous functions used by various parts of checkm-runner.

// Copyright 2026 the checkm-runner authors

// This file is part of checkm-runner. checkm-runner is free software: you can redistribute it
// and/or modify it under the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option) any later version.
// checkm-runner is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See
// the GNU General Public License for more details. You should have received a copy of the GNU
// General Public License along with checkm-runner. If not, see <http://www.gnu.org/licenses/>.

use chrono::Local;
use indicatif::{ProgressBar, ProgressStyle};
use rand::{distr::Alphanumeric, Rng};
use std::fs::{File, create_dir_all, read_dir};
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{CheckmError, Result};


pub fn create_dir(dir_path: &Path) -> Result<()> {
    create_dir_all(dir_path).map_err(CheckmError::io_path("create directory", dir_path))
}


pub fn check_if_dir_exists(dir: &Path) -> Result<()> {
    if !dir.exists() {
        return Err(CheckmError::validation(format!("directory does not exist: {}",
                                                   dir.display())));
    }
    if !dir.is_dir() {
        return Err(CheckmError::validation(format!("{} is not a directory", dir.display())));
    }
    Ok(())
}


pub fn load_file_lines(filename: &Path) -> Result<Vec<String>> {
    let file = File::open(filename).map_err(CheckmError::io_path("open file", filename))?;
    let reader = BufReader::new(file);
    reader.lines().map(|line_result| {
        line_result.map_err(CheckmError::io_path("read line from", filename))
    }).collect()
}


#[cfg(not(test))]
pub fn quit_with_error(text: &str) -> ! {
    // For friendly error messages, this function normally just prints the error and quits.
    eprintln!();
    eprintln!("Error: {}", text);
    std::process::exit(1);
}
#[cfg(test)]
pub fn quit_with_error(text: &str) -> ! {
    // But when running unit tests, this function instead panics so I can catch it for the test.
    panic!("{}", text);
}


pub fn list_dir_files(dir: &Path) -> Result<Vec<PathBuf>> {
    // Regular files directly inside dir, in the order the filesystem enumerates them.
    let entries = read_dir(dir).map_err(CheckmError::io_path("read directory", dir))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(CheckmError::io_path("read directory", dir))?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    Ok(files)
}


pub fn files_with_extension(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    Ok(list_dir_files(dir)?.into_iter()
        .filter(|p| p.extension().is_some_and(|e| e == extension)).collect())
}


pub fn is_file_gzipped(filename: &Path) -> Result<bool> {
    // True if the file starts with the two gzip magic bytes. Files shorter than two bytes are
    // not gzipped.
    let file = File::open(filename).map_err(CheckmError::io_path("open", filename))?;
    let mut reader = BufReader::new(file);
    let mut buf = [0u8; 2];
    match reader.read_exact(&mut buf) {
        Ok(_)  => Ok(buf[0] == 31 && buf[1] == 139),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(CheckmError::io(format!("failed to read {}", filename.display()), e)),
    }
}


pub fn unique_suffix() -> String {
    // Millisecond timestamp plus a short random token, so two runs started in the same
    // millisecond still get separate scratch trees.
    let token: String = rand::rng().sample_iter(&Alphanumeric).take(6).map(char::from)
                                   .collect::<String>().to_lowercase();
    format!("{}_{}", Local::now().timestamp_millis(), token)
}


pub fn format_duration(duration: Duration) -> String {
    let microseconds = duration.as_micros() % 1000000;
    let seconds =      duration.as_micros() / 1000000 % 60;
    let minutes =      duration.as_micros() / 1000000 / 60 % 60;
    let hours =        duration.as_micros() / 1000000 / 60 / 60;
    format!("{}:{:02}:{:02}.{:06}", hours, minutes, seconds, microseconds)
}


pub fn spinner(message: &str) -> ProgressBar {
    if cfg!(test) {
        ProgressBar::hidden() // don't show a spinner during unit tests
    } else {
        let pb = ProgressBar::new_spinner();
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_style(
            ProgressStyle::default_spinner()
                .tick_strings(&["⠋", "⠙", "⠚", "⠞", "⠖", "⠦", "⠴", "⠲", "⠳", "⠓"])
                .template("{spinner} {msg} [{elapsed}]").unwrap(),
        );
        pb.set_message(message.to_string());
        pb
    }
}
