// This file contains the code for running external programs as child processes.

// Copyright 2026 the checkm-runner authors

// This file is part of checkm-runner. checkm-runner is free software: you can redistribute it
// and/or modify it under the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option) any later version.
// checkm-runner is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See
// the GNU General Public License for more details. You should have received a copy of the GNU
// General Public License along with checkm-runner. If not, see <http://www.gnu.org/licenses/>.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Instant;
use which::which;

use crate::command::CommandInvocation;
use crate::error::{CheckmError, Result};
use crate::log::log_message;
use crate::misc::{check_if_dir_exists, format_duration, spinner};


#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub exit_code: i32,
    /// Where stdout and stderr went, if they were redirected.
    pub log_file: Option<PathBuf>,
}


/// Runs the command in working_dir and waits for it to finish. The arguments go straight to the
/// child (no shell). With a log_file, stdout and stderr are both written there instead of to
/// this process's terminal, which keeps memory flat for subcommands that print a line per
/// sequence.
pub fn run_command(command: &CommandInvocation, working_dir: &Path, log_file: Option<&Path>)
        -> Result<ExecutionResult> {
    check_if_dir_exists(working_dir)?;
    log_message(&format!("running command: {}", command));
    let start_time = Instant::now();

    let mut child_command = Command::new(&command.program);
    child_command.args(&command.args).current_dir(working_dir).stdin(Stdio::null());
    let pb = if let Some(log_file) = log_file {
        log_message(&format!("output redirected to {}", log_file.display()));
        let out = File::create(log_file).map_err(CheckmError::io_path("create", log_file))?;
        let err = out.try_clone().map_err(CheckmError::io_path("open", log_file))?;
        child_command.stdout(Stdio::from(out)).stderr(Stdio::from(err));
        Some(spinner(&format!("running {}...", command.args.first()
                                                       .unwrap_or(&command.program))))
    } else {
        None
    };

    let status = child_command.status();
    if let Some(pb) = pb { pb.finish_and_clear(); }
    let status = status.map_err(|e| CheckmError::io(format!("failed to start command: {}",
                                                            command), e))?;

    // A process killed by a signal has no exit code.
    let exit_code = status.code().unwrap_or(-1);
    if exit_code != 0 {
        return Err(CheckmError::Execution { command: command.to_string(), code: exit_code });
    }
    log_message(&format!("finished command (exit code 0, {}): {}",
                         format_duration(start_time.elapsed()), command));
    Ok(ExecutionResult { exit_code, log_file: log_file.map(Path::to_path_buf) })
}


pub fn check_requirements(programs: &[&str]) -> Result<()> {
    for program in programs {
        if which(program).is_err() {
            return Err(CheckmError::validation(
                format!("required program '{}' not found in $PATH", program)));
        }
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::read_to_string;
    use tempfile::tempdir;

    fn command(program: &str, args: &[&str]) -> CommandInvocation {
        CommandInvocation::new(program, args.iter().map(|a| a.to_string()).collect())
    }

    #[test]
    fn test_success() {
        let dir = tempdir().unwrap();
        let result = run_command(&command("true", &[]), dir.path(), None).unwrap();
        assert_eq!(result, ExecutionResult { exit_code: 0, log_file: None });
    }

    #[test]
    fn test_failure() {
        let dir = tempdir().unwrap();
        let err = run_command(&command("false", &[]), dir.path(), None).unwrap_err();
        match &err {
            CheckmError::Execution { command, code } => {
                assert_eq!(command, "false");
                assert_eq!(*code, 1);
            }
            _ => panic!("unexpected error: {}", err),
        }
        assert!(err.to_string().contains("false"));
        assert!(err.to_string().contains("1"));
    }

    #[test]
    fn test_failure_message_has_full_command() {
        let dir = tempdir().unwrap();
        let err = run_command(&command("sh", &["-c", "exit 3"]), dir.path(), None).unwrap_err();
        assert!(err.to_string().contains("sh -c exit 3"));
        assert!(err.to_string().contains("exit code: 3"));
    }

    #[test]
    fn test_working_dir() {
        let dir = tempdir().unwrap();
        run_command(&command("touch", &["made_here"]), dir.path(), None).unwrap();
        assert!(dir.path().join("made_here").is_file());
    }

    #[test]
    fn test_no_shell_interpretation() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("echo.log");
        run_command(&command("echo", &["$HOME", "a;b", "*"]), dir.path(), Some(&log)).unwrap();
        assert_eq!(read_to_string(&log).unwrap(), "$HOME a;b *\n");
    }

    #[test]
    fn test_log_file_captures_stdout_and_stderr() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("both.log");
        let result = run_command(&command("sh", &["-c", "echo out; echo err 1>&2"]),
                                 dir.path(), Some(&log)).unwrap();
        assert_eq!(result.log_file, Some(log.clone()));
        let contents = read_to_string(&log).unwrap();
        assert!(contents.contains("out\n"));
        assert!(contents.contains("err\n"));
    }

    #[test]
    fn test_missing_program() {
        let dir = tempdir().unwrap();
        let err = run_command(&command("no_such_program_xyz", &[]), dir.path(), None);
        assert!(matches!(err, Err(CheckmError::Io { .. })));
    }

    #[test]
    fn test_missing_working_dir() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing");
        assert!(run_command(&command("true", &[]), &missing, None).is_err());
    }

    #[test]
    fn test_check_requirements() {
        assert!(check_requirements(&["sh"]).is_ok());
        assert!(check_requirements(&["no_such_program_xyz"]).is_err());
    }
}
