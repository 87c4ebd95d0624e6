// This file contains the code that turns CheckM options into a validated command line.

// Copyright 2026 the checkm-runner authors

// This file is part of checkm-runner. checkm-runner is free software: you can redistribute it
// and/or modify it under the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option) any later version.
// checkm-runner is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See
// the GNU General Public License for more details. You should have received a copy of the GNU
// General Public License along with checkm-runner. If not, see <http://www.gnu.org/licenses/>.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{CheckmError, Result};


pub const SUPPORTED_SUBCOMMANDS: [&str; 10] = ["lineage_wf", "bin_qa_plot", "tetra", "dist_plot",
                                               "gc_plot", "coding_plot", "tetra_plot",
                                               "marker_plot", "nx_plot", "len_hist"];


/// A program plus its arguments, in the exact order they will be passed to the child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandInvocation {
    pub fn new(program: &str, args: Vec<String>) -> Self {
        CommandInvocation { program: program.to_string(), args }
    }

    pub fn tokens(&self) -> Vec<String> {
        let mut tokens = Vec::with_capacity(self.args.len() + 1);
        tokens.push(self.program.clone());
        tokens.extend(self.args.iter().cloned());
        tokens
    }
}

impl fmt::Display for CommandInvocation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.tokens().join(" "))
    }
}


/// Loosely-typed options as they arrive from a caller (CLI flags or a JSON parameter object).
/// Integer flags follow the 0/1 convention of the wrapped service.
#[derive(Serialize, Deserialize, Debug, Default, Clone)]
#[serde(default)]
pub struct SubcommandOptions {
    pub subcommand: Option<String>,
    pub bin_folder: Option<PathBuf>,
    pub out_folder: Option<PathBuf>,
    pub plots_folder: Option<PathBuf>,
    pub seq_file: Option<PathBuf>,
    pub tetra_file: Option<PathBuf>,
    pub dist_value: Option<i64>,
    pub thread: Option<i64>,
    pub reduced_tree: Option<i64>,
    pub quiet: Option<i64>,
    pub extension: Option<String>,
}

impl SubcommandOptions {
    /// Joins every relative path option onto base, since CheckM runs from the scratch directory.
    pub fn resolve_paths(&mut self, base: &Path) {
        for path in [&mut self.bin_folder, &mut self.out_folder, &mut self.plots_folder,
                     &mut self.seq_file, &mut self.tetra_file].into_iter().flatten() {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}


#[derive(Debug, Clone, PartialEq)]
pub enum Subcommand {
    LineageWf  { bin_folder: PathBuf, out_folder: PathBuf, reduced_tree: bool },
    BinQaPlot  { out_folder: PathBuf, bin_folder: PathBuf, plots_folder: PathBuf },
    Tetra      { seq_file: PathBuf, tetra_file: PathBuf },
    DistPlot   { out_folder: PathBuf, bin_folder: PathBuf, plots_folder: PathBuf,
                 tetra_file: PathBuf, dist_value: u8 },
    GcPlot     { bin_folder: PathBuf, plots_folder: PathBuf, dist_value: u8 },
    CodingPlot { out_folder: PathBuf, bin_folder: PathBuf, plots_folder: PathBuf,
                 dist_value: u8 },
    TetraPlot  { out_folder: PathBuf, bin_folder: PathBuf, plots_folder: PathBuf,
                 tetra_file: PathBuf, dist_value: u8 },
    MarkerPlot { out_folder: PathBuf, bin_folder: PathBuf, plots_folder: PathBuf },
    NxPlot     { bin_folder: PathBuf, plots_folder: PathBuf },
    LenHist    { bin_folder: PathBuf, plots_folder: PathBuf },
}

impl Subcommand {
    pub fn name(&self) -> &'static str {
        match self {
            Subcommand::LineageWf { .. }  => "lineage_wf",
            Subcommand::BinQaPlot { .. }  => "bin_qa_plot",
            Subcommand::Tetra { .. }      => "tetra",
            Subcommand::DistPlot { .. }   => "dist_plot",
            Subcommand::GcPlot { .. }     => "gc_plot",
            Subcommand::CodingPlot { .. } => "coding_plot",
            Subcommand::TetraPlot { .. }  => "tetra_plot",
            Subcommand::MarkerPlot { .. } => "marker_plot",
            Subcommand::NxPlot { .. }     => "nx_plot",
            Subcommand::LenHist { .. }    => "len_hist",
        }
    }

    pub fn reads_bins(&self) -> bool {
        !matches!(self, Subcommand::Tetra { .. })
    }

    fn subcommand_flags(&self) -> Vec<String> {
        match self {
            Subcommand::LineageWf { reduced_tree: true, .. } => vec!["--reduced_tree".to_string()],
            _ => vec![],
        }
    }

    fn positional_args(&self) -> Vec<String> {
        match self {
            Subcommand::LineageWf { bin_folder, out_folder, .. } =>
                vec![arg(bin_folder), arg(out_folder)],
            Subcommand::BinQaPlot { out_folder, bin_folder, plots_folder } |
            Subcommand::MarkerPlot { out_folder, bin_folder, plots_folder } =>
                vec![arg(out_folder), arg(bin_folder), arg(plots_folder)],
            Subcommand::Tetra { seq_file, tetra_file } =>
                vec![arg(seq_file), arg(tetra_file)],
            Subcommand::DistPlot { out_folder, bin_folder, plots_folder, tetra_file, dist_value } |
            Subcommand::TetraPlot { out_folder, bin_folder, plots_folder, tetra_file, dist_value } =>
                vec![arg(out_folder), arg(bin_folder), arg(plots_folder), arg(tetra_file),
                     dist_value.to_string()],
            Subcommand::GcPlot { bin_folder, plots_folder, dist_value } =>
                vec![arg(bin_folder), arg(plots_folder), dist_value.to_string()],
            Subcommand::CodingPlot { out_folder, bin_folder, plots_folder, dist_value } =>
                vec![arg(out_folder), arg(bin_folder), arg(plots_folder), dist_value.to_string()],
            Subcommand::NxPlot { bin_folder, plots_folder } |
            Subcommand::LenHist { bin_folder, plots_folder } =>
                vec![arg(bin_folder), arg(plots_folder)],
        }
    }
}


/// Flags that every subcommand accepts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlobalFlags {
    pub threads: Option<u32>,
    pub quiet: bool,
    /// Bin file extension, only emitted for subcommands that read the bin folder.
    pub extension: Option<String>,
}


#[derive(Debug, Clone, PartialEq)]
pub struct CheckmCommand {
    pub subcommand: Subcommand,
    pub flags: GlobalFlags,
}

impl CheckmCommand {
    pub fn new(subcommand: Subcommand, flags: GlobalFlags) -> Self {
        CheckmCommand { subcommand, flags }
    }

    pub fn name(&self) -> &'static str { self.subcommand.name() }

    /// Validates loosely-typed options for the subcommand they name. Only the keys that
    /// subcommand needs are checked; keys it does not use are ignored.
    pub fn from_options(options: &SubcommandOptions) -> Result<Self> {
        let name = options.subcommand.as_deref().map(str::trim).unwrap_or("");
        if name.is_empty() {
            return Err(CheckmError::validation("a CheckM subcommand is required"));
        }
        let req = Required { name, options };
        let subcommand = match name {
            "lineage_wf" => Subcommand::LineageWf {
                bin_folder: req.bin_folder()?, out_folder: req.out_folder()?,
                reduced_tree: options.reduced_tree.unwrap_or(0) != 0,
            },
            "bin_qa_plot" => Subcommand::BinQaPlot {
                out_folder: req.out_folder()?, bin_folder: req.bin_folder()?,
                plots_folder: req.plots_folder()?,
            },
            "tetra" => Subcommand::Tetra {
                seq_file: req.seq_file()?, tetra_file: req.tetra_file()?,
            },
            "dist_plot" => Subcommand::DistPlot {
                out_folder: req.out_folder()?, bin_folder: req.bin_folder()?,
                plots_folder: req.plots_folder()?, tetra_file: req.tetra_file()?,
                dist_value: req.dist_value()?,
            },
            "gc_plot" => Subcommand::GcPlot {
                bin_folder: req.bin_folder()?, plots_folder: req.plots_folder()?,
                dist_value: req.dist_value()?,
            },
            "coding_plot" => Subcommand::CodingPlot {
                out_folder: req.out_folder()?, bin_folder: req.bin_folder()?,
                plots_folder: req.plots_folder()?, dist_value: req.dist_value()?,
            },
            "tetra_plot" => Subcommand::TetraPlot {
                out_folder: req.out_folder()?, bin_folder: req.bin_folder()?,
                plots_folder: req.plots_folder()?, tetra_file: req.tetra_file()?,
                dist_value: req.dist_value()?,
            },
            "marker_plot" => Subcommand::MarkerPlot {
                out_folder: req.out_folder()?, bin_folder: req.bin_folder()?,
                plots_folder: req.plots_folder()?,
            },
            "nx_plot" => Subcommand::NxPlot {
                bin_folder: req.bin_folder()?, plots_folder: req.plots_folder()?,
            },
            "len_hist" => Subcommand::LenHist {
                bin_folder: req.bin_folder()?, plots_folder: req.plots_folder()?,
            },
            _ => {
                return Err(CheckmError::validation(format!(
                    "'{}' is not a supported CheckM subcommand (supported: {})",
                    name, SUPPORTED_SUBCOMMANDS.join(", "))));
            }
        };
        let threads = match options.thread {
            None => None,
            Some(t) if t >= 1 && t <= u32::MAX as i64 => Some(t as u32),
            Some(t) => {
                return Err(CheckmError::validation(
                    format!("{}: thread count must be at least 1, got {}", name, t)));
            }
        };
        let flags = GlobalFlags { threads, quiet: options.quiet.unwrap_or(0) != 0,
                                  extension: options.extension.clone() };
        Ok(CheckmCommand { subcommand, flags })
    }

    /// Order: program, subcommand, universal flags, bin extension, subcommand flags,
    /// positionals. CheckM parses the positionals by position, so this order is fixed.
    pub fn build(&self, program: &str) -> CommandInvocation {
        let mut args = vec![self.name().to_string()];
        if let Some(threads) = self.flags.threads {
            args.push("-t".to_string());
            args.push(threads.to_string());
        }
        if self.flags.quiet {
            args.push("-q".to_string());
        }
        if let Some(extension) = &self.flags.extension {
            if self.subcommand.reads_bins() {
                args.push("-x".to_string());
                args.push(extension.clone());
            }
        }
        args.extend(self.subcommand.subcommand_flags());
        args.extend(self.subcommand.positional_args());
        CommandInvocation::new(program, args)
    }
}


/// Validates and builds in one step, for callers that only have a name and an option set.
pub fn build_command(program: &str, subcommand: &str, options: &SubcommandOptions)
        -> Result<CommandInvocation> {
    let mut options = options.clone();
    options.subcommand = Some(subcommand.to_string());
    Ok(CheckmCommand::from_options(&options)?.build(program))
}


struct Required<'a> {
    name: &'a str,
    options: &'a SubcommandOptions,
}

impl Required<'_> {
    fn path(&self, value: &Option<PathBuf>, concept: &str, key: &str) -> Result<PathBuf> {
        match value {
            Some(p) if !p.as_os_str().is_empty() => Ok(p.clone()),
            _ => Err(CheckmError::validation(
                format!("{} requires a {} ({})", self.name, concept, key))),
        }
    }

    fn bin_folder(&self) -> Result<PathBuf> {
        self.path(&self.options.bin_folder, "bin folder", "bin_folder")
    }

    fn out_folder(&self) -> Result<PathBuf> {
        self.path(&self.options.out_folder, "output folder", "out_folder")
    }

    fn plots_folder(&self) -> Result<PathBuf> {
        self.path(&self.options.plots_folder, "plots folder", "plots_folder")
    }

    fn seq_file(&self) -> Result<PathBuf> {
        self.path(&self.options.seq_file, "sequence file", "seq_file")
    }

    fn tetra_file(&self) -> Result<PathBuf> {
        self.path(&self.options.tetra_file, "tetra frequency file", "tetra_file")
    }

    fn dist_value(&self) -> Result<u8> {
        match self.options.dist_value {
            None => Err(CheckmError::validation(
                format!("{} requires a distribution value (dist_value)", self.name))),
            Some(v) if (0..=100).contains(&v) => Ok(v as u8),
            Some(v) => Err(CheckmError::validation(
                format!("{} requires a distribution value between 0 and 100, got {}",
                        self.name, v))),
        }
    }
}


fn arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_paths() {
        let mut options = SubcommandOptions { bin_folder: Some(PathBuf::from("bins")),
                                              out_folder: Some(PathBuf::from("/abs/output")),
                                              tetra_file: Some(PathBuf::from("../tetra.tsv")),
                                              ..Default::default() };
        options.resolve_paths(Path::new("/home/user"));
        assert_eq!(options.bin_folder, Some(PathBuf::from("/home/user/bins")));
        assert_eq!(options.out_folder, Some(PathBuf::from("/abs/output")));
        assert_eq!(options.tetra_file, Some(PathBuf::from("/home/user/../tetra.tsv")));
        assert_eq!(options.plots_folder, None);
    }

    fn all_options() -> SubcommandOptions {
        SubcommandOptions {
            subcommand: None,
            bin_folder: Some(PathBuf::from("/scratch/bins")),
            out_folder: Some(PathBuf::from("/scratch/output")),
            plots_folder: Some(PathBuf::from("/scratch/plots")),
            seq_file: Some(PathBuf::from("/scratch/all.fna")),
            tetra_file: Some(PathBuf::from("/scratch/tetra.tsv")),
            dist_value: Some(95),
            thread: None,
            reduced_tree: None,
            quiet: None,
            extension: None,
        }
    }

    fn build(name: &str, options: &SubcommandOptions) -> Vec<String> {
        build_command("checkm", name, options).unwrap().tokens()
    }

    #[test]
    fn test_lineage_wf() {
        let mut options = all_options();
        assert_eq!(build("lineage_wf", &options),
                   vec!["checkm", "lineage_wf", "/scratch/bins", "/scratch/output"]);
        options.thread = Some(4);
        options.reduced_tree = Some(1);
        options.quiet = Some(1);
        options.extension = Some("fna".to_string());
        assert_eq!(build("lineage_wf", &options),
                   vec!["checkm", "lineage_wf", "-t", "4", "-q", "-x", "fna", "--reduced_tree",
                        "/scratch/bins", "/scratch/output"]);
        options.reduced_tree = Some(0);
        assert!(!build("lineage_wf", &options).contains(&"--reduced_tree".to_string()));
    }

    #[test]
    fn test_bin_qa_plot() {
        assert_eq!(build("bin_qa_plot", &all_options()),
                   vec!["checkm", "bin_qa_plot", "/scratch/output", "/scratch/bins",
                        "/scratch/plots"]);
    }

    #[test]
    fn test_tetra() {
        let mut options = all_options();
        options.thread = Some(2);
        options.extension = Some("fna".to_string());
        // tetra does not read the bin folder, so no -x
        assert_eq!(build("tetra", &options),
                   vec!["checkm", "tetra", "-t", "2", "/scratch/all.fna", "/scratch/tetra.tsv"]);
        let only_tetra = SubcommandOptions { seq_file: Some(PathBuf::from("a.fna")),
                                             tetra_file: Some(PathBuf::from("t.tsv")),
                                             ..Default::default() };
        assert_eq!(build("tetra", &only_tetra), vec!["checkm", "tetra", "a.fna", "t.tsv"]);
    }

    #[test]
    fn test_dist_plot() {
        assert_eq!(build("dist_plot", &all_options()),
                   vec!["checkm", "dist_plot", "/scratch/output", "/scratch/bins",
                        "/scratch/plots", "/scratch/tetra.tsv", "95"]);
    }

    #[test]
    fn test_other_plots() {
        let options = all_options();
        assert_eq!(build("gc_plot", &options),
                   vec!["checkm", "gc_plot", "/scratch/bins", "/scratch/plots", "95"]);
        assert_eq!(build("coding_plot", &options),
                   vec!["checkm", "coding_plot", "/scratch/output", "/scratch/bins",
                        "/scratch/plots", "95"]);
        assert_eq!(build("tetra_plot", &options),
                   vec!["checkm", "tetra_plot", "/scratch/output", "/scratch/bins",
                        "/scratch/plots", "/scratch/tetra.tsv", "95"]);
        assert_eq!(build("marker_plot", &options),
                   vec!["checkm", "marker_plot", "/scratch/output", "/scratch/bins",
                        "/scratch/plots"]);
        assert_eq!(build("nx_plot", &options),
                   vec!["checkm", "nx_plot", "/scratch/bins", "/scratch/plots"]);
        assert_eq!(build("len_hist", &options),
                   vec!["checkm", "len_hist", "/scratch/bins", "/scratch/plots"]);
    }

    #[test]
    fn test_positionals_recover_options() {
        // Reading the tokens back by position gives the same values for every subcommand.
        let mut options = all_options();
        options.thread = Some(8);
        options.quiet = Some(1);
        for name in SUPPORTED_SUBCOMMANDS {
            let tokens = build(name, &options);
            assert_eq!(tokens[1], name);
            let mut i = 2;
            while i < tokens.len() && tokens[i].starts_with('-') {
                i += if tokens[i] == "-t" || tokens[i] == "-x" { 2 } else { 1 };
            }
            let positionals = &tokens[i..];
            for p in positionals {
                let recognised = [&options.bin_folder, &options.out_folder, &options.plots_folder,
                                  &options.seq_file, &options.tetra_file].iter()
                    .any(|o| o.as_ref().is_some_and(|v| v.to_string_lossy() == p.as_str()))
                    || p == "95";
                assert!(recognised, "{} produced unexpected token {}", name, p);
            }
            assert_eq!(&tokens[2..4], &["-t", "8"]);
            assert_eq!(tokens[4], "-q");
        }
    }

    #[test]
    fn test_missing_required_options() {
        let cases = [("lineage_wf", vec!["bin_folder", "out_folder"]),
                     ("bin_qa_plot", vec!["out_folder", "bin_folder", "plots_folder"]),
                     ("tetra", vec!["seq_file", "tetra_file"]),
                     ("dist_plot", vec!["out_folder", "bin_folder", "plots_folder", "tetra_file",
                                        "dist_value"]),
                     ("gc_plot", vec!["bin_folder", "plots_folder", "dist_value"]),
                     ("nx_plot", vec!["bin_folder", "plots_folder"])];
        for (name, keys) in cases {
            for key in keys {
                let mut options = all_options();
                match key {
                    "bin_folder"   => options.bin_folder = None,
                    "out_folder"   => options.out_folder = None,
                    "plots_folder" => options.plots_folder = None,
                    "seq_file"     => options.seq_file = None,
                    "tetra_file"   => options.tetra_file = None,
                    "dist_value"   => options.dist_value = None,
                    _ => unreachable!(),
                }
                let err = build_command("checkm", name, &options).unwrap_err();
                assert!(matches!(err, CheckmError::Validation(_)));
                let message = err.to_string();
                assert!(message.starts_with(name), "{}", message);
                assert!(message.contains(key), "{}", message);
            }
        }
    }

    #[test]
    fn test_empty_path_is_missing() {
        let mut options = all_options();
        options.bin_folder = Some(PathBuf::new());
        assert!(build_command("checkm", "lineage_wf", &options).is_err());
    }

    #[test]
    fn test_unknown_subcommand() {
        let err = build_command("checkm", "taxonomy_wf", &all_options()).unwrap_err();
        assert!(matches!(err, CheckmError::Validation(_)));
        assert!(err.to_string().contains("taxonomy_wf"));
        assert!(build_command("checkm", "", &all_options()).is_err());
        assert!(CheckmCommand::from_options(&all_options()).is_err());
    }

    #[test]
    fn test_bad_values() {
        let mut options = all_options();
        options.dist_value = Some(101);
        assert!(build_command("checkm", "dist_plot", &options).is_err());
        options.dist_value = Some(-1);
        assert!(build_command("checkm", "dist_plot", &options).is_err());
        options.dist_value = Some(0);
        assert!(build_command("checkm", "dist_plot", &options).is_ok());
        options.dist_value = Some(100);
        assert!(build_command("checkm", "dist_plot", &options).is_ok());
        options.thread = Some(0);
        assert!(build_command("checkm", "dist_plot", &options).is_err());
    }

    #[test]
    fn test_options_from_json() {
        let options: SubcommandOptions = serde_json::from_str(
            r#"{"subcommand": "tetra", "seq_file": "all.fna", "tetra_file": "tetra.tsv",
                "thread": 2, "quiet": 1}"#).unwrap();
        let command = CheckmCommand::from_options(&options).unwrap();
        assert_eq!(command.name(), "tetra");
        assert_eq!(command.flags, GlobalFlags { threads: Some(2), quiet: true, extension: None });
        assert_eq!(command.build("/usr/local/bin/checkm").to_string(),
                   "/usr/local/bin/checkm tetra -t 2 -q all.fna tetra.tsv");
    }
}
