// This is the main file of checkm-runner and where execution starts. It mainly handles the CLI
// and then calls into other files to run whichever subcommand the user chose.

// Copyright 2026 the checkm-runner authors

// This file is part of checkm-runner. checkm-runner is free software: you can redistribute it
// and/or modify it under the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option) any later version.
// checkm-runner is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See
// the GNU General Public License for more details. You should have received a copy of the GNU
// General Public License along with checkm-runner. If not, see <http://www.gnu.org/licenses/>.

use std::path::PathBuf;
use clap::{Args, Parser, Subcommand, crate_version};

mod command;
mod config;
mod data_source;
mod error;
mod job;
mod log;
mod misc;
mod output;
mod runner;
mod services;
mod stage;
mod stats;
mod table;
mod workflow;


use crate::command::SubcommandOptions;
use crate::config::Config;
use crate::misc::quit_with_error;

#[derive(Parser)]
#[clap(name = "checkm-runner",
       version = concat!("v", crate_version!()),
       about = "stages genome bins, runs the CheckM lineage workflow and packages a report")]
#[command(author, version, long_about = None, disable_help_subcommand = true,
          propagate_version = true)]
#[clap(subcommand_required = true)]
#[clap(arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct ConfigArgs {
    /// YAML file of settings (flags given on the command line take precedence)
    #[clap(long = "config")]
    config: Option<PathBuf>,

    /// Directory for all per-run files [default: current directory]
    #[clap(long = "scratch")]
    scratch: Option<PathBuf>,

    /// CheckM executable [default: checkm]
    #[clap(long = "checkm")]
    checkm: Option<String>,

    /// Number of threads for CheckM [default: CheckM's own default]
    #[clap(short = 't', long = "threads")]
    threads: Option<u32>,

    /// Use CheckM's reduced reference tree (less memory)
    #[clap(long = "reduced_tree")]
    reduced_tree: bool,

    /// Suppress CheckM's console output
    #[clap(short = 'q', long = "quiet")]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {

    /// run the full lineage workflow job and publish a report
    #[clap(name = "lineage_wf")]
    LineageWf {
        /// Input reference: a directory of bins or an assembly FASTA (required)
        #[clap(short = 'i', long = "input", required = true)]
        input: String,

        /// Workspace to publish the report to (required)
        #[clap(short = 'w', long = "workspace", required = true)]
        workspace: String,

        /// Package and link the full CheckM output directory
        #[clap(long = "save_output_dir")]
        save_output_dir: bool,

        /// Package and link the plots directory
        #[clap(long = "save_plots_dir")]
        save_plots_dir: bool,

        /// Extension given to staged bin files
        #[clap(short = 'x', long = "extension", default_value = "fna")]
        extension: String,

        #[command(flatten)]
        config: ConfigArgs,
    },

    /// run a single CheckM subcommand
    Run {
        /// CheckM subcommand, e.g. lineage_wf, bin_qa_plot, tetra, dist_plot (required)
        #[clap(short = 's', long = "subcommand", required = true)]
        subcommand: String,

        /// Directory of bins
        #[clap(long = "bin_folder")]
        bin_folder: Option<PathBuf>,

        /// CheckM output directory
        #[clap(long = "out_folder")]
        out_folder: Option<PathBuf>,

        /// Directory for plots
        #[clap(long = "plots_folder")]
        plots_folder: Option<PathBuf>,

        /// Sequence file (for tetra)
        #[clap(long = "seq_file")]
        seq_file: Option<PathBuf>,

        /// Tetranucleotide frequency file
        #[clap(long = "tetra_file")]
        tetra_file: Option<PathBuf>,

        /// Reference distribution percentile, 0 to 100
        #[clap(long = "dist_value")]
        dist_value: Option<i64>,

        /// Extension of bin files
        #[clap(short = 'x', long = "extension")]
        extension: Option<String>,

        /// Write CheckM's stdout and stderr to this file
        #[clap(long = "log_file")]
        log_file: Option<PathBuf>,

        #[command(flatten)]
        config: ConfigArgs,
    },

    /// stage an input as a bin directory without running CheckM
    Stage {
        /// Input reference: a directory of bins or an assembly FASTA (required)
        #[clap(short = 'i', long = "input", required = true)]
        input: String,

        /// Extension given to staged bin files
        #[clap(short = 'x', long = "extension", default_value = "fna")]
        extension: String,

        #[command(flatten)]
        config: ConfigArgs,
    },

    /// print the HTML summary table for a CheckM output directory
    Table {
        /// CheckM output directory (required)
        #[clap(short = 'o', long = "out_dir", required = true)]
        out_dir: PathBuf,
    },
}


fn main() {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::LineageWf { input, workspace, save_output_dir, save_plots_dir, extension,
                                   config }) => {
            job::lineage_wf(load_config(config, Some(extension)), input, workspace,
                            save_output_dir, save_plots_dir);
        },
        Some(Commands::Run { subcommand, bin_folder, out_folder, plots_folder, seq_file,
                             tetra_file, dist_value, extension, log_file, config }) => {
            let options = SubcommandOptions { subcommand: Some(subcommand), bin_folder,
                                              out_folder, plots_folder, seq_file, tetra_file,
                                              dist_value, extension, ..Default::default() };
            job::run(load_config(config, None), options, log_file);
        },
        Some(Commands::Stage { input, extension, config }) => {
            job::stage(load_config(config, Some(extension)), input);
        },
        Some(Commands::Table { out_dir }) => {
            table::table(out_dir);
        },
        None => {}
    }
}


fn load_config(args: ConfigArgs, extension: Option<String>) -> Config {
    let mut config = match &args.config {
        Some(filename) => Config::load_yaml(filename)
            .unwrap_or_else(|e| quit_with_error(&e.to_string())),
        None => Config::default(),
    };
    if let Some(scratch) = args.scratch { config.scratch = scratch; }
    if let Some(checkm) = args.checkm   { config.checkm_program = checkm; }
    if args.threads.is_some()           { config.threads = args.threads; }
    if args.reduced_tree                { config.reduced_tree = true; }
    if args.quiet                       { config.quiet = true; }
    if let Some(extension) = extension  { config.fasta_extension = extension; }
    config.finalise().unwrap_or_else(|e| quit_with_error(&e.to_string()))
}
