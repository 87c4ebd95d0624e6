// This file contains the code that runs the CheckM lineage workflow and its plots on a staged
// bin directory.

// Copyright 2026 the checkm-runner authors

// This file is part of checkm-runner. checkm-runner is free software: you can redistribute it
// and/or modify it under the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option) any later version.
// checkm-runner is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See
// the GNU General Public License for more details. You should have received a copy of the GNU
// General Public License along with checkm-runner. If not, see <http://www.gnu.org/licenses/>.

use serde::Serialize;
use std::path::PathBuf;

use crate::command::{CheckmCommand, GlobalFlags, Subcommand};
use crate::config::Config;
use crate::error::Result;
use crate::log::{explanation, section_header};
use crate::misc::create_dir;
use crate::runner::run_command;
use crate::stage::StagedInput;


pub const DIST_PLOT_PERCENTILE: u8 = 95;


#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct WorkflowOutput {
    pub output_dir: PathBuf,
    pub plots_dir: PathBuf,
    pub tetra_file: PathBuf,
    /// Holds one <subcommand>.log per step.
    pub log_dir: PathBuf,
}


pub struct WorkflowOrchestrator<'a> {
    config: &'a Config,
}

impl<'a> WorkflowOrchestrator<'a> {
    pub fn new(config: &'a Config) -> Self {
        WorkflowOrchestrator { config }
    }

    /// Runs lineage_wf, bin_qa_plot, tetra and dist_plot in that order. The output and plots
    /// directories are left for CheckM to create. The first failing step ends the workflow.
    pub fn run_full_workflow(&self, staged: &StagedInput) -> Result<WorkflowOutput> {
        section_header("Running CheckM");
        explanation("CheckM's lineage workflow now places each bin in the reference tree and \
                     estimates its completeness and contamination from lineage-specific marker \
                     genes. The bin quality and reference distribution plots are then made from \
                     its output.");
        let scratch = &self.config.scratch;
        let suffix = &staged.suffix;
        let output = WorkflowOutput {
            output_dir: scratch.join(format!("output_{}", suffix)),
            plots_dir: scratch.join(format!("plots_{}", suffix)),
            tetra_file: scratch.join(format!("tetra_{}.tsv", suffix)),
            log_dir: scratch.join(format!("logs_{}", suffix)),
        };
        create_dir(&output.log_dir)?;

        let steps = vec![
            Subcommand::LineageWf { bin_folder: staged.input_dir.clone(),
                                    out_folder: output.output_dir.clone(),
                                    reduced_tree: self.config.reduced_tree },
            Subcommand::BinQaPlot { out_folder: output.output_dir.clone(),
                                    bin_folder: staged.input_dir.clone(),
                                    plots_folder: output.plots_dir.clone() },
            Subcommand::Tetra { seq_file: staged.all_seq_fasta.clone(),
                                tetra_file: output.tetra_file.clone() },
            Subcommand::DistPlot { out_folder: output.output_dir.clone(),
                                   bin_folder: staged.input_dir.clone(),
                                   plots_folder: output.plots_dir.clone(),
                                   tetra_file: output.tetra_file.clone(),
                                   dist_value: DIST_PLOT_PERCENTILE },
        ];
        for subcommand in steps {
            self.run_step(subcommand, &staged.extension, &output)?;
        }
        eprintln!();
        Ok(output)
    }

    fn run_step(&self, subcommand: Subcommand, extension: &str, output: &WorkflowOutput)
            -> Result<()> {
        let flags = GlobalFlags { threads: self.config.threads, quiet: self.config.quiet,
                                  extension: Some(extension.to_string()) };
        let command = CheckmCommand::new(subcommand, flags);
        let log_file = output.log_dir.join(format!("{}.log", command.name()));
        let invocation = command.build(&self.config.checkm_program);
        run_command(&invocation, &self.config.scratch, Some(&log_file))?;
        Ok(())
    }
}
