// This file contains the job-level entry points: the full lineage workflow job that ends in a
// published report, and the single-subcommand and staging-only commands.

// Copyright 2026 the checkm-runner authors

// This file is part of checkm-runner. checkm-runner is free software: you can redistribute it
// and/or modify it under the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option) any later version.
// checkm-runner is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See
// the GNU General Public License for more details. You should have received a copy of the GNU
// General Public License along with checkm-runner. If not, see <http://www.gnu.org/licenses/>.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::command::{build_command, SubcommandOptions};
use crate::config::Config;
use crate::data_source::{DataSource, LocalDataSource};
use crate::error::{CheckmError, Result};
use crate::log::{explanation, log_message, section_header};
use crate::misc::quit_with_error;
use crate::output::OutputBuilder;
use crate::runner::{check_requirements, run_command, ExecutionResult};
use crate::services::{BlobStore, LocalBlobStore, LocalReportPublisher, OutputPackage,
                      PublishedReport, Report, ReportPublisher};
use crate::stage::{InputStager, StagedInput};
use crate::workflow::{WorkflowOrchestrator, WorkflowOutput};


/// Parameters of a lineage workflow job as a caller sends them. The two save flags use the 0/1
/// convention and default to 0.
#[derive(Serialize, Deserialize, Debug, Default, Clone)]
#[serde(default)]
pub struct LineageWfParams {
    pub input_ref: Option<String>,
    pub workspace_name: Option<String>,
    pub save_output_dir: Option<i64>,
    pub save_plots_dir: Option<i64>,
}


/// The collaborators a job talks to.
pub struct Services<'a> {
    pub data_source: &'a dyn DataSource,
    pub blob_store: &'a dyn BlobStore,
    pub report_publisher: &'a dyn ReportPublisher,
}


/// Everything a job produced, saved next to its other scratch files.
#[derive(Serialize, Debug)]
pub struct JobSummary {
    pub input_ref: String,
    pub workspace_name: String,
    pub staged_input: StagedInput,
    pub workflow_output: WorkflowOutput,
    pub html_links: Vec<OutputPackage>,
    pub file_links: Vec<OutputPackage>,
    pub report_name: String,
    /// Filled in once the report is published.
    pub report_ref: Option<String>,
}

impl JobSummary {
    pub fn save_to_yaml(&self, filename: &Path) -> Result<()> {
        let yaml_string = serde_yaml::to_string(self).map_err(|e| CheckmError::validation(
            format!("failed to serialise job summary\n{}", e)))?;
        fs::write(filename, yaml_string).map_err(CheckmError::io_path("write", filename))
    }
}


/// Runs the whole job: validate, stage, run CheckM, package, build the report and publish it.
/// Nothing is staged unless the parameters are complete.
pub fn run_lineage_wf_job(config: &Config, params: &LineageWfParams, services: &Services)
        -> Result<PublishedReport> {
    let (input_ref, workspace_name) = validate_params(params)?;
    check_requirements(&[config.checkm_program.as_str()])?;

    let staged = InputStager::new(config, services.data_source)
        .stage(&input_ref, &config.fasta_extension)?;
    let workflow_output = WorkflowOrchestrator::new(config).run_full_workflow(&staged)?;

    section_header("Building report");
    explanation("CheckM's output is now packaged and the HTML report is assembled.");
    let builder = OutputBuilder::new(&workflow_output.output_dir, &workflow_output.plots_dir,
                                     &config.scratch, services.blob_store);
    let mut file_links = Vec::new();
    if params.save_output_dir.unwrap_or(0) == 1 {
        file_links.push(builder.package_full_output()?);
    }
    file_links.push(builder.package_critical_output(&staged.suffix)?);
    if params.save_plots_dir.unwrap_or(0) == 1 {
        file_links.push(builder.package_plots()?);
    }
    let html_dir = config.scratch.join(format!("html_{}", staged.suffix));
    let html_links = vec![builder.build_html_report(&html_dir, &staged.object_name)?];

    let report = Report {
        message: report_message(&staged, &html_links, &file_links),
        html_links,
        file_links,
        direct_html_link_index: 0,
        report_name: format!("checkm_report_{}", staged.suffix),
        workspace_name: workspace_name.clone(),
    };
    // The summary is saved before publishing, so a failed write leaves no report behind.
    let summary_file = config.scratch.join(format!("job_summary_{}.yaml", staged.suffix));
    let mut summary = JobSummary { input_ref, workspace_name, staged_input: staged,
                                   workflow_output, html_links: report.html_links.clone(),
                                   file_links: report.file_links.clone(),
                                   report_name: report.report_name.clone(), report_ref: None };
    summary.save_to_yaml(&summary_file)?;

    let published = services.report_publisher.publish(&report)?;
    summary.report_ref = Some(published.report_ref.clone());
    match summary.save_to_yaml(&summary_file) {
        Ok(_)  => log_message(&format!("job summary written to {}", summary_file.display())),
        Err(e) => log_message(&format!("Warning! job summary not updated with the report: {}",
                                       e)),
    }
    Ok(published)
}


fn validate_params(params: &LineageWfParams) -> Result<(String, String)> {
    let required = |value: &Option<String>, name: &str| -> Result<String> {
        match value.as_deref().map(str::trim) {
            Some(v) if !v.is_empty() => Ok(v.to_string()),
            _ => Err(CheckmError::validation(
                format!("\"{}\" parameter is required, but missing", name))),
        }
    };
    let input_ref = required(&params.input_ref, "input_ref")?;
    let workspace_name = required(&params.workspace_name, "workspace_name")?;
    for (value, name) in [(params.save_output_dir, "save_output_dir"),
                          (params.save_plots_dir, "save_plots_dir")] {
        if let Some(v) = value {
            if v != 0 && v != 1 {
                return Err(CheckmError::validation(
                    format!("\"{}\" must be 0 or 1, got {}", name, v)));
            }
        }
    }
    Ok((input_ref, workspace_name))
}


fn report_message(staged: &StagedInput, html_links: &[OutputPackage],
                  file_links: &[OutputPackage]) -> String {
    let mut message = format!("CheckM lineage workflow finished for {} ({} bin{}): {}\n",
                              staged.object_name, staged.bins.len(),
                              if staged.bins.len() == 1 { "" } else { "s" },
                              staged.bins.join(", "));
    message.push_str("Packaged files:\n");
    for package in html_links.iter().chain(file_links) {
        message.push_str(&format!("  {} ({})\n", package.name, package.description));
    }
    message
}


/// Runs one CheckM subcommand described by loosely-typed options. Relative paths are taken from
/// the current directory. Thread count, reduced tree and quiet fall back to the configuration
/// when the options leave them out.
pub fn run_subcommand(config: &Config, options: &SubcommandOptions, log_file: Option<&Path>)
        -> Result<ExecutionResult> {
    let mut options = options.clone();
    let cwd = env::current_dir()
        .map_err(|e| CheckmError::io("failed to get the current directory", e))?;
    options.resolve_paths(&cwd);
    if options.thread.is_none() {
        options.thread = config.threads.map(i64::from);
    }
    if options.reduced_tree.is_none() && config.reduced_tree {
        options.reduced_tree = Some(1);
    }
    if options.quiet.is_none() && config.quiet {
        options.quiet = Some(1);
    }
    let subcommand = options.subcommand.clone().unwrap_or_default();
    let command = build_command(&config.checkm_program, &subcommand, &options)?;
    check_requirements(&[config.checkm_program.as_str()])?;
    run_command(&command, &config.scratch, log_file)
}


pub fn lineage_wf(config: Config, input_ref: String, workspace_name: String,
                  save_output_dir: bool, save_plots_dir: bool) {
    starting_message("Starting checkm-runner lineage_wf",
                     "This command stages the input bins, runs CheckM's lineage workflow and \
                      plots on them, and publishes a report with the packaged results.");
    print_settings(&config, &[("--input", input_ref.clone()),
                              ("--workspace", workspace_name.clone()),
                              ("--save_output_dir", save_output_dir.to_string()),
                              ("--save_plots_dir", save_plots_dir.to_string())]);
    let params = LineageWfParams { input_ref: Some(input_ref),
                                   workspace_name: Some(workspace_name),
                                   save_output_dir: Some(save_output_dir as i64),
                                   save_plots_dir: Some(save_plots_dir as i64) };
    let blob_store = LocalBlobStore::new(&config.blob_dir());
    let report_publisher = LocalReportPublisher::new(&config.report_dir());
    let services = Services { data_source: &LocalDataSource, blob_store: &blob_store,
                              report_publisher: &report_publisher };
    let published = run_lineage_wf_job(&config, &params, &services)
        .unwrap_or_else(|e| quit_with_error(&e.to_string()));
    let json = serde_json::to_string_pretty(&published)
        .unwrap_or_else(|e| quit_with_error(&e.to_string()));
    println!("{}", json);
    section_header("Finished!");
    eprintln!("Report name: {}", published.report_name);
    eprintln!("Report:      {}", published.report_ref);
    eprintln!();
}


pub fn run(config: Config, options: SubcommandOptions, log_file: Option<PathBuf>) {
    starting_message("Starting checkm-runner run",
                     "This command runs a single CheckM subcommand.");
    print_settings(&config, &[("--subcommand", options.subcommand.clone().unwrap_or_default()),
                              ("--log_file", log_file.as_ref()
                                                     .map(|p| p.display().to_string())
                                                     .unwrap_or_else(|| "none".to_string()))]);
    let result = run_subcommand(&config, &options, log_file.as_deref())
        .unwrap_or_else(|e| quit_with_error(&e.to_string()));
    section_header("Finished!");
    eprintln!("Exit code: {}", result.exit_code);
    if let Some(log_file) = result.log_file {
        eprintln!("Log file:  {}", log_file.display());
    }
    eprintln!();
}


pub fn stage(config: Config, input_ref: String) {
    starting_message("Starting checkm-runner stage",
                     "This command stages an input as a CheckM bin directory without running \
                      CheckM.");
    print_settings(&config, &[("--input", input_ref.clone())]);
    let staged = InputStager::new(&config, &LocalDataSource)
        .stage(&input_ref, &config.fasta_extension)
        .unwrap_or_else(|e| quit_with_error(&e.to_string()));
    section_header("Finished!");
    eprintln!("Bin directory:        {}", staged.input_dir.display());
    eprintln!("Concatenated FASTA:   {}", staged.all_seq_fasta.display());
    eprintln!("Bins:                 {}", staged.bins.join(", "));
    eprintln!();
}


fn starting_message(header: &str, text: &str) {
    section_header(header);
    explanation(text);
}


fn print_settings(config: &Config, settings: &[(&str, String)]) {
    eprintln!("Settings:");
    for (flag, value) in settings {
        eprintln!("  {} {}", flag, value);
    }
    eprintln!("  --scratch {}", config.scratch.display());
    eprintln!("  --checkm {}", config.checkm_program);
    match config.threads {
        Some(t) => eprintln!("  --threads {}", t),
        None    => eprintln!("  --threads CheckM default"),
    }
    if config.reduced_tree {
        eprintln!("  --reduced_tree");
    }
    eprintln!();
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{make_fake_checkm, make_test_bins};
    use tempfile::tempdir;

    #[test]
    fn test_validate_params() {
        let mut params = LineageWfParams { input_ref: Some("bins".to_string()),
                                           workspace_name: Some("ws".to_string()),
                                           ..Default::default() };
        assert_eq!(validate_params(&params).unwrap(), ("bins".to_string(), "ws".to_string()));
        params.save_plots_dir = Some(2);
        assert!(validate_params(&params).is_err());
        params.save_plots_dir = Some(1);
        params.workspace_name = Some("  ".to_string());
        let err = validate_params(&params).unwrap_err();
        assert!(err.to_string().contains("workspace_name"));
        params.input_ref = None;
        let err = validate_params(&params).unwrap_err();
        assert!(err.to_string().contains("input_ref"));
    }

    #[test]
    fn test_params_from_json() {
        let params: LineageWfParams = serde_json::from_str(
            r#"{"input_ref": "a/b", "workspace_name": "ws", "save_plots_dir": 1}"#).unwrap();
        assert_eq!(params.input_ref.as_deref(), Some("a/b"));
        assert_eq!(params.save_output_dir, None);
        assert_eq!(params.save_plots_dir, Some(1));
    }

    #[test]
    fn test_missing_param_stages_nothing() {
        let dir = tempdir().unwrap();
        let bins = make_test_bins(dir.path(), &["bin1"]);
        let config = Config::new(&dir.path().join("scratch")).finalise().unwrap();
        let blob_store = LocalBlobStore::new(&config.blob_dir());
        let publisher = LocalReportPublisher::new(&config.report_dir());
        let services = Services { data_source: &LocalDataSource, blob_store: &blob_store,
                                  report_publisher: &publisher };
        let params = LineageWfParams { input_ref: Some(bins.to_string_lossy().into_owned()),
                                       ..Default::default() };
        let err = run_lineage_wf_job(&config, &params, &services).unwrap_err();
        assert!(matches!(err, CheckmError::Validation(_)));
        assert_eq!(fs::read_dir(&config.scratch).unwrap().count(), 0);
    }

    #[test]
    fn test_run_subcommand() {
        let dir = tempdir().unwrap();
        let bins = make_test_bins(dir.path(), &["bin1", "bin2"]);
        let mut config = Config::new(&dir.path().join("scratch"));
        config.checkm_program = make_fake_checkm(dir.path()).to_string_lossy().into_owned();
        config.threads = Some(3);
        let config = config.finalise().unwrap();
        let options = SubcommandOptions { subcommand: Some("nx_plot".to_string()),
                                          bin_folder: Some(bins),
                                          plots_folder: Some(dir.path().join("plots")),
                                          ..Default::default() };
        let log = dir.path().join("nx_plot.log");
        let result = run_subcommand(&config, &options, Some(&log)).unwrap();
        assert_eq!(result.exit_code, 0);
        let logged = fs::read_to_string(&log).unwrap();
        assert!(logged.starts_with("nx_plot -t 3 "));

        let bad = SubcommandOptions { subcommand: Some("nx_plot".to_string()),
                                      ..Default::default() };
        assert!(matches!(run_subcommand(&config, &bad, None), Err(CheckmError::Validation(_))));
    }

    #[test]
    fn test_report_message() {
        let staged = StagedInput { object_name: "MyBins".to_string(),
                                   input_dir: PathBuf::from("/s/bins_1"),
                                   all_seq_fasta: PathBuf::from("/s/all_sequences_1.fna"),
                                   suffix: "1".to_string(), extension: "fna".to_string(),
                                   bins: vec!["a".to_string(), "b".to_string()] };
        let package = OutputPackage { handle: "h".to_string(), name: "report.html".to_string(),
                                      description: "Assembled report from CheckM".to_string() };
        let message = report_message(&staged, &[package], &[]);
        assert!(message.starts_with("CheckM lineage workflow finished for MyBins (2 bins): a, b"));
        assert!(message.contains("report.html (Assembled report from CheckM)"));
    }
}
