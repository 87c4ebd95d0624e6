// This file contains the code that puts input sequences on disk the way CheckM wants them: one
// FASTA file per bin in a single directory, all sharing one extension.

// Copyright 2026 the checkm-runner authors

// This file is part of checkm-runner. checkm-runner is free software: you can redistribute it
// and/or modify it under the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option) any later version.
// checkm-runner is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See
// the GNU General Public License for more details. You should have received a copy of the GNU
// General Public License along with checkm-runner. If not, see <http://www.gnu.org/licenses/>.

use flate2::read::MultiGzDecoder;
use serde::Serialize;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::data_source::{DataKind, DataSource, FASTA_EXTENSIONS};
use crate::error::{CheckmError, Result};
use crate::log::{explanation, log_message, section_header};
use crate::misc::{create_dir, files_with_extension, is_file_gzipped, list_dir_files,
                  unique_suffix};


#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct StagedInput {
    /// Name of the input object, used to title the report.
    pub object_name: String,
    pub input_dir: PathBuf,
    pub all_seq_fasta: PathBuf,
    pub suffix: String,
    pub extension: String,
    /// Bin names (file stems), in directory listing order.
    pub bins: Vec<String>,
}


pub struct InputStager<'a> {
    config: &'a Config,
    data_source: &'a dyn DataSource,
}

impl<'a> InputStager<'a> {
    pub fn new(config: &'a Config, data_source: &'a dyn DataSource) -> Self {
        InputStager { config, data_source }
    }

    /// Creates scratch/bins_<suffix> holding one <bin>.<extension> file per bin, plus
    /// scratch/all_sequences_<suffix>.<extension> holding all of them concatenated. A failure
    /// part-way leaves whatever was already created in place.
    pub fn stage(&self, input_ref: &str, extension: &str) -> Result<StagedInput> {
        section_header("Staging input");
        explanation("The input sequences are now copied to the scratch directory as one FASTA \
                     file per bin, and all bins are concatenated into a single FASTA file.");
        let scratch = &self.config.scratch;
        let suffix = unique_suffix();
        let input_dir = scratch.join(format!("bins_{}", suffix));
        let all_seq_fasta = scratch.join(format!("all_sequences_{}.{}", suffix, extension));

        let info = self.data_source.object_info(input_ref)?;
        log_message(&format!("input {} is '{}' of type {}", input_ref, info.name,
                             info.type_string));
        match info.kind() {
            DataKind::Assembly => {
                create_dir(&input_dir)?;
                let filename = input_dir.join(format!("{}.{}", info.name, extension));
                self.data_source.assembly_to_fasta(input_ref, &filename)?;
                if !filename.is_file() {
                    return Err(CheckmError::staging(
                        "error generating FASTA file from an assembly"));
                }
            }
            DataKind::BinnedContigs => {
                let bin_file_dir = self.data_source.binned_contigs_to_dir(input_ref, scratch)?;
                fs::rename(&bin_file_dir, &input_dir)
                    .map_err(CheckmError::io_path("move bin directory", &bin_file_dir))?;
                decompress_gzipped_files(&input_dir)?;
                set_fasta_file_extensions(&input_dir, extension)?;
            }
            DataKind::Genome => {
                return Err(CheckmError::staging(
                    format!("cannot yet stage a bin directory from {}", info.type_string)));
            }
            DataKind::Unsupported(type_name) => {
                return Err(CheckmError::staging(
                    format!("cannot stage a bin directory from type: {}", type_name)));
            }
        }

        let bins = check_fasta_files(&input_dir, extension)?;
        cat_fasta_files(&input_dir, extension, &all_seq_fasta)?;
        log_message(&format!("staged {} bin{} in {}", bins.len(),
                             if bins.len() == 1 { "" } else { "s" }, input_dir.display()));
        Ok(StagedInput { object_name: info.name, input_dir, all_seq_fasta, suffix,
                         extension: extension.to_string(), bins })
    }
}


/// Gives every file with a recognised FASTA extension the new extension and returns how many
/// were renamed. Files with any other extension are left alone. A rename onto an existing file
/// replaces it.
pub fn set_fasta_file_extensions(folder: &Path, new_extension: &str) -> Result<usize> {
    let mut renamed = 0;
    for file in list_dir_files(folder)? {
        let extension = file.extension().unwrap_or_default().to_string_lossy().into_owned();
        if !FASTA_EXTENSIONS.contains(&extension.as_str()) || extension == new_extension {
            continue;
        }
        let new_file = file.with_extension(new_extension);
        fs::rename(&file, &new_file).map_err(CheckmError::io_path("rename", &file))?;
        renamed += 1;
    }
    Ok(renamed)
}


/// Replaces each gzipped *.gz file in the folder with its decompressed contents (same name minus
/// the .gz).
pub fn decompress_gzipped_files(folder: &Path) -> Result<()> {
    for file in list_dir_files(folder)? {
        if !file.extension().is_some_and(|e| e == "gz") || !is_file_gzipped(&file)? {
            continue;
        }
        let out_file = file.with_extension("");
        log_message(&format!("decompressing {}", file.display()));
        let mut decoder = MultiGzDecoder::new(File::open(&file)
                                                  .map_err(CheckmError::io_path("open", &file))?);
        let mut out = File::create(&out_file).map_err(CheckmError::io_path("create",
                                                                          &out_file))?;
        io::copy(&mut decoder, &mut out).map_err(CheckmError::io_path("decompress", &file))?;
        fs::remove_file(&file).map_err(CheckmError::io_path("remove", &file))?;
    }
    Ok(())
}


/// Concatenates every *.<extension> file in the folder, in listing order, into output_fasta.
pub fn cat_fasta_files(folder: &Path, extension: &str, output_fasta: &Path) -> Result<()> {
    let files = files_with_extension(folder, extension)?;
    let mut out = File::create(output_fasta).map_err(|e| CheckmError::staging(
        format!("failed to create {}\n{}", output_fasta.display(), e)))?;
    for file in &files {
        let mut input = File::open(file).map_err(|e| CheckmError::staging(
            format!("failed to open {}\n{}", file.display(), e)))?;
        io::copy(&mut input, &mut out).map_err(|e| CheckmError::staging(
            format!("failed to append {} to {}\n{}", file.display(), output_fasta.display(), e)))?;
    }
    Ok(())
}


fn check_fasta_files(folder: &Path, extension: &str) -> Result<Vec<String>> {
    // Each bin must be readable FASTA with at least one record. Returns the bin names.
    let files = files_with_extension(folder, extension)?;
    if files.is_empty() {
        return Err(CheckmError::staging(format!("no *.{} files found in {}", extension,
                                                folder.display())));
    }
    let mut bins = Vec::with_capacity(files.len());
    for file in files {
        let mut reader = seq_io::fasta::Reader::from_path(&file)
            .map_err(CheckmError::io_path("open", &file))?;
        let mut record_count = 0;
        while let Some(record) = reader.next() {
            record.map_err(|e| CheckmError::staging(
                format!("{} is not valid FASTA\n{}", file.display(), e)))?;
            record_count += 1;
        }
        if record_count == 0 {
            return Err(CheckmError::staging(format!("{} contains no sequences",
                                                    file.display())));
        }
        bins.push(file.file_stem().unwrap_or_default().to_string_lossy().into_owned());
    }
    Ok(bins)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_source::LocalDataSource;
    use crate::tests::{make_gzipped_test_file, make_test_file};
    use std::collections::HashSet;
    use tempfile::tempdir;

    fn test_config(scratch: &Path) -> Config {
        Config::new(scratch).finalise().unwrap()
    }

    #[test]
    fn test_set_fasta_file_extensions() {
        let dir = tempdir().unwrap();
        for name in ["a.fasta", "b.fa", "c.fna", "d.fsa", "e.txt", "f"] {
            make_test_file(&dir.path().join(name), ">x\nACGT\n");
        }
        assert_eq!(set_fasta_file_extensions(dir.path(), "fna").unwrap(), 3);
        let names: HashSet<String> = list_dir_files(dir.path()).unwrap().iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned()).collect();
        let expected: HashSet<String> = ["a.fna", "b.fna", "c.fna", "d.fna", "e.txt", "f"]
            .iter().map(|s| s.to_string()).collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn test_set_fasta_file_extensions_keeps_dotted_stem() {
        let dir = tempdir().unwrap();
        make_test_file(&dir.path().join("out_header.001.fasta"), ">x\nACGT\n");
        set_fasta_file_extensions(dir.path(), "strange_fasta_extension").unwrap();
        assert!(dir.path().join("out_header.001.strange_fasta_extension").is_file());
    }

    #[test]
    fn test_cat_fasta_files() {
        let dir = tempdir().unwrap();
        make_test_file(&dir.path().join("a.fna"), ">a\nAAAA\n");
        make_test_file(&dir.path().join("b.fna"), ">b\nCCCC\nGG\n");
        make_test_file(&dir.path().join("c.txt"), "not included");
        let out = dir.path().join("all.fasta");
        cat_fasta_files(dir.path(), "fna", &out).unwrap();
        let contents = fs::read_to_string(&out).unwrap();
        assert_eq!(contents.len(), 8 + 11);
        assert!(contents.contains(">a\nAAAA\n"));
        assert!(contents.contains(">b\nCCCC\nGG\n"));
    }

    #[test]
    fn test_check_fasta_files() {
        let dir = tempdir().unwrap();
        make_test_file(&dir.path().join("bin1.fna"), ">a\nAAAA\n>b\nCC\n");
        assert_eq!(check_fasta_files(dir.path(), "fna").unwrap(), vec!["bin1"]);
        make_test_file(&dir.path().join("bin2.fna"), "");
        assert!(check_fasta_files(dir.path(), "fna").is_err());
        let empty = tempdir().unwrap();
        assert!(check_fasta_files(empty.path(), "fna").is_err());
    }

    #[test]
    fn test_stage_binned_contigs() {
        let bins = tempdir().unwrap();
        let scratch = tempdir().unwrap();
        let contents = [("bin.001.fasta", ">c1\nACGTACGT\n"), ("bin.002.fa", ">c2\nGGGG\n>c3\nTT\n"),
                        ("bin.003.fna", ">c4\nA\n"), ("bin.004.fasta.gz", ">c5\nCCCCC\n")];
        for (name, seq) in contents {
            if name.ends_with(".gz") {
                make_gzipped_test_file(&bins.path().join(name), seq);
            } else {
                make_test_file(&bins.path().join(name), seq);
            }
        }
        let config = test_config(scratch.path());
        let staged = InputStager::new(&config, &LocalDataSource)
            .stage(bins.path().to_str().unwrap(), "fna").unwrap();

        assert!(staged.input_dir.starts_with(&config.scratch));
        assert!(staged.input_dir.ends_with(format!("bins_{}", staged.suffix)));
        for i in 1..=4 {
            assert!(staged.input_dir.join(format!("bin.00{}.fna", i)).is_file());
        }
        assert_eq!(list_dir_files(&staged.input_dir).unwrap().len(), 4);
        let mut bin_names = staged.bins.clone();
        bin_names.sort();
        assert_eq!(bin_names, vec!["bin.001", "bin.002", "bin.003", "bin.004"]);

        let total: usize = contents.iter().map(|(_, seq)| seq.len()).sum();
        assert_eq!(fs::metadata(&staged.all_seq_fasta).unwrap().len() as usize, total);
        assert_eq!(staged.all_seq_fasta.file_name().unwrap().to_string_lossy(),
                   format!("all_sequences_{}.fna", staged.suffix));
    }

    #[test]
    fn test_stage_assembly() {
        let input = tempdir().unwrap();
        let scratch = tempdir().unwrap();
        let assembly = input.path().join("MyMetagenomeAssembly.fasta");
        make_test_file(&assembly, ">contig_1\nACGTACGTAC\n>contig_2\nGGCC\n");
        let config = test_config(scratch.path());
        let staged = InputStager::new(&config, &LocalDataSource)
            .stage(assembly.to_str().unwrap(), "strange_fasta_extension").unwrap();
        assert!(staged.input_dir.is_dir());
        assert!(staged.all_seq_fasta.is_file());
        assert!(staged.input_dir.join("MyMetagenomeAssembly.strange_fasta_extension").is_file());
        assert_eq!(staged.bins, vec!["MyMetagenomeAssembly"]);
        assert_eq!(staged.object_name, "MyMetagenomeAssembly");
        assert_eq!(fs::read_to_string(&staged.all_seq_fasta).unwrap(),
                   fs::read_to_string(&assembly).unwrap());
    }

    #[test]
    fn test_stage_unsupported() {
        let input = tempdir().unwrap();
        let scratch = tempdir().unwrap();
        let genome = input.path().join("genome.gbk");
        let reads = input.path().join("reads.fastq");
        make_test_file(&genome, "LOCUS\n");
        make_test_file(&reads, "@r\nACGT\n+\nIIII\n");
        let config = test_config(scratch.path());
        let stager = InputStager::new(&config, &LocalDataSource);
        let err = stager.stage(genome.to_str().unwrap(), "fna").unwrap_err();
        assert!(matches!(err, CheckmError::Staging(_)));
        assert!(err.to_string().contains("KBaseGenomes.Genome"));
        assert!(matches!(stager.stage(reads.to_str().unwrap(), "fna"),
                         Err(CheckmError::Staging(_))));
    }

    #[test]
    fn test_repeated_staging_is_disjoint() {
        let bins = tempdir().unwrap();
        let scratch = tempdir().unwrap();
        make_test_file(&bins.path().join("bin.001.fasta"), ">c1\nACGT\n");
        make_test_file(&bins.path().join("bin.002.fasta"), ">c2\nACGT\n");
        let config = test_config(scratch.path());
        let stager = InputStager::new(&config, &LocalDataSource);
        let a = stager.stage(bins.path().to_str().unwrap(), "fna").unwrap();
        let b = stager.stage(bins.path().to_str().unwrap(), "fna").unwrap();
        assert_ne!(a.suffix, b.suffix);
        assert_ne!(a.input_dir, b.input_dir);
        assert_ne!(a.all_seq_fasta, b.all_seq_fasta);
        assert!(!a.input_dir.starts_with(&b.input_dir) && !b.input_dir.starts_with(&a.input_dir));
        assert_eq!(list_dir_files(&a.input_dir).unwrap().len(), 2);
        assert_eq!(list_dir_files(&b.input_dir).unwrap().len(), 2);
    }

    #[test]
    fn test_concurrent_staging_is_disjoint() {
        let bins = tempdir().unwrap();
        let scratch = tempdir().unwrap();
        for i in 1..=3 {
            make_test_file(&bins.path().join(format!("bin.00{}.fasta", i)), ">c\nACGT\n");
        }
        let config = test_config(scratch.path());
        let input_ref = bins.path().to_str().unwrap();
        let (a, b) = std::thread::scope(|s| {
            let stage = || InputStager::new(&config, &LocalDataSource)
                .stage(input_ref, "fna").unwrap();
            let a = s.spawn(stage);
            let b = s.spawn(stage);
            (a.join().unwrap(), b.join().unwrap())
        });
        assert_ne!(a.suffix, b.suffix);
        assert_ne!(a.input_dir, b.input_dir);
        assert_ne!(a.all_seq_fasta, b.all_seq_fasta);
        for staged in [&a, &b] {
            assert_eq!(list_dir_files(&staged.input_dir).unwrap().len(), 3);
            assert_eq!(staged.bins.len(), 3);
            assert!(staged.all_seq_fasta.is_file());
        }
    }
}
