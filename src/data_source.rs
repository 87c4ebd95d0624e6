// This file contains the interface to wherever input sequences come from, plus a local
// filesystem implementation of it.

// Copyright 2026 the checkm-runner authors

// This file is part of checkm-runner. checkm-runner is free software: you can redistribute it
// and/or modify it under the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option) any later version.
// checkm-runner is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See
// the GNU General Public License for more details. You should have received a copy of the GNU
// General Public License along with checkm-runner. If not, see <http://www.gnu.org/licenses/>.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CheckmError, Result};
use crate::misc::{create_dir, list_dir_files, unique_suffix};


pub const ASSEMBLY_TYPE: &str = "KBaseGenomeAnnotations.Assembly";
pub const CONTIG_SET_TYPE: &str = "KBaseGenomes.ContigSet";
pub const BINNED_CONTIGS_TYPE: &str = "KBaseMetagenomes.BinnedContigs";
pub const GENOME_TYPE: &str = "KBaseGenomes.Genome";

pub const FASTA_EXTENSIONS: [&str; 9] = ["fasta", "fas", "fa", "fsa", "seq", "fna", "ffn", "faa",
                                         "frn"];
const GENBANK_EXTENSIONS: [&str; 3] = ["gbk", "gbff", "genbank"];


#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    pub name: String,
    /// Type string, possibly with a version suffix (e.g. "KBaseMetagenomes.BinnedContigs-1.0").
    pub type_string: String,
}

impl ObjectInfo {
    pub fn kind(&self) -> DataKind {
        DataKind::from_type_string(&self.type_string)
    }
}


#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataKind {
    Assembly,
    BinnedContigs,
    Genome,
    Unsupported(String),
}

impl DataKind {
    pub fn from_type_string(type_string: &str) -> Self {
        let type_name = type_string.split('-').next().unwrap_or("");
        match type_name {
            ASSEMBLY_TYPE | CONTIG_SET_TYPE => DataKind::Assembly,
            BINNED_CONTIGS_TYPE             => DataKind::BinnedContigs,
            GENOME_TYPE                     => DataKind::Genome,
            other                           => DataKind::Unsupported(other.to_string()),
        }
    }
}


/// The two retrieval calls are disjoint: which one applies depends on the object's type.
pub trait DataSource {
    fn object_info(&self, input_ref: &str) -> Result<ObjectInfo>;

    /// Writes the assembly as a single FASTA file at `filename`.
    fn assembly_to_fasta(&self, input_ref: &str, filename: &Path) -> Result<()>;

    /// Writes one FASTA file per bin into a new directory under `scratch` and returns it.
    fn binned_contigs_to_dir(&self, input_ref: &str, scratch: &Path) -> Result<PathBuf>;
}


/// Treats a reference as a filesystem path: a directory is a set of binned contigs and a FASTA
/// file is an assembly.
pub struct LocalDataSource;

impl DataSource for LocalDataSource {
    fn object_info(&self, input_ref: &str) -> Result<ObjectInfo> {
        let path = Path::new(input_ref);
        if !path.exists() {
            return Err(CheckmError::staging(format!("input does not exist: {}", input_ref)));
        }
        let name = object_name(path);
        let type_string = if path.is_dir() {
            BINNED_CONTIGS_TYPE.to_string()
        } else if has_extension_in(path, &FASTA_EXTENSIONS) {
            ASSEMBLY_TYPE.to_string()
        } else if has_extension_in(path, &GENBANK_EXTENSIONS) {
            GENOME_TYPE.to_string()
        } else {
            format!("Unknown.File({})", path.extension().unwrap_or_default().to_string_lossy())
        };
        Ok(ObjectInfo { name, type_string })
    }

    fn assembly_to_fasta(&self, input_ref: &str, filename: &Path) -> Result<()> {
        let source = Path::new(input_ref);
        if crate::misc::is_file_gzipped(source)? {
            let file = fs::File::open(source).map_err(CheckmError::io_path("open", source))?;
            let mut decoder = flate2::read::MultiGzDecoder::new(file);
            let mut out = fs::File::create(filename)
                .map_err(CheckmError::io_path("create", filename))?;
            std::io::copy(&mut decoder, &mut out)
                .map_err(CheckmError::io_path("decompress", source))?;
        } else {
            fs::copy(source, filename).map_err(CheckmError::io_path("copy", source))?;
        }
        Ok(())
    }

    fn binned_contigs_to_dir(&self, input_ref: &str, scratch: &Path) -> Result<PathBuf> {
        let source = Path::new(input_ref);
        let bin_file_dir = scratch.join(format!("binned_contigs_{}", unique_suffix()));
        create_dir(&bin_file_dir)?;
        for file in list_dir_files(source)? {
            if let Some(file_name) = file.file_name() {
                fs::copy(&file, bin_file_dir.join(file_name))
                    .map_err(CheckmError::io_path("copy", &file))?;
            }
        }
        Ok(bin_file_dir)
    }
}


fn object_name(path: &Path) -> String {
    // File name without any .gz and FASTA extension, e.g. "assembly.fasta.gz" -> "assembly".
    let mut name = path.file_name().unwrap_or_default().to_string_lossy().into_owned();
    if let Some(stripped) = name.strip_suffix(".gz") {
        name = stripped.to_string();
    }
    if let Some((stem, ext)) = name.rsplit_once('.') {
        if !stem.is_empty() && (FASTA_EXTENSIONS.contains(&ext) ||
                                GENBANK_EXTENSIONS.contains(&ext)) {
            name = stem.to_string();
        }
    }
    name
}


fn has_extension_in(path: &Path, extensions: &[&str]) -> bool {
    let name = path.file_name().unwrap_or_default().to_string_lossy().into_owned();
    let name = name.strip_suffix(".gz").unwrap_or(name.as_str());
    match name.rsplit_once('.') {
        Some((_, ext)) => extensions.contains(&ext),
        None           => false,
    }
}
