// specsplit: Assign reads aligned against related species to their source.
//
// Copyright 2025 Tommi Mäklin [tommi@maklin.fi].
//
// Copyrights in this project are retained by contributors. No copyright assignment
// is required to contribute to this project.
//
// Except as otherwise noted (below and/or in individual files), this
// project is licensed under the Apache License, Version 2.0
// <LICENSE-APACHE> or <http://www.apache.org/licenses/LICENSE-2.0> or
// the MIT license, <LICENSE-MIT> or <http://opensource.org/licenses/MIT>,
// at your option.
//

//! specsplit is a library and a command-line client for separating reads
//! from a sample that contains material from several related species, eg.
//! a human tumour grown in a mouse.
//!
//! The reads are aligned against the reference of each species separately.
//! specsplit takes the alignments, one BAM file per species, and decides for
//! each read which single species it most plausibly came from. The hits of
//! the read are written to the output of that species and dropped from all
//! others. Reads that fit no species well enough are rejected and reads
//! that fit several species equally well are marked ambiguous.
//!
//! The following inputs are supported, selected with [DataType]:
//!   - RNA-seq alignments from [STAR](https://github.com/alexdobin/STAR).
//!   - DNA-seq alignments from [Bowtie2](https://github.com/BenLangmead/bowtie2).
//!   - Bisulfite alignments from [Bismark](https://github.com/FelixKrueger/Bismark).
//!
//! The input BAM files must be sorted by query name (`samtools sort -n`),
//! using the same byte-wise ordering in every file.
//!
//! ## Usage
//!
//! ### Command line
//!
//! The specsplit CLI supports the following subcommands:
//!   - `specsplit filter` assign the reads of one sample.
//!   - `specsplit summary-header` write the header line of a summary file.
//!
//! ### Rust API
//!
//! [filter_files] runs a filter job on BAM files on disk and appends the
//! counts to a summary file. [filter_streams] does the same for anything that
//! implements [Read] and [Write].
//!
//! The building blocks are also available separately:
//!
//!   - [SamReader](parser::SamReader): reads alignment records from BAM input.
//!   - [HitsGroups](parser::group::HitsGroups): collects the records of each read.
//!   - [HitsInfo](hits::HitsInfo): summarises the primary hits of a read.
//!   - [ThresholdChecker](hits::threshold::ThresholdChecker): checks the hits against the thresholds.
//!   - [HitsChecker](hits::checker::HitsChecker): chooses a species for a read.
//!   - [SpeciesFilterer](filterer::SpeciesFilterer): input, output and counts for one species.
//!   - [MergeDriver](merge::MergeDriver): the merge over all species.
//!

use std::fs::File;
use std::io::BufReader;
use std::io::BufWriter;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

pub mod error;
pub mod filterer;
pub mod hits;
pub mod merge;
pub mod params;
pub mod parser;
pub mod printer;
pub mod stats;

use error::FilterError;
use filterer::SpeciesFilterer;
use merge::MergeDriver;
use params::FilterParams;
use stats::Statistics;

type E = Box<dyn std::error::Error>;

/// Supported aligner outputs.
///
/// Each data type reads the mismatch count, the multimap count and (for
/// bisulfite data) ambiguity from different places:
///
/// | data type | mismatches | multimaps | ambiguity |
/// |---|---|---|---|
/// | RnaSeq | `nM` | `NH` | - |
/// | DnaSeq | `XM` | hits in group | - |
/// | Bisulfite | `NM` | hits in group | `ZA` |
///
/// For paired-end data the number of hits in a group is halved.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DataType {
    #[default]
    RnaSeq,
    DnaSeq,
    Bisulfite,
}

impl std::str::FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rnaseq" => Ok(DataType::RnaSeq),
            "dnaseq" => Ok(DataType::DnaSeq),
            "bisulfite" => Ok(DataType::Bisulfite),
            _ => Err(format!("'{}' is not a valid DataType", s)),
        }
    }
}

impl DataType {
    pub fn mismatch_tag(
        &self,
    ) -> &'static [u8; 2] {
        match self {
            DataType::RnaSeq => b"nM",
            DataType::DnaSeq => b"XM",
            DataType::Bisulfite => b"NM",
        }
    }

    /// Tag holding the number of alignments, if the aligner writes one.
    pub fn multimap_tag(
        &self,
    ) -> Option<&'static [u8; 2]> {
        match self {
            DataType::RnaSeq => Some(b"NH"),
            DataType::DnaSeq | DataType::Bisulfite => None,
        }
    }

    pub fn ambiguity_tag(
        &self,
    ) -> Option<&'static [u8; 2]> {
        match self {
            DataType::Bisulfite => Some(b"ZA"),
            DataType::RnaSeq | DataType::DnaSeq => None,
        }
    }
}

/// Input and output BAM files for one species.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpeciesFiles {
    pub species: String,
    pub input: PathBuf,
    pub output: PathBuf,
}

/// Run a filter job on inputs from [Read] and write the assigned hits to [Write].
///
/// `species`, `inputs` and `outputs` are matched by position and give the
/// declared species order. Returns the counters of each species together
/// with its output.
///
/// ## Usage
///
/// ```rust
/// use specsplit::{filter_streams, DataType};
/// use specsplit::params::Strategy;
/// use std::io::Cursor;
///
/// // Two empty BAM files
/// # fn empty_bam() -> Vec<u8> {
/// #     let mut writer = noodles::bam::io::Writer::new(Vec::new());
/// #     writer.write_header(&noodles::sam::Header::default()).unwrap();
/// #     writer.into_inner().finish().unwrap()
/// # }
/// let inputs = vec![Cursor::new(empty_bam()), Cursor::new(empty_bam())];
/// let outputs: Vec<Vec<u8>> = vec![Vec::new(), Vec::new()];
/// let species = vec!["mouse".to_string(), "human".to_string()];
///
/// let params = Strategy::Best.params(DataType::RnaSeq);
/// let res = filter_streams(&params, &species, inputs, outputs).unwrap();
///
/// assert_eq!(res.len(), 2);
/// assert_eq!(res[0].0.total_reads(), 0);
/// ```
///
pub fn filter_streams<R: Read, W: Write>(
    params: &FilterParams,
    species: &[String],
    inputs: Vec<R>,
    outputs: Vec<W>,
) -> Result<Vec<(Statistics, W)>, E> {
    params.validate()?;
    if species.len() != inputs.len() || species.len() != outputs.len() {
        return error::invalid_parameter(format!("got {} species, {} inputs and {} outputs", species.len(), inputs.len(), outputs.len()))
    }

    let mut filterers: Vec<SpeciesFilterer<R, W>> = Vec::with_capacity(species.len());
    for (idx, ((name, conn_in), conn_out)) in species.iter().zip(inputs).zip(outputs).enumerate() {
        filterers.push(SpeciesFilterer::new(idx, name, params.data_type, conn_in, conn_out)?);
    }

    let mut driver = MergeDriver::new(filterers, params.threshold_checker(), params.hits_checker());
    driver.run()?;
    driver.finish()
}

fn open_input(
    path: &Path,
) -> Result<BufReader<File>, E> {
    match File::open(path) {
        Ok(file) => Ok(BufReader::new(file)),
        Err(err) => error::invalid_input(format!("could not open {}: {}", path.display(), err)),
    }
}

fn run_files(
    params: &FilterParams,
    jobs: &[SpeciesFiles],
    created: &mut Vec<PathBuf>,
) -> Result<Vec<Statistics>, E> {
    let mut inputs: Vec<BufReader<File>> = Vec::with_capacity(jobs.len());
    for job in jobs {
        inputs.push(open_input(&job.input)?);
    }

    let mut outputs: Vec<BufWriter<File>> = Vec::with_capacity(jobs.len());
    for job in jobs {
        let file = File::create(&job.output).map_err(FilterError::from)?;
        created.push(job.output.clone());
        outputs.push(BufWriter::new(file));
    }

    let species: Vec<String> = jobs.iter().map(|job| job.species.clone()).collect();
    let res = filter_streams(params, &species, inputs, outputs)?;

    let mut stats: Vec<Statistics> = Vec::with_capacity(res.len());
    for (species_stats, mut conn) in res {
        conn.flush().map_err(FilterError::from)?;
        stats.push(species_stats);
    }
    Ok(stats)
}

/// Run a filter job on BAM files and append the counts to `summary`.
///
/// Exactly one line is appended to `summary` if the job succeeds. If the
/// job fails, the output files it created are removed before the error is
/// returned.
///
pub fn filter_files(
    params: &FilterParams,
    jobs: &[SpeciesFiles],
    summary: Option<&Path>,
) -> Result<Vec<Statistics>, E> {
    log::info!("filtering {} species: {}", jobs.len(), jobs.iter().map(|job| job.species.as_str()).collect::<Vec<&str>>().join(", "));

    let mut created: Vec<PathBuf> = Vec::new();
    let res = run_files(params, jobs, &mut created).and_then(|stats| {
        if let Some(path) = summary {
            stats::append_summary_line(path, &stats)?;
        }
        Ok(stats)
    });

    if res.is_err() {
        created.iter().for_each(|path| {
            if let Err(err) = std::fs::remove_file(path) {
                log::warn!("could not remove {}: {}", path.display(), err);
            }
        });
    }

    res
}
