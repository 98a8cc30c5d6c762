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
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use specsplit::DataType;
use specsplit::params::Strategy;

#[derive(Parser)]
#[command(version)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    // Assign the reads of one sample to species
    Filter {
        // Aligner output type
        #[arg(long = "data-type", default_value = "rnaseq", help = "rnaseq, dnaseq or bisulfite")]
        data_type: DataType,

        // Preset thresholds, overridden by the threshold options
        #[arg(long = "strategy", default_value = "best", help = "best, conservative, recall or permissive")]
        strategy: Strategy,

        // Thresholds
        #[arg(long = "mismatch-threshold", required = false, help = "Max mismatches as % of read length")]
        mismatch_threshold: Option<f64>,
        #[arg(long = "minmatch-threshold", required = false, help = "Max unmatched bases as % of read length")]
        minmatch_threshold: Option<f64>,
        #[arg(long = "multimap-threshold", required = false, help = "Max number of alignments per read")]
        multimap_threshold: Option<u32>,
        #[arg(long = "reject-multimaps", default_value_t = false, help = "Reject reads that multimap in any species")]
        reject_multimaps: bool,

        // Species names, input and output files, matched by position
        #[arg(short = 's', long = "species", required = true, num_args = 1..)]
        species: Vec<String>,
        #[arg(short = 'i', long = "input", required = true, num_args = 1.., help = "Name-sorted .bam file(s)")]
        input_files: Vec<PathBuf>,
        #[arg(short = 'o', long = "output", required = true, num_args = 1..)]
        output_files: Vec<PathBuf>,

        // Summary file to append the counts to
        #[arg(long = "summary", required = false)]
        summary_file: Option<PathBuf>,

        // Verbosity
        #[arg(long = "verbose", default_value_t = false)]
        verbose: bool,
    },

    // Write the header line of a summary file
    SummaryHeader {
        // Species names in the order given to `filter`
        #[arg(short = 's', long = "species", required = true, num_args = 1..)]
        species: Vec<String>,

        // Summary file, overwritten if it exists
        #[arg(long = "summary", required = true)]
        summary_file: PathBuf,

        // Verbosity
        #[arg(long = "verbose", default_value_t = false)]
        verbose: bool,
    },
}
