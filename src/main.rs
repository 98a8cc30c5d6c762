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
use clap::CommandFactory;
use clap::Parser;

use specsplit::SpeciesFiles;
use specsplit::error::FilterError;

mod cli;

type E = Box<dyn std::error::Error>;

/// Initializes the logger with verbosity given in `log_max_level`.
fn init_log(log_max_level: usize) {
    stderrlog::new()
    .module(module_path!())
    .module("specsplit")
    .quiet(false)
    .verbosity(log_max_level)
    .timestamp(stderrlog::Timestamp::Off)
    .init()
    .unwrap();
}

fn run(cli: cli::Cli) -> Result<(), E> {
    // Subcommands:
    match cli.command {
        // Filter
        Some(cli::Commands::Filter {
            data_type,
            strategy,
            mismatch_threshold,
            minmatch_threshold,
            multimap_threshold,
            reject_multimaps,
            species,
            input_files,
            output_files,
            summary_file,
            verbose,
        }) => {
            init_log(if verbose { 2 } else { 1 });

            let params = strategy.params(data_type).with_overrides(mismatch_threshold, minmatch_threshold, multimap_threshold, reject_multimaps);

            if species.len() != input_files.len() || species.len() != output_files.len() {
                let msg = format!("got {} species, {} input files and {} output files", species.len(), input_files.len(), output_files.len());
                return Err(Box::new(FilterError::InvalidParameter(msg)))
            }

            let jobs: Vec<SpeciesFiles> = species.into_iter().zip(input_files).zip(output_files).map(|((species, input), output)| {
                SpeciesFiles{ species, input, output }
            }).collect();

            specsplit::filter_files(&params, &jobs, summary_file.as_deref())?;
        },

        // SummaryHeader
        Some(cli::Commands::SummaryHeader {
            species,
            summary_file,
            verbose,
        }) => {
            init_log(if verbose { 2 } else { 1 });
            specsplit::stats::write_summary_header(&summary_file, &species)?;
        },

        None => {
            cli::Cli::command().print_help()?;
        },
    }
    Ok(())
}

fn main() {
    let cli = cli::Cli::parse();

    if let Err(err) = run(cli) {
        eprintln!("specsplit: {}", err);
        std::process::exit(1);
    }
}
