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

//! Per-species counters and the tab-separated summary file.
//!
//! The summary has one header line with six columns per species, and one
//! line per filter job with the counters in the same order:
//!
//! ```text
//! Assigned-Hits-mouse  Assigned-Reads-mouse  Rejected-Hits-mouse  Rejected-Reads-mouse  Ambiguous-Hits-mouse  Ambiguous-Reads-mouse  Assigned-Hits-human ...
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use specsplit::stats::{format_summary_header, format_summary_line, Statistics};
//!
//! let mut mouse = Statistics::default();
//! mouse.record_accepted(2);
//! let mut human = Statistics::default();
//! human.record_rejected(1);
//!
//! let species = vec!["mouse".to_string(), "human".to_string()];
//! assert!(format_summary_header(&species).starts_with("Assigned-Hits-mouse\tAssigned-Reads-mouse\t"));
//! assert_eq!(format_summary_line(&[mouse, human]), "2\t1\t0\t0\t0\t0\t0\t0\t1\t1\t0\t0\n");
//! ```
//!
use std::fs::File;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use crate::error::FilterError;

type E = Box<dyn std::error::Error>;

const COLUMNS: [&str; 6] = [
    "Assigned-Hits",
    "Assigned-Reads",
    "Rejected-Hits",
    "Rejected-Reads",
    "Ambiguous-Hits",
    "Ambiguous-Reads",
];

/// Hit and read counts for one species.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Statistics {
    pub accepted_hits: u64,
    pub accepted_reads: u64,
    pub rejected_hits: u64,
    pub rejected_reads: u64,
    pub ambiguous_hits: u64,
    pub ambiguous_reads: u64,
}

impl Statistics {
    pub fn record_accepted(
        &mut self,
        n_hits: usize,
    ) {
        self.accepted_hits += n_hits as u64;
        self.accepted_reads += 1;
    }

    pub fn record_rejected(
        &mut self,
        n_hits: usize,
    ) {
        self.rejected_hits += n_hits as u64;
        self.rejected_reads += 1;
    }

    pub fn record_ambiguous(
        &mut self,
        n_hits: usize,
    ) {
        self.ambiguous_hits += n_hits as u64;
        self.ambiguous_reads += 1;
    }

    /// Number of reads a decision was made for.
    pub fn total_reads(
        &self,
    ) -> u64 {
        self.accepted_reads + self.rejected_reads + self.ambiguous_reads
    }

    /// Counters in summary column order.
    pub fn fields(
        &self,
    ) -> [u64; 6] {
        [
            self.accepted_hits,
            self.accepted_reads,
            self.rejected_hits,
            self.rejected_reads,
            self.ambiguous_hits,
            self.ambiguous_reads,
        ]
    }
}

impl std::fmt::Display for Statistics {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "assigned {} hits / {} reads, rejected {} hits / {} reads, ambiguous {} hits / {} reads",
               self.accepted_hits, self.accepted_reads,
               self.rejected_hits, self.rejected_reads,
               self.ambiguous_hits, self.ambiguous_reads)
    }
}

/// Formats the summary header line for `species`, including the newline.
pub fn format_summary_header(
    species: &[String],
) -> String {
    let mut line = species.iter().flat_map(|name| {
        COLUMNS.iter().map(move |column| format!("{}-{}", column, name))
    }).collect::<Vec<String>>().join("\t");
    line += "\n";
    line
}

/// Formats one summary line from `stats` given in declared species order.
pub fn format_summary_line(
    stats: &[Statistics],
) -> String {
    let mut line = stats.iter().flat_map(|x| x.fields()).map(|x| x.to_string()).collect::<Vec<String>>().join("\t");
    line += "\n";
    line
}

/// Creates or truncates `path` and writes the header line to it.
pub fn write_summary_header(
    path: &Path,
    species: &[String],
) -> Result<(), E> {
    let mut conn = File::create(path).map_err(FilterError::from)?;
    conn.write_all(format_summary_header(species).as_bytes()).map_err(FilterError::from)?;
    conn.flush().map_err(FilterError::from)?;
    Ok(())
}

/// Appends the summary line for one job to `path`.
///
/// The line is written with a single `write_all` call on a file opened in
/// append mode, so concurrent jobs do not interleave their lines.
pub fn append_summary_line(
    path: &Path,
    stats: &[Statistics],
) -> Result<(), E> {
    let mut conn = OpenOptions::new().append(true).create(true).open(path).map_err(FilterError::from)?;
    conn.write_all(format_summary_line(stats).as_bytes()).map_err(FilterError::from)?;
    conn.flush().map_err(FilterError::from)?;
    Ok(())
}

// Tests
#[cfg(test)]
mod tests {

    #[test]
    fn count_decisions() {
        use super::Statistics;

        let mut stats = Statistics::default();
        stats.record_accepted(3);
        stats.record_accepted(1);
        stats.record_rejected(2);
        stats.record_ambiguous(5);

        let expected = Statistics{ accepted_hits: 4, accepted_reads: 2, rejected_hits: 2, rejected_reads: 1, ambiguous_hits: 5, ambiguous_reads: 1 };

        assert_eq!(stats, expected);
        assert_eq!(stats.total_reads(), 4);
    }

    #[test]
    fn summary_header_columns() {
        use super::format_summary_header;

        let species = vec!["mouse".to_string(), "human".to_string()];
        let got = format_summary_header(&species);

        let mut expected = String::new();
        expected += "Assigned-Hits-mouse\tAssigned-Reads-mouse\tRejected-Hits-mouse\tRejected-Reads-mouse\tAmbiguous-Hits-mouse\tAmbiguous-Reads-mouse\t";
        expected += "Assigned-Hits-human\tAssigned-Reads-human\tRejected-Hits-human\tRejected-Reads-human\tAmbiguous-Hits-human\tAmbiguous-Reads-human\n";

        assert_eq!(got, expected);
    }

    #[test]
    fn summary_line_of_zeros() {
        use super::{format_summary_line, Statistics};

        let got = format_summary_line(&[Statistics::default(), Statistics::default()]);

        assert_eq!(got, "0\t0\t0\t0\t0\t0\t0\t0\t0\t0\t0\t0\n");
    }

    #[test]
    fn display_statistics() {
        use super::Statistics;

        let stats = Statistics{ accepted_hits: 4, accepted_reads: 2, rejected_hits: 2, rejected_reads: 1, ambiguous_hits: 0, ambiguous_reads: 0 };

        assert_eq!(stats.to_string(), "assigned 4 hits / 2 reads, rejected 2 hits / 1 reads, ambiguous 0 hits / 0 reads");
    }

    #[test]
    fn write_header_then_append() {
        use super::{append_summary_line, write_summary_header, Statistics};

        let path = std::env::temp_dir().join(format!("specsplit-summary-{}.tsv", std::process::id()));
        let species = vec!["a".to_string()];

        write_summary_header(&path, &species).unwrap();
        let mut stats = Statistics::default();
        stats.record_accepted(1);
        append_summary_line(&path, &[stats]).unwrap();
        append_summary_line(&path, &[Statistics::default()]).unwrap();

        let got = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        let expected = "Assigned-Hits-a\tAssigned-Reads-a\tRejected-Hits-a\tRejected-Reads-a\tAmbiguous-Hits-a\tAmbiguous-Reads-a\n1\t1\t0\t0\t0\t0\n0\t0\t0\t0\t0\t0\n";
        assert_eq!(got, expected);
    }
}
