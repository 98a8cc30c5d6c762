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

//! Choosing a species for a read that aligned to several of them.
//!
//! The [standard rule](SelectionMode::Standard) discards species whose hits
//! violate the thresholds and breaks ties among the rest by, in order:
//!
//!   1. Fewest mismatches.
//!   2. Best [CigarGrade].
//!   3. Fewest multimaps (not used for bisulfite data).
//!
//! If a tie remains the read is ambiguous.
//!
//! ## Usage
//!
//! ```rust
//! use specsplit::DataType;
//! use specsplit::hits::checker::{Decision, HitsChecker, SelectionMode};
//! use specsplit::hits::threshold::{CigarGrade, ThresholdRecord};
//!
//! let mouse = ThresholdRecord { species: 0, mismatches: 0, cigar_grade: CigarGrade::Good, multimaps: 1, is_ambiguous: false, violated_thresholds: false };
//! let human = ThresholdRecord { species: 1, mismatches: 3, cigar_grade: CigarGrade::Good, multimaps: 1, is_ambiguous: false, violated_thresholds: false };
//!
//! let checker = HitsChecker::new(SelectionMode::Standard, DataType::RnaSeq);
//! assert_eq!(checker.decide(&[mouse, human]), Decision::Assigned(0));
//! ```
//!
use crate::DataType;
use crate::hits::threshold::CigarGrade;
use crate::hits::threshold::ThresholdRecord;

/// Outcome for one read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    /// No species gets the read.
    Rejected,
    /// Several species are equally good.
    Ambiguous,
    /// The read belongs to the species with this index.
    Assigned(usize),
}

#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SelectionMode {
    #[default]
    Standard,
    /// Reject reads that multimap against any species.
    RejectMultimaps,
}

pub struct HitsChecker {
    mode: SelectionMode,
    data_type: DataType,
}

// Keeps the records that share the minimum value of `key`.
fn keep_min<'a, K: Ord>(
    records: Vec<&'a ThresholdRecord>,
    key: impl Fn(&ThresholdRecord) -> K,
) -> Vec<&'a ThresholdRecord> {
    match records.iter().map(|record| key(*record)).min() {
        Some(min) => records.into_iter().filter(|record| key(*record) == min).collect(),
        None => records,
    }
}

impl HitsChecker {
    pub fn new(
        mode: SelectionMode,
        data_type: DataType,
    ) -> Self {
        HitsChecker{ mode, data_type }
    }

    pub fn mode(
        &self,
    ) -> SelectionMode {
        self.mode
    }

    /// Decides the outcome for one read from the records of all competing species.
    pub fn decide(
        &self,
        records: &[ThresholdRecord],
    ) -> Decision {
        match self.mode {
            SelectionMode::RejectMultimaps => {
                if records.iter().any(|record| record.multimaps > 1) {
                    Decision::Rejected
                } else {
                    select_standard(records)
                }
            },
            SelectionMode::Standard => {
                if self.data_type == DataType::Bisulfite {
                    select_bisulfite(records)
                } else {
                    select_standard(records)
                }
            },
        }
    }

    /// Decision for a read that only one species has hits for.
    pub fn decide_single(
        &self,
        record: &ThresholdRecord,
    ) -> Decision {
        if record.violated() {
            Decision::Rejected
        } else {
            Decision::Assigned(record.species)
        }
    }
}

fn select_standard(
    records: &[ThresholdRecord],
) -> Decision {
    let mut survivors: Vec<&ThresholdRecord> = records.iter().filter(|record| !record.violated()).collect();

    type Key = fn(&ThresholdRecord) -> u32;
    let tie_breakers: [Key; 3] = [
        |record| record.mismatches,
        |record| cigar_rank(record.cigar_grade),
        |record| record.multimaps,
    ];

    if survivors.is_empty() {
        return Decision::Rejected
    }
    for key in tie_breakers {
        if survivors.len() == 1 {
            return Decision::Assigned(survivors[0].species)
        }
        survivors = keep_min(survivors, key);
    }
    if survivors.len() == 1 {
        return Decision::Assigned(survivors[0].species)
    }

    Decision::Ambiguous
}

fn select_bisulfite(
    records: &[ThresholdRecord],
) -> Decision {
    if records.iter().all(|record| record.is_ambiguous) {
        return Decision::Rejected
    }

    // Ambiguous hits stay in the competition so that they can block
    // species with more mismatches.
    let mut survivors: Vec<&ThresholdRecord> = records.iter().filter(|record| !record.violated_thresholds).collect();

    let sole_survivor = |record: &ThresholdRecord| {
        if record.is_ambiguous {
            Decision::Rejected
        } else {
            Decision::Assigned(record.species)
        }
    };

    if survivors.is_empty() {
        return Decision::Rejected
    }
    if survivors.len() == 1 {
        return sole_survivor(survivors[0])
    }

    survivors = keep_min(survivors, |record| record.mismatches);
    if survivors.len() == 1 {
        return sole_survivor(survivors[0])
    }

    survivors = keep_min(survivors, |record| record.cigar_grade);
    if survivors.len() == 1 {
        return sole_survivor(survivors[0])
    }

    Decision::Ambiguous
}

fn cigar_rank(
    grade: CigarGrade,
) -> u32 {
    grade as u32
}
