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
use noodles::sam::alignment::record::cigar::op::Kind;

use crate::DataType;
use crate::hits::HitsInfo;

/// Quality of the primary CIGAR strings.
///
/// Ordered from best to worst so that the best grade is the minimum.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum CigarGrade {
    Good,
    LessGood,
    Fail,
}

/// How well the hits of a read against one species pass the thresholds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ThresholdRecord {
    /// Index of the species in the declared species order.
    pub species: usize,
    pub mismatches: u32,
    pub cigar_grade: CigarGrade,
    pub multimaps: u32,
    pub is_ambiguous: bool,
    /// Mismatch, minmatch or multimap threshold exceeded.
    pub violated_thresholds: bool,
}

impl ThresholdRecord {
    /// True if any threshold is exceeded or the hit is ambiguous.
    pub fn violated(
        &self,
    ) -> bool {
        self.violated_thresholds || self.is_ambiguous
    }
}

/// Rounds to the nearest integer, ties go to the even neighbour.
fn round_half_even(
    x: f64,
) -> usize {
    x.round_ties_even() as usize
}

pub struct ThresholdChecker {
    mismatch_fraction: f64,
    minmatch_fraction: f64,
    multimap_limit: u32,
    data_type: DataType,
}

impl ThresholdChecker {
    /// `mismatch_fraction` and `minmatch_fraction` are in [0, 1].
    pub fn new(
        mismatch_fraction: f64,
        minmatch_fraction: f64,
        multimap_limit: u32,
        data_type: DataType,
    ) -> Self {
        ThresholdChecker{ mismatch_fraction, minmatch_fraction, multimap_limit, data_type }
    }

    pub fn max_mismatches(
        &self,
        total_length: usize,
    ) -> usize {
        round_half_even(self.mismatch_fraction * total_length as f64)
    }

    pub fn min_match(
        &self,
        total_length: usize,
    ) -> usize {
        total_length.saturating_sub(round_half_even(self.minmatch_fraction * total_length as f64))
    }

    pub fn cigar_grade(
        &self,
        info: &HitsInfo,
    ) -> CigarGrade {
        let mut matched: usize = 0;
        let mut has_indel = false;
        info.primary_cigars.iter().flatten().for_each(|op| {
            match op.kind() {
                Kind::Match | Kind::SequenceMatch | Kind::SequenceMismatch => matched += op.len(),
                Kind::Insertion | Kind::Deletion => has_indel = true,
                _ => (),
            }
        });

        if matched < self.min_match(info.total_length) {
            CigarGrade::Fail
        } else if has_indel || matched < info.total_length {
            CigarGrade::LessGood
        } else {
            CigarGrade::Good
        }
    }

    /// Grades `info` as a hit for `species`.
    pub fn check(
        &self,
        species: usize,
        info: &HitsInfo,
    ) -> ThresholdRecord {
        let cigar_grade = self.cigar_grade(info);

        let violated_multimaps = info.multimaps > self.multimap_limit;
        let violated_mismatches = info.primary_mismatches as usize > self.max_mismatches(info.total_length);
        let violated_cigar = cigar_grade == CigarGrade::Fail;

        let is_ambiguous = self.data_type == DataType::Bisulfite && info.is_ambiguous;

        ThresholdRecord{
            species,
            mismatches: info.primary_mismatches,
            cigar_grade,
            multimaps: info.multimaps,
            is_ambiguous,
            violated_thresholds: violated_multimaps || violated_mismatches || violated_cigar,
        }
    }
}
