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

//! Deciding which species a read belongs to.
//!
//! The decision for one read is made in three steps:
//!
//!   1. [HitsInfo] summarises the hits of the read against one species.
//!   2. [ThresholdChecker](threshold::ThresholdChecker) turns a [HitsInfo]
//!      into a [ThresholdRecord](threshold::ThresholdRecord) that records
//!      whether the hits pass the mismatch, minmatch and multimap thresholds.
//!   3. [HitsChecker](checker::HitsChecker) compares the threshold records of
//!      all species the read aligned to and returns a
//!      [Decision](checker::Decision).
//!
//! Only step 1 depends on the aligner that produced the input; the tag
//! conventions are selected with [DataType].
//!
pub mod checker;
pub mod threshold;

use noodles::sam::alignment::RecordBuf;
use noodles::sam::alignment::record::cigar::Op;
use noodles::sam::alignment::record::data::field::Tag;

use crate::DataType;
use crate::error::invalid_input;
use crate::parser::group::HitsGroup;

type E = Box<dyn std::error::Error>;

/// Summary of the primary hits of one read against one species.
#[derive(Clone, Debug, PartialEq)]
pub struct HitsInfo {
    pub is_paired: bool,
    /// Sum of the read lengths of the primary hits.
    pub total_length: usize,
    /// CIGAR operations of each primary hit.
    pub primary_cigars: Vec<Vec<Op>>,
    pub primary_mismatches: u32,
    pub multimaps: u32,
    /// Always false unless the data is [DataType::Bisulfite].
    pub is_ambiguous: bool,
}

fn is_primary(
    record: &RecordBuf,
) -> bool {
    let flags = record.flags();
    !flags.is_secondary() && !flags.is_supplementary()
}

fn read_length(
    record: &RecordBuf,
) -> usize {
    let len = record.sequence().len();
    if len > 0 {
        return len
    }
    record.cigar().as_ref().iter().filter(|op| op.kind().consumes_read()).map(|op| op.len()).sum()
}

fn int_tag(
    record: &RecordBuf,
    tag: &[u8; 2],
) -> Result<u32, E> {
    let name = String::from_utf8_lossy(tag);
    let value = match record.data().get(&Tag::new(tag[0], tag[1])) {
        Some(value) => value,
        None => return invalid_input(format!("required tag {} missing from a hit", name)),
    };
    match value.as_int().and_then(|x| u32::try_from(x).ok()) {
        Some(x) => Ok(x),
        None => invalid_input(format!("tag {} is not a non-negative integer: {:?}", name, value)),
    }
}

impl HitsInfo {
    /// Summarises `group` using the tag conventions of `data_type`.
    ///
    /// Fails if the group has no primary hit or a required tag is missing.
    pub fn new(
        group: &HitsGroup,
        data_type: DataType,
    ) -> Result<Self, E> {
        let mut primaries = group.records().iter().filter(|record| is_primary(record));
        let first = match primaries.next() {
            Some(record) => record,
            None => return invalid_input(format!("read {} has no primary hit", group.name())),
        };

        let is_paired = first.flags().is_segmented();
        let mut primary_hits: Vec<&RecordBuf> = vec![first];
        if is_paired {
            primary_hits.extend(primaries.next());
        }

        let total_length: usize = primary_hits.iter().map(|record| read_length(record)).sum();
        let primary_cigars: Vec<Vec<Op>> = primary_hits.iter().map(|record| record.cigar().as_ref().to_vec()).collect();

        let primary_mismatches = int_tag(first, data_type.mismatch_tag())?;

        let multimaps = match data_type.multimap_tag() {
            Some(tag) => int_tag(&group.records()[0], tag)?,
            None => {
                let n_hits = group.len() as u32;
                if is_paired { (n_hits / 2).max(1) } else { n_hits }
            },
        };

        let is_ambiguous = match data_type.ambiguity_tag() {
            Some(tag) => int_tag(first, tag)? != 0,
            None => false,
        };

        Ok(HitsInfo{ is_paired, total_length, primary_cigars, primary_mismatches, multimaps, is_ambiguous })
    }
}
