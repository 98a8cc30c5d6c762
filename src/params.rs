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

//! Thresholds for a filter job and the preset strategies.
//!
//! | strategy | mismatch % | minmatch % | multimaps | reject multimaps |
//! |---|---|---|---|---|
//! | best | 1 | 2 | 999999 | no |
//! | conservative | 0 | 0 | 1 | yes |
//! | recall | 2 | 10 | 999999 | no |
//! | permissive | 25 | 25 | 999999 | no |
//!
use crate::DataType;
use crate::error::invalid_parameter;
use crate::hits::checker::HitsChecker;
use crate::hits::checker::SelectionMode;
use crate::hits::threshold::ThresholdChecker;

type E = Box<dyn std::error::Error>;

/// Parameters of one filter job.
#[derive(Clone, Debug, PartialEq)]
pub struct FilterParams {
    pub data_type: DataType,
    /// Maximum mismatches as a percentage of the read length.
    pub mismatch_threshold: f64,
    /// Maximum unmatched bases as a percentage of the read length.
    pub minmatch_threshold: f64,
    /// Maximum number of places a read may align to.
    pub multimap_threshold: u32,
    pub reject_multimaps: bool,
}

impl FilterParams {
    pub fn validate(
        &self,
    ) -> Result<(), E> {
        for (name, value) in [("mismatch", self.mismatch_threshold), ("minmatch", self.minmatch_threshold)] {
            if !(0.0..=100.0).contains(&value) {
                return invalid_parameter(format!("{} threshold must be a percentage in [0, 100], got {}", name, value))
            }
        }
        if self.multimap_threshold < 1 {
            return invalid_parameter("multimap threshold must be at least 1".to_string())
        }
        Ok(())
    }

    /// Replaces the thresholds that are given; `reject_multimaps` can only turn the mode on.
    pub fn with_overrides(
        mut self,
        mismatch_threshold: Option<f64>,
        minmatch_threshold: Option<f64>,
        multimap_threshold: Option<u32>,
        reject_multimaps: bool,
    ) -> Self {
        if let Some(value) = mismatch_threshold { self.mismatch_threshold = value; }
        if let Some(value) = minmatch_threshold { self.minmatch_threshold = value; }
        if let Some(value) = multimap_threshold { self.multimap_threshold = value; }
        self.reject_multimaps |= reject_multimaps;
        self
    }

    pub fn threshold_checker(
        &self,
    ) -> ThresholdChecker {
        ThresholdChecker::new(self.mismatch_threshold / 100.0, self.minmatch_threshold / 100.0, self.multimap_threshold, self.data_type)
    }

    pub fn hits_checker(
        &self,
    ) -> HitsChecker {
        let mode = if self.reject_multimaps { SelectionMode::RejectMultimaps } else { SelectionMode::Standard };
        HitsChecker::new(mode, self.data_type)
    }
}

/// Preset thresholds.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Strategy {
    #[default]
    Best,
    Conservative,
    Recall,
    Permissive,
}

impl std::str::FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "best" => Ok(Strategy::Best),
            "conservative" => Ok(Strategy::Conservative),
            "recall" => Ok(Strategy::Recall),
            "permissive" => Ok(Strategy::Permissive),
            _ => Err(format!("'{}' is not a valid Strategy", s)),
        }
    }
}

impl Strategy {
    pub fn params(
        &self,
        data_type: DataType,
    ) -> FilterParams {
        let (mismatch_threshold, minmatch_threshold, multimap_threshold, reject_multimaps) = match self {
            Strategy::Best => (1.0, 2.0, 999999, false),
            Strategy::Conservative => (0.0, 0.0, 1, true),
            Strategy::Recall => (2.0, 10.0, 999999, false),
            Strategy::Permissive => (25.0, 25.0, 999999, false),
        };
        FilterParams{ data_type, mismatch_threshold, minmatch_threshold, multimap_threshold, reject_multimaps }
    }
}
