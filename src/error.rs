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

//! Errors raised while filtering.
//!
//! All public functions return `Result<T, Box<dyn std::error::Error>>`. The
//! kind of a failure can be recovered by downcasting to [FilterError]:
//!
//! ```rust
//! use specsplit::error::FilterError;
//! use specsplit::params::FilterParams;
//! use specsplit::DataType;
//!
//! let params = FilterParams { data_type: DataType::RnaSeq, mismatch_threshold: 101.0, minmatch_threshold: 0.0, multimap_threshold: 1, reject_multimaps: false };
//! let err = params.validate().unwrap_err();
//!
//! assert!(matches!(err.downcast_ref::<FilterError>(), Some(FilterError::InvalidParameter(_))));
//! ```
//!

/// Fatal conditions of a filter job.
#[derive(Debug)]
pub enum FilterError {
    /// Missing or unreadable input, missing tags or unsorted query names.
    InvalidInput(String),
    /// Thresholds or options outside their accepted range.
    InvalidParameter(String),
    /// Read or write failure on an input, output or summary file.
    Io(std::io::Error),
}

impl std::fmt::Display for FilterError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            FilterError::InvalidInput(msg) => write!(f, "invalid input: {}", msg),
            FilterError::InvalidParameter(msg) => write!(f, "invalid parameter: {}", msg),
            FilterError::Io(err) => write!(f, "i/o failure: {}", err),
        }
    }
}

impl std::error::Error for FilterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FilterError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for FilterError {
    fn from(err: std::io::Error) -> Self {
        FilterError::Io(err)
    }
}

pub(crate) fn invalid_input<T>(msg: String) -> Result<T, Box<dyn std::error::Error>> {
    Err(Box::new(FilterError::InvalidInput(msg)))
}

pub(crate) fn invalid_parameter<T>(msg: String) -> Result<T, Box<dyn std::error::Error>> {
    Err(Box::new(FilterError::InvalidParameter(msg)))
}
