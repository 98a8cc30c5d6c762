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

//! Writer for the hits assigned to one species.
//!
//! The output header is copied from the input of the same species, and the
//! records of each accepted [HitsGroup] are written in the order they
//! arrive.
//!
//! ## Usage
//!
//! ```rust
//! use specsplit::parser::SamReader;
//! use specsplit::parser::group::HitsGroups;
//! use specsplit::printer::HitsWriter;
//! use std::io::Cursor;
//!
//! # let header = noodles::sam::Header::default();
//! # let mut input = noodles::bam::io::Writer::new(Vec::new());
//! # input.write_header(&header).unwrap();
//! # let input = input.into_inner().finish().unwrap();
//! let reader = SamReader::new(Cursor::new(input)).unwrap();
//! let mut writer = HitsWriter::new(Vec::new(), reader.header()).unwrap();
//!
//! for group in HitsGroups::new(reader) {
//!     writer.write_group(&group.unwrap()).unwrap();
//! }
//!
//! // `bytes` now contains a complete BAM file.
//! let bytes: Vec<u8> = writer.finish().unwrap();
//! assert!(!bytes.is_empty());
//! ```
//!
use std::io::Write;

use noodles::bam;
use noodles::bgzf;
use noodles::sam;
use noodles::sam::alignment::io::Write as _;

use crate::error::FilterError;
use crate::parser::group::HitsGroup;

type E = Box<dyn std::error::Error>;

pub struct HitsWriter<W: Write> {
    writer: bam::io::Writer<bgzf::io::Writer<W>>,
    header: sam::Header,
    n_records: usize,
}

impl<W: Write> HitsWriter<W> {
    /// Creates the writer and writes `header` to `conn`.
    pub fn new(
        conn: W,
        header: &sam::Header,
    ) -> Result<Self, E> {
        let mut writer = bam::io::Writer::new(conn);
        writer.write_header(header).map_err(FilterError::from)?;

        Ok(Self { writer, header: header.clone(), n_records: 0 })
    }

    /// Writes all records in `group`.
    pub fn write_group(
        &mut self,
        group: &HitsGroup,
    ) -> Result<(), E> {
        for record in group.records() {
            self.writer.write_alignment_record(&self.header, record).map_err(FilterError::from)?;
            self.n_records += 1;
        }
        Ok(())
    }

    /// Number of records written so far.
    pub fn n_records(
        &self,
    ) -> usize {
        self.n_records
    }

    /// Writes the BGZF end-of-file marker and returns the underlying sink.
    pub fn finish(
        self,
    ) -> Result<W, E> {
        log::debug!("wrote {} records", self.n_records);
        let conn = self.writer.into_inner().finish().map_err(FilterError::from)?;
        Ok(conn)
    }
}
