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

//! Reading alignment records from [BAM](https://samtools.github.io/hts-specs/SAMv1.pdf) input.
//!
//! [SamReader] returns the records of a single input in file order. Records
//! sharing a query name are collected into [HitsGroup](group::HitsGroup)s by
//! [HitsGroups](group::HitsGroups).
//!
pub mod group;

use std::io::Read;

use noodles::bam;
use noodles::bgzf;
use noodles::sam;
use noodles::sam::alignment::RecordBuf;

use crate::error::FilterError;

type E = Box<dyn std::error::Error>;

/// Lazy stream of alignment records from one input.
///
/// The header is read when the reader is created and is kept around so that
/// the output for the same species can be created from it.
pub struct SamReader<R: Read> {
    reader: bam::io::Reader<bgzf::io::Reader<R>>,
    header: sam::Header,
    exhausted: bool,
}

impl<R: Read> SamReader<R> {
    pub fn new(
        conn: R,
    ) -> Result<Self, E> {
        let mut reader = bam::io::Reader::new(conn);
        let header = reader.read_header().map_err(|err| {
            FilterError::InvalidInput(format!("could not read BAM header: {}", err))
        })?;

        Ok(Self { reader, header, exhausted: false })
    }

    pub fn header(
        &self,
    ) -> &sam::Header {
        &self.header
    }

    /// Reads the next record, or None at end of input.
    pub fn read_record(
        &mut self,
    ) -> Result<Option<RecordBuf>, E> {
        if self.exhausted {
            return Ok(None)
        }

        let mut record = RecordBuf::default();
        let n = self.reader.read_record_buf(&self.header, &mut record).map_err(|err| {
            FilterError::InvalidInput(format!("could not read BAM record: {}", err))
        })?;

        if n == 0 {
            self.exhausted = true;
            return Ok(None)
        }

        Ok(Some(record))
    }
}

impl<R: Read> Iterator for SamReader<R> {
    type Item = Result<RecordBuf, E>;

    fn next(
        &mut self,
    ) -> Option<Result<RecordBuf, E>> {
        self.read_record().transpose()
    }
}

// Tests
#[cfg(test)]
mod tests {

    #[test]
    fn read_records_in_file_order() {
        use super::SamReader;
        use crate::test_utils::{bam_bytes, record};
        use std::io::Cursor;

        let data = bam_bytes(&[
            record("r2", 0, "50M", &[(*b"NM", 0)]),
            record("r1", 0, "50M", &[(*b"NM", 1)]),
            record("r3", 256, "50M", &[(*b"NM", 2)]),
        ]);

        let reader = SamReader::new(Cursor::new(data)).unwrap();
        let got: Vec<String> = reader.map(|x| x.unwrap().name().unwrap().to_string()).collect();

        assert_eq!(got, vec!["r2".to_string(), "r1".to_string(), "r3".to_string()]);
    }

    #[test]
    fn read_empty_input() {
        use super::SamReader;
        use crate::test_utils::bam_bytes;
        use std::io::Cursor;

        let data = bam_bytes(&[]);

        let mut reader = SamReader::new(Cursor::new(data)).unwrap();

        assert!(reader.read_record().unwrap().is_none());
        assert!(reader.next().is_none());
    }

    #[test]
    fn keep_header() {
        use super::SamReader;
        use crate::test_utils::bam_bytes;
        use std::io::Cursor;

        let data = bam_bytes(&[]);
        let reader = SamReader::new(Cursor::new(data)).unwrap();

        assert_eq!(reader.header().reference_sequences().len(), 1);
    }

    #[test]
    fn error_on_garbage_input() {
        use super::SamReader;
        use crate::error::FilterError;
        use std::io::Cursor;

        let data: Vec<u8> = b"this is not a bam file".to_vec();
        let err = SamReader::new(Cursor::new(data)).err().unwrap();

        assert!(matches!(err.downcast_ref::<FilterError>(), Some(FilterError::InvalidInput(_))));
    }
}
