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
use std::io::Read;

use bstr::{BStr, BString, ByteSlice};
use noodles::sam::alignment::RecordBuf;

use crate::error::invalid_input;
use crate::parser::SamReader;

type E = Box<dyn std::error::Error>;

/// All hits for one read in one input.
///
/// Contains at least one record. The records are kept in input order.
#[derive(Clone, Debug, PartialEq)]
pub struct HitsGroup {
    name: BString,
    records: Vec<RecordBuf>,
}

impl HitsGroup {
    pub fn name(
        &self,
    ) -> &BStr {
        self.name.as_bstr()
    }

    pub fn records(
        &self,
    ) -> &[RecordBuf] {
        &self.records
    }

    pub fn len(
        &self,
    ) -> usize {
        self.records.len()
    }

    pub fn is_empty(
        &self,
    ) -> bool {
        self.records.is_empty()
    }
}

fn query_name(
    record: &RecordBuf,
) -> Result<BString, E> {
    match record.name() {
        Some(name) => Ok(name.to_owned()),
        None => invalid_input("record without a query name".to_string()),
    }
}

/// Splits a [SamReader] into [HitsGroup]s.
///
/// A new group starts whenever the query name changes. The input must be
/// sorted by query name using byte-wise comparison; a name that is smaller
/// than the one before it terminates the stream with an error.
pub struct HitsGroups<R: Read> {
    reader: SamReader<R>,
    // First record of the next group.
    pending: Option<RecordBuf>,
    last_name: Option<BString>,
    failed: bool,
}

impl<R: Read> HitsGroups<R> {
    pub fn new(
        reader: SamReader<R>,
    ) -> Self {
        HitsGroups{ reader, pending: None, last_name: None, failed: false }
    }

    /// Reads the next group, or None at end of input.
    pub fn next_group(
        &mut self,
    ) -> Result<Option<HitsGroup>, E> {
        let first = match self.pending.take() {
            Some(record) => record,
            None => match self.reader.read_record()? {
                Some(record) => record,
                None => return Ok(None),
            },
        };

        let name = query_name(&first)?;
        if let Some(last) = self.last_name.as_ref() {
            if name.as_slice() < last.as_slice() {
                return invalid_input(format!("query names are not sorted: '{}' follows '{}'", name, last));
            }
        }

        let mut records: Vec<RecordBuf> = vec![first];
        while let Some(record) = self.reader.read_record()? {
            if record.name().map(|x| x.as_bytes()) == Some(name.as_slice()) {
                records.push(record);
            } else {
                self.pending = Some(record);
                break;
            }
        }

        self.last_name = Some(name.clone());
        Ok(Some(HitsGroup{ name, records }))
    }
}

impl<R: Read> Iterator for HitsGroups<R> {
    type Item = Result<HitsGroup, E>;

    fn next(
        &mut self,
    ) -> Option<Result<HitsGroup, E>> {
        if self.failed {
            return None
        }
        let res = self.next_group().transpose();
        if let Some(Err(_)) = res {
            self.failed = true;
        }
        res
    }
}
