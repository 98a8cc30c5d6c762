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
use std::io::Write;

use bstr::BStr;

use crate::DataType;
use crate::hits::HitsInfo;
use crate::hits::checker::Decision;
use crate::hits::checker::HitsChecker;
use crate::hits::threshold::ThresholdChecker;
use crate::hits::threshold::ThresholdRecord;
use crate::parser::SamReader;
use crate::parser::group::HitsGroup;
use crate::parser::group::HitsGroups;
use crate::printer::HitsWriter;
use crate::stats::Statistics;

type E = Box<dyn std::error::Error>;

/// Input, output and counters for one species.
///
/// Holds at most one [HitsGroup] at a time. Every group that is read is
/// eventually either written to the output or dropped, and counted in
/// [Statistics] exactly once.
pub struct SpeciesFilterer<R: Read, W: Write> {
    species: usize,
    name: String,
    data_type: DataType,

    groups: HitsGroups<R>,
    writer: HitsWriter<W>,

    current: Option<HitsGroup>,
    info: Option<HitsInfo>,
    exhausted: bool,

    stats: Statistics,
}

impl<R: Read, W: Write> SpeciesFilterer<R, W> {
    /// Opens `conn_in` and writes the output header to `conn_out`.
    ///
    /// `species` is the index of the species in the declared order.
    pub fn new(
        species: usize,
        name: &str,
        data_type: DataType,
        conn_in: R,
        conn_out: W,
    ) -> Result<Self, E> {
        let reader = SamReader::new(conn_in)?;
        let writer = HitsWriter::new(conn_out, reader.header())?;

        Ok(Self {
            species, name: name.to_string(), data_type,
            groups: HitsGroups::new(reader), writer,
            current: None, info: None, exhausted: false,
            stats: Statistics::default(),
        })
    }

    pub fn name(
        &self,
    ) -> &str {
        &self.name
    }

    pub fn stats(
        &self,
    ) -> &Statistics {
        &self.stats
    }

    /// Query name of the current group, or None at end of input.
    ///
    /// Reads the next group if there is no current one.
    pub fn peek_name(
        &mut self,
    ) -> Result<Option<&BStr>, E> {
        if self.current.is_none() && !self.exhausted {
            self.current = self.groups.next_group()?;
            self.info = None;
            if self.current.is_none() {
                log::debug!("{}: end of input", self.name);
                self.exhausted = true;
            }
        }
        Ok(self.current.as_ref().map(|group| group.name()))
    }

    /// The group returned by the last [peek_name](Self::peek_name).
    pub fn current_group(
        &self,
    ) -> Option<&HitsGroup> {
        self.current.as_ref()
    }

    /// Summary of the current group, computed once per group.
    ///
    /// ## Errors and panics
    ///
    /// Returns an error if the group lacks a primary hit or a required tag.
    ///
    /// Panics if [peek_name](Self::peek_name) has not returned a name for
    /// the current group.
    pub fn hits_info(
        &mut self,
    ) -> Result<&HitsInfo, E> {
        let info = match self.info.take() {
            Some(info) => info,
            None => match self.current.as_ref() {
                Some(group) => HitsInfo::new(group, self.data_type)?,
                None => panic!("{}: hits_info called without a current group", self.name),
            },
        };
        Ok(&*self.info.insert(info))
    }

    pub fn threshold_record(
        &mut self,
        checker: &ThresholdChecker,
    ) -> Result<ThresholdRecord, E> {
        let species = self.species;
        let info = self.hits_info()?;
        Ok(checker.check(species, info))
    }

    // Panics if there is no current group.
    fn take_group(
        &mut self,
    ) -> HitsGroup {
        self.info = None;
        match self.current.take() {
            Some(group) => group,
            None => panic!("{}: no current group", self.name),
        }
    }

    /// Writes the current group to the output and counts it as assigned.
    pub fn emit_accepted(
        &mut self,
    ) -> Result<(), E> {
        let group = self.take_group();
        self.writer.write_group(&group)?;
        self.stats.record_accepted(group.len());
        Ok(())
    }

    pub fn record_rejected(
        &mut self,
    ) {
        let group = self.take_group();
        self.stats.record_rejected(group.len());
    }

    pub fn record_ambiguous(
        &mut self,
    ) {
        let group = self.take_group();
        self.stats.record_ambiguous(group.len());
    }

    /// Applies `decision` to the current group.
    pub fn apply(
        &mut self,
        decision: Decision,
    ) -> Result<(), E> {
        match decision {
            Decision::Assigned(species) if species == self.species => self.emit_accepted()?,
            Decision::Assigned(_) | Decision::Rejected => self.record_rejected(),
            Decision::Ambiguous => self.record_ambiguous(),
        }
        Ok(())
    }

    /// Decides the current group on its own thresholds.
    pub fn check_alone(
        &mut self,
        threshold_checker: &ThresholdChecker,
        hits_checker: &HitsChecker,
    ) -> Result<(), E> {
        let record = self.threshold_record(threshold_checker)?;
        let decision = hits_checker.decide_single(&record);
        if let Some(group) = self.current.as_ref() {
            log::trace!("{}: {} {:?}", self.name, group.name(), decision);
        }
        self.apply(decision)
    }

    /// Decides every remaining group on its own thresholds until end of input.
    pub fn drain_remaining(
        &mut self,
        threshold_checker: &ThresholdChecker,
        hits_checker: &HitsChecker,
    ) -> Result<(), E> {
        while self.peek_name()?.is_some() {
            self.check_alone(threshold_checker, hits_checker)?;
        }
        Ok(())
    }

    /// Finishes the output and returns the counters and the output sink.
    pub fn finish(
        self,
    ) -> Result<(Statistics, W), E> {
        let conn = self.writer.finish()?;
        Ok((self.stats, conn))
    }
}
