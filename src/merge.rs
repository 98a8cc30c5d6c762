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

//! Streaming merge over the inputs of all species.
//!
//! All inputs are sorted by query name, so the reads can be matched up by
//! repeatedly taking the smallest query name among the current groups. The
//! species whose current group has that name compete for the read; the
//! others wait for a later iteration. At most one group per species is kept
//! in memory.
//!
use std::io::Read;
use std::io::Write;

use bstr::BString;

use crate::filterer::SpeciesFilterer;
use crate::hits::checker::HitsChecker;
use crate::hits::threshold::ThresholdChecker;
use crate::hits::threshold::ThresholdRecord;
use crate::stats::Statistics;

type E = Box<dyn std::error::Error>;

pub struct MergeDriver<R: Read, W: Write> {
    filterers: Vec<SpeciesFilterer<R, W>>,
    threshold_checker: ThresholdChecker,
    hits_checker: HitsChecker,
}

impl<R: Read, W: Write> MergeDriver<R, W> {
    /// `filterers` must be given in the declared species order.
    pub fn new(
        filterers: Vec<SpeciesFilterer<R, W>>,
        threshold_checker: ThresholdChecker,
        hits_checker: HitsChecker,
    ) -> Self {
        MergeDriver{ filterers, threshold_checker, hits_checker }
    }

    /// Indexes of the filterers that still have input, with their next query name.
    fn live_names(
        &mut self,
    ) -> Result<Vec<(usize, BString)>, E> {
        let mut names: Vec<(usize, BString)> = Vec::with_capacity(self.filterers.len());
        for (idx, filterer) in self.filterers.iter_mut().enumerate() {
            if let Some(name) = filterer.peek_name()? {
                names.push((idx, name.to_owned()));
            }
        }
        Ok(names)
    }

    /// Makes one decision for the smallest query name.
    ///
    /// Returns false once every input is exhausted.
    pub fn step(
        &mut self,
    ) -> Result<bool, E> {
        let live = self.live_names()?;

        if live.is_empty() {
            return Ok(false)
        }
        if live.len() == 1 {
            let filterer = &mut self.filterers[live[0].0];
            log::debug!("only {} has reads left", filterer.name());
            filterer.drain_remaining(&self.threshold_checker, &self.hits_checker)?;
            return Ok(false)
        }

        let min_name = live.iter().map(|(_, name)| name).min().cloned().unwrap_or_default();
        let competing: Vec<usize> = live.iter().filter(|(_, name)| *name == min_name).map(|(idx, _)| *idx).collect();

        if competing.len() == 1 {
            self.filterers[competing[0]].check_alone(&self.threshold_checker, &self.hits_checker)?;
            return Ok(true)
        }

        let mut records: Vec<ThresholdRecord> = Vec::with_capacity(competing.len());
        for idx in competing.iter() {
            records.push(self.filterers[*idx].threshold_record(&self.threshold_checker)?);
        }

        let decision = self.hits_checker.decide(&records);
        log::trace!("{} competes in {} species: {:?}", min_name, competing.len(), decision);

        for idx in competing.iter() {
            self.filterers[*idx].apply(decision)?;
        }

        Ok(true)
    }

    /// Runs the merge until every input is exhausted.
    pub fn run(
        &mut self,
    ) -> Result<(), E> {
        while self.step()? {}
        Ok(())
    }

    /// Current counters in declared species order.
    pub fn stats(
        &self,
    ) -> Vec<Statistics> {
        self.filterers.iter().map(|filterer| *filterer.stats()).collect()
    }

    /// Finishes all outputs and returns the counters and output sinks.
    pub fn finish(
        self,
    ) -> Result<Vec<(Statistics, W)>, E> {
        let mut res: Vec<(Statistics, W)> = Vec::with_capacity(self.filterers.len());
        for filterer in self.filterers {
            let name = filterer.name().to_string();
            let (stats, conn) = filterer.finish()?;
            log::info!("{}: {}", name, stats);
            res.push((stats, conn));
        }
        Ok(res)
    }
}

// Tests
#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use noodles::sam::alignment::RecordBuf;

    use super::MergeDriver;
    use crate::DataType;
    use crate::filterer::SpeciesFilterer;
    use crate::hits::checker::{HitsChecker, SelectionMode};
    use crate::hits::threshold::ThresholdChecker;
    use crate::stats::Statistics;
    use crate::test_utils::{bam_bytes, names_in};

    fn driver(
        inputs: Vec<Vec<RecordBuf>>,
        data_type: DataType,
        thresholds: (f64, f64, u32),
        mode: SelectionMode,
    ) -> MergeDriver<Cursor<Vec<u8>>, Vec<u8>> {
        let filterers = inputs.iter().enumerate().map(|(idx, records)| {
            SpeciesFilterer::new(idx, &format!("species{}", idx), data_type, Cursor::new(bam_bytes(records)), Vec::new()).unwrap()
        }).collect();
        MergeDriver::new(
            filterers,
            ThresholdChecker::new(thresholds.0, thresholds.1, thresholds.2, data_type),
            HitsChecker::new(mode, data_type),
        )
    }

    fn run(
        inputs: Vec<Vec<RecordBuf>>,
        data_type: DataType,
        thresholds: (f64, f64, u32),
        mode: SelectionMode,
    ) -> Vec<(Statistics, Vec<String>)> {
        let mut merge = driver(inputs, data_type, thresholds, mode);
        merge.run().unwrap();
        merge.finish().unwrap().into_iter().map(|(stats, out)| (stats, names_in(out))).collect()
    }

    fn rna(name: &str, mismatches: i32, multimaps: i32) -> RecordBuf {
        crate::test_utils::record(name, 0, "50M", &[(*b"nM", mismatches), (*b"NH", multimaps)])
    }

    fn accepted(hits: u64) -> Statistics {
        Statistics{ accepted_hits: hits, accepted_reads: 1, ..Default::default() }
    }

    fn rejected(hits: u64) -> Statistics {
        Statistics{ rejected_hits: hits, rejected_reads: 1, ..Default::default() }
    }

    fn ambiguous(hits: u64) -> Statistics {
        Statistics{ ambiguous_hits: hits, ambiguous_reads: 1, ..Default::default() }
    }

    #[test]
    fn counters_update_per_step() {
        let mut merge = driver(
            vec![vec![rna("r1", 0, 1), rna("r2", 0, 1)], vec![rna("r1", 3, 1), rna("r2", 0, 1)]],
            DataType::RnaSeq, (0.1, 0.1, 1), SelectionMode::Standard,
        );

        assert!(merge.step().unwrap());
        assert_eq!(merge.stats(), vec![accepted(1), rejected(1)]);

        assert!(merge.step().unwrap());
        let expected = Statistics{ accepted_hits: 1, accepted_reads: 1, ambiguous_hits: 1, ambiguous_reads: 1, ..Default::default() };
        assert_eq!(merge.stats()[0], expected);

        assert!(!merge.step().unwrap());
    }

    #[test]
    fn two_species_clear_winner() {
        let got = run(
            vec![vec![rna("r1", 0, 1)], vec![rna("r1", 3, 1)]],
            DataType::RnaSeq, (0.1, 0.1, 1), SelectionMode::Standard,
        );

        assert_eq!(got[0], (accepted(1), vec!["r1".to_string()]));
        assert_eq!(got[1], (rejected(1), vec![]));
    }

    #[test]
    fn ambiguous_on_every_tie_breaker() {
        let got = run(
            vec![vec![rna("r2", 0, 1)], vec![rna("r2", 0, 1)]],
            DataType::RnaSeq, (0.1, 0.1, 1), SelectionMode::Standard,
        );

        assert_eq!(got[0], (ambiguous(1), vec![]));
        assert_eq!(got[1], (ambiguous(1), vec![]));
    }

    #[test]
    fn all_violate_thresholds() {
        let got = run(
            vec![vec![rna("r3", 0, 5)], vec![rna("r3", 30, 1)]],
            DataType::RnaSeq, (0.1, 0.1, 1), SelectionMode::Standard,
        );

        assert_eq!(got[0].0, rejected(1));
        assert_eq!(got[1].0, rejected(1));
    }

    #[test]
    fn reject_multimaps_guard() {
        let inputs = vec![vec![rna("r4", 0, 2)], vec![rna("r4", 5, 1)]];

        let got = run(inputs.clone(), DataType::RnaSeq, (0.1, 0.1, 999999), SelectionMode::RejectMultimaps);
        assert_eq!(got[0].0, rejected(1));
        assert_eq!(got[1].0, rejected(1));

        let got = run(inputs, DataType::RnaSeq, (0.1, 0.1, 999999), SelectionMode::Standard);
        assert_eq!(got[0].0, accepted(1));
    }

    #[test]
    fn single_species_shortcut() {
        let got = run(
            vec![
                vec![rna("r1", 0, 1), rna("r99", 0, 1)],
                vec![rna("r1", 0, 1)],
            ],
            DataType::RnaSeq, (0.1, 0.1, 1), SelectionMode::Standard,
        );

        let expected_a = Statistics{ accepted_hits: 1, accepted_reads: 1, ambiguous_hits: 1, ambiguous_reads: 1, ..Default::default() };
        assert_eq!(got[0], (expected_a, vec!["r99".to_string()]));
        assert_eq!(got[1].0, ambiguous(1));
    }

    #[test]
    fn bisulfite_ambiguous_survivor() {
        use crate::test_utils::record;

        let bis = |mismatches: i32, ambiguous: i32| record("r6", 0, "50M", &[(*b"NM", mismatches), (*b"ZA", ambiguous)]);

        let got = run(
            vec![vec![bis(0, 1)], vec![bis(1, 0)], vec![bis(40, 0)]],
            DataType::Bisulfite, (0.1, 0.1, 1), SelectionMode::Standard,
        );

        for (stats, out) in got {
            assert_eq!(stats, rejected(1));
            assert!(out.is_empty());
        }
    }

    #[test]
    fn reads_missing_from_some_species() {
        // species0: a c e, species1: b c, species2: c d e
        let got = run(
            vec![
                vec![rna("a", 0, 1), rna("c", 0, 1), rna("e", 2, 1)],
                vec![rna("b", 9, 1), rna("c", 1, 1)],
                vec![rna("c", 2, 1), rna("d", 0, 1), rna("e", 1, 1)],
            ],
            DataType::RnaSeq, (0.1, 0.1, 1), SelectionMode::Standard,
        );

        // a: alone in 0, accepted. b: alone in 1, rejected (9 > 5).
        // c: 0 wins. d: alone in 2, accepted. e: 2 wins.
        assert_eq!(got[0].1, vec!["a".to_string(), "c".to_string()]);
        assert_eq!(got[1].1, Vec::<String>::new());
        assert_eq!(got[2].1, vec!["d".to_string(), "e".to_string()]);

        assert_eq!(got[0].0, Statistics{ accepted_hits: 2, accepted_reads: 2, rejected_hits: 1, rejected_reads: 1, ..Default::default() });
        assert_eq!(got[1].0, Statistics{ rejected_hits: 2, rejected_reads: 2, ..Default::default() });
        assert_eq!(got[2].0, Statistics{ accepted_hits: 2, accepted_reads: 2, rejected_hits: 1, rejected_reads: 1, ..Default::default() });
    }

    #[test]
    fn whole_groups_are_written() {
        use crate::test_utils::record;

        let dna = |name: &str, flags: u16, mismatches: i32| record(name, flags, "50M", &[(*b"XM", mismatches)]);

        let got = run(
            vec![
                vec![dna("r1", 0, 0), dna("r1", 256, 2), dna("r2", 0, 3)],
                vec![dna("r1", 0, 1), dna("r2", 0, 0), dna("r2", 256, 0)],
            ],
            DataType::DnaSeq, (0.1, 0.1, 999999), SelectionMode::Standard,
        );

        assert_eq!(got[0].1, vec!["r1".to_string(), "r1".to_string()]);
        assert_eq!(got[1].1, vec!["r2".to_string(), "r2".to_string()]);
        assert_eq!(got[0].0, Statistics{ accepted_hits: 2, accepted_reads: 1, rejected_hits: 1, rejected_reads: 1, ..Default::default() });
        assert_eq!(got[1].0, Statistics{ accepted_hits: 2, accepted_reads: 1, rejected_hits: 1, rejected_reads: 1, ..Default::default() });
    }

    #[test]
    fn empty_inputs() {
        let got = run(vec![vec![], vec![]], DataType::RnaSeq, (0.1, 0.1, 1), SelectionMode::Standard);

        for (stats, out) in got {
            assert_eq!(stats, Statistics::default());
            assert!(out.is_empty());
        }
    }

    #[test]
    fn one_empty_input() {
        let got = run(
            vec![vec![], vec![rna("r1", 0, 1), rna("r2", 6, 1)]],
            DataType::RnaSeq, (0.1, 0.1, 1), SelectionMode::Standard,
        );

        assert_eq!(got[0].0, Statistics::default());
        assert_eq!(got[1].1, vec!["r1".to_string()]);
        assert_eq!(got[1].0.total_reads(), 2);
    }

    #[test]
    fn perfect_hit_with_zero_thresholds() {
        let got = run(vec![vec![rna("r1", 0, 1)]], DataType::RnaSeq, (0.0, 0.0, 1), SelectionMode::Standard);

        assert_eq!(got[0].0, accepted(1));
    }

    #[test]
    fn unsorted_input_is_fatal() {
        use crate::error::FilterError;

        let mut merge = driver(
            vec![vec![rna("r2", 0, 1), rna("r1", 0, 1)], vec![rna("r1", 0, 1)]],
            DataType::RnaSeq, (0.1, 0.1, 1), SelectionMode::Standard,
        );

        let err = merge.run().unwrap_err();
        assert!(matches!(err.downcast_ref::<FilterError>(), Some(FilterError::InvalidInput(_))));
    }

    #[test]
    fn counters_cover_every_group() {
        let inputs = vec![
            vec![rna("a", 0, 1), rna("b", 1, 1), rna("c", 0, 2), rna("d", 0, 1)],
            vec![rna("b", 1, 1), rna("c", 0, 1), rna("e", 0, 1)],
            vec![rna("a", 3, 1), rna("d", 0, 1), rna("e", 7, 1), rna("f", 0, 1)],
        ];
        let n_groups: Vec<u64> = inputs.iter().map(|x| x.len() as u64).collect();

        let got = run(inputs, DataType::RnaSeq, (0.1, 0.1, 1), SelectionMode::Standard);

        for (idx, (stats, _)) in got.iter().enumerate() {
            assert_eq!(stats.total_reads(), n_groups[idx]);
        }
    }
}
