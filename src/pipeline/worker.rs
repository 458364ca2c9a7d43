//! Per-pair processing: extraction, pre-filter, classification, threading,
//! and the local accumulator updates one worker folds in at the next
//! batch boundary (spec §4.6 step 2 — no locking here).

use crate::bio::kmers::{canonical, extract_canonical};
use crate::classifier::classify;
use crate::config::{ExtractMode, RunConfig, Threading};
use crate::error::Result;
use crate::graph::Graph;
use crate::index::{Index, LocusCounts, LocusId};
use crate::io::reads::ReadPair;
use crate::multiplicity::{count_dup_remove, fill_stats};
use crate::prefilter::kfilter;
use crate::simulation::{PairOutcome, SimHook};
use crate::threading::{thread_read, ThreadResult};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default)]
pub struct Counters {
    pub n_reads: u64,
    pub n_pre_filtered: u64,
    pub n_threading_reads: u64,
    pub n_feasible_reads: u64,
}

impl Counters {
    pub fn merge_from(&mut self, other: &Counters) {
        self.n_reads += other.n_reads;
        self.n_pre_filtered += other.n_pre_filtered;
        self.n_threading_reads += other.n_threading_reads;
        self.n_feasible_reads += other.n_feasible_reads;
    }
}

/// One pair's worth of output, buffered locally until the writer lock is
/// acquired at the next batch boundary.
pub struct OutputLines {
    pub extracted: Option<ExtractedPair>,
    pub alignment: Option<AlignmentLine>,
}

pub struct ExtractedPair {
    pub title1: Vec<u8>,
    pub seq1: Vec<u8>,
    pub title2: Vec<u8>,
    pub seq2: Vec<u8>,
    pub locus: Option<LocusId>,
}

pub struct AlignmentLine {
    pub src_locus: Option<LocusId>,
    pub dest_locus: LocusId,
    pub title1: Vec<u8>,
    pub seq1: Vec<u8>,
    pub ops2: Vec<char>,
    pub title2: Vec<u8>,
    pub seq2: Vec<u8>,
    pub ops1: Vec<char>,
}

/// Accumulate `by` into `delta[kmer]`, but only when `kmer` is already a key
/// of `baseline` (spec's "only counts for keys already present [in the
/// loaded TR table] are incremented" invariant). `baseline` is the
/// read-only table loaded at startup; `delta` is this worker's per-batch
/// accumulator, merged into the shared running total at the next batch
/// boundary.
fn increment_existing(baseline: &HashMap<u64, u64>, delta: &mut HashMap<u64, u64>, kmer: u64, by: u64) {
    if baseline.contains_key(&kmer) {
        *delta.entry(kmer).or_insert(0) += by;
    }
}

/// Process one read pair against the global read-only index/graph,
/// updating `local_counts` (a per-worker delta map over the TR table) and
/// `local_counters`, invoking `sim_hook` once, and returning any output
/// lines to later flush under the writer lock.
#[allow(clippy::too_many_arguments)]
pub fn process_pair(
    pair: &ReadPair,
    index: &Index,
    graph: Option<&Graph>,
    cfg: &RunConfig,
    local_counters: &mut Counters,
    local_counts: &mut LocusCounts,
    sim_hook: &mut dyn SimHook,
) -> Result<Option<OutputLines>> {
    local_counters.n_reads += 1;

    let kmers1 = extract_canonical(&pair.seq1, cfg.k);
    let kmers2 = extract_canonical(&pair.seq2, cfg.k);

    if !kfilter(&kmers1, &kmers2, &index.kmer_to_loci, cfg.n_filter, cfg.nm_filter) {
        local_counters.n_pre_filtered += 1;
        return Ok(None);
    }

    let dup = count_dup_remove(&kmers1, &kmers2);
    let (stats, remain) = fill_stats(dup, &index.kmer_to_loci);
    let dest_locus = classify(&stats, &remain, &index.kmer_to_loci, index.n_loci, cfg.cth, cfg.rth);

    let mut ops1 = cfg.align.then(Vec::new);
    let mut ops2 = cfg.align.then(Vec::new);
    let mut threaded_ok = true;
    let mut corrected_in_dest_tr: Vec<(u64, bool)> = Vec::new();

    if let (Threading::Enabled { thread_cth, correction }, Some(locus)) = (cfg.threading, dest_locus) {
        local_counters.n_threading_reads += 1;
        let locus_graph = &graph.expect("threading enabled implies a loaded graph")[locus as usize];
        let tr_kmers = &index.tr_counts[locus as usize];

        let mut corrected = Vec::new();
        let r1 = thread_read(locus_graph, tr_kmers, &pair.seq1, cfg.k, thread_cth, correction, ops1.as_mut(), &mut corrected);
        let r2 = thread_read(locus_graph, tr_kmers, &pair.seq2, cfg.k, thread_cth, correction, ops2.as_mut(), &mut corrected);

        threaded_ok = !matches!(r1, ThreadResult::Reject) && !matches!(r2, ThreadResult::Reject);
        if threaded_ok {
            local_counters.n_feasible_reads += 1;
            let mut cakmers: HashMap<u64, u64> = HashMap::new();
            for kmer in corrected {
                *cakmers.entry(canonical(kmer, cfg.k)).or_insert(0) += 1;
            }
            let baseline = &index.tr_counts[locus as usize];
            let delta = &mut local_counts[locus as usize];
            for (kmer, count) in &cakmers {
                increment_existing(baseline, delta, *kmer, *count);
            }
            corrected_in_dest_tr = cakmers.into_iter().map(|(kmer, count)| (count, baseline.contains_key(&kmer))).collect();
        }
    } else if let Some(locus) = dest_locus {
        // Threading disabled: counts are updated straight from the
        // classifier's chosen locus.
        let baseline = &index.tr_counts[locus as usize];
        let delta = &mut local_counts[locus as usize];
        for stat in &stats {
            increment_existing(baseline, delta, stat.kmer, stat.count.total());
        }
    }

    let dup_counts: Vec<(u8, u8)> = stats.iter().map(|s| (s.count.fwd, s.count.rev)).collect();
    let kmer_values: Vec<u64> = stats.iter().map(|s| s.kmer).collect();

    // Only worth computing when the active hook actually tracks a locus of
    // origin (a plain run has no use for these and `origin_locus` is `None`).
    // An invalid simulation locus id surfaces here as a hard error (spec §7).
    let in_src_tr: Vec<bool> = match sim_hook.origin_locus(&pair.title1)? {
        Some(src) if (src as usize) < index.tr_counts.len() => {
            kmer_values.iter().map(|k| index.tr_counts[src as usize].contains_key(k)).collect()
        }
        _ => Vec::new(),
    };
    let in_dest_tr: Vec<bool> = dest_locus
        .map(|dest| kmer_values.iter().map(|k| index.tr_counts[dest as usize].contains_key(k)).collect())
        .unwrap_or_default();

    // Simulation accounting is skipped entirely under -e 1 (preserve-titles
    // extraction), matching the original's `extractFasta != 1` guard.
    if !matches!(cfg.extract, Some(ExtractMode::PreserveTitles)) {
        sim_hook.on_pair_classified(
            local_counters.n_reads,
            &PairOutcome {
                title1: &pair.title1,
                dest_locus,
                kmers: &kmer_values,
                dup_counts: &dup_counts,
                kmer_in_src_tr: &in_src_tr,
                kmer_in_dest_tr: &in_dest_tr,
                corrected_in_dest_tr: &corrected_in_dest_tr,
            },
        )?;
    }

    if dest_locus.is_none() || !threaded_ok {
        return Ok(None);
    }

    let extracted = cfg.extract.is_some().then(|| ExtractedPair {
        title1: pair.title1.clone(),
        seq1: pair.seq1.clone(),
        title2: pair.title2.clone(),
        seq2: pair.seq2.clone(),
        locus: dest_locus,
    });

    let alignment = if cfg.align {
        Some(AlignmentLine {
            src_locus: None,
            dest_locus: dest_locus.unwrap(),
            title1: pair.title1.clone(),
            seq1: pair.seq1.clone(),
            ops2: ops2.unwrap_or_default(),
            title2: pair.title2.clone(),
            seq2: pair.seq2.clone(),
            ops1: ops1.unwrap_or_default(),
        })
    } else {
        None
    };

    Ok(Some(OutputLines { extracted, alignment }))
}
