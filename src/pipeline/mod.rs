//! Fixed worker-thread pool (spec §4.6, §5): one shared reader lock, one
//! shared writer lock, per-thread local accumulators merged into the
//! shared globals at the start of each batch's critical section.
//!
//! Grounded in the teacher's `utils::parallel::process_in_batches`
//! (`std::thread::spawn` + `JoinHandle`, `thiserror`-style errors) but
//! generalized from one-shot rayon batch dispatch into the persistent
//! reader/writer-locked loop spec §4.6 requires.

pub mod worker;

use crate::config::{ExtractMode, RunConfig};
use crate::error::Result;
use crate::graph::Graph;
use crate::index::{Index, LocusCounts};
use crate::io::output::{write_alignment_trace, write_extracted_reads, ExtractedMate};
use crate::io::reads::PairReader;
use crate::simulation::{NullSimHook, SharedSimState, SimHook};
use std::io;
use std::sync::{Arc, Mutex};
use std::thread;
use worker::{process_pair, Counters};

struct ReaderSlot {
    reader: PairReader,
    counters: Counters,
    tr_counts: LocusCounts,
    sim: SharedSimState,
}

pub struct SharedState {
    reader: Mutex<ReaderSlot>,
    writer: Mutex<io::Stdout>,
    index: Arc<Index>,
    graph: Option<Arc<Graph>>,
    cfg: Arc<RunConfig>,
}

impl SharedState {
    pub fn new(reader: PairReader, index: Arc<Index>, graph: Option<Arc<Graph>>, cfg: Arc<RunConfig>) -> Self {
        // Running totals start from the loaded TR table itself, not empty:
        // `worker::increment_existing` only ever adds to keys already
        // present there, so the final merged output is baseline + run deltas.
        let tr_counts: LocusCounts = index.tr_counts.clone();
        SharedState {
            reader: Mutex::new(ReaderSlot {
                reader,
                counters: Counters::default(),
                tr_counts,
                sim: SharedSimState::default(),
            }),
            writer: Mutex::new(io::stdout()),
            index,
            graph,
            cfg,
        }
    }
}

/// Final, merged state after every worker has run to input EOF.
pub struct FinalState {
    pub counters: Counters,
    pub tr_counts: LocusCounts,
    pub sim: SharedSimState,
}

/// Spawn the fixed worker pool. `make_hook` builds a fresh per-thread sim
/// hook (hooks are thread-local; only their merged output is shared).
pub fn spawn_workers(
    n: usize,
    shared: Arc<SharedState>,
    make_hook: impl Fn() -> Box<dyn SimHook + Send> + Send + Sync + 'static,
) -> Vec<thread::JoinHandle<Result<()>>> {
    let make_hook = Arc::new(make_hook);
    (0..n)
        .map(|_| {
            let shared = Arc::clone(&shared);
            let make_hook = Arc::clone(&make_hook);
            thread::spawn(move || run_worker(shared, make_hook.as_ref()()))
        })
        .collect()
}

pub fn default_hook_factory() -> Box<dyn SimHook + Send> {
    Box::new(NullSimHook)
}

fn run_worker(shared: Arc<SharedState>, mut sim_hook: Box<dyn SimHook + Send>) -> Result<()> {
    let cfg = shared.cfg.as_ref();
    // Accumulated across one batch, flushed into the shared globals at the
    // start of the *next* batch's reader-lock critical section (spec
    // §4.6 step 1) — never read back out of the lock, only drained into it.
    let mut local_counters = Counters::default();
    let mut local_counts: LocusCounts = shared.index.tr_counts.iter().map(|_| Default::default()).collect();

    loop {
        let batch = {
            let mut slot = shared.reader.lock().expect("reader lock poisoned");
            slot.counters.merge_from(&local_counters);
            local_counters = Counters::default();
            for (locus, delta) in local_counts.iter_mut().enumerate() {
                for (kmer, count) in delta.drain() {
                    if let Some(v) = slot.tr_counts[locus].get_mut(&kmer) {
                        *v += count;
                    } else {
                        slot.tr_counts[locus].insert(kmer, count);
                    }
                }
            }
            sim_hook.merge_into(&mut slot.sim);
            log::info!(
                "nReads={} nPreFiltered={} nThreadingReads={} nFeasibleReads={}",
                slot.counters.n_reads,
                slot.counters.n_pre_filtered,
                slot.counters.n_threading_reads,
                slot.counters.n_feasible_reads,
            );
            slot.reader.read_batch(crate::config::READS_PER_BATCH)?
        };

        if batch.is_empty() {
            break;
        }

        let mut out_lines = Vec::with_capacity(batch.len());
        for pair in &batch {
            let record = process_pair(
                pair,
                &shared.index,
                shared.graph.as_deref(),
                cfg,
                &mut local_counters,
                &mut local_counts,
                sim_hook.as_mut(),
            )?;
            if let Some(record) = record {
                out_lines.push(record);
            }
        }

        if cfg.extract.is_some() || cfg.align {
            let mut out = shared.writer.lock().expect("writer lock poisoned");
            for record in &out_lines {
                if let Some(ex) = &record.extracted {
                    let locus = match cfg.extract {
                        Some(ExtractMode::Annotated) => ex.locus,
                        _ => None,
                    };
                    write_extracted_reads(
                        &mut *out,
                        &ExtractedMate { title: &ex.title1, seq: &ex.seq1 },
                        &ExtractedMate { title: &ex.title2, seq: &ex.seq2 },
                        locus,
                    )
                    .map_err(|source| crate::error::AppError::Io {
                        path: "<stdout>".into(),
                        source,
                    })?;
                }
                if let Some(al) = &record.alignment {
                    write_alignment_trace(
                        &mut *out,
                        al.src_locus,
                        al.dest_locus,
                        &al.title1,
                        &al.seq1,
                        &al.ops2,
                        &al.title2,
                        &al.seq2,
                        &al.ops1,
                    )
                    .map_err(|source| crate::error::AppError::Io {
                        path: "<stdout>".into(),
                        source,
                    })?;
                }
            }
        }
    }
    Ok(())
}

/// Join every worker handle and return the fully merged final state.
pub fn join_all(shared: Arc<SharedState>, handles: Vec<thread::JoinHandle<Result<()>>>) -> Result<FinalState> {
    for handle in handles {
        handle.join().expect("worker thread panicked")?;
    }
    let slot = Arc::try_unwrap(shared)
        .unwrap_or_else(|_| panic!("all worker handles joined; SharedState must be uniquely owned"))
        .reader
        .into_inner()
        .expect("reader lock poisoned");
    Ok(FinalState {
        counters: slot.counters,
        tr_counts: slot.tr_counts,
        sim: slot.sim,
    })
}
