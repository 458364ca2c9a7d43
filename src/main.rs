//! Assigns paired-end reads to tandem-repeat loci in a pangenome, with
//! optional de Bruijn graph threading and single-nucleotide correction.

mod bio;
mod classifier;
mod cli;
mod config;
mod error;
mod graph;
mod index;
mod io;
mod multiplicity;
mod pipeline;
mod prefilter;
mod simulation;
mod threading;

use clap::Parser;
use config::{RunConfig, SimMode, Threading};
use log::info;
use simulation::{GenomeOriginHook, NullSimHook, SimHook, TrOriginHook};
use std::path::Path;
use std::sync::Arc;

fn load_locus_map(path: &Path) -> anyhow::Result<Vec<index::LocusId>> {
    let text = std::fs::read_to_string(path)?;
    text.split_whitespace()
        .map(|tok| tok.parse::<index::LocusId>().map_err(|e| anyhow::anyhow!("{path:?}: {e}")))
        .collect()
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = cli::Args::parse();
    let cfg = RunConfig::try_from(args)?;
    info!("k={} threads={} cth={} rth={}", cfg.k, cfg.threads, cfg.cth, cfg.rth);

    let idx = Arc::new(index::load_index(&cfg)?);
    let n_loci = idx.n_loci;

    let graph = match cfg.threading {
        Threading::Disabled => None,
        Threading::Enabled { .. } => {
            let path = graph::graph_path(&cfg.qs_prefix);
            Some(Arc::new(graph::load_graph(&path, cfg.k, n_loci)?))
        }
    };

    let input_path: &Path = match &cfg.input {
        config::InputFile::Fasta(p) | config::InputFile::Fastq(p) => p,
    };
    let reader = io::reads::PairReader::open(input_path)?;

    let locus_map = cfg
        .locus_map
        .as_ref()
        .map(|p| load_locus_map(p))
        .transpose()?;

    let cfg = Arc::new(cfg);
    let shared = Arc::new(pipeline::SharedState::new(reader, idx.clone(), graph, cfg.clone()));

    let sim_mode = cfg.sim;
    let handles = pipeline::spawn_workers(cfg.threads, shared.clone(), move || -> Box<dyn SimHook + Send> {
        match sim_mode {
            None => Box::new(NullSimHook),
            Some(SimMode::TrOrigin) => Box::new(TrOriginHook::new(n_loci)),
            Some(SimMode::GenomeOrigin) => Box::new(GenomeOriginHook::new(n_loci, locus_map.clone())),
        }
    });

    let final_state = pipeline::join_all(shared, handles)?;

    eprintln!(
        "nReads={} nPreFiltered={} nThreadingReads={} nFeasibleReads={}",
        final_state.counters.n_reads,
        final_state.counters.n_pre_filtered,
        final_state.counters.n_threading_reads,
        final_state.counters.n_feasible_reads,
    );

    if !matches!(cfg.extract, Some(config::ExtractMode::PreserveTitles)) {
        if let Some(out_prefix) = &cfg.out_prefix {
            let path = Path::new(&format!("{}.tr.kmers", out_prefix.to_string_lossy())).to_path_buf();
            io::output::write_tr_kmers(&path, &final_state.tr_counts, cfg.k)?;
        }
    }

    if let Some(SimMode::TrOrigin) = cfg.sim {
        if let Some(out_prefix) = &cfg.out_prefix {
            let path = Path::new(&format!("{}.msa", out_prefix.to_string_lossy())).to_path_buf();
            io::output::write_msa_stats(&path, &final_state.sim.msa_stats)?;
        }
    }
    if let Some(SimMode::GenomeOrigin) = cfg.sim {
        if let Some(out_prefix) = &cfg.out_prefix {
            let path = Path::new(&format!("{}.err", out_prefix.to_string_lossy())).to_path_buf();
            io::output::write_err_db(&path, &final_state.sim.err_db)?;
        }
    }

    Ok(())
}
