//! Command-line surface.
//!
//! A thin `clap` derive struct. All cross-flag validation (the sort that
//! can't be expressed as a `clap` constraint without contortion) happens in
//! [`crate::config::RunConfig::try_from`], not here — this module only
//! knows about flag syntax.

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "trassign",
    about = "Assign paired-end reads to tandem-repeat loci in a pangenome"
)]
pub struct Args {
    /// k-mer size
    #[arg(short = 'k', value_name = "INT")]
    pub k: usize,

    /// prefix for <p>.tr.kmers, <p>.ntr.kmers, <p>.graph.kmers
    #[arg(long = "qs", value_name = "PREFIX")]
    pub qs: PathBuf,

    /// interleaved paired-end FASTA input
    #[arg(long = "fai", value_name = "PATH", conflicts_with = "fqi")]
    pub fai: Option<PathBuf>,

    /// interleaved paired-end FASTQ input
    #[arg(long = "fqi", value_name = "PATH")]
    pub fqi: Option<PathBuf>,

    /// output prefix; writes <prefix>.tr.kmers unless -e 1
    #[arg(short = 'o', value_name = "PREFIX")]
    pub out: Option<PathBuf>,

    /// worker thread count
    #[arg(short = 'p', value_name = "INT", default_value_t = 1)]
    pub threads: usize,

    /// per-strand count threshold C
    #[arg(long = "cth", value_name = "INT", default_value_t = 1)]
    pub cth: u64,

    /// specificity threshold R, in [0.5, 1]
    #[arg(long = "rth", value_name = "FLOAT", default_value_t = 0.5)]
    pub rth: f64,

    /// enable graph threading without correction; argument is thread_cth
    #[arg(short = 'g', value_name = "INT", conflicts_with = "gc")]
    pub g: Option<u64>,

    /// enable graph threading with correction; argument is thread_cth
    #[arg(long = "gc", value_name = "INT")]
    pub gc: Option<u64>,

    /// emit alignment traces (requires -g/-gc)
    #[arg(short = 'a')]
    pub align: bool,

    /// write extracted reads to stdout: 1 preserves titles (skips .tr.kmers), 2 appends :<locus>_<mate>
    #[arg(short = 'e', value_name = "{1,2}")]
    pub extract: Option<u8>,

    /// override pre-filter parameters: N_FILTER NM_FILTER
    #[arg(long = "kf", num_args = 2, value_names = ["N_FILTER", "NM_FILTER"])]
    pub kf: Option<Vec<u32>>,

    /// simulation hook mode: 1 = locus-of-origin (.tr read titles), 2 = genome-of-origin
    #[arg(short = 's', value_name = "{1,2}")]
    pub sim: Option<u8>,

    /// locus map file for simulation mode 2 (genome locus -> pangenome locus)
    #[arg(short = 'm', value_name = "PATH")]
    pub locus_map: Option<PathBuf>,

    /// bait k-mer file: indexed only, never a classification winner
    #[arg(short = 'b', value_name = "PATH")]
    pub bait: Option<PathBuf>,

    /// trim mode: load <qs>.tr.trimN.kmers instead of <qs>.tr.kmers
    #[arg(short = 't', value_name = "N")]
    pub trim: Option<u32>,

    /// augmentation mode: load <qs>.tr.aug.kmers instead of <qs>.tr.kmers
    #[arg(long = "au")]
    pub augment: bool,
}
