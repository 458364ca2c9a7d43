//! Run configuration, assembled once from parsed CLI args and validated
//! before any worker thread is spawned.

use crate::cli::Args;
use anyhow::{anyhow, bail, Result};
use std::path::PathBuf;

pub const DEFAULT_N_FILTER: u32 = 4;
pub const DEFAULT_NM_FILTER: u32 = 1;
pub const READS_PER_BATCH: usize = 300_000;
pub const MAX_CORRECTION: u32 = 2;

#[derive(Debug, Clone, Copy)]
pub enum Threading {
    Disabled,
    Enabled { thread_cth: u64, correction: bool },
}

#[derive(Debug, Clone, Copy)]
pub enum ExtractMode {
    PreserveTitles, // -e 1
    Annotated,      // -e 2
}

#[derive(Debug, Clone, Copy)]
pub enum SimMode {
    TrOrigin,     // -s 1
    GenomeOrigin, // -s 2
}

#[derive(Debug, Clone)]
pub enum InputFile {
    Fasta(PathBuf),
    Fastq(PathBuf),
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub k: usize,
    pub qs_prefix: PathBuf,
    pub input: InputFile,
    pub out_prefix: Option<PathBuf>,
    pub threads: usize,
    pub cth: u64,
    pub rth: f64,
    pub threading: Threading,
    pub align: bool,
    pub extract: Option<ExtractMode>,
    pub n_filter: u32,
    pub nm_filter: u32,
    pub sim: Option<SimMode>,
    pub locus_map: Option<PathBuf>,
    pub bait: Option<PathBuf>,
    pub trim: Option<u32>,
    pub augment: bool,
}

impl TryFrom<Args> for RunConfig {
    type Error = anyhow::Error;

    fn try_from(a: Args) -> Result<Self> {
        if a.k == 0 || a.k > 32 {
            bail!("-k must be in 1..=32 (2 bits/base must fit a u64 k-mer)");
        }
        if !(0.5..=1.0).contains(&a.rth) {
            bail!("-rth must be in [0.5, 1], got {}", a.rth);
        }

        let input = match (a.fai, a.fqi) {
            (Some(p), None) => InputFile::Fasta(p),
            (None, Some(p)) => InputFile::Fastq(p),
            (None, None) => bail!("one of -fai / -fqi is required"),
            (Some(_), Some(_)) => bail!("-fai and -fqi are mutually exclusive"),
        };

        let threading = match (a.g, a.gc) {
            (None, None) => Threading::Disabled,
            (Some(thread_cth), None) => Threading::Enabled {
                thread_cth,
                correction: false,
            },
            (None, Some(thread_cth)) => Threading::Enabled {
                thread_cth,
                correction: true,
            },
            (Some(_), Some(_)) => bail!("-g and -gc are mutually exclusive"),
        };

        if a.align && matches!(threading, Threading::Disabled) {
            bail!("-a (alignment traces) requires -g or -gc");
        }

        let extract = match a.extract {
            None => None,
            Some(1) => Some(ExtractMode::PreserveTitles),
            Some(2) => Some(ExtractMode::Annotated),
            Some(other) => bail!("-e must be 1 or 2, got {other}"),
        };

        if !matches!(extract, Some(ExtractMode::PreserveTitles)) && a.out.is_none() {
            bail!("-o is required unless -e 1 is given");
        }

        let (n_filter, nm_filter) = match a.kf {
            None => (DEFAULT_N_FILTER, DEFAULT_NM_FILTER),
            Some(v) if v.len() == 2 => (v[0], v[1]),
            Some(_) => unreachable!("clap enforces num_args = 2 for -kf"),
        };
        if n_filter == 0 {
            bail!("-kf N_FILTER must be >= 1");
        }

        let sim = match a.sim {
            None => None,
            Some(1) => Some(SimMode::TrOrigin),
            Some(2) => Some(SimMode::GenomeOrigin),
            Some(other) => bail!("-s must be 1 or 2, got {other}"),
        };
        if a.locus_map.is_some() && !matches!(sim, Some(SimMode::GenomeOrigin)) {
            bail!("-m is only meaningful with -s 2");
        }

        if a.threads == 0 {
            return Err(anyhow!("-p must be >= 1"));
        }

        Ok(RunConfig {
            k: a.k,
            qs_prefix: a.qs,
            input,
            out_prefix: a.out,
            threads: a.threads,
            cth: a.cth,
            rth: a.rth,
            threading,
            align: a.align,
            extract,
            n_filter,
            nm_filter,
            sim,
            locus_map: a.locus_map,
            bait: a.bait,
            trim: a.trim,
            augment: a.augment,
        })
    }
}
