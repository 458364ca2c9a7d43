//! The inverted k-mer index, the per-locus TR count table, and loading
//! both (plus the bait/trim/augment file variants) from disk.
//!
//! File format (spec): newline-delimited blocks, each starting with a
//! `>locusId` header line, followed by `kmer\tcount` rows. Loading the
//! handful of independent per-locus blocks is embarrassingly parallel and
//! read-only, so it is the one place this crate reaches for `rayon`
//! instead of the worker-pool model used for the main read stream.

use crate::bio::kmers::{canonical, encode_base, push_base, Kmer};
use crate::config::RunConfig;
use crate::error::{AppError, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Sentinel meaning "bait / unassigned"; equals the number of real TR loci.
pub type LocusId = u32;

pub type KmerToLoci = HashMap<Kmer, Vec<LocusId>>;
pub type LocusCounts = Vec<HashMap<Kmer, u64>>;

pub struct Index {
    pub kmer_to_loci: KmerToLoci,
    pub tr_counts: LocusCounts,
    pub n_loci: LocusId,
}

impl Index {
    /// Locus id reserved for "bait / non-TR / unassigned".
    pub fn sentinel(&self) -> LocusId {
        self.n_loci
    }
}

/// One parsed `>locusId` block: the header's numeric id and its
/// `(kmer, count_or_bitmask)` rows, kmer given as its raw ASCII text.
struct Block {
    locus: u32,
    rows: Vec<(Vec<u8>, u64)>,
}

fn parse_blocks(path: &Path) -> Result<Vec<Block>> {
    let text = std::fs::read_to_string(path).map_err(|source| AppError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut blocks = Vec::new();
    let mut current: Option<Block> = None;
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        if let Some(rest) = line.strip_prefix('>') {
            if let Some(b) = current.take() {
                blocks.push(b);
            }
            let locus: u32 = rest.trim().parse().map_err(|_| AppError::MalformedIndexFile {
                path: path.to_path_buf(),
                reason: format!("line {}: header {rest:?} is not a locus id", lineno + 1),
            })?;
            current = Some(Block { locus, rows: Vec::new() });
        } else {
            let mut parts = line.splitn(2, '\t');
            let kmer_txt = parts.next().ok_or_else(|| AppError::MalformedIndexFile {
                path: path.to_path_buf(),
                reason: format!("line {}: missing k-mer column", lineno + 1),
            })?;
            let count_txt = parts.next().ok_or_else(|| AppError::MalformedIndexFile {
                path: path.to_path_buf(),
                reason: format!("line {}: missing count column", lineno + 1),
            })?;
            let count: u64 = count_txt.trim().parse().map_err(|_| AppError::MalformedIndexFile {
                path: path.to_path_buf(),
                reason: format!("line {}: count {count_txt:?} is not an integer", lineno + 1),
            })?;
            let block = current.as_mut().ok_or_else(|| AppError::MalformedIndexFile {
                path: path.to_path_buf(),
                reason: format!("line {}: k-mer row before any >locusId header", lineno + 1),
            })?;
            block.rows.push((kmer_txt.trim().as_bytes().to_vec(), count));
        }
    }
    if let Some(b) = current.take() {
        blocks.push(b);
    }
    Ok(blocks)
}

/// Encode a raw ASCII k-mer exactly as written (no canonicalization); the
/// caller decides whether the file's k-mers are already canonical.
fn encode_directed(seq: &[u8], k: usize) -> Option<Kmer> {
    if seq.len() != k {
        return None;
    }
    let mut w = 0u64;
    for &b in seq {
        w = push_base(w, k, encode_base(b)?);
    }
    Some(w)
}

/// Load a TR k-mer file into a fresh index (k-mers are already canonical in
/// this file; counts become the initial `LocusCounts[L]`).
fn load_tr(path: &Path, k: usize) -> Result<(KmerToLoci, LocusCounts, LocusId)> {
    let blocks = parse_blocks(path)?;
    let n_loci = blocks.iter().map(|b| b.locus + 1).max().unwrap_or(0);
    let mut kmer_to_loci: KmerToLoci = HashMap::new();
    let mut tr_counts: LocusCounts = vec![HashMap::new(); n_loci as usize];
    for b in blocks {
        for (kmer_txt, count) in b.rows {
            let kmer = encode_directed(&kmer_txt, k).ok_or_else(|| AppError::MalformedIndexFile {
                path: path.to_path_buf(),
                reason: format!("k-mer {:?} is not valid length-{k} ACGT", String::from_utf8_lossy(&kmer_txt)),
            })?;
            let canon = canonical(kmer, k);
            let loci = kmer_to_loci.entry(canon).or_default();
            if !loci.contains(&b.locus) {
                loci.push(b.locus);
            }
            tr_counts[b.locus as usize].insert(canon, count);
        }
    }
    Ok((kmer_to_loci, tr_counts, n_loci))
}

/// Load a "reject-only" file (ntr / bait): all k-mers register against the
/// sentinel locus and never gain a `LocusCounts` entry.
fn load_reject_only(path: &Path, k: usize, sentinel: LocusId, into: &mut KmerToLoci) -> Result<()> {
    let blocks = parse_blocks(path)?;
    for b in blocks {
        for (kmer_txt, _count) in b.rows {
            let kmer = encode_directed(&kmer_txt, k).ok_or_else(|| AppError::MalformedIndexFile {
                path: path.to_path_buf(),
                reason: format!("k-mer {:?} is not valid length-{k} ACGT", String::from_utf8_lossy(&kmer_txt)),
            })?;
            let canon = canonical(kmer, k);
            let loci = into.entry(canon).or_default();
            if !loci.contains(&sentinel) {
                loci.push(sentinel);
            }
        }
    }
    Ok(())
}

fn tr_path(cfg: &RunConfig) -> PathBuf {
    let prefix = cfg.qs_prefix.to_string_lossy();
    if cfg.augment {
        PathBuf::from(format!("{prefix}.tr.aug.kmers"))
    } else if let Some(n) = cfg.trim {
        PathBuf::from(format!("{prefix}.tr.trim{n}.kmers"))
    } else {
        PathBuf::from(format!("{prefix}.tr.kmers"))
    }
}

fn ntr_path(cfg: &RunConfig) -> PathBuf {
    PathBuf::from(format!("{}.ntr.kmers", cfg.qs_prefix.to_string_lossy()))
}

/// Load the TR table, merge in the non-TR reference and optional bait
/// k-mers (both reject-only), building the complete inverted index.
pub fn load_index(cfg: &RunConfig) -> Result<Index> {
    let tr_path = tr_path(cfg);
    let ntr_path = ntr_path(cfg);
    let k = cfg.k;

    // TR parsing (builds the table) runs alongside the non-TR reject-only
    // file's parse; both are independent read-only reads.
    let (tr_result, ntr_blocks) = rayon::join(|| load_tr(&tr_path, k), || parse_blocks(&ntr_path));
    let (mut kmer_to_loci, tr_counts, n_loci) = tr_result?;
    for b in ntr_blocks? {
        for (kmer_txt, _count) in b.rows {
            let kmer = encode_directed(&kmer_txt, k).ok_or_else(|| AppError::MalformedIndexFile {
                path: ntr_path.clone(),
                reason: format!(
                    "k-mer {:?} is not valid length-{k} ACGT",
                    String::from_utf8_lossy(&kmer_txt)
                ),
            })?;
            let canon = canonical(kmer, k);
            let loci = kmer_to_loci.entry(canon).or_default();
            if !loci.contains(&n_loci) {
                loci.push(n_loci);
            }
        }
    }

    if let Some(bait_path) = &cfg.bait {
        load_reject_only(bait_path, k, n_loci, &mut kmer_to_loci)?;
    }

    Ok(Index {
        kmer_to_loci,
        tr_counts,
        n_loci,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn write(path: &Path, contents: &str) {
        let mut f = std::fs::File::create(path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
    }

    #[test]
    fn load_tr_builds_index_and_counts() {
        let dir = tempdir().unwrap();
        let tr = dir.path().join("p.tr.kmers");
        write(&tr, ">0\nAAAAA\t3\nAAAAC\t1\n>1\nCCCCC\t5\n");

        let (idx, counts, n_loci) = load_tr(&tr, 5).unwrap();
        assert_eq!(n_loci, 2);
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[0].len(), 2);
        assert_eq!(counts[1].len(), 1);
        let aaaaa = encode_directed(b"AAAAA", 5).unwrap();
        let canon = canonical(aaaaa, 5);
        assert!(idx.get(&canon).unwrap().contains(&0));
    }

    #[test]
    fn reject_only_never_creates_counts_entry() {
        let dir = tempdir().unwrap();
        let ntr = dir.path().join("p.ntr.kmers");
        write(&ntr, ">0\nGGGGG\t1\n");
        let mut idx: KmerToLoci = HashMap::new();
        load_reject_only(&ntr, 5, 2, &mut idx).unwrap();
        let g = canonical(encode_directed(b"GGGGG", 5).unwrap(), 5);
        assert_eq!(idx.get(&g).unwrap(), &vec![2]);
    }

    #[test]
    fn malformed_header_errors() {
        let dir = tempdir().unwrap();
        let tr = dir.path().join("p.tr.kmers");
        write(&tr, ">not_a_number\nAAAAA\t1\n");
        assert!(load_tr(&tr, 5).is_err());
    }
}
