//! Per-locus de Bruijn graph and its on-disk loader.
//!
//! Nodes are directed (non-canonical) k-mers; the value is a 4-bit mask of
//! outgoing edges, bit i set iff there is an edge to the node obtained by
//! dropping the first base and appending nucleotide `i` (A=0 C=1 G=2 T=3).
//! Same block framing as the TR k-mer file (spec §6), with the count
//! column holding the bitmask instead of an occurrence count.

use crate::bio::kmers::{push_base, Kmer};
use crate::error::{AppError, Result};
use crate::index::LocusId;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub type LocusGraph = HashMap<Kmer, u8>;
pub type Graph = Vec<LocusGraph>;

/// The node reached by dropping the first base of `node` and appending
/// `nt` (0..=3).
#[inline]
pub fn shift_append(node: Kmer, k: usize, nt: u64) -> Kmer {
    push_base(node, k, nt)
}

/// All nodes reachable from `node` by a single set edge bit, in nucleotide
/// order.
pub fn out_nodes(graph: &LocusGraph, node: Kmer, k: usize) -> Vec<Kmer> {
    let mut out = Vec::with_capacity(4);
    if let Some(&mask) = graph.get(&node) {
        for nt in 0..4u64 {
            if mask & (1 << nt) != 0 {
                out.push(shift_append(node, k, nt));
            }
        }
    }
    out
}

pub fn load_graph(path: &Path, k: usize, n_loci: LocusId) -> Result<Graph> {
    let text = std::fs::read_to_string(path).map_err(|source| AppError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut graph: Graph = vec![HashMap::new(); n_loci as usize];
    let mut current_locus: Option<u32> = None;
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        if let Some(rest) = line.strip_prefix('>') {
            let locus: u32 = rest.trim().parse().map_err(|_| AppError::MalformedIndexFile {
                path: path.to_path_buf(),
                reason: format!("line {}: header {rest:?} is not a locus id", lineno + 1),
            })?;
            current_locus = Some(locus);
            continue;
        }
        let locus = current_locus.ok_or_else(|| AppError::MalformedIndexFile {
            path: path.to_path_buf(),
            reason: format!("line {}: node row before any >locusId header", lineno + 1),
        })?;
        let mut parts = line.splitn(2, '\t');
        let kmer_txt = parts.next().unwrap();
        let mask_txt = parts.next().ok_or_else(|| AppError::MalformedIndexFile {
            path: path.to_path_buf(),
            reason: format!("line {}: missing edge-mask column", lineno + 1),
        })?;
        let mask: u8 = mask_txt.trim().parse().map_err(|_| AppError::MalformedIndexFile {
            path: path.to_path_buf(),
            reason: format!("line {}: edge mask {mask_txt:?} is not a small integer", lineno + 1),
        })?;
        let seq = kmer_txt.trim().as_bytes();
        if seq.len() != k {
            return Err(AppError::MalformedIndexFile {
                path: path.to_path_buf(),
                reason: format!("line {}: node {kmer_txt:?} is not length {k}", lineno + 1),
            });
        }
        let mut node = 0u64;
        for &b in seq {
            let code = crate::bio::kmers::encode_base(b).ok_or_else(|| AppError::MalformedIndexFile {
                path: path.to_path_buf(),
                reason: format!("line {}: node {kmer_txt:?} has a non-ACGT base", lineno + 1),
            })?;
            node = push_base(node, k, code);
        }
        graph
            .get_mut(locus as usize)
            .ok_or_else(|| AppError::MalformedIndexFile {
                path: path.to_path_buf(),
                reason: format!("line {}: locus {locus} exceeds loaded TR locus count", lineno + 1),
            })?
            .insert(node, mask);
    }
    Ok(graph)
}

pub fn graph_path(qs_prefix: &Path) -> PathBuf {
    PathBuf::from(format!("{}.graph.kmers", qs_prefix.to_string_lossy()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bio::kmers::encode_base;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn out_nodes_follows_mask_bits() {
        let k = 3;
        let mut node = 0u64;
        for b in [b'A', b'C', b'G'] {
            node = push_base(node, k, encode_base(b).unwrap());
        }
        let mut g: LocusGraph = HashMap::new();
        g.insert(node, 0b0101); // edges to A and G
        let nexts = out_nodes(&g, node, k);
        assert_eq!(nexts.len(), 2);
        assert_eq!(nexts[0], shift_append(node, k, 0));
        assert_eq!(nexts[1], shift_append(node, k, 2));
    }

    #[test]
    fn load_graph_parses_blocks() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("p.graph.kmers");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, ">0").unwrap();
        writeln!(f, "AAA\t3").unwrap();
        drop(f);

        let g = load_graph(&path, 3, 1).unwrap();
        assert_eq!(g.len(), 1);
        let mut node = 0u64;
        for b in [b'A', b'A', b'A'] {
            node = push_base(node, 3, encode_base(b).unwrap());
        }
        assert_eq!(g[0].get(&node), Some(&3u8));
    }
}
