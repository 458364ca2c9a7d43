//! Cheap pre-rejection before full classification (spec §4.2).
//!
//! Subsamples `N_FILTER` positions from each mate's canonical k-mer list,
//! evenly spaced across the list, and stops counting a mate's hits as soon
//! as `NM_FILTER` is reached. The pair passes only if both mates clear the
//! bar independently.

use crate::index::KmerToLoci;
use crate::bio::kmers::Kmer;

/// Sample positions `{0, S, 2S, ..., L-1}` for `n` samples over a list of
/// length `len`, where `S = (L-1)/(N-1)` is a single floored stride (not a
/// per-position recomputation) and the final position is forced to `L-1`
/// rather than derived from the stride. Returns fewer than `n` positions
/// only when `len` itself is smaller than `n`.
fn sample_positions(len: usize, n: u32) -> Vec<usize> {
    if len == 0 {
        return Vec::new();
    }
    let n = n.max(1) as usize;
    if n == 1 || len == 1 {
        return vec![0];
    }
    let n = n.min(len);
    let stride = (len - 1) / (n - 1);
    (0..n)
        .map(|i| if i == n - 1 { len - 1 } else { i * stride })
        .collect::<Vec<_>>()
}

/// Does this mate's k-mer list clear `nm_filter` hits among `n_filter`
/// sampled positions, stopping as soon as it does?
fn mate_passes(kmers: &[Kmer], index: &KmerToLoci, n_filter: u32, nm_filter: u32) -> bool {
    let mut hits = 0u32;
    for pos in sample_positions(kmers.len(), n_filter) {
        if index.contains_key(&kmers[pos]) {
            hits += 1;
            if hits >= nm_filter {
                return true;
            }
        }
    }
    hits >= nm_filter
}

/// The pre-filter: both mates must independently clear `nm_filter` hits.
pub fn kfilter(
    kmers1: &[Kmer],
    kmers2: &[Kmer],
    index: &KmerToLoci,
    n_filter: u32,
    nm_filter: u32,
) -> bool {
    mate_passes(kmers1, index, n_filter, nm_filter) && mate_passes(kmers2, index, n_filter, nm_filter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn idx_with(kmers: &[Kmer]) -> KmerToLoci {
        let mut m = HashMap::new();
        for &k in kmers {
            m.insert(k, vec![0]);
        }
        m
    }

    #[test]
    fn empty_mate_fails() {
        let idx = idx_with(&[1, 2, 3]);
        assert!(!kfilter(&[], &[1, 2, 3, 4, 5], &idx, 4, 1));
    }

    #[test]
    fn passes_when_both_mates_hit() {
        let idx = idx_with(&[10, 20]);
        let m1 = vec![10, 0, 0, 0, 0];
        let m2 = vec![0, 0, 0, 0, 20];
        assert!(kfilter(&m1, &m2, &idx, 4, 1));
    }

    #[test]
    fn fails_when_one_mate_misses() {
        let idx = idx_with(&[10]);
        let m1 = vec![10, 0, 0, 0, 0];
        let m2 = vec![1, 2, 3, 4, 5];
        assert!(!kfilter(&m1, &m2, &idx, 4, 1));
    }

    #[test]
    fn monotonicity_smaller_nm_filter_still_passes() {
        let idx = idx_with(&[10, 20, 30]);
        let m1 = vec![10, 20, 30, 0, 0];
        let m2 = vec![10, 20, 30, 0, 0];
        assert!(kfilter(&m1, &m2, &idx, 4, 2));
        // Property test 2: accepting at NM_FILTER=2 implies accepting at any smaller NM_FILTER.
        assert!(kfilter(&m1, &m2, &idx, 4, 1));
    }
}
