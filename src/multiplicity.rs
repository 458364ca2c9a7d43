//! Multiplicity accounting: `countDupRemove` + `fillstats` (spec §4.3).
//!
//! Merges both mates' k-mer lists into deduplicated `(kmer, PairKmerCount)`
//! entries, drops anything absent from the index, sorts the survivors by
//! ascending index-multiplicity (most specific first), and computes the
//! suffix-sum `remain[i]` the classifier's early-exit proof depends on.

use crate::bio::kmers::Kmer;
use crate::index::KmerToLoci;
use itertools::Itertools;

/// Per-k-mer occurrence counts in each mate of a pair. Read lengths are
/// assumed <= 255, so counts saturate rather than overflow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PairKmerCount {
    pub fwd: u8,
    pub rev: u8,
}

impl PairKmerCount {
    pub fn total(&self) -> u64 {
        self.fwd as u64 + self.rev as u64
    }
}

#[derive(Debug, Clone, Copy)]
enum Origin {
    Fwd,
    Rev,
}

/// Tag each mate's k-mers with their origin, concatenate, sort by value,
/// and collapse adjacent equal entries into one `(kmer, PairKmerCount)`.
pub fn count_dup_remove(kmers1: &[Kmer], kmers2: &[Kmer]) -> Vec<(Kmer, PairKmerCount)> {
    let mut tagged: Vec<(Kmer, Origin)> = Vec::with_capacity(kmers1.len() + kmers2.len());
    tagged.extend(kmers1.iter().map(|&k| (k, Origin::Fwd)));
    tagged.extend(kmers2.iter().map(|&k| (k, Origin::Rev)));
    tagged.sort_by_key(|&(k, _)| k);

    tagged
        .into_iter()
        .chunk_by(|&(k, _)| k)
        .into_iter()
        .map(|(kmer, group)| {
            let mut pkc = PairKmerCount::default();
            for (_, origin) in group {
                match origin {
                    Origin::Fwd => pkc.fwd = pkc.fwd.saturating_add(1),
                    Origin::Rev => pkc.rev = pkc.rev.saturating_add(1),
                }
            }
            (kmer, pkc)
        })
        .collect()
}

/// One fully annotated surviving k-mer: value, per-mate counts, and its
/// index multiplicity `m(k) = |KmerToLoci[k]|`.
#[derive(Debug, Clone, Copy)]
pub struct Stat {
    pub kmer: Kmer,
    pub count: PairKmerCount,
    pub multiplicity: usize,
}

/// Drop entries absent from the index, annotate the rest with
/// multiplicity, sort ascending by multiplicity (most specific first), and
/// return the suffix-sum `remain[i]` alongside.
pub fn fill_stats(dup: Vec<(Kmer, PairKmerCount)>, index: &KmerToLoci) -> (Vec<Stat>, Vec<u64>) {
    let mut stats: Vec<Stat> = dup
        .into_iter()
        .filter_map(|(kmer, count)| {
            index.get(&kmer).map(|loci| Stat {
                kmer,
                count,
                multiplicity: loci.len(),
            })
        })
        .collect();
    stats.sort_by_key(|s| s.multiplicity);

    let mut remain = vec![0u64; stats.len()];
    let mut running = 0u64;
    for i in (0..stats.len()).rev() {
        remain[i] = running;
        running += stats[i].count.total();
    }
    (stats, remain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn dup_remove_collapses_and_counts_per_mate() {
        let m1 = vec![1, 2, 1];
        let m2 = vec![2];
        let merged = count_dup_remove(&m1, &m2);
        assert_eq!(merged, vec![(1, PairKmerCount { fwd: 2, rev: 0 }), (2, PairKmerCount { fwd: 1, rev: 1 })]);
    }

    #[test]
    fn fill_stats_drops_unindexed_and_sorts_by_multiplicity() {
        let mut idx: KmerToLoci = HashMap::new();
        idx.insert(1, vec![0]); // multiplicity 1
        idx.insert(2, vec![0, 1]); // multiplicity 2
        // 3 is absent from the index.
        let dup = vec![
            (2, PairKmerCount { fwd: 1, rev: 0 }),
            (1, PairKmerCount { fwd: 1, rev: 0 }),
            (3, PairKmerCount { fwd: 1, rev: 0 }),
        ];
        let (stats, remain) = fill_stats(dup, &idx);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].kmer, 1);
        assert_eq!(stats[1].kmer, 2);
        // remain[i] = total contributed strictly after i.
        assert_eq!(remain, vec![1, 0]);
    }

    #[test]
    fn count_conservation() {
        let m1 = vec![1, 1, 2];
        let m2 = vec![1, 2, 2];
        let merged = count_dup_remove(&m1, &m2);
        let total: u64 = merged.iter().map(|(_, c)| c.total()).sum();
        assert_eq!(total, (m1.len() + m2.len()) as u64);
    }
}
