//! Numeric k-mer encoding, canonicalization, and extraction.
//!
//! A k-mer is packed 2 bits/base, A=0 C=1 G=2 T=3, into a `u64` (so k <= 32).
//! The canonical form is the smaller of the k-mer and its reverse
//! complement; the index, TR table and graph store canonical k-mers while
//! graph edges walk directed (non-canonical) ones. Encoding is a rolling
//! shift-and-mask so extraction is O(|sequence|), following the same
//! simultaneous forward/reverse-complement update `svelt`'s `Kmer` type
//! uses.

pub type Kmer = u64;

/// A=0, C=1, G=2, T=3; anything else is not a base.
#[inline]
pub fn encode_base(b: u8) -> Option<u64> {
    match b.to_ascii_uppercase() {
        b'A' => Some(0),
        b'C' => Some(1),
        b'G' => Some(2),
        b'T' => Some(3),
        _ => None,
    }
}

#[inline]
pub fn decode_base(code: u64) -> u8 {
    match code & 0b11 {
        0 => b'A',
        1 => b'C',
        2 => b'G',
        _ => b'T',
    }
}

#[inline]
pub fn mask(k: usize) -> u64 {
    if k >= 32 {
        u64::MAX
    } else {
        (1u64 << (2 * k)) - 1
    }
}

/// Reverse complement of a directed k-mer of width `k`.
pub fn reverse_complement(kmer: Kmer, k: usize) -> Kmer {
    let mut fwd = kmer;
    let mut rc: u64 = 0;
    for _ in 0..k {
        let base = fwd & 0b11;
        let comp = 3 - base;
        rc = (rc << 2) | comp;
        fwd >>= 2;
    }
    rc
}

/// The lexicographically (numerically) smaller of a k-mer and its reverse
/// complement.
#[inline]
pub fn canonical(kmer: Kmer, k: usize) -> Kmer {
    let rc = reverse_complement(kmer, k);
    kmer.min(rc)
}

/// Render a directed k-mer back to an ASCII sequence, most-significant base
/// first.
pub fn render(kmer: Kmer, k: usize) -> Vec<u8> {
    (0..k)
        .rev()
        .map(|i| decode_base(kmer >> (2 * i)))
        .collect()
}

/// Append a base to a directed k-mer, dropping the oldest base (rolling
/// window). `k` must be >= 1.
#[inline]
pub fn push_base(kmer: Kmer, k: usize, base_code: u64) -> Kmer {
    ((kmer << 2) | base_code) & mask(k)
}

/// Walk `seq` emitting one directed k-mer per valid window in read order,
/// alongside the sequence index of the window's last base. A window
/// touching a non-ACGT byte is skipped (a gap, not an error); the rolling
/// window resets at the first valid base after a gap. Two consecutive
/// entries are part of the same contiguous run iff their indices differ by
/// exactly 1 — graph threading needs this to know where a correction may
/// keep propagating forward.
pub fn extract_directed_indexed(seq: &[u8], k: usize) -> Vec<(Kmer, usize)> {
    if k == 0 || k > 32 || seq.len() < k {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(seq.len().saturating_sub(k) + 1);
    let mut window: u64 = 0;
    let mut valid_run = 0usize;
    for (i, &b) in seq.iter().enumerate() {
        match encode_base(b) {
            Some(code) => {
                window = push_base(window, k, code);
                valid_run += 1;
                if valid_run >= k {
                    out.push((window, i));
                }
            }
            None => {
                window = 0;
                valid_run = 0;
            }
        }
    }
    out
}

/// Walk `seq` emitting one directed k-mer per valid window in read order.
/// A window touching a non-ACGT byte is skipped (a gap, not an error); the
/// rolling window resets at the first valid base after a gap.
pub fn extract_directed(seq: &[u8], k: usize) -> Vec<Kmer> {
    extract_directed_indexed(seq, k).into_iter().map(|(k, _)| k).collect()
}

/// Same walk as [`extract_directed`] but canonicalizes each emitted k-mer.
/// This is the representation stored in the inverted index and TR table.
pub fn extract_canonical(seq: &[u8], k: usize) -> Vec<Kmer> {
    extract_directed(seq, k)
        .into_iter()
        .map(|kmer| canonical(kmer, k))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_roundtrip() {
        assert_eq!(encode_base(b'A'), Some(0));
        assert_eq!(encode_base(b'c'), Some(1));
        assert_eq!(encode_base(b'G'), Some(2));
        assert_eq!(encode_base(b't'), Some(3));
        assert_eq!(encode_base(b'N'), None);
    }

    #[test]
    fn push_and_render_roundtrip() {
        let k = 4;
        let mut w = 0u64;
        for b in [b'A', b'C', b'G', b'T'] {
            w = push_base(w, k, encode_base(b).unwrap());
        }
        assert_eq!(render(w, k), b"ACGT");
    }

    #[test]
    fn reverse_complement_matches_byte_level() {
        let k = 4;
        let mut w = 0u64;
        for b in [b'A', b'C', b'G', b'T'] {
            w = push_base(w, k, encode_base(b).unwrap());
        }
        let rc = reverse_complement(w, k);
        assert_eq!(render(rc, k), b"ACGT"); // revcomp(ACGT) == ACGT
    }

    #[test]
    fn canonicalization_idempotent() {
        let k = 5;
        for seq in [b"AAAAA".as_slice(), b"GTTTT", b"ACGTA", b"TTTTT"] {
            let kmer = extract_directed(seq, k)[0];
            let c1 = canonical(kmer, k);
            let c2 = canonical(c1, k);
            assert_eq!(c1, c2);
            assert_eq!(canonical(reverse_complement(kmer, k), k), c1);
        }
    }

    #[test]
    fn extract_directed_skips_gaps() {
        let kmers = extract_directed(b"ACNGTACGT", 3);
        // "ACN" / "CNG" / "NGT" all touch the N and are skipped; the window
        // resets, so "GTA" does not appear (only 2 valid bases before it).
        let rendered: Vec<Vec<u8>> = kmers.iter().map(|&k| render(k, 3)).collect();
        assert_eq!(
            rendered,
            vec![b"TAC".to_vec(), b"ACG".to_vec(), b"CGT".to_vec()]
        );
    }

    #[test]
    fn extract_canonical_picks_smaller() {
        let kmers = extract_canonical(b"AAAAA", 5);
        assert_eq!(kmers.len(), 1);
        assert_eq!(kmers[0], canonical(extract_directed(b"AAAAA", 5)[0], 5));
    }

    #[test]
    fn k_larger_than_sequence_yields_nothing() {
        assert!(extract_directed(b"ACGT", 5).is_empty());
    }
}
