//! Output emitters: `.tr.kmers` count tables, extracted reads, alignment
//! traces, and simulation-mode `.msa`/`.err` accounting files (spec §6).

use crate::bio::kmers::render;
use crate::error::{AppError, Result};
use crate::index::LocusCounts;
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

/// Write the final `<prefix>.tr.kmers`, same block framing as the input
/// file, with counts updated in place by the run.
pub fn write_tr_kmers(path: &Path, tr_counts: &LocusCounts, k: usize) -> Result<()> {
    let mut out = std::fs::File::create(path).map_err(|source| AppError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    for (locus, table) in tr_counts.iter().enumerate() {
        writeln!(out, ">{locus}").map_err(|source| AppError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut rows: Vec<_> = table.iter().collect();
        rows.sort_by_key(|&(kmer, _)| *kmer);
        for (kmer, count) in rows {
            let seq = String::from_utf8(render(*kmer, k)).expect("render only emits ACGT");
            writeln!(out, "{seq}\t{count}").map_err(|source| AppError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        }
    }
    Ok(())
}

/// A mate's title and sequence as read, plus the locus/mate suffix
/// appended under `-e 2`.
pub struct ExtractedMate<'a> {
    pub title: &'a [u8],
    pub seq: &'a [u8],
}

/// Append one pair's two extracted-read records to `out` (spec §6: title
/// line then sequence line, per mate). `suffix` is `Some((locus, mate))`
/// under `-e 2`, `None` under `-e 1` (titles preserved verbatim).
pub fn write_extracted_reads<W: Write>(
    out: &mut W,
    mate1: &ExtractedMate,
    mate2: &ExtractedMate,
    locus: Option<u32>,
) -> std::io::Result<()> {
    write_extracted_mate(out, mate1, locus.map(|l| (l, 0u8)))?;
    write_extracted_mate(out, mate2, locus.map(|l| (l, 1u8)))
}

fn write_extracted_mate<W: Write>(
    out: &mut W,
    mate: &ExtractedMate,
    suffix: Option<(u32, u8)>,
) -> std::io::Result<()> {
    match suffix {
        Some((locus, idx)) => writeln!(out, "{}:{locus}_{idx}", String::from_utf8_lossy(mate.title))?,
        None => writeln!(out, "{}", String::from_utf8_lossy(mate.title))?,
    }
    writeln!(out, "{}", String::from_utf8_lossy(mate.seq))
}

/// One alignment-trace line: `srcLocus \t destLocus \t title1 \t seq1 \t
/// ops2 \t title2 \t seq2 \t ops1` (spec §6). `src_locus` is `None`
/// outside simulation modes and rendered as an empty field.
pub fn write_alignment_trace<W: Write>(
    out: &mut W,
    src_locus: Option<u32>,
    dest_locus: u32,
    title1: &[u8],
    seq1: &[u8],
    ops2: &[char],
    title2: &[u8],
    seq2: &[u8],
    ops1: &[char],
) -> std::io::Result<()> {
    let src: String = src_locus.map(|l| l.to_string()).unwrap_or_default();
    let ops1: String = ops1.iter().collect();
    let ops2: String = ops2.iter().collect();
    writeln!(
        out,
        "{src}\t{dest_locus}\t{}\t{}\t{ops2}\t{}\t{}\t{ops1}",
        String::from_utf8_lossy(title1),
        String::from_utf8_lossy(seq1),
        String::from_utf8_lossy(title2),
        String::from_utf8_lossy(seq2),
    )
}

/// Simulation-mode (`-s 1`) per-(srcLocus, destLocus) pair counts: one
/// block per source locus, rows `destLocus\tcount`.
pub fn write_msa_stats(path: &Path, msa_stats: &[HashMap<u32, u64>]) -> Result<()> {
    let mut out = std::fs::File::create(path).map_err(|source| AppError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    for (src, dests) in msa_stats.iter().enumerate() {
        writeln!(out, ">{src}").map_err(|source| AppError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut rows: Vec<_> = dests.iter().collect();
        rows.sort_by_key(|&(dest, _)| *dest);
        for (dest, count) in rows {
            writeln!(out, "{dest}\t{count}").map_err(|source| AppError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        }
    }
    Ok(())
}

/// Simulation-mode (`-s 2`) false-positive/false-negative accounting, one
/// line per source locus: `srcLocus:{destLocus>fn,fpUncorrected,fpCorrected;...}`
/// (`writeErrDB`'s format).
pub fn write_err_db(path: &Path, err_db: &HashMap<u32, HashMap<u32, crate::simulation::ErrCounts>>) -> Result<()> {
    let mut out = std::fs::File::create(path).map_err(|source| AppError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut srcs: Vec<_> = err_db.keys().copied().collect();
    srcs.sort_unstable();
    for src in srcs {
        write!(out, "{src}:{{").map_err(|source| AppError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut dests: Vec<_> = err_db[&src].iter().collect();
        dests.sort_by_key(|&(dest, _)| *dest);
        for (dest, counts) in dests {
            write!(
                out,
                "{dest}>{},{},{};",
                counts.fn_count, counts.fp_uncorrected, counts.fp_corrected
            )
            .map_err(|source| AppError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        }
        writeln!(out, "}}").map_err(|source| AppError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bio::kmers::{encode_base, push_base};
    use tempfile::tempdir;

    fn kmer(seq: &[u8], k: usize) -> u64 {
        let mut w = 0u64;
        for &b in seq {
            w = push_base(w, k, encode_base(b).unwrap());
        }
        w
    }

    #[test]
    fn tr_kmers_round_trips_counts() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.tr.kmers");
        let mut table = HashMap::new();
        table.insert(kmer(b"AAAAA", 5), 7u64);
        let counts: LocusCounts = vec![table];
        write_tr_kmers(&path, &counts, 5).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, ">0\nAAAAA\t7\n");
    }

    #[test]
    fn extracted_reads_e2_appends_locus_and_mate_suffix() {
        let mut buf = Vec::new();
        let mate1 = ExtractedMate {
            title: b"readA",
            seq: b"ACGT",
        };
        let mate2 = ExtractedMate {
            title: b"readA",
            seq: b"TGCA",
        };
        write_extracted_reads(&mut buf, &mate1, &mate2, Some(7)).unwrap();
        assert_eq!(buf, b"readA:7_0\nACGT\nreadA:7_1\nTGCA\n");
    }

    #[test]
    fn extracted_reads_e1_preserves_titles() {
        let mut buf = Vec::new();
        let mate1 = ExtractedMate {
            title: b"readA",
            seq: b"ACGT",
        };
        let mate2 = ExtractedMate {
            title: b"readA",
            seq: b"TGCA",
        };
        write_extracted_reads(&mut buf, &mate1, &mate2, None).unwrap();
        assert_eq!(buf, b"readA\nACGT\nreadA\nTGCA\n");
    }

    #[test]
    fn alignment_trace_matches_line_format() {
        let mut buf = Vec::new();
        write_alignment_trace(
            &mut buf,
            None,
            7,
            b"t1",
            b"ACGT",
            &['.', '.'],
            b"t2",
            b"TGCA",
            &['=', '='],
        )
        .unwrap();
        assert_eq!(buf, b"\t7\tt1\tACGT\t..\tt2\tTGCA\t==\n");
    }
}
