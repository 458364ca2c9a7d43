//! Interleaved paired-end FASTA/FASTQ reader.
//!
//! Built on `needletail` (as the teacher's `io::fastq` module is), which
//! auto-detects FASTA vs. FASTQ framing and transparent gzip/bzip2/zstd
//! compression. "Interleaved" here means mate1 then mate2, alternating,
//! in one stream (spec §6) — no quality filtering is applied, matching
//! the spec's explicit "no quality filtering" note.

use crate::error::{AppError, Result};
use needletail::{parse_fastx_file, FastxReader};
use std::path::Path;

pub struct ReadPair {
    pub title1: Vec<u8>,
    pub seq1: Vec<u8>,
    pub title2: Vec<u8>,
    pub seq2: Vec<u8>,
}

pub struct PairReader {
    inner: Box<dyn FastxReader>,
    pairs_read: u64,
}

impl PairReader {
    pub fn open(path: &Path) -> Result<Self> {
        let inner = parse_fastx_file(path).map_err(|e| AppError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
        })?;
        Ok(PairReader { inner, pairs_read: 0 })
    }

    /// Pull up to `n` read pairs, or fewer at EOF. An odd number of
    /// remaining records (a dangling, unmated record at EOF) is a
    /// malformed-input error, not a silent drop.
    pub fn read_batch(&mut self, n: usize) -> Result<Vec<ReadPair>> {
        let mut batch = Vec::with_capacity(n);
        for _ in 0..n {
            let Some(rec1) = self.inner.next() else {
                break;
            };
            let rec1 = rec1.map_err(|e| AppError::Io {
                path: Path::new("<interleaved input>").to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()),
            })?;
            let title1 = rec1.id().to_vec();
            let seq1 = rec1.seq().to_vec();

            let rec2 = self
                .inner
                .next()
                .ok_or(AppError::UnpairedRead(self.pairs_read))?
                .map_err(|e| AppError::Io {
                    path: Path::new("<interleaved input>").to_path_buf(),
                    source: std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()),
                })?;
            let title2 = rec2.id().to_vec();
            let seq2 = rec2.seq().to_vec();

            batch.push(ReadPair {
                title1,
                seq1,
                title2,
                seq2,
            });
            self.pairs_read += 1;
        }
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn reads_interleaved_fasta_pairs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reads.fa");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, ">r1/1\nAAAA\n>r1/2\nTTTT\n>r2/1\nCCCC\n>r2/2\nGGGG").unwrap();
        drop(f);

        let mut reader = PairReader::open(&path).unwrap();
        let batch = reader.read_batch(10).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].seq1, b"AAAA");
        assert_eq!(batch[0].seq2, b"TTTT");
        assert_eq!(batch[1].seq1, b"CCCC");
        assert_eq!(batch[1].seq2, b"GGGG");
    }

    #[test]
    fn read_batch_stops_at_eof_and_respects_n() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reads.fa");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, ">r1/1\nAAAA\n>r1/2\nTTTT\n>r2/1\nCCCC\n>r2/2\nGGGG").unwrap();
        drop(f);

        let mut reader = PairReader::open(&path).unwrap();
        let first = reader.read_batch(1).unwrap();
        assert_eq!(first.len(), 1);
        let second = reader.read_batch(10).unwrap();
        assert_eq!(second.len(), 1);
        let third = reader.read_batch(10).unwrap();
        assert!(third.is_empty());
    }

    #[test]
    fn odd_record_count_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reads.fa");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, ">r1/1\nAAAA\n>r1/2\nTTTT\n>r2/1\nCCCC").unwrap();
        drop(f);

        let mut reader = PairReader::open(&path).unwrap();
        assert!(reader.read_batch(10).is_err());
    }
}
