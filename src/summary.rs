//! Raw line counting of the pileup source file
//!
//! The count deliberately reflects the underlying text file (header lines
//! included), not the number of records the variant reader yields, so the
//! two views must never be conflated.

use crate::{utils::is_gzipped, PileupError, PileupResult};
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// Count the lines of a pileup file, decompressing gzipped input first
pub fn count_pileup_lines<P: AsRef<Path>>(path: P) -> PileupResult<u64> {
    let file = File::open(&path)
        .map_err(|_| PileupError::FileNotFound(path.as_ref().to_string_lossy().to_string()))?;

    let reader: Box<dyn BufRead> = if is_gzipped(&path)? {
        let gz_decoder = MultiGzDecoder::new(file);
        Box::new(BufReader::new(gz_decoder))
    } else {
        Box::new(BufReader::new(file))
    };

    let mut count = 0u64;
    for line in reader.lines() {
        line?;
        count += 1;
    }

    Ok(count)
}

/// Write the one-line summary file: `lines_in_pileup\t<count>`
pub fn write_line_summary<P: AsRef<Path>>(output_path: P, line_count: u64) -> PileupResult<()> {
    let mut file = File::create(output_path)?;
    writeln!(file, "lines_in_pileup\t{}", line_count)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_count_plain_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "##fileformat=VCFv4.2").unwrap();
        writeln!(temp_file, "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO").unwrap();
        writeln!(temp_file, "chr1\t100\t.\tA\tT\t.\t.\tDP=30").unwrap();

        assert_eq!(count_pileup_lines(temp_file.path()).unwrap(), 3);
    }

    #[test]
    fn test_count_empty_file() {
        let temp_file = NamedTempFile::new().unwrap();
        assert_eq!(count_pileup_lines(temp_file.path()).unwrap(), 0);
    }

    #[test]
    fn test_final_unterminated_line_is_counted() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "line one\nline two").unwrap();
        temp_file.flush().unwrap();

        assert_eq!(count_pileup_lines(temp_file.path()).unwrap(), 2);
    }

    #[test]
    fn test_count_gzipped_file() {
        let temp_file = NamedTempFile::new().unwrap();
        let mut encoder = GzEncoder::new(
            File::create(temp_file.path()).unwrap(),
            Compression::default(),
        );
        writeln!(encoder, "##fileformat=VCFv4.2").unwrap();
        writeln!(encoder, "chr1\t100\t.\tA\tT\t.\t.\tDP=30").unwrap();
        encoder.finish().unwrap();

        assert_eq!(count_pileup_lines(temp_file.path()).unwrap(), 2);
    }

    #[test]
    fn test_count_missing_file_fails() {
        assert!(count_pileup_lines("/nonexistent/pileup.vcf").is_err());
    }

    #[test]
    fn test_write_line_summary() {
        let temp_file = NamedTempFile::new().unwrap();
        write_line_summary(temp_file.path(), 42).unwrap();

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        assert_eq!(content, "lines_in_pileup\t42\n");
    }
}
