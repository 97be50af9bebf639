//! Allele-depth filtering and annotation of pileup records

use crate::{vcf, AnnotatedRow, FilterConfig, PileupError, PileupResult};
use rust_htslib::bcf::{self, Read};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Header line written before any row of the filtered report
pub const REPORT_HEADER: &str = "CHROM\tPOS\tREF\tALT\tDP_Total\tDP_Alt\tFraction";

/// Validate filter thresholds
pub fn validate_filter_config(config: &FilterConfig) -> PileupResult<()> {
    if config.min_alt_reads < 0 {
        return Err(PileupError::InvalidConfig(
            "min_alt_reads must be non-negative".to_string(),
        ));
    }
    Ok(())
}

/// Apply the depth filter to a single record.
///
/// Returns `Ok(None)` for records that are excluded: missing `DP` or `I16`,
/// total depth at or below the cutoff, or fewer alternate-supporting reads
/// than `min_alt_reads`. A record whose reported `DP` is smaller than the
/// recomputed `ref + alt` depth triggers a warning on the error stream but
/// is still processed.
pub fn annotate_record(
    record: &bcf::Record,
    config: &FilterConfig,
) -> PileupResult<Option<AnnotatedRow>> {
    let (total_depth, depths) = match (vcf::total_depth(record), vcf::strand_depths(record)) {
        (Some(total_depth), Some(depths)) => (total_depth, depths),
        _ => return Ok(None),
    };

    // Cutoff is exclusive: a record must strictly exceed it.
    if total_depth <= config.depth_cutoff {
        return Ok(None);
    }

    let (ref_depth, alt_depth) = depths;
    let chrom = vcf::chrom_name(record)?;
    let pos = record.pos() + 1;

    if total_depth < ref_depth + alt_depth {
        log::warn!(
            "Depth mismatch at {}:{}: DP={} vs REF+ALT={}",
            chrom,
            pos,
            total_depth,
            ref_depth + alt_depth
        );
    }

    if alt_depth < config.min_alt_reads {
        return Ok(None);
    }

    let used_depth = std::cmp::max(total_depth, ref_depth + alt_depth);
    let fraction = if used_depth > 0 {
        alt_depth as f64 / used_depth as f64
    } else {
        0.0
    };

    Ok(Some(AnnotatedRow::new(
        chrom,
        pos,
        vcf::ref_allele(record),
        vcf::alt_field(record),
        total_depth,
        alt_depth,
        fraction,
    )))
}

/// Stream records from the reader through the filter, writing the report
/// header followed by one line per passing record. Rows come out in input
/// order. Returns the number of rows written.
pub fn write_filtered_pileup<W: Write>(
    reader: &mut bcf::Reader,
    config: &FilterConfig,
    out: &mut W,
) -> PileupResult<u64> {
    writeln!(out, "{}", REPORT_HEADER)?;

    let mut rows_written = 0u64;
    for result in reader.records() {
        let record = result?;
        if let Some(row) = annotate_record(&record, config)? {
            writeln!(out, "{}", row.to_line())?;
            rows_written += 1;
        }
    }

    Ok(rows_written)
}

/// Run the filter over a pileup file, writing the annotated report to
/// `output_path` through a single buffered writer held open for the whole
/// pass. Returns the number of rows written.
pub fn filter_pileup<P: AsRef<Path>>(
    pileup_path: P,
    config: &FilterConfig,
    output_path: P,
) -> PileupResult<u64> {
    let mut reader = vcf::open_pileup(&pileup_path)?;

    let file = File::create(output_path)?;
    let mut writer = BufWriter::new(file);
    let rows_written = write_filtered_pileup(&mut reader, config, &mut writer)?;
    writer.flush()?;

    Ok(rows_written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp_vcf(records: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".vcf")
            .tempfile()
            .unwrap();
        writeln!(file, "##fileformat=VCFv4.2").unwrap();
        writeln!(file, "##contig=<ID=chr1>").unwrap();
        writeln!(file, "##contig=<ID=chr2>").unwrap();
        writeln!(
            file,
            "##INFO=<ID=DP,Number=1,Type=Integer,Description=\"Raw read depth\">"
        )
        .unwrap();
        writeln!(
            file,
            "##INFO=<ID=I16,Number=16,Type=Float,Description=\"Auxiliary tag\">"
        )
        .unwrap();
        writeln!(file, "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO").unwrap();
        write!(file, "{}", records).unwrap();
        file.flush().unwrap();
        file
    }

    fn run_filter(records: &str, config: &FilterConfig) -> Vec<String> {
        let vcf = write_temp_vcf(records);
        let mut reader = crate::vcf::open_pileup(vcf.path()).unwrap();
        let mut out = Vec::new();
        write_filtered_pileup(&mut reader, config, &mut out).unwrap();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| line.to_string())
            .collect()
    }

    fn i16_field(ref_fwd: i64, ref_rev: i64, alt_fwd: i64, alt_rev: i64) -> String {
        format!("{},{},{},{},0,0,0,0,0,0,0,0,0,0,0,0", ref_fwd, ref_rev, alt_fwd, alt_rev)
    }

    #[test]
    fn test_header_is_written_for_empty_input() {
        let lines = run_filter("", &FilterConfig::default());
        assert_eq!(lines, vec![REPORT_HEADER.to_string()]);
    }

    #[test]
    fn test_alt_depth_below_threshold_is_skipped() {
        // DP=15, ref=6, alt=5: passes the depth cutoff but not min_alt_reads
        let records = format!("chr1\t100\t.\tA\tT\t.\t.\tDP=15;I16={}\n", i16_field(3, 3, 2, 3));
        let lines = run_filter(&records, &FilterConfig::default());
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn test_passing_record_is_annotated() {
        // DP=50, ref=10, alt=25: used_depth = max(50, 35) = 50, fraction 0.5
        let records = format!("chr1\t100\t.\tA\tT\t.\t.\tDP=50;I16={}\n", i16_field(5, 5, 15, 10));
        let lines = run_filter(&records, &FilterConfig::default());
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "chr1\t100\tA\tT\t50\t25\t0.5000");
    }

    #[test]
    fn test_low_total_depth_is_skipped_even_with_many_alt_reads() {
        let records = format!("chr1\t100\t.\tA\tT\t.\t.\tDP=5;I16={}\n", i16_field(0, 0, 50, 50));
        let lines = run_filter(&records, &FilterConfig::default());
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn test_depth_mismatch_record_is_still_emitted() {
        // DP=30 < ref+alt=40: warns, then uses the larger depth for the fraction
        let records = format!("chr1\t100\t.\tA\tT\t.\t.\tDP=30;I16={}\n", i16_field(0, 0, 40, 0));
        let lines = run_filter(&records, &FilterConfig::default());
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "chr1\t100\tA\tT\t30\t40\t1.0000");
    }

    #[test]
    fn test_records_missing_required_tags_are_skipped() {
        let records = format!(
            "chr1\t100\t.\tA\tT\t.\t.\tDP=50\n\
             chr1\t200\t.\tA\tT\t.\t.\tI16={}\n",
            i16_field(5, 5, 30, 30)
        );
        let lines = run_filter(&records, &FilterConfig::default());
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn test_rows_preserve_input_order() {
        let records = format!(
            "chr2\t500\t.\tG\tC\t.\t.\tDP=60;I16={}\n\
             chr1\t100\t.\tA\tT\t.\t.\tDP=50;I16={}\n",
            i16_field(10, 10, 20, 20),
            i16_field(5, 5, 15, 10)
        );
        let lines = run_filter(&records, &FilterConfig::default());
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("chr2\t500"));
        assert!(lines[2].starts_with("chr1\t100"));
    }

    #[test]
    fn test_no_alt_record_gets_placeholder() {
        let records = format!("chr1\t100\t.\tA\t.\t.\t.\tDP=50;I16={}\n", i16_field(5, 5, 15, 10));
        let lines = run_filter(&records, &FilterConfig::default());
        assert_eq!(lines[1], "chr1\t100\tA\t.\t50\t25\t0.5000");
    }

    #[test]
    fn test_zero_used_depth_yields_zero_fraction() {
        let records = format!("chr1\t100\t.\tA\tT\t.\t.\tDP=0;I16={}\n", i16_field(0, 0, 0, 0));
        let config = FilterConfig {
            min_alt_reads: 0,
            depth_cutoff: -1,
        };
        let lines = run_filter(&records, &config);
        assert_eq!(lines[1], "chr1\t100\tA\tT\t0\t0\t0.0000");
    }

    #[test]
    fn test_custom_thresholds() {
        // alt=25 passes min_alt_reads=20 but not 26; DP=50 fails cutoff=50
        let records = format!("chr1\t100\t.\tA\tT\t.\t.\tDP=50;I16={}\n", i16_field(5, 5, 15, 10));

        let config = FilterConfig {
            min_alt_reads: 26,
            depth_cutoff: 10,
        };
        assert_eq!(run_filter(&records, &config).len(), 1);

        let config = FilterConfig {
            min_alt_reads: 20,
            depth_cutoff: 50,
        };
        assert_eq!(run_filter(&records, &config).len(), 1);
    }

    #[test]
    fn test_filter_pileup_writes_report_file() {
        let records = format!("chr1\t100\t.\tA\tT\t.\t.\tDP=50;I16={}\n", i16_field(5, 5, 15, 10));
        let vcf = write_temp_vcf(&records);
        let output = NamedTempFile::new().unwrap();

        let rows = filter_pileup(
            vcf.path(),
            &FilterConfig::default(),
            output.path(),
        )
        .unwrap();
        assert_eq!(rows, 1);

        let content = std::fs::read_to_string(output.path()).unwrap();
        assert_eq!(
            content,
            format!("{}\nchr1\t100\tA\tT\t50\t25\t0.5000\n", REPORT_HEADER)
        );
    }

    #[test]
    fn test_validate_filter_config() {
        assert!(validate_filter_config(&FilterConfig::default()).is_ok());

        let config = FilterConfig {
            min_alt_reads: -1,
            depth_cutoff: 10,
        };
        assert!(validate_filter_config(&config).is_err());
    }
}
