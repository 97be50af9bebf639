//! CLI binary for pileup post-processing - line-count summary and allele-depth filtering

use clap::Parser;
use env_logger::Env;
use std::path::PathBuf;
use pileup_filter_rs::{
    filter::{filter_pileup, validate_filter_config},
    summary::{count_pileup_lines, write_line_summary},
    utils::{validate_dir_exists, validate_file_readable, Timer},
    FilterConfig, PileupError, PileupResult,
};

#[derive(Parser)]
#[command(name = "pileup_filter")]
#[command(about = "Pileup summary and allele-depth filtering tool")]
#[command(long_about = "
Summarizes a pileup/variant file and applies a custom allele-depth filter.

Two output files are written into the output directory:
1. <basename>.pileup_summary.txt - the raw line count of the input file
2. <basename>.filtered_pileup.txt - a tab-separated report of the records
   that pass the depth filter, annotated with the alternate-allele fraction

A record is reported when its total depth (DP) strictly exceeds the depth
cutoff and the alternate read depth recomputed from the I16 statistics
array reaches the minimum alternate read count. Records without DP or I16
annotations are skipped. A record whose reported DP is smaller than the
recomputed ref+alt depth is flagged on stderr but still processed.

The input may be a plain, bgzipped or binary variant file; the container
format is handled by htslib.
")]
struct Args {
    /// Path to the input pileup VCF/BCF file
    #[arg(long, value_name = "FILE")]
    pileup: PathBuf,

    /// Output directory (must already exist)
    #[arg(long, value_name = "DIR")]
    outdir: PathBuf,

    /// Basename for the output files
    #[arg(long, default_value = "sample")]
    basename: String,

    /// Minimum number of alternate-supporting reads to report a record
    #[arg(long, default_value_t = 20)]
    min_alt_reads: i64,

    /// Total depth a record must strictly exceed to be considered
    #[arg(long, default_value_t = 10)]
    depth_cutoff: i64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn run() -> PileupResult<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_timestamp_secs()
        .init();

    log::info!("Starting pileup post-processing");
    log::info!("Pileup file: {:?}", args.pileup);
    log::info!("Output directory: {:?}", args.outdir);
    log::info!("Basename: {}", args.basename);

    // Validate input file and output directory
    validate_file_readable(&args.pileup)?;
    validate_dir_exists(&args.outdir)?;

    // Create filter configuration
    let config = FilterConfig {
        min_alt_reads: args.min_alt_reads,
        depth_cutoff: args.depth_cutoff,
    };

    // Validate configuration
    validate_filter_config(&config)?;
    log::info!(
        "Configuration: min_alt_reads={}, depth_cutoff={}",
        config.min_alt_reads,
        config.depth_cutoff
    );

    let summary_path = args
        .outdir
        .join(format!("{}.pileup_summary.txt", args.basename));
    let report_path = args
        .outdir
        .join(format!("{}.filtered_pileup.txt", args.basename));

    // Step 1: Count raw lines in the pileup file
    let _timer = Timer::new("Counting pileup lines");
    let line_count = count_pileup_lines(&args.pileup)?;
    write_line_summary(&summary_path, line_count)?;
    log::info!("Counted {} lines, summary written to: {:?}", line_count, summary_path);

    // Step 2: Filter and annotate pileup records
    let _timer = Timer::new("Filtering pileup records");
    let rows_written = filter_pileup(&args.pileup, &config, &report_path)?;
    log::info!(
        "Wrote {} filtered records to: {:?}",
        rows_written,
        report_path
    );

    log::info!("Post-processing completed successfully");

    Ok(())
}

/// Handle application errors and provide user-friendly messages
fn handle_error(error: PileupError) -> ! {
    match error {
        PileupError::FileNotFound(path) => {
            eprintln!("Error: File not found: {}", path);
            eprintln!("Please check that the file exists and is readable.");
        }
        PileupError::DirNotFound(path) => {
            eprintln!("Error: Output directory not found: {}", path);
            eprintln!("Please create the directory before running, or check the --outdir path.");
        }
        PileupError::InvalidRecord(msg) => {
            eprintln!("Error: Invalid variant data: {}", msg);
            eprintln!("Please check that your pileup file is properly formatted.");
        }
        PileupError::InvalidConfig(msg) => {
            eprintln!("Error: Invalid configuration: {}", msg);
            eprintln!("Please check your threshold parameters (--min-alt-reads, --depth-cutoff).");
        }
        PileupError::Htslib(ref e) => {
            eprintln!("Error: Pileup/VCF processing error: {}", e);
            eprintln!("Please check that your pileup file is a valid VCF or BCF file.");
        }
        PileupError::Io(ref e) => {
            eprintln!("Error: I/O error: {}", e);
            eprintln!("Please check file permissions and disk space.");
        }
    }
    std::process::exit(1);
}

fn main() {
    if let Err(e) = run() {
        handle_error(e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_test_pileup() -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".vcf")
            .tempfile()
            .unwrap();
        writeln!(file, "##fileformat=VCFv4.2").unwrap();
        writeln!(file, "##contig=<ID=chr1>").unwrap();
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
        writeln!(
            file,
            "chr1\t100\t.\tA\tT\t.\t.\tDP=50;I16=5,5,15,10,0,0,0,0,0,0,0,0,0,0,0,0"
        )
        .unwrap();
        writeln!(
            file,
            "chr1\t200\t.\tG\tC\t.\t.\tDP=15;I16=3,3,2,3,0,0,0,0,0,0,0,0,0,0,0,0"
        )
        .unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_two_stage_workflow() {
        let pileup = write_test_pileup();
        let outdir = tempfile::tempdir().unwrap();

        let summary_path = outdir.path().join("sample.pileup_summary.txt");
        let report_path = outdir.path().join("sample.filtered_pileup.txt");

        let line_count = count_pileup_lines(pileup.path()).unwrap();
        write_line_summary(&summary_path, line_count).unwrap();

        // 5 header lines + 2 records
        let summary = std::fs::read_to_string(&summary_path).unwrap();
        assert_eq!(summary, "lines_in_pileup\t7\n");

        let rows = filter_pileup(
            &pileup.path().to_path_buf(),
            &FilterConfig::default(),
            &report_path,
        )
        .unwrap();
        assert_eq!(rows, 1);

        let report = std::fs::read_to_string(&report_path).unwrap();
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "CHROM\tPOS\tREF\tALT\tDP_Total\tDP_Alt\tFraction");
        assert_eq!(lines[1], "chr1\t100\tA\tT\t50\t25\t0.5000");
    }

    #[test]
    fn test_summary_survives_unreadable_filter_input() {
        // The line-count stage is independent of the variant reader: a file
        // that is not a parseable variant container still gets a summary.
        let mut bogus = NamedTempFile::new().unwrap();
        writeln!(bogus, "not a vcf").unwrap();
        bogus.flush().unwrap();

        assert_eq!(count_pileup_lines(bogus.path()).unwrap(), 1);
    }
}
