//! # pileup-filter - Pileup Summary and Allele-Depth Filter Tool
//!
//! A Rust implementation of a pileup post-processing tool that summarizes a
//! pileup/variant file and applies a minimum-alternate-read filter, emitting
//! an annotated tab-separated report with the alternate-allele fraction.

pub mod filter;
pub mod summary;
pub mod utils;
pub mod vcf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Thresholds applied by the depth filter
#[derive(Debug, Clone)]
pub struct FilterConfig {
    /// Minimum number of alternate-supporting reads to keep a record
    pub min_alt_reads: i64,
    /// Total depth a record must strictly exceed to be considered
    pub depth_cutoff: i64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_alt_reads: 20,
            depth_cutoff: 10,
        }
    }
}

/// One annotated output row of the filtered pileup report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedRow {
    pub chrom: String,
    pub pos: i64,
    pub ref_allele: String,
    pub alt_alleles: String,
    pub total_depth: i64,
    pub alt_depth: i64,
    pub fraction: f64,
}

impl AnnotatedRow {
    pub fn new(
        chrom: String,
        pos: i64,
        ref_allele: String,
        alt_alleles: String,
        total_depth: i64,
        alt_depth: i64,
        fraction: f64,
    ) -> Self {
        Self {
            chrom,
            pos,
            ref_allele,
            alt_alleles,
            total_depth,
            alt_depth,
            fraction,
        }
    }

    /// Format the row as a tab-separated report line
    pub fn to_line(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{:.4}",
            self.chrom,
            self.pos,
            self.ref_allele,
            self.alt_alleles,
            self.total_depth,
            self.alt_depth,
            self.fraction,
        )
    }
}

/// Error types for the pileup-filter library
#[derive(Debug, thiserror::Error)]
pub enum PileupError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTSlib error: {0}")]
    Htslib(#[from] rust_htslib::errors::Error),

    #[error("Invalid variant record: {0}")]
    InvalidRecord(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Directory not found: {0}")]
    DirNotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type PileupResult<T> = Result<T, PileupError>;
