//! Pileup VCF/BCF access through rust-htslib
//!
//! The container format itself (plain, bgzipped or binary) is handled
//! entirely by htslib; this module only opens the file and pulls the fields
//! the depth filter needs out of individual records.

use crate::{PileupError, PileupResult};
use rust_htslib::bcf;
use std::path::Path;

/// Open a pileup VCF/BCF file for reading
pub fn open_pileup<P: AsRef<Path>>(path: P) -> PileupResult<bcf::Reader> {
    bcf::Reader::from_path(path.as_ref()).map_err(PileupError::Htslib)
}

/// Read a numeric INFO tag as floats, accepting either Integer or Float
/// typing. Returns `None` when the tag is absent from the record or cannot
/// be read as a number.
fn info_values(record: &bcf::Record, tag: &[u8]) -> Option<Vec<f64>> {
    match record.info(tag).integer() {
        Ok(Some(values)) => Some(values.iter().map(|&v| f64::from(v)).collect()),
        Ok(None) => None,
        Err(_) => match record.info(tag).float() {
            Ok(Some(values)) => Some(values.iter().map(|&v| f64::from(v)).collect()),
            _ => None,
        },
    }
}

/// Total reported read depth (`DP`) of a record, if present
pub fn total_depth(record: &bcf::Record) -> Option<i64> {
    info_values(record, b"DP").and_then(|values| values.first().map(|&d| d as i64))
}

/// Strand-split depths recomputed from the `I16` statistics array:
/// `(ref_depth, alt_depth)` where ref is `I16[0] + I16[1]` and alt is
/// `I16[2] + I16[3]`. Returns `None` when `I16` is absent or carries fewer
/// than 4 values.
pub fn strand_depths(record: &bcf::Record) -> Option<(i64, i64)> {
    let values = info_values(record, b"I16")?;
    if values.len() < 4 {
        return None;
    }
    let ref_depth = (values[0] + values[1]) as i64;
    let alt_depth = (values[2] + values[3]) as i64;
    Some((ref_depth, alt_depth))
}

/// Chromosome name of a record, resolved through the header
pub fn chrom_name(record: &bcf::Record) -> PileupResult<String> {
    let rid = record
        .rid()
        .ok_or_else(|| PileupError::InvalidRecord("record has no chromosome".to_string()))?;
    let name = record.header().rid2name(rid)?;
    Ok(String::from_utf8_lossy(name).into_owned())
}

/// Reference allele of a record
pub fn ref_allele(record: &bcf::Record) -> String {
    record
        .alleles()
        .first()
        .map(|allele| String::from_utf8_lossy(allele).into_owned())
        .unwrap_or_else(|| ".".to_string())
}

/// Comma-joined alternate alleles of a record, or `.` when there are none
pub fn alt_field(record: &bcf::Record) -> String {
    let alleles = record.alleles();
    if alleles.len() < 2 {
        return ".".to_string();
    }
    alleles[1..]
        .iter()
        .map(|allele| String::from_utf8_lossy(allele).into_owned())
        .collect::<Vec<_>>()
        .join(",")
}
