// src/processors/depth.rs

use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::error::{RowWarning, WarningKind};

fn allele_count_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b([ACGT]):(\d+)").expect("valid allele count regex"))
}

/// Maximum per-allele read count from an evidence string such as `"A:10 C:5"`.
///
/// Only single-base `A`/`C`/`G`/`T` tokens count; anything else (`N:100`,
/// `AT:40`, lowercase bases) is ignored. The string is rejected when no
/// allele count is found.
pub fn extract_depth(evidence: &str) -> Result<u64, RowWarning> {
    let evidence = evidence.trim();
    if evidence.is_empty() {
        return Err(RowWarning::new(
            WarningKind::MalformedEvidence,
            "empty evidence string",
        ));
    }

    allele_count_re()
        .captures_iter(evidence)
        .filter_map(|caps| match caps[2].parse::<u64>() {
            Ok(count) => Some(count),
            Err(_) => {
                debug!("Skipping oversized count for base {}", &caps[1]);
                None
            }
        })
        .max()
        .ok_or_else(|| {
            RowWarning::new(
                WarningKind::MalformedEvidence,
                format!("no A/C/G/T:COUNT token in `{evidence}`"),
            )
        })
}

/// Min-max scale depths across the batch into [0, 1].
///
/// Missing depths take part as 0 and always map to 0. A batch where every
/// depth is equal has no range, and every row gets 0.
pub fn normalize_depth(depths: &[Option<u64>]) -> Vec<f64> {
    let values: Vec<u64> = depths.iter().map(|d| d.unwrap_or(0)).collect();
    let (Some(&min), Some(&max)) = (values.iter().min(), values.iter().max()) else {
        return Vec::new();
    };

    if max == min {
        debug!("All depths equal ({}); normalized depth is 0 for every row", min);
        return vec![0.0; depths.len()];
    }

    let range = (max - min) as f64;
    depths
        .iter()
        .map(|d| match d {
            Some(d) => (d - min) as f64 / range,
            None => 0.0,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn picks_the_largest_count() {
        assert_eq!(extract_depth("A:10 C:5").unwrap(), 10);
        assert_eq!(extract_depth("G:20 T:8").unwrap(), 20);
        assert_eq!(extract_depth("  T:30\tA:15 ").unwrap(), 30);
    }

    #[test]
    fn empty_evidence_is_malformed() {
        let err = extract_depth("").unwrap_err();
        assert_eq!(err.kind, WarningKind::MalformedEvidence);
        assert!(extract_depth("   ").is_err());
    }

    #[test]
    fn bad_tokens_are_skipped_individually() {
        assert_eq!(extract_depth("A:x C:7").unwrap(), 7);
        assert_eq!(extract_depth("A:12 junk :4 C:-1").unwrap(), 12);
    }

    #[test]
    fn only_single_nucleotide_bases_count() {
        assert_eq!(extract_depth("N:100 A:5").unwrap(), 5);
        assert_eq!(extract_depth("G:3 del:90 T:4").unwrap(), 4);
        assert!(extract_depth("AT:40 a:3").is_err());
        assert!(extract_depth("x:9").is_err());
    }

    #[test]
    fn no_valid_token_is_malformed() {
        assert!(extract_depth("A:x C:y").is_err());
        assert!(extract_depth("missense").is_err());
    }

    #[test]
    fn normalizes_into_unit_interval() {
        let norm = normalize_depth(&[Some(10), Some(20), Some(30)]);
        assert_relative_eq!(norm[0], 0.0);
        assert_relative_eq!(norm[1], 0.5);
        assert_relative_eq!(norm[2], 1.0);
    }

    #[test]
    fn equal_depths_normalize_to_zero() {
        assert_eq!(normalize_depth(&[Some(7), Some(7), Some(7)]), vec![0.0; 3]);
    }

    #[test]
    fn missing_depth_counts_as_zero() {
        let norm = normalize_depth(&[None, Some(50), Some(100)]);
        assert_eq!(norm, vec![0.0, 0.5, 1.0]);

        let all_missing = normalize_depth(&[None, None]);
        assert_eq!(all_missing, vec![0.0, 0.0]);
    }

    #[test]
    fn empty_batch_normalizes_to_nothing() {
        assert!(normalize_depth(&[]).is_empty());
    }
}
