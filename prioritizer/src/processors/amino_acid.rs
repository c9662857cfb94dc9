// src/processors/amino_acid.rs

use std::sync::OnceLock;

use regex::Regex;

use crate::db::aa_properties::{self, AminoAcidProperties};
use crate::error::{RowWarning, WarningKind};
use crate::models::AminoAcidChange;

const WEIGHT_SCALE: f64 = 130.0;
const HYDROPHOBICITY_SCALE: f64 = 9.0;

fn protein_change_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"p\.([A-Z][a-z]{2})(\d+)([A-Z][a-z]{2})").expect("valid protein change regex")
    })
}

/// Find the `p.<Ref><Pos><Mut>` substitution in an effect annotation.
pub fn extract_aa_change(effect: &str) -> Result<AminoAcidChange, RowWarning> {
    let caps = protein_change_re().captures(effect).ok_or_else(|| {
        RowWarning::new(
            WarningKind::UnparsableEffect,
            format!("no p.<Ref><Pos><Mut> change in `{effect}`"),
        )
    })?;

    let position = caps[2]
        .parse::<u32>()
        .ok()
        .filter(|&p| p > 0)
        .ok_or_else(|| {
            RowWarning::new(
                WarningKind::UnparsableEffect,
                format!("invalid residue position `{}`", &caps[2]),
            )
        })?;

    Ok(AminoAcidChange {
        reference_aa: caps[1].to_string(),
        position,
        mutant_aa: caps[3].to_string(),
    })
}

/// Physicochemical distance between the two residues of a substitution:
/// normalized weight and hydropathy differences plus one point each for a
/// polarity or charge class change.
pub fn compute_aa_impact(change: &AminoAcidChange) -> Result<f64, RowWarning> {
    let reference = property(&change.reference_aa)?;
    let mutant = property(&change.mutant_aa)?;
    Ok(impact_between(reference, mutant))
}

fn property(code: &str) -> Result<&'static AminoAcidProperties, RowWarning> {
    aa_properties::lookup(code).ok_or_else(|| {
        RowWarning::new(
            WarningKind::UnknownAminoAcid,
            format!("`{code}` is not in the amino acid property table"),
        )
    })
}

pub fn impact_between(reference: &AminoAcidProperties, mutant: &AminoAcidProperties) -> f64 {
    let weight_diff = (reference.weight - mutant.weight).abs() / WEIGHT_SCALE;
    let hydro_diff = (reference.hydrophobicity - mutant.hydrophobicity).abs() / HYDROPHOBICITY_SCALE;
    let polarity_change = if reference.polarity != mutant.polarity { 1.0 } else { 0.0 };
    let charge_change = if reference.charge != mutant.charge { 1.0 } else { 0.0 };

    weight_diff + hydro_diff + polarity_change + charge_change
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn extracts_canonical_change() {
        let change = extract_aa_change("p.Ala123Gly").unwrap();
        assert_eq!(change.reference_aa, "Ala");
        assert_eq!(change.position, 123);
        assert_eq!(change.mutant_aa, "Gly");
        assert_eq!(change.label(), "Ala123Gly");
    }

    #[test]
    fn finds_change_inside_longer_annotation() {
        let change = extract_aa_change("missense_variant c.368C>G p.Trp456Leu").unwrap();
        assert_eq!(change.label(), "Trp456Leu");
    }

    #[test]
    fn unmatched_effect_is_unparsable() {
        for effect in ["missense_variant", "", "p.A123G", "p.Ala0Gly"] {
            let err = extract_aa_change(effect).unwrap_err();
            assert_eq!(err.kind, WarningKind::UnparsableEffect, "effect `{effect}`");
        }
    }

    #[test]
    fn ala_to_gly_matches_table_values() {
        let change = extract_aa_change("p.Ala123Gly").unwrap();
        let impact = compute_aa_impact(&change).unwrap();
        // Ala 89.1 / 1.8, Gly 75.1 / -0.4; both nonpolar and neutral.
        assert_relative_eq!(impact, 14.0 / 130.0 + 2.2 / 9.0, epsilon = 1e-12);
    }

    #[test]
    fn class_changes_add_whole_points() {
        // Asp (polar, negative) -> Val (nonpolar, neutral)
        let change = extract_aa_change("p.Asp10Val").unwrap();
        let impact = compute_aa_impact(&change).unwrap();
        let expected = (133.1f64 - 117.1).abs() / 130.0 + (-3.5f64 - 4.2).abs() / 9.0 + 1.0 + 1.0;
        assert_relative_eq!(impact, expected, epsilon = 1e-12);
    }

    #[test]
    fn synonymous_change_scores_zero() {
        let change = extract_aa_change("p.Leu5Leu").unwrap();
        assert_eq!(compute_aa_impact(&change).unwrap(), 0.0);
    }

    #[test]
    fn stop_codon_is_unknown_amino_acid() {
        let change = extract_aa_change("p.Gln61Ter").unwrap();
        let err = compute_aa_impact(&change).unwrap_err();
        assert_eq!(err.kind, WarningKind::UnknownAminoAcid);
    }
}
