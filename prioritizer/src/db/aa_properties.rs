// src/db/aa_properties.rs

use std::collections::HashMap;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Polar,
    Nonpolar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charge {
    Positive,
    Negative,
    Neutral,
}

/// Physicochemical attributes of one residue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AminoAcidProperties {
    /// Molecular weight in Da.
    pub weight: f64,
    /// Kyte-Doolittle hydropathy index.
    pub hydrophobicity: f64,
    pub polarity: Polarity,
    pub charge: Charge,
}

use Charge::*;
use Polarity::*;

const TABLE: [(&str, AminoAcidProperties); 20] = [
    ("Ala", aa(89.1, 1.8, Nonpolar, Neutral)),
    ("Arg", aa(174.2, -4.5, Polar, Positive)),
    ("Asn", aa(132.1, -3.5, Polar, Neutral)),
    ("Asp", aa(133.1, -3.5, Polar, Negative)),
    ("Cys", aa(121.2, 2.5, Nonpolar, Neutral)),
    ("Glu", aa(147.1, -3.5, Polar, Negative)),
    ("Gln", aa(146.2, -3.5, Polar, Neutral)),
    ("Gly", aa(75.1, -0.4, Nonpolar, Neutral)),
    ("His", aa(155.2, -3.2, Polar, Positive)),
    ("Ile", aa(131.2, 4.5, Nonpolar, Neutral)),
    ("Leu", aa(131.2, 3.8, Nonpolar, Neutral)),
    ("Lys", aa(146.2, -3.9, Polar, Positive)),
    ("Met", aa(149.2, 1.9, Nonpolar, Neutral)),
    ("Phe", aa(165.2, 2.8, Nonpolar, Neutral)),
    ("Pro", aa(115.1, -1.6, Nonpolar, Neutral)),
    ("Ser", aa(105.1, -0.8, Polar, Neutral)),
    ("Thr", aa(119.1, -0.7, Polar, Neutral)),
    ("Trp", aa(204.2, -0.9, Nonpolar, Neutral)),
    ("Tyr", aa(181.2, -1.3, Polar, Neutral)),
    ("Val", aa(117.1, 4.2, Nonpolar, Neutral)),
];

const fn aa(weight: f64, hydrophobicity: f64, polarity: Polarity, charge: Charge) -> AminoAcidProperties {
    AminoAcidProperties {
        weight,
        hydrophobicity,
        polarity,
        charge,
    }
}

fn table() -> &'static HashMap<&'static str, AminoAcidProperties> {
    static PROPERTIES: OnceLock<HashMap<&'static str, AminoAcidProperties>> = OnceLock::new();
    PROPERTIES.get_or_init(|| TABLE.iter().copied().collect())
}

/// Look up a 3-letter code (title case, as written in HGVS `p.` notation).
pub fn lookup(code: &str) -> Option<&'static AminoAcidProperties> {
    table().get(code)
}
