// src/models.rs

use crate::error::RowWarning;

/// One input row, reduced to the cells the scoring core reads. The remaining
/// columns stay in the table untouched.
#[derive(Debug, Clone, Default)]
pub struct VariantRecord {
    pub evidence: String,
    pub effect: String,
    pub gene: String,
    pub aa_position: String,
    pub species: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DepthInfo {
    pub max_depth: Option<u64>,
    /// Only meaningful after the batch-wide normalization stage.
    pub normalized_depth: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AminoAcidChange {
    pub reference_aa: String,
    pub position: u32,
    pub mutant_aa: String,
}

impl AminoAcidChange {
    /// Compact form, e.g. `Ala123Gly`.
    pub fn label(&self) -> String {
        format!("{}{}{}", self.reference_aa, self.position, self.mutant_aa)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProteinContext {
    pub mutated_position: Option<u32>,
    pub total_length: Option<u32>,
}

/// Inclusive residue range of an annotated domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainInterval {
    pub start: u32,
    pub end: u32,
}

impl DomainInterval {
    pub fn contains(&self, position: u32) -> bool {
        self.start <= position && position <= self.end
    }
}

/// One candidate returned by the protein repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProteinEntry {
    pub accession: String,
    pub length: u32,
    pub domains: Vec<DomainInterval>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProteinMatch {
    pub identifier: Option<String>,
    pub length: Option<u32>,
    pub domains: Vec<DomainInterval>,
}

impl ProteinMatch {
    pub fn empty() -> Self {
        Self::default()
    }
}

impl From<&ProteinEntry> for ProteinMatch {
    fn from(entry: &ProteinEntry) -> Self {
        Self {
            identifier: Some(entry.accession.clone()),
            length: Some(entry.length),
            domains: entry.domains.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PriorityScore {
    pub depth_component: f64,
    pub impact_component: f64,
    pub domain_component: f64,
    pub final_score: f64,
    pub final_score_percent: f64,
}

/// Everything derived for one row over the course of a run.
#[derive(Debug, Clone, Default)]
pub struct ScoredVariant {
    pub depth: DepthInfo,
    pub aa_change: Option<AminoAcidChange>,
    pub impact_score: f64,
    pub protein: ProteinContext,
    pub tax_id: Option<u32>,
    pub protein_match: ProteinMatch,
    pub domain_match: u8,
    pub score: PriorityScore,
    pub warnings: Vec<RowWarning>,
}

impl ScoredVariant {
    pub fn warnings_label(&self) -> String {
        self.warnings
            .iter()
            .map(|w| w.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}
