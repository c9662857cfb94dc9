// src/pipeline.rs

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use polars::prelude::*;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::cache::RunCache;
use crate::config::ScoringConfig;
use crate::error::{Result, WarningKind};
use crate::io::loader::{
    has_column, validate_columns, Dataset, AA_POSITION_COL, EFFECT_COL, EVIDENCE_COL, GENE_COL,
    SPECIES_COL,
};
use crate::io::writer::save_table;
use crate::models::{DepthInfo, PriorityScore, ProteinMatch, ScoredVariant, VariantRecord};
use crate::processors::amino_acid::{compute_aa_impact, extract_aa_change};
use crate::processors::depth::{extract_depth, normalize_depth};
use crate::processors::domain::check_domain_position;
use crate::processors::position::parse_aa_position;
use crate::processors::taxonomy::{TaxonomyLookup, TaxonomyResolver};
use crate::processors::uniprot::{ProteinCache, ProteinMatcher, ProteinRepository};
use crate::scoring::{calculate_priority_score, log_score_summary, ScoreWeights};

pub const MAX_DEPTH_COL: &str = "Max_Depth";
pub const NORMALIZED_DEPTH_COL: &str = "Normalized_Depth";
pub const AA_CHANGE_COL: &str = "AA_Change";
pub const AA_IMPACT_COL: &str = "AA_Impact_Score";
pub const MUTATED_AA_COL: &str = "Mutated_AA";
pub const TOTAL_AA_COL: &str = "Total_AA";
pub const TAX_ID_COL: &str = "TAX_ID";
pub const UNIPROT_ID_COL: &str = "UniProt_ID";
pub const UNIPROT_LENGTH_COL: &str = "UniProt_Length";
pub const DOMAIN_MATCH_COL: &str = "Domain_Position_Match";
pub const FINAL_SCORE_COL: &str = "Final_Priority_Score";
pub const FINAL_SCORE_PERCENT_COL: &str = "Final_Priority_Score_Percent";
pub const WARNINGS_COL: &str = "Warnings";

/// Columns appended to every output table, in order.
pub const DERIVED_COLUMNS: [&str; 13] = [
    MAX_DEPTH_COL,
    NORMALIZED_DEPTH_COL,
    AA_CHANGE_COL,
    AA_IMPACT_COL,
    MUTATED_AA_COL,
    TOTAL_AA_COL,
    TAX_ID_COL,
    UNIPROT_ID_COL,
    UNIPROT_LENGTH_COL,
    DOMAIN_MATCH_COL,
    FINAL_SCORE_COL,
    FINAL_SCORE_PERCENT_COL,
    WARNINGS_COL,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Load,
    ParseRows,
    ResolveTaxonomy,
    ResolveProteins,
    NormalizeDepth,
    Aggregate,
    Emit,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Load => "load",
            Stage::ParseRows => "parse rows",
            Stage::ResolveTaxonomy => "resolve taxonomy",
            Stage::ResolveProteins => "resolve proteins",
            Stage::NormalizeDepth => "normalize depth",
            Stage::Aggregate => "aggregate",
            Stage::Emit => "emit",
        };
        write!(f, "{s}")
    }
}

/// Lookups shared by every row of one run, dropped when the run ends.
#[derive(Default)]
struct RunState {
    taxonomy: RunCache<String, Option<u32>>,
    proteins: ProteinCache,
}

/// Scores a batch of variants against one taxonomy backend and one protein
/// repository.
pub struct Prioritizer {
    config: ScoringConfig,
    weights: ScoreWeights,
    taxonomy: Box<dyn TaxonomyLookup>,
    repository: Box<dyn ProteinRepository>,
}

impl Prioritizer {
    /// Fails with `InvalidWeightConfiguration` before any row is touched.
    pub fn new(
        config: ScoringConfig,
        taxonomy: Box<dyn TaxonomyLookup>,
        repository: Box<dyn ProteinRepository>,
    ) -> Result<Self> {
        let weights = ScoreWeights::from_config(&config)?;
        Ok(Self {
            config,
            weights,
            taxonomy,
            repository,
        })
    }

    /// Load → score → optionally write. Returns the scored table and the path
    /// actually written, if any.
    pub fn run(
        &self,
        input: &dyn Dataset,
        species: &str,
        output: Option<&Path>,
    ) -> Result<(DataFrame, Option<PathBuf>)> {
        info!("[{}] Loading input data", Stage::Load);
        let df = input.load()?;

        let mut scored = self.process_dataframe(df, species)?;

        let written = match output {
            Some(path) => {
                info!("[{}] Saving results to {}", Stage::Emit, path.display());
                Some(save_table(&mut scored, path)?)
            }
            None => None,
        };
        Ok((scored, written))
    }

    /// Score every row and append the derived columns. Existing columns keep
    /// their values and order; a derived column whose name is already taken
    /// gets a numeric suffix.
    pub fn process_dataframe(&self, mut df: DataFrame, species: &str) -> Result<DataFrame> {
        validate_columns(&df)?;

        let records = records_from_dataframe(&df, species)?;
        let scored = self.score_records(&records);

        if !has_column(&df, SPECIES_COL) {
            let species: Vec<&str> = records.iter().map(|r| r.species.as_str()).collect();
            df.with_column(Series::new(PlSmallStr::from(SPECIES_COL), species))?;
        }
        append_derived_columns(&mut df, &scored)?;
        Ok(df)
    }

    /// Run every stage over the batch. Output order matches `records`.
    pub fn score_records(&self, records: &[VariantRecord]) -> Vec<ScoredVariant> {
        let state = RunState::default();

        info!("[{}] Parsing {} rows", Stage::ParseRows, records.len());
        let mut scored: Vec<ScoredVariant> = records.par_iter().map(parse_row).collect();

        info!("[{}] Fetching taxonomy IDs", Stage::ResolveTaxonomy);
        let resolver = TaxonomyResolver::new(self.taxonomy.as_ref(), &state.taxonomy);
        scored
            .par_iter_mut()
            .zip(records)
            .for_each(|(row, record)| match resolver.resolve(&record.species) {
                Ok(tax_id) => row.tax_id = Some(tax_id),
                Err(w) => row.warnings.push(w),
            });
        debug!("Resolved {} distinct species", state.taxonomy.len());

        info!("[{}] Searching UniProt and checking domain positions", Stage::ResolveProteins);
        let matcher = ProteinMatcher::new(self.repository.as_ref(), &state.proteins);
        let tolerance = self.config.uniprot_tolerance;
        scored.par_iter_mut().zip(records).for_each(|(row, record)| {
            row.protein_match = match matcher.find(
                &record.gene,
                row.tax_id,
                row.protein.total_length,
                tolerance,
            ) {
                Ok(found) => found,
                Err(w) => {
                    row.warnings.extend(w);
                    ProteinMatch::empty()
                }
            };
            row.domain_match =
                check_domain_position(row.protein.mutated_position, &row.protein_match.domains);
        });
        debug!("Queried UniProt for {} distinct genes", state.proteins.len());

        info!("[{}] Normalizing read depth across the batch", Stage::NormalizeDepth);
        let depths: Vec<Option<u64>> = scored.iter().map(|r| r.depth.max_depth).collect();
        for (row, normalized) in scored.iter_mut().zip(normalize_depth(&depths)) {
            row.depth.normalized_depth = normalized;
        }

        info!("[{}] Calculating final priority scores", Stage::Aggregate);
        let weights = self.weights;
        scored.par_iter_mut().for_each(|row| {
            row.score = calculate_priority_score(
                row.depth.normalized_depth,
                row.impact_score,
                row.domain_match,
                &weights,
            );
        });
        let scores: Vec<PriorityScore> = scored.iter().map(|r| r.score).collect();
        log_score_summary(&scores);

        log_warning_summary(&scored);
        scored
    }
}

fn parse_row(record: &VariantRecord) -> ScoredVariant {
    let mut row = ScoredVariant::default();

    match extract_depth(&record.evidence) {
        Ok(depth) => {
            row.depth = DepthInfo {
                max_depth: Some(depth),
                normalized_depth: 0.0,
            }
        }
        Err(w) => row.warnings.push(w),
    }

    match extract_aa_change(&record.effect) {
        Ok(change) => {
            match compute_aa_impact(&change) {
                Ok(impact) => row.impact_score = impact,
                Err(w) => row.warnings.push(w),
            }
            row.aa_change = Some(change);
        }
        Err(w) => row.warnings.push(w),
    }

    match parse_aa_position(&record.aa_position) {
        Ok(ctx) => row.protein = ctx,
        Err(w) => row.warnings.push(w),
    }

    row
}

fn log_warning_summary(scored: &[ScoredVariant]) {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for (i, row) in scored.iter().enumerate() {
        for w in &row.warnings {
            if w.kind.is_logged_per_key() {
                debug!("row {}: {}", i, w);
            } else {
                warn!("row {}: {}", i, w);
            }
            *counts.entry(w.kind.to_string()).or_default() += 1;
        }
    }
    if counts.is_empty() {
        info!("All {} rows scored without warnings", scored.len());
    } else {
        info!("Row warnings: {:?}", counts);
    }
}

/// Null cells read as empty strings.
fn string_column(df: &DataFrame, name: &str) -> Result<Vec<String>> {
    let col = df.column(name)?.cast(&DataType::String)?;
    Ok(col
        .str()?
        .into_iter()
        .map(|v| v.unwrap_or_default().to_string())
        .collect())
}

fn records_from_dataframe(df: &DataFrame, default_species: &str) -> Result<Vec<VariantRecord>> {
    let evidence = string_column(df, EVIDENCE_COL)?;
    let effect = string_column(df, EFFECT_COL)?;
    let gene = string_column(df, GENE_COL)?;
    let aa_position = string_column(df, AA_POSITION_COL)?;
    let species = if has_column(df, SPECIES_COL) {
        string_column(df, SPECIES_COL)?
    } else {
        vec![String::new(); df.height()]
    };

    let records = evidence
        .into_iter()
        .zip(effect)
        .zip(gene)
        .zip(aa_position)
        .zip(species)
        .map(|((((evidence, effect), gene), aa_position), species)| VariantRecord {
            evidence,
            effect,
            gene,
            aa_position,
            species: if species.trim().is_empty() {
                default_species.to_string()
            } else {
                species
            },
        })
        .collect();
    Ok(records)
}

/// `name`, or `name_1`, `name_2`, ... if the table already has it.
fn free_column_name(df: &DataFrame, name: &str) -> String {
    if !has_column(df, name) {
        return name.to_string();
    }
    let renamed = (1..)
        .map(|i| format!("{name}_{i}"))
        .find(|candidate| !has_column(df, candidate))
        .unwrap_or_else(|| name.to_string());
    warn!("Input already has a `{}` column; writing results to `{}`", name, renamed);
    renamed
}

fn append_derived_columns(df: &mut DataFrame, scored: &[ScoredVariant]) -> Result<()> {
    fn push<T, V>(df: &mut DataFrame, name: &str, values: V) -> Result<()>
    where
        Series: NamedFrom<V, T>,
        T: ?Sized,
    {
        let name = free_column_name(df, name);
        df.with_column(Series::new(PlSmallStr::from(name), values))?;
        Ok(())
    }

    let max_depth: Vec<Option<u64>> = scored.iter().map(|r| r.depth.max_depth).collect();
    let normalized: Vec<f64> = scored.iter().map(|r| r.depth.normalized_depth).collect();
    let aa_change: Vec<Option<String>> =
        scored.iter().map(|r| r.aa_change.as_ref().map(|c| c.label())).collect();
    let impact: Vec<f64> = scored.iter().map(|r| r.impact_score).collect();
    let mutated: Vec<Option<u32>> = scored.iter().map(|r| r.protein.mutated_position).collect();
    let total: Vec<Option<u32>> = scored.iter().map(|r| r.protein.total_length).collect();
    let tax_id: Vec<Option<u32>> = scored.iter().map(|r| r.tax_id).collect();
    let uniprot_id: Vec<Option<String>> =
        scored.iter().map(|r| r.protein_match.identifier.clone()).collect();
    let uniprot_len: Vec<Option<u32>> = scored.iter().map(|r| r.protein_match.length).collect();
    let domain: Vec<i32> = scored.iter().map(|r| i32::from(r.domain_match)).collect();
    let final_score: Vec<f64> = scored.iter().map(|r| r.score.final_score).collect();
    let percent: Vec<f64> = scored.iter().map(|r| r.score.final_score_percent).collect();
    let warnings: Vec<String> = scored.iter().map(|r| r.warnings_label()).collect();

    push(df, MAX_DEPTH_COL, max_depth)?;
    push(df, NORMALIZED_DEPTH_COL, normalized)?;
    push(df, AA_CHANGE_COL, aa_change)?;
    push(df, AA_IMPACT_COL, impact)?;
    push(df, MUTATED_AA_COL, mutated)?;
    push(df, TOTAL_AA_COL, total)?;
    push(df, TAX_ID_COL, tax_id)?;
    push(df, UNIPROT_ID_COL, uniprot_id)?;
    push(df, UNIPROT_LENGTH_COL, uniprot_len)?;
    push(df, DOMAIN_MATCH_COL, domain)?;
    push(df, FINAL_SCORE_COL, final_score)?;
    push(df, FINAL_SCORE_PERCENT_COL, percent)?;
    push(df, WARNINGS_COL, warnings)?;
    Ok(())
}
