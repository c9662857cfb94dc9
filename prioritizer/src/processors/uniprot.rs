// src/processors/uniprot.rs

use std::sync::Arc;

use anyhow::Result;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::api_handler::ApiHandler;
use crate::cache::RunCache;
use crate::error::{RowWarning, WarningKind};
use crate::models::{DomainInterval, ProteinEntry, ProteinMatch};

pub const UNIPROT_BASE_URL: &str = "https://rest.uniprot.org";
const SEARCH_PAGE_SIZE: &str = "50";

/// Source of candidate proteins for a (gene, organism) pair.
pub trait ProteinRepository: Send + Sync {
    fn query(&self, gene_name: &str, tax_id: u32) -> Result<Vec<ProteinEntry>>;
}

// ─── UniProt REST ────────────────────────────────────────────────────────────

#[derive(Deserialize, Debug)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<UniProtEntry>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct UniProtEntry {
    primary_accession: String,
    sequence: Option<SequenceInfo>,
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Deserialize, Debug)]
struct SequenceInfo {
    length: u32,
}

#[derive(Deserialize, Debug)]
struct Feature {
    #[serde(rename = "type")]
    feature_type: String,
    location: Option<Location>,
}

#[derive(Deserialize, Debug)]
struct Location {
    start: Option<Position>,
    end: Option<Position>,
}

#[derive(Deserialize, Debug)]
struct Position {
    value: Option<u32>,
}

impl UniProtEntry {
    fn into_protein_entry(self) -> Option<ProteinEntry> {
        let length = self.sequence?.length;
        let domains = self
            .features
            .iter()
            .filter(|f| f.feature_type == "Domain")
            .filter_map(|f| {
                let loc = f.location.as_ref()?;
                let start = loc.start.as_ref()?.value?;
                let end = loc.end.as_ref()?.value?;
                Some(DomainInterval { start, end })
            })
            .collect();

        Some(ProteinEntry {
            accession: self.primary_accession,
            length,
            domains,
        })
    }
}

/// Parse a UniProtKB search response (JSON format, `ft_domain` requested).
pub fn parse_search_response(data: Value) -> Result<Vec<ProteinEntry>> {
    let response: SearchResponse = serde_json::from_value(data)?;
    Ok(response
        .results
        .into_iter()
        .filter_map(UniProtEntry::into_protein_entry)
        .collect())
}

pub struct UniProtRepository {
    api: ApiHandler,
}

impl UniProtRepository {
    pub fn new() -> Result<Self> {
        Self::with_base_url(UNIPROT_BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self> {
        Ok(Self {
            api: ApiHandler::new(base_url)?,
        })
    }
}

impl ProteinRepository for UniProtRepository {
    fn query(&self, gene_name: &str, tax_id: u32) -> Result<Vec<ProteinEntry>> {
        let query = format!("gene:{gene_name} AND organism_id:{tax_id}");
        let data = self.api.get(
            "/uniprotkb/search",
            &[
                ("query", query.as_str()),
                ("fields", "accession,length,ft_domain"),
                ("format", "json"),
                ("size", SEARCH_PAGE_SIZE),
            ],
        )?;
        let entries = parse_search_response(data)?;
        debug!("UniProt returned {} entries for {} (taxid {})", entries.len(), gene_name, tax_id);
        Ok(entries)
    }
}

// ─── Matching ────────────────────────────────────────────────────────────────

/// Outcome of one repository query, shared by every row with the same key.
#[derive(Debug, Clone)]
pub enum CandidateSet {
    Found(Arc<Vec<ProteinEntry>>),
    Unavailable(String),
}

pub type ProteinCache = RunCache<(String, u32), CandidateSet>;

/// `dnaK_2` -> `dnaK`.
pub fn gene_symbol(gene: &str) -> &str {
    gene.trim().split('_').next().unwrap_or_default()
}

/// Closest-length candidate within `tolerance` of `expected_length`.
/// Equal distances go to the lexicographically smallest accession, so the
/// result does not depend on the order the repository lists entries in.
pub fn select_best_match(
    candidates: &[ProteinEntry],
    expected_length: u32,
    tolerance: u32,
) -> Option<&ProteinEntry> {
    candidates
        .iter()
        .filter(|c| c.length.abs_diff(expected_length) <= tolerance)
        .min_by(|a, b| {
            a.length
                .abs_diff(expected_length)
                .cmp(&b.length.abs_diff(expected_length))
                .then_with(|| a.accession.cmp(&b.accession))
        })
}

pub struct ProteinMatcher<'a> {
    repository: &'a dyn ProteinRepository,
    cache: &'a ProteinCache,
}

impl<'a> ProteinMatcher<'a> {
    pub fn new(repository: &'a dyn ProteinRepository, cache: &'a ProteinCache) -> Self {
        Self { repository, cache }
    }

    fn candidates(&self, gene: &str, tax_id: u32) -> CandidateSet {
        let key = (gene.to_string(), tax_id);
        self.cache.get_or_insert_with(&key, || match self.repository.query(gene, tax_id) {
            Ok(entries) => CandidateSet::Found(Arc::new(entries)),
            Err(e) => {
                warn!("UniProt request for {} (taxid {}) failed: {:#}", gene, tax_id, e);
                CandidateSet::Unavailable(format!("{e:#}"))
            }
        })
    }

    /// Find the repository entry for a row. A missing taxid or expected
    /// length yields an empty match without querying, since the upstream
    /// parser already recorded why.
    pub fn find(
        &self,
        gene: &str,
        tax_id: Option<u32>,
        expected_length: Option<u32>,
        tolerance: u32,
    ) -> Result<ProteinMatch, Option<RowWarning>> {
        let gene = gene_symbol(gene);
        let (Some(tax_id), Some(expected_length)) = (tax_id, expected_length) else {
            return Err(None);
        };
        if gene.is_empty() {
            return Err(Some(RowWarning::new(WarningKind::NoEligibleMatch, "no gene name")));
        }

        match self.candidates(gene, tax_id) {
            CandidateSet::Unavailable(reason) => Err(Some(RowWarning::new(
                WarningKind::RepositoryUnavailable,
                format!("{gene} (taxid {tax_id}): {reason}"),
            ))),
            CandidateSet::Found(entries) => {
                match select_best_match(&entries, expected_length, tolerance) {
                    Some(best) => {
                        debug!("Matched {} (length {}) to {}", gene, expected_length, best.accession);
                        Ok(ProteinMatch::from(best))
                    }
                    None => Err(Some(RowWarning::new(
                        WarningKind::NoEligibleMatch,
                        format!(
                            "{gene} (taxid {tax_id}): none of {} entries within {tolerance} aa of length {expected_length}",
                            entries.len()
                        ),
                    ))),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn entry(accession: &str, length: u32) -> ProteinEntry {
        ProteinEntry {
            accession: accession.to_string(),
            length,
            domains: vec![],
        }
    }

    struct FakeRepository {
        entries: Vec<ProteinEntry>,
        calls: AtomicUsize,
        fail: bool,
    }

    impl ProteinRepository for FakeRepository {
        fn query(&self, _gene: &str, _tax_id: u32) -> Result<Vec<ProteinEntry>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(anyhow!("service unavailable"));
            }
            Ok(self.entries.clone())
        }
    }

    #[test]
    fn closest_length_wins() {
        let candidates = vec![entry("P3", 530), entry("P1", 505), entry("P2", 470)];
        let best = select_best_match(&candidates, 500, 50).unwrap();
        assert_eq!(best.accession, "P1");
    }

    #[test]
    fn tie_goes_to_smallest_accession_in_any_order() {
        let a = vec![entry("Q9ZZZ1", 520), entry("A0A001", 480)];
        let b = vec![entry("A0A001", 480), entry("Q9ZZZ1", 520)];
        assert_eq!(select_best_match(&a, 500, 50).unwrap().accession, "A0A001");
        assert_eq!(select_best_match(&b, 500, 50).unwrap().accession, "A0A001");
    }

    #[test]
    fn tolerance_is_inclusive() {
        let candidates = vec![entry("P1", 550), entry("P2", 449)];
        assert_eq!(select_best_match(&candidates, 500, 50).unwrap().accession, "P1");
        assert!(select_best_match(&candidates, 500, 0).is_none());
        assert!(select_best_match(&[], 500, 50).is_none());
    }

    #[test]
    fn gene_symbol_drops_locus_suffix() {
        assert_eq!(gene_symbol("rpoB_2"), "rpoB");
        assert_eq!(gene_symbol("gyrA"), "gyrA");
        assert_eq!(gene_symbol(""), "");
    }

    #[test]
    fn parses_search_response_domains() {
        let data = json!({
            "results": [
                {
                    "primaryAccession": "P0A6Y8",
                    "sequence": {"length": 638},
                    "features": [
                        {"type": "Domain", "location": {"start": {"value": 5}, "end": {"value": 120}}},
                        {"type": "Region", "location": {"start": {"value": 200}, "end": {"value": 300}}},
                        {"type": "Domain", "location": {"start": {"value": null}, "end": {"value": 400}}}
                    ]
                },
                {"primaryAccession": "NOLEN1"}
            ]
        });
        let entries = parse_search_response(data).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].accession, "P0A6Y8");
        assert_eq!(entries[0].length, 638);
        assert_eq!(entries[0].domains, vec![DomainInterval { start: 5, end: 120 }]);
    }

    #[test]
    fn matcher_queries_once_per_key() {
        let repo = FakeRepository {
            entries: vec![entry("P1", 500)],
            calls: AtomicUsize::new(0),
            fail: false,
        };
        let cache = ProteinCache::new();
        let matcher = ProteinMatcher::new(&repo, &cache);

        let m = matcher.find("geneA_1", Some(562), Some(498), 50).unwrap();
        assert_eq!(m.identifier.as_deref(), Some("P1"));
        assert_eq!(m.length, Some(500));
        // Same gene symbol and taxid, different expected length.
        let err = matcher.find("geneA", Some(562), Some(900), 50).unwrap_err().unwrap();
        assert_eq!(err.kind, WarningKind::NoEligibleMatch);
        assert_eq!(repo.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unavailable_repository_degrades_to_warning() {
        let repo = FakeRepository {
            entries: vec![],
            calls: AtomicUsize::new(0),
            fail: true,
        };
        let cache = ProteinCache::new();
        let matcher = ProteinMatcher::new(&repo, &cache);

        let err = matcher.find("geneA", Some(562), Some(500), 50).unwrap_err().unwrap();
        assert_eq!(err.kind, WarningKind::RepositoryUnavailable);
    }

    #[test]
    fn missing_inputs_skip_the_repository() {
        let repo = FakeRepository {
            entries: vec![entry("P1", 500)],
            calls: AtomicUsize::new(0),
            fail: false,
        };
        let cache = ProteinCache::new();
        let matcher = ProteinMatcher::new(&repo, &cache);

        assert!(matcher.find("geneA", None, Some(500), 50).unwrap_err().is_none());
        assert!(matcher.find("geneA", Some(562), None, 50).unwrap_err().is_none());
        assert_eq!(repo.calls.load(Ordering::SeqCst), 0);
    }
}
