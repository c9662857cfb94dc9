// src/processors/taxonomy.rs

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::api_handler::ApiHandler;
use crate::cache::RunCache;
use crate::error::{RowWarning, WarningKind};

pub const EUTILS_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

/// Scientific name -> NCBI taxonomy id.
pub trait TaxonomyLookup: Send + Sync {
    fn lookup(&self, scientific_name: &str) -> Result<Option<u32>>;
}

/// `Bacteroides_uniformis ` -> `Bacteroides uniformis`.
pub fn normalize_species_name(name: &str) -> String {
    name.replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

// ─── NCBI E-utilities ────────────────────────────────────────────────────────

#[derive(Deserialize, Debug)]
struct ESearchResponse {
    esearchresult: ESearchResult,
}

#[derive(Deserialize, Debug)]
struct ESearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

/// Online lookup against the NCBI taxonomy database.
pub struct EutilsTaxonomy {
    api: ApiHandler,
}

impl EutilsTaxonomy {
    pub fn new() -> Result<Self> {
        Self::with_base_url(EUTILS_BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self> {
        Ok(Self {
            api: ApiHandler::new(base_url)?,
        })
    }
}

impl TaxonomyLookup for EutilsTaxonomy {
    fn lookup(&self, scientific_name: &str) -> Result<Option<u32>> {
        let term = format!("{scientific_name}[Scientific Name]");
        let data = self.api.get(
            "/esearch.fcgi",
            &[("db", "taxonomy"), ("term", term.as_str()), ("retmode", "json")],
        )?;
        let response: ESearchResponse = serde_json::from_value(data)?;

        match response.esearchresult.idlist.first() {
            Some(id) => Ok(Some(
                id.parse()
                    .with_context(|| format!("taxonomy id `{id}` is not numeric"))?,
            )),
            None => Ok(None),
        }
    }
}

// ─── names.dmp ───────────────────────────────────────────────────────────────

/// Offline lookup over the scientific names of an NCBI `names.dmp` dump.
#[derive(Debug, Default)]
pub struct NamesDmpTaxonomy {
    names: HashMap<String, u32>,
}

impl NamesDmpTaxonomy {
    pub fn from_path(path: &Path) -> Result<Self> {
        info!("Indexing taxonomy names from {}", path.display());
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        let taxonomy = Self::from_reader(BufReader::new(file))?;
        info!("Indexed {} scientific names", taxonomy.names.len());
        Ok(taxonomy)
    }

    /// Rows look like `562\t|\tEscherichia coli\t|\t\t|\tscientific name\t|`.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut names = HashMap::new();
        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            let fields: Vec<&str> = line.split('|').map(str::trim).collect();
            if fields.len() < 4 || fields[3] != "scientific name" {
                continue;
            }
            let tax_id: u32 = fields[0]
                .parse()
                .with_context(|| format!("names.dmp line {}: bad tax_id `{}`", line_no + 1, fields[0]))?;
            names.entry(fields[1].to_string()).or_insert(tax_id);
        }
        Ok(Self { names })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl TaxonomyLookup for NamesDmpTaxonomy {
    fn lookup(&self, scientific_name: &str) -> Result<Option<u32>> {
        Ok(self.names.get(scientific_name).copied())
    }
}

// ─── Resolver ────────────────────────────────────────────────────────────────

/// Caches one lookup per distinct species for the run that owns `cache`.
pub struct TaxonomyResolver<'a> {
    lookup: &'a dyn TaxonomyLookup,
    cache: &'a RunCache<String, Option<u32>>,
}

impl<'a> TaxonomyResolver<'a> {
    pub fn new(lookup: &'a dyn TaxonomyLookup, cache: &'a RunCache<String, Option<u32>>) -> Self {
        Self { lookup, cache }
    }

    pub fn resolve(&self, species_name: &str) -> Result<u32, RowWarning> {
        let name = normalize_species_name(species_name);
        if name.is_empty() {
            return Err(RowWarning::new(WarningKind::SpeciesNotFound, "no species given"));
        }

        let tax_id = self.cache.get_or_insert_with(&name, || {
            match self.lookup.lookup(&name) {
                Ok(Some(id)) => {
                    debug!("Resolved `{}` to taxid {}", name, id);
                    Some(id)
                }
                Ok(None) => {
                    warn!("No taxonomy ID found for `{}`", name);
                    None
                }
                Err(e) => {
                    warn!("Taxonomy lookup for `{}` failed: {:#}", name, e);
                    None
                }
            }
        });

        tax_id.ok_or_else(|| {
            RowWarning::new(
                WarningKind::SpeciesNotFound,
                format!("no taxonomy ID for `{name}`"),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingLookup {
        calls: AtomicUsize,
    }

    impl TaxonomyLookup for CountingLookup {
        fn lookup(&self, scientific_name: &str) -> Result<Option<u32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match scientific_name {
                "Escherichia coli" => Ok(Some(562)),
                "Broken service" => Err(anyhow!("connection refused")),
                _ => Ok(None),
            }
        }
    }

    const NAMES_DMP: &str = "\
562\t|\tEscherichia coli\t|\t\t|\tscientific name\t|
562\t|\tBacillus coli\t|\t\t|\tsynonym\t|
820\t|\tBacteroides uniformis\t|\t\t|\tscientific name\t|
";

    #[test]
    fn normalizes_underscores_and_spacing() {
        assert_eq!(normalize_species_name(" Bacteroides_uniformis "), "Bacteroides uniformis");
        assert_eq!(normalize_species_name("Escherichia   coli"), "Escherichia coli");
    }

    #[test]
    fn resolves_once_per_species() {
        let lookup = CountingLookup { calls: AtomicUsize::new(0) };
        let cache = RunCache::new();
        let resolver = TaxonomyResolver::new(&lookup, &cache);

        assert_eq!(resolver.resolve("Escherichia coli").unwrap(), 562);
        assert_eq!(resolver.resolve("Escherichia_coli").unwrap(), 562);
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unknown_and_failing_species_are_warnings() {
        let lookup = CountingLookup { calls: AtomicUsize::new(0) };
        let cache = RunCache::new();
        let resolver = TaxonomyResolver::new(&lookup, &cache);

        let err = resolver.resolve("Nonexistent bacterium").unwrap_err();
        assert_eq!(err.kind, WarningKind::SpeciesNotFound);
        let err = resolver.resolve("Broken service").unwrap_err();
        assert_eq!(err.kind, WarningKind::SpeciesNotFound);

        // Failures are cached too.
        let _ = resolver.resolve("Broken service");
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn blank_species_skips_lookup() {
        let lookup = CountingLookup { calls: AtomicUsize::new(0) };
        let cache = RunCache::new();
        let resolver = TaxonomyResolver::new(&lookup, &cache);
        assert!(resolver.resolve("  ").is_err());
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn names_dmp_indexes_scientific_names_only() {
        let taxonomy = NamesDmpTaxonomy::from_reader(Cursor::new(NAMES_DMP)).unwrap();
        assert_eq!(taxonomy.len(), 2);
        assert_eq!(taxonomy.lookup("Escherichia coli").unwrap(), Some(562));
        assert_eq!(taxonomy.lookup("Bacteroides uniformis").unwrap(), Some(820));
        assert_eq!(taxonomy.lookup("Bacillus coli").unwrap(), None);
    }

    #[test]
    fn names_dmp_rejects_non_numeric_ids() {
        let bad = "abc\t|\tFoo bar\t|\t\t|\tscientific name\t|\n";
        assert!(NamesDmpTaxonomy::from_reader(Cursor::new(bad)).is_err());
    }
}
