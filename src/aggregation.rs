// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Aggregation of haplotype records into per-mutation statistics.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use anyhow::Result;
use counter::Counter;

use crate::errors::Error;
use crate::mutations::{is_truncated, site_of, split_haplotype, Site};
use crate::records::Record;

/// Observation statistics of a single mutation within an analysis window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantStats {
    /// Fraction of distinct haplotypes containing the mutation.
    #[serde(rename = "Frac_HaplosWherePresent")]
    pub frac_haplos_where_present: f64,
    /// Number of locations where the mutation was observed more than once.
    #[serde(rename = "N_Countries")]
    pub n_countries: usize,
    /// Occurrences relative to all collected samples.
    #[serde(rename = "Frac_Vars")]
    pub frac_vars: f64,
    /// Occurrences relative to the occurrences of all mutations.
    #[serde(rename = "RelFrac_Vars")]
    pub rel_frac_vars: f64,
    /// Number of distinct mutations sharing the site of this mutation.
    #[serde(rename = "VarsPerSite")]
    pub vars_per_site: usize,
    #[serde(rename = "NCounts")]
    pub n_counts: u64,
}

impl VariantStats {
    pub const COLUMNS: [&'static str; 6] = [
        "Frac_HaplosWherePresent",
        "N_Countries",
        "Frac_Vars",
        "RelFrac_Vars",
        "VarsPerSite",
        "NCounts",
    ];
}

/// Variant statistics indexed by mutation token, in token order.
#[derive(Debug, Clone, Default, PartialEq, Getters)]
pub struct VariantTable {
    #[getset(get = "pub")]
    rows: BTreeMap<String, VariantStats>,
}

impl VariantTable {
    pub fn get(&self, mutation: &str) -> Option<&VariantStats> {
        self.rows.get(mutation)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &VariantStats)> {
        self.rows
            .iter()
            .map(|(mutation, stats)| (mutation.as_str(), stats))
    }

    pub fn mutations(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Aggregate the given records into per-mutation statistics.
///
/// The collected counts of a (location, month) bucket are taken from the
/// first record of that bucket. Fails if a mutation has no derivable site,
/// since the per-site variant density has to be exact.
pub fn aggregate<'a, I>(records: I) -> Result<VariantTable>
where
    I: IntoIterator<Item = &'a Record>,
{
    accumulate(records, true)
}

/// Aggregate a single (month, location) bucket. Unlike `aggregate`, a bucket
/// without collected samples is accepted and yields `Frac_Vars` of 0.
pub(crate) fn aggregate_bucket<'a, I>(records: I) -> Result<VariantTable>
where
    I: IntoIterator<Item = &'a Record>,
{
    accumulate(records, false)
}

fn accumulate<'a, I>(records: I, require_collected: bool) -> Result<VariantTable>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut haplotypes: HashSet<&str> = HashSet::new();
    let mut mutation_haplotypes: HashMap<&str, HashSet<&str>> = HashMap::new();
    let mut mutation_counts: HashMap<&str, u64> = HashMap::new();
    let mut location_counts: HashMap<(&str, &str), u64> = HashMap::new();
    let mut collected: HashMap<(&str, &str), u64> = HashMap::new();

    for record in records {
        haplotypes.insert(record.haplotype.as_str());

        match collected.entry((record.location.as_str(), record.monthdate.as_str())) {
            Entry::Vacant(entry) => {
                entry.insert(record.collected_counts);
            }
            Entry::Occupied(entry) => {
                if *entry.get() != record.collected_counts {
                    debug!(
                        "Inconsistent collected counts for {} in {}: keeping {}, ignoring {}.",
                        record.location,
                        record.monthdate,
                        entry.get(),
                        record.collected_counts
                    );
                }
            }
        }

        for mutation in split_haplotype(&record.haplotype) {
            // gene name without a subsequent substitution
            if is_truncated(mutation) {
                continue;
            }
            *mutation_counts.entry(mutation).or_insert(0) += record.haplotype_counts;
            *location_counts
                .entry((mutation, record.location.as_str()))
                .or_insert(0) += record.haplotype_counts;
            mutation_haplotypes
                .entry(mutation)
                .or_insert_with(HashSet::new)
                .insert(record.haplotype.as_str());
        }
    }

    if haplotypes.is_empty() {
        return Err(Error::EmptyWindow.into());
    }
    let total_collected: u64 = collected.values().sum();
    if total_collected == 0 {
        if require_collected {
            return Err(Error::NoCollectedSamples.into());
        }
        debug!("No collected samples in bucket, setting Frac_Vars to 0.");
    }
    let total_counts: u64 = mutation_counts.values().sum();

    let mut n_countries: HashMap<&str, usize> = HashMap::new();
    for (&(mutation, _), &count) in &location_counts {
        if count > 1 {
            *n_countries.entry(mutation).or_insert(0) += 1;
        }
    }

    let sites = mutation_counts
        .keys()
        .map(|&mutation| Ok::<_, anyhow::Error>((mutation, site_of(mutation)?)))
        .collect::<Result<HashMap<&str, Site>>>()?;
    let site_sizes: Counter<&Site> = sites.values().collect();

    let n_haplotypes = haplotypes.len() as f64;
    let rows = mutation_counts
        .iter()
        .map(|(&mutation, &count)| {
            let stats = VariantStats {
                frac_haplos_where_present: mutation_haplotypes[mutation].len() as f64
                    / n_haplotypes,
                n_countries: n_countries.get(mutation).copied().unwrap_or(0),
                frac_vars: if total_collected > 0 {
                    count as f64 / total_collected as f64
                } else {
                    0.0
                },
                rel_frac_vars: if total_counts > 0 {
                    count as f64 / total_counts as f64
                } else {
                    0.0
                },
                vars_per_site: site_sizes.get(&sites[mutation]).copied().unwrap_or(0),
                n_counts: count,
            };
            (mutation.to_owned(), stats)
        })
        .collect();

    Ok(VariantTable { rows })
}

/// Mutations observed more than once, together with their distinct sites.
pub fn observed_variants_and_sites<'a, I>(records: I) -> Result<(Vec<String>, Vec<Site>)>
where
    I: IntoIterator<Item = &'a Record>,
{
    let table = aggregate(records)?;
    let variants: Vec<String> = table
        .iter()
        .filter(|(_, stats)| stats.n_counts > 1)
        .map(|(mutation, _)| mutation.to_owned())
        .collect();
    let sites = variants
        .iter()
        .map(|mutation| site_of(mutation))
        .collect::<Result<BTreeSet<_>>>()?;
    Ok((variants, sites.into_iter().collect()))
}
