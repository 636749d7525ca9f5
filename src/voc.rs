// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Extension of variant-of-concern lineages by co-occurring mutations.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::{Context, Result};
use itertools::Itertools;

use crate::mutations::{site_of, split_haplotype, Site};
use crate::records::Record;

/// Lineage name to the mutations defining it.
pub type VariantsOfConcern = BTreeMap<String, Vec<String>>;

/// Read a YAML mapping of lineage names to mutation lists.
pub fn read_vocs<P: AsRef<Path>>(path: P) -> Result<VariantsOfConcern> {
    let file = std::fs::File::open(path.as_ref())
        .with_context(|| format!("unable to open {}", path.as_ref().display()))?;
    Ok(serde_yaml::from_reader(file)?)
}

/// Total haplotype counts of each mutation among records of the lineage.
pub fn lineage_variant_counts<'a>(records: &'a [Record], lineage: &str) -> BTreeMap<&'a str, u64> {
    let mut counts = BTreeMap::new();
    for record in records
        .iter()
        .filter(|record| record.pango_lineage == lineage)
    {
        for mutation in split_haplotype(&record.haplotype) {
            *counts.entry(mutation).or_insert(0) += record.haplotype_counts;
        }
    }
    counts
}

fn positional_key(token: &str) -> (String, Option<u64>) {
    match site_of(token) {
        Ok(Site::Gene { gene, position }) => (gene, Some(position)),
        _ => ("_".to_owned(), None),
    }
}

/// Add mutations co-occurring with each lineage and drop redundant lineages.
///
/// A mutation is added if its count exceeds `min_relative_frequency` times
/// the count of the most frequent mutation of the lineage. Mutation lists
/// are sorted by gene, then position, then token. Lineages are visited in
/// name order and a lineage whose list equals that of an earlier one is
/// removed.
pub fn extend_vocs(
    records: &[Record],
    vocs: &VariantsOfConcern,
    min_relative_frequency: f64,
) -> VariantsOfConcern {
    let mut extended = VariantsOfConcern::new();
    for (lineage, mutations) in vocs {
        let counts = lineage_variant_counts(records, lineage);
        let mut mutations = mutations.clone();
        if let Some(&max) = counts.values().max() {
            let added = counts
                .iter()
                .filter(|(_, &count)| count as f64 / max as f64 > min_relative_frequency)
                .map(|(&mutation, _)| mutation)
                .filter(|mutation| !mutations.iter().any(|known| known == mutation))
                .map(str::to_owned)
                .collect_vec();
            if !added.is_empty() {
                debug!("Extending {} by {}.", lineage, added.join(", "));
            }
            mutations.extend(added);
        }
        mutations.sort_by_cached_key(|mutation| {
            let (gene, position) = positional_key(mutation);
            (gene, position, mutation.clone())
        });
        extended.insert(lineage.clone(), mutations);
    }

    let mut seen = BTreeSet::new();
    extended.retain(|lineage, mutations| {
        let unique = seen.insert(mutations.clone());
        if !unique {
            info!("Removing {}, its mutations duplicate another lineage.", lineage);
        }
        unique
    });
    extended
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(haplotype: &str, lineage: &str, haplotype_counts: u64) -> Record {
        Record::new(
            haplotype.to_owned(),
            "UK".to_owned(),
            "2020-12".to_owned(),
            lineage.to_owned(),
            "GR".to_owned(),
            haplotype_counts,
            100,
        )
    }

    fn example() -> Vec<Record> {
        vec![
            record("Spike_N501Y,Spike_D614G", "B.1.1.7", 10),
            record("Spike_N501Y,Spike_D614G,Spike_P681H", "B.1.1.7", 5),
            record("Spike_D614G,Spike_E484K", "B.1.351", 4),
        ]
    }

    fn vocs(entries: &[(&str, Vec<&str>)]) -> VariantsOfConcern {
        entries
            .iter()
            .map(|(lineage, mutations)| {
                (
                    lineage.to_string(),
                    mutations.iter().map(|m| m.to_string()).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn test_lineage_variant_counts() {
        let records = example();
        let counts = lineage_variant_counts(&records, "B.1.1.7");
        assert_eq!(counts["Spike_N501Y"], 15);
        assert_eq!(counts["Spike_P681H"], 5);
        assert!(counts.get("Spike_E484K").is_none());
    }

    #[test]
    fn test_extend_vocs() {
        let records = example();
        let extended = extend_vocs(
            &records,
            &vocs(&[("B.1.1.7", vec!["Spike_N501Y"]), ("B.1.351", vec!["Spike_E484K"])]),
            0.8,
        );
        assert_eq!(extended["B.1.1.7"], vec!["Spike_N501Y", "Spike_D614G"]);
        assert_eq!(extended["B.1.351"], vec!["Spike_E484K", "Spike_D614G"]);
    }

    #[test]
    fn test_extend_vocs_removes_duplicates() {
        let records = example();
        let extended = extend_vocs(
            &records,
            &vocs(&[
                ("B.1.1.7", vec!["Spike_N501Y"]),
                ("Q.1", vec!["Spike_D614G", "Spike_N501Y"]),
            ]),
            0.8,
        );
        assert_eq!(extended.len(), 1);
        assert!(extended.contains_key("B.1.1.7"));
    }

    #[test]
    fn test_positional_order() {
        let extended = extend_vocs(
            &[],
            &vocs(&[("B.1", vec!["ORF1a_T1001I", "N501Y", "Spike_D614G", "ORF1a_A890D"])]),
            0.8,
        );
        assert_eq!(
            extended["B.1"],
            vec!["ORF1a_A890D", "ORF1a_T1001I", "Spike_D614G", "N501Y"]
        );
    }
}
