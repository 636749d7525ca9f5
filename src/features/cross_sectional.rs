// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::collections::BTreeMap;

use itertools::Itertools;

use crate::aggregation::VariantTable;
use crate::utils::stats::{rank_pct, zscores};

/// Cross-sectional epidemiological features of a mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    #[serde(rename = "Frac_HaplosWherePresent")]
    pub frac_haplos_where_present: f64,
    #[serde(rename = "N_Countries")]
    pub n_countries: usize,
    #[serde(rename = "Frac_Vars")]
    pub frac_vars: f64,
    /// Mean of 10^(percentile rank) over the three features.
    #[serde(rename = "EpiScore")]
    pub epi_score: f64,
    /// Mean z-score over the three features. Features with zero variance
    /// are left out, `None` if all of them are.
    #[serde(rename = "EpiZScore")]
    pub epi_z_score: Option<f64>,
}

impl FeatureRow {
    pub const COLUMNS: [&'static str; 5] = [
        "Frac_HaplosWherePresent",
        "N_Countries",
        "Frac_Vars",
        "EpiScore",
        "EpiZScore",
    ];
}

/// Score every mutation of the table by the rank-based composite of its
/// haplotype presence, country spread and prevalence.
pub fn cross_sectional_features(variants: &VariantTable) -> BTreeMap<String, FeatureRow> {
    let columns = [
        variants
            .iter()
            .map(|(_, stats)| stats.frac_haplos_where_present)
            .collect_vec(),
        variants
            .iter()
            .map(|(_, stats)| stats.n_countries as f64)
            .collect_vec(),
        variants
            .iter()
            .map(|(_, stats)| stats.frac_vars)
            .collect_vec(),
    ];
    let ranks = columns.iter().map(|column| rank_pct(column)).collect_vec();
    let zscores = columns.iter().map(|column| zscores(column)).collect_vec();

    variants
        .iter()
        .enumerate()
        .map(|(i, (mutation, stats))| {
            let epi_score =
                ranks.iter().map(|rank| 10f64.powf(rank[i])).sum::<f64>() / ranks.len() as f64;
            let defined = zscores.iter().filter_map(|z| z[i]).collect_vec();
            let epi_z_score = if defined.is_empty() {
                None
            } else {
                Some(defined.iter().sum::<f64>() / defined.len() as f64)
            };
            (
                mutation.to_owned(),
                FeatureRow {
                    frac_haplos_where_present: stats.frac_haplos_where_present,
                    n_countries: stats.n_countries,
                    frac_vars: stats.frac_vars,
                    epi_score,
                    epi_z_score,
                },
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::aggregate;
    use crate::records::tests::record;

    #[test]
    fn test_epi_score() {
        let records = vec![
            record("D614G,N501Y", "UK", "2020-10", 5, 20),
            record("D614G", "UK", "2020-10", 10, 20),
            record("D614G,E484K", "USA", "2020-10", 3, 10),
            record("D614G,N501Y", "UK", "2020-11", 12, 30),
            record("D614G,N501Y,E484K", "USA", "2020-11", 4, 15),
            record("D614G,E484Q", "India", "2020-11", 1, 8),
        ];
        let features = cross_sectional_features(&aggregate(&records).unwrap());

        // percentile ranks (haplos, countries, prevalence):
        // D614G (1, 0.875, 1), N501Y (0.625, 0.875, 0.75),
        // E484K (0.625, 0.5, 0.5), E484Q (0.25, 0.25, 0.25)
        let expected = |ranks: [f64; 3]| ranks.iter().map(|r| 10f64.powf(*r)).sum::<f64>() / 3.0;
        assert_relative_eq!(features["D614G"].epi_score, expected([1.0, 0.875, 1.0]));
        assert_relative_eq!(features["N501Y"].epi_score, expected([0.625, 0.875, 0.75]));
        assert_relative_eq!(features["E484K"].epi_score, expected([0.625, 0.5, 0.5]));
        assert_relative_eq!(features["E484Q"].epi_score, 10f64.powf(0.25));

        let best = features
            .iter()
            .max_by(|a, b| a.1.epi_z_score.partial_cmp(&b.1.epi_z_score).unwrap())
            .unwrap();
        assert_eq!(best.0, "D614G");
    }

    #[test]
    fn test_z_score_of_constant_features() {
        let records = vec![record("A1B,C2D", "UK", "2020-10", 1, 2)];
        let features = cross_sectional_features(&aggregate(&records).unwrap());
        assert!(features.values().all(|row| row.epi_z_score.is_none()));
        // all tied at the top rank
        assert!(features
            .values()
            .all(|row| relative_eq!(row.epi_score, 10f64.powf(0.75))));
    }
}
