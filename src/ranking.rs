// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Selection of the highest scoring mutations.

use anyhow::Result;
use itertools::Itertools;
use ordered_float::NotNan;

use crate::errors::Error;
use crate::features::{FeatureRow, FeatureTable};
use crate::utils::stats::quantile;

/// Default quantile above which mutations are reported.
pub const SCORE_QUANTILE: f64 = 0.95;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
    VariantNames,
)]
#[strum(serialize_all = "kebab_case")]
#[serde(rename_all = "kebab-case")]
pub enum ScoreKind {
    EpiScore,
    EpiZScore,
}

impl Default for ScoreKind {
    fn default() -> Self {
        ScoreKind::EpiScore
    }
}

impl ScoreKind {
    pub fn score(self, row: &FeatureRow) -> Option<f64> {
        match self {
            ScoreKind::EpiScore => Some(row.epi_score),
            ScoreKind::EpiZScore => row.epi_z_score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, new)]
pub struct RankedMutation {
    pub mutation: String,
    pub score: f64,
}

/// Mutations scoring strictly above the given quantile of the score
/// column, best first. Ties in score are ordered by token.
///
/// Mutations without a defined score take no part in the ranking.
pub fn top_scores(table: &FeatureTable, kind: ScoreKind, q: f64) -> Result<Vec<RankedMutation>> {
    if !(0.0..=1.0).contains(&q) {
        return Err(Error::InvalidQuantile { value: q }.into());
    }

    let scores = table
        .iter()
        .filter_map(|(mutation, row)| {
            kind.score(row)
                .and_then(|score| NotNan::new(score).ok())
                .map(|score| (mutation, score))
        })
        .collect_vec();
    let values = scores
        .iter()
        .map(|(_, score)| score.into_inner())
        .collect_vec();
    let cutoff = match quantile(&values, q) {
        Some(cutoff) => cutoff,
        None => return Ok(Vec::new()),
    };
    debug!("{} cutoff at quantile {}: {}", kind, q, cutoff);

    Ok(scores
        .into_iter()
        .filter(|(_, score)| score.into_inner() > cutoff)
        .sorted_by(|(mutation_a, a), (mutation_b, b)| {
            b.cmp(a).then_with(|| mutation_a.cmp(mutation_b))
        })
        .map(|(mutation, score)| RankedMutation::new(mutation.to_owned(), score.into_inner()))
        .collect())
}

/// Tokens of the top scoring mutations, best first.
pub fn predict(table: &FeatureTable, kind: ScoreKind, q: f64) -> Result<Vec<String>> {
    Ok(top_scores(table, kind, q)?
        .into_iter()
        .map(|ranked| ranked.mutation)
        .collect())
}
