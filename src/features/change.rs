// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Rate-of-change features.
//!
//! Every (month, location) bucket is aggregated on its own. For two base
//! metrics, the change between the earliest and the latest month is
//! computed per (mutation, location) and the strongest locations of each
//! mutation are reported in rank slots `Top1..TopN`.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;
use itertools::Itertools;
use rayon::prelude::*;
use strum::IntoEnumIterator;

use crate::aggregation::{aggregate_bucket, VariantStats, VariantTable};
use crate::records::Record;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, new)]
#[serde(default, deny_unknown_fields)]
pub struct ChangeOptions {
    /// Number of locations to report fold changes for.
    pub topn_fc: usize,
    /// Number of locations to report absolute changes for.
    pub topn_delta: usize,
    /// Rank locations by descending (true) or ascending value.
    pub higher_better: bool,
}

impl Default for ChangeOptions {
    fn default() -> Self {
        ChangeOptions {
            topn_fc: 3,
            topn_delta: 2,
            higher_better: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
pub enum ChangeMetric {
    #[strum(to_string = "Frac_HaplosWherePresent")]
    FracHaplosWherePresent,
    #[strum(to_string = "Frac_Vars")]
    FracVars,
}

impl ChangeMetric {
    fn value(self, stats: &VariantStats) -> f64 {
        match self {
            ChangeMetric::FracHaplosWherePresent => stats.frac_haplos_where_present,
            ChangeMetric::FracVars => stats.frac_vars,
        }
    }
}

/// Share of the last value in the sum of first and last value.
///
/// 0.5 means no change, values above 0.5 an increase. Zero if both are zero.
pub fn fold_change(first: f64, last: f64) -> f64 {
    let sum = first + last;
    if sum == 0.0 {
        0.0
    } else {
        last / sum
    }
}

/// Rate-of-change feature matrix, one value per column and mutation.
#[derive(Debug, Clone, Default, PartialEq, Getters)]
#[getset(get = "pub")]
pub struct ChangeFeatures {
    columns: Vec<String>,
    rows: BTreeMap<String, Vec<f64>>,
    /// Earliest and latest month the changes refer to.
    period: Option<(String, String)>,
}

impl ChangeFeatures {
    pub fn get(&self, mutation: &str) -> Option<&[f64]> {
        self.rows.get(mutation).map(Vec::as_slice)
    }

    pub fn value(&self, mutation: &str, column: &str) -> Option<f64> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.get(mutation).map(|values| values[idx])
    }
}

fn column_names(options: &ChangeOptions) -> Vec<String> {
    ChangeMetric::iter()
        .flat_map(|metric| {
            let fc = (1..=options.topn_fc).map(move |rank| format!("{}_FC_Top{}", metric, rank));
            let delta =
                (1..=options.topn_delta).map(move |rank| format!("{}_Delta_Top{}", metric, rank));
            fc.chain(delta)
        })
        .collect()
}

/// The `n` best values, zero-padded to length `n`. Ties are ordered by
/// location name.
fn top_n(mut values: Vec<(&str, f64)>, n: usize, higher_better: bool) -> Vec<f64> {
    values.sort_by(|(loc_a, a), (loc_b, b)| {
        let ord = if higher_better {
            b.partial_cmp(a)
        } else {
            a.partial_cmp(b)
        };
        ord.unwrap_or(Ordering::Equal).then_with(|| loc_a.cmp(loc_b))
    });
    let mut top = values.into_iter().take(n).map(|(_, value)| value).collect_vec();
    top.resize(n, 0.0);
    top
}

/// Compute rate-of-change features between the earliest and the latest
/// month of the given records.
pub fn change_features(records: &[&Record], options: &ChangeOptions) -> Result<ChangeFeatures> {
    let mut buckets: BTreeMap<(&str, &str), Vec<&Record>> = BTreeMap::new();
    for &record in records {
        buckets
            .entry((record.monthdate.as_str(), record.location.as_str()))
            .or_insert_with(Vec::new)
            .push(record);
    }
    info!("Aggregating {} month/location buckets.", buckets.len());

    let summaries: Vec<(&str, &str, VariantTable)> = buckets
        .par_iter()
        .map(|(&(month, location), bucket)| {
            aggregate_bucket(bucket.iter().copied()).map(|table| (month, location, table))
        })
        .collect::<Result<_>>()?;

    let columns = column_names(options);
    let months: BTreeSet<&str> = summaries
        .iter()
        .filter(|(_, _, table)| !table.is_empty())
        .map(|(month, _, _)| *month)
        .collect();
    let (first, last) = match (months.iter().next(), months.iter().next_back()) {
        (Some(&first), Some(&last)) => (first, last),
        _ => {
            return Ok(ChangeFeatures {
                columns,
                ..Default::default()
            })
        }
    };
    debug!("Computing changes from {} to {}.", first, last);

    let mut rows: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for metric in ChangeMetric::iter() {
        // (mutation, location) -> (first month value, last month value)
        let mut pairs: BTreeMap<(&str, &str), (f64, f64)> = BTreeMap::new();
        for (month, location, table) in &summaries {
            for (mutation, stats) in table.iter() {
                let entry = pairs.entry((mutation, *location)).or_insert((0.0, 0.0));
                if *month == first {
                    entry.0 = metric.value(stats);
                }
                if *month == last {
                    entry.1 = metric.value(stats);
                }
            }
        }

        let mut fold_changes: BTreeMap<&str, Vec<(&str, f64)>> = BTreeMap::new();
        let mut deltas: BTreeMap<&str, Vec<(&str, f64)>> = BTreeMap::new();
        for (&(mutation, location), &(x_first, x_last)) in &pairs {
            fold_changes
                .entry(mutation)
                .or_insert_with(Vec::new)
                .push((location, fold_change(x_first, x_last)));
            deltas
                .entry(mutation)
                .or_insert_with(Vec::new)
                .push((location, x_last - x_first));
        }

        for (mutation, values) in fold_changes {
            let row = rows.entry(mutation.to_owned()).or_insert_with(Vec::new);
            row.extend(top_n(values, options.topn_fc, options.higher_better));
            let delta = deltas.remove(mutation).unwrap_or_default();
            row.extend(top_n(delta, options.topn_delta, options.higher_better));
        }
    }

    Ok(ChangeFeatures {
        columns,
        rows,
        period: Some((first.to_owned(), last.to_owned())),
    })
}
