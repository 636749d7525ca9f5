// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::collections::BTreeMap;

use anyhow::Result;

use crate::aggregation::aggregate;
use crate::records::{select_months, summarize, Record};

pub mod change;
pub mod cross_sectional;

pub use self::change::{change_features, ChangeFeatures, ChangeOptions};
pub use self::cross_sectional::{cross_sectional_features, FeatureRow};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, new)]
#[serde(default, deny_unknown_fields)]
pub struct FeatureOptions {
    /// Join rate-of-change features computed with these options.
    pub change: Option<ChangeOptions>,
}

/// Scored features of all mutations in an analysis window.
#[derive(Debug, Clone, Default, PartialEq, Getters)]
#[getset(get = "pub")]
pub struct FeatureTable {
    rows: BTreeMap<String, FeatureRow>,
    change: Option<ChangeFeatures>,
}

impl FeatureTable {
    #[cfg(test)]
    pub(crate) fn from_rows(rows: BTreeMap<String, FeatureRow>) -> Self {
        FeatureTable { rows, change: None }
    }

    pub fn get(&self, mutation: &str) -> Option<&FeatureRow> {
        self.rows.get(mutation)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FeatureRow)> {
        self.rows
            .iter()
            .map(|(mutation, row)| (mutation.as_str(), row))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Names of the joined rate-of-change columns, empty if there are none.
    pub fn change_columns(&self) -> &[String] {
        self.change
            .as_ref()
            .map_or(&[][..], |change| change.columns().as_slice())
    }

    /// Rate-of-change values of the given mutation, `None` where the
    /// mutation has no counterpart in the change features.
    pub fn change_values(&self, mutation: &str) -> Vec<Option<f64>> {
        match &self.change {
            Some(change) => match change.get(mutation) {
                Some(values) => values.iter().copied().map(Some).collect(),
                None => vec![None; change.columns().len()],
            },
            None => Vec::new(),
        }
    }
}

/// Aggregate the records and compute the scored feature table.
pub fn calculate_features(records: &[&Record], options: &FeatureOptions) -> Result<FeatureTable> {
    let variants = aggregate(records.iter().copied())?;
    let rows = cross_sectional_features(&variants);
    let change = match &options.change {
        Some(change_options) => Some(change_features(records, change_options)?),
        None => None,
    };
    Ok(FeatureTable { rows, change })
}

/// Compute the feature table of the given months, or of all records if no
/// months are given.
pub fn score_window(
    records: &[Record],
    months: Option<&[String]>,
    options: &FeatureOptions,
) -> Result<FeatureTable> {
    let window = match months {
        Some(months) => select_months(records, months)?,
        None => records.iter().collect(),
    };
    let summary = summarize(window.iter().copied());
    info!(
        "Scoring {} variants from {} distinct haplotypes.",
        summary.n_variants(),
        summary.n_haplotypes()
    );
    calculate_features(&window, options)
}
