// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use itertools::Itertools;
use time::OffsetDateTime;

use crate::aggregation::{VariantStats, VariantTable};
use crate::features::{FeatureRow, FeatureTable};

/// Name of the score table written today, e.g. `scores_09-Mar-2021.csv`.
pub fn scores_file_name() -> Result<String> {
    let format = time::format_description::parse("[day]-[month repr:short]-[year]")?;
    let date = OffsetDateTime::now_utc().date().format(&format)?;
    Ok(format!("scores_{}.csv", date))
}

fn optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

pub fn write_variant_table<W: io::Write>(table: &VariantTable, writer: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(std::iter::once("mutation").chain(VariantStats::COLUMNS.iter().copied()))?;
    for (mutation, stats) in table.iter() {
        writer.write_record(&[
            mutation.to_owned(),
            stats.frac_haplos_where_present.to_string(),
            stats.n_countries.to_string(),
            stats.frac_vars.to_string(),
            stats.rel_frac_vars.to_string(),
            stats.vars_per_site.to_string(),
            stats.n_counts.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the feature table with the rate-of-change columns, if any,
/// appended after the scores.
pub fn write_feature_table<W: io::Write>(table: &FeatureTable, writer: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    let header = std::iter::once("mutation")
        .chain(FeatureRow::COLUMNS.iter().copied())
        .chain(table.change_columns().iter().map(String::as_str))
        .collect_vec();
    writer.write_record(&header)?;

    for (mutation, row) in table.iter() {
        let values = vec![
            mutation.to_owned(),
            row.frac_haplos_where_present.to_string(),
            row.n_countries.to_string(),
            row.frac_vars.to_string(),
            row.epi_score.to_string(),
            optional(row.epi_z_score),
        ];
        let change = table.change_values(mutation).into_iter().map(optional);
        writer.write_record(values.into_iter().chain(change))?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the feature table into `outdir`, named by today's date.
pub fn write_scores<P: AsRef<Path>>(table: &FeatureTable, outdir: P) -> Result<PathBuf> {
    let outdir = outdir.as_ref();
    fs::create_dir_all(outdir)
        .with_context(|| format!("unable to create {}", outdir.display()))?;
    let path = outdir.join(scores_file_name()?);
    let file = fs::File::create(&path)
        .with_context(|| format!("unable to create {}", path.display()))?;
    write_feature_table(table, file)?;
    info!("Wrote scores of {} mutations to {}.", table.len(), path.display());
    Ok(path)
}
