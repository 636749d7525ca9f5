// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Per-sample lineage tables and their summarization into haplotype records.
//!
//! A lineage table carries one row per sequenced sample with its amino acid
//! substitutions, country, lineage, clade and collection date.

use std::collections::BTreeMap;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use counter::Counter;
use itertools::Itertools;
use time::Date;

use crate::errors::Error;
use crate::records::Record;

const SAMPLE_COLUMNS: [&str; 5] = [
    "AA_Substitution",
    "country",
    "pango_lineage",
    "GISAID_clade",
    "date",
];

const DATE_SEPARATOR: char = '-';

/// A single sequenced sample.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, new)]
pub struct SampleRecord {
    #[serde(rename = "AA_Substitution")]
    pub aa_substitution: String,
    pub country: String,
    pub pango_lineage: String,
    #[serde(rename = "GISAID_clade")]
    pub clade: String,
    pub date: String,
}

impl SampleRecord {
    /// Year and month of the collection date, `None` if the date lacks a month.
    pub fn monthdate(&self) -> Option<String> {
        if self.date.contains(DATE_SEPARATOR) {
            Some(self.date.split(DATE_SEPARATOR).take(2).join("-"))
        } else {
            None
        }
    }

    /// Substitutions of the sample with enclosing parentheses removed.
    pub fn haplotype(&self) -> String {
        self.aa_substitution.replace(&['(', ')'][..], "")
    }
}

/// Read a tab-separated lineage table and summarize it into haplotype
/// records. With `n_days`, only samples collected at most that many days
/// before the latest sample are used.
pub fn read_lineage_table<P: AsRef<Path>>(path: P, n_days: Option<i64>) -> Result<Vec<Record>> {
    let file = std::fs::File::open(path.as_ref())
        .with_context(|| format!("unable to open {}", path.as_ref().display()))?;
    parse_lineage_table(file, n_days)
}

pub fn parse_lineage_table<R: io::Read>(reader: R, n_days: Option<i64>) -> Result<Vec<Record>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .from_reader(reader);
    let headers = reader.headers()?;
    let missing = SAMPLE_COLUMNS
        .iter()
        .filter(|column| !headers.iter().any(|header| header == **column))
        .join(", ");
    if !missing.is_empty() {
        return Err(Error::MissingColumns { columns: missing }.into());
    }

    let samples = reader
        .deserialize()
        .collect::<std::result::Result<Vec<SampleRecord>, _>>()?;
    info!("Read {} samples.", samples.len());
    let samples = match n_days {
        Some(n_days) => filter_by_date(samples, n_days)?,
        None => samples,
    };
    Ok(from_lineage_table(&samples))
}

fn parse_date(date: &str) -> Result<Date> {
    let format = time::format_description::parse("[year]-[month]-[day]")?;
    let full = if date.matches(DATE_SEPARATOR).count() == 1 {
        format!("{}-01", date)
    } else {
        date.to_owned()
    };
    Ok(Date::parse(&full, &format).map_err(|_| Error::InvalidDate {
        date: date.to_owned(),
    })?)
}

/// Keep samples collected at most `n_days` days before the latest sample.
///
/// Samples whose date lacks a month are dropped. Dates given as `YYYY-MM`
/// refer to the first day of the month.
pub fn filter_by_date(samples: Vec<SampleRecord>, n_days: i64) -> Result<Vec<SampleRecord>> {
    let mut dated = Vec::with_capacity(samples.len());
    for sample in samples {
        if sample.date.contains(DATE_SEPARATOR) {
            let date = parse_date(&sample.date)?;
            dated.push((date, sample));
        }
    }
    let latest = match dated.iter().map(|(date, _)| *date).max() {
        Some(latest) => latest,
        None => return Ok(Vec::new()),
    };
    let kept = dated
        .into_iter()
        .filter(|(date, _)| (latest - *date).whole_days() <= n_days)
        .map(|(_, sample)| sample)
        .collect_vec();
    info!(
        "Kept {} samples of the {} days up to {}.",
        kept.len(),
        n_days,
        latest
    );
    Ok(kept)
}

/// Count samples per haplotype, country, month, lineage and clade.
///
/// The collected counts of a record are the number of all samples of its
/// country and month, including those without substitutions. Samples
/// without substitutions or without a month do not form records.
pub fn from_lineage_table(samples: &[SampleRecord]) -> Vec<Record> {
    let dated = samples
        .iter()
        .filter_map(|sample| sample.monthdate().map(|month| (sample, month)))
        .collect_vec();
    if dated.len() < samples.len() {
        debug!(
            "Ignoring {} samples without collection month.",
            samples.len() - dated.len()
        );
    }

    let collected: Counter<(&str, &str)> = dated
        .iter()
        .map(|(sample, month)| (sample.country.as_str(), month.as_str()))
        .collect();
    let haplotypes: Counter<(String, &str, &str, &str, &str)> = dated
        .iter()
        .map(|(sample, month)| {
            (
                sample.haplotype(),
                sample.country.as_str(),
                month.as_str(),
                sample.pango_lineage.as_str(),
                sample.clade.as_str(),
            )
        })
        .collect();

    let sorted: BTreeMap<_, _> = haplotypes
        .iter()
        .filter(|((haplotype, ..), _)| !haplotype.trim().is_empty())
        .collect();
    let records = sorted
        .into_iter()
        .map(|((haplotype, country, month, lineage, clade), &count)| {
            Record::new(
                haplotype.clone(),
                (*country).to_owned(),
                (*month).to_owned(),
                (*lineage).to_owned(),
                (*clade).to_owned(),
                count as u64,
                collected.get(&(*country, *month)).copied().unwrap_or(0) as u64,
            )
        })
        .collect_vec();
    info!("Summarized samples into {} haplotype records.", records.len());
    records
}

/// Records whose haplotype contains any of the given variants.
pub fn haplotypes_with_variants<'a, S: AsRef<str>>(
    records: &'a [Record],
    variants: &[S],
) -> Vec<&'a Record> {
    records
        .iter()
        .filter(|record| {
            variants
                .iter()
                .any(|variant| record.haplotype.contains(variant.as_ref()))
        })
        .collect()
}
