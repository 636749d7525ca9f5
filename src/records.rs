// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::collections::BTreeSet;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use itertools::Itertools;
use regex::Regex;

use crate::errors::Error;
use crate::mutations::haplotype_mutations;

lazy_static! {
    static ref MONTH: Regex = Regex::new(r"^[0-9]{4}-[0-9]{2}(-[0-9]{2})?$").unwrap();
}

/// Columns a haplotype summary table has to provide. Alternatives are
/// accepted names for the same column.
const REQUIRED_COLUMNS: [&[&str]; 7] = [
    &["haplotype"],
    &["location"],
    &["monthdate"],
    &["pango_lineage"],
    &["GISAID_clade", "clade"],
    &["haplotype_counts"],
    &["collected_counts"],
];

/// Number of samples sharing one haplotype in one location and month.
///
/// `collected_counts` is the total number of samples collected in that
/// location and month, hence identical for all records of the bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, new)]
pub struct Record {
    pub haplotype: String,
    pub location: String,
    pub monthdate: String,
    pub pango_lineage: String,
    #[serde(rename = "GISAID_clade", alias = "clade")]
    pub clade: String,
    pub haplotype_counts: u64,
    pub collected_counts: u64,
}

/// Read a tab-separated haplotype summary table, dropping records with a
/// month not after `min_monthdate`.
pub fn read_records<P: AsRef<Path>>(path: P, min_monthdate: &str) -> Result<Vec<Record>> {
    let file = std::fs::File::open(path.as_ref())
        .with_context(|| format!("unable to open {}", path.as_ref().display()))?;
    parse_records(file, min_monthdate)
}

pub fn parse_records<R: io::Read>(reader: R, min_monthdate: &str) -> Result<Vec<Record>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .from_reader(reader);
    check_columns(reader.headers()?)?;

    let mut records = Vec::new();
    let mut skipped = 0;
    for record in reader.deserialize() {
        let record: Record = record?;
        if record.monthdate.as_str() > min_monthdate {
            records.push(record);
        } else {
            skipped += 1;
        }
    }
    info!(
        "Read {} haplotype records ({} skipped because of invalid dates).",
        records.len(),
        skipped
    );
    Ok(records)
}

fn check_columns(headers: &csv::StringRecord) -> Result<()> {
    let missing = REQUIRED_COLUMNS
        .iter()
        .filter(|names| !headers.iter().any(|header| names.contains(&header)))
        .map(|names| names.join("|"))
        .collect_vec();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::MissingColumns {
            columns: missing.join(", "),
        }
        .into())
    }
}

pub fn check_month(month: &str) -> Result<()> {
    if MONTH.is_match(month) {
        Ok(())
    } else {
        Err(Error::InvalidMonth {
            month: month.to_owned(),
        }
        .into())
    }
}

/// Distinct months of the given records in ascending order.
pub fn observed_months(records: &[Record]) -> BTreeSet<&str> {
    records.iter().map(|record| record.monthdate.as_str()).collect()
}

/// The last `n` months present in the records, ascending.
pub fn latest_months(records: &[Record], n: usize) -> Vec<String> {
    let months = observed_months(records);
    let skip = months.len().saturating_sub(n);
    months.into_iter().skip(skip).map(str::to_owned).collect()
}

fn check_months_present<'a, I>(records: &[Record], months: I) -> Result<()>
where
    I: IntoIterator<Item = &'a String>,
{
    let observed = observed_months(records);
    let missing: BTreeSet<_> = months
        .into_iter()
        .filter(|month| !observed.contains(month.as_str()))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::MonthsNotFound {
            months: missing.iter().join(", "),
        }
        .into())
    }
}

/// Restrict the records to the given months, all of which have to be present.
pub fn select_months<'a>(records: &'a [Record], months: &[String]) -> Result<Vec<&'a Record>> {
    check_months_present(records, months)?;
    Ok(records
        .iter()
        .filter(|record| months.contains(&record.monthdate))
        .collect())
}

/// Split records into a training and a test period.
///
/// Every training month has to be strictly before every test month and all
/// requested months have to be present. Neither split may be empty.
pub fn split_train_test<'a>(
    records: &'a [Record],
    train_months: &[String],
    test_months: &[String],
) -> Result<(Vec<&'a Record>, Vec<&'a Record>)> {
    for month in train_months.iter().chain(test_months) {
        check_month(month)?;
    }
    for (train, test) in train_months.iter().cartesian_product(test_months) {
        if train >= test {
            return Err(Error::UnorderedSplit {
                train: train.to_owned(),
                test: test.to_owned(),
            }
            .into());
        }
    }
    check_months_present(records, train_months.iter().chain(test_months))?;
    debug!("Train period is prior to test period with no overlap.");

    let select = |months: &[String], split: &str| -> Result<Vec<&'a Record>> {
        let selected = records
            .iter()
            .filter(|record| months.contains(&record.monthdate))
            .collect_vec();
        if selected.is_empty() {
            Err(Error::EmptySplit {
                split: split.to_owned(),
            }
            .into())
        } else {
            Ok(selected)
        }
    };
    Ok((select(train_months, "train")?, select(test_months, "test")?))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct WindowSummary {
    n_haplotypes: usize,
    n_variants: usize,
}

/// Count distinct haplotypes and variants.
pub fn summarize<'a, I>(records: I) -> WindowSummary
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut haplotypes = BTreeSet::new();
    let mut variants = BTreeSet::new();
    for record in records {
        haplotypes.insert(record.haplotype.as_str());
        variants.extend(haplotype_mutations(&record.haplotype));
    }
    WindowSummary {
        n_haplotypes: haplotypes.len(),
        n_variants: variants.len(),
    }
}
