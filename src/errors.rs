// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum Error {
    #[error("invalid mutation '{token}': no substitution position found")]
    InvalidMutation { token: String },
    #[error("position of mutation '{token}' exceeds the supported range")]
    PositionOverflow { token: String },
    #[error("invalid substitution '{token}', expected <reference><position><alternative> (e.g. E484K)")]
    InvalidSubstitution { token: String },
    #[error("haplotype table lacks the following required columns: {columns}")]
    MissingColumns { columns: String },
    #[error("some months were not found in the input data: {months}")]
    MonthsNotFound { months: String },
    #[error("invalid month '{month}', must be given as YYYY-MM or YYYY-MM-DD")]
    InvalidMonth { month: String },
    #[error("invalid date '{date}', must be given as YYYY-MM-DD or YYYY-MM")]
    InvalidDate { date: String },
    #[error("training month {train} is not strictly before test month {test}")]
    UnorderedSplit { train: String, test: String },
    #[error("{split} split does not contain any records")]
    EmptySplit { split: String },
    #[error("unable to aggregate haplotypes because the analysis window does not contain any records")]
    EmptyWindow,
    #[error("collected counts of the analysis window sum up to zero")]
    NoCollectedSamples,
    #[error("cannot match haplotypes against an empty set of mutations")]
    EmptyMutationQuery,
    #[error("no haplotypes given to match against")]
    NoHaplotypes,
    #[error("invalid quantile {value}, must be within [0, 1]")]
    InvalidQuantile { value: f64 },
    #[error("invalid configuration: {msg}")]
    InvalidConfig { msg: String },
}
