// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Ranking of viral mutations by how rapidly and broadly they spread.
//!
//! Haplotype surveillance counts (one row per haplotype, location and month)
//! are aggregated into per-mutation statistics, turned into cross-sectional
//! and rate-of-change features and finally ranked by a composite
//! epidemiological score.

#[macro_use]
extern crate log;
#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate getset;
#[macro_use]
extern crate derive_new;
#[macro_use]
extern crate strum_macros;
#[cfg(test)]
#[macro_use]
extern crate approx;

pub mod aggregation;
pub mod cli;
pub mod config;
pub mod errors;
pub mod features;
pub mod matching;
pub mod mutations;
pub mod output;
pub mod ranking;
pub mod records;
pub mod samples;
pub mod utils;
pub mod voc;

pub use crate::aggregation::{aggregate, VariantStats, VariantTable};
pub use crate::features::{calculate_features, score_window, FeatureOptions, FeatureTable};
pub use crate::records::Record;
