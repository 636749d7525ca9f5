// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::path::Path;

use anyhow::{Context, Result};

use crate::errors::Error;
use crate::features::ChangeOptions;
use crate::ranking::SCORE_QUANTILE;

/// Analysis parameters, loadable from YAML. Omitted fields take their
/// defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    pub change: ChangeOptions,
    /// Mutations scoring above this quantile are reported.
    pub score_quantile: f64,
    /// Number of most recent months scored if no months are given.
    pub recent_months: usize,
    /// Records with a month not after this one are dropped on input.
    pub min_monthdate: String,
    pub voc_min_relative_frequency: f64,
    /// Mutations have to occur in more than this many records to be
    /// considered observed.
    pub min_variant_count: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            change: ChangeOptions::default(),
            score_quantile: SCORE_QUANTILE,
            recent_months: 4,
            min_monthdate: "2019".to_owned(),
            voc_min_relative_frequency: 0.8,
            min_variant_count: 1,
        }
    }
}

impl AnalysisConfig {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())
            .with_context(|| format!("unable to open {}", path.as_ref().display()))?;
        let config: AnalysisConfig = serde_yaml::from_reader(file)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: AnalysisConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| -> Result<()> {
            Err(Error::InvalidConfig {
                msg: msg.to_owned(),
            }
            .into())
        };
        if !(0.0..=1.0).contains(&self.score_quantile) {
            return invalid("score_quantile must be within [0, 1]");
        }
        if !(0.0..=1.0).contains(&self.voc_min_relative_frequency) {
            return invalid("voc_min_relative_frequency must be within [0, 1]");
        }
        if self.recent_months == 0 {
            return invalid("recent_months must be at least 1");
        }
        if self.change.topn_fc == 0 && self.change.topn_delta == 0 {
            return invalid("at least one of change.topn_fc and change.topn_delta must be positive");
        }
        Ok(())
    }
}
