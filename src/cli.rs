// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::collections::BTreeSet;
use std::io;
use std::path::PathBuf;

use anyhow::Result;
use structopt::StructOpt;
use strum::VariantNames;

use crate::aggregation::aggregate;
use crate::config::AnalysisConfig;
use crate::features::{score_window, FeatureOptions};
use crate::matching::best_match;
use crate::output::{write_scores, write_variant_table};
use crate::ranking::{top_scores, ScoreKind};
use crate::records::{latest_months, read_records, select_months, Record};
use crate::samples::{haplotypes_with_variants, read_lineage_table};
use crate::voc::{extend_vocs, read_vocs};

#[derive(Debug, StructOpt, Clone)]
#[structopt(
    name = "haplorank",
    about = "Rank viral mutations by how rapidly and broadly they spread, based on haplotype surveillance counts.",
    setting = structopt::clap::AppSettings::ColoredHelp
)]
pub struct Haplorank {
    #[structopt(
        long,
        global = true,
        parse(from_os_str),
        help = "YAML file with analysis parameters (defaults are used for omitted values)."
    )]
    pub config: Option<PathBuf>,
    #[structopt(long, global = true, help = "Provide verbose output.")]
    pub verbose: bool,
    #[structopt(subcommand)]
    pub command: Command,
}

#[derive(Debug, StructOpt, Clone)]
pub struct InputOptions {
    #[structopt(
        long,
        parse(from_os_str),
        help = "TSV file with haplotype counts (or per-sample lineages with --from-lineage)."
    )]
    pub input: PathBuf,
    #[structopt(
        long,
        help = "Input is a per-sample lineage table (columns AA_Substitution, country, pango_lineage, GISAID_clade, date)."
    )]
    pub from_lineage: bool,
    #[structopt(
        long,
        help = "Only use samples collected at most this many days before the latest sample (requires --from-lineage)."
    )]
    pub n_days: Option<i64>,
    #[structopt(
        long,
        use_delimiter = true,
        help = "Only keep haplotypes containing any of these comma-separated variants."
    )]
    pub with_variants: Vec<String>,
}

impl InputOptions {
    pub fn load(&self, config: &AnalysisConfig) -> Result<Vec<Record>> {
        let mut records = if self.from_lineage {
            let mut records = read_lineage_table(&self.input, self.n_days)?;
            records.retain(|record| record.monthdate > config.min_monthdate);
            records
        } else {
            if self.n_days.is_some() {
                warn!("Ignoring --n-days, it only applies to lineage tables.");
            }
            read_records(&self.input, &config.min_monthdate)?
        };
        if !self.with_variants.is_empty() {
            records = haplotypes_with_variants(&records, &self.with_variants)
                .into_iter()
                .cloned()
                .collect();
            info!(
                "Kept {} records with haplotypes containing {}.",
                records.len(),
                self.with_variants.join(", ")
            );
        }
        Ok(records)
    }
}

#[derive(Debug, StructOpt, Clone)]
pub enum Command {
    #[structopt(
        name = "score",
        about = "Compute epidemiological features and scores of all mutations and write them to a CSV file.",
        setting = structopt::clap::AppSettings::ColoredHelp
    )]
    Score {
        #[structopt(flatten)]
        input: InputOptions,
        #[structopt(
            long,
            parse(from_os_str),
            help = "Directory to write scores_<date>.csv into."
        )]
        outdir: PathBuf,
        #[structopt(
            long,
            help = "Months (YYYY-MM) to consider (default: the most recent months as configured)."
        )]
        months: Vec<String>,
        #[structopt(long, help = "Add rate-of-change features between first and last month.")]
        change_features: bool,
    },
    #[structopt(
        name = "top",
        about = "Print the top scoring mutations as JSON.",
        setting = structopt::clap::AppSettings::ColoredHelp
    )]
    Top {
        #[structopt(flatten)]
        input: InputOptions,
        #[structopt(
            long,
            help = "Months (YYYY-MM) to consider (default: the most recent months as configured)."
        )]
        months: Vec<String>,
        #[structopt(
            long,
            default_value = "epi-score",
            possible_values = ScoreKind::VARIANTS,
            help = "Score to rank by."
        )]
        score: ScoreKind,
    },
    #[structopt(
        name = "stats",
        about = "Print per-mutation observation statistics as CSV.",
        setting = structopt::clap::AppSettings::ColoredHelp
    )]
    Stats {
        #[structopt(flatten)]
        input: InputOptions,
        #[structopt(long, help = "Months (YYYY-MM) to consider (default: all).")]
        months: Vec<String>,
    },
    #[structopt(
        name = "match-haplotype",
        about = "Print the observed haplotype that best matches the given mutations.",
        setting = structopt::clap::AppSettings::ColoredHelp
    )]
    MatchHaplotype {
        #[structopt(flatten)]
        input: InputOptions,
        #[structopt(
            long,
            use_delimiter = true,
            required = true,
            help = "Comma-separated mutations to match (e.g. Spike_N501Y,Spike_E484K)."
        )]
        mutations: Vec<String>,
    },
    #[structopt(
        name = "extend-vocs",
        about = "Extend variant-of-concern lineages by frequently co-occurring mutations and print them as YAML.",
        setting = structopt::clap::AppSettings::ColoredHelp
    )]
    ExtendVocs {
        #[structopt(flatten)]
        input: InputOptions,
        #[structopt(
            long,
            parse(from_os_str),
            help = "YAML file mapping lineage names to lists of mutations."
        )]
        vocs: PathBuf,
    },
}

fn window_months(records: &[Record], months: &[String], config: &AnalysisConfig) -> Vec<String> {
    if months.is_empty() {
        let months = latest_months(records, config.recent_months);
        info!("Using the most recent months: {}", months.join(", "));
        months
    } else {
        months.to_vec()
    }
}

pub fn run(opt: Haplorank) -> Result<()> {
    let config = match &opt.config {
        Some(path) => AnalysisConfig::from_path(path)?,
        None => AnalysisConfig::default(),
    };

    match opt.command {
        Command::Score {
            ref input,
            ref outdir,
            ref months,
            change_features,
        } => {
            let records = input.load(&config)?;
            let months = window_months(&records, months, &config);
            let options = FeatureOptions {
                change: if change_features {
                    Some(config.change)
                } else {
                    None
                },
            };
            let table = score_window(&records, Some(&months), &options)?;
            write_scores(&table, outdir)?;
        }
        Command::Top {
            ref input,
            ref months,
            score,
        } => {
            let records = input.load(&config)?;
            let months = window_months(&records, months, &config);
            let table = score_window(&records, Some(&months), &FeatureOptions::default())?;
            let top = top_scores(&table, score, config.score_quantile)?;
            println!("{}", serde_json::to_string_pretty(&top)?);
        }
        Command::Stats {
            ref input,
            ref months,
        } => {
            let records = input.load(&config)?;
            let table = if months.is_empty() {
                aggregate(&records)?
            } else {
                aggregate(select_months(&records, months)?)?
            };
            write_variant_table(&table, io::stdout())?;
        }
        Command::MatchHaplotype {
            ref input,
            ref mutations,
        } => {
            let records = input.load(&config)?;
            let haplotypes: BTreeSet<&str> = records
                .iter()
                .map(|record| record.haplotype.as_str())
                .collect();
            println!("{}", best_match(mutations, haplotypes)?);
        }
        Command::ExtendVocs {
            ref input,
            ref vocs,
        } => {
            let records = input.load(&config)?;
            let vocs = read_vocs(vocs)?;
            let extended = extend_vocs(&records, &vocs, config.voc_min_relative_frequency);
            print!("{}", serde_yaml::to_string(&extended)?);
        }
    }
    Ok(())
}
