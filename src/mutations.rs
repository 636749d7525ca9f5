// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Mutation tokens, the genomic sites they belong to and the decomposition
//! of haplotype strings into tokens.
//!
//! A token is either a bare amino acid substitution (`E484K`) or one that is
//! qualified by its gene (`Spike_E484K`). Tokens are case-sensitive.

use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use counter::Counter;
use itertools::Itertools;
use regex::Regex;

use crate::errors::Error;
use crate::records::Record;

/// Separates the gene name from the substitution in a token.
pub const GENE_SEPARATOR: char = '_';
/// Separates the tokens of a haplotype string.
pub const MUTATION_SEPARATOR: char = ',';
/// Marker of an ambiguous residue in a substitution.
pub const AMBIGUOUS_RESIDUE: char = 'X';

lazy_static! {
    static ref POSITION: Regex = Regex::new("[A-z]([0-9]+)").unwrap();
    static ref SUBSTITUTION: Regex = Regex::new("^([A-Za-z])([0-9]+)([A-Za-z])$").unwrap();
}

/// Genomic position a mutation affects, independent of the substituted residue.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Site {
    Gene { gene: String, position: u64 },
    Position(u64),
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Site::Gene { gene, position } => write!(f, "{}{}{}", gene, GENE_SEPARATOR, position),
            Site::Position(position) => write!(f, "{}", position),
        }
    }
}

/// All tokens of a haplotype string, trimmed, empty ones removed.
pub fn haplotype_mutations(haplotype: &str) -> impl Iterator<Item = &str> {
    haplotype
        .split(MUTATION_SEPARATOR)
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Tokens of a haplotype string, skipping those with ambiguous residues.
pub fn split_haplotype(haplotype: &str) -> impl Iterator<Item = &str> {
    haplotype_mutations(haplotype).filter(|token| !token.contains(AMBIGUOUS_RESIDUE))
}

/// Whether the token names a gene but no substitution after it (e.g. `Spike_`).
pub fn is_truncated(token: &str) -> bool {
    token.ends_with(GENE_SEPARATOR)
}

/// Digits following the first letter of the mutation.
fn leading_position(token: &str, mutation: &str) -> Result<u64> {
    let digits = POSITION
        .captures(mutation)
        .and_then(|captures| captures.get(1))
        .ok_or_else(|| Error::InvalidMutation {
            token: token.to_owned(),
        })?;
    Ok(digits.as_str().parse().map_err(|_| Error::PositionOverflow {
        token: token.to_owned(),
    })?)
}

/// Determine the site of the given mutation token.
///
/// Fails with `InvalidMutation` if no position can be found or if the
/// gene separator occurs more than once, and with `PositionOverflow` if the
/// position does not fit into 64 bits.
pub fn site_of(token: &str) -> Result<Site> {
    if token.contains(GENE_SEPARATOR) {
        let (gene, mutation) = token
            .split(GENE_SEPARATOR)
            .collect_tuple()
            .ok_or_else(|| Error::InvalidMutation {
                token: token.to_owned(),
            })?;
        Ok(Site::Gene {
            gene: gene.to_owned(),
            position: leading_position(token, mutation)?,
        })
    } else {
        Ok(Site::Position(leading_position(token, token)?))
    }
}

/// Tokens split by whether a site can be derived from them.
#[derive(Debug, Clone, Default, PartialEq, Getters)]
#[getset(get = "pub")]
pub struct Partition {
    valid: Vec<String>,
    invalid: Vec<String>,
}

/// Separate valid from malformed tokens, keeping their order.
pub fn partition_mutations<I, S>(tokens: I) -> Partition
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let (valid, invalid) = tokens
        .into_iter()
        .map(Into::into)
        .partition(|token: &String| site_of(token).is_ok());
    Partition { valid, invalid }
}

/// Tokens that occur in more than `min_count` records, sorted and validated.
pub fn observed_mutations<'a, I>(records: I, min_count: usize) -> Partition
where
    I: IntoIterator<Item = &'a Record>,
{
    let counts: Counter<&str> = records
        .into_iter()
        .flat_map(|record| split_haplotype(&record.haplotype))
        .collect();
    let tokens = counts
        .iter()
        .filter(|(_, count)| **count > min_count)
        .map(|(token, _)| token.to_string())
        .sorted()
        .collect_vec();
    info!("Found {} mutations.", tokens.len());

    let partition = partition_mutations(tokens);
    if !partition.invalid.is_empty() {
        debug!("Rejected mutations: {}", partition.invalid.join(", "));
    }
    info!("Kept {} valid mutations.", partition.valid.len());
    partition
}

/// Restrict tokens to the given gene, optionally stripping the gene prefix.
pub fn filter_to_gene<'a, I>(tokens: I, gene: &str, drop_gene: bool) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let prefix = format!("{}{}", gene, GENE_SEPARATOR);
    tokens
        .into_iter()
        .filter_map(|token| token.strip_prefix(prefix.as_str()).map(|rest| (token, rest)))
        .map(|(token, rest)| {
            if drop_gene {
                rest.to_owned()
            } else {
                token.to_owned()
            }
        })
        .collect()
}

/// An amino acid substitution without gene, e.g. `E484K`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, new, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct Substitution {
    position: u64,
    reference: char,
    alternative: char,
}

impl FromStr for Substitution {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidSubstitution {
            token: s.to_owned(),
        };
        let captures = SUBSTITUTION.captures(s).ok_or_else(invalid)?;
        let residue = |i: usize| captures[i].chars().next().ok_or_else(invalid);
        Ok(Substitution {
            position: captures[2].parse().map_err(|_| invalid())?,
            reference: residue(1)?,
            alternative: residue(3)?,
        })
    }
}

impl fmt::Display for Substitution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.reference, self.position, self.alternative)
    }
}
