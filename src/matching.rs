// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::collections::BTreeSet;

use anyhow::Result;

use crate::errors::Error;
use crate::mutations::haplotype_mutations;

/// Find the observed haplotype that best explains the query mutations.
///
/// Candidates are ranked by the fraction of query mutations they contain,
/// then by the number of mutations they carry beyond the query (fewer is
/// better) and finally by their haplotype string.
pub fn best_match<'a, I, S>(query: &[S], haplotypes: I) -> Result<String>
where
    I: IntoIterator<Item = &'a str>,
    S: AsRef<str>,
{
    let query: BTreeSet<&str> = query.iter().map(AsRef::as_ref).collect();
    if query.is_empty() {
        return Err(Error::EmptyMutationQuery.into());
    }
    let candidates: BTreeSet<&str> = haplotypes.into_iter().collect();

    // overlap fractions share the denominator, compare the counts instead
    let mut best: Option<(usize, usize, &str)> = None;
    for haplotype in candidates {
        let mutations: BTreeSet<&str> = haplotype_mutations(haplotype).collect();
        let overlap = mutations.intersection(&query).count();
        let extra = mutations.len() - overlap;
        let better = match best {
            None => true,
            Some((best_overlap, best_extra, _)) => {
                overlap > best_overlap || (overlap == best_overlap && extra < best_extra)
            }
        };
        if better {
            best = Some((overlap, extra, haplotype));
        }
    }

    match best {
        Some((overlap, extra, haplotype)) => {
            debug!(
                "Best matching haplotype covers {}/{} query mutations with {} extra mutations.",
                overlap,
                query.len(),
                extra
            );
            Ok(haplotype.to_owned())
        }
        None => Err(Error::NoHaplotypes.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_best_match_by_overlap() {
        let haplotypes = vec!["A1B,C2D,E3F", "A1B,G4H"];
        assert_eq!(
            best_match(&["A1B", "C2D"], haplotypes).unwrap(),
            "A1B,C2D,E3F"
        );
    }

    #[test]
    fn test_best_match_fewest_extra() {
        let haplotypes = vec!["A1B,C2D,E3F,G4H", "A1B, C2D, E3F", "A1B,C2D,E3F,I5J"];
        assert_eq!(
            best_match(&["A1B", "C2D"], haplotypes).unwrap(),
            "A1B, C2D, E3F"
        );
    }

    #[test]
    fn test_best_match_tie_lexicographic() {
        let haplotypes = vec!["A1B,G4H", "A1B,E3F"];
        assert_eq!(best_match(&["A1B"], haplotypes).unwrap(), "A1B,E3F");
    }

    #[test]
    fn test_best_match_duplicate_query() {
        let haplotypes = vec!["A1B,C2D", "A1B"];
        assert_eq!(best_match(&["A1B", "A1B"], haplotypes).unwrap(), "A1B");
    }

    #[test]
    fn test_best_match_empty_query() {
        let query: [&str; 0] = [];
        let err = best_match(&query, vec!["A1B"]).unwrap_err();
        assert_eq!(err.downcast_ref::<Error>(), Some(&Error::EmptyMutationQuery));
    }

    #[test]
    fn test_best_match_no_haplotypes() {
        let err = best_match(&["A1B"], Vec::new()).unwrap_err();
        assert_eq!(err.downcast_ref::<Error>(), Some(&Error::NoHaplotypes));
    }
}
