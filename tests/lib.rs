use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use approx::assert_relative_eq;
use itertools::Itertools;
use structopt::StructOpt;

use haplorank::aggregation::aggregate;
use haplorank::cli::{run, Haplorank};
use haplorank::features::{calculate_features, score_window, ChangeOptions, FeatureOptions};
use haplorank::matching::best_match;
use haplorank::mutations::{
    is_truncated, observed_mutations, site_of, split_haplotype, AMBIGUOUS_RESIDUE,
};
use haplorank::ranking::{predict, ScoreKind, SCORE_QUANTILE};
use haplorank::records::{read_records, split_train_test};
use haplorank::samples::{haplotypes_with_variants, read_lineage_table};
use haplorank::voc::{extend_vocs, read_vocs};
use haplorank::Record;

fn resource(name: &str) -> PathBuf {
    Path::new(file!())
        .parent()
        .unwrap()
        .join("resources")
        .join(name)
}

fn load_records() -> Vec<Record> {
    read_records(resource("haplotypes.tsv"), "2019").unwrap()
}

fn months(months: &[&str]) -> Vec<String> {
    months.iter().map(|m| m.to_string()).collect()
}

/// Straightforward recomputation of the variant statistics, one pass per
/// mutation.
fn brute_force_stats(records: &[&Record], mutation: &str) -> (f64, usize, f64, u64, usize) {
    let contains = |record: &&&Record| split_haplotype(&record.haplotype).any(|m| m == mutation);

    let haplotypes: HashSet<&str> = records.iter().map(|r| r.haplotype.as_str()).collect();
    let with_mutation: HashSet<&str> = records
        .iter()
        .filter(contains)
        .map(|r| r.haplotype.as_str())
        .collect();

    let mut per_location: HashMap<&str, u64> = HashMap::new();
    for record in records.iter().filter(contains) {
        *per_location.entry(record.location.as_str()).or_insert(0) += record.haplotype_counts;
    }
    let n_countries = per_location.values().filter(|&&count| count > 1).count();

    let count: u64 = records
        .iter()
        .filter(contains)
        .map(|r| r.haplotype_counts)
        .sum();
    let collected: u64 = records
        .iter()
        .unique_by(|r| (r.location.as_str(), r.monthdate.as_str()))
        .map(|r| r.collected_counts)
        .sum();

    let site = site_of(mutation).unwrap();
    let vars_per_site = records
        .iter()
        .flat_map(|r| split_haplotype(&r.haplotype))
        .unique()
        .filter(|m| site_of(m).unwrap() == site)
        .count();

    (
        with_mutation.len() as f64 / haplotypes.len() as f64,
        n_countries,
        count as f64 / collected as f64,
        count,
        vars_per_site,
    )
}

macro_rules! window_test {
    ($name:ident, $($month:expr),*) => {
        #[test]
        fn $name() {
            let records = load_records();
            let window = months(&[$($month),*]);
            let window = records
                .iter()
                .filter(|r| window.is_empty() || window.contains(&r.monthdate))
                .collect_vec();
            let table = aggregate(window.iter().copied()).unwrap();
            assert!(!table.is_empty());

            for (mutation, stats) in table.iter() {
                let (frac_haplos, n_countries, frac_vars, n_counts, vars_per_site) =
                    brute_force_stats(&window, mutation);
                assert_relative_eq!(stats.frac_haplos_where_present, frac_haplos);
                assert_eq!(stats.n_countries, n_countries);
                assert_relative_eq!(stats.frac_vars, frac_vars);
                assert_eq!(stats.n_counts, n_counts);
                assert_eq!(stats.vars_per_site, vars_per_site);
            }
        }
    };
}

window_test!(test_stats_all_months,);
window_test!(test_stats_october, "2020-10");
window_test!(test_stats_autumn, "2020-10", "2020-11");
window_test!(test_stats_december, "2020-12");

#[test]
fn test_month_filter() {
    let records = load_records();
    assert_eq!(records.len(), 8);
    assert!(records.iter().all(|r| r.monthdate.as_str() > "2019"));
}

#[test]
fn test_split_train_test() {
    let records = load_records();
    let (train, test) = split_train_test(
        &records,
        &months(&["2020-10", "2020-11"]),
        &months(&["2020-12"]),
    )
    .unwrap();
    assert_eq!(train.len(), 6);
    assert_eq!(test.len(), 2);

    assert!(split_train_test(&records, &months(&["2020-12"]), &months(&["2020-11"])).is_err());
}

#[test]
fn test_top_scores() {
    let records = load_records();
    let table = score_window(&records, None, &FeatureOptions::default()).unwrap();
    assert_eq!(table.len(), 5);
    assert_eq!(
        predict(&table, ScoreKind::EpiScore, SCORE_QUANTILE).unwrap(),
        vec!["Spike_D614G"]
    );
    assert_eq!(
        predict(&table, ScoreKind::EpiZScore, SCORE_QUANTILE).unwrap(),
        vec!["Spike_D614G"]
    );
}

#[test]
fn test_change_features() {
    let records = load_records();
    let options = FeatureOptions::new(Some(ChangeOptions::default()));
    let table = score_window(&records, None, &options).unwrap();
    let columns = table.change_columns().to_vec();
    let fc_top1 = columns
        .iter()
        .position(|c| c == "Frac_Vars_FC_Top1")
        .unwrap();

    // only seen in the last month
    assert_relative_eq!(table.change_values("NSP12_P323L")[fc_top1].unwrap(), 1.0);
    // only seen in the middle month
    assert_relative_eq!(table.change_values("Spike_E484Q")[fc_top1].unwrap(), 0.0);
}

#[test]
fn test_best_match() {
    let records = load_records();
    let haplotypes = records.iter().map(|r| r.haplotype.as_str());
    assert_eq!(
        best_match(&["Spike_N501Y", "Spike_E484K"], haplotypes).unwrap(),
        "Spike_D614G, Spike_N501Y, Spike_E484K"
    );
}

#[test]
fn test_observed_mutations() {
    let records = load_records();
    let observed = observed_mutations(&records, 1);
    assert_eq!(
        observed.valid(),
        &vec!["Spike_D614G", "Spike_E484K", "Spike_N501Y"]
    );
    assert!(observed.invalid().is_empty());
}

#[test]
fn test_extend_vocs() {
    let records = load_records();
    let vocs = read_vocs(resource("vocs.yaml")).unwrap();
    let extended = extend_vocs(&records, &vocs, 0.8);
    assert_eq!(extended["B.1.1.7"], vec!["Spike_N501Y", "Spike_D614G"]);
    assert_eq!(
        extended["P.1"],
        vec!["Spike_E484K", "Spike_N501Y", "Spike_D614G"]
    );
}

#[test]
fn test_score_command() {
    let outdir = tempfile::tempdir().unwrap();
    let input = resource("haplotypes.tsv");
    let opt = Haplorank::from_iter(vec![
        "haplorank",
        "score",
        "--input",
        input.to_str().unwrap(),
        "--outdir",
        outdir.path().to_str().unwrap(),
        "--change-features",
    ]);
    run(opt).unwrap();

    let written = fs::read_dir(outdir.path())
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect_vec();
    assert_eq!(written.len(), 1);
    let scores = fs::read_to_string(&written[0]).unwrap();
    let lines = scores.lines().collect_vec();
    assert!(lines[0].starts_with("mutation,Frac_HaplosWherePresent,N_Countries,Frac_Vars,EpiScore,EpiZScore,"));
    assert_eq!(lines.len(), 6);
}

#[test]
fn test_read_lineage_table() {
    let records = read_lineage_table(resource("samples.tsv"), None).unwrap();
    assert_eq!(records.len(), 4);
    assert_eq!(
        (records[1].location.as_str(), records[1].monthdate.as_str()),
        ("USA", "2020-10")
    );

    let recent = read_lineage_table(resource("samples.tsv"), Some(30)).unwrap();
    assert_eq!(recent.len(), 3);
    assert!(recent.iter().all(|r| r.monthdate == "2020-12"));
    let uk = recent.iter().filter(|r| r.location == "UK").collect_vec();
    assert!(uk.iter().all(|r| r.collected_counts == 4));

    let table = aggregate(&recent).unwrap();
    assert_relative_eq!(table.get("Spike_D614G").unwrap().frac_haplos_where_present, 1.0);
    assert_relative_eq!(table.get("Spike_N501Y").unwrap().frac_vars, 0.4);

    let with_n501y = haplotypes_with_variants(&recent, &["Spike_N501Y"]);
    assert_eq!(with_n501y.len(), 1);
    assert_eq!(with_n501y[0].haplotype_counts, 2);
}

#[test]
fn test_score_command_from_lineage() {
    let outdir = tempfile::tempdir().unwrap();
    let input = resource("samples.tsv");
    let opt = Haplorank::from_iter(vec![
        "haplorank",
        "score",
        "--input",
        input.to_str().unwrap(),
        "--from-lineage",
        "--n-days",
        "30",
        "--outdir",
        outdir.path().to_str().unwrap(),
    ]);
    let path = outdir.path().to_owned();
    run(opt).unwrap();

    let written = fs::read_dir(&path)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect_vec();
    assert_eq!(written.len(), 1);
    let scores = fs::read_to_string(&written[0]).unwrap();
    // header and Spike_D614G, Spike_E484K, Spike_N501Y
    assert_eq!(scores.lines().count(), 4);
}

#[test]
fn test_feature_keys_are_valid_mutations() {
    let records = vec![
        Record::new(
            "Spike_D614G, Spike_, Spike_X145Y".to_owned(),
            "UK".to_owned(),
            "2020-10".to_owned(),
            "B.1".to_owned(),
            "G".to_owned(),
            3,
            10,
        ),
        Record::new(
            "Spike_D614G, Spike_N501Y".to_owned(),
            "USA".to_owned(),
            "2020-10".to_owned(),
            "B.1".to_owned(),
            "G".to_owned(),
            2,
            5,
        ),
    ];
    let window = records.iter().collect_vec();
    let table = calculate_features(&window, &FeatureOptions::default()).unwrap();
    assert_eq!(table.len(), 2);
    for (mutation, _) in table.iter() {
        assert!(!mutation.is_empty());
        assert!(!is_truncated(mutation));
        assert!(!mutation.contains(AMBIGUOUS_RESIDUE));
        assert!(site_of(mutation).is_ok());
    }
}
