use std::fs;
use std::sync::Arc;

use sigflow_core::io::{load_dataset_dir, read_sif, SignSymbols};
use sigflow_core::{simulate_and_score, AlgorithmRegistry, ParameterSet, PerturbationKind};

const NETWORK: &str = "\
EGF\t+\tRAS
RAS\t+\tRAF
RAF\t+\tMEK
MEK\t+\tERK
ERK\t-\tRAS
EGF\t+\tPI3K
PI3K\t+\tAKT
AKT\t-\tRAF
";

fn write_dataset(dir: &std::path::Path) {
    fs::write(dir.join("network.sif"), NETWORK).unwrap();
    fs::write(
        dir.join("conds.tsv"),
        "cond\tMEK\tPI3K\tRAF\tJNK\n\
         1\t0\t0\t0\t0\n\
         2\t1\t0\t0\t0\n\
         3\t0\t1\t0\t0\n\
         4\t0\t0\t1\t0\n\
         5\t0\t0\t0\t1\n",
    )
    .unwrap();
    fs::write(
        dir.join("exp.tsv"),
        "cond\tERK\tAKT\tp38\n\
         1\t0\t0\t0.1\n\
         2\t-0.8\t0\t0.2\n\
         3\t0.3\t-0.9\t\n\
         4\t-0.5\t0\t0.4\n\
         5\t0.1\t0.1\t-0.3\n",
    )
    .unwrap();
    fs::write(
        dir.join("ptb.tsv"),
        "Target\tType\tValue\tComment\nMEK\tnode\t-1\tU0126\nJNK\tnode\t-1\tSP600125\n",
    )
    .unwrap();
    fs::write(dir.join("inputs.tsv"), "EGF\t1.0\n").unwrap();
}

#[test]
fn sif_reader_matches_link_list() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("network.sif");
    fs::write(&path, NETWORK).unwrap();
    let network = read_sif(&path, &SignSymbols::default()).unwrap();
    assert_eq!(network.len(), 7);
    assert_eq!(network.link_count(), 8);
    assert_eq!(network.names()[0].as_ref(), "AKT");
}

#[test]
fn loaded_dataset_reproduces_the_fixture_score() {
    let dir = tempfile::tempdir().unwrap();
    write_dataset(dir.path());

    let data = load_dataset_dir(dir.path()).unwrap();
    // the JNK condition and the p38 readout are outside the network
    assert_eq!(data.conditions().len(), 4);
    assert_eq!(data.experiment().columns().len(), 2);
    assert_eq!(data.perturbation("MEK").kind, PerturbationKind::Node);
    assert_eq!(data.inputs().len(), 1);

    let registry = AlgorithmRegistry::with_builtins();
    let params = ParameterSet::default().with_use_rel_change(true);
    let (_, accuracy) = simulate_and_score(&registry, "SP", Some(params), Arc::new(data)).unwrap();
    assert_eq!(accuracy, 1.0);
}

#[test]
fn missing_files_surface_as_io_errors() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        load_dataset_dir(dir.path()),
        Err(sigflow_core::SignalFlowError::Io(_))
    ));
}
