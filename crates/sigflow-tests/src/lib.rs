//! Shared fixtures for the sigflow integration and property tests.

use std::sync::Arc;

use nalgebra::DMatrix;
use sigflow_core::{Condition, Dataset, LabeledTable, Network, SignedLink};

/// Cascade `A -> B -> C`.
pub fn cascade() -> Network {
    Network::from_links(&[SignedLink::new("A", "B", 1.0), SignedLink::new("B", "C", 1.0)])
        .expect("cascade network")
}

/// Small signalling network with a negative feedback loop:
///
/// ```text
/// EGF -> RAS -> RAF -> MEK -> ERK -| RAS
/// EGF -> PI3K -> AKT -| RAF
/// ```
pub fn mapk_network() -> Network {
    Network::from_links(&[
        SignedLink::new("EGF", "RAS", 1.0),
        SignedLink::new("RAS", "RAF", 1.0),
        SignedLink::new("RAF", "MEK", 1.0),
        SignedLink::new("MEK", "ERK", 1.0),
        SignedLink::new("ERK", "RAS", -1.0),
        SignedLink::new("EGF", "PI3K", 1.0),
        SignedLink::new("PI3K", "AKT", 1.0),
        SignedLink::new("AKT", "RAF", -1.0),
    ])
    .expect("mapk network")
}

/// Knock-down conditions on the MAPK network with ERK and AKT readouts.
/// `observed` lists `(ERK, AKT)` per condition: control, MEK, PI3K, RAF.
pub fn mapk_dataset(observed: [(f64, f64); 4]) -> Dataset {
    let network = Arc::new(mapk_network());
    let rows = ["ctrl", "MEKi", "PI3Ki", "RAFi"];
    let values = DMatrix::from_fn(4, 2, |i, j| if j == 0 { observed[i].0 } else { observed[i].1 });
    let experiment = LabeledTable::new(
        rows.iter().map(|r| r.to_string()).collect(),
        vec!["ERK".into(), "AKT".into()],
        values,
    )
    .expect("experiment table");
    let conditions = vec![
        Condition::new("ctrl", Vec::<&str>::new()),
        Condition::new("MEKi", ["MEK"]),
        Condition::new("PI3Ki", ["PI3K"]),
        Condition::new("RAFi", ["RAF"]),
    ];
    Dataset::new("MAPK", network, conditions, experiment)
        .and_then(|d| d.with_inputs([("EGF", 1.0)]))
        .expect("mapk dataset")
}

/// Deterministic pseudo-random generator for fixtures.
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }

    pub fn next_u64(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }
}

/// Random signed network without self-loops; each ordered pair is linked
/// with probability `1/density_inv`.
pub fn random_network(n: usize, density_inv: u64, seed: u64) -> Network {
    let mut rng = Lcg::new(seed);
    let mut a = DMatrix::zeros(n, n);
    for t in 0..n {
        for s in 0..n {
            if s != t && rng.next_u64() % density_inv == 0 {
                a[(t, s)] = if rng.next_u64() % 2 == 0 { 1.0 } else { -1.0 };
            }
        }
    }
    Network::from_adjacency(a, (0..n).map(|i| format!("n{}", i)).collect())
        .expect("random network")
}
