//! Petal graph construction.
//!
//! The petal of a node is the union of all rings that pass through it,
//! kept as a little graph of its own. Nodes that sit on no ring have no
//! petal at all.

use crate::rings::RingError;
use crate::PetalGraph;
use petgraph::graph::NodeIndex;
use std::collections::{BTreeMap, BTreeSet};

/// Everything the ring pass produces: the rings themselves (ring ID =
/// position), each ring-owning node's petal graph, and the set of ring IDs
/// through each node.
pub struct Petals {
    pub rings: Vec<Vec<usize>>,
    pub subgraphs: BTreeMap<usize, PetalGraph>,
    pub rings_at: BTreeMap<usize, BTreeSet<usize>>,
}

/// Grows one petal graph, mapping molecule indices to graph nodes on first
/// sight. `update_edge` keeps the graph simple across overlapping rings.
#[derive(Default)]
struct PetalAccum {
    graph: PetalGraph,
    index: BTreeMap<usize, NodeIndex>,
}

impl PetalAccum {
    fn node(&mut self, id: usize) -> NodeIndex {
        if let Some(&ix) = self.index.get(&id) {
            ix
        } else {
            let ix = self.graph.add_node(id);
            self.index.insert(id, ix);
            ix
        }
    }

    fn add_edge(&mut self, u: usize, v: usize) {
        let a = self.node(u);
        let b = self.node(v);
        self.graph.update_edge(a, b, ());
    }
}

/// Drains a ring stream once and folds every ring into the petals of all
/// its members. The first ring error aborts the fold.
pub fn build_petals<I>(rings: I) -> Result<Petals, RingError>
where
    I: IntoIterator<Item = Result<Vec<usize>, RingError>>,
{
    let mut ring_list: Vec<Vec<usize>> = Vec::new();
    let mut accums: BTreeMap<usize, PetalAccum> = BTreeMap::new();
    let mut rings_at: BTreeMap<usize, BTreeSet<usize>> = BTreeMap::new();

    for (id, ring) in rings.into_iter().enumerate() {
        let ring = ring?;
        let n = ring.len();
        for &member in &ring {
            rings_at.entry(member).or_default().insert(id);
            let accum = accums.entry(member).or_default();
            for i in 0..n {
                accum.add_edge(ring[(i + n - 1) % n], ring[i]);
            }
        }
        ring_list.push(ring);
    }

    Ok(Petals {
        rings: ring_list,
        subgraphs: accums.into_iter().map(|(n, a)| (n, a.graph)).collect(),
        rings_at,
    })
}
