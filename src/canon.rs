//! Canonical signatures for petal graphs.
//!
//! Classification must hand the same signature to every relabeling of the
//! same topology, and signatures live in durable registries, so they are
//! built from dense ranks rather than hashes. Morgan-style neighborhood
//! refinement does most of the work; symmetric leftovers are resolved by
//! individualizing one node per ambiguous class and keeping the smallest
//! resulting edge list.

use crate::PetalGraph;
use petgraph::visit::EdgeRef;
use std::collections::BTreeMap;

/// `"{node count}:{sorted edge list}"`, e.g. `"3:0-1,0-2,1-2"` for a
/// triangle. Equal strings mean isomorphic graphs and vice versa.
pub type Signature = String;

pub trait Canonize {
    fn canonical_signature(&self) -> Signature;
}

impl Canonize for PetalGraph {
    fn canonical_signature(&self) -> Signature {
        let adjacency = adjacency_of(self);
        let edges = smallest_form(&adjacency, vec![0; adjacency.len()]);
        encode_form(adjacency.len(), &edges)
    }
}

/// Adjacency lists indexed by node position. Node weights carry molecule
/// indices, which must not influence the signature, so they are dropped
/// here.
fn adjacency_of(graph: &PetalGraph) -> Vec<Vec<usize>> {
    let mut adjacency = vec![Vec::new(); graph.node_count()];
    for edge in graph.edge_references() {
        let (a, b) = (edge.source().index(), edge.target().index());
        if a == b {
            continue;
        }
        adjacency[a].push(b);
        adjacency[b].push(a);
    }
    for neighbors in &mut adjacency {
        neighbors.sort_unstable();
        neighbors.dedup();
    }
    adjacency
}

/// One round of Morgan refinement: each node is rekeyed by its current
/// rank and the sorted ranks of its neighbors, and the keys are mapped
/// back to dense ranks.
fn refine_once(adjacency: &[Vec<usize>], ranks: &[usize]) -> Vec<usize> {
    let keys: Vec<(usize, Vec<usize>)> = (0..adjacency.len())
        .map(|v| {
            let mut around: Vec<usize> = adjacency[v].iter().map(|&u| ranks[u]).collect();
            around.sort_unstable();
            (ranks[v], around)
        })
        .collect();
    let mut rank_of: BTreeMap<&(usize, Vec<usize>), usize> = BTreeMap::new();
    for key in &keys {
        rank_of.insert(key, 0);
    }
    for (rank, slot) in rank_of.values_mut().enumerate() {
        *slot = rank;
    }
    keys.iter().map(|key| rank_of[key]).collect()
}

/// Refines until the ranking stops moving. Classes only ever split, so
/// this takes at most one round per node.
fn stabilize(adjacency: &[Vec<usize>], mut ranks: Vec<usize>) -> Vec<usize> {
    loop {
        let next = refine_once(adjacency, &ranks);
        if next == ranks {
            return ranks;
        }
        ranks = next;
    }
}

/// The lexicographically smallest sorted edge list over all labelings
/// consistent with refinement. Discrete rankings read off directly;
/// otherwise every member of the first ambiguous class is individualized
/// in turn and the best branch wins.
fn smallest_form(adjacency: &[Vec<usize>], ranks: Vec<usize>) -> Vec<(usize, usize)> {
    let ranks = stabilize(adjacency, ranks);
    let n = adjacency.len();
    let distinct = {
        let mut seen = vec![false; n];
        ranks.iter().all(|&r| !std::mem::replace(&mut seen[r], true))
    };
    if distinct {
        return edge_form(adjacency, &ranks);
    }

    let mut counts = vec![0usize; n];
    for &r in &ranks {
        counts[r] += 1;
    }
    let target = counts.iter().position(|&c| c > 1).unwrap_or(0);

    let mut best: Option<Vec<(usize, usize)>> = None;
    for v in 0..n {
        if ranks[v] != target {
            continue;
        }
        // Pin v at its rank and push everything behind it one step back.
        let mut next = ranks.clone();
        for (u, r) in next.iter_mut().enumerate() {
            if *r > target || (*r == target && u != v) {
                *r += 1;
            }
        }
        let candidate = smallest_form(adjacency, next);
        if best.as_ref().map_or(true, |b| candidate < *b) {
            best = Some(candidate);
        }
    }
    best.unwrap_or_default()
}

/// Reads the edge list off a discrete ranking, each edge as
/// (smaller rank, larger rank), sorted.
fn edge_form(adjacency: &[Vec<usize>], ranks: &[usize]) -> Vec<(usize, usize)> {
    let mut edges = Vec::new();
    for (u, neighbors) in adjacency.iter().enumerate() {
        for &v in neighbors {
            if u < v {
                let (a, b) = (ranks[u].min(ranks[v]), ranks[u].max(ranks[v]));
                edges.push((a, b));
            }
        }
    }
    edges.sort_unstable();
    edges
}

fn encode_form(node_count: usize, edges: &[(usize, usize)]) -> Signature {
    let body: Vec<String> = edges.iter().map(|(u, v)| format!("{}-{}", u, v)).collect();
    format!("{}:{}", node_count, body.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;
    use petgraph::algo::is_isomorphic;

    fn petal_from_edges(ids: &[usize], edges: &[(usize, usize)]) -> PetalGraph {
        let mut g = PetalGraph::default();
        let mut index = BTreeMap::new();
        for &id in ids {
            index.insert(id, g.add_node(id));
        }
        for &(u, v) in edges {
            g.update_edge(index[&u], index[&v], ());
        }
        g
    }

    fn cycle(ids: &[usize]) -> PetalGraph {
        let edges: Vec<(usize, usize)> = (0..ids.len())
            .map(|i| (ids[i], ids[(i + 1) % ids.len()]))
            .collect();
        petal_from_edges(ids, &edges)
    }

    #[test]
    fn triangle_signature_is_explicit() {
        let g = cycle(&[10, 20, 30]);
        assert_eq!(g.canonical_signature(), "3:0-1,0-2,1-2");
    }

    #[test]
    fn relabeled_hexagons_share_a_signature() {
        let a = cycle(&[0, 1, 2, 3, 4, 5]);
        let b = cycle(&[5, 3, 1, 0, 2, 4]);
        assert_eq!(a.canonical_signature(), b.canonical_signature());
    }

    #[test]
    fn molecule_ids_do_not_leak_into_the_signature() {
        let a = cycle(&[0, 1, 2, 3, 4, 5]);
        let b = cycle(&[100, 217, 3, 999, 42, 7]);
        assert_eq!(a.canonical_signature(), b.canonical_signature());
    }

    #[test]
    fn hexagon_and_triangle_pair_are_told_apart() {
        // Both are 2-regular with six nodes and six edges, so refinement
        // alone leaves every node in one class.
        let hexagon = cycle(&[0, 1, 2, 3, 4, 5]);
        let two_triangles = petal_from_edges(
            &[0, 1, 2, 3, 4, 5],
            &[(0, 1), (1, 2), (2, 0), (3, 4), (4, 5), (5, 3)],
        );
        assert_ne!(
            hexagon.canonical_signature(),
            two_triangles.canonical_signature()
        );
    }

    #[test]
    fn regular_nonisomorphic_graphs_are_told_apart() {
        // K3,3 and the triangular prism: 3-regular, six nodes, nine edges.
        let k33 = petal_from_edges(
            &[0, 1, 2, 3, 4, 5],
            &[
                (0, 3),
                (0, 4),
                (0, 5),
                (1, 3),
                (1, 4),
                (1, 5),
                (2, 3),
                (2, 4),
                (2, 5),
            ],
        );
        let prism = petal_from_edges(
            &[0, 1, 2, 3, 4, 5],
            &[
                (0, 1),
                (1, 2),
                (2, 0),
                (3, 4),
                (4, 5),
                (5, 3),
                (0, 3),
                (1, 4),
                (2, 5),
            ],
        );
        assert!(!is_isomorphic(&k33, &prism));
        assert_ne!(k33.canonical_signature(), prism.canonical_signature());
    }

    #[test]
    fn signature_equality_tracks_isomorphism_for_fused_rings() {
        let a = petal_from_edges(
            &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9],
            &[
                (0, 1),
                (1, 2),
                (2, 3),
                (3, 4),
                (4, 5),
                (5, 0),
                (1, 6),
                (6, 7),
                (7, 8),
                (8, 9),
                (9, 0),
            ],
        );
        // Same fused pair with every node renamed.
        let b = petal_from_edges(
            &[20, 11, 42, 33, 64, 55, 86, 77, 98, 9],
            &[
                (20, 11),
                (11, 42),
                (42, 33),
                (33, 64),
                (64, 55),
                (55, 20),
                (11, 86),
                (86, 77),
                (77, 98),
                (98, 9),
                (9, 20),
            ],
        );
        assert!(is_isomorphic(&a, &b));
        assert_eq!(a.canonical_signature(), b.canonical_signature());

        let c = cycle(&[0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
        assert!(!is_isomorphic(&a, &c));
        assert_ne!(a.canonical_signature(), c.canonical_signature());
    }

    #[test]
    fn different_ring_sizes_never_collide() {
        for small in 3..8 {
            for large in (small + 1)..9 {
                let a = cycle(&(0..small).collect::<Vec<_>>());
                let b = cycle(&(0..large).collect::<Vec<_>>());
                assert_ne!(a.canonical_signature(), b.canonical_signature());
            }
        }
    }

    #[test]
    fn empty_and_single_node_graphs_encode() {
        let empty = PetalGraph::default();
        assert_eq!(empty.canonical_signature(), "0:");
        let mut lone = PetalGraph::default();
        lone.add_node(7);
        assert_eq!(lone.canonical_signature(), "1:");
    }
}
