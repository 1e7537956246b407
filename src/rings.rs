//! Shortest-path ring enumeration over the periodic bond network.
//!
//! A ring is a cycle in which no two members are closer in the full graph
//! than they are along the cycle. Candidates are generated per apex node
//! from the shortest paths between its neighbor pairs, so chorded cycles
//! and composites of smaller rings never survive.

use crate::cell;
use crate::HydrogenBondGraph;
use petgraph::visit::EdgeRef;
use std::collections::{BTreeSet, VecDeque};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RingError {
    #[error("Ring {members:?} spans the periodic cell (residual displacement {residual:.6})")]
    SpanningRing { members: Vec<usize>, residual: f64 },
}

/// True when the ring wraps the periodic cell: the minimum-image edge
/// displacements around the cycle do not cancel out.
pub fn is_spanning(ring: &[usize], coords: &[[f64; 3]]) -> bool {
    residual_displacement(ring, coords) > 1e-4
}

fn residual_displacement(ring: &[usize], coords: &[[f64; 3]]) -> f64 {
    let n = ring.len();
    let mut total = [0.0; 3];
    for i in 0..n {
        let prev = ring[(i + n - 1) % n];
        let cur = ring[i];
        total = cell::add(total, cell::min_image(coords[prev], coords[cur]));
    }
    cell::norm(total)
}

/// Streams the rings of a bond network, shortest first per apex, each as an
/// ordered member list in canonical rotation. Ring IDs are assigned by the
/// consumer from the yield order, so enumeration is fully deterministic:
/// apexes ascend, neighbor pairs ascend, tied shortest paths expand in
/// lexicographic order.
///
/// A ring that spans the periodic cell yields `Err` once, after which the
/// iterator is exhausted.
pub struct RingEnumerator<'a> {
    adjacency: Vec<Vec<usize>>,
    coords: &'a [[f64; 3]],
    max_ring: usize,
    apex: usize,
    pairs: Vec<(usize, usize)>,
    pair: usize,
    seen: BTreeSet<Vec<usize>>,
    out: VecDeque<Vec<usize>>,
    pending: Option<RingError>,
    failed: bool,
}

impl<'a> RingEnumerator<'a> {
    pub fn new(graph: &HydrogenBondGraph, coords: &'a [[f64; 3]], max_ring: usize) -> Self {
        let n = graph.node_count();
        let mut adjacency = vec![Vec::new(); n];
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
        let pairs = if adjacency.is_empty() {
            Vec::new()
        } else {
            neighbor_pairs(&adjacency[0])
        };
        Self {
            adjacency,
            coords,
            max_ring,
            apex: 0,
            pairs,
            pair: 0,
            seen: BTreeSet::new(),
            out: VecDeque::new(),
            pending: None,
            failed: false,
        }
    }

    /// Expands one (apex, neighbor pair) triple into candidate rings.
    fn process_pair(&mut self, x: usize, y: usize, z: usize) -> Result<(), RingError> {
        // A ring of max_ring members closes a path of max_ring - 2 edges.
        let cutoff = self.max_ring.saturating_sub(2);
        if cutoff == 0 {
            return Ok(());
        }
        for path in shortest_paths_avoiding(&self.adjacency, y, z, x, cutoff) {
            let mut cycle = Vec::with_capacity(path.len() + 1);
            cycle.push(x);
            cycle.extend(path);
            let ring = canonical_cycle(&cycle);
            if !self.seen.insert(ring.clone()) {
                continue;
            }
            if !is_shortest_path_ring(&self.adjacency, &ring) {
                continue;
            }
            let residual = residual_displacement(&ring, self.coords);
            if residual > 1e-4 {
                return Err(RingError::SpanningRing {
                    members: ring,
                    residual,
                });
            }
            self.out.push_back(ring);
        }
        Ok(())
    }
}

impl<'a> Iterator for RingEnumerator<'a> {
    type Item = Result<Vec<usize>, RingError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            if let Some(ring) = self.out.pop_front() {
                return Some(Ok(ring));
            }
            if let Some(e) = self.pending.take() {
                self.failed = true;
                return Some(Err(e));
            }
            if self.apex >= self.adjacency.len() {
                return None;
            }
            if self.pair >= self.pairs.len() {
                self.apex += 1;
                if self.apex >= self.adjacency.len() {
                    return None;
                }
                self.pairs = neighbor_pairs(&self.adjacency[self.apex]);
                self.pair = 0;
                continue;
            }
            let (y, z) = self.pairs[self.pair];
            self.pair += 1;
            let apex = self.apex;
            if let Err(e) = self.process_pair(apex, y, z) {
                self.pending = Some(e);
            }
        }
    }
}

/// Unordered pairs of distinct neighbors, self-loops left out.
fn neighbor_pairs(neighbors: &[usize]) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    for i in 0..neighbors.len() {
        for j in (i + 1)..neighbors.len() {
            pairs.push((neighbors[i], neighbors[j]));
        }
    }
    pairs
}

/// Rotates (and possibly reverses) a cycle so the smallest member comes
/// first and its smaller cycle-neighbor second.
fn canonical_cycle(cycle: &[usize]) -> Vec<usize> {
    let n = cycle.len();
    let start = cycle
        .iter()
        .enumerate()
        .min_by_key(|(_, &v)| v)
        .map(|(i, _)| i)
        .unwrap_or(0);
    let forward: Vec<usize> = (0..n).map(|i| cycle[(start + i) % n]).collect();
    let backward: Vec<usize> = (0..n).map(|i| cycle[(start + n - i) % n]).collect();
    if forward[1] <= backward[1] {
        forward
    } else {
        backward
    }
}

/// Breadth-first distances from `src`, nodes farther than `cutoff` left at
/// `usize::MAX`.
fn bfs_distances(adjacency: &[Vec<usize>], src: usize, cutoff: usize) -> Vec<usize> {
    let mut dist = vec![usize::MAX; adjacency.len()];
    let mut queue = VecDeque::new();
    dist[src] = 0;
    queue.push_back(src);
    while let Some(u) = queue.pop_front() {
        if dist[u] == cutoff {
            continue;
        }
        for &v in &adjacency[u] {
            if dist[v] == usize::MAX {
                dist[v] = dist[u] + 1;
                queue.push_back(v);
            }
        }
    }
    dist
}

/// All shortest paths from `src` to `dst` that avoid `avoid`, if the
/// shortest length fits within `cutoff` edges. Paths are returned in
/// lexicographic order.
fn shortest_paths_avoiding(
    adjacency: &[Vec<usize>],
    src: usize,
    dst: usize,
    avoid: usize,
    cutoff: usize,
) -> Vec<Vec<usize>> {
    let n = adjacency.len();
    let mut dist = vec![usize::MAX; n];
    let mut preds: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut queue = VecDeque::new();
    dist[src] = 0;
    queue.push_back(src);
    while let Some(u) = queue.pop_front() {
        if dist[u] == cutoff {
            continue;
        }
        for &v in &adjacency[u] {
            if v == avoid {
                continue;
            }
            if dist[v] == usize::MAX {
                dist[v] = dist[u] + 1;
                preds[v].push(u);
                queue.push_back(v);
            } else if dist[v] == dist[u] + 1 {
                preds[v].push(u);
            }
        }
    }
    if dist[dst] == usize::MAX {
        return Vec::new();
    }
    for p in &mut preds {
        p.sort_unstable();
    }
    let mut paths = Vec::new();
    let mut trail = Vec::new();
    unwind_paths(&preds, dst, src, &mut trail, &mut paths);
    paths
}

/// Walks the predecessor lists backwards from `node` to `src`, emitting
/// every shortest path in forward orientation.
fn unwind_paths(
    preds: &[Vec<usize>],
    node: usize,
    src: usize,
    trail: &mut Vec<usize>,
    out: &mut Vec<Vec<usize>>,
) {
    trail.push(node);
    if node == src {
        let mut path = trail.clone();
        path.reverse();
        out.push(path);
    } else {
        for &p in &preds[node] {
            unwind_paths(preds, p, src, trail, out);
        }
    }
    trail.pop();
}

/// The shortest-path ring criterion: no two members may be closer in the
/// graph than along the ring.
fn is_shortest_path_ring(adjacency: &[Vec<usize>], ring: &[usize]) -> bool {
    let l = ring.len();
    let cutoff = l / 2;
    for i in 0..l {
        let dist = bfs_distances(adjacency, ring[i], cutoff);
        for j in (i + 1)..l {
            let along = (j - i).min(l - (j - i));
            if dist[ring[j]] < along {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_from_edges(n: usize, edges: &[(usize, usize)]) -> HydrogenBondGraph {
        let mut g = HydrogenBondGraph::with_capacity(n, edges.len());
        for _ in 0..n {
            g.add_node(());
        }
        for &(a, b) in edges {
            g.update_edge(
                petgraph::graph::NodeIndex::new(a),
                petgraph::graph::NodeIndex::new(b),
                (),
            );
        }
        g
    }

    /// Everything packed well inside one cell image, so nothing spans.
    fn clustered(n: usize) -> Vec<[f64; 3]> {
        (0..n).map(|i| [0.3 + 0.01 * i as f64, 0.5, 0.5]).collect()
    }

    fn collect_rings(g: &HydrogenBondGraph, coords: &[[f64; 3]], max_ring: usize) -> Vec<Vec<usize>> {
        RingEnumerator::new(g, coords, max_ring)
            .map(|r| r.unwrap())
            .collect()
    }

    #[test]
    fn hexagon_is_one_six_ring() {
        let g = graph_from_edges(6, &[(0, 1), (1, 2), (2, 3), (3, 4), (4, 5), (5, 0)]);
        let coords = clustered(6);
        let rings = collect_rings(&g, &coords, 7);
        assert_eq!(rings, vec![vec![0, 1, 2, 3, 4, 5]]);
    }

    #[test]
    fn cube_yields_its_six_squares() {
        // Vertices are 3-bit words, edges join words differing in one bit.
        let mut edges = Vec::new();
        for v in 0..8usize {
            for bit in 0..3 {
                let w = v ^ (1 << bit);
                if v < w {
                    edges.push((v, w));
                }
            }
        }
        let g = graph_from_edges(8, &edges);
        let coords = clustered(8);
        let rings = collect_rings(&g, &coords, 7);
        assert_eq!(rings.len(), 6);
        for ring in &rings {
            assert_eq!(ring.len(), 4);
        }
    }

    #[test]
    fn chord_splits_a_square_into_triangles() {
        let g = graph_from_edges(4, &[(0, 1), (1, 2), (2, 3), (3, 0), (0, 2)]);
        let coords = clustered(4);
        let mut rings = collect_rings(&g, &coords, 7);
        rings.sort();
        assert_eq!(rings, vec![vec![0, 1, 2], vec![0, 2, 3]]);
    }

    #[test]
    fn fused_hexagons_are_two_rings() {
        // Two six-rings sharing the 0-1 edge.
        let g = graph_from_edges(
            10,
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
        let coords = clustered(10);
        let rings = collect_rings(&g, &coords, 7);
        assert_eq!(rings.len(), 2);
        assert!(rings.contains(&vec![0, 1, 2, 3, 4, 5]));
        assert!(rings.contains(&vec![0, 1, 6, 7, 8, 9]));
    }

    #[test]
    fn ring_size_cap_is_respected() {
        let octagon: Vec<(usize, usize)> = (0..8).map(|i| (i, (i + 1) % 8)).collect();
        let g = graph_from_edges(8, &octagon);
        let coords = clustered(8);
        assert!(collect_rings(&g, &coords, 7).is_empty());
        assert_eq!(collect_rings(&g, &coords, 8).len(), 1);
    }

    #[test]
    fn spanning_ring_fails_the_run() {
        // A four-ring wrapped once around the x axis of the cell.
        let g = graph_from_edges(4, &[(0, 1), (1, 2), (2, 3), (3, 0)]);
        let coords = vec![
            [0.0, 0.5, 0.5],
            [0.25, 0.5, 0.5],
            [0.5, 0.5, 0.5],
            [0.75, 0.5, 0.5],
        ];
        let mut iter = RingEnumerator::new(&g, &coords, 7);
        match iter.next() {
            Some(Err(RingError::SpanningRing { members, residual })) => {
                assert_eq!(members, vec![0, 1, 2, 3]);
                assert!(residual > 0.9);
            }
            other => panic!("expected a spanning-ring error, got {:?}", other),
        }
        assert!(iter.next().is_none());
    }

    #[test]
    fn spanning_detector_ignores_local_rings() {
        let coords = clustered(4);
        assert!(!is_spanning(&[0, 1, 2, 3], &coords));
        let wrapped = vec![
            [0.0, 0.5, 0.5],
            [0.25, 0.5, 0.5],
            [0.5, 0.5, 0.5],
            [0.75, 0.5, 0.5],
        ];
        assert!(is_spanning(&[0, 1, 2, 3], &wrapped));
    }
}
