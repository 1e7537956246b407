//! Aggregation and reporting of a classified run.
//!
//! Two report shapes: a JSON object mapping each ring-owning node to its
//! class ID, and a ranked yaplot drawing of the most common classes. Both
//! are plain strings; printing them is the caller's business.

use crate::cell::{self, Cell};
use crate::config::{Config, OutputMode};
use crate::lattice::Lattice;
use crate::petal::{build_petals, Petals};
use crate::registry::{classify, Registry};
use crate::rings::RingEnumerator;
use crate::yaplot;
use crate::ClassId;
use anyhow::Result;
use std::collections::BTreeMap;
use tracing::info;

/// Runs the whole pipeline: enumerate rings, fold petals, classify against
/// the registry, and render the configured report. Classification always
/// runs, even in silent mode, so a durable registry fills up either way.
pub fn analyze(
    lattice: &Lattice,
    config: &Config,
    registry: &mut dyn Registry,
) -> Result<Option<String>> {
    let rings = RingEnumerator::new(&lattice.graph, &lattice.coords, config.max_ring);
    let petals = build_petals(rings)?;
    info!(
        "{} rings over {} ring-owning nodes",
        petals.rings.len(),
        petals.subgraphs.len()
    );
    let ids = classify(&petals.subgraphs, registry)?;
    match config.mode {
        OutputMode::Silent => Ok(None),
        OutputMode::Json => Ok(Some(classification_json(&ids)?)),
        OutputMode::Yaplot => Ok(Some(ranked_yaplot(
            &ids,
            &petals,
            &lattice.coords,
            &lattice.cell,
        ))),
    }
}

/// The node-to-class mapping as pretty JSON. Keys are the decimal node
/// numbers as strings and sort as strings, so "10" lands between "1" and
/// "2"; consumers rely on that order.
pub fn classification_json(ids: &BTreeMap<usize, ClassId>) -> Result<String> {
    let keyed: BTreeMap<String, ClassId> =
        ids.iter().map(|(n, &id)| (n.to_string(), id)).collect();
    Ok(serde_json::to_string_pretty(&keyed)?)
}

/// Draws every ring of every node whose class ranks among the most
/// populous, one rainbow color and layer per rank. The representative
/// logged per rank is the smallest node of the class, and ranking ties
/// break toward the smaller class ID, so the stream is reproducible.
pub fn ranked_yaplot(
    ids: &BTreeMap<usize, ClassId>,
    petals: &Petals,
    coords: &[[f64; 3]],
    cell: &Cell,
) -> String {
    let mut population: BTreeMap<ClassId, usize> = BTreeMap::new();
    let mut representative: BTreeMap<ClassId, usize> = BTreeMap::new();
    for (&node, &id) in ids {
        *population.entry(id).or_insert(0) += 1;
        representative.entry(id).or_insert(node);
    }
    let mut ranking: Vec<(ClassId, usize)> = population.into_iter().collect();
    ranking.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    ranking.truncate(yaplot::TOP_K);

    let mut out = String::new();
    let mut rank_of: BTreeMap<ClassId, usize> = BTreeMap::new();
    for (rank, &(id, count)) in ranking.iter().enumerate() {
        rank_of.insert(id, rank);
        out.push_str(&yaplot::set_palette(
            rank + yaplot::PALETTE_BASE,
            yaplot::RAINBOW[rank],
        ));
        info!(
            "Rank {}: rings {:?}, {} nodes, type {}",
            rank,
            ring_lengths(petals, representative[&id]),
            count,
            id
        );
    }
    for (&node, &id) in ids {
        let rank = match rank_of.get(&id) {
            Some(&rank) => rank,
            None => continue,
        };
        out.push_str(&yaplot::color(rank + yaplot::PALETTE_BASE));
        out.push_str(&yaplot::layer(rank + 1));
        for &ring_id in &petals.rings_at[&node] {
            out.push_str(&yaplot::polygon(&pulled_ring(
                &petals.rings[ring_id],
                node,
                coords,
                cell,
            )));
        }
    }
    out
}

/// Sorted ring-length multiset owned by a node, for the rank log line.
fn ring_lengths(petals: &Petals, node: usize) -> Vec<usize> {
    let mut lengths: Vec<usize> = petals.rings_at[&node]
        .iter()
        .map(|&r| petals.rings[r].len())
        .collect();
    lengths.sort_unstable();
    lengths
}

/// Ring positions for drawing around one owner: each vertex keeps 80% of
/// its minimum-image displacement from the owner, which shrinks the
/// polygon toward the node and unwraps it across the periodic boundary,
/// then projects into real space.
fn pulled_ring(ring: &[usize], node: usize, coords: &[[f64; 3]], cell: &Cell) -> Vec<[f64; 3]> {
    let origin = coords[node];
    ring.iter()
        .map(|&member| {
            let d = cell::min_image(coords[member], origin);
            cell.to_real(cell::add(origin, cell::scale(d, 0.8)))
        })
        .collect()
}
