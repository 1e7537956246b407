//! Lattice text-format parser.
//!
//! Reads the interchange format hydrogen-bond networks arrive in: a sequence
//! of `@`-tagged records. Recognized records are `@BOX3` (orthorhombic box
//! lengths), `@BOX9` (full 3x3 cell matrix), `@AR3A` (fractional positions)
//! and `@NGPH` (bond pairs, terminated by a negative pair). Unknown records
//! are skipped. Records may appear in any order; the last one of a kind wins.

use crate::cell::Cell;
use crate::HydrogenBondGraph;
use anyhow::{Context, Result};
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, i64 as dec_i64, multispace0},
    combinator::{all_consuming, map_res},
    error::{convert_error, VerboseError},
    multi::{count, many0},
    number::complete::double,
    sequence::{preceded, terminated, tuple},
    IResult,
};
use petgraph::graph::NodeIndex;
use thiserror::Error;

pub type Res<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

#[derive(Error, Debug)]
pub enum LatticeError {
    #[error("Malformed lattice text: {0}")]
    Syntax(String),
    #[error("Missing @BOX3 or @BOX9 cell record")]
    MissingCell,
    #[error("Missing @AR3A coordinate record")]
    MissingCoords,
    #[error("Missing @NGPH bond record")]
    MissingBonds,
    #[error("Bond ({0}, {1}) references a node outside 0..{2}")]
    EdgeOutOfRange(usize, usize, usize),
    #[error("@NGPH declares {declared} nodes but @AR3A provides {provided}")]
    NodeCountMismatch { declared: usize, provided: usize },
}

/// A periodic hydrogen-bond network: the repeat cell, one fractional
/// coordinate per molecule, and the bond graph over molecule indices.
#[derive(Debug)]
pub struct Lattice {
    pub cell: Cell,
    pub coords: Vec<[f64; 3]>,
    pub graph: HydrogenBondGraph,
}

impl Lattice {
    /// Builds a lattice from already-decoded parts, coercing the edge list
    /// to a simple undirected graph. Edges listed in both directions or
    /// repeatedly collapse to one.
    pub fn new(
        cell: Cell,
        coords: Vec<[f64; 3]>,
        edges: &[(usize, usize)],
    ) -> Result<Self, LatticeError> {
        let n = coords.len();
        let mut graph = HydrogenBondGraph::with_capacity(n, edges.len());
        for _ in 0..n {
            graph.add_node(());
        }
        for &(i, j) in edges {
            if i >= n || j >= n {
                return Err(LatticeError::EdgeOutOfRange(i, j, n));
            }
            graph.update_edge(NodeIndex::new(i), NodeIndex::new(j), ());
        }
        Ok(Self { cell, coords, graph })
    }

    /// Parses the `@`-record text format.
    pub fn parse(text: &str) -> Result<Self> {
        parse_lattice(text).context("Failed to parse lattice text")
    }
}

// ---------------------------------------------------------------------
// Record parsers
// ---------------------------------------------------------------------

enum Record {
    Box3([f64; 3]),
    Box9([[f64; 3]; 3]),
    Coords(Vec<[f64; 3]>),
    Bonds(usize, Vec<(i64, i64)>),
    Unknown,
}

fn float(input: &str) -> Res<f64> {
    preceded(multispace0, double)(input)
}

fn integer(input: &str) -> Res<i64> {
    preceded(multispace0, dec_i64)(input)
}

fn index_count(input: &str) -> Res<usize> {
    map_res(integer, usize::try_from)(input)
}

fn vec3(input: &str) -> Res<[f64; 3]> {
    let (input, (x, y, z)) = tuple((float, float, float))(input)?;
    Ok((input, [x, y, z]))
}

fn parse_box3(input: &str) -> Res<Record> {
    let (input, _) = preceded(multispace0, tag("@BOX3"))(input)?;
    let (input, lengths) = vec3(input)?;
    Ok((input, Record::Box3(lengths)))
}

fn parse_box9(input: &str) -> Res<Record> {
    let (input, _) = preceded(multispace0, tag("@BOX9"))(input)?;
    let (input, rows) = count(vec3, 3)(input)?;
    Ok((input, Record::Box9([rows[0], rows[1], rows[2]])))
}

fn parse_ar3a(input: &str) -> Res<Record> {
    let (input, _) = preceded(multispace0, tag("@AR3A"))(input)?;
    let (input, n) = index_count(input)?;
    let (input, coords) = count(vec3, n)(input)?;
    Ok((input, Record::Coords(coords)))
}

/// Bond pairs follow the declared node count and run until a pair with a
/// negative member, the conventional terminator.
fn parse_ngph(input: &str) -> Res<Record> {
    let (input, _) = preceded(multispace0, tag("@NGPH"))(input)?;
    let (mut input, n) = index_count(input)?;
    let mut pairs = Vec::new();
    loop {
        let (rest, i) = integer(input)?;
        let (rest, j) = integer(rest)?;
        input = rest;
        if i < 0 || j < 0 {
            break;
        }
        pairs.push((i, j));
    }
    Ok((input, Record::Bonds(n, pairs)))
}

/// Any other `@`-tagged record: consume the tag and everything up to the
/// next record.
fn parse_unknown(input: &str) -> Res<Record> {
    let (input, _) = preceded(multispace0, char('@'))(input)?;
    let (input, _) = take_while1(|c: char| !c.is_whitespace())(input)?;
    let (input, _) = take_while(|c| c != '@')(input)?;
    Ok((input, Record::Unknown))
}

fn parse_records(input: &str) -> Res<Vec<Record>> {
    terminated(
        many0(alt((
            parse_box3,
            parse_box9,
            parse_ar3a,
            parse_ngph,
            parse_unknown,
        ))),
        multispace0,
    )(input)
}

// ---------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------

fn parse_lattice(text: &str) -> Result<Lattice> {
    let records = match all_consuming(parse_records)(text) {
        Ok((_, records)) => records,
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            return Err(LatticeError::Syntax(convert_error(text, e)).into());
        }
        Err(nom::Err::Incomplete(_)) => {
            return Err(LatticeError::Syntax("input ended unexpectedly".to_string()).into());
        }
    };

    let mut cell = None;
    let mut coords = None;
    let mut bonds = None;
    for record in records {
        match record {
            Record::Box3(lengths) => cell = Some(Cell::orthorhombic(lengths)),
            Record::Box9(mat) => cell = Some(Cell::new(mat)),
            Record::Coords(c) => coords = Some(c),
            Record::Bonds(n, pairs) => bonds = Some((n, pairs)),
            Record::Unknown => {}
        }
    }

    let cell = cell.ok_or(LatticeError::MissingCell)?;
    let coords = coords.ok_or(LatticeError::MissingCoords)?;
    let (declared, pairs) = bonds.ok_or(LatticeError::MissingBonds)?;
    if declared != coords.len() {
        return Err(LatticeError::NodeCountMismatch {
            declared,
            provided: coords.len(),
        }
        .into());
    }
    let edges: Vec<(usize, usize)> = pairs
        .into_iter()
        .map(|(i, j)| (i as usize, j as usize))
        .collect();
    Ok(Lattice::new(cell, coords, &edges)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE: &str = "\
@BOX3
10.0 10.0 10.0
@AR3A
4
0.1 0.1 0.5
0.3 0.1 0.5
0.3 0.3 0.5
0.1 0.3 0.5
@NGPH
4
0 1
1 2
2 3
3 0
-1 -1
";

    #[test]
    fn parses_square_lattice() {
        let lattice = Lattice::parse(SQUARE).unwrap();
        assert_eq!(lattice.coords.len(), 4);
        assert_eq!(lattice.graph.node_count(), 4);
        assert_eq!(lattice.graph.edge_count(), 4);
        assert_eq!(lattice.cell.mat[0][0], 10.0);
        assert_eq!(lattice.cell.mat[1][2], 0.0);
    }

    #[test]
    fn reversed_and_repeated_bonds_collapse() {
        let text = "\
@BOX3
5.0 5.0 5.0
@AR3A
2
0.0 0.0 0.0
0.5 0.0 0.0
@NGPH
2
0 1
1 0
0 1
-1 -1
";
        let lattice = Lattice::parse(text).unwrap();
        assert_eq!(lattice.graph.edge_count(), 1);
    }

    #[test]
    fn box9_reads_full_matrix() {
        let text = "\
@BOX9
2.0 0.0 0.0
1.0 2.0 0.0
0.0 0.0 3.0
@AR3A
1
0.5 0.5 0.5
@NGPH
1
-1 -1
";
        let lattice = Lattice::parse(text).unwrap();
        assert_eq!(lattice.cell.mat[1][0], 1.0);
        assert_eq!(lattice.graph.edge_count(), 0);
    }

    #[test]
    fn unknown_records_are_skipped() {
        let text = "\
@CMNT
anything at all 1 2 3
@BOX3
5.0 5.0 5.0
@AR3A
1
0.0 0.0 0.0
@NGPH
1
-1 -1
";
        let lattice = Lattice::parse(text).unwrap();
        assert_eq!(lattice.coords.len(), 1);
    }

    #[test]
    fn records_parse_in_any_order() {
        let text = "\
@NGPH
2
0 1
-1 -1
@AR3A
2
0.0 0.0 0.0
0.5 0.0 0.0
@BOX3
5.0 5.0 5.0
";
        let lattice = Lattice::parse(text).unwrap();
        assert_eq!(lattice.graph.edge_count(), 1);
        assert_eq!(lattice.cell.mat[0][0], 5.0);
    }

    #[test]
    fn last_record_of_a_kind_wins() {
        let text = "\
@BOX3
5.0 5.0 5.0
@AR3A
1
0.0 0.0 0.0
@NGPH
1
-1 -1
@BOX3
7.0 7.0 7.0
";
        let lattice = Lattice::parse(text).unwrap();
        assert_eq!(lattice.cell.mat[0][0], 7.0);
    }

    #[test]
    fn edge_out_of_range_is_an_error() {
        let text = "\
@BOX3
5.0 5.0 5.0
@AR3A
2
0.0 0.0 0.0
0.5 0.0 0.0
@NGPH
2
0 7
-1 -1
";
        assert!(Lattice::parse(text).is_err());
    }

    #[test]
    fn missing_bond_record_is_an_error() {
        let text = "\
@BOX3
5.0 5.0 5.0
@AR3A
1
0.0 0.0 0.0
";
        assert!(Lattice::parse(text).is_err());
    }

    #[test]
    fn node_count_mismatch_is_an_error() {
        let text = "\
@BOX3
5.0 5.0 5.0
@AR3A
2
0.0 0.0 0.0
0.5 0.0 0.0
@NGPH
3
0 1
-1 -1
";
        assert!(Lattice::parse(text).is_err());
    }
}
