//! Vector operations the delineation needs: snapping to a flow line and
//! turning a mask into polygons.

use std::collections::HashMap;

use geo::{Area, Closest, ClosestPoint, Contains, Coord, LineString, MultiLineString, MultiPolygon, Point, Polygon};
use ndarray::Array2;

use crate::error::Result;
use crate::raster::RasterMetadata;
use crate::upstream::UpstreamMask;

pub trait VectorOps {
    /// The point on `lines` closest to `point`, `None` when there is no
    /// single answer (e.g. no lines at all).
    fn nearest_point_on_line(&self, lines: &MultiLineString<f64>, point: Coord<f64>) -> Option<Coord<f64>>;

    /// Outlines the set cells of `mask` in world coordinates.
    fn polygonize(&self, mask: &UpstreamMask) -> Result<MultiPolygon<f64>>;
}

/// [`VectorOps`] built on the `geo` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoVectorOps;

impl VectorOps for GeoVectorOps {
    fn nearest_point_on_line(&self, lines: &MultiLineString<f64>, point: Coord<f64>) -> Option<Coord<f64>> {
        match lines.closest_point(&Point::from(point)) {
            Closest::Intersection(p) | Closest::SinglePoint(p) => Some(p.0),
            Closest::Indeterminate => None,
        }
    }

    fn polygonize(&self, mask: &UpstreamMask) -> Result<MultiPolygon<f64>> {
        Ok(mask_to_polygons(mask.data(), mask.metadata()))
    }
}

// corners of the cell lattice as (col, row)
type Vertex = (isize, isize);

fn heading(from: Vertex, to: Vertex) -> Vertex {
    ((to.0 - from.0).signum(), (to.1 - from.1).signum())
}

/// Boundary edges of the set cells. Each edge keeps its cell on the left in
/// world coordinates, so outer boundaries run counter-clockwise and holes
/// clockwise.
fn boundary_edges(mask: &Array2<u8>) -> Vec<(Vertex, Vertex)> {
    let (rows, cols) = mask.dim();
    let set = |c: isize, r: isize| {
        c >= 0 && r >= 0 && (c as usize) < cols && (r as usize) < rows && mask[[r as usize, c as usize]] == 1
    };
    let mut edges = Vec::new();
    for ((r, c), &v) in mask.indexed_iter() {
        if v != 1 {
            continue;
        }
        let (c, r) = (c as isize, r as isize);
        if !set(c, r + 1) {
            edges.push(((c, r + 1), (c + 1, r + 1)));
        }
        if !set(c + 1, r) {
            edges.push(((c + 1, r + 1), (c + 1, r)));
        }
        if !set(c, r - 1) {
            edges.push(((c + 1, r), (c, r)));
        }
        if !set(c - 1, r) {
            edges.push(((c, r), (c, r + 1)));
        }
    }
    edges
}

/// Links boundary edges into closed rings of lattice vertices. Where two
/// rings meet at a corner the walk turns left, which keeps cells that only
/// touch diagonally in separate rings.
fn link_rings(edges: &[(Vertex, Vertex)]) -> Vec<Vec<Vertex>> {
    let mut outgoing: HashMap<Vertex, Vec<usize>> = HashMap::with_capacity(edges.len());
    for (i, &(from, _)) in edges.iter().enumerate() {
        outgoing.entry(from).or_default().push(i);
    }

    let mut used = vec![false; edges.len()];
    let mut rings = Vec::new();
    for start in 0..edges.len() {
        if used[start] {
            continue;
        }
        used[start] = true;
        let mut ring = vec![edges[start].0];
        let mut current = start;
        loop {
            let (from, to) = edges[current];
            let (dc, dr) = heading(from, to);
            let candidates = &outgoing[&to];
            let next = if candidates.len() == 1 {
                candidates[0]
            } else {
                let left = (dr, -dc);
                candidates
                    .iter()
                    .copied()
                    .find(|&i| heading(edges[i].0, edges[i].1) == left)
                    .unwrap_or(candidates[0])
            };
            if next == start || used[next] {
                break;
            }
            ring.push(to);
            used[next] = true;
            current = next;
        }
        rings.push(ring);
    }
    rings
}

/// Drops vertices in the middle of straight runs and closes the ring.
fn simplify_ring(ring: &[Vertex]) -> Vec<Vertex> {
    let n = ring.len();
    let mut out: Vec<Vertex> = (0..n)
        .filter(|&i| {
            let prev = ring[(i + n - 1) % n];
            let next = ring[(i + 1) % n];
            heading(prev, ring[i]) != heading(ring[i], next)
        })
        .map(|i| ring[i])
        .collect();
    if let Some(&first) = out.first() {
        out.push(first);
    }
    out
}

/// Converts a 0/1 mask into polygons. Cells connected through their edges
/// form one polygon; enclosed unset cells become holes.
pub fn mask_to_polygons(mask: &Array2<u8>, metadata: &RasterMetadata) -> MultiPolygon<f64> {
    let rings: Vec<LineString<f64>> = link_rings(&boundary_edges(mask))
        .iter()
        .map(|ring| {
            simplify_ring(ring)
                .into_iter()
                .map(|(c, r)| metadata.corner_to_world(c, r))
                .collect()
        })
        .collect();

    let (mut shells, holes): (Vec<Polygon<f64>>, Vec<Polygon<f64>>) = rings
        .into_iter()
        .map(|ring| Polygon::new(ring, vec![]))
        .partition(|p| p.signed_area() > 0.0);

    let shell_areas: Vec<f64> = shells.iter().map(|s| s.unsigned_area()).collect();
    let mut interiors: Vec<Vec<LineString<f64>>> = vec![Vec::new(); shells.len()];
    for hole in holes {
        let ring = hole.exterior();
        let probe = Point::new((ring.0[0].x + ring.0[1].x) / 2.0, (ring.0[0].y + ring.0[1].y) / 2.0);
        let owner = shells
            .iter()
            .enumerate()
            .filter(|(_, s)| s.contains(&probe))
            .min_by(|a, b| shell_areas[a.0].total_cmp(&shell_areas[b.0]))
            .map(|(i, _)| i);
        if let Some(i) = owner {
            interiors[i].push(ring.clone());
        }
    }

    shells = shells
        .into_iter()
        .zip(interiors)
        .map(|(shell, holes)| Polygon::new(shell.exterior().clone(), holes))
        .collect();
    MultiPolygon::new(shells)
}
