#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! In-memory point index and density clustering on WGS84 coordinates.
//!
//! Points are `(latitude, longitude)` pairs in degrees. The R-tree is only a
//! coarse prefilter over a lat/lon bounding box; every candidate is then
//! checked with the exact Haversine distance, so radius queries and DBSCAN
//! neighbourhoods are in true kilometres.

use std::collections::VecDeque;

use geo::{Distance, Haversine, Point};
use rstar::{AABB, RTree, RTreeObject};

/// Kilometres per degree of latitude, rounded down so that search boxes
/// err on the large side.
const KM_PER_DEGREE: f64 = 110.0;

/// Great-circle distance in kilometres between two `(lat, lon)` points.
#[must_use]
pub fn haversine_km(a: (f64, f64), b: (f64, f64)) -> f64 {
    Haversine.distance(Point::new(a.1, a.0), Point::new(b.1, b.0)) / 1000.0
}

/// A point stored in the R-tree with its position in the input slice.
struct PointEntry {
    index: usize,
    /// `[lon, lat]`
    position: [f64; 2],
}

impl RTreeObject for PointEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

/// R-tree over a fixed set of `(lat, lon)` points.
///
/// Query results are indices into the slice the index was built from.
pub struct PointIndex {
    tree: RTree<PointEntry>,
    points: Vec<(f64, f64)>,
}

impl PointIndex {
    /// Bulk-loads the index.
    #[must_use]
    pub fn new(points: &[(f64, f64)]) -> Self {
        let entries = points
            .iter()
            .enumerate()
            .map(|(index, &(lat, lon))| PointEntry {
                index,
                position: [lon, lat],
            })
            .collect();

        Self {
            tree: RTree::bulk_load(entries),
            points: points.to_vec(),
        }
    }

    /// Number of indexed points.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the index is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Indices of all points within `radius_km` of `center` (inclusive),
    /// in ascending order.
    #[must_use]
    pub fn within_km(&self, center: (f64, f64), radius_km: f64) -> Vec<usize> {
        let envelope = search_envelope(center, radius_km);
        let mut found: Vec<usize> = self
            .tree
            .locate_in_envelope(&envelope)
            .filter(|entry| haversine_km(center, self.points[entry.index]) <= radius_km)
            .map(|entry| entry.index)
            .collect();
        found.sort_unstable();
        found
    }
}

/// Lat/lon box guaranteed to contain the `radius_km` circle around `center`.
fn search_envelope((lat, lon): (f64, f64), radius_km: f64) -> AABB<[f64; 2]> {
    let dlat = radius_km / KM_PER_DEGREE;
    // Use the latitude edge closest to the pole, where a degree of
    // longitude is shortest.
    let lat_edge = (lat.abs() + dlat).min(89.9).to_radians();
    let dlon = (radius_km / (KM_PER_DEGREE * lat_edge.cos())).min(180.0);

    AABB::from_corners([lon - dlon, lat - dlat], [lon + dlon, lat + dlat])
}

/// Density-based clustering (DBSCAN) with Haversine distances.
///
/// Returns one label per input point: `Some(cluster)` with clusters numbered
/// from 0 in order of discovery, or `None` for noise. A point is a core
/// point when at least `min_samples` points (itself included) lie within
/// `eps_km`. Border points join the first cluster that reaches them, so the
/// result is deterministic for a given input order.
#[must_use]
pub fn dbscan(points: &[(f64, f64)], eps_km: f64, min_samples: usize) -> Vec<Option<usize>> {
    let index = PointIndex::new(points);
    let mut labels: Vec<Option<usize>> = vec![None; points.len()];
    let mut visited = vec![false; points.len()];
    let mut next_cluster = 0;

    for start in 0..points.len() {
        if visited[start] {
            continue;
        }
        visited[start] = true;

        let neighbours = index.within_km(points[start], eps_km);
        if neighbours.len() < min_samples {
            continue;
        }

        let cluster = next_cluster;
        next_cluster += 1;
        labels[start] = Some(cluster);

        // Points are labelled and marked visited when queued, so each one
        // enters the queue at most once.
        let mut queue = VecDeque::new();
        claim(&neighbours, cluster, &mut labels, &mut visited, &mut queue);
        while let Some(point) = queue.pop_front() {
            let reach = index.within_km(points[point], eps_km);
            if reach.len() >= min_samples {
                claim(&reach, cluster, &mut labels, &mut visited, &mut queue);
            }
        }
    }

    log::debug!(
        "DBSCAN eps={eps_km}km min_samples={min_samples}: {} points, {next_cluster} clusters",
        points.len()
    );

    labels
}

/// Labels every unclaimed point of `reach` with `cluster`. Points not yet
/// visited are queued for expansion; earlier noise becomes a border point.
fn claim(
    reach: &[usize],
    cluster: usize,
    labels: &mut [Option<usize>],
    visited: &mut [bool],
    queue: &mut VecDeque<usize>,
) {
    for &p in reach {
        if labels[p].is_some() {
            continue;
        }
        labels[p] = Some(cluster);
        if !visited[p] {
            visited[p] = true;
            queue.push_back(p);
        }
    }
}
