//! Interval tree over polygon edges.
//!
//! Both point containment and box crossing only care about edges whose
//! latitude span reaches the query. Edges are keyed by their minimum latitude
//! and each node tracks the maximum latitude of its subtree, so whole subtrees
//! below or above the query latitude are skipped.
//!
//! The tree is an arena: nodes live in one `Vec` and link by index. Edges are
//! inserted in a shuffled order (seeded from the coordinates, so the shape of
//! the tree is deterministic) instead of being rebalanced.

use crate::geometry::{Polygon, edge_crosses_box, ray_crosses_edge};
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use rustc_hash::FxHasher;
use smallvec::{SmallVec, smallvec};
use spatio_types::Relation;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone)]
struct Edge {
    lat1: f64,
    lon1: f64,
    lat2: f64,
    lon2: f64,
    /// minimum latitude of this edge
    low: f64,
    /// maximum latitude of this edge and all its descendants
    max: f64,
    left: Option<u32>,
    right: Option<u32>,
}

/// Polygon with its edges indexed for pruned traversal.
///
/// Answers exactly what [`Polygon::contains`] and [`Polygon::relate`] answer.
#[derive(Debug, Clone)]
pub struct EdgeTree {
    min_lat: f64,
    max_lat: f64,
    min_lon: f64,
    max_lon: f64,
    edges: Vec<Edge>,
    holes: Vec<EdgeTree>,
}

impl EdgeTree {
    pub fn new(polygon: &Polygon) -> Self {
        let holes = polygon.holes().iter().map(EdgeTree::new).collect();
        let lats = polygon.lats();
        let lons = polygon.lons();

        let mut tree = EdgeTree {
            min_lat: polygon.min_lat(),
            max_lat: polygon.max_lat(),
            min_lon: polygon.min_lon(),
            max_lon: polygon.max_lon(),
            edges: Vec::with_capacity(lats.len() - 1),
            holes,
        };

        let mut order: Vec<usize> = (1..lats.len()).collect();
        order.shuffle(&mut ChaCha8Rng::seed_from_u64(coordinate_seed(lats, lons)));
        for i in order {
            tree.add_edge(lats[i - 1], lons[i - 1], lats[i], lons[i]);
        }
        tree
    }

    /// Builds one tree per polygon.
    pub fn build(polygons: &[Polygon]) -> Vec<EdgeTree> {
        polygons.iter().map(EdgeTree::new).collect()
    }

    fn add_edge(&mut self, lat1: f64, lon1: f64, lat2: f64, lon2: f64) {
        let low = lat1.min(lat2);
        let high = lat1.max(lat2);
        let id = self.edges.len() as u32;
        self.edges.push(Edge {
            lat1,
            lon1,
            lat2,
            lon2,
            low,
            max: high,
            left: None,
            right: None,
        });
        if id == 0 {
            return;
        }

        let mut node = 0usize;
        loop {
            let n = &mut self.edges[node];
            n.max = n.max.max(high);
            let child = if low < n.low {
                &mut n.left
            } else {
                &mut n.right
            };
            match *child {
                Some(next) => node = next as usize,
                None => {
                    *child = Some(id);
                    return;
                }
            }
        }
    }

    /// Number of edges in the outer ring.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Longest root-to-leaf path.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack: SmallVec<[(u32, usize); 32]> = smallvec![(0, 1)];
        while let Some((id, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            let n = &self.edges[id as usize];
            for child in [n.left, n.right].into_iter().flatten() {
                stack.push((child, depth + 1));
            }
        }
        deepest
    }

    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        if latitude < self.min_lat
            || latitude > self.max_lat
            || longitude < self.min_lon
            || longitude > self.max_lon
        {
            return false;
        }
        self.ring_contains(latitude, longitude)
            && !self.holes.iter().any(|hole| hole.contains(latitude, longitude))
    }

    fn ring_contains(&self, latitude: f64, longitude: f64) -> bool {
        let mut inside = false;
        let mut stack: SmallVec<[u32; 32]> = smallvec![0];
        while let Some(id) = stack.pop() {
            let n = &self.edges[id as usize];
            if latitude > n.max {
                continue;
            }
            if ray_crosses_edge(n.lat1, n.lon1, n.lat2, n.lon2, latitude, longitude) {
                inside = !inside;
            }
            if let Some(left) = n.left {
                stack.push(left);
            }
            if let Some(right) = n.right
                && latitude >= n.low
            {
                stack.push(right);
            }
        }
        inside
    }

    pub fn relate(&self, min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Relation {
        if max_lon < self.min_lon
            || min_lon > self.max_lon
            || max_lat < self.min_lat
            || min_lat > self.max_lat
        {
            return Relation::Outside;
        }
        if min_lat <= self.min_lat
            && max_lat >= self.max_lat
            && min_lon <= self.min_lon
            && max_lon >= self.max_lon
        {
            return Relation::Crosses;
        }
        for hole in &self.holes {
            match hole.relate(min_lat, max_lat, min_lon, max_lon) {
                Relation::Crosses => return Relation::Crosses,
                Relation::Inside => return Relation::Outside,
                Relation::Outside => {}
            }
        }

        match self.corners_inside(min_lat, max_lat, min_lon, max_lon) {
            4 if self.crosses(min_lat, max_lat, min_lon, max_lon) => Relation::Crosses,
            4 => Relation::Inside,
            0 if self.crosses(min_lat, max_lat, min_lon, max_lon) => Relation::Crosses,
            0 => Relation::Outside,
            _ => Relation::Crosses,
        }
    }

    fn corners_inside(&self, min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> usize {
        let corners = [
            (min_lat, min_lon),
            (min_lat, max_lon),
            (max_lat, max_lon),
            (max_lat, min_lon),
        ];
        let mut count = 0;
        for (i, &(lat, lon)) in corners.iter().enumerate() {
            if self.contains(lat, lon) {
                count += 1;
            }
            if count != 0 && count != i + 1 {
                return count;
            }
        }
        count
    }

    fn crosses(&self, min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> bool {
        let mut stack: SmallVec<[u32; 32]> = smallvec![0];
        while let Some(id) = stack.pop() {
            let n = &self.edges[id as usize];
            if min_lat > n.max {
                continue;
            }
            if edge_crosses_box(
                n.lat1, n.lon1, n.lat2, n.lon2, min_lat, max_lat, min_lon, max_lon,
            ) {
                return true;
            }
            if let Some(left) = n.left {
                stack.push(left);
            }
            if let Some(right) = n.right
                && max_lat >= n.low
            {
                stack.push(right);
            }
        }
        false
    }

    pub fn contains_any(trees: &[EdgeTree], latitude: f64, longitude: f64) -> bool {
        trees.iter().any(|t| t.contains(latitude, longitude))
    }

    /// First relation that is not `Outside`, as [`Polygon::relate_any`].
    pub fn relate_any(
        trees: &[EdgeTree],
        min_lat: f64,
        max_lat: f64,
        min_lon: f64,
        max_lon: f64,
    ) -> Relation {
        trees
            .iter()
            .map(|t| t.relate(min_lat, max_lat, min_lon, max_lon))
            .find(|r| !r.is_outside())
            .unwrap_or(Relation::Outside)
    }
}

fn coordinate_seed(lats: &[f64], lons: &[f64]) -> u64 {
    let mut hasher = FxHasher::default();
    for v in lats.iter().chain(lons.iter()) {
        v.to_bits().hash(&mut hasher);
    }
    hasher.finish()
}
