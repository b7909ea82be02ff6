//! K-nearest-neighbor search over lat/lon trees.
//!
//! Best-first search: tree cells wait in a min-heap keyed by a lower bound on
//! the distance from the query point to anything inside them, and the `n`
//! best hits so far sit in a max-heap. Once the closest pending cell is
//! farther than the worst kept hit, nothing left can improve the result.

use crate::compute::distance::{
    circle_to_bbox, haversin_meters_from_sort_key, haversin_sort_key, min_sort_key_to_box,
};
use crate::compute::encoding::{
    BYTES_PER_DIM, LAT_LON_DIMS, decode_lat_lon_ints, decode_latitude, decode_longitude,
    latitude_to_int, longitude_to_int,
};
use crate::compute::validation::check_lat_lon;
use crate::config::NearestConfig;
use crate::error::{Result, SpatioError};
use crate::geometry::Rectangle;
use crate::points::block::BlockSource;
use crate::points::tree::BkdTree;
use crate::points::{DocId, PackedValue};
use bytes::Bytes;
use log::trace;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

// relative slack on cell bounds, absorbs rounding in the closed-form minimum
pub(crate) const BOUND_SLACK: f64 = 1.0 - 1e-9;

/// One tree taking part in a search, with its doc id offset and deletions.
#[derive(Debug, Clone)]
pub struct NearestSegment<'a, S = Bytes> {
    pub tree: &'a BkdTree<S>,
    /// Added to every doc id of this tree in the results.
    pub doc_base: DocId,
    /// `live_docs[doc]` must be true for `doc` to be returned.
    pub live_docs: Option<&'a [bool]>,
}

impl<'a, S> NearestSegment<'a, S> {
    pub fn new(tree: &'a BkdTree<S>) -> Self {
        Self {
            tree,
            doc_base: 0,
            live_docs: None,
        }
    }

    pub fn with_doc_base(mut self, doc_base: DocId) -> Self {
        self.doc_base = doc_base;
        self
    }

    pub fn with_live_docs(mut self, live_docs: &'a [bool]) -> Self {
        self.live_docs = Some(live_docs);
        self
    }

    fn is_live(&self, doc_id: DocId) -> bool {
        match self.live_docs {
            Some(live) => live.get(doc_id as usize).copied().unwrap_or(false),
            None => true,
        }
    }
}

/// A result of [`nearest`]. Orders nearest first, ties by doc id.
#[derive(Debug, Clone, Copy)]
pub struct NearestHit {
    pub doc_id: DocId,
    /// Haversine sort key from the query point.
    pub sort_key: f64,
}

impl NearestHit {
    pub fn distance_meters(&self) -> f64 {
        haversin_meters_from_sort_key(self.sort_key)
    }
}

impl PartialEq for NearestHit {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for NearestHit {}

impl PartialOrd for NearestHit {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NearestHit {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key
            .total_cmp(&other.sort_key)
            .then(self.doc_id.cmp(&other.doc_id))
    }
}

/// The `n` points nearest to `(lat, lon)` across all segments.
///
/// Every tree must hold lat/lon points (2 dimensions of 4 bytes). Results are
/// sorted nearest first; equally distant points come out by ascending doc id,
/// and only the lowest doc ids make the cut.
///
/// # Examples
///
/// ```
/// use spatio_points::config::NearestConfig;
/// use spatio_points::{PointsBuilder, nearest, NearestSegment};
///
/// let mut builder = PointsBuilder::new();
/// builder.add_lat_lon("location", 0, 40.7128, -74.0060).unwrap();
/// builder.add_lat_lon("location", 1, 51.5074, -0.1278).unwrap();
/// builder.add_lat_lon("location", 2, 48.8566, 2.3522).unwrap();
/// let reader = builder.build().unwrap();
///
/// let tree = reader.tree("location").unwrap();
/// let hits = nearest(50.0, 0.0, &[NearestSegment::new(tree)], 2, &NearestConfig::default()).unwrap();
/// assert_eq!(hits[0].doc_id, 1);
/// assert_eq!(hits[1].doc_id, 2);
/// ```
pub fn nearest<S: BlockSource>(
    lat: f64,
    lon: f64,
    segments: &[NearestSegment<'_, S>],
    n: usize,
    config: &NearestConfig,
) -> Result<Vec<NearestHit>> {
    check_lat_lon(lat, lon)?;
    if n == 0 {
        return Err(SpatioError::invalid("n must be at least 1 (got: 0)"));
    }

    let mut cells = BinaryHeap::new();
    for (index, segment) in segments.iter().enumerate() {
        let tree = segment.tree;
        if tree.num_dimensions() != LAT_LON_DIMS || tree.bytes_per_dimension() != BYTES_PER_DIM {
            return Err(SpatioError::invalid(format!(
                "segment {} holds {} dims x {} bytes, nearest needs lat/lon points",
                index,
                tree.num_dimensions(),
                tree.bytes_per_dimension()
            )));
        }
        if let Some((min, max)) = tree.root_cell() {
            cells.push(Cell::new(index, 1, min, max, lat, lon));
        }
    }

    let mut search = Search::new(lat, lon, n, config);
    let mut popped = 0usize;
    let mut leaves = 0usize;
    while let Some(cell) = cells.pop() {
        popped += 1;
        if let Some(worst) = search.worst()
            && cell.bound > worst.sort_key
        {
            break;
        }

        let Cell {
            segment: index,
            node_id,
            min,
            max,
            ..
        } = cell;
        let segment = &segments[index];
        let tree = segment.tree;

        if tree.is_leaf_node(node_id) {
            leaves += 1;
            let block = tree.read_leaf(node_id)?;
            for (doc, packed) in block.iter() {
                search.offer(segment, doc, packed)?;
            }
        } else {
            if !search.accept.accepts_cell(&min, &max) {
                continue;
            }
            let (left_max, right_min) = tree.split_cell(node_id, &min, &max);
            cells.push(Cell::new(index, 2 * node_id, min, left_max, lat, lon));
            cells.push(Cell::new(index, 2 * node_id + 1, right_min, max, lat, lon));
        }
    }

    trace!(
        "nearest({}, {}, n={}): popped {} cells, visited {} leaves, {} bbox refreshes, {} hits",
        lat,
        lon,
        n,
        popped,
        leaves,
        search.refreshes,
        search.hits.len()
    );
    Ok(search.hits.into_sorted_vec())
}

/// A pending tree cell. Orders so that `BinaryHeap` pops the smallest bound.
struct Cell {
    segment: usize,
    node_id: usize,
    min: PackedValue,
    max: PackedValue,
    /// lower bound of the sort key of any point in the cell
    bound: f64,
}

impl Cell {
    fn new(
        segment: usize,
        node_id: usize,
        min: PackedValue,
        max: PackedValue,
        lat: f64,
        lon: f64,
    ) -> Self {
        let (min_lat, min_lon) = decode_lat_lon_ints(&min);
        let (max_lat, max_lon) = decode_lat_lon_ints(&max);
        let rect = Rectangle {
            min_lat: decode_latitude(min_lat),
            max_lat: decode_latitude(max_lat),
            min_lon: decode_longitude(min_lon),
            max_lon: decode_longitude(max_lon),
        };
        let bound = min_sort_key_to_box(lat, lon, &rect) * BOUND_SLACK;
        Self {
            segment,
            node_id,
            min,
            max,
            bound,
        }
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Cell {}

impl PartialOrd for Cell {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cell {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .bound
            .total_cmp(&self.bound)
            .then(other.segment.cmp(&self.segment))
            .then(other.node_id.cmp(&self.node_id))
    }
}

/// Encoded box outside of which no point can beat the worst kept hit.
#[derive(Debug, Clone, Copy)]
struct AcceptBox {
    min_lat: i32,
    max_lat: i32,
    min_lon: i32,
    max_lon: i32,
    /// start of the second longitude range `[min_lon2, i32::MAX]` of a
    /// dateline-crossing box
    min_lon2: Option<i32>,
}

impl AcceptBox {
    const EVERYTHING: AcceptBox = AcceptBox {
        min_lat: i32::MIN,
        max_lat: i32::MAX,
        min_lon: i32::MIN,
        max_lon: i32::MAX,
        min_lon2: None,
    };

    fn from_rectangle(rect: &Rectangle) -> Self {
        let min_lat = latitude_to_int(rect.min_lat);
        let max_lat = latitude_to_int(rect.max_lat);
        if rect.crosses_dateline() {
            AcceptBox {
                min_lat,
                max_lat,
                min_lon: i32::MIN,
                max_lon: longitude_to_int(rect.max_lon),
                min_lon2: Some(longitude_to_int(rect.min_lon)),
            }
        } else {
            AcceptBox {
                min_lat,
                max_lat,
                min_lon: longitude_to_int(rect.min_lon),
                max_lon: longitude_to_int(rect.max_lon),
                min_lon2: None,
            }
        }
    }

    fn accepts_point(&self, lat: i32, lon: i32) -> bool {
        if lat < self.min_lat || lat > self.max_lat {
            return false;
        }
        (lon >= self.min_lon && lon <= self.max_lon) || self.min_lon2.is_some_and(|m| lon >= m)
    }

    fn accepts_cell(&self, min: &[u8], max: &[u8]) -> bool {
        let (min_lat, min_lon) = decode_lat_lon_ints(min);
        let (max_lat, max_lon) = decode_lat_lon_ints(max);
        if min_lat > self.max_lat || max_lat < self.min_lat {
            return false;
        }
        !(min_lon > self.max_lon || max_lon < self.min_lon)
            || self.min_lon2.is_some_and(|m| max_lon >= m)
    }
}

struct Search<'c> {
    lat: f64,
    lon: f64,
    n: usize,
    config: &'c NearestConfig,
    hits: BinaryHeap<NearestHit>,
    accept: AcceptBox,
    updates: u32,
    refreshes: usize,
}

impl<'c> Search<'c> {
    fn new(lat: f64, lon: f64, n: usize, config: &'c NearestConfig) -> Self {
        Self {
            lat,
            lon,
            n,
            config,
            hits: BinaryHeap::with_capacity(n.min(1 << 16)),
            accept: AcceptBox::EVERYTHING,
            updates: 0,
            refreshes: 0,
        }
    }

    /// Worst kept hit, once `n` hits are kept.
    fn worst(&self) -> Option<&NearestHit> {
        if self.hits.len() < self.n {
            None
        } else {
            self.hits.peek()
        }
    }

    fn offer<S>(&mut self, segment: &NearestSegment<'_, S>, doc: DocId, packed: &[u8]) -> Result<()> {
        if !segment.is_live(doc) {
            return Ok(());
        }
        let (lat, lon) = decode_lat_lon_ints(packed);
        if !self.accept.accepts_point(lat, lon) {
            return Ok(());
        }
        let doc_id = segment.doc_base.checked_add(doc).ok_or_else(|| {
            SpatioError::invalid(format!(
                "doc {} overflows doc id space with doc_base {}",
                doc, segment.doc_base
            ))
        })?;
        let hit = NearestHit {
            doc_id,
            sort_key: haversin_sort_key(self.lat, self.lon, decode_latitude(lat), decode_longitude(lon)),
        };

        if self.hits.len() < self.n {
            self.hits.push(hit);
            if self.hits.len() == self.n {
                self.refresh()?;
            }
            return Ok(());
        }
        let replaced = match self.hits.peek_mut() {
            Some(mut worst) if hit < *worst => {
                *worst = hit;
                true
            }
            _ => false,
        };
        if replaced {
            if self.config.should_refresh(self.updates) {
                self.refresh()?;
            }
            self.updates = self.updates.wrapping_add(1);
        }
        Ok(())
    }

    fn refresh(&mut self) -> Result<()> {
        if let Some(worst) = self.hits.peek() {
            let radius = haversin_meters_from_sort_key(worst.sort_key);
            let rect = circle_to_bbox(self.lat, self.lon, radius)?;
            self.accept = AcceptBox::from_rectangle(&rect);
            self.refreshes += 1;
        }
        Ok(())
    }
}
