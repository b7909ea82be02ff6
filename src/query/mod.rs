//! Shape queries over indexed points.
//!
//! Every query is a [`ShapePredicate`]: a cell relation for pruning plus an
//! exact test for points in crossing leaves. [`search`] drives one predicate
//! through a field of a [`PointValues`] reader and returns the matching docs.
//!
//! ```
//! use spatio_points::query::{self, BoxQuery};
//! use spatio_points::PointsBuilder;
//!
//! let mut builder = PointsBuilder::new();
//! builder.add_lat_lon("location", 0, 40.7128, -74.0060).unwrap();
//! builder.add_lat_lon("location", 1, 34.0522, -118.2437).unwrap();
//! let reader = builder.build().unwrap();
//!
//! let east_coast = BoxQuery::new(35.0, 45.0, -80.0, -70.0).unwrap();
//! assert_eq!(query::search(&reader, "location", &east_coast).unwrap(), vec![0]);
//! ```

pub mod bbox;
pub mod distance;
pub mod polygon;
pub mod range;
pub mod sort;

use crate::compute::encoding::{BYTES_PER_DIM, LAT_LON_DIMS};
use crate::error::{Result, SpatioError};
use crate::points::{DocId, IntersectVisitor, PointValues};
use spatio_types::Relation;

pub use bbox::BoxQuery;
pub use distance::DistanceQuery;
pub use polygon::PolygonQuery;
pub use range::RangeQuery;
pub use sort::{DistanceSorter, search_by_distance};

/// The two tests a tree traversal needs from a query shape.
pub trait ShapePredicate: Send + Sync {
    /// Relation of the cell `[min_packed, max_packed]` to the shape.
    ///
    /// May answer `Crosses` when unsure, never `Inside` or `Outside`.
    fn relate(&self, min_packed: &[u8], max_packed: &[u8]) -> Relation;

    /// Exact test for one point.
    fn matches(&self, packed: &[u8]) -> bool;

    fn num_dimensions(&self) -> usize {
        LAT_LON_DIMS
    }

    fn bytes_per_dimension(&self) -> usize {
        BYTES_PER_DIM
    }

    /// Fails unless the field's points have this predicate's layout.
    fn check_compatible(&self, field: &str, num_dims: usize, bytes_per_dim: usize) -> Result<()> {
        if num_dims != self.num_dimensions() || bytes_per_dim != self.bytes_per_dimension() {
            return Err(SpatioError::invalid(format!(
                "field \"{}\" was indexed with num_dims={} bytes_per_dim={}, but the query expects num_dims={} bytes_per_dim={}",
                field,
                num_dims,
                bytes_per_dim,
                self.num_dimensions(),
                self.bytes_per_dimension()
            )));
        }
        Ok(())
    }
}

/// Visitor collecting the docs a predicate accepts.
#[derive(Debug)]
pub struct MatchCollector<'p, P: ?Sized> {
    predicate: &'p P,
    docs: Vec<DocId>,
}

impl<'p, P: ShapePredicate + ?Sized> MatchCollector<'p, P> {
    pub fn new(predicate: &'p P) -> Self {
        Self {
            predicate,
            docs: Vec::new(),
        }
    }

    /// Collected docs, sorted and without duplicates.
    pub fn into_docs(mut self) -> Vec<DocId> {
        self.docs.sort_unstable();
        self.docs.dedup();
        self.docs
    }
}

impl<P: ShapePredicate + ?Sized> IntersectVisitor for MatchCollector<'_, P> {
    #[inline]
    fn visit(&mut self, doc_id: DocId) {
        self.docs.push(doc_id);
    }

    #[inline]
    fn visit_by_packed_value(&mut self, doc_id: DocId, packed_value: &[u8]) {
        if self.predicate.matches(packed_value) {
            self.docs.push(doc_id);
        }
    }

    fn compare(&self, min_packed_value: &[u8], max_packed_value: &[u8]) -> Relation {
        self.predicate.relate(min_packed_value, max_packed_value)
    }

    fn grow(&mut self, count: usize) {
        self.docs.reserve(count);
    }
}

/// Docs of `field` with at least one point matching the predicate, ascending.
pub fn search<R, P>(reader: &R, field: &str, predicate: &P) -> Result<Vec<DocId>>
where
    R: PointValues + ?Sized,
    P: ShapePredicate + ?Sized,
{
    predicate.check_compatible(
        field,
        reader.num_dimensions(field)?,
        reader.bytes_per_dimension(field)?,
    )?;
    let mut collector = MatchCollector::new(predicate);
    reader.intersect(field, &mut collector)?;
    Ok(collector.into_docs())
}

/// Number of distinct docs [`search`] would return.
pub fn count<R, P>(reader: &R, field: &str, predicate: &P) -> Result<usize>
where
    R: PointValues + ?Sized,
    P: ShapePredicate + ?Sized,
{
    Ok(search(reader, field, predicate)?.len())
}

/// Any of the lat/lon queries, for callers holding a mix of them.
#[derive(Debug, Clone)]
pub enum LatLonQuery {
    Box(BoxQuery),
    Polygon(PolygonQuery),
    Distance(DistanceQuery),
}

impl ShapePredicate for LatLonQuery {
    fn relate(&self, min_packed: &[u8], max_packed: &[u8]) -> Relation {
        match self {
            LatLonQuery::Box(q) => q.relate(min_packed, max_packed),
            LatLonQuery::Polygon(q) => q.relate(min_packed, max_packed),
            LatLonQuery::Distance(q) => q.relate(min_packed, max_packed),
        }
    }

    fn matches(&self, packed: &[u8]) -> bool {
        match self {
            LatLonQuery::Box(q) => q.matches(packed),
            LatLonQuery::Polygon(q) => q.matches(packed),
            LatLonQuery::Distance(q) => q.matches(packed),
        }
    }
}

impl From<BoxQuery> for LatLonQuery {
    fn from(query: BoxQuery) -> Self {
        LatLonQuery::Box(query)
    }
}

impl From<PolygonQuery> for LatLonQuery {
    fn from(query: PolygonQuery) -> Self {
        LatLonQuery::Polygon(query)
    }
}

impl From<DistanceQuery> for LatLonQuery {
    fn from(query: DistanceQuery) -> Self {
        LatLonQuery::Distance(query)
    }
}
