//! Block k-d tree over fixed-width packed values.
//!
//! A point is `num_dims` dimensions of `bytes_per_dim` sortable bytes each,
//! concatenated into one packed value. Queries walk the tree through an
//! [`IntersectVisitor`]: the visitor classifies each cell, and the tree only
//! hands out the documents and values the visitor cannot settle in bulk.

pub mod block;
pub mod nearest;
pub mod reader;
pub mod tree;

use crate::error::Result;
use smallvec::SmallVec;
use spatio_types::Relation;

pub use block::{BlockSource, FileBlockSource, LeafBlock};
pub use nearest::{NearestHit, NearestSegment, nearest};
pub use reader::PointsReader;
pub use tree::{BkdTree, TreeBuilder};

/// Document identifier within one tree.
pub type DocId = u32;

/// Owned packed value or cell bound. Lat/lon points fit inline.
pub type PackedValue = SmallVec<[u8; 16]>;

/// Maximum number of dimensions per point.
pub const MAX_DIMS: usize = 8;

/// Maximum bytes per dimension.
pub const MAX_BYTES_PER_DIM: usize = 16;

/// Receives the results of a tree traversal.
///
/// [`compare`](IntersectVisitor::compare) sees every visited cell as
/// inclusive `[min, max]` packed bounds. Returning [`Relation::Inside`] hands
/// over every doc below the cell through [`visit`](IntersectVisitor::visit);
/// [`Relation::Crosses`] leads to per-point
/// [`visit_by_packed_value`](IntersectVisitor::visit_by_packed_value) calls at
/// the leaves; [`Relation::Outside`] skips the cell.
pub trait IntersectVisitor {
    /// Called for each doc in a cell the visitor reported as inside.
    fn visit(&mut self, doc_id: DocId);

    /// Called for each point of a crossing leaf, in (value, doc) order.
    fn visit_by_packed_value(&mut self, doc_id: DocId, packed_value: &[u8]);

    fn compare(&self, min_packed_value: &[u8], max_packed_value: &[u8]) -> Relation;

    /// Hint: about `count` more visits follow.
    fn grow(&mut self, _count: usize) {}
}

/// Read access to indexed points, keyed by field name.
///
/// Unknown fields are an error. A known field without points reports no
/// bounds, and intersecting it visits nothing.
pub trait PointValues {
    fn min_packed_value(&self, field: &str) -> Result<Option<&[u8]>>;

    fn max_packed_value(&self, field: &str) -> Result<Option<&[u8]>>;

    fn num_dimensions(&self, field: &str) -> Result<usize>;

    fn bytes_per_dimension(&self, field: &str) -> Result<usize>;

    /// Number of indexed points.
    fn size(&self, field: &str) -> Result<u64>;

    /// Number of distinct documents with at least one point.
    fn doc_count(&self, field: &str) -> Result<u32>;

    fn intersect(&self, field: &str, visitor: &mut dyn IntersectVisitor) -> Result<()>;
}
