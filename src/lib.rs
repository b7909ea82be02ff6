//! Block k-d point index with geospatial queries.
//!
//! Points are fixed-width packed values stored in a [`BkdTree`] whose leaves
//! live in a byte-addressable [`BlockSource`]. Lat/lon fields answer box,
//! polygon, distance and nearest-neighbor queries; any field answers
//! n-dimensional range queries.
//!
//! ```rust
//! use spatio_points::{BoxQuery, DistanceQuery, PointsBuilder, query};
//!
//! let mut builder = PointsBuilder::new();
//! builder.add_lat_lon("location", 0, 40.7128, -74.0060)?;
//! builder.add_lat_lon("location", 1, 40.7580, -73.9855)?;
//! builder.add_lat_lon("location", 2, 51.5074, -0.1278)?;
//! let reader = builder.build()?;
//!
//! let nyc = BoxQuery::new(40.0, 41.0, -75.0, -73.0)?;
//! assert_eq!(query::search(&reader, "location", &nyc)?, vec![0, 1]);
//!
//! let near_times_square = DistanceQuery::new(40.7580, -73.9855, 1_000.0)?;
//! assert_eq!(query::search(&reader, "location", &near_times_square)?, vec![1]);
//! # Ok::<(), spatio_points::SpatioError>(())
//! ```

pub mod builder;
pub mod compute;
pub mod config;
pub mod error;
pub mod geometry;
pub mod points;
pub mod query;
pub mod random;

pub use builder::PointsBuilder;
pub use config::{Config, NearestConfig};
pub use error::{Result, SpatioError};

pub use geometry::{EdgeTree, GridStats, Polygon, PolygonGrid, Rectangle};

pub use points::{
    BkdTree, BlockSource, DocId, FileBlockSource, IntersectVisitor, LeafBlock, NearestHit,
    NearestSegment, PointValues, PointsReader, TreeBuilder, nearest,
};

pub use query::{
    BoxQuery, DistanceQuery, LatLonQuery, PolygonQuery, RangeQuery, ShapePredicate,
};

pub use spatio_types::{LatLon, Relation};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {
    pub use crate::{Config, PointsBuilder, Result, SpatioError};

    pub use crate::{PointValues, PointsReader, nearest};

    pub use crate::query::{self, BoxQuery, DistanceQuery, PolygonQuery, RangeQuery};

    pub use crate::{LatLon, Polygon, Rectangle, Relation};
}
