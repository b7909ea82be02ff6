//! # spatio-types
//!
//! Shared value types for the spatio point index.
//!
//! - **Relations**: [`Relation`], the three-way answer every index cell gets
//!   when compared against a query shape
//! - **Points**: [`LatLon`], a latitude/longitude pair in degrees
//!
//! All types are serializable with Serde and convert to and from the `geo`
//! crate's primitives.
//!
//! ## Examples
//!
//! ```rust
//! use spatio_types::{LatLon, Relation};
//!
//! let nyc = LatLon::new(40.7128, -74.0060);
//! let point: geo::Point = nyc.into();
//! assert_eq!(point.x(), -74.0060);
//!
//! assert!(Relation::Crosses.needs_exact_test());
//! ```

pub mod point;
pub mod relation;

pub use point::LatLon;
pub use relation::Relation;
