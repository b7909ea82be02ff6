//! Precomputed lattice over a polygon set's bounding box.
//!
//! Each leaf cell of a `grid_size x grid_size` lattice records whether it is
//! fully inside, fully outside, or on the boundary of the polygons. Cells are
//! resolved top-down through a quad-tree so large uniform regions cost one
//! relation. Inner quad-tree nodes keep their answer too, which lets
//! [`PolygonGrid::relate`] stop early on big query boxes.
//!
//! All bounds are in the encoded integer space used by the point tree.

use crate::compute::encoding::{decode_latitude, decode_longitude, latitude_to_int, longitude_to_int};
use crate::config::Config;
use crate::error::{Result, SpatioError};
use crate::geometry::{EdgeTree, Polygon, Rectangle};
use bitflags::bitflags;
use log::debug;
use spatio_types::Relation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellState {
    Unknown,
    Inside,
    Outside,
}

impl From<Relation> for CellState {
    fn from(relation: Relation) -> Self {
        match relation {
            Relation::Inside => CellState::Inside,
            Relation::Outside => CellState::Outside,
            Relation::Crosses => CellState::Unknown,
        }
    }
}

bitflags! {
    /// Kinds of cells seen while scanning a query range.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Coverage: u8 {
        const INSIDE = 0b001;
        const OUTSIDE = 0b010;
        const UNKNOWN = 0b100;
    }
}

impl Coverage {
    #[inline]
    fn is_mixed(self) -> bool {
        self.contains(Coverage::INSIDE | Coverage::OUTSIDE)
    }
}

/// Half-open range of cell indexes `[min_lat, max_lat) x [min_lon, max_lon)`.
#[derive(Debug, Clone, Copy)]
struct CellRange {
    min_lat: usize,
    max_lat: usize,
    min_lon: usize,
    max_lon: usize,
}

/// Inclusive range of cell indexes touched by a query.
#[derive(Debug, Clone, Copy)]
struct QueryCells {
    min_lat: usize,
    max_lat: usize,
    min_lon: usize,
    max_lon: usize,
}

/// How much of a grid was resolved at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridStats {
    pub grid_size: usize,
    pub resolved_leaves: usize,
    pub inside_leaves: usize,
    pub total_leaves: usize,
}

impl GridStats {
    pub fn resolved_ratio(&self) -> f64 {
        self.resolved_leaves as f64 / self.total_leaves as f64
    }
}

/// Cached containment answers for a set of polygons.
///
/// # Examples
///
/// ```
/// use spatio_points::compute::encoding::{encode_latitude, encode_longitude};
/// use spatio_points::{Polygon, PolygonGrid};
///
/// let square = Polygon::new(
///     vec![0.0, 0.0, 10.0, 10.0, 0.0],
///     vec![0.0, 10.0, 10.0, 0.0, 0.0],
/// )
/// .unwrap();
/// let grid = PolygonGrid::from_polygons(&[square], 32).unwrap();
/// let lat = encode_latitude(5.0).unwrap();
/// let lon = encode_longitude(5.0).unwrap();
/// assert!(grid.contains(lat, lon));
/// ```
#[derive(Debug, Clone)]
pub struct PolygonGrid {
    min_lat: i32,
    max_lat: i32,
    min_lon: i32,
    max_lon: i32,
    size: usize,
    lat_per_cell: i64,
    lon_per_cell: i64,
    /// answers for inner quad-tree nodes, by node id
    nodes: Vec<CellState>,
    /// answers for leaf cells, by `lat_index * size + lon_index`
    leaves: Vec<CellState>,
    trees: Vec<EdgeTree>,
}

impl PolygonGrid {
    pub const DEFAULT_SIZE: usize = 32;

    pub fn new(
        min_lat: i32,
        max_lat: i32,
        min_lon: i32,
        max_lon: i32,
        polygons: &[Polygon],
    ) -> Result<Self> {
        Self::with_size(min_lat, max_lat, min_lon, max_lon, polygons, Self::DEFAULT_SIZE)
    }

    pub fn with_size(
        min_lat: i32,
        max_lat: i32,
        min_lon: i32,
        max_lon: i32,
        polygons: &[Polygon],
        size: usize,
    ) -> Result<Self> {
        if min_lon > max_lon {
            return Err(SpatioError::invalid("Grid cannot cross the dateline"));
        }
        if min_lat > max_lat {
            return Err(SpatioError::invalid(format!(
                "bogus bounding box: minLat {} > maxLat {}",
                min_lat, max_lat
            )));
        }
        if polygons.is_empty() {
            return Err(SpatioError::invalid("polygons must not be empty"));
        }
        if !size.is_power_of_two() || !(2..=Config::MAX_GRID_SIZE).contains(&size) {
            return Err(SpatioError::invalid(format!(
                "grid size must be a power of two between 2 and {}, got: {}",
                Config::MAX_GRID_SIZE,
                size
            )));
        }

        // one extra unit per cell so the last cell reaches max and no cell is empty
        let lat_per_cell = (max_lat as i64 - min_lat as i64) / size as i64 + 1;
        let lon_per_cell = (max_lon as i64 - min_lon as i64) / size as i64 + 1;

        let mut grid = PolygonGrid {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
            size,
            lat_per_cell,
            lon_per_cell,
            nodes: vec![CellState::Unknown; size * size],
            leaves: vec![CellState::Unknown; size * size],
            trees: EdgeTree::build(polygons),
        };
        grid.fill(
            1,
            CellRange {
                min_lat: 0,
                max_lat: size,
                min_lon: 0,
                max_lon: size,
            },
        );

        let stats = grid.stats();
        debug!(
            "Built {}x{} polygon grid over {} polygons: {}/{} leaf cells resolved ({} inside)",
            size,
            size,
            polygons.len(),
            stats.resolved_leaves,
            stats.total_leaves,
            stats.inside_leaves
        );
        Ok(grid)
    }

    /// Grid over the encoded union bounding box of the polygons, widened by
    /// the coordinate tolerance so vertices never sit on the grid's edge.
    pub fn from_polygons(polygons: &[Polygon], size: usize) -> Result<Self> {
        let bbox = Rectangle::from_polygons_with_tolerance(polygons)?;
        Self::with_size(
            latitude_to_int(bbox.min_lat),
            latitude_to_int(bbox.max_lat),
            longitude_to_int(bbox.min_lon),
            longitude_to_int(bbox.max_lon),
            polygons,
            size,
        )
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Encoded bounds `(min_lat, max_lat, min_lon, max_lon)`.
    pub fn bounds(&self) -> (i32, i32, i32, i32) {
        (self.min_lat, self.max_lat, self.min_lon, self.max_lon)
    }

    pub fn stats(&self) -> GridStats {
        let resolved_leaves = self
            .leaves
            .iter()
            .filter(|&&s| s != CellState::Unknown)
            .count();
        let inside_leaves = self
            .leaves
            .iter()
            .filter(|&&s| s == CellState::Inside)
            .count();
        GridStats {
            grid_size: self.size,
            resolved_leaves,
            inside_leaves,
            total_leaves: self.leaves.len(),
        }
    }

    #[inline]
    fn leaf_node_start(&self) -> usize {
        self.size * self.size
    }

    fn fill(&mut self, node_id: usize, cells: CellRange) {
        let cell_min_lat = self.min_lat as i64 + cells.min_lat as i64 * self.lat_per_cell;
        let cell_min_lon = self.min_lon as i64 + cells.min_lon as i64 * self.lon_per_cell;

        let relation = if cell_min_lat > self.max_lat as i64 || cell_min_lon > self.max_lon as i64 {
            // entirely past the bounding box: no point can land here
            Relation::Outside
        } else {
            let cell_max_lat = (self.max_lat as i64)
                .min(self.min_lat as i64 + cells.max_lat as i64 * self.lat_per_cell - 1);
            let cell_max_lon = (self.max_lon as i64)
                .min(self.min_lon as i64 + cells.max_lon as i64 * self.lon_per_cell - 1);
            EdgeTree::relate_any(
                &self.trees,
                decode_latitude(cell_min_lat as i32),
                decode_latitude(cell_max_lat as i32),
                decode_longitude(cell_min_lon as i32),
                decode_longitude(cell_max_lon as i32),
            )
        };

        if relation != Relation::Crosses {
            let state = CellState::from(relation);
            if node_id < self.leaf_node_start() {
                self.nodes[node_id] = state;
            }
            for lat in cells.min_lat..cells.max_lat {
                let row = lat * self.size;
                self.leaves[row + cells.min_lon..row + cells.max_lon].fill(state);
            }
        } else if cells.max_lat - cells.min_lat > 1 {
            let mid_lat = (cells.min_lat + cells.max_lat) / 2;
            let mid_lon = (cells.min_lon + cells.max_lon) / 2;
            for (i, quadrant) in Self::quadrants(cells, mid_lat, mid_lon).into_iter().enumerate() {
                self.fill(4 * node_id + i, quadrant);
            }
        }
        // else: a single boundary cell, left unknown
    }

    fn quadrants(cells: CellRange, mid_lat: usize, mid_lon: usize) -> [CellRange; 4] {
        [
            CellRange {
                max_lat: mid_lat,
                max_lon: mid_lon,
                ..cells
            },
            CellRange {
                max_lat: mid_lat,
                min_lon: mid_lon,
                ..cells
            },
            CellRange {
                min_lat: mid_lat,
                max_lon: mid_lon,
                ..cells
            },
            CellRange {
                min_lat: mid_lat,
                min_lon: mid_lon,
                ..cells
            },
        ]
    }

    #[inline]
    fn lat_cell(&self, lat: i32) -> usize {
        ((lat as i64 - self.min_lat as i64) / self.lat_per_cell) as usize
    }

    #[inline]
    fn lon_cell(&self, lon: i32) -> usize {
        ((lon as i64 - self.min_lon as i64) / self.lon_per_cell) as usize
    }

    /// True if the encoded point is inside one of the polygons.
    pub fn contains(&self, latitude: i32, longitude: i32) -> bool {
        if latitude < self.min_lat
            || latitude > self.max_lat
            || longitude < self.min_lon
            || longitude > self.max_lon
        {
            return false;
        }
        let index = self.lat_cell(latitude) * self.size + self.lon_cell(longitude);
        match self.leaves[index] {
            CellState::Inside => true,
            CellState::Outside => false,
            CellState::Unknown => EdgeTree::contains_any(
                &self.trees,
                decode_latitude(latitude),
                decode_longitude(longitude),
            ),
        }
    }

    /// Relation of an encoded query box to the polygons.
    pub fn relate(&self, min_lat: i32, max_lat: i32, min_lon: i32, max_lon: i32) -> Relation {
        if max_lon < self.min_lon
            || min_lon > self.max_lon
            || max_lat < self.min_lat
            || min_lat > self.max_lat
        {
            return Relation::Outside;
        }
        // the query encloses us
        if min_lat <= self.min_lat
            && max_lat >= self.max_lat
            && min_lon <= self.min_lon
            && max_lon >= self.max_lon
        {
            return Relation::Crosses;
        }

        let within = min_lat >= self.min_lat
            && max_lat <= self.max_lat
            && min_lon >= self.min_lon
            && max_lon <= self.max_lon;
        let query = QueryCells {
            min_lat: self.lat_cell(min_lat.max(self.min_lat)),
            max_lat: self.lat_cell(max_lat.min(self.max_lat)),
            min_lon: self.lon_cell(min_lon.max(self.min_lon)),
            max_lon: self.lon_cell(max_lon.min(self.max_lon)),
        };
        let root = CellRange {
            min_lat: 0,
            max_lat: self.size,
            min_lon: 0,
            max_lon: self.size,
        };

        let mut coverage = self.relate_cells(1, &query, root);
        if !within {
            // part of the query lies outside the bounding box
            coverage |= Coverage::OUTSIDE;
        }

        if coverage.is_mixed() {
            Relation::Crosses
        } else if coverage.contains(Coverage::UNKNOWN) {
            EdgeTree::relate_any(
                &self.trees,
                decode_latitude(min_lat),
                decode_latitude(max_lat),
                decode_longitude(min_lon),
                decode_longitude(max_lon),
            )
        } else if coverage == Coverage::INSIDE {
            Relation::Inside
        } else {
            Relation::Outside
        }
    }

    fn relate_cells(&self, node_id: usize, query: &QueryCells, cells: CellRange) -> Coverage {
        if node_id >= self.leaf_node_start() {
            return match self.leaves[cells.min_lat * self.size + cells.min_lon] {
                CellState::Inside => Coverage::INSIDE,
                CellState::Outside => Coverage::OUTSIDE,
                CellState::Unknown => Coverage::UNKNOWN,
            };
        }
        match self.nodes[node_id] {
            CellState::Inside => return Coverage::INSIDE,
            CellState::Outside => return Coverage::OUTSIDE,
            CellState::Unknown => {}
        }

        let mid_lat = (cells.min_lat + cells.max_lat) / 2;
        let mid_lon = (cells.min_lon + cells.max_lon) / 2;
        let wanted = [
            query.min_lat < mid_lat && query.min_lon < mid_lon,
            query.min_lat < mid_lat && query.max_lon >= mid_lon,
            query.max_lat >= mid_lat && query.min_lon < mid_lon,
            query.max_lat >= mid_lat && query.max_lon >= mid_lon,
        ];

        let mut coverage = Coverage::empty();
        for (i, quadrant) in Self::quadrants(cells, mid_lat, mid_lon).into_iter().enumerate() {
            if !wanted[i] {
                continue;
            }
            coverage |= self.relate_cells(4 * node_id + i, query, quadrant);
            if coverage.is_mixed() {
                break;
            }
        }
        coverage
    }
}
