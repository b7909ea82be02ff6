//! Builder for multi-field point indexes.
//!
//! Points are buffered per field and bulk-loaded into one [`BkdTree`] per
//! field on [`PointsBuilder::build`].

use crate::compute::encoding::{BYTES_PER_DIM, LAT_LON_DIMS, encode_lat_lon};
use crate::config::Config;
use crate::error::{Result, SpatioError};
use crate::points::{DocId, PointsReader, TreeBuilder};
use log::debug;
use rustc_hash::FxHashMap;
use std::collections::hash_map::Entry;

#[cfg(doc)]
use crate::points::BkdTree;

/// Collects points for several fields and builds a [`PointsReader`].
///
/// The first point added to a field fixes its layout; later points must
/// match it.
#[derive(Debug)]
pub struct PointsBuilder {
    config: Config,
    fields: FxHashMap<String, TreeBuilder>,
}

impl PointsBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            fields: FxHashMap::default(),
        }
    }

    /// Set the index configuration (leaf size, grid size, nearest tuning).
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Index a lat/lon point for `doc_id`.
    pub fn add_lat_lon(
        &mut self,
        field: &str,
        doc_id: DocId,
        latitude: f64,
        longitude: f64,
    ) -> Result<()> {
        let packed = encode_lat_lon(latitude, longitude)?;
        self.field(field, LAT_LON_DIMS, BYTES_PER_DIM)?
            .add(doc_id, &packed)
    }

    /// Index a one-dimensional value of `packed.len()` sortable bytes.
    pub fn add_packed(&mut self, field: &str, doc_id: DocId, packed: &[u8]) -> Result<()> {
        self.add_point(field, doc_id, 1, packed)
    }

    /// Index a point of `num_dims` equally wide dimensions.
    pub fn add_point(
        &mut self,
        field: &str,
        doc_id: DocId,
        num_dims: usize,
        packed: &[u8],
    ) -> Result<()> {
        if num_dims == 0 || packed.is_empty() || packed.len() % num_dims != 0 {
            return Err(SpatioError::invalid(format!(
                "packed value of {} bytes cannot be split into {} dims",
                packed.len(),
                num_dims
            )));
        }
        self.field(field, num_dims, packed.len() / num_dims)?
            .add(doc_id, packed)
    }

    /// Number of points buffered for `field`.
    pub fn len(&self, field: &str) -> usize {
        self.fields.get(field).map_or(0, TreeBuilder::len)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.values().all(TreeBuilder::is_empty)
    }

    fn field(&mut self, field: &str, num_dims: usize, bytes_per_dim: usize) -> Result<&mut TreeBuilder> {
        let builder = match self.fields.entry(field.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(TreeBuilder::new(num_dims, bytes_per_dim)?),
        };
        if builder.num_dimensions() != num_dims || builder.bytes_per_dimension() != bytes_per_dim {
            return Err(SpatioError::invalid(format!(
                "field \"{}\" has num_dims={} bytes_per_dim={}, got num_dims={} bytes_per_dim={}",
                field,
                builder.num_dimensions(),
                builder.bytes_per_dimension(),
                num_dims,
                bytes_per_dim
            )));
        }
        Ok(builder)
    }

    /// Build one tree per field.
    pub fn build(self) -> Result<PointsReader> {
        self.config.validate().map_err(SpatioError::Config)?;
        let mut reader = PointsReader::new();
        for (field, builder) in self.fields {
            let tree = builder.with_config(&self.config)?.build()?;
            debug!("Field \"{}\": {} points in {} leaves", field, tree.size(), tree.num_leaves());
            reader.insert(field, tree);
        }
        Ok(reader)
    }
}

impl Default for PointsBuilder {
    fn default() -> Self {
        Self::new()
    }
}
