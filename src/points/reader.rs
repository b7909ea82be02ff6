//! Per-field access to a set of trees.

use crate::error::{Result, SpatioError};
use crate::points::block::BlockSource;
use crate::points::tree::BkdTree;
use crate::points::{IntersectVisitor, PointValues};
use bytes::Bytes;
use rustc_hash::FxHashMap;

/// Trees keyed by field name.
#[derive(Debug, Clone)]
pub struct PointsReader<S = Bytes> {
    fields: FxHashMap<String, BkdTree<S>>,
}

impl<S> PointsReader<S> {
    pub fn new() -> Self {
        Self {
            fields: FxHashMap::default(),
        }
    }

    /// Adds or replaces the tree of a field.
    pub fn insert(&mut self, field: impl Into<String>, tree: BkdTree<S>) -> Option<BkdTree<S>> {
        self.fields.insert(field.into(), tree)
    }

    pub fn tree(&self, field: &str) -> Result<&BkdTree<S>> {
        self.fields
            .get(field)
            .ok_or_else(|| SpatioError::invalid(format!("unknown field \"{}\"", field)))
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<S> Default for PointsReader<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: BlockSource> PointValues for PointsReader<S> {
    fn min_packed_value(&self, field: &str) -> Result<Option<&[u8]>> {
        Ok(self.tree(field)?.min_packed_value())
    }

    fn max_packed_value(&self, field: &str) -> Result<Option<&[u8]>> {
        Ok(self.tree(field)?.max_packed_value())
    }

    fn num_dimensions(&self, field: &str) -> Result<usize> {
        Ok(self.tree(field)?.num_dimensions())
    }

    fn bytes_per_dimension(&self, field: &str) -> Result<usize> {
        Ok(self.tree(field)?.bytes_per_dimension())
    }

    fn size(&self, field: &str) -> Result<u64> {
        Ok(self.tree(field)?.size())
    }

    fn doc_count(&self, field: &str) -> Result<u32> {
        Ok(self.tree(field)?.doc_count())
    }

    fn intersect(&self, field: &str, visitor: &mut dyn IntersectVisitor) -> Result<()> {
        self.tree(field)?.intersect(visitor)
    }
}
