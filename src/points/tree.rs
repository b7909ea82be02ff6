//! The static block k-d tree and its bulk builder.
//!
//! The tree is implicit and complete: node 1 is the root, node `n` has
//! children `2n` and `2n + 1`, and ids from `num_leaves` up are leaves. Inner
//! nodes only keep their split dimension and split value; points live in leaf
//! blocks behind a [`BlockSource`].

use crate::config::Config;
use crate::error::{Result, SpatioError};
use crate::points::block::{BlockSource, LeafBlock};
use crate::points::{DocId, IntersectVisitor, MAX_BYTES_PER_DIM, MAX_DIMS, PackedValue};
use bytes::{Bytes, BytesMut};
use log::debug;
use rustc_hash::FxHashSet;
use spatio_types::Relation;
use std::cmp::Ordering;
use std::io::Write;

/// Read-only block k-d tree over one field.
#[derive(Debug, Clone)]
pub struct BkdTree<S = Bytes> {
    num_dims: usize,
    bytes_per_dim: usize,
    num_leaves: usize,
    /// split dimension by inner node id
    split_dims: Vec<u8>,
    /// split value by inner node id, `bytes_per_dim` each
    split_values: Vec<u8>,
    /// leaf `i` occupies `[leaf_offsets[i], leaf_offsets[i + 1])`
    leaf_offsets: Vec<u64>,
    min_packed_value: PackedValue,
    max_packed_value: PackedValue,
    point_count: u64,
    doc_count: u32,
    source: S,
}

impl<S> BkdTree<S> {
    pub fn num_dimensions(&self) -> usize {
        self.num_dims
    }

    pub fn bytes_per_dimension(&self) -> usize {
        self.bytes_per_dim
    }

    pub fn packed_bytes_length(&self) -> usize {
        self.num_dims * self.bytes_per_dim
    }

    /// Number of indexed points.
    pub fn size(&self) -> u64 {
        self.point_count
    }

    pub fn doc_count(&self) -> u32 {
        self.doc_count
    }

    pub fn num_leaves(&self) -> usize {
        self.num_leaves
    }

    pub fn is_empty(&self) -> bool {
        self.point_count == 0
    }

    pub fn min_packed_value(&self) -> Option<&[u8]> {
        (!self.is_empty()).then_some(&self.min_packed_value[..])
    }

    pub fn max_packed_value(&self) -> Option<&[u8]> {
        (!self.is_empty()).then_some(&self.max_packed_value[..])
    }

    /// Bounds of the whole tree, or `None` when it holds no points.
    pub fn root_cell(&self) -> Option<(PackedValue, PackedValue)> {
        (!self.is_empty()).then(|| (self.min_packed_value.clone(), self.max_packed_value.clone()))
    }

    #[inline]
    pub fn is_leaf_node(&self, node_id: usize) -> bool {
        node_id >= self.num_leaves
    }

    #[inline]
    pub fn split_dimension(&self, node_id: usize) -> usize {
        self.split_dims[node_id] as usize
    }

    #[inline]
    pub fn split_value(&self, node_id: usize) -> &[u8] {
        let start = node_id * self.bytes_per_dim;
        &self.split_values[start..start + self.bytes_per_dim]
    }

    /// Writes the split value of `node_id` into its dimension of `packed`.
    pub fn copy_split_value(&self, node_id: usize, packed: &mut [u8]) {
        let offset = self.split_dimension(node_id) * self.bytes_per_dim;
        packed[offset..offset + self.bytes_per_dim].copy_from_slice(self.split_value(node_id));
    }

    /// Bounds of the two children of an inner node: returns the left child's
    /// max and the right child's min. The other bounds are the parent's.
    pub fn split_cell(
        &self,
        node_id: usize,
        cell_min: &[u8],
        cell_max: &[u8],
    ) -> (PackedValue, PackedValue) {
        let mut left_max = PackedValue::from_slice(cell_max);
        self.copy_split_value(node_id, &mut left_max);
        let mut right_min = PackedValue::from_slice(cell_min);
        self.copy_split_value(node_id, &mut right_min);
        (left_max, right_min)
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Total size of all leaf blocks.
    pub fn blocks_len(&self) -> u64 {
        self.leaf_offsets.last().copied().unwrap_or(0)
    }

    /// Same tree reading its leaf blocks from another source, such as a file
    /// written by [`BkdTree::write_blocks`].
    pub fn with_source<T: BlockSource>(self, source: T) -> Result<BkdTree<T>> {
        if source.len() != self.blocks_len() {
            return Err(SpatioError::CorruptIndex(format!(
                "block source holds {} bytes, tree expects {}",
                source.len(),
                self.blocks_len()
            )));
        }
        Ok(BkdTree {
            num_dims: self.num_dims,
            bytes_per_dim: self.bytes_per_dim,
            num_leaves: self.num_leaves,
            split_dims: self.split_dims,
            split_values: self.split_values,
            leaf_offsets: self.leaf_offsets,
            min_packed_value: self.min_packed_value,
            max_packed_value: self.max_packed_value,
            point_count: self.point_count,
            doc_count: self.doc_count,
            source,
        })
    }
}

impl<S: BlockSource> BkdTree<S> {
    /// Reads and decodes the block of a leaf node.
    pub fn read_leaf(&self, node_id: usize) -> Result<LeafBlock> {
        debug_assert!(self.is_leaf_node(node_id));
        let leaf = node_id - self.num_leaves;
        let start = self.leaf_offsets[leaf];
        let len = (self.leaf_offsets[leaf + 1] - start) as usize;
        let block = self.source.read_block(start, len)?;
        LeafBlock::decode(block, self.packed_bytes_length())
    }

    /// Walks the tree depth first, asking the visitor to classify each cell.
    pub fn intersect(&self, visitor: &mut dyn IntersectVisitor) -> Result<()> {
        match self.root_cell() {
            Some((min, max)) => self.intersect_node(1, &min, &max, visitor),
            None => Ok(()),
        }
    }

    fn intersect_node(
        &self,
        node_id: usize,
        cell_min: &[u8],
        cell_max: &[u8],
        visitor: &mut dyn IntersectVisitor,
    ) -> Result<()> {
        match visitor.compare(cell_min, cell_max) {
            Relation::Outside => Ok(()),
            Relation::Inside => self.add_all(node_id, visitor),
            Relation::Crosses if self.is_leaf_node(node_id) => {
                self.visit_leaf_values(node_id, visitor)
            }
            Relation::Crosses => {
                let (left_max, right_min) = self.split_cell(node_id, cell_min, cell_max);
                self.intersect_node(2 * node_id, cell_min, &left_max, visitor)?;
                self.intersect_node(2 * node_id + 1, &right_min, cell_max, visitor)
            }
        }
    }

    fn add_all(&self, node_id: usize, visitor: &mut dyn IntersectVisitor) -> Result<()> {
        if self.is_leaf_node(node_id) {
            let block = self.read_leaf(node_id)?;
            visitor.grow(block.len());
            for &doc in block.docs() {
                visitor.visit(doc);
            }
            Ok(())
        } else {
            self.add_all(2 * node_id, visitor)?;
            self.add_all(2 * node_id + 1, visitor)
        }
    }

    /// Hands every point of a leaf to the visitor, in (value, doc) order.
    pub fn visit_leaf_values(
        &self,
        node_id: usize,
        visitor: &mut dyn IntersectVisitor,
    ) -> Result<()> {
        let block = self.read_leaf(node_id)?;
        visitor.grow(block.len());
        for (doc, packed) in block.iter() {
            visitor.visit_by_packed_value(doc, packed);
        }
        Ok(())
    }

    /// Copies all leaf blocks to `writer`, for reopening through
    /// [`BkdTree::with_source`].
    pub fn write_blocks<W: Write>(&self, writer: &mut W) -> Result<()> {
        let blocks = self.source.read_block(0, self.blocks_len() as usize)?;
        writer.write_all(&blocks)?;
        Ok(())
    }
}

/// Bulk builder for a [`BkdTree`].
///
/// # Examples
///
/// ```
/// use spatio_points::TreeBuilder;
///
/// let mut builder = TreeBuilder::new(1, 4).unwrap();
/// for doc in 0..100u32 {
///     builder.add(doc, &doc.to_be_bytes()).unwrap();
/// }
/// let tree = builder.build().unwrap();
/// assert_eq!(tree.size(), 100);
/// assert_eq!(tree.min_packed_value(), Some(&[0u8, 0, 0, 0][..]));
/// ```
#[derive(Debug, Clone)]
pub struct TreeBuilder {
    num_dims: usize,
    bytes_per_dim: usize,
    max_points_in_leaf_node: usize,
    docs: Vec<DocId>,
    values: Vec<u8>,
}

impl TreeBuilder {
    pub fn new(num_dims: usize, bytes_per_dim: usize) -> Result<Self> {
        if num_dims == 0 || num_dims > MAX_DIMS {
            return Err(SpatioError::invalid(format!(
                "num_dims must be 1 .. {} (got: {})",
                MAX_DIMS, num_dims
            )));
        }
        if bytes_per_dim == 0 || bytes_per_dim > MAX_BYTES_PER_DIM {
            return Err(SpatioError::invalid(format!(
                "bytes_per_dim must be 1 .. {} (got: {})",
                MAX_BYTES_PER_DIM, bytes_per_dim
            )));
        }
        Ok(Self {
            num_dims,
            bytes_per_dim,
            max_points_in_leaf_node: Config::default().max_points_in_leaf_node,
            docs: Vec::new(),
            values: Vec::new(),
        })
    }

    pub fn with_max_points_in_leaf_node(mut self, max_points: usize) -> Result<Self> {
        if max_points == 0 || max_points > Config::MAX_POINTS_IN_LEAF_NODE {
            return Err(SpatioError::invalid(format!(
                "max_points_in_leaf_node must be 1 .. {} (got: {})",
                Config::MAX_POINTS_IN_LEAF_NODE,
                max_points
            )));
        }
        self.max_points_in_leaf_node = max_points;
        Ok(self)
    }

    pub fn with_config(self, config: &Config) -> Result<Self> {
        self.with_max_points_in_leaf_node(config.max_points_in_leaf_node)
    }

    pub fn num_dimensions(&self) -> usize {
        self.num_dims
    }

    pub fn bytes_per_dimension(&self) -> usize {
        self.bytes_per_dim
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn add(&mut self, doc_id: DocId, packed_value: &[u8]) -> Result<()> {
        let expected = self.num_dims * self.bytes_per_dim;
        if packed_value.len() != expected {
            return Err(SpatioError::invalid(format!(
                "packed value must be {} bytes ({} dims x {} bytes), got: {}",
                expected,
                self.num_dims,
                self.bytes_per_dim,
                packed_value.len()
            )));
        }
        self.docs.push(doc_id);
        self.values.extend_from_slice(packed_value);
        Ok(())
    }

    pub fn build(self) -> Result<BkdTree<Bytes>> {
        let count = self.docs.len();
        let mut num_leaves = 1usize;
        let mut count_per_leaf = count;
        while count_per_leaf > self.max_points_in_leaf_node {
            count_per_leaf = count_per_leaf.div_ceil(2);
            num_leaves *= 2;
        }

        let packed_len = self.num_dims * self.bytes_per_dim;
        let mut min_packed_value = PackedValue::from_elem(0, packed_len);
        let mut max_packed_value = PackedValue::from_elem(0, packed_len);
        if count > 0 {
            min_packed_value.copy_from_slice(self.value(0));
            max_packed_value.copy_from_slice(self.value(0));
            for i in 1..count {
                for dim in 0..self.num_dims {
                    let v = self.dim_value(i as u32, dim);
                    let range = dim * self.bytes_per_dim..(dim + 1) * self.bytes_per_dim;
                    if v < &min_packed_value[range.clone()] {
                        min_packed_value[range.clone()].copy_from_slice(v);
                    }
                    if v > &max_packed_value[range.clone()] {
                        max_packed_value[range].copy_from_slice(v);
                    }
                }
            }
        }

        let mut splits = Splits {
            num_leaves,
            split_dims: vec![0u8; num_leaves],
            split_values: vec![0u8; num_leaves * self.bytes_per_dim],
            leaf_ranges: vec![(0, 0); num_leaves],
        };
        let mut order: Vec<u32> = (0..count as u32).collect();
        if count > 0 {
            self.build_node(&mut order, 1, 0, count, &mut splits);
        }

        let mut blocks = BytesMut::with_capacity(num_leaves * 4 + count * (4 + packed_len));
        let mut leaf_offsets = Vec::with_capacity(num_leaves + 1);
        leaf_offsets.push(0u64);
        for &(from, to) in &splits.leaf_ranges {
            let leaf = &mut order[from..to];
            leaf.sort_unstable_by(|&a, &b| {
                self.value(a as usize)
                    .cmp(self.value(b as usize))
                    .then(self.docs[a as usize].cmp(&self.docs[b as usize]))
            });
            LeafBlock::encode(
                &mut blocks,
                leaf.iter().map(|&i| self.docs[i as usize]),
                leaf.iter().map(|&i| self.value(i as usize)),
            );
            leaf_offsets.push(blocks.len() as u64);
        }

        let doc_count = self.docs.iter().collect::<FxHashSet<_>>().len() as u32;
        debug!(
            "Built BKD tree: {} points, {} docs, {} leaves, {} dims x {} bytes",
            count, doc_count, num_leaves, self.num_dims, self.bytes_per_dim
        );

        Ok(BkdTree {
            num_dims: self.num_dims,
            bytes_per_dim: self.bytes_per_dim,
            num_leaves,
            split_dims: splits.split_dims,
            split_values: splits.split_values,
            leaf_offsets,
            min_packed_value,
            max_packed_value,
            point_count: count as u64,
            doc_count,
            source: blocks.freeze(),
        })
    }

    #[inline]
    fn value(&self, index: usize) -> &[u8] {
        let len = self.num_dims * self.bytes_per_dim;
        &self.values[index * len..(index + 1) * len]
    }

    #[inline]
    fn dim_value(&self, index: u32, dim: usize) -> &[u8] {
        let start = dim * self.bytes_per_dim;
        &self.value(index as usize)[start..start + self.bytes_per_dim]
    }

    fn compare_dim(&self, a: u32, b: u32, dim: usize) -> Ordering {
        self.dim_value(a, dim)
            .cmp(self.dim_value(b, dim))
            .then(self.docs[a as usize].cmp(&self.docs[b as usize]))
    }

    /// Dimension whose values spread the widest over `points`.
    fn widest_dimension(&self, points: &[u32]) -> usize {
        let mut best_dim = 0;
        let mut best_spread = 0u128;
        for dim in 0..self.num_dims {
            let mut min = self.dim_value(points[0], dim);
            let mut max = min;
            for &p in &points[1..] {
                let v = self.dim_value(p, dim);
                if v < min {
                    min = v;
                }
                if v > max {
                    max = v;
                }
            }
            let spread = unsigned_value(max) - unsigned_value(min);
            if dim == 0 || spread > best_spread {
                best_dim = dim;
                best_spread = spread;
            }
        }
        best_dim
    }

    fn build_node(&self, order: &mut [u32], node_id: usize, from: usize, to: usize, splits: &mut Splits) {
        if node_id >= splits.num_leaves {
            splits.leaf_ranges[node_id - splits.num_leaves] = (from, to);
            return;
        }
        // leaf count never exceeds the point count, so no inner range is empty
        debug_assert!(to > from);

        let dim = self.widest_dimension(&order[from..to]);
        let mid = from + (to - from) / 2;
        order[from..to].select_nth_unstable_by(mid - from, |&a, &b| self.compare_dim(a, b, dim));

        splits.split_dims[node_id] = dim as u8;
        let start = node_id * self.bytes_per_dim;
        splits.split_values[start..start + self.bytes_per_dim]
            .copy_from_slice(self.dim_value(order[mid], dim));

        self.build_node(order, 2 * node_id, from, mid, splits);
        self.build_node(order, 2 * node_id + 1, mid, to, splits);
    }
}

struct Splits {
    num_leaves: usize,
    split_dims: Vec<u8>,
    split_values: Vec<u8>,
    leaf_ranges: Vec<(usize, usize)>,
}

/// Unsigned big-endian value of up to 16 bytes.
fn unsigned_value(bytes: &[u8]) -> u128 {
    bytes.iter().fold(0u128, |acc, &b| (acc << 8) | b as u128)
}
