//! Inclusive n-dimensional range over sortable bytes.

use crate::compute::encoding::{
    double_to_sortable_long, int_to_sortable_bytes, long_to_sortable_bytes,
};
use crate::error::{Result, SpatioError};
use crate::points::{MAX_BYTES_PER_DIM, MAX_DIMS, PackedValue};
use crate::query::ShapePredicate;
use spatio_types::Relation;

/// Points whose every dimension lies in `[lower, upper]`.
///
/// Works on any field, not just lat/lon: values are compared as unsigned
/// bytes, which is the order the `*_to_sortable_bytes` encoders produce. A
/// dimension with `lower > upper` matches nothing.
#[derive(Debug, Clone)]
pub struct RangeQuery {
    num_dims: usize,
    bytes_per_dim: usize,
    lower: PackedValue,
    upper: PackedValue,
}

impl RangeQuery {
    pub fn new(lower: &[u8], upper: &[u8], num_dims: usize) -> Result<Self> {
        if num_dims == 0 || num_dims > MAX_DIMS {
            return Err(SpatioError::invalid(format!(
                "num_dims must be 1..={} (got: {})",
                MAX_DIMS, num_dims
            )));
        }
        if lower.len() != upper.len() {
            return Err(SpatioError::invalid(format!(
                "lower and upper must have the same length (got: {} and {})",
                lower.len(),
                upper.len()
            )));
        }
        if lower.is_empty() || lower.len() % num_dims != 0 {
            return Err(SpatioError::invalid(format!(
                "bound length {} is not a multiple of num_dims={}",
                lower.len(),
                num_dims
            )));
        }
        let bytes_per_dim = lower.len() / num_dims;
        if bytes_per_dim > MAX_BYTES_PER_DIM {
            return Err(SpatioError::invalid(format!(
                "bytes_per_dim must be 1..={} (got: {})",
                MAX_BYTES_PER_DIM, bytes_per_dim
            )));
        }
        Ok(Self {
            num_dims,
            bytes_per_dim,
            lower: PackedValue::from_slice(lower),
            upper: PackedValue::from_slice(upper),
        })
    }

    /// Range over points packed with [`int_to_sortable_bytes`].
    pub fn ints(lower: &[i32], upper: &[i32]) -> Result<Self> {
        Self::encoded(lower, upper, 4, |value, dest, offset| {
            int_to_sortable_bytes(*value, dest, offset)
        })
    }

    /// Range over points packed with [`long_to_sortable_bytes`].
    pub fn longs(lower: &[i64], upper: &[i64]) -> Result<Self> {
        Self::encoded(lower, upper, 8, |value, dest, offset| {
            long_to_sortable_bytes(*value, dest, offset)
        })
    }

    /// Range over doubles packed as sortable longs. NaN bounds are rejected.
    pub fn doubles(lower: &[f64], upper: &[f64]) -> Result<Self> {
        if lower.iter().chain(upper).any(|v| v.is_nan()) {
            return Err(SpatioError::invalid("range bounds must not be NaN"));
        }
        Self::encoded(lower, upper, 8, |value, dest, offset| {
            long_to_sortable_bytes(double_to_sortable_long(*value), dest, offset)
        })
    }

    fn encoded<T>(
        lower: &[T],
        upper: &[T],
        width: usize,
        encode: impl Fn(&T, &mut [u8], usize),
    ) -> Result<Self> {
        let pack = |values: &[T]| {
            let mut packed = vec![0u8; values.len() * width];
            for (i, value) in values.iter().enumerate() {
                encode(value, &mut packed, i * width);
            }
            packed
        };
        Self::new(&pack(lower), &pack(upper), lower.len().max(1))
    }

    pub fn lower(&self) -> &[u8] {
        &self.lower
    }

    pub fn upper(&self) -> &[u8] {
        &self.upper
    }

    #[inline]
    fn dim<'a>(&self, packed: &'a [u8], dim: usize) -> &'a [u8] {
        let offset = dim * self.bytes_per_dim;
        &packed[offset..offset + self.bytes_per_dim]
    }
}

impl ShapePredicate for RangeQuery {
    fn relate(&self, min_packed: &[u8], max_packed: &[u8]) -> Relation {
        let mut crosses = false;
        for dim in 0..self.num_dims {
            let lower = self.dim(&self.lower, dim);
            let upper = self.dim(&self.upper, dim);
            let cell_min = self.dim(min_packed, dim);
            let cell_max = self.dim(max_packed, dim);
            if lower > upper || cell_max < lower || cell_min > upper {
                return Relation::Outside;
            }
            crosses |= cell_min < lower || cell_max > upper;
        }
        if crosses {
            Relation::Crosses
        } else {
            Relation::Inside
        }
    }

    fn matches(&self, packed: &[u8]) -> bool {
        (0..self.num_dims).all(|dim| {
            let value = self.dim(packed, dim);
            value >= self.dim(&self.lower, dim) && value <= self.dim(&self.upper, dim)
        })
    }

    fn num_dimensions(&self) -> usize {
        self.num_dims
    }

    fn bytes_per_dimension(&self) -> usize {
        self.bytes_per_dim
    }
}
