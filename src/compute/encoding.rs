//! Order-preserving integer encodings for coordinates and numeric dimensions.
//!
//! Latitude and longitude are quantized onto the full `i32` range, and every
//! integer is stored as big-endian bytes with the sign bit flipped, so that
//! unsigned byte comparison of packed values matches numeric order. A lat/lon
//! point packs into 8 bytes, latitude first.

use crate::compute::validation::{check_latitude, check_longitude};
use crate::error::{Result, SpatioError};

pub const MIN_LAT_INCL: f64 = -90.0;
pub const MAX_LAT_INCL: f64 = 90.0;
pub const MIN_LON_INCL: f64 = -180.0;
pub const MAX_LON_INCL: f64 = 180.0;

/// Amount by which polygon bounding boxes are widened to absorb round-off.
pub const TOLERANCE: f64 = 1E-6;

/// Bytes used by one encoded lat or lon dimension.
pub const BYTES_PER_DIM: usize = 4;
/// Number of dimensions of a lat/lon point.
pub const LAT_LON_DIMS: usize = 2;
/// Bytes of a packed lat/lon point.
pub const LAT_LON_BYTES: usize = LAT_LON_DIMS * BYTES_PER_DIM;

const LAT_SCALE: f64 = (1u64 << 32) as f64 / 180.0;
const LAT_DECODE: f64 = 1.0 / LAT_SCALE;
const LON_SCALE: f64 = (1u64 << 32) as f64 / 360.0;
const LON_DECODE: f64 = 1.0 / LON_SCALE;

/// Quantizes a latitude, rounding down.
///
/// # Examples
///
/// ```
/// use spatio_points::compute::encoding::{decode_latitude, encode_latitude};
///
/// let encoded = encode_latitude(40.7128).unwrap();
/// let decoded = decode_latitude(encoded);
/// assert!(decoded <= 40.7128);
/// assert!((decoded - 40.7128).abs() < 1e-7);
/// assert!(encode_latitude(91.0).is_err());
/// ```
pub fn encode_latitude(latitude: f64) -> Result<i32> {
    check_latitude(latitude)?;
    Ok(latitude_to_int(latitude))
}

/// Quantizes a latitude, rounding up.
///
/// Used for lower bounds: every encoded value at or above the result decodes
/// to at least `latitude`.
pub fn encode_latitude_ceil(latitude: f64) -> Result<i32> {
    check_latitude(latitude)?;
    let latitude = if latitude == MAX_LAT_INCL {
        latitude.next_down()
    } else {
        latitude
    };
    Ok((latitude / LAT_DECODE).ceil() as i32)
}

/// Quantizes a longitude, rounding down.
pub fn encode_longitude(longitude: f64) -> Result<i32> {
    check_longitude(longitude)?;
    Ok(longitude_to_int(longitude))
}

/// Quantizes a longitude, rounding up.
pub fn encode_longitude_ceil(longitude: f64) -> Result<i32> {
    check_longitude(longitude)?;
    let longitude = if longitude == MAX_LON_INCL {
        longitude.next_down()
    } else {
        longitude
    };
    Ok((longitude / LON_DECODE).ceil() as i32)
}

/// Encoding for values already known to be valid latitudes.
#[inline]
pub(crate) fn latitude_to_int(latitude: f64) -> i32 {
    debug_assert!((MIN_LAT_INCL..=MAX_LAT_INCL).contains(&latitude));
    // the maximum value cannot be represented without overflow
    let latitude = if latitude == MAX_LAT_INCL {
        latitude.next_down()
    } else {
        latitude
    };
    (latitude / LAT_DECODE).floor() as i32
}

/// Encoding for values already known to be valid longitudes.
#[inline]
pub(crate) fn longitude_to_int(longitude: f64) -> i32 {
    debug_assert!((MIN_LON_INCL..=MAX_LON_INCL).contains(&longitude));
    let longitude = if longitude == MAX_LON_INCL {
        longitude.next_down()
    } else {
        longitude
    };
    (longitude / LON_DECODE).floor() as i32
}

#[inline]
pub fn decode_latitude(encoded: i32) -> f64 {
    encoded as f64 * LAT_DECODE
}

#[inline]
pub fn decode_longitude(encoded: i32) -> f64 {
    encoded as f64 * LON_DECODE
}

/// Decodes the latitude stored at `offset` of a packed value.
#[inline]
pub fn decode_latitude_bytes(src: &[u8], offset: usize) -> f64 {
    decode_latitude(sortable_bytes_to_int(src, offset))
}

/// Decodes the longitude stored at `offset` of a packed value.
#[inline]
pub fn decode_longitude_bytes(src: &[u8], offset: usize) -> f64 {
    decode_longitude(sortable_bytes_to_int(src, offset))
}

/// Packs a validated lat/lon point into its 8-byte sortable form.
///
/// # Examples
///
/// ```
/// use spatio_points::compute::encoding::{decode_lat_lon, encode_lat_lon};
///
/// let packed = encode_lat_lon(-33.8688, 151.2093).unwrap();
/// let (lat, lon) = decode_lat_lon(&packed);
/// assert!((lat + 33.8688).abs() < 1e-7);
/// assert!((lon - 151.2093).abs() < 1e-7);
/// ```
pub fn encode_lat_lon(latitude: f64, longitude: f64) -> Result<[u8; LAT_LON_BYTES]> {
    let mut packed = [0u8; LAT_LON_BYTES];
    int_to_sortable_bytes(encode_latitude(latitude)?, &mut packed, 0);
    int_to_sortable_bytes(encode_longitude(longitude)?, &mut packed, BYTES_PER_DIM);
    Ok(packed)
}

/// Returns the encoded (lat, lon) integers of a packed point.
#[inline]
pub fn decode_lat_lon_ints(packed: &[u8]) -> (i32, i32) {
    (
        sortable_bytes_to_int(packed, 0),
        sortable_bytes_to_int(packed, BYTES_PER_DIM),
    )
}

/// Returns the decoded (lat, lon) degrees of a packed point.
#[inline]
pub fn decode_lat_lon(packed: &[u8]) -> (f64, f64) {
    (
        decode_latitude_bytes(packed, 0),
        decode_longitude_bytes(packed, BYTES_PER_DIM),
    )
}

#[inline]
pub fn int_to_sortable_bytes(value: i32, dest: &mut [u8], offset: usize) {
    let sortable = (value as u32) ^ 0x8000_0000;
    dest[offset..offset + 4].copy_from_slice(&sortable.to_be_bytes());
}

#[inline]
pub fn sortable_bytes_to_int(src: &[u8], offset: usize) -> i32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&src[offset..offset + 4]);
    (u32::from_be_bytes(buf) ^ 0x8000_0000) as i32
}

#[inline]
pub fn long_to_sortable_bytes(value: i64, dest: &mut [u8], offset: usize) {
    let sortable = (value as u64) ^ 0x8000_0000_0000_0000;
    dest[offset..offset + 8].copy_from_slice(&sortable.to_be_bytes());
}

#[inline]
pub fn sortable_bytes_to_long(src: &[u8], offset: usize) -> i64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&src[offset..offset + 8]);
    (u64::from_be_bytes(buf) ^ 0x8000_0000_0000_0000) as i64
}

/// Maps a double onto an `i64` whose signed order matches the double order.
///
/// NaN sorts above positive infinity; `-0.0` sorts just below `0.0`.
#[inline]
pub fn double_to_sortable_long(value: f64) -> i64 {
    sortable_double_bits(value.to_bits() as i64)
}

#[inline]
pub fn sortable_long_to_double(encoded: i64) -> f64 {
    f64::from_bits(sortable_double_bits(encoded) as u64)
}

#[inline]
fn sortable_double_bits(bits: i64) -> i64 {
    bits ^ ((bits >> 63) & 0x7fff_ffff_ffff_ffff)
}

/// Linear quantizer for an arbitrary bounded axis.
///
/// Scales `[min, max]` onto the full `i32` range so that generic numeric
/// dimensions (elevation, time, ...) can share the 4-byte packed layout used
/// for lat/lon.
///
/// # Examples
///
/// ```
/// use spatio_points::compute::encoding::AxisEncoder;
///
/// let altitude = AxisEncoder::new(-11_000.0, 100_000.0).unwrap();
/// let low = altitude.encode(10.0).unwrap();
/// let high = altitude.encode(20.0).unwrap();
/// assert!(low < high);
/// assert!((altitude.decode(low) - 10.0).abs() < 1e-4);
/// assert!(altitude.encode(200_000.0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisEncoder {
    min: f64,
    max: f64,
    scale: f64,
}

impl AxisEncoder {
    pub fn new(min: f64, max: f64) -> Result<Self> {
        if !min.is_finite() || !max.is_finite() || min >= max {
            return Err(SpatioError::InvalidArgument(format!(
                "axis bounds must be finite with min < max, got: [{}, {}]",
                min, max
            )));
        }
        Ok(Self {
            min,
            max,
            scale: (1u64 << 32) as f64 / (max - min),
        })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn is_valid(&self, value: f64) -> bool {
        !value.is_nan() && (self.min..=self.max).contains(&value)
    }

    /// Quantizes a value, rounding down.
    pub fn encode(&self, value: f64) -> Result<i32> {
        if !self.is_valid(value) {
            return Err(SpatioError::InvalidArgument(format!(
                "value {} is outside of axis bounds [{}, {}]",
                value, self.min, self.max
            )));
        }
        let steps = ((value - self.min) * self.scale).floor() as i64;
        Ok((steps + i32::MIN as i64).min(i32::MAX as i64) as i32)
    }

    pub fn decode(&self, encoded: i32) -> f64 {
        self.min + (encoded as i64 - i32::MIN as i64) as f64 / self.scale
    }
}
