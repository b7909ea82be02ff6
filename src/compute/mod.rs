//! Numeric building blocks shared by the geometry, tree and query layers.
//!
//! - [`encoding`]: order-preserving coordinate and numeric encodings
//! - [`distance`]: haversine sort keys, circle bounding boxes
//! - [`validation`]: coordinate and radius checks
//!
//! Nothing here touches index storage.

pub mod distance;
pub mod encoding;
pub mod validation;

pub use distance::{
    AXIS_LAT_ERROR, EARTH_MEAN_RADIUS_METERS, axis_lat, circle_to_bbox, haversin_meters,
    haversin_meters_from_sort_key, haversin_sort_key, min_sort_key_to_box,
};
pub use encoding::{
    MAX_LAT_INCL, MAX_LON_INCL, MIN_LAT_INCL, MIN_LON_INCL, TOLERANCE, decode_latitude,
    decode_longitude, encode_lat_lon, encode_latitude, encode_latitude_ceil, encode_longitude,
    encode_longitude_ceil,
};
pub use validation::{check_lat_lon, check_latitude, check_longitude, check_radius};
