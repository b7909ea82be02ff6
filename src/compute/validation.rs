//! Validation for geographic coordinates and distances.

use crate::compute::encoding::{MAX_LAT_INCL, MAX_LON_INCL, MIN_LAT_INCL, MIN_LON_INCL};
use crate::error::{Result, SpatioError};

/// Returns true if the latitude is finite and within [-90.0, 90.0].
#[inline]
pub fn is_valid_latitude(latitude: f64) -> bool {
    !latitude.is_nan() && (MIN_LAT_INCL..=MAX_LAT_INCL).contains(&latitude)
}

/// Returns true if the longitude is finite and within [-180.0, 180.0].
#[inline]
pub fn is_valid_longitude(longitude: f64) -> bool {
    !longitude.is_nan() && (MIN_LON_INCL..=MAX_LON_INCL).contains(&longitude)
}

/// Validates a latitude.
///
/// # Examples
///
/// ```
/// use spatio_points::compute::validation::check_latitude;
///
/// assert!(check_latitude(45.0).is_ok());
/// assert!(check_latitude(90.0).is_ok());
/// assert!(check_latitude(90.5).is_err());
/// assert!(check_latitude(f64::NAN).is_err());
/// ```
pub fn check_latitude(latitude: f64) -> Result<()> {
    if !is_valid_latitude(latitude) {
        log::warn!("Rejecting invalid latitude {}", latitude);
        return Err(SpatioError::InvalidArgument(format!(
            "invalid latitude {}; must be between {} and {}",
            latitude, MIN_LAT_INCL, MAX_LAT_INCL
        )));
    }
    Ok(())
}

/// Validates a longitude.
///
/// # Examples
///
/// ```
/// use spatio_points::compute::validation::check_longitude;
///
/// assert!(check_longitude(-180.0).is_ok());
/// assert!(check_longitude(180.1).is_err());
/// ```
pub fn check_longitude(longitude: f64) -> Result<()> {
    if !is_valid_longitude(longitude) {
        log::warn!("Rejecting invalid longitude {}", longitude);
        return Err(SpatioError::InvalidArgument(format!(
            "invalid longitude {}; must be between {} and {}",
            longitude, MIN_LON_INCL, MAX_LON_INCL
        )));
    }
    Ok(())
}

/// Validates both coordinates of a point.
pub fn check_lat_lon(latitude: f64, longitude: f64) -> Result<()> {
    check_latitude(latitude)?;
    check_longitude(longitude)
}

/// Validates a search radius in meters: it must be finite and non-negative.
///
/// # Examples
///
/// ```
/// use spatio_points::compute::validation::check_radius;
///
/// assert!(check_radius(0.0).is_ok());
/// let err = check_radius(-1.0).unwrap_err();
/// assert!(err.to_string().contains("radiusMeters"));
/// ```
pub fn check_radius(radius_meters: f64) -> Result<()> {
    if !radius_meters.is_finite() || radius_meters < 0.0 {
        log::warn!("Rejecting invalid radius {}", radius_meters);
        return Err(SpatioError::InvalidArgument(format!(
            "radiusMeters: '{}' is invalid",
            radius_meters
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latitude_bounds_are_inclusive() {
        assert!(check_latitude(-90.0).is_ok());
        assert!(check_latitude(90.0).is_ok());
        assert!(check_latitude(-90.000001).is_err());
        assert!(check_latitude(f64::INFINITY).is_err());
    }

    #[test]
    fn test_longitude_bounds_are_inclusive() {
        assert!(check_longitude(-180.0).is_ok());
        assert!(check_longitude(180.0).is_ok());
        assert!(check_longitude(180.000001).is_err());
        assert!(check_longitude(f64::NAN).is_err());
    }

    #[test]
    fn test_invalid_latitude_kind() {
        let err = check_lat_lon(91.0, 0.0).unwrap_err();
        assert!(matches!(err, SpatioError::InvalidArgument(_)));
        assert!(err.to_string().contains("latitude"));
    }

    #[test]
    fn test_negative_radius() {
        let err = check_radius(-1.0).unwrap_err();
        assert!(err.to_string().contains("radiusMeters"));
        assert!(err.to_string().contains("is invalid"));
    }

    #[test]
    fn test_nan_radius() {
        let err = check_radius(f64::NAN).unwrap_err();
        assert!(err.to_string().contains("is invalid"));
    }

    #[test]
    fn test_inf_radius() {
        assert!(check_radius(f64::INFINITY).is_err());
        assert!(check_radius(f64::NEG_INFINITY).is_err());
    }
}
