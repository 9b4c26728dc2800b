//! Angle conventions. The AIR database reports source azimuth with 0° at
//! the listener's left, 90° straight ahead and 180° at the right, while
//! SOFA spherical coordinates put 0° straight ahead with positive angles
//! counterclockwise. Both conversions here are total over all finite
//! inputs.

/// Wraps an angle in degrees into the canonical `[-180, 180)` range.
///
/// Uses a Euclidean modulo, so the result is well defined for negative
/// inputs and for inputs beyond a full turn.
pub fn wrap_angle_pm180(deg: f64) -> f64 {
    (deg + 180.0).rem_euclid(360.0) - 180.0
}

/// Converts an AIR-convention azimuth to the SOFA convention, wrapped to
/// `[-180, 180)`.
pub fn air_to_sofa_azimuth(air_deg: f64) -> f64 {
    wrap_angle_pm180(90.0 - air_deg)
}
