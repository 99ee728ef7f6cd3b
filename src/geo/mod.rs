// Local tangent-frame geodesy for formation replay.
//
// Formation skydives span a few hundred meters, so latitude/longitude deltas
// are converted to meters with the WGS84 radii of curvature at the origin
// latitude instead of a full ellipsoidal projection. Round-trip error at
// those ranges is well under a meter.

use std::f64::consts::PI;

use crate::decoder::GeoPosition;

const DTOR: f64 = PI / 180.0;
const RTOD: f64 = 180.0 / PI;

/// WGS84 ellipsoid semi-major axis in meters
const WGS84_A: f64 = 6_378_137.0;

/// WGS84 ellipsoid flattening factor
const WGS84_F: f64 = 1.0 / 298.257_223_563;

/// WGS84 ellipsoid eccentricity squared
fn wgs84_ecc_sq() -> f64 {
    let b = WGS84_A * (1.0 - WGS84_F);
    1.0 - (b * b) / (WGS84_A * WGS84_A)
}

/// Meridional (north-south) radius of curvature at a latitude, meters.
fn meridional_radius(lat_rad: f64) -> f64 {
    let e2 = wgs84_ecc_sq();
    let s = lat_rad.sin();
    WGS84_A * (1.0 - e2) / (1.0 - e2 * s * s).powf(1.5)
}

/// Prime-vertical (east-west) radius of curvature at a latitude, meters.
fn prime_vertical_radius(lat_rad: f64) -> f64 {
    let e2 = wgs84_ecc_sq();
    let s = lat_rad.sin();
    WGS84_A / (1.0 - e2 * s * s).sqrt()
}

/// A point in a formation's shared frame: meters forward along the jump run,
/// right of it, and up from the origin altitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalPoint {
    pub forward_m: f64,
    pub right_m: f64,
    pub up_m: f64,
}

/// Cartesian frame anchored at the base jumper's exit point, with "forward"
/// aligned to the group's direction of travel.
///
/// Pure value type: both mappings are plain functions of the origin and
/// bearing, which is what makes the round-trip law testable.
#[derive(Debug, Clone, Copy)]
pub struct LocalFrame {
    origin: GeoPosition,
    bearing_deg: f64,
    // Cached at construction, all functions of origin latitude.
    m_radius: f64,
    pv_radius: f64,
    cos_lat: f64,
    sin_bearing: f64,
    cos_bearing: f64,
}

impl LocalFrame {
    /// `bearing_deg` is the jump run's ground track, degrees true.
    pub fn new(origin: GeoPosition, bearing_deg: f64) -> Self {
        let lat_rad = origin.lat_deg * DTOR;
        let bearing_rad = bearing_deg * DTOR;
        LocalFrame {
            origin,
            bearing_deg,
            m_radius: meridional_radius(lat_rad),
            pv_radius: prime_vertical_radius(lat_rad),
            cos_lat: lat_rad.cos(),
            sin_bearing: bearing_rad.sin(),
            cos_bearing: bearing_rad.cos(),
        }
    }

    pub fn origin(&self) -> GeoPosition {
        self.origin
    }

    pub fn bearing_deg(&self) -> f64 {
        self.bearing_deg
    }

    pub fn to_local(&self, position: &GeoPosition) -> LocalPoint {
        let north_m = (position.lat_deg - self.origin.lat_deg) * DTOR * self.m_radius;
        let east_m = (position.lon_deg - self.origin.lon_deg) * DTOR * self.pv_radius * self.cos_lat;
        LocalPoint {
            forward_m: north_m * self.cos_bearing + east_m * self.sin_bearing,
            right_m: east_m * self.cos_bearing - north_m * self.sin_bearing,
            up_m: position.alt_m - self.origin.alt_m,
        }
    }

    pub fn to_geodetic(&self, point: &LocalPoint) -> GeoPosition {
        let north_m = point.forward_m * self.cos_bearing - point.right_m * self.sin_bearing;
        let east_m = point.forward_m * self.sin_bearing + point.right_m * self.cos_bearing;
        GeoPosition {
            lat_deg: self.origin.lat_deg + north_m / self.m_radius * RTOD,
            lon_deg: self.origin.lon_deg + east_m / (self.pv_radius * self.cos_lat) * RTOD,
            alt_m: self.origin.alt_m + point.up_m,
        }
    }
}
