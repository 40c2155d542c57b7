//! Great-circle geometry on the WGS-84 mean sphere.
//!
//! All rendering math projects along forward azimuths and measures distances
//! over the mean radius; results are bit-for-bit repeatable across calls.

/// A polar coordinate, in degrees.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct LatLon {
	pub lat: f64,
	pub lon: f64,
}

impl LatLon {
	pub fn new(lat: f64, lon: f64) -> Self { Self { lat, lon } }
}

/// Mean radius of the WGS-84 ellipsoid.
pub const WGS84_MEAN_RADIUS_M: f64 = 6_371_008.8;
pub const METERS_PER_NAUTICAL_MILE: f64 = 1852.0;
pub const FEET_PER_NAUTICAL_MILE: f64 = 6076.12;

pub fn deg2rad(degrees: f64) -> f64 { degrees * std::f64::consts::PI / 180.0 }

pub fn rad2deg(radians: f64) -> f64 { radians * 180.0 / std::f64::consts::PI }

/// Wraps a heading into `[0, 360)`.
pub fn normalize_heading(heading: f64) -> f64 {
	let wrapped = heading % 360.0;
	if wrapped < 0.0 {
		wrapped + 360.0
	} else {
		wrapped
	}
}

/// Projects `position` along `bearing_deg` over `distance_m` meters using the
/// spherical forward-azimuth formula.
pub fn project_wgs84(position: LatLon, bearing_deg: f64, distance_m: f64) -> LatLon {
	let angular = distance_m / WGS84_MEAN_RADIUS_M;
	let bearing = deg2rad(bearing_deg);
	let lat = deg2rad(position.lat);
	let lon = deg2rad(position.lon);

	let projected_lat = (lat.sin() * angular.cos() + lat.cos() * angular.sin() * bearing.cos()).asin();
	let projected_lon = lon
		+ (bearing.sin() * angular.sin() * lat.cos()).atan2(angular.cos() - lat.sin() * projected_lat.sin());

	LatLon {
		lat: rad2deg(projected_lat),
		lon: rad2deg(projected_lon),
	}
}

/// Haversine distance between two coordinates, in nautical miles.
pub fn distance_wgs84(from: LatLon, to: LatLon) -> f64 {
	let lat_delta = deg2rad(to.lat - from.lat);
	let lon_delta = deg2rad(to.lon - from.lon);

	let a = (lat_delta / 2.0).sin().powi(2)
		+ deg2rad(from.lat).cos() * deg2rad(to.lat).cos() * (lon_delta / 2.0).sin().powi(2);
	let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

	WGS84_MEAN_RADIUS_M * c / METERS_PER_NAUTICAL_MILE
}

#[cfg(test)]
mod tests {
	use approx::assert_relative_eq;

	use super::*;

	#[test]
	fn heading_wraps_into_range() {
		assert_eq!(normalize_heading(0.0), 0.0);
		assert_eq!(normalize_heading(360.0), 0.0);
		assert_eq!(normalize_heading(725.0), 5.0);
		assert_eq!(normalize_heading(-90.0), 270.0);
	}

	#[test]
	fn projection_round_trips_through_inverse_bearing() {
		let start = LatLon::new(47.26081085, 11.34965897);
		let out = project_wgs84(start, 260.0, 18_520.0);
		let back = project_wgs84(out, normalize_heading(260.0 + 180.0), 18_520.0);

		// Within a meter of the original position.
		let error_nm = distance_wgs84(start, back);
		assert!(error_nm * METERS_PER_NAUTICAL_MILE < 1.0, "round trip error {} nm", error_nm);
	}

	#[test]
	fn distance_matches_projection() {
		let start = LatLon::new(47.0, 11.0);
		let out = project_wgs84(start, 45.0, 10.0 * METERS_PER_NAUTICAL_MILE);
		assert_relative_eq!(distance_wgs84(start, out), 10.0, max_relative = 1e-6);
	}

	#[test]
	fn results_are_repeatable() {
		let start = LatLon::new(-33.94, 18.6);
		let first = project_wgs84(start, 123.4, 56_789.0);
		let second = project_wgs84(start, 123.4, 56_789.0);
		assert_eq!(first, second);
		assert_eq!(distance_wgs84(start, first), distance_wgs84(start, second));
	}
}
