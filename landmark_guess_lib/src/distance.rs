use crate::coordinate::Coordinate;

pub const EARTH_RADIUS_KM: f64 = 6371.0;
pub const EARTH_RADIUS_M: f64 = EARTH_RADIUS_KM * 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceUnit {
    #[default]
    Kilometers,
    Meters,
}

impl DistanceUnit {
    pub fn earth_radius(self) -> f64 {
        match self {
            DistanceUnit::Kilometers => EARTH_RADIUS_KM,
            DistanceUnit::Meters => EARTH_RADIUS_M,
        }
    }
}

/// Great-circle distance on a sphere, in the given unit.
pub fn haversine_distance(a: Coordinate, b: Coordinate, unit: DistanceUnit) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();

    let hav = f64::sin(d_lat / 2.).powi(2)
        + f64::cos(lat1) * f64::cos(lat2) * f64::sin(d_lng / 2.).powi(2);

    // Rounding can push near-antipodal values just above 1
    let hav = hav.clamp(0., 1.);

    2. * unit.earth_radius() * f64::asin(f64::sqrt(hav))
}

pub fn distance_km(a: Coordinate, b: Coordinate) -> f64 {
    haversine_distance(a, b, DistanceUnit::Kilometers)
}

pub fn distance_m(a: Coordinate, b: Coordinate) -> f64 {
    haversine_distance(a, b, DistanceUnit::Meters)
}

#[test]
fn identical_points_are_zero() {
    let old_town = Coordinate::new(52.2497, 21.0122);
    assert_eq!(distance_km(old_town, old_town), 0.0);
    assert_eq!(distance_m(old_town, old_town), 0.0);
}

#[test]
fn distance_is_symmetric() {
    let pairs = [
        (Coordinate::new(52.2497, 21.0122), Coordinate::new(52.1641, 21.0901)),
        (Coordinate::new(-33.8688, 151.2093), Coordinate::new(51.5074, -0.1278)),
        (Coordinate::new(89.9, -179.9), Coordinate::new(-89.9, 179.9)),
    ];
    for (a, b) in pairs {
        assert!((distance_km(a, b) - distance_km(b, a)).abs() < 1e-9);
    }
}

#[test]
fn one_degree_of_latitude() {
    let d = distance_km(Coordinate::new(0., 0.), Coordinate::new(1., 0.));
    assert!((d - 111.195).abs() < 0.001, "{d}");
}

#[test]
fn antipodal_points_are_half_the_circumference() {
    let d = distance_km(Coordinate::new(0., 0.), Coordinate::new(0., 180.));
    assert!((d - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1e-6, "{d}");

    let d = distance_km(Coordinate::new(52.2297, 21.0122), Coordinate::new(-52.2297, -158.9878));
    assert!(d.is_finite());
    assert!((d - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1e-3, "{d}");
}

#[test]
fn meters_scale_kilometers() {
    let a = Coordinate::new(52.2497, 21.0122);
    let b = Coordinate::new(52.247, 21.015);
    assert!((distance_m(a, b) - distance_km(a, b) * 1000.).abs() < 1e-6);
    // Old Town Market Square to the Royal Castle
    assert!((0.3..0.4).contains(&distance_km(a, b)));
}
