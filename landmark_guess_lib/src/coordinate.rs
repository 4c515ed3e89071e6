use geo_types::Point;

/// A position in degrees.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

// geo-types stores x as longitude and y as latitude
impl From<Coordinate> for Point {
    fn from(coordinate: Coordinate) -> Self {
        Point::new(coordinate.lng, coordinate.lat)
    }
}

impl From<Point> for Coordinate {
    fn from(point: Point) -> Self {
        Coordinate::new(point.y(), point.x())
    }
}

#[test]
fn validity_bounds() {
    assert!(Coordinate::new(52.2497, 21.0122).is_valid());
    assert!(Coordinate::new(-90.0, 180.0).is_valid());
    assert!(!Coordinate::new(90.5, 0.0).is_valid());
    assert!(!Coordinate::new(0.0, -180.1).is_valid());
    assert!(!Coordinate::new(f64::NAN, 0.0).is_valid());
}

#[test]
fn point_conversion_swaps_axes() {
    let point: Point = Coordinate::new(52.0, 21.0).into();
    assert_eq!(point.x(), 21.0);
    assert_eq!(point.y(), 52.0);
    assert_eq!(Coordinate::from(point), Coordinate::new(52.0, 21.0));
}
