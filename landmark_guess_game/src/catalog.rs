use landmark_guess_lib::{coordinate::Coordinate, landmark::Landmark};
use rand::{seq::SliceRandom, Rng};

use crate::GameError;

pub const VARIANTS_PER_ATTRACTION: i64 = 10;
const VARIANT_OFFSET_DEG: f64 = 0.0002;

const WARSAW_ATTRACTIONS: [(i64, &str, f64, f64); 51] = [
    (1, "Old Town Market Square", 52.2497, 21.0122),
    (2, "Royal Castle", 52.247, 21.015),
    (3, "Łazienki Park", 52.2167, 21.0412),
    (4, "Palace of Culture and Science", 52.2318, 21.0067),
    (5, "POLIN Museum of the History of Polish Jews", 52.2491, 20.9939),
    (6, "Copernicus Science Centre", 52.2415, 21.0289),
    (7, "National Museum in Warsaw", 52.2313, 21.0222),
    (8, "Warsaw Uprising Museum", 52.2329, 20.9846),
    (9, "Wilanów Palace", 52.1641, 21.0901),
    (10, "Praga Museum of Warsaw", 52.2508, 21.0394),
    (11, "Neon Museum", 52.2478, 21.0558),
    (12, "Złote Tarasy", 52.2291, 21.0012),
    (13, "Saski Garden", 52.2432, 21.0077),
    (14, "PGE Narodowy Stadium", 52.2395, 21.0453),
    (15, "University Library Gardens", 52.2408, 21.0223),
    (16, "Chopin Museum", 52.2353, 21.0226),
    (17, "Presidential Palace", 52.243, 21.0194),
    (18, "Holy Cross Church", 52.2409, 21.0188),
    (19, "Sigismund's Column", 52.2472, 21.0159),
    (20, "Warsaw Barbican", 52.2506, 21.0081),
    (21, "St. Anne's Church", 52.2476, 21.0145),
    (22, "Museum of Warsaw", 52.2499, 21.0125),
    (23, "Vistula Boulevards", 52.244, 21.026),
    (24, "Krakowskie Przedmieście", 52.2418, 21.0197),
    (25, "Nożyk Synagogue", 52.2352, 20.9989),
    (26, "Hala Koszyki", 52.2257, 21.0156),
    (27, "Plac Zbawiciela", 52.2217, 21.017),
    (28, "Plac Grzybowski", 52.233, 21.001),
    (29, "Muranów District Murals", 52.247, 20.9975),
    (30, "Museum of Modern Art Temporary Pavilion", 52.2346, 21.0098),
    (31, "Norblin Factory", 52.2313, 20.9918),
    (32, "Koneser Vodka Factory", 52.2554, 21.0442),
    (33, "Służewiec Horse Racetrack", 52.1813, 20.9984),
    (34, "Pole Mokotowskie Park", 52.2102, 20.9915),
    (35, "Pole Mokotowskie Library", 52.2065, 20.9855),
    (36, "Fort Sokolnickiego", 52.2683, 20.9836),
    (37, "Żoliborz Officers' District", 52.2665, 20.9897),
    (38, "Arkadia Shopping Mall", 52.2587, 20.9856),
    (39, "Powązki Cemetery", 52.2555, 20.9839),
    (40, "Powiśle Power Station", 52.2367, 21.0272),
    (41, "Saska Kępa Café Street", 52.2397, 21.055),
    (42, "Czerniakowskie Lake", 52.1958, 21.0634),
    (43, "Gocław Balaton Park", 52.2204, 21.0776),
    (44, "Ursynów Cultural Center", 52.1463, 21.0375),
    (45, "Wola Park Shopping Center", 52.243, 20.9216),
    (46, "Blue City Shopping Center", 52.2203, 20.9722),
    (47, "Fort Bema", 52.2504, 20.9308),
    (48, "Kampinos Forest Edge", 52.3091, 20.8092),
    (49, "Modlin Fortress", 52.4334, 20.716),
    (50, "Zegrze Reservoir Marina", 52.4426, 21.0357),
    (51, "Otwock Wooden Architecture Trail", 52.1067, 21.2697),
];

/// Read-only set of landmarks that sessions draw their rounds from.
#[derive(Debug, Clone)]
pub struct LandmarkCatalog {
    landmarks: Vec<Landmark>,
}

impl LandmarkCatalog {
    pub fn new(landmarks: Vec<Landmark>) -> Self {
        Self { landmarks }
    }

    /// The Warsaw attractions, each expanded into `VARIANTS_PER_ATTRACTION` slightly shifted copies.
    /// Variant ids are `base_id * 100 + variant`.
    pub fn warsaw() -> Self {
        let landmarks = WARSAW_ATTRACTIONS
            .iter()
            .flat_map(|&(id, name, lat, lng)| {
                (0..VARIANTS_PER_ATTRACTION).map(move |variant| {
                    let name = if variant == 0 {
                        name.to_string()
                    } else {
                        format!("{} ({})", name, variant + 1)
                    };
                    let offset = variant as f64 * VARIANT_OFFSET_DEG;
                    let position = Coordinate::new(round_6(lat + offset), round_6(lng + offset));
                    Landmark::new(id * 100 + variant, name, position)
                })
            })
            .collect();

        Self { landmarks }
    }

    pub fn len(&self) -> usize {
        self.landmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }

    pub fn landmarks(&self) -> &[Landmark] {
        &self.landmarks
    }

    pub fn get(&self, id: i64) -> Option<&Landmark> {
        self.landmarks.iter().find(|landmark| landmark.id == id)
    }

    /// Uniform shuffle of the whole catalog, then the first `count`. Never returns a partial set.
    pub fn sample<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> Result<Vec<Landmark>, GameError> {
        if count > self.landmarks.len() {
            return Err(GameError::InsufficientData {
                requested: count,
                available: self.landmarks.len(),
            });
        }

        let mut pool = self.landmarks.clone();
        pool.shuffle(rng);
        pool.truncate(count);

        Ok(pool)
    }
}

/// Id of the attraction a variant was derived from.
pub fn base_id(landmark_id: i64) -> i64 {
    landmark_id / 100
}

fn round_6(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}

#[cfg(test)]
use rand::{rngs::StdRng, SeedableRng};
#[cfg(test)]
use std::collections::HashSet;

#[test]
fn warsaw_catalog_has_all_variants() {
    let catalog = LandmarkCatalog::warsaw();
    assert_eq!(catalog.len(), 510);

    let ids: HashSet<i64> = catalog.landmarks().iter().map(|landmark| landmark.id).collect();
    assert_eq!(ids.len(), 510);

    let castle = catalog.get(200).unwrap();
    assert_eq!(castle.name, "Royal Castle");
    assert_eq!(castle.position, Coordinate::new(52.247, 21.015));

    let variant = catalog.get(203).unwrap();
    assert_eq!(variant.name, "Royal Castle (4)");
    assert_eq!(variant.position, Coordinate::new(52.2476, 21.0156));
    assert_eq!(base_id(variant.id), 2);
}

#[test]
fn sample_is_duplicate_free() {
    let catalog = LandmarkCatalog::warsaw();
    let mut rng = StdRng::seed_from_u64(7);

    let sample = catalog.sample(60, &mut rng).unwrap();
    assert_eq!(sample.len(), 60);

    let ids: HashSet<i64> = sample.iter().map(|landmark| landmark.id).collect();
    assert_eq!(ids.len(), 60);
}

#[test]
fn sample_whole_catalog() {
    let catalog = LandmarkCatalog::warsaw();
    let mut rng = StdRng::seed_from_u64(1);
    assert_eq!(catalog.sample(510, &mut rng).unwrap().len(), 510);
    assert!(catalog.sample(0, &mut rng).unwrap().is_empty());
}

#[test]
fn oversampling_fails() {
    let catalog = LandmarkCatalog::warsaw();
    let mut rng = StdRng::seed_from_u64(1);

    match catalog.sample(511, &mut rng) {
        Err(GameError::InsufficientData { requested, available }) => {
            assert_eq!(requested, 511);
            assert_eq!(available, 510);
        }
        other => panic!("expected InsufficientData, got {other:?}"),
    }
}

#[test]
fn seeded_sampling_is_reproducible() {
    let catalog = LandmarkCatalog::warsaw();
    let first = catalog.sample(10, &mut StdRng::seed_from_u64(42)).unwrap();
    let second = catalog.sample(10, &mut StdRng::seed_from_u64(42)).unwrap();
    assert_eq!(first, second);
}
