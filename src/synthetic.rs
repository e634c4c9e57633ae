//! Deterministic synthetic soil model.
//!
//! Used whenever the remote provider is unavailable, and as the fill-in for
//! every field the provider does not measure. The generator hashes the
//! normalized coordinate with `frac(sin(seed + offset) * 10000)`; readings
//! stored by earlier versions depend on this exact transform, so it must not
//! be replaced by a "better" hash.

use crate::coordinates::{round_to, NormalizedCoordinate};
use crate::models::SoilProfile;

const NITROGEN: f64 = 1.0;
const PHOSPHORUS: f64 = 2.0;
const POTASSIUM: f64 = 3.0;
const PH: f64 = 4.0;
const MOISTURE: f64 = 5.0;
const ORGANIC_MATTER: f64 = 6.0;
const SULFUR: f64 = 7.0;
const ZINC: f64 = 8.0;

/// Seed derived from a normalized coordinate.
pub fn seed(coord: &NormalizedCoordinate) -> f64 {
    (coord.lat * coord.lng * 1000.0).abs()
}

/// Pseudo-random value in [0, 1) for one field offset.
///
/// `libm::sin` keeps the result identical across platforms and toolchains.
pub fn unit_value(seed: f64, offset: f64) -> f64 {
    let x = libm::sin(seed + offset) * 10000.0;
    x - x.floor()
}

/// Generates the complete synthetic profile for a grid cell.
pub fn generate(coord: &NormalizedCoordinate) -> SoilProfile {
    let seed = seed(coord);
    let u = |offset| unit_value(seed, offset);

    SoilProfile {
        nitrogen: 20.0 + (u(NITROGEN) * 60.0).floor(),
        phosphorus: 10.0 + (u(PHOSPHORUS) * 40.0).floor(),
        potassium: 100.0 + (u(POTASSIUM) * 200.0).floor(),
        ph: round_to(5.5 + u(PH) * 2.5, 1),
        moisture: 20.0 + (u(MOISTURE) * 40.0).floor(),
        organic_matter: round_to(1.0 + u(ORGANIC_MATTER) * 4.0, 1),
        sulfur: round_to(10.0 + (u(SULFUR) * 40.0).floor(), 1),
        zinc: round_to(0.5 + u(ZINC) * 4.5, 2),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord(lat: f64, lng: f64) -> NormalizedCoordinate {
        NormalizedCoordinate { lat, lng }
    }

    #[test]
    fn test_seed_is_symmetric_in_sign() {
        assert_eq!(seed(&coord(25.7, 88.65)), seed(&coord(-25.7, 88.65)));
        assert_eq!(seed(&coord(0.0, 88.65)), 0.0);
    }

    #[test]
    fn test_unit_value_range() {
        for offset in 1..=8 {
            for s in [0.0, 1.5, 2278.305, 98765.4321] {
                let u = unit_value(s, offset as f64);
                assert!((0.0..1.0).contains(&u), "u = {} for seed {}", u, s);
            }
        }
    }

    #[test]
    fn test_generate_is_deterministic() {
        let c = coord(25.70, 88.65);
        let a = generate(&c);
        let b = generate(&c);
        assert_eq!(a, b);
        assert_eq!(a.nitrogen.to_bits(), b.nitrogen.to_bits());
        assert_eq!(a.zinc.to_bits(), b.zinc.to_bits());
    }

    #[test]
    fn test_nearby_cells_differ() {
        assert_ne!(generate(&coord(25.70, 88.65)), generate(&coord(25.71, 88.65)));
    }

    #[test]
    fn test_integer_fields_are_whole_numbers() {
        let p = generate(&coord(23.81, 90.41));
        for v in [p.nitrogen, p.phosphorus, p.potassium, p.moisture, p.sulfur] {
            assert_eq!(v, v.trunc());
        }
    }
}
