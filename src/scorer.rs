//! Composite fertility index.
//!
//! Five binary gates worth 20 (good) or 10 (not good) points each, so the
//! index always lands in [50, 100]. The gates are deliberately coarser than
//! the classifier bands and do not have to agree with them: nitrogen 35 is
//! "Optimal" for the classifier but only earns 10 points here.

use crate::models::SoilProfile;

const GOOD: u8 = 20;
const POOR: u8 = 10;

/// Scores nitrogen, phosphorus, potassium, pH and organic matter.
/// Moisture, sulfur and zinc are informational and ignored.
pub fn fertility_index(profile: &SoilProfile) -> u8 {
    let gates = [
        profile.nitrogen > 40.0,
        profile.phosphorus > 20.0,
        profile.potassium > 150.0,
        (6.0..=7.5).contains(&profile.ph),
        profile.organic_matter > 2.0,
    ];

    gates
        .iter()
        .map(|good| if *good { GOOD } else { POOR })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(n: f64, p: f64, k: f64, ph: f64, om: f64) -> SoilProfile {
        SoilProfile {
            nitrogen: n,
            phosphorus: p,
            potassium: k,
            ph,
            moisture: 30.0,
            organic_matter: om,
            sulfur: 20.0,
            zinc: 2.0,
        }
    }

    #[test]
    fn test_all_good_scores_100() {
        assert_eq!(fertility_index(&profile(45.0, 25.0, 160.0, 6.8, 3.0)), 100);
    }

    #[test]
    fn test_all_poor_scores_50() {
        assert_eq!(fertility_index(&profile(20.0, 10.0, 100.0, 5.0, 1.0)), 50);
    }

    #[test]
    fn test_gates_are_strict_except_ph() {
        // Exactly on the threshold is not "good" for the strict gates.
        assert_eq!(fertility_index(&profile(40.0, 20.0, 150.0, 6.0, 2.0)), 60);
        assert_eq!(fertility_index(&profile(40.0, 20.0, 150.0, 7.5, 2.0)), 60);
        assert_eq!(fertility_index(&profile(40.0, 20.0, 150.0, 7.6, 2.0)), 50);
    }

    #[test]
    fn test_informational_fields_do_not_score() {
        let mut a = profile(45.0, 25.0, 160.0, 6.8, 3.0);
        let b = a;
        a.moisture = 99.0;
        a.sulfur = 0.0;
        a.zinc = 0.0;
        assert_eq!(fertility_index(&a), fertility_index(&b));
    }
}
