//! Per-nutrient Low/Optimal/High classification.
//!
//! Emits localization keys only; resolving them to text is the client's job.

use crate::models::{NutrientAssessment, NutrientLevel, SoilProfile};

/// Solution key shared by every nutrient in the optimal band.
pub const OPTIMAL_SOLUTION_KEY: &str = "sol_Optimal";

/// A tracked soil property. Declaration order is the output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nutrient {
    Nitrogen,
    Phosphorus,
    Potassium,
    Sulfur,
    Zinc,
    OrganicMatter,
    Ph,
}

impl Nutrient {
    pub const ALL: [Nutrient; 7] = [
        Nutrient::Nitrogen,
        Nutrient::Phosphorus,
        Nutrient::Potassium,
        Nutrient::Sulfur,
        Nutrient::Zinc,
        Nutrient::OrganicMatter,
        Nutrient::Ph,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            Nutrient::Nitrogen => "Nitrogen (N)",
            Nutrient::Phosphorus => "Phosphorus (P)",
            Nutrient::Potassium => "Potassium (K)",
            Nutrient::Sulfur => "Sulfur (S)",
            Nutrient::Zinc => "Zinc (Zn)",
            Nutrient::OrganicMatter => "Organic Matter",
            Nutrient::Ph => "pH Level",
        }
    }

    /// Fragment used to build the reason and solution keys.
    fn key(&self) -> &'static str {
        match self {
            Nutrient::Nitrogen => "Nitrogen",
            Nutrient::Phosphorus => "Phosphorus",
            Nutrient::Potassium => "Potassium",
            Nutrient::Sulfur => "Sulfur",
            Nutrient::Zinc => "Zinc",
            Nutrient::OrganicMatter => "OrganicMatter",
            Nutrient::Ph => "pH",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Nutrient::Nitrogen | Nutrient::Phosphorus | Nutrient::Potassium => "mg/kg",
            Nutrient::Sulfur | Nutrient::Zinc => "ppm",
            Nutrient::OrganicMatter => "%",
            Nutrient::Ph => "",
        }
    }

    /// `(low, high)`: below `low` is Low, above `high` is High, bounds inclusive Optimal.
    pub fn thresholds(&self) -> (f64, f64) {
        match self {
            Nutrient::Nitrogen => (30.0, 60.0),
            Nutrient::Phosphorus => (15.0, 30.0),
            Nutrient::Potassium => (120.0, 200.0),
            Nutrient::Sulfur => (15.0, 30.0),
            Nutrient::Zinc => (1.0, 3.0),
            Nutrient::OrganicMatter => (2.0, 4.0),
            Nutrient::Ph => (6.0, 7.5),
        }
    }

    pub fn value_in(&self, profile: &SoilProfile) -> f64 {
        match self {
            Nutrient::Nitrogen => profile.nitrogen,
            Nutrient::Phosphorus => profile.phosphorus,
            Nutrient::Potassium => profile.potassium,
            Nutrient::Sulfur => profile.sulfur,
            Nutrient::Zinc => profile.zinc,
            Nutrient::OrganicMatter => profile.organic_matter,
            Nutrient::Ph => profile.ph,
        }
    }

    pub fn reason_key(&self) -> String {
        format!("reason_{}", self.key())
    }

    pub fn solution_key(&self, level: NutrientLevel) -> String {
        match level {
            NutrientLevel::Optimal => OPTIMAL_SOLUTION_KEY.to_string(),
            NutrientLevel::Low | NutrientLevel::High => {
                format!("sol_{}_{}", self.key(), level.as_str())
            }
        }
    }

    pub fn assess(&self, value: f64) -> NutrientAssessment {
        let (low, high) = self.thresholds();
        let level = level_for(value, low, high);
        NutrientAssessment {
            nutrient: self.display_name().to_string(),
            level,
            value,
            unit: self.unit().to_string(),
            reason_key: self.reason_key(),
            solution_key: self.solution_key(level),
        }
    }
}

pub fn level_for(value: f64, low: f64, high: f64) -> NutrientLevel {
    if value < low {
        NutrientLevel::Low
    } else if value > high {
        NutrientLevel::High
    } else {
        NutrientLevel::Optimal
    }
}

/// Classifies every tracked nutrient in the fixed order N, P, K, S, Zn,
/// Organic Matter, pH.
pub fn classify(profile: &SoilProfile) -> Vec<NutrientAssessment> {
    Nutrient::ALL
        .iter()
        .map(|nutrient| nutrient.assess(nutrient.value_in(profile)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> SoilProfile {
        SoilProfile {
            nitrogen: 45.0,
            phosphorus: 12.0,
            potassium: 250.0,
            ph: 6.0,
            moisture: 40.0,
            organic_matter: 4.1,
            sulfur: 15.0,
            zinc: 0.9,
        }
    }

    #[test]
    fn test_nitrogen_levels() {
        assert_eq!(Nutrient::Nitrogen.assess(25.0).level, NutrientLevel::Low);
        assert_eq!(Nutrient::Nitrogen.assess(45.0).level, NutrientLevel::Optimal);
        assert_eq!(Nutrient::Nitrogen.assess(70.0).level, NutrientLevel::High);
    }

    #[test]
    fn test_bounds_are_optimal() {
        assert_eq!(Nutrient::Nitrogen.assess(30.0).level, NutrientLevel::Optimal);
        assert_eq!(Nutrient::Nitrogen.assess(60.0).level, NutrientLevel::Optimal);
        assert_eq!(Nutrient::Ph.assess(7.5).level, NutrientLevel::Optimal);
        assert_eq!(Nutrient::Ph.assess(7.6).level, NutrientLevel::High);
    }

    #[test]
    fn test_classify_order_and_keys() {
        let assessments = classify(&profile());
        let names: Vec<&str> = assessments.iter().map(|a| a.nutrient.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Nitrogen (N)",
                "Phosphorus (P)",
                "Potassium (K)",
                "Sulfur (S)",
                "Zinc (Zn)",
                "Organic Matter",
                "pH Level"
            ]
        );

        let phosphorus = &assessments[1];
        assert_eq!(phosphorus.level, NutrientLevel::Low);
        assert_eq!(phosphorus.reason_key, "reason_Phosphorus");
        assert_eq!(phosphorus.solution_key, "sol_Phosphorus_Low");

        let potassium = &assessments[2];
        assert_eq!(potassium.solution_key, "sol_Potassium_High");

        let organic = &assessments[5];
        assert_eq!(organic.level, NutrientLevel::High);
        assert_eq!(organic.solution_key, "sol_OrganicMatter_High");
        assert_eq!(organic.unit, "%");

        let ph = &assessments[6];
        assert_eq!(ph.level, NutrientLevel::Optimal);
        assert_eq!(ph.unit, "");
        assert_eq!(ph.reason_key, "reason_pH");
        assert_eq!(ph.solution_key, OPTIMAL_SOLUTION_KEY);
    }

    #[test]
    fn test_reason_key_independent_of_level() {
        assert_eq!(
            Nutrient::Zinc.assess(0.2).reason_key,
            Nutrient::Zinc.assess(5.0).reason_key
        );
        assert_eq!(Nutrient::Zinc.assess(0.2).solution_key, "sol_Zinc_Low");
        assert_eq!(Nutrient::Ph.assess(5.2).solution_key, "sol_pH_Low");
    }
}
