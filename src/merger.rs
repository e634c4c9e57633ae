//! Overlays provider measurements on the synthetic profile of the same cell.

use crate::models::{ReadingSource, SoilProfile};
use crate::provider::{ProviderOutcome, ProviderReading};

/// A complete profile plus where it came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergedProfile {
    pub profile: SoilProfile,
    pub source: ReadingSource,
}

/// Every field the provider returned replaces the synthetic value; every
/// other field keeps it. Total: the synthetic side is always complete.
pub fn merge(outcome: &ProviderOutcome, synthetic: SoilProfile) -> MergedProfile {
    match outcome {
        ProviderOutcome::Available(reading) if !reading.is_empty() => MergedProfile {
            profile: overlay(reading, synthetic),
            source: ReadingSource::Remote,
        },
        _ => MergedProfile {
            profile: synthetic,
            source: ReadingSource::Synthetic,
        },
    }
}

fn overlay(reading: &ProviderReading, synthetic: SoilProfile) -> SoilProfile {
    SoilProfile {
        ph: reading.ph.unwrap_or(synthetic.ph),
        organic_matter: reading.organic_matter.unwrap_or(synthetic.organic_matter),
        moisture: reading.moisture.unwrap_or(synthetic.moisture),
        ..synthetic
    }
}
