//! Canonical personality traits
//!
//! Each trait is a dimension scored from 0.0 to 1.0. The declaration order of
//! `Trait::ALL` is the canonical order used by descriptions and renderers.

use serde::{Deserialize, Serialize};

/// Values at or above this are described with the "high" phrase
pub const HIGH_BAND: f64 = 0.7;

/// Values at or below this are described with the "low" phrase
pub const LOW_BAND: f64 = 0.3;

/// Value reported for a trait that is not set
pub const NEUTRAL: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trait {
    Warmth,
    Humor,
    Formality,
    Curiosity,
    Directness,
    Creativity,
    Patience,
    Assertiveness,
}

/// Which third of the scale a value falls in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    High,
    Mid,
    Low,
}

impl Band {
    pub fn of(value: f64) -> Self {
        if value >= HIGH_BAND {
            Band::High
        } else if value <= LOW_BAND {
            Band::Low
        } else {
            Band::Mid
        }
    }
}

impl Trait {
    pub const ALL: [Trait; 8] = [
        Trait::Warmth,
        Trait::Humor,
        Trait::Formality,
        Trait::Curiosity,
        Trait::Directness,
        Trait::Creativity,
        Trait::Patience,
        Trait::Assertiveness,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Trait::Warmth => "warmth",
            Trait::Humor => "humor",
            Trait::Formality => "formality",
            Trait::Curiosity => "curiosity",
            Trait::Directness => "directness",
            Trait::Creativity => "creativity",
            Trait::Patience => "patience",
            Trait::Assertiveness => "assertiveness",
        }
    }

    /// Value used when a new cartridge does not specify this trait
    pub fn default_value(&self) -> f64 {
        match self {
            Trait::Warmth => 0.6,
            Trait::Humor => 0.5,
            Trait::Formality => 0.5,
            Trait::Curiosity => 0.7,
            Trait::Directness => 0.6,
            Trait::Creativity => 0.6,
            Trait::Patience => 0.7,
            Trait::Assertiveness => 0.5,
        }
    }

    /// Prompt phrase for a strongly expressed trait
    pub fn high_phrase(&self) -> &'static str {
        match self {
            Trait::Warmth => "warm, empathetic, and caring in responses",
            Trait::Humor => "witty, playful, uses humor naturally",
            Trait::Formality => "polished, professional, proper grammar",
            Trait::Curiosity => "asks follow-up questions, explores tangents",
            Trait::Directness => "blunt, honest, doesn't sugarcoat",
            Trait::Creativity => "imaginative, makes unexpected connections",
            Trait::Patience => "thorough, explains step by step, never rushes",
            Trait::Assertiveness => "opinionated, takes strong positions, pushes back",
        }
    }

    /// Prompt phrase for the opposite end of the scale
    pub fn low_phrase(&self) -> &'static str {
        match self {
            Trait::Warmth => "cool, detached, and matter-of-fact",
            Trait::Humor => "serious, focused, rarely jokes",
            Trait::Formality => "casual, conversational, uses slang",
            Trait::Curiosity => "stays on topic, answers directly",
            Trait::Directness => "diplomatic, gentle, softens hard truths",
            Trait::Creativity => "practical, conventional, by-the-book",
            Trait::Patience => "concise, assumes understanding, moves fast",
            Trait::Assertiveness => "agreeable, accommodating, follows the user's lead",
        }
    }

    /// Phrase for a value, or None when the value is unremarkable
    pub fn phrase_for(&self, value: f64) -> Option<&'static str> {
        match Band::of(value) {
            Band::High => Some(self.high_phrase()),
            Band::Low => Some(self.low_phrase()),
            Band::Mid => None,
        }
    }
}

impl std::fmt::Display for Trait {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Trait {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_lowercase();
        Trait::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == lowered)
            .ok_or_else(|| format!("Unknown trait: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trait_from_str() {
        assert_eq!("warmth".parse::<Trait>().unwrap(), Trait::Warmth);
        assert_eq!("HUMOR".parse::<Trait>().unwrap(), Trait::Humor);
        assert!("charisma".parse::<Trait>().is_err());
    }

    #[test]
    fn test_band_boundaries_are_inclusive() {
        assert_eq!(Band::of(0.7), Band::High);
        assert_eq!(Band::of(0.3), Band::Low);
        assert_eq!(Band::of(0.69), Band::Mid);
        assert_eq!(Band::of(0.31), Band::Mid);
    }

    #[test]
    fn test_phrase_for_mid_is_none() {
        assert_eq!(Trait::Humor.phrase_for(0.5), None);
        assert_eq!(Trait::Humor.phrase_for(0.9), Some("witty, playful, uses humor naturally"));
    }

    #[test]
    fn test_trait_display() {
        assert_eq!(Trait::Assertiveness.to_string(), "assertiveness");
    }
}
