//! Identity model: who a cartridge is
//!
//! An identity is a name, a voice, an origin story, a trait vector and a set
//! of quirks and directives. Trait values always stay within [0.0, 1.0].

pub mod traits;

use indexmap::IndexMap;
use serde_json::Number;

pub use traits::{Band, Trait};
use traits::NEUTRAL;

/// Trait name to value, in insertion order
pub type TraitMap = IndexMap<String, f64>;

/// Name given to identities loaded without one
pub const DEFAULT_NAME: &str = "Companion";

/// Description used when no trait is remarkable
pub const NEUTRAL_DESCRIPTION: &str = "balanced and adaptable";

/// The canonical traits at their default values, in declaration order
pub fn default_traits() -> TraitMap {
    Trait::ALL
        .iter()
        .map(|t| (t.as_str().to_string(), t.default_value()))
        .collect()
}

/// Clamp a trait value into [0, 1]; NaN maps to the neutral value
pub fn clamp_trait(value: f64) -> f64 {
    if value.is_nan() { NEUTRAL } else { value.clamp(0.0, 1.0) }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub name: String,
    pub voice: String,
    pub origin: String,
    traits: TraitMap,
    /// Stored spellings a float would not reproduce, such as integers
    literals: IndexMap<String, Number>,
    pub quirks: Vec<String>,
    pub directives: Vec<String>,
}

impl Identity {
    /// Identity with default traits and nothing else
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            voice: String::new(),
            origin: String::new(),
            traits: default_traits(),
            literals: IndexMap::new(),
            quirks: Vec::new(),
            directives: Vec::new(),
        }
    }

    /// Build from raw parts as found in a cartridge file.
    ///
    /// A present trait map is kept as-is (values clamped) so the signed
    /// payload of an existing cartridge is reproduced exactly; a missing map
    /// falls back to the defaults.
    pub fn from_raw(
        name: &str,
        voice: &str,
        origin: &str,
        traits: Option<TraitMap>,
        quirks: Vec<String>,
        directives: Vec<String>,
    ) -> Self {
        let name = if name.trim().is_empty() { DEFAULT_NAME } else { name };
        let traits = match traits {
            Some(map) => map.into_iter().map(|(k, v)| (k, clamp_trait(v))).collect(),
            None => default_traits(),
        };

        Self {
            name: name.to_string(),
            voice: voice.to_string(),
            origin: origin.to_string(),
            traits,
            literals: IndexMap::new(),
            quirks,
            directives,
        }
    }

    /// Build from a stored trait map, remembering each stored number whose
    /// value a float cannot reproduce so signed payloads re-encode exactly
    pub fn from_stored(
        name: &str,
        voice: &str,
        origin: &str,
        stored: Option<IndexMap<String, Number>>,
        quirks: Vec<String>,
        directives: Vec<String>,
    ) -> Self {
        let Some(stored) = stored else {
            return Self::from_raw(name, voice, origin, None, quirks, directives);
        };

        let traits: TraitMap = stored
            .iter()
            .filter_map(|(k, n)| n.as_f64().map(|v| (k.clone(), v)))
            .collect();
        let mut identity = Self::from_raw(name, voice, origin, Some(traits), quirks, directives);
        identity.literals = stored
            .into_iter()
            .filter(|(k, n)| !n.is_f64() || n.as_f64() != identity.traits.get(k).copied())
            .collect();
        identity
    }

    /// Merge trait overrides over the current values
    pub fn with_traits(mut self, overrides: &TraitMap) -> Self {
        for (name, value) in overrides {
            self.set_trait(name, *value);
        }
        self
    }

    pub fn with_voice(mut self, voice: &str) -> Self {
        self.voice = voice.to_string();
        self
    }

    pub fn with_origin(mut self, origin: &str) -> Self {
        self.origin = origin.to_string();
        self
    }

    pub fn with_quirks(mut self, quirks: Vec<String>) -> Self {
        self.quirks = quirks;
        self
    }

    pub fn with_directives(mut self, directives: Vec<String>) -> Self {
        self.directives = directives;
        self
    }

    pub fn traits(&self) -> &TraitMap {
        &self.traits
    }

    /// Trait values as JSON numbers, keeping stored spellings
    pub fn trait_numbers(&self) -> IndexMap<String, Number> {
        self.traits
            .iter()
            .filter_map(|(name, value)| {
                let number = match self.literals.get(name) {
                    Some(literal) => Some(literal.clone()),
                    None => Number::from_f64(*value),
                };
                number.map(|n| (name.clone(), n))
            })
            .collect()
    }

    /// Stored value, or 0.5 when the trait is not set
    pub fn get_trait(&self, name: &str) -> f64 {
        self.traits.get(name).copied().unwrap_or(NEUTRAL)
    }

    /// Set a trait, clamping into [0, 1]
    pub fn set_trait(&mut self, name: &str, value: f64) {
        let clamped = clamp_trait(value);
        if clamped != value {
            log::debug!("Clamped trait {} from {} to {}", name, value, clamped);
        }
        self.traits.insert(name.to_string(), clamped);
        self.literals.shift_remove(name);
    }

    /// Natural-language summary of the remarkable traits
    pub fn describe(&self) -> String {
        describe_traits(&self.traits)
    }

    /// The `n` canonical traits furthest from neutral, most extreme first
    pub fn dominant_traits(&self, n: usize) -> Vec<(Trait, f64)> {
        let mut scored: Vec<(Trait, f64)> = Trait::ALL
            .iter()
            .filter_map(|t| self.traits.get(t.as_str()).map(|v| (*t, *v)))
            .collect();
        // Stable sort keeps declaration order among equal distances
        scored.sort_by(|a, b| {
            let da = (a.1 - NEUTRAL).abs();
            let db = (b.1 - NEUTRAL).abs();
            db.total_cmp(&da)
        });
        scored.truncate(n);
        scored
    }
}

/// Describe a trait map: one phrase per canonical trait in the high or low
/// band, in declaration order, joined with "; "
pub fn describe_traits(traits: &TraitMap) -> String {
    let descriptions: Vec<&str> = Trait::ALL
        .iter()
        .filter_map(|t| traits.get(t.as_str()).and_then(|v| t.phrase_for(*v)))
        .collect();

    if descriptions.is_empty() {
        NEUTRAL_DESCRIPTION.to_string()
    } else {
        descriptions.join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atlas() -> Identity {
        let overrides: TraitMap = [("warmth", 0.8), ("humor", 0.7), ("formality", 0.3)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        Identity::new("Atlas").with_traits(&overrides)
    }

    #[test]
    fn test_set_trait_clamps() {
        let mut identity = Identity::new("Clamp");
        for (input, expected) in [(1.7, 1.0), (-0.4, 0.0), (0.42, 0.42), (1.0, 1.0), (0.0, 0.0)] {
            identity.set_trait("warmth", input);
            assert_eq!(identity.get_trait("warmth"), expected);
        }
    }

    #[test]
    fn test_set_trait_nan_is_neutral() {
        let mut identity = Identity::new("Nan");
        identity.set_trait("humor", f64::NAN);
        assert_eq!(identity.get_trait("humor"), 0.5);
    }

    #[test]
    fn test_get_missing_trait_is_neutral() {
        let identity = Identity::new("Missing");
        assert_eq!(identity.get_trait("charisma"), 0.5);
    }

    #[test]
    fn test_describe_atlas() {
        let description = atlas().describe();
        assert!(description.contains(Trait::Warmth.high_phrase()));
        assert!(description.contains(Trait::Formality.low_phrase()));
        // 0.7 sits on the high boundary
        assert!(description.contains(Trait::Humor.high_phrase()));
        // defaults at 0.7 are also high
        assert!(description.contains(Trait::Curiosity.high_phrase()));
    }

    #[test]
    fn test_describe_follows_declaration_order() {
        let description = atlas().describe();
        let warmth = description.find(Trait::Warmth.high_phrase()).unwrap();
        let formality = description.find(Trait::Formality.low_phrase()).unwrap();
        assert!(warmth < formality);
    }

    #[test]
    fn test_describe_omits_mid_and_unknown() {
        let traits: TraitMap = [("warmth", 0.5), ("humor", 0.31), ("charisma", 1.0)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        assert_eq!(describe_traits(&traits), NEUTRAL_DESCRIPTION);
    }

    #[test]
    fn test_describe_is_independent_of_insertion_order() {
        let forward: TraitMap = [("warmth", 0.9), ("patience", 0.1)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        let backward: TraitMap = [("patience", 0.1), ("warmth", 0.9)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        assert_eq!(describe_traits(&forward), describe_traits(&backward));
    }

    #[test]
    fn test_from_raw_defaults() {
        let identity = Identity::from_raw("", "", "", None, vec![], vec![]);
        assert_eq!(identity.name, DEFAULT_NAME);
        assert_eq!(identity.traits(), &default_traits());
    }

    #[test]
    fn test_from_raw_keeps_partial_trait_map() {
        let traits: TraitMap = [("warmth".to_string(), 1.4)].into_iter().collect();
        let identity = Identity::from_raw("Raw", "", "", Some(traits), vec![], vec![]);
        assert_eq!(identity.traits().len(), 1);
        assert_eq!(identity.get_trait("warmth"), 1.0);
    }

    fn stored(pairs: serde_json::Value) -> IndexMap<String, Number> {
        serde_json::from_value(pairs).unwrap()
    }

    #[test]
    fn test_from_stored_keeps_integer_spelling() {
        let traits = stored(serde_json::json!({"warmth": 1, "humor": 0.25}));
        let identity = Identity::from_stored("Stored", "", "", Some(traits), vec![], vec![]);

        assert_eq!(identity.get_trait("warmth"), 1.0);
        let numbers = identity.trait_numbers();
        assert_eq!(numbers["warmth"].to_string(), "1");
        assert!(numbers["humor"].is_f64());
    }

    #[test]
    fn test_float_spelling_needs_no_literal() {
        let traits = stored(serde_json::json!({"warmth": 0.8}));
        let from_file = Identity::from_stored("Atlas", "", "", Some(traits), vec![], vec![]);
        let traits: TraitMap = [("warmth".to_string(), 0.8)].into_iter().collect();
        assert_eq!(from_file, Identity::from_raw("Atlas", "", "", Some(traits), vec![], vec![]));
    }

    #[test]
    fn test_set_trait_drops_stored_spelling() {
        let traits = stored(serde_json::json!({"warmth": 1}));
        let mut identity = Identity::from_stored("Stored", "", "", Some(traits), vec![], vec![]);
        identity.set_trait("warmth", 1.0);
        assert!(identity.trait_numbers()["warmth"].is_f64());
    }

    #[test]
    fn test_dominant_traits() {
        let overrides: TraitMap = [("warmth", 0.95), ("humor", 0.1), ("patience", 0.5)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        let identity = Identity::new("Dominant").with_traits(&overrides);

        let dominant = identity.dominant_traits(2);
        assert_eq!(dominant.len(), 2);
        assert_eq!(dominant[0], (Trait::Warmth, 0.95));
        assert_eq!(dominant[1], (Trait::Humor, 0.1));
    }
}
