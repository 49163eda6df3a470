//! Trait to color mapping
//!
//! Only basic IEEE arithmetic is used so the same traits give the same hex
//! colors on every platform.

use serde::Serialize;

use crate::identity::{Trait, TraitMap, traits::NEUTRAL};

fn value(traits: &TraitMap, t: Trait) -> f64 {
    traits.get(t.as_str()).copied().unwrap_or(NEUTRAL)
}

/// Dominant hue in degrees, [0, 360)
pub fn hue(traits: &TraitMap) -> f64 {
    let warmth = value(traits, Trait::Warmth);
    let formality = value(traits, Trait::Formality);
    let creativity = value(traits, Trait::Creativity);
    let humor = value(traits, Trait::Humor);

    (warmth * 30.0 + (1.0 - formality) * 60.0 + creativity * 120.0 + humor * 40.0).rem_euclid(360.0)
}

/// 0.3 for a balanced or empty map, up to 0.8 for an extreme one
pub fn saturation(traits: &TraitMap) -> f64 {
    if traits.is_empty() {
        return 0.3;
    }
    let extremity: f64 = traits.values().map(|v| (v - NEUTRAL).abs() * 2.0).sum::<f64>() / traits.len() as f64;
    0.3 + extremity * 0.5
}

/// Warmth and patience lighten, directness and assertiveness darken
pub fn lightness(traits: &TraitMap) -> f64 {
    let warmth = value(traits, Trait::Warmth);
    let patience = value(traits, Trait::Patience);
    let directness = value(traits, Trait::Directness);
    let assertiveness = value(traits, Trait::Assertiveness);

    (0.35 + (warmth + patience - directness - assertiveness + 1.0) * 0.1).clamp(0.2, 0.6)
}

/// HSL (h in degrees, s and l in [0, 1]) to `#rrggbb`
pub fn hsl_to_hex(h: f64, s: f64, l: f64) -> String {
    let h = h.rem_euclid(360.0);
    let s = s.clamp(0.0, 1.0);
    let l = l.clamp(0.0, 1.0);

    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let x = c * (1.0 - ((h / 60.0).rem_euclid(2.0) - 1.0).abs());
    let m = l - c / 2.0;

    let (r, g, b) = if h < 60.0 {
        (c, x, 0.0)
    } else if h < 120.0 {
        (x, c, 0.0)
    } else if h < 180.0 {
        (0.0, c, x)
    } else if h < 240.0 {
        (0.0, x, c)
    } else if h < 300.0 {
        (x, 0.0, c)
    } else {
        (c, 0.0, x)
    };

    let channel = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    format!("#{:02x}{:02x}{:02x}", channel(r), channel(g), channel(b))
}

/// Colors derived from a personality
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Palette {
    pub bg: String,
    pub bg_light: String,
    pub fg: String,
    pub fg_dim: String,
    pub accent: String,
    pub hue: f64,
    pub saturation: f64,
    pub lightness: f64,
}

impl Palette {
    pub fn from_traits(traits: &TraitMap) -> Self {
        let h = hue(traits);
        let s = saturation(traits);
        let l = lightness(traits);

        Self {
            bg: hsl_to_hex(h, s, l),
            bg_light: hsl_to_hex(h, s * 0.6, l + 0.15),
            fg: hsl_to_hex(h, s * 0.3, 0.9),
            fg_dim: hsl_to_hex(h, s * 0.2, 0.7),
            accent: hsl_to_hex((h + 180.0) % 360.0, s, 0.5),
            hue: h,
            saturation: s,
            lightness: l,
        }
    }
}
