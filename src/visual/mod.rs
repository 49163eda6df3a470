//! Visual fingerprints
//!
//! Deterministic renderings of a cartridge's identity: a text thumbprint for
//! terminals, an IC chip panel and a ribbon panel as SVG. The same name,
//! owner token and traits always give byte-identical output.

pub mod color;
pub mod panel;
pub mod ribbon;
pub mod seed;
pub mod thumbprint;

pub use color::Palette;
pub use panel::PanelOptions;
pub use ribbon::RibbonOptions;
pub use seed::Seed;
pub use thumbprint::ThumbprintOptions;

use crate::cartridge::Cartridge;
use crate::identity::{Trait, TraitMap, traits::NEUTRAL};

/// The identity data a renderer draws from
#[derive(Debug, Clone, Copy)]
pub struct Subject<'a> {
    pub name: &'a str,
    pub voice: &'a str,
    pub owner: &'a str,
    pub traits: &'a TraitMap,
}

impl<'a> Subject<'a> {
    pub fn new(name: &'a str, traits: &'a TraitMap) -> Self {
        Self {
            name,
            voice: "",
            owner: "",
            traits,
        }
    }

    pub fn with_voice(mut self, voice: &'a str) -> Self {
        self.voice = voice;
        self
    }

    pub fn with_owner(mut self, owner: &'a str) -> Self {
        self.owner = owner;
        self
    }

    pub fn from_cartridge(cartridge: &'a Cartridge) -> Self {
        let identity = cartridge.identity();
        Self {
            name: &identity.name,
            voice: &identity.voice,
            owner: cartridge.owner_token(),
            traits: identity.traits(),
        }
    }

    pub fn seed(&self) -> Seed {
        Seed::derive(self.name, self.owner)
    }

    pub fn trait_value(&self, t: Trait) -> f64 {
        self.traits.get(t.as_str()).copied().unwrap_or(NEUTRAL)
    }

    /// First `len` characters of the owner token, zeros when there is none
    pub fn short_owner(&self, len: usize) -> String {
        if self.owner.is_empty() {
            "0".repeat(len)
        } else {
            self.owner.chars().take(len).collect()
        }
    }

    /// Voice up to its first comma
    pub fn short_voice(&self) -> &'a str {
        self.voice.split(',').next().unwrap_or("").trim()
    }
}

/// Escape text for inclusion in SVG markup
pub fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_owner() {
        let traits = TraitMap::new();
        let subject = Subject::new("Atlas", &traits);
        assert_eq!(subject.short_owner(4), "0000");
        assert_eq!(subject.short_owner(8), "00000000");
        assert_eq!(subject.with_owner("a3f8c2d1e5").short_owner(4), "a3f8");
        assert_eq!(subject.with_owner("ab").short_owner(4), "ab");
    }

    #[test]
    fn test_short_voice() {
        let traits = TraitMap::new();
        let subject = Subject::new("Atlas", &traits).with_voice("warm, direct, curious");
        assert_eq!(subject.short_voice(), "warm");
        assert_eq!(Subject::new("Atlas", &traits).short_voice(), "");
    }

    #[test]
    fn test_from_cartridge() {
        let cartridge = Cartridge::builder("Atlas").voice("calm").build();
        let subject = Subject::from_cartridge(&cartridge);
        assert_eq!(subject.name, "Atlas");
        assert_eq!(subject.owner, cartridge.owner_token());
        assert_eq!(subject.trait_value(Trait::Curiosity), 0.7);
    }

    #[test]
    fn test_xml_escape() {
        assert_eq!(xml_escape("R&D <bot> \"q\""), "R&amp;D &lt;bot&gt; &quot;q&quot;");
    }
}
