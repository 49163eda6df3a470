//! Ribbon panel (SVG)
//!
//! One colored band per trait, strongest first. Band width follows the trait
//! value, band height its share of the total, and each trait has its own hue.

use crate::cartridge::Cartridge;

use super::color::hsl_to_hex;
use super::{Subject, xml_escape};

const BACKGROUND: &str = "#0a0a0a";
const MIN_VALUE: f64 = 0.05;
const MIN_BAND_HEIGHT: usize = 12;
const MAX_BAND_HEIGHT: usize = 60;
const BAND_GAP: usize = 4;
const FALLBACK_HUE: f64 = 180.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RibbonOptions {
    pub width: usize,
    pub height: usize,
    /// Skew bands slightly for a 3D look
    pub perspective: bool,
}

impl Default for RibbonOptions {
    fn default() -> Self {
        Self {
            width: 300,
            height: 400,
            perspective: true,
        }
    }
}

/// Band hue for a trait name
pub fn ribbon_hue(name: &str) -> f64 {
    match name {
        "warmth" => 15.0,
        "humor" => 50.0,
        "formality" => 220.0,
        "curiosity" => 280.0,
        "directness" => 0.0,
        "creativity" => 310.0,
        "patience" => 160.0,
        "assertiveness" => 35.0,
        _ => FALLBACK_HUE,
    }
}

/// Geometry and colors of one band
#[derive(Debug, Clone, PartialEq)]
pub struct Stripe {
    pub name: String,
    pub value: f64,
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
    pub color: String,
    pub color_light: String,
    /// Position in the sorted trait list, including skipped traits
    pub index: usize,
}

/// Lay out the bands for a subject
pub fn layout(subject: &Subject<'_>, options: &RibbonOptions) -> Vec<Stripe> {
    let mut sorted: Vec<(&String, f64)> = subject.traits.iter().map(|(k, v)| (k, *v)).collect();
    // stable, so equal values keep map order
    sorted.sort_by(|a, b| b.1.total_cmp(&a.1));

    let area_w = options.width.saturating_sub(60) as f64;
    let area_h = options.height.saturating_sub(100) as f64;
    let total: f64 = sorted.iter().map(|(_, v)| v).sum();
    let total = if total > 0.0 { total } else { 1.0 };

    let mut bands = Vec::new();
    let mut y = 50;
    for (index, (name, value)) in sorted.into_iter().enumerate() {
        if value < MIN_VALUE {
            continue;
        }

        let height = ((value / total * area_h * 1.5) as usize).clamp(MIN_BAND_HEIGHT, MAX_BAND_HEIGHT);
        let width = (30.0 + value * (area_w - 30.0)).max(0.0) as usize;
        let x = options.width.saturating_sub(width) / 2;

        let hue = ribbon_hue(name);
        let saturation = 0.4 + (value - 0.5).abs() * 0.8;
        let lightness = 0.3 + value * 0.25;

        bands.push(Stripe {
            name: name.clone(),
            value,
            x,
            y,
            width,
            height,
            color: hsl_to_hex(hue, saturation, lightness),
            color_light: hsl_to_hex(hue, saturation * 0.8, lightness + 0.1),
            index,
        });
        y += height + BAND_GAP;
    }
    bands
}

pub fn render(subject: &Subject<'_>, options: &RibbonOptions) -> String {
    let width = options.width;
    let height = options.height;
    let trait_count = subject.traits.len() as f64;

    let mut parts = vec![
        format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = width,
            h = height
        ),
        format!(r#"<rect width="{}" height="{}" fill="{}" rx="8"/>"#, width, height, BACKGROUND),
        format!(
            r##"<rect x="4" y="4" width="{}" height="{}" fill="none" stroke="#222" stroke-width="1" rx="6"/>"##,
            width.saturating_sub(8),
            height.saturating_sub(8)
        ),
        format!(
            r##"<text x="{}" y="30" font-family="monospace" font-size="12" fill="#666" text-anchor="middle" letter-spacing="4">{}</text>"##,
            width / 2,
            xml_escape(&subject.name.to_uppercase())
        ),
    ];

    for band in layout(subject, options) {
        if options.perspective {
            let skew = (band.index as f64 - trait_count / 2.0) * 0.3;
            parts.push(format!(r#"<g transform="skewX({:.2})">"#, skew));
        } else {
            parts.push("<g>".to_string());
        }

        parts.push(format!(
            r##"<rect x="{}" y="{}" width="{}" height="{}" fill="#000" opacity="0.3" rx="2"/>"##,
            band.x + 2,
            band.y + 2,
            band.width,
            band.height
        ));
        parts.push(format!(
            r#"<rect x="{}" y="{}" width="{}" height="{}" fill="{}" rx="2"/>"#,
            band.x, band.y, band.width, band.height, band.color
        ));
        parts.push(format!(
            r#"<rect x="{}" y="{}" width="{}" height="3" fill="{}" rx="1" opacity="0.6"/>"#,
            band.x, band.y, band.width, band.color_light
        ));

        if band.width > 100 && band.height > 16 {
            let label: String = band.name.chars().take(3).collect::<String>().to_uppercase();
            let text_y = band.y + band.height / 2 + 4;
            parts.push(format!(
                r#"<text x="{}" y="{}" font-family="monospace" font-size="10" fill="{}" opacity="0.8">{}</text>"#,
                band.x + 10,
                text_y,
                band.color_light,
                xml_escape(&label)
            ));
            parts.push(format!(
                r#"<text x="{}" y="{}" font-family="monospace" font-size="9" fill="{}" text-anchor="end" opacity="0.6">{:.1}</text>"#,
                (band.x + band.width).saturating_sub(10),
                text_y,
                band.color_light,
                band.value
            ));
        }

        parts.push("</g>".to_string());
    }

    parts.push(format!(
        r##"<text x="{}" y="{}" font-family="monospace" font-size="9" fill="#444" text-anchor="middle">{}</text>"##,
        width / 2,
        height.saturating_sub(16),
        xml_escape(&subject.short_owner(8))
    ));
    parts.push("</svg>".to_string());
    parts.join("\n")
}

pub fn from_cartridge(cartridge: &Cartridge, options: &RibbonOptions) -> String {
    render(&Subject::from_cartridge(cartridge), options)
}
