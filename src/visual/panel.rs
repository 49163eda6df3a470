//! IC chip panel (SVG)
//!
//! A square chip body filled with hex glyphs, pins on all four edges, a pin 1
//! marker and the name underneath. The body color comes from the trait
//! palette; the glyphs and their opacity come from the seed.

use crate::cartridge::Cartridge;

use super::{Palette, Subject, xml_escape};

pub const CHARSET: &[u8] = b"0123456789ABCDEF";

const BACKGROUND: &str = "#0a0a0a";
const PIN_WIDTH: f64 = 8.0;
const PIN_LENGTH: usize = 16;
const NOTCH_RADIUS: usize = 8;
const LABEL_SPACE: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelOptions {
    pub grid_size: usize,
    pub cell_size: usize,
    pub padding: usize,
    /// Pins per side
    pub pin_count: usize,
}

impl Default for PanelOptions {
    fn default() -> Self {
        Self {
            grid_size: 8,
            cell_size: 40,
            padding: 20,
            pin_count: 8,
        }
    }
}

/// Glyph grid, row-major
pub fn generate_grid(subject: &Subject<'_>, grid_size: usize) -> Vec<Vec<char>> {
    let seed = subject.seed();
    (0..grid_size)
        .map(|y| {
            (0..grid_size)
                .map(|x| {
                    let byte = seed.byte(x * 7 + y * 13 + x * y);
                    CHARSET[byte as usize % CHARSET.len()] as char
                })
                .collect()
        })
        .collect()
}

pub fn render(subject: &Subject<'_>, options: &PanelOptions) -> String {
    let palette = Palette::from_traits(subject.traits);
    let grid = generate_grid(subject, options.grid_size);
    let seed = subject.seed();

    let cell = options.cell_size;
    let chip_size = options.grid_size * cell;
    let total_size = chip_size + options.padding * 2;
    let svg_w = total_size + PIN_LENGTH * 2;
    let svg_h = total_size + PIN_LENGTH * 2 + LABEL_SPACE;
    let chip_x = PIN_LENGTH + options.padding;
    let chip_y = PIN_LENGTH + options.padding;

    let mut parts = vec![
        format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = svg_w,
            h = svg_h
        ),
        format!(r#"<rect width="{}" height="{}" fill="{}"/>"#, svg_w, svg_h, BACKGROUND),
    ];

    if options.pin_count > 0 {
        let spacing = chip_size as f64 / options.pin_count as f64;
        let near = options.padding;
        let far = PIN_LENGTH + options.padding + chip_size;
        for i in 0..options.pin_count {
            let offset = options.padding as f64 + spacing * (i as f64 + 0.5);
            let along = PIN_LENGTH as f64 + offset - PIN_WIDTH / 2.0;
            for (x, y, w, h) in [
                (along.to_string(), near.to_string(), PIN_WIDTH.to_string(), PIN_LENGTH.to_string()),
                (along.to_string(), far.to_string(), PIN_WIDTH.to_string(), PIN_LENGTH.to_string()),
                (near.to_string(), along.to_string(), PIN_LENGTH.to_string(), PIN_WIDTH.to_string()),
                (far.to_string(), along.to_string(), PIN_LENGTH.to_string(), PIN_WIDTH.to_string()),
            ] {
                parts.push(format!(
                    r#"<rect x="{}" y="{}" width="{}" height="{}" fill="{}" rx="1"/>"#,
                    x, y, w, h, palette.fg_dim
                ));
            }
        }
    }

    parts.push(format!(
        r#"<rect x="{x}" y="{y}" width="{s}" height="{s}" fill="{fill}" rx="4" stroke="{stroke}" stroke-width="2"/>"#,
        x = chip_x,
        y = chip_y,
        s = chip_size,
        fill = palette.bg,
        stroke = palette.bg_light
    ));

    // pin 1 marker
    parts.push(format!(
        r#"<circle cx="{}" cy="{}" r="{}" fill="{}" opacity="0.6"/>"#,
        chip_x + 16,
        chip_y + 16,
        NOTCH_RADIUS,
        palette.bg_light
    ));

    let font_size = cell * 55 / 100;
    for (y, row) in grid.iter().enumerate() {
        for (x, glyph) in row.iter().enumerate() {
            let cx = chip_x + x * cell + cell / 2;
            let cy = chip_y + y * cell + cell / 2 + font_size / 3;
            let opacity = 0.6 + f64::from(seed.byte(x + y) % 40) / 100.0;
            parts.push(format!(
                r#"<text x="{}" y="{}" font-family="monospace, Courier" font-size="{}" fill="{}" text-anchor="middle" opacity="{:.2}">{}</text>"#,
                cx, cy, font_size, palette.fg, opacity, glyph
            ));
        }
    }

    for i in 1..options.grid_size {
        let g_x = chip_x + i * cell;
        let g_y = chip_y + i * cell;
        parts.push(format!(
            r#"<line x1="{gx}" y1="{y1}" x2="{gx}" y2="{y2}" stroke="{c}" stroke-width="0.5" opacity="0.3"/>"#,
            gx = g_x,
            y1 = chip_y,
            y2 = chip_y + chip_size,
            c = palette.bg_light
        ));
        parts.push(format!(
            r#"<line x1="{x1}" y1="{gy}" x2="{x2}" y2="{gy}" stroke="{c}" stroke-width="0.5" opacity="0.3"/>"#,
            gy = g_y,
            x1 = chip_x,
            x2 = chip_x + chip_size,
            c = palette.bg_light
        ));
    }

    let label_y = chip_y + chip_size + PIN_LENGTH + 24;
    parts.push(format!(
        r#"<text x="{}" y="{}" font-family="monospace, Courier" font-size="14" fill="{}" text-anchor="middle">{}</text>"#,
        svg_w / 2,
        label_y,
        palette.fg,
        xml_escape(&subject.name.to_uppercase())
    ));
    parts.push(format!(
        r#"<text x="{}" y="{}" font-family="monospace, Courier" font-size="10" fill="{}" text-anchor="middle">{}</text>"#,
        svg_w / 2,
        label_y + 18,
        palette.fg_dim,
        xml_escape(&subject.short_owner(8))
    ));

    parts.push("</svg>".to_string());
    parts.join("\n")
}

pub fn from_cartridge(cartridge: &Cartridge, options: &PanelOptions) -> String {
    render(&Subject::from_cartridge(cartridge), options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::default_traits;

    #[test]
    fn test_default_dimensions() {
        let traits = default_traits();
        let svg = render(&Subject::new("Atlas", &traits), &PanelOptions::default());
        // 8 * 40 + 2 * 20 = 360 body, plus pins and label space
        assert!(svg.starts_with(r#"<svg xmlns="http://www.w3.org/2000/svg" width="392" height="452" viewBox="0 0 392 452">"#));
        assert!(svg.ends_with("</svg>"));
    }

    #[test]
    fn test_grid_glyphs() {
        let traits = default_traits();
        let subject = Subject::new("Atlas", &traits);
        let grid = generate_grid(&subject, 8);
        assert_eq!(grid.len(), 8);
        assert!(grid.iter().flatten().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));

        let svg = render(&subject, &PanelOptions::default());
        assert_eq!(svg.matches("<text ").count(), 64 + 2);
        assert_eq!(svg.matches(r#"rx="1"/>"#).count(), 32);
        assert_eq!(svg.matches("<line ").count(), 14);
    }

    #[test]
    fn test_first_pin_position() {
        let traits = default_traits();
        let svg = render(&Subject::new("Atlas", &traits), &PanelOptions::default());
        // 16 + (20 + 40 * 0.5) - 4
        assert!(svg.contains(r#"<rect x="52" y="20" width="8" height="16""#));
    }

    #[test]
    fn test_label_is_escaped_and_uppercased() {
        let traits = default_traits();
        let subject = Subject::new("r&d <bot>", &traits).with_owner("abcdef0123456789");
        let svg = render(&subject, &PanelOptions::default());
        assert!(svg.contains(">R&amp;D &lt;BOT&gt;</text>"));
        assert!(svg.contains(">abcdef01</text>"));
    }

    #[test]
    fn test_unowned_label() {
        let traits = default_traits();
        let svg = render(&Subject::new("Atlas", &traits), &PanelOptions::default());
        assert!(svg.contains(">00000000</text>"));
    }

    #[test]
    fn test_deterministic_and_owner_sensitive() {
        let traits = default_traits();
        let a = Subject::new("Atlas", &traits).with_owner("1111");
        let b = Subject::new("Atlas", &traits).with_owner("2222");
        let options = PanelOptions::default();
        assert_eq!(render(&a, &options), render(&a, &options));
        assert_ne!(generate_grid(&a, 8), generate_grid(&b, 8));
        assert_ne!(render(&a, &options), render(&b, &options));
    }
}
