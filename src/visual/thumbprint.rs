//! Text thumbprint
//!
//! A character matrix where each cell takes its glyph from one trait's
//! palette. Which palette (high, mid or low) a trait contributes depends on
//! its band, and the seed picks the glyph within it.

use crate::cartridge::Cartridge;
use crate::identity::{Band, Trait};

use super::Subject;

pub const DEFAULT_WIDTH: usize = 18;
pub const DEFAULT_HEIGHT: usize = 6;

pub const COMPACT_WIDTH: usize = 12;
pub const COMPACT_HEIGHT: usize = 3;

const TOP_LEFT: char = '╭';
const TOP_RIGHT: char = '╮';
const BOTTOM_LEFT: char = '╰';
const BOTTOM_RIGHT: char = '╯';
const HORIZONTAL: char = '─';
const VERTICAL: char = '│';

/// Glyphs a trait contributes in a given band
pub fn palette(t: Trait, band: Band) -> &'static str {
    match (t, band) {
        (Trait::Warmth, Band::High) => "○◎●◉◍◐◑◒◓",
        (Trait::Warmth, Band::Mid) => "·∙•◦∘",
        (Trait::Warmth, Band::Low) => "□■▪▫▬▭▮",

        (Trait::Humor, Band::High) => "~≈∿∾⌇⌁",
        (Trait::Humor, Band::Mid) => "·-—–",
        (Trait::Humor, Band::Low) => "│┃║┊┋",

        (Trait::Formality, Band::High) => "╋╬╪╫┼┿╀",
        (Trait::Formality, Band::Mid) => "┤├┬┴",
        (Trait::Formality, Band::Low) => "╮╯╰╭",

        (Trait::Curiosity, Band::High) => "⟐⟑◇◆◈◊⬦⬧",
        (Trait::Curiosity, Band::Mid) => "△▽▷◁",
        (Trait::Curiosity, Band::Low) => "▣▤▥▦▧▨",

        (Trait::Directness, Band::High) => "▶▸►▷→⟶⟹",
        (Trait::Directness, Band::Mid) => "↗↘↙↖",
        (Trait::Directness, Band::Low) => "↺↻⟲⟳∞",

        (Trait::Creativity, Band::High) => "✦✧★☆⊛⊕⊗",
        (Trait::Creativity, Band::Mid) => "⊙⊚⊝⊜",
        (Trait::Creativity, Band::Low) => "⊞⊟⊠⊡",

        (Trait::Patience, Band::High) => "░▒▓█▉▊▋▌",
        (Trait::Patience, Band::Mid) => "▍▎▏",
        (Trait::Patience, Band::Low) => "⚡↯⟐↝",

        (Trait::Assertiveness, Band::High) => "▲▼◀▶⏏⏩⏪",
        (Trait::Assertiveness, Band::Mid) => "△▽◁▷",
        (Trait::Assertiveness, Band::Low) => "∘∙·。",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbprintOptions {
    pub width: usize,
    pub height: usize,
    pub framed: bool,
}

impl Default for ThumbprintOptions {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            framed: true,
        }
    }
}

/// Character rows for a subject
pub fn generate_matrix(subject: &Subject<'_>, width: usize, height: usize) -> Vec<String> {
    let seed = subject.seed();
    let palettes: Vec<Vec<char>> = Trait::ALL
        .iter()
        .map(|t| palette(*t, Band::of(subject.trait_value(*t))).chars().collect())
        .collect();

    (0..height)
        .map(|y| {
            (0..width)
                .map(|x| {
                    let glyphs = &palettes[(x + y * 3) % palettes.len()];
                    let index = (x * 7 + y * 13 + seed.byte(x + y) as usize) % glyphs.len();
                    glyphs[index]
                })
                .collect()
        })
        .collect()
}

/// Name/voice line and owner line shown under the matrix
pub fn label_lines(subject: &Subject<'_>) -> Vec<String> {
    let voice = subject.short_voice();
    let first = if voice.is_empty() {
        format!(" {}", subject.name)
    } else {
        format!(" {} · {}", subject.name, voice)
    };
    vec![first, format!(" {}", subject.short_owner(4))]
}

fn pad_right(text: &str, width: usize) -> String {
    let len = text.chars().count();
    if len >= width {
        text.to_string()
    } else {
        format!("{}{}", text, " ".repeat(width - len))
    }
}

/// Full thumbprint, framed or bare
pub fn render(subject: &Subject<'_>, options: &ThumbprintOptions) -> String {
    let matrix = generate_matrix(subject, options.width, options.height);
    let labels = label_lines(subject);

    if !options.framed {
        let mut lines = matrix;
        lines.push(String::new());
        lines.extend(labels);
        return lines.join("\n");
    }

    let widest_label = labels.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    let inner = options.width.max(widest_label) + 2;
    let border = HORIZONTAL.to_string().repeat(inner);

    let mut lines = Vec::with_capacity(matrix.len() + labels.len() + 3);
    lines.push(format!("{}{}{}", TOP_LEFT, border, TOP_RIGHT));
    for row in &matrix {
        lines.push(format!("{}{}{}", VERTICAL, pad_right(&format!(" {}", row), inner), VERTICAL));
    }
    lines.push(format!("{}{}{}", VERTICAL, " ".repeat(inner), VERTICAL));
    for label in &labels {
        lines.push(format!("{}{}{}", VERTICAL, pad_right(label, inner), VERTICAL));
    }
    lines.push(format!("{}{}{}", BOTTOM_LEFT, border, BOTTOM_RIGHT));

    lines.join("\n")
}

/// One-line thumbprint for chat headers and listings
pub fn compact(subject: &Subject<'_>) -> String {
    let matrix = generate_matrix(subject, COMPACT_WIDTH, COMPACT_HEIGHT);
    let first = matrix.first().map(String::as_str).unwrap_or("");
    format!("{} {} [{}]", first, subject.name, subject.short_owner(4))
}

pub fn from_cartridge(cartridge: &Cartridge, options: &ThumbprintOptions) -> String {
    render(&Subject::from_cartridge(cartridge), options)
}

pub fn compact_from_cartridge(cartridge: &Cartridge) -> String {
    compact(&Subject::from_cartridge(cartridge))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{TraitMap, default_traits};

    #[test]
    fn test_matrix_dimensions() {
        let traits = default_traits();
        let subject = Subject::new("Atlas", &traits);
        let matrix = generate_matrix(&subject, 18, 6);
        assert_eq!(matrix.len(), 6);
        assert!(matrix.iter().all(|row| row.chars().count() == 18));
    }

    #[test]
    fn test_cells_use_their_trait_palette() {
        let mut traits = TraitMap::new();
        traits.insert("warmth".to_string(), 0.9);
        traits.insert("humor".to_string(), 0.1);
        let subject = Subject::new("Atlas", &traits);
        let matrix = generate_matrix(&subject, 8, 1);
        let row: Vec<char> = matrix[0].chars().collect();

        // column 0 draws from warmth, column 1 from humor, column 2 from formality
        assert!(palette(Trait::Warmth, Band::High).contains(row[0]));
        assert!(palette(Trait::Humor, Band::Low).contains(row[1]));
        assert!(palette(Trait::Formality, Band::Mid).contains(row[2]));
    }

    #[test]
    fn test_render_is_deterministic() {
        let traits = default_traits();
        let subject = Subject::new("Atlas", &traits).with_owner("a3f8c2d1").with_voice("warm, direct");
        let options = ThumbprintOptions::default();
        assert_eq!(render(&subject, &options), render(&subject, &options));
    }

    #[test]
    fn test_owner_changes_output() {
        let traits = default_traits();
        let a = Subject::new("Atlas", &traits).with_owner("1111111111111111");
        let b = Subject::new("Atlas", &traits).with_owner("2222222222222222");
        let options = ThumbprintOptions::default();
        assert_ne!(render(&a, &options), render(&b, &options));
        assert_ne!(generate_matrix(&a, 18, 6), generate_matrix(&b, 18, 6));
    }

    #[test]
    fn test_framed_layout() {
        let traits = default_traits();
        let subject = Subject::new("Atlas", &traits).with_owner("a3f8c2d1").with_voice("warm, direct");
        let output = render(&subject, &ThumbprintOptions::default());
        let lines: Vec<&str> = output.lines().collect();

        // border, 6 rows, separator, 2 labels, border
        assert_eq!(lines.len(), 11);
        assert!(lines[0].starts_with('╭') && lines[0].ends_with('╮'));
        assert!(lines[10].starts_with('╰') && lines[10].ends_with('╯'));
        let width = lines[0].chars().count();
        assert!(lines.iter().all(|l| l.chars().count() == width));
        // inner width is the matrix width plus two
        assert_eq!(width, 18 + 2 + 2);
        assert_eq!(lines[7], format!("│{}│", " ".repeat(20)));
        assert!(lines[8].starts_with("│ Atlas · warm"));
        assert!(lines[9].starts_with("│ a3f8 "));
    }

    #[test]
    fn test_long_label_widens_frame() {
        let traits = default_traits();
        let subject = Subject::new("Atlas", &traits).with_voice("an exceptionally long voice description");
        let output = render(&subject, &ThumbprintOptions::default());
        let label = " Atlas · an exceptionally long voice description";
        let first = output.lines().next().unwrap();
        assert_eq!(first.chars().count(), label.chars().count() + 2 + 2);
    }

    #[test]
    fn test_unframed_layout() {
        let traits = default_traits();
        let subject = Subject::new("Atlas", &traits);
        let options = ThumbprintOptions {
            framed: false,
            ..Default::default()
        };
        let output = render(&subject, &options);
        let lines: Vec<&str> = output.split('\n').collect();
        assert_eq!(lines.len(), 6 + 1 + 2);
        assert_eq!(lines[6], "");
        assert_eq!(lines[7], " Atlas");
        assert_eq!(lines[8], " 0000");
    }

    #[test]
    fn test_compact_format() {
        let traits = default_traits();
        let subject = Subject::new("X", &traits);
        let first = compact(&subject);
        assert_eq!(first, compact(&subject));
        assert!(first.ends_with(" X [0000]"));
        let glyphs: String = first.chars().take(COMPACT_WIDTH).collect();
        assert_eq!(glyphs, generate_matrix(&subject, COMPACT_WIDTH, COMPACT_HEIGHT)[0]);
    }
}
