use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

pub const MIN_FONT_SIZE: u32 = 10;
pub const MAX_FONT_SIZE: u32 = 100;
pub const DEFAULT_FONT_SIZE: u32 = 24;
pub const DEFAULT_FONT_FAMILY: &str = "BrittanySignature";
pub const DEFAULT_TEXT_COLOR: &str = "#ffffff";

pub const DEFAULT_FONTS: &[&str] = &[
    "BrittanySignature",
    "CherriesBlack",
    "PalatinoUnicode",
    "Jester",
    "LucianSchoenschrift",
    "Gabriola",
    "Cambria",
    "CopperplateGothicBold",
    "SteelfishOutline",
    "MonotypeCorsiva",
    "RaiLowercase",
];

pub const DEFAULT_COLORS: &[&str] = &[
    "#e58ee6", "#8eb8e6", "#ea5d5d", "#bdee53", "#f8f130", "#feb086", "#a8ffe9", "#41fe34",
    "#ffffff",
];

/// Font, size and fill color applied to the quote text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStyle {
    pub font_family: String,
    pub font_size: u32,
    pub color: String,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_family: DEFAULT_FONT_FAMILY.to_string(),
            font_size: DEFAULT_FONT_SIZE,
            color: DEFAULT_TEXT_COLOR.to_string(),
        }
    }
}

impl TextStyle {
    pub fn with_font_size(mut self, font_size: u32) -> Self {
        self.font_size = clamp_font_size(font_size);
        self
    }
}

pub fn clamp_font_size(size: u32) -> u32 {
    size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE)
}

/// Normalizes `#rgb` / `#rrggbb` (with or without `#`) to lowercase `#rrggbb`.
pub fn normalize_hex_color(value: &str) -> Result<String> {
    let raw = value.trim();
    let digits = raw.strip_prefix('#').unwrap_or(raw);
    if !digits.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return Err(anyhow!("invalid hex color '{}'", value));
    }
    let expanded = match digits.len() {
        3 => digits.chars().flat_map(|ch| [ch, ch]).collect::<String>(),
        6 => digits.to_string(),
        _ => return Err(anyhow!("invalid hex color '{}'", value)),
    };
    Ok(format!("#{}", expanded.to_ascii_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn font_size_is_clamped_to_slider_range() {
        assert_eq!(clamp_font_size(4), MIN_FONT_SIZE);
        assert_eq!(TextStyle::default().with_font_size(240).font_size, MAX_FONT_SIZE);
        assert_eq!(TextStyle::default().with_font_size(36).font_size, 36);
    }

    #[test]
    fn hex_colors_are_normalized() {
        assert_eq!(normalize_hex_color("#FFF").unwrap(), "#ffffff");
        assert_eq!(normalize_hex_color("E58EE6").unwrap(), "#e58ee6");
        assert!(normalize_hex_color("#12345").is_err());
        assert!(normalize_hex_color("red").is_err());
    }
}
