//! Greedy word wrapping with shrink-to-fit font sizing.
//!
//! The quote is wrapped at a candidate font size; while the wrapped block is
//! taller than the surface allows, the size drops by two points and the
//! whole quote is wrapped again. Wrapping depends on the size, so every
//! candidate is re-wrapped from scratch.

mod paint;

pub use paint::{DrawSurface, Pen, PlacedLine, paint, place_lines};

use serde::Serialize;
use std::fmt;

use crate::style::{MIN_FONT_SIZE, TextStyle};

pub const HORIZONTAL_PADDING: f32 = 50.0;
pub const VERTICAL_PADDING: f32 = 20.0;
pub const LINE_HEIGHT_FACTOR: f32 = 1.2;
pub const SHRINK_STEP: u32 = 2;

/// Pixel dimensions of the drawing surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Surface {
    pub width: u32,
    pub height: u32,
}

impl Surface {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn max_text_width(&self) -> f32 {
        self.width as f32 - HORIZONTAL_PADDING
    }

    pub fn max_text_height(&self) -> f32 {
        self.height as f32 - VERTICAL_PADDING
    }
}

/// Font under test, as handed to the measurement backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Font<'a> {
    pub family: &'a str,
    pub size: f32,
}

impl fmt::Display for Font<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}px {}", self.size, self.family)
    }
}

pub trait TextMeasure {
    fn measure_text(&self, text: &str, font: &Font<'_>) -> f32;
}

impl<T: TextMeasure + ?Sized> TextMeasure for &T {
    fn measure_text(&self, text: &str, font: &Font<'_>) -> f32 {
        (**self).measure_text(text, font)
    }
}

/// A quote split into paragraphs; a `None` paragraph is a blank line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteText {
    paragraphs: Vec<Option<Vec<String>>>,
}

impl QuoteText {
    pub fn parse(raw: &str) -> Self {
        let paragraphs = raw
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .map(|line| {
                if line.trim().is_empty() {
                    None
                } else {
                    Some(line.split_whitespace().map(str::to_string).collect())
                }
            })
            .collect();
        Self { paragraphs }
    }

    pub fn paragraph_count(&self) -> usize {
        self.paragraphs.len()
    }

    pub fn blank_paragraphs(&self) -> usize {
        self.paragraphs.iter().filter(|p| p.is_none()).count()
    }

    /// Whether the quote has any visible word.
    pub fn has_content(&self) -> bool {
        self.paragraphs.iter().any(Option::is_some)
    }

    fn wrap(&self, measure: &dyn TextMeasure, font: &Font<'_>, max_width: f32) -> Vec<String> {
        let mut lines = Vec::new();
        for paragraph in &self.paragraphs {
            match paragraph {
                None => lines.push(String::new()),
                Some(words) => wrap_paragraph(words, measure, font, max_width, &mut lines),
            }
        }
        lines
    }
}

fn wrap_paragraph(
    words: &[String],
    measure: &dyn TextMeasure,
    font: &Font<'_>,
    max_width: f32,
    out: &mut Vec<String>,
) {
    let Some((first, rest)) = words.split_first() else {
        return;
    };
    let mut current = first.clone();
    for word in rest {
        let candidate = format!("{} {}", current, word);
        if measure.measure_text(&candidate, font) < max_width {
            current = candidate;
        } else {
            out.push(std::mem::replace(&mut current, word.clone()));
        }
    }
    out.push(current);
}

/// Wrapped lines with the font size and line height they were fitted at.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WrappedLayout {
    pub lines: Vec<String>,
    pub font_size: u32,
    pub line_height: f32,
}

impl WrappedLayout {
    pub fn total_height(&self) -> f32 {
        self.lines.len() as f32 * self.line_height
    }
}

pub fn line_height_for(font_size: u32) -> f32 {
    font_size as f32 * LINE_HEIGHT_FACTOR
}

/// Wraps `quote` and shrinks the font until the block fits `surface`.
///
/// Stops at [`MIN_FONT_SIZE`] even if the text still overflows.
pub fn fit(
    quote: &QuoteText,
    style: &TextStyle,
    surface: Surface,
    measure: &dyn TextMeasure,
) -> WrappedLayout {
    let max_width = surface.max_text_width();
    let max_height = surface.max_text_height();
    let mut font_size = style.font_size.max(MIN_FONT_SIZE);
    loop {
        let font = Font {
            family: &style.font_family,
            size: font_size as f32,
        };
        let lines = quote.wrap(measure, &font, max_width);
        let line_height = line_height_for(font_size);
        let total_height = lines.len() as f32 * line_height;
        if total_height > max_height && font_size > MIN_FONT_SIZE {
            font_size = font_size.saturating_sub(SHRINK_STEP).max(MIN_FONT_SIZE);
            continue;
        }
        return WrappedLayout {
            lines,
            font_size,
            line_height,
        };
    }
}

/// [`fit`] against a surface that may not exist yet.
pub fn fit_surface(
    quote: &str,
    style: &TextStyle,
    surface: Option<Surface>,
    measure: &dyn TextMeasure,
) -> Option<WrappedLayout> {
    let surface = surface?;
    Some(fit(&QuoteText::parse(quote), style, surface, measure))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Every character is half the font size wide.
    pub(crate) struct Monospace;

    impl TextMeasure for Monospace {
        fn measure_text(&self, text: &str, font: &Font<'_>) -> f32 {
            text.chars().count() as f32 * font.size * 0.5
        }
    }

    fn style(size: u32) -> TextStyle {
        TextStyle::default().with_font_size(size)
    }

    const LONG_QUOTE: &str = "Hello world\n\nThis is a long quote that should wrap across multiple lines because it exceeds the available width";

    #[test]
    fn paragraphs_and_blank_lines_are_preserved() {
        let quote = QuoteText::parse(LONG_QUOTE);
        assert_eq!(quote.paragraph_count(), 3);
        assert_eq!(quote.blank_paragraphs(), 1);

        let layout = fit(&quote, &style(24), Surface::new(400, 200), &Monospace);
        assert_eq!(layout.lines[0], "Hello world");
        assert_eq!(layout.lines[1], "");
        assert!(layout.lines.len() >= 4);
        assert!(layout.font_size <= 24);
        assert!(layout.total_height() <= 180.0);
    }

    #[test]
    fn shrinks_until_block_fits() {
        let quote = QuoteText::parse(LONG_QUOTE);
        // Six lines at 24px need 172.8px; only 100px are available.
        let layout = fit(&quote, &style(24), Surface::new(400, 120), &Monospace);
        assert!(layout.font_size < 24);
        assert!(layout.total_height() <= 100.0);
        assert_eq!(layout.line_height, line_height_for(layout.font_size));
    }

    #[test]
    fn rewraps_at_each_candidate_size() {
        let quote = QuoteText::parse(LONG_QUOTE);
        let surface = Surface::new(400, 120);
        let layout = fit(&quote, &style(24), surface, &Monospace);
        let font = Font {
            family: "any",
            size: layout.font_size as f32,
        };
        let expected = quote.wrap(&Monospace, &font, surface.max_text_width());
        assert_eq!(layout.lines, expected);
    }

    #[test]
    fn empty_quote_is_a_single_blank_line() {
        let layout = fit(&QuoteText::parse(""), &style(24), Surface::new(400, 200), &Monospace);
        assert_eq!(layout.lines, vec![String::new()]);
        assert_eq!(layout.font_size, 24);
    }

    #[test]
    fn long_word_is_never_split_and_overflow_is_accepted() {
        let word = "x".repeat(200);
        let quote = QuoteText::parse(&format!("{}\n{}\n{}\n{}", word, word, word, word));
        let layout = fit(&quote, &style(40), Surface::new(200, 40), &Monospace);
        assert_eq!(layout.font_size, MIN_FONT_SIZE);
        assert_eq!(layout.lines.len(), 4);
        assert!(layout.lines.iter().all(|line| line == &word));
        assert!(layout.total_height() > 20.0);
    }

    #[test]
    fn surface_smaller_than_padding_sets_one_word_per_line_at_floor() {
        let surface = Surface::new(30, 15);
        assert!(surface.max_text_width() <= 0.0);
        assert!(surface.max_text_height() <= 0.0);
        let layout = fit(&QuoteText::parse("carpe diem now"), &style(24), surface, &Monospace);
        assert_eq!(layout.font_size, MIN_FONT_SIZE);
        assert_eq!(layout.lines, vec!["carpe", "diem", "now"]);
    }

    #[test]
    fn odd_sizes_stop_at_the_floor() {
        let word = "y".repeat(50);
        let quote = QuoteText::parse(&format!("{}\n{}\n{}", word, word, word));
        let layout = fit(&quote, &style(11), Surface::new(100, 30), &Monospace);
        assert_eq!(layout.font_size, MIN_FONT_SIZE);
    }

    #[test]
    fn line_widths_stay_inside_the_padding() {
        let quote = QuoteText::parse(LONG_QUOTE);
        let surface = Surface::new(400, 200);
        let layout = fit(&quote, &style(30), surface, &Monospace);
        let font = Font {
            family: "any",
            size: layout.font_size as f32,
        };
        for line in &layout.lines {
            let single_word = !line.contains(' ');
            let width = Monospace.measure_text(line, &font);
            assert!(single_word || width < surface.max_text_width(), "{line}");
        }
    }

    #[test]
    fn line_count_matches_paragraph_structure() {
        let quote = QuoteText::parse("one two three four five six\n\n\nseven\r\neight nine");
        let surface = Surface::new(160, 1000);
        let layout = fit(&quote, &style(20), surface, &Monospace);
        // 110px at 10px per char.
        assert_eq!(
            layout.lines,
            vec![
                "one two",
                "three four",
                "five six",
                "",
                "",
                "seven",
                "eight nine"
            ]
        );
    }

    #[test]
    fn fitting_is_deterministic() {
        let quote = QuoteText::parse(LONG_QUOTE);
        let a = fit(&quote, &style(50), Surface::new(300, 150), &Monospace);
        let b = fit(&quote, &style(50), Surface::new(300, 150), &Monospace);
        assert_eq!(a, b);
    }

    #[test]
    fn missing_surface_is_a_no_op() {
        assert!(fit_surface("quote", &style(24), None, &Monospace).is_none());
        assert!(fit_surface("quote", &style(24), Some(Surface::new(400, 200)), &Monospace).is_some());
    }

    #[test]
    fn font_renders_as_css_shorthand() {
        let font = Font {
            family: "Cambria",
            size: 24.0,
        };
        assert_eq!(font.to_string(), "24px Cambria");
    }
}
