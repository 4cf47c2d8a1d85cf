use super::{Surface, WrappedLayout};
use crate::style::TextStyle;

/// Fill settings for one `fill_text` call. Text is centered on `x`.
#[derive(Debug, Clone, PartialEq)]
pub struct Pen {
    pub family: String,
    pub size: f32,
    pub color: String,
}

pub trait DrawSurface {
    fn size(&self) -> Surface;
    fn clear(&mut self);
    fn fill_text(&mut self, text: &str, x: f32, y: f32, pen: &Pen);
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub text: String,
    pub x: f32,
    pub y: f32,
}

/// Baseline positions for every line, vertically centered as a block.
pub fn place_lines(layout: &WrappedLayout, surface: Surface) -> Vec<PlacedLine> {
    let x = surface.width as f32 / 2.0;
    let mut y = (surface.height as f32 - layout.total_height()) / 2.0 + layout.line_height;
    let mut placed = Vec::with_capacity(layout.lines.len());
    for line in &layout.lines {
        placed.push(PlacedLine {
            text: line.clone(),
            x,
            y,
        });
        y += layout.line_height;
    }
    placed
}

pub fn paint<S: DrawSurface + ?Sized>(surface: &mut S, layout: &WrappedLayout, style: &TextStyle) {
    surface.clear();
    let pen = Pen {
        family: style.font_family.clone(),
        size: layout.font_size as f32,
        color: style.color.clone(),
    };
    for line in place_lines(layout, surface.size()) {
        surface.fill_text(&line.text, line.x, line.y, &pen);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::tests::Monospace;
    use crate::fit::{QuoteText, fit};

    #[derive(Default)]
    struct Recorder {
        clears: usize,
        calls: Vec<(String, f32, f32, Pen)>,
    }

    impl DrawSurface for Recorder {
        fn size(&self) -> Surface {
            Surface::new(400, 200)
        }

        fn clear(&mut self) {
            self.clears += 1;
            self.calls.clear();
        }

        fn fill_text(&mut self, text: &str, x: f32, y: f32, pen: &Pen) {
            self.calls.push((text.to_string(), x, y, pen.clone()));
        }
    }

    #[test]
    fn block_is_centered_on_the_surface() {
        let layout = WrappedLayout {
            lines: vec!["a".to_string(), "b".to_string()],
            font_size: 20,
            line_height: 24.0,
        };
        let placed = place_lines(&layout, Surface::new(400, 200));
        // (200 - 48) / 2 + 24
        assert_eq!(placed[0].y, 100.0);
        assert_eq!(placed[1].y, 124.0);
        assert!(placed.iter().all(|line| line.x == 200.0));
    }

    #[test]
    fn paint_clears_then_draws_each_line() {
        let style = TextStyle::default();
        let layout = fit(
            &QuoteText::parse("Hello world\n\nagain"),
            &style,
            Surface::new(400, 200),
            &Monospace,
        );
        let mut recorder = Recorder::default();
        recorder.fill_text("stale", 0.0, 0.0, &Pen {
            family: String::new(),
            size: 1.0,
            color: String::new(),
        });
        paint(&mut recorder, &layout, &style);
        assert_eq!(recorder.clears, 1);
        let texts: Vec<&str> = recorder.calls.iter().map(|c| c.0.as_str()).collect();
        assert_eq!(texts, vec!["Hello world", "", "again"]);
        let pen = &recorder.calls[0].3;
        assert_eq!(pen.size, layout.font_size as f32);
        assert_eq!(pen.color, style.color);
    }

    #[test]
    fn empty_quote_draws_nothing_visible() {
        let style = TextStyle::default();
        let layout = fit(&QuoteText::parse(""), &style, Surface::new(400, 200), &Monospace);
        let mut recorder = Recorder::default();
        paint(&mut recorder, &layout, &style);
        assert_eq!(recorder.clears, 1);
        assert!(recorder.calls.iter().all(|call| call.0.is_empty()));
    }
}
