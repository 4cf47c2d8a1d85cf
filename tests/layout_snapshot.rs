use quote_canvas::{EstimatedMetrics, QuoteText, Surface, TextStyle, fit};
use serde::Serialize;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LayoutSnapshot {
    lines: Vec<String>,
    font_size: u32,
}

fn layout(quote: &str, width: u32, height: u32, font_size: u32) -> LayoutSnapshot {
    let style = TextStyle::default().with_font_size(font_size);
    let layout = fit(
        &QuoteText::parse(quote),
        &style,
        Surface::new(width, height),
        &EstimatedMetrics,
    );
    LayoutSnapshot {
        lines: layout.lines,
        font_size: layout.font_size,
    }
}

#[test]
fn wrapped_quote_with_blank_paragraph() {
    let snapshot = layout(
        "Hello world\n\nThis is a long quote that should wrap across multiple lines because it exceeds the available width",
        400,
        200,
        24,
    );
    insta::assert_json_snapshot!(snapshot, @r#"
    {
      "lines": [
        "Hello world",
        "",
        "This is a long quote that",
        "should wrap across multiple",
        "lines because it exceeds the",
        "available width"
      ],
      "fontSize": 24
    }
    "#);
}

#[test]
fn oversized_quote_shrinks_to_fit() {
    let snapshot = layout(
        "Nothing is impossible, the word itself says I'm possible!",
        300,
        120,
        40,
    );
    insta::assert_json_snapshot!(snapshot, @r#"
    {
      "lines": [
        "Nothing is impossible,",
        "the word itself says",
        "I'm possible!"
      ],
      "fontSize": 22
    }
    "#);
}

#[test]
fn short_lines_keep_the_base_size() {
    let snapshot = layout("Stay hungry.\r\nStay foolish.", 600, 300, 64);
    insta::assert_json_snapshot!(snapshot, @r#"
    {
      "lines": [
        "Stay hungry.",
        "Stay foolish."
      ],
      "fontSize": 64
    }
    "#);
}
