use anyhow::{Context, Result};
use tera::{Context as TeraContext, Tera};

const SINGLE_QUOTE_TEMPLATE: &str = include_str!("templates/single_quote.html.tera");

pub(crate) fn render_single_quote_page(image_url: &str, bucket_id: &str, image_id: &str) -> Result<String> {
    let mut context = TeraContext::new();
    context.insert("image_url", image_url);
    context.insert("bucket_id", bucket_id);
    context.insert("image_id", image_id);
    Tera::one_off(SINGLE_QUOTE_TEMPLATE, &context, true)
        .with_context(|| "failed to render single quote page")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_embeds_escaped_image_url() {
        let html = render_single_quote_page("/uploaded/16102026/a.jpeg?x=<1>", "16102026", "a.jpeg")
            .expect("render");
        assert!(html.contains("a.jpeg?x=&lt;1&gt;"));
        assert!(!html.contains("<1>"));
        assert!(html.contains("og:image"));
    }
}
