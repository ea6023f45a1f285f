//! Markdown preview rendering.

use pulldown_cmark::{html, Options, Parser};

/// Renders Markdown to HTML and sanitizes the result. The sanitize pass is
/// unconditional: raw HTML embedded in the source never reaches the output.
pub fn to_safe_html(markdown: &str) -> String {
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
    let parser = Parser::new_ext(markdown, options);
    let mut rendered = String::new();
    html::push_html(&mut rendered, parser);
    ammonia::clean(&rendered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_basic_markdown() {
        let html = to_safe_html("# Hello\n\nsome *emphasis*");
        assert!(html.contains("<h1>Hello</h1>"));
        assert!(html.contains("<em>emphasis</em>"));
    }

    #[test]
    fn strips_script_tags_from_inline_html() {
        let html = to_safe_html("safe text <script>alert('x')</script>");
        assert!(!html.contains("<script>"));
        assert!(html.contains("safe text"));
    }

    #[test]
    fn strips_event_handler_attributes() {
        let html = to_safe_html("<img src=\"x\" onerror=\"alert(1)\">");
        assert!(!html.contains("onerror"));
    }
}
