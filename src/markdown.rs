//! Markdown rendering for issue and comment bodies.

use comrak::Options;

/// Renders GitHub Flavored Markdown to HTML fragments.
///
/// Enables the GFM extensions GitHub applies to issue text: tables,
/// strikethrough, autolinks and task lists. Raw HTML embedded in the source
/// is not passed through, since bodies come from arbitrary issue authors.
pub struct MarkdownRenderer<'a> {
    options: Options<'a>,
}

impl<'a> MarkdownRenderer<'a> {
    pub fn new() -> Self {
        let mut options = Options::default();

        options.extension.strikethrough = true;
        options.extension.table = true;
        options.extension.autolink = true;
        options.extension.tasklist = true;

        // Issue text uses single newlines as line breaks.
        options.render.hardbreaks = true;

        Self { options }
    }

    pub fn render(&self, content: &str) -> String {
        comrak::markdown_to_html(content, &self.options)
    }
}

impl<'a> Default for MarkdownRenderer<'a> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_basic_markdown() {
        // Arrange
        let renderer = MarkdownRenderer::new();

        // Act
        let html = renderer.render("# Outage\n\nThis is **urgent**.");

        // Assert
        assert!(html.contains("<h1>"), "Should contain h1 tag: {}", html);
        assert!(html.contains("<strong>urgent</strong>"), "Should contain bold text");
    }

    #[test]
    fn test_render_gfm_tasklist() {
        // Arrange
        let renderer = MarkdownRenderer::new();

        // Act
        let html = renderer.render("- [ ] collect logs\n- [x] page on-call\n");

        // Assert
        assert!(html.contains("type=\"checkbox\""), "Should contain checkbox: {}", html);
        assert!(html.contains("page on-call"));
    }

    #[test]
    fn test_render_autolinks() {
        // Arrange
        let renderer = MarkdownRenderer::new();

        // Act
        let html = renderer.render("See https://grafana.com/docs for details.");

        // Assert
        assert!(html.contains("<a href=\"https://grafana.com/docs\">"), "{}", html);
    }

    #[test]
    fn test_render_drops_raw_html() {
        // Arrange
        let renderer = MarkdownRenderer::new();

        // Act
        let html = renderer.render("<script>alert('x')</script>\n\nNormal text.");

        // Assert
        assert!(!html.contains("<script>"), "Raw HTML must not pass through: {}", html);
        assert!(html.contains("Normal text"));
    }
}
