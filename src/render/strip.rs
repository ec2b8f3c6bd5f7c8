//! Removal of external resource references from rendered markup.

use lol_html::{element, rewrite_str, RewriteStrSettings};

use crate::render::RenderError;

/// Drop every `<script>` and stylesheet `<link>` from `html`.
///
/// The prerendered DOM already contains whatever those resources produced.
pub fn strip_external_resources(html: &str) -> Result<String, RenderError> {
    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!("script", |el| {
                    el.remove();
                    Ok(())
                }),
                element!("link", |el| {
                    let is_stylesheet = el.get_attribute("rel").is_some_and(|rel| {
                        rel.split_ascii_whitespace()
                            .any(|token| token.eq_ignore_ascii_case("stylesheet"))
                    });
                    if is_stylesheet {
                        el.remove();
                    }
                    Ok(())
                }),
            ],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|e| RenderError::Internal(format!("failed to strip external resources: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_scripts_and_stylesheets() {
        let html = concat!(
            "<html><head>",
            "<link rel=\"stylesheet\" href=\"/a.css\">",
            "<link rel=\"alternate stylesheet\" href=\"/b.css\">",
            "<link rel=\"canonical\" href=\"https://a.test/\">",
            "<script src=\"/app.js\"></script>",
            "<script>window.x = '<b>';</script>",
            "<meta name=\"og:title\" content=\"A\">",
            "</head><body><p>hi</p></body></html>",
        );

        let out = strip_external_resources(html).unwrap();
        assert_eq!(
            out,
            concat!(
                "<html><head>",
                "<link rel=\"canonical\" href=\"https://a.test/\">",
                "<meta name=\"og:title\" content=\"A\">",
                "</head><body><p>hi</p></body></html>",
            )
        );
    }

    #[test]
    fn test_leaves_plain_documents_untouched() {
        let html = "<!DOCTYPE html><html><body>plain</body></html>";
        assert_eq!(strip_external_resources(html).unwrap(), html);
    }
}
