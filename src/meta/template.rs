//! Injection script template.

/// Script evaluated in the page; `__META__` is replaced by a JSON string literal.
const INSERT_HEAD_META: &str = r#"(() => {
  const template = document.createElement('template');
  template.innerHTML = __META__;
  const head = document.head || document.documentElement.insertBefore(
    document.createElement('head'),
    document.documentElement.firstChild,
  );
  head.append(...template.content.childNodes);
  return true;
})()"#;

/// Wrap raw meta markup into a script that appends it to `<head>`.
pub fn render_script(markup: &str) -> String {
    let literal = serde_json::Value::String(markup.trim().to_owned()).to_string();
    INSERT_HEAD_META.replace("__META__", &literal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markup_is_embedded_as_string_literal() {
        let script = render_script("  <meta name=\"og:title\" content=\"It's \\\"here\\\"\">\n");
        assert!(script.contains(r#"template.innerHTML = "<meta name=\"og:title\""#));
        assert!(!script.contains("__META__"));
        assert!(!script.contains("\n\""));
    }

    #[test]
    fn test_closing_script_tags_cannot_escape() {
        let script = render_script("</script><script>alert(1)</script>");
        // The markup stays inside a single JS string literal.
        let start = script.find("innerHTML = \"").unwrap();
        let end = script[start..].find("\";").unwrap();
        assert!(script[start..start + end].contains("alert(1)"));
    }
}
