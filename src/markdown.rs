use std::sync::OnceLock;

use pulldown_cmark::{html, Options, Parser};
use regex::Regex;

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Escaped copy of `text` with markdown constructs wrapped in `hl-*` spans,
/// drawn under the transparent textarea.
pub fn highlight(text: &str) -> String {
    static RE_HEADING: OnceLock<Regex> = OnceLock::new();
    static RE_BOLD: OnceLock<Regex> = OnceLock::new();
    static RE_ITALIC: OnceLock<Regex> = OnceLock::new();
    static RE_CODE: OnceLock<Regex> = OnceLock::new();
    static RE_LINK: OnceLock<Regex> = OnceLock::new();
    static RE_QUOTE: OnceLock<Regex> = OnceLock::new();

    let re_heading = RE_HEADING
        .get_or_init(|| Regex::new(r"(?m)^(#{1,6})([^\S\n]+.*)$").expect("valid heading regex"));
    let re_bold = RE_BOLD.get_or_init(|| Regex::new(r"\*\*(.+?)\*\*").expect("valid bold regex"));
    let re_italic = RE_ITALIC.get_or_init(|| {
        // Star runs are matched first so `**` never opens an italic span.
        Regex::new(r"\*\*+|\*([^*\n]+)\*").expect("valid italic regex")
    });
    let re_code = RE_CODE.get_or_init(|| Regex::new(r"`([^`]+)`").expect("valid code regex"));
    let re_link = RE_LINK
        .get_or_init(|| Regex::new(r"\[([^\]\n]*)\]\(([^)\s]*)\)").expect("valid link regex"));
    let re_quote = RE_QUOTE.get_or_init(|| Regex::new(r"(?m)^(&gt;.*)$").expect("valid quote regex"));

    let mut out = escape_html(text);
    out = re_heading
        .replace_all(&out, |caps: &regex::Captures| {
            let level = caps[1].len().min(4);
            format!("<span class=\"hl-h{level}\">{}{}</span>", &caps[1], &caps[2])
        })
        .into_owned();
    out = re_bold
        .replace_all(&out, "<span class=\"hl-bold\">**$1**</span>")
        .into_owned();
    out = re_italic
        .replace_all(&out, |caps: &regex::Captures| match caps.get(1) {
            Some(inner) => format!("<span class=\"hl-italic\">*{}*</span>", inner.as_str()),
            None => caps[0].to_string(),
        })
        .into_owned();
    out = re_code
        .replace_all(&out, "<span class=\"hl-code\">`$1`</span>")
        .into_owned();
    out = re_link
        .replace_all(&out, "<span class=\"hl-link\">[$1]($2)</span>")
        .into_owned();
    out = re_quote
        .replace_all(&out, "<span class=\"hl-quote\">$1</span>")
        .into_owned();

    // Keeps a trailing newline as tall as the textarea renders it.
    out.push_str("\n ");
    out
}

/// Scraped bodies often carry headings inside list items (`* ## Title`);
/// pull them back to plain headings before rendering.
fn normalize_headings(md: &str) -> String {
    static RE_LIST_HEADING: OnceLock<Regex> = OnceLock::new();
    let re = RE_LIST_HEADING
        .get_or_init(|| Regex::new(r"(?m)^[^\S\n]*\*? (#+)[^\S\n]*(.*)$").expect("valid heading regex"));
    re.replace_all(md, "$1 $2").into_owned()
}

/// HTML preview of a page body.
pub fn render_preview(md: &str) -> String {
    let source = normalize_headings(md);
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(&source, options);
    let mut out = String::with_capacity(source.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highlights_and_escapes() {
        let out = highlight("## Intro\n<b> **bold** see [A](/a)");
        assert!(out.starts_with("<span class=\"hl-h2\">## Intro</span>\n"));
        assert!(out.contains("&lt;b&gt;"));
        assert!(out.contains("<span class=\"hl-bold\">**bold**</span>"));
        assert!(out.contains("<span class=\"hl-link\">[A](/a)</span>"));
        assert!(out.ends_with("\n "));
    }

    #[test]
    fn highlights_adjacent_italics() {
        let out = highlight("*a* *b*");
        assert!(out.starts_with(
            "<span class=\"hl-italic\">*a*</span> <span class=\"hl-italic\">*b*</span>"
        ));
    }

    #[test]
    fn bold_text_is_not_also_italic() {
        let out = highlight("**x**");
        assert!(!out.contains("hl-italic"));
    }

    #[test]
    fn lifts_list_headings() {
        assert_eq!(normalize_headings("* ## Title\n   ### Sub"), "## Title\n### Sub");
        assert_eq!(normalize_headings("#no-space"), "#no-space");
    }

    #[test]
    fn renders_preview() {
        let html = render_preview("* ## Events\n\nSee [camp](/camp).\n\n| a | b |\n|---|---|\n| 1 | 2 |\n");
        assert!(html.contains("<h2>Events</h2>"));
        assert!(html.contains("<a href=\"/camp\">camp</a>"));
        assert!(html.contains("<table>"));
    }
}
