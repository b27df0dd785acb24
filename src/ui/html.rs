//! Message formatter: a markdown subset rendered to HTML.
//!
//! Paragraphs, bold, italic, inline code, lists and fenced code blocks become
//! markup. Everything else is reduced to its escaped text. Raw HTML in the
//! input is never passed through.

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};

pub const DEFAULT_CODE_LANGUAGE: &str = "plaintext";

/// A fenced or indented code block pulled out of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    pub language: String,
    pub code: String,
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn parser(text: &str) -> Parser<'_> {
    Parser::new_ext(text, Options::empty())
}

fn code_language(kind: &CodeBlockKind<'_>) -> String {
    match kind {
        CodeBlockKind::Fenced(info) => info
            .split_whitespace()
            .next()
            .map(str::to_string)
            .unwrap_or_else(|| DEFAULT_CODE_LANGUAGE.to_string()),
        CodeBlockKind::Indented => DEFAULT_CODE_LANGUAGE.to_string(),
    }
}

/// Code blocks in order of appearance, code trimmed.
pub fn extract_code_blocks(text: &str) -> Vec<CodeBlock> {
    let mut blocks = Vec::new();
    let mut current: Option<CodeBlock> = None;

    for event in parser(text) {
        match event {
            Event::Start(Tag::CodeBlock(kind)) => {
                current = Some(CodeBlock {
                    language: code_language(&kind),
                    code: String::new(),
                });
            }
            Event::Text(content) => {
                if let Some(block) = current.as_mut() {
                    block.code.push_str(&content);
                }
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some(mut block) = current.take() {
                    block.code = block.code.trim().to_string();
                    blocks.push(block);
                }
            }
            _ => {}
        }
    }

    blocks
}

fn render_code_block(block: &CodeBlock, out: &mut String) {
    let language = escape_html(&block.language);
    out.push_str("<div class=\"code-block\"><div class=\"code-header\"><span class=\"code-language\">");
    out.push_str(&language);
    out.push_str("</span></div><pre><code class=\"language-");
    out.push_str(&language);
    out.push_str("\">");
    out.push_str(&escape_html(&block.code));
    out.push_str("</code></pre></div>");
}

/// Render message text to HTML. Output depends only on `text`.
pub fn format_message(text: &str) -> String {
    let mut out = String::with_capacity(text.len() * 2);
    let mut code: Option<CodeBlock> = None;

    for event in parser(text) {
        if let Some(block) = code.as_mut() {
            match event {
                Event::Text(content) => block.code.push_str(&content),
                Event::End(TagEnd::CodeBlock) => {
                    if let Some(mut block) = code.take() {
                        block.code = block.code.trim().to_string();
                        render_code_block(&block, &mut out);
                    }
                }
                _ => {}
            }
            continue;
        }

        match event {
            Event::Start(tag) => match tag {
                Tag::CodeBlock(kind) => {
                    code = Some(CodeBlock {
                        language: code_language(&kind),
                        code: String::new(),
                    });
                }
                Tag::Paragraph | Tag::Heading { .. } => out.push_str("<p>"),
                Tag::Strong => out.push_str("<strong>"),
                Tag::Emphasis => out.push_str("<em>"),
                Tag::List(Some(start)) if start != 1 => {
                    out.push_str(&format!("<ol start=\"{start}\">"));
                }
                Tag::List(Some(_)) => out.push_str("<ol>"),
                Tag::List(None) => out.push_str("<ul>"),
                Tag::Item => out.push_str("<li>"),
                _ => {}
            },
            Event::End(tag) => match tag {
                TagEnd::Paragraph | TagEnd::Heading(_) => out.push_str("</p>"),
                TagEnd::Strong => out.push_str("</strong>"),
                TagEnd::Emphasis => out.push_str("</em>"),
                TagEnd::List(true) => out.push_str("</ol>"),
                TagEnd::List(false) => out.push_str("</ul>"),
                TagEnd::Item => out.push_str("</li>"),
                _ => {}
            },
            Event::Text(content) | Event::Html(content) | Event::InlineHtml(content) => {
                out.push_str(&escape_html(&content));
            }
            Event::Code(content) => {
                out.push_str("<code>");
                out.push_str(&escape_html(&content));
                out.push_str("</code>");
            }
            Event::SoftBreak | Event::HardBreak => out.push_str("<br>"),
            Event::Rule => out.push_str("<hr>"),
            _ => {}
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_all_special_characters() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn renders_inline_formatting() {
        assert_eq!(
            format_message("Use **bold**, *italic* and `code`."),
            "<p>Use <strong>bold</strong>, <em>italic</em> and <code>code</code>.</p>"
        );
    }

    #[test]
    fn raw_html_is_escaped_not_passed_through() {
        let html = format_message("hi <img src=x onerror=alert(1)> there");
        assert!(!html.contains("<img"));
        assert!(html.contains("&lt;img src=x onerror=alert(1)&gt;"));

        let block = format_message("<script>alert('x')</script>");
        assert!(!block.contains("<script>"));
        assert!(block.contains("&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;"));
    }

    #[test]
    fn inline_code_content_is_escaped() {
        assert_eq!(
            format_message("`a < b && c`"),
            "<p><code>a &lt; b &amp;&amp; c</code></p>"
        );
    }

    #[test]
    fn renders_lists_and_paragraphs() {
        assert_eq!(
            format_message("Steps:\n\n- one\n- two"),
            "<p>Steps:</p><ul><li>one</li><li>two</li></ul>"
        );
        assert_eq!(
            format_message("1. first\n2. second"),
            "<ol><li>first</li><li>second</li></ol>"
        );
        assert!(format_message("3. three").starts_with("<ol start=\"3\">"));
    }

    #[test]
    fn line_breaks_become_br() {
        assert_eq!(format_message("a\nb"), "<p>a<br>b</p>");
    }

    #[test]
    fn code_blocks_render_with_language_header() {
        let html = format_message("Run:\n\n```python\nprint(\"<hi>\")\n\n```");
        assert_eq!(
            html,
            "<p>Run:</p><div class=\"code-block\"><div class=\"code-header\"><span class=\"code-language\">python</span></div><pre><code class=\"language-python\">print(&quot;&lt;hi&gt;&quot;)</code></pre></div>"
        );
    }

    #[test]
    fn code_block_markdown_is_not_interpreted() {
        let html = format_message("```\n**not bold**\n```");
        assert!(html.contains("**not bold**"));
        assert!(html.contains("language-plaintext"));
        assert!(!html.contains("<strong>"));
    }

    #[test]
    fn extracts_code_blocks_with_default_language() {
        let text = "first\n```js\n  console.log(1)\n```\nthen\n```\nplain\n```";
        assert_eq!(
            extract_code_blocks(text),
            vec![
                CodeBlock {
                    language: "js".to_string(),
                    code: "console.log(1)".to_string(),
                },
                CodeBlock {
                    language: "plaintext".to_string(),
                    code: "plain".to_string(),
                },
            ]
        );
        assert!(extract_code_blocks("no code here").is_empty());
    }

    #[test]
    fn formatting_is_deterministic() {
        let text = "# Title\n\nSome *mixed* `content` & <tags>\n\n```rust\nfn main() {}\n```\n- a\n- b";
        assert_eq!(format_message(text), format_message(text));
    }

    #[test]
    fn links_render_as_text() {
        assert_eq!(
            format_message("[click](javascript:alert(1))"),
            "<p>click</p>"
        );
    }
}
