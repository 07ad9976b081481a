//! Markdown → HTML as an ordered series of textual rewrites.
//!
//! The order of the passes is load-bearing; each one assumes the output of the
//! previous:
//!
//! 1. pipe tables
//! 2. fenced code blocks
//! 3. headings (`###` before `##` before `#`)
//! 4. inline spans: bold, italic, strikethrough, inline code
//! 5. images, then links
//! 6. list items, with contiguous runs wrapped in `<ul>`
//! 7. task-list markers inside list items
//! 8. remaining newlines → `<br>`
//!
//! Finished tables and code blocks are parked as protected blocks behind a
//! placeholder so later passes cannot touch them, and put back at the very end.
//! No pass fails: text a pattern doesn't match is left unchanged.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::table::convert_tables_with;
use crate::utils::escape;

const BLOCK_OPEN: char = '\u{E002}';
const BLOCK_CLOSE: char = '\u{E003}';

macro_rules! pattern {
    ($name:ident, $re:expr) => {
        static $name: LazyLock<Regex> =
            LazyLock::new(|| Regex::new($re).expect(concat!(stringify!($name), " is valid")));
    };
}

pattern!(FENCED_CODE_RE, r"(?s)```(.*?)```");
pattern!(HEADING_RE, r"(?m)^(#{1,3}) (.*)$");
pattern!(BOLD_ITALIC_RE, r"\*\*\*([^*\n]+?)\*\*\*");
pattern!(BOLD_RE, r"\*\*(.+?)\*\*");
pattern!(ITALIC_RE, r"\*([^*\s](?:[^*\n]*[^*\s])?)\*");
pattern!(STRIKE_RE, r"~~(.+?)~~");
pattern!(INLINE_CODE_RE, r"`([^`\n]+)`");
pattern!(IMAGE_RE, r"!\[([^\]\n]*)\]\(([^)\n]+)\)");
pattern!(LINK_RE, r"\[([^\]\n]+)\]\(([^)\n]+)\)");
pattern!(LIST_ITEM_RE, r"(?m)^[ \t]*(?:[*-]|\d+\.)[ \t]+(.*)$");
pattern!(TASK_OPEN_RE, r"<li>\[ \] (.*?)</li>");
pattern!(TASK_DONE_RE, r"<li>\[[xX]\] (.*?)</li>");
pattern!(CODE_LANG_RE, r"^[A-Za-z0-9_+#.-]+$");

/// HTML fragments already in final form, hidden from the remaining passes.
#[derive(Debug, Default)]
struct ProtectedBlocks {
    blocks: Vec<String>,
}

impl ProtectedBlocks {
    fn save(&mut self, html: String) -> String {
        let token = format!("{BLOCK_OPEN}H{}{BLOCK_CLOSE}", self.blocks.len());
        self.blocks.push(html);
        token
    }

    /// Newest first: a block saved later may hold the token of an earlier one.
    fn restore(&self, text: &str) -> String {
        let mut out = text.to_string();
        for (i, html) in self.blocks.iter().enumerate().rev() {
            let token = format!("{BLOCK_OPEN}H{i}{BLOCK_CLOSE}");
            out = out.replacen(&token, html, 1);
        }
        out
    }
}

/// Convert placeholder-protected Markdown to HTML.
pub fn transform(text: &str) -> String {
    let text = text.replace("\r\n", "\n");
    let mut protected = ProtectedBlocks::default();

    let text = convert_tables_with(&text, render_inline, |html| protected.save(html));
    let text = fenced_code_blocks(&text, &mut protected);
    let text = headings(&text);
    let text = render_inline(&text);
    let text = list_items(&text);
    let text = task_markers(&text);
    let html = text.replace('\n', "<br>");

    tracing::debug!(
        protected = protected.blocks.len(),
        len = html.len(),
        "markdown transformed"
    );
    protected.restore(&html)
}

/// Inline spans followed by images and links. Also used for table cells.
fn render_inline(text: &str) -> String {
    links_and_images(&inline_spans(text))
}

fn fenced_code_blocks(text: &str, protected: &mut ProtectedBlocks) -> String {
    FENCED_CODE_RE
        .replace_all(text, |caps: &Captures| {
            let (lang, code) = split_code_language(&caps[1]);
            let html = match lang {
                Some(lang) => format!(
                    "<pre class=\"code-block\"><code class=\"language-{}\">{}</code></pre>",
                    escape(lang),
                    escape(code)
                ),
                None => format!(
                    "<pre class=\"code-block\"><code>{}</code></pre>",
                    escape(code)
                ),
            };
            protected.save(html)
        })
        .into_owned()
}

/// Split a fence payload into its info word (if the first line is a bare
/// word) and the code, minus the newlines hugging the fences.
fn split_code_language(payload: &str) -> (Option<&str>, &str) {
    let (lang, code) = match payload.split_once('\n') {
        Some((first, rest)) if CODE_LANG_RE.is_match(first.trim()) => (Some(first.trim()), rest),
        Some((first, rest)) if first.trim().is_empty() => (None, rest),
        _ => (None, payload),
    };
    (lang, code.strip_suffix('\n').unwrap_or(code))
}

fn headings(text: &str) -> String {
    HEADING_RE
        .replace_all(text, |caps: &Captures| {
            let level = caps[1].len();
            format!("<h{level}>{}</h{level}>", &caps[2])
        })
        .into_owned()
}

/// `***` before `**` before `*` so markers are never split and tags nest.
fn inline_spans(text: &str) -> String {
    let text = BOLD_ITALIC_RE.replace_all(text, "<strong><em>${1}</em></strong>");
    let text = BOLD_RE.replace_all(&text, "<strong>${1}</strong>");
    let text = ITALIC_RE.replace_all(&text, "<em>${1}</em>");
    let text = STRIKE_RE.replace_all(&text, "<del>${1}</del>");
    INLINE_CODE_RE
        .replace_all(&text, "<code class=\"code-inline\">${1}</code>")
        .into_owned()
}

/// Images go first: once `![alt](url)` is an `<img>`, the link pattern can no
/// longer see its brackets.
fn links_and_images(text: &str) -> String {
    let text = IMAGE_RE.replace_all(text, |caps: &Captures| {
        format!(
            "<img src=\"{}\" alt=\"{}\">",
            escape(caps[2].trim()),
            escape(&caps[1])
        )
    });
    LINK_RE
        .replace_all(&text, |caps: &Captures| {
            format!("<a href=\"{}\">{}</a>", escape(caps[2].trim()), &caps[1])
        })
        .into_owned()
}

fn list_items(text: &str) -> String {
    let items = LIST_ITEM_RE.replace_all(text, "<li>${1}</li>");

    let mut out: Vec<String> = Vec::new();
    let mut run: Vec<&str> = Vec::new();
    for line in items.split('\n') {
        if line.starts_with("<li>") && line.ends_with("</li>") {
            run.push(line);
            continue;
        }
        if !run.is_empty() {
            out.push(format!("<ul>{}</ul>", run.concat()));
            run.clear();
        }
        out.push(line.to_string());
    }
    if !run.is_empty() {
        out.push(format!("<ul>{}</ul>", run.concat()));
    }
    out.join("\n")
}

fn task_markers(text: &str) -> String {
    let text = TASK_OPEN_RE.replace_all(
        text,
        "<li class=\"task-list-item\"><input type=\"checkbox\" disabled> ${1}</li>",
    );
    TASK_DONE_RE
        .replace_all(
            &text,
            "<li class=\"task-list-item\"><input type=\"checkbox\" checked disabled> ${1}</li>",
        )
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headings_match_longest_marker() {
        insta::assert_snapshot!(transform("# One"), @"<h1>One</h1>");
        insta::assert_snapshot!(transform("### Three"), @"<h3>Three</h3>");
        assert_eq!(transform("#### Four"), "#### Four");
        assert_eq!(transform("#NoSpace"), "#NoSpace");
    }

    #[test]
    fn bold_wins_over_italic() {
        insta::assert_snapshot!(
            transform("**bold** and *em* and ~~gone~~"),
            @"<strong>bold</strong> and <em>em</em> and <del>gone</del>"
        );
    }

    #[test]
    fn triple_stars_nest_properly() {
        insta::assert_snapshot!(transform("***both*** end"), @"<strong><em>both</em></strong> end");
    }

    #[test]
    fn unbalanced_markers_are_left_alone() {
        assert_eq!(transform("2 * 3 = 6"), "2 * 3 = 6");
        assert_eq!(transform("**open"), "**open");
    }

    #[test]
    fn inline_code() {
        insta::assert_snapshot!(transform("run `cargo`"), @r#"run <code class="code-inline">cargo</code>"#);
    }

    #[test]
    fn fenced_code_is_escaped_and_untouched() {
        let html = transform("```\n<script>alert(1)</script>\n*not em*\n```");
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("*not em*"));
        assert!(!html.contains("<br>"));
    }

    #[test]
    fn fence_opened_mid_line_keeps_table_text_as_code() {
        let html = transform("see ```\n|A|B|\n|--|--|\n```");
        assert_eq!(
            html,
            "see <pre class=\"code-block\"><code>|A|B|\n|--|--|</code></pre>"
        );
        assert!(!html.contains(BLOCK_OPEN));
    }

    #[test]
    fn nested_protected_blocks_are_all_restored() {
        let mut protected = ProtectedBlocks::default();
        let inner = protected.save("<table></table>".into());
        let outer = protected.save(format!("<pre>{inner}</pre>"));
        assert_eq!(protected.restore(&format!("a {outer} b")), "a <pre><table></table></pre> b");
    }

    #[test]
    fn fenced_code_language_class() {
        let html = transform("```rust\nfn main() {}\n```");
        insta::assert_snapshot!(
            html,
            @r#"<pre class="code-block"><code class="language-rust">fn main() {}</code></pre>"#
        );
    }

    #[test]
    fn images_before_links() {
        insta::assert_snapshot!(
            transform("![cat](a.png) [home](/)"),
            @r#"<img src="a.png" alt="cat"> <a href="/">home</a>"#
        );
    }

    #[test]
    fn link_urls_are_escaped() {
        let html = transform("[q](/search?a=1&b=\"x\")");
        assert_eq!(html, "<a href=\"/search?a=1&amp;b=&quot;x&quot;\">q</a>");
    }

    #[test]
    fn contiguous_items_share_one_list() {
        insta::assert_snapshot!(
            transform("- a\n* b\n1. c\n\ntext"),
            @"<ul><li>a</li><li>b</li><li>c</li></ul><br><br>text"
        );
    }

    #[test]
    fn separate_runs_get_separate_lists() {
        let html = transform("- a\nbreak\n- b");
        assert_eq!(html.matches("<ul>").count(), 2);
    }

    #[test]
    fn italic_list_items() {
        insta::assert_snapshot!(transform("* *soft* item"), @"<ul><li><em>soft</em> item</li></ul>");
    }

    #[test]
    fn task_list_markers() {
        insta::assert_snapshot!(
            transform("- [ ] a"),
            @r#"<ul><li class="task-list-item"><input type="checkbox" disabled> a</li></ul>"#
        );
        insta::assert_snapshot!(
            transform("- [x] b"),
            @r#"<ul><li class="task-list-item"><input type="checkbox" checked disabled> b</li></ul>"#
        );
    }

    #[test]
    fn newlines_become_breaks_outside_tables() {
        let html = transform("line one\nline two\n\n|A|B|\n|--|--|\n|1|2|\nafter");
        assert!(html.starts_with("line one<br>line two<br><br><div class=\"table-container\">\n"));
        assert!(html.ends_with("</div><br>after"));
        assert!(html.contains("<th>A</th>\n"));
    }

    #[test]
    fn table_cells_get_inline_marks() {
        let html = transform("| **x** | [l](u) |\n|---|---|\n| `c` | y |");
        assert!(html.contains("<th><strong>x</strong></th>"));
        assert!(html.contains("<th><a href=\"u\">l</a></th>"));
        assert!(html.contains("<td><code class=\"code-inline\">c</code></td>"));
    }

    #[test]
    fn crlf_input() {
        assert_eq!(transform("a\r\nb"), "a<br>b");
    }
}
