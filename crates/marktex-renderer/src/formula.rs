//! Formula extraction.
//!
//! Math spans are cut out of the source before any Markdown rule runs and
//! replaced with placeholders made of private-use sigils around a kind letter
//! and a counter, e.g. `\u{E000}B0\u{E001}`. None of those characters mean
//! anything to the Markdown passes, so the placeholders come through intact.

use std::fmt;
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use smol_str::{SmolStr, format_smolstr};

/// Opening sigil of a formula placeholder.
pub const PLACEHOLDER_OPEN: char = '\u{E000}';
/// Closing sigil of a formula placeholder.
pub const PLACEHOLDER_CLOSE: char = '\u{E001}';

static BLOCK_MATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\$\$.*?\$\$").expect("block math pattern is valid"));

/// Display mode of a formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormulaKind {
    /// `$…$`, flows with the surrounding text.
    Inline,
    /// `$$…$$`, may span lines, rendered on its own line.
    Block,
}

impl FormulaKind {
    pub fn delimiter(self) -> &'static str {
        match self {
            Self::Inline => "$",
            Self::Block => "$$",
        }
    }

    pub fn is_display(self) -> bool {
        matches!(self, Self::Block)
    }

    fn tag(self) -> char {
        match self {
            Self::Inline => 'I',
            Self::Block => 'B',
        }
    }
}

impl fmt::Display for FormulaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Inline => "inline",
            Self::Block => "block",
        })
    }
}

/// One extracted math span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formula {
    /// Source text including delimiters.
    pub raw: String,
    pub kind: FormulaKind,
    pub placeholder: SmolStr,
    /// Byte offset of `raw` in the original source.
    pub position: usize,
}

impl Formula {
    /// The TeX between the delimiters.
    pub fn body(&self) -> &str {
        let delim = self.kind.delimiter();
        self.raw
            .strip_prefix(delim)
            .and_then(|s| s.strip_suffix(delim))
            .unwrap_or(&self.raw)
    }
}

/// Placeholder → formula map for a single render, in discovery order
/// (all block formulas, then all inline formulas, each left to right).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormulaSet {
    formulas: Vec<Formula>,
}

impl FormulaSet {
    pub fn len(&self) -> usize {
        self.formulas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formulas.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Formula> {
        self.formulas.iter()
    }

    pub fn get(&self, placeholder: &str) -> Option<&Formula> {
        self.formulas.iter().find(|f| f.placeholder == placeholder)
    }

    pub fn count(&self, kind: FormulaKind) -> usize {
        self.formulas.iter().filter(|f| f.kind == kind).count()
    }

    /// Put every formula's raw source back in place of its placeholder.
    pub fn restore_raw(&self, text: &str) -> String {
        let mut out = text.to_string();
        for formula in &self.formulas {
            out = out.replacen(formula.placeholder.as_str(), &formula.raw, 1);
        }
        out
    }
}

impl<'a> IntoIterator for &'a FormulaSet {
    type Item = &'a Formula;
    type IntoIter = std::slice::Iter<'a, Formula>;

    fn into_iter(self) -> Self::IntoIter {
        self.formulas.iter()
    }
}

/// Replace math spans in `text` with placeholders.
///
/// Block spans are found first so the dollars inside them are never taken for
/// inline delimiters. Unterminated delimiters are left as they are.
pub fn extract(text: &str) -> (String, FormulaSet) {
    let blocks: Vec<Range<usize>> = BLOCK_MATH_RE.find_iter(text).map(|m| m.range()).collect();
    let inlines = find_inline_spans(text, &blocks);

    let mut formulas = Vec::with_capacity(blocks.len() + inlines.len());
    let discovered = blocks
        .into_iter()
        .map(|r| (r, FormulaKind::Block))
        .chain(inlines.into_iter().map(|r| (r, FormulaKind::Inline)));
    for (counter, (range, kind)) in discovered.enumerate() {
        formulas.push(Formula {
            raw: text[range.clone()].to_string(),
            kind,
            placeholder: format_smolstr!(
                "{PLACEHOLDER_OPEN}{}{counter}{PLACEHOLDER_CLOSE}",
                kind.tag()
            ),
            position: range.start,
        });
    }

    let mut spliced: Vec<&Formula> = formulas.iter().collect();
    spliced.sort_by_key(|f| f.position);

    let mut protected = String::with_capacity(text.len());
    let mut cursor = 0;
    for formula in spliced {
        protected.push_str(&text[cursor..formula.position]);
        protected.push_str(&formula.placeholder);
        cursor = formula.position + formula.raw.len();
    }
    protected.push_str(&text[cursor..]);

    tracing::debug!(
        blocks = formulas.iter().filter(|f| f.kind == FormulaKind::Block).count(),
        total = formulas.len(),
        "extracted formulas"
    );

    (protected, FormulaSet { formulas })
}

/// Single-dollar spans outside `blocks`: no newline and no unescaped `$`
/// inside, non-empty body.
fn find_inline_spans(text: &str, blocks: &[Range<usize>]) -> Vec<Range<usize>> {
    let bytes = text.as_bytes();
    let mut spans = Vec::new();
    let mut blocks = blocks.iter().peekable();
    let mut i = 0;

    while i < bytes.len() {
        let limit = match blocks.peek() {
            Some(block) if block.start <= i => {
                i = block.end;
                blocks.next();
                continue;
            }
            Some(block) => block.start,
            None => bytes.len(),
        };

        match bytes[i] {
            b'\\' => i += 2,
            b'$' => match closing_dollar(bytes, i + 1, limit) {
                Some(end) if end > i + 1 => {
                    spans.push(i..end + 1);
                    i = end + 1;
                }
                _ => i += 1,
            },
            _ => i += 1,
        }
    }

    spans
}

fn closing_dollar(bytes: &[u8], from: usize, limit: usize) -> Option<usize> {
    let mut j = from;
    while j < limit {
        match bytes[j] {
            b'\\' => j += 2,
            b'\n' => return None,
            b'$' => return Some(j),
            _ => j += 1,
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_formula_swallows_inner_inline_dollars() {
        let (protected, set) = extract("$$ $a$ $$");
        assert_eq!(set.count(FormulaKind::Block), 1);
        assert_eq!(set.count(FormulaKind::Inline), 0);
        let formula = set.iter().next().unwrap();
        assert_eq!(formula.raw, "$$ $a$ $$");
        assert_eq!(formula.body(), " $a$ ");
        assert_eq!(protected, formula.placeholder.as_str());
    }

    #[test]
    fn block_formulas_are_numbered_before_inline_ones() {
        let (_, set) = extract("$x$ then\n$$\ny\n$$");
        let kinds: Vec<_> = set.iter().map(|f| f.kind).collect();
        assert_eq!(kinds, vec![FormulaKind::Block, FormulaKind::Inline]);
        let inline = set.iter().nth(1).unwrap();
        assert_eq!(inline.raw, "$x$");
        assert_eq!(inline.position, 0);
    }

    #[test]
    fn inline_math_does_not_cross_newlines() {
        let (protected, set) = extract("price $5\nand $6");
        assert!(set.is_empty());
        assert_eq!(protected, "price $5\nand $6");
    }

    #[test]
    fn escaped_dollars_are_not_delimiters() {
        let (_, set) = extract(r"costs \$5 or \$6, but $x$ is math");
        assert_eq!(set.len(), 1);
        assert_eq!(set.iter().next().unwrap().raw, "$x$");
    }

    #[test]
    fn unterminated_delimiters_pass_through() {
        let input = "open $$ never closed and $ alone";
        let (protected, set) = extract(input);
        assert!(set.is_empty());
        assert_eq!(protected, input);
    }

    #[test]
    fn inline_span_stops_at_block_formula() {
        let (_, set) = extract("$a $$b$$ c$");
        assert_eq!(set.count(FormulaKind::Block), 1);
        assert_eq!(set.count(FormulaKind::Inline), 0);
    }

    #[test]
    fn restore_reproduces_source() {
        let input = "Euler: $e^{i\\pi}+1=0$\n\n$$\n\\int_0^1 x\\,dx\n$$\n| a | $|x|$ |";
        let (protected, set) = extract(input);
        assert!(!protected.contains('$'));
        assert_eq!(set.restore_raw(&protected), input);
    }

    #[test]
    fn placeholders_are_unique() {
        let (_, set) = extract("$a$ $a$ $$a$$");
        let mut seen = std::collections::HashSet::new();
        for formula in &set {
            assert!(seen.insert(formula.placeholder.clone()));
        }
        assert_eq!(seen.len(), 3);
    }
}
