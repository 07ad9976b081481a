//! Pipe table conversion.
//!
//! Line-oriented: a row that looks like a table row starts a table only when
//! the next line is a separator row. Everything else passes through in order.
//! Lines inside a ``` fence are never table rows.

/// Trimmed line starts or ends with a pipe and splits into at least three
/// fields.
pub fn is_table_row(line: &str) -> bool {
    let trimmed = line.trim();
    (trimmed.starts_with('|') || trimmed.ends_with('|')) && trimmed.split('|').count() >= 3
}

/// A table row that also carries a dash, e.g. `|---|:--:|`.
pub fn is_separator_row(line: &str) -> bool {
    is_table_row(line) && line.contains('-')
}

/// Split a row into trimmed cells, dropping one leading and one trailing pipe.
pub fn parse_cells(line: &str) -> Vec<&str> {
    let mut row = line.trim();
    row = row.strip_prefix('|').unwrap_or(row);
    row = row.strip_suffix('|').unwrap_or(row);
    row.split('|').map(str::trim).collect()
}

/// Replace every recognized table with an HTML table fragment.
pub fn convert_tables(text: &str) -> String {
    convert_tables_with(text, str::to_string, |html| html)
}

/// Table conversion with hooks: `format_cell` renders each cell's contents and
/// `emit` decides what goes into the output in place of the finished fragment.
pub fn convert_tables_with<C, E>(text: &str, format_cell: C, mut emit: E) -> String
where
    C: Fn(&str) -> String,
    E: FnMut(String) -> String,
{
    let lines: Vec<&str> = text.split('\n').collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut group: Vec<&str> = Vec::new();
    let mut in_table = false;
    let mut in_fence = false;

    for (i, line) in lines.iter().enumerate() {
        // A fence may open anywhere on a line, as the code-block pass sees it.
        if in_fence || line.contains("```") {
            if in_table {
                flush_group(&mut group, &mut out, &format_cell, &mut emit);
                in_table = false;
            }
            if line.matches("```").count() % 2 == 1 {
                in_fence = !in_fence;
            }
            out.push(line.to_string());
            continue;
        }

        if is_table_row(line) {
            if in_table {
                group.push(line);
            } else if lines.get(i + 1).is_some_and(|next| is_separator_row(next)) {
                in_table = true;
                group.push(line);
            } else {
                out.push(line.to_string());
            }
            continue;
        }

        if in_table {
            flush_group(&mut group, &mut out, &format_cell, &mut emit);
            in_table = false;
        }
        out.push(line.to_string());
    }

    if in_table {
        flush_group(&mut group, &mut out, &format_cell, &mut emit);
    }

    out.join("\n")
}

fn flush_group<C, E>(group: &mut Vec<&str>, out: &mut Vec<String>, format_cell: &C, emit: &mut E)
where
    C: Fn(&str) -> String,
    E: FnMut(String) -> String,
{
    if group.len() >= 2 {
        tracing::debug!(rows = group.len(), "converting table");
        out.push(emit(table_to_html(group, format_cell)));
    } else {
        out.extend(group.iter().map(|line| line.to_string()));
    }
    group.clear();
}

/// Header row, separator row, then data rows. The header's cell count fixes
/// the column count; data rows are padded or truncated to it.
fn table_to_html<C: Fn(&str) -> String>(lines: &[&str], format_cell: &C) -> String {
    let header = parse_cells(lines[0]);
    let columns = header.len();

    let mut html =
        String::from("<div class=\"table-container\">\n<table class=\"md-table\">\n<thead>\n<tr>\n");
    for cell in &header {
        html.push_str("  <th>");
        html.push_str(&format_cell(cell));
        html.push_str("</th>\n");
    }
    html.push_str("</tr>\n</thead>\n<tbody>\n");

    for line in lines.iter().skip(2) {
        let cells = parse_cells(line);
        html.push_str("<tr>\n");
        for column in 0..columns {
            html.push_str("  <td>");
            if let Some(cell) = cells.get(column) {
                html.push_str(&format_cell(cell));
            }
            html.push_str("</td>\n");
        }
        html.push_str("</tr>\n");
    }

    html.push_str("</tbody>\n</table>\n</div>");
    html
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_detection_is_strict() {
        assert!(is_table_row("|A|B|"));
        assert!(is_table_row("A | B |"));
        assert!(is_table_row("  | A |  "));
        assert!(!is_table_row("  | A "));
        assert!(!is_table_row("A | B"));
        assert!(!is_table_row("|A"));
        assert!(!is_table_row("no pipes"));
        assert!(is_separator_row("|--|--|"));
        assert!(!is_separator_row("|A|B|"));
        assert!(!is_separator_row("- a | b"));
    }

    #[test]
    fn cells_keep_empty_fields() {
        assert_eq!(parse_cells(" | a |  | c | "), vec!["a", "", "c"]);
        assert_eq!(parse_cells("a|b"), vec!["a", "b"]);
    }

    #[test]
    fn converts_header_separator_and_data() {
        let html = convert_tables("|A|B|\n|--|--|\n|1|2|");
        assert_eq!(
            html,
            "<div class=\"table-container\">\n<table class=\"md-table\">\n<thead>\n<tr>\n  <th>A</th>\n  <th>B</th>\n</tr>\n</thead>\n<tbody>\n<tr>\n  <td>1</td>\n  <td>2</td>\n</tr>\n</tbody>\n</table>\n</div>"
        );
    }

    #[test]
    fn lone_row_is_not_a_table() {
        assert_eq!(convert_tables("|A|B|"), "|A|B|");
        assert_eq!(convert_tables("|A|B|\ntext"), "|A|B|\ntext");
    }

    #[test]
    fn rows_are_padded_and_truncated() {
        let html = convert_tables("|A|B|C|\n|-|-|-|\n|1|\n|1|2|3|4|5|");
        let bodies: Vec<&str> = html.split("<tr>").skip(2).collect();
        assert_eq!(bodies.len(), 2);
        assert_eq!(bodies[0].matches("<td>").count(), 3);
        assert!(bodies[0].contains("<td>1</td>\n  <td></td>\n  <td></td>"));
        assert_eq!(bodies[1].matches("<td>").count(), 3);
        assert!(!bodies[1].contains('4'));
    }

    #[test]
    fn surrounding_lines_keep_their_order() {
        let html = convert_tables("before\n|A|\n|-|\n|1|\nafter");
        assert!(html.starts_with("before\n<div class=\"table-container\">"));
        assert!(html.ends_with("</div>\nafter"));
    }

    #[test]
    fn table_at_end_of_input_is_flushed() {
        let html = convert_tables("intro\n| x | y |\n| --- | --- |");
        assert!(html.contains("<th>x</th>"));
        assert!(!html.contains("<td>"));
    }

    #[test]
    fn fenced_rows_are_left_alone() {
        let input = "```\n|A|B|\n|--|--|\n```\n|C|\n|-|";
        let html = convert_tables(input);
        assert!(html.starts_with("```\n|A|B|\n|--|--|\n```\n"));
        assert!(html.contains("<th>C</th>"));
        assert!(!html.contains("<th>A</th>"));
    }

    #[test]
    fn fence_opening_mid_line_hides_rows() {
        let input = "see ```\n|A|B|\n|--|--|\n```";
        assert_eq!(convert_tables(input), input);
    }

    #[test]
    fn emit_hook_replaces_fragment() {
        let mut saved = Vec::new();
        let out = convert_tables_with(
            "a\n|A|\n|-|\nb",
            |cell| cell.to_uppercase(),
            |html| {
                saved.push(html);
                "TABLE".to_string()
            },
        );
        assert_eq!(out, "a\nTABLE\nb");
        assert!(saved[0].contains("<th>A</th>"));
    }
}
