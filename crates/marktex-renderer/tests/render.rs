use marktex_renderer::{
    FormulaKind, MathError, MathOptions, MathSupport, RenderConfig, Renderer, extract, inject,
    render,
};

fn echo_math() -> MathSupport {
    MathSupport::available(|tex: &str, opts: MathOptions| {
        let delim = if opts.display_mode { "$$" } else { "$" };
        Ok::<_, MathError>(format!("{delim}{tex}{delim}"))
    })
}

fn without_math() -> Renderer {
    Renderer::with_math(RenderConfig::default(), MathSupport::Unavailable)
}

#[test]
fn block_formula_renders_once_with_its_inner_dollars() {
    let (_, set) = extract("$$ $a$ $$");
    assert_eq!(set.len(), 1);
    assert_eq!(set.count(FormulaKind::Block), 1);

    let html = without_math().render("$$ $a$ $$");
    assert_eq!(html, "<div class=\"math math-display\"> $a$ </div>");

    let html = render("$$x^2$$");
    assert_eq!(html.matches("<math").count(), 1);
}

#[test]
fn no_op_backend_reproduces_block_spans() {
    let source = "intro\n$$\n\\int_0^1 f(x)\\,dx\n$$\nmiddle $$a+b$$ end";
    let (protected, formulas) = extract(source);
    assert_eq!(inject(&protected, &formulas, &echo_math()), source);
}

#[test]
fn table_with_separator_converts() {
    let html = render("|A|B|\n|--|--|\n|1|2|");
    assert!(html.contains("<table class=\"md-table\">"));
    assert!(html.contains("<th>A</th>"));
    assert!(html.contains("<th>B</th>"));
    assert!(html.contains("<td>1</td>"));
    assert!(html.contains("<td>2</td>"));
    assert_eq!(html.matches("<tr>").count(), 2);
}

#[test]
fn lone_row_stays_text() {
    assert_eq!(render("|A|B|"), "|A|B|");
}

#[test]
fn short_and_long_rows_fit_the_header() {
    let html = render("|A|B|\n|--|--|\n|1|\n|1|2|3|");
    assert_eq!(html.matches("<td>").count(), 4);
    assert!(html.contains("<td></td>"));
    assert!(!html.contains("<td>3</td>"));
}

#[test]
fn script_in_code_block_is_escaped() {
    let html = render("```html\n<script>alert('x')</script>\n```");
    assert!(html.contains("&lt;script&gt;"));
    assert!(!html.contains("<script>"));
}

#[test]
fn task_list_items() {
    let html = render("- [ ] a\n- [x] b");
    assert_eq!(
        html,
        "<ul><li class=\"task-list-item\"><input type=\"checkbox\" disabled> a</li>\
         <li class=\"task-list-item\"><input type=\"checkbox\" checked disabled> b</li></ul>"
    );
}

#[test]
fn malformed_formula_is_flagged_in_place() {
    let failing = MathSupport::available(|tex: &str, _: MathOptions| {
        if tex.contains("bad") {
            Err(MathError::Parse {
                message: "unknown command".into(),
            })
        } else {
            Ok(format!("<m>{tex}</m>"))
        }
    });
    let renderer = Renderer::with_math(RenderConfig::default(), failing);
    let html = renderer.render("# Title\n**x** $\\bad$ and $ok$ done");

    assert!(html.starts_with("<h1>Title</h1><br><strong>x</strong> "));
    assert!(html.contains(
        "<span class=\"latex-error\" title=\"unknown command\">$\\bad$</span>"
    ));
    assert!(html.ends_with(" and <m>ok</m> done"));
}

#[test]
fn mathml_backend_marks_malformed_input() {
    let html = render("before $\\frac{a$ after");
    assert!(html.starts_with("before "));
    assert!(html.ends_with(" after"));
    assert!(html.contains("math-error"));
    assert!(html.contains("\\frac{a"));
}

#[test]
fn unavailable_math_leaves_tagged_text() {
    let html = without_math().render("inline $a$ here");
    assert_eq!(html, "inline <span class=\"math math-inline\">a</span> here");
}

#[test]
fn formulas_survive_markdown_passes() {
    let html = without_math().render("*$a*b$* and `$c$`");
    assert!(html.contains("<span class=\"math math-inline\">a*b</span>"));
    assert!(html.contains("<span class=\"math math-inline\">c</span>"));
}

#[test]
fn validation_goes_through_renderer() {
    let v = without_math().validate("ok $a$ bad $\\frac{a}{b$");
    assert_eq!(v.formulas.len(), 2);
    assert_eq!(v.errors.len(), 1);
    assert_eq!(v.errors[0].kind, FormulaKind::Inline);
}
