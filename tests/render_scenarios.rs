//! End-to-end rendering scenarios

use mustachio::{
    compile, compile_with, render, render_with, CompileError, CompileOptions, Model, Partials,
    Value,
};
use pretty_assertions::assert_eq;

fn data(entries: Vec<(&str, Value)>) -> Value {
    Value::map(entries)
}

#[test]
fn test_hello_name() {
    let data = data(vec![("name", "Amy".into())]);
    assert_eq!(render("Hello, {{name}}!", &data).unwrap(), "Hello, Amy!");
}

#[test]
fn test_list_section_iterates() {
    let data = data(vec![("items", Value::list(["a", "b"]))]);
    assert_eq!(render("{{#items}}{{.}} {{/items}}", &data).unwrap(), "a b ");
}

#[test]
fn test_inverted_section_on_empty_list() {
    let data = data(vec![("items", Value::list(Vec::<Value>::new()))]);
    assert_eq!(render("{{^items}}none{{/items}}", &data).unwrap(), "none");
    assert_eq!(render("{{#items}}some{{/items}}", &data).unwrap(), "");
}

#[test]
fn test_raw_and_escaped_variables() {
    let data = data(vec![("raw", "<b>".into()), ("esc", "<b>".into())]);
    assert_eq!(render("{{{raw}}}", &data).unwrap(), "<b>");
    assert_eq!(render("{{&raw}}", &data).unwrap(), "<b>");
    assert_eq!(render("{{esc}}", &data).unwrap(), "&lt;b&gt;");
}

#[test]
fn test_escapes_quotes_and_ampersands() {
    let data = data(vec![("v", r#"Tom & "Jerry's""#.into())]);
    assert_eq!(
        render("{{v}}", &data).unwrap(),
        "Tom &amp; &quot;Jerry&#39;s&quot;"
    );
}

#[test]
fn test_delimiter_change() {
    let data = data(vec![("var", "x".into())]);
    assert_eq!(render("{{=<% %>=}}<%var%>", &data).unwrap(), "x");
    assert_eq!(render("{{=<% %>=}}<%var%> {{var}}", &data).unwrap(), "x {{var}}");
}

#[test]
fn test_delimiter_change_does_not_leak_into_partials() {
    let data = data(vec![("var", "x".into())]);
    let partials = Partials::new().with_source("p", "{{var}}!");
    let out = render_with(
        "{{=<% %>=}}<%var%> <%>p%>",
        &data,
        &partials,
        &CompileOptions::default(),
    )
    .unwrap();
    assert_eq!(out, "x x!");
}

#[test]
fn test_initial_delimiters_option() {
    let options = CompileOptions::default().with_delimiters("[[ ]]".parse().unwrap());
    let template = compile_with("[[name]] {{name}}", &options).unwrap();
    let data = data(vec![("name", "Amy".into())]);
    assert_eq!(template.render(&data).unwrap(), "Amy {{name}}");
}

#[test]
fn test_missing_values_render_empty() {
    let data = data(vec![("a", Value::map([("b", 1)]))]);
    assert_eq!(
        render("[{{missing}}][{{a.x.y}}][{{{nothing}}}]", &data).unwrap(),
        "[][][]"
    );
}

#[test]
fn test_numbers_and_booleans() {
    let data = data(vec![
        ("n", 3.into()),
        ("f", 1.5.into()),
        ("whole", 2.0.into()),
        ("yes", true.into()),
    ]);
    assert_eq!(
        render("{{n}} {{f}} {{whole}} {{yes}}", &data).unwrap(),
        "3 1.5 2 true"
    );
}

#[test]
fn test_falsy_values_skip_sections() {
    let data = data(vec![
        ("zero", 0.into()),
        ("empty", "".into()),
        ("no", false.into()),
        ("null", Value::Null),
    ]);
    assert_eq!(
        render(
            "{{#zero}}a{{/zero}}{{#empty}}b{{/empty}}{{#no}}c{{/no}}{{#null}}d{{/null}}{{#missing}}e{{/missing}}",
            &data
        )
        .unwrap(),
        ""
    );
    assert_eq!(
        render(
            "{{^zero}}a{{/zero}}{{^empty}}b{{/empty}}{{^no}}c{{/no}}{{^null}}d{{/null}}{{^missing}}e{{/missing}}",
            &data
        )
        .unwrap(),
        "abcde"
    );
}

#[test]
fn test_list_of_maps() {
    let data = data(vec![(
        "people",
        Value::list([Value::map([("name", "a")]), Value::map([("name", "b")])]),
    )]);
    assert_eq!(
        render("{{#people}}{{name}},{{/people}}", &data).unwrap(),
        "a,b,"
    );
}

#[test]
fn test_outer_names_visible_in_sections() {
    let data = data(vec![
        ("title", "T".into()),
        ("rows", Value::list([Value::map([("v", 1)]), Value::map([("v", 2)])])),
    ]);
    assert_eq!(
        render("{{#rows}}{{title}}{{v}} {{/rows}}", &data).unwrap(),
        "T1 T2 "
    );
}

#[test]
fn test_truthy_scalar_section_keeps_scope() {
    let data = data(vec![("flag", "yes".into()), ("name", "Amy".into())]);
    assert_eq!(render("{{#flag}}{{name}}{{/flag}}", &data).unwrap(), "Amy");
}

#[test]
fn test_nested_lists() {
    let data = data(vec![(
        "grid",
        Value::list([Value::list([1, 2]), Value::list([3])]),
    )]);
    assert_eq!(
        render("{{#grid}}[{{#.}}{{.}}{{/.}}]{{/grid}}", &data).unwrap(),
        "[12][3]"
    );
}

#[test]
fn test_dotted_names() {
    let data = data(vec![(
        "person",
        Value::map([("address", Value::map([("city", "Oslo")]))]),
    )]);
    assert_eq!(
        render("{{person.address.city}}|{{#person.address}}{{city}}{{/person.address}}", &data)
            .unwrap(),
        "Oslo|Oslo"
    );
}

#[test]
fn test_comments_produce_nothing() {
    assert_eq!(render("a {{! note }}b", &Value::Null).unwrap(), "a b");
    assert_eq!(
        render("x\n{{! standalone }}\ny", &Value::Null).unwrap(),
        "x\ny"
    );
}

#[test]
fn test_standalone_lines_are_removed() {
    let data = data(vec![("show", true.into())]);
    let template = "begin\n{{#show}}\n  inside\n{{/show}}\nend\n";
    assert_eq!(render(template, &data).unwrap(), "begin\n  inside\nend\n");
}

#[test]
fn test_inline_sections_keep_whitespace() {
    let data = data(vec![("show", true.into())]);
    assert_eq!(
        render(" {{#show}}yes{{/show}} \n", &data).unwrap(),
        " yes \n"
    );
}

#[test]
fn test_partials() {
    let partials = Partials::new().with_source("user", "<i>{{name}}</i>");
    let data = data(vec![("name", "Amy".into())]);
    assert_eq!(
        render_with("Hi {{>user}}!", &data, &partials, &CompileOptions::default()).unwrap(),
        "Hi <i>Amy</i>!"
    );
}

#[test]
fn test_partial_sees_the_full_context() {
    let partials = Partials::new().with_source("row", "{{title}}:{{v}} ");
    let data = data(vec![
        ("title", "T".into()),
        ("rows", Value::list([Value::map([("v", 1)]), Value::map([("v", 2)])])),
    ]);
    assert_eq!(
        render_with(
            "{{#rows}}{{>row}}{{/rows}}",
            &data,
            &partials,
            &CompileOptions::default()
        )
        .unwrap(),
        "T:1 T:2 "
    );
}

#[test]
fn test_standalone_partial_is_indented() {
    let partials = Partials::new().with_source("p", "a\nb\n");
    assert_eq!(
        render_with(
            "begin\n  {{>p}}\nend",
            &Value::Null,
            &partials,
            &CompileOptions::default()
        )
        .unwrap(),
        "begin\n  a\n  b\nend"
    );
}

#[test]
fn test_missing_partial_renders_empty() {
    assert_eq!(render("[{{>nowhere}}]", &Value::Null).unwrap(), "[]");
}

#[test]
fn test_precompiled_partial() {
    let item = compile("<{{.}}>").unwrap();
    let partials = Partials::new().with_template("item", item);
    let data = data(vec![("xs", Value::list([1, 2]))]);
    assert_eq!(
        render_with(
            "{{#xs}}{{>item}}{{/xs}}",
            &data,
            &partials,
            &CompileOptions::default()
        )
        .unwrap(),
        "<1><2>"
    );
}

#[test]
fn test_custom_section_tags() {
    let options = CompileOptions::default().with_section_tag("_i", "i");
    let data = data(vec![("_i", true.into()), ("name", "Amy".into())]);
    let out = render_with(
        "{{_i}}Hello {{name}}{{/i}}",
        &data,
        &Partials::new(),
        &options,
    )
    .unwrap();
    assert_eq!(out, "Hello Amy");
}

#[derive(Debug)]
struct Person {
    name: &'static str,
}

impl Model for Person {
    fn get(&self, key: &str) -> Option<Value> {
        match key {
            "name" => Some(self.name.into()),
            _ => None,
        }
    }
}

#[test]
fn test_model_get_is_opt_in() {
    let data = data(vec![("person", Value::model(Person { name: "Ada" }))]);
    let template = "{{person.name}}|{{#person}}{{name}}{{/person}}";

    assert_eq!(render(template, &data).unwrap(), "|");

    let options = CompileOptions::default().with_model_get(true);
    let out = render_with(template, &data, &Partials::new(), &options).unwrap();
    assert_eq!(out, "Ada|Ada");
}

#[test]
fn test_json_data() {
    let data = Value::from(serde_json::json!({
        "repo": [{"name": "resque"}, {"name": "hub"}, {"name": "rip"}]
    }));
    assert_eq!(
        render("{{#repo}}<b>{{name}}</b>{{/repo}}", &data).unwrap(),
        "<b>resque</b><b>hub</b><b>rip</b>"
    );
}

#[test]
fn test_unbalanced_templates_fail() {
    for text in ["{{#a}}", "{{/a}}", "{{#a}}{{/b}}", "{{#a}}{{^b}}{{/a}}"] {
        let err = compile(text).unwrap_err();
        assert!(
            matches!(
                err,
                CompileError::MissingClosingTag { .. }
                    | CompileError::ClosingTagWithoutOpener { .. }
                    | CompileError::NestingError { .. }
            ),
            "{}: {:?}",
            text,
            err
        );
    }
}

#[test]
fn test_compile_error_report() {
    let source = "line one\n{{#a}}\n{{/b}}\n";
    let err = compile(source).unwrap_err();
    let report = err.format(source, "page.mustache");
    assert!(report.contains("nesting error: a vs. b"));
    assert!(report.contains("page.mustache"));
}

#[test]
fn test_render_twice_is_identical() {
    let template = compile("{{#xs}}{{.}},{{/xs}}{{^xs}}none{{/xs}}").unwrap();
    let data = data(vec![("xs", Value::list([1, 2, 3]))]);
    let first = template.render(&data).unwrap();
    let second = template.render(&data).unwrap();
    assert_eq!(first, "1,2,3,");
    assert_eq!(first, second);
}
