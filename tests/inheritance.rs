//! Template inheritance: `{{<parent}}` inclusions with `{{$block}}` overrides

use mustachio::{CompileError, CompileOptions, Compiler, Lambda, Partials, RenderError, Value};
use pretty_assertions::assert_eq;

const PARENT: &str = "{{$greeting}}Hello{{/greeting}}, world";

fn render(text: &str, partials: &Partials, data: &Value) -> String {
    let compiler = Compiler::new();
    let template = compiler
        .compile_template(text, &CompileOptions::default())
        .unwrap();
    template.render_with(data, partials).unwrap()
}

#[test]
fn test_child_overrides_block() {
    let partials = Partials::new().with_source("parent", PARENT);
    assert_eq!(
        render(
            "{{<parent}}{{$greeting}}Hi{{/greeting}}{{/parent}}",
            &partials,
            &Value::Null
        ),
        "Hi, world"
    );
}

#[test]
fn test_default_used_without_override() {
    let partials = Partials::new().with_source("parent", PARENT);
    assert_eq!(
        render("{{<parent}}{{/parent}}", &partials, &Value::Null),
        "Hello, world"
    );
}

#[test]
fn test_block_renders_default_when_standalone() {
    assert_eq!(render(PARENT, &Partials::new(), &Value::Null), "Hello, world");
}

#[test]
fn test_closest_override_wins() {
    let partials = Partials::new()
        .with_source("parent", PARENT)
        .with_source(
            "child",
            "{{<parent}}{{$greeting}}Hi{{/greeting}}{{/parent}}",
        );
    assert_eq!(
        render(
            "{{<child}}{{$greeting}}Yo{{/greeting}}{{/child}}",
            &partials,
            &Value::Null
        ),
        "Yo, world"
    );
    assert_eq!(render("{{<child}}{{/child}}", &partials, &Value::Null), "Hi, world");
}

#[test]
fn test_only_named_blocks_are_replaced() {
    let partials = Partials::new().with_source("parent", "{{$a}}A{{/a}}-{{$b}}B{{/b}}");
    assert_eq!(
        render("{{<parent}}{{$b}}x{{/b}}{{/parent}}", &partials, &Value::Null),
        "A-x"
    );
}

#[test]
fn test_override_sees_render_context() {
    let partials = Partials::new().with_source("parent", PARENT);
    let data = Value::map([("name", "Amy")]);
    assert_eq!(
        render(
            "{{<parent}}{{$greeting}}Hi {{name}}{{/greeting}}{{/parent}}",
            &partials,
            &data
        ),
        "Hi Amy, world"
    );
}

#[test]
fn test_override_may_include_partials() {
    let partials = Partials::new()
        .with_source("parent", PARENT)
        .with_source("name", "Bob");
    assert_eq!(
        render(
            "{{<parent}}{{$greeting}}{{>name}}{{/greeting}}{{/parent}}",
            &partials,
            &Value::Null
        ),
        "Bob, world"
    );
}

#[test]
fn test_overrides_reach_through_plain_partials() {
    let partials = Partials::new()
        .with_source("parent", "<{{>inner}}>")
        .with_source("inner", "{{$x}}default{{/x}}");
    assert_eq!(
        render("{{<parent}}{{$x}}custom{{/x}}{{/parent}}", &partials, &Value::Null),
        "<custom>"
    );
    assert_eq!(
        render("{{<parent}}{{/parent}}", &partials, &Value::Null),
        "<default>"
    );
}

#[test]
fn test_nested_block_defaults() {
    let partials =
        Partials::new().with_source("parent", "{{$outer}}<{{$inner}}default{{/inner}}>{{/outer}}");
    assert_eq!(
        render(
            "{{<parent}}{{$inner}}custom{{/inner}}{{/parent}}",
            &partials,
            &Value::Null
        ),
        "<custom>"
    );
    assert_eq!(
        render("{{<parent}}{{/parent}}", &partials, &Value::Null),
        "<default>"
    );
}

#[test]
fn test_block_nested_in_override_keeps_parent_definition() {
    let partials =
        Partials::new().with_source("parent", "{{$outer}}O{{/outer}}|{{$inner}}I{{/inner}}");
    assert_eq!(
        render(
            "{{<parent}}{{$outer}}[{{$inner}}x{{/inner}}]{{/outer}}{{/parent}}",
            &partials,
            &Value::Null
        ),
        "[I]|I"
    );
}

#[test]
fn test_whitespace_inside_parent_tag_is_ignored() {
    let partials = Partials::new().with_source("parent", PARENT);
    let child = "{{<parent}}\n  {{$greeting}}Hi{{/greeting}}\n{{/parent}}";
    assert_eq!(render(child, &partials, &Value::Null), "Hi, world");
}

#[test]
fn test_illegal_content_inside_parent_tag() {
    let err = Compiler::new()
        .compile_template(
            "{{<parent}}{{name}}{{/parent}}",
            &CompileOptions::default(),
        )
        .unwrap_err();
    assert!(matches!(err, CompileError::IllegalInSuper { .. }));
}

#[test]
fn test_section_lambda_in_override_sees_override_text() {
    let partials = Partials::new().with_source("parent", "[{{$g}}{{/g}}]");
    let data = Value::map([(
        "wrap",
        Lambda::plain(|_| Lambda::higher(|_, text| format!("<b>{}</b>", text)).into()),
    )]);
    assert_eq!(
        render(
            "{{<parent}}{{$g}}{{#wrap}}inner{{/wrap}}{{/g}}{{/parent}}",
            &partials,
            &data
        ),
        "[<b>inner</b>]"
    );
}

#[test]
fn test_disabled_lambda_error_names_block() {
    let options = CompileOptions::default().with_disable_lambda(true);
    let template = Compiler::new()
        .compile_template("{{<parent}}{{$g}}{{lam}}{{/g}}{{/parent}}", &options)
        .unwrap();
    let partials = Partials::new().with_source("parent", "{{$g}}{{/g}}");
    let data = Value::map([(
        "lam",
        Lambda::plain(|_| Lambda::higher(|_, _| "text".to_string()).into()),
    )]);

    let err = template.render_with(&data, &partials).unwrap_err();
    assert!(matches!(
        &err,
        RenderError::LambdasDisabled { block: Some(name) } if name == "g"
    ));
    assert_eq!(err.to_string(), "lambda features disabled (in block 'g')");
}

#[test]
fn test_swapping_parent_between_renders() {
    let compiler = Compiler::new();
    let template = compiler
        .compile_template(
            "{{<parent}}{{$greeting}}Hi{{/greeting}}{{/parent}}",
            &CompileOptions::default(),
        )
        .unwrap();

    let first = Partials::new().with_source("parent", PARENT);
    let second = Partials::new().with_source("parent", "{{$greeting}}Hey{{/greeting}} there");

    assert_eq!(template.render_with(&Value::Null, &first).unwrap(), "Hi, world");
    assert_eq!(template.render_with(&Value::Null, &second).unwrap(), "Hi there");
    assert_eq!(template.render_with(&Value::Null, &first).unwrap(), "Hi, world");
}
