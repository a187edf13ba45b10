/// Resolver behaviour on single nodes, independent of the orchestrator
use crate::resolvers::{self, Applied, Resolution};
use crate::*;
use merge_parser::{inner_html, outer_html, parse, Document, NodeId};
use serde_json::json;

fn node(doc: &Document, tag: &str) -> NodeId {
    doc.find_by_tag(tag)[0]
}

fn replaced(resolution: Resolution) -> Document {
    match resolution {
        Resolution::Replace(fragment) => fragment,
        Resolution::Remove => panic!("expected a replacement"),
    }
}

#[test]
fn test_conditional_truthy_keeps_and_strips() {
    let doc = parse(r#"<p merge-if="show" class="x">Hi</p>"#).unwrap();
    let ctx = Value::from(json!({"show": 1}));
    let fragment = replaced(resolvers::conditional(doc.extract(node(&doc, "p")), &ctx));
    assert_eq!(outer_html(&fragment, fragment.root()), r#"<p class="x">Hi</p>"#);
}

#[test]
fn test_conditional_falsy_and_missing_remove() {
    let doc = parse(r#"<p merge-if="show">Hi</p>"#).unwrap();
    for ctx in [json!({"show": false}), json!({"show": []}), json!({}), json!(null)] {
        let resolution = resolvers::conditional(doc.extract(node(&doc, "p")), &Value::from(ctx));
        assert!(matches!(resolution, Resolution::Remove));
    }
}

#[test]
fn test_conditional_equals_compares_string_form() {
    let doc = parse(r#"<p data-merge-if="page.type" data-merge-equals="2">Hi</p>"#).unwrap();
    let keep = resolvers::conditional(doc.extract(node(&doc, "p")), &Value::from(json!({"page": {"type": 2}})));
    let fragment = replaced(keep);
    assert_eq!(outer_html(&fragment, fragment.root()), "<p>Hi</p>");

    let drop = resolvers::conditional(doc.extract(node(&doc, "p")), &Value::from(json!({"page": {"type": "3"}})));
    assert!(matches!(drop, Resolution::Remove));
}

#[test]
fn test_conditional_equals_with_falsy_value() {
    let doc = parse(r#"<p merge-if="flag" merge-if-equals="false">off</p>"#).unwrap();
    let fragment = replaced(resolvers::conditional(
        doc.extract(node(&doc, "p")),
        &Value::from(json!({"flag": false})),
    ));
    assert_eq!(inner_html(&fragment, fragment.root()), "off");
}

#[test]
fn test_conditional_equals_empty_literal_keeps_null() {
    let doc = parse(r#"<p merge-if="missing" merge-if-equals="">x</p>"#).unwrap();
    let ctx = Value::from(json!({"missing": null, "blank": "", "set": "a"}));
    assert!(matches!(
        resolvers::conditional(doc.extract(node(&doc, "p")), &ctx),
        Resolution::Replace(_)
    ));

    let doc = parse(r#"<p merge-if="blank" merge-if-equals="">x</p>"#).unwrap();
    assert!(matches!(
        resolvers::conditional(doc.extract(node(&doc, "p")), &ctx),
        Resolution::Replace(_)
    ));

    let doc = parse(r#"<p merge-if="set" merge-if-equals="">x</p>"#).unwrap();
    assert!(matches!(
        resolvers::conditional(doc.extract(node(&doc, "p")), &ctx),
        Resolution::Remove
    ));
}

#[test]
fn test_content_replaces_inner_markup() {
    let doc = parse(r#"<h1 merge-content="title">Placeholder <b>old</b></h1>"#).unwrap();
    let ctx = Value::from(json!({"title": "Hello <em>World</em>"}));
    let fragment = replaced(resolvers::content(doc.extract(node(&doc, "h1")), &ctx, 1).unwrap());
    assert_eq!(outer_html(&fragment, fragment.root()), "<h1>Hello <em>World</em></h1>");
    let em = fragment.find_by_tag("em")[0];
    assert_eq!(fragment.stamp(em), 1);
}

#[test]
fn test_content_missing_path_removes() {
    let doc = parse(r#"<h1 merge-content="nope">x</h1>"#).unwrap();
    let resolution = resolvers::content(doc.extract(node(&doc, "h1")), &Value::from(json!({})), 1).unwrap();
    assert!(matches!(resolution, Resolution::Remove));
}

#[test]
fn test_content_null_value_empties_node() {
    let doc = parse(r#"<h1 merge-content="title">x</h1>"#).unwrap();
    let ctx = Value::from(json!({"title": null}));
    let fragment = replaced(resolvers::content(doc.extract(node(&doc, "h1")), &ctx, 1).unwrap());
    assert_eq!(outer_html(&fragment, fragment.root()), "<h1></h1>");
}

#[test]
fn test_repeat_produces_children_in_order() {
    let doc = parse("<ul merge-repeat=\"items\">\n  <li>${name}</li>\n</ul>").unwrap();
    let ctx = Value::from(json!({"items": [{"name": "Foo"}, {"name": "Bar"}]}));
    let fragment = replaced(resolvers::repeat(doc.extract(node(&doc, "ul")), &ctx, 1).unwrap());
    let items = fragment.child_elements(fragment.root());
    assert_eq!(items.len(), 2);
    assert_eq!(fragment.text_content(items[0]), "Foo");
    assert_eq!(fragment.text_content(items[1]), "Bar");
    assert!(!fragment.has_attribute(fragment.root(), "merge-repeat"));
}

#[test]
fn test_repeat_interpolates_attributes() {
    let doc = parse(r#"<nav merge-repeat="links"><a href="${url}">${label}</a></nav>"#).unwrap();
    let ctx = Value::from(json!({"links": [{"url": "/a", "label": "A"}]}));
    let fragment = replaced(resolvers::repeat(doc.extract(node(&doc, "nav")), &ctx, 1).unwrap());
    assert_eq!(inner_html(&fragment, fragment.root()), r#"<a href="/a">A</a>"#);
}

#[test]
fn test_repeat_empty_sequence() {
    let doc = parse(r#"<ul merge-repeat="items"><li>${name}</li></ul>"#).unwrap();
    let ctx = Value::from(json!({"items": []}));
    let fragment = replaced(resolvers::repeat(doc.extract(node(&doc, "ul")), &ctx, 1).unwrap());
    assert_eq!(outer_html(&fragment, fragment.root()), "<ul></ul>");
}

#[test]
fn test_repeat_scalar_items_have_no_bindings() {
    let doc = parse(r#"<ul merge-repeat="tags"><li>tag</li></ul>"#).unwrap();
    let ctx = Value::from(json!({"tags": ["a", "b", "c"]}));
    let fragment = replaced(resolvers::repeat(doc.extract(node(&doc, "ul")), &ctx, 1).unwrap());
    assert_eq!(fragment.child_elements(fragment.root()).len(), 3);
}

#[test]
fn test_repeat_shape_errors() {
    let ctx = Value::from(json!({"items": [{}]}));
    for source in [
        r#"<ul merge-repeat="items"></ul>"#,
        r#"<ul merge-repeat="items"><li></li><li></li></ul>"#,
        r#"<ul merge-repeat="items">text only</ul>"#,
        r#"<ul merge-repeat="items"><!-- none --></ul>"#,
    ] {
        let doc = parse(source).unwrap();
        let err = resolvers::repeat(doc.extract(node(&doc, "ul")), &ctx, 1).unwrap_err();
        assert!(matches!(err, MergeError::RepeaterShape { .. }), "{}", source);
    }
}

#[test]
fn test_repeat_ignores_text_beside_template() {
    let doc = parse(r#"<ul merge-repeat="items">Header<li>${name}</li></ul>"#).unwrap();
    let ctx = Value::from(json!({"items": [{"name": "Foo"}, {"name": "Bar"}]}));
    let fragment = replaced(resolvers::repeat(doc.extract(node(&doc, "ul")), &ctx, 1).unwrap());
    assert_eq!(
        outer_html(&fragment, fragment.root()),
        "<ul>Header<li>Foo</li><li>Bar</li></ul>"
    );
}

#[test]
fn test_repeat_source_errors() {
    let doc = parse(r#"<ul merge-repeat="items"><li>${name}</li></ul>"#).unwrap();
    let id = node(&doc, "ul");

    let missing = resolvers::repeat(doc.extract(id), &Value::from(json!({})), 1).unwrap_err();
    assert!(matches!(missing, MergeError::PathResolution { .. }));

    let scalar = resolvers::repeat(doc.extract(id), &Value::from(json!({"items": 5})), 1).unwrap_err();
    assert!(matches!(scalar, MergeError::NotIterable { found: "a number", .. }));

    let unbound = resolvers::repeat(doc.extract(id), &Value::from(json!({"items": [{"title": "x"}]})), 1)
        .unwrap_err();
    assert!(matches!(unbound, MergeError::Interpolation { .. }));
}

#[test]
fn test_include_replace_and_append() {
    let doc = parse(r#"<div merge-include="x.html" merge-include-type="append"><p>Original</p></div>"#).unwrap();
    let id = node(&doc, "div");

    let appended = replaced(resolvers::include(doc.extract(id), "<b>Included</b>", true, 1).unwrap());
    assert_eq!(
        outer_html(&appended, appended.root()),
        "<div><p>Original</p><b>Included</b></div>"
    );

    let replaced_fragment = replaced(resolvers::include(doc.extract(id), "<b>Included</b>", false, 1).unwrap());
    assert_eq!(inner_html(&replaced_fragment, replaced_fragment.root()), "<b>Included</b>");
}

#[test]
fn test_apply_remove_root_is_noop() {
    let mut doc = parse("<p>x</p>").unwrap();
    let root = doc.root();
    assert_eq!(resolvers::apply(&mut doc, root, Resolution::Remove), Applied::Unchanged);
    assert!(doc.is_attached(root));
}

#[test]
fn test_apply_replace_keeps_position() {
    let mut doc = parse(r#"<a></a><p merge-if="x">y</p><b></b>"#).unwrap();
    let p = node(&doc, "p");
    let fragment = replaced(resolvers::conditional(doc.extract(p), &Value::from(json!({"x": true}))));
    assert_eq!(resolvers::apply(&mut doc, p, Resolution::Replace(fragment)), Applied::Replaced(p));
    assert_eq!(merge_parser::serialize(&doc), "<a></a><p>y</p><b></b>");
}
