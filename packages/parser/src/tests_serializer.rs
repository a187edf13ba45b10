/// Round-trip and formatting behaviour of the serializer
use crate::*;

#[test]
fn test_roundtrip_preserves_compact_markup() {
    let sources = vec![
        "<!DOCTYPE html><html><head><title>T</title></head><body></body></html>",
        "<div id=\"a\" class=\"b c\"><span>x</span> <em>y</em></div>",
        "<ul>\n  <li>one</li>\n  <li>two</li>\n</ul>",
        "<p>a<br>b</p><!-- trailing -->",
        "<script type=\"merge-script\">let s = \"<b>\";</script>",
        "<p>1 < 2 &amp; 3 > 2</p>",
    ];

    for source in sources {
        let doc = parse(source).unwrap_or_else(|e| panic!("Failed to parse {}: {}", source, e));
        assert_eq!(serialize(&doc), source);
    }
}

#[test]
fn test_attribute_quoting() {
    let doc = parse(r#"<a title='say "hi"' hidden href=x>y</a>"#).unwrap();
    assert_eq!(
        serialize(&doc),
        r#"<a title="say &quot;hi&quot;" hidden href="x">y</a>"#
    );
}

#[test]
fn test_self_closing_non_void_expands() {
    let doc = parse("<div/><br/>").unwrap();
    assert_eq!(serialize(&doc), "<div></div><br>");
}

#[test]
fn test_inner_and_outer_html() {
    let doc = parse(r#"<section id="s"><h1>Title</h1><p>Body</p></section>"#).unwrap();
    let section = doc.element_by_id("s").unwrap();
    assert_eq!(inner_html(&doc, section), "<h1>Title</h1><p>Body</p>");
    assert_eq!(
        outer_html(&doc, section),
        r#"<section id="s"><h1>Title</h1><p>Body</p></section>"#
    );
}

#[test]
fn test_pretty_output_indents_blocks() {
    let doc = parse("<div>\n<p>Hi</p>   <ul><li>a</li></ul></div>").unwrap();
    let options = SerializeOptions {
        pretty: true,
        ..Default::default()
    };
    let expected = "<div>\n  <p>Hi</p>\n  <ul>\n    <li>a</li>\n  </ul>\n</div>\n";
    assert_eq!(serialize_with(&doc, &options), expected);
}

#[test]
fn test_pretty_output_keeps_preformatted_text() {
    let doc = parse("<body><pre>  a\n   b</pre></body>").unwrap();
    let options = SerializeOptions {
        pretty: true,
        indent: "\t".to_string(),
    };
    assert_eq!(
        serialize_with(&doc, &options),
        "<body>\n\t<pre>  a\n   b</pre>\n</body>\n"
    );
}

#[test]
fn test_serialize_after_edit() {
    let mut doc = parse("<div><p>old</p></div>").unwrap();
    let div = doc.find_by_tag("div")[0];
    let fragment = parse_fragment("<span>new</span>").unwrap();
    doc.replace_children(div, &fragment, 1);
    doc.set_attribute(div, "class", "done");
    assert_eq!(serialize(&doc), r#"<div class="done"><span>new</span></div>"#);
}
