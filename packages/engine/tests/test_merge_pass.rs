use async_trait::async_trait;
use merge_engine::{
    FetchError, FetchProvider, FetchResponse, MarkdownRenderer, Merge, MergeError, MergeStatus, Phase,
    StateSource, StaticFetch,
};
use merge_parser::{parse, serialize, Document};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

async fn merge_with(source: &str, state: serde_json::Value, fetch: Option<Arc<StaticFetch>>) -> Merge {
    let mut builder = Merge::builder().document(parse(source).unwrap());
    if let Some(fetch) = fetch {
        builder = builder.shared_fetch(fetch);
    }
    let mut merge = builder.build();
    merge.load_state(StateSource::from(state)).await.unwrap();
    merge
}

fn output(merge: &Merge) -> String {
    serialize(merge.document().unwrap())
}

struct Paragraphs;

impl MarkdownRenderer for Paragraphs {
    fn render(&self, source: &str) -> String {
        format!("<p>{}</p>", source.trim())
    }
}

/// Responds after a per-locator delay so completion order differs from query order
struct DelayedFetch;

#[async_trait]
impl FetchProvider for DelayedFetch {
    async fn fetch(&self, locator: &str) -> Result<FetchResponse, FetchError> {
        let delay = if locator == "slow.html" { 30 } else { 1 };
        tokio::time::sleep(Duration::from_millis(delay)).await;
        Ok(FetchResponse::new(locator, format!("<i>{}</i>", locator)))
    }
}

#[tokio::test]
async fn test_plain_tree_is_unchanged() {
    let source = "<!DOCTYPE html><html><body><p class=\"a\">text</p>\n<ul><li>1</li></ul></body></html>";
    let merge = merge_with(source, json!({"anything": true}), None).await;
    assert_eq!(output(&merge), source);
    assert_eq!(merge.status(), MergeStatus::Done);
}

#[tokio::test]
async fn test_content_substitution() {
    let merge = merge_with(r#"<h1 merge-content="name">?</h1>"#, json!({"name": "World"}), None).await;
    assert_eq!(output(&merge), "<h1>World</h1>");
}

#[tokio::test]
async fn test_repeat_items_in_order() {
    let merge = merge_with(
        r#"<ul merge-repeat="items"><li>${name}</li></ul>"#,
        json!({"items": [{"name": "Foo"}, {"name": "Bar"}]}),
        None,
    )
    .await;
    assert_eq!(output(&merge), "<ul><li>Foo</li><li>Bar</li></ul>");
}

#[tokio::test]
async fn test_include_replace_and_append() {
    let fetch = Arc::new(StaticFetch::new().with("x.html", "<b>Included</b>"));
    let merge = merge_with(
        r#"<div merge-include="x.html"><p>old</p></div><div merge-include="x.html" merge-include-type="append"><p>kept</p></div>"#,
        json!({}),
        Some(fetch.clone()),
    )
    .await;
    assert_eq!(
        output(&merge),
        "<div><b>Included</b></div><div><p>kept</p><b>Included</b></div>"
    );
    assert_eq!(fetch.calls().len(), 2);
}

#[tokio::test]
async fn test_cleanup_removes_merge_scripts() {
    let source = r#"<head><script data-type="merge-script">boot()</script><script src="app.js"></script></head>"#;
    let mut merge = Merge::builder().document(parse(source).unwrap()).build();
    let report = merge.parse().await.unwrap();
    assert_eq!(output(&merge), r#"<head><script src="app.js"></script></head>"#);
    assert_eq!(report.removed, 1);
}

#[tokio::test]
async fn test_removed_branch_never_fetches() {
    let fetch = Arc::new(StaticFetch::new().with("/secret.html", "<p>secret</p>"));
    let merge = merge_with(
        r#"<section merge-if="admin"><div merge-include="/secret.html"></div></section>"#,
        json!({"admin": false}),
        Some(fetch.clone()),
    )
    .await;
    assert_eq!(output(&merge), "");
    assert!(fetch.calls().is_empty());
}

#[tokio::test]
async fn test_second_pass_is_noop() {
    let mut merge = merge_with(
        r#"<p merge-if="show">a</p><span merge-content="title"></span>"#,
        json!({"show": true, "title": "T"}),
        None,
    )
    .await;
    let first = output(&merge);
    let report = merge.parse().await.unwrap();
    assert_eq!(output(&merge), first);
    assert_eq!(report.resolved + report.removed, 0);
    assert_eq!(report.pass, 2);
}

#[tokio::test]
async fn test_fetch_failure_aborts_pass() {
    let fetch = Arc::new(StaticFetch::new());
    let mut merge = Merge::builder()
        .document(parse(r#"<div merge-include="missing.html"></div><p merge-content="t"></p>"#).unwrap())
        .shared_fetch(fetch)
        .build();
    let err = merge
        .load_state(StateSource::from(json!({"t": "x"})))
        .await
        .unwrap_err();
    assert!(matches!(err, MergeError::Fetch(FetchError::NotFound { .. })));
    assert!(err.is_fatal());
}

#[tokio::test]
async fn test_markdown_without_renderer_is_configuration_error() {
    let fetch = Arc::new(StaticFetch::new().with("a.md", "# A"));
    let mut merge = Merge::builder()
        .document(parse(r#"<article merge-include-markdown="a.md"></article>"#).unwrap())
        .shared_fetch(fetch.clone())
        .build();
    let err = merge.parse().await.unwrap_err();
    assert!(matches!(err, MergeError::Configuration { .. }));
    assert!(fetch.calls().is_empty());
}

#[tokio::test]
async fn test_markdown_include_is_rendered() {
    let mut merge = Merge::builder()
        .document(parse(r#"<article data-merge-include-markdown="a.md"></article>"#).unwrap())
        .fetch(StaticFetch::new().with("a.md", "hello\n"))
        .renderer(Paragraphs)
        .build();
    merge.parse().await.unwrap();
    assert_eq!(output(&merge), "<article><p>hello</p></article>");
}

#[tokio::test]
async fn test_include_without_provider_is_configuration_error() {
    let mut merge = Merge::builder()
        .document(parse(r#"<div merge-include="a.html"></div>"#).unwrap())
        .build();
    assert!(matches!(merge.parse().await, Err(MergeError::Configuration { .. })));
}

#[tokio::test]
async fn test_generated_markup_waits_for_next_pass() {
    let fetch = Arc::new(StaticFetch::new().with("card.html", r#"<h2 merge-content="title">?</h2>"#));
    let mut merge = merge_with(
        r#"<div merge-include="card.html"></div><ul merge-repeat="xs"><li merge-content="title">${v}</li></ul>"#,
        json!({"title": "Hello", "xs": [{"v": 1}]}),
        Some(fetch),
    )
    .await;
    assert_eq!(
        output(&merge),
        r#"<div><h2 merge-content="title">?</h2></div><ul><li merge-content="title">1</li></ul>"#
    );

    merge.parse().await.unwrap();
    assert_eq!(output(&merge), "<div><h2>Hello</h2></div><ul><li>Hello</li></ul>");
}

#[tokio::test]
async fn test_nested_conditionals() {
    let merge = merge_with(
        r#"<div merge-if="a"><p merge-if="b">b</p><p merge-if="c" merge-if-equals="yes">c</p></div>"#,
        json!({"a": true, "b": 0, "c": "yes"}),
        None,
    )
    .await;
    assert_eq!(output(&merge), "<div><p>c</p></div>");
}

#[tokio::test]
async fn test_nested_content_inside_removed_content() {
    let merge = merge_with(
        r#"<div merge-content="outer"><span merge-content="inner"></span></div>"#,
        json!({"outer": "O", "inner": "I"}),
        None,
    )
    .await;
    assert_eq!(output(&merge), "<div>O</div>");
}

#[tokio::test]
async fn test_branch_errors_leave_node_and_continue() {
    let mut merge = Merge::builder()
        .document(parse(r#"<ul merge-repeat="items"><li>a</li><li>b</li></ul><p merge-content="t"></p>"#).unwrap())
        .build();
    let report = merge
        .load_state(StateSource::from(json!({"items": [], "t": "ok"})))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        output(&merge),
        r#"<ul merge-repeat="items"><li>a</li><li>b</li></ul><p>ok</p>"#
    );
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].phase, Phase::Repeat);
    assert!(matches!(report.errors[0].error, MergeError::RepeaterShape { found: 2, .. }));
}

#[tokio::test]
async fn test_first_state_wins() {
    let mut merge = Merge::builder()
        .document(parse(r#"<b merge-content="v"></b>"#).unwrap())
        .build();
    assert!(merge.load_state(StateSource::from(json!({"v": "first"}))).await.unwrap().is_some());
    assert!(merge.load_state(StateSource::from(json!({"v": "second"}))).await.unwrap().is_none());
    assert_eq!(output(&merge), "<b>first</b>");
}

#[tokio::test]
async fn test_state_from_locator() {
    let fetch = StaticFetch::new().with("/state.json", r#"{"user": {"name": "Ada"}}"#);
    let mut merge = Merge::builder()
        .document(parse(r#"<p merge-content="user.name"></p>"#).unwrap())
        .fetch(fetch)
        .build();
    assert_eq!(merge.status(), MergeStatus::Idle);
    let report = merge
        .load_state(StateSource::Locator("/state.json".to_string()))
        .await
        .unwrap();
    assert!(report.is_some());
    assert_eq!(output(&merge), "<p>Ada</p>");
    assert!(merge.state().is_some());
}

#[tokio::test]
async fn test_state_locator_invalid_json() {
    let mut merge = Merge::builder()
        .fetch(StaticFetch::new().with("s.json", "{oops"))
        .build();
    let err = merge
        .load_state(StateSource::Locator("s.json".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, MergeError::Fetch(FetchError::InvalidJson { .. })));
    assert!(merge.state().is_none());
}

#[tokio::test]
async fn test_state_without_document_waits() {
    let mut merge = Merge::new();
    let report = merge.load_state(StateSource::from(json!({"a": 1}))).await.unwrap();
    assert!(report.is_none());
    assert_eq!(merge.status(), MergeStatus::Idle);

    merge.attach(parse(r#"<i merge-content="a"></i>"#).unwrap());
    merge.parse().await.unwrap();
    assert_eq!(output(&merge), "<i>1</i>");
}

#[tokio::test]
async fn test_parse_without_document_fails() {
    let mut merge = Merge::new();
    assert!(matches!(merge.parse().await, Err(MergeError::Configuration { .. })));
}

#[tokio::test]
async fn test_concurrent_includes_commit_independently() {
    let mut merge = Merge::builder()
        .document(
            parse(r#"<div merge-include="slow.html"></div><div merge-include="fast.html"></div>"#).unwrap(),
        )
        .fetch(DelayedFetch)
        .build();
    let report = merge.parse().await.unwrap();
    assert_eq!(
        output(&merge),
        "<div><i>slow.html</i></div><div><i>fast.html</i></div>"
    );
    assert_eq!(report.fetches, 2);
}

#[tokio::test]
async fn test_nested_include_is_superseded_by_outer() {
    let mut merge = Merge::builder()
        .document(
            parse(r#"<section merge-include="slow.html"><div merge-include="fast.html"></div></section>"#)
                .unwrap(),
        )
        .fetch(DelayedFetch)
        .build();
    let report = merge.parse().await.unwrap();
    assert_eq!(output(&merge), "<section><i>slow.html</i></section>");
    assert_eq!(report.resolved, 2);
}

#[tokio::test]
async fn test_missing_context_degrades_to_removal() {
    let mut merge = Merge::builder()
        .document(parse(r#"<p merge-if="x">a</p><p merge-content="y">b</p><p>c</p>"#).unwrap())
        .build();
    merge.parse().await.unwrap();
    assert_eq!(output(&merge), "<p>c</p>");
}

#[tokio::test]
async fn test_into_document() {
    let merge = merge_with(r#"<p merge-content="a"></p>"#, json!({"a": "z"}), None).await;
    let document: Document = merge.into_document().unwrap();
    assert_eq!(serialize(&document), "<p>z</p>");
}

#[tokio::test]
async fn test_document_moved_to_new_merge_resolves_generated_markup() {
    let fetch = Arc::new(StaticFetch::new().with("card.html", r#"<h2 merge-content="title">?</h2>"#));
    let first = merge_with(r#"<div merge-include="card.html"></div>"#, json!({"title": "A"}), Some(fetch)).await;
    let document = first.into_document().unwrap();
    assert_eq!(document.passes(), 1);

    let mut second = Merge::builder().document(document).build();
    let report = second
        .load_state(StateSource::from(json!({"title": "B"})))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(report.pass, 2);
    assert_eq!(output(&second), "<div><h2>B</h2></div>");
}
