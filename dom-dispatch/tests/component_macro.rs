use dom_dispatch::prelude::*;
use dom_dispatch::testing::TestHarness;
use dom_dispatch::{assert_html_contains, KeySet, Selection};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Nested {
    display: String,
    pending: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct AppState {
    counter: i64,
    mirror_text: String,
    items: Vec<String>,
    nested: Nested,
    r#type: String,
}

#[component]
fn counter(state: &AppState) -> String {
    format!(
        r#"<div class="counter"><strong>{}</strong><button data-onclick="incrementCounter">+</button><button data-onclick="decrementCounter">-</button></div>"#,
        state.counter
    )
}

#[component]
fn mirror(state: &AppState) -> String {
    let text = escape_html(&state.mirror_text);
    format!(
        r#"<div><input id="mirrorInput" value="{}" data-oninput="updateMirrorText"><p id="mirrorOut">{text}</p></div>"#,
        escape_attribute(&state.mirror_text)
    )
}

#[component]
fn item_list(state: &AppState) -> String {
    let AppState { items, nested: n, .. } = state;
    let rows: String = items.iter().map(|i| format!("<li>{i}</li>")).collect();
    format!("<div><p>{}</p><ul>{rows}</ul></div>", n.display)
}

#[component(name = "Kind")]
fn kind_badge(AppState { r#type, .. }: &AppState) -> String {
    format!("<span>{}</span>", r#type)
}

#[component(deps = "counter")]
fn doubled(state: &AppState) -> String {
    render_doubled(state)
}

fn render_doubled(state: &AppState) -> String {
    format!("<p>{}</p>", state.counter * 2)
}

#[component]
fn banner(_state: &AppState) -> String {
    "<header>dom-dispatch</header>".to_string()
}

fn harness() -> TestHarness<AppState> {
    TestHarness::new(AppState::default())
        .component(Counter)
        .component(Mirror)
        .handler("incrementCounter", |rt, _, s: &AppState| {
            rt.set_state(patch!({ "counter": s.counter + 1 }))
        })
        .handler("decrementCounter", |rt, _, s: &AppState| {
            rt.set_state(patch!({ "counter": s.counter - 1 }))
        })
        .handler("updateMirrorText", |rt, event, _| {
            rt.set_state(patch!({ "mirror_text": event.value() }))
        })
        .bind_input("updateMirrorText", "mirror_text")
        .mount()
}

#[test]
fn inferred_dependencies() {
    assert_eq!(Counter::DEPENDENCIES, &["counter"]);
    assert_eq!(Mirror::DEPENDENCIES, &["mirror_text"]);
    assert_eq!(ItemList::DEPENDENCIES, &["items", "nested"]);
    assert_eq!(KindBadge::DEPENDENCIES, &["type"]);
    assert_eq!(Doubled::DEPENDENCIES, &["counter"]);
    assert!(Banner::DEPENDENCIES.is_empty());

    assert_eq!(<KindBadge as Component<AppState>>::name(&KindBadge), "Kind");
    assert_eq!(
        <ItemList as Component<AppState>>::dependencies(&ItemList),
        KeySet::from_iter(["items", "nested"])
    );
}

#[test]
fn counter_end_to_end() {
    let mut harness = harness();
    assert_html_contains!(harness, "<strong>0</strong>");

    harness.click("incrementCounter");
    harness.click("incrementCounter");
    assert_eq!(harness.state().counter, 2);
    assert_html_contains!(harness, "<strong>2</strong>");

    harness.click("decrementCounter");
    assert_eq!(harness.state().counter, 1);
    assert_html_contains!(harness, "<strong>1</strong>");
}

#[test]
fn typing_keeps_focus_and_caret() {
    let mut harness = harness();
    let input = harness.type_into("updateMirrorText", "abc");

    let doc = harness.document();
    assert_eq!(doc.active_element(), Some(input));
    assert_eq!(doc.value(input).as_deref(), Some("abc"));
    assert_eq!(doc.selection(input), Some(Selection::caret(3)));
    assert_eq!(harness.text_of("mirrorOut"), "abc");
    assert_eq!(harness.state().mirror_text, "abc");
}

#[test]
fn typing_in_the_middle_keeps_caret_position() {
    let mut harness = harness();
    let input = harness.type_into("updateMirrorText", "ac");
    harness.document_mut().set_selection_range(input, 1, 1);

    harness.type_text(input, "b").unwrap();

    assert_eq!(harness.state().mirror_text, "abc");
    assert_eq!(harness.document().selection(input), Some(Selection::caret(2)));
}

#[test]
fn noop_patch_triggers_no_render() {
    let mut harness = harness();
    let passes = harness.render_passes();

    harness.set_state(patch!({ "counter": 0 })).unwrap();
    harness.set_state(Patch::new()).unwrap();
    assert_eq!(harness.render_passes(), passes);

    harness.set_state(patch!({ "counter": 5 })).unwrap();
    assert_eq!(harness.render_passes(), passes + 1);
}

#[test]
fn unrelated_update_leaves_other_component_untouched() {
    let mut harness = harness();
    let before = harness.component_html("Mirror");
    let mirror_node = harness.component_nodes("Mirror")[0];

    harness.click("incrementCounter");

    assert_eq!(harness.component_html("Mirror"), before);
    assert_eq!(harness.component_nodes("Mirror"), vec![mirror_node]);
    let stats = harness.last_render().unwrap();
    assert_eq!(stats.rendered, 1);
    assert_eq!(stats.skipped, 1);
}

#[test]
fn listeners_attach_once_across_renders() {
    let mut harness = harness();
    harness.render_app("app").unwrap();
    harness.render_app("app").unwrap();

    let button = harness.binding(EventType::Click, "incrementCounter");
    assert_eq!(harness.binder().attached_count(button), 1);
    assert_eq!(harness.click("incrementCounter"), 1);
    assert_eq!(harness.state().counter, 1);
}

#[test]
fn nested_objects_merge_and_arrays_replace() {
    let mut harness = TestHarness::new(AppState::default())
        .component(ItemList)
        .mount();

    harness
        .set_state(patch!({ "items": ["a", "b"], "nested": { "display": "x" } }))
        .unwrap();
    harness.set_state(patch!({ "nested": { "pending": 1.5 } })).unwrap();
    harness.set_state(patch!({ "items": ["c"] })).unwrap();

    let state = harness.get_state();
    assert_eq!(state.items, vec!["c"]);
    assert_eq!(state.nested.display, "x");
    assert_eq!(state.nested.pending, Some(1.5));
    assert_html_contains!(harness, "<p>x</p><ul><li>c</li></ul>");
}

#[test]
fn empty_dependency_set_is_skipped_by_scoped_updates() {
    let mut harness = TestHarness::new(AppState::default())
        .component(Banner)
        .component(Doubled)
        .mount();

    harness.set_state(patch!({ "counter": 4 })).unwrap();
    let stats = harness.last_render().unwrap();
    assert_eq!(stats.rendered, 1);
    assert_eq!(stats.skipped, 1);
    assert_html_contains!(harness, "<p data-component-type=\"Doubled\">8</p>");
}

#[test]
fn schema_violations_are_rejected() {
    let mut harness = harness();
    let err = harness.set_state(patch!({ "counter": "many" })).unwrap_err();
    assert!(matches!(err, Error::Schema(_)));
    assert_eq!(harness.state().counter, 0);
}
