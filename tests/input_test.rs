//! Tests for the tree picker input and its hidden-value contract.

use nestview::application::{RenderContext, Selection, TreeInput};
use nestview::config::{InputOptions, Settings};
use nestview::domain::{Forest, NodeDraft};

/// root(1) -> [a(2), b(3) -> [c(4)]]
fn forest() -> Forest {
    let mut forest = Forest::new();
    forest.insert_root(NodeDraft::new("root"));
    forest.insert_child(1, NodeDraft::new("a")).unwrap();
    forest.insert_child(1, NodeDraft::new("b")).unwrap();
    forest.insert_child(3, NodeDraft::new("c")).unwrap();
    forest
}

fn input(multiple: bool) -> TreeInput {
    let settings = Settings {
        input: InputOptions {
            multiple,
            ..InputOptions::default()
        },
        ..Settings::default()
    };
    TreeInput::from_settings(&settings)
}

#[test]
fn given_selection_when_rendering_then_hidden_value_and_checked_boxes() {
    let forest = forest();
    let input = input(true);
    let selection = input.parse_value("4, 2").unwrap();

    let rendered = input.render(forest.nodes(), &selection, &RenderContext::default());

    assert!(rendered
        .html
        .contains("<input type=\"hidden\" name=\"selection\" value=\"4,2\">"));
    assert_eq!(rendered.html.matches("type=\"checkbox\"").count(), 4);
    assert_eq!(rendered.html.matches(" checked").count(), 2);
    assert_eq!(rendered.html.matches("nt-selected").count(), 2);
    assert!(rendered.html.contains("a, c"));
    assert!(rendered.tree.stats.is_balanced());
}

#[test]
fn given_unknown_and_disabled_keys_when_rendering_then_dropped_from_value() {
    let mut forest = forest();
    forest.update(2, |n| n.disabled = true).unwrap();
    let input = input(true);
    let selection = input.parse_value("2,3,99").unwrap();

    let rendered = input.render(forest.nodes(), &selection, &RenderContext::default());

    assert_eq!(rendered.selection.keys(), &[3]);
    assert!(rendered.html.contains("value=\"3\">"));
    assert!(rendered.html.contains("value=\"2\" disabled>"));
}

#[test]
fn given_single_mode_when_rendering_then_radio_buttons_and_last_key_kept() {
    let forest = forest();
    let input = input(false);
    let selection = input.parse_value("2,4").unwrap();

    let rendered = input.render(forest.nodes(), &selection, &RenderContext::default());

    assert_eq!(rendered.selection.to_csv(), "4");
    assert!(rendered.html.contains("data-multiple=\"0\""));
    assert_eq!(rendered.html.matches("type=\"radio\"").count(), 4);
}

#[test]
fn given_empty_selection_when_rendering_then_placeholder_caption() {
    let forest = forest();
    let input = input(true);

    let rendered = input.render(forest.nodes(), &Selection::new(true), &RenderContext::default());

    assert!(rendered.html.contains("<span class=\"nt-placeholder\">Select...</span>"));
    assert!(rendered.html.contains("value=\"\">"));
}

#[test]
fn given_garbage_value_when_parsing_then_rejected() {
    let err = input(true).parse_value("1,two").unwrap_err();
    assert!(err.to_string().contains("two"));
}
