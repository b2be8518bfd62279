//! Tests for the attribute collection and attribute mutation on the tree.

use bramble_common::Options;
use bramble_dom::{Attribute, Attributes, DomError, DomTree, NodeId, QuoteStyle};

fn attached_element(tree: &mut DomTree, tag: &str) -> NodeId {
    let id = tree.create_element(tag).unwrap();
    let _ = tree.append_child(NodeId::ROOT, id).unwrap();
    id
}

// ========== Attributes collection ==========

#[test]
fn test_lookup_ignores_case() {
    let mut attrs = Attributes::new();
    attrs.set("ID", "main");

    assert_eq!(attrs.value("id"), Some("main"));
    assert_eq!(attrs.value("Id"), Some("main"));
    assert!(attrs.contains("iD"));
    assert_eq!(attrs.get("id").unwrap().original_name(), "ID");
    assert_eq!(attrs.get("id").unwrap().name(), "id");
}

#[test]
fn test_set_updates_in_place() {
    let mut attrs = Attributes::new();
    attrs.set("a", "1");
    attrs.set("b", "2");
    attrs.set("c", "3");

    attrs.set("A", "changed");

    let order: Vec<(&str, &str)> = attrs.iter().map(|a| (a.name(), a.value())).collect();
    assert_eq!(order, vec![("a", "changed"), ("b", "2"), ("c", "3")]);
}

#[test]
fn test_insert_existing_keeps_position() {
    let mut attrs = Attributes::new();
    attrs.insert(Attribute::new("href", "first"));
    attrs.insert(Attribute::new("title", "t"));
    attrs.insert(Attribute::new("HREF", "second"));

    assert_eq!(attrs.len(), 2);
    let first = attrs.iter().next().unwrap();
    assert_eq!(first.name(), "href");
    assert_eq!(first.value(), "second");
}

#[test]
fn test_remove_by_name() {
    let mut attrs = Attributes::new();
    attrs.set("x", "1");
    attrs.set("y", "2");

    let removed = attrs.remove("X").unwrap();

    assert_eq!(removed.value(), "1");
    assert_eq!(attrs.len(), 1);
    assert!(attrs.remove("missing").is_none());
}

#[test]
fn test_detached_attribute_defaults() {
    let attr = Attribute::new("href", "http://something.com\"&<>");
    assert_eq!(attr.name(), "href");
    assert_eq!(attr.value(), "http://something.com\"&<>");
    assert_eq!(attr.quote, QuoteStyle::Double);
    assert!(!attr.is_server_code());
    assert!(Attribute::new("<% if x %>", "").is_server_code());
}

// ========== tree attribute mutation ==========

#[test]
fn test_set_then_read_other_case() {
    let mut tree = DomTree::new();
    let div = attached_element(&mut tree, "div");

    tree.set_attribute(div, "ID", "one").unwrap();
    assert_eq!(tree.attribute(div, "id"), Some("one"));

    tree.set_attribute(div, "id", "two").unwrap();
    assert_eq!(tree.attribute(div, "ID"), Some("two"));
    assert_eq!(tree.as_element(div).unwrap().attrs.len(), 1);
}

#[test]
fn test_set_attribute_on_text_fails() {
    let mut tree = DomTree::new();
    let text = tree.create_text("x");
    assert_eq!(
        tree.set_attribute(text, "a", "b"),
        Err(DomError::NotAnElement(text))
    );
}

#[test]
fn test_remove_attribute_marks_changed() {
    let mut tree = DomTree::new();
    let div = attached_element(&mut tree, "div");
    tree.set_attribute(div, "class", "c").unwrap();
    let _ = tree.outer_html(NodeId::ROOT).unwrap();

    let removed = tree.remove_attribute(div, "CLASS").unwrap();

    assert_eq!(removed.map(|a| a.value().to_string()), Some("c".to_string()));
    assert!(tree.get(NodeId::ROOT).unwrap().is_changed());
    assert_eq!(tree.outer_html(NodeId::ROOT).unwrap(), "<div></div>");
}

// ========== id index ==========

#[test]
fn test_id_index_follows_set_id() {
    let mut tree = DomTree::new();
    let div = attached_element(&mut tree, "div");

    tree.set_id(div, "Main").unwrap();

    assert_eq!(tree.get_by_id("main"), Ok(Some(div)));
    assert_eq!(tree.get_by_id("MAIN"), Ok(Some(div)));
    assert_eq!(tree.id_of(div), Ok(Some("Main")));

    tree.set_id(div, "other").unwrap();
    assert_eq!(tree.get_by_id("main"), Ok(None));
    assert_eq!(tree.get_by_id("other"), Ok(Some(div)));
}

#[test]
fn test_id_collision_last_registered_wins() {
    let mut tree = DomTree::new();
    let first = attached_element(&mut tree, "div");
    tree.set_id(first, "dup").unwrap();
    let second = tree.create_element("p").unwrap();
    tree.set_attribute(second, "id", "dup").unwrap();
    // detached nodes are not indexed
    assert_eq!(tree.get_by_id("dup"), Ok(Some(first)));

    let _ = tree.append_child(NodeId::ROOT, second).unwrap();
    assert_eq!(tree.get_by_id("dup"), Ok(Some(second)));

    // removing the earlier holder leaves the current entry alone
    tree.remove(first).unwrap();
    assert_eq!(tree.get_by_id("dup"), Ok(Some(second)));

    tree.remove(second).unwrap();
    assert_eq!(tree.get_by_id("dup"), Ok(None));
}

#[test]
fn test_id_index_covers_inserted_subtree() {
    let mut tree = DomTree::new();
    let wrapper = tree.create_element("section").unwrap();
    let inner = tree.create_element("span").unwrap();
    tree.set_attribute(inner, "id", "deep").unwrap();
    let _ = tree.append_child(wrapper, inner).unwrap();
    assert_eq!(tree.get_by_id("deep"), Ok(None));

    let _ = tree.append_child(NodeId::ROOT, wrapper).unwrap();

    assert_eq!(tree.get_by_id("deep"), Ok(Some(inner)));
}

#[test]
fn test_id_index_disabled() {
    let options = Options {
        use_id_attribute: false,
        ..Options::default()
    };
    let mut tree = DomTree::with_options(options);
    let div = attached_element(&mut tree, "div");

    assert_eq!(tree.get_by_id("x"), Err(DomError::IdIndexDisabled));
    assert_eq!(tree.set_id(div, "x"), Err(DomError::IdIndexDisabled));
    assert_eq!(tree.id_of(div), Err(DomError::IdIndexDisabled));
    // the plain attribute path still works
    tree.set_attribute(div, "id", "x").unwrap();
    assert_eq!(tree.attribute(div, "id"), Some("x"));
}

// ========== typed values ==========

#[test]
fn test_attribute_value_with_default() {
    let mut tree = DomTree::new();
    let img = attached_element(&mut tree, "img");
    tree.set_attribute(img, "width", "120").unwrap();
    tree.set_attribute(img, "height", "tall").unwrap();
    tree.set_attribute(img, "hidden", "true").unwrap();
    tree.set_attribute(img, "title", " a b ").unwrap();

    assert_eq!(tree.attribute_value(img, "WIDTH", 0_u32), 120);
    assert_eq!(tree.attribute_value(img, "height", 10_u32), 10);
    assert_eq!(tree.attribute_value(img, "depth", 7_i64), 7);
    assert!(tree.attribute_value(img, "hidden", false));
    assert_eq!(
        tree.attribute_value(img, "title", String::new()),
        " a b ".to_string()
    );
    assert_eq!(
        tree.attribute_value(img, "alt", "none".to_string()),
        "none".to_string()
    );
}
