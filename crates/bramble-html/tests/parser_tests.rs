//! Tests for the error-tolerant HTML parser.

use std::sync::Arc;

use bramble_common::{ElementFlags, ElementTable, Options};
use bramble_dom::{DomError, DomTree, NodeId, QuoteStyle};
use bramble_html::{HtmlParser, ParseErrorCode, ParseOutput, format_tree};

/// Helper to parse HTML with default options.
fn parse(html: &str) -> ParseOutput {
    HtmlParser::new(html, Options::default()).run().unwrap()
}

/// Helper to parse HTML with `fix_nested_tags` turned on.
fn parse_fixed(html: &str) -> ParseOutput {
    let options = Options {
        fix_nested_tags: true,
        ..Options::default()
    };
    HtmlParser::new(html, options).run().unwrap()
}

/// Helper to find the first element with the given name.
fn find(tree: &DomTree, name: &str) -> NodeId {
    tree.descendants_named(NodeId::ROOT, name)
        .next()
        .unwrap_or_else(|| panic!("no <{name}> in tree"))
        .unwrap()
}

/// Helper to collect every element with the given name.
fn find_all(tree: &DomTree, name: &str) -> Vec<NodeId> {
    tree.descendants_named(NodeId::ROOT, name)
        .map(Result::unwrap)
        .collect()
}

fn codes(output: &ParseOutput) -> Vec<ParseErrorCode> {
    output.errors.iter().map(|e| e.code).collect()
}

// ========== document structure ==========

#[test]
fn test_empty_input() {
    let output = parse("");
    assert!(output.tree.children(NodeId::ROOT).is_empty());
    assert!(output.errors.is_empty());
    assert_eq!(output.tree.outer_html(NodeId::ROOT).unwrap(), "");
}

#[test]
fn test_simple_document() {
    let html = "<html><head><title>T</title></head><body><p class=\"a\">x</p></body></html>";
    let output = parse(html);
    let tree = &output.tree;

    assert!(output.errors.is_empty());
    let root_children = tree.children(NodeId::ROOT);
    assert_eq!(root_children.len(), 1);
    assert_eq!(tree.name(root_children[0]), "html");
    assert_eq!(tree.document_element(), Some(root_children[0]));

    let title = find(tree, "title");
    assert_eq!(tree.inner_text(title).unwrap(), "T");

    let p = find(tree, "p");
    assert_eq!(tree.attribute(p, "class"), Some("a"));
    assert_eq!(tree.parent(p), Some(find(tree, "body")));
    assert!(tree.get(p).unwrap().closed);
}

#[test]
fn test_names_are_lowercased_and_original_kept() {
    let output = parse("<DIV>x</div>");
    let div = find(&output.tree, "div");
    assert_eq!(output.tree.name(div), "div");
    assert_eq!(output.tree.original_name(div), "DIV");
    assert!(output.tree.get(div).unwrap().closed);
    assert!(output.errors.is_empty());
}

// ========== round trip ==========

#[test]
fn test_unmodified_document_round_trips() {
    let samples = [
        "<!DOCTYPE html>\n<html><body><p class=\"a\">x</p></body></html>",
        "<div a=1 b='two' c=\"three\" d>text &amp; more</div>",
        "<ul><li>one<li>two</ul>",
        "<p>unclosed <b>bold",
        "<script>if (a < b) { x = \"</div>\"; }</script>",
        "<!-- comment --><br/><img src=x.png>",
        "plain text only",
        "<div></span></div>",
        "a <",
    ];
    for html in samples {
        let output = parse(html);
        assert_eq!(output.tree.outer_html(NodeId::ROOT).unwrap(), html, "round trip of {html:?}");
    }
}

#[test]
fn test_element_spans_cover_their_source() {
    let output = parse("<div><p class=\"a\">x</p>tail</div>");
    let tree = &output.tree;
    let p = find(tree, "p");
    assert_eq!(tree.outer_html(p).unwrap(), "<p class=\"a\">x</p>");
    assert_eq!(tree.inner_html(p).unwrap(), "x");

    let div = find(tree, "div");
    assert_eq!(tree.inner_html(div).unwrap(), "<p class=\"a\">x</p>tail");
}

#[test]
fn test_self_closed_elements_have_empty_content() {
    let output = parse("<div><br><img src='x'/><span/></div>");
    let tree = &output.tree;

    for (name, markup) in [("br", "<br>"), ("img", "<img src='x'/>"), ("span", "<span/>")] {
        let id = find(tree, name);
        assert_eq!(tree.outer_html(id).unwrap(), markup);
        assert_eq!(tree.inner_html(id).unwrap(), "", "content of <{name}>");
        let span = tree.get(id).unwrap().span.unwrap();
        assert_eq!(span.inner_start, span.outer_end());
        assert_eq!(span.inner_len, 0);
    }
    assert_eq!(
        tree.inner_html(find(tree, "div")).unwrap(),
        "<br><img src='x'/><span/>"
    );
}

// ========== implicit closing ==========

#[test]
fn test_list_items_become_siblings_with_fix_nested_tags() {
    let output = parse_fixed("<ul><li>a<li>b</ul>");
    let tree = &output.tree;
    let ul = find(tree, "ul");
    let items: Vec<NodeId> = tree.elements(ul, "li").collect();

    assert_eq!(items.len(), 2);
    assert_eq!(tree.outer_html(items[0]).unwrap(), "<li>a");
    assert_eq!(tree.outer_html(items[1]).unwrap(), "<li>b");
    assert!(!codes(&output).contains(&ParseErrorCode::TagNotClosed));
    assert!(output.errors.is_empty());
}

#[test]
fn test_list_items_nest_without_fix_nested_tags() {
    let output = parse("<ul><li>a<li>b</ul>");
    let tree = &output.tree;
    let items = find_all(tree, "li");

    assert_eq!(items.len(), 2);
    assert_eq!(tree.parent(items[1]), Some(items[0]));
    assert!(output.errors.is_empty());
}

#[test]
fn test_unclosed_paragraphs_nest_by_default() {
    let output = parse("<p>a<p>b");
    let tree = &output.tree;
    let paragraphs = find_all(tree, "p");

    assert_eq!(paragraphs.len(), 2);
    assert_eq!(tree.parent(paragraphs[1]), Some(paragraphs[0]));
    assert_eq!(tree.outer_html(paragraphs[0]).unwrap(), "<p>a<p>b");
    assert_eq!(tree.outer_html(paragraphs[1]).unwrap(), "<p>b");

    assert_eq!(
        codes(&output),
        vec![ParseErrorCode::TagNotClosed, ParseErrorCode::TagNotClosed]
    );
    let first = &output.errors[0];
    assert_eq!((first.line, first.column, first.stream_position), (1, 1, 0));
    assert_eq!(first.reason, "End tag </p> was not found");
    let second = &output.errors[1];
    assert_eq!((second.line, second.column, second.stream_position), (1, 5, 4));
}

#[test]
fn test_paragraph_closes_previous_with_fix_nested_tags() {
    let output = parse_fixed("<p>a<p>b");
    let tree = &output.tree;
    let paragraphs = find_all(tree, "p");

    assert_eq!(paragraphs.len(), 2);
    assert_eq!(tree.parent(paragraphs[0]), Some(NodeId::ROOT));
    assert_eq!(tree.parent(paragraphs[1]), Some(NodeId::ROOT));
    assert_eq!(codes(&output), vec![ParseErrorCode::TagNotClosed]);
    assert_eq!(output.errors[0].stream_position, 4);
}

#[test]
fn test_resetter_keeps_nested_list_inside_item() {
    let output = parse_fixed("<ul><li>a<ul><li>b</li></ul></li></ul>");
    let tree = &output.tree;
    let lists = find_all(tree, "ul");
    let items = find_all(tree, "li");

    assert_eq!(lists.len(), 2);
    assert_eq!(items.len(), 2);
    assert_eq!(tree.parent(lists[1]), Some(items[0]));
    assert_eq!(tree.parent(items[1]), Some(lists[1]));
    assert!(output.errors.is_empty());
}

#[test]
fn test_end_tag_closes_open_descendants() {
    let output = parse("<div><p>a</div>");
    let tree = &output.tree;
    let p = find(tree, "p");

    assert!(tree.get(p).unwrap().closed);
    assert_eq!(tree.outer_html(p).unwrap(), "<p>a");
    assert!(output.errors.is_empty());
}

#[test]
fn test_auto_close_on_end_leaves_descendants_open() {
    let options = Options {
        auto_close_on_end: true,
        ..Options::default()
    };
    let output = HtmlParser::new("<div><p>a</div>", options).run().unwrap();

    assert_eq!(codes(&output), vec![ParseErrorCode::TagNotClosed]);
    assert_eq!(output.errors[0].reason, "End tag </p> was not found");
    assert!(output.tree.get(find(&output.tree, "p")).unwrap().closed);
}

#[test]
fn test_new_tag_interrupts_unterminated_tag() {
    let output = parse("<div <span>x</span>");
    let tree = &output.tree;
    let div = find(tree, "div");
    let span = find(tree, "span");

    assert_eq!(tree.parent(span), Some(NodeId::ROOT));
    assert!(tree.get(div).unwrap().closed);
    assert_eq!(tree.outer_html(div).unwrap(), "<div ");
    assert!(output.errors.is_empty());
}

#[test]
fn test_check_syntax_off_reports_nothing() {
    let options = Options {
        check_syntax: false,
        ..Options::default()
    };
    let output = HtmlParser::new("<p>a", options).run().unwrap();
    assert!(output.errors.is_empty());
    assert!(!output.tree.get(find(&output.tree, "p")).unwrap().closed);
}

// ========== end tag errors ==========

#[test]
fn test_unmatched_end_tag_reports_tag_not_opened() {
    let output = parse("<div></span></div>");
    assert_eq!(codes(&output), vec![ParseErrorCode::TagNotOpened]);
    let error = &output.errors[0];
    assert_eq!(error.reason, "Start tag <span> was not found");
    assert_eq!(error.stream_position, 5);
    assert_eq!(error.column, 6);
    assert!(output.tree.children(find(&output.tree, "div")).is_empty());
}

#[test]
fn test_end_tag_for_void_element_is_not_required() {
    let output = parse("a</img>b");
    assert_eq!(codes(&output), vec![ParseErrorCode::EndTagNotRequired]);
    assert_eq!(output.errors[0].reason, "End tag </img> is not required");

    let texts: Vec<&str> = output
        .tree
        .children(NodeId::ROOT)
        .iter()
        .filter_map(|&c| output.tree.as_text(c))
        .collect();
    assert_eq!(texts, vec!["a", "b"]);
}

#[test]
fn test_end_tag_across_resetter_is_invalid() {
    let output = parse_fixed("<ul><li>a<ul></li></ul></ul>");
    assert_eq!(codes(&output), vec![ParseErrorCode::EndTagInvalidHere]);
    let error = &output.errors[0];
    assert_eq!(error.reason, "End tag </li> invalid here");
    assert_eq!(error.stream_position, 13);
}

// ========== br and overlapping elements ==========

#[test]
fn test_lone_br_end_tag_becomes_element() {
    let output = parse("a</br>b");
    let tree = &output.tree;
    let children = tree.children(NodeId::ROOT);

    assert_eq!(children.len(), 3);
    assert_eq!(tree.name(children[1]), "br");
    assert!(tree.get(children[1]).unwrap().closed);
    assert_eq!(tree.outer_html(children[1]).unwrap(), "</br>");
    assert_eq!(tree.inner_html(children[1]).unwrap(), "");
    assert!(output.errors.is_empty());
}

#[test]
fn test_br_end_tag_closes_earlier_br() {
    let output = parse("<br></br>");
    let tree = &output.tree;
    let children = tree.children(NodeId::ROOT);

    assert_eq!(children.len(), 1);
    assert_eq!(tree.outer_html(children[0]).unwrap(), "<br></br>");
    assert!(output.errors.is_empty());
}

#[test]
fn test_unmatched_overlapping_end_tag_becomes_text() {
    let table = ElementTable::html().with("font", ElementFlags::CAN_OVERLAP);
    let options = Options {
        elements: Arc::new(table),
        ..Options::default()
    };
    let output = HtmlParser::new("a</FONT>b", options).run().unwrap();
    let tree = &output.tree;
    let texts: Vec<&str> = tree
        .children(NodeId::ROOT)
        .iter()
        .filter_map(|&c| tree.as_text(c))
        .collect();

    assert_eq!(texts, vec!["a", "</FONT>", "b"]);
    assert!(output.errors.is_empty());
}

// ========== attributes ==========

#[test]
fn test_attribute_forms() {
    let output = parse("<a HREF=\"x\" data-x='y' z=1 flag>link</a>");
    let tree = &output.tree;
    let a = find(tree, "a");
    let attrs = &tree.as_element(a).unwrap().attrs;

    assert_eq!(attrs.len(), 4);
    assert_eq!(attrs.value("href"), Some("x"));
    assert_eq!(attrs.get("href").unwrap().original_name(), "HREF");
    assert_eq!(attrs.get("data-x").unwrap().quote, QuoteStyle::Single);
    assert_eq!(attrs.get("href").unwrap().quote, QuoteStyle::Double);
    assert_eq!(attrs.value("z"), Some("1"));
    assert_eq!(attrs.value("flag"), Some(""));
    assert_eq!(tree.attribute(a, "Href"), Some("x"));
}

#[test]
fn test_duplicate_attribute_keeps_position_and_last_value() {
    let output = parse("<div a=1 b=2 a=3></div>");
    let div = find(&output.tree, "div");
    let names: Vec<(&str, &str)> = output
        .tree
        .as_element(div)
        .unwrap()
        .attrs
        .iter()
        .map(|a| (a.name(), a.value()))
        .collect();
    assert_eq!(names, vec![("a", "3"), ("b", "2")]);
}

#[test]
fn test_attribute_positions() {
    let output = parse("<div\n  id=main></div>");
    let div = find(&output.tree, "div");
    let id = output.tree.as_element(div).unwrap().attrs.get("id").unwrap();
    assert_eq!((id.line, id.column, id.stream_position), (2, 3, 7));
}

#[test]
fn test_self_closing_slash_is_not_an_attribute() {
    let output = parse("<div/><span>x</span>");
    let tree = &output.tree;
    let div = find(tree, "div");

    assert!(tree.as_element(div).unwrap().attrs.is_empty());
    assert!(tree.get(div).unwrap().closed);
    assert_eq!(tree.parent(find(tree, "span")), Some(NodeId::ROOT));
}

#[test]
fn test_end_tag_attributes_are_ignored() {
    let output = parse("<p>x</p class=y>");
    let p = find(&output.tree, "p");
    assert!(output.tree.as_element(p).unwrap().attrs.is_empty());
    assert!(output.errors.is_empty());
}

#[test]
fn test_id_attribute_is_indexed() {
    let output = parse("<div id=\"Main\"><span id=x></span></div>");
    let tree = &output.tree;
    assert_eq!(tree.get_by_id("main").unwrap(), Some(find(tree, "div")));
    assert_eq!(tree.get_by_id("X").unwrap(), Some(find(tree, "span")));
    assert_eq!(tree.get_by_id("missing").unwrap(), None);
}

// ========== comments and raw text ==========

#[test]
fn test_comments_keep_their_markup() {
    let output = parse("<!DOCTYPE html><!-- a > b --><p>x</p>");
    let tree = &output.tree;
    let children = tree.children(NodeId::ROOT);

    assert_eq!(children.len(), 3);
    assert_eq!(tree.as_comment(children[0]), Some("<!DOCTYPE html>"));
    assert_eq!(tree.as_comment(children[1]), Some("<!-- a > b -->"));
    assert_eq!(tree.name(children[2]), "p");
    assert_eq!(tree.inner_text(children[1]).unwrap(), " a > b ");
}

#[test]
fn test_script_content_is_raw_text() {
    let output = parse("<script>if (a < b) { x = \"</div>\"; }</SCRIPT><p>x</p>");
    let tree = &output.tree;
    let script = find(tree, "script");
    let children = tree.children(script);

    assert_eq!(children.len(), 1);
    assert_eq!(tree.as_text(children[0]), Some("if (a < b) { x = \"</div>\"; }"));
    assert_eq!(tree.parent(find(tree, "p")), Some(NodeId::ROOT));
    assert!(find_all(tree, "div").is_empty());
    assert!(output.errors.is_empty());
}

#[test]
fn test_unterminated_script_takes_rest_of_input() {
    let output = parse("<script>var a = 1;");
    let tree = &output.tree;
    let script = find(tree, "script");

    assert_eq!(tree.inner_text(script).unwrap(), "var a = 1;");
    assert_eq!(tree.outer_html(script).unwrap(), "<script>var a = 1;");
    assert_eq!(codes(&output), vec![ParseErrorCode::TagNotClosed]);
}

#[test]
fn test_dangling_lt_is_text() {
    let output = parse("a <");
    assert_eq!(output.tree.inner_text(NodeId::ROOT).unwrap(), "a <");
    assert!(output.errors.is_empty());
}

// ========== server code ==========

#[test]
fn test_server_code_in_text() {
    let output = parse("a<%= b %>c");
    let children = output.tree.children(NodeId::ROOT);
    assert_eq!(children.len(), 1);
    assert_eq!(output.tree.as_text(children[0]), Some("a<%= b %>c"));
}

#[test]
fn test_server_code_as_attribute() {
    let output = parse("<div <%= x %> class=\"c\"></div>");
    let div = find(&output.tree, "div");
    let attrs = &output.tree.as_element(div).unwrap().attrs;
    let first = attrs.iter().next().unwrap();

    assert_eq!(attrs.len(), 2);
    assert_eq!(first.name(), "<%= x %>");
    assert!(first.is_server_code());
    assert_eq!(attrs.value("class"), Some("c"));
}

#[test]
fn test_server_code_inside_quoted_value() {
    let output = parse("<a href=\"<%= Url(\"x\") %>\">go</a>");
    let a = find(&output.tree, "a");
    assert_eq!(output.tree.attribute(a, "href"), Some("<%= Url(\"x\") %>"));
}

// ========== positions ==========

#[test]
fn test_line_and_column_tracking() {
    let output = parse("<html>\n  <body>");
    let body = find(&output.tree, "body");
    let node = output.tree.get(body).unwrap();
    assert_eq!((node.line, node.column, node.stream_position), (2, 3, 9));
}

#[test]
fn test_columns_count_characters_not_bytes() {
    let output = parse("é<b>x</b>");
    let node = output.tree.get(find(&output.tree, "b")).unwrap();
    assert_eq!(node.column, 2);
    assert_eq!(node.stream_position, 2);
}

// ========== stopper ==========

#[test]
fn test_stopper_ends_parse_after_element() {
    let options = Options {
        stopper_node_name: Some("head".to_string()),
        ..Options::default()
    };
    let html = "<html><head><title>x</title></head><body>rest</body></html>";
    let output = HtmlParser::new(html, options).run().unwrap();
    let tree = &output.tree;

    let offset = output.remainder_offset.unwrap();
    assert_eq!(&html[offset..], "<body>rest</body></html>");
    assert!(find_all(tree, "body").is_empty());
    assert_eq!(
        tree.outer_html(NodeId::ROOT).unwrap(),
        "<html><head><title>x</title></head>"
    );
    assert_eq!(codes(&output), vec![ParseErrorCode::TagNotClosed]);
}

#[test]
fn test_no_remainder_without_stopper() {
    let output = parse("<html><head></head></html>");
    assert_eq!(output.remainder_offset, None);
}

// ========== depth limit ==========

#[test]
fn test_depth_limit_fails_parse() {
    let html = "<div>".repeat(1000);
    let options = Options {
        max_depth: 10,
        ..Options::default()
    };
    let result = HtmlParser::new(&html, options).run();
    assert!(matches!(result, Err(DomError::DepthExceeded { limit: 10 })));
}

#[test]
fn test_deep_nesting_within_default_limit() {
    let html = "<div>".repeat(1000);
    let output = parse(&html);
    assert_eq!(find_all(&output.tree, "div").len(), 1000);
    assert_eq!(output.errors.len(), 1000);
    assert_eq!(output.tree.outer_html(NodeId::ROOT).unwrap(), html);
}

#[test]
fn test_many_unclosed_tags_stretch_to_end_of_input() {
    let depth = 20_000;
    let html = "<div>".repeat(depth);
    let output = parse(&html);
    let divs = find_all(&output.tree, "div");

    assert_eq!(divs.len(), depth);
    assert_eq!(output.errors.len(), depth);
    for (i, &div) in divs.iter().enumerate() {
        let node = output.tree.get(div).unwrap();
        let span = node.span.unwrap();
        assert!(node.closed);
        assert_eq!(span.outer_start, i * 5);
        assert_eq!(span.outer_end(), html.len());
        assert_eq!(span.inner_end(), html.len());
    }
}

#[test]
fn test_deferred_closing_reaches_deepest_content() {
    let options = Options {
        auto_close_on_end: true,
        ..Options::default()
    };
    let output = HtmlParser::new("<div><p><b>x", options).run().unwrap();
    let tree = &output.tree;

    for name in ["div", "p", "b"] {
        let span = tree.get(find(tree, name)).unwrap().span.unwrap();
        assert_eq!(span.outer_end(), 12, "end of <{name}>");
    }
    assert_eq!(tree.inner_html(find(tree, "div")).unwrap(), "<p><b>x");
}

// ========== error details ==========

#[test]
fn test_error_source_text_excerpt() {
    let options = Options {
        extract_error_source_text: true,
        extract_error_source_text_max_length: 4,
        ..Options::default()
    };
    let output = HtmlParser::new("<div>abc", options).run().unwrap();
    assert_eq!(output.errors[0].source_text.as_deref(), Some("<div"));

    let output = parse("<div>abc");
    assert_eq!(output.errors[0].source_text, None);
}

#[test]
fn test_error_display_and_json() {
    let output = parse("<p>a");
    let error = &output.errors[0];
    assert_eq!(error.to_string(), "1:1: End tag </p> was not found (TagNotClosed)");

    let json = serde_json::to_value(error).unwrap();
    assert_eq!(json["code"], "TagNotClosed");
    assert_eq!(json["line"], 1);
    assert!(json.get("source_text").is_none());
}

#[test]
fn test_error_code_from_str() {
    use std::str::FromStr;
    assert_eq!(
        ParseErrorCode::from_str("EndTagInvalidHere").unwrap(),
        ParseErrorCode::EndTagInvalidHere
    );
    assert!(ParseErrorCode::from_str("Bogus").is_err());
}

// ========== tree printing ==========

#[test]
fn test_format_tree() {
    let output = parse("<div a=1 b>x y</div><!--c--><p>open");
    let text = format_tree(&output.tree, NodeId::ROOT, 0).unwrap();
    assert_eq!(
        text,
        "#document\n  <div a=\"1\" b>\n    \"x\u{00B7}y\"\n  <!--c-->\n  <p>\n    \"open\"\n"
    );

    let div = find(&output.tree, "div");
    assert_eq!(
        format_tree(&output.tree, div, 1).unwrap(),
        "  <div a=\"1\" b>\n    \"x\u{00B7}y\"\n"
    );
}

#[test]
fn test_format_tree_of_deep_document() {
    let depth = 4_000;
    let output = parse(&"<div>".repeat(depth));
    let text = format_tree(&output.tree, NodeId::ROOT, 0).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines.len(), depth + 1);
    assert_eq!(lines[depth], format!("{}<div>", "  ".repeat(depth)));
}

#[test]
fn test_format_tree_respects_depth_limit() {
    let options = Options {
        max_depth: 2,
        ..Options::default()
    };
    let mut tree = DomTree::with_options(options);
    let mut parent = NodeId::ROOT;
    for _ in 0..5 {
        let child = tree.create_element("div").unwrap();
        let _ = tree.append_child(parent, child);
        parent = child;
    }

    assert_eq!(
        format_tree(&tree, NodeId::ROOT, 0),
        Err(DomError::DepthExceeded { limit: 2 })
    );
}
