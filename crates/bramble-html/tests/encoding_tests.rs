//! Tests for charset resolution and `<meta>` encoding sniffing.

use bramble_common::Options;
use bramble_html::{Charset, HtmlParser, ParseErrorCode, ParseOutput, content_charset, detect_bom};

fn parse_with_stream(html: &str, stream: Option<Charset>) -> ParseOutput {
    HtmlParser::new(html, Options::default())
        .with_stream_encoding(stream)
        .run()
        .unwrap()
}

// ========== labels ==========

#[test]
fn test_label_is_kept_but_resolved() {
    let latin1 = Charset::from_label("ISO-8859-1").unwrap();
    assert_eq!(latin1.label(), "iso-8859-1");
    assert_eq!(latin1.name(), "windows-1252");
    assert_eq!(latin1.to_string(), "iso-8859-1");
}

#[test]
fn test_utf8_alias_and_quotes() {
    let charset = Charset::from_label(" \"utf8\" ").unwrap();
    assert_eq!(charset.label(), "utf-8");
    assert!(charset.same_encoding(&Charset::utf8()));
}

#[test]
fn test_unknown_label() {
    assert!(Charset::from_label("no-such-charset").is_none());
}

#[test]
fn test_same_encoding_ignores_label() {
    let a = Charset::from_label("latin1").unwrap();
    let b = Charset::from_label("iso-8859-1").unwrap();
    assert!(a.same_encoding(&b));
    assert_ne!(a, b);
}

// ========== decoding and encoding ==========

#[test]
fn test_decode_single_byte() {
    let latin1 = Charset::from_label("iso-8859-1").unwrap();
    assert_eq!(latin1.decode(&[0x63, 0x61, 0x66, 0xE9]), "caf\u{e9}");
}

#[test]
fn test_decode_replaces_malformed_utf8() {
    assert_eq!(Charset::utf8().decode(&[0x61, 0xFF, 0x62]), "a\u{FFFD}b");
}

#[test]
fn test_encode_single_byte() {
    let latin1 = Charset::from_label("iso-8859-1").unwrap();
    assert_eq!(latin1.encode("caf\u{e9}"), vec![0x63, 0x61, 0x66, 0xE9]);
}

#[test]
fn test_encode_unmappable_as_reference() {
    let latin1 = Charset::from_label("iso-8859-1").unwrap();
    assert_eq!(latin1.encode("\u{2713}"), b"&#10003;".to_vec());
}

// ========== byte order marks ==========

#[test]
fn test_detect_utf8_bom() {
    let (charset, len) = detect_bom(b"\xEF\xBB\xBF<p>").unwrap();
    assert_eq!(charset.name(), "UTF-8");
    assert_eq!(len, 3);
}

#[test]
fn test_detect_utf16_bom() {
    let (charset, len) = detect_bom(b"\xFF\xFE<\x00").unwrap();
    assert_eq!(charset.name(), "UTF-16LE");
    assert_eq!(len, 2);
}

#[test]
fn test_no_bom() {
    assert!(detect_bom(b"<p>").is_none());
}

// ========== content type ==========

#[test]
fn test_content_charset() {
    assert_eq!(content_charset("text/html; charset=iso-8859-1"), Some("iso-8859-1"));
    assert_eq!(content_charset("text/html;CHARSET=\"utf-8\""), Some("utf-8"));
    assert_eq!(content_charset("text/html"), None);
}

// ========== meta sniffing ==========

#[test]
fn test_meta_charset_is_declared() {
    let output = parse_with_stream("<head><meta charset='utf-8'></head>", None);
    assert_eq!(output.declared_encoding.unwrap().label(), "utf-8");
    assert!(output.errors.is_empty());
}

#[test]
fn test_meta_http_equiv_is_declared() {
    let html = "<meta http-equiv='Content-Type' content='text/html; charset=iso-8859-1'>";
    let output = parse_with_stream(html, None);
    assert_eq!(output.declared_encoding.unwrap().label(), "iso-8859-1");
}

#[test]
fn test_no_meta_no_declaration() {
    let output = parse_with_stream("<html><head></head></html>", None);
    assert!(output.declared_encoding.is_none());
}

#[test]
fn test_meta_ignored_when_reading_disabled() {
    let options = Options {
        read_encoding: false,
        ..Options::default()
    };
    let output = HtmlParser::new("<meta charset=utf-8>", options).run().unwrap();
    assert!(output.declared_encoding.is_none());
}

#[test]
fn test_mismatch_with_stream_encoding() {
    let html = "<meta charset=iso-8859-1>";
    let output = parse_with_stream(html, Some(Charset::utf8()));

    assert_eq!(output.errors.len(), 1);
    let error = &output.errors[0];
    assert_eq!(error.code, ParseErrorCode::CharsetMismatch);
    assert_eq!(
        error.reason,
        "Encoding mismatch between StreamEncoding: utf-8 and DeclaredEncoding: iso-8859-1"
    );
}

#[test]
fn test_matching_stream_encoding() {
    let output = parse_with_stream("<meta charset=UTF8>", Some(Charset::utf8()));
    assert!(output.errors.is_empty());
    assert_eq!(output.declared_encoding.unwrap().label(), "utf-8");
}
