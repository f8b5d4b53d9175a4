use pretty_assertions::assert_eq;
use querylike::prelude::*;
use std::time::Duration;

fn like(subject: &str, pattern: &str) -> bool {
    like_match(Some(subject), Some(pattern), None).expect("like_match failed")
}

fn like_esc(subject: &str, pattern: &str, escape: &str) -> bool {
    like_match(Some(subject), Some(pattern), Some(escape)).expect("like_match failed")
}

#[test]
fn test_wildcards() {
    assert!(like("hello world", "hello%"));
    assert!(like("hello", "h_llo"));
    assert!(like("hello", "%"));
    assert!(like("abc", "a%c"));
    assert!(!like("hello", "h_lo"));
    assert!(!like("abd", "a%c"));
}

#[test]
fn test_case_insensitive() {
    assert!(like("Hello World", "hello%"));
    assert!(like("HELLO", "hello"));
    assert!(like("ÉCOLE", "école"));
}

#[test]
fn test_null_operands() {
    assert!(!like_match(None, Some("%"), None).unwrap());
    assert!(!like_match(Some("abc"), None, None).unwrap());
    assert!(!like_match(None, None, Some("\\")).unwrap());
}

#[test]
fn test_empty_operands() {
    assert!(like("", ""));
    assert!(!like("", "%"));
    assert!(!like("abc", ""));
}

#[test]
fn test_trailing_whitespace_tolerated() {
    assert!(like("abc   ", "abc"));
    assert!(like("abc\t\n", "a_c"));
    assert!(!like("  abc", "abc"));
}

#[test]
fn test_regex_metachars_are_literal() {
    assert!(like("a.c", "a.c"));
    assert!(!like("abc", "a.c"));
    assert!(like("(1+1)*2", "(1+1)*_"));
    assert!(like("$5 (net)", "$5 (%)"));
    assert!(!like("5", "^5$"));
}

#[test]
fn test_escape_makes_wildcards_literal() {
    assert!(like_esc("100%", r"100\%", r"\"));
    assert!(!like_esc("1000", r"100\%", r"\"));
    assert!(like_esc("a_b", r"a\_b", r"\"));
    assert!(!like_esc("axb", r"a\_b", r"\"));
    assert!(like_esc("10% off", "10!% %", "!"));
}

#[test]
fn test_escape_char_is_dropped() {
    assert!(like_esc("ab", "a!b", "!"));
    assert!(like_esc("ab", "a!!b", "!"));
}

#[test]
fn test_multi_char_escape_uses_first_char() {
    assert!(like_esc("a%", r"a\%", r"\!"));
    assert!(like_esc("a%", r"a\%", r"\"));
}

#[test]
fn test_translation_is_deterministic() {
    assert_eq!(like_to_regex("a_b%", None), r"\Aa.b.*\s*\z");
    assert_eq!(like_to_regex(r"a\_%", Some('\\')), r"\Aa_.*\s*\z");
    assert_eq!(like_to_regex("1.5", None), like_to_regex("1.5", None));
    assert_eq!(like_to_regex("1.5", None), r"\A1\.5\s*\z");
}

#[test]
fn test_timeout_reports_pattern() {
    let options = MatchOptions::default().with_timeout(Duration::from_nanos(1));
    let subject = "ab".repeat(100_000);
    let err = like_match_with(&options, Some(&subject), Some("%a_%b_%c"), None).unwrap_err();

    assert!(err.is_timeout());
    assert!(err.to_string().contains("%a_%b_%c"));
}

#[test]
fn test_rewrite_then_filter() {
    let rows = vec![
        row([("sku", "AB-100%"), ("owner", "ops")]),
        row([("sku", "ab-1000"), ("owner", "ops")]),
        row([("sku", "CD-200"), ("owner", "dev")]),
    ];
    let set = MemorySet::new(rows);

    let matched = set
        .query(r"|r| like(functions, r.sku, 'ab-100!%', '!') && r.owner == 'ops'")
        .unwrap();
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0]["sku"], Value::from("AB-100%"));

    let matched = set.query("|r| like(functions, r.sku, 'ab-%')").unwrap();
    assert_eq!(matched.len(), 2);
}

#[test]
fn test_rewrite_is_structural() {
    let tree = parse_expr("|p| like(functions, p.name.trim(), 'x%') || p.tag == null").unwrap();
    let rewritten = translate_call(&tree);

    assert!(tree.references(&LIKE));
    assert!(!rewritten.references(&LIKE));
    assert!(rewritten.references(&IN_MEMORY_LIKE));
    assert_eq!(
        rewritten.to_string(),
        "|p| (like_match(p.name.trim(), 'x%', null) || (p.tag == null))"
    );
    assert_eq!(translate_call(&rewritten), rewritten);
}

#[test]
fn test_translation_failure_sentinel() {
    let original = parse_expr("p.name").unwrap();
    assert!(is_translation_failure(Some(&original), Some(&NOT_TRANSLATED)));
    assert!(!is_translation_failure(None, Some(&NOT_TRANSLATED)));
    assert!(!is_translation_failure(Some(&original), Some(&original)));
    assert!(!is_translation_failure(Some(&original), None));
}
