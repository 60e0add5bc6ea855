use super::ReleaseKey;
use super::ReleaseMessageKeyGenerator;

#[test]
fn test_generate_uses_separator() {
    let gen = ReleaseMessageKeyGenerator::default();
    assert_eq!(gen.generate("A", "C", "N"), "A+C+N");

    let gen = ReleaseMessageKeyGenerator::new('|');
    assert_eq!(gen.generate("A", "C", "N"), "A|C|N");
}

#[test]
fn test_parse_well_formed() {
    let gen = ReleaseMessageKeyGenerator::default();
    assert_eq!(
        gen.parse("app+default+application"),
        Some(ReleaseKey {
            app_id: "app".to_string(),
            cluster_name: "default".to_string(),
            namespace_name: "application".to_string(),
        })
    );
}

#[test]
fn test_parse_rejects_wrong_field_count() {
    let gen = ReleaseMessageKeyGenerator::default();
    assert_eq!(gen.parse(""), None);
    assert_eq!(gen.parse("A+C"), None);
    assert_eq!(gen.parse("A+C+N+X"), None);
    // Empty segments are dropped before counting
    assert_eq!(gen.parse("A++N"), None);
    assert_eq!(gen.parse("+++"), None);
    assert!(gen.parse("+A+C+N+").is_some());
}

#[test]
fn test_parse_respects_configured_separator() {
    let gen = ReleaseMessageKeyGenerator::new('|');
    assert!(gen.parse("A|C|N").is_some());
    assert_eq!(gen.parse("A+C+N"), None);
}
