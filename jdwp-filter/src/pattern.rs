// Class pattern matching
//
// Restricted glob used by ClassMatch and ClassExclude: a single '*' at the
// start (suffix match) or at the end (prefix match), otherwise equality.
// Comparison is on raw signature bytes, no case folding.

/// Match a type signature against a class pattern.
///
/// A pattern written in descriptor form (`Lcom/foo/*;`) is matched against
/// the name inside the signature's own `L...;` wrapper, so the wildcard
/// rules apply to the class name rather than to the descriptor punctuation.
pub fn match_pattern(signature: &str, pattern: &str) -> bool {
    if let (Some(name), Some(name_pattern)) = (descriptor_name(signature), descriptor_name(pattern)) {
        if name_pattern.contains('*') {
            return match_glob(name.as_bytes(), name_pattern.as_bytes());
        }
    }
    match_glob(signature.as_bytes(), pattern.as_bytes())
}

fn match_glob(text: &[u8], pattern: &[u8]) -> bool {
    match pattern {
        [b'*', suffix @ ..] => text.ends_with(suffix),
        [prefix @ .., b'*'] => text.starts_with(prefix),
        _ => text == pattern,
    }
}

// "Lcom/foo/Bar;" -> "com/foo/Bar"
fn descriptor_name(signature: &str) -> Option<&str> {
    signature.strip_prefix('L')?.strip_suffix(';')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suffix_match() {
        assert!(match_pattern("Lcom/foo/Bar;", "*Bar;"));
        assert!(match_pattern("Lcom/foo/Bar;", "*;"));
        assert!(!match_pattern("Lcom/foo/Bar;", "*Baz;"));
        assert!(!match_pattern("r;", "*Bar;"));
    }

    #[test]
    fn test_prefix_match() {
        assert!(match_pattern("Lcom/foo/Bar;", "Lcom/foo/*"));
        assert!(match_pattern("Lcom/foo/Bar;", "L*"));
        assert!(!match_pattern("Lcom/foobar/Bar;", "Lcom/foo/B*"));
        assert!(!match_pattern("L", "Lcom/*"));
    }

    #[test]
    fn test_exact_match() {
        assert!(match_pattern("Lcom/foo/Bar;", "Lcom/foo/Bar;"));
        assert!(!match_pattern("Lcom/foo/Bar;", "Lcom/foo/bar;"));
        assert!(!match_pattern("Lcom/foo/Bar;", "Lcom/foo/Bar"));
        assert!(match_pattern("", ""));
        assert!(!match_pattern("LA;", ""));
    }

    #[test]
    fn test_star_matches_everything() {
        for signature in ["", "I", "[Ljava/lang/String;", "Lcom/foo/Bar;"] {
            assert!(match_pattern(signature, "*"), "{signature}");
        }
    }

    #[test]
    fn test_inner_star_is_literal() {
        assert!(!match_pattern("Lcom/foo/Bar;", "Lcom/*/Bar;"));
        assert!(match_pattern("Lcom/*/Bar;", "Lcom/*/Bar;"));
    }

    #[test]
    fn test_descriptor_form_pattern() {
        assert!(match_pattern("Lcom/foo/Bar;", "Lcom/foo/*;"));
        assert!(match_pattern("Lcom/foo/Bar;", "L*Bar;"));
        assert!(!match_pattern("Lcom/other/Bar;", "Lcom/foo/*;"));
        assert!(!match_pattern("[Lcom/foo/Bar;", "Lcom/foo/*;"));
    }

    #[test]
    fn test_suffix_and_prefix_properties() {
        let signatures = ["", "L;", "Lcom/foo/Bar;", "[I", "Ljava/util/Map$Entry;"];
        let parts = ["", ";", "Bar;", "Lcom/", "Map$Entry;", "zzz"];
        for s in signatures {
            for part in parts {
                assert_eq!(match_pattern(s, &format!("*{part}")), s.ends_with(part));
                if !part.is_empty() {
                    assert_eq!(match_pattern(s, &format!("{part}*")), s.starts_with(part));
                    assert_eq!(match_pattern(s, part), s == part);
                }
            }
        }
    }
}
