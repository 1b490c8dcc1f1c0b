use deunicode::deunicode;

/// Normalize a string for search indexing and querying.
/// Transliterates to ASCII and lowercases (e.g., "Иван" -> "ivan").
pub fn normalize(s: &str) -> String {
    deunicode(s).to_lowercase()
}

pub fn normalize_query(query: &str) -> Option<String> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(normalize(trimmed))
    }
}

pub fn like_pattern(normalized: &str) -> String {
    let escaped = normalized
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Searchable form of a contact's name parts.
pub fn name_key(first: Option<&str>, last: Option<&str>) -> String {
    let joined = [first, last]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    normalize(&joined)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_transliterates() {
        assert_eq!(normalize("Иван"), "ivan");
        assert_eq!(normalize("Émile"), "emile");
    }

    #[test]
    fn test_normalize_query_blank() {
        assert_eq!(normalize_query("   "), None);
        assert_eq!(normalize_query(" Ada "), Some("ada".to_string()));
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("a_b%"), "%a\\_b\\%%");
    }

    #[test]
    fn test_name_key() {
        assert_eq!(name_key(Some("Ada"), Some("Lovelace")), "ada lovelace");
        assert_eq!(name_key(None, Some("Hopper")), "hopper");
        assert_eq!(name_key(None, None), "");
    }
}
