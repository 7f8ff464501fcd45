//! Token and label normalization helpers shared by parsers and label extractors.

/// Normalize raw leaf text into a vocabulary token.
///
/// Lowercases, drops escaped newlines, whitespace, quotes, commas and
/// non-printable characters. Keeps only ASCII letters when any remain,
/// otherwise the cleaned text, otherwise `default`.
pub fn normalize_token(raw: &str, default: &str) -> String {
    let lowered = raw.to_lowercase().replace("\\n", "");
    let cleaned: String = lowered
        .chars()
        .filter(|ch| !ch.is_whitespace())
        .filter(|ch| !matches!(ch, '"' | '\'' | ','))
        .filter(|ch| !ch.is_control())
        .collect();
    let stripped: String = cleaned
        .chars()
        .filter(|ch| ch.is_ascii_alphabetic())
        .collect();
    if !stripped.is_empty() {
        stripped
    } else if !cleaned.is_empty() {
        cleaned
    } else {
        default.to_string()
    }
}

/// Split an identifier into lowercase subtokens on case and separator boundaries.
///
/// `getHTTPResponse_code` becomes `["get", "http", "response", "code"]`.
pub fn split_to_subtokens(raw: &str) -> Vec<String> {
    let chars: Vec<char> = raw.trim().chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();
    for (idx, ch) in chars.iter().enumerate() {
        if !ch.is_alphanumeric() {
            flush_word(&mut current, &mut words);
            continue;
        }
        let prev = idx.checked_sub(1).map(|i| chars[i]);
        let next = chars.get(idx + 1).copied();
        let lower_to_upper = ch.is_uppercase() && prev.is_some_and(|p| p.is_lowercase());
        let acronym_end = ch.is_uppercase()
            && prev.is_some_and(|p| p.is_uppercase())
            && next.is_some_and(|n| n.is_lowercase());
        let digit_edge = prev.is_some_and(|p| p.is_ascii_digit() != ch.is_ascii_digit());
        if lower_to_upper || acronym_end || digit_edge {
            flush_word(&mut current, &mut words);
        }
        current.extend(ch.to_lowercase());
    }
    flush_word(&mut current, &mut words);
    words
}

fn flush_word(current: &mut String, words: &mut Vec<String>) {
    if !current.is_empty() {
        words.push(std::mem::take(current));
    }
}

/// Replace whitespace runs with `_` so the label stays a single corpus field.
pub fn sanitize_label<T: AsRef<str>>(raw: T) -> String {
    let mut sanitized = String::new();
    let mut seen_space = false;
    for ch in raw.as_ref().trim().chars() {
        if ch.is_whitespace() {
            if !seen_space {
                sanitized.push('_');
                seen_space = true;
            }
        } else {
            sanitized.push(ch);
            seen_space = false;
        }
    }
    sanitized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_token_keeps_letters_only_when_present() {
        assert_eq!(normalize_token("getName", "EMPTY"), "getname");
        assert_eq!(normalize_token("\"Hello, World\"", "EMPTY"), "helloworld");
        assert_eq!(normalize_token("x_1", "EMPTY"), "x");
    }

    #[test]
    fn normalize_token_falls_back_to_cleaned_text_then_default() {
        assert_eq!(normalize_token("42", "EMPTY"), "42");
        assert_eq!(normalize_token("( )", "EMPTY"), "()");
        assert_eq!(normalize_token("  ", "EMPTY"), "EMPTY");
        assert_eq!(normalize_token("''", "EMPTY"), "EMPTY");
    }

    #[test]
    fn normalized_tokens_never_contain_whitespace() {
        for raw in ["a b", "1 2 3", "\t\n", "foo\\nbar", "x =\n 1"] {
            assert!(!normalize_token(raw, "EMPTY").contains(char::is_whitespace));
        }
    }

    #[test]
    fn split_to_subtokens_handles_case_and_separators() {
        assert_eq!(
            split_to_subtokens("getHTTPResponse_code"),
            vec!["get", "http", "response", "code"]
        );
        assert_eq!(split_to_subtokens("snake_case_name"), vec!["snake", "case", "name"]);
        assert_eq!(split_to_subtokens("v2Parser"), vec!["v", "2", "parser"]);
        assert!(split_to_subtokens("__").is_empty());
    }

    #[test]
    fn sanitize_label_collapses_whitespace() {
        assert_eq!(sanitize_label(" my  file.py "), "my_file.py");
        assert_eq!(sanitize_label("a\tb\nc"), "a_b_c");
        assert_eq!(sanitize_label("plain"), "plain");
    }
}
