//! Naming rules: class names -> snake_case, pluralised collection/table names.

use regex::Regex;
use std::sync::OnceLock;

/// Convert a single identifier from CamelCase/camelCase to snake_case.
/// e.g. "BlogPost" -> "blog_post", "HTTPRequest" -> "http_request", "userId" -> "user_id"
pub fn to_snake_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                Some(p) if p == '_' => false,
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_uppercase() => next.map(|n| n.is_lowercase()).unwrap_or(false),
                _ => false,
            };
            if boundary {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else if c == '-' || c == ' ' {
            out.push('_');
        } else {
            out.push(c);
        }
    }
    out
}

/// English pluralisation good enough for table names.
/// "article" -> "articles", "category" -> "categories", "address" -> "addresses", "day" -> "days"
pub fn pluralize(word: &str) -> String {
    if word.is_empty() {
        return String::new();
    }
    let lower = word.to_lowercase();
    if lower.ends_with('y') {
        let before = lower.chars().rev().nth(1);
        if before.map(|c| !"aeiou".contains(c)).unwrap_or(false) {
            return format!("{}ies", &word[..word.len() - 1]);
        }
        return format!("{}s", word);
    }
    if ["s", "x", "z", "ch", "sh"].iter().any(|suffix| lower.ends_with(suffix)) {
        return format!("{}es", word);
    }
    format!("{}s", word)
}

/// Collection/table name for a class: explicit override wins, else snake_case plural of the class name.
pub fn table_name_for(class_name: &str, table_override: Option<&str>) -> String {
    match table_override {
        Some(t) if !t.trim().is_empty() => t.trim().to_string(),
        _ => {
            let snake = to_snake_case(class_name);
            // pluralise only the last word: "blog_post" -> "blog_posts"
            match snake.rsplit_once('_') {
                Some((head, last)) => format!("{}_{}", head, pluralize(last)),
                None => pluralize(&snake),
            }
        }
    }
}

/// Singular snake_case name used in generated tool names (`get_blog_post`).
pub fn singular_name(class_name: &str) -> String {
    to_snake_case(class_name)
}

fn identifier_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static identifier regex"))
}

/// True for plain SQL-safe identifiers (letters, digits, underscore; no leading digit).
pub fn is_identifier(s: &str) -> bool {
    identifier_re().is_match(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snake_case_handles_acronyms_and_camel() {
        assert_eq!(to_snake_case("Article"), "article");
        assert_eq!(to_snake_case("BlogPost"), "blog_post");
        assert_eq!(to_snake_case("HTTPRequest"), "http_request");
        assert_eq!(to_snake_case("userId"), "user_id");
        assert_eq!(to_snake_case("already_snake"), "already_snake");
    }

    #[test]
    fn pluralize_common_suffixes() {
        assert_eq!(pluralize("article"), "articles");
        assert_eq!(pluralize("category"), "categories");
        assert_eq!(pluralize("day"), "days");
        assert_eq!(pluralize("address"), "addresses");
        assert_eq!(pluralize("box"), "boxes");
        assert_eq!(pluralize("branch"), "branches");
    }

    #[test]
    fn table_names() {
        assert_eq!(table_name_for("Article", None), "articles");
        assert_eq!(table_name_for("BlogPost", None), "blog_posts");
        assert_eq!(table_name_for("ProductCategory", None), "product_categories");
        assert_eq!(table_name_for("Person", Some("people")), "people");
        assert_eq!(table_name_for("Person", Some("  ")), "persons");
    }

    #[test]
    fn identifiers() {
        assert!(is_identifier("price"));
        assert!(is_identifier("_private1"));
        assert!(!is_identifier("1abc"));
        assert!(!is_identifier("price; DROP TABLE x"));
        assert!(!is_identifier(""));
    }
}
