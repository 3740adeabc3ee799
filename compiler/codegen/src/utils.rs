// codegen/src/utils.rs

/// Words that must be escaped when used as identifiers
const RUST_KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "do", "dyn", "else",
    "enum", "extern", "false", "final", "fn", "for", "if", "impl", "in", "let", "loop", "macro", "match",
    "mod", "move", "mut", "override", "priv", "pub", "ref", "return", "static", "struct", "trait", "true",
    "try", "type", "typeof", "unsafe", "unsized", "use", "virtual", "where", "while", "yield",
];

/// Converts a PascalCase or camelCase string to snake_case
///
/// Used for handler names, client modules and method calls, which follow the
/// same casing the RPC stub generator applies (e.g. `SayHello` →
/// `say_hello`). Acronym runs stay together: `HTTPRule` → `http_rule`.
///
/// # Examples
/// ```
/// use codegen::utils::pascal_to_snake_case;
/// assert_eq!(pascal_to_snake_case("SayHello"), "say_hello");
/// assert_eq!(pascal_to_snake_case("GetHTTPRule"), "get_http_rule");
/// assert_eq!(pascal_to_snake_case("update_mask"), "update_mask");
/// ```
pub fn pascal_to_snake_case(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut result = String::with_capacity(input.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let boundary = prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower);
            if boundary && !result.ends_with('_') {
                result.push('_');
            }
        }
        result.extend(c.to_lowercase());
    }

    result
}

/// Converts a name to SCREAMING_SNAKE_CASE for constants
pub fn screaming_snake_case(input: &str) -> String { pascal_to_snake_case(input).to_uppercase() }

/// Sanitizes external identifiers (e.g. proto field names) to be valid Rust identifiers
pub fn sanitize_external_identifier(name: &str) -> String {
    match name {
        "self" | "super" | "crate" | "Self" => format!("{name}_"),
        _ if RUST_KEYWORDS.contains(&name) => format!("r#{name}"),
        _ => {
            let sanitized = name.replace('-', "_");
            sanitized.chars().filter(|c| c.is_alphanumeric() || *c == '_').collect()
        }
    }
}

/// Rust identifier of a message field
pub fn field_ident(name: &str) -> String { sanitize_external_identifier(&pascal_to_snake_case(name)) }

/// Module-relative path of a type declared as `Outer.Inner`.
///
/// Enclosing messages become snake_case modules, as prost lays them out.
pub fn nested_type_path(local_name: &str) -> String {
    let mut segments: Vec<String> = local_name.split('.').map(str::to_string).collect();
    let last = segments.len() - 1;
    for segment in &mut segments[..last] {
        *segment = sanitize_external_identifier(&pascal_to_snake_case(segment));
    }
    segments.join("::")
}

/// JSON name of a proto field: underscores dropped, the letter after each
/// one upper-cased.
///
/// ```
/// use codegen::utils::json_name;
/// assert_eq!(json_name("display_name"), "displayName");
/// ```
pub fn json_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.push(c.to_ascii_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Escape `s` as a Rust string literal body
pub fn escape_str(s: &str) -> String { s.escape_default().to_string() }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pascal_to_snake_case() {
        assert_eq!(pascal_to_snake_case("Greeter"), "greeter");
        assert_eq!(pascal_to_snake_case("SayHello"), "say_hello");
        assert_eq!(pascal_to_snake_case("GetBook"), "get_book");
        assert_eq!(pascal_to_snake_case("ListV2Books"), "list_v2_books");
        assert_eq!(pascal_to_snake_case("HTTPRule"), "http_rule");
    }

    #[test]
    fn test_screaming_snake_case() {
        assert_eq!(screaming_snake_case("WatchBooks"), "WATCH_BOOKS");
    }

    #[test]
    fn test_field_ident_escapes_keywords() {
        assert_eq!(field_ident("type"), "r#type");
        assert_eq!(field_ident("self"), "self_");
        assert_eq!(field_ident("page_size"), "page_size");
    }

    #[test]
    fn test_json_name() {
        assert_eq!(json_name("page_count"), "pageCount");
        assert_eq!(json_name("title"), "title");
        assert_eq!(json_name("field_2_b"), "field2B");
    }

    #[test]
    fn test_nested_type_path() {
        assert_eq!(nested_type_path("HelloRequest"), "HelloRequest");
        assert_eq!(nested_type_path("Book.Edition"), "book::Edition");
        assert_eq!(nested_type_path("Shelf.Row.Slot"), "shelf::row::Slot");
    }
}
