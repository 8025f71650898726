//! Text rendering utilities for human-friendly diagnostics.
//!
//! Provides helpers to format dependency chains, initialization plans,
//! conventional service names and "did you mean?" suggestions.

/// Renders a dependency chain as a readable string.
///
/// # Examples
/// ```
/// use bootwire_support::rendering::render_chain;
///
/// let chain = vec!["user_service", "user_repository", "user_service"];
/// let rendered = render_chain(&chain);
/// assert_eq!(rendered, "user_service → user_repository → user_service");
/// ```
pub fn render_chain(chain: &[impl AsRef<str>]) -> String {
    chain
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join(" → ")
}

/// Renders an initialization plan with scope annotations.
///
/// ```text
/// [singleton] database_client
///             ↓
/// [singleton] user_repository  (needs: database_client)
///             ↓
/// [factory  ] unit_of_work
/// ```
pub fn render_chain_vertical(entries: &[ChainEntry]) -> String {
    let mut result = String::new();
    let max_scope_len = entries
        .iter()
        .map(|e| e.scope.len())
        .max()
        .unwrap_or(0);

    for (i, entry) in entries.iter().enumerate() {
        if i > 0 {
            result.push_str(&" ".repeat(max_scope_len + 3));
            result.push_str("↓\n");
        }

        result.push_str(&format!(
            "[{:<width$}] {}",
            entry.scope,
            entry.name,
            width = max_scope_len,
        ));

        if let Some(ref detail) = entry.detail {
            result.push_str(&format!("  ({detail})"));
        }

        result.push('\n');
    }

    result
}

/// An entry in a vertical plan rendering.
#[derive(Debug)]
pub struct ChainEntry {
    /// The service name
    pub name: String,
    /// The scope label (e.g. "singleton", "factory")
    pub scope: String,
    /// Optional trailing note, such as the dependencies it needs
    pub detail: Option<String>,
}

/// Shortens a fully qualified type name for display.
///
/// ```
/// use bootwire_support::rendering::shorten_type_name;
///
/// let short = shorten_type_name("my_app::services::user::UserService");
/// assert_eq!(short, "UserService");
///
/// let short = shorten_type_name("alloc::sync::Arc<dyn my_app::traits::Logger>");
/// assert_eq!(short, "Arc<dyn Logger>");
/// ```
pub fn shorten_type_name(full_name: &str) -> String {
    let mut result = String::with_capacity(full_name.len());
    let mut chars = full_name.chars().peekable();
    let mut current_segment = String::new();

    while let Some(ch) = chars.next() {
        match ch {
            ':' if chars.peek() == Some(&':') => {
                chars.next();
                current_segment.clear();
            }
            '<' | '>' | ',' | ' ' => {
                result.push_str(&current_segment);
                result.push(ch);
                current_segment.clear();
            }
            _ => {
                current_segment.push(ch);
            }
        }
    }

    result.push_str(&current_segment);
    result
}

/// Converts a camel-case type name into the conventional service name.
///
/// An underscore goes before every capital that starts a new word, either
/// because a lowercase letter follows it or because a lowercase letter or
/// digit precedes it. Runs of capitals stay together.
///
/// ```
/// use bootwire_support::rendering::snake_case;
///
/// assert_eq!(snake_case("UserService"), "user_service");
/// assert_eq!(snake_case("HTTPClient"), "http_client");
/// assert_eq!(snake_case("Oauth2Provider"), "oauth2_provider");
/// ```
pub fn snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut result = String::with_capacity(name.len() + 4);

    for (i, &ch) in chars.iter().enumerate() {
        if ch.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|c| c.is_lowercase());
            let prev_is_word_end = prev.is_lowercase() || prev.is_ascii_digit();

            if prev != '_' && (prev_is_word_end || next_is_lower) {
                result.push('_');
            }
        }
        result.extend(ch.to_lowercase());
    }

    result
}

/// Generates "did you mean?" suggestions based on registered names.
///
/// Compares the requested name against available ones and returns the
/// closest matches, best first.
pub fn suggest_similar(
    requested: &str,
    available: &[&str],
    max_suggestions: usize,
) -> Vec<String> {
    let requested_lower = requested.to_lowercase();
    let requested_short = shorten_type_name(requested).to_lowercase();

    let mut scored: Vec<(&str, usize)> = available
        .iter()
        .filter_map(|&name| {
            let name_lower = name.to_lowercase();
            let name_short = shorten_type_name(name).to_lowercase();

            if name_lower == requested_lower {
                return None;
            }

            if name_lower.contains(&requested_lower)
                || requested_lower.contains(&name_lower)
            {
                return Some((name, 100));
            }

            if name_short.contains(&requested_short)
                || requested_short.contains(&name_short)
            {
                return Some((name, 80));
            }

            let common = name_short
                .chars()
                .zip(requested_short.chars())
                .take_while(|(a, b)| a == b)
                .count();

            if common >= 3 {
                return Some((name, common * 10));
            }

            None
        })
        .collect();

    // Stable sort keeps ties in the caller's order.
    scored.sort_by(|a, b| b.1.cmp(&a.1));
    scored
        .into_iter()
        .take(max_suggestions)
        .map(|(name, _)| name.to_string())
        .collect()
}
