//! Identifier casing shared by constant derivation and composition

/// Split an identifier into lowercase words.
///
/// Word boundaries are separators (anything not alphanumeric), a lower-to-upper
/// transition (`updateName`), and the end of an acronym (`URLValue` ->
/// `url`, `value`).
fn words(name: &str) -> Vec<String> {
    let chars: Vec<char> = name.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &ch) in chars.iter().enumerate() {
        if !ch.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }

        // `current` is only non-empty when chars[i - 1] was alphanumeric
        if ch.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|c| c.is_lowercase());
            if prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next_is_lower)
            {
                words.push(std::mem::take(&mut current));
            }
        }

        current.extend(ch.to_lowercase());
    }

    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// Upper-case the first character, leaving the rest untouched.
pub fn upper_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
    }
}

/// Constant name for a declared action or getter.
///
/// Every ASCII uppercase letter gets a `_` in front of it, then the whole
/// name is uppercased. Nothing else changes, so acronyms and separators pass
/// through as they are.
///
/// ```
/// use modstore_core::casing::constant_case;
///
/// assert_eq!(constant_case("updateNameAction"), "UPDATE_NAME_ACTION");
/// assert_eq!(constant_case("loadURL"), "LOAD__U_R_L");
/// assert_eq!(constant_case("Name"), "_NAME");
/// ```
pub fn constant_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for ch in name.chars() {
        if ch.is_ascii_uppercase() {
            out.push('_');
        }
        out.extend(ch.to_uppercase());
    }
    out
}

/// Constant name for a default state-key getter: SCREAMING_SNAKE_CASE over
/// the split words (`pageURL` -> `PAGE_URL`, `page-info` -> `PAGE_INFO`).
pub fn snake_constant_case(name: &str) -> String {
    words(name)
        .iter()
        .map(|w| w.to_uppercase())
        .collect::<Vec<_>>()
        .join("_")
}

/// Convert an identifier to camelCase.
///
/// Used to derive a composition field from a module's type name
/// (`PageList` -> `pageList`).
pub fn camel_case(name: &str) -> String {
    let mut out = String::new();
    for (i, word) in words(name).iter().enumerate() {
        if i == 0 {
            out.push_str(word);
        } else {
            out.push_str(&upper_first(word));
        }
    }
    out
}

/// Name of the mutation derived for a top-level state key.
///
/// Only the first character of the key changes case, so `page_info` becomes
/// `updatePage_info`.
pub fn update_member(key: &str) -> String {
    format!("update{}", upper_first(key))
}
