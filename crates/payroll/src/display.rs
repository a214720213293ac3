//! Human-facing names and URL slugs.
//!
//! Source data arrives in upper case ("VILLAGE OF OAK PARK", "O'BRIEN,
//! MARY"); everything shown to readers goes through [`title_case`].

use std::sync::LazyLock;

use regex::Regex;

static RE_ROMAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:x{0,3})(?:ix|iv|v?i{0,3})$").unwrap());
static RE_APOSTROPHE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[dlo]'[a-z]+$").unwrap());
static RE_MC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^mc[a-z]{2,}$").unwrap());

const SMALL_WORDS: &[&str] = &[
    "a", "an", "and", "as", "at", "but", "by", "for", "in", "of", "on", "or", "the", "to", "via",
];

/// Title-cases a name or job title.
///
/// Small words stay lower case unless they lead, Roman numerals are upper
/// cased, and `Mc`/`O'` style surnames keep their inner capital. Hyphenated
/// and slashed compounds are cased part by part.
pub fn title_case(input: &str) -> String {
    input
        .split_whitespace()
        .enumerate()
        .map(|(i, word)| {
            let word = word.to_lowercase();
            if i > 0 && SMALL_WORDS.contains(&word.as_str()) {
                word
            } else {
                case_compound(&word, '/')
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn case_compound(word: &str, separator: char) -> String {
    word.split(separator)
        .map(|part| {
            if separator == '/' {
                case_compound(part, '-')
            } else {
                case_word(part)
            }
        })
        .collect::<Vec<_>>()
        .join(&separator.to_string())
}

fn case_word(word: &str) -> String {
    if word.is_empty() {
        return String::new();
    }
    if RE_ROMAN.is_match(word) {
        return word.to_uppercase();
    }
    if RE_APOSTROPHE_PREFIX.is_match(word) {
        return format!("{}'{}", capitalize(&word[..1]), capitalize(&word[2..]));
    }
    if RE_MC.is_match(word) {
        return format!("Mc{}", capitalize(&word[2..]));
    }
    capitalize(word)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() => first.to_uppercase().chain(chars).collect(),
        Some(_) => word.to_string(),
        None => String::new(),
    }
}

/// Display name of an employer.
///
/// Departments whose name does not already mention their parent are
/// prefixed with it, so "POLICE" under "CITY OF CHICAGO" reads
/// "City of Chicago Police".
pub fn employer_display_name(name: &str, parent_name: Option<&str>) -> String {
    match parent_name {
        Some(parent) if !name.to_lowercase().contains(&parent.to_lowercase()) => {
            title_case(&format!("{} {}", parent, name))
        }
        _ => title_case(name),
    }
}

/// Display name of a person; either half of the name may be missing.
pub fn person_display_name(first_name: Option<&str>, last_name: Option<&str>) -> String {
    let joined = [first_name, last_name]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    title_case(joined.trim_start_matches('-'))
}

/// Lower-case, hyphen-joined slug of alphanumeric runs.
pub fn slugify(value: &str) -> String {
    value
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Slug for `value` that `is_taken` does not reject, adding `-2`, `-3`, ...
/// as needed.
pub fn unique_slug<F>(value: &str, mut is_taken: F) -> String
where
    F: FnMut(&str) -> bool,
{
    let base = match slugify(value) {
        s if s.is_empty() => "unnamed".to_string(),
        s => s,
    };

    if !is_taken(&base) {
        return base;
    }

    let mut n = 2;
    loop {
        let candidate = format!("{}-{}", base, n);
        if !is_taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}
