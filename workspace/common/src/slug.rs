use rand::Rng;

const SUFFIX_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Longest slug accepted for a card.
pub const MAX_SLUG_LEN: usize = 64;

/// Canonical form used for storage and lookup: trimmed and lower-cased.
pub fn normalize_slug(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Turns a display name into a URL-safe base: ASCII alphanumerics are kept
/// lower-cased, every other run of characters becomes a single `-`.
///
/// Names without any usable character fall back to `"card"`.
pub fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_dash = false;

    for ch in name.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    // Leave room for the random suffix.
    out.truncate(MAX_SLUG_LEN - 8);
    let trimmed = out.trim_end_matches('-');

    if trimmed.is_empty() {
        "card".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Random lower-case alphanumeric string of `len` characters.
pub fn random_suffix(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| SUFFIX_CHARSET[rng.gen_range(0..SUFFIX_CHARSET.len())] as char)
        .collect()
}

/// Derives a fresh slug for a new card, e.g. `"Jane Doe"` -> `"jane-doe-k3x9qa"`.
pub fn derive_slug(name: &str) -> String {
    format!("{}-{}", slugify(name), random_suffix(6))
}

/// Whether an already normalized slug may be assigned to a card.
///
/// Only `[a-z0-9-]` is allowed, so a slug can never contain the `.` that
/// marks a static file request.
pub fn is_well_formed_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug.len() <= MAX_SLUG_LEN
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_trims_and_lowercases() {
        assert_eq!(normalize_slug("  Jane-Doe \n"), "jane-doe");
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("Jane Doe"), "jane-doe");
        assert_eq!(slugify("  Jane   O'Doe -- CEO "), "jane-o-doe-ceo");
        assert_eq!(slugify("Émile Zola"), "mile-zola");
    }

    #[test]
    fn slugify_falls_back_for_empty_names() {
        assert_eq!(slugify(""), "card");
        assert_eq!(slugify("!!!"), "card");
    }

    #[test]
    fn derived_slug_has_name_prefix_and_suffix() {
        let slug = derive_slug("Jane Doe");
        assert!(slug.starts_with("jane-doe-"));
        let suffix = slug.trim_start_matches("jane-doe-");
        assert_eq!(suffix.len(), 6);
        assert!(is_well_formed_slug(&slug));
    }

    #[test]
    fn long_names_still_produce_valid_slugs() {
        let name = "a".repeat(200);
        let slug = derive_slug(&name);
        assert!(slug.len() <= MAX_SLUG_LEN);
        assert!(is_well_formed_slug(&slug));
    }

    #[test]
    fn well_formed_rejects_dots_and_edges() {
        assert!(is_well_formed_slug("jane-doe"));
        assert!(!is_well_formed_slug("jane.doe"));
        assert!(!is_well_formed_slug("-jane"));
        assert!(!is_well_formed_slug("jane-"));
        assert!(!is_well_formed_slug(""));
        assert!(!is_well_formed_slug("Jane"));
    }
}
