//! Business name similarity.
//!
//! Two names are similar when one contains the other (case-sensitive) or
//! their Levenshtein distance is under a threshold. The distance is
//! computed with an early exit so hopeless pairs cost little; the engine
//! evaluates it for every nearby entity/establishment pair in a district.

use std::sync::LazyLock;

use regex::Regex;

static LEADING_ARTICLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^the\s+").unwrap_or_else(|_| unreachable!()));

static COMPANY_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[\s,]+(ltd\.?|limited|plc|llp)$").unwrap_or_else(|_| unreachable!())
});

/// Levenshtein distance between `a` and `b` if it is at most `max`.
///
/// Works on `char`s. Returns `None` as soon as every cell of the current
/// row exceeds `max`, since the distance can only grow from there.
#[must_use]
pub fn bounded_levenshtein(a: &str, b: &str, max: usize) -> Option<usize> {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.len().abs_diff(b.len()) > max {
        return None;
    }
    if a.is_empty() || b.is_empty() {
        return Some(a.len().max(b.len()));
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        let mut row_min = curr[0];

        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            curr[j + 1] = substitution.min(prev[j + 1] + 1).min(curr[j] + 1);
            row_min = row_min.min(curr[j + 1]);
        }

        if row_min > max {
            return None;
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    let distance = prev[b.len()];
    (distance <= max).then_some(distance)
}

/// Strips a leading "The" and a trailing company designator
/// (`Ltd`, `Limited`, `PLC`, `LLP`).
#[must_use]
pub fn normalize_name(name: &str) -> String {
    let name = LEADING_ARTICLE.replace(name.trim(), "");
    COMPANY_SUFFIX.replace(&name, "").trim().to_string()
}

/// Whether two names are similar under `edit_threshold`.
///
/// With `normalize` set, the normalized forms are compared as well and
/// either comparison succeeding is enough. Empty names never match.
#[must_use]
pub fn names_similar(a: &str, b: &str, edit_threshold: usize, normalize: bool) -> bool {
    if raw_similar(a, b, edit_threshold) {
        return true;
    }
    normalize && raw_similar(&normalize_name(a), &normalize_name(b), edit_threshold)
}

fn raw_similar(a: &str, b: &str, edit_threshold: usize) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    if a.contains(b) || b.contains(a) {
        return true;
    }
    edit_threshold
        .checked_sub(1)
        .and_then(|max| bounded_levenshtein(a, b, max))
        .is_some()
}
