//! Approximate subsequence matching for short strings such as titles.
//!
//! A candidate matches when every character of the pattern appears in it, in
//! order, ignoring case. Matches are scored so that hits at word starts and
//! runs of consecutive characters rank above scattered ones.

const FIRST_CHAR_BONUS: i32 = 10;
const SEPARATOR_BONUS: i32 = 20;
const CAMEL_CASE_BONUS: i32 = 20;
const ADJACENT_BONUS: i32 = 5;
const LEADING_CHAR_PENALTY: i32 = -5;
const MAX_LEADING_PENALTY: i32 = -15;
const UNMATCHED_CHAR_PENALTY: i32 = -1;

const SEPARATORS: &[char] = &[' ', '_', '-', '.', '/', '\\'];

/// A candidate that matched, with its score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// Position of the candidate in the input slice.
    pub index: usize,
    pub score: i32,
    /// Character positions (not byte offsets) of the matched characters.
    pub matched_indexes: Vec<usize>,
}

/// Match `pattern` against every candidate, best score first.
///
/// Candidates with equal scores keep their input order. An empty pattern
/// matches nothing.
pub fn find<S: AsRef<str>>(pattern: &str, candidates: &[S]) -> Vec<Match> {
    if pattern.is_empty() {
        return Vec::new();
    }
    let pattern: Vec<char> = pattern.chars().collect();

    let mut matches: Vec<Match> = candidates
        .iter()
        .enumerate()
        .filter_map(|(index, candidate)| {
            score(&pattern, candidate.as_ref()).map(
                |(score, matched_indexes)| Match {
                    index,
                    score,
                    matched_indexes,
                },
            )
        })
        .collect();

    // Stable, so ties stay in candidate order.
    matches.sort_by(|a, b| b.score.cmp(&a.score));
    matches
}

fn score(pattern: &[char], candidate: &str) -> Option<(i32, Vec<usize>)> {
    let chars: Vec<char> = candidate.chars().collect();
    let mut matched = Vec::with_capacity(pattern.len());
    let mut total = 0i32;
    let mut previous_matched = false;

    for (i, &c) in chars.iter().enumerate() {
        let Some(&wanted) = pattern.get(matched.len()) else {
            break;
        };
        if !eq_ignore_case(c, wanted) {
            previous_matched = false;
            continue;
        }

        if i == 0 {
            total += FIRST_CHAR_BONUS;
        } else {
            let prev = chars[i - 1];
            if SEPARATORS.contains(&prev) {
                total += SEPARATOR_BONUS;
            } else if prev.is_lowercase() && c.is_uppercase() {
                total += CAMEL_CASE_BONUS;
            }
        }
        if previous_matched {
            total += ADJACENT_BONUS;
        }
        if matched.is_empty() {
            let leading = i32::try_from(i).unwrap_or(i32::MAX);
            total += LEADING_CHAR_PENALTY
                .saturating_mul(leading)
                .max(MAX_LEADING_PENALTY);
        }

        matched.push(i);
        previous_matched = true;
    }

    if matched.len() < pattern.len() {
        return None;
    }

    let unmatched =
        i32::try_from(chars.len() - matched.len()).unwrap_or(i32::MAX);
    total = total
        .saturating_add(UNMATCHED_CHAR_PENALTY.saturating_mul(unmatched));
    Some((total, matched))
}

fn eq_ignore_case(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}
