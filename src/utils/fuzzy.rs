//! String similarity metrics on an integer 0-100 scale.
//!
//! All metrics build on the indel ratio `2 * LCS(a, b) / (|a| + |b|)`, where
//! LCS is the longest common subsequence, measured in characters. A metric
//! comparing against an empty string scores 0.

use std::collections::BTreeSet;

/// Indel similarity of two strings, rounded to the nearest integer
pub fn ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    ratio_chars(&a, &b)
}

/// Best [`ratio`] of the shorter string against every equally long window of
/// the longer one
pub fn partial_ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (short, long) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };

    if short.is_empty() {
        return 0;
    }

    let mut best = 0;
    for window in long.windows(short.len()) {
        best = best.max(ratio_chars(short, window));
        if best == 100 {
            break;
        }
    }
    best
}

/// [`ratio`] after sorting the words of both strings
pub fn token_sort_ratio(a: &str, b: &str) -> u8 {
    let sorted = |s: &str| {
        let mut words = tokens(s);
        words.sort();
        words.join(" ")
    };
    ratio(&sorted(a), &sorted(b))
}

/// Word-set similarity.
///
/// Compares the shared words alone and the shared words followed by each
/// side's remainder, taking the best of the three pairings.
pub fn token_set_ratio(a: &str, b: &str) -> u8 {
    let a: BTreeSet<String> = tokens(a).into_iter().collect();
    let b: BTreeSet<String> = tokens(b).into_iter().collect();

    let join = |words: Vec<&String>| {
        words
            .into_iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    };
    let shared = join(a.intersection(&b).collect());
    let only_a = join(a.difference(&b).collect());
    let only_b = join(b.difference(&a).collect());

    let combined_a = format!("{} {}", shared, only_a).trim().to_string();
    let combined_b = format!("{} {}", shared, only_b).trim().to_string();

    ratio(&shared, &combined_a)
        .max(ratio(&shared, &combined_b))
        .max(ratio(&combined_a, &combined_b))
}

/// Lowercased alphanumeric words
fn tokens(s: &str) -> Vec<String> {
    s.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

fn ratio_chars(a: &[char], b: &[char]) -> u8 {
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let total = a.len() + b.len();
    let common = lcs_len(a, b);
    ((400 * common + total) / (2 * total)) as u8
}

fn lcs_len(a: &[char], b: &[char]) -> usize {
    let mut previous = vec![0usize; b.len() + 1];
    let mut current = vec![0usize; b.len() + 1];

    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            current[j + 1] = if ca == cb {
                previous[j] + 1
            } else {
                current[j].max(previous[j + 1])
            };
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}
