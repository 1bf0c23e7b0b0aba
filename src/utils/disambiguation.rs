//! Author name disambiguation by fuzzy scoring.
//!
//! A candidate author string is scored against a target name by taking the
//! best of four similarity metrics over normalized names, then adding a bonus
//! when both names, as written, have the same initials. Scores are clipped to
//! 100 before being compared with the threshold.

use crate::client::ClientError;
use crate::models::{AuthorMatch, DisambiguatedPublication, PublicationRecord};
use crate::utils::fuzzy::{partial_ratio, ratio, token_set_ratio, token_sort_ratio};

/// Name tokens dropped during normalization (compared without `.` and `,`)
pub const NAME_SUFFIXES: [&str; 8] = ["jr", "sr", "ii", "iii", "iv", "phd", "md", "dr"];

/// Points added when candidate and target initials are identical
pub const INITIALS_BONUS: u8 = 10;

/// Threshold used by [`AuthorDisambiguator::match_authors`] callers that
/// have no preference
pub const DEFAULT_THRESHOLD: u8 = 80;

/// Lowercase a name, collapse whitespace and drop honorifics and suffixes
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase()
        .split_whitespace()
        .filter(|token| !is_suffix(token))
        .collect::<Vec<_>>()
        .join(" ")
}

/// First letter of each whitespace-separated token, uppercased
pub fn extract_initials(name: &str) -> String {
    name.split_whitespace()
        .filter_map(|token| token.chars().find(|c| c.is_alphabetic()))
        .flat_map(char::to_uppercase)
        .collect()
}

fn is_suffix(token: &str) -> bool {
    let bare = token.trim_matches(|c| c == '.' || c == ',');
    NAME_SUFFIXES.contains(&bare)
}

/// A validated target name, normalized once per call.
///
/// Initials come from the name as given, so suffixes such as `Jr` still
/// contribute one.
struct Target {
    normalized: String,
    initials: String,
}

impl Target {
    fn parse(name: &str) -> Result<Self, ClientError> {
        if name.trim().is_empty() {
            return Err(ClientError::InvalidArgument(
                "target author name must not be empty".to_string(),
            ));
        }

        let normalized = normalize_name(name);
        if normalized.is_empty() {
            return Err(ClientError::InvalidArgument(format!(
                "target author name {:?} has no usable tokens",
                name
            )));
        }

        let initials = extract_initials(name);
        Ok(Self {
            normalized,
            initials,
        })
    }
}

fn check_threshold(threshold: u8) -> Result<(), ClientError> {
    if threshold > 100 {
        return Err(ClientError::InvalidArgument(format!(
            "threshold must be between 0 and 100, got {}",
            threshold
        )));
    }
    Ok(())
}

/// Scores candidate author strings against a target name
///
/// Stateless apart from its bonus setting; safe to share between tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthorDisambiguator {
    initials_bonus: u8,
}

impl Default for AuthorDisambiguator {
    fn default() -> Self {
        Self {
            initials_bonus: INITIALS_BONUS,
        }
    }
}

impl AuthorDisambiguator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_initials_bonus(initials_bonus: u8) -> Self {
        Self { initials_bonus }
    }

    pub fn initials_bonus(&self) -> u8 {
        self.initials_bonus
    }

    /// Check a target name and threshold without scoring anything
    pub fn validate(&self, target: &str, threshold: u8) -> Result<(), ClientError> {
        Target::parse(target)?;
        check_threshold(threshold)
    }

    /// Score one candidate against `target`
    pub fn score(&self, target: &str, candidate: &str) -> Result<u8, ClientError> {
        let target = Target::parse(target)?;
        Ok(self.score_against(&target, candidate))
    }

    /// Candidates scoring at least `threshold`, best first.
    ///
    /// Candidates with equal scores keep their input order.
    pub fn match_authors<S: AsRef<str>>(
        &self,
        target: &str,
        candidates: &[S],
        threshold: u8,
    ) -> Result<Vec<AuthorMatch>, ClientError> {
        let target = Target::parse(target)?;
        check_threshold(threshold)?;
        Ok(self.rank(&target, candidates, threshold))
    }

    /// Publications with at least one qualifying author, best match first.
    ///
    /// Each surviving publication carries every qualifying author and the
    /// best of their scores. Publications with equal best scores keep their
    /// input order; the input records are not modified.
    pub fn filter_publications(
        &self,
        target: &str,
        publications: &[PublicationRecord],
        threshold: u8,
    ) -> Result<Vec<DisambiguatedPublication>, ClientError> {
        let target = Target::parse(target)?;
        check_threshold(threshold)?;

        let mut kept: Vec<DisambiguatedPublication> = publications
            .iter()
            .filter_map(|publication| {
                let author_matches =
                    self.rank(&target, &publication.author_names(), threshold);
                let best_match_score = author_matches.first()?.score;
                Some(DisambiguatedPublication {
                    publication: publication.clone(),
                    author_matches,
                    best_match_score,
                })
            })
            .collect();

        kept.sort_by(|a, b| b.best_match_score.cmp(&a.best_match_score));

        tracing::debug!(
            target = %target.normalized,
            threshold,
            kept = kept.len(),
            total = publications.len(),
            "Disambiguated publications"
        );
        Ok(kept)
    }

    fn rank<S: AsRef<str>>(
        &self,
        target: &Target,
        candidates: &[S],
        threshold: u8,
    ) -> Vec<AuthorMatch> {
        let mut matches: Vec<AuthorMatch> = candidates
            .iter()
            .filter_map(|candidate| {
                let candidate = candidate.as_ref();
                let score = self.score_against(target, candidate);
                (score >= threshold).then(|| AuthorMatch {
                    candidate: candidate.to_string(),
                    score,
                })
            })
            .collect();

        matches.sort_by(|a, b| b.score.cmp(&a.score));
        matches
    }

    fn score_against(&self, target: &Target, candidate: &str) -> u8 {
        let normalized = normalize_name(candidate);
        let a = target.normalized.as_str();
        let b = normalized.as_str();

        let similarity = ratio(a, b)
            .max(partial_ratio(a, b))
            .max(token_sort_ratio(a, b))
            .max(token_set_ratio(a, b));

        let initials = extract_initials(candidate);
        let bonus = if !initials.is_empty() && initials == target.initials {
            self.initials_bonus
        } else {
            0
        };

        similarity.saturating_add(bonus).min(100)
    }
}
