//! Revision histories: parsing, latest-revision selection and comparison
//!
//! Production revisions are letters (`-`, `A`, `B`, ..., `AA`, `AB`, ...).
//! Experimental revisions end in two digits (`01`, `A01`). Not every letter
//! is allowed as a revision; the allowed alphabet is carried by
//! [`RevisionScheme`] so tests and other sites can use their own.

use miette::Diagnostic;
use serde::Serialize;
use thiserror::Error;

/// Letters allowed in production revisions, in order
pub const DEFAULT_REVISION_LETTERS: &str = "ABCDEFGHJKLMNPRTUVWY";

/// The base revision that precedes `A`
pub const BASE_REVISION: &str = "-";

/// True if the revision is experimental (last two characters are digits)
pub fn is_experimental(rev: &str) -> bool {
    let bytes = rev.as_bytes();
    bytes.len() >= 2 && bytes[bytes.len() - 2..].iter().all(u8::is_ascii_digit)
}

/// True if the revision is a production revision
pub fn is_production(rev: &str) -> bool {
    !is_experimental(rev)
}

/// Split a composite object string into the revisions it lists
///
/// The string repeats `<part_number>-<rev>-<name>` once per revision, e.g.
/// `614575-01-BRACKET, 614575-A-BRACKET`. A segment that starts with `--`
/// is the base revision.
pub fn parse_revision_list(part_number: &str, composite: &str) -> Vec<String> {
    let delimiter = format!("{}-", part_number);
    composite
        .split(delimiter.as_str())
        .skip(1)
        .map(|segment| {
            if segment.starts_with("--") {
                BASE_REVISION.to_string()
            } else {
                // Parts without a name leave a ", " behind each revision
                let rev = segment.split('-').next().unwrap_or_default();
                rev.split(", ").next().unwrap_or_default().trim().to_string()
            }
        })
        .collect()
}

/// Most recent revision in a chronologically ordered list
///
/// Scans from the end for the first production revision. When the list holds
/// only experimental revisions the last one wins. Returns `None` for an
/// empty list.
pub fn latest_revision<S: AsRef<str>>(revisions: &[S]) -> Option<&str> {
    revisions
        .iter()
        .rev()
        .map(AsRef::as_ref)
        .find(|rev| is_production(rev))
        .or_else(|| revisions.last().map(AsRef::as_ref))
}

/// Distance between two revisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevisionDistance {
    /// Number of production revisions from the older to the newer one
    Steps(i32),
    /// At least one side is experimental
    Incomparable,
}

/// Allowed revision alphabet and the ordering it implies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionScheme {
    letters: Vec<char>,
}

impl Default for RevisionScheme {
    fn default() -> Self {
        Self {
            letters: DEFAULT_REVISION_LETTERS.chars().collect(),
        }
    }
}

impl RevisionScheme {
    /// Build a scheme from an ordered string of allowed letters
    pub fn new(letters: &str) -> Result<Self, RevisionError> {
        let letters: Vec<char> = letters.trim().to_uppercase().chars().collect();
        let mut seen = std::collections::BTreeSet::new();
        let valid = !letters.is_empty()
            && letters
                .iter()
                .all(|c| c.is_ascii_uppercase() && seen.insert(*c));
        if !valid {
            return Err(RevisionError::InvalidAlphabet(letters.into_iter().collect()));
        }
        Ok(Self { letters })
    }

    pub fn letters(&self) -> &[char] {
        &self.letters
    }

    /// Letters that are not allowed in new revisions (legacy data may use them)
    pub fn is_disallowed(&self, letter: char) -> bool {
        letter.is_ascii_uppercase() && !self.letters.contains(&letter)
    }

    fn contains_disallowed(&self, rev: &str) -> bool {
        rev.chars().any(|c| self.is_disallowed(c))
    }

    fn position(&self, rev: &str, letter: char) -> Result<usize, RevisionError> {
        self.letters
            .iter()
            .position(|c| *c == letter)
            .ok_or_else(|| RevisionError::UnknownLetter {
                rev: rev.to_string(),
                letter,
            })
    }

    /// Position of a production revision in the sequence `-`, `A`, ..., `AA`, ...
    ///
    /// Two-letter revisions work like a two-digit counter whose
    /// most-significant digit starts at "blank".
    pub fn rank(&self, rev: &str) -> Result<i32, RevisionError> {
        if rev == BASE_REVISION {
            return Ok(-1);
        }

        let chars: Vec<char> = rev.to_uppercase().chars().collect();
        let radix = self.letters.len();
        let rank = match chars.as_slice() {
            [ls] => self.position(rev, *ls)?,
            [ms, ls] => (self.position(rev, *ms)? + 1) * radix + self.position(rev, *ls)?,
            _ => return Err(RevisionError::NonStandard(rev.to_string())),
        };
        Ok(rank as i32)
    }

    /// Map a legacy revision using disallowed letters onto its nearest
    /// allowed neighbour, moving forward (newer) or backward (older)
    ///
    /// Moving forward past the last allowed letter rolls over into the next
    /// two-letter revision. This mirrors legacy data clean-up and is
    /// approximate around the end of the alphabet.
    pub fn substitute_disallowed(&self, rev: &str, forward: bool) -> Result<String, RevisionError> {
        let chars: Vec<char> = rev.to_uppercase().chars().collect();
        let first = self.letters[0];
        let unsubstitutable = || RevisionError::Unsubstitutable(rev.to_string());

        match chars.as_slice() {
            [letter] if !letter.is_ascii_uppercase() => Err(RevisionError::NonStandard(rev.to_string())),
            [letter] => match self.nearest_allowed(*letter, forward) {
                Some(letter) => Ok(letter.to_string()),
                None if forward => Ok(format!("{first}{first}")),
                None => Err(unsubstitutable()),
            },
            [ms, ls] => {
                let (mut ms, mut ls) = (*ms, *ls);
                let mut ms_shifted = false;
                if self.is_disallowed(ms) {
                    ms = self.nearest_allowed(ms, forward).ok_or_else(unsubstitutable)?;
                    ms_shifted = true;
                }

                if self.is_disallowed(ls) {
                    match self.nearest_allowed(ls, forward) {
                        Some(letter) => ls = letter,
                        None if forward => {
                            ls = first;
                            // Roll over into the next most-significant letter
                            if !ms_shifted {
                                let next = self.position(rev, ms)? + 1;
                                ms = self.letters.get(next).copied().ok_or_else(unsubstitutable)?;
                            }
                        }
                        None => return Err(unsubstitutable()),
                    }
                }

                Ok(format!("{ms}{ls}"))
            }
            _ => Err(RevisionError::NonStandard(rev.to_string())),
        }
    }

    /// Closest allowed letter after (or before) `letter`
    fn nearest_allowed(&self, letter: char, forward: bool) -> Option<char> {
        if !letter.is_ascii_uppercase() {
            return None;
        }
        let code = letter as u8;
        let allowed = |c: &char| self.letters.contains(c);
        if forward {
            (code + 1..=b'Z').map(char::from).find(allowed)
        } else {
            (b'A'..code).rev().map(char::from).find(allowed)
        }
    }

    /// Number of production revisions between `older` and `newer`
    pub fn distance(&self, older: &str, newer: &str) -> Result<RevisionDistance, RevisionError> {
        if is_experimental(older) || is_experimental(newer) {
            return Ok(RevisionDistance::Incomparable);
        }
        if older == newer {
            return Ok(RevisionDistance::Steps(0));
        }
        if older.chars().count() > 2 || newer.chars().count() > 2 {
            return Err(RevisionError::NonStandard(format!("{older} -> {newer}")));
        }

        let older_chars: Vec<char> = older.chars().collect();
        let newer_chars: Vec<char> = newer.chars().collect();
        if older_chars.len() == 2 && newer_chars.len() == 2 && older_chars[0] == newer_chars[0] {
            return self.distance(&older_chars[1].to_string(), &newer_chars[1].to_string());
        }

        let older = if self.contains_disallowed(older) {
            self.substitute_disallowed(older, false)?
        } else {
            older.to_string()
        };
        let newer = if self.contains_disallowed(newer) {
            self.substitute_disallowed(newer, true)?
        } else {
            newer.to_string()
        };

        Ok(RevisionDistance::Steps(self.rank(&newer)? - self.rank(&older)?))
    }

    /// True when more than one production revision separates `rev` from `latest`
    pub fn is_more_than_one_behind(&self, rev: &str, latest: &str) -> Result<bool, RevisionError> {
        Ok(matches!(self.distance(rev, latest)?, RevisionDistance::Steps(n) if n > 1))
    }
}

/// Release status attached to a revision in the PLM system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseStatus {
    Unstatused,
    /// Concept / baseline / alpha / beta / gamma
    Experimental,
    /// Experimental status that has been approved
    GreenFlag,
    /// Engineering released
    YellowFlag,
    Superseded,
    /// Fully released
    CheckeredFlag,
    /// Redline release
    RedCheckeredFlag,
    Obsolete,
}

impl ReleaseStatus {
    /// Classify a release-status string such as `"Beta,Approved"`
    pub fn parse(status: &str) -> Result<Self, RevisionError> {
        const EXPERIMENTAL: [&str; 5] = ["concept", "baseline", "alpha", "beta", "gamma"];
        const APPROVABLE: [&str; 4] = ["concept", "alpha", "beta", "gamma"];

        let lower = status.trim().to_lowercase();
        if lower.is_empty() {
            return Ok(ReleaseStatus::Unstatused);
        }

        if let Some((stage, "approved")) = lower.split_once(',') {
            if APPROVABLE.contains(&stage) {
                return Ok(ReleaseStatus::GreenFlag);
            }
        }
        if EXPERIMENTAL.iter().any(|s| lower.starts_with(s)) {
            return Ok(ReleaseStatus::Experimental);
        }
        if lower == "engineering released" {
            return Ok(ReleaseStatus::YellowFlag);
        }
        if lower.ends_with("superseded") {
            return Ok(ReleaseStatus::Superseded);
        }
        if lower.ends_with("redline release") {
            return Ok(ReleaseStatus::RedCheckeredFlag);
        }
        if lower.ends_with("released") && !lower.ends_with("engineering released") {
            return Ok(ReleaseStatus::CheckeredFlag);
        }
        if lower == "obsolete" {
            return Ok(ReleaseStatus::Obsolete);
        }

        Err(RevisionError::UnknownStatus(status.to_string()))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseStatus::Unstatused => "unstatused",
            ReleaseStatus::Experimental => "exp_statused",
            ReleaseStatus::GreenFlag => "green_flag",
            ReleaseStatus::YellowFlag => "yellow_flag",
            ReleaseStatus::Superseded => "superseded_yellow",
            ReleaseStatus::CheckeredFlag => "checkered_flag",
            ReleaseStatus::RedCheckeredFlag => "red_checkered_flag",
            ReleaseStatus::Obsolete => "obsolete",
        }
    }
}

impl std::fmt::Display for ReleaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while interpreting revisions
#[derive(Debug, Error, Diagnostic, PartialEq, Eq)]
pub enum RevisionError {
    #[error("nonstandard revision: {0}")]
    #[diagnostic(code(whereused::revision::nonstandard))]
    NonStandard(String),

    #[error("revision '{rev}' uses letter '{letter}' outside the revision alphabet")]
    #[diagnostic(code(whereused::revision::unknown_letter))]
    UnknownLetter { rev: String, letter: char },

    #[error("cannot map legacy revision '{0}' onto the revision alphabet")]
    #[diagnostic(code(whereused::revision::unsubstitutable))]
    Unsubstitutable(String),

    #[error("invalid revision alphabet '{0}'")]
    #[diagnostic(
        code(whereused::revision::alphabet),
        help("`revision_letters` must be distinct uppercase letters, e.g. ABCDEFGHJKLMNPRTUVWY")
    )]
    InvalidAlphabet(String),

    #[error("unrecognized release status: '{0}'")]
    #[diagnostic(code(whereused::revision::status))]
    UnknownStatus(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn revs(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_experimental_classification() {
        assert!(is_experimental("01"));
        assert!(is_experimental("A01"));
        assert!(is_experimental("GEOREP02"));
        assert!(is_production("-"));
        assert!(is_production("A"));
        assert!(is_production("AB"));
        assert!(is_experimental("B.001"));
    }

    #[test]
    fn test_latest_revision_scenarios() {
        assert_eq!(latest_revision(&revs(&["-", "01", "02", "A"])), Some("A"));
        assert_eq!(latest_revision(&revs(&["-", "01", "02", "A", "03"])), Some("A"));
        assert_eq!(latest_revision(&revs(&["-", "01", "02", "03"])), Some("-"));
        assert_eq!(latest_revision(&revs(&["-", "01", "02", "03", "A01"])), Some("-"));
        assert_eq!(latest_revision(&revs(&["-", "01", "02", "A", "A01"])), Some("A"));
    }

    #[test]
    fn test_latest_revision_only_experimental() {
        assert_eq!(latest_revision(&revs(&["01", "02", "03"])), Some("03"));
        assert_eq!(latest_revision::<String>(&[]), None);
    }

    #[test]
    fn test_parse_revision_list() {
        let list = parse_revision_list(
            "652149G01",
            "652149G01---MAT,FLOOR,LWB, 652149G01-02-MAT,FLOOR,LWB, 652149G01-A-MAT,FLOOR,LWB",
        );
        assert_eq!(list, vec!["-", "02", "A"]);
    }

    #[test]
    fn test_parse_revision_list_without_names() {
        let list = parse_revision_list("614575", "614575-01, 614575-02, 614575-A");
        assert_eq!(list, vec!["01", "02", "A"]);
    }

    #[test]
    fn test_rank_ordering() {
        let scheme = RevisionScheme::default();
        assert_eq!(scheme.rank("-").unwrap(), -1);
        assert_eq!(scheme.rank("A").unwrap(), 0);
        assert_eq!(scheme.rank("J").unwrap(), 8);
        assert_eq!(scheme.rank("Y").unwrap(), 19);
        assert_eq!(scheme.rank("AA").unwrap(), 20);
        assert_eq!(scheme.rank("AB").unwrap(), 21);
        assert_eq!(scheme.rank("BA").unwrap(), 40);
        assert!(matches!(scheme.rank("I"), Err(RevisionError::UnknownLetter { letter: 'I', .. })));
        assert!(matches!(scheme.rank("ABC"), Err(RevisionError::NonStandard(_))));
    }

    #[test]
    fn test_distance() {
        let scheme = RevisionScheme::default();
        assert_eq!(scheme.distance("A", "C").unwrap(), RevisionDistance::Steps(2));
        assert_eq!(scheme.distance("-", "A").unwrap(), RevisionDistance::Steps(1));
        assert_eq!(scheme.distance("Y", "AA").unwrap(), RevisionDistance::Steps(1));
        assert_eq!(scheme.distance("AB", "AD").unwrap(), RevisionDistance::Steps(2));
        assert_eq!(scheme.distance("B", "B").unwrap(), RevisionDistance::Steps(0));
        assert_eq!(scheme.distance("A", "03").unwrap(), RevisionDistance::Incomparable);
        assert_eq!(scheme.distance("A01", "B").unwrap(), RevisionDistance::Incomparable);
    }

    #[test]
    fn test_distance_with_legacy_letters() {
        let scheme = RevisionScheme::default();
        // Older I demotes to H, newer I promotes to J
        assert_eq!(scheme.distance("I", "K").unwrap(), RevisionDistance::Steps(2));
        assert_eq!(scheme.distance("H", "I").unwrap(), RevisionDistance::Steps(1));
        // Z promotes to AA going forward
        assert_eq!(scheme.distance("Y", "Z").unwrap(), RevisionDistance::Steps(1));
    }

    #[test]
    fn test_substitute_disallowed() {
        let scheme = RevisionScheme::default();
        assert_eq!(scheme.substitute_disallowed("O", true).unwrap(), "P");
        assert_eq!(scheme.substitute_disallowed("O", false).unwrap(), "N");
        assert_eq!(scheme.substitute_disallowed("Z", true).unwrap(), "AA");
        assert_eq!(scheme.substitute_disallowed("Z", false).unwrap(), "Y");
        assert_eq!(scheme.substitute_disallowed("AS", true).unwrap(), "AT");
        assert_eq!(scheme.substitute_disallowed("SA", false).unwrap(), "RA");
        assert_eq!(scheme.substitute_disallowed("AZ", true).unwrap(), "BA");
        assert_eq!(scheme.substitute_disallowed("XZ", true).unwrap(), "YA");
        assert!(scheme.substitute_disallowed("ZA", true).is_err());
    }

    #[test]
    fn test_substitute_skips_to_allowed_letter() {
        let scheme = RevisionScheme::new("ACE").unwrap();
        assert_eq!(scheme.substitute_disallowed("B", true).unwrap(), "C");
        assert_eq!(scheme.substitute_disallowed("D", false).unwrap(), "C");
        assert_eq!(scheme.substitute_disallowed("AD", true).unwrap(), "AE");
        assert_eq!(scheme.substitute_disallowed("AF", true).unwrap(), "CA");
        assert!(scheme.substitute_disallowed("@", false).is_err());
    }

    #[test]
    fn test_more_than_one_behind() {
        let scheme = RevisionScheme::default();
        assert!(scheme.is_more_than_one_behind("A", "C").unwrap());
        assert!(!scheme.is_more_than_one_behind("B", "C").unwrap());
        assert!(!scheme.is_more_than_one_behind("01", "C").unwrap());
    }

    #[test]
    fn test_custom_alphabet() {
        let scheme = RevisionScheme::new("abc").unwrap();
        assert_eq!(scheme.rank("C").unwrap(), 2);
        assert_eq!(scheme.rank("AA").unwrap(), 3);
        assert!(scheme.is_disallowed('D'));
        assert_eq!(scheme.substitute_disallowed("D", true).unwrap(), "AA");
        assert_eq!(scheme.substitute_disallowed("D", false).unwrap(), "C");
        assert_eq!(scheme.distance("B", "D").unwrap(), RevisionDistance::Steps(2));
        assert!(RevisionScheme::new("AAB").is_err());
        assert!(RevisionScheme::new("").is_err());
    }

    #[test]
    fn test_release_status_parse() {
        assert_eq!(ReleaseStatus::parse("").unwrap(), ReleaseStatus::Unstatused);
        assert_eq!(ReleaseStatus::parse("Gamma,Concept").unwrap(), ReleaseStatus::Experimental);
        assert_eq!(ReleaseStatus::parse("Beta,Approved").unwrap(), ReleaseStatus::GreenFlag);
        assert_eq!(ReleaseStatus::parse("Engineering Released").unwrap(), ReleaseStatus::YellowFlag);
        assert_eq!(
            ReleaseStatus::parse("Engineering Released -Superseded").unwrap(),
            ReleaseStatus::Superseded
        );
        assert_eq!(
            ReleaseStatus::parse("Engineering Released,Released").unwrap(),
            ReleaseStatus::CheckeredFlag
        );
        assert_eq!(
            ReleaseStatus::parse("Engineering Released,Redline Release").unwrap(),
            ReleaseStatus::RedCheckeredFlag
        );
        assert_eq!(ReleaseStatus::parse("Obsolete").unwrap(), ReleaseStatus::Obsolete);
        assert!(ReleaseStatus::parse("Pending").is_err());
    }
}
