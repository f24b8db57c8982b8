//! Compliance scoring types.
//!
//! A [`ComplianceResult`] is always built from a set of [`ComplianceIssues`]:
//! the score is 100 minus the penalty of every issue, floored at 0, and the
//! [`ComplianceLevel`] is a pure function of that score.
//!
//! # Levels
//!
//! - 90-100: Excellent
//! - 75-89: Good
//! - 60-74: Fair
//! - 40-59: Poor
//! - 0-39: Critical

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

bitflags! {
    /// Naming-convention problems found on an album folder.
    ///
    /// Multiple flags can be set simultaneously. Use `.is_empty()` to check
    /// if an album folder is fully compliant.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ComplianceIssues: u32 {
        /// Folder name has no `YYYY - ` prefix
        const MISSING_YEAR = 1 << 0;
        /// Edition known from metadata but absent from the folder name
        const MISSING_EDITION = 1 << 1;
        /// Album sits in a type folder that disagrees with its name
        const WRONG_TYPE_FOLDER = 1 << 2;
        /// Album does not follow the band's dominant naming pattern
        const PATTERN_DEVIATION = 1 << 3;
        /// Title contains characters that are unsafe in paths
        const SPECIAL_CHARACTERS = 1 << 4;
    }
}

/// Identifier, description and penalty for each single flag.
const ISSUE_TABLE: [(ComplianceIssues, &str, &str, u32); 5] = [
    (ComplianceIssues::MISSING_YEAR, "missing_year", "Missing year prefix", 45),
    (ComplianceIssues::WRONG_TYPE_FOLDER, "wrong_type_folder", "Placed in the wrong type folder", 25),
    (ComplianceIssues::MISSING_EDITION, "missing_edition", "Missing edition suffix", 15),
    (ComplianceIssues::PATTERN_DEVIATION, "pattern_deviation", "Deviates from the band's naming pattern", 10),
    (ComplianceIssues::SPECIAL_CHARACTERS, "special_characters", "Contains special characters", 5),
];

impl ComplianceIssues {
    /// Score deduction for the set flags, summed.
    pub fn penalty(&self) -> u32 {
        ISSUE_TABLE
            .iter()
            .filter(|(flag, ..)| self.contains(*flag))
            .map(|(.., penalty)| penalty)
            .sum()
    }

    /// Stable snake_case identifier for a single flag.
    pub fn as_str(&self) -> &'static str {
        ISSUE_TABLE
            .iter()
            .find(|(flag, ..)| flag == self)
            .map(|(_, name, ..)| *name)
            .unwrap_or("unknown")
    }

    /// Flag for a snake_case identifier written by [`Self::as_str`].
    fn from_id(id: &str) -> Option<Self> {
        ISSUE_TABLE
            .iter()
            .find(|(_, n, ..)| *n == id)
            .map(|(flag, ..)| *flag)
    }

    /// Get human-readable descriptions of all set flags.
    pub fn descriptions(&self) -> Vec<&'static str> {
        self.iter().map(|flag| flag.description()).collect()
    }

    /// Human-readable description for a single flag.
    pub fn description(&self) -> &'static str {
        ISSUE_TABLE
            .iter()
            .find(|(flag, ..)| flag == self)
            .map(|(_, _, desc, _)| *desc)
            .unwrap_or("Unknown issue")
    }
}

impl Serialize for ComplianceIssues {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter().map(|flag| flag.as_str()))
    }
}

impl<'de> Deserialize<'de> for ComplianceIssues {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let names = Vec::<String>::deserialize(deserializer)?;
        Ok(names
            .iter()
            .filter_map(|n| Self::from_id(n))
            .fold(Self::empty(), |acc, flag| acc | flag))
    }
}

/// Qualitative band for a compliance score.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceLevel {
    Excellent,
    Good,
    Fair,
    Poor,
    Critical,
}

impl ComplianceLevel {
    pub fn from_score(score: u8) -> Self {
        match score {
            90..=u8::MAX => ComplianceLevel::Excellent,
            75..=89 => ComplianceLevel::Good,
            60..=74 => ComplianceLevel::Fair,
            40..=59 => ComplianceLevel::Poor,
            _ => ComplianceLevel::Critical,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ComplianceLevel::Excellent => "excellent",
            ComplianceLevel::Good => "good",
            ComplianceLevel::Fair => "fair",
            ComplianceLevel::Poor => "poor",
            ComplianceLevel::Critical => "critical",
        }
    }

    /// Get a short symbol for terminal display.
    pub fn symbol(&self) -> &'static str {
        match self {
            ComplianceLevel::Excellent => "✓",
            ComplianceLevel::Good => "+",
            ComplianceLevel::Fair => "~",
            ComplianceLevel::Poor => "!",
            ComplianceLevel::Critical => "✗",
        }
    }
}

impl std::fmt::Display for ComplianceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-album conformance outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceResult {
    pub score: u8,
    pub level: ComplianceLevel,
    pub issues: ComplianceIssues,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended_path: Option<String>,
}

impl ComplianceResult {
    pub fn from_issues(issues: ComplianceIssues, recommended_path: Option<String>) -> Self {
        let score = 100u32.saturating_sub(issues.penalty()) as u8;
        Self {
            score,
            level: ComplianceLevel::from_score(score),
            issues,
            recommended_path,
        }
    }

    pub fn is_compliant(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Band-level aggregate of album compliance results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandComplianceReport {
    /// Mean of album scores, rounded.
    pub overall_score: u8,
    pub compliance_level: ComplianceLevel,
    pub albums_evaluated: usize,
    pub albums_needing_fixes: usize,
    /// Overall score is below the configured compliance threshold.
    pub needs_attention: bool,
    /// Most impactful first.
    pub recommendations: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_thresholds() {
        assert_eq!(ComplianceLevel::from_score(100), ComplianceLevel::Excellent);
        assert_eq!(ComplianceLevel::from_score(90), ComplianceLevel::Excellent);
        assert_eq!(ComplianceLevel::from_score(89), ComplianceLevel::Good);
        assert_eq!(ComplianceLevel::from_score(75), ComplianceLevel::Good);
        assert_eq!(ComplianceLevel::from_score(74), ComplianceLevel::Fair);
        assert_eq!(ComplianceLevel::from_score(60), ComplianceLevel::Fair);
        assert_eq!(ComplianceLevel::from_score(59), ComplianceLevel::Poor);
        assert_eq!(ComplianceLevel::from_score(40), ComplianceLevel::Poor);
        assert_eq!(ComplianceLevel::from_score(39), ComplianceLevel::Critical);
        assert_eq!(ComplianceLevel::from_score(0), ComplianceLevel::Critical);
    }

    #[test]
    fn test_penalty_ordering() {
        let year = ComplianceIssues::MISSING_YEAR.penalty();
        let folder = ComplianceIssues::WRONG_TYPE_FOLDER.penalty();
        let edition = ComplianceIssues::MISSING_EDITION.penalty();
        let deviation = ComplianceIssues::PATTERN_DEVIATION.penalty();
        assert!(year > folder && folder > edition && edition > deviation);
    }

    #[test]
    fn test_score_floors_at_zero() {
        let result = ComplianceResult::from_issues(ComplianceIssues::all(), None);
        assert_eq!(result.score, 0);
        assert_eq!(result.level, ComplianceLevel::Critical);
    }

    #[test]
    fn test_issues_serialize_as_names() {
        let issues = ComplianceIssues::MISSING_YEAR | ComplianceIssues::PATTERN_DEVIATION;
        let json = serde_json::to_string(&issues).unwrap();
        assert_eq!(json, r#"["missing_year","pattern_deviation"]"#);
        let back: ComplianceIssues = serde_json::from_str(&json).unwrap();
        assert_eq!(back, issues);
    }

    #[test]
    fn test_unknown_issue_names_are_ignored() {
        let issues: ComplianceIssues =
            serde_json::from_str(r#"["missing_year","retired_issue"]"#).unwrap();
        assert_eq!(issues, ComplianceIssues::MISSING_YEAR);
    }

    #[test]
    fn test_ids_differ_from_flag_names() {
        // Stored documents use snake_case ids, not the bitflags constant names
        assert_eq!(ComplianceIssues::from_id("missing_year"), Some(ComplianceIssues::MISSING_YEAR));
        assert_eq!(ComplianceIssues::from_id("MISSING_YEAR"), None);
        assert_eq!(ComplianceIssues::from_name("MISSING_YEAR"), Some(ComplianceIssues::MISSING_YEAR));
        for (flag, ..) in ISSUE_TABLE {
            assert_eq!(ComplianceIssues::from_id(flag.as_str()), Some(flag));
        }
    }

    #[test]
    fn test_descriptions() {
        let issues = ComplianceIssues::MISSING_YEAR | ComplianceIssues::SPECIAL_CHARACTERS;
        let descs = issues.descriptions();
        assert_eq!(descs.len(), 2);
        assert!(descs.contains(&"Missing year prefix"));
    }
}
