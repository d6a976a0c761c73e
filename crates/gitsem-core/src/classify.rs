//! Semantic classification of commit messages.
//!
//! Recognizes a conventional-commit style prefix at the start of a message:
//!
//! - `feat: add login`
//! - `fix(cli): resolve parsing error`
//! - `feat!: drop legacy API`
//!
//! and derives a [`ChangeTag`] and an [`Impact`] from it.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::GitsemError;

/// Token, optional `(scope)`, optional `!`, then `:` and whitespace.
static PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(feat|feature|fix|bugfix|refactor|experiment|exp)(\([^)]*\))?(!)?:\s*")
        .expect("Invalid regex")
});

const BREAKING_MARKER: &str = "BREAKING CHANGE";

/// Category of a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeTag {
    Feature,
    Fix,
    Refactor,
    Experiment,
    #[default]
    None,
}

impl ChangeTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Feature => "feature",
            Self::Fix => "fix",
            Self::Refactor => "refactor",
            Self::Experiment => "experiment",
            Self::None => "none",
        }
    }

    fn from_token(token: &str) -> Self {
        match token.to_lowercase().as_str() {
            "feat" | "feature" => Self::Feature,
            "fix" | "bugfix" => Self::Fix,
            "refactor" => Self::Refactor,
            "experiment" | "exp" => Self::Experiment,
            _ => Self::None,
        }
    }
}

impl fmt::Display for ChangeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeTag {
    type Err = GitsemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "feature" => Ok(Self::Feature),
            "fix" => Ok(Self::Fix),
            "refactor" => Ok(Self::Refactor),
            "experiment" => Ok(Self::Experiment),
            "none" => Ok(Self::None),
            other => Err(GitsemError::InvalidArgument(format!(
                "Unknown tag `{}` (expected feature, fix, refactor, experiment or none)",
                other
            ))),
        }
    }
}

/// Severity of a change, ordered `Patch < Minor < Major`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    #[default]
    Patch,
    Minor,
    Major,
}

impl Impact {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Patch => "patch",
            Self::Minor => "minor",
            Self::Major => "major",
        }
    }
}

impl fmt::Display for Impact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Impact {
    type Err = GitsemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "patch" => Ok(Self::Patch),
            "minor" => Ok(Self::Minor),
            "major" => Ok(Self::Major),
            other => Err(GitsemError::InvalidArgument(format!(
                "Unknown impact `{}` (expected patch, minor or major)",
                other
            ))),
        }
    }
}

/// Classify a commit message by its prefix. Unknown or missing prefixes give [`ChangeTag::None`].
pub fn detect_tag(message: &str) -> ChangeTag {
    PREFIX_RE
        .captures(message.trim())
        .and_then(|caps| caps.get(1))
        .map(|token| ChangeTag::from_token(token.as_str()))
        .unwrap_or_default()
}

/// Suggest an impact level for a commit message.
///
/// Major when the prefix carries `!` or the message contains `BREAKING CHANGE`,
/// else minor for features, else patch.
pub fn detect_impact(message: &str) -> Impact {
    let message = message.trim();
    let header = message.lines().next().unwrap_or_default();
    let caps = PREFIX_RE.captures(header);

    if caps.as_ref().is_some_and(|c| c.get(3).is_some()) || message.contains(BREAKING_MARKER) {
        return Impact::Major;
    }

    match caps.and_then(|c| c.get(1)).map(|m| ChangeTag::from_token(m.as_str())) {
        Some(ChangeTag::Feature) => Impact::Minor,
        _ => Impact::Patch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truth_table() {
        let cases = [
            ("feat: x", ChangeTag::Feature, Impact::Minor),
            ("fix: x", ChangeTag::Fix, Impact::Patch),
            ("feat!: x", ChangeTag::Feature, Impact::Major),
            ("fix: x\n\nBREAKING CHANGE: y", ChangeTag::Fix, Impact::Major),
            ("chore: x", ChangeTag::None, Impact::Patch),
            ("random", ChangeTag::None, Impact::Patch),
        ];

        for (msg, tag, impact) in cases {
            assert_eq!(detect_tag(msg), tag, "tag for {:?}", msg);
            assert_eq!(detect_impact(msg), impact, "impact for {:?}", msg);
        }
    }

    #[test]
    fn test_aliases_scope_and_case() {
        assert_eq!(detect_tag("Feature(ui): button"), ChangeTag::Feature);
        assert_eq!(detect_tag("BUGFIX: crash"), ChangeTag::Fix);
        assert_eq!(detect_tag("exp: try thing"), ChangeTag::Experiment);
        assert_eq!(detect_tag("refactor(core)!: split"), ChangeTag::Refactor);
        assert_eq!(detect_impact("refactor(core)!: split"), Impact::Major);
        assert_eq!(detect_impact("FEAT(api): add"), Impact::Minor);
    }

    #[test]
    fn test_prefix_must_be_at_start() {
        assert_eq!(detect_tag("  feat: leading space is trimmed"), ChangeTag::Feature);
        assert_eq!(detect_tag("wip feat: not a prefix"), ChangeTag::None);
        assert_eq!(detect_tag("feat missing colon"), ChangeTag::None);
        assert_eq!(detect_tag("features: not a token"), ChangeTag::None);
    }

    #[test]
    fn test_breaking_marker_is_case_sensitive() {
        assert_eq!(detect_impact("fix: x\n\nbreaking change: y"), Impact::Patch);
    }

    #[test]
    fn test_impact_ordering_and_parse() {
        assert!(Impact::Patch < Impact::Minor && Impact::Minor < Impact::Major);
        assert_eq!("MAJOR".parse::<Impact>().unwrap(), Impact::Major);
        assert!("huge".parse::<Impact>().is_err());
        assert_eq!("fix".parse::<ChangeTag>().unwrap(), ChangeTag::Fix);
        assert!("chore".parse::<ChangeTag>().is_err());
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Impact::Minor).unwrap(), "\"minor\"");
        assert_eq!(serde_json::to_string(&ChangeTag::None).unwrap(), "\"none\"");
    }
}
