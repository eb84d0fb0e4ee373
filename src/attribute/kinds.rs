//! Concrete attribute value kinds.
//!
//! The set of kinds is closed: each kind knows which match category it feeds,
//! so no runtime type lookup is needed to score two entities.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::attribute::AttributeValue;
use crate::error::ValidationError;
use crate::matching::normalize::{fold, normalize_name};
use crate::matching::MatchCategory;

/// A display name as reported by one source.
///
/// Distinct spellings are kept as distinct values; matching compares the
/// normalized, case-insensitive, near-character-folded form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Name(String);

impl Name {
    /// Creates a name, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptyName` if nothing remains after trimming.
    pub fn new(value: impl AsRef<str>) -> Result<Self, ValidationError> {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The name as reported.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The form used for comparisons.
    #[must_use]
    pub fn normalized(&self) -> String {
        normalize_name(&self.0)
    }
}

impl AttributeValue for Name {
    fn matches(&self, other: &Self) -> bool {
        self.normalized() == other.normalized()
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kinds of platform identifiers and handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierKind {
    /// Persistent numeric id issued by the chat service.
    ChatId,
    /// Persistent user id issued by the bracket service.
    BracketPersistentId,
    /// Chat service username (user-editable).
    ChatUsername,
    /// Bracket service display username.
    BracketUsername,
    /// Bracket service profile slug.
    BracketSlug,
    /// Streaming platform handle.
    StreamHandle,
    /// Social network handle.
    SocialHandle,
    /// Persistent team id issued by the bracket service.
    BracketTeamId,
}

impl IdentifierKind {
    /// The match category this kind contributes to.
    #[must_use]
    pub const fn category(self) -> MatchCategory {
        match self {
            Self::ChatId => MatchCategory::ChatId,
            Self::BracketPersistentId => MatchCategory::BracketPersistentId,
            Self::ChatUsername => MatchCategory::ChatUsername,
            Self::BracketUsername => MatchCategory::BracketUsername,
            Self::BracketSlug => MatchCategory::BracketSlug,
            Self::StreamHandle => MatchCategory::StreamHandle,
            Self::SocialHandle => MatchCategory::SocialHandle,
            Self::BracketTeamId => MatchCategory::BracketTeamId,
        }
    }

    /// Returns true for platform-issued ids that never change.
    #[must_use]
    pub const fn is_persistent(self) -> bool {
        matches!(
            self,
            Self::ChatId | Self::BracketPersistentId | Self::BracketTeamId
        )
    }
}

/// A platform id or handle.
///
/// Persistent ids are stored verbatim (trimmed); handles are lowercased and
/// stripped of a leading `@` since platforms treat them case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identifier {
    /// What kind of identifier this is.
    pub kind: IdentifierKind,
    /// Canonicalized value.
    pub value: String,
}

impl Identifier {
    /// Creates a canonicalized identifier.
    #[must_use]
    pub fn new(kind: IdentifierKind, value: impl AsRef<str>) -> Self {
        let trimmed = value.as_ref().trim();
        let value = if kind.is_persistent() {
            trimmed.to_string()
        } else {
            trimmed.trim_start_matches('@').to_lowercase()
        };
        Self { kind, value }
    }

    /// Shorthand for a chat service id.
    #[must_use]
    pub fn chat_id(value: impl AsRef<str>) -> Self {
        Self::new(IdentifierKind::ChatId, value)
    }

    /// Shorthand for a bracket service persistent id.
    #[must_use]
    pub fn bracket_persistent_id(value: impl AsRef<str>) -> Self {
        Self::new(IdentifierKind::BracketPersistentId, value)
    }

    /// Shorthand for a bracket service team id.
    #[must_use]
    pub fn bracket_team_id(value: impl AsRef<str>) -> Self {
        Self::new(IdentifierKind::BracketTeamId, value)
    }
}

impl AttributeValue for Identifier {}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}:{}", self.kind, self.value)
    }
}

/// A 12-digit console friend code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FriendCode(String);

impl FriendCode {
    /// Parses a friend code, ignoring any separators or `SW-` prefix.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidFriendCode` unless exactly 12 digits
    /// are present.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let digits: String = value.chars().filter(char::is_ascii_digit).collect();
        if digits.len() != 12 {
            return Err(ValidationError::InvalidFriendCode {
                value: value.to_string(),
            });
        }
        Ok(Self(digits))
    }

    /// The bare 12 digits.
    #[must_use]
    pub fn digits(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for FriendCode {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<FriendCode> for String {
    fn from(value: FriendCode) -> Self {
        value.0
    }
}

impl AttributeValue for FriendCode {}

impl fmt::Display for FriendCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SW-{}-{}-{}", &self.0[0..4], &self.0[4..8], &self.0[8..12])
    }
}

/// A weapon a player reported using.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Weapon(pub String);

impl AttributeValue for Weapon {}

/// A pronoun declaration, e.g. `they/them`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pronoun(pub String);

impl AttributeValue for Pronoun {}

/// ISO 3166-1 alpha-2 country code, uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CountryCode(String);

impl CountryCode {
    /// Parses a two-letter country code.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidCountryCode` for anything other than
    /// two ASCII letters.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let trimmed = value.trim();
        if trimmed.len() != 2 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError::InvalidCountryCode {
                value: value.to_string(),
            });
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// The uppercase code.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CountryCode {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CountryCode> for String {
    fn from(value: CountryCode) -> Self {
        value.0
    }
}

impl AttributeValue for CountryCode {}

/// Skill rating as reported by a ranking source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Skill(pub u32);

impl AttributeValue for Skill {}

/// Where a clan tag sits relative to the player's name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagLayout {
    /// `TAGname`
    Prefix,
    /// `nameTAG`
    Suffix,
    /// First character before the name, the rest after it.
    Surrounding,
    /// Layout not known; treated as either prefix or suffix.
    #[default]
    Unknown,
}

/// A team's clan tag and its layout.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClanTag {
    /// The tag text as reported.
    pub tag: String,
    /// How the tag is applied to names.
    #[serde(default)]
    pub layout: TagLayout,
}

impl ClanTag {
    /// Creates a clan tag.
    #[must_use]
    pub fn new(tag: impl AsRef<str>, layout: TagLayout) -> Self {
        Self {
            tag: tag.as_ref().trim().to_string(),
            layout,
        }
    }

    fn folded_parts(&self) -> Option<(String, String)> {
        let folded = fold(&self.tag);
        if folded.is_empty() {
            return None;
        }
        match self.layout {
            TagLayout::Surrounding => {
                let mut chars = folded.chars();
                let first = chars.next()?.to_string();
                let rest: String = chars.collect();
                let rest = if rest.is_empty() { first.clone() } else { rest };
                Some((first, rest))
            }
            _ => Some((folded, String::new())),
        }
    }

    /// Removes this tag from a folded name, if the name carries it.
    #[must_use]
    pub fn strip(&self, folded_name: &str) -> Option<String> {
        let (head, tail) = self.folded_parts()?;
        let stripped = match self.layout {
            TagLayout::Prefix => folded_name.strip_prefix(head.as_str()),
            TagLayout::Suffix => folded_name.strip_suffix(head.as_str()),
            TagLayout::Surrounding => folded_name
                .strip_prefix(head.as_str())
                .and_then(|s| s.strip_suffix(tail.as_str())),
            TagLayout::Unknown => folded_name
                .strip_prefix(head.as_str())
                .or_else(|| folded_name.strip_suffix(head.as_str())),
        }?;
        let stripped = stripped.trim();
        (!stripped.is_empty()).then(|| stripped.to_string())
    }

    /// Applies this tag to a folded name.
    ///
    /// An unknown layout is applied as a prefix, the common case.
    #[must_use]
    pub fn apply(&self, folded_name: &str) -> Option<String> {
        let (head, tail) = self.folded_parts()?;
        Some(match self.layout {
            TagLayout::Suffix => format!("{folded_name}{head}"),
            TagLayout::Surrounding => format!("{head}{folded_name}{tail}"),
            TagLayout::Prefix | TagLayout::Unknown => format!("{head}{folded_name}"),
        })
    }
}

impl AttributeValue for ClanTag {
    fn matches(&self, other: &Self) -> bool {
        let a = fold(&self.tag);
        !a.is_empty() && a == fold(&other.tag)
    }
}

/// A team's division placement in one season.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Placement {
    /// Season or league identifier.
    pub season: String,
    /// Division within that season.
    pub division: String,
}

impl Placement {
    /// Creates a placement.
    #[must_use]
    pub fn new(season: impl Into<String>, division: impl Into<String>) -> Self {
        Self {
            season: season.into(),
            division: division.into(),
        }
    }
}

impl AttributeValue for Placement {}
