use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
	Monster,
	Item,
	Skill,
	Event,
}

impl EntityKind {
	pub const ALL: [EntityKind; 4] = [Self::Monster, Self::Item, Self::Skill, Self::Event];

	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Monster => "monster",
			Self::Item => "item",
			Self::Skill => "skill",
			Self::Event => "event",
		}
	}

	/// Tie-break rank when two kinds score the same; higher wins.
	/// Event screens are checked first in game, so they rank highest.
	pub fn precedence(&self) -> u8 {
		match self {
			Self::Event => 3,
			Self::Monster => 2,
			Self::Item => 1,
			Self::Skill => 0,
		}
	}
}

impl fmt::Display for EntityKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl std::str::FromStr for EntityKind {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::ALL
			.into_iter()
			.find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
			.ok_or_else(|| format!("unknown entity kind `{s}` (expected monster, item, skill or event)"))
	}
}

/// One recognizable thing from the catalog. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct CatalogEntry {
	pub name: String,
	pub name_localized: String,
	pub description: String,
	pub icon_ref: String,
	pub aspect_ratio: f32,
	pub kind: EntityKind,
}

impl CatalogEntry {
	pub fn new(kind: EntityKind, name: impl Into<String>, name_localized: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			name_localized: name_localized.into(),
			description: String::new(),
			icon_ref: String::new(),
			aspect_ratio: 1.0,
			kind,
		}
	}

	pub fn with_description(mut self, description: impl Into<String>) -> Self {
		self.description = description.into();
		self
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
	Fuzzy,
	Partial,
	Exact,
}

impl fmt::Display for MatchTier {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::Exact => "exact",
			Self::Partial => "partial",
			Self::Fuzzy => "fuzzy",
		})
	}
}

/// Outcome of one lookup. `entry` is either `None` or a member of the
/// catalog generation named by `generation`.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct MatchResult {
	pub matched: bool,
	pub kind: Option<EntityKind>,
	pub entry: Option<CatalogEntry>,
	pub score: f32,
	pub match_tier: Option<MatchTier>,
	/// Normalized text the lookup ran on.
	pub text: String,
	pub generation: u64,
}

impl MatchResult {
	pub fn none(text: impl Into<String>, generation: u64) -> Self {
		Self {
			matched: false,
			kind: None,
			entry: None,
			score: 0.0,
			match_tier: None,
			text: text.into(),
			generation,
		}
	}

	pub(crate) fn found(entry: &CatalogEntry, tier: MatchTier, score: f32, text: String, generation: u64) -> Self {
		Self {
			matched: true,
			kind: Some(entry.kind),
			entry: Some(entry.clone()),
			score,
			match_tier: Some(tier),
			text,
			generation,
		}
	}

	/// Identity used to tell whether two results show the same thing.
	pub fn subject(&self) -> Option<(EntityKind, &str)> {
		self.entry.as_ref().map(|e| (e.kind, e.name.as_str()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn kind_parses_case_insensitively() {
		assert_eq!("Monster".parse::<EntityKind>(), Ok(EntityKind::Monster));
		assert_eq!(" event ".parse::<EntityKind>(), Ok(EntityKind::Event));
		assert!("relic".parse::<EntityKind>().is_err());
	}

	#[test]
	fn tiers_order_exact_highest() {
		assert!(MatchTier::Exact > MatchTier::Partial);
		assert!(MatchTier::Partial > MatchTier::Fuzzy);
	}

	#[test]
	fn empty_result_has_no_subject() {
		let res = MatchResult::none("", 1);
		assert!(!res.matched);
		assert_eq!(res.subject(), None);
	}
}
