//! Resolves cleaned OCR text to a catalog entry.
//!
//! Chinese text goes through a tiered check per candidate: containment of the
//! whole name (exact), containment of the text in a name (partial), a
//! character-overlap gate, then edit-distance similarity with thresholds that
//! depend on the candidate's length. Text without enough ideographs is
//! compared against the English names instead.

use std::{
	cmp::Ordering,
	collections::{HashMap, HashSet, VecDeque},
	sync::{Mutex, PoisonError},
};

use crate::{CatalogEntry, CatalogIndex, EntityKind, MatchResult, MatchTier, SharedCatalog, catalog::NameKey, normalize};

/// A value per candidate-name length bucket: up to 2 chars, 3, 4, and 5 or more.
#[derive(Debug, Clone, Copy, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ByLength<T> {
	pub short: T,
	pub three: T,
	pub four: T,
	pub long: T,
}

impl<T: Copy> ByLength<T> {
	pub fn pick(&self, len: usize) -> T {
		match len {
			0..=2 => self.short,
			3 => self.three,
			4 => self.four,
			_ => self.long,
		}
	}
}

/// Tunable matching thresholds.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct MatchPolicy {
	/// Names (and inputs) shorter than this many ideographs are never fuzzy-matched.
	pub min_name_chars: usize,
	/// Text contained in a longer name must cover more than this share of it.
	pub partial_coverage: f32,
	/// Shared distinct chars over the candidate's distinct chars.
	pub overlap_ratio: ByLength<f32>,
	/// Minimum shared distinct chars for names of up to 4 chars.
	pub overlap_min_shared: ByLength<usize>,
	/// For longer names the minimum is `max(overlap_min_shared.long, floor(len * fraction))`.
	pub overlap_long_fraction: f32,
	pub immediate_threshold: ByLength<f32>,
	pub candidate_threshold: ByLength<f32>,
	pub final_threshold: ByLength<f32>,
	pub english_threshold: f32,
	/// UI labels after which the recognized text is no longer part of a name.
	pub stop_markers: Vec<String>,
	pub cache_capacity: usize,
}

impl Default for MatchPolicy {
	fn default() -> Self {
		Self {
			min_name_chars: 2,
			partial_coverage: 0.5,
			overlap_ratio: ByLength {
				short: 0.5,
				three: 0.6,
				four: 0.6,
				long: 0.4,
			},
			overlap_min_shared: ByLength {
				short: 1,
				three: 2,
				four: 2,
				long: 2,
			},
			overlap_long_fraction: 0.4,
			immediate_threshold: ByLength {
				short: 0.35,
				three: 0.50,
				four: 0.40,
				long: 0.40,
			},
			candidate_threshold: ByLength {
				short: 0.20,
				three: 0.35,
				four: 0.30,
				long: 0.30,
			},
			final_threshold: ByLength {
				short: 0.40,
				three: 0.40,
				four: 0.35,
				long: 0.30,
			},
			english_threshold: 0.6,
			stop_markers: vec!["奖励".to_owned(), "reward".to_owned()],
			cache_capacity: 100,
		}
	}
}

impl MatchPolicy {
	/// Character-overlap gate for a candidate of `len` chars with `distinct`
	/// distinct chars, `shared` of which also occur in the input.
	pub fn passes_gate(&self, len: usize, distinct: usize, shared: usize) -> bool {
		if distinct == 0 {
			return false;
		}
		let ratio = shared as f32 / distinct as f32;
		let min_shared = if len >= 5 {
			self.overlap_min_shared
				.long
				.max((len as f32 * self.overlap_long_fraction).floor() as usize)
		} else {
			self.overlap_min_shared.pick(len)
		};
		ratio >= self.overlap_ratio.pick(len) && shared >= min_shared
	}
}

/// Normalized edit similarity in `[0, 1]`, counted in chars.
pub fn similarity(a: &str, b: &str) -> f32 {
	let longest = a.chars().count().max(b.chars().count());
	if longest == 0 {
		return 1.0;
	}
	1.0 - levenshtein::levenshtein(a, b) as f32 / longest as f32
}

struct Scored<'a> {
	entry: &'a CatalogEntry,
	tier: MatchTier,
	score: f32,
	name_len: usize,
}

impl Scored<'_> {
	fn rank(&self, other: &Self) -> Ordering {
		self.score
			.total_cmp(&other.score)
			.then(self.tier.cmp(&other.tier))
			.then(self.name_len.cmp(&other.name_len))
			.then(self.entry.kind.precedence().cmp(&other.entry.kind.precedence()))
			.then_with(|| other.entry.name.cmp(&self.entry.name))
	}
}

fn keep_best<'a>(best: &mut Option<Scored<'a>>, scored: Scored<'a>) {
	if best.as_ref().is_none_or(|b| scored.rank(b) == Ordering::Greater) {
		*best = Some(scored);
	}
}

type CacheKey = (u64, Option<EntityKind>, String);

struct MatchCache {
	capacity: usize,
	order: VecDeque<CacheKey>,
	results: HashMap<CacheKey, MatchResult>,
}

impl MatchCache {
	fn new(capacity: usize) -> Self {
		Self {
			capacity,
			order: VecDeque::with_capacity(capacity),
			results: HashMap::with_capacity(capacity),
		}
	}

	fn get(&self, key: &CacheKey) -> Option<MatchResult> {
		self.results.get(key).cloned()
	}

	fn insert(&mut self, key: CacheKey, result: MatchResult) {
		if self.capacity == 0 || self.results.contains_key(&key) {
			return;
		}
		while self.order.len() >= self.capacity {
			if let Some(old) = self.order.pop_front() {
				self.results.remove(&old);
			}
		}
		self.order.push_back(key.clone());
		self.results.insert(key, result);
	}
}

pub struct FuzzyMatcher {
	catalog: SharedCatalog,
	policy: MatchPolicy,
	cache: Mutex<MatchCache>,
}

impl FuzzyMatcher {
	pub fn new(catalog: SharedCatalog, policy: MatchPolicy) -> Self {
		let cache = Mutex::new(MatchCache::new(policy.cache_capacity));
		Self { catalog, policy, cache }
	}

	pub fn catalog(&self) -> &SharedCatalog {
		&self.catalog
	}

	pub fn policy(&self) -> &MatchPolicy {
		&self.policy
	}

	/// Matches against the current catalog snapshot. The snapshot is taken
	/// once, so a concurrent reload never mixes two generations.
	pub fn find_best_match(&self, raw_text: &str, kind: Option<EntityKind>) -> MatchResult {
		let snapshot = self.catalog.snapshot();
		self.match_in(&snapshot, raw_text, kind)
	}

	pub fn match_in(&self, index: &CatalogIndex, raw_text: &str, kind: Option<EntityKind>) -> MatchResult {
		let generation = index.generation();
		let lines = normalize::name_lines(raw_text, &self.policy.stop_markers);
		if lines.is_empty() {
			return MatchResult::none("", generation);
		}
		let text = lines.join("\n");

		let key = (generation, kind, text.clone());
		if let Some(hit) = self.cache.lock().unwrap_or_else(PoisonError::into_inner).get(&key) {
			return hit;
		}

		// Lines are matched separately so containment never spans a line break.
		let chinese = lines
			.iter()
			.map(|line| normalize::chinese_only(line))
			.filter(|zh| zh.chars().count() >= self.policy.min_name_chars)
			.collect::<Vec<_>>();
		let mut best = None;
		if chinese.is_empty() {
			for line in &lines {
				if let Some(scored) = self.best_latin(index, &normalize::latin_only(line), kind) {
					keep_best(&mut best, scored);
				}
			}
		} else {
			for zh in &chinese {
				if let Some(scored) = self.best_chinese(index, zh, kind) {
					keep_best(&mut best, scored);
				}
			}
		}

		let result = match best {
			Some(best) => {
				tracing::debug!(
					text = %text,
					name = %best.entry.name,
					kind = %best.entry.kind,
					tier = %best.tier,
					score = best.score,
					"matched"
				);
				MatchResult::found(best.entry, best.tier, best.score, text, generation)
			}
			None => {
				tracing::debug!(text = %text, "no catalog entry matched");
				MatchResult::none(text, generation)
			}
		};

		self.cache
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.insert(key, result.clone());
		result
	}

	fn best_chinese<'a>(&self, index: &'a CatalogIndex, input: &str, kind: Option<EntityKind>) -> Option<Scored<'a>> {
		let input_len = input.chars().count();
		let input_set = input.chars().collect::<HashSet<_>>();

		let mut best = None;
		for (entry, key) in index.keyed(kind) {
			let name_len = key.chars.len();
			if name_len < self.policy.min_name_chars {
				continue;
			}
			if let Some((tier, score)) = self.score_chinese(input, input_len, &input_set, key) {
				keep_best(&mut best, Scored {
					entry,
					tier,
					score,
					name_len,
				});
			}
		}
		best
	}

	fn score_chinese(&self, input: &str, input_len: usize, input_set: &HashSet<char>, key: &NameKey) -> Option<(MatchTier, f32)> {
		let policy = &self.policy;
		let len = key.chars.len();

		if input.contains(&key.text) {
			return Some((MatchTier::Exact, 1.0));
		}
		if key.text.contains(input) {
			let coverage = input_len as f32 / len as f32;
			if coverage > policy.partial_coverage {
				return Some((MatchTier::Partial, coverage));
			}
		}

		let shared = key.distinct.intersection(input_set).count();
		if !policy.passes_gate(len, key.distinct.len(), shared) {
			return None;
		}

		let score = similarity(input, &key.text);
		if score >= policy.immediate_threshold.pick(len) {
			return Some((MatchTier::Fuzzy, score));
		}
		// Weak candidates still have to clear the final bar.
		if score >= policy.candidate_threshold.pick(len) && score >= policy.final_threshold.pick(len) {
			return Some((MatchTier::Fuzzy, score));
		}
		None
	}

	fn best_latin<'a>(&self, index: &'a CatalogIndex, input: &str, kind: Option<EntityKind>) -> Option<Scored<'a>> {
		if input.len() < 3 {
			return None;
		}
		let input_words = input.split(' ').collect::<HashSet<_>>();

		let mut best = None;
		for (entry, key) in index.keyed(kind) {
			let name = key.latin.as_str();
			if name.len() < 3 {
				continue;
			}

			let scored = if name == input {
				Some((MatchTier::Exact, 1.0))
			} else if input.contains(name) || name.contains(input) {
				let (short, long) = (input.len().min(name.len()), input.len().max(name.len()));
				Some((MatchTier::Partial, short as f32 / long as f32))
			} else {
				let name_words = name.split(' ').collect::<HashSet<_>>();
				let overlap = name_words.intersection(&input_words).count() as f32 / name_words.len() as f32;
				let score = similarity(input, name).max(overlap);
				(score >= self.policy.english_threshold).then_some((MatchTier::Fuzzy, score))
			};

			if let Some((tier, score)) = scored {
				keep_best(&mut best, Scored {
					entry,
					tier,
					score,
					name_len: name.len(),
				});
			}
		}
		best
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn catalog() -> CatalogIndex {
		CatalogIndex::from_entries([
			CatalogEntry::new(EntityKind::Monster, "Fire Dancer", "舞火大师"),
			CatalogEntry::new(EntityKind::Monster, "Fire Spirit", "火灵"),
			CatalogEntry::new(EntityKind::Item, "Fire Spirit Core", "火灵"),
			CatalogEntry::new(EntityKind::Item, "Cuckoo Clock", "咕咕钟表"),
			CatalogEntry::new(EntityKind::Event, "A Strange Mushroom", "奇怪的蘑菇"),
			CatalogEntry::new(EntityKind::Skill, "Burn", "灼烧"),
			CatalogEntry::new(EntityKind::Monster, "Banannibal", "Banannibal"),
		])
	}

	fn matcher() -> FuzzyMatcher {
		FuzzyMatcher::new(SharedCatalog::new(catalog()), MatchPolicy::default())
	}

	fn name(result: &MatchResult) -> Option<&str> {
		result.entry.as_ref().map(|e| e.name.as_str())
	}

	#[test]
	fn noisy_line_resolves_to_contained_name() {
		let res = matcher().find_best_match("2 和和 于 舞火大师", None);
		assert!(res.matched);
		assert_eq!(name(&res), Some("Fire Dancer"));
		assert_eq!(res.match_tier, Some(MatchTier::Exact));
		assert_eq!(res.kind, Some(EntityKind::Monster));
	}

	#[test]
	fn empty_input_is_no_match() {
		let m = matcher();
		for input in ["", "   ", "!!! ,,", "奖励: 3 金币"] {
			let res = m.find_best_match(input, None);
			assert!(!res.matched, "{input:?}");
			assert!(res.entry.is_none());
		}
	}

	#[test]
	fn exact_beats_closer_fuzzy_name() {
		let index = CatalogIndex::from_entries([
			CatalogEntry::new(EntityKind::Monster, "Fire Dancer", "舞火大师"),
			CatalogEntry::new(EntityKind::Monster, "Look-alike", "和和于舞火大帅"),
		]);
		let m = FuzzyMatcher::new(SharedCatalog::new(CatalogIndex::empty()), MatchPolicy::default());
		// The look-alike is 6/7 similar, far closer than the contained name.
		assert!(similarity("和和于舞火大师", "和和于舞火大帅") > similarity("和和于舞火大师", "舞火大师"));
		let res = m.match_in(&index, "和和于舞火大师", None);
		assert_eq!(name(&res), Some("Fire Dancer"));
		assert_eq!(res.match_tier, Some(MatchTier::Exact));
	}

	#[test]
	fn four_char_name_needs_two_shared_chars() {
		let m = matcher();
		let res = m.find_best_match("咕钟", None);
		assert_eq!(name(&res), Some("Cuckoo Clock"));
		assert_eq!(res.match_tier, Some(MatchTier::Fuzzy));

		let res = m.find_best_match("咕猫", None);
		assert!(!res.matched);
	}

	#[test]
	fn overlap_ratio_counts_distinct_name_chars() {
		let policy = MatchPolicy::default();
		// 咕咕钟表 has three distinct chars, 舞火大师 four.
		assert!(policy.passes_gate(4, 3, 2));
		assert!(!policy.passes_gate(4, 4, 2));

		let m = matcher();
		assert!(!m.find_best_match("舞师", None).matched);
		let res = m.find_best_match("舞火师", None);
		assert_eq!(name(&res), Some("Fire Dancer"));
		assert_eq!(res.match_tier, Some(MatchTier::Fuzzy));
	}

	#[test]
	fn reward_line_does_not_hide_the_next_line() {
		let res = matcher().find_best_match("奖励 3 金币\n舞火大师", None);
		assert_eq!(name(&res), Some("Fire Dancer"));
		assert_eq!(res.match_tier, Some(MatchTier::Exact));
		assert_eq!(res.text, "舞火大师");
	}

	#[test]
	fn names_do_not_join_across_lines() {
		let m = matcher();
		assert!(!m.find_best_match("舞火\n大师", None).matched);

		let res = m.find_best_match("3\n咕咕钟表\n舞火大师", None);
		assert_eq!(name(&res), Some("Fire Dancer"));
	}

	#[test]
	fn short_name_gate_respects_ratio() {
		let policy = MatchPolicy::default();
		assert!(policy.passes_gate(2, 2, 1));
		assert!(!policy.passes_gate(2, 2, 0));

		let strict = MatchPolicy {
			overlap_ratio: ByLength {
				short: 0.75,
				..policy.overlap_ratio
			},
			..MatchPolicy::default()
		};
		assert!(!strict.passes_gate(2, 2, 1));

		let res = FuzzyMatcher::new(SharedCatalog::new(catalog()), policy).find_best_match("火焰", None);
		assert_eq!(name(&res), Some("Fire Spirit"));
		let res = FuzzyMatcher::new(SharedCatalog::new(catalog()), strict).find_best_match("火焰", None);
		assert!(!res.matched);
	}

	#[test]
	fn long_name_gate_scales_with_length() {
		let policy = MatchPolicy::default();
		// 8 chars: needs floor(8 * 0.4) = 3 shared.
		assert!(!policy.passes_gate(8, 8, 2));
		assert!(policy.passes_gate(8, 8, 4));
	}

	#[test]
	fn truncated_name_matches_as_partial() {
		let res = matcher().find_best_match("奇怪的蘑", None);
		assert_eq!(name(&res), Some("A Strange Mushroom"));
		assert_eq!(res.match_tier, Some(MatchTier::Partial));
		assert!((res.score - 0.8).abs() < 1e-6);
	}

	#[test]
	fn reward_text_after_marker_is_ignored() {
		let res = matcher().find_best_match("火灵 奖励 咕咕钟表", Some(EntityKind::Item));
		assert_eq!(name(&res), Some("Fire Spirit Core"));
	}

	#[test]
	fn kind_filter_and_tie_break() {
		let m = matcher();
		assert_eq!(name(&m.find_best_match("火灵", None)), Some("Fire Spirit"));
		assert_eq!(name(&m.find_best_match("火灵", Some(EntityKind::Item))), Some("Fire Spirit Core"));
		assert!(!m.find_best_match("火灵", Some(EntityKind::Skill)).matched);
	}

	#[test]
	fn english_names_are_a_fallback() {
		let m = matcher();
		let res = m.find_best_match("Banannibal!", None);
		assert_eq!(res.match_tier, Some(MatchTier::Exact));
		let res = m.find_best_match("Banannibel", None);
		assert_eq!(name(&res), Some("Banannibal"));
		assert_eq!(res.match_tier, Some(MatchTier::Fuzzy));
		assert!(!m.find_best_match("xyz", None).matched);
	}

	#[test]
	fn cached_results_follow_the_catalog_generation() {
		let shared = SharedCatalog::new(catalog());
		let m = FuzzyMatcher::new(shared.clone(), MatchPolicy::default());
		let first = m.find_best_match("火灵", None);
		assert_eq!(m.find_best_match("火灵", None), first);

		shared.replace(CatalogIndex::from_entries([CatalogEntry::new(EntityKind::Event, "Campfire", "火灵")]));
		let second = m.find_best_match("火灵", None);
		assert_eq!(name(&second), Some("Campfire"));
		assert_ne!(second.generation, first.generation);
	}

	#[test]
	fn cache_evicts_oldest_first() {
		let mut cache = MatchCache::new(2);
		for (i, text) in ["a", "b", "c"].into_iter().enumerate() {
			cache.insert((1, None, text.to_owned()), MatchResult::none(text, i as u64));
		}
		assert!(cache.get(&(1, None, "a".to_owned())).is_none());
		assert!(cache.get(&(1, None, "c".to_owned())).is_some());
	}
}
