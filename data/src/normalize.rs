//! Text cleanup applied to raw OCR output before matching.
//!
//! Every function here is pure.

use std::sync::LazyLock;

static WHITESPACE_RUN: LazyLock<regex::Regex> = LazyLock::new(|| regex::Regex::new(r"\s+").unwrap());

const NOISE: &[char] = &[
	'{', '}', '[', ']', '(', ')', '<', '>', '`', '~', '!', '@', '#', '$', '%', '^', '&', '*', '_', '+', '=', ';', ':',
	'"', '\'', ',', '.', '?', '\\', '|',
];

// Full-width punctuation the Chinese model tends to emit around names.
const WIDE_NOISE: &[char] = &[
	'，', '。', '、', '；', '：', '？', '！', '“', '”', '‘', '’', '（', '）', '【', '】', '《', '》', '「', '」', '·', '…',
	'～', '—',
];

fn is_noise(c: char) -> bool {
	NOISE.contains(&c) || WIDE_NOISE.contains(&c)
}

/// Strips the noise character set, collapses whitespace runs to one space and trims.
pub fn clean(raw: &str) -> String {
	let stripped = raw.chars().filter(|c| !is_noise(*c)).collect::<String>();
	WHITESPACE_RUN.replace_all(stripped.trim(), " ").into_owned()
}

pub fn is_ideograph(c: char) -> bool {
	('\u{4E00}'..='\u{9FFF}').contains(&c)
}

/// Keeps only CJK unified ideographs.
pub fn chinese_only(text: &str) -> String {
	text.chars().filter(|c| is_ideograph(*c)).collect()
}

/// Keeps ASCII letters and single spaces, lowercased.
pub fn latin_only(text: &str) -> String {
	let letters = text
		.chars()
		.map(|c| if c.is_ascii_alphabetic() { c.to_ascii_lowercase() } else { ' ' })
		.collect::<String>();
	WHITESPACE_RUN.replace_all(letters.trim(), " ").into_owned()
}

/// Cuts `text` at the earliest occurrence of any marker.
///
/// Markers are compared case-insensitively for ASCII. A marker at the very
/// start yields an empty string.
pub fn truncate_at_marker<'a, S: AsRef<str>>(text: &'a str, markers: &[S]) -> &'a str {
	let lowered = text.to_ascii_lowercase();
	let cut = markers
		.iter()
		.map(|m| m.as_ref())
		.filter(|m| !m.is_empty())
		.filter_map(|m| lowered.find(&m.to_ascii_lowercase()))
		.min();

	// ASCII lowercasing keeps byte offsets stable.
	match cut {
		Some(pos) => &text[..pos],
		None => text,
	}
}

/// Splits OCR output into cleaned lines, each cut at its first marker.
/// Lines left empty are dropped, so a reward line never hides the name
/// on the next one.
pub fn name_lines<S: AsRef<str>>(raw: &str, markers: &[S]) -> Vec<String> {
	raw.lines()
		.map(|line| {
			let cleaned = clean(line);
			truncate_at_marker(&cleaned, markers).trim().to_owned()
		})
		.filter(|line| !line.is_empty())
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn clean_strips_noise_and_collapses_spaces() {
		assert_eq!(clean("  [舞火]  大师!!\n\t(2) "), "舞火 大师 2");
		assert_eq!(clean("《火灵》，"), "火灵");
		assert_eq!(clean(""), "");
	}

	#[test]
	fn chinese_only_keeps_ideographs() {
		assert_eq!(chinese_only("2 和和 于 舞火大师"), "和和于舞火大师");
		assert_eq!(chinese_only("abc 123"), "");
	}

	#[test]
	fn chinese_only_is_idempotent() {
		for input in ["2 和和 于 舞火大师", "Fire 火灵 !", "", "ｆｕｌｌ宽度"] {
			let once = chinese_only(input);
			assert_eq!(chinese_only(&once), once);
		}
	}

	#[test]
	fn latin_only_lowercases_and_collapses() {
		assert_eq!(latin_only("  Fire-Dancer 2x "), "fire dancer x");
		assert_eq!(latin_only("舞火"), "");
	}

	#[test]
	fn truncates_at_reward_marker() {
		let markers = ["奖励", "reward"];
		assert_eq!(truncate_at_marker("舞火大师奖励金币", &markers), "舞火大师");
		assert_eq!(truncate_at_marker("Banannibal Rewards: 3", &markers), "Banannibal ");
		assert_eq!(truncate_at_marker("奖励", &markers), "");
		assert_eq!(truncate_at_marker("火灵", &markers), "火灵");
	}

	#[test]
	fn name_lines_cut_each_line_on_its_own() {
		let markers = ["奖励"];
		assert_eq!(name_lines("奖励 3 金币\n舞火大师", &markers), ["舞火大师"]);
		assert_eq!(name_lines("  [火灵]\r\n\n咕咕钟表奖励: 5 ", &markers), ["火灵", "咕咕钟表"]);
		assert!(name_lines("奖励\n  \n", &markers).is_empty());
	}
}
