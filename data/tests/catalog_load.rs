use std::{fs, path::Path};

use data::{CatalogFile, CatalogIndex, CatalogLoadError, EntityKind, FuzzyMatcher, MatchPolicy, MatchTier, SharedCatalog};

fn write(dir: &Path, file: &str, body: &str) {
	fs::write(dir.join(file), body).unwrap();
}

const MONSTERS: &str = r#"[
	{"name": "Fire Dancer", "name_zh": "舞火大师", "description": "Burns on hit", "image": "monsters/fire_dancer.webp"},
	{"name": "Fire Spirit", "name_localized": "火灵", "aspect_ratio": 0.75},
	{"description": "no name at all"}
]"#;

#[test]
fn loads_the_default_file_set() {
	let dir = tempfile::tempdir().unwrap();
	write(dir.path(), "monsters.json", MONSTERS);
	write(dir.path(), "items.json", r#"[{"name_en": "Cuckoo Clock", "name_zh": "咕咕钟表"}]"#);

	let index = CatalogIndex::load(&CatalogFile::defaults(dir.path())).unwrap();
	assert_eq!(index.len(), 3);
	assert_eq!(index.lookup_candidates(EntityKind::Monster).count(), 2);
	assert_eq!(index.lookup_candidates(EntityKind::Skill).count(), 0);

	let dancer = &index.by_localized("舞火大师")[0];
	assert_eq!(dancer.description, "Burns on hit");
	assert_eq!(dancer.icon_ref, "monsters/fire_dancer.webp");
	assert_eq!(dancer.aspect_ratio, 1.0);
	assert_eq!(index.by_localized("火灵")[0].aspect_ratio, 0.75);
}

#[test]
fn event_records_with_separate_english_name_load() {
	let dir = tempfile::tempdir().unwrap();
	write(dir.path(), "monsters.json", MONSTERS);
	write(
		dir.path(),
		"events.json",
		r#"[{"name": "奇怪的蘑菇", "name_en": "A Strange Mushroom", "choices": [{"name": "Eat it"}]}]"#,
	);

	let index = CatalogIndex::load(&CatalogFile::defaults(dir.path())).unwrap();
	let events = index.lookup_candidates(EntityKind::Event).collect::<Vec<_>>();
	assert_eq!(events.len(), 1);
	assert_eq!(events[0].name, "A Strange Mushroom");
	assert_eq!(events[0].name_localized, "奇怪的蘑菇");

	let matcher = FuzzyMatcher::new(SharedCatalog::new(index), MatchPolicy::default());
	let res = matcher.find_best_match("奇怪的蘑菇", None);
	assert_eq!(res.kind, Some(EntityKind::Event));
	assert_eq!(res.match_tier, Some(MatchTier::Exact));
}

#[test]
fn missing_required_file_fails() {
	let dir = tempfile::tempdir().unwrap();
	write(dir.path(), "items.json", "[]");

	let err = CatalogIndex::load(&CatalogFile::defaults(dir.path())).unwrap_err();
	assert!(matches!(err, CatalogLoadError::Missing { .. }));
	assert!(err.path().ends_with("monsters.json"));
}

#[test]
fn malformed_file_is_a_parse_error() {
	let dir = tempfile::tempdir().unwrap();
	write(dir.path(), "monsters.json", r#"{"not": "a list"}"#);

	let err = CatalogIndex::load(&CatalogFile::defaults(dir.path())).unwrap_err();
	assert!(matches!(err, CatalogLoadError::Parse { .. }));
}

#[test]
fn reload_picks_up_new_records() {
	let dir = tempfile::tempdir().unwrap();
	write(dir.path(), "monsters.json", MONSTERS);
	let files = CatalogFile::defaults(dir.path());

	let shared = SharedCatalog::new(CatalogIndex::load(&files).unwrap());
	let matcher = FuzzyMatcher::new(shared.clone(), MatchPolicy::default());
	assert!(!matcher.find_best_match("咕咕钟表", None).matched);

	write(dir.path(), "items.json", r#"[{"name_en": "Cuckoo Clock", "name_zh": "咕咕钟表"}]"#);
	let generation = shared.reload(&files).unwrap();

	let res = matcher.find_best_match("咕咕钟表", None);
	assert_eq!(res.generation, generation);
	assert_eq!(res.kind, Some(EntityKind::Item));
	assert_eq!(res.match_tier, Some(MatchTier::Exact));
}
