use std::{
	collections::{HashMap, HashSet},
	fs::File,
	io::BufReader,
	path::{Path, PathBuf},
	sync::atomic::{AtomicU64, Ordering},
};

use crate::{CatalogEntry, CatalogLoadError, EntityKind, normalize, schema::record::Record};

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// One catalog source on disk.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct CatalogFile {
	pub kind: EntityKind,
	pub path: PathBuf,
	pub required: bool,
}

impl CatalogFile {
	pub fn new(kind: EntityKind, path: impl Into<PathBuf>, required: bool) -> Self {
		Self {
			kind,
			path: path.into(),
			required,
		}
	}

	/// The standard file set inside a data directory. Only monsters are required.
	pub fn defaults(data_dir: &Path) -> Vec<CatalogFile> {
		vec![
			Self::new(EntityKind::Monster, data_dir.join("monsters.json"), true),
			Self::new(EntityKind::Item, data_dir.join("items.json"), false),
			Self::new(EntityKind::Skill, data_dir.join("skills.json"), false),
			Self::new(EntityKind::Event, data_dir.join("events.json"), false),
		]
	}

	fn read(&self) -> Result<Option<Vec<Record>>, CatalogLoadError> {
		let file = match File::open(&self.path) {
			Ok(file) => file,
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
				if self.required {
					return Err(CatalogLoadError::Missing { path: self.path.clone() });
				}
				tracing::warn!(path = %self.path.display(), kind = %self.kind, "optional catalog file missing, skipping");
				return Ok(None);
			}
			Err(source) => {
				return Err(CatalogLoadError::Io {
					path: self.path.clone(),
					source,
				});
			}
		};

		serde_json::from_reader(BufReader::new(file))
			.map(Some)
			.map_err(|source| CatalogLoadError::Parse {
				path: self.path.clone(),
				source,
			})
	}
}

/// Normalized forms of a localized name, computed once per entry.
#[derive(Debug, Clone)]
pub(crate) struct NameKey {
	pub text: String,
	pub chars: Vec<char>,
	pub distinct: HashSet<char>,
	pub latin: String,
}

impl NameKey {
	fn new(entry: &CatalogEntry) -> Self {
		let text = normalize::chinese_only(&entry.name_localized);
		let chars = text.chars().collect::<Vec<_>>();
		let distinct = chars.iter().copied().collect();
		Self {
			text,
			chars,
			distinct,
			latin: normalize::latin_only(&entry.name),
		}
	}
}

/// Read-only lookup structure over every loaded entry.
///
/// Each index gets a process-unique `generation`, so results and caches can
/// tell which load they came from. Reloading builds a new index.
#[derive(Debug)]
pub struct CatalogIndex {
	generation: u64,
	entries: Vec<CatalogEntry>,
	keys: Vec<NameKey>,
	by_kind: HashMap<EntityKind, Vec<usize>>,
	by_localized: HashMap<String, Vec<CatalogEntry>>,
	identities: HashSet<(EntityKind, String)>,
}

impl CatalogIndex {
	pub fn load(files: &[CatalogFile]) -> Result<Self, CatalogLoadError> {
		let mut entries = Vec::new();
		for file in files {
			let Some(records) = file.read()? else {
				continue;
			};
			let before = entries.len();
			let mut skipped = 0usize;
			for record in records {
				match record.into_entry(file.kind) {
					Some(entry) => entries.push(entry),
					None => skipped += 1,
				}
			}
			if skipped > 0 {
				tracing::warn!(path = %file.path.display(), skipped, "records without a name were skipped");
			}
			tracing::debug!(path = %file.path.display(), kind = %file.kind, count = entries.len() - before, "catalog file loaded");
		}

		let index = Self::from_entries(entries);
		tracing::info!(entries = index.len(), generation = index.generation, "catalog loaded");
		Ok(index)
	}

	pub fn from_entries(entries: impl IntoIterator<Item = CatalogEntry>) -> Self {
		let mut index = Self {
			generation: NEXT_GENERATION.fetch_add(1, Ordering::Relaxed),
			entries: Vec::new(),
			keys: Vec::new(),
			by_kind: HashMap::new(),
			by_localized: HashMap::new(),
			identities: HashSet::new(),
		};

		for entry in entries {
			if !index.identities.insert((entry.kind, entry.name.clone())) {
				tracing::warn!(kind = %entry.kind, name = %entry.name, "duplicate catalog entry dropped");
				continue;
			}
			let pos = index.entries.len();
			index.by_kind.entry(entry.kind).or_default().push(pos);
			index.by_localized.entry(lookup_key(&entry.name_localized)).or_default().push(entry.clone());
			index.keys.push(NameKey::new(&entry));
			index.entries.push(entry);
		}

		index
	}

	/// An index with nothing in it; every lookup misses.
	pub fn empty() -> Self {
		Self::from_entries(Vec::new())
	}

	pub fn generation(&self) -> u64 {
		self.generation
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn entries(&self) -> impl Iterator<Item = &CatalogEntry> {
		self.entries.iter()
	}

	pub fn lookup_candidates(&self, kind: EntityKind) -> impl Iterator<Item = &CatalogEntry> {
		self.by_kind
			.get(&kind)
			.into_iter()
			.flatten()
			.map(|&pos| &self.entries[pos])
	}

	/// All entries whose localized name normalizes to the same key as `name`.
	pub fn by_localized(&self, name: &str) -> &[CatalogEntry] {
		self.by_localized
			.get(&lookup_key(name))
			.map(Vec::as_slice)
			.unwrap_or(&[])
	}

	pub fn contains(&self, entry: &CatalogEntry) -> bool {
		self.by_localized(&entry.name_localized).iter().any(|e| e == entry)
	}

	/// Entries paired with their precomputed name keys, optionally for one kind only.
	pub(crate) fn keyed(&self, kind: Option<EntityKind>) -> Box<dyn Iterator<Item = (&CatalogEntry, &NameKey)> + '_> {
		match kind {
			Some(kind) => Box::new(
				self.by_kind
					.get(&kind)
					.into_iter()
					.flatten()
					.map(|&pos| (&self.entries[pos], &self.keys[pos])),
			),
			None => Box::new(self.entries.iter().zip(self.keys.iter())),
		}
	}
}

fn lookup_key(name: &str) -> String {
	let zh = normalize::chinese_only(name);
	if zh.is_empty() { normalize::latin_only(name) } else { zh }
}
