use serde::Deserialize;

/// One record of a catalog file. Catalog files are plain JSON arrays of these.
///
/// Exports disagree on naming: some carry `name` + `name_zh` (English and
/// Chinese), others `name` + `name_en` (Chinese and English). Every spelling
/// is read on its own and sorted out in [`Record::into_entry`].
#[derive(Debug, Clone, Deserialize)]
pub struct Record {
	#[serde(default)]
	pub name: Option<String>,
	#[serde(default)]
	pub name_en: Option<String>,
	#[serde(default)]
	pub name_zh: Option<String>,
	#[serde(default)]
	pub name_localized: Option<String>,
	#[serde(default)]
	pub description: Option<String>,
	#[serde(default, alias = "icon", alias = "image")]
	pub icon_ref: Option<String>,
	#[serde(default)]
	pub aspect_ratio: Option<f32>,
}

fn non_empty(v: Option<String>) -> Option<String> {
	v.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

impl Record {
	/// Converts into a catalog entry, or `None` when the record carries no usable name.
	///
	/// With `name_en` present, `name` is the localized name; otherwise `name`
	/// is the English one.
	pub fn into_entry(self, kind: crate::EntityKind) -> Option<crate::CatalogEntry> {
		let plain = non_empty(self.name);
		let explicit = non_empty(self.name_zh).or_else(|| non_empty(self.name_localized));
		let (name, localized) = match non_empty(self.name_en) {
			Some(english) => (Some(english), explicit.or(plain)),
			None => (plain, explicit),
		};

		let (name, name_localized) = match (name, localized) {
			(Some(name), Some(localized)) => (name, localized),
			(Some(name), None) => (name.clone(), name),
			(None, Some(localized)) => (localized.clone(), localized),
			(None, None) => return None,
		};

		Some(crate::CatalogEntry {
			name,
			name_localized,
			description: self.description.unwrap_or_default(),
			icon_ref: self.icon_ref.unwrap_or_default(),
			aspect_ratio: self.aspect_ratio.filter(|v| v.is_finite() && *v > 0.0).unwrap_or(1.0),
			kind,
		})
	}
}
