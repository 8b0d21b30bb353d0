use std::sync::{Arc, PoisonError, RwLock};

use crate::{CatalogFile, CatalogIndex, CatalogLoadError};

/// Handle to the live catalog. Readers take an `Arc` snapshot and keep it for
/// the whole lookup; a reload swaps the pointer without touching old snapshots.
#[derive(Debug, Clone)]
pub struct SharedCatalog {
	current: Arc<RwLock<Arc<CatalogIndex>>>,
}

impl SharedCatalog {
	pub fn new(index: CatalogIndex) -> Self {
		Self {
			current: Arc::new(RwLock::new(Arc::new(index))),
		}
	}

	pub fn snapshot(&self) -> Arc<CatalogIndex> {
		self.current.read().unwrap_or_else(PoisonError::into_inner).clone()
	}

	pub fn generation(&self) -> u64 {
		self.snapshot().generation()
	}

	/// Installs `index` and returns the one it replaced.
	pub fn replace(&self, index: CatalogIndex) -> Arc<CatalogIndex> {
		let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
		std::mem::replace(&mut *current, Arc::new(index))
	}

	/// Loads `files` into a fresh index and swaps it in. On error the current
	/// catalog stays in place.
	pub fn reload(&self, files: &[CatalogFile]) -> Result<u64, CatalogLoadError> {
		let index = CatalogIndex::load(files)?;
		let generation = index.generation();
		let old = self.replace(index);
		tracing::info!(old = old.generation(), new = generation, "catalog reloaded");
		Ok(generation)
	}
}
