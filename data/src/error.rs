use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CatalogLoadError {
	#[error("required catalog file {} is missing", path.display())]
	Missing { path: PathBuf },
	#[error("failed to read catalog file {}", path.display())]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
	#[error("catalog file {} is not a valid record list", path.display())]
	Parse {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},
}

impl CatalogLoadError {
	pub fn path(&self) -> &std::path::Path {
		match self {
			Self::Missing { path } | Self::Io { path, .. } | Self::Parse { path, .. } => path,
		}
	}
}
