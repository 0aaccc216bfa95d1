//! File-based storage backend implementation for the packer service.
//!
//! Persists each key as its own file under a configured base directory so an
//! interrupted packing session survives a station restart. Values are stored
//! with a small expiry prefix: 8 bytes of little-endian Unix seconds (0 =
//! never expires) followed by the payload.

use crate::{StorageError, StorageInterface};
use async_trait::async_trait;
use packer_types::{ConfigSchema, Field, FieldType, Schema, ValidationError};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::fs;

/// Size of the expiry prefix in bytes.
const EXPIRY_PREFIX_SIZE: usize = 8;

/// File-based storage implementation.
pub struct FileStorage {
	/// Directory all entries are stored under.
	base_path: PathBuf,
}

impl FileStorage {
	/// Creates a new FileStorage rooted at the given directory.
	pub fn new(base_path: impl Into<PathBuf>) -> Self {
		Self {
			base_path: base_path.into(),
		}
	}

	/// Maps a storage key to a file path.
	///
	/// Key characters outside `[A-Za-z0-9._-]` are replaced so keys like
	/// `sessions:order-17` stay within a single directory.
	fn file_path(&self, key: &str) -> PathBuf {
		let safe: String = key
			.chars()
			.map(|c| {
				if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
					c
				} else {
					'_'
				}
			})
			.collect();
		self.base_path.join(format!("{}.bin", safe))
	}

	fn now_secs() -> Result<u64, StorageError> {
		SystemTime::now()
			.duration_since(UNIX_EPOCH)
			.map(|d| d.as_secs())
			.map_err(|e| StorageError::Backend(format!("System time error: {}", e)))
	}

	/// Splits a stored file into (expires_at, payload).
	fn decode(bytes: &[u8]) -> Result<(u64, &[u8]), StorageError> {
		if bytes.len() < EXPIRY_PREFIX_SIZE {
			return Err(StorageError::Backend(
				"File too small for expiry prefix".to_string(),
			));
		}
		let mut expiry = [0u8; EXPIRY_PREFIX_SIZE];
		expiry.copy_from_slice(&bytes[..EXPIRY_PREFIX_SIZE]);
		Ok((u64::from_le_bytes(expiry), &bytes[EXPIRY_PREFIX_SIZE..]))
	}
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let path = self.file_path(key);
		let bytes = match fs::read(&path).await {
			Ok(bytes) => bytes,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				return Err(StorageError::NotFound)
			}
			Err(e) => return Err(StorageError::Backend(e.to_string())),
		};

		let (expires_at, payload) = Self::decode(&bytes)?;
		if expires_at != 0 && Self::now_secs()? >= expires_at {
			// Expired entries read as missing; cleanup removes the file later
			return Err(StorageError::NotFound);
		}

		Ok(payload.to_vec())
	}

	async fn set_bytes(
		&self,
		key: &str,
		value: Vec<u8>,
		ttl: Option<Duration>,
	) -> Result<(), StorageError> {
		fs::create_dir_all(&self.base_path)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;

		let expires_at = match ttl {
			Some(ttl) if !ttl.is_zero() => Self::now_secs()?.saturating_add(ttl.as_secs()),
			_ => 0,
		};

		let mut contents = Vec::with_capacity(EXPIRY_PREFIX_SIZE + value.len());
		contents.extend_from_slice(&expires_at.to_le_bytes());
		contents.extend_from_slice(&value);

		// Write to a temp file then rename so readers never see a torn write
		let path = self.file_path(key);
		let tmp = path.with_extension("tmp");
		fs::write(&tmp, &contents)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;
		fs::rename(&tmp, &path)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;

		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		let path = self.file_path(key);
		match fs::remove_file(&path).await {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		match self.get_bytes(key).await {
			Ok(_) => Ok(true),
			Err(StorageError::NotFound) => Ok(false),
			Err(e) => Err(e),
		}
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(FileStorageSchema)
	}

	async fn cleanup_expired(&self) -> Result<usize, StorageError> {
		let mut removed = 0;
		let mut entries = match fs::read_dir(&self.base_path).await {
			Ok(entries) => entries,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
			Err(e) => return Err(StorageError::Backend(e.to_string())),
		};

		let now = Self::now_secs()?;
		while let Some(entry) = entries
			.next_entry()
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?
		{
			let path = entry.path();
			if path.extension().and_then(|e| e.to_str()) != Some("bin") {
				continue;
			}
			let Ok(bytes) = fs::read(&path).await else {
				continue;
			};
			let Ok((expires_at, _)) = Self::decode(&bytes) else {
				continue;
			};
			if expires_at != 0 && now >= expires_at && fs::remove_file(&path).await.is_ok() {
				removed += 1;
			}
		}

		Ok(removed)
	}
}

/// Configuration schema for FileStorage.
pub struct FileStorageSchema;

impl ConfigSchema for FileStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![Field::new("storage_path", FieldType::String)],
			vec![],
		);
		schema.validate(config)
	}
}

/// Factory function to create a file storage backend from configuration.
///
/// Configuration parameters:
/// - `storage_path`: directory the entries are stored under (required)
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	let storage_path = config
		.get("storage_path")
		.and_then(|v| v.as_str())
		.ok_or_else(|| {
			StorageError::Configuration("storage_path is required for file storage".to_string())
		})?;

	Ok(Box::new(FileStorage::new(Path::new(storage_path))))
}
