use chrono::Utc;
use lazy_static::lazy_static;
use rand::Rng;
use regex::Regex;
use std::path::{Path, PathBuf};

use crate::error::AppError;

/// Largest picture accepted on registration.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

lazy_static! {
    static ref EXTENSION_REGEX: Regex = Regex::new(r"^\.[A-Za-z0-9]{1,10}$").unwrap();
}

/// A file written by [`UploadStore::save`].
#[derive(Debug, Clone, PartialEq)]
pub struct StoredUpload {
    pub filename: String,
}

/// Directory of user-uploaded pictures, served under `/uploads`.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
    public_base: String,
}

/// The original file's extension including the dot, or nothing when it is missing or unusual.
fn safe_extension(original_name: &str) -> &str {
    let base = original_name
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or(original_name);
    match base.rfind('.') {
        Some(idx) if EXTENSION_REGEX.is_match(&base[idx..]) => &base[idx..],
        _ => "",
    }
}

/// `{unix millis}-{random below 1e9}{extension}`.
pub fn unique_file_name(original_name: &str) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
    format!(
        "{}-{}{}",
        Utc::now().timestamp_millis(),
        suffix,
        safe_extension(original_name)
    )
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>, backend_domain: &str) -> Self {
        Self {
            dir: dir.into(),
            public_base: backend_domain.trim_end_matches('/').to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Absolute URL under which a stored file is served.
    pub fn public_url(&self, upload: &StoredUpload) -> String {
        format!("{}/uploads/{}", self.public_base, upload.filename)
    }

    pub async fn ensure_dir(&self) -> Result<(), AppError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    /// Writes `data` under a fresh name derived from `original_name`.
    pub async fn save(&self, original_name: &str, data: &[u8]) -> Result<StoredUpload, AppError> {
        if data.len() > MAX_UPLOAD_BYTES {
            return Err(AppError::BadRequest(
                "Picture must not exceed 5 MB.".into(),
            ));
        }

        self.ensure_dir().await?;
        let filename = unique_file_name(original_name);
        tokio::fs::write(self.dir.join(&filename), data).await?;
        log::info!("stored upload {} ({} bytes)", filename, data.len());
        Ok(StoredUpload { filename })
    }

    /// Removes a stored file whose owning record was never created.
    pub async fn discard(&self, upload: &StoredUpload) {
        if let Err(e) = tokio::fs::remove_file(self.dir.join(&upload.filename)).await {
            log::warn!("could not remove upload {}: {}", upload.filename, e);
        }
    }
}
