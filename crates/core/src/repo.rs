//! Hashed-path repository store.
//!
//! Files live on local disk under a two-level hash fan-out derived from a
//! digest of the logical target name, bounding any single directory's
//! child count regardless of corpus size:
//!
//! ```text
//! {repo_root}/messages/{provider_id}/{h}/{hh}/{message_id}/{filename}
//! ```
//!
//! where `hh` is the first digest byte of the message id as two hex
//! characters. The store streams files with a strong cache validator and
//! enumerates folders for attachment listings and cleanup.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::UNIX_EPOCH;

use regex::Regex;
use sha2::{Digest, Sha256};

use crate::error::Error;
use crate::model::Attachment;

/// Root folder for message repositories, one subtree per provider.
pub const MESSAGE_REPO_ROOT: &str = "messages";

/// URI prefix under which the transport layer exposes repository files.
pub const REPO_FILE_URI_PREFIX: &str = "/repo/file/";

/// Generated thumbnails, excluded from folder listings.
static THUMBNAIL_FILE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^.+_thumb_\d{1,3}\.\w+$").expect("invalid pattern"));

/// Generated map images, excluded from folder listings.
static MAP_IMAGE_FILE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^map_\d{1,3}\.png$").expect("invalid pattern"));

/// A repository file resolved for streaming.
#[derive(Debug, Clone)]
pub struct RepoFile {
    pub path: PathBuf,
    pub size: u64,
    pub modified_millis: i64,
}

impl RepoFile {
    /// Strong cache validator: `{modified_millis}_{size}`.
    pub fn validator(&self) -> String {
        format!("{}_{}", self.modified_millis, self.size)
    }

    /// Opens the file for asynchronous streaming.
    pub async fn open(&self) -> Result<tokio::fs::File, Error> {
        tokio::fs::File::open(&self.path).await.map_err(|e| Error::repo_io(&self.path, e))
    }
}

/// Content-locatable blob store on local disk.
#[derive(Debug, Clone)]
pub struct RepositoryStore {
    root: PathBuf,
}

impl RepositoryStore {
    /// Opens the repository, creating the root and its `temp` scratch
    /// directory if absent.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, Error> {
        let store = Self { root: root.into() };
        fs::create_dir_all(&store.root).map_err(|e| Error::repo_io(&store.root, e))?;
        let temp = store.temp_root();
        fs::create_dir_all(&temp).map_err(|e| Error::repo_io(&temp, e))?;
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Scratch directory on the same filesystem as the repository, used
    /// for atomic writes (write to temp, then rename into place).
    pub fn temp_root(&self) -> PathBuf {
        self.root.join("temp")
    }

    /// Repo-relative `/`-separated path for a repository file.
    pub fn repo_path(&self, file: &Path) -> String {
        let rel = file.strip_prefix(&self.root).unwrap_or(file);
        rel.components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// URL-encoded local URI for a repository file, as substituted into
    /// attachment records and rewritten HTML.
    pub fn repo_uri(&self, file: &Path) -> String {
        format!("{}{}", REPO_FILE_URI_PREFIX, encode_uri(&self.repo_path(file)))
    }

    /// Creates two levels of hash fan-out folders within `root_folder`
    /// from a digest of `target`.
    ///
    /// The first digest byte becomes two lowercase hex characters `hh`,
    /// yielding `{repo_root}/{root_folder}/{h}/{hh}[/{target}]`. Pure
    /// function of its inputs; directory creation is lazy and idempotent.
    pub fn hashed_subfolder(
        &self,
        root_folder: &str,
        target: &str,
        include_target: bool,
        create: bool,
    ) -> Result<PathBuf, Error> {
        let digest = Sha256::digest(target.as_bytes());
        let hash = hex::encode(&digest[..1]);

        let mut folder = self.root.clone();
        if !root_folder.trim().is_empty() {
            folder.push(root_folder);
        }
        folder.push(&hash[0..1]);
        folder.push(&hash[0..2]);
        if include_target {
            folder.push(target);
        }

        if create && !folder.exists() {
            fs::create_dir_all(&folder).map_err(|e| Error::repo_io(&folder, e))?;
        }
        Ok(folder)
    }

    /// The hashed repository folder for a message.
    pub fn message_folder(
        &self,
        provider_id: &str,
        id: i64,
        create: bool,
    ) -> Result<PathBuf, Error> {
        let root_folder = format!("{MESSAGE_REPO_ROOT}/{provider_id}");
        self.hashed_subfolder(&root_folder, &id.to_string(), true, create)
    }

    /// The repository path for a named message file.
    pub fn message_file(
        &self,
        provider_id: &str,
        id: i64,
        name: &str,
        create: bool,
    ) -> Result<PathBuf, Error> {
        Ok(self.message_folder(provider_id, id, create)?.join(name))
    }

    /// Repo-relative path of a message's folder.
    pub fn message_folder_path(&self, provider_id: &str, id: i64) -> Result<String, Error> {
        Ok(self.repo_path(&self.message_folder(provider_id, id, false)?))
    }

    /// Local URI of a named message file.
    pub fn message_file_uri(
        &self,
        provider_id: &str,
        id: i64,
        name: &str,
    ) -> Result<String, Error> {
        Ok(self.repo_uri(&self.message_file(provider_id, id, name, false)?))
    }

    /// Resolves a repo-relative path for streaming.
    ///
    /// Returns `None` for missing paths and directories. Paths escaping
    /// the repository root are rejected.
    pub fn stream_file(&self, path: &str) -> Result<Option<RepoFile>, Error> {
        if path.split('/').any(|seg| seg == "..") {
            return Err(Error::repo_io(
                path,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "path escapes repository"),
            ));
        }

        let file = self.root.join(path);
        let meta = match fs::metadata(&file) {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("failed streaming file: {}", file.display());
                return Ok(None);
            }
            Err(e) => return Err(Error::repo_io(&file, e)),
        };
        if meta.is_dir() {
            tracing::warn!("failed streaming file: {}", file.display());
            return Ok(None);
        }

        let modified = meta.modified().map_err(|e| Error::repo_io(&file, e))?;
        let modified_millis = modified
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or_default();

        Ok(Some(RepoFile { path: file, size: meta.len(), modified_millis }))
    }

    /// Lists the attachment entries of a repository folder.
    ///
    /// Skips directories, hidden files, generated thumbnails and
    /// generated map images. A missing folder yields an empty list.
    pub fn list_files(&self, folder: &str) -> Result<Vec<Attachment>, Error> {
        let dir = self.root.join(folder);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut result = Vec::new();
        let entries = fs::read_dir(&dir).map_err(|e| Error::repo_io(&dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| Error::repo_io(&dir, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let meta = match entry.metadata() {
                Ok(meta) => meta,
                Err(e) => {
                    tracing::trace!("error reading file attributes for {}: {}", name, e);
                    continue;
                }
            };

            if !meta.is_file()
                || name.starts_with('.')
                || THUMBNAIL_FILE.is_match(&name)
                || MAP_IMAGE_FILE.is_match(&name)
            {
                continue;
            }

            let mut att = Attachment::new(encode_uri(&format!("{folder}/{name}")), name);
            att.size = Some(meta.len());
            att.updated = meta
                .modified()
                .ok()
                .map(chrono::DateTime::<chrono::Utc>::from);
            result.push(att);
        }

        result.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(result)
    }
}

/// URL-encodes a repo path, keeping `/` separators intact.
pub fn encode_uri(path: &str) -> String {
    path.split('/').map(|seg| urlencoding::encode(seg).into_owned()).collect::<Vec<_>>().join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, RepositoryStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = RepositoryStore::open(dir.path().join("repo")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_open_creates_root_and_temp() {
        let (_dir, store) = store();
        assert!(store.root().is_dir());
        assert!(store.temp_root().is_dir());
    }

    #[test]
    fn test_hashed_subfolder_deterministic() {
        let (_dir, store) = store();
        let p1 = store.hashed_subfolder("messages/dk", "1234", true, false).unwrap();
        let p2 = store.hashed_subfolder("messages/dk", "1234", true, false).unwrap();
        assert_eq!(p1, p2);
        assert!(p1.ends_with(Path::new("1234")));
        assert!(!p1.exists());
    }

    #[test]
    fn test_hashed_subfolder_layout() {
        let (_dir, store) = store();
        let path = store.hashed_subfolder("messages/dk", "1234", true, false).unwrap();
        let rel = store.repo_path(&path);

        // messages/dk/{h}/{hh}/1234 with hh the first digest byte in hex
        let parts: Vec<&str> = rel.split('/').collect();
        assert_eq!(parts.len(), 5);
        assert_eq!(parts[0], "messages");
        assert_eq!(parts[1], "dk");
        assert_eq!(parts[2].len(), 1);
        assert_eq!(parts[3].len(), 2);
        assert!(parts[3].starts_with(parts[2]));
        assert_eq!(parts[4], "1234");
    }

    #[test]
    fn test_hashed_subfolder_creates_when_asked() {
        let (_dir, store) = store();
        let path = store.hashed_subfolder("messages/dk", "42", true, true).unwrap();
        assert!(path.is_dir());
        // Idempotent.
        let again = store.hashed_subfolder("messages/dk", "42", true, true).unwrap();
        assert_eq!(path, again);
    }

    #[test]
    fn test_repo_uri_encodes_segments() {
        let (_dir, store) = store();
        let file = store.root().join("messages/dk/a/ab/42/chart 102.pdf");
        let uri = store.repo_uri(&file);
        assert_eq!(uri, "/repo/file/messages/dk/a/ab/42/chart%20102.pdf");
    }

    #[test]
    fn test_stream_file_missing_and_directory() {
        let (_dir, store) = store();
        assert!(store.stream_file("messages/nope.txt").unwrap().is_none());
        assert!(store.stream_file("temp").unwrap().is_none());
    }

    #[test]
    fn test_stream_file_rejects_escaping_paths() {
        let (_dir, store) = store();
        assert!(store.stream_file("../outside.txt").is_err());
    }

    #[test]
    fn test_stream_file_validator() {
        let (_dir, store) = store();
        let folder = store.message_folder("dk", 42, true).unwrap();
        fs::write(folder.join("notice.txt"), b"ahoy").unwrap();

        let rel = format!("{}/notice.txt", store.message_folder_path("dk", 42).unwrap());
        let file = store.stream_file(&rel).unwrap().unwrap();
        assert_eq!(file.size, 4);
        assert_eq!(file.validator(), format!("{}_{}", file.modified_millis, 4));
    }

    #[test]
    fn test_list_files_excludes_generated() {
        let (_dir, store) = store();
        let folder = store.message_folder("dk", 42, true).unwrap();
        fs::write(folder.join("photo.jpg"), b"jpg").unwrap();
        fs::write(folder.join("photo_thumb_64.jpg"), b"thumb").unwrap();
        fs::write(folder.join("map_256.png"), b"map").unwrap();
        fs::write(folder.join(".hidden"), b"dot").unwrap();

        let rel = store.message_folder_path("dk", 42).unwrap();
        let files = store.list_files(&rel).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "photo.jpg");
        assert_eq!(files[0].size, Some(3));
        assert!(files[0].updated.is_some());
        assert!(files[0].path.ends_with("photo.jpg"));
    }

    #[test]
    fn test_list_files_missing_folder() {
        let (_dir, store) = store();
        assert!(store.list_files("messages/dk/0/00/7").unwrap().is_empty());
    }
}
