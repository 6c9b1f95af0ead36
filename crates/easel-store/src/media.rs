//! Media blob storage
//!
//! Resolves an image source into bytes and writes it to the media directory
//! under a name derived from its id. Sources may be `data:` URLs, `http(s)`
//! URLs, or paths under the public media prefix; arbitrary filesystem paths
//! are rejected.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

use crate::config::StorageConfig;
use crate::error::{Error, Result};

/// Image bytes with the extension they should be stored under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaBlob {
    /// Raw image bytes
    pub bytes: Vec<u8>,
    /// File extension without the dot
    pub extension: &'static str,
}

/// Writes image blobs to a directory
#[derive(Debug, Clone)]
pub struct MediaStore {
    dir: PathBuf,
    public_base_url: String,
    http: Client,
}

impl MediaStore {
    /// Create a media store
    pub fn new(config: &StorageConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.fetch_timeout())
            .build()
            .map_err(|e| Error::Fetch(e.to_string()))?;
        Ok(Self {
            dir: config.media_dir.clone(),
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Directory blobs are written to
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Public URL for a stored file
    #[must_use]
    pub fn public_url(&self, storage_path: &str) -> String {
        let file_name = Path::new(storage_path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("{}/{}", self.public_base_url, file_name)
    }

    /// Resolve `src` and write it as `{id}.{ext}`; returns the written path
    #[instrument(skip(self, src), fields(image_id = %id))]
    pub async fn store(&self, id: &str, src: &str) -> Result<PathBuf> {
        let blob = self.resolve(src).await?;
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self
            .dir
            .join(format!("{}.{}", file_stem(id), blob.extension));
        tokio::fs::write(&path, &blob.bytes).await?;
        debug!(path = %path.display(), bytes = blob.bytes.len(), "media written");
        Ok(path)
    }

    /// Load the bytes behind an image source
    pub async fn resolve(&self, src: &str) -> Result<MediaBlob> {
        let src = src.trim();
        if src.is_empty() {
            return Err(Error::InvalidSource("empty source".to_string()));
        }
        if let Some(rest) = src.strip_prefix("data:") {
            return decode_data_url(rest);
        }
        if src.starts_with("http://") || src.starts_with("https://") {
            return self.fetch(src).await;
        }

        let Some(path) = self.media_path(src) else {
            return Err(Error::InvalidSource(
                "source must be a data url, an http(s) url or a saved media url".to_string(),
            ));
        };
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| Error::InvalidSource(format!("{src}: {e}")))?;
        Ok(MediaBlob {
            bytes,
            extension: extension_from_path(&path),
        })
    }

    async fn fetch(&self, url: &str) -> Result<MediaBlob> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Fetch(e.without_url().to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Fetch(format!("HTTP {status}")));
        }
        let url_path = url.split('?').next().unwrap_or(url);
        let extension = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(extension_from_mime)
            .unwrap_or_else(|| extension_from_path(Path::new(url_path)));
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Fetch(e.without_url().to_string()))?;
        Ok(MediaBlob {
            bytes: bytes.to_vec(),
            extension,
        })
    }

    /// Map a public media URL back into the media directory
    fn media_path(&self, src: &str) -> Option<PathBuf> {
        if self.public_base_url.is_empty() {
            return None;
        }
        let file_name = src
            .strip_prefix(&self.public_base_url)?
            .strip_prefix('/')?;
        let name = file_stem_path(file_name);
        (!name.as_os_str().is_empty()).then(|| self.dir.join(name))
    }
}

fn decode_data_url(rest: &str) -> Result<MediaBlob> {
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| Error::InvalidSource("malformed data url".to_string()))?;
    let Some(mime) = meta.strip_suffix(";base64") else {
        return Err(Error::InvalidSource("data url is not base64".to_string()));
    };
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| Error::InvalidSource(format!("bad base64 payload: {e}")))?;
    Ok(MediaBlob {
        bytes,
        extension: extension_from_mime(mime).unwrap_or("png"),
    })
}

fn extension_from_mime(mime: &str) -> Option<&'static str> {
    match mime.split(';').next().unwrap_or("").trim() {
        "image/png" => Some("png"),
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

fn extension_from_path(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("jpg" | "jpeg") => "jpg",
        Some("webp") => "webp",
        Some("gif") => "gif",
        _ => "png",
    }
}

/// File-name-safe form of an image id.
///
/// Ids made only of `[A-Za-z0-9_-]` are used as-is. Anything else is
/// sanitised and suffixed with a hash of the raw id, so distinct ids never
/// share a file.
fn file_stem(id: &str) -> String {
    let is_safe = |c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_';
    if !id.is_empty() && id.chars().all(is_safe) {
        return id.to_string();
    }
    let sanitized: String = id
        .chars()
        .map(|c| if is_safe(c) { c } else { '_' })
        .collect();
    format!("{sanitized}-{:016x}", fnv1a(id.as_bytes()))
}

/// 64-bit FNV-1a, stable across builds and platforms
fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325, |hash, b| {
        (hash ^ u64::from(*b)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

/// Keep only the final component so a public URL cannot escape the media dir
fn file_stem_path(name: &str) -> PathBuf {
    Path::new(name)
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn media(dir: &Path) -> MediaStore {
        MediaStore::new(&StorageConfig {
            media_dir: dir.to_path_buf(),
            ..StorageConfig::default()
        })
        .unwrap()
    }

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("easel-media-{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_decode_data_url() {
        let blob = decode_data_url("image/jpeg;base64,AAEC").unwrap();
        assert_eq!(blob.bytes, vec![0, 1, 2]);
        assert_eq!(blob.extension, "jpg");

        assert!(decode_data_url("image/png,raw").is_err());
        assert!(decode_data_url("no-comma").is_err());
    }

    #[test]
    fn test_file_stem_sanitizes() {
        assert_eq!(file_stem("abc-123_x"), "abc-123_x");

        let stem = file_stem("../etc/passwd");
        assert!(stem.starts_with("___etc_passwd-"));
        assert!(!stem.contains('/') && !stem.contains('.'));
    }

    #[test]
    fn test_file_stem_keeps_distinct_ids_apart() {
        assert_ne!(file_stem("a.b"), file_stem("a_b"));
        assert_ne!(file_stem("a.b"), file_stem("a/b"));
        assert_eq!(file_stem("a.b"), file_stem("a.b"));
    }

    #[tokio::test]
    async fn test_similar_ids_do_not_overwrite_each_other() {
        let dir = temp_dir();
        let store = media(&dir);

        let dotted = store.store("a.b", "data:image/png;base64,AAEC").await.unwrap();
        let underscored = store.store("a_b", "data:image/png;base64,AwQF").await.unwrap();
        assert_ne!(dotted, underscored);
        assert_eq!(tokio::fs::read(&dotted).await.unwrap(), vec![0, 1, 2]);
        assert_eq!(tokio::fs::read(&underscored).await.unwrap(), vec![3, 4, 5]);

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[test]
    fn test_public_url() {
        let store = media(Path::new("/tmp/media"));
        assert_eq!(store.public_url("/tmp/media/abc.png"), "/media/abc.png");
    }

    #[tokio::test]
    async fn test_store_data_url_and_resave_from_public_url() {
        let dir = temp_dir();
        let store = media(&dir);

        let path = store
            .store("first", "data:image/png;base64,iVBORw0KGgo=")
            .await
            .unwrap();
        assert_eq!(path, dir.join("first.png"));
        let original = tokio::fs::read(&path).await.unwrap();

        let copy = store.store("second", "/media/first.png").await.unwrap();
        assert_eq!(tokio::fs::read(&copy).await.unwrap(), original);

        // traversal collapses to the file name inside the media dir
        assert!(store.resolve("/media/../../first.png").await.is_ok());

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_resolve_rejects_filesystem_paths() {
        let dir = temp_dir();
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let outside = dir.join("outside.png");
        tokio::fs::write(&outside, b"secret").await.unwrap();
        let store = media(&dir.join("media"));

        for src in [
            "/etc/passwd".to_string(),
            "file:///etc/passwd".to_string(),
            "etc/passwd".to_string(),
            outside.to_string_lossy().into_owned(),
        ] {
            assert!(
                matches!(store.resolve(&src).await, Err(Error::InvalidSource(_))),
                "{src} must be rejected"
            );
        }

        assert!(store.store("leak", "/etc/passwd").await.is_err());
        assert!(!dir.join("media").join("leak.png").exists());

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_resolve_rejects_missing_and_empty() {
        let store = media(&temp_dir());
        assert!(matches!(
            store.resolve("  ").await,
            Err(Error::InvalidSource(_))
        ));
        assert!(matches!(
            store.resolve("/media/not-here.png").await,
            Err(Error::InvalidSource(_))
        ));
        assert!(matches!(
            store.resolve("/media/").await,
            Err(Error::InvalidSource(_))
        ));
    }
}
