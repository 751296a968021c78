//! Dataset resolution: local override, download cache, or remote fetch (raw file or zip archive).

use super::CorpusError;
use crate::config::CorpusConfig;
use reqwest::Client;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use zip::ZipArchive;

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Resolves a dataset identifier to the local corpus file, downloading it when needed.
pub struct DatasetResolver {
    client: Client,
    config: CorpusConfig,
    cache_root: PathBuf,
}

impl DatasetResolver {
    /// Build a resolver that caches downloads under the user cache directory.
    pub fn new(config: &CorpusConfig) -> Result<Self, CorpusError> {
        let cache_root = dirs::cache_dir()
            .ok_or(CorpusError::NoCacheDir)?
            .join("rustytranslate")
            .join("datasets");
        Self::with_cache_root(config, cache_root)
    }

    /// Build a resolver with an explicit cache root.
    pub fn with_cache_root(
        config: &CorpusConfig,
        cache_root: impl Into<PathBuf>,
    ) -> Result<Self, CorpusError> {
        let client = Client::builder()
            .user_agent("rusty-translate/0.1")
            .timeout(config.download_timeout)
            .build()?;
        Ok(Self {
            client,
            config: config.clone(),
            cache_root: cache_root.into(),
        })
    }

    /// Return the path of the tab-separated corpus file.
    ///
    /// `CORPUS_DIR` wins when set. Otherwise the download cache is consulted and the file is
    /// fetched only when the cache does not already hold it.
    pub async fn resolve(&self) -> Result<PathBuf, CorpusError> {
        if let Some(dir) = &self.config.dir_override {
            tracing::info!(dir = %dir.display(), "Using local corpus directory");
            return locate_corpus_file(dir, &self.config.file_name);
        }

        let (owner, dataset) = split_dataset_id(&self.config.dataset)?;
        let dataset_dir = self.cache_root.join(owner).join(dataset);
        if dataset_dir.is_dir()
            && let Ok(path) = locate_corpus_file(&dataset_dir, &self.config.file_name)
        {
            tracing::info!(path = %path.display(), "Using cached corpus file");
            return Ok(path);
        }

        self.download(owner, dataset, &dataset_dir).await
    }

    async fn download(
        &self,
        owner: &str,
        dataset: &str,
        dataset_dir: &Path,
    ) -> Result<PathBuf, CorpusError> {
        let url = format!(
            "{}/{owner}/{dataset}/{}",
            self.config.download_url.trim_end_matches('/'),
            self.config.file_name
        );
        tracing::info!(url = %url, "Downloading corpus file");

        let mut request = self.client.get(&url);
        if let (Some(username), Some(key)) = (&self.config.kaggle_username, &self.config.kaggle_key)
        {
            request = request.basic_auth(username, Some(key));
        }
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::error!(url = %url, %status, "Corpus download rejected");
            return Err(CorpusError::DownloadStatus { url, status });
        }

        let body = response.bytes().await?;
        tokio::fs::create_dir_all(dataset_dir)
            .await
            .map_err(|source| CorpusError::Io {
                path: dataset_dir.to_path_buf(),
                source,
            })?;

        if body.starts_with(ZIP_MAGIC) {
            tracing::info!(bytes = body.len(), "Extracting corpus archive");
            extract_archive(body.to_vec(), dataset_dir.to_path_buf(), url).await?;
            let path = locate_corpus_file(dataset_dir, &self.config.file_name)?;
            tracing::info!(path = %path.display(), "Corpus archive extracted");
            return Ok(path);
        }

        let target = dataset_dir.join(&self.config.file_name);
        tokio::fs::write(&target, &body)
            .await
            .map_err(|source| CorpusError::Io {
                path: target.clone(),
                source,
            })?;

        tracing::info!(path = %target.display(), bytes = body.len(), "Corpus file downloaded");
        Ok(target)
    }
}

/// Unpack a zip payload into `dir`. Entry names escaping `dir` are rejected by the archive reader.
async fn extract_archive(body: Vec<u8>, dir: PathBuf, url: String) -> Result<(), CorpusError> {
    let target = dir.clone();
    let extracted = tokio::task::spawn_blocking(move || {
        ZipArchive::new(Cursor::new(body)).and_then(|mut archive| archive.extract(&target))
    })
    .await
    .map_err(|error| CorpusError::Io {
        path: dir,
        source: std::io::Error::other(error),
    })?;
    extracted.map_err(|source| CorpusError::Archive { url, source })
}

/// Find `file_name` anywhere below `dir`.
pub fn locate_corpus_file(dir: &Path, file_name: &str) -> Result<PathBuf, CorpusError> {
    if !dir.is_dir() {
        return Err(CorpusError::DatasetNotFound(dir.to_path_buf()));
    }

    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .find(|entry| entry.file_type().is_file() && entry.file_name() == file_name)
        .map(|entry| entry.into_path())
        .ok_or_else(|| CorpusError::FileNotFound {
            file: file_name.to_string(),
            dir: dir.to_path_buf(),
        })
}

fn split_dataset_id(id: &str) -> Result<(&str, &str), CorpusError> {
    match id.trim().split_once('/') {
        Some((owner, dataset))
            if !owner.is_empty() && !dataset.is_empty() && !dataset.contains('/') =>
        {
            Ok((owner, dataset))
        }
        _ => Err(CorpusError::InvalidDataset(id.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::ColumnOrder;
    use httpmock::{Method::GET, MockServer};
    use std::io::Write;
    use std::time::Duration;
    use uuid::Uuid;
    use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

    fn scratch_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("rustytranslate-corpus-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).expect("scratch dir");
        dir
    }

    fn corpus_config(download_url: String, dir_override: Option<PathBuf>) -> CorpusConfig {
        CorpusConfig {
            dataset: "seymasa/turkish-to-english-translation-dataset".into(),
            file_name: "TR2EN.txt".into(),
            dir_override,
            column_order: ColumnOrder::TargetFirst,
            max_pairs: 1000,
            download_url,
            download_timeout: Duration::from_secs(5),
            kaggle_username: None,
            kaggle_key: None,
        }
    }

    #[test]
    fn locate_finds_nested_files() {
        let root = scratch_dir();
        let nested = root.join("versions").join("1");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("TR2EN.txt"), "Hi.\tMerhaba.\n").unwrap();

        let found = locate_corpus_file(&root, "TR2EN.txt").expect("corpus file");
        assert_eq!(found, nested.join("TR2EN.txt"));
        std::fs::remove_dir_all(root).ok();
    }

    #[test]
    fn locate_reports_missing_file_and_dir() {
        let root = scratch_dir();
        let error = locate_corpus_file(&root, "TR2EN.txt").unwrap_err();
        assert!(matches!(error, CorpusError::FileNotFound { .. }));

        let error = locate_corpus_file(&root.join("absent"), "TR2EN.txt").unwrap_err();
        assert!(matches!(error, CorpusError::DatasetNotFound(_)));
        std::fs::remove_dir_all(root).ok();
    }

    #[test]
    fn dataset_ids_need_owner_and_name() {
        assert_eq!(split_dataset_id("a/b").unwrap(), ("a", "b"));
        assert!(split_dataset_id("just-a-name").is_err());
        assert!(split_dataset_id("a/b/c").is_err());
        assert!(split_dataset_id("/b").is_err());
    }

    #[tokio::test]
    async fn resolve_prefers_directory_override() {
        let dir = scratch_dir();
        std::fs::write(dir.join("TR2EN.txt"), "Hi.\tMerhaba.\n").unwrap();
        let config = corpus_config("http://127.0.0.1:9".into(), Some(dir.clone()));

        let resolver = DatasetResolver::with_cache_root(&config, dir.join("cache")).unwrap();
        let path = resolver.resolve().await.expect("override path");
        assert_eq!(path, dir.join("TR2EN.txt"));
        std::fs::remove_dir_all(dir).ok();
    }

    #[tokio::test]
    async fn resolve_downloads_into_cache_once() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path(
                    "/download/seymasa/turkish-to-english-translation-dataset/TR2EN.txt",
                );
                then.status(200).body("Good morning.\tGünaydın.\n");
            })
            .await;

        let cache = scratch_dir();
        let config = corpus_config(server.url("/download"), None);
        let resolver = DatasetResolver::with_cache_root(&config, &cache).unwrap();

        let first = resolver.resolve().await.expect("downloaded");
        let second = resolver.resolve().await.expect("cached");
        mock.assert_hits(1);
        assert_eq!(first, second);
        let contents = std::fs::read_to_string(&first).unwrap();
        assert!(contents.contains("Günaydın"));
        std::fs::remove_dir_all(cache).ok();
    }

    fn zipped_corpus(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, contents) in entries {
            let options =
                SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
            writer.start_file(*name, options).expect("start entry");
            writer.write_all(contents.as_bytes()).expect("write entry");
        }
        writer.finish().expect("finish archive").into_inner()
    }

    #[tokio::test]
    async fn resolve_extracts_zip_archives() {
        let server = MockServer::start_async().await;
        let archive = zipped_corpus(&[
            ("README.md", "Turkish to English pairs"),
            ("data/TR2EN.txt", "Good morning.\tGünaydın.\nThank you.\tTeşekkürler.\n"),
        ]);
        let mock = server
            .mock_async(|when, then| {
                when.method(GET);
                then.status(200)
                    .header("content-type", "application/zip")
                    .body(archive);
            })
            .await;

        let cache = scratch_dir();
        let config = corpus_config(server.base_url(), None);
        let resolver = DatasetResolver::with_cache_root(&config, &cache).unwrap();

        let path = resolver.resolve().await.expect("extracted corpus");
        assert!(path.ends_with("data/TR2EN.txt"));
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("Teşekkürler"));

        let cached = resolver.resolve().await.expect("cached corpus");
        assert_eq!(cached, path);
        mock.assert_hits(1);
        std::fs::remove_dir_all(cache).ok();
    }

    #[tokio::test]
    async fn archive_without_corpus_file_is_reported() {
        let server = MockServer::start_async().await;
        let archive = zipped_corpus(&[("EN2TR.txt", "Günaydın.\tGood morning.\n")]);
        server
            .mock_async(|when, then| {
                when.method(GET);
                then.status(200).body(archive);
            })
            .await;

        let cache = scratch_dir();
        let config = corpus_config(server.base_url(), None);
        let resolver = DatasetResolver::with_cache_root(&config, &cache).unwrap();
        let error = resolver.resolve().await.unwrap_err();
        assert!(matches!(error, CorpusError::FileNotFound { ref file, .. } if file == "TR2EN.txt"));
        std::fs::remove_dir_all(cache).ok();
    }

    #[tokio::test]
    async fn corrupt_archives_are_rejected() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET);
                then.status(200).body(b"PK\x03\x04truncated".to_vec());
            })
            .await;

        let cache = scratch_dir();
        let config = corpus_config(server.base_url(), None);
        let resolver = DatasetResolver::with_cache_root(&config, &cache).unwrap();
        let error = resolver.resolve().await.unwrap_err();
        assert!(matches!(error, CorpusError::Archive { .. }));
        std::fs::remove_dir_all(cache).ok();
    }

    #[tokio::test]
    async fn resolve_surfaces_http_errors() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET);
                then.status(404).body("missing");
            })
            .await;

        let cache = scratch_dir();
        let config = corpus_config(server.base_url(), None);
        let resolver = DatasetResolver::with_cache_root(&config, &cache).unwrap();
        let error = resolver.resolve().await.unwrap_err();
        assert!(
            matches!(error, CorpusError::DownloadStatus { status, .. } if status.as_u16() == 404)
        );
        std::fs::remove_dir_all(cache).ok();
    }
}
