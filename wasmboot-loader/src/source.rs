// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Where module bytes come from.
//!
//! A [`ByteSource`] is opened once per load and yields a [`ResourceStream`]
//! of chunks. Sources that cannot hand out bytes incrementally report it
//! through [`ByteSource::supports_streaming`], which selects the buffered
//! compile strategy.

use std::{
    fmt,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use reqwest::Url;
use tokio::io::AsyncReadExt;
use wasmboot_error::{codes, Error, Result};

/// Chunk size used when none is configured
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Prefix naming an in-memory resource
const MEMORY_SCHEME: &str = "memory:";

/// A resolved resource location
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceLocation {
    /// An `http` or `https` URL
    Http(Url),
    /// A local file
    File(PathBuf),
    /// Bytes held in memory, identified by name
    Memory(String),
}

fn invalid_location(text: &str, reason: impl fmt::Display) -> Error {
    Error::fetch_error(
        codes::INVALID_RESOURCE_LOCATION,
        format!("invalid resource location `{text}`: {reason}"),
    )
}

fn has_url_scheme(text: &str) -> bool {
    ["http://", "https://", "file://"].iter().any(|scheme| text.starts_with(scheme))
}

impl ResourceLocation {
    /// Parse an absolute location
    ///
    /// URLs with the `http`, `https` or `file` scheme, `memory:<name>`, and
    /// anything else as a filesystem path.
    pub fn parse(text: &str) -> Result<Self> {
        if let Some(name) = text.strip_prefix(MEMORY_SCHEME) {
            return Ok(Self::Memory(name.to_string()));
        }
        if !has_url_scheme(text) {
            return Ok(Self::File(PathBuf::from(text)));
        }
        let url = Url::parse(text).map_err(|e| invalid_location(text, e))?;
        match url.scheme() {
            "file" => url
                .to_file_path()
                .map(Self::File)
                .map_err(|()| invalid_location(text, "not a local file path")),
            _ => Ok(Self::Http(url)),
        }
    }

    /// Resolve `resource` against an optional base directory or URL
    ///
    /// Absolute resources ignore the base. A base URL is treated as a
    /// directory even without a trailing slash.
    pub fn resolve(resource: &str, base: Option<&str>) -> Result<Self> {
        let absolute = has_url_scheme(resource)
            || resource.starts_with(MEMORY_SCHEME)
            || Path::new(resource).is_absolute();
        let Some(base) = base.filter(|_| !absolute) else {
            return Self::parse(resource);
        };

        match Self::parse(base)? {
            Self::Http(mut url) => {
                if !url.path().ends_with('/') {
                    let path = format!("{}/", url.path());
                    url.set_path(&path);
                }
                url.join(resource).map(Self::Http).map_err(|e| invalid_location(resource, e))
            }
            Self::File(dir) => Ok(Self::File(dir.join(resource))),
            Self::Memory(_) => Err(invalid_location(base, "an in-memory base cannot resolve paths")),
        }
    }
}

impl fmt::Display for ResourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(url) => write!(f, "{url}"),
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Memory(name) => write!(f, "{MEMORY_SCHEME}{name}"),
        }
    }
}

/// A stream of module bytes
#[async_trait]
pub trait ResourceStream: Send {
    /// The next chunk, or `None` at the end
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>>;

    /// Total length, if known up front
    fn size_hint(&self) -> Option<usize> {
        None
    }

    /// Drain the stream into one buffer
    async fn read_to_end(&mut self) -> Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(self.size_hint().unwrap_or_default());
        while let Some(chunk) = self.next_chunk().await? {
            bytes.extend_from_slice(&chunk);
        }
        Ok(bytes)
    }
}

/// Something a module can be fetched from
#[async_trait]
pub trait ByteSource: Send + Sync + fmt::Debug {
    /// Human readable location, used in logs and errors
    fn describe(&self) -> String;

    /// Whether bytes can be consumed before the whole resource has arrived
    fn supports_streaming(&self) -> bool {
        true
    }

    /// Start the retrieval
    async fn open(&self) -> Result<Box<dyn ResourceStream>>;
}

/// Fetches a module over HTTP(S) with a single GET
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    url:    Url,
}

impl HttpSource {
    /// Create a source for `url`
    #[must_use]
    pub fn new(client: reqwest::Client, url: Url) -> Self {
        Self { client, url }
    }

    /// The URL fetched
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }
}

struct HttpStream {
    response: reqwest::Response,
    url:      Url,
}

#[async_trait]
impl ResourceStream for HttpStream {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        let chunk = self.response.chunk().await.map_err(|e| {
            Error::fetch_error(codes::FETCH_INTERRUPTED, format!("{}: {e}", self.url))
        })?;
        Ok(chunk.map(|bytes| bytes.to_vec()))
    }

    fn size_hint(&self) -> Option<usize> {
        self.response.content_length().and_then(|len| usize::try_from(len).ok())
    }
}

#[async_trait]
impl ByteSource for HttpSource {
    fn describe(&self) -> String {
        self.url.to_string()
    }

    async fn open(&self) -> Result<Box<dyn ResourceStream>> {
        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(|e| Error::fetch_error(codes::FETCH_FAILED, format!("{}: {e}", self.url)))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::RESOURCE_NOT_FOUND.context(&self.url));
        }
        if !status.is_success() {
            return Err(Error::fetch_error(
                codes::FETCH_STATUS,
                format!("{}: server responded {status}", self.url),
            ));
        }
        tracing::debug!(url = %self.url, content_length = ?response.content_length(), "Fetching module");
        Ok(Box::new(HttpStream { response, url: self.url.clone() }))
    }
}

/// Reads a module from the local filesystem
#[derive(Debug, Clone)]
pub struct FileSource {
    path:       PathBuf,
    chunk_size: usize,
}

impl FileSource {
    /// Create a source for `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), chunk_size: DEFAULT_CHUNK_SIZE }
    }

    /// Read in chunks of `chunk_size` bytes
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// The file read
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

struct FileStream {
    file:       tokio::fs::File,
    chunk_size: usize,
    size:       Option<usize>,
}

#[async_trait]
impl ResourceStream for FileStream {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        let mut chunk = vec![0; self.chunk_size];
        let read = self.file.read(&mut chunk).await?;
        if read == 0 {
            return Ok(None);
        }
        chunk.truncate(read);
        Ok(Some(chunk))
    }

    fn size_hint(&self) -> Option<usize> {
        self.size
    }
}

#[async_trait]
impl ByteSource for FileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn open(&self) -> Result<Box<dyn ResourceStream>> {
        let file = tokio::fs::File::open(&self.path)
            .await
            .map_err(|e| Error::from(e).context(self.path.display()))?;
        let size = file
            .metadata()
            .await
            .ok()
            .and_then(|metadata| usize::try_from(metadata.len()).ok());
        Ok(Box::new(FileStream { file, chunk_size: self.chunk_size, size }))
    }
}

/// Serves a module from bytes already in memory
///
/// Counts how often it is opened and how many chunks it handed out, which
/// lets callers confirm a module was fetched exactly once.
#[derive(Debug, Clone)]
pub struct MemorySource {
    name:          String,
    bytes:         Arc<[u8]>,
    chunk_size:    usize,
    streaming:     bool,
    opens:         Arc<AtomicUsize>,
    chunks_served: Arc<AtomicUsize>,
}

impl MemorySource {
    /// Create a source named `name` holding `bytes`
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        let bytes: Vec<u8> = bytes.into();
        Self {
            name:          name.into(),
            bytes:         Arc::from(bytes),
            chunk_size:    DEFAULT_CHUNK_SIZE,
            streaming:     true,
            opens:         Arc::new(AtomicUsize::new(0)),
            chunks_served: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Hand out chunks of `chunk_size` bytes
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Report that the source cannot stream
    #[must_use]
    pub fn non_streaming(mut self) -> Self {
        self.streaming = false;
        self
    }

    /// Number of times the source was opened
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Number of chunks handed out over all opens
    #[must_use]
    pub fn chunks_served(&self) -> usize {
        self.chunks_served.load(Ordering::SeqCst)
    }

    /// Length of the held bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the held bytes are empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

struct MemoryStream {
    bytes:         Arc<[u8]>,
    offset:        usize,
    chunk_size:    usize,
    chunks_served: Arc<AtomicUsize>,
}

#[async_trait]
impl ResourceStream for MemoryStream {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        if self.offset >= self.bytes.len() {
            return Ok(None);
        }
        let end = (self.offset + self.chunk_size).min(self.bytes.len());
        let chunk = self.bytes[self.offset..end].to_vec();
        self.offset = end;
        self.chunks_served.fetch_add(1, Ordering::SeqCst);
        Ok(Some(chunk))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.bytes.len())
    }
}

#[async_trait]
impl ByteSource for MemorySource {
    fn describe(&self) -> String {
        ResourceLocation::Memory(self.name.clone()).to_string()
    }

    fn supports_streaming(&self) -> bool {
        self.streaming
    }

    async fn open(&self) -> Result<Box<dyn ResourceStream>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryStream {
            bytes:         Arc::clone(&self.bytes),
            offset:        0,
            chunk_size:    self.chunk_size,
            chunks_served: Arc::clone(&self.chunks_served),
        }))
    }
}

/// Build the source for a resolved location
///
/// # Errors
///
/// In-memory locations have no bytes behind them here; supply a
/// [`MemorySource`] directly instead.
pub fn open_source(
    location: &ResourceLocation,
    client: &reqwest::Client,
    chunk_size: usize,
) -> Result<Box<dyn ByteSource>> {
    match location {
        ResourceLocation::Http(url) => Ok(Box::new(HttpSource::new(client.clone(), url.clone()))),
        ResourceLocation::File(path) => {
            Ok(Box::new(FileSource::new(path.clone()).with_chunk_size(chunk_size)))
        }
        ResourceLocation::Memory(name) => Err(invalid_location(
            &location.to_string(),
            format!("no bytes registered for in-memory resource `{name}`"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_locations() {
        assert_eq!(
            ResourceLocation::parse("https://example.com/app/main.wasm").unwrap(),
            ResourceLocation::Http(Url::parse("https://example.com/app/main.wasm").unwrap())
        );
        assert_eq!(
            ResourceLocation::parse("main.wasm").unwrap(),
            ResourceLocation::File(PathBuf::from("main.wasm"))
        );
        assert_eq!(
            ResourceLocation::parse("memory:test").unwrap(),
            ResourceLocation::Memory("test".to_string())
        );
        assert_eq!(
            ResourceLocation::parse("http://[::1").unwrap_err().code,
            codes::INVALID_RESOURCE_LOCATION
        );
    }

    #[test]
    fn test_resolve_against_url_base() {
        let location = ResourceLocation::resolve("main.wasm", Some("http://localhost:8080/app"));
        assert_eq!(location.unwrap().to_string(), "http://localhost:8080/app/main.wasm");

        let location = ResourceLocation::resolve("main.wasm", Some("http://localhost:8080/"));
        assert_eq!(location.unwrap().to_string(), "http://localhost:8080/main.wasm");
    }

    #[test]
    fn test_resolve_against_dir_base() {
        let location = ResourceLocation::resolve("main.wasm", Some("/srv/plugin")).unwrap();
        assert_eq!(location, ResourceLocation::File(PathBuf::from("/srv/plugin/main.wasm")));
    }

    #[test]
    fn test_absolute_resource_ignores_base() {
        let location =
            ResourceLocation::resolve("https://cdn.example.com/m.wasm", Some("/srv")).unwrap();
        assert_eq!(location.to_string(), "https://cdn.example.com/m.wasm");
        assert!(ResourceLocation::resolve("main.wasm", Some("memory:x")).is_err());
    }

    #[tokio::test]
    async fn test_memory_source_chunks() {
        let source = MemorySource::new("bytes", b"abcdefg".to_vec()).with_chunk_size(3);
        let mut stream = source.open().await.unwrap();

        assert_eq!(stream.size_hint(), Some(7));
        assert_eq!(stream.next_chunk().await.unwrap(), Some(b"abc".to_vec()));
        assert_eq!(stream.read_to_end().await.unwrap(), b"defg".to_vec());
        assert_eq!(stream.next_chunk().await.unwrap(), None);
        assert_eq!(source.open_count(), 1);
        assert_eq!(source.chunks_served(), 3);
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let source = FileSource::new("/definitely/not/here.wasm");
        let err = source.open().await.err().expect("expected open to fail");
        assert_eq!(err.code, codes::RESOURCE_NOT_FOUND);
        assert!(err.message.contains("here.wasm"));
    }

    #[test]
    fn test_memory_location_cannot_be_opened() {
        let client = reqwest::Client::new();
        let err = open_source(&ResourceLocation::Memory("m".into()), &client, 16).unwrap_err();
        assert_eq!(err.code, codes::INVALID_RESOURCE_LOCATION);
    }
}
