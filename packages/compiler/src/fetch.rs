use async_trait::async_trait;
use merge_common::FileSystem;
use merge_engine::{FetchError, FetchProvider, FetchResponse};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Fetch provider for files of a site being compiled or served.
///
/// `http://` and `https://` locators are requested over the network.
/// Locators starting with `/` resolve under the site root; anything else
/// resolves relative to the directory of the file being merged.
#[derive(Clone)]
pub struct CompilerFetch {
    root_dir: PathBuf,
    local_file: PathBuf,
    fs: Arc<dyn FileSystem>,
    http: reqwest::Client,
}

impl CompilerFetch {
    pub fn new(
        root_dir: impl Into<PathBuf>,
        local_file: impl Into<PathBuf>,
        fs: Arc<dyn FileSystem>,
        http: reqwest::Client,
    ) -> Self {
        Self {
            root_dir: root_dir.into(),
            local_file: local_file.into(),
            fs,
            http,
        }
    }

    /// File a local locator refers to, or `None` when `..` segments climb
    /// above the site root
    pub fn resolve_local(&self, locator: &str) -> Option<PathBuf> {
        let (base, relative) = match locator.strip_prefix('/') {
            Some(rooted) => (PathBuf::new(), rooted),
            None => {
                let page_dir = self.local_file.parent().unwrap_or_else(|| Path::new(""));
                let base = page_dir.strip_prefix(&self.root_dir).ok()?.to_path_buf();
                (base, locator)
            }
        };

        let mut resolved = base;
        for component in Path::new(relative).components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                Component::ParentDir => {
                    if !resolved.pop() {
                        return None;
                    }
                }
                Component::RootDir | Component::Prefix(_) => return None,
            }
        }
        Some(self.root_dir.join(resolved))
    }

    async fn fetch_remote(&self, locator: &str) -> Result<FetchResponse, FetchError> {
        let response = self
            .http
            .get(locator)
            .send()
            .await
            .map_err(|e| FetchError::request(locator, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                locator: locator.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::request(locator, e))?;
        Ok(FetchResponse::new(locator, body))
    }
}

fn is_remote(locator: &str) -> bool {
    locator.starts_with("http://") || locator.starts_with("https://")
}

#[async_trait]
impl FetchProvider for CompilerFetch {
    async fn fetch(&self, locator: &str) -> Result<FetchResponse, FetchError> {
        if is_remote(locator) {
            debug!(locator, "Fetching remote include");
            return self.fetch_remote(locator).await;
        }

        let path = self
            .resolve_local(locator)
            .ok_or_else(|| FetchError::OutsideRoot {
                locator: locator.to_string(),
            })?;
        debug!(locator, path = %path.display(), "Reading local include");
        match self.fs.read_to_string(&path) {
            Ok(body) => Ok(FetchResponse::new(locator, body)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(FetchError::not_found(locator)),
            Err(e) => Err(FetchError::io(locator, e)),
        }
    }
}
