//! File-backed resources under a sandboxed root directory
//!
//! Nothing is indexed: every `resources/list` walks the tree again and every
//! `resources/read` resolves the URI against the canonical root.

use std::{
    fs, io,
    path::{Component, Path, PathBuf},
};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use tokio::task;
use walkdir::WalkDir;

use crate::domain::utils::{
    is_hidden, is_inline_text, is_text_family, mime_type_for, DIRECTORY_MIME_TYPE,
};
use crate::errors::{ProtocolFault, ResourceError};
use crate::mcp::strategy::{MethodStrategy, Params};

pub const URI_SCHEME: &str = "file://";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDescriptor {
    pub uri: String,
    pub name: String,
    pub description: String,
    pub mime_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ResourceMetadata>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceMetadata {
    pub size: u64,
    pub modified_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceContents {
    pub uri: String,
    pub mime_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blob: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResourceAccessor {
    root: PathBuf,
}

impl ResourceAccessor {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the root when missing and returns its canonical form.
    pub fn ensure_root(&self) -> Result<PathBuf, ResourceError> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root).map_err(|err| {
                ResourceError::RootUnavailable(format!(
                    "cannot create {}: {err}",
                    self.root.display()
                ))
            })?;
            info!(directory = %self.root.display(), "created resource directory");
        }

        if !self.root.is_dir() {
            return Err(ResourceError::RootUnavailable(format!(
                "{} is not a directory",
                self.root.display()
            )));
        }

        Ok(fs::canonicalize(&self.root)?)
    }

    /// Immediate sub-directories first, then every file below the root.
    pub fn list(&self) -> Result<Vec<ResourceDescriptor>, ResourceError> {
        let root = self.ensure_root()?;
        let mut resources = Vec::new();

        let mut directories = fs::read_dir(&root)?
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_ok_and(|kind| kind.is_dir()))
            .map(|entry| entry.path())
            .filter(|path| !is_hidden(path))
            .collect::<Vec<_>>();
        directories.sort();

        for directory in directories {
            let relative = relative_uri_path(&root, &directory);
            resources.push(ResourceDescriptor {
                uri: format!("{URI_SCHEME}{relative}/"),
                name: file_name(&directory),
                description: format!("Directory: {relative}"),
                mime_type: DIRECTORY_MIME_TYPE.to_string(),
                metadata: None,
            });
        }

        let walker = WalkDir::new(&root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !is_hidden(entry.path()));
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(error = %err, "skipping unreadable resource entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let relative = relative_uri_path(&root, path);
            let mime_type = mime_type_for(path);
            let metadata = if is_text_family(mime_type) {
                entry.metadata().ok().map(|meta| ResourceMetadata {
                    size: meta.len(),
                    modified_time: meta
                        .modified()
                        .map(|time| {
                            DateTime::<Utc>::from(time)
                                .format("%Y-%m-%d %H:%M:%S")
                                .to_string()
                        })
                        .unwrap_or_default(),
                })
            } else {
                None
            };

            resources.push(ResourceDescriptor {
                uri: format!("{URI_SCHEME}{relative}"),
                name: file_name(path),
                description: format!("File: {relative}"),
                mime_type: mime_type.to_string(),
                metadata,
            });
        }

        debug!(count = resources.len(), root = %root.display(), "listed resources");
        Ok(resources)
    }

    /// Canonicalizes `uri` and refuses anything that does not stay below the root.
    pub fn resolve(&self, uri: &str) -> Result<PathBuf, ResourceError> {
        let relative = uri
            .strip_prefix(URI_SCHEME)
            .ok_or(ResourceError::InvalidUri)?
            .trim_start_matches('/');
        let root = self.ensure_root()?;
        let candidate = root.join(relative);

        let canonical = match fs::canonicalize(&candidate) {
            Ok(canonical) => canonical,
            Err(_) if escapes_lexically(Path::new(relative)) => {
                return Err(ResourceError::AccessDenied)
            }
            Err(_) => return Err(ResourceError::NotFound),
        };

        if !canonical.starts_with(&root) {
            warn!(uri, attempted = %candidate.display(), "resource access outside root denied");
            return Err(ResourceError::AccessDenied);
        }

        Ok(canonical)
    }

    /// [`ResourceAccessor::list`] on the blocking pool.
    pub async fn scan(&self) -> Result<Vec<ResourceDescriptor>, ResourceError> {
        let accessor = self.clone();
        task::spawn_blocking(move || accessor.list())
            .await
            .map_err(io::Error::from)?
    }

    pub async fn read(&self, uri: &str) -> Result<ResourceContents, ResourceError> {
        let accessor = self.clone();
        let requested = uri.to_string();
        let path = task::spawn_blocking(move || {
            let path = accessor.resolve(&requested)?;
            if path.is_file() {
                Ok(path)
            } else {
                Err(ResourceError::NotAFile)
            }
        })
        .await
        .map_err(io::Error::from)??;

        let bytes = tokio::fs::read(&path).await?;
        let mime_type = mime_type_for(&path);

        let (text, blob) = if is_inline_text(mime_type) {
            match String::from_utf8(bytes) {
                Ok(text) => (Some(text), None),
                Err(err) => (None, Some(STANDARD.encode(err.into_bytes()))),
            }
        } else {
            (None, Some(STANDARD.encode(bytes)))
        };

        Ok(ResourceContents {
            uri: uri.to_string(),
            mime_type: mime_type.to_string(),
            text,
            blob,
        })
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn relative_uri_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// True when `..` segments climb above the starting directory.
fn escapes_lexically(relative: &Path) -> bool {
    let mut depth = 0i32;
    for component in relative.components() {
        match component {
            Component::ParentDir => {
                depth -= 1;
                if depth < 0 {
                    return true;
                }
            }
            Component::Normal(_) => depth += 1,
            Component::RootDir | Component::Prefix(_) => return true,
            Component::CurDir => {}
        }
    }
    false
}

pub fn resource_templates() -> Value {
    json!([
        {
            "uriTemplate": "file:///{path}",
            "name": "File Resource",
            "description": "Access any file in the resource directory by path",
            "mimeType": "application/octet-stream"
        },
        {
            "uriTemplate": "file:///{path}.txt",
            "name": "Text File",
            "description": "Access text files in the resource directory",
            "mimeType": "text/plain"
        },
        {
            "uriTemplate": "file:///{path}.json",
            "name": "JSON File",
            "description": "Access JSON files in the resource directory",
            "mimeType": "application/json"
        },
        {
            "uriTemplate": "file:///{path}.md",
            "name": "Markdown File",
            "description": "Access Markdown files in the resource directory",
            "mimeType": "text/markdown"
        }
    ])
}

pub struct ResourcesListStrategy {
    accessor: ResourceAccessor,
}

impl ResourcesListStrategy {
    pub fn new(accessor: ResourceAccessor) -> Self {
        Self { accessor }
    }
}

#[async_trait]
impl MethodStrategy for ResourcesListStrategy {
    fn method_name(&self) -> &'static str {
        "resources/list"
    }

    fn validate(&self, params: &Params) -> bool {
        matches!(params.get("cursor"), None | Some(Value::Null) | Some(Value::String(_)))
    }

    async fn handle(&self, _params: &Params, _id: &Value) -> Result<Value, ProtocolFault> {
        let resources = self.accessor.scan().await?;
        Ok(json!({ "resources": resources }))
    }
}

pub struct ResourcesTemplatesListStrategy;

#[async_trait]
impl MethodStrategy for ResourcesTemplatesListStrategy {
    fn method_name(&self) -> &'static str {
        "resources/templates/list"
    }

    async fn handle(&self, _params: &Params, _id: &Value) -> Result<Value, ProtocolFault> {
        Ok(json!({ "resourceTemplates": resource_templates() }))
    }
}

pub struct ResourcesReadStrategy {
    accessor: ResourceAccessor,
}

impl ResourcesReadStrategy {
    pub fn new(accessor: ResourceAccessor) -> Self {
        Self { accessor }
    }
}

#[async_trait]
impl MethodStrategy for ResourcesReadStrategy {
    fn method_name(&self) -> &'static str {
        "resources/read"
    }

    fn validate(&self, params: &Params) -> bool {
        params.get("uri").is_some_and(Value::is_string)
    }

    async fn handle(&self, params: &Params, _id: &Value) -> Result<Value, ProtocolFault> {
        let uri = params
            .get("uri")
            .and_then(Value::as_str)
            .ok_or_else(|| ProtocolFault::invalid_params("uri must be a string"))?;

        let contents = self.accessor.read(uri).await?;
        Ok(json!({ "contents": [contents] }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, ResourceAccessor) {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().join("resources");
        fs::create_dir_all(root.join("docs/nested")).expect("mkdir");
        fs::create_dir_all(root.join(".git")).expect("mkdir hidden");
        fs::write(root.join("hello.txt"), "hello world").expect("write");
        fs::write(root.join("data.json"), "{\"a\":1}").expect("write");
        fs::write(root.join("image.png"), [0x89, b'P', b'N', b'G']).expect("write");
        fs::write(root.join("docs/nested/guide.md"), "# Guide").expect("write");
        fs::write(root.join(".git/config"), "secret").expect("write");
        fs::write(dir.path().join("outside.txt"), "outside").expect("write");
        (dir, ResourceAccessor::new(root))
    }

    #[test]
    fn lists_directories_before_files() {
        let (_dir, accessor) = fixture();
        let resources = accessor.list().expect("listed");
        let uris = resources.iter().map(|r| r.uri.as_str()).collect::<Vec<_>>();

        assert_eq!(
            uris,
            vec![
                "file://docs/",
                "file://data.json",
                "file://docs/nested/guide.md",
                "file://hello.txt",
                "file://image.png",
            ]
        );
        assert_eq!(resources[0].mime_type, DIRECTORY_MIME_TYPE);
        assert_eq!(resources[0].description, "Directory: docs");
    }

    #[test]
    fn only_text_files_carry_metadata() {
        let (_dir, accessor) = fixture();
        let resources = accessor.list().expect("listed");
        let find = |uri: &str| {
            resources
                .iter()
                .find(|r| r.uri == uri)
                .cloned()
                .expect("resource present")
        };

        let text = find("file://hello.txt");
        assert_eq!(text.name, "hello.txt");
        assert_eq!(text.description, "File: hello.txt");
        let metadata = text.metadata.expect("text metadata");
        assert_eq!(metadata.size, 11);
        assert_eq!(metadata.modified_time.len(), "2024-01-01 00:00:00".len());

        assert!(find("file://data.json").metadata.is_none());
        assert!(find("file://image.png").metadata.is_none());
    }

    #[test]
    fn list_creates_missing_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        let accessor = ResourceAccessor::new(dir.path().join("fresh/resources"));

        assert!(accessor.list().expect("listed").is_empty());
        assert!(accessor.root().is_dir());
    }

    #[tokio::test]
    async fn reads_text_inline_and_binary_as_blob() {
        let (_dir, accessor) = fixture();

        let text = accessor.read("file://hello.txt").await.expect("read");
        assert_eq!(text.text.as_deref(), Some("hello world"));
        assert!(text.blob.is_none());

        let json_doc = accessor.read("file:///data.json").await.expect("read");
        assert_eq!(json_doc.mime_type, "application/json");
        assert_eq!(json_doc.text.as_deref(), Some("{\"a\":1}"));

        let image = accessor.read("file://image.png").await.expect("read");
        assert!(image.text.is_none());
        assert_eq!(image.blob.as_deref(), Some("iVBORw=="));
    }

    #[tokio::test]
    async fn rejects_traversal() {
        let (_dir, accessor) = fixture();

        for uri in ["file://../outside.txt", "file://../../etc/passwd", "file://docs/../../outside.txt"] {
            let err = accessor.read(uri).await.expect_err("outside root");
            assert!(matches!(err, ResourceError::AccessDenied), "{uri}: {err:?}");
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn rejects_symlink_escape() {
        let (dir, accessor) = fixture();
        std::os::unix::fs::symlink(dir.path().join("outside.txt"), accessor.root().join("link.txt"))
            .expect("symlink");

        let err = accessor.read("file://link.txt").await.expect_err("symlink escapes");
        assert!(matches!(err, ResourceError::AccessDenied));
    }

    #[tokio::test]
    async fn reports_missing_and_directory_targets() {
        let (_dir, accessor) = fixture();

        let missing = accessor.read("file://nope.txt").await.expect_err("missing");
        assert!(matches!(missing, ResourceError::NotFound));

        let directory = accessor.read("file://docs/").await.expect_err("directory");
        assert!(matches!(directory, ResourceError::NotAFile));

        let scheme = accessor.read("http://hello.txt").await.expect_err("scheme");
        assert!(matches!(scheme, ResourceError::InvalidUri));
    }

    #[tokio::test]
    async fn read_strategy_maps_faults_to_invalid_params() {
        let (_dir, accessor) = fixture();
        let strategy = ResourcesReadStrategy::new(accessor);
        let params = json!({ "uri": "file://../../etc/passwd" })
            .as_object()
            .cloned()
            .expect("object");

        assert!(strategy.validate(&params));
        let fault = strategy.handle(&params, &json!(1)).await.expect_err("denied");
        assert_eq!(fault.code(), crate::errors::INVALID_PARAMS);
    }

    #[test]
    fn list_validation_checks_cursor_type() {
        let (_dir, accessor) = fixture();
        let strategy = ResourcesListStrategy::new(accessor);
        let params = |value: Value| value.as_object().cloned().expect("object");

        assert!(strategy.validate(&params(json!({}))));
        assert!(strategy.validate(&params(json!({ "cursor": "abc" }))));
        assert!(!strategy.validate(&params(json!({ "cursor": 3 }))));
    }

    #[tokio::test]
    async fn list_strategy_scans_on_blocking_pool() {
        let (_dir, accessor) = fixture();
        let expected = accessor.list().expect("listed");
        let strategy = ResourcesListStrategy::new(accessor);

        let result = strategy
            .handle(&Params::new(), &json!(1))
            .await
            .expect("listed");

        assert_eq!(result["resources"], json!(expected));
        assert_eq!(result["resources"][0]["uri"], "file://docs/");
    }

    #[tokio::test]
    async fn templates_are_fixed() {
        let result = ResourcesTemplatesListStrategy
            .handle(&Params::new(), &Value::Null)
            .await
            .expect("listed");
        let templates = result["resourceTemplates"].as_array().expect("array");

        assert_eq!(templates.len(), 4);
        assert_eq!(templates[0]["uriTemplate"], "file:///{path}");
        assert_eq!(templates[3]["mimeType"], "text/markdown");
    }

    #[test]
    fn lexical_escape_detection() {
        assert!(escapes_lexically(Path::new("../x")));
        assert!(escapes_lexically(Path::new("a/../../x")));
        assert!(!escapes_lexically(Path::new("a/../x")));
        assert!(!escapes_lexically(Path::new("./a/b")));
    }
}
