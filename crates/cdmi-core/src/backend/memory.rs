//! In-memory backend.
//!
//! Emulates the REST surface of a Swift-style object store closely enough for
//! the gateway to run against it without a network:
//!
//! - accounts are implicit and come into existence with their first container,
//! - container listings honor `prefix` and `delimiter` and emit `subdir`
//!   entries for common prefixes,
//! - `X-Container-Meta-*` and `X-Object-Meta-*` headers are stored verbatim,
//! - `X-Copy-From` performs a server-side copy,
//! - `X-Object-Manifest` turns an object into a large object whose body is the
//!   concatenation of the segments under the manifest prefix, in key order,
//! - `Range` reads answer 206 (416 when unsatisfiable),
//! - a token-issuing auth endpoint is served at the configured auth path.
//!
//! All state lives behind a single `parking_lot::RwLock`. No lock is held
//! across an `.await`.

use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use cdmi_model::headers::{
    AUTH_TOKEN, COPY_FROM, NATIVE_CONTAINER_META_PREFIX, NATIVE_OBJECT_META_PREFIX,
    OBJECT_MANIFEST, STORAGE_TOKEN, STORAGE_URL,
};
use cdmi_model::representation::ListingEntry;
use chrono::{DateTime, Utc};
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header};
use parking_lot::RwLock;
use tracing::debug;

use super::{Backend, BackendRequest, BackendResponse};
use crate::error::GatewayError;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone)]
struct StoredObject {
    body: Bytes,
    content_type: HeaderValue,
    metadata: HeaderMap,
    manifest: Option<String>,
    last_modified: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct StoredContainer {
    metadata: HeaderMap,
    objects: BTreeMap<String, StoredObject>,
}

impl StoredContainer {
    fn bytes_used(&self) -> u64 {
        self.objects.values().map(|o| o.body.len() as u64).sum()
    }
}

#[derive(Debug, Default)]
struct Store {
    accounts: BTreeMap<String, BTreeMap<String, StoredContainer>>,
    tokens: HashMap<String, String>,
}

/// A storage path split into its account, container and object key.
#[derive(Debug, PartialEq, Eq)]
struct StoragePath<'a> {
    account: &'a str,
    container: Option<&'a str>,
    key: Option<&'a str>,
}

enum RangeOutcome {
    Full,
    Partial(usize, usize),
    Unsatisfiable,
}

/// A process-local object store.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use cdmi_core::backend::memory::InMemoryBackend;
/// use cdmi_core::backend::{Backend, BackendRequest};
///
/// # tokio_test::block_on(async {
/// let backend = InMemoryBackend::new("v1", "/auth/v1.0");
/// assert_eq!(backend.container_count("acct"), 0);
///
/// backend.send(BackendRequest::put("/v1/acct/photos")).await.unwrap();
/// backend
///     .send(BackendRequest::put("/v1/acct/photos/cat.jpg").with_body(Bytes::from("meow")))
///     .await
///     .unwrap();
/// let resp = backend
///     .send(BackendRequest::get("/v1/acct/photos/cat.jpg"))
///     .await
///     .unwrap();
/// assert_eq!(resp.body.as_ref(), b"meow");
/// assert_eq!(backend.object_keys("acct", "photos"), vec!["cat.jpg".to_owned()]);
/// # });
/// ```
#[derive(Debug)]
pub struct InMemoryBackend {
    api_prefix: String,
    auth_path: String,
    require_auth: bool,
    store: RwLock<Store>,
}

impl InMemoryBackend {
    /// Create an empty store serving `/<api_prefix>/...` and the auth endpoint
    /// at `auth_path`. Storage requests are not authenticated.
    #[must_use]
    pub fn new(api_prefix: &str, auth_path: &str) -> Self {
        Self {
            api_prefix: api_prefix.trim_matches('/').to_owned(),
            auth_path: format!("/{}", auth_path.trim_matches('/')),
            require_auth: false,
            store: RwLock::new(Store::default()),
        }
    }

    /// Reject storage requests that do not carry a token issued by the auth
    /// endpoint.
    #[must_use]
    pub fn with_required_auth(mut self, require_auth: bool) -> Self {
        self.require_auth = require_auth;
        self
    }

    /// Number of containers in an account.
    #[must_use]
    pub fn container_count(&self, account: &str) -> usize {
        self.store
            .read()
            .accounts
            .get(account)
            .map_or(0, BTreeMap::len)
    }

    /// Stored keys of a container, in order.
    #[must_use]
    pub fn object_keys(&self, account: &str, container: &str) -> Vec<String> {
        self.store
            .read()
            .accounts
            .get(account)
            .and_then(|a| a.get(container))
            .map(|c| c.objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn split_path<'a>(&self, path: &'a str) -> Option<StoragePath<'a>> {
        let trimmed = path.trim_start_matches('/');
        let rest = if self.api_prefix.is_empty() {
            trimmed
        } else {
            trimmed
                .strip_prefix(self.api_prefix.as_str())?
                .strip_prefix('/')?
        };
        let mut parts = rest.splitn(3, '/');
        let account = parts.next().filter(|s| !s.is_empty())?;
        let container = parts.next().filter(|s| !s.is_empty());
        let key = parts.next().filter(|s| !s.is_empty());
        Some(StoragePath {
            account,
            container,
            key,
        })
    }

    fn is_authorized(&self, headers: &HeaderMap) -> bool {
        if !self.require_auth {
            return true;
        }
        headers
            .get(AUTH_TOKEN)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|t| self.store.read().tokens.contains_key(t))
    }

    fn handle_auth(&self, request: &BackendRequest) -> BackendResponse {
        if request.method != Method::GET {
            return BackendResponse::status(StatusCode::METHOD_NOT_ALLOWED);
        }
        let user = ["x-auth-user", "x-storage-user"]
            .iter()
            .find_map(|name| request.headers.get(*name))
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty());
        let Some(user) = user else {
            return BackendResponse::status(StatusCode::UNAUTHORIZED);
        };
        let account = user.split_once(':').map_or(user, |(account, _)| account);
        let token = format!("AUTH_tk{}", uuid::Uuid::new_v4().simple());
        let host = request
            .headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("127.0.0.1");
        let storage_url = format!("http://{host}/{}/{account}", self.api_prefix);

        self.store
            .write()
            .tokens
            .insert(token.clone(), account.to_owned());
        debug!(account, "issued in-memory auth token");

        let mut resp = BackendResponse::status(StatusCode::OK);
        if let Ok(value) = HeaderValue::from_str(&token) {
            resp.headers
                .insert(HeaderName::from_static(AUTH_TOKEN), value.clone());
            resp.headers
                .insert(HeaderName::from_static(STORAGE_TOKEN), value);
        }
        if let Ok(value) = HeaderValue::from_str(&storage_url) {
            resp.headers
                .insert(HeaderName::from_static(STORAGE_URL), value);
        }
        resp
    }

    // -----------------------------------------------------------------------
    // Account
    // -----------------------------------------------------------------------

    fn account_get(&self, account: &str, head: bool) -> BackendResponse {
        let store = self.store.read();
        let entries: Vec<ListingEntry> = store
            .accounts
            .get(account)
            .map(|containers| {
                containers
                    .iter()
                    .map(|(name, c)| ListingEntry {
                        name: Some(name.clone()),
                        count: Some(c.objects.len() as u64),
                        bytes: Some(c.bytes_used()),
                        ..ListingEntry::default()
                    })
                    .collect()
            })
            .unwrap_or_default();
        drop(store);

        let mut resp = listing_response(&entries, head);
        resp.headers.insert(
            HeaderName::from_static("x-account-container-count"),
            HeaderValue::from(entries.len()),
        );
        resp
    }

    // -----------------------------------------------------------------------
    // Container
    // -----------------------------------------------------------------------

    fn container_get(
        &self,
        account: &str,
        container: &str,
        query: &[(String, String)],
        head: bool,
    ) -> BackendResponse {
        let store = self.store.read();
        let Some(stored) = store.accounts.get(account).and_then(|a| a.get(container)) else {
            return BackendResponse::status(StatusCode::NOT_FOUND);
        };

        let param = |name: &str| {
            query
                .iter()
                .find(|(k, _)| k == name)
                .map_or("", |(_, v)| v.as_str())
        };
        let entries = list_entries(&stored.objects, param("prefix"), param("delimiter"));

        let mut resp = listing_response(&entries, head);
        for (name, value) in &stored.metadata {
            resp.headers.insert(name.clone(), value.clone());
        }
        resp.headers.insert(
            HeaderName::from_static("x-container-object-count"),
            HeaderValue::from(stored.objects.len()),
        );
        resp.headers.insert(
            HeaderName::from_static("x-container-bytes-used"),
            HeaderValue::from(stored.bytes_used()),
        );
        resp
    }

    fn container_put(&self, account: &str, container: &str, headers: &HeaderMap) -> BackendResponse {
        let mut store = self.store.write();
        let containers = store.accounts.entry(account.to_owned()).or_default();
        let created = !containers.contains_key(container);
        let stored = containers.entry(container.to_owned()).or_default();
        merge_metadata(&mut stored.metadata, headers, NATIVE_CONTAINER_META_PREFIX);
        debug!(account, container, created, "in-memory container put");
        BackendResponse::status(if created {
            StatusCode::CREATED
        } else {
            StatusCode::ACCEPTED
        })
    }

    fn container_post(&self, account: &str, container: &str, headers: &HeaderMap) -> BackendResponse {
        let mut store = self.store.write();
        let Some(stored) = store
            .accounts
            .get_mut(account)
            .and_then(|a| a.get_mut(container))
        else {
            return BackendResponse::status(StatusCode::NOT_FOUND);
        };
        merge_metadata(&mut stored.metadata, headers, NATIVE_CONTAINER_META_PREFIX);
        BackendResponse::status(StatusCode::NO_CONTENT)
    }

    fn container_delete(&self, account: &str, container: &str) -> BackendResponse {
        let mut store = self.store.write();
        let Some(containers) = store.accounts.get_mut(account) else {
            return BackendResponse::status(StatusCode::NOT_FOUND);
        };
        match containers.get(container) {
            None => BackendResponse::status(StatusCode::NOT_FOUND),
            Some(c) if !c.objects.is_empty() => BackendResponse::status(StatusCode::CONFLICT),
            Some(_) => {
                containers.remove(container);
                BackendResponse::status(StatusCode::NO_CONTENT)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Object
    // -----------------------------------------------------------------------

    fn object_get(
        &self,
        account: &str,
        container: &str,
        key: &str,
        headers: &HeaderMap,
        head: bool,
    ) -> BackendResponse {
        let store = self.store.read();
        let Some(containers) = store.accounts.get(account) else {
            return BackendResponse::status(StatusCode::NOT_FOUND);
        };
        let Some(object) = containers.get(container).and_then(|c| c.objects.get(key)) else {
            return BackendResponse::status(StatusCode::NOT_FOUND);
        };

        let body = match object.manifest.as_deref() {
            Some(manifest) => assemble_manifest(containers, manifest),
            None => object.body.clone(),
        };

        let mut resp = BackendResponse::status(StatusCode::OK);
        resp.headers
            .insert(header::CONTENT_TYPE, object.content_type.clone());
        for (name, value) in &object.metadata {
            resp.headers.insert(name.clone(), value.clone());
        }
        if let Some(manifest) = object
            .manifest
            .as_deref()
            .and_then(|m| HeaderValue::from_str(m).ok())
        {
            resp.headers
                .insert(HeaderName::from_static(OBJECT_MANIFEST), manifest);
        }
        if let Ok(value) = HeaderValue::from_str(&http_date(object.last_modified)) {
            resp.headers.insert(header::LAST_MODIFIED, value);
        }
        resp.headers
            .insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
        drop(store);

        let range = headers
            .get(header::RANGE)
            .and_then(|v| v.to_str().ok())
            .map_or(RangeOutcome::Full, |r| resolve_range(r, body.len()));
        match range {
            RangeOutcome::Full => {
                if !head {
                    resp.body = body;
                }
            }
            RangeOutcome::Partial(start, end) => {
                resp.status = StatusCode::PARTIAL_CONTENT;
                if let Ok(value) =
                    HeaderValue::from_str(&format!("bytes {start}-{end}/{}", body.len()))
                {
                    resp.headers.insert(header::CONTENT_RANGE, value);
                }
                if !head {
                    resp.body = body.slice(start..=end);
                }
            }
            RangeOutcome::Unsatisfiable => {
                return BackendResponse::status(StatusCode::RANGE_NOT_SATISFIABLE);
            }
        }
        resp
    }

    fn object_put(
        &self,
        account: &str,
        container: &str,
        key: &str,
        request: &BackendRequest,
    ) -> BackendResponse {
        let mut store = self.store.write();
        let Some(containers) = store.accounts.get_mut(account) else {
            return BackendResponse::status(StatusCode::NOT_FOUND);
        };
        if !containers.contains_key(container) {
            return BackendResponse::status(StatusCode::NOT_FOUND);
        }

        let request_type = request.headers.get(header::CONTENT_TYPE).cloned();
        let mut metadata = HeaderMap::new();
        let object = if let Some(source) = request
            .headers
            .get(COPY_FROM)
            .and_then(|v| v.to_str().ok())
        {
            let source = source.trim_start_matches('/');
            let Some((src_container, src_key)) = source.split_once('/') else {
                return BackendResponse::status(StatusCode::PRECONDITION_FAILED);
            };
            let Some(src) = containers
                .get(src_container)
                .and_then(|c| c.objects.get(src_key))
            else {
                return BackendResponse::status(StatusCode::NOT_FOUND);
            };
            let body = match src.manifest.as_deref() {
                Some(manifest) => assemble_manifest(containers, manifest),
                None => src.body.clone(),
            };
            metadata.clone_from(&src.metadata);
            merge_metadata(&mut metadata, &request.headers, NATIVE_OBJECT_META_PREFIX);
            StoredObject {
                body,
                content_type: request_type.unwrap_or_else(|| src.content_type.clone()),
                metadata,
                manifest: None,
                last_modified: Utc::now(),
            }
        } else {
            merge_metadata(&mut metadata, &request.headers, NATIVE_OBJECT_META_PREFIX);
            StoredObject {
                body: request.body.clone(),
                content_type: request_type
                    .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_CONTENT_TYPE)),
                metadata,
                manifest: request
                    .headers
                    .get(OBJECT_MANIFEST)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_owned),
                last_modified: Utc::now(),
            }
        };

        debug!(
            account,
            container,
            key,
            bytes = object.body.len(),
            manifest = ?object.manifest,
            "in-memory object put"
        );
        if let Some(stored) = containers.get_mut(container) {
            stored.objects.insert(key.to_owned(), object);
        }
        BackendResponse::status(StatusCode::CREATED)
    }

    fn object_post(
        &self,
        account: &str,
        container: &str,
        key: &str,
        headers: &HeaderMap,
    ) -> BackendResponse {
        let mut store = self.store.write();
        let Some(object) = store
            .accounts
            .get_mut(account)
            .and_then(|a| a.get_mut(container))
            .and_then(|c| c.objects.get_mut(key))
        else {
            return BackendResponse::status(StatusCode::NOT_FOUND);
        };
        object.metadata.clear();
        merge_metadata(&mut object.metadata, headers, NATIVE_OBJECT_META_PREFIX);
        BackendResponse::status(StatusCode::ACCEPTED)
    }

    fn object_delete(&self, account: &str, container: &str, key: &str) -> BackendResponse {
        let mut store = self.store.write();
        let removed = store
            .accounts
            .get_mut(account)
            .and_then(|a| a.get_mut(container))
            .and_then(|c| c.objects.remove(key));
        if removed.is_some() {
            BackendResponse::status(StatusCode::NO_CONTENT)
        } else {
            BackendResponse::status(StatusCode::NOT_FOUND)
        }
    }
}

#[async_trait]
impl Backend for InMemoryBackend {
    async fn send(&self, request: BackendRequest) -> Result<BackendResponse, GatewayError> {
        debug!(method = %request.method, path = %request.path, "in-memory backend request");

        if request.path.trim_end_matches('/') == self.auth_path {
            return Ok(self.handle_auth(&request));
        }
        let Some(path) = self.split_path(&request.path) else {
            return Ok(BackendResponse::status(StatusCode::NOT_FOUND));
        };
        if !self.is_authorized(&request.headers) {
            return Ok(BackendResponse::status(StatusCode::UNAUTHORIZED));
        }

        let head = request.method == Method::HEAD;
        let resp = match (&request.method, path.container, path.key) {
            (&Method::GET | &Method::HEAD, None, _) => self.account_get(path.account, head),
            (&Method::GET | &Method::HEAD, Some(c), None) => {
                self.container_get(path.account, c, &request.query, head)
            }
            (&Method::GET | &Method::HEAD, Some(c), Some(k)) => {
                self.object_get(path.account, c, k, &request.headers, head)
            }
            (&Method::PUT, Some(c), None) => self.container_put(path.account, c, &request.headers),
            (&Method::PUT, Some(c), Some(k)) => self.object_put(path.account, c, k, &request),
            (&Method::POST, Some(c), None) => {
                self.container_post(path.account, c, &request.headers)
            }
            (&Method::POST, Some(c), Some(k)) => {
                self.object_post(path.account, c, k, &request.headers)
            }
            (&Method::DELETE, Some(c), None) => self.container_delete(path.account, c),
            (&Method::DELETE, Some(c), Some(k)) => self.object_delete(path.account, c, k),
            _ => BackendResponse::status(StatusCode::METHOD_NOT_ALLOWED),
        };
        Ok(resp)
    }
}

/// List `objects` under `prefix`, folding keys that continue past
/// `delimiter` into one `subdir` entry per common prefix.
fn list_entries(
    objects: &BTreeMap<String, StoredObject>,
    prefix: &str,
    delimiter: &str,
) -> Vec<ListingEntry> {
    let mut entries = Vec::new();
    let mut seen_prefixes = HashSet::new();
    for (key, object) in objects.range(prefix.to_owned()..) {
        if !key.starts_with(prefix) {
            break;
        }
        if !delimiter.is_empty() {
            let after_prefix = &key[prefix.len()..];
            if let Some(pos) = after_prefix.find(delimiter) {
                let subdir = format!("{prefix}{}{delimiter}", &after_prefix[..pos]);
                if seen_prefixes.insert(subdir.clone()) {
                    entries.push(ListingEntry {
                        subdir: Some(subdir),
                        ..ListingEntry::default()
                    });
                }
                continue;
            }
        }
        entries.push(ListingEntry {
            name: Some(key.clone()),
            content_type: object.content_type.to_str().ok().map(str::to_owned),
            bytes: Some(object.body.len() as u64),
            last_modified: Some(object.last_modified.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()),
            ..ListingEntry::default()
        });
    }
    entries
}

/// A JSON listing: 200 with a body, or 204 when empty.
fn listing_response(entries: &[ListingEntry], head: bool) -> BackendResponse {
    if entries.is_empty() {
        return BackendResponse::status(StatusCode::NO_CONTENT);
    }
    let Ok(body) = serde_json::to_vec(entries) else {
        return BackendResponse::status(StatusCode::INTERNAL_SERVER_ERROR);
    };
    let mut resp = BackendResponse::status(StatusCode::OK);
    resp.headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json; charset=utf-8"),
    );
    if !head {
        resp.body = Bytes::from(body);
    }
    resp
}

/// Concatenate the segments named by a `<container>/<prefix>` manifest.
fn assemble_manifest(containers: &BTreeMap<String, StoredContainer>, manifest: &str) -> Bytes {
    let manifest = manifest.trim_start_matches('/');
    let (container, prefix) = manifest.split_once('/').unwrap_or((manifest, ""));
    let Some(stored) = containers.get(container) else {
        return Bytes::new();
    };
    let mut body = BytesMut::new();
    for (key, segment) in stored.objects.range(prefix.to_owned()..) {
        if !key.starts_with(prefix) {
            break;
        }
        body.extend_from_slice(&segment.body);
    }
    body.freeze()
}

/// Copy the headers under `prefix` from `source` into `target`.
fn merge_metadata(target: &mut HeaderMap, source: &HeaderMap, prefix: &str) {
    for (name, value) in source {
        if name.as_str().starts_with(prefix) {
            target.insert(name.clone(), value.clone());
        }
    }
}

fn resolve_range(spec: &str, len: usize) -> RangeOutcome {
    let Some((start, end)) = spec
        .trim()
        .strip_prefix("bytes=")
        .and_then(|r| r.split_once('-'))
    else {
        return RangeOutcome::Full;
    };
    let (start, end) = (start.trim(), end.trim());

    if start.is_empty() {
        let Ok(suffix) = end.parse::<usize>() else {
            return RangeOutcome::Full;
        };
        if suffix == 0 || len == 0 {
            return RangeOutcome::Unsatisfiable;
        }
        return RangeOutcome::Partial(len - suffix.min(len), len - 1);
    }

    let Ok(start) = start.parse::<usize>() else {
        return RangeOutcome::Full;
    };
    if start >= len {
        return RangeOutcome::Unsatisfiable;
    }
    let end = if end.is_empty() {
        len - 1
    } else {
        match end.parse::<usize>() {
            Ok(end) if end >= start => end.min(len - 1),
            Ok(_) => return RangeOutcome::Unsatisfiable,
            Err(_) => return RangeOutcome::Full,
        }
    };
    RangeOutcome::Partial(start, end)
}

fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
