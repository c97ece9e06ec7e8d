//! Document fetching for the resolution loader.
//!
//! The loader depends only on the [`SchemaClient`] trait. The default
//! implementation fetches over HTTP(S); tests and bundled meta-schemas use
//! [`PreloadedSchemaClient`]; [`MemoizingSchemaClient`] wraps either so that
//! repeated `$ref`s to one document fetch it at most once per load.

use crate::error::{DocumentFetchError, SchemaLoadError};
use skema_json::{JsonParser, JsonValue, parse_yaml};
use std::cell::RefCell;
use std::collections::HashMap;
use tracing::debug;

/// Fetches raw schema document text by URI.
pub trait SchemaClient {
    fn get(&self, uri: &str) -> Result<String, DocumentFetchError>;

    /// Fetches and parses a document. JSON is tried first; when JSON parsing
    /// fails, the text is re-read as YAML, so both formats are accepted
    /// transparently. Failures are mapped to typed loading errors carrying
    /// the offending URI.
    fn get_parsed(&self, uri: &str) -> Result<JsonValue, SchemaLoadError> {
        let text = self.get(uri)?;
        match JsonParser::new(&text).with_document_source(uri).parse() {
            Ok(value) => Ok(value),
            Err(json_error) => match parse_yaml(&text, Some(uri)) {
                Ok(value) => Ok(value),
                // report the error matching the document's declared flavor;
                // for anything else YAML was only a fallback
                Err(yaml_error) if has_yaml_extension(uri) => Err(SchemaLoadError::Yaml {
                    uri: uri.to_string(),
                    source: yaml_error,
                }),
                Err(_) => Err(SchemaLoadError::Parse {
                    uri: uri.to_string(),
                    source: json_error,
                }),
            },
        }
    }
}

fn has_yaml_extension(uri: &str) -> bool {
    let path = uri.split(['?', '#']).next().unwrap_or(uri);
    path.ends_with(".yaml") || path.ends_with(".yml")
}

/// HTTP(S) client used when nothing else is configured. Follows redirects;
/// any transport or status failure surfaces as a
/// [`DocumentFetchError::Transport`] naming the URI.
#[derive(Debug, Default)]
pub struct DefaultSchemaClient;

impl SchemaClient for DefaultSchemaClient {
    fn get(&self, uri: &str) -> Result<String, DocumentFetchError> {
        debug!(uri, "fetching schema document");
        let transport = |e: reqwest::Error| DocumentFetchError::Transport {
            uri: uri.to_string(),
            message: e.to_string(),
        };
        let response = reqwest::blocking::get(uri).map_err(transport)?;
        let response = response
            .error_for_status()
            .map_err(transport)?;
        response.text().map_err(transport)
    }
}

/// Caches fetched document text by URI. Loading is single-threaded by
/// contract, so a `RefCell` suffices.
pub struct MemoizingSchemaClient<C: SchemaClient> {
    inner: C,
    cache: RefCell<HashMap<String, String>>,
}

impl<C: SchemaClient> MemoizingSchemaClient<C> {
    pub fn new(inner: C) -> Self {
        MemoizingSchemaClient {
            inner,
            cache: RefCell::new(HashMap::new()),
        }
    }
}

impl<C: SchemaClient> SchemaClient for MemoizingSchemaClient<C> {
    fn get(&self, uri: &str) -> Result<String, DocumentFetchError> {
        if let Some(cached) = self.cache.borrow().get(uri) {
            return Ok(cached.clone());
        }
        let text = self.inner.get(uri)?;
        self.cache
            .borrow_mut()
            .insert(uri.to_string(), text.clone());
        Ok(text)
    }
}

/// In-memory URI to document-text map. Used for bundled meta-schemas and as
/// the network-free client in tests.
#[derive(Debug, Default)]
pub struct PreloadedSchemaClient {
    documents: HashMap<String, String>,
}

impl PreloadedSchemaClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, uri: impl Into<String>, text: impl Into<String>) -> Self {
        self.documents.insert(uri.into(), text.into());
        self
    }
}

impl SchemaClient for PreloadedSchemaClient {
    fn get(&self, uri: &str) -> Result<String, DocumentFetchError> {
        self.documents
            .get(uri)
            .cloned()
            .ok_or_else(|| DocumentFetchError::NotFound {
                uri: uri.to_string(),
            })
    }
}
