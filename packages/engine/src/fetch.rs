use crate::error::FetchError;
use crate::value::Value;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// Content returned for a locator
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResponse {
    locator: String,
    body: String,
}

impl FetchResponse {
    pub fn new(locator: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            body: body.into(),
        }
    }

    pub fn locator(&self) -> &str {
        &self.locator
    }

    pub fn text(&self) -> &str {
        &self.body
    }

    pub fn into_text(self) -> String {
        self.body
    }

    /// Body parsed as structured data
    pub fn json(&self) -> Result<Value, FetchError> {
        Value::from_json_str(&self.body).map_err(|e| FetchError::InvalidJson {
            locator: self.locator.clone(),
            message: e.to_string(),
        })
    }
}

/// Source of included fragments and remote context.
///
/// The engine treats locators as opaque; deciding what is local, relative or
/// remote is up to the implementation. Calls may run concurrently.
#[async_trait]
pub trait FetchProvider: Send + Sync {
    async fn fetch(&self, locator: &str) -> Result<FetchResponse, FetchError>;
}

/// Turns fetched source text into markup for `merge-include-markdown`
pub trait MarkdownRenderer: Send + Sync {
    fn render(&self, source: &str) -> String;
}

/// In-memory provider keyed by exact locator. Records every call.
#[derive(Debug, Default)]
pub struct StaticFetch {
    entries: HashMap<String, String>,
    calls: Mutex<Vec<String>>,
}

impl StaticFetch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, locator: impl Into<String>, body: impl Into<String>) -> Self {
        self.insert(locator, body);
        self
    }

    pub fn insert(&mut self, locator: impl Into<String>, body: impl Into<String>) {
        self.entries.insert(locator.into(), body.into());
    }

    /// Locators requested so far, in call order
    pub fn calls(&self) -> Vec<String> {
        match self.calls.lock() {
            Ok(calls) => calls.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl FetchProvider for StaticFetch {
    async fn fetch(&self, locator: &str) -> Result<FetchResponse, FetchError> {
        match self.calls.lock() {
            Ok(mut calls) => calls.push(locator.to_string()),
            Err(poisoned) => poisoned.into_inner().push(locator.to_string()),
        }
        self.entries
            .get(locator)
            .map(|body| FetchResponse::new(locator, body.clone()))
            .ok_or_else(|| FetchError::not_found(locator))
    }
}
