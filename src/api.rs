//! A core module for building and sending search requests to the booru APIs.
//!
//! Usually, you start with a [`QueryBuilder`], add the kind-specific parameters to the
//! [`SearchRequest`] it builds, then [`SearchRequest::send`] it to get the [`data::Record`]s.
//!
//! # Example
//!
//! ```no_run
//! use reqwest::Client;
//! use multibooru::api::QueryBuilder;
//! use multibooru::config::Config;
//! use multibooru::provider::{Provider, SearchKind};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), multibooru::api::SearchError> {
//!     let client = Client::new();
//!     let builder = QueryBuilder::new(Config::default());
//!
//!     let records = builder
//!         .build_search(Provider::Danbooru, SearchKind::Post, 10)
//!         .add_post_params("cat rating:general", false)
//!         .send(&client)
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;

use reqwest::Client;
use thiserror::Error;
use ::url::Url;

use crate::config::Config;
use crate::provider::{Provider, SearchKind, SortOrder};

use self::data::Record;

/// Errors of building and sending a search.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SearchError {
    /// The endpoint template doesn't parse as url.
    #[error("malformed endpoint template `{template}`: {source}")]
    Url {
        /// The offending template.
        template: String,
        /// Why it failed to parse.
        source: ::url::ParseError,
    },
    /// Connecting, sending or reading the body failed.
    #[error("request to {url} failed: {source}")]
    Transport {
        /// The requested url.
        url: Url,
        /// The underlying http error.
        source: reqwest::Error,
    },
    /// The body is not a JSON array of objects, e.g. an error payload of the provider.
    #[error("response of {url} is not a JSON array of objects: {source}")]
    Decode {
        /// The requested url.
        url: Url,
        /// The underlying decode error.
        source: serde_json::Error,
    },
}

/// A single query parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scalar {
    /// Sent verbatim.
    Str(String),
    /// Sent in decimal.
    Int(i64),
    /// Sent as `true` or `false`.
    Bool(bool),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Str(s) => f.write_str(s),
            Scalar::Int(i) => write!(f, "{i}"),
            Scalar::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Str(value.to_owned())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Str(value)
    }
}

macro_rules! impl_int_scalar {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Scalar {
                fn from(value: $ty) -> Self {
                    Scalar::Int(i64::from(value))
                }
            }
        )*
    };
}

impl_int_scalar!(i32, i64, u8, u32);

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

/// The query parameters of a [`SearchRequest`].
///
/// Keys are unique ignoring ASCII case: setting `Limit` replaces an existing `limit`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(BTreeMap<String, Scalar>);

impl Params {
    /// An empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to `value`, replacing any key that only differs in case.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Scalar>) {
        let key = key.into();
        self.0.retain(|existing, _| !existing.eq_ignore_ascii_case(&key));
        self.0.insert(key, value.into());
    }

    /// The value of `key`, matched exactly.
    pub fn get(&self, key: &str) -> Option<&Scalar> {
        self.0.get(key)
    }

    /// Whether `key` is set, matched exactly.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no parameter is set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Scalar)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K, V> FromIterator<(K, V)> for Params
where
    K: Into<String>,
    V: Into<Scalar>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut params = Params::new();
        for (key, value) in iter {
            params.set(key, value);
        }
        params
    }
}

/// Builds [`SearchRequest`]s with the credentials of an explicit [`Config`].
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    config: Config,
}

impl QueryBuilder {
    /// Use the credentials of `config`.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Start a search with the parameters shared by all providers.
    ///
    /// Post searches also carry the provider's credentials, if it has any.
    pub fn build_search(&self, provider: Provider, kind: SearchKind, limit: u32) -> SearchRequest {
        let mut params = Params::new();
        params.set("limit", limit);

        if kind == SearchKind::Post {
            let dialect = provider.dialect();
            if let (Some(keys), Some(credentials)) =
                (dialect.credential_keys(), dialect.credentials(&self.config))
            {
                params.set(keys.api_key, credentials.api_key.as_str());
                params.set(keys.user, credentials.login.as_str());
            }
        }

        SearchRequest {
            provider,
            kind,
            params,
        }
    }
}

/// A provider-specific search, see [`QueryBuilder::build_search`].
#[derive(Debug, Clone)]
pub struct SearchRequest {
    provider: Provider,
    kind: SearchKind,
    params: Params,
}

impl SearchRequest {
    /// Add the space separated `tags` and the random toggle of a post search.
    pub fn add_post_params(mut self, tags: &str, random: bool) -> Self {
        debug_assert_eq!(self.kind, SearchKind::Post, "post params on a tag search");
        self.params.set("tags", tags);
        self.params.set("random", random);
        self
    }

    /// Add the name pattern and the sort order of a tag search.
    ///
    /// `pattern` may use `*` as wildcard for every provider. It isn't validated,
    /// an empty pattern is sent as is.
    pub fn add_tag_params(mut self, pattern: &str, order: SortOrder) -> Self {
        debug_assert_eq!(self.kind, SearchKind::Tag, "tag params on a post search");
        self.provider
            .dialect()
            .tag_params(&mut self.params, pattern, order);
        self
    }

    /// The provider this request is sent to.
    pub fn provider(&self) -> Provider {
        self.provider
    }

    /// Whether posts or tags are searched.
    pub fn kind(&self) -> SearchKind {
        self.kind
    }

    /// The provider-specific query parameters.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// The endpoint template this request is sent to.
    pub fn endpoint(&self) -> String {
        self.provider.endpoint(self.kind)
    }

    /// The full request url.
    ///
    /// # Errors
    ///
    /// Only if the endpoint template is malformed.
    pub fn url(&self) -> Result<Url, SearchError> {
        url::encode(&self.endpoint(), &self.params)
    }

    /// Send the request and decode the response.
    ///
    /// # Errors
    ///
    /// See [`fetch`].
    pub async fn send(&self, client: &Client) -> Result<Vec<Record>, SearchError> {
        fetch(client, self.url()?).await
    }
}

/// Encoding of request urls.
pub mod url {
    use super::*;

    pub use ::url::{ParseError, Url};

    /// Merge `params` into the query of `template`.
    ///
    /// Parameters overwrite query pairs of the template with the same key, ignoring ASCII case.
    /// The resulting query is sorted by key.
    ///
    /// # Errors
    ///
    /// If `template` is not a valid url.
    pub fn encode(template: &str, params: &Params) -> Result<Url, SearchError> {
        let mut url = Url::parse(template).map_err(|source| SearchError::Url {
            template: template.to_owned(),
            source,
        })?;

        let mut pairs: BTreeMap<String, String> = url.query_pairs().into_owned().collect();
        for (key, value) in params.iter() {
            pairs.retain(|existing, _| !existing.eq_ignore_ascii_case(key));
            pairs.insert(key.to_owned(), value.to_string());
        }

        if pairs.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(&pairs);
        }
        Ok(url)
    }
}

/// The data returned by the booru APIs.
pub mod data {
    use serde::{Deserialize, Serialize};
    use serde_json::{Map, Value};

    /// One post or tag, exactly as the provider sent it.
    ///
    /// The schema differs between providers and is not normalized.
    #[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
    #[serde(transparent)]
    pub struct Record(Map<String, Value>);

    impl Record {
        /// The url of the image, `None` if it's missing or not a string.
        pub fn file_url(&self) -> Option<&str> {
            self.0.get("file_url").and_then(Value::as_str)
        }

        /// Any field, as sent by the provider.
        pub fn get(&self, key: &str) -> Option<&Value> {
            self.0.get(key)
        }

        /// All fields, sorted by key.
        pub fn as_map(&self) -> &Map<String, Value> {
            &self.0
        }

        /// Unwrap into the JSON object.
        pub fn into_inner(self) -> Map<String, Value> {
            self.0
        }
    }

    impl From<Map<String, Value>> for Record {
        fn from(value: Map<String, Value>) -> Self {
            Self(value)
        }
    }

    /// Decode a JSON array of objects.
    pub fn decode(body: &[u8]) -> serde_json::Result<Vec<Record>> {
        serde_json::from_slice(body)
    }
}

/// Send one GET request to `url` and decode the body as [`Record`]s.
///
/// The status code is not checked, error payloads of the providers are JSON objects
/// and fail to decode.
///
/// # Errors
///
/// [`SearchError::Transport`] if the request or reading the body fails,
/// [`SearchError::Decode`] if the body is not a JSON array of objects.
pub async fn fetch(client: &Client, url: Url) -> Result<Vec<Record>, SearchError> {
    tracing::debug!("GET {url}");

    let transport_err = |source: reqwest::Error| SearchError::Transport {
        url: url.clone(),
        source,
    };
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(transport_err)?;
    tracing::debug!("{} responded {}", url, response.status());
    let body = response.bytes().await.map_err(transport_err)?;

    data::decode(&body).map_err(|source| SearchError::Decode { url, source })
}
