//! The registry of supported booru providers.
//!
//! Every provider speaks a slightly different query dialect. The differences are
//! captured by the [`Dialect`] trait, one implementation per provider, so callers
//! only ever deal with the provider-agnostic [`Provider`], [`SearchKind`] and [`SortOrder`].

use std::fmt;

use crate::api::{Params, Scalar};
use crate::config::{Config, Credentials};

/// A supported booru.
///
/// The numeric value is the ordinal accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    /// <https://danbooru.donmai.us>
    Danbooru = 0,
    /// <https://gelbooru.com>
    Gelbooru = 1,
    /// <https://konachan.com>
    Konachan = 2,
}

/// What kind of object to search for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchKind {
    /// Posts, i.e. images and their metadata.
    Post,
    /// Tags.
    Tag,
}

/// Sort order of a tag search.
///
/// The ordinal is sent to the provider as is, every provider interprets it on its own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortOrder {
    /// Newest first.
    #[default]
    Date = 0,
    /// Alphabetical.
    Name = 1,
    /// Most used first.
    Count = 2,
}

/// The names of the query parameters carrying the credentials of a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CredentialKeys {
    /// Parameter name of the api key.
    pub api_key: &'static str,
    /// Parameter name of the user identifier.
    pub user: &'static str,
}

/// The query dialect of a single provider.
pub trait Dialect: Send + Sync {
    /// The endpoint template, with one `{}` slot for the search kind segment.
    fn template(&self) -> &'static str;

    /// The segment to put into the slot of [`Self::template`].
    fn slot(&self, kind: SearchKind) -> &'static str;

    /// Returns `None` if the provider doesn't need authentication.
    fn credential_keys(&self) -> Option<CredentialKeys> {
        None
    }

    /// Picks the credential block of `config` which belongs to this provider.
    fn credentials<'a>(&self, _config: &'a Config) -> Option<&'a Credentials> {
        None
    }

    /// Add the tag pattern and the sort order under this provider's key names.
    fn tag_params(&self, params: &mut Params, pattern: &str, order: SortOrder);
}

struct Danbooru;
struct Gelbooru;
struct Konachan;

impl Dialect for Danbooru {
    fn template(&self) -> &'static str {
        "https://danbooru.donmai.us/{}.json"
    }

    fn slot(&self, kind: SearchKind) -> &'static str {
        match kind {
            SearchKind::Post => "posts",
            SearchKind::Tag => "tags",
        }
    }

    fn credential_keys(&self) -> Option<CredentialKeys> {
        // danbooru authenticates with `login`, it ignores the `user_id` gelbooru expects
        Some(CredentialKeys {
            api_key: "api_key",
            user: "login",
        })
    }

    fn credentials<'a>(&self, config: &'a Config) -> Option<&'a Credentials> {
        Some(&config.danbooru)
    }

    fn tag_params(&self, params: &mut Params, pattern: &str, order: SortOrder) {
        params.set("search[name_matches]", pattern);
        params.set("search[order]", order);
    }
}

impl Dialect for Gelbooru {
    fn template(&self) -> &'static str {
        "https://gelbooru.com/index.php?page=dapi&q=index&json=1&s={}"
    }

    fn slot(&self, kind: SearchKind) -> &'static str {
        match kind {
            SearchKind::Post => "post",
            SearchKind::Tag => "tag",
        }
    }

    fn credential_keys(&self) -> Option<CredentialKeys> {
        Some(CredentialKeys {
            api_key: "api_key",
            user: "user_id",
        })
    }

    fn credentials<'a>(&self, config: &'a Config) -> Option<&'a Credentials> {
        Some(&config.gelbooru)
    }

    fn tag_params(&self, params: &mut Params, pattern: &str, order: SortOrder) {
        // gelbooru uses SQL style wildcards, the others use `*`
        params.set("name_pattern", pattern.replace('*', "%"));
        params.set("orderby", order);
    }
}

impl Dialect for Konachan {
    fn template(&self) -> &'static str {
        "https://konachan.com/{}.json"
    }

    fn slot(&self, kind: SearchKind) -> &'static str {
        match kind {
            SearchKind::Post => "post",
            SearchKind::Tag => "tag",
        }
    }

    fn tag_params(&self, params: &mut Params, pattern: &str, order: SortOrder) {
        params.set("name", pattern);
        params.set("order", order);
    }
}

impl Provider {
    /// All providers, in ordinal order.
    pub const ALL: [Provider; 3] = [Provider::Danbooru, Provider::Gelbooru, Provider::Konachan];

    /// Returns `None` if `ordinal` doesn't name a provider.
    pub fn from_ordinal(ordinal: u8) -> Option<Self> {
        Self::ALL.get(usize::from(ordinal)).copied()
    }

    /// The query dialect of this provider.
    pub fn dialect(self) -> &'static dyn Dialect {
        match self {
            Provider::Danbooru => &Danbooru,
            Provider::Gelbooru => &Gelbooru,
            Provider::Konachan => &Konachan,
        }
    }

    /// The endpoint template with the search kind segment filled in.
    pub fn endpoint(self, kind: SearchKind) -> String {
        let dialect = self.dialect();
        dialect.template().replacen("{}", dialect.slot(kind), 1)
    }

    /// Lowercase name, as used in config tables and messages.
    pub fn name(self) -> &'static str {
        match self {
            Provider::Danbooru => "danbooru",
            Provider::Gelbooru => "gelbooru",
            Provider::Konachan => "konachan",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl SortOrder {
    /// The value sent to the provider.
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    /// Returns `None` if `ordinal` doesn't name a sort order.
    pub fn from_ordinal(ordinal: u8) -> Option<Self> {
        match ordinal {
            0 => Some(SortOrder::Date),
            1 => Some(SortOrder::Name),
            2 => Some(SortOrder::Count),
            _ => None,
        }
    }
}

impl From<SortOrder> for Scalar {
    fn from(value: SortOrder) -> Self {
        Scalar::Int(i64::from(value.ordinal()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint() {
        assert_eq!(
            Provider::Danbooru.endpoint(SearchKind::Post),
            "https://danbooru.donmai.us/posts.json"
        );
        assert_eq!(
            Provider::Danbooru.endpoint(SearchKind::Tag),
            "https://danbooru.donmai.us/tags.json"
        );
        assert_eq!(
            Provider::Gelbooru.endpoint(SearchKind::Post),
            "https://gelbooru.com/index.php?page=dapi&q=index&json=1&s=post"
        );
        assert_eq!(
            Provider::Konachan.endpoint(SearchKind::Tag),
            "https://konachan.com/tag.json"
        );
    }

    #[test]
    fn test_endpoints_are_urls() {
        for provider in Provider::ALL {
            for kind in [SearchKind::Post, SearchKind::Tag] {
                let endpoint = provider.endpoint(kind);
                assert!(url::Url::parse(&endpoint).is_ok(), "{endpoint}");
                assert!(!endpoint.contains("{}"));
            }
        }
    }

    #[test]
    fn test_from_ordinal() {
        assert_eq!(Provider::from_ordinal(0), Some(Provider::Danbooru));
        assert_eq!(Provider::from_ordinal(1), Some(Provider::Gelbooru));
        assert_eq!(Provider::from_ordinal(2), Some(Provider::Konachan));
        assert_eq!(Provider::from_ordinal(3), None);

        assert_eq!(SortOrder::from_ordinal(2), Some(SortOrder::Count));
        assert_eq!(SortOrder::from_ordinal(9), None);
        assert_eq!(SortOrder::default().ordinal(), 0);
    }

    #[test]
    fn test_user_key_per_provider() {
        let user_key = |provider: Provider| provider.dialect().credential_keys().map(|keys| keys.user);
        assert_eq!(user_key(Provider::Danbooru), Some("login"));
        assert_eq!(user_key(Provider::Gelbooru), Some("user_id"));
        assert_eq!(user_key(Provider::Konachan), None);
    }

    #[test]
    fn test_credentials_only_where_defined() {
        let config = Config::default();
        assert!(Provider::Danbooru.dialect().credential_keys().is_some());
        assert!(Provider::Gelbooru.dialect().credentials(&config).is_some());
        assert!(Provider::Konachan.dialect().credential_keys().is_none());
        assert!(Provider::Konachan.dialect().credentials(&config).is_none());
    }
}
