//! Static website hosting.
//!
//! A website either serves an index document (optionally with an error
//! document and routing rules) or redirects every request to another host.
//! The redirect target is written as one string, either a bare host such as
//! `example.com` or an absolute URL such as `https://example.com/docs?x=1`.
//! Absolute URLs are decomposed into host, path, query and protocol.

use std::fmt;

use ruststack_s3_model::S3ErrorCode;
use ruststack_s3_model::types::{self as wire, Protocol};
use serde::{Deserialize, Serialize};
use url::Url;

use super::{BucketConfig, FacetName, FacetSynchronizer, FacetValue, SyncContext, tolerate};
use crate::error::{ReconcileError, ReconcileResult};

/// Website hosting configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Website {
    /// Suffix served for directory requests, e.g. `index.html`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_document: Option<String>,
    /// Key served on 4xx errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_document: Option<String>,
    /// Redirect every request here instead of serving content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_all_requests_to: Option<RedirectTarget>,
    /// Conditional redirects, in API JSON shape.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub routing_rules: Vec<wire::RoutingRule>,
}

impl Website {
    /// Set the routing rules from an API-shaped JSON array.
    pub fn with_routing_rules_json(mut self, json: &str) -> ReconcileResult<Self> {
        self.routing_rules = serde_json::from_str(json).map_err(|e| {
            ReconcileError::validation(FacetName::Website, format!("invalid routing rules: {e}"))
        })?;
        Ok(self)
    }

    fn to_wire(&self) -> wire::WebsiteConfiguration {
        wire::WebsiteConfiguration {
            index_document: self
                .index_document
                .clone()
                .map(|suffix| wire::IndexDocument { suffix }),
            error_document: self
                .error_document
                .clone()
                .map(|key| wire::ErrorDocument { key }),
            redirect_all_requests_to: self
                .redirect_all_requests_to
                .as_ref()
                .map(RedirectTarget::to_wire),
            routing_rules: self.routing_rules.clone(),
        }
    }

    fn from_wire(config: wire::WebsiteConfiguration) -> Self {
        Self {
            index_document: config.index_document.map(|d| d.suffix),
            error_document: config.error_document.map(|d| d.key),
            redirect_all_requests_to: config
                .redirect_all_requests_to
                .map(RedirectTarget::from_wire),
            routing_rules: config.routing_rules,
        }
    }
}

/// Where a redirect-all website sends requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RedirectTarget {
    /// Host name.
    pub host: String,
    /// Path, including its leading slash, or empty.
    pub path: String,
    /// Query string without the `?`, if any.
    pub query: Option<String>,
    /// Protocol; `None` keeps the protocol of the original request.
    pub protocol: Option<Protocol>,
}

impl RedirectTarget {
    /// Parse a bare host or an absolute URL.
    ///
    /// ```
    /// use ruststack_s3_model::types::Protocol;
    /// use ruststack_s3_reconciler::facets::RedirectTarget;
    ///
    /// let target = RedirectTarget::parse("https://example.com/docs?lang=en").unwrap();
    /// assert_eq!(target.host, "example.com");
    /// assert_eq!(target.path, "/docs");
    /// assert_eq!(target.query.as_deref(), Some("lang=en"));
    /// assert_eq!(target.protocol, Some(Protocol::Https));
    ///
    /// let bare = RedirectTarget::parse("example.com").unwrap();
    /// assert_eq!(bare.protocol, None);
    /// ```
    pub fn parse(value: &str) -> Result<Self, String> {
        let value = value.trim();
        if value.is_empty() {
            return Err("redirect target must not be empty".to_owned());
        }

        if let Ok(url) = Url::parse(value) {
            if let Some(host) = url.host_str() {
                let protocol = match url.scheme() {
                    "http" => Protocol::Http,
                    "https" => Protocol::Https,
                    other => return Err(format!("unsupported redirect protocol {other:?}")),
                };
                let host = match url.port() {
                    Some(port) => format!("{host}:{port}"),
                    None => host.to_owned(),
                };
                let path = match url.path() {
                    "/" => String::new(),
                    path => path.to_owned(),
                };
                return Ok(Self {
                    host,
                    path,
                    query: url.query().map(str::to_owned),
                    protocol: Some(protocol),
                });
            }
        }

        Ok(Self::split_host_name(value, None))
    }

    fn split_host_name(value: &str, protocol: Option<Protocol>) -> Self {
        let (rest, query) = match value.split_once('?') {
            Some((rest, query)) => (rest, Some(query.to_owned())),
            None => (value, None),
        };
        let (host, path) = match rest.find('/') {
            Some(i) => (&rest[..i], &rest[i..]),
            None => (rest, ""),
        };
        Self {
            host: host.to_owned(),
            path: path.to_owned(),
            query,
            protocol,
        }
    }

    /// The host name as the API carries it: host, path and query.
    #[must_use]
    pub fn host_name(&self) -> String {
        match &self.query {
            Some(query) => format!("{}{}?{query}", self.host, self.path),
            None => format!("{}{}", self.host, self.path),
        }
    }

    fn to_wire(&self) -> wire::RedirectAllRequestsTo {
        wire::RedirectAllRequestsTo {
            host_name: self.host_name(),
            protocol: self.protocol,
        }
    }

    fn from_wire(redirect: wire::RedirectAllRequestsTo) -> Self {
        Self::split_host_name(&redirect.host_name, redirect.protocol)
    }
}

impl fmt::Display for RedirectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(protocol) = self.protocol {
            write!(f, "{protocol}://")?;
        }
        f.write_str(&self.host_name())
    }
}

impl TryFrom<String> for RedirectTarget {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RedirectTarget> for String {
    fn from(target: RedirectTarget) -> Self {
        target.to_string()
    }
}

/// Synchronizes [`BucketConfig::website`].
#[derive(Debug)]
pub struct WebsiteSync;

#[async_trait::async_trait]
impl FacetSynchronizer for WebsiteSync {
    fn facet(&self) -> FacetName {
        FacetName::Website
    }

    fn validate(&self, cx: &SyncContext<'_>) -> ReconcileResult<()> {
        let Some(website) = &cx.desired.website else {
            return Ok(());
        };
        let invalid = |msg: &str| Err(ReconcileError::validation(FacetName::Website, msg));

        match &website.redirect_all_requests_to {
            Some(target) => {
                if website.index_document.is_some()
                    || website.error_document.is_some()
                    || !website.routing_rules.is_empty()
                {
                    return invalid(
                        "redirect_all_requests_to cannot be combined with other website settings",
                    );
                }
                if target.host.is_empty() {
                    return invalid("redirect target has no host");
                }
            }
            None => {
                if website.index_document.as_deref().is_none_or(str::is_empty) {
                    return invalid("index_document or redirect_all_requests_to is required");
                }
            }
        }
        Ok(())
    }

    fn unchanged(&self, old: &BucketConfig, new: &BucketConfig) -> bool {
        old.website == new.website
    }

    async fn apply(&self, cx: &SyncContext<'_>) -> ReconcileResult<()> {
        match &cx.desired.website {
            None => cx
                .api
                .delete_bucket_website(cx.bucket)
                .await
                .map_err(|e| cx.remote(FacetName::Website, "DeleteBucketWebsite", e)),
            Some(website) => {
                let config = website.to_wire();
                cx.api
                    .put_bucket_website(cx.bucket, config.clone())
                    .await
                    .map_err(|e| cx.remote_with(FacetName::Website, "PutBucketWebsite", &config, e))
            }
        }
    }

    async fn read(&self, cx: &SyncContext<'_>) -> ReconcileResult<FacetValue> {
        let config = tolerate(
            cx.api.get_bucket_website(cx.bucket).await,
            &[
                S3ErrorCode::NoSuchWebsiteConfiguration,
                S3ErrorCode::NotImplemented,
            ],
        )
        .map_err(|e| cx.remote(FacetName::Website, "GetBucketWebsite", e))?;
        Ok(FacetValue::Website(config.map(Website::from_wire)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_decompose_absolute_url() {
        let target = RedirectTarget::parse("http://example.com/").unwrap();
        assert_eq!(target.host, "example.com");
        assert_eq!(target.path, "");
        assert_eq!(target.query, None);
        assert_eq!(target.protocol, Some(Protocol::Http));
        assert_eq!(target.to_string(), "http://example.com");
    }

    #[test]
    fn test_should_round_trip_redirect_through_wire_shape() {
        for input in [
            "example.com",
            "example.com/blog",
            "https://example.com/docs?lang=en",
            "https://example.com:8443/a/b",
        ] {
            let target = RedirectTarget::parse(input).unwrap();
            let back = RedirectTarget::from_wire(target.to_wire());
            assert_eq!(back, target, "{input}");
        }
    }

    #[test]
    fn test_should_keep_bare_host_without_protocol() {
        let target = RedirectTarget::parse("example.com/blog?x=1").unwrap();
        assert_eq!(target.host, "example.com");
        assert_eq!(target.path, "/blog");
        assert_eq!(target.query.as_deref(), Some("x=1"));
        assert_eq!(target.protocol, None);
        assert_eq!(target.to_wire().host_name, "example.com/blog?x=1");
    }

    #[test]
    fn test_should_reject_unsupported_scheme() {
        assert!(RedirectTarget::parse("ftp://example.com").is_err());
        assert!(RedirectTarget::parse("  ").is_err());
    }

    #[test]
    fn test_should_parse_routing_rules_json() {
        let website = Website {
            index_document: Some("index.html".into()),
            ..Website::default()
        }
        .with_routing_rules_json(
            r#"[{"Condition":{"KeyPrefixEquals":"docs/"},"Redirect":{"ReplaceKeyPrefixWith":"documents/"}}]"#,
        )
        .unwrap();
        assert_eq!(website.routing_rules.len(), 1);
        assert!(
            Website::default()
                .with_routing_rules_json("not json")
                .is_err()
        );
    }
}
