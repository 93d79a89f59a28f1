//! The `storage` domain: cookies, scoped by storage partition.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::identifiers::{BrowsingContextId, UserContextId};
use crate::protocol::bidi_commands;

use super::network::{BytesValue, Cookie, SameSite};

// ============================================================================
// Commands
// ============================================================================

bidi_commands! {
    /// `storage.*` commands.
    pub enum StorageCommand {
        DeleteCookies(DeleteCookiesParameters) = "storage.deleteCookies",
        GetCookies(GetCookiesParameters) = "storage.getCookies",
        SetCookie(SetCookieParameters) = "storage.setCookie",
    }
}

// ============================================================================
// Types
// ============================================================================

/// Matches cookies on every present field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CookieFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<BytesValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_only: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub same_site: Option<SameSite>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry: Option<u64>,
}

impl CookieFilter {
    /// Matches cookies named `name`.
    #[must_use]
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }
}

/// Selects the storage partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PartitionDescriptor {
    /// The partition the context's document uses.
    Context { context: BrowsingContextId },
    #[serde(rename_all = "camelCase")]
    StorageKey {
        #[serde(skip_serializing_if = "Option::is_none")]
        user_context: Option<UserContextId>,
        #[serde(skip_serializing_if = "Option::is_none")]
        source_origin: Option<String>,
    },
}

/// The partition the remote end actually used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionKey {
    #[serde(default)]
    pub user_context: Option<UserContextId>,
    #[serde(default)]
    pub source_origin: Option<String>,
}

/// A cookie to set. Unset attributes take browser defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialCookie {
    pub name: String,
    pub value: BytesValue,
    pub domain: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_only: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub same_site: Option<SameSite>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry: Option<u64>,
}

impl PartialCookie {
    /// A cookie with a text value and every optional attribute unset.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: BytesValue::text(value),
            domain: domain.into(),
            path: None,
            http_only: None,
            secure: None,
            same_site: None,
            expiry: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GetCookiesParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<CookieFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partition: Option<PartitionDescriptor>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SetCookieParameters {
    pub cookie: PartialCookie,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partition: Option<PartitionDescriptor>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DeleteCookiesParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<CookieFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partition: Option<PartitionDescriptor>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetCookiesResult {
    pub cookies: Vec<Cookie>,
    pub partition_key: PartitionKey,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartitionKeyResult {
    partition_key: PartitionKey,
}

// ============================================================================
// StorageModule
// ============================================================================

facade! {
    /// `storage.*` façade.
    pub struct StorageModule;
    commands: StorageCommand;
}

impl StorageModule {
    /// Returns cookies matching `filter` in `partition`.
    ///
    /// The result carries the partition key the remote end actually used,
    /// which may differ from the requested descriptor.
    pub async fn get_cookies(
        &self,
        filter: Option<CookieFilter>,
        partition: Option<PartitionDescriptor>,
    ) -> Result<GetCookiesResult> {
        let result: GetCookiesResult = self
            .execute(StorageCommand::GetCookies(GetCookiesParameters {
                filter,
                partition,
            }))
            .await?;
        debug!(count = result.cookies.len(), "Cookies fetched");
        Ok(result)
    }

    /// Stores `cookie` in `partition` and returns the partition key used.
    pub async fn set_cookie(
        &self,
        cookie: PartialCookie,
        partition: Option<PartitionDescriptor>,
    ) -> Result<PartitionKey> {
        debug!(name = %cookie.name, domain = %cookie.domain, "Setting cookie");
        let result: PartitionKeyResult = self
            .execute(StorageCommand::SetCookie(SetCookieParameters {
                cookie,
                partition,
            }))
            .await?;
        Ok(result.partition_key)
    }

    /// Deletes every cookie matching `filter`; all of them when `None`.
    pub async fn delete_cookies(
        &self,
        filter: Option<CookieFilter>,
        partition: Option<PartitionDescriptor>,
    ) -> Result<PartitionKey> {
        let result: PartitionKeyResult = self
            .execute(StorageCommand::DeleteCookies(DeleteCookiesParameters {
                filter,
                partition,
            }))
            .await?;
        Ok(result.partition_key)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::modules::testing::{connect, respond};

    #[test]
    fn test_partition_descriptor_shapes() {
        let context = PartitionDescriptor::Context {
            context: BrowsingContextId::new("ctx"),
        };
        assert_eq!(
            serde_json::to_value(context).expect("encode"),
            json!({"type": "context", "context": "ctx"})
        );

        let key = PartitionDescriptor::StorageKey {
            user_context: Some(UserContextId::new("u")),
            source_origin: None,
        };
        assert_eq!(
            serde_json::to_value(key).expect("encode"),
            json!({"type": "storageKey", "userContext": "u"})
        );
    }

    #[tokio::test]
    async fn test_get_cookies() {
        let (bidi, mut peer) = connect();
        let storage = bidi.storage();

        let (result, request) = tokio::join!(
            storage.get_cookies(Some(CookieFilter::name("sid")), None),
            respond(
                &mut peer,
                json!({
                    "cookies": [{
                        "name": "sid",
                        "value": {"type": "string", "value": "abc"},
                        "domain": "example.com",
                        "path": "/",
                        "size": 6,
                        "httpOnly": true,
                        "secure": true,
                        "sameSite": "lax"
                    }],
                    "partitionKey": {"sourceOrigin": "https://example.com"}
                })
            )
        );

        let result = result.expect("cookies");
        assert_eq!(request["params"], json!({"filter": {"name": "sid"}}));
        assert_eq!(result.cookies[0].same_site, SameSite::Lax);
        assert!(result.cookies[0].expiry.is_none());
        assert_eq!(
            result.partition_key.source_origin.as_deref(),
            Some("https://example.com")
        );
    }

    #[tokio::test]
    async fn test_set_and_delete_cookie() {
        let (bidi, mut peer) = connect();
        let storage = bidi.storage();

        let cookie = PartialCookie::new("a", "1", "example.com");
        let (result, request) = tokio::join!(
            storage.set_cookie(cookie, None),
            respond(&mut peer, json!({"partitionKey": {}}))
        );
        assert_eq!(result.expect("set"), PartitionKey::default());
        assert_eq!(
            request["params"]["cookie"],
            json!({"name": "a", "value": {"type": "string", "value": "1"}, "domain": "example.com"})
        );

        let (result, request) = tokio::join!(
            storage.delete_cookies(None, None),
            respond(&mut peer, json!({"partitionKey": {"userContext": "default"}}))
        );
        let key = result.expect("delete");
        assert_eq!(key.user_context, Some(UserContextId::default_context()));
        assert_eq!(request["params"], json!({}));
    }
}
