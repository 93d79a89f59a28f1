//! The `webExtension` domain.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::identifiers::ExtensionId;
use crate::protocol::{EmptyResult, bidi_commands};

bidi_commands! {
    /// `webExtension.*` commands.
    pub enum WebExtensionCommand {
        Install(InstallParameters) = "webExtension.install",
        Uninstall(UninstallParameters) = "webExtension.uninstall",
    }
}

/// Where the remote end reads the extension from.
///
/// Paths are resolved on the browser's host, not the client's.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ExtensionData {
    /// Unpacked extension directory.
    Path { path: String },
    /// Packed `.xpi`/`.zip`/`.crx` file.
    ArchivePath { path: String },
    /// Packed archive sent inline.
    Base64 { value: String },
}

impl ExtensionData {
    /// Sends a packed archive inline, base64-encoded.
    #[must_use]
    pub fn from_bytes(archive: &[u8]) -> Self {
        Self::Base64 {
            value: BASE64.encode(archive),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallParameters {
    pub extension_data: ExtensionData,
}

#[derive(Debug, Clone, Serialize)]
pub struct UninstallParameters {
    pub extension: ExtensionId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstallResult {
    pub extension: ExtensionId,
}

facade! {
    /// `webExtension.*` façade.
    pub struct WebExtensionModule;
    commands: WebExtensionCommand;
}

impl WebExtensionModule {
    /// Installs an extension and returns its id.
    pub async fn install(&self, extension_data: ExtensionData) -> Result<ExtensionId> {
        let result: InstallResult = self
            .execute(WebExtensionCommand::Install(InstallParameters {
                extension_data,
            }))
            .await?;
        debug!(extension = %result.extension, "Extension installed");
        Ok(result.extension)
    }

    /// Uninstalls an extension installed in this session.
    pub async fn uninstall(&self, extension: ExtensionId) -> Result<()> {
        debug!(extension = %extension, "Uninstalling extension");
        let _: EmptyResult = self
            .execute(WebExtensionCommand::Uninstall(UninstallParameters {
                extension,
            }))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::modules::testing::{connect, respond};

    #[test]
    fn test_extension_data_shapes() {
        assert_eq!(
            serde_json::to_value(ExtensionData::ArchivePath {
                path: "/tmp/a.xpi".to_owned()
            })
            .expect("encode"),
            json!({"type": "archivePath", "path": "/tmp/a.xpi"})
        );
        assert_eq!(
            serde_json::to_value(ExtensionData::from_bytes(b"PK")).expect("encode"),
            json!({"type": "base64", "value": "UEs="})
        );
    }

    #[tokio::test]
    async fn test_install_and_uninstall() {
        let (bidi, mut peer) = connect();
        let extensions = bidi.web_extension();

        let data = ExtensionData::Path {
            path: "/ext".to_owned(),
        };
        let (result, request) = tokio::join!(
            extensions.install(data),
            respond(&mut peer, json!({"extension": "ext@example"}))
        );
        let id = result.expect("install");
        assert_eq!(id, ExtensionId::new("ext@example"));
        assert_eq!(
            request["params"],
            json!({"extensionData": {"type": "path", "path": "/ext"}})
        );

        let (result, request) = tokio::join!(
            extensions.uninstall(id),
            respond(&mut peer, json!({}))
        );
        result.expect("uninstall");
        assert_eq!(request["method"], "webExtension.uninstall");
    }

    #[tokio::test]
    async fn test_install_error_is_protocol_error() {
        let (bidi, mut peer) = connect();
        let extensions = bidi.web_extension();

        let (result, _) = tokio::join!(
            extensions.install(ExtensionData::Path {
                path: "/missing".to_owned()
            }),
            async {
                let request = peer.next_request().await.expect("request");
                peer.respond_error(&request["id"], "invalid web extension", "no manifest")
                    .expect("respond");
            }
        );
        let err = result.expect_err("install fails");
        assert_eq!(err.protocol_code(), Some("invalid web extension"));
    }
}
