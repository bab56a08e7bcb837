//! NX-API client.
//!
//! NX-API accepts JSON-wrapped CLI over `POST /ins`. Reads use
//! `cli_show_ascii` so the device returns the same text an operator would
//! see; configuration uses `cli_conf`. Several commands travel in one
//! request joined by ` ; `, and every output carries its own status code.

use super::sftp::{SftpFileTransfer, SftpSettings};
use super::{
    ConnectionError, ConnectionResult, Credentials, DeviceConnector, DeviceSession, DeviceTarget,
    NxosDevice,
};
use crate::modules::network::nxos_vrf::VrfSpec;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Default timeout for NX-API requests (seconds)
pub const NXAPI_DEFAULT_TIMEOUT: u64 = 30;

/// Default device file system for transferred and checkpoint files
pub const DEFAULT_FILE_SYSTEM: &str = "bootflash:";

const NXAPI_SUCCESS: &str = "200";

/// Tunables for NX-API sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NxApiSettings {
    /// Request timeout in seconds
    pub timeout: u64,
    /// Device file system prefix, e.g. `bootflash:`
    pub file_system: String,
    /// Verify TLS certificates when using https
    pub validate_certs: bool,
}

impl Default for NxApiSettings {
    fn default() -> Self {
        Self {
            timeout: NXAPI_DEFAULT_TIMEOUT,
            file_system: DEFAULT_FILE_SYSTEM.to_string(),
            validate_certs: true,
        }
    }
}

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestKind {
    ShowAscii,
    Configure,
}

impl RequestKind {
    fn as_str(self) -> &'static str {
        match self {
            RequestKind::ShowAscii => "cli_show_ascii",
            RequestKind::Configure => "cli_conf",
        }
    }
}

#[derive(Debug, Serialize)]
struct NxApiRequest {
    ins_api: NxApiInsApi,
}

#[derive(Debug, Serialize)]
struct NxApiInsApi {
    version: String,
    #[serde(rename = "type")]
    req_type: String,
    chunk: String,
    sid: String,
    input: String,
    output_format: String,
}

impl NxApiRequest {
    fn new(kind: RequestKind, commands: &[String]) -> Self {
        Self {
            ins_api: NxApiInsApi {
                version: "1.0".to_string(),
                req_type: kind.as_str().to_string(),
                chunk: "0".to_string(),
                sid: "1".to_string(),
                input: commands.join(" ; "),
                output_format: "json".to_string(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct NxApiResponse {
    ins_api: NxApiInsApiResponse,
}

#[derive(Debug, Deserialize)]
struct NxApiInsApiResponse {
    outputs: NxApiOutputs,
}

#[derive(Debug, Deserialize)]
struct NxApiOutputs {
    output: NxApiOutputWrapper,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NxApiOutputWrapper {
    Single(NxApiOutput),
    Multiple(Vec<NxApiOutput>),
}

/// One command's result inside an NX-API response.
#[derive(Debug, Clone, Deserialize)]
pub struct NxApiOutput {
    pub code: String,
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub body: serde_json::Value,
}

impl NxApiOutput {
    fn is_success(&self) -> bool {
        self.code == NXAPI_SUCCESS
    }

    fn into_result(self) -> ConnectionResult<NxApiOutput> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ConnectionError::ApiError {
                code: self.code,
                msg: self.msg,
            })
        }
    }

    fn body_text(&self) -> String {
        match &self.body {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

// ============================================================================
// Client
// ============================================================================

/// A session against one device's NX-API endpoint.
#[derive(Debug, Clone)]
pub struct NxApiClient {
    http: Client,
    endpoint: Url,
    host: String,
    credentials: Credentials,
    settings: NxApiSettings,
}

impl NxApiClient {
    pub fn new(
        target: &DeviceTarget,
        credentials: Credentials,
        settings: NxApiSettings,
    ) -> ConnectionResult<Self> {
        let endpoint = Url::parse(&format!(
            "{}://{}:{}/ins",
            target.transport.scheme(),
            target.host,
            target.effective_port()
        ))
        .map_err(|e| {
            ConnectionError::InvalidConfig(format!("Invalid NX-API host '{}': {}", target.host, e))
        })?;

        let http = Client::builder()
            .danger_accept_invalid_certs(!settings.validate_certs)
            .timeout(Duration::from_secs(settings.timeout))
            .build()
            .map_err(|e| {
                ConnectionError::ConnectionFailed(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            http,
            endpoint,
            host: target.host.clone(),
            credentials,
            settings,
        })
    }

    /// The `/ins` URL requests go to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn remote(&self, name: &str) -> String {
        format!("{}{}", self.settings.file_system, name)
    }

    fn map_http_error(&self, e: reqwest::Error) -> ConnectionError {
        if e.is_timeout() {
            ConnectionError::Timeout(self.settings.timeout)
        } else {
            ConnectionError::ConnectionFailed(format!("NX-API request to {} failed: {}", self.host, e))
        }
    }

    /// Send commands and return every output, successful or not.
    async fn send(
        &self,
        kind: RequestKind,
        commands: &[String],
    ) -> ConnectionResult<Vec<NxApiOutput>> {
        debug!(host = %self.host, kind = kind.as_str(), ?commands, "sending NX-API request");

        let response = self
            .http
            .post(self.endpoint.clone())
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .json(&NxApiRequest::new(kind, commands))
            .send()
            .await
            .map_err(|e| self.map_http_error(e))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ConnectionError::AuthenticationFailed(format!(
                "NX-API on {} rejected user '{}' ({})",
                self.host, self.credentials.username, status
            )));
        }

        let body = response.text().await.map_err(|e| self.map_http_error(e))?;

        // Failed commands may come back with an error status but a normal
        // ins_api body; prefer the per-command codes when they are present.
        match serde_json::from_str::<NxApiResponse>(&body) {
            Ok(parsed) => Ok(match parsed.ins_api.outputs.output {
                NxApiOutputWrapper::Single(out) => vec![out],
                NxApiOutputWrapper::Multiple(outs) => outs,
            }),
            Err(_) if !status.is_success() => Err(ConnectionError::ConnectionFailed(format!(
                "NX-API returned error status {}: {}",
                status, body
            ))),
            Err(e) => Err(ConnectionError::InvalidResponse(format!(
                "Failed to parse NX-API response: {}",
                e
            ))),
        }
    }

    /// Run one show command and return its text output.
    pub async fn show(&self, command: &str) -> ConnectionResult<String> {
        let output = self
            .send(RequestKind::ShowAscii, &[command.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ConnectionError::InvalidResponse("Empty NX-API response".to_string()))?
            .into_result()?;
        Ok(output.body_text())
    }

    /// Run configuration commands, failing on the first rejected one.
    pub async fn configure(&self, commands: &[String]) -> ConnectionResult<()> {
        for output in self.send(RequestKind::Configure, commands).await? {
            output.into_result()?;
        }
        Ok(())
    }

    /// SHA-256 of a file on the device, or `None` when it does not exist.
    pub async fn file_checksum(&self, name: &str) -> ConnectionResult<Option<String>> {
        let outputs = self
            .send(
                RequestKind::ShowAscii,
                &[format!("show file {} sha256sum", self.remote(name))],
            )
            .await?;
        let Some(output) = outputs.into_iter().next().filter(NxApiOutput::is_success) else {
            return Ok(None);
        };

        let text = output.body_text();
        text.split_whitespace()
            .find(|token| token.len() == 64 && token.chars().all(|c| c.is_ascii_hexdigit()))
            .map(|sum| Some(sum.to_ascii_lowercase()))
            .ok_or_else(|| {
                ConnectionError::InvalidResponse(format!(
                    "no sha256 digest in output for {}: {}",
                    self.remote(name),
                    text.trim()
                ))
            })
    }
}

#[async_trait]
impl NxosDevice for NxApiClient {
    fn identifier(&self) -> &str {
        &self.host
    }

    async fn fetch_vrf(&self, name: &str) -> ConnectionResult<Option<VrfSpec>> {
        let text = self.show(&format!("show running-config vrf {}", name)).await?;
        Ok(VrfSpec::from_running_config(name, &text))
    }

    async fn apply(&self, commands: &[String]) -> ConnectionResult<()> {
        if commands.is_empty() {
            return Ok(());
        }
        info!(host = %self.host, count = commands.len(), "applying configuration commands");
        self.configure(commands).await
    }

    async fn running_config(&self) -> ConnectionResult<String> {
        self.show("show running-config").await
    }

    async fn diff(&self, remote_path: &str) -> ConnectionResult<String> {
        self.show(&format!(
            "show diff rollback-patch running-config file {}",
            self.remote(remote_path)
        ))
        .await
    }

    async fn save_checkpoint(&self, label: &str) -> ConnectionResult<()> {
        if !label
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
        {
            return Err(ConnectionError::InvalidConfig(format!(
                "Invalid checkpoint name '{}': must contain only alphanumeric characters, dots, underscores, and hyphens",
                label
            )));
        }
        info!(host = %self.host, label, "saving checkpoint");
        self.configure(&[format!("checkpoint file {}", self.remote(label))])
            .await
    }

    async fn rollback_to(&self, remote_path: &str) -> ConnectionResult<bool> {
        info!(host = %self.host, file = remote_path, "rolling running-config to file");
        let outputs = self
            .send(
                RequestKind::Configure,
                &[format!("rollback running-config file {}", self.remote(remote_path))],
            )
            .await?;
        Ok(!outputs.is_empty() && outputs.iter().all(NxApiOutput::is_success))
    }
}

// ============================================================================
// Connector
// ============================================================================

/// Opens NX-API sessions, with SFTP for file transfer.
#[derive(Debug, Clone, Default)]
pub struct NxApiConnector {
    settings: NxApiSettings,
    ssh: SftpSettings,
}

impl NxApiConnector {
    pub fn new(settings: NxApiSettings, ssh: SftpSettings) -> Self {
        Self { settings, ssh }
    }
}

#[async_trait]
impl DeviceConnector for NxApiConnector {
    async fn connect(
        &self,
        target: &DeviceTarget,
        credentials: Credentials,
    ) -> ConnectionResult<DeviceSession> {
        // Fail fast on names that do not resolve.
        let resolved = tokio::net::lookup_host((target.host.as_str(), target.effective_port()))
            .await
            .map_err(|e| ConnectionError::HostNotFound(format!("{}: {}", target.host, e)))?
            .next();
        if resolved.is_none() {
            return Err(ConnectionError::HostNotFound(format!(
                "{}: no addresses",
                target.host
            )));
        }

        let client = Arc::new(NxApiClient::new(
            target,
            credentials.clone(),
            self.settings.clone(),
        )?);
        let files = SftpFileTransfer::new(
            Arc::clone(&client),
            target.host.clone(),
            credentials,
            self.settings.file_system.clone(),
            self.ssh.clone(),
        );

        debug!(host = %target.host, endpoint = %client.endpoint(), "opened NX-API session");
        Ok(DeviceSession {
            device: client,
            files: Arc::new(files),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Transport;
    use crate::modules::network::nxos_vrf::AdminState;
    use wiremock::matchers::{body_partial_json, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> NxApiClient {
        let addr = server.address();
        let target = DeviceTarget::new(addr.ip().to_string(), Transport::Http).with_port(addr.port());
        NxApiClient::new(
            &target,
            Credentials::new("admin", "secret"),
            NxApiSettings::default(),
        )
        .unwrap()
    }

    fn single_output(code: &str, msg: &str, body: serde_json::Value) -> serde_json::Value {
        serde_json::json!({
            "ins_api": {
                "type": "cli_show_ascii",
                "version": "1.0",
                "sid": "eoc",
                "outputs": {
                    "output": { "code": code, "msg": msg, "body": body }
                }
            }
        })
    }

    #[test]
    fn test_request_serialization() {
        let req = NxApiRequest::new(
            RequestKind::Configure,
            &["vrf context blue".to_string(), "shutdown".to_string()],
        );
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["ins_api"]["type"], "cli_conf");
        assert_eq!(value["ins_api"]["input"], "vrf context blue ; shutdown");
        assert_eq!(value["ins_api"]["output_format"], "json");
    }

    #[tokio::test]
    async fn test_fetch_vrf_parses_running_config() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ins"))
            .and(header_exists("authorization"))
            .and(body_partial_json(serde_json::json!({
                "ins_api": { "type": "cli_show_ascii", "input": "show running-config vrf yankees" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(single_output(
                "200",
                "Success",
                serde_json::json!(
                    "!Command: show running-config vrf yankees\n\nvrf context Yankees\n  description World Series\n  shutdown\n"
                ),
            )))
            .mount(&server)
            .await;

        let vrf = client_for(&server).fetch_vrf("yankees").await.unwrap().unwrap();
        assert_eq!(vrf.name, "Yankees");
        assert_eq!(vrf.description.as_deref(), Some("World Series"));
        assert_eq!(vrf.admin_state, Some(AdminState::Down));
    }

    #[tokio::test]
    async fn test_fetch_missing_vrf() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(single_output(
                "200",
                "Success",
                serde_json::json!("!Command: show running-config vrf nope\n\nversion 9.3(8)\n"),
            )))
            .mount(&server)
            .await;

        assert!(client_for(&server).fetch_vrf("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_configure_reports_rejected_command() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ins_api": { "outputs": { "output": [
                    { "code": "200", "msg": "Success", "body": {} },
                    { "code": "400", "msg": "Input CLI command error", "body": {} }
                ]}}
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .apply(&["vrf context blue".to_string(), "bogus".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectionError::ApiError { ref code, .. } if code == "400"));
    }

    #[tokio::test]
    async fn test_unauthorized_is_authentication_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = client_for(&server).running_config().await.unwrap_err();
        assert!(matches!(err, ConnectionError::AuthenticationFailed(_)));
    }

    #[tokio::test]
    async fn test_rollback_failure_returns_false() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({
                "ins_api": { "input": "rollback running-config file bootflash:new.cfg" }
            })))
            .respond_with(ResponseTemplate::new(500).set_body_json(single_output(
                "400",
                "Rollback failed",
                serde_json::Value::Null,
            )))
            .mount(&server)
            .await;

        assert!(!client_for(&server).rollback_to("new.cfg").await.unwrap());
    }

    #[tokio::test]
    async fn test_file_checksum() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({
                "ins_api": { "input": "show file bootflash:present.cfg sha256sum" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(single_output(
                "200",
                "Success",
                serde_json::json!(
                    "E3B0C44298FC1C149AFBF4C8996FB92427AE41E4649B934CA495991B7852B855\n"
                ),
            )))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({
                "ins_api": { "input": "show file bootflash:missing.cfg sha256sum" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(single_output(
                "400",
                "No such file or directory",
                serde_json::Value::Null,
            )))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert_eq!(
            client.file_checksum("present.cfg").await.unwrap().as_deref(),
            Some("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")
        );
        assert!(client.file_checksum("missing.cfg").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_checksum_without_digest_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(single_output(
                "200",
                "Success",
                serde_json::json!("% Invalid command\n"),
            )))
            .mount(&server)
            .await;

        let err = client_for(&server).file_checksum("odd.cfg").await.unwrap_err();
        assert!(matches!(err, ConnectionError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_connect_unresolvable_host() {
        let target = DeviceTarget::new("nexible-no-such-host.invalid", Transport::Http);
        let err = NxApiConnector::default()
            .connect(&target, Credentials::new("admin", "secret"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectionError::HostNotFound(_)));
    }

    #[tokio::test]
    async fn test_checkpoint_name_validation() {
        let server = MockServer::start().await;
        let err = client_for(&server)
            .save_checkpoint("bad name; reload")
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectionError::InvalidConfig(_)));
    }
}
