//! Hetzner Cloud REST client: implements the cloud API ports over `reqwest`.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::application::ports::{ActionApi, ServerApi, SshKeyApi, VolumeApi};
use crate::domain::cloud::{
    Action, ActionStatus, Created, Server, ServerSpec, SshKeyRef, SshKeySpec, Volume, VolumeSpec,
};
use crate::domain::error::HcError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Bearer-token client for the Cloud API.
pub struct HcloudClient {
    http: Client,
    endpoint: String,
    token: String,
}

impl HcloudClient {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(endpoint: &str, token: String) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("hcutils/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.endpoint)
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.http.get(self.url(path)).bearer_auth(&self.token)
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.http.post(self.url(path)).bearer_auth(&self.token)
    }

    fn delete(&self, path: &str) -> RequestBuilder {
        self.http.delete(self.url(path)).bearer_auth(&self.token)
    }

    /// Send and decode a JSON body, mapping non-2xx answers to `HcError::Api`.
    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T> {
        let resp = dispatch(req).await?;
        resp.json::<T>()
            .await
            .map_err(|e| HcError::Transport(format!("invalid response body: {e}")).into())
    }

    /// Like `send`, but a 404 becomes `None`.
    async fn send_optional<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<Option<T>> {
        match self.send(req).await {
            Ok(v) => Ok(Some(v)),
            Err(e) if e.downcast_ref::<HcError>().is_some_and(HcError::is_not_found) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

async fn dispatch(req: RequestBuilder) -> Result<reqwest::Response> {
    let resp = req
        .send()
        .await
        .map_err(|e| HcError::Transport(e.to_string()))?;
    let status = resp.status();
    tracing::debug!(url = %resp.url(), %status, "cloud api response");
    if status.is_success() {
        return Ok(resp);
    }
    let text = resp.text().await.unwrap_or_default();
    Err(api_error(status, &text).into())
}

fn api_error(status: StatusCode, body: &str) -> HcError {
    match serde_json::from_str::<wire::ErrorEnvelope>(body) {
        Ok(env) => HcError::Api {
            status: status.as_u16(),
            code: env.error.code,
            message: env.error.message,
        },
        Err(_) => HcError::Api {
            status: status.as_u16(),
            code: status
                .canonical_reason()
                .unwrap_or("unknown")
                .to_lowercase()
                .replace(' ', "_"),
            message: body.trim().to_string(),
        },
    }
}

impl ActionApi for HcloudClient {
    async fn get_action(&self, id: u64) -> Result<Action> {
        let env: wire::ActionEnvelope = self.send(self.get(&format!("/actions/{id}"))).await?;
        Ok(env.action.into())
    }
}

impl SshKeyApi for HcloudClient {
    async fn create_ssh_key(&self, spec: &SshKeySpec) -> Result<SshKeyRef> {
        let body = wire::CreateSshKey {
            name: &spec.name,
            public_key: &spec.public_key,
            labels: &spec.labels,
        };
        let env: wire::SshKeyEnvelope = self.send(self.post("/ssh_keys").json(&body)).await?;
        Ok(SshKeyRef {
            id: env.ssh_key.id,
            name: env.ssh_key.name,
        })
    }

    async fn delete_ssh_key(&self, id: u64) -> Result<()> {
        dispatch(self.delete(&format!("/ssh_keys/{id}"))).await?;
        Ok(())
    }
}

impl ServerApi for HcloudClient {
    async fn create_server(&self, spec: &ServerSpec) -> Result<Created<Server>> {
        let body = wire::CreateServer {
            name: &spec.name,
            server_type: &spec.server_type,
            image: &spec.image,
            location: &spec.location,
            ssh_keys: &spec.ssh_keys,
            labels: &spec.labels,
            start_after_create: true,
        };
        let env: wire::CreateServerEnvelope = self.send(self.post("/servers").json(&body)).await?;
        Ok(Created {
            resource: env.server.into(),
            action: env.action.map(Into::into),
            next_actions: env.next_actions.into_iter().map(Into::into).collect(),
        })
    }

    async fn get_server(&self, id: u64) -> Result<Option<Server>> {
        let env: Option<wire::ServerEnvelope> =
            self.send_optional(self.get(&format!("/servers/{id}"))).await?;
        Ok(env.map(|e| e.server.into()))
    }

    async fn delete_server(&self, id: u64) -> Result<Action> {
        let env: wire::ActionEnvelope = self.send(self.delete(&format!("/servers/{id}"))).await?;
        Ok(env.action.into())
    }
}

impl VolumeApi for HcloudClient {
    async fn get_volume(&self, id_or_name: &str) -> Result<Option<Volume>> {
        if let Ok(id) = id_or_name.parse::<u64>() {
            let env: Option<wire::VolumeEnvelope> =
                self.send_optional(self.get(&format!("/volumes/{id}"))).await?;
            if let Some(env) = env {
                return Ok(Some(env.volume.into()));
            }
        }
        let list: wire::VolumeList = self
            .send(self.get("/volumes").query(&[("name", id_or_name)]))
            .await?;
        Ok(list.volumes.into_iter().next().map(Into::into))
    }

    async fn create_volume(&self, spec: &VolumeSpec) -> Result<Created<Volume>> {
        let body = wire::CreateVolume {
            name: &spec.name,
            size: spec.size_gb,
            server: spec.server,
            automount: spec.automount,
            format: &spec.format,
            labels: &spec.labels,
        };
        let env: wire::CreateVolumeEnvelope = self.send(self.post("/volumes").json(&body)).await?;
        Ok(Created {
            resource: env.volume.into(),
            action: env.action.map(Into::into),
            next_actions: env.next_actions.into_iter().map(Into::into).collect(),
        })
    }

    async fn attach_volume(&self, volume: u64, server: u64, automount: bool) -> Result<Action> {
        let body = wire::AttachVolume { server, automount };
        let env: wire::ActionEnvelope = self
            .send(self.post(&format!("/volumes/{volume}/actions/attach")).json(&body))
            .await?;
        Ok(env.action.into())
    }

    async fn detach_volume(&self, volume: u64) -> Result<Action> {
        let env: wire::ActionEnvelope = self
            .send(self.post(&format!("/volumes/{volume}/actions/detach")))
            .await?;
        Ok(env.action.into())
    }
}

// ── Wire format ──────────────────────────────────────────────────────────────

mod wire {
    use super::{
        Action, ActionStatus, BTreeMap, Deserialize, Serialize, Server, Volume,
    };

    #[derive(Debug, Deserialize)]
    pub struct ErrorEnvelope {
        pub error: ApiError,
    }

    #[derive(Debug, Deserialize)]
    pub struct ApiError {
        pub code: String,
        pub message: String,
    }

    #[derive(Debug, Deserialize)]
    pub struct ActionEnvelope {
        pub action: WireAction,
    }

    #[derive(Debug, Deserialize)]
    pub struct WireAction {
        pub id: u64,
        pub command: String,
        pub status: String,
        #[serde(default)]
        pub error: Option<ApiError>,
    }

    impl From<WireAction> for Action {
        fn from(a: WireAction) -> Self {
            let status = match a.status.as_str() {
                "success" => ActionStatus::Success,
                "error" => ActionStatus::Error,
                "pending" => ActionStatus::Pending,
                _ => ActionStatus::Running,
            };
            Self {
                id: a.id,
                command: a.command,
                status,
                error_message: a.error.map(|e| format!("{} ({})", e.message, e.code)),
            }
        }
    }

    #[derive(Debug, Deserialize)]
    pub struct SshKeyEnvelope {
        pub ssh_key: WireSshKey,
    }

    #[derive(Debug, Deserialize)]
    pub struct WireSshKey {
        pub id: u64,
        pub name: String,
    }

    #[derive(Debug, Serialize)]
    pub struct CreateSshKey<'a> {
        pub name: &'a str,
        pub public_key: &'a str,
        pub labels: &'a BTreeMap<String, String>,
    }

    #[derive(Debug, Serialize)]
    pub struct CreateServer<'a> {
        pub name: &'a str,
        pub server_type: &'a str,
        pub image: &'a str,
        pub location: &'a str,
        pub ssh_keys: &'a [u64],
        pub labels: &'a BTreeMap<String, String>,
        pub start_after_create: bool,
    }

    #[derive(Debug, Deserialize)]
    pub struct CreateServerEnvelope {
        pub server: WireServer,
        #[serde(default)]
        pub action: Option<WireAction>,
        #[serde(default)]
        pub next_actions: Vec<WireAction>,
    }

    #[derive(Debug, Deserialize)]
    pub struct ServerEnvelope {
        pub server: WireServer,
    }

    #[derive(Debug, Deserialize)]
    pub struct WireServer {
        pub id: u64,
        pub name: String,
        #[serde(default)]
        pub public_net: Option<PublicNet>,
        #[serde(default)]
        pub datacenter: Option<Datacenter>,
    }

    #[derive(Debug, Deserialize)]
    pub struct PublicNet {
        #[serde(default)]
        pub ipv4: Option<Ipv4>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Ipv4 {
        pub ip: String,
    }

    #[derive(Debug, Deserialize)]
    pub struct Datacenter {
        pub location: Location,
    }

    #[derive(Debug, Deserialize)]
    pub struct Location {
        pub name: String,
    }

    impl From<WireServer> for Server {
        fn from(s: WireServer) -> Self {
            Self {
                id: s.id,
                name: s.name,
                location: s.datacenter.map(|d| d.location.name).unwrap_or_default(),
                ipv4: s
                    .public_net
                    .and_then(|n| n.ipv4)
                    .and_then(|v4| v4.ip.parse().ok()),
            }
        }
    }

    #[derive(Debug, Deserialize)]
    pub struct VolumeEnvelope {
        pub volume: WireVolume,
    }

    #[derive(Debug, Deserialize)]
    pub struct VolumeList {
        pub volumes: Vec<WireVolume>,
    }

    #[derive(Debug, Deserialize)]
    pub struct WireVolume {
        pub id: u64,
        pub name: String,
        pub size: u32,
        pub location: Location,
        #[serde(default)]
        pub linux_device: String,
        #[serde(default)]
        pub server: Option<u64>,
    }

    impl From<WireVolume> for Volume {
        fn from(v: WireVolume) -> Self {
            Self {
                id: v.id,
                name: v.name,
                size_gb: v.size,
                location: v.location.name,
                linux_device: v.linux_device,
                server: v.server,
            }
        }
    }

    #[derive(Debug, Serialize)]
    pub struct CreateVolume<'a> {
        pub name: &'a str,
        pub size: u32,
        pub server: u64,
        pub automount: bool,
        pub format: &'a str,
        pub labels: &'a BTreeMap<String, String>,
    }

    #[derive(Debug, Deserialize)]
    pub struct CreateVolumeEnvelope {
        pub volume: WireVolume,
        #[serde(default)]
        pub action: Option<WireAction>,
        #[serde(default)]
        pub next_actions: Vec<WireAction>,
    }

    #[derive(Debug, Serialize)]
    pub struct AttachVolume {
        pub server: u64,
        pub automount: bool,
    }
}
