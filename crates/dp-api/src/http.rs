use crate::PortalApi;
use crate::models::Project;
use crate::models::ProjectCategory;
use crate::models::VersionLookup;
use dp_core::EffectiveColorMode;
use dp_core::PortalError;
use dp_core::PortalResult;
use dp_net::ACCEPT_JSON;
use dp_net::HttpResponse;
use dp_net::NetStack;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

/// Which lookup a 404 belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Subject {
    Project,
    Version,
    Other,
}

/// [`PortalApi`] over HTTP/1.1 against the documentation server.
#[derive(Debug, Clone)]
pub struct HttpPortalApi {
    net: NetStack,
    base: Url,
}

impl HttpPortalApi {
    pub fn new(net: NetStack, server_url: &str) -> PortalResult<Self> {
        let base = Url::parse(server_url).map_err(|_| PortalError::unparseable(server_url))?;
        Ok(Self { net, base })
    }

    fn get<T: DeserializeOwned>(&self, path: &str, subject: Subject) -> PortalResult<T> {
        let url = self
            .base
            .join(path)
            .map_err(|_| PortalError::unparseable(path))?;
        let response = self.net.fetch(url.as_str(), ACCEPT_JSON).inspect_err(|error| {
            tracing::error!(url = url.as_str(), error = %error, "api request failed");
        })?;

        if !response.status.is_success() {
            let error = error_from_response(&response, subject);
            tracing::error!(url = url.as_str(), code = error.code(), error = %error, "api error");
            return Err(error);
        }

        serde_json::from_slice(&response.body).map_err(|error| PortalError::Decode {
            message: format!("{path}: {error}"),
        })
    }
}

impl PortalApi for HttpPortalApi {
    fn list_projects(&self) -> PortalResult<Vec<Project>> {
        self.get("/api/projects/", Subject::Other)
    }

    fn list_project_categories(&self) -> PortalResult<Vec<ProjectCategory>> {
        self.get("/api/project_categories/", Subject::Other)
    }

    fn list_project_versions(&self, project: &str) -> PortalResult<Vec<String>> {
        self.get(
            &format!("/api/projects/{}/versions/", encode_segment(project)),
            Subject::Project,
        )
    }

    fn project_version(&self, project: &str, version: &str) -> PortalResult<VersionLookup> {
        self.get(
            &format!(
                "/api/projects/{}/versions/{}",
                encode_segment(project),
                encode_segment(version)
            ),
            Subject::Version,
        )
    }

    fn plugin_config(&self, name: &str) -> PortalResult<Value> {
        self.get(
            &format!("/api/plugins/{}/", encode_segment(name)),
            Subject::Other,
        )
    }

    fn app_version(&self) -> PortalResult<String> {
        self.get("/api/version/", Subject::Other)
    }

    fn logo_url(&self, mode: EffectiveColorMode) -> PortalResult<Option<String>> {
        self.get(
            &format!("/api/settings/logo_url/{}", mode.as_str()),
            Subject::Other,
        )
    }
}

fn error_from_response(response: &HttpResponse, subject: Subject) -> PortalError {
    let status = response.status.as_u16();
    let message = upstream_message(&response.body)
        .unwrap_or_else(|| format!("Request failed with status code {status}"));

    match (status, subject) {
        (404, Subject::Project) => PortalError::ProjectNotFound { message },
        (404, Subject::Version) => PortalError::VersionNotFound { message },
        _ => PortalError::Api { status, message },
    }
}

/// `message` from the body, else FastAPI's `detail` when it is a string.
fn upstream_message(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    ["message", "detail"]
        .iter()
        .find_map(|key| value.get(key).and_then(Value::as_str))
        .map(str::to_owned)
}

fn encode_segment(segment: &str) -> String {
    let mut encoded = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~') {
            encoded.push(char::from(byte));
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    encoded
}
