//! Token challenges and Docker credential store lookup.

use std::collections::HashMap;
use std::path::PathBuf;

use base64::Engine;
use serde::Deserialize;

use crate::config::{RegistryAuth, DOCKER_HUB_API_HOST, DOCKER_HUB_HOST};

/// Key Docker uses for Docker Hub credentials.
const DOCKER_HUB_AUTH_KEY: &str = "https://index.docker.io/v1/";

/// A parsed `WWW-Authenticate: Bearer ...` challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerChallenge {
    /// Token endpoint.
    pub realm: String,
    /// Service name to request a token for.
    pub service: Option<String>,
    /// Requested scope.
    pub scope: Option<String>,
}

impl BearerChallenge {
    /// Parses a `WWW-Authenticate` header value. Returns `None` for non-bearer challenges.
    ///
    /// # Examples
    ///
    /// ```
    /// use regmaid_registry::BearerChallenge;
    ///
    /// let challenge = BearerChallenge::parse(
    ///     r#"Bearer realm="https://auth.example.com/token",service="registry",scope="repository:app:pull""#,
    /// )
    /// .unwrap();
    /// assert_eq!(challenge.realm, "https://auth.example.com/token");
    /// assert_eq!(challenge.scope.as_deref(), Some("repository:app:pull"));
    /// ```
    #[must_use]
    pub fn parse(header: &str) -> Option<Self> {
        let header = header.trim();
        let (scheme, params) = header.split_once(char::is_whitespace)?;
        if !scheme.eq_ignore_ascii_case("bearer") {
            return None;
        }

        let params = parse_params(params);
        Some(Self {
            realm: params.get("realm")?.clone(),
            service: params.get("service").cloned(),
            scope: params.get("scope").cloned(),
        })
    }
}

/// Splits `key="value",key=value` pairs, honouring commas inside quotes.
fn parse_params(input: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    let mut chars = input.chars().peekable();

    loop {
        while chars.peek().is_some_and(|c| *c == ',' || c.is_whitespace()) {
            chars.next();
        }

        let key: String = chars.by_ref().take_while(|c| *c != '=').collect();
        if key.is_empty() {
            break;
        }

        let mut value = String::new();
        if chars.peek() == Some(&'"') {
            chars.next();
            while let Some(c) = chars.next() {
                match c {
                    '\\' => value.extend(chars.next()),
                    '"' => break,
                    _ => value.push(c),
                }
            }
        } else {
            value = chars.by_ref().take_while(|c| *c != ',').collect();
        }

        params.insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
    }

    params
}

/// Response of a token service.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    /// Token, as returned by Docker Distribution token servers.
    #[serde(default)]
    pub token: Option<String>,
    /// Token, as returned by OAuth2-style servers.
    #[serde(default)]
    pub access_token: Option<String>,
}

impl TokenResponse {
    /// Returns whichever token field is set.
    #[must_use]
    pub fn into_token(self) -> Option<String> {
        self.token
            .filter(|t| !t.is_empty())
            .or(self.access_token.filter(|t| !t.is_empty()))
    }
}

/// The part of `~/.docker/config.json` regmaid reads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DockerConfigFile {
    /// Stored credentials keyed by registry.
    #[serde(default)]
    pub auths: HashMap<String, DockerAuthEntry>,

    /// Credential helper. Not supported; logged when present.
    #[serde(default, rename = "credsStore")]
    pub creds_store: Option<String>,
}

/// One entry of the `auths` map.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DockerAuthEntry {
    /// Base64 of `username:password`.
    #[serde(default)]
    pub auth: Option<String>,
    /// Plain username.
    #[serde(default)]
    pub username: Option<String>,
    /// Plain password.
    #[serde(default)]
    pub password: Option<String>,
}

impl DockerConfigFile {
    /// Reads the Docker CLI config from `$DOCKER_CONFIG` or `~/.docker`.
    ///
    /// Returns `None` if there is no readable config file.
    #[must_use]
    pub fn load() -> Option<Self> {
        let dir = std::env::var_os("DOCKER_CONFIG")
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|home| home.join(".docker")))?;
        let path = dir.join("config.json");

        let data = match std::fs::read_to_string(&path) {
            Ok(data) => data,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "no docker credentials file");
                return None;
            }
        };

        match serde_json::from_str::<Self>(&data) {
            Ok(config) => {
                if let Some(store) = &config.creds_store {
                    tracing::debug!(store = %store, "docker credential helpers are not supported");
                }
                Some(config)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to parse docker credentials file");
                None
            }
        }
    }

    /// Returns stored credentials for `host`.
    #[must_use]
    pub fn credentials_for(&self, host: &str) -> Option<RegistryAuth> {
        let candidates: Vec<String> = if host == DOCKER_HUB_HOST || host == DOCKER_HUB_API_HOST {
            vec![DOCKER_HUB_AUTH_KEY.to_string(), host.to_string()]
        } else {
            vec![
                host.to_string(),
                format!("https://{host}"),
                format!("http://{host}"),
            ]
        };

        candidates
            .iter()
            .filter_map(|key| self.auths.get(key))
            .find_map(DockerAuthEntry::to_auth)
    }
}

impl DockerAuthEntry {
    fn to_auth(&self) -> Option<RegistryAuth> {
        if let (Some(username), Some(password)) = (&self.username, &self.password) {
            return Some(RegistryAuth::basic(username, password));
        }

        let encoded = self.auth.as_deref()?;
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (username, password) = decoded.split_once(':')?;
        Some(RegistryAuth::basic(username, password))
    }
}
