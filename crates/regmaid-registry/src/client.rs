//! OCI Distribution API client for a single registry host.
//!
//! This module provides the HTTP client used to list, inspect and delete
//! manifests on OCI-compatible container registries.

use std::collections::HashMap;

use reqwest::header::{HeaderMap, ACCEPT, CONTENT_TYPE, LINK, WWW_AUTHENTICATE};
use reqwest::{Method, Response, StatusCode};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use url::Url;

use crate::auth::{BearerChallenge, TokenResponse};
use crate::config::{RegistryAuth, RegistryConfig};
use crate::error::RegistryError;
use crate::gateway::{ImageConfig, ManifestInfo};
use crate::limiter::RequestLimiter;
use crate::oci::{Catalog, ConfigBlob, Manifest, MediaType, TagList};

/// Page size requested from catalog and tag listings.
const PAGE_SIZE: usize = 1000;

/// Header carrying the manifest digest.
const DOCKER_CONTENT_DIGEST: &str = "docker-content-digest";

/// Client for one OCI-compatible registry host.
#[derive(Debug)]
pub struct RegistryClient {
    config: RegistryConfig,
    base: Url,
    http: reqwest::Client,
    limiter: RequestLimiter,
    tokens: RwLock<HashMap<String, String>>,
}

impl RegistryClient {
    /// Creates a new registry client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid, certificate material
    /// cannot be loaded, or the HTTP client cannot be created.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use regmaid_registry::{RegistryClient, RegistryConfig};
    ///
    /// let config = RegistryConfig::new("registry.example.com");
    /// let client = RegistryClient::new(config)?;
    /// # Ok::<(), regmaid_registry::RegistryError>(())
    /// ```
    pub fn new(config: RegistryConfig) -> Result<Self, RegistryError> {
        let base = Url::parse(&config.url).map_err(|_| RegistryError::InvalidUrl {
            url: config.url.clone(),
        })?;
        let http = Self::build_http_client(&config)?;
        let limiter =
            RequestLimiter::new(config.max_concurrent_requests, config.max_requests_per_second);

        Ok(Self {
            config,
            base,
            http,
            limiter,
            tokens: RwLock::new(HashMap::new()),
        })
    }

    /// Returns the registry configuration.
    #[must_use]
    pub const fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Lists every repository in the registry catalog, following pagination.
    ///
    /// # Errors
    ///
    /// Returns an error if any catalog page cannot be retrieved.
    pub async fn list_repositories(&self) -> Result<Vec<String>, RegistryError> {
        let first = self.endpoint(&format!("/v2/_catalog?n={PAGE_SIZE}"))?;
        let reference = format!("{}/_catalog", self.config.host);

        let mut repositories = Vec::new();
        let mut next = Some(first);

        while let Some(url) = next {
            let response = self.send(Method::GET, url, None, "").await?;
            let response = Self::check(response, &reference).await?;
            next = self.next_page(response.headers());

            let catalog: Catalog = response.json().await?;
            repositories.extend(catalog.repositories.unwrap_or_default());
        }

        tracing::debug!(host = %self.config.host, count = repositories.len(), "listed repositories");
        Ok(repositories)
    }

    /// Lists every tag of `repository`, following pagination.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository does not exist or a page cannot
    /// be retrieved.
    pub async fn list_tags(&self, repository: &str) -> Result<Vec<String>, RegistryError> {
        let first = self.endpoint(&format!("/v2/{repository}/tags/list?n={PAGE_SIZE}"))?;
        let reference = format!("{}/{repository}", self.config.host);

        let mut tags = Vec::new();
        let mut next = Some(first);

        while let Some(url) = next {
            let response = self.send(Method::GET, url, None, repository).await?;
            let response = Self::check(response, &reference).await?;
            next = self.next_page(response.headers());

            let list: TagList = response.json().await?;
            tags.extend(list.tags.unwrap_or_default());
        }

        Ok(tags)
    }

    /// Fetches the manifest `reference` (tag or digest) points at.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest cannot be fetched or is neither an
    /// image manifest nor an index.
    pub async fn get_manifest(
        &self,
        repository: &str,
        reference: &str,
    ) -> Result<ManifestInfo, RegistryError> {
        let url = self.endpoint(&format!("/v2/{repository}/manifests/{reference}"))?;
        let full_ref = format!("{}/{repository}:{reference}", self.config.host);
        let accept = MediaType::manifest_accept();

        let response = self
            .send(Method::GET, url, Some(&accept), repository)
            .await?;
        let response = Self::check(response, &full_ref).await?;

        let headers = response.headers().clone();
        let body = response.bytes().await?;

        let digest = headers
            .get(DOCKER_CONTENT_DIGEST)
            .and_then(|v| v.to_str().ok())
            .map_or_else(|| Self::compute_digest(&body), ToString::to_string);
        let content_type = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok());

        let manifest: Manifest =
            serde_json::from_slice(&body).map_err(|e| RegistryError::InvalidManifest {
                reference: full_ref.clone(),
                message: e.to_string(),
            })?;

        if manifest.is_index(content_type) {
            return Ok(ManifestInfo {
                digest,
                is_index: true,
                config_digest: None,
            });
        }

        let config = manifest
            .config
            .ok_or_else(|| RegistryError::InvalidManifest {
                reference: full_ref,
                message: "manifest has no config descriptor".to_string(),
            })?;

        Ok(ManifestInfo {
            digest,
            is_index: false,
            config_digest: Some(config.digest),
        })
    }

    /// Fetches the image config blob `digest` and reads its creation time.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob cannot be fetched or is not valid JSON.
    pub async fn get_image_config(
        &self,
        repository: &str,
        digest: &str,
    ) -> Result<ImageConfig, RegistryError> {
        let url = self.endpoint(&format!("/v2/{repository}/blobs/{digest}"))?;
        let reference = format!("{}/{repository}@{digest}", self.config.host);

        let response = self.send(Method::GET, url, None, repository).await?;
        let response = Self::check(response, &reference).await?;

        let blob: ConfigBlob = serde_json::from_slice(&response.bytes().await?)?;
        Ok(ImageConfig {
            created: blob.created_at(),
        })
    }

    /// Deletes the manifest `digest`, which untags every tag pointing at it.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry refuses the deletion.
    pub async fn delete_manifest(&self, repository: &str, digest: &str) -> Result<(), RegistryError> {
        let url = self.endpoint(&format!("/v2/{repository}/manifests/{digest}"))?;
        let reference = format!("{}/{repository}@{digest}", self.config.host);

        let response = self.send(Method::DELETE, url, None, repository).await?;
        Self::check(response, &reference).await?;

        tracing::debug!(reference = %reference, "deleted manifest");
        Ok(())
    }

    /// Sends a request, answering one bearer token challenge if the registry issues it.
    ///
    /// Tokens are cached per repository (`scope_key`, empty for the catalog).
    async fn send(
        &self,
        method: Method,
        url: Url,
        accept: Option<&str>,
        scope_key: &str,
    ) -> Result<Response, RegistryError> {
        let _permit = self.limiter.acquire().await;

        let cached = self.tokens.read().await.get(scope_key).cloned();
        let response = self
            .request(method.clone(), url.clone(), accept, cached.as_deref())
            .send()
            .await?;

        if response.status() != StatusCode::UNAUTHORIZED
            || matches!(self.config.auth, RegistryAuth::Bearer { .. })
        {
            return Ok(response);
        }

        let Some(challenge) = response
            .headers()
            .get(WWW_AUTHENTICATE)
            .and_then(|v| v.to_str().ok())
            .and_then(BearerChallenge::parse)
        else {
            return Ok(response);
        };

        let token = self.fetch_token(&challenge).await?;
        self.tokens
            .write()
            .await
            .insert(scope_key.to_string(), token.clone());

        self.request(method, url, accept, Some(&token))
            .send()
            .await
            .map_err(Into::into)
    }

    fn request(
        &self,
        method: Method,
        url: Url,
        accept: Option<&str>,
        token: Option<&str>,
    ) -> reqwest::RequestBuilder {
        let mut builder = self.http.request(method, url);

        if let Some(accept) = accept {
            builder = builder.header(ACCEPT, accept);
        }

        match (token, &self.config.auth) {
            (Some(token), _) => builder.bearer_auth(token),
            (None, RegistryAuth::Bearer { token }) => builder.bearer_auth(token),
            (None, RegistryAuth::Basic { username, password }) => {
                builder.basic_auth(username, Some(password))
            }
            (None, RegistryAuth::None) => builder,
        }
    }

    /// Obtains a token from the challenge's realm, authenticating with basic
    /// credentials when configured.
    async fn fetch_token(&self, challenge: &BearerChallenge) -> Result<String, RegistryError> {
        let mut url = Url::parse(&challenge.realm).map_err(|_| RegistryError::InvalidUrl {
            url: challenge.realm.clone(),
        })?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(service) = &challenge.service {
                query.append_pair("service", service);
            }
            if let Some(scope) = &challenge.scope {
                query.append_pair("scope", scope);
            }
        }

        tracing::debug!(realm = %challenge.realm, scope = ?challenge.scope, "requesting registry token");

        let mut builder = self.http.get(url);
        if let RegistryAuth::Basic { username, password } = &self.config.auth {
            builder = builder.basic_auth(username, Some(password));
        }

        let response = builder.send().await?;
        if !response.status().is_success() {
            return Err(RegistryError::AuthenticationFailed {
                message: format!(
                    "token request to {} failed with {}",
                    challenge.realm,
                    response.status()
                ),
            });
        }

        let token: TokenResponse = response.json().await?;
        token
            .into_token()
            .ok_or_else(|| RegistryError::AuthenticationFailed {
                message: format!("token service {} returned no token", challenge.realm),
            })
    }

    /// Maps non-success responses to errors.
    async fn check(response: Response, reference: &str) -> Result<Response, RegistryError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        match status {
            StatusCode::NOT_FOUND => Err(RegistryError::NotFound {
                reference: reference.to_string(),
            }),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(RegistryError::AuthenticationFailed {
                    message: format!("{status} for {reference}"),
                })
            }
            _ => Err(RegistryError::HttpError {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            }),
        }
    }

    fn endpoint(&self, path_and_query: &str) -> Result<Url, RegistryError> {
        self.base
            .join(path_and_query)
            .map_err(|_| RegistryError::InvalidUrl {
                url: format!("{}{path_and_query}", self.config.url),
            })
    }

    /// Resolves the `rel="next"` target of a `Link` header.
    fn next_page(&self, headers: &HeaderMap) -> Option<Url> {
        let link = headers.get(LINK)?.to_str().ok()?;
        link.split(',').find_map(|part| {
            let (target, params) = part.split_once(';')?;
            if !params.contains("rel=\"next\"") && !params.contains("rel=next") {
                return None;
            }
            let target = target.trim().trim_start_matches('<').trim_end_matches('>');
            self.base.join(target).ok()
        })
    }

    /// Builds the HTTP client with proper configuration.
    fn build_http_client(config: &RegistryConfig) -> Result<reqwest::Client, RegistryError> {
        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent);

        let tls = &config.tls;
        if tls.insecure_skip_verify {
            builder = builder.danger_accept_invalid_certs(true);
        }

        if let Some(ref ca_cert) = tls.ca_cert {
            let cert_pem = ca_cert.load()?;
            let cert = reqwest::Certificate::from_pem(&cert_pem).map_err(|e| {
                RegistryError::InvalidCertificate {
                    message: format!("Invalid CA certificate: {e}"),
                }
            })?;
            builder = builder.add_root_certificate(cert);
        }

        if let (Some(cert), Some(key)) = (&tls.client_cert, &tls.client_key) {
            let mut cert_pem = cert.load()?;
            let key_pem = key.load()?;
            cert_pem.push(b'\n');
            cert_pem.extend_from_slice(&key_pem);

            let identity = reqwest::Identity::from_pem(&cert_pem).map_err(|e| {
                RegistryError::InvalidCertificate {
                    message: format!("Invalid client certificate: {e}"),
                }
            })?;
            builder = builder.identity(identity);
        }

        builder.build().map_err(|e| RegistryError::ConnectionFailed {
            url: config.url.clone(),
            source: e,
        })
    }

    /// Computes SHA-256 digest of data.
    fn compute_digest(data: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data);
        format!("sha256:{}", hex::encode(hasher.finalize()))
    }
}
