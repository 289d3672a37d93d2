use std::{sync::Arc, time::Duration};

use metrics::counter;
use reqwest::{
    Client, Method, RequestBuilder, Response, Url,
    header::{AUTHORIZATION, HeaderValue},
};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};
use vitrine_cms_types::ResponseEnvelope;

use crate::{cache::ResponseCache, config::CmsSettings, infra::error::InfraError};

use super::{endpoint::Endpoint, error::CmsError};

const SOURCE: &str = "vitrine::cms";
const ERROR_BODY_PREVIEW_BYTES: usize = 512;

/// Connection settings for [`CmsClient`].
#[derive(Debug, Clone)]
pub struct CmsClientConfig {
    pub base_url: Url,
    pub read_api_key: String,
    pub write_api_key: String,
    pub request_timeout: Duration,
    pub probe_path: String,
    pub probe_timeout: Duration,
}

impl From<&CmsSettings> for CmsClientConfig {
    fn from(settings: &CmsSettings) -> Self {
        Self {
            base_url: settings.base_url.clone(),
            read_api_key: settings.read_api_key.clone(),
            write_api_key: settings.write_api_key.clone(),
            request_timeout: settings.request_timeout,
            probe_path: settings.probe_path.clone(),
            probe_timeout: settings.probe_timeout,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Credential {
    Read,
    Write,
}

/// Typed, caching client for the headless CMS.
///
/// Every public operation fails soft: transport errors, non-2xx statuses and
/// undecodable bodies are logged and surface as `None` (or `false` for
/// [`CmsClient::delete`]). Reads use the read-scoped key, writes the
/// write-scoped key.
#[derive(Clone)]
pub struct CmsClient {
    http: Client,
    base: Url,
    read_key: Arc<str>,
    write_key: Arc<str>,
    probe_path: Arc<str>,
    probe_timeout: Duration,
    cache: Arc<ResponseCache>,
}

impl CmsClient {
    pub fn new(config: CmsClientConfig, cache: Arc<ResponseCache>) -> Result<Self, InfraError> {
        let http = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| InfraError::http_client(err.to_string()))?;

        Ok(Self {
            http,
            base: normalize_base(config.base_url),
            read_key: config.read_api_key.into(),
            write_key: config.write_api_key.into(),
            probe_path: config.probe_path.into(),
            probe_timeout: config.probe_timeout,
            cache,
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("vitrine/", env!("CARGO_PKG_VERSION"))
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    /// Fetch `endpoint` and decode the whole body into `T`.
    ///
    /// With `cache_for`, a live cache entry is returned without touching the
    /// network, and a fresh success is stored for that long. Without it the
    /// call always goes to the CMS and nothing is cached.
    pub async fn get<T>(&self, endpoint: &Endpoint, cache_for: Option<Duration>) -> Option<T>
    where
        T: DeserializeOwned + Clone + Send + Sync + 'static,
    {
        let key = cache_for.map(|_| endpoint.cache_key());

        if let Some(key) = key.as_deref() {
            if let Some(hit) = self.cache.get::<T>(key) {
                debug!(target = SOURCE, key, outcome = "hit", "serving cached CMS response");
                return Some(hit);
            }
        }

        match self.fetch::<T>(endpoint).await {
            Ok(value) => {
                if let (Some(key), Some(ttl)) = (key, cache_for) {
                    self.cache.insert(key, value.clone(), ttl);
                }
                Some(value)
            }
            Err(err) => {
                report_failure(&Method::GET, endpoint, &err);
                None
            }
        }
    }

    /// [`CmsClient::get`] for the common case of an enveloped payload.
    pub async fn get_envelope<T>(
        &self,
        endpoint: &Endpoint,
        cache_for: Option<Duration>,
    ) -> Option<ResponseEnvelope<T>>
    where
        T: DeserializeOwned + Clone + Send + Sync + 'static,
    {
        self.get::<ResponseEnvelope<T>>(endpoint, cache_for).await
    }

    /// Create a resource; returns the envelope's `data` on success.
    pub async fn post<T, B>(&self, endpoint: &Endpoint, body: &B) -> Option<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.write(Method::POST, endpoint, body).await
    }

    /// Replace a resource; returns the envelope's `data` on success.
    pub async fn put<T, B>(&self, endpoint: &Endpoint, body: &B) -> Option<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.write(Method::PUT, endpoint, body).await
    }

    /// Delete a resource. True only for a 2xx (typically 204) response.
    pub async fn delete(&self, endpoint: &Endpoint) -> bool {
        let result = async {
            let request = self.request(Method::DELETE, endpoint, Credential::Write)?;
            let response = send(request).await?;
            ensure_success(response).await.map(|_| ())
        }
        .await;

        match result {
            Ok(()) => true,
            Err(err) => {
                report_failure(&Method::DELETE, endpoint, &err);
                false
            }
        }
    }

    /// Drop the cached response for `endpoint`, if any.
    pub fn invalidate(&self, endpoint: &Endpoint) -> bool {
        self.cache.invalidate(&endpoint.cache_key())
    }

    /// Hit the CMS liveness endpoint with the short probe timeout.
    pub async fn probe(&self) -> Result<(), CmsError> {
        let url = self.url(&Endpoint::new(self.probe_path.as_ref()))?;
        let request = self.http.get(url).timeout(self.probe_timeout);
        let response = send(request).await?;
        ensure_success(response).await.map(|_| ())
    }

    async fn fetch<T: DeserializeOwned>(&self, endpoint: &Endpoint) -> Result<T, CmsError> {
        let request = self.request(Method::GET, endpoint, Credential::Read)?;
        let response = send(request).await?;
        let bytes = ensure_success(response).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn write<T, B>(&self, method: Method, endpoint: &Endpoint, body: &B) -> Option<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let result = async {
            let request = self
                .request(method.clone(), endpoint, Credential::Write)?
                .json(body);
            let response = send(request).await?;
            let bytes = ensure_success(response).await?;
            let envelope: ResponseEnvelope<T> = serde_json::from_slice(&bytes)?;
            Ok::<_, CmsError>(envelope.data)
        }
        .await;

        match result {
            Ok(data) => Some(data),
            Err(err) => {
                report_failure(&method, endpoint, &err);
                None
            }
        }
    }

    fn request(
        &self,
        method: Method,
        endpoint: &Endpoint,
        credential: Credential,
    ) -> Result<RequestBuilder, CmsError> {
        let url = self.url(endpoint)?;
        let mut request = self.http.request(method, url);
        if let Some(header) = self.auth_header(credential)? {
            request = request.header(AUTHORIZATION, header);
        }
        Ok(request)
    }

    fn auth_header(&self, credential: Credential) -> Result<Option<HeaderValue>, CmsError> {
        let key = match credential {
            Credential::Read => &self.read_key,
            Credential::Write => &self.write_key,
        };
        if key.is_empty() {
            return Ok(None);
        }

        let mut value = HeaderValue::from_str(&format!("Bearer {key}"))
            .map_err(|err| CmsError::Credential(err.to_string()))?;
        value.set_sensitive(true);
        Ok(Some(value))
    }

    fn url(&self, endpoint: &Endpoint) -> Result<Url, CmsError> {
        let mut url = self.base.join(endpoint.path().trim_start_matches('/'))?;
        if !endpoint.query_pairs().is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in endpoint.query_pairs() {
                pairs.append_pair(name, value);
            }
        }
        Ok(url)
    }
}

/// Make sure relative joins land under the base path instead of replacing it.
fn normalize_base(mut base: Url) -> Url {
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base
}

async fn send(request: RequestBuilder) -> Result<Response, CmsError> {
    counter!("vitrine_cms_request_total").increment(1);
    Ok(request.send().await?)
}

async fn ensure_success(response: Response) -> Result<bytes::Bytes, CmsError> {
    let status = response.status();
    let bytes = response.bytes().await?;
    if !status.is_success() {
        let preview = &bytes[..bytes.len().min(ERROR_BODY_PREVIEW_BYTES)];
        return Err(CmsError::Status {
            status: status.as_u16(),
            body: String::from_utf8_lossy(preview).into_owned(),
        });
    }
    Ok(bytes)
}

fn report_failure(method: &Method, endpoint: &Endpoint, error: &CmsError) {
    counter!("vitrine_cms_request_failed_total", "kind" => error.kind()).increment(1);
    let body = match error {
        CmsError::Status { body, .. } => body.as_str(),
        _ => "",
    };
    warn!(
        target = SOURCE,
        method = %method,
        path = endpoint.path(),
        kind = error.kind(),
        status = error.status(),
        body,
        error = %error,
        "CMS request failed",
    );
}
