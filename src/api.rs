//! Channels REST API client
//!
//! Every call goes through [`ChannelApi::send`]: attach the bearer token,
//! classify the HTTP status, then unwrap the `{ success, data, message, error }`
//! envelope. Navigation on 401/403 is left to the caller.

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::error::ApiError;
use crate::models::{Channel, ChannelId, Envelope, FavoriteFlag, LoginData};
use crate::session::SessionStore;

pub const DEFAULT_PLAYLIST_URL: &str = "https://iptv-org.github.io/iptv/index.m3u";
pub const DEFAULT_RECENT_LIMIT: i64 = 10;

const CHANNELS: [&str; 2] = ["api", "channels"];
const AUTH: [&str; 2] = ["api", "auth"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Wire-level HTTP. `Err` carries a transport failure description (DNS, refused, timeout).
pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, String>;
}

/// Full catalogues run past ureq's 10 MB default body cap
const MAX_BODY_BYTES: u64 = 64 * 1024 * 1024;

/// Production transport on a shared ureq agent.
pub struct UreqTransport {
    agent: ureq::Agent,
    user_agent: String,
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .timeout_connect(Some(Duration::from_secs(10)))
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self {
            agent,
            user_agent: format!("IPTVBrowser/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
    user_agent: &str,
) -> ureq::RequestBuilder<B> {
    builder = builder.header("User-Agent", user_agent);
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, String> {
        let url = request.url.as_str();
        let headers = &request.headers;
        let ua = self.user_agent.as_str();

        let result = match request.method {
            Method::Get => with_headers(self.agent.get(url), headers, ua).call(),
            Method::Delete => with_headers(self.agent.delete(url), headers, ua).call(),
            Method::Post => {
                let builder = with_headers(self.agent.post(url), headers, ua);
                match request.body.as_deref() {
                    Some(body) => builder.send(body),
                    None => builder.send_empty(),
                }
            }
            Method::Put => {
                let builder = with_headers(self.agent.put(url), headers, ua);
                match request.body.as_deref() {
                    Some(body) => builder.send(body),
                    None => builder.send_empty(),
                }
            }
        };

        let mut response = result.map_err(|e| e.to_string())?;
        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .with_config()
            .limit(MAX_BODY_BYTES)
            .read_to_string()
            .map_err(|e| format!("Read failed: {}", e))?;
        Ok(HttpResponse { status, body })
    }
}

/// Map an HTTP status onto the error taxonomy. 2xx/3xx pass.
pub fn classify_status(status: u16) -> Result<(), ApiError> {
    match status {
        401 => Err(ApiError::SessionExpired),
        403 => Err(ApiError::AccessDenied),
        s if s >= 500 => Err(ApiError::ServerError { status: s }),
        s if s >= 400 => Err(ApiError::RequestFailed(s)),
        _ => Ok(()),
    }
}

/// Unwrap `data` from a success envelope. `Ok(None)` when the server sent no data.
pub fn unwrap_envelope<T: DeserializeOwned>(body: &str) -> Result<Option<T>, ApiError> {
    if body.trim().is_empty() {
        return Err(ApiError::EmptyResponse);
    }

    let envelope: Envelope<Value> =
        serde_json::from_str(body).map_err(|_| ApiError::EmptyResponse)?;

    if !envelope.success {
        let message = envelope
            .message
            .filter(|m| !m.is_empty())
            .or(envelope.error.filter(|e| !e.is_empty()))
            .unwrap_or_else(|| "API Error".to_string());
        return Err(ApiError::Api(message));
    }

    match envelope.data {
        None | Some(Value::Null) => Ok(None),
        Some(data) => serde_json::from_value(data)
            .map(Some)
            .map_err(|_| ApiError::EmptyResponse),
    }
}

fn strings_from(value: Option<Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn require_id(id: &ChannelId) -> Result<(), ApiError> {
    if id.is_blank() {
        return Err(ApiError::validation("Channel ID is required"));
    }
    Ok(())
}

fn require_text<'a>(value: &'a str, message: &str) -> Result<&'a str, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation(message));
    }
    Ok(trimmed)
}

pub struct ChannelApi {
    base: Url,
    transport: Box<dyn Transport>,
    session: Arc<SessionStore>,
}

impl ChannelApi {
    pub fn new(
        base_url: &str,
        transport: impl Transport + 'static,
        session: Arc<SessionStore>,
    ) -> Result<Self, ApiError> {
        let base = Url::parse(base_url.trim())
            .map_err(|e| ApiError::validation(format!("Invalid API base URL '{}': {}", base_url, e)))?;
        if base.cannot_be_a_base() {
            return Err(ApiError::validation(format!("Invalid API base URL '{}'", base_url)));
        }
        tracing::info!("API base URL: {}", base);
        Ok(Self {
            base,
            transport: Box::new(transport),
            session,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    fn endpoint(&self, root: &[&str], segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(root).extend(segments);
        }
        url
    }

    fn channels_url(&self, segments: &[&str]) -> Url {
        self.endpoint(&CHANNELS, segments)
    }

    fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<Value>,
    ) -> Result<Option<T>, ApiError> {
        let mut headers = Vec::new();
        if matches!(method, Method::Post | Method::Put) {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }
        if let Some(token) = self.session.token() {
            headers.push(("Authorization".to_string(), format!("Bearer {}", token)));
        }

        let request = HttpRequest {
            method,
            url: url.to_string(),
            headers,
            body: body.map(|b| b.to_string()),
        };
        tracing::debug!("{:?} {}", request.method, request.url);

        let response = self.transport.execute(&request).map_err(|detail| {
            tracing::error!("Fetch error on {}: {}", request.url, detail);
            ApiError::Network { detail }
        })?;

        if let Err(e) = classify_status(response.status) {
            if e.ends_session() {
                tracing::warn!("{} from {} - clearing auth data", response.status, request.url);
                if let Err(clear_err) = self.session.clear() {
                    tracing::warn!("Failed to clear session: {}", clear_err);
                }
            } else {
                tracing::error!("{} from {}: {}", response.status, request.url, e);
            }
            return Err(e);
        }

        unwrap_envelope(&response.body).inspect_err(|e| {
            tracing::error!("Envelope error on {}: {}", request.url, e);
        })
    }

    fn get_list<T: DeserializeOwned>(&self, url: Url) -> Result<Vec<T>, ApiError> {
        Ok(self.send::<Vec<T>>(Method::Get, url, None)?.unwrap_or_default())
    }

    fn command(&self, method: Method, url: Url) -> Result<(), ApiError> {
        self.send::<Value>(method, url, None).map(|_| ())
    }

    // ================= AUTH =================

    /// `POST /api/auth/login?userId=<id>`; persisting is the session store's job.
    pub fn authenticate(&self, user_id: &str) -> Result<LoginData, ApiError> {
        let mut url = self.endpoint(&AUTH, &["login"]);
        url.query_pairs_mut().append_pair("userId", user_id);
        Ok(self
            .send::<LoginData>(Method::Post, url, None)?
            .unwrap_or_default())
    }

    // ================= CHANNELS =================

    pub fn channels(&self) -> Result<Vec<Channel>, ApiError> {
        self.get_list(self.channels_url(&[]))
    }

    pub fn channel(&self, id: &ChannelId) -> Result<Channel, ApiError> {
        require_id(id)?;
        self.send(Method::Get, self.channels_url(&[id.as_str()]), None)?
            .ok_or(ApiError::EmptyResponse)
    }

    pub fn categories(&self) -> Result<Vec<String>, ApiError> {
        let data = self.send::<Value>(Method::Get, self.channels_url(&["categories"]), None)?;
        Ok(strings_from(data))
    }

    pub fn countries(&self) -> Result<Vec<String>, ApiError> {
        let data = self.send::<Value>(Method::Get, self.channels_url(&["countries"]), None)?;
        Ok(strings_from(data))
    }

    pub fn favorites(&self) -> Result<Vec<Channel>, ApiError> {
        self.get_list(self.channels_url(&["favorites"]))
    }

    pub fn add_favorite(&self, id: &ChannelId) -> Result<(), ApiError> {
        require_id(id)?;
        self.command(Method::Post, self.channels_url(&[id.as_str(), "favorite"]))
    }

    pub fn remove_favorite(&self, id: &ChannelId) -> Result<(), ApiError> {
        require_id(id)?;
        self.command(Method::Delete, self.channels_url(&[id.as_str(), "favorite"]))
    }

    /// POST when the channel is not yet a favorite, DELETE otherwise.
    pub fn toggle_favorite(&self, id: &ChannelId, is_favorite: bool) -> Result<(), ApiError> {
        if is_favorite {
            self.remove_favorite(id)
        } else {
            self.add_favorite(id)
        }
    }

    pub fn is_favorite(&self, id: &ChannelId) -> Result<bool, ApiError> {
        require_id(id)?;
        let flag = self.send::<FavoriteFlag>(
            Method::Get,
            self.channels_url(&[id.as_str(), "is-favorite"]),
            None,
        )?;
        Ok(flag.map(|f| f.is_favorite).unwrap_or(false))
    }

    /// Non-positive limits fall back to 10.
    pub fn recently_watched(&self, limit: i64) -> Result<Vec<Channel>, ApiError> {
        let limit = if limit < 1 { DEFAULT_RECENT_LIMIT } else { limit };
        let mut url = self.channels_url(&["recently-watched"]);
        url.query_pairs_mut().append_pair("limit", &limit.to_string());
        self.get_list(url)
    }

    pub fn remove_recently_watched(&self, id: &ChannelId) -> Result<(), ApiError> {
        require_id(id)?;
        self.command(Method::Delete, self.channels_url(&[id.as_str(), "recently-watched"]))
    }

    /// Duration in seconds; zero is treated as absent.
    pub fn record_watch(&self, id: &ChannelId, duration: Option<u64>) -> Result<(), ApiError> {
        require_id(id)?;
        let mut url = self.channels_url(&[id.as_str(), "watch"]);
        if let Some(d) = duration.filter(|d| *d > 0) {
            url.query_pairs_mut().append_pair("duration", &d.to_string());
        }
        self.command(Method::Post, url)
    }

    pub fn refresh_playlist(&self, playlist_url: &str) -> Result<Value, ApiError> {
        let playlist_url = require_text(playlist_url, "Playlist URL is required")?;
        let body = json!({ "playlistUrl": playlist_url });
        tracing::info!("Refreshing playlist from {}", playlist_url);
        Ok(self
            .send::<Value>(Method::Post, self.channels_url(&["refresh"]), Some(body))?
            .unwrap_or(Value::Null))
    }

    pub fn search(&self, keyword: &str) -> Result<Vec<Channel>, ApiError> {
        require_text(keyword, "Search keyword is required")?;
        let mut url = self.channels_url(&["search"]);
        url.query_pairs_mut().append_pair("keyword", keyword);
        self.get_list(url)
    }

    pub fn by_category(&self, category: &str) -> Result<Vec<Channel>, ApiError> {
        require_text(category, "Category is required")?;
        self.get_list(self.channels_url(&["category", category]))
    }

    pub fn by_country(&self, country: &str) -> Result<Vec<Channel>, ApiError> {
        require_text(country, "Country code is required")?;
        self.get_list(self.channels_url(&["country", country]))
    }

    pub fn by_language(&self, language: &str) -> Result<Vec<Channel>, ApiError> {
        require_text(language, "Language is required")?;
        self.get_list(self.channels_url(&["language", language]))
    }

    pub fn mark_active(&self, id: &ChannelId) -> Result<Value, ApiError> {
        self.set_status(id, "active")
    }

    pub fn mark_inactive(&self, id: &ChannelId) -> Result<Value, ApiError> {
        self.set_status(id, "inactive")
    }

    fn set_status(&self, id: &ChannelId, status: &str) -> Result<Value, ApiError> {
        require_id(id)?;
        Ok(self
            .send::<Value>(Method::Put, self.channels_url(&[id.as_str(), "status", status]), None)?
            .unwrap_or(Value::Null))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    struct Route {
        method: Method,
        path: String,
        response: Result<HttpResponse, String>,
    }

    #[derive(Default)]
    struct FakeState {
        routes: Vec<Route>,
        requests: Vec<HttpRequest>,
    }

    /// Scripted transport keyed on method + URL path. Records every request.
    #[derive(Clone, Default)]
    pub struct FakeTransport {
        state: Arc<Mutex<FakeState>>,
    }

    impl FakeTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn route(&self, method: Method, path: &str, status: u16, body: impl Into<String>) -> &Self {
            let mut state = self.state.lock().unwrap();
            state.routes.retain(|r| !(r.method == method && r.path == path));
            state.routes.push(Route {
                method,
                path: path.to_string(),
                response: Ok(HttpResponse { status, body: body.into() }),
            });
            self
        }

        pub fn ok(&self, method: Method, path: &str, data: Value) -> &Self {
            self.route(method, path, 200, json!({ "success": true, "data": data }).to_string())
        }

        pub fn unreachable(&self, method: Method, path: &str) -> &Self {
            let mut state = self.state.lock().unwrap();
            state.routes.push(Route {
                method,
                path: path.to_string(),
                response: Err("connection refused".to_string()),
            });
            self
        }

        pub fn requests(&self) -> Vec<HttpRequest> {
            self.state.lock().unwrap().requests.clone()
        }

        pub fn request_count(&self) -> usize {
            self.state.lock().unwrap().requests.len()
        }
    }

    impl Transport for FakeTransport {
        fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, String> {
            let mut state = self.state.lock().unwrap();
            state.requests.push(request.clone());
            let path = Url::parse(&request.url)
                .map(|u| u.path().to_string())
                .unwrap_or_default();
            state
                .routes
                .iter()
                .find(|r| r.method == request.method && r.path == path)
                .map(|r| r.response.clone())
                .unwrap_or_else(|| Ok(HttpResponse { status: 404, body: String::new() }))
        }
    }

    pub fn api_with(transport: &FakeTransport, session: Arc<SessionStore>) -> ChannelApi {
        ChannelApi::new("http://api.test:8080", transport.clone(), session).unwrap()
    }

    pub fn channel_json(id: i64, name: &str, category: &str, country: &str) -> Value {
        json!({
            "id": id,
            "name": name,
            "category": category,
            "country": country,
            "channelUrl": format!("http://streams.test/{}.m3u8", id),
        })
    }
}

#[cfg(test)]
#[path = "api_tests.rs"]
mod tests;
