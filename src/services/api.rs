// src/services/api.rs

//! Feed API client.
//!
//! Reads item pages, logs in, and adds tags to items. The session lives in
//! a cookie jar; write calls additionally need the nonce derived from the
//! `me` cookie.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::cookie::{CookieStore, Jar};
use serde::Deserialize;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{ApiConfig, ItemId, ItemPage, ItemsRequest};
use crate::services::ItemSource;
use crate::utils::http;

const NONCE_LEN: usize = 16;

/// Authenticated session handle for write calls.
#[derive(Debug, Clone)]
pub struct Session {
    nonce: String,
}

impl Session {
    pub fn nonce(&self) -> &str {
        &self.nonce
    }
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    ban: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct MeCookie {
    id: String,
}

/// HTTP client for the feed API.
pub struct FeedClient {
    client: reqwest::Client,
    jar: Arc<Jar>,
    base: Url,
}

impl FeedClient {
    /// Create a client with its own cookie jar.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let jar = Arc::new(Jar::default());
        let client = http::create_session_client(config, Arc::clone(&jar))?;
        let base = Url::parse(&config.base_url)?;
        Ok(Self { client, jar, base })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(path)?)
    }

    /// Log in and return a session usable for write calls.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session> {
        let url = self.endpoint("api/user/login")?;
        let response = self
            .client
            .post(url)
            .form(&[("name", username), ("password", password)])
            .send()
            .await?;
        let response = http::ensure_success(response).await?;
        let body: LoginResponse = response.json().await?;

        if !body.success {
            let reason = match body.ban {
                Some(ban) if !ban.is_null() => format!("account banned: {ban}"),
                _ => "credentials rejected".to_string(),
            };
            return Err(AppError::Login(reason));
        }

        let header = self
            .jar
            .cookies(&self.base)
            .ok_or_else(|| AppError::Login("no session cookie received".into()))?;
        let header = header
            .to_str()
            .map_err(|e| AppError::Login(format!("unreadable session cookie: {e}")))?;
        let nonce = nonce_from_cookie_header(header)
            .ok_or_else(|| AppError::Login("session cookie carries no nonce".into()))?;

        log::info!("Logged in as {}", username);
        Ok(Session { nonce })
    }

    /// Add `tags` to an item.
    pub async fn add_tags(&self, session: &Session, item_id: ItemId, tags: &[String]) -> Result<()> {
        let url = self.endpoint("api/tags/add")?;
        let form = [
            ("itemId", item_id.to_string()),
            ("tags", tags.join(",")),
            ("_nonce", session.nonce.clone()),
        ];
        let response = self.client.post(url).form(&form).send().await?;
        let response = http::ensure_success(response)
            .await
            .map_err(|e| AppError::api("tags/add", e))?;
        http::drain(response).await;
        Ok(())
    }
}

#[async_trait]
impl ItemSource for FeedClient {
    async fn fetch_page(&self, request: &ItemsRequest) -> Result<ItemPage> {
        let url = self.endpoint("api/items/get")?;
        let response = self
            .client
            .get(url)
            .query(&request.query_pairs())
            .send()
            .await?;
        let response = http::ensure_success(response)
            .await
            .map_err(|e| AppError::api("items/get", e))?;
        let page: ItemPage = response.json().await?;
        log::debug!(
            "Fetched {} items (older than {:?}, at end: {})",
            page.items.len(),
            request.older,
            page.at_end
        );
        Ok(page)
    }
}

/// Extract the write nonce from a `Cookie` header value.
///
/// The `me` cookie holds URL-encoded JSON with an `id` field; the nonce is
/// its first 16 characters.
pub fn nonce_from_cookie_header(header: &str) -> Option<String> {
    let raw = header
        .split(';')
        .map(str::trim)
        .find_map(|pair| pair.strip_prefix("me="))?;

    let query = format!("me={raw}");
    let decoded = url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "me")
        .map(|(_, value)| value.into_owned())?;

    let me: MeCookie = serde_json::from_str(&decoded).ok()?;
    if me.id.len() < NONCE_LEN {
        return None;
    }
    me.id.get(..NONCE_LEN).map(str::to_string)
}
