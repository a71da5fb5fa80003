//! reqwest-backed web session with cookie store.

use crate::utils::join_url;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, COOKIE};
use rollcall_core::{
    config::{WebAuth, WebTargetConfig},
    error::CheckinError,
    traits::{WebResponse, WebSession},
};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Authenticated HTTP session for one web account.
pub struct HttpSession {
    client: reqwest::Client,
    target: WebTargetConfig,
}

impl HttpSession {
    /// Build the client with the account's static credentials baked in.
    pub fn new(target: WebTargetConfig) -> Result<Self, CheckinError> {
        let headers = default_headers(&target.auth)?;
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .user_agent(target.user_agent.clone())
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| CheckinError::Config(format!("failed to build http client: {e}")))?;
        Ok(Self { client, target })
    }

    fn bounced_to_login(&self, final_url: &str, requested: &str) -> bool {
        let final_lower = final_url.to_lowercase();
        let requested_lower = requested.to_lowercase();
        self.target
            .login_markers
            .iter()
            .map(|m| m.to_lowercase())
            .any(|m| final_lower.contains(&m) && !requested_lower.contains(&m))
    }

    async fn form_login(
        &self,
        login_url: &str,
        form: HashMap<String, String>,
        success_url_contains: Option<&str>,
    ) -> Result<(), CheckinError> {
        let url = join_url(&self.target.base_url, login_url);
        let resp = self.post(&url, &form).await?;
        let ok = match success_url_contains {
            Some(marker) => resp.url.contains(marker),
            None => resp.is_success() && !self.bounced_to_login(&resp.url, ""),
        };
        if !ok {
            return Err(CheckinError::Unauthorized(format!(
                "login did not reach the expected page (HTTP {}, landed on {})",
                resp.status, resp.url
            )));
        }
        info!("form login succeeded, landed on {}", resp.url);
        Ok(())
    }

    async fn probe(&self, probe_url: &str) -> Result<(), CheckinError> {
        let url = join_url(&self.target.base_url, probe_url);
        let resp = self.get(&url).await?;
        debug!("auth probe {url}: {}", resp.status);
        match resp.status {
            401 | 403 => Err(CheckinError::Unauthorized(format!(
                "auth probe rejected (HTTP {})",
                resp.status
            ))),
            s if s >= 500 => Err(CheckinError::Transport(format!(
                "auth probe failed (HTTP {s})"
            ))),
            _ if self.bounced_to_login(&resp.url, &url) => Err(CheckinError::Unauthorized(
                format!("session redirected to login page {}", resp.url),
            )),
            _ if !resp.is_success() => Err(CheckinError::Unauthorized(format!(
                "auth probe returned HTTP {}",
                resp.status
            ))),
            _ => Ok(()),
        }
    }
}

/// Static headers implied by the auth mode.
fn default_headers(auth: &WebAuth) -> Result<HeaderMap, CheckinError> {
    let mut map = HeaderMap::new();
    let extra = match auth {
        WebAuth::None | WebAuth::Form { .. } => return Ok(map),
        WebAuth::Bearer { token, headers } => {
            map.insert(AUTHORIZATION, header_value(&format!("Bearer {token}"))?);
            headers
        }
        WebAuth::Cookies { cookies, headers } => {
            let mut pairs: Vec<_> = cookies.iter().collect();
            pairs.sort();
            let cookie = pairs
                .into_iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("; ");
            map.insert(COOKIE, header_value(&cookie)?);
            headers
        }
    };
    for (name, value) in extra {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| CheckinError::Config(format!("invalid header name '{name}': {e}")))?;
        map.insert(name, header_value(value)?);
    }
    Ok(map)
}

fn header_value(value: &str) -> Result<HeaderValue, CheckinError> {
    HeaderValue::from_str(value)
        .map_err(|e| CheckinError::Config(format!("invalid header value: {e}")))
}

async fn into_web_response(resp: reqwest::Response) -> Result<WebResponse, CheckinError> {
    let status = resp.status().as_u16();
    let url = resp.url().to_string();
    let body = resp
        .text()
        .await
        .map_err(|e| CheckinError::Transport(format!("failed to read response body: {e}")))?;
    Ok(WebResponse { status, url, body })
}

#[async_trait]
impl WebSession for HttpSession {
    async fn authenticate(&self) -> Result<(), CheckinError> {
        if let WebAuth::Form {
            login_url,
            username,
            password,
            username_field,
            password_field,
            success_url_contains,
        } = &self.target.auth
        {
            let form = HashMap::from([
                (username_field.clone(), username.clone()),
                (password_field.clone(), password.clone()),
            ]);
            self.form_login(login_url, form, success_url_contains.as_deref())
                .await?;
        }
        if let Some(ref probe_url) = self.target.probe_url {
            self.probe(probe_url).await?;
        }
        Ok(())
    }

    async fn get(&self, url: &str) -> Result<WebResponse, CheckinError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CheckinError::Transport(format!("GET {url} failed: {e}")))?;
        into_web_response(resp).await
    }

    async fn post(
        &self,
        url: &str,
        form: &HashMap<String, String>,
    ) -> Result<WebResponse, CheckinError> {
        let resp = self
            .client
            .post(url)
            .form(form)
            .send()
            .await
            .map_err(|e| CheckinError::Transport(format!("POST {url} failed: {e}")))?;
        into_web_response(resp).await
    }
}
