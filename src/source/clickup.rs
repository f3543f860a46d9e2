//! ClickUp v2 REST client.

use crate::config::secrets::{ExposeSecret, SecretString};
use crate::error::{Error, Result};
use crate::model::{StatusUpdate, Task, TaskId, TaskPage, status_eq};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

use super::TaskSource;

pub const CLICKUP_API_BASE: &str = "https://api.clickup.com/api/v2";

/// Upper bound on pages followed in one listing.
const MAX_PAGES: u32 = 100;

pub struct ClickUpClient {
    http: reqwest::Client,
    base_url: String,
    list_id: String,
}

impl fmt::Debug for ClickUpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClickUpClient")
            .field("base_url", &self.base_url)
            .field("list_id", &self.list_id)
            .finish_non_exhaustive()
    }
}

impl ClickUpClient {
    /// Build a client for one list. `base_url` defaults to the public API.
    pub fn new(
        token: &SecretString,
        list_id: impl Into<String>,
        base_url: Option<&str>,
        timeout: Duration,
    ) -> Result<Self> {
        let mut auth = HeaderValue::from_str(token.expose_secret())
            .map_err(|_| Error::Config("API token contains invalid header characters".into()))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url
                .unwrap_or(CLICKUP_API_BASE)
                .trim_end_matches('/')
                .to_string(),
            list_id: list_id.into(),
        })
    }

    pub fn list_id(&self) -> &str {
        &self.list_id
    }

    /// All non-archived tasks in `status`, following pagination.
    pub async fn list_tasks(&self, status: &str) -> Result<Vec<Task>> {
        let url = format!("{}/list/{}/task", self.base_url, self.list_id);
        let mut tasks = Vec::new();

        for page in 0..MAX_PAGES {
            let query = [
                ("statuses[]", status.to_string()),
                ("archived", "false".to_string()),
                ("page", page.to_string()),
            ];
            let response = self.http.get(&url).query(&query).send().await?;
            let body: TaskPage = decode(response).await?;

            debug!(page, count = body.tasks.len(), "fetched task page");
            let exhausted = body.tasks.is_empty() || body.last_page.unwrap_or(true);
            tasks.extend(body.tasks);
            if exhausted {
                return Ok(tasks);
            }
        }

        warn!(max_pages = MAX_PAGES, "stopped following task pages at limit");
        Ok(tasks)
    }

    pub async fn get_task(&self, id: &TaskId) -> Result<Task> {
        let url = format!("{}/task/{}", self.base_url, id);
        let response = self.http.get(&url).send().await?;
        decode(response).await
    }
}

#[async_trait]
impl TaskSource for ClickUpClient {
    async fn list_in_status(&self, status: &str) -> Result<Vec<TaskId>> {
        let tasks = self.list_tasks(status).await?;
        let mut seen = HashSet::new();
        let mut ids = Vec::with_capacity(tasks.len());
        for task in tasks {
            if !status_eq(&task.status.status, status) {
                debug!(task_id = %task.id, status = %task.status.status, "ignoring task outside requested status");
                continue;
            }
            if seen.insert(task.id.clone()) {
                ids.push(task.id);
            }
        }
        Ok(ids)
    }

    async fn get_status(&self, id: &TaskId) -> Result<String> {
        Ok(self.get_task(id).await?.status.status)
    }

    async fn set_status(&self, id: &TaskId, status: &str) -> Result<()> {
        let url = format!("{}/task/{}", self.base_url, id);
        let response = self
            .http
            .put(&url)
            .json(&StatusUpdate { status })
            .send()
            .await?;
        check(response).await.map(|_| ())
    }
}

#[derive(Debug, Deserialize)]
struct ClickUpErrorBody {
    #[serde(default)]
    err: Option<String>,
    #[serde(default, rename = "ECODE")]
    ecode: Option<String>,
}

/// Turn a non-2xx response into `Error::Api`, passing 2xx through.
async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ClickUpErrorBody>(&text) {
        Ok(ClickUpErrorBody {
            err: Some(err),
            ecode: Some(code),
        }) => format!("{err} [{code}]"),
        Ok(ClickUpErrorBody { err: Some(err), .. }) => err,
        _ if !text.trim().is_empty() => text,
        _ => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
    };

    Err(Error::Api {
        status: status.as_u16(),
        message,
    })
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let response = check(response).await?;
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| Error::Decode(format!("unexpected response body: {e}")))
}
