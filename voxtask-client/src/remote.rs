use crate::config::ClientConfig;
use crate::errors::{ClientError, ClientResult};
use crate::session::Session;
use async_trait::async_trait;
use reqwest::{Method, Response};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use voxtask_core::models::{Task, TaskFormData, TaskUpdate};
use voxtask_core::routes;

/// The task service as the sync engine sees it.
///
/// Every call is bounded by a timeout; running past it is reported as
/// `ClientError::Unreachable`, the same as a refused connection. A failure
/// status comes back as `RemoteRejected`, except 404 which is `NotFound`. A
/// success status with an undecodable body is `MalformedResponse`: the
/// service did act on the request.
#[async_trait]
pub trait TaskRemote: Send + Sync {
    /// Short reachability probe. Never errors.
    async fn check_health(&self) -> bool;

    async fn list_tasks(&self, session: &Session) -> ClientResult<Vec<Task>>;

    async fn create_task(&self, session: &Session, data: &TaskFormData) -> ClientResult<Task>;

    async fn update_task(
        &self,
        session: &Session,
        id: &str,
        update: &TaskUpdate,
    ) -> ClientResult<Task>;

    async fn delete_task(&self, session: &Session, id: &str) -> ClientResult<()>;
}

/// HTTP implementation of `TaskRemote` over reqwest.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    http: reqwest::Client,
    base_url: String,
    request_timeout: Duration,
    health_timeout: Duration,
}

impl HttpRemote {
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ClientError::Config(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            request_timeout: config.request_timeout(),
            health_timeout: config.health_timeout(),
        })
    }

    /// Issue one request and classify the outcome. Only 2xx responses are returned.
    pub async fn call<B>(
        &self,
        session: &Session,
        method: Method,
        path: &str,
        body: Option<&B>,
        timeout: Duration,
    ) -> ClientResult<Response>
    where
        B: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http.request(method.clone(), &url).timeout(timeout);
        if let Some(token) = session.token() {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            tracing::debug!("REMOTE: {} {} failed: {}", method, path, e);
            ClientError::from(e)
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound(path.to_string()));
        }

        let text = response.text().await.unwrap_or_default();
        Err(ClientError::RemoteRejected {
            status: status.as_u16(),
            message: rejection_message(&text),
        })
    }

    async fn call_json<B, T>(
        &self,
        session: &Session,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .call(session, method, path, body, self.request_timeout)
            .await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| {
            tracing::warn!("REMOTE: {} answered with an unreadable body: {}", path, e);
            ClientError::MalformedResponse(e.to_string())
        })
    }
}

#[async_trait]
impl TaskRemote for HttpRemote {
    async fn check_health(&self) -> bool {
        match self
            .call::<()>(
                &Session::anonymous(),
                Method::GET,
                routes::HEALTH,
                None,
                self.health_timeout,
            )
            .await
        {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!("REMOTE: health check failed: {}", e);
                false
            }
        }
    }

    async fn list_tasks(&self, session: &Session) -> ClientResult<Vec<Task>> {
        self.call_json::<(), _>(session, Method::GET, routes::TASKS, None)
            .await
    }

    async fn create_task(&self, session: &Session, data: &TaskFormData) -> ClientResult<Task> {
        self.call_json(session, Method::POST, routes::TASKS, Some(data))
            .await
    }

    async fn update_task(
        &self,
        session: &Session,
        id: &str,
        update: &TaskUpdate,
    ) -> ClientResult<Task> {
        self.call_json(session, Method::PATCH, &routes::task(id), Some(update))
            .await
    }

    async fn delete_task(&self, session: &Session, id: &str) -> ClientResult<()> {
        self.call::<()>(
            session,
            Method::DELETE,
            &routes::task(id),
            None,
            self.request_timeout,
        )
        .await?;
        Ok(())
    }
}

// Error bodies look like {"detail": "..."}; fall back to the raw text.
fn rejection_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}
