//! Notification repository backed by a PostgREST endpoint.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use herald_bridge::{
    NOTIFICATIONS_TABLE,
    config::RemoteConfig,
    notification::{
        NewNotification, Notification, NotificationId, NotificationKind, SourceKind, SourceRef,
    },
};
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};

use crate::error::RepositoryError;
use crate::ports::NotificationRepository;

/// A `notifications` row as stored remotely.
#[derive(Debug, Clone, Deserialize)]
struct NotificationRow {
    id: String,
    title: String,
    message: String,
    #[serde(rename = "type")]
    kind: NotificationKind,
    is_read: bool,
    created_at: DateTime<Utc>,
    #[serde(default)]
    source_id: Option<String>,
    /// Kept as text so rows from sources this client does not know still
    /// decode.
    #[serde(default)]
    source_type: Option<String>,
}

impl From<NotificationRow> for Notification {
    fn from(row: NotificationRow) -> Self {
        let kind = row.source_type.as_deref().and_then(SourceKind::from_name);
        let source = match (row.source_id, kind) {
            (Some(id), Some(kind)) => Some(SourceRef { id, kind }),
            _ => None,
        };
        Self {
            id: NotificationId::new(row.id),
            title: row.title,
            message: row.message,
            kind: row.kind,
            is_read: row.is_read,
            created_at: row.created_at,
            source,
        }
    }
}

#[derive(Debug, Serialize)]
struct InsertRow<'a> {
    title: &'a str,
    message: &'a str,
    #[serde(rename = "type")]
    kind: NotificationKind,
    is_read: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_type: Option<SourceKind>,
}

impl<'a> From<&'a NewNotification> for InsertRow<'a> {
    fn from(draft: &'a NewNotification) -> Self {
        Self {
            title: &draft.title,
            message: &draft.message,
            kind: draft.kind,
            is_read: false,
            source_id: draft.source.as_ref().map(|source| source.id.as_str()),
            source_type: draft.source.as_ref().map(|source| source.kind),
        }
    }
}

/// Builds a PostgREST `in` filter matching any of `ids`.
fn id_filter(ids: &[NotificationId]) -> String {
    let quoted: Vec<String> = ids
        .iter()
        .map(|id| format!("\"{}\"", id.as_str().replace('"', "\\\"")))
        .collect();
    format!("in.({})", quoted.join(","))
}

fn error_for_status(status: StatusCode, message: String) -> RepositoryError {
    match status {
        StatusCode::CONFLICT => RepositoryError::Conflict(message),
        StatusCode::NOT_FOUND => RepositoryError::NotFound(message),
        status if status.is_server_error() => {
            RepositoryError::Unavailable(format!("{status}: {message}"))
        }
        status => RepositoryError::Rejected {
            status: status.as_u16(),
            message,
        },
    }
}

async fn check(response: Response) -> Result<Response, RepositoryError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(error_for_status(status, message))
}

/// Notification repository talking to `<base_url>/rest/v1/notifications`.
#[derive(Debug, Clone)]
pub struct RestNotificationRepository {
    client: reqwest::Client,
    endpoint: Url,
    api_key: String,
}

impl RestNotificationRepository {
    pub fn new(remote: &RemoteConfig) -> Result<Self, RepositoryError> {
        Self::with_client(reqwest::Client::new(), remote)
    }

    pub fn with_client(client: reqwest::Client, remote: &RemoteConfig) -> Result<Self, RepositoryError> {
        let endpoint = endpoint_url(&remote.base_url)?;
        Ok(Self {
            client,
            endpoint,
            api_key: remote.api_key.clone(),
        })
    }

    fn request(&self, method: Method) -> RequestBuilder {
        self.client
            .request(method, self.endpoint.clone())
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn fetch(&self, request: RequestBuilder) -> Result<Vec<Notification>, RepositoryError> {
        let response = check(request.send().await?).await?;
        let rows: Vec<NotificationRow> = response.json().await?;
        Ok(rows.into_iter().map(Notification::from).collect())
    }
}

fn endpoint_url(base_url: &str) -> Result<Url, RepositoryError> {
    let invalid = |error: &dyn std::fmt::Display| {
        RepositoryError::Unavailable(format!("invalid base URL `{base_url}`: {error}"))
    };
    let mut base = Url::parse(base_url).map_err(|error| invalid(&error))?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(&format!("rest/v1/{NOTIFICATIONS_TABLE}"))
        .map_err(|error| invalid(&error))
}

#[async_trait]
impl NotificationRepository for RestNotificationRepository {
    async fn list(&self) -> Result<Vec<Notification>, RepositoryError> {
        let request = self
            .request(Method::GET)
            .query(&[("select", "*"), ("order", "created_at.desc")]);
        self.fetch(request).await
    }

    async fn insert(&self, draft: NewNotification) -> Result<Notification, RepositoryError> {
        let request = self
            .request(Method::POST)
            .header("Prefer", "return=representation")
            .json(&InsertRow::from(&draft));
        self.fetch(request)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RepositoryError::Decode("insert returned no record".to_string()))
    }

    async fn update_read_status(
        &self,
        ids: &[NotificationId],
        is_read: bool,
    ) -> Result<(), RepositoryError> {
        if ids.is_empty() {
            return Ok(());
        }
        let request = self
            .request(Method::PATCH)
            .header("Prefer", "return=minimal")
            .query(&[("id", id_filter(ids))])
            .json(&serde_json::json!({ "is_read": is_read }));
        check(request.send().await?).await?;
        Ok(())
    }

    async fn delete_by_ids(&self, ids: &[NotificationId]) -> Result<(), RepositoryError> {
        if ids.is_empty() {
            return Ok(());
        }
        let request = self
            .request(Method::DELETE)
            .query(&[("id", id_filter(ids))]);
        check(request.send().await?).await?;
        Ok(())
    }

    async fn find_for_source(
        &self,
        source_id: &str,
        source_kind: SourceKind,
    ) -> Result<Option<Notification>, RepositoryError> {
        let request = self.request(Method::GET).query(&[
            ("select", "*".to_string()),
            ("source_id", format!("eq.{source_id}")),
            ("source_type", format!("eq.{}", source_kind.as_str())),
            ("limit", "1".to_string()),
        ]);
        Ok(self.fetch(request).await?.into_iter().next())
    }
}
