use crate::infrastructure::error::InfraError;
use crate::infrastructure::event_mapper::{WireEvent, WirePayload};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use url::Url;

#[async_trait]
pub trait ScheduleApiClient: Send + Sync {
    async fn list_events(&self, owner: &str) -> Result<Vec<WireEvent>, InfraError>;

    async fn create_event(
        &self,
        owner: &str,
        payload: &WirePayload,
    ) -> Result<WireEvent, InfraError>;

    async fn update_event(
        &self,
        owner: &str,
        event_id: i64,
        payload: &WirePayload,
    ) -> Result<WireEvent, InfraError>;

    async fn delete_event(&self, event_id: i64) -> Result<(), InfraError>;

    async fn upload_file(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, InfraError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestScheduleApiClient {
    client: Client,
    base_url: Url,
}

impl ReqwestScheduleApiClient {
    pub fn new(base_url: &str) -> Result<Self, InfraError> {
        let base_url = Url::parse(base_url.trim()).map_err(|error| {
            InfraError::InvalidConfig(format!("invalid api base url '{base_url}': {error}"))
        })?;
        Ok(Self {
            client: Client::new(),
            base_url,
        })
    }

    fn ensure_non_empty(value: &str, field: &str) -> Result<(), InfraError> {
        if value.trim().is_empty() {
            return Err(InfraError::InvalidConfig(format!("{field} must not be empty")));
        }
        Ok(())
    }

    fn api_http_error(status: reqwest::StatusCode, body: &str) -> InfraError {
        let message = if body.trim().is_empty() {
            format!("schedule api error: http {}", status.as_u16())
        } else {
            format!("schedule api error: http {}; body={body}", status.as_u16())
        };
        InfraError::Api(message)
    }

    fn endpoint(&self, segments: &[&str], owner: Option<&str>) -> Result<Url, InfraError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| InfraError::InvalidConfig("api base URL cannot be a base".to_string()))?;
            for segment in segments {
                path.push(segment);
            }
        }
        // Requests are always scoped by owner through a query parameter,
        // never a path segment.
        if let Some(owner) = owner {
            url.query_pairs_mut().append_pair("email", owner);
        }
        Ok(url)
    }

    fn events_endpoint(&self, owner: Option<&str>) -> Result<Url, InfraError> {
        self.endpoint(&["api", "events"], owner)
    }

    fn event_endpoint(&self, event_id: i64, owner: Option<&str>) -> Result<Url, InfraError> {
        self.endpoint(&["api", "events", &event_id.to_string()], owner)
    }

    fn upload_endpoint(&self) -> Result<Url, InfraError> {
        self.endpoint(&["api", "files", "upload"], None)
    }
}

#[async_trait]
impl ScheduleApiClient for ReqwestScheduleApiClient {
    async fn list_events(&self, owner: &str) -> Result<Vec<WireEvent>, InfraError> {
        Self::ensure_non_empty(owner, "owner e-mail")?;

        let endpoint = self.events_endpoint(Some(owner))?;
        let response = self
            .client
            .get(endpoint)
            .send()
            .await
            .map_err(|error| InfraError::Api(format!("network error while listing events: {error}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| InfraError::Api(format!("failed reading events list response: {error}")))?;

        if !status.is_success() {
            return Err(Self::api_http_error(status, &body));
        }

        // A body that is not a JSON array degrades to an empty schedule
        // rather than a failed load.
        let Ok(parsed) = serde_json::from_str::<serde_json::Value>(&body) else {
            return Ok(Vec::new());
        };
        let Some(items) = parsed.as_array() else {
            return Ok(Vec::new());
        };

        Ok(items
            .iter()
            .filter_map(|item| serde_json::from_value::<WireEvent>(item.clone()).ok())
            .collect())
    }

    async fn create_event(
        &self,
        owner: &str,
        payload: &WirePayload,
    ) -> Result<WireEvent, InfraError> {
        Self::ensure_non_empty(owner, "owner e-mail")?;

        let endpoint = self.events_endpoint(Some(owner))?;
        let response = self
            .client
            .post(endpoint)
            .json(payload)
            .send()
            .await
            .map_err(|error| InfraError::Api(format!("network error while creating event: {error}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| InfraError::Api(format!("failed reading event create response: {error}")))?;

        if !status.is_success() {
            return Err(Self::api_http_error(status, &body));
        }

        serde_json::from_str::<WireEvent>(&body).map_err(|error| {
            InfraError::Api(format!("invalid event create payload: {error}; body={body}"))
        })
    }

    async fn update_event(
        &self,
        owner: &str,
        event_id: i64,
        payload: &WirePayload,
    ) -> Result<WireEvent, InfraError> {
        Self::ensure_non_empty(owner, "owner e-mail")?;

        let endpoint = self.event_endpoint(event_id, Some(owner))?;
        let response = self
            .client
            .put(endpoint)
            .json(payload)
            .send()
            .await
            .map_err(|error| InfraError::Api(format!("network error while updating event: {error}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| InfraError::Api(format!("failed reading event update response: {error}")))?;

        if !status.is_success() {
            return Err(Self::api_http_error(status, &body));
        }

        serde_json::from_str::<WireEvent>(&body).map_err(|error| {
            InfraError::Api(format!("invalid event update payload: {error}; body={body}"))
        })
    }

    async fn delete_event(&self, event_id: i64) -> Result<(), InfraError> {
        let endpoint = self.event_endpoint(event_id, None)?;
        let response = self
            .client
            .delete(endpoint)
            .send()
            .await
            .map_err(|error| InfraError::Api(format!("network error while deleting event: {error}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| InfraError::Api(format!("failed reading event delete response: {error}")))?;

        if !status.is_success() {
            return Err(Self::api_http_error(status, &body));
        }
        Ok(())
    }

    async fn upload_file(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, InfraError> {
        Self::ensure_non_empty(file_name, "file name")?;

        let endpoint = self.upload_endpoint()?;
        let form = Form::new().part("file", Part::bytes(bytes).file_name(file_name.to_string()));
        let response = self
            .client
            .post(endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|error| InfraError::Api(format!("network error while uploading file: {error}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| InfraError::Api(format!("failed reading file upload response: {error}")))?;

        if !status.is_success() {
            return Err(Self::api_http_error(status, &body));
        }

        let stored_path = body.trim();
        if stored_path.is_empty() {
            return Err(InfraError::Api(
                "file upload response did not include a path".to_string(),
            ));
        }
        Ok(stored_path.to_string())
    }
}
