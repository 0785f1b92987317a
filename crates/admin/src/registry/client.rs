//! Registry REST client.

use std::sync::Arc;

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use supernova_core::{User, UserId, UserUpdate};
use tracing::instrument;
use url::Url;

use crate::config::RegistryConfig;

use super::error::RegistryError;
use super::types::{ApiResponse, ImageUpload, LoginData, LoginRequest};
use super::RegistryApi;

const LOGIN_PATH: &str = "api/v1/auth/login/";
const USERS_PATH: &str = "api/v1/users/";
const UPDATE_USER_PATH: &str = "api/v1/users/update-user/";

/// Registry REST client.
///
/// Holds no token of its own; the caller passes the operator's bearer token
/// on every authenticated call.
#[derive(Clone)]
pub struct RegistryClient {
    inner: Arc<RegistryClientInner>,
}

struct RegistryClientInner {
    client: reqwest::Client,
    base_url: Url,
}

impl RegistryClient {
    /// Create a new registry client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &RegistryConfig) -> Result<Self, RegistryError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            inner: Arc::new(RegistryClientInner {
                client,
                base_url: config.base_url.clone(),
            }),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, RegistryError> {
        self.inner
            .base_url
            .join(path)
            .map_err(|e| RegistryError::Parse(format!("Invalid registry URL: {e}")))
    }

    fn bearer(token: &SecretString) -> Result<HeaderValue, RegistryError> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
            .map_err(|_| RegistryError::InvalidToken)?;
        value.set_sensitive(true);
        Ok(value)
    }

    /// Decode the envelope without looking at the HTTP status.
    async fn decode<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<ApiResponse<T>, RegistryError> {
        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| RegistryError::Parse(format!("Failed to parse response: {e}")))
    }
}

impl RegistryApi for RegistryClient {
    #[instrument(skip(self, password), fields(phone = %phone))]
    async fn login(
        &self,
        phone: &str,
        password: &SecretString,
    ) -> Result<ApiResponse<LoginData>, RegistryError> {
        let url = self.endpoint(LOGIN_PATH)?;
        let response = self
            .inner
            .client
            .post(url)
            .json(&LoginRequest { phone, password })
            .send()
            .await?;

        tracing::debug!(status = response.status().as_u16(), "Login response");
        Self::decode(response).await
    }

    #[instrument(skip(self, token))]
    async fn list_users(
        &self,
        token: &SecretString,
    ) -> Result<ApiResponse<Vec<User>>, RegistryError> {
        let url = self.endpoint(USERS_PATH)?;
        let response = self
            .inner
            .client
            .get(url)
            .header(reqwest::header::AUTHORIZATION, Self::bearer(token)?)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RegistryError::Status(status.as_u16()));
        }

        Self::decode(response).await
    }

    #[instrument(skip(self, token, update, image), fields(user_id = %id, has_image = image.is_some()))]
    async fn update_user(
        &self,
        token: &SecretString,
        id: &UserId,
        update: &UserUpdate,
        image: Option<ImageUpload>,
    ) -> Result<ApiResponse<User>, RegistryError> {
        let mut url = self.endpoint(UPDATE_USER_PATH)?;
        url.path_segments_mut()
            .map_err(|()| RegistryError::Parse("Registry URL cannot be a base".to_string()))?
            .pop_if_empty()
            .push(id.as_str());

        let mut form = Form::new();
        for (name, value) in update.form_fields() {
            form = form.text(name, value);
        }
        if let Some(image) = image {
            let part = Part::bytes(image.bytes)
                .file_name(image.file_name)
                .mime_str(&image.content_type)?;
            form = form.part("file", part);
        }

        let response = self
            .inner
            .client
            .patch(url)
            .header(reqwest::header::AUTHORIZATION, Self::bearer(token)?)
            .multipart(form)
            .send()
            .await?;

        tracing::debug!(status = response.status().as_u16(), "Update response");
        Self::decode(response).await
    }
}
