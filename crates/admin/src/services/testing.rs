//! In-memory collaborators for service and route tests.

#![allow(clippy::unwrap_used)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use supernova_core::{User, UserId, UserRole, UserUpdate};
use tokio::sync::Notify;

use crate::gemini::{GeminiError, Prompt, TextGenerator};
use crate::registry::{ApiResponse, ImageUpload, LoginData, RegistryApi, RegistryError};

pub fn user(id: &str, phone: &str, role: Option<UserRole>) -> User {
    let created_at: DateTime<Utc> = "2024-05-01T08:00:00Z".parse().unwrap();
    User {
        id: UserId::new(id),
        name: format!("User {id}"),
        phone: phone.to_string(),
        role,
        is_deleted: false,
        created_at,
        updated_at: created_at,
        image: None,
        gender: None,
        blood_group: None,
        date_of_birth: None,
        about: None,
        bio: None,
        website: None,
        location: None,
        permanent_address: None,
    }
}

pub fn ok<T>(data: T) -> ApiResponse<T> {
    ApiResponse {
        success: true,
        message: "ok".to_string(),
        data: Some(data),
    }
}

pub fn failed<T>(message: &str) -> ApiResponse<T> {
    ApiResponse {
        success: false,
        message: message.to_string(),
        data: None,
    }
}

/// Scripted registry. `None` replies simulate a transport failure.
pub struct FakeRegistry {
    pub login: Mutex<Option<ApiResponse<LoginData>>>,
    pub users: Mutex<Option<ApiResponse<Vec<User>>>>,
    pub update: Mutex<Option<ApiResponse<User>>>,
    /// When set, `list_users` waits for a notification before replying.
    pub hold: Mutex<Option<Arc<Notify>>>,
    pub list_calls: AtomicUsize,
    pub tokens_seen: Mutex<Vec<String>>,
    pub updates_seen: Mutex<Vec<(UserId, Vec<(&'static str, String)>, bool)>>,
}

impl FakeRegistry {
    /// Accepts any password and returns `users` to token `tok-123`.
    pub fn with_users(users: Vec<User>) -> Arc<Self> {
        Arc::new(Self {
            login: Mutex::new(Some(ok(LoginData {
                access_token: "tok-123".to_string(),
            }))),
            users: Mutex::new(Some(ok(users))),
            update: Mutex::new(None),
            hold: Mutex::new(None),
            list_calls: AtomicUsize::new(0),
            tokens_seen: Mutex::new(Vec::new()),
            updates_seen: Mutex::new(Vec::new()),
        })
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

impl RegistryApi for FakeRegistry {
    async fn login(
        &self,
        _phone: &str,
        _password: &SecretString,
    ) -> Result<ApiResponse<LoginData>, RegistryError> {
        self.login
            .lock()
            .unwrap()
            .clone()
            .ok_or(RegistryError::Status(502))
    }

    async fn list_users(
        &self,
        token: &SecretString,
    ) -> Result<ApiResponse<Vec<User>>, RegistryError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.tokens_seen
            .lock()
            .unwrap()
            .push(token.expose_secret().to_string());

        let hold = self.hold.lock().unwrap().clone();
        if let Some(hold) = hold {
            hold.notified().await;
        }

        self.users
            .lock()
            .unwrap()
            .clone()
            .ok_or(RegistryError::Status(503))
    }

    async fn update_user(
        &self,
        _token: &SecretString,
        id: &UserId,
        update: &UserUpdate,
        image: Option<ImageUpload>,
    ) -> Result<ApiResponse<User>, RegistryError> {
        self.updates_seen
            .lock()
            .unwrap()
            .push((id.clone(), update.form_fields(), image.is_some()));
        self.update
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| RegistryError::Parse("connection reset".to_string()))
    }
}

/// Scripted text generator. `None` simulates an API failure.
pub struct FakeGenerator {
    pub reply: Mutex<Option<String>>,
    pub prompts: Mutex<Vec<Prompt>>,
}

impl FakeGenerator {
    pub fn replying(reply: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            reply: Mutex::new(reply.map(str::to_string)),
            prompts: Mutex::new(Vec::new()),
        })
    }
}

impl TextGenerator for FakeGenerator {
    async fn generate(&self, prompt: &Prompt) -> Result<String, GeminiError> {
        self.prompts.lock().unwrap().push(prompt.clone());
        self.reply.lock().unwrap().clone().ok_or(GeminiError::Api {
            status: "UNAVAILABLE".to_string(),
            message: "The model is overloaded.".to_string(),
        })
    }
}
