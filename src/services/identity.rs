use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use crate::config::IdentitySettings;
use crate::error::SubmissionError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredUser {
    pub uid: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
}

/// Creates accounts. Called exactly once per confirmed signup.
#[async_trait]
pub trait RegistrationService: Send + Sync {
    async fn register(
        &self,
        email: &str,
        password: &str,
    ) -> Result<RegisteredUser, SubmissionError>;
}

/// Email/password sign-up against an Identity Toolkit style REST endpoint.
#[derive(Clone)]
pub struct IdentityToolkitClient {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignUpRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignUpResponse {
    local_id: String,
    email: String,
    id_token: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl IdentityToolkitClient {
    /// Fails with `Disabled` when no API key is configured.
    pub fn new(settings: &IdentitySettings) -> Result<Self, SubmissionError> {
        let api_key = settings.api_key.clone().ok_or(SubmissionError::Disabled)?;
        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/accounts:signUp?key={}", self.base_url, self.api_key)
    }
}

#[async_trait]
impl RegistrationService for IdentityToolkitClient {
    async fn register(
        &self,
        email: &str,
        password: &str,
    ) -> Result<RegisteredUser, SubmissionError> {
        let body = SignUpRequest {
            email,
            password,
            return_secure_token: true,
        };
        let response = self.client.post(self.endpoint()).json(&body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let envelope: ErrorEnvelope = response
                .json()
                .await
                .map_err(|_| SubmissionError::Rejected(format!("HTTP {status}")))?;
            return Err(map_error_code(&envelope.error.message));
        }

        let created: SignUpResponse = response.json().await?;
        debug!(uid = %created.local_id, "account created");
        Ok(RegisteredUser {
            uid: created.local_id,
            email: created.email,
            id_token: created.id_token,
        })
    }
}

/// Maps service error messages such as `WEAK_PASSWORD : Password should be
/// at least 6 characters` to typed errors.
pub fn map_error_code(message: &str) -> SubmissionError {
    let code = message.split(|c: char| c == ' ' || c == ':').next().unwrap_or(message);
    match code {
        "EMAIL_EXISTS" => SubmissionError::EmailExists,
        "INVALID_EMAIL" => SubmissionError::InvalidEmail,
        "WEAK_PASSWORD" => SubmissionError::WeakPassword,
        "TOO_MANY_ATTEMPTS_TRY_LATER" => SubmissionError::TooManyAttempts,
        "OPERATION_NOT_ALLOWED" => SubmissionError::Disabled,
        _ => SubmissionError::Rejected(message.to_string()),
    }
}

/// Process-local registry for offline runs and tests.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    accounts: Mutex<HashMap<String, String>>,
    calls: AtomicUsize,
    min_password_len: usize,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self {
            min_password_len: 6,
            ..Self::default()
        }
    }

    /// How many times `register` was called, successful or not.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn contains(&self, email: &str) -> bool {
        self.accounts
            .lock()
            .map(|accounts| accounts.contains_key(&email.to_lowercase()))
            .unwrap_or(false)
    }
}

#[async_trait]
impl RegistrationService for InMemoryRegistry {
    async fn register(
        &self,
        email: &str,
        password: &str,
    ) -> Result<RegisteredUser, SubmissionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if password.chars().count() < self.min_password_len {
            return Err(SubmissionError::WeakPassword);
        }

        let key = email.to_lowercase();
        let mut accounts = self
            .accounts
            .lock()
            .map_err(|_| SubmissionError::Rejected("registry lock poisoned".into()))?;
        if accounts.contains_key(&key) {
            return Err(SubmissionError::EmailExists);
        }
        let uid = Uuid::new_v4().to_string();
        accounts.insert(key, uid.clone());

        Ok(RegisteredUser {
            uid,
            email: email.to_string(),
            id_token: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_codes_map_to_typed_errors() {
        assert_eq!(map_error_code("EMAIL_EXISTS"), SubmissionError::EmailExists);
        assert_eq!(
            map_error_code("WEAK_PASSWORD : Password should be at least 6 characters"),
            SubmissionError::WeakPassword
        );
        assert_eq!(
            map_error_code("SOMETHING_ELSE"),
            SubmissionError::Rejected("SOMETHING_ELSE".into())
        );
    }

    #[test]
    fn client_needs_a_key() {
        assert!(matches!(
            IdentityToolkitClient::new(&IdentitySettings::default()),
            Err(SubmissionError::Disabled)
        ));

        let client = IdentityToolkitClient::new(&IdentitySettings {
            base_url: "http://localhost:9099/".into(),
            api_key: Some("k".into()),
        })
        .unwrap();
        assert_eq!(client.endpoint(), "http://localhost:9099/v1/accounts:signUp?key=k");
    }

    #[tokio::test]
    async fn in_memory_registry_rejects_duplicates() {
        let registry = InMemoryRegistry::new();
        let user = registry.register("kim@test.com", "123456").await.unwrap();
        assert_eq!(user.email, "kim@test.com");
        assert!(registry.contains("KIM@test.com"));

        let again = registry.register("Kim@Test.com", "654321").await;
        assert_eq!(again, Err(SubmissionError::EmailExists));
        assert_eq!(
            registry.register("lee@test.com", "123").await,
            Err(SubmissionError::WeakPassword)
        );
        assert_eq!(registry.calls(), 3);
    }
}
