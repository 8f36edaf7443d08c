//! Credential-based authentication with a session cache.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use log::{debug, info};
use reqwest::header::SET_COOKIE;

use crate::config::{Config, AUTH_SESSION_TIMEOUT, FORM_LOGIN_ACCEPTED_STATUS};
use crate::error_handling::{describe_reqwest_error, InitializationError, PatrolError};
use crate::models::AuthConfig;
use crate::services::traits::{AuthContext, AuthProvider};

/// (auth type, every parameter serialized in key order)
type SessionKey = (String, String);

#[derive(Debug, Clone)]
struct CachedSession {
    context: AuthContext,
    expires_at: Instant,
}

/// Built-in [`AuthProvider`] for `basic`, `bearer` and `form` logins.
///
/// Contexts are cached per auth type and full parameter set until the
/// session lifetime elapses, so a task run against many websites logs in
/// once. Configs that differ in any credential never share a session.
#[derive(Debug)]
pub struct CredentialAuthProvider {
    // Redirects are not followed so a 302 after form login is observed and its
    // Set-Cookie headers are kept.
    client: reqwest::Client,
    session_timeout: Duration,
    sessions: Mutex<HashMap<SessionKey, CachedSession>>,
}

impl CredentialAuthProvider {
    /// # Errors
    ///
    /// Returns `InitializationError::HttpClientError` if the login client
    /// cannot be built.
    pub fn new(config: &Config) -> Result<Self, InitializationError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent.clone())
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self {
            client,
            session_timeout: AUTH_SESSION_TIMEOUT,
            sessions: Mutex::new(HashMap::new()),
        })
    }

    pub fn with_session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = timeout;
        self
    }

    /// Number of cached, unexpired sessions.
    pub fn active_sessions(&self) -> usize {
        let now = Instant::now();
        self.lock()
            .values()
            .filter(|s| s.expires_at > now)
            .count()
    }

    /// Drops expired sessions from the cache.
    pub fn cleanup_expired(&self) {
        let now = Instant::now();
        self.lock().retain(|(auth_type, _), session| {
            let keep = session.expires_at > now;
            if !keep {
                info!("Removed expired {auth_type} auth session");
            }
            keep
        });
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<SessionKey, CachedSession>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn cached(&self, key: &SessionKey) -> Option<AuthContext> {
        let mut sessions = self.lock();
        match sessions.get(key) {
            Some(session) if session.expires_at > Instant::now() => Some(session.context.clone()),
            Some(_) => {
                sessions.remove(key);
                None
            }
            None => None,
        }
    }

    async fn form_login(&self, config: &AuthConfig) -> Result<AuthContext, PatrolError> {
        let login_url = required(config, "login_url", "form")?;
        let username = required(config, "username", "form")?;
        let password = required(config, "password", "form")?;
        let username_field = config
            .param("username_field")
            .unwrap_or_else(|| "username".to_string());
        let password_field = config
            .param("password_field")
            .unwrap_or_else(|| "password".to_string());

        let mut form: BTreeMap<String, String> = BTreeMap::new();
        form.insert(username_field, username);
        form.insert(password_field, password);
        form.extend(config.string_map("additional_fields"));

        let response = self
            .client
            .post(&login_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                PatrolError::AuthFailure(format!(
                    "login request to {login_url} failed: {}",
                    describe_reqwest_error(&e)
                ))
            })?;

        let status = response.status().as_u16();
        if !FORM_LOGIN_ACCEPTED_STATUS.contains(&status) {
            return Err(PatrolError::AuthFailure(format!(
                "login to {login_url} failed with status {status}"
            )));
        }

        let cookies = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(parse_set_cookie)
            .collect();

        Ok(AuthContext {
            headers: BTreeMap::new(),
            cookies,
        })
    }
}

fn session_key(auth_type: &str, config: &AuthConfig) -> SessionKey {
    // BTreeMap keeps parameter order stable across equal configs
    let params = serde_json::to_string(&config.params).unwrap_or_default();
    (auth_type.to_string(), params)
}

fn required(config: &AuthConfig, key: &str, auth_type: &str) -> Result<String, PatrolError> {
    config
        .param(key)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| PatrolError::AuthFailure(format!("{key} required for {auth_type} auth")))
}

/// `name=value` from a `Set-Cookie` header, dropping attributes.
fn parse_set_cookie(header: &str) -> Option<(String, String)> {
    let pair = header.split(';').next()?;
    let (name, value) = pair.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), value.trim().to_string()))
}

fn basic(config: &AuthConfig) -> Result<AuthContext, PatrolError> {
    let username = required(config, "username", "basic")?;
    let password = required(config, "password", "basic")?;
    let credentials = BASE64.encode(format!("{username}:{password}"));
    let mut ctx = AuthContext::default();
    ctx.headers
        .insert("Authorization".to_string(), format!("Basic {credentials}"));
    Ok(ctx)
}

fn bearer(config: &AuthConfig) -> Result<AuthContext, PatrolError> {
    let token = required(config, "token", "bearer")?;
    let mut ctx = AuthContext::default();
    ctx.headers
        .insert("Authorization".to_string(), format!("Bearer {token}"));
    Ok(ctx)
}

#[async_trait]
impl AuthProvider for CredentialAuthProvider {
    async fn authenticate(
        &self,
        auth_type: &str,
        config: &AuthConfig,
    ) -> Result<AuthContext, PatrolError> {
        let auth_type = auth_type.trim().to_ascii_lowercase();
        let key = session_key(&auth_type, config);
        if let Some(ctx) = self.cached(&key) {
            debug!("Reusing cached {auth_type} auth session");
            return Ok(ctx);
        }

        let ctx = match auth_type.as_str() {
            "basic" => basic(config)?,
            "bearer" => bearer(config)?,
            "form" => self.form_login(config).await?,
            other => {
                return Err(PatrolError::AuthFailure(format!(
                    "unknown auth type '{other}'"
                )))
            }
        };

        self.lock().insert(
            key,
            CachedSession {
                context: ctx.clone(),
                expires_at: Instant::now() + self.session_timeout,
            },
        );
        info!("Created {auth_type} auth session");
        Ok(ctx)
    }
}
