//! Session Store
//!
//! Owns the server-side view of who is signed in. The provider only issues
//! credentials; this component turns them into bearer sessions, keeps
//! pending phone verifications, and publishes the most recent
//! authentication change to subscribers.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::models::{AuthCredential, AuthUser, IdentityError, PhoneVerification, Session, SessionInfo};
use super::provider::IdentityProvider;

const GOOGLE_PROVIDER_ID: &str = "google.com";
const PHONE_VERIFICATION_TTL_MINUTES: i64 = 10;
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

struct PendingPhone {
    verification: PhoneVerification,
    expires_at: DateTime<Utc>,
}

pub struct SessionStore {
    provider: Arc<dyn IdentityProvider>,
    sessions: DashMap<String, Session>,
    pending_phone: DashMap<String, PendingPhone>,
    ttl: ChronoDuration,
    current: watch::Sender<Option<AuthUser>>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl SessionStore {
    pub fn new(provider: Arc<dyn IdentityProvider>, ttl: Duration) -> Self {
        let (current, _) = watch::channel(None);
        Self {
            provider,
            sessions: DashMap::new(),
            pending_phone: DashMap::new(),
            ttl: ChronoDuration::from_std(ttl).unwrap_or_else(|_| ChronoDuration::hours(1)),
            current,
            sweeper: Mutex::new(None),
        }
    }

    /// Start the background sweep of expired sessions. Idempotent.
    pub fn init(self: &Arc<Self>) {
        let Ok(mut sweeper) = self.sweeper.lock() else {
            return;
        };
        if sweeper.is_some() {
            return;
        }

        let weak: Weak<Self> = Arc::downgrade(self);
        *sweeper = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(SWEEP_INTERVAL);
            loop {
                interval.tick().await;
                let Some(store) = weak.upgrade() else { break };
                store.purge_expired(Utc::now());
            }
        }));
        tracing::info!("Session store initialized (ttl {}s)", self.ttl.num_seconds());
    }

    /// Stop the sweeper and drop every session and pending verification.
    pub fn dispose(&self) {
        if let Ok(mut sweeper) = self.sweeper.lock()
            && let Some(handle) = sweeper.take()
        {
            handle.abort();
        }
        let count = self.sessions.len();
        self.sessions.clear();
        self.pending_phone.clear();
        self.current.send_replace(None);
        tracing::info!("Session store disposed ({} session(s) dropped)", count);
    }

    /// Most recent authentication change: the user who last signed in, or
    /// `None` after their logout.
    pub fn subscribe(&self) -> watch::Receiver<Option<AuthUser>> {
        self.current.subscribe()
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SessionInfo, IdentityError> {
        let credential = self.provider.sign_in(email, password).await?;
        Ok(self.open_session(credential))
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SessionInfo, IdentityError> {
        let credential = self.provider.sign_up(email, password).await?;
        Ok(self.open_session(credential))
    }

    pub async fn sign_in_with_google(&self, id_token: &str) -> Result<SessionInfo, IdentityError> {
        let credential = self.provider.sign_in_with_oauth(GOOGLE_PROVIDER_ID, id_token).await?;
        Ok(self.open_session(credential))
    }

    /// Send an OTP and return the verification id to confirm it with.
    pub async fn sign_in_with_phone(&self, phone_number: &str, recaptcha_token: &str) -> Result<String, IdentityError> {
        let verification = self.provider.send_phone_code(phone_number, recaptcha_token).await?;
        let verification_id = Uuid::new_v4().to_string();
        self.pending_phone.insert(
            verification_id.clone(),
            PendingPhone {
                verification,
                expires_at: Utc::now() + ChronoDuration::minutes(PHONE_VERIFICATION_TTL_MINUTES),
            },
        );
        tracing::info!("Phone verification started ({})", verification_id);
        Ok(verification_id)
    }

    pub async fn confirm_phone_sign_in(&self, verification_id: &str, code: &str) -> Result<SessionInfo, IdentityError> {
        let now = Utc::now();
        let pending = self
            .pending_phone
            .get(verification_id)
            .map(|p| (p.verification.clone(), p.expires_at > now));

        let pending = match pending {
            Some((verification, true)) => verification,
            Some((_, false)) => {
                self.pending_phone.remove(verification_id);
                return Err(IdentityError::VerificationExpired);
            },
            None => return Err(IdentityError::VerificationExpired),
        };

        // A wrong code keeps the verification so the user can retry.
        let credential = self.provider.confirm_phone_code(&pending, code).await?;
        self.pending_phone.remove(verification_id);
        Ok(self.open_session(credential))
    }

    pub fn logout(&self, session_id: &str) {
        if let Some((_, session)) = self.sessions.remove(session_id) {
            tracing::info!("User {} signed out", session.credential.user.uid);
            self.current.send_if_modified(|current| {
                if current.as_ref().map(|u| &u.uid) == Some(&session.credential.user.uid) {
                    *current = None;
                    true
                } else {
                    false
                }
            });
        }
    }

    pub fn current_user(&self, session_id: &str) -> Result<AuthUser, IdentityError> {
        let expired = match self.sessions.get(session_id) {
            Some(session) if !session.is_expired(Utc::now()) => return Ok(session.credential.user.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.sessions.remove(session_id);
        }
        Err(IdentityError::SessionNotFound)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    fn open_session(&self, credential: AuthCredential) -> SessionInfo {
        let now = Utc::now();
        let session_id = Uuid::new_v4().to_string();
        let expires_at = now + self.ttl;
        let user = credential.user.clone();
        let is_new_user = credential.is_new_user;

        self.sessions.insert(
            session_id.clone(),
            Session { id: session_id.clone(), credential, created_at: now, expires_at },
        );
        self.current.send_replace(Some(user.clone()));
        tracing::info!("User {} signed in via {}", user.uid, user.provider_id);

        SessionInfo { session_id, user, expires_at, is_new_user }
    }

    fn purge_expired(&self, now: DateTime<Utc>) {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| !s.is_expired(now));
        self.pending_phone.retain(|_, p| p.expires_at > now);
        let purged = before.saturating_sub(self.sessions.len());
        if purged > 0 {
            tracing::debug!("Purged {} expired session(s)", purged);
        }
    }
}
