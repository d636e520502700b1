#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use trakt_auth::auth::{
    AuthError, ClientCredentials, Clock, DeviceAuthController, DeviceCodeGrant, TokenRecord,
    TokenStore,
};
use wiremock::MockServer;

pub const CLIENT_ID: &str = "client-id";
pub const CLIENT_SECRET: &str = "client-secret";

enum Stored {
    Missing,
    Corrupt,
    Record(TokenRecord),
}

/// Token store kept in memory; can pretend the file is corrupt or unwritable.
pub struct InMemoryTokenStore {
    stored: Mutex<Stored>,
    saves: Mutex<usize>,
    fail_saves: bool,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self {
            stored: Mutex::new(Stored::Missing),
            saves: Mutex::new(0),
            fail_saves: false,
        }
    }

    /// Every `save` fails like a full disk; nothing is stored.
    pub fn failing_saves(mut self) -> Self {
        self.fail_saves = true;
        self
    }

    pub fn with_record(record: TokenRecord) -> Self {
        let store = Self::new();
        *store.stored.lock().expect("store lock poisoned") = Stored::Record(record);
        store
    }

    pub fn corrupt() -> Self {
        let store = Self::new();
        *store.stored.lock().expect("store lock poisoned") = Stored::Corrupt;
        store
    }

    pub fn get(&self) -> Option<TokenRecord> {
        match &*self.stored.lock().expect("store lock poisoned") {
            Stored::Record(record) => Some(record.clone()),
            _ => None,
        }
    }

    pub fn save_count(&self) -> usize {
        *self.saves.lock().expect("store lock poisoned")
    }
}

impl TokenStore for InMemoryTokenStore {
    fn load(&self) -> Result<TokenRecord, AuthError> {
        match &*self.stored.lock().expect("store lock poisoned") {
            Stored::Missing => Err(AuthError::NoTokenFile),
            Stored::Corrupt => Err(AuthError::CorruptTokenFile("expected value".to_string())),
            Stored::Record(record) => Ok(record.clone()),
        }
    }

    fn save(&self, record: &TokenRecord) -> Result<(), AuthError> {
        if self.fail_saves {
            return Err(AuthError::Io("No space left on device".to_string()));
        }
        *self.stored.lock().expect("store lock poisoned") = Stored::Record(record.clone());
        *self.saves.lock().expect("store lock poisoned") += 1;
        Ok(())
    }
}

/// Clock whose `sleep` advances time instantly and records the wait.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(start_time()),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().expect("clock lock poisoned").clone()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock lock poisoned")
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps
            .lock()
            .expect("clock lock poisoned")
            .push(duration);
        let step = chrono::Duration::from_std(duration).expect("sleep fits in chrono");
        *self.now.lock().expect("clock lock poisoned") += step;
    }
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

/// Record that stays valid for `days_left` more days from [`start_time`].
pub fn record_expiring_in(access: &str, refresh: &str, days_left: i64) -> TokenRecord {
    let lifetime = chrono::Duration::days(90);
    TokenRecord {
        access_token: access.to_string(),
        refresh_token: refresh.to_string(),
        expires_in: lifetime.num_seconds(),
        created_at: (start_time() + chrono::Duration::days(days_left) - lifetime).timestamp(),
    }
}

/// Prompt that remembers every grant it was asked to show.
#[derive(Default)]
pub struct RecordingPrompt {
    shown: Mutex<Vec<DeviceCodeGrant>>,
}

impl RecordingPrompt {
    pub fn shown(&self) -> Vec<DeviceCodeGrant> {
        self.shown.lock().expect("prompt lock poisoned").clone()
    }
}

impl trakt_auth::auth::DevicePrompt for RecordingPrompt {
    fn show(&self, grant: &DeviceCodeGrant) {
        self.shown
            .lock()
            .expect("prompt lock poisoned")
            .push(grant.clone());
    }
}

pub struct Harness {
    pub store: Arc<InMemoryTokenStore>,
    pub clock: Arc<ManualClock>,
    pub prompt: Arc<RecordingPrompt>,
    pub controller: DeviceAuthController,
}

pub fn harness(server: &MockServer, store: InMemoryTokenStore) -> Harness {
    let store = Arc::new(store);
    let clock = Arc::new(ManualClock::new());
    let prompt = Arc::new(RecordingPrompt::default());
    let controller =
        DeviceAuthController::new(ClientCredentials::new(CLIENT_ID, CLIENT_SECRET), store.clone())
            .with_base_url(server.uri())
            .with_clock(clock.clone())
            .with_prompt(prompt.clone());
    Harness {
        store,
        clock,
        prompt,
        controller,
    }
}
