//! # Phone Uniqueness
//!
//! A phone field moves through `Idle -> Checking -> {Valid, Duplicate}`, or
//! straight to `Invalid` when the number is malformed. Remote answers are
//! shared across fields through a short-lived table keyed by the normalized
//! number, and each field discards answers for numbers it no longer holds.

use shared::{PhoneCheckResponse, StudentSummary};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::services::traits::StudentDirectory;
use crate::validation::phone::validate_format;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhoneValidation {
    Idle,
    Invalid { message: String },
    Checking { phone: String },
    Valid { phone: String },
    /// `conflict` is `None` when the remote reported a match without naming it
    Duplicate { phone: String, conflict: Option<StudentSummary> },
}

impl PhoneValidation {
    /// Submission is only blocked by a known problem; an outstanding check is not one.
    pub fn allows_submit(&self) -> bool {
        !matches!(self, PhoneValidation::Invalid { .. } | PhoneValidation::Duplicate { .. })
    }

    pub fn message(&self) -> Option<String> {
        match self {
            PhoneValidation::Invalid { message } => Some(message.clone()),
            PhoneValidation::Duplicate { conflict: Some(conflict), .. } => {
                Some(format!("This phone number is already registered to {}", conflict.name))
            }
            PhoneValidation::Duplicate { conflict: None, .. } => {
                Some("This phone number is already registered".to_string())
            }
            _ => None,
        }
    }
}

struct CachedCheck {
    checked_at: Instant,
    response: PhoneCheckResponse,
}

/// De-duplication table for remote phone checks
pub struct PhoneCheckCache {
    directory: Arc<dyn StudentDirectory>,
    ttl: Duration,
    entries: Mutex<HashMap<String, CachedCheck>>,
}

impl PhoneCheckCache {
    pub fn new(directory: Arc<dyn StudentDirectory>, ttl: Duration) -> Self {
        Self {
            directory,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Answer for a normalized phone, reusing a fresh cached answer when there is one.
    /// Failed checks are not cached.
    pub async fn lookup(&self, phone: &str) -> Result<PhoneCheckResponse, ApiError> {
        if let Some(response) = self.fresh(phone) {
            debug!("Phone check cache hit for {}", phone);
            return Ok(response);
        }

        let response = self.directory.check_phone(phone).await?;
        let mut entries = self.entries();
        entries.retain(|_, cached| cached.checked_at.elapsed() < self.ttl);
        entries.insert(
            phone.to_string(),
            CachedCheck {
                checked_at: Instant::now(),
                response: response.clone(),
            },
        );
        Ok(response)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn invalidate(&self, phone: &str) {
        self.entries().remove(phone);
    }

    pub fn clear(&self) {
        self.entries().clear();
    }

    fn fresh(&self, phone: &str) -> Option<PhoneCheckResponse> {
        let mut entries = self.entries();
        let cached = entries.get(phone)?;
        if cached.checked_at.elapsed() < self.ttl {
            return Some(cached.response.clone());
        }
        entries.remove(phone);
        None
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, CachedCheck>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Validation state of one phone input.
///
/// `editing_id` is the student being edited, if any; that student's own
/// number is not a conflict.
pub struct PhoneFieldSession {
    cache: Arc<PhoneCheckCache>,
    editing_id: Option<i64>,
    generation: AtomicU64,
    state: Mutex<PhoneValidation>,
}

impl PhoneFieldSession {
    pub fn new(cache: Arc<PhoneCheckCache>, editing_id: Option<i64>) -> Self {
        Self {
            cache,
            editing_id,
            generation: AtomicU64::new(0),
            state: Mutex::new(PhoneValidation::Idle),
        }
    }

    pub fn state(&self) -> PhoneValidation {
        self.lock_state().clone()
    }

    /// Validate a new input value and return the resulting state.
    ///
    /// If the input changes again while the remote check is outstanding, the
    /// earlier answer is dropped and the returned state is the newer one.
    pub async fn update(&self, raw: &str) -> PhoneValidation {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let phone = match validate_format(raw) {
            Ok(phone) => phone,
            Err(e) => {
                return self.apply(generation, PhoneValidation::Invalid { message: e.to_string() });
            }
        };

        self.apply(generation, PhoneValidation::Checking { phone: phone.clone() });
        let resolved = match self.cache.lookup(&phone).await {
            Ok(response) => self.resolve(phone, response),
            Err(e) => {
                warn!("Phone check for {} failed, accepting it: {}", phone, e);
                PhoneValidation::Valid { phone }
            }
        };
        self.apply(generation, resolved)
    }

    fn resolve(&self, phone: String, response: PhoneCheckResponse) -> PhoneValidation {
        if !response.exists {
            return PhoneValidation::Valid { phone };
        }
        match response.student {
            Some(owner) if self.editing_id == Some(owner.id) => PhoneValidation::Valid { phone },
            conflict => {
                debug!("Phone {} is taken by {:?}", phone, conflict.as_ref().map(|owner| owner.id));
                PhoneValidation::Duplicate { phone, conflict }
            }
        }
    }

    /// Store `next` if no newer input arrived since `generation` was taken
    fn apply(&self, generation: u64, next: PhoneValidation) -> PhoneValidation {
        let mut state = self.lock_state();
        if self.generation.load(Ordering::SeqCst) == generation {
            *state = next;
        } else {
            debug!("Discarding stale phone validation result");
        }
        state.clone()
    }

    fn lock_state(&self) -> MutexGuard<'_, PhoneValidation> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
