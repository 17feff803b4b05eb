//! In-memory quiz state, one entry per browser.
//!
//! Browsers are told apart by a `quiz_session` cookie holding a ULID. State
//! only changes under the lock and only through [`QuizState::apply`].

use crate::{
    gate::cookie::{read_cookie, strict_cookie, AUTH_COOKIE_MAX_AGE},
    quiz::{FlowError, QuizEvent, QuizState},
};
use axum::{
    http::{header::SET_COOKIE, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
};
use std::{
    collections::HashMap,
    sync::Mutex,
    time::{Duration, Instant},
};
use thiserror::Error;
use tracing::{debug, warn};
use ulid::Ulid;

pub const SESSION_COOKIE_NAME: &str = "quiz_session";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error(transparent)]
    Flow(#[from] FlowError),
    #[error("no quiz in progress for this session")]
    Missing,
    #[error("quiz session store is unavailable")]
    Poisoned,
}

/// Sessions idle for longer than this are dropped, matching the auth cookie.
pub const SESSION_IDLE_TTL: Duration = Duration::from_secs(AUTH_COOKIE_MAX_AGE);

#[derive(Debug)]
struct Entry {
    state: QuizState,
    touched: Instant,
}

#[derive(Debug)]
pub struct QuizSessions {
    states: Mutex<HashMap<Ulid, Entry>>,
    idle_ttl: Duration,
}

impl Default for QuizSessions {
    fn default() -> Self {
        Self::with_idle_ttl(SESSION_IDLE_TTL)
    }
}

impl QuizSessions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_idle_ttl(idle_ttl: Duration) -> Self {
        Self {
            states: Mutex::new(HashMap::new()),
            idle_ttl,
        }
    }

    /// Current state for a session; a fresh start state for unknown ids.
    ///
    /// # Errors
    /// Returns [`SessionError::Poisoned`] if the store lock is poisoned.
    pub fn snapshot(&self, id: Ulid) -> Result<QuizState, SessionError> {
        Ok(self.get(id)?.unwrap_or_default())
    }

    /// Stored state for a session, if it has one and it has not expired.
    /// Reading a session keeps it alive.
    ///
    /// # Errors
    /// Returns [`SessionError::Poisoned`] if the store lock is poisoned.
    pub fn get(&self, id: Ulid) -> Result<Option<QuizState>, SessionError> {
        let mut states = self.states.lock().map_err(|_| SessionError::Poisoned)?;
        let now = Instant::now();
        Ok(self.live_entry(&mut states, id, now).map(|entry| {
            entry.touched = now;
            entry.state.clone()
        }))
    }

    /// Apply an event to a session and store the resulting state.
    ///
    /// Only `Begin` and `Restart` may create a session; any other event on an
    /// unknown or expired session is [`SessionError::Missing`]. Idle sessions
    /// are swept whenever a new one is stored.
    ///
    /// # Errors
    /// Returns the flow error when the event is rejected; the stored state is
    /// left untouched in that case.
    pub fn apply(&self, id: Ulid, event: QuizEvent) -> Result<QuizState, SessionError> {
        let mut states = self.states.lock().map_err(|_| SessionError::Poisoned)?;
        let now = Instant::now();
        let restart = matches!(event, QuizEvent::Restart);

        let current = match self.live_entry(&mut states, id, now) {
            Some(entry) => entry.state.clone(),
            None if restart || matches!(event, QuizEvent::Begin { .. }) => QuizState::new(),
            None => return Err(SessionError::Missing),
        };
        let next = current.apply(event)?;

        if restart {
            states.remove(&id);
        } else if let Some(entry) = states.get_mut(&id) {
            entry.state = next.clone();
            entry.touched = now;
        } else {
            self.sweep(&mut states, now);
            states.insert(
                id,
                Entry {
                    state: next.clone(),
                    touched: now,
                },
            );
        }
        debug!("session {id} now in {} phase", next.phase());
        Ok(next)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.states.lock().map_or(0, |states| states.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_expired(&self, entry: &Entry, now: Instant) -> bool {
        now.saturating_duration_since(entry.touched) >= self.idle_ttl
    }

    // Expired entries are removed on sight.
    fn live_entry<'a>(
        &self,
        states: &'a mut HashMap<Ulid, Entry>,
        id: Ulid,
        now: Instant,
    ) -> Option<&'a mut Entry> {
        if states
            .get(&id)
            .is_some_and(|entry| self.is_expired(entry, now))
        {
            states.remove(&id);
            debug!("session {id} expired");
            return None;
        }
        states.get_mut(&id)
    }

    fn sweep(&self, states: &mut HashMap<Ulid, Entry>, now: Instant) {
        let before = states.len();
        states.retain(|_, entry| !self.is_expired(entry, now));
        let swept = before - states.len();
        if swept > 0 {
            debug!("swept {swept} idle sessions");
        }
    }
}

/// Session id of a request, plus the cookie to set when it was just issued.
#[derive(Debug)]
pub struct SessionKey {
    pub id: Ulid,
    cookie: Option<HeaderValue>,
}

impl SessionKey {
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        if let Some(id) = read_cookie(headers, SESSION_COOKIE_NAME)
            .and_then(|value| Ulid::from_string(&value).ok())
        {
            return Self { id, cookie: None };
        }

        let id = Ulid::new();
        let cookie = strict_cookie(SESSION_COOKIE_NAME, &id.to_string(), None)
            .map_err(|err| warn!("failed to build session cookie: {err}"))
            .ok();
        Self { id, cookie }
    }

    /// Attach the session cookie to a response if it is new.
    pub fn respond(self, response: impl IntoResponse) -> Response {
        let mut response = response.into_response();
        if let Some(cookie) = self.cookie {
            response.headers_mut().insert(SET_COOKIE, cookie);
        }
        response
    }
}
