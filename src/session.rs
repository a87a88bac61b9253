use std::sync::{Mutex, MutexGuard};

use tokio::sync::watch;
use tracing::{debug, info};

use crate::accounts::{AccountResult, AccountStore, AccountUpdate, NewProject, Session};

/// Lifecycle of the process-wide session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Initializing,
    Anonymous,
    Authenticated(Session),
}

impl SessionState {
    pub fn loading(&self) -> bool {
        matches!(self, SessionState::Initializing)
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::Authenticated(s) => Some(s),
            _ => None,
        }
    }

    fn from_session(session: Option<Session>) -> Self {
        match session {
            Some(s) => SessionState::Authenticated(s),
            None => SessionState::Anonymous,
        }
    }
}

/// Owns the current session and serialises every store mutation.
///
/// Observers subscribe to a `watch` channel and see each transition; a failed operation
/// publishes nothing and leaves the previous state in place.
pub struct SessionContext {
    store: Mutex<AccountStore>,
    state: watch::Sender<SessionState>,
}

impl SessionContext {
    /// Builds a context in `Initializing`; call [`SessionContext::init`] to load.
    pub fn new(store: AccountStore) -> Self {
        let (state, _) = watch::channel(SessionState::Initializing);
        Self {
            store: Mutex::new(store),
            state,
        }
    }

    /// Builds and initialises in one step.
    pub fn open(store: AccountStore) -> AccountResult<Self> {
        let ctx = Self::new(store);
        ctx.init()?;
        Ok(ctx)
    }

    /// Restores the persisted session, bumping its `lastActive`.
    pub fn init(&self) -> AccountResult<()> {
        let store = self.store();
        let restored = match store.load_session()? {
            Some(_) => store.touch_session()?,
            None => None,
        };
        match &restored {
            Some(s) => info!(user_id = %s.id, "session restored"),
            None => debug!("no persisted session"),
        }
        self.publish(SessionState::from_session(restored));
        Ok(())
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn current(&self) -> Option<Session> {
        self.state.borrow().session().cloned()
    }

    pub fn register(&self, email: &str, username: &str, password: &str) -> AccountResult<Session> {
        let session = self.store().register(email, username, password)?;
        self.publish(SessionState::Authenticated(session.clone()));
        Ok(session)
    }

    pub fn login(&self, email: &str, password: &str) -> AccountResult<Session> {
        let session = self.store().login(email, password)?;
        self.publish(SessionState::Authenticated(session.clone()));
        Ok(session)
    }

    pub fn logout(&self) -> AccountResult<()> {
        self.store().logout()?;
        self.publish(SessionState::Anonymous);
        Ok(())
    }

    pub fn update_account(&self, update: &AccountUpdate) -> AccountResult<Option<Session>> {
        let updated = self.store().update_account(update)?;
        if let Some(s) = &updated {
            self.publish(SessionState::Authenticated(s.clone()));
        }
        Ok(updated)
    }

    pub fn add_project(&self, project: NewProject) -> AccountResult<Option<Session>> {
        let updated = self.store().add_project(project)?;
        if let Some(s) = &updated {
            self.publish(SessionState::Authenticated(s.clone()));
        }
        Ok(updated)
    }

    pub fn change_password(&self, current: &str, new: &str) -> AccountResult<()> {
        self.store().change_password(current, new)
    }

    fn store(&self) -> MutexGuard<'_, AccountStore> {
        self.store.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn publish(&self, next: SessionState) {
        self.state.send_replace(next);
    }
}
