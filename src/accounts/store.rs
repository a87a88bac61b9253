use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::error::{AccountError, AccountResult};
use super::models::{Account, AccountUpdate, NewProject, Project, Session, UserSettings};
use super::password::{hash_password, verify_password};
use crate::storage::KeyValueStore;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Account collection and current session, kept as two JSON documents in a [`KeyValueStore`].
///
/// The account entry is the source of truth: the persisted session is always re-projected
/// from it after a mutation, so the two documents cannot drift apart.
#[derive(Clone)]
pub struct AccountStore {
    kv: Arc<dyn KeyValueStore>,
    accounts_key: String,
    session_key: String,
}

impl AccountStore {
    pub fn new(kv: Arc<dyn KeyValueStore>, key_prefix: &str) -> Self {
        Self {
            kv,
            accounts_key: format!("{key_prefix}accounts"),
            session_key: format!("{key_prefix}session"),
        }
    }

    /// Every registered account, password hashes included.
    pub fn accounts(&self) -> AccountResult<Vec<Account>> {
        self.read_accounts().map(|(accounts, _)| accounts)
    }

    /// Parsed collection plus the raw document it came from. An unparseable document is
    /// copied to `<key>_corrupt`, removed, and read as empty.
    fn read_accounts(&self) -> AccountResult<(Vec<Account>, Option<String>)> {
        let Some(raw) = self.kv.get(&self.accounts_key)? else {
            return Ok((Vec::new(), None));
        };
        match serde_json::from_str(&raw) {
            Ok(accounts) => Ok((accounts, Some(raw))),
            Err(source) => {
                let err = AccountError::StorageCorrupt {
                    key: self.accounts_key.clone(),
                    source,
                };
                let backup = format!("{}_corrupt", self.accounts_key);
                warn!(
                    error = %err,
                    backup = %backup,
                    "moving corrupt accounts document aside"
                );
                self.kv.set(&backup, &raw)?;
                self.kv.remove(&self.accounts_key)?;
                Ok((Vec::new(), None))
            }
        }
    }

    fn save_accounts(&self, accounts: &[Account]) -> AccountResult<()> {
        let raw = serde_json::to_string(accounts)?;
        self.kv.set(&self.accounts_key, &raw)?;
        Ok(())
    }

    /// Writes the collection, then the session for `account`. If the session write fails
    /// the collection is put back to `previous`.
    fn commit(
        &self,
        accounts: &[Account],
        account: &Account,
        previous: Option<&str>,
    ) -> AccountResult<Session> {
        self.save_accounts(accounts)?;
        match self.save_session(account) {
            Ok(session) => Ok(session),
            Err(e) => {
                warn!(
                    error = %e,
                    user_id = %account.id,
                    "session write failed; restoring accounts"
                );
                let restored = match previous {
                    Some(raw) => self.kv.set(&self.accounts_key, raw),
                    None => self.kv.remove(&self.accounts_key),
                };
                if let Err(re) = restored {
                    error!(error = %re, "failed to restore accounts document");
                }
                Err(e)
            }
        }
    }

    fn save_session(&self, account: &Account) -> AccountResult<Session> {
        let session = Session::from(account);
        let raw = serde_json::to_string(&session)?;
        self.kv.set(&self.session_key, &raw)?;
        Ok(session)
    }

    fn discard_session(&self) -> AccountResult<()> {
        self.kv.remove(&self.session_key)?;
        Ok(())
    }

    pub fn register(&self, email: &str, username: &str, password: &str) -> AccountResult<Session> {
        let email = normalize_email(email);
        let username = username.trim();
        if !is_valid_email(&email) {
            warn!(email = %email, "invalid email");
            return Err(AccountError::InvalidInput("Invalid email".into()));
        }
        if username.is_empty() {
            return Err(AccountError::InvalidInput("Username cannot be empty".into()));
        }
        if password.is_empty() {
            return Err(AccountError::InvalidInput("Password cannot be empty".into()));
        }

        let (mut accounts, previous) = self.read_accounts()?;
        if accounts.iter().any(|a| a.email == email) {
            warn!(email = %email, "email already registered");
            return Err(AccountError::DuplicateEmail);
        }

        let now = OffsetDateTime::now_utc();
        let account = Account {
            id: Uuid::new_v4(),
            email,
            username: username.to_string(),
            password_hash: hash_password(password)?,
            created_at: now,
            last_active: now,
            projects: Vec::new(),
            settings: UserSettings::default(),
            avatar: None,
        };
        accounts.push(account.clone());
        let session = self.commit(&accounts, &account, previous.as_deref())?;

        info!(user_id = %account.id, email = %account.email, "account registered");
        Ok(session)
    }

    pub fn login(&self, email: &str, password: &str) -> AccountResult<Session> {
        let email = normalize_email(email);
        let (mut accounts, previous) = self.read_accounts()?;

        let Some(account) = accounts.iter_mut().find(|a| a.email == email) else {
            warn!(email = %email, "login unknown email");
            return Err(AccountError::InvalidCredentials);
        };
        if !verify_password(password, &account.password_hash) {
            warn!(email = %email, user_id = %account.id, "login invalid password");
            return Err(AccountError::InvalidCredentials);
        }

        account.last_active = OffsetDateTime::now_utc();
        let account = account.clone();
        let session = self.commit(&accounts, &account, previous.as_deref())?;

        info!(user_id = %account.id, email = %account.email, "user logged in");
        Ok(session)
    }

    pub fn logout(&self) -> AccountResult<()> {
        self.discard_session()?;
        info!("user logged out");
        Ok(())
    }

    /// Reads the persisted session. A corrupt record, or one whose account has vanished,
    /// is removed and reported as signed out.
    pub fn load_session(&self) -> AccountResult<Option<Session>> {
        let Some(raw) = self.kv.get(&self.session_key)? else {
            return Ok(None);
        };
        let session: Session = match serde_json::from_str(&raw) {
            Ok(s) => s,
            Err(source) => {
                let err = AccountError::StorageCorrupt {
                    key: self.session_key.clone(),
                    source,
                };
                warn!(error = %err, "discarding persisted session");
                self.discard_session()?;
                return Ok(None);
            }
        };
        if !self.accounts()?.iter().any(|a| a.id == session.id) {
            warn!(user_id = %session.id, "session refers to unknown account; discarding");
            self.discard_session()?;
            return Ok(None);
        }
        Ok(Some(session))
    }

    /// Applies `f` to the signed-in account and persists both documents.
    /// Returns `Ok(None)` when nobody is signed in.
    fn with_active_account<F>(&self, f: F) -> AccountResult<Option<Session>>
    where
        F: FnOnce(&mut Account) -> AccountResult<()>,
    {
        let Some(session) = self.load_session()? else {
            debug!("no active session");
            return Ok(None);
        };
        let (mut accounts, previous) = self.read_accounts()?;
        let Some(account) = accounts.iter_mut().find(|a| a.id == session.id) else {
            return Ok(None);
        };
        f(account)?;
        let account = account.clone();
        self.commit(&accounts, &account, previous.as_deref()).map(Some)
    }

    /// Bumps `lastActive` of the signed-in account, as a page reload does.
    pub fn touch_session(&self) -> AccountResult<Option<Session>> {
        self.with_active_account(|a| {
            a.last_active = OffsetDateTime::now_utc();
            Ok(())
        })
    }

    pub fn update_account(&self, update: &AccountUpdate) -> AccountResult<Option<Session>> {
        if update
            .username
            .as_deref()
            .is_some_and(|u| u.trim().is_empty())
        {
            return Err(AccountError::InvalidInput("Username cannot be empty".into()));
        }
        if update.is_empty() {
            return self.load_session();
        }
        let session = self.with_active_account(|a| {
            a.apply(update);
            Ok(())
        })?;
        if let Some(s) = &session {
            info!(user_id = %s.id, "account updated");
        }
        Ok(session)
    }

    pub fn add_project(&self, project: NewProject) -> AccountResult<Option<Session>> {
        let name = project.name.trim().to_string();
        if name.is_empty() {
            return Err(AccountError::InvalidInput("Project name cannot be empty".into()));
        }
        let session = self.with_active_account(|a| {
            let now = OffsetDateTime::now_utc();
            // creation times never go backwards, even if the clock does
            let created_at = match a.projects.last() {
                Some(last) if last.created_at > now => last.created_at,
                _ => now,
            };
            a.projects.push(Project {
                id: Uuid::new_v4(),
                name,
                description: project.description,
                language: project.language,
                stars: project.stars,
                created_at,
                updated_at: created_at,
            });
            Ok(())
        })?;
        if let Some(s) = &session {
            info!(user_id = %s.id, projects = s.projects.len(), "project added");
        }
        Ok(session)
    }

    pub fn change_password(&self, current: &str, new: &str) -> AccountResult<()> {
        if new.is_empty() {
            return Err(AccountError::InvalidInput("Password cannot be empty".into()));
        }
        let changed = self.with_active_account(|a| {
            if !verify_password(current, &a.password_hash) {
                warn!(user_id = %a.id, "password change with wrong current password");
                return Err(AccountError::InvalidCredentials);
            }
            a.password_hash = hash_password(new)?;
            Ok(())
        })?;
        match changed {
            Some(s) => {
                info!(user_id = %s.id, "password changed");
                Ok(())
            }
            None => Err(AccountError::NotAuthenticated),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;
    use crate::accounts::models::Theme;
    use crate::storage::{FileStore, MemoryStore, StorageError};

    fn store() -> (Arc<MemoryStore>, AccountStore) {
        let kv = Arc::new(MemoryStore::new());
        let store = AccountStore::new(kv.clone(), "t_");
        (kv, store)
    }

    fn demo_project() -> NewProject {
        NewProject {
            name: "Demo".into(),
            description: "d".into(),
            language: "TS".into(),
            stars: 0,
        }
    }

    #[test]
    fn email_validation() {
        assert!(is_valid_email("a@x.com"));
        assert!(!is_valid_email("a@x"));
        assert!(!is_valid_email("not an email"));
    }

    #[test]
    fn register_then_login_with_same_credentials() {
        let (_, store) = store();
        let session = store.register("a@x.com", "alice", "pw1").unwrap();
        assert_eq!(session.username, "alice");
        assert!(session.projects.is_empty());
        assert_eq!(session.settings, UserSettings::default());

        store.logout().unwrap();
        let again = store.login("a@x.com", "pw1").unwrap();
        assert_eq!(again.id, session.id);
    }

    #[test]
    fn register_normalises_email() {
        let (_, store) = store();
        let session = store.register("  Bob@Example.COM ", "bob", "pw").unwrap();
        assert_eq!(session.email, "bob@example.com");
        assert!(store.login("BOB@example.com", "pw").is_ok());
    }

    #[test]
    fn duplicate_email_leaves_collection_unchanged() {
        let (kv, store) = store();
        store.register("a@x.com", "alice", "pw1").unwrap();
        let before = kv.get("t_accounts").unwrap();

        let err = store.register("a@x.com", "other", "pw2").unwrap_err();
        assert!(matches!(err, AccountError::DuplicateEmail));
        assert_eq!(kv.get("t_accounts").unwrap(), before);
        assert_eq!(store.accounts().unwrap().len(), 1);
    }

    #[test]
    fn register_rejects_bad_input() {
        let (_, store) = store();
        assert!(matches!(
            store.register("nope", "alice", "pw"),
            Err(AccountError::InvalidInput(_))
        ));
        assert!(matches!(
            store.register("a@x.com", "  ", "pw"),
            Err(AccountError::InvalidInput(_))
        ));
        assert!(matches!(
            store.register("a@x.com", "alice", ""),
            Err(AccountError::InvalidInput(_))
        ));
        assert!(store.accounts().unwrap().is_empty());
    }

    #[test]
    fn passwords_are_not_stored_in_plaintext() {
        let (kv, store) = store();
        store.register("a@x.com", "alice", "hunter2-secret").unwrap();
        let accounts = kv.get("t_accounts").unwrap().unwrap();
        assert!(!accounts.contains("hunter2-secret"));
        let session = kv.get("t_session").unwrap().unwrap();
        assert!(!session.contains("passwordHash"));
    }

    #[test]
    fn wrong_password_keeps_session_unset() {
        let (_, store) = store();
        store.register("a@x.com", "alice", "pw1").unwrap();
        store.logout().unwrap();

        let err = store.login("a@x.com", "wrong").unwrap_err();
        assert!(matches!(err, AccountError::InvalidCredentials));
        assert_eq!(store.load_session().unwrap(), None);

        let err = store.login("nobody@x.com", "pw1").unwrap_err();
        assert!(matches!(err, AccountError::InvalidCredentials));
    }

    #[test]
    fn login_bumps_last_active() {
        let (_, store) = store();
        let first = store.register("a@x.com", "alice", "pw1").unwrap();
        store.logout().unwrap();
        let second = store.login("a@x.com", "pw1").unwrap();
        assert!(second.last_active >= first.last_active);
        let persisted = &store.accounts().unwrap()[0];
        assert_eq!(persisted.last_active, second.last_active);
    }

    #[test]
    fn logout_clears_persisted_session() {
        let (kv, store) = store();
        store.register("a@x.com", "alice", "pw1").unwrap();
        store.logout().unwrap();
        assert_eq!(kv.get("t_session").unwrap(), None);
        assert_eq!(store.load_session().unwrap(), None);
        // logging out twice is harmless
        store.logout().unwrap();
    }

    #[test]
    fn add_project_appends_exactly_one() {
        let (_, store) = store();
        store.register("a@x.com", "alice", "pw1").unwrap();

        let s1 = store.add_project(demo_project()).unwrap().unwrap();
        assert_eq!(s1.projects.len(), 1);
        assert_eq!(s1.projects[0].name, "Demo");
        assert_eq!(s1.projects[0].created_at, s1.projects[0].updated_at);

        let s2 = store.add_project(demo_project()).unwrap().unwrap();
        assert_eq!(s2.projects.len(), 2);
        assert_ne!(s2.projects[0].id, s2.projects[1].id);
        assert!(s2.projects[1].created_at >= s2.projects[0].created_at);

        let account = &store.accounts().unwrap()[0];
        assert_eq!(account.projects, s2.projects);
    }

    #[test]
    fn mutations_without_session_are_noops() {
        let (kv, store) = store();
        assert_eq!(store.add_project(demo_project()).unwrap(), None);
        assert_eq!(
            store
                .update_account(&AccountUpdate {
                    username: Some("x".into()),
                    ..Default::default()
                })
                .unwrap(),
            None
        );
        assert_eq!(store.touch_session().unwrap(), None);
        assert_eq!(kv.get("t_accounts").unwrap(), None);
        assert!(matches!(
            store.change_password("a", "b"),
            Err(AccountError::NotAuthenticated)
        ));
    }

    #[test]
    fn update_account_merges_into_both_documents_and_keeps_password() {
        let (_, store) = store();
        store.register("a@x.com", "alice", "pw1").unwrap();
        let hash_before = store.accounts().unwrap()[0].password_hash.clone();

        let session = store
            .update_account(&AccountUpdate {
                username: Some("alicia".into()),
                avatar: Some("https://img.example/a.svg".into()),
                settings: Some(UserSettings {
                    theme: Theme::System,
                    notifications: false,
                    ..Default::default()
                }),
            })
            .unwrap()
            .unwrap();
        assert_eq!(session.username, "alicia");
        assert_eq!(store.load_session().unwrap().unwrap(), session);

        let account = &store.accounts().unwrap()[0];
        assert_eq!(account.username, "alicia");
        assert_eq!(account.settings.theme, Theme::System);
        assert_eq!(account.password_hash, hash_before);

        store.logout().unwrap();
        assert!(store.login("a@x.com", "pw1").is_ok());
    }

    #[test]
    fn update_account_rejects_blank_username() {
        let (_, store) = store();
        store.register("a@x.com", "alice", "pw1").unwrap();
        let err = store
            .update_account(&AccountUpdate {
                username: Some(" ".into()),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, AccountError::InvalidInput(_)));
        assert_eq!(store.load_session().unwrap().unwrap().username, "alice");
    }

    #[test]
    fn change_password_requires_current_password() {
        let (_, store) = store();
        store.register("a@x.com", "alice", "pw1").unwrap();

        assert!(matches!(
            store.change_password("wrong", "pw2"),
            Err(AccountError::InvalidCredentials)
        ));
        store.change_password("pw1", "pw2").unwrap();
        store.logout().unwrap();
        assert!(store.login("a@x.com", "pw1").is_err());
        assert!(store.login("a@x.com", "pw2").is_ok());
    }

    #[test]
    fn corrupt_session_is_discarded() {
        let (kv, store) = store();
        store.register("a@x.com", "alice", "pw1").unwrap();
        kv.set("t_session", "{not json").unwrap();

        assert_eq!(store.load_session().unwrap(), None);
        assert_eq!(kv.get("t_session").unwrap(), None);
        assert_eq!(store.accounts().unwrap().len(), 1);
    }

    #[test]
    fn session_for_unknown_account_is_discarded() {
        let (kv, store) = store();
        store.register("a@x.com", "alice", "pw1").unwrap();
        kv.set("t_accounts", "[]").unwrap();
        assert_eq!(store.load_session().unwrap(), None);
        assert_eq!(kv.get("t_session").unwrap(), None);
    }

    #[test]
    fn corrupt_accounts_document_is_moved_aside() {
        let (kv, store) = store();
        store.register("a@x.com", "alice", "pw1").unwrap();
        kv.set("t_accounts", "[{").unwrap();

        assert_eq!(store.load_session().unwrap(), None);
        assert_eq!(kv.get("t_session").unwrap(), None);
        assert_eq!(kv.get("t_accounts_corrupt").unwrap().as_deref(), Some("[{"));
        assert!(store.accounts().unwrap().is_empty());

        let session = store.register("b@x.com", "bob", "pw2").unwrap();
        assert_eq!(session.username, "bob");
        assert_eq!(store.accounts().unwrap().len(), 1);
    }

    #[test]
    fn login_against_corrupt_accounts_is_invalid_credentials() {
        let (kv, store) = store();
        kv.set("t_accounts", "not json").unwrap();
        let err = store.login("a@x.com", "pw1").unwrap_err();
        assert!(matches!(err, AccountError::InvalidCredentials));
        assert_eq!(kv.get("t_accounts").unwrap(), None);
    }

    /// Memory store whose session writes can be made to fail.
    struct FailingSessionWrites {
        inner: MemoryStore,
        fail: AtomicBool,
    }

    impl KeyValueStore for FailingSessionWrites {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            if key.ends_with("session") && self.fail.load(Ordering::SeqCst) {
                return Err(StorageError::Unavailable(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "quota exceeded",
                )));
            }
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), StorageError> {
            self.inner.remove(key)
        }
    }

    fn failing_store() -> (Arc<FailingSessionWrites>, AccountStore) {
        let kv = Arc::new(FailingSessionWrites {
            inner: MemoryStore::new(),
            fail: AtomicBool::new(false),
        });
        let store = AccountStore::new(kv.clone(), "t_");
        (kv, store)
    }

    #[test]
    fn failed_session_write_rolls_back_registration() {
        let (kv, store) = failing_store();
        kv.fail.store(true, Ordering::SeqCst);

        let err = store.register("a@x.com", "alice", "pw1").unwrap_err();
        assert!(matches!(err, AccountError::StorageUnavailable(_)));
        assert!(store.accounts().unwrap().is_empty());
        assert_eq!(kv.get("t_accounts").unwrap(), None);

        kv.fail.store(false, Ordering::SeqCst);
        let session = store.register("a@x.com", "alice", "pw1").unwrap();
        assert_eq!(session.username, "alice");
    }

    #[test]
    fn failed_session_write_rolls_back_login_and_updates() {
        let (kv, store) = failing_store();
        store.register("a@x.com", "alice", "pw1").unwrap();
        let before = kv.get("t_accounts").unwrap();

        kv.fail.store(true, Ordering::SeqCst);
        store.logout().unwrap();
        let err = store.login("a@x.com", "pw1").unwrap_err();
        assert!(matches!(err, AccountError::StorageUnavailable(_)));
        assert_eq!(kv.get("t_accounts").unwrap(), before);

        kv.fail.store(false, Ordering::SeqCst);
        store.login("a@x.com", "pw1").unwrap();
        let before = kv.get("t_accounts").unwrap();

        kv.fail.store(true, Ordering::SeqCst);
        assert!(store.add_project(demo_project()).is_err());
        assert_eq!(kv.get("t_accounts").unwrap(), before);
        assert!(store.accounts().unwrap()[0].projects.is_empty());
    }

    #[test]
    fn empty_update_rewrites_nothing() {
        let (kv, store) = store();
        let session = store.register("a@x.com", "alice", "pw1").unwrap();
        kv.set_read_only(true);

        let unchanged = store.update_account(&AccountUpdate::default()).unwrap();
        assert_eq!(unchanged, Some(session));
    }

    #[test]
    fn storage_failure_is_surfaced_and_state_kept() {
        let (kv, store) = store();
        store.register("a@x.com", "alice", "pw1").unwrap();
        kv.set_read_only(true);

        let err = store.add_project(demo_project()).unwrap_err();
        assert!(matches!(err, AccountError::StorageUnavailable(_)));
        kv.set_read_only(false);
        assert!(store.load_session().unwrap().unwrap().projects.is_empty());
    }

    #[test]
    fn session_round_trips_through_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let session = {
            let kv = Arc::new(FileStore::open(dir.path()).unwrap());
            let store = AccountStore::new(kv, "softverse_");
            store.register("a@x.com", "alice", "pw1").unwrap();
            store.add_project(demo_project()).unwrap().unwrap()
        };

        let kv = Arc::new(FileStore::open(dir.path()).unwrap());
        let reloaded = AccountStore::new(kv, "softverse_")
            .load_session()
            .unwrap()
            .unwrap();
        assert_eq!(reloaded, session);
    }

    #[test]
    fn documented_walkthrough() {
        let (_, store) = store();
        let s = store.register("a@x.com", "alice", "pw1").unwrap();
        assert_eq!(s.username, "alice");
        assert!(s.projects.is_empty());

        let s = store.add_project(demo_project()).unwrap().unwrap();
        assert_eq!(s.projects.len(), 1);
        assert_eq!(s.projects[0].name, "Demo");

        store.logout().unwrap();
        assert_eq!(store.load_session().unwrap(), None);

        assert!(matches!(
            store.login("a@x.com", "wrong"),
            Err(AccountError::InvalidCredentials)
        ));
        let s2 = store.login("a@x.com", "pw1").unwrap();
        assert!(s2.last_active >= s.last_active);
        assert_eq!(s2.projects.len(), 1);
    }
}
