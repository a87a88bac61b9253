//! Registered accounts, the redacted session projection and their persistence.

mod error;
mod models;
mod password;
mod store;

pub use error::{AccountError, AccountResult};
pub use models::{
    Account, AccountUpdate, EditorSettings, NewProject, Project, Session, Theme, UserSettings,
};
pub use store::AccountStore;
