//! Login sessions and page access.
//!
//! The logged-in user's projection lives in one of two scopes: session
//! storage by default, or local (persistent) storage when the user asked to
//! be remembered.

use crate::database::Database;
use crate::domain::{AuthOutcome, Role, UserProjection};
use crate::error::Result;
use crate::storage::{KeyValueStorage, MemoryStorage};
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Key of the logged-in user's projection.
pub const USER_KEY: &str = "swift_user";

/// Key of the remember-me flag in local storage.
pub const REMEMBER_KEY: &str = "swift_remember";

/// Pages a user can be sent to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Page {
    Login,
    Dashboard,
    Manager,
    Stock,
}

impl Page {
    pub fn path(&self) -> &'static str {
        match self {
            Page::Login => "login.html",
            Page::Dashboard => "index.html",
            Page::Manager => "gerente.html",
            Page::Stock => "estoquista.html",
        }
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Landing page for a role.
pub fn redirect_for_role(role: Role) -> Page {
    match role {
        Role::Gerente => Page::Manager,
        Role::Estoquista => Page::Stock,
        Role::Vendedor => Page::Dashboard,
    }
}

/// Whether a page may be shown.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccessDecision {
    Granted(UserProjection),

    /// Nobody is logged in.
    RedirectToLogin,

    /// Logged in with the wrong role; send them to their own landing page.
    Denied { user: UserProjection, redirect: Page },
}

impl AccessDecision {
    pub fn is_granted(&self) -> bool {
        matches!(self, AccessDecision::Granted(_))
    }

    /// Where to go instead, if access was not granted.
    pub fn redirect(&self) -> Option<Page> {
        match self {
            AccessDecision::Granted(_) => None,
            AccessDecision::RedirectToLogin => Some(Page::Login),
            AccessDecision::Denied { redirect, .. } => Some(*redirect),
        }
    }
}

/// Tracks who is logged in.
pub struct SessionManager {
    /// Cleared when the process ends.
    session: Arc<dyn KeyValueStorage>,

    /// Survives restarts; holds remembered users.
    local: Arc<dyn KeyValueStorage>,
}

impl SessionManager {
    pub fn new(session: Arc<dyn KeyValueStorage>, local: Arc<dyn KeyValueStorage>) -> Self {
        Self { session, local }
    }

    /// A fresh session scope over the database's persistent storage.
    pub fn for_database(db: &Database) -> Self {
        Self::new(Arc::new(MemoryStorage::new()), db.storage())
    }

    /// Authenticate and, on success, store the user's projection.
    pub fn login(
        &self,
        db: &Database,
        email: &str,
        password: &str,
        remember: bool,
    ) -> Result<AuthOutcome> {
        let outcome = db.authenticate_user(email, password);
        if let AuthOutcome::Success(user) = &outcome {
            self.save_user_session(user, remember)?;
            info!(user_id = user.id, remember, "session started");
        }
        Ok(outcome)
    }

    /// Store `user` as the logged-in user.
    pub fn save_user_session(&self, user: &UserProjection, remember: bool) -> Result<()> {
        let raw = serde_json::to_string(user)?;
        if remember {
            self.local.set(USER_KEY, &raw)?;
            self.local.set(REMEMBER_KEY, "true")?;
        } else {
            self.session.set(USER_KEY, &raw)?;
        }
        Ok(())
    }

    /// The logged-in user: session scope first, then local scope.
    ///
    /// An unreadable or unparseable entry counts as logged out.
    pub fn current_user(&self) -> Option<UserProjection> {
        let raw = read_user(&*self.session, "session").or_else(|| read_user(&*self.local, "local"))?;

        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!(error = %e, "unparseable session user");
                None
            }
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.current_user().is_some()
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.current_user().map_or(false, |user| user.role == role)
    }

    /// Whether the user chose to be remembered.
    pub fn is_remembered(&self) -> bool {
        matches!(self.local.get(REMEMBER_KEY), Ok(Some(flag)) if flag == "true")
    }

    /// Forget the user in both scopes.
    pub fn logout(&self) -> Result<()> {
        self.session.remove(USER_KEY)?;
        self.local.remove(USER_KEY)?;
        self.local.remove(REMEMBER_KEY)?;
        info!("session ended");
        Ok(())
    }

    /// Decide whether the current user may see a page that requires
    /// `required` (any logged-in user when `None`).
    pub fn protect_page(&self, required: Option<Role>) -> AccessDecision {
        let user = match self.current_user() {
            Some(user) => user,
            None => return AccessDecision::RedirectToLogin,
        };

        match required {
            Some(role) if user.role != role => {
                let redirect = redirect_for_role(user.role);
                AccessDecision::Denied { user, redirect }
            }
            _ => AccessDecision::Granted(user),
        }
    }
}

fn read_user(storage: &dyn KeyValueStorage, scope: &str) -> Option<String> {
    match storage.get(USER_KEY) {
        Ok(value) => value,
        Err(e) => {
            warn!(scope, error = %e, "failed to read session user");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> (Database, SessionManager) {
        let db = Database::in_memory();
        let sessions = SessionManager::for_database(&db);
        (db, sessions)
    }

    #[test]
    fn test_login_without_remember_uses_session_scope() {
        let (db, sessions) = manager();

        let outcome = sessions.login(&db, "vendedor@swift.com", "123456", false).unwrap();
        assert!(outcome.is_success());
        assert!(sessions.is_logged_in());
        assert!(sessions.has_role(Role::Vendedor));
        assert!(!sessions.is_remembered());
        assert!(db.storage().get(USER_KEY).unwrap().is_none());
    }

    #[test]
    fn test_login_with_remember_uses_local_scope() {
        let (db, sessions) = manager();

        sessions.login(&db, "gerente@swift.com", "123456", true).unwrap();
        assert!(sessions.is_remembered());

        // A new session over the same local storage still sees the user.
        let next = SessionManager::for_database(&db);
        assert_eq!(next.current_user().unwrap().email, "gerente@swift.com");
    }

    #[test]
    fn test_failed_login_stores_nothing() {
        let (db, sessions) = manager();

        let outcome = sessions.login(&db, "gerente@swift.com", "nope", true).unwrap();
        assert!(!outcome.is_success());
        assert!(!sessions.is_logged_in());
    }

    #[test]
    fn test_logout_clears_both_scopes() {
        let (db, sessions) = manager();

        sessions.login(&db, "gerente@swift.com", "123456", true).unwrap();
        sessions.login(&db, "vendedor@swift.com", "123456", false).unwrap();
        sessions.logout().unwrap();

        assert!(!sessions.is_logged_in());
        assert!(!sessions.is_remembered());
    }

    #[test]
    fn test_session_scope_wins_over_local() {
        let (db, sessions) = manager();

        sessions.login(&db, "gerente@swift.com", "123456", true).unwrap();
        sessions.login(&db, "vendedor@swift.com", "123456", false).unwrap();

        assert_eq!(sessions.current_user().unwrap().role, Role::Vendedor);
    }

    #[test]
    fn test_corrupt_session_entry_is_logged_out() {
        let session = Arc::new(MemoryStorage::new());
        session.set(USER_KEY, "{broken").unwrap();
        let sessions = SessionManager::new(session, Arc::new(MemoryStorage::new()));

        assert!(sessions.current_user().is_none());
        assert_eq!(sessions.protect_page(None), AccessDecision::RedirectToLogin);
    }

    #[test]
    fn test_protect_page() {
        let (db, sessions) = manager();
        assert_eq!(
            sessions.protect_page(Some(Role::Gerente)).redirect(),
            Some(Page::Login)
        );

        sessions.login(&db, "estoquista@swift.com", "123456", false).unwrap();
        assert!(sessions.protect_page(None).is_granted());
        assert!(sessions.protect_page(Some(Role::Estoquista)).is_granted());

        let denied = sessions.protect_page(Some(Role::Gerente));
        assert!(matches!(denied, AccessDecision::Denied { redirect: Page::Stock, .. }));
    }

    #[test]
    fn test_redirect_for_role() {
        assert_eq!(redirect_for_role(Role::Gerente).path(), "gerente.html");
        assert_eq!(redirect_for_role(Role::Vendedor).path(), "index.html");
        assert_eq!(redirect_for_role(Role::Estoquista).path(), "estoquista.html");
    }
}
