//! Page controllers.
//!
//! Each controller binds user actions to auth flows and gateway calls and
//! renders the outcome through a [`View`]. Controllers take `&self` so a
//! front end may fire actions concurrently; every action is wrapped in an
//! [`InFlight`] guard that rejects a second invocation while the first is
//! still running.

pub mod admin;
pub mod login;
pub mod register;
pub mod user;

use crate::auth::Auth;
use crate::error::{ClientError, Result};
use crate::models::{Caption, EndpointStat, User};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

pub use admin::AdminDashboard;
pub use login::LoginPage;
pub use register::RegisterPage;
pub use user::UserDashboard;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Login,
    Register,
    UserDashboard,
    AdminDashboard,
}

impl std::fmt::Display for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Page::Login => "login",
            Page::Register => "register",
            Page::UserDashboard => "user dashboard",
            Page::AdminDashboard => "admin dashboard",
        };
        f.write_str(name)
    }
}

/// Lifecycle of a page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PageState {
    #[default]
    Unauthenticated,
    Loading,
    Ready,
    /// A mutating action is running.
    Acting,
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Success,
    Error,
}

/// Controls a page can enable or disable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Submit,
    Generate,
    Logout,
    Promote(u64),
    Delete(u64),
}

/// Local preview of the image about to be uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePreview {
    pub file_name: String,
    pub size: u64,
    pub content_type: String,
}

/// One row of the admin user table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRow {
    pub id: u64,
    pub username: String,
    pub email: String,
    pub roles: Vec<String>,
    pub api_calls: u64,
    /// Promote is offered only to users who are not already admin.
    pub can_promote: bool,
}

impl From<&User> for UserRow {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone().unwrap_or_default(),
            roles: user.role_names(),
            api_calls: user.api_calls,
            can_promote: !user.is_admin(),
        }
    }
}

/// Rendering surface driven by the page controllers.
///
/// Only status, control state, redirects and confirmation are required;
/// pages that have nothing to draw for the rest can ignore them.
pub trait View: Send {
    fn show_status(&mut self, kind: StatusKind, message: &str);
    fn set_control_enabled(&mut self, control: Control, enabled: bool);
    fn redirect(&mut self, page: Page);
    /// Ask before a destructive action. `false` cancels it.
    fn confirm(&mut self, prompt: &str) -> bool;

    fn render_profile(&mut self, _user: &User) {}
    fn show_admin_link(&mut self, _visible: bool) {}
    fn render_preview(&mut self, _preview: &ImagePreview) {}
    fn render_caption(&mut self, _caption: &Caption) {}
    fn render_users(&mut self, _rows: &[UserRow]) {}
    fn render_stats(&mut self, _stats: &[EndpointStat]) {}
}

/// Single-slot mutual exclusion for one action.
#[derive(Debug, Default)]
pub struct InFlight {
    busy: AtomicBool,
}

/// Releases its [`InFlight`] slot on drop.
pub struct InFlightGuard<'a> {
    slot: &'a InFlight,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the slot, or fail with `Busy` if the action is running.
    pub fn try_begin(&self) -> Result<InFlightGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ClientError::Busy)?;
        Ok(InFlightGuard { slot: self })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.slot.busy.store(false, Ordering::Release);
    }
}

/// View and state shared by every controller.
pub(crate) struct PageCore<V: View> {
    pub auth: Auth,
    view: Mutex<V>,
    state: Mutex<PageState>,
}

impl<V: View> PageCore<V> {
    pub fn new(auth: Auth, view: V) -> Self {
        Self {
            auth,
            view: Mutex::new(view),
            state: Mutex::new(PageState::default()),
        }
    }

    /// Lock the view. Never hold the guard across an await.
    pub fn view(&self) -> MutexGuard<'_, V> {
        self.view.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn into_view(self) -> V {
        self.view.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> PageState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_state(&self, state: PageState) {
        tracing::trace!(?state, "page state");
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    pub fn status(&self, kind: StatusKind, message: &str) {
        self.view().show_status(kind, message);
    }

    /// Record a failure in both the state and the status area.
    pub fn fail(&self, message: String) {
        self.status(StatusKind::Error, &message);
        self.set_state(PageState::Error(message));
    }

    /// Session gate shared by the dashboards: a token and a cached user
    /// must both be present, otherwise go to the login page.
    pub fn require_session(&self) -> Result<()> {
        let session = self.auth.session();
        if session.token().is_none() || session.user().is_none() {
            self.set_state(PageState::Unauthenticated);
            self.view().redirect(Page::Login);
            return Err(ClientError::AuthenticationRequired);
        }
        Ok(())
    }

    /// Shared logout action for the dashboards.
    pub async fn logout(&self, guard: &InFlight) -> Result<()> {
        let _guard = guard.try_begin()?;
        self.view().set_control_enabled(Control::Logout, false);
        let result = self.auth.logout().await;
        self.set_state(PageState::Unauthenticated);
        self.view().set_control_enabled(Control::Logout, true);
        if let Err(e) = &result {
            self.status(StatusKind::Error, &format!("Error: {}", e));
        }
        self.view().redirect(Page::Login);
        result
    }
}

/// Wait the post-login display delay, then redirect.
pub(crate) async fn delayed_redirect<V: View>(core: &PageCore<V>, delay: Duration, page: Page) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    core.view().redirect(page);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::user;

    #[test]
    fn test_in_flight_rejects_second_claim() {
        let slot = InFlight::new();
        let guard = slot.try_begin().unwrap();
        assert!(slot.is_busy());
        assert!(matches!(slot.try_begin(), Err(ClientError::Busy)));

        drop(guard);
        assert!(!slot.is_busy());
        assert!(slot.try_begin().is_ok());
    }

    #[test]
    fn test_user_row_hides_promote_for_admins() {
        let admin = UserRow::from(&user(2, "root", true));
        assert!(!admin.can_promote);

        let plain = UserRow::from(&user(3, "bob", false));
        assert!(plain.can_promote);
        assert_eq!(plain.roles, vec!["user"]);
        assert_eq!(plain.email, "bob@example.com");
    }
}
