//! Admin dashboard: user table, endpoint stats, promote and delete.
//!
//! Mutations never patch the rendered table locally. After every
//! promote or delete the full user list and stats are fetched again.

use super::{Control, InFlight, Page, PageCore, PageState, StatusKind, UserRow, View};
use crate::auth::Auth;
use crate::error::{ClientError, Result};
use crate::models::{EndpointStat, User};
use std::sync::{Mutex, PoisonError};

/// Rows for the user table: everyone except the signed-in admin.
pub fn user_rows(users: &[User], own_id: u64) -> Vec<UserRow> {
    users
        .iter()
        .filter(|u| u.id != own_id)
        .map(UserRow::from)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AdminAction {
    Promote,
    Delete,
}

impl AdminAction {
    fn control(self, id: u64) -> Control {
        match self {
            AdminAction::Promote => Control::Promote(id),
            AdminAction::Delete => Control::Delete(id),
        }
    }

    fn prompt(self, who: &str) -> String {
        match self {
            AdminAction::Promote => format!("Promote {} to admin?", who),
            AdminAction::Delete => {
                format!("Delete {}? This cannot be undone.", who)
            }
        }
    }
}

pub struct AdminDashboard<V: View> {
    core: PageCore<V>,
    action: InFlight,
    logout: InFlight,
    me: Mutex<Option<User>>,
    rows: Mutex<Vec<UserRow>>,
}

impl<V: View> AdminDashboard<V> {
    pub fn new(auth: Auth, view: V) -> Self {
        Self {
            core: PageCore::new(auth, view),
            action: InFlight::new(),
            logout: InFlight::new(),
            me: Mutex::new(None),
            rows: Mutex::new(Vec::new()),
        }
    }

    pub fn state(&self) -> PageState {
        self.core.state()
    }

    pub fn into_view(self) -> V {
        self.core.into_view()
    }

    /// Rows currently on screen.
    pub fn rows(&self) -> Vec<UserRow> {
        self.rows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Id of the signed-in admin: the verified record from `load`, or
    /// the cached session user when the page was never loaded.
    fn own_id(&self) -> Option<u64> {
        let verified = self
            .me
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|u| u.id);
        verified.or_else(|| self.core.auth.session().user().map(|u| u.id))
    }

    /// Gate on session and admin role, then load users and stats.
    pub async fn load(&self) -> Result<()> {
        self.core.require_session()?;
        self.core.set_state(PageState::Loading);

        let me = match self.core.auth.refresh_user().await {
            Ok(user) => user,
            Err(e) => {
                self.handle_failure(&e);
                return Err(e);
            }
        };

        if !me.is_admin() {
            let message = "Admin access required.".to_string();
            self.core.fail(message.clone());
            self.core.view().redirect(Page::UserDashboard);
            return Err(ClientError::Authorization {
                status: 403,
                message,
            });
        }

        *self.me.lock().unwrap_or_else(PoisonError::into_inner) = Some(me);
        self.reload().await
    }

    /// Fetch users and stats and re-render both tables.
    pub async fn reload(&self) -> Result<()> {
        let Some(own_id) = self.own_id() else {
            return self.redirect_to_login();
        };

        let fetched = async {
            let users = self.core.auth.gateway().admin_users().await?;
            let stats = self.core.auth.gateway().admin_stats().await?;
            Ok::<(Vec<User>, Vec<EndpointStat>), ClientError>((users, stats))
        }
        .await;

        match fetched {
            Ok((users, stats)) => {
                let rows = user_rows(&users, own_id);
                {
                    let mut view = self.core.view();
                    view.render_users(&rows);
                    view.render_stats(&stats);
                }
                *self.rows.lock().unwrap_or_else(PoisonError::into_inner) = rows;
                self.core.set_state(PageState::Ready);
                Ok(())
            }
            Err(e) => {
                self.handle_failure(&e);
                Err(e)
            }
        }
    }

    fn redirect_to_login(&self) -> Result<()> {
        self.core.set_state(PageState::Unauthenticated);
        self.core.view().redirect(Page::Login);
        Err(ClientError::AuthenticationRequired)
    }

    fn reject(&self, message: &str) -> Result<bool> {
        self.core.fail(message.to_string());
        Err(ClientError::Validation(message.to_string()))
    }

    fn handle_failure(&self, err: &ClientError) {
        self.core.fail(format!("Error: {}", err));
        if err.is_auth_failure() {
            self.core.view().redirect(Page::Login);
        }
    }

    /// Grant the admin role to `id` after confirmation.
    /// Returns `false` when the admin declines.
    pub async fn promote(&self, id: u64) -> Result<bool> {
        self.act(AdminAction::Promote, id).await
    }

    /// Delete `id` after confirmation.
    pub async fn delete(&self, id: u64) -> Result<bool> {
        self.act(AdminAction::Delete, id).await
    }

    async fn act(&self, action: AdminAction, id: u64) -> Result<bool> {
        let _guard = self.action.try_begin()?;

        if self.core.auth.session().token().is_none() {
            self.core.fail(format!("Error: {}", ClientError::AuthenticationRequired));
            return Err(ClientError::AuthenticationRequired);
        }

        // Only rows on screen can be acted on, and Promote only where offered.
        let Some(row) = self.rows().into_iter().find(|r| r.id == id) else {
            return self.reject("User not found in the list.");
        };
        if action == AdminAction::Promote && !row.can_promote {
            return self.reject("User is already an admin.");
        }

        if !self.core.view().confirm(&action.prompt(&row.username)) {
            self.core.status(StatusKind::Info, "Cancelled.");
            return Ok(false);
        }

        let control = action.control(id);
        self.core.set_state(PageState::Acting);
        self.core.view().set_control_enabled(control, false);

        let gateway = self.core.auth.gateway();
        let result = match action {
            AdminAction::Promote => gateway.promote_user(id).await,
            AdminAction::Delete => gateway.delete_user(id).await,
        };
        self.core.view().set_control_enabled(control, true);

        match result {
            Ok(message) => {
                tracing::info!(?action, user_id = id, "admin action applied");
                self.core.status(StatusKind::Success, &message);
                self.reload().await?;
                Ok(true)
            }
            Err(e) => {
                self.handle_failure(&e);
                Err(e)
            }
        }
    }

    pub async fn logout(&self) -> Result<()> {
        self.core.logout(&self.logout).await
    }
}
