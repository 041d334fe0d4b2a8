//! Login form.

use super::{delayed_redirect, Control, InFlight, Page, PageCore, PageState, StatusKind, View};
use crate::auth::Auth;
use crate::error::Result;
use crate::models::User;
use crate::utils::validation::require_filled;
use std::time::Duration;

pub struct LoginPage<V: View> {
    core: PageCore<V>,
    submit: InFlight,
    redirect_delay: Duration,
}

impl<V: View> LoginPage<V> {
    pub fn new(auth: Auth, view: V, redirect_delay: Duration) -> Self {
        Self {
            core: PageCore::new(auth, view),
            submit: InFlight::new(),
            redirect_delay,
        }
    }

    pub fn state(&self) -> PageState {
        self.core.state()
    }

    pub fn into_view(self) -> V {
        self.core.into_view()
    }

    pub async fn submit(&self, username: &str, password: &str) -> Result<User> {
        let _guard = self.submit.try_begin()?;
        let username = username.trim();

        if let Err(e) = require_filled(&[username, password]) {
            self.core.fail(e.to_string());
            return Err(e);
        }

        self.core.set_state(PageState::Loading);
        self.core.view().set_control_enabled(Control::Submit, false);
        self.core.status(StatusKind::Info, "Logging in...");

        match self.core.auth.login(username, password).await {
            Ok(user) => {
                self.core.set_state(PageState::Ready);
                self.core
                    .status(StatusKind::Success, "Login successful! Redirecting...");
                delayed_redirect(&self.core, self.redirect_delay, Page::UserDashboard).await;
                Ok(user)
            }
            Err(e) => {
                self.core.fail(e.to_string());
                self.core.view().set_control_enabled(Control::Submit, true);
                Err(e)
            }
        }
    }
}
