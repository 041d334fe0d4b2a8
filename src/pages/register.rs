//! Registration form.

use super::{delayed_redirect, Control, InFlight, Page, PageCore, PageState, StatusKind, View};
use crate::auth::Auth;
use crate::error::Result;
use crate::models::User;
use crate::utils::validation::{check_password, require_filled};
use std::time::Duration;

pub struct RegisterPage<V: View> {
    core: PageCore<V>,
    submit: InFlight,
    redirect_delay: Duration,
}

impl<V: View> RegisterPage<V> {
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

    pub async fn submit(&self, username: &str, email: &str, password: &str) -> Result<User> {
        let _guard = self.submit.try_begin()?;
        let username = username.trim();
        let email = email.trim();

        let checked =
            require_filled(&[username, email, password]).and_then(|_| check_password(password));
        if let Err(e) = checked {
            self.core.fail(e.to_string());
            return Err(e);
        }

        self.core.set_state(PageState::Loading);
        self.core.view().set_control_enabled(Control::Submit, false);
        self.core.status(StatusKind::Info, "Creating account...");

        match self.core.auth.signup(username, email, password).await {
            Ok(user) => {
                self.core.set_state(PageState::Ready);
                self.core
                    .status(StatusKind::Success, "Registration successful! Redirecting...");
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
