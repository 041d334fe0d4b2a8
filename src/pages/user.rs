//! User dashboard: profile, admin link, and caption generation.

use super::{Control, ImagePreview, InFlight, Page, PageCore, PageState, StatusKind, View};
use crate::auth::Auth;
use crate::error::{ClientError, Result};
use crate::models::{Caption, User};
use crate::transport::FileUpload;
use std::path::Path;

/// Multipart field the caption endpoint reads the image from.
pub const UPLOAD_FIELD: &str = "file";

const SESSION_EXPIRED: &str = "Session expired. Please log in again.";
const TOO_MANY_CALLS: &str = "Too many API calls. Please try again later.";

/// Content type for an image path, by extension.
pub fn image_content_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        _ => None,
    }
}

/// User-facing text for a failed caption request.
fn caption_error_message(err: &ClientError) -> String {
    match err {
        ClientError::Authorization { .. } => SESSION_EXPIRED.to_string(),
        ClientError::RateLimited { .. } => TOO_MANY_CALLS.to_string(),
        other => format!("Error: {}", other),
    }
}

pub struct UserDashboard<V: View> {
    core: PageCore<V>,
    generate: InFlight,
    logout: InFlight,
}

impl<V: View> UserDashboard<V> {
    pub fn new(auth: Auth, view: V) -> Self {
        Self {
            core: PageCore::new(auth, view),
            generate: InFlight::new(),
            logout: InFlight::new(),
        }
    }

    pub fn state(&self) -> PageState {
        self.core.state()
    }

    pub fn into_view(self) -> V {
        self.core.into_view()
    }

    /// Gate on the local session, then fetch the authoritative user.
    pub async fn load(&self) -> Result<User> {
        self.core.require_session()?;
        self.core.set_state(PageState::Loading);

        match self.core.auth.refresh_user().await {
            Ok(user) => {
                {
                    let mut view = self.core.view();
                    view.render_profile(&user);
                    view.show_admin_link(user.is_admin());
                }
                self.core.set_state(PageState::Ready);
                Ok(user)
            }
            Err(e) if e.is_auth_failure() => {
                self.core.fail(SESSION_EXPIRED.to_string());
                self.core.view().redirect(Page::Login);
                Err(e)
            }
            Err(e) => {
                self.core.fail(format!("Error: {}", e));
                Err(e)
            }
        }
    }

    /// Upload an image and render the caption the service returns.
    pub async fn generate(&self, file: Option<&Path>) -> Result<Caption> {
        let _guard = self.generate.try_begin()?;

        let Some(path) = file else {
            let message = "Please select an image first.".to_string();
            self.core.fail(message.clone());
            return Err(ClientError::Validation(message));
        };

        if self.core.auth.session().token().is_none() {
            self.core.fail(format!("Error: {}", ClientError::AuthenticationRequired));
            return Err(ClientError::AuthenticationRequired);
        }

        let Some(content_type) = image_content_type(path) else {
            let message = format!("{} is not a supported image file.", path.display());
            self.core.fail(message.clone());
            return Err(ClientError::Validation(message));
        };

        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                self.core
                    .fail(format!("Error: Could not read {}: {}", path.display(), e));
                return Err(e.into());
            }
        };

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        {
            let mut view = self.core.view();
            view.render_preview(&ImagePreview {
                file_name: file_name.clone(),
                size: bytes.len() as u64,
                content_type: content_type.to_string(),
            });
            view.set_control_enabled(Control::Generate, false);
            view.show_status(StatusKind::Info, "Generating caption...");
        }
        self.core.set_state(PageState::Acting);

        let upload = FileUpload {
            field: UPLOAD_FIELD.to_string(),
            file_name,
            content_type: content_type.to_string(),
            bytes,
        };
        let result = self.core.auth.gateway().caption(upload).await;
        self.core.view().set_control_enabled(Control::Generate, true);

        match result {
            Ok(caption) => {
                self.core.view().render_caption(&caption);
                self.record_usage(caption.api_calls);
                self.core.status(StatusKind::Success, "Caption generated!");
                self.core.set_state(PageState::Ready);
                Ok(caption)
            }
            Err(e) => {
                self.core.fail(caption_error_message(&e));
                Err(e)
            }
        }
    }

    /// Mirror the server's usage counter into the cached user.
    fn record_usage(&self, api_calls: u64) {
        let session = self.core.auth.session();
        if let Some(mut user) = session.user() {
            user.api_calls = api_calls;
            if let Err(e) = session.save_user(&user) {
                tracing::warn!(error = %e, "failed to cache usage counter");
            }
        }
    }

    pub async fn logout(&self) -> Result<()> {
        self.core.logout(&self.logout).await
    }
}
