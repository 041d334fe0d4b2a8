use crate::error::{ClientError, Result};
use crate::models::{Caption, EndpointStat, User};
use crate::pages::{Control, ImagePreview, Page, StatusKind, UserRow, View};
use crate::transport::{ApiRequest, RawResponse, Transport};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct MockTransport {
    responses: Arc<Mutex<VecDeque<Result<RawResponse>>>>,
    requests: Arc<Mutex<Vec<ApiRequest>>>,
}

impl MockTransport {
    pub fn new(responses: Vec<Result<RawResponse>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses.into())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    /// "METHOD path" for each request, with the base URL stripped.
    pub fn calls(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|r| {
                let path = r
                    .url
                    .find("/api/")
                    .map(|i| &r.url[i..])
                    .unwrap_or(&r.url);
                format!("{} {}", r.method, path)
            })
            .collect()
    }

    pub fn push(&self, response: Result<RawResponse>) {
        self.responses
            .lock()
            .expect("responses lock")
            .push_back(response);
    }

    pub fn json(status: u16, body: Value) -> Result<RawResponse> {
        Ok(RawResponse {
            status,
            status_text: String::new(),
            content_type: Some("application/json".to_string()),
            body: body.to_string(),
        })
    }

    pub fn text(status: u16, body: &str) -> Result<RawResponse> {
        Ok(RawResponse {
            status,
            status_text: String::new(),
            content_type: Some("text/plain".to_string()),
            body: body.to_string(),
        })
    }

    pub fn network_error(message: &str) -> Result<RawResponse> {
        Err(ClientError::Network(message.to_string()))
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: ApiRequest) -> Result<RawResponse> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(request);
        // Give concurrently polled futures a chance to run while this
        // request is "in flight".
        tokio::task::yield_now().await;
        let next = self.responses.lock().expect("responses lock").pop_front();
        next.unwrap_or_else(|| {
            MockTransport::json(404, serde_json::json!({"error": "no mock response"}))
        })
    }
}

/// Everything a page controller asked the view to do.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    Status(StatusKind, String),
    Control(Control, bool),
    Redirect(Page),
    Profile(User),
    AdminLink(bool),
    Preview(ImagePreview),
    Caption(Caption),
    Users(Vec<UserRow>),
    Stats(Vec<EndpointStat>),
    Confirm(String),
}

#[derive(Debug, Default)]
pub struct RecordingView {
    pub events: Vec<ViewEvent>,
    pub confirm_answer: bool,
}

impl RecordingView {
    pub fn confirming(answer: bool) -> Self {
        Self {
            events: Vec::new(),
            confirm_answer: answer,
        }
    }

    pub fn statuses(&self) -> Vec<(StatusKind, String)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ViewEvent::Status(kind, msg) => Some((*kind, msg.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn last_status(&self) -> Option<(StatusKind, String)> {
        self.statuses().pop()
    }

    pub fn redirects(&self) -> Vec<Page> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ViewEvent::Redirect(page) => Some(*page),
                _ => None,
            })
            .collect()
    }

    pub fn user_tables(&self) -> Vec<Vec<UserRow>> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ViewEvent::Users(rows) => Some(rows.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn stats_tables(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, ViewEvent::Stats(_)))
            .count()
    }
}

impl View for RecordingView {
    fn show_status(&mut self, kind: StatusKind, message: &str) {
        self.events
            .push(ViewEvent::Status(kind, message.to_string()));
    }

    fn set_control_enabled(&mut self, control: Control, enabled: bool) {
        self.events.push(ViewEvent::Control(control, enabled));
    }

    fn redirect(&mut self, page: Page) {
        self.events.push(ViewEvent::Redirect(page));
    }

    fn render_profile(&mut self, user: &User) {
        self.events.push(ViewEvent::Profile(user.clone()));
    }

    fn show_admin_link(&mut self, visible: bool) {
        self.events.push(ViewEvent::AdminLink(visible));
    }

    fn render_preview(&mut self, preview: &ImagePreview) {
        self.events.push(ViewEvent::Preview(preview.clone()));
    }

    fn render_caption(&mut self, caption: &Caption) {
        self.events.push(ViewEvent::Caption(caption.clone()));
    }

    fn render_users(&mut self, rows: &[UserRow]) {
        self.events.push(ViewEvent::Users(rows.to_vec()));
    }

    fn render_stats(&mut self, stats: &[EndpointStat]) {
        self.events.push(ViewEvent::Stats(stats.to_vec()));
    }

    fn confirm(&mut self, prompt: &str) -> bool {
        self.events.push(ViewEvent::Confirm(prompt.to_string()));
        self.confirm_answer
    }
}

pub fn user(id: u64, username: &str, admin: bool) -> User {
    use crate::models::Role;
    User {
        id,
        username: username.to_string(),
        email: Some(format!("{}@example.com", username)),
        roles: if admin {
            vec![Role::user(), Role::admin()]
        } else {
            vec![Role::user()]
        },
        api_calls: 0,
    }
}

pub fn user_json(id: u64, username: &str, admin: bool) -> Value {
    serde_json::to_value(user(id, username, admin)).expect("user json")
}
