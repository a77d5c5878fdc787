//! Render-target capabilities the engine writes through. The engine never
//! touches a concrete UI toolkit; the memory implementations here back the
//! command-line explorer and the tests.

use parking_lot::Mutex;
use shared::{error::FeedbackSeverity, protocol::RenderData};

/// A DOM-like region: the sidebar, or a list container inside it.
pub trait RenderTarget: Send + Sync {
    fn clear(&self);
    fn replace(&self, html: &str);
    fn append(&self, html: &str);
    fn html(&self) -> String;
}

/// Map overlay highlighting the geometry of the active sidebar content.
pub trait FocusLayer: Send + Sync {
    fn focus(&self, data: &RenderData);
    fn clear(&self);
    fn current(&self) -> Option<RenderData>;
}

/// Inline feedback surface of a single form.
pub trait FormFeedback: Send + Sync {
    fn show_field_message(&self, field: &str, severity: FeedbackSeverity, message: &str);
    fn show_form_message(&self, severity: FeedbackSeverity, message: &str);
    fn clear_messages(&self);
    fn set_submit_enabled(&self, enabled: bool);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLink {
    Page { number: u32, current: bool },
    Ellipsis,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PagerControls {
    Numbered(Vec<PageLink>),
    Cursor { newer: bool, older: bool },
}

/// Navigation controls of a paginated container.
pub trait PagerView: Send + Sync {
    fn render(&self, controls: &PagerControls);
    fn clear(&self);
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Non-fatal error state shown in place of content.
pub fn error_fragment(message: &str) -> String {
    format!(
        "<div class=\"alert alert-danger\" role=\"alert\">{}</div>",
        escape_html(message)
    )
}

#[derive(Default)]
pub struct MemoryTarget {
    html: Mutex<String>,
}

impl MemoryTarget {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RenderTarget for MemoryTarget {
    fn clear(&self) {
        self.html.lock().clear();
    }

    fn replace(&self, html: &str) {
        *self.html.lock() = html.to_string();
    }

    fn append(&self, html: &str) {
        self.html.lock().push_str(html);
    }

    fn html(&self) -> String {
        self.html.lock().clone()
    }
}

#[derive(Default)]
pub struct MemoryFocusLayer {
    current: Mutex<Option<RenderData>>,
}

impl MemoryFocusLayer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FocusLayer for MemoryFocusLayer {
    fn focus(&self, data: &RenderData) {
        *self.current.lock() = Some(data.clone());
    }

    fn clear(&self) {
        self.current.lock().take();
    }

    fn current(&self) -> Option<RenderData> {
        self.current.lock().clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackMessage {
    pub field: Option<String>,
    pub severity: FeedbackSeverity,
    pub message: String,
}

pub struct MemoryFeedback {
    messages: Mutex<Vec<FeedbackMessage>>,
    submit_enabled: Mutex<bool>,
}

impl Default for MemoryFeedback {
    fn default() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            submit_enabled: Mutex::new(true),
        }
    }
}

impl MemoryFeedback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<FeedbackMessage> {
        self.messages.lock().clone()
    }

    pub fn submit_enabled(&self) -> bool {
        *self.submit_enabled.lock()
    }
}

impl FormFeedback for MemoryFeedback {
    fn show_field_message(&self, field: &str, severity: FeedbackSeverity, message: &str) {
        self.messages.lock().push(FeedbackMessage {
            field: Some(field.to_string()),
            severity,
            message: message.to_string(),
        });
    }

    fn show_form_message(&self, severity: FeedbackSeverity, message: &str) {
        self.messages.lock().push(FeedbackMessage {
            field: None,
            severity,
            message: message.to_string(),
        });
    }

    fn clear_messages(&self) {
        self.messages.lock().clear();
    }

    fn set_submit_enabled(&self, enabled: bool) {
        *self.submit_enabled.lock() = enabled;
    }
}

#[derive(Default)]
pub struct MemoryPager {
    controls: Mutex<Option<PagerControls>>,
}

impl MemoryPager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn controls(&self) -> Option<PagerControls> {
        self.controls.lock().clone()
    }
}

impl PagerView for MemoryPager {
    fn render(&self, controls: &PagerControls) {
        *self.controls.lock() = Some(controls.clone());
    }

    fn clear(&self) {
        self.controls.lock().take();
    }
}
