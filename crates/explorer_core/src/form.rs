//! Standard form submission pipeline: client validation, serialization,
//! asynchronous submission and inline feedback mapping.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, OnceLock,
};

use parking_lot::Mutex;
use serde_json::Value;
use shared::{
    error::{FeedbackDetail, FeedbackEnvelope, FeedbackSeverity},
    protocol::FormSuccess,
};
use tracing::{debug, error, warn};

use crate::{
    error::{FetchError, ValidationError},
    render::FormFeedback,
    transport::{Method, RawResponse, Request, Transport},
};

pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";

/// Snapshot of a form's fields in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData(Vec<(String, String)>);

impl FormData {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find_map(|(key, value)| (key == name).then_some(value.as_str()))
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.0
    }
}

pub type SuccessFn = Arc<dyn Fn(Value) + Send + Sync>;
/// Client-side validation. An `Err` is an unexpected failure of the
/// validator itself and is reported like any other generic failure.
pub type ValidateFn = Arc<dyn Fn(&FormData) -> anyhow::Result<Vec<ValidationError>> + Send + Sync>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SerializeOptions {
    /// Drop fields whose value is empty before sending.
    pub omit_empty: bool,
}

pub struct FormOptions {
    pub on_success: SuccessFn,
    pub client_validate: Option<ValidateFn>,
    pub serialize: SerializeOptions,
}

impl FormOptions {
    pub fn new(on_success: impl Fn(Value) + Send + Sync + 'static) -> Self {
        Self {
            on_success: Arc::new(on_success),
            client_validate: None,
            serialize: SerializeOptions::default(),
        }
    }

    pub fn with_validation(
        mut self,
        validate: impl Fn(&FormData) -> anyhow::Result<Vec<ValidationError>> + Send + Sync + 'static,
    ) -> Self {
        self.client_validate = Some(Arc::new(validate));
        self
    }

    pub fn omit_empty_fields(mut self) -> Self {
        self.serialize.omit_empty = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// No interceptor installed; the host performs a full-page submission.
    Native,
    /// A submission was already in flight.
    Ignored,
    /// Client validation failed; nothing was sent.
    Invalid(Vec<ValidationError>),
    /// The server reported field validation failures.
    Rejected(Vec<ValidationError>),
    Succeeded(Value),
    Failed(String),
    Cancelled,
}

struct SubmitInterceptor {
    transport: Arc<dyn Transport>,
    options: FormOptions,
    in_flight: AtomicBool,
}

pub struct Form {
    method: Method,
    action: String,
    fields: Mutex<Vec<(String, String)>>,
    feedback: Arc<dyn FormFeedback>,
    interceptor: OnceLock<SubmitInterceptor>,
}

impl Form {
    pub fn new(
        method: Method,
        action: impl Into<String>,
        feedback: Arc<dyn FormFeedback>,
    ) -> Arc<Self> {
        Arc::new(Self {
            method,
            action: action.into(),
            fields: Mutex::new(Vec::new()),
            feedback,
            interceptor: OnceLock::new(),
        })
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    /// Sets the value of `name`, adding the field if it does not exist yet.
    pub fn set_field(&self, name: &str, value: impl Into<String>) {
        let value = value.into();
        let mut fields = self.fields.lock();
        match fields.iter_mut().find(|(key, _)| key == name) {
            Some((_, slot)) => *slot = value,
            None => fields.push((name.to_string(), value)),
        }
    }

    pub fn data(&self) -> FormData {
        FormData(self.fields.lock().clone())
    }

    pub fn is_configured(&self) -> bool {
        self.interceptor.get().is_some()
    }

    pub async fn submit(&self) -> SubmitOutcome {
        let Some(interceptor) = self.interceptor.get() else {
            return SubmitOutcome::Native;
        };
        if interceptor.in_flight.swap(true, Ordering::AcqRel) {
            debug!(action = %self.action, "submission already in flight, ignoring");
            return SubmitOutcome::Ignored;
        }
        let _guard = InFlightGuard {
            flag: &interceptor.in_flight,
            feedback: self.feedback.as_ref(),
        };
        self.intercept(interceptor).await
    }

    async fn intercept(&self, interceptor: &SubmitInterceptor) -> SubmitOutcome {
        self.feedback.clear_messages();
        let data = self.data();

        if let Some(validate) = &interceptor.options.client_validate {
            match validate(&data) {
                Ok(errors) => {
                    self.render_validation(&errors);
                    if errors.iter().any(|e| e.severity.is_error()) {
                        return SubmitOutcome::Invalid(errors);
                    }
                }
                Err(err) => {
                    error!(action = %self.action, error = %err, "client validation raised");
                    return self.fail(GENERIC_FAILURE_MESSAGE);
                }
            }
        }

        let fields = data
            .0
            .into_iter()
            .filter(|(_, value)| !(interceptor.options.serialize.omit_empty && value.is_empty()))
            .collect();
        self.feedback.set_submit_enabled(false);

        let request = Request::new(self.method, self.action.clone(), fields);
        match interceptor.transport.fetch(request).await {
            Ok(raw) if raw.is_success() => match decode_success(&raw) {
                Ok(body) => {
                    let messages: Vec<ValidationError> = FormSuccess::from_value(&body)
                        .detail
                        .iter()
                        .map(ValidationError::from)
                        .collect();
                    self.render_validation(&messages);
                    (interceptor.options.on_success)(body.clone());
                    SubmitOutcome::Succeeded(body)
                }
                Err(err) => {
                    error!(action = %self.action, %err, "form response could not be decoded");
                    self.fail(GENERIC_FAILURE_MESSAGE)
                }
            },
            Ok(raw) => self.handle_failure_response(raw),
            Err(err) if err.is_cancellation() => {
                debug!(action = %self.action, "form submission cancelled");
                SubmitOutcome::Cancelled
            }
            Err(err) => {
                error!(action = %self.action, %err, "form submission failed");
                self.fail(GENERIC_FAILURE_MESSAGE)
            }
        }
    }

    fn handle_failure_response(&self, raw: RawResponse) -> SubmitOutcome {
        let envelope = matches!(raw.status, 400 | 422)
            .then(|| raw.decode_json::<FeedbackEnvelope>().ok())
            .flatten();
        match envelope.map(|envelope| envelope.detail) {
            Some(FeedbackDetail::Entries(entries)) if !entries.is_empty() => {
                let errors: Vec<ValidationError> =
                    entries.iter().map(ValidationError::from).collect();
                warn!(
                    action = %self.action,
                    status = raw.status,
                    count = errors.len(),
                    "server rejected form"
                );
                self.render_validation(&errors);
                SubmitOutcome::Rejected(errors)
            }
            Some(FeedbackDetail::Message(message)) if !message.is_empty() => {
                warn!(action = %self.action, status = raw.status, %message, "server rejected form");
                self.fail(&message)
            }
            _ => {
                let err = FetchError::Http {
                    status: raw.status,
                    body: String::from_utf8_lossy(&raw.body).into_owned(),
                };
                error!(action = %self.action, %err, "form submission failed");
                self.fail(GENERIC_FAILURE_MESSAGE)
            }
        }
    }

    fn render_validation(&self, errors: &[ValidationError]) {
        for entry in errors {
            match &entry.field {
                Some(field) => self
                    .feedback
                    .show_field_message(field, entry.severity, &entry.message),
                None => self.feedback.show_form_message(entry.severity, &entry.message),
            }
        }
    }

    fn fail(&self, message: &str) -> SubmitOutcome {
        self.feedback
            .show_form_message(FeedbackSeverity::Error, message);
        SubmitOutcome::Failed(message.to_string())
    }
}

/// Re-enables the submit control however the submission ends.
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
    feedback: &'a dyn FormFeedback,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
        self.feedback.set_submit_enabled(true);
    }
}

fn decode_success(raw: &RawResponse) -> Result<Value, FetchError> {
    if raw.body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    raw.decode_json()
}

/// Installs the submit interceptor on `form`. Returns `false` when the form
/// was already configured, in which case the new options are dropped.
pub fn configure(form: &Form, transport: Arc<dyn Transport>, options: FormOptions) -> bool {
    let installed = form
        .interceptor
        .set(SubmitInterceptor {
            transport,
            options,
            in_flight: AtomicBool::new(false),
        })
        .is_ok();
    if !installed {
        debug!(action = %form.action, "form already configured");
    }
    installed
}

#[cfg(test)]
#[path = "tests/form_tests.rs"]
mod tests;
