//! Normalizes framework callbacks into a single ordered event stream and
//! guards the one-task-at-a-time discipline of the card framework.

use log::{debug, error, trace, warn};
use serde::{Deserialize, Serialize};
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;
use tokio::sync::mpsc;

use super::error::{EidError, EidInteractionError};
use super::event::EidInteractionEvent;
use super::sdk::{AuthResult, Reader, WorkflowCallback, WorkflowController};

/// Kind of card task the framework is running.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EidTask {
    PinChange,
    Identification,
}

#[derive(Debug)]
enum TaskRequest {
    PinChange,
    Identification { tc_token_url: String },
}

impl TaskRequest {
    fn kind(&self) -> EidTask {
        match self {
            Self::PinChange => EidTask::PinChange,
            Self::Identification { .. } => EidTask::Identification,
        }
    }
}

#[derive(Debug)]
struct ActiveTask {
    request: TaskRequest,
    /// Set once the framework confirmed it booted and the task was issued.
    started: bool,
}

struct Inner<C> {
    controller: C,
    events: mpsc::UnboundedSender<EidInteractionEvent>,
    task: Mutex<Option<ActiveTask>>,
}

/// Receiving half of the card-interaction event stream.
///
/// There is exactly one per manager.
#[derive(Debug)]
pub struct EidEventStream {
    receiver: mpsc::UnboundedReceiver<EidInteractionEvent>,
}

impl EidEventStream {
    /// Wait for the next event. Returns `None` once every manager handle is gone.
    pub async fn next(&mut self) -> Option<EidInteractionEvent> {
        self.receiver.recv().await
    }

    /// Take the next event if one is already queued.
    pub fn try_next(&mut self) -> Option<EidInteractionEvent> {
        self.receiver.try_recv().ok()
    }
}

/// Adapter between the card framework and the flow coordinators.
///
/// Cloning is cheap; all clones share the same task and stream.
pub struct EidInteractionManager<C> {
    inner: Arc<Inner<C>>,
}

impl<C> Clone for EidInteractionManager<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: WorkflowController> EidInteractionManager<C> {
    pub fn new(controller: C) -> (Self, EidEventStream) {
        let (events, receiver) = mpsc::unbounded_channel();
        let manager = Self {
            inner: Arc::new(Inner {
                controller,
                events,
                task: Mutex::new(None),
            }),
        };
        (manager, EidEventStream { receiver })
    }

    pub fn controller(&self) -> &C {
        &self.inner.controller
    }

    /// Kind of the task currently requested or running.
    pub fn active_task(&self) -> Option<EidTask> {
        self.task().as_ref().map(|task| task.request.kind())
    }

    /// Start changing the card PIN.
    ///
    /// Fails if any task is still registered; call [`cancel_task`](Self::cancel_task) first.
    pub fn change_pin(&self) -> Result<(), EidError> {
        self.begin(TaskRequest::PinChange)
    }

    /// Start an online identification against the given TC token URL.
    pub fn identify(&self, tc_token_url: &str) -> Result<(), EidError> {
        self.begin(TaskRequest::Identification {
            tc_token_url: tc_token_url.to_string(),
        })
    }

    /// Stop the framework and reset the stream to [`EidInteractionEvent::Idle`].
    pub fn cancel_task(&self) {
        debug!("Stopping workflow controller.");
        self.task().take();
        self.inner.controller.stop();
        self.emit(EidInteractionEvent::Idle);
    }

    pub fn provide_pin(&self, pin: &str) -> Result<(), EidError> {
        self.ensure_started()?;
        self.inner.controller.set_pin(pin);
        Ok(())
    }

    pub fn provide_new_pin(&self, pin: &str) -> Result<(), EidError> {
        self.ensure_started()?;
        self.inner.controller.set_new_pin(pin);
        Ok(())
    }

    pub fn provide_can(&self, can: &str) -> Result<(), EidError> {
        self.ensure_started()?;
        self.inner.controller.set_can(can);
        Ok(())
    }

    /// Entry point for the framework's callbacks.
    pub fn handle_callback(&self, callback: WorkflowCallback) {
        if let WorkflowCallback::Started = callback {
            self.on_started();
            return;
        }

        if let Some(event) = normalize(callback) {
            self.emit(event);
        }
    }

    fn begin(&self, request: TaskRequest) -> Result<(), EidError> {
        {
            let mut task = self.task();
            if let Some(running) = task.as_ref() {
                warn!("Refusing to start {:?}, {:?} still running.", request.kind(), running.request.kind());
                return Err(EidError::TaskAlreadyRunning {
                    running: running.request.kind(),
                });
            }
            debug!("Starting workflow controller for {:?}.", request.kind());
            *task = Some(ActiveTask {
                request,
                started: false,
            });
        }
        self.inner.controller.start();
        Ok(())
    }

    fn on_started(&self) {
        trace!("onStarted");
        let mut task = self.task();
        let Some(active) = task.as_mut() else {
            warn!("Workflow controller started without a pending task.");
            return;
        };
        if active.started {
            return;
        }
        active.started = true;
        let tc_token_url = match &active.request {
            TaskRequest::PinChange => None,
            TaskRequest::Identification { tc_token_url } => Some(tc_token_url.clone()),
        };
        drop(task);

        // The controller may call back synchronously, so never hold the lock here.
        match tc_token_url {
            None => {
                debug!("Start PIN management");
                self.inner.controller.start_change_pin();
            }
            Some(tc_token_url) => {
                debug!("Start authentication");
                self.inner.controller.start_authentication(&tc_token_url);
            }
        }
    }

    fn ensure_started(&self) -> Result<(), EidError> {
        match self.task().as_ref() {
            Some(task) if task.started => Ok(()),
            _ => {
                error!("No task running.");
                Err(EidError::NoTaskRunning)
            }
        }
    }

    fn emit(&self, event: EidInteractionEvent) {
        if self.inner.events.send(event).is_err() {
            warn!("Event stream receiver dropped, discarding card event.");
        }
    }

    fn task(&self) -> MutexGuard<'_, Option<ActiveTask>> {
        self.inner.task.lock()
    }
}

/// Translate one framework callback into the event it stands for, if any.
pub fn normalize(callback: WorkflowCallback) -> Option<EidInteractionEvent> {
    use EidInteractionEvent as E;

    match callback {
        WorkflowCallback::Started => None,
        WorkflowCallback::InsertCard { error } => {
            log_callback_error(error);
            Some(E::CardInsertionRequested)
        }
        WorkflowCallback::Reader(reader) => Some(match reader {
            None => {
                error!("Unknown reader.");
                E::Error(EidInteractionError::UnknownReader)
            }
            Some(Reader { card: None, .. }) => E::CardRemoved,
            Some(Reader { card: Some(_), .. }) => E::CardRecognized,
        }),
        WorkflowCallback::EnterPin { error, reader } => {
            log_callback_error(error);
            Some(match reader.card {
                Some(card) if card.deactivated => E::Error(EidInteractionError::CardDeactivated),
                Some(card) => {
                    debug!("pin retry counter: {}", card.pin_retry_counter);
                    E::PinRequested {
                        attempts: card.pin_retry_counter,
                    }
                }
                None => E::Error(EidInteractionError::framework(
                    "Framework requests PIN without card",
                )),
            })
        }
        WorkflowCallback::EnterNewPin { error, .. } => {
            log_callback_error(error);
            Some(E::NewPinRequested)
        }
        WorkflowCallback::EnterCan { error, .. } => {
            log_callback_error(error);
            Some(E::CanRequested)
        }
        WorkflowCallback::EnterPuk { error, reader } => {
            log_callback_error(error);
            Some(match reader.card {
                Some(card) if card.inoperative => E::Error(EidInteractionError::CardBlocked),
                _ => E::PukRequested,
            })
        }
        WorkflowCallback::ChangePinStarted => Some(E::PinChangeStarted),
        WorkflowCallback::ChangePinCompleted { success: true } => {
            debug!("New PIN has been set successfully.");
            Some(E::PinChangeSucceeded)
        }
        WorkflowCallback::ChangePinCompleted { success: false } => {
            error!("Changing PIN failed.");
            Some(E::Error(EidInteractionError::ChangingPinFailed))
        }
        WorkflowCallback::AuthenticationStarted => Some(E::AuthenticationStarted),
        WorkflowCallback::AuthenticationStartFailed { error } => {
            Some(E::Error(EidInteractionError::framework(error)))
        }
        WorkflowCallback::AuthenticationCompleted(result) => authentication_completed(result),
        WorkflowCallback::BadState { error } => Some(E::Error(EidInteractionError::framework(
            format!("Bad state: {error}"),
        ))),
        WorkflowCallback::InternalError { error } => {
            error!("{error}");
            Some(E::Error(EidInteractionError::framework(error)))
        }
        WorkflowCallback::WrapperError { error, msg } => {
            error!("{error} - {msg}");
            Some(E::Error(EidInteractionError::framework(msg)))
        }
        WorkflowCallback::Status { progress } => {
            trace!("onStatus with progress {progress:?}");
            None
        }
        WorkflowCallback::Info { version } => {
            trace!("on info: {version}");
            None
        }
    }
}

fn log_callback_error(error: Option<String>) {
    if let Some(error) = error {
        error!("{error}");
    }
}

fn authentication_completed(auth: AuthResult) -> Option<EidInteractionEvent> {
    debug!("Authentication completed");

    let Some(result) = auth.result else {
        return Some(EidInteractionEvent::Error(
            EidInteractionError::ProcessFailed {
                redirect_url: None,
                result_minor: None,
                result_reason: None,
            },
        ));
    };

    let major = result_code(&result.major).to_string();
    let minor = result.minor.as_deref().map(result_code).map(str::to_string);
    let redirect_url = auth.url.map(|url| {
        let mut query = vec![("ResultMajor", major.as_str())];
        if let Some(minor) = minor.as_deref() {
            query.push(("ResultMinor", minor));
        }
        if let Some(reason) = result.reason.as_deref() {
            query.push(("ResultMessage", reason));
        }
        append_query(&url, &query)
    });

    if major != "error" {
        match redirect_url {
            Some(redirect_url) => Some(EidInteractionEvent::AuthenticationSucceededWithRedirect {
                redirect_url,
            }),
            None => {
                warn!("Authentication succeeded without redirect URL.");
                None
            }
        }
    } else {
        Some(EidInteractionEvent::Error(
            EidInteractionError::ProcessFailed {
                redirect_url,
                result_minor: minor,
                result_reason: result.reason,
            },
        ))
    }
}

/// Result codes are URIs such as `http://www.bsi.bund.de/ecard/api/1.1/resultmajor#ok`.
fn result_code(uri: &str) -> &str {
    uri.rsplit('#').next().unwrap_or(uri)
}

fn append_query(url: &str, pairs: &[(&str, &str)]) -> String {
    let mut out = url.to_string();
    let mut separator = if url.contains('?') { '&' } else { '?' };
    for (key, value) in pairs {
        out.push(separator);
        out.push_str(key);
        out.push('=');
        out.push_str(&encode_query_value(value));
        separator = '&';
    }
    out
}

fn encode_query_value(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{byte:02X}")),
        }
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eid::sdk::{Card, ResultCodes};

    #[derive(Default)]
    struct RecordingController {
        calls: Mutex<Vec<String>>,
    }

    impl RecordingController {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }

        fn push(&self, call: impl Into<String>) {
            self.calls.lock().push(call.into());
        }
    }

    impl WorkflowController for RecordingController {
        fn start(&self) {
            self.push("start");
        }
        fn stop(&self) {
            self.push("stop");
        }
        fn start_change_pin(&self) {
            self.push("start_change_pin");
        }
        fn start_authentication(&self, tc_token_url: &str) {
            self.push(format!("start_authentication {tc_token_url}"));
        }
        fn set_pin(&self, pin: &str) {
            self.push(format!("set_pin {pin}"));
        }
        fn set_new_pin(&self, pin: &str) {
            self.push(format!("set_new_pin {pin}"));
        }
        fn set_can(&self, can: &str) {
            self.push(format!("set_can {can}"));
        }
    }

    fn reader_with(card: Option<Card>) -> Reader {
        Reader {
            name: "NFC".to_string(),
            card,
        }
    }

    #[test]
    fn pin_request_carries_retry_counter() {
        let event = normalize(WorkflowCallback::EnterPin {
            error: None,
            reader: reader_with(Some(Card {
                pin_retry_counter: 2,
                ..Card::default()
            })),
        });

        assert_eq!(event, Some(EidInteractionEvent::PinRequested { attempts: 2 }));
    }

    #[test]
    fn pin_request_without_card_is_framework_error() {
        let event = normalize(WorkflowCallback::EnterPin {
            error: None,
            reader: reader_with(None),
        });

        assert_eq!(
            event,
            Some(EidInteractionEvent::Error(EidInteractionError::framework(
                "Framework requests PIN without card"
            )))
        );
    }

    #[test]
    fn deactivated_card_is_reported_on_pin_request() {
        let event = normalize(WorkflowCallback::EnterPin {
            error: None,
            reader: reader_with(Some(Card {
                pin_retry_counter: 3,
                deactivated: true,
                inoperative: false,
            })),
        });

        assert_eq!(
            event,
            Some(EidInteractionEvent::Error(EidInteractionError::CardDeactivated))
        );
    }

    #[test]
    fn puk_request_on_inoperative_card_is_blocked() {
        let inoperative = Card {
            inoperative: true,
            ..Card::default()
        };
        assert_eq!(
            normalize(WorkflowCallback::EnterPuk {
                error: None,
                reader: reader_with(Some(inoperative)),
            }),
            Some(EidInteractionEvent::Error(EidInteractionError::CardBlocked))
        );
        assert_eq!(
            normalize(WorkflowCallback::EnterPuk {
                error: None,
                reader: reader_with(Some(Card::default())),
            }),
            Some(EidInteractionEvent::PukRequested)
        );
    }

    #[test]
    fn reader_callbacks_track_card_presence() {
        assert_eq!(
            normalize(WorkflowCallback::Reader(Some(reader_with(Some(Card::default()))))),
            Some(EidInteractionEvent::CardRecognized)
        );
        assert_eq!(
            normalize(WorkflowCallback::Reader(Some(reader_with(None)))),
            Some(EidInteractionEvent::CardRemoved)
        );
        assert_eq!(
            normalize(WorkflowCallback::Reader(None)),
            Some(EidInteractionEvent::Error(EidInteractionError::UnknownReader))
        );
    }

    #[test]
    fn change_pin_completion_maps_to_success_or_failure() {
        assert_eq!(
            normalize(WorkflowCallback::ChangePinCompleted { success: true }),
            Some(EidInteractionEvent::PinChangeSucceeded)
        );
        assert_eq!(
            normalize(WorkflowCallback::ChangePinCompleted { success: false }),
            Some(EidInteractionEvent::Error(EidInteractionError::ChangingPinFailed))
        );
    }

    #[test]
    fn progress_callbacks_produce_no_event() {
        assert_eq!(normalize(WorkflowCallback::Status { progress: Some(40) }), None);
        assert_eq!(
            normalize(WorkflowCallback::Info {
                version: "2.0".to_string()
            }),
            None
        );
    }

    #[test]
    fn failed_authentication_builds_redirect() {
        let event = normalize(WorkflowCallback::AuthenticationCompleted(AuthResult {
            url: Some("https://service.example/result".to_string()),
            result: Some(ResultCodes {
                major: "http://www.bsi.bund.de/ecard/api/1.1/resultmajor#error".to_string(),
                minor: Some("http://www.bsi.bund.de/ecard/api/1.1/resultminor/sal#cancellationByUser".to_string()),
                reason: Some("User cancelled".to_string()),
            }),
        }));

        assert_eq!(
            event,
            Some(EidInteractionEvent::Error(EidInteractionError::ProcessFailed {
                redirect_url: Some(
                    "https://service.example/result?ResultMajor=error&ResultMinor=cancellationByUser&ResultMessage=User%20cancelled"
                        .to_string()
                ),
                result_minor: Some("cancellationByUser".to_string()),
                result_reason: Some("User cancelled".to_string()),
            }))
        );
    }

    #[test]
    fn successful_authentication_keeps_existing_query() {
        let event = normalize(WorkflowCallback::AuthenticationCompleted(AuthResult {
            url: Some("https://service.example/result?session=1".to_string()),
            result: Some(ResultCodes {
                major: "http://www.bsi.bund.de/ecard/api/1.1/resultmajor#ok".to_string(),
                minor: None,
                reason: None,
            }),
        }));

        assert_eq!(
            event,
            Some(EidInteractionEvent::AuthenticationSucceededWithRedirect {
                redirect_url: "https://service.example/result?session=1&ResultMajor=ok".to_string()
            })
        );
    }

    #[test]
    fn authentication_without_result_is_process_failure() {
        assert_eq!(
            normalize(WorkflowCallback::AuthenticationCompleted(AuthResult::default())),
            Some(EidInteractionEvent::Error(EidInteractionError::ProcessFailed {
                redirect_url: None,
                result_minor: None,
                result_reason: None,
            }))
        );
    }

    #[test]
    fn pin_change_starts_after_controller_boot() {
        let (manager, _events) = EidInteractionManager::new(RecordingController::default());

        manager.change_pin().unwrap();
        assert_eq!(manager.controller().calls(), vec!["start"]);
        assert_eq!(manager.active_task(), Some(EidTask::PinChange));

        manager.handle_callback(WorkflowCallback::Started);
        manager.handle_callback(WorkflowCallback::Started);
        assert_eq!(manager.controller().calls(), vec!["start", "start_change_pin"]);
    }

    #[test]
    fn identification_passes_tc_token_url() {
        let (manager, _events) = EidInteractionManager::new(RecordingController::default());

        manager.identify("https://service.example/tc").unwrap();
        manager.handle_callback(WorkflowCallback::Started);

        assert_eq!(
            manager.controller().calls(),
            vec!["start", "start_authentication https://service.example/tc"]
        );
    }

    #[test]
    fn second_task_requires_cancellation() {
        let (manager, _events) = EidInteractionManager::new(RecordingController::default());

        manager.change_pin().unwrap();
        assert_eq!(
            manager.identify("https://service.example/tc"),
            Err(EidError::TaskAlreadyRunning {
                running: EidTask::PinChange
            })
        );

        manager.cancel_task();
        assert_eq!(manager.active_task(), None);
        assert!(manager.identify("https://service.example/tc").is_ok());
    }

    #[test]
    fn cancel_resets_stream_to_idle() {
        let (manager, mut events) = EidInteractionManager::new(RecordingController::default());

        manager.change_pin().unwrap();
        manager.handle_callback(WorkflowCallback::InsertCard { error: None });
        manager.cancel_task();

        assert_eq!(events.try_next(), Some(EidInteractionEvent::CardInsertionRequested));
        assert_eq!(events.try_next(), Some(EidInteractionEvent::Idle));
        assert_eq!(events.try_next(), None);
        assert!(manager.controller().calls().contains(&"stop".to_string()));
    }

    #[test]
    fn task_slot_survives_panic_while_locked() {
        let (manager, _events) = EidInteractionManager::new(RecordingController::default());
        manager.change_pin().unwrap();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _task = manager.task();
            panic!("controller blew up");
        }));
        assert!(result.is_err());

        assert_eq!(manager.active_task(), Some(EidTask::PinChange));
        manager.cancel_task();
        assert!(manager.identify("https://service.example/tc").is_ok());
    }

    #[test]
    fn secrets_require_started_task() {
        let (manager, _events) = EidInteractionManager::new(RecordingController::default());

        assert_eq!(manager.provide_pin("123456"), Err(EidError::NoTaskRunning));

        manager.change_pin().unwrap();
        assert_eq!(manager.provide_can("654321"), Err(EidError::NoTaskRunning));

        manager.handle_callback(WorkflowCallback::Started);
        manager.provide_pin("12345").unwrap();
        manager.provide_new_pin("123456").unwrap();
        manager.provide_can("654321").unwrap();

        assert_eq!(
            manager.controller().calls()[2..],
            [
                "set_pin 12345".to_string(),
                "set_new_pin 123456".to_string(),
                "set_can 654321".to_string()
            ]
        );
    }

    #[test]
    fn events_keep_callback_order() {
        let (manager, mut events) = EidInteractionManager::new(RecordingController::default());
        let card = Card {
            pin_retry_counter: 3,
            ..Card::default()
        };

        manager.handle_callback(WorkflowCallback::InsertCard { error: None });
        manager.handle_callback(WorkflowCallback::Reader(Some(reader_with(Some(card.clone())))));
        manager.handle_callback(WorkflowCallback::EnterPin {
            error: None,
            reader: reader_with(Some(card.clone())),
        });
        manager.handle_callback(WorkflowCallback::EnterNewPin {
            error: None,
            reader: reader_with(Some(card)),
        });

        let received: Vec<_> = std::iter::from_fn(|| events.try_next()).collect();
        assert_eq!(
            received,
            vec![
                EidInteractionEvent::CardInsertionRequested,
                EidInteractionEvent::CardRecognized,
                EidInteractionEvent::PinRequested { attempts: 3 },
                EidInteractionEvent::NewPinRequested,
            ]
        );
    }
}
