//! Model of the card framework boundary.
//!
//! The framework runs the PACE/EAC protocol and only talks to us through
//! [`WorkflowCallback`]s and the [`WorkflowController`] command surface.

/// Card as seen by the reader.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Card {
    /// Remaining PIN attempts before the card asks for the CAN.
    pub pin_retry_counter: u8,
    /// The eID function has been switched off by the authority.
    pub deactivated: bool,
    /// The PUK has been used up; the card cannot be unblocked any more.
    pub inoperative: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Reader {
    pub name: String,
    pub card: Option<Card>,
}

/// Result codes of a finished authentication, as URIs ending in `#<code>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResultCodes {
    pub major: String,
    pub minor: Option<String>,
    pub reason: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthResult {
    pub url: Option<String>,
    pub result: Option<ResultCodes>,
}

/// Callbacks delivered by the card framework.
///
/// May arrive on any thread; the manager serializes them into one stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorkflowCallback {
    Started,
    InsertCard { error: Option<String> },
    Reader(Option<Reader>),
    EnterPin { error: Option<String>, reader: Reader },
    EnterNewPin { error: Option<String>, reader: Reader },
    EnterCan { error: Option<String>, reader: Reader },
    EnterPuk { error: Option<String>, reader: Reader },
    ChangePinStarted,
    ChangePinCompleted { success: bool },
    AuthenticationStarted,
    AuthenticationStartFailed { error: String },
    AuthenticationCompleted(AuthResult),
    BadState { error: String },
    InternalError { error: String },
    WrapperError { error: String, msg: String },
    Status { progress: Option<u8> },
    Info { version: String },
}

/// Command surface of the card framework.
pub trait WorkflowController: Send + Sync {
    /// Boot the framework. It answers with [`WorkflowCallback::Started`].
    fn start(&self);
    fn stop(&self);
    fn start_change_pin(&self);
    fn start_authentication(&self, tc_token_url: &str);
    fn set_pin(&self, pin: &str);
    fn set_new_pin(&self, pin: &str);
    fn set_can(&self, can: &str);
}
