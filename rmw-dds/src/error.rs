//! Error taxonomy, return codes and the per-thread last-error slot.

use std::cell::RefCell;
use std::fmt;

/// Errors produced by subscription creation and graph queries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RmwError {
    /// A required input is empty or malformed, an output container is not
    /// zero-initialized, or a handle belongs to another implementation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An allocation failed.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// The transport or the graph index reported a failure.
    #[error("upstream failure: {0}")]
    UpstreamFailure(String),

    /// A QoS profile or a configuration source failed its validity check.
    #[error("invalid configuration: {0}")]
    ConfigurationInvalid(String),
}

pub type Result<T> = std::result::Result<T, RmwError>;

impl RmwError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn resource_exhausted(msg: impl Into<String>) -> Self {
        Self::ResourceExhausted(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::UpstreamFailure(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::ConfigurationInvalid(msg.into())
    }

    /// The bare message, without the category prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::InvalidArgument(m)
            | Self::ResourceExhausted(m)
            | Self::UpstreamFailure(m)
            | Self::ConfigurationInvalid(m) => m,
        }
    }

    /// Writes this error into the last-error slot and logs it.
    #[track_caller]
    pub fn record(self) -> Self {
        tracing::error!("{self}");
        set_error_msg(self.message());
        self
    }

    pub fn ret(&self) -> RmwRet {
        RmwRet::from(self)
    }
}

/// Return codes handed back across the middleware boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::IntoStaticStr)]
pub enum RmwRet {
    #[strum(serialize = "RMW_RET_OK")]
    Ok,
    #[strum(serialize = "RMW_RET_ERROR")]
    Error,
    #[strum(serialize = "RMW_RET_INVALID_ARGUMENT")]
    InvalidArgument,
    #[strum(serialize = "RMW_RET_BAD_ALLOC")]
    BadAlloc,
}

impl From<&RmwError> for RmwRet {
    fn from(err: &RmwError) -> Self {
        match err {
            RmwError::InvalidArgument(_) => RmwRet::InvalidArgument,
            RmwError::ResourceExhausted(_) => RmwRet::BadAlloc,
            RmwError::UpstreamFailure(_) | RmwError::ConfigurationInvalid(_) => RmwRet::Error,
        }
    }
}

impl RmwRet {
    pub fn from_result<T>(res: &Result<T>) -> Self {
        match res {
            Ok(_) => RmwRet::Ok,
            Err(e) => e.into(),
        }
    }
}

/// Returns early with `$err`, after recording it in the last-error slot.
#[macro_export]
macro_rules! rmw_bail {
    ($err:expr) => {
        return Err($crate::error::RmwError::record($err))
    };
}

/// Snapshot of the last error set on the current thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorState {
    pub message: String,
    pub file: &'static str,
    pub line: u32,
}

impl fmt::Display for ErrorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, at {}:{}", self.message, self.file, self.line)
    }
}

thread_local! {
    static ERROR_STATE: RefCell<Option<ErrorState>> = const { RefCell::new(None) };
}

#[track_caller]
pub fn set_error_msg(msg: &str) {
    let location = std::panic::Location::caller();
    ERROR_STATE.with(|state| {
        let mut state = state.borrow_mut();
        if let Some(prev) = state.as_ref() {
            tracing::debug!("overwriting previous error state: {}", prev.message);
        }
        *state = Some(ErrorState {
            message: msg.to_owned(),
            file: location.file(),
            line: location.line(),
        });
    });
}

pub fn is_error_set() -> bool {
    ERROR_STATE.with(|state| state.borrow().is_some())
}

pub fn get_error_state() -> Option<ErrorState> {
    ERROR_STATE.with(|state| state.borrow().clone())
}

/// The last error message, or an empty string when none is set.
pub fn get_error_string() -> String {
    ERROR_STATE.with(|state| {
        state
            .borrow()
            .as_ref()
            .map(|s| s.message.clone())
            .unwrap_or_default()
    })
}

pub fn reset_error() {
    ERROR_STATE.with(|state| *state.borrow_mut() = None);
}
