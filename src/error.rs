//! Error types for WSL switch attachment

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Rejected by host: {0}")]
    Conflict(String),

    #[error("{context} failed: HRESULT 0x{code:08X}{}", fmt_detail(.detail))]
    HostCall {
        context: String,
        code: i32,
        detail: String,
    },

    #[error("Host operation cancelled before completion")]
    Cancelled,

    #[error("Host operation result was already consumed")]
    ResultConsumed,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Insufficient privileges - run as Administrator or add to Hyper-V Administrators")]
    InsufficientPrivileges,
}

pub type Result<T> = std::result::Result<T, Error>;

fn fmt_detail(detail: &str) -> String {
    if detail.is_empty() {
        String::new()
    } else {
        format!(" ({})", detail)
    }
}

// Native failure codes the orchestrator reacts to.
const E_ACCESSDENIED: u32 = 0x80070005;
const HCS_E_ACCESS_DENIED: u32 = 0x8037011B;
const E_INVALIDARG: u32 = 0x80070057;
const ERROR_FILE_NOT_FOUND: u32 = 0x80070002;
const ERROR_DEV_NOT_EXIST: u32 = 0x80070037;
const ERROR_NOT_FOUND: u32 = 0x80070490;
const ERROR_FILE_EXISTS: u32 = 0x80070050;
const ERROR_ALREADY_EXISTS: u32 = 0x800700B7;
const HCS_E_SYSTEM_NOT_FOUND: u32 = 0xC037010E;
const HCS_E_INVALID_JSON: u32 = 0xC037010D;
const HCN_E_NETWORK_NOT_FOUND: u32 = 0x803B0001;
const HCN_E_ENDPOINT_NOT_FOUND: u32 = 0x803B0002;
const HCN_E_INVALID_JSON: u32 = 0x803B0022;

impl Error {
    /// Check if this is a privilege error
    pub fn is_privilege_error(&self) -> bool {
        matches!(self, Error::InsufficientPrivileges)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// Classify a failed host call by its HRESULT.
    ///
    /// `detail` is the error record the host returned alongside the failure,
    /// if any.
    pub fn from_host(context: &str, hr: i32, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        let described = if detail.is_empty() {
            context.to_string()
        } else {
            format!("{}: {}", context, detail)
        };

        match hr as u32 {
            E_ACCESSDENIED | HCS_E_ACCESS_DENIED => Error::InsufficientPrivileges,
            ERROR_FILE_NOT_FOUND
            | ERROR_DEV_NOT_EXIST
            | ERROR_NOT_FOUND
            | HCS_E_SYSTEM_NOT_FOUND
            | HCN_E_NETWORK_NOT_FOUND
            | HCN_E_ENDPOINT_NOT_FOUND => Error::NotFound(described),
            ERROR_FILE_EXISTS | ERROR_ALREADY_EXISTS => Error::AlreadyExists(described),
            E_INVALIDARG | HCS_E_INVALID_JSON | HCN_E_INVALID_JSON => Error::Conflict(described),
            _ => Error::HostCall {
                context: context.to_string(),
                code: hr,
                detail,
            },
        }
    }
}

#[cfg(windows)]
impl Error {
    /// Classify a `windows::core::Error` returned by a host call.
    pub fn from_windows(context: &str, err: windows::core::Error, detail: impl Into<String>) -> Self {
        Self::from_host(context, err.code().0, detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_denied_is_privilege_error() {
        let err = Error::from_host("open", HCS_E_ACCESS_DENIED as i32, "");
        assert!(err.is_privilege_error());
        assert!(Error::from_host("open", E_ACCESSDENIED as i32, "").is_privilege_error());
    }

    #[test]
    fn test_not_found_codes() {
        for code in [HCN_E_NETWORK_NOT_FOUND, HCN_E_ENDPOINT_NOT_FOUND, ERROR_DEV_NOT_EXIST] {
            assert!(Error::from_host("open network", code as i32, "").is_not_found());
        }
    }

    #[test]
    fn test_already_exists_and_conflict() {
        assert!(matches!(
            Error::from_host("create endpoint", ERROR_ALREADY_EXISTS as i32, ""),
            Error::AlreadyExists(_)
        ));
        assert!(matches!(
            Error::from_host("create endpoint", E_INVALIDARG as i32, "bad policy"),
            Error::Conflict(msg) if msg.contains("bad policy")
        ));
    }

    #[test]
    fn test_unknown_code_keeps_detail() {
        let err = Error::from_host("modify system", 0x80004005u32 as i32, r#"{"Error":-2147467259}"#);
        let msg = err.to_string();
        assert!(msg.starts_with("modify system failed: HRESULT 0x80004005"));
        assert!(msg.contains("Error"));
    }
}
