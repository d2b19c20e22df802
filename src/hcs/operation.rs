//! HCS Operation wrapper for async operations

use std::ffi::c_void;
use std::sync::Arc;
use windows::{
    core::PWSTR,
    Win32::System::HostComputeSystem::*,
};
use super::completion::{completion, CompletionSource, PendingResult};
use crate::{Error, Result};

/// Wrapper around HCS_OPERATION with a completion callback.
///
/// The host fires the callback on its own thread; the result document is
/// handed over through a single-assignment rendezvous and read with
/// [`Operation::wait`].
pub struct Operation {
    handle: HCS_OPERATION,
    context: String,
    // Borrowed by the callback through the raw context pointer.
    source: Arc<CompletionSource>,
    pending: PendingResult,
}

impl Operation {
    /// Create a new operation. `context` names the call in error messages.
    pub fn new(context: &str) -> Self {
        let (source, pending) = completion();
        unsafe {
            let raw = Arc::as_ptr(&source) as *const c_void;
            let handle = HcsCreateOperation(Some(raw), Some(on_complete));
            Self {
                handle,
                context: context.to_string(),
                source,
                pending,
            }
        }
    }

    /// Get the raw handle
    pub fn handle(&self) -> HCS_OPERATION {
        self.handle
    }

    /// Wait indefinitely for the operation to complete and take its result
    pub fn wait(&mut self) -> Result<String> {
        self.pending.wait().map_err(|e| match e {
            Error::HostCall { code, detail, .. } => Error::from_host(&self.context, code, detail),
            other => other,
        })
    }
}

unsafe extern "system" fn on_complete(operation: HCS_OPERATION, context: *const c_void) {
    if context.is_null() {
        return;
    }
    let source = &*(context as *const CompletionSource);
    source.complete(operation_result(operation));
}

/// Read the result document of a completed operation
fn operation_result(operation: HCS_OPERATION) -> Result<String> {
    unsafe {
        let mut result_doc: PWSTR = PWSTR::null();
        let status = HcsGetOperationResult(operation, Some(&mut result_doc));
        let document = take_pwstr(&mut result_doc);

        match status {
            Ok(()) => Ok(document),
            Err(e) => Err(Error::HostCall {
                context: "operation".to_string(),
                code: e.code().0,
                detail: document,
            }),
        }
    }
}

/// Copy a host-allocated string and free it
pub(crate) fn take_pwstr(p: &mut PWSTR) -> String {
    unsafe {
        if p.is_null() {
            return String::new();
        }
        let s = p.to_string().unwrap_or_default();
        windows::Win32::System::Com::CoTaskMemFree(Some(p.as_ptr() as *const c_void));
        *p = PWSTR::null();
        s
    }
}

impl Drop for Operation {
    fn drop(&mut self) {
        unsafe {
            HcsCloseOperation(self.handle);
        }
        self.source.cancel();
    }
}
