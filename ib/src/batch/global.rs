//! Process-wide coordinator handle

use std::sync::OnceLock;

use super::handle::BatchHandle;

static GLOBAL: OnceLock<BatchHandle> = OnceLock::new();

/// Get the process-wide handle, installing the one `init` builds on first use
///
/// `init` runs at most once; later calls return the installed handle and
/// ignore their `init`.
pub fn global_handle<F>(init: F) -> &'static BatchHandle
where
    F: FnOnce() -> BatchHandle,
{
    GLOBAL.get_or_init(init)
}

/// The process-wide handle, if one was installed
pub fn try_global_handle() -> Option<&'static BatchHandle> {
    GLOBAL.get()
}
