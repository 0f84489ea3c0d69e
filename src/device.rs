//! Device collaborator seam.
//!
//! The [`Device`] trait decouples the supervision core (census, supervisor,
//! hook handles) from the instrumentation backend. The production binding
//! lives in [`frida_backend`] behind the `frida` cargo feature; tests supply
//! mock implementations.

#[cfg(feature = "frida")]
pub mod frida_backend;

use crate::Result;

/// Process identifier on the target device.
pub type Pid = u32;

/// One entry in the device enumeration listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Human-readable device name.
    pub name: String,
    /// Device kind reported by the backend (local, usb, remote).
    pub kind: String,
    /// Stable device identifier usable with `--id`.
    pub id: String,
}

/// One `{pid, name}` pair from the device's live process list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    /// Process identifier.
    pub pid: Pid,
    /// Process name; monitored packages are matched against this field.
    pub name: String,
}

/// Full process listing from the last successful refresh. Replaced as a
/// whole value on every census pass, never mutated in place.
pub type ProcessSnapshot = Vec<ProcessInfo>;

/// Callback fired exactly once by the backend when a hook's session or
/// script is torn down (process exit, explicit unload, crash). Invoked from
/// the backend's own execution context.
pub type TeardownCallback = Box<dyn FnOnce() + Send + 'static>;

/// A connected device exposing the operations the supervision core needs.
///
/// Implementations must be callable from blocking worker threads; the
/// census task wraps `enumerate_processes` in `spawn_blocking`.
pub trait Device: Send + Sync {
    /// List the device's live processes.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Device`](crate::AppError::Device) when the
    /// backend connection is lost. The census treats any failure here as
    /// fatal for the session.
    fn enumerate_processes(&self) -> Result<ProcessSnapshot>;

    /// Attach to `pid`, load `script_source` into it, and register
    /// `on_teardown` to fire when the session or script is destroyed.
    ///
    /// The returned session owns the live hook; dropping it releases the
    /// underlying attachment.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Attach`](crate::AppError::Attach) when session
    /// creation or script load fails. The supervisor logs and retries on a
    /// later tick.
    fn attach(
        &self,
        pid: Pid,
        script_source: &str,
        on_teardown: TeardownCallback,
    ) -> Result<Box<dyn HookSession>>;
}

/// Opaque owner of one live hook. Dropping the session detaches it.
pub trait HookSession: Send {}
