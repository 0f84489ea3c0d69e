//! Production [`Device`] binding over the `frida` crate.
//!
//! The Frida FFI objects are not `Send`, so nothing Frida-related crosses a
//! thread boundary. Enumeration calls obtain their objects locally in the
//! calling thread; each hook runs on its own dedicated thread that owns the
//! session and script for their whole lifetime and polls the session for
//! backend-side detachment to fire the teardown callback.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use frida::{DeviceManager, DeviceType, Frida, ScriptOption};
use tracing::debug;

use crate::device::{
    Device, DeviceInfo, HookSession, Pid, ProcessInfo, ProcessSnapshot, TeardownCallback,
};
use crate::{AppError, Result};

/// How often a hook thread checks its session for backend-side detachment.
const DETACH_POLL: Duration = Duration::from_millis(500);

/// How the device for this run was selected on the command line.
#[derive(Debug, Clone)]
enum Selector {
    Usb,
    Id(String),
}

/// Entry point to the Frida backend: device enumeration and selection.
pub struct FridaBackend;

impl FridaBackend {
    /// Initialize the backend.
    ///
    /// # Errors
    ///
    /// Currently infallible; kept fallible for parity with other backends.
    pub fn new() -> Result<Self> {
        Ok(Self)
    }

    /// Enumerate all devices known to the local Frida runtime.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Device` if enumeration fails.
    pub fn enumerate_devices(&self) -> Result<Vec<DeviceInfo>> {
        with_manager(|manager| {
            Ok(manager
                .enumerate_all_devices()
                .iter()
                .map(|device| DeviceInfo {
                    name: device.get_name().to_string(),
                    kind: format!("{:?}", device.get_type()).to_lowercase(),
                    id: device.get_id().to_string(),
                })
                .collect())
        })
    }

    /// Connect to the USB-attached device.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Device` if no USB device is present.
    pub fn open_usb(&self) -> Result<FridaDevice> {
        let selector = Selector::Usb;
        verify_selector(&selector)?;
        Ok(FridaDevice { selector })
    }

    /// Connect to the device with the given backend identifier.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Device` if no device with that id is present.
    pub fn open_by_id(&self, id: &str) -> Result<FridaDevice> {
        let selector = Selector::Id(id.to_owned());
        verify_selector(&selector)?;
        Ok(FridaDevice { selector })
    }
}

/// A selected device. Holds only the selector; Frida objects are obtained
/// locally wherever they are used.
pub struct FridaDevice {
    selector: Selector,
}

impl Device for FridaDevice {
    fn enumerate_processes(&self) -> Result<ProcessSnapshot> {
        with_manager(|manager| {
            let device = select_device(manager, &self.selector)?;
            let processes = device
                .enumerate_processes()
                .iter()
                .map(|process| ProcessInfo {
                    pid: process.get_pid(),
                    name: process.get_name().to_string(),
                })
                .collect();
            Ok(processes)
        })
    }

    fn attach(
        &self,
        pid: Pid,
        script_source: &str,
        on_teardown: TeardownCallback,
    ) -> Result<Box<dyn HookSession>> {
        let selector = self.selector.clone();
        let source = script_source.to_owned();
        let (ready_tx, ready_rx) = mpsc::channel();
        let (detach_tx, detach_rx) = mpsc::channel::<()>();

        thread::Builder::new()
            .name(format!("hook-{pid}"))
            .spawn(move || hook_thread(&selector, pid, &source, on_teardown, &ready_tx, &detach_rx))
            .map_err(|err| AppError::Attach(format!("cannot spawn hook thread: {err}")))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Box::new(FridaHook {
                _detach_tx: detach_tx,
            })),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(AppError::Attach(
                "hook thread exited before reporting readiness".into(),
            )),
        }
    }
}

/// Live hook owner. Dropping it disconnects the detach channel, which makes
/// the hook thread unload the script and detach the session.
struct FridaHook {
    _detach_tx: mpsc::Sender<()>,
}

impl HookSession for FridaHook {}

/// Body of one hook thread: attach, load, report readiness, then watch for
/// either a local drop or a backend-side teardown.
fn hook_thread(
    selector: &Selector,
    pid: Pid,
    source: &str,
    on_teardown: TeardownCallback,
    ready_tx: &mpsc::Sender<Result<()>>,
    detach_rx: &mpsc::Receiver<()>,
) {
    let frida = obtain_frida();
    let manager = DeviceManager::obtain(&frida);

    let device = match select_device(&manager, selector) {
        Ok(device) => device,
        Err(err) => {
            let _ = ready_tx.send(Err(err));
            return;
        }
    };

    let session = match device.attach(pid) {
        Ok(session) => session,
        Err(err) => {
            let _ = ready_tx.send(Err(AppError::Attach(format!(
                "cannot attach to pid {pid}: {err}"
            ))));
            return;
        }
    };

    let mut options = ScriptOption::new();
    let mut script = match session.create_script(source, &mut options) {
        Ok(script) => script,
        Err(err) => {
            let _ = ready_tx.send(Err(AppError::Attach(format!(
                "cannot create script in pid {pid}: {err}"
            ))));
            return;
        }
    };

    if let Err(err) = script.load() {
        let _ = ready_tx.send(Err(AppError::Attach(format!(
            "cannot load script into pid {pid}: {err}"
        ))));
        return;
    }

    let _ = ready_tx.send(Ok(()));

    loop {
        match detach_rx.recv_timeout(DETACH_POLL) {
            // Handle dropped locally: release the hook, no teardown event.
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                let _ = script.unload();
                let _ = session.detach();
                debug!(pid, "hook released");
                return;
            }
            Err(RecvTimeoutError::Timeout) => {
                if session.is_detached() {
                    debug!(pid, "session detached by backend");
                    on_teardown();
                    return;
                }
            }
        }
    }
}

/// Obtain the process-wide Frida runtime handle.
#[allow(unsafe_code)]
fn obtain_frida() -> Frida {
    // Frida's init is internally guarded; obtaining per call site keeps all
    // FFI objects thread-local.
    unsafe { Frida::obtain() }
}

fn with_manager<T>(f: impl FnOnce(&DeviceManager<'_>) -> Result<T>) -> Result<T> {
    let frida = obtain_frida();
    let manager = DeviceManager::obtain(&frida);
    f(&manager)
}

fn select_device<'a>(
    manager: &'a DeviceManager<'_>,
    selector: &Selector,
) -> Result<frida::Device<'a>> {
    match selector {
        Selector::Usb => manager
            .get_device_by_type(DeviceType::USB)
            .map_err(|err| AppError::Device(format!("no usb device: {err}"))),
        Selector::Id(id) => manager
            .enumerate_all_devices()
            .into_iter()
            .find(|device| device.get_id() == id.as_str())
            .ok_or_else(|| AppError::Device(format!("no device with id {id}"))),
    }
}

fn verify_selector(selector: &Selector) -> Result<()> {
    with_manager(|manager| select_device(manager, selector).map(|_| ()))
}
