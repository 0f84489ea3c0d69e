//! Command-line surface and top-level wiring.
//!
//! Thin glue: argument validation, device selection, then handing the
//! loaded package list to the census task and supervisor loop.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::PackageSpec;
use crate::device::{Device, ProcessSnapshot};
use crate::supervisor::Supervisor;
use crate::{census, config, shutdown, AppError, Result};

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(
    name = "rehook",
    about = "Keeps instrumentation hook scripts attached to restarting app processes",
    version
)]
pub struct Cli {
    /// Path to the package-to-script mapping file (required unless listing devices).
    pub conf: Option<PathBuf>,

    /// List available devices and exit.
    #[arg(short = 'l', long = "list_devices")]
    pub list_devices: bool,

    /// Connect to the instrumentation server via USB.
    #[arg(short = 'u', long)]
    pub usb: bool,

    /// Connect to the device with this ID (incompatible with --usb).
    #[arg(short = 'i', long, value_name = "ID")]
    pub id: Option<String>,
}

/// Which device the operator asked to connect to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// The USB-attached device.
    Usb,
    /// A device selected by its backend identifier.
    Id(String),
}

/// Validate the device-selection flags.
///
/// # Errors
///
/// Returns `AppError::Usage` when `--usb` and `--id` are combined, or when
/// neither is given. Checked before any device connection is attempted.
pub fn select_target(cli: &Cli) -> Result<Target> {
    match (cli.usb, &cli.id) {
        (true, Some(_)) => Err(AppError::Usage(
            "usb and id arguments should not be used together".into(),
        )),
        (true, None) => Ok(Target::Usb),
        (false, Some(id)) => Ok(Target::Id(id.clone())),
        (false, None) => Err(AppError::Usage(
            "one of --usb or --id is required to select a device".into(),
        )),
    }
}

/// Run the tool: list devices, or load config and supervise.
///
/// # Errors
///
/// Returns any fatal startup error (arguments, config, scripts, device
/// connection) or the fatal runtime error raised when connectivity to the
/// instrumentation server is lost.
pub async fn run(cli: Cli) -> Result<()> {
    if cli.list_devices {
        return list_devices();
    }

    let target = select_target(&cli)?;
    let conf = cli
        .conf
        .ok_or_else(|| AppError::Usage("a config file path is required".into()))?;

    let device = connect(&target)?;
    info!(?target, "connected to device");

    let specs = config::load(&conf)?;
    info!(packages = specs.len(), "configuration loaded");

    supervise(specs, device).await
}

/// Wire up the census task and supervisor loop, then wait for a termination
/// signal or a fatal escalation.
///
/// # Errors
///
/// Returns `AppError::Device` when the census escalated a lost backend
/// connection; a signal-initiated exit returns `Ok(())`.
pub async fn supervise(specs: Vec<PackageSpec>, device: Arc<dyn Device>) -> Result<()> {
    let cancel = CancellationToken::new();
    let fatal = Arc::new(AtomicBool::new(false));
    let (snapshot_tx, snapshot_rx) = watch::channel(Arc::new(ProcessSnapshot::new()));

    let census_handle = census::spawn_census(
        Arc::clone(&device),
        snapshot_tx,
        Arc::clone(&fatal),
        cancel.clone(),
    );
    let supervisor = Supervisor::new(specs, device);
    let supervisor_handle = tokio::spawn(supervisor.run(snapshot_rx, cancel.clone()));

    tokio::select! {
        () = shutdown::wait_for_signal() => {
            info!("termination signal received, closing");
            cancel.cancel();
        }
        () = cancel.cancelled() => {}
    }

    let _ = tokio::join!(census_handle, supervisor_handle);

    if fatal.load(Ordering::SeqCst) {
        Err(AppError::Device(
            "connection to the instrumentation server was lost".into(),
        ))
    } else {
        Ok(())
    }
}

#[cfg(feature = "frida")]
fn list_devices() -> Result<()> {
    use colored::Colorize;

    let backend = crate::device::frida_backend::FridaBackend::new()?;
    for device in backend.enumerate_devices()? {
        println!("{} ({}): {}", device.name.bold(), device.kind, device.id);
    }
    Ok(())
}

#[cfg(feature = "frida")]
fn connect(target: &Target) -> Result<Arc<dyn Device>> {
    let backend = crate::device::frida_backend::FridaBackend::new()?;
    let device = match target {
        Target::Usb => backend.open_usb()?,
        Target::Id(id) => backend.open_by_id(id)?,
    };
    Ok(Arc::new(device))
}

#[cfg(not(feature = "frida"))]
fn list_devices() -> Result<()> {
    Err(backend_missing())
}

#[cfg(not(feature = "frida"))]
fn connect(_target: &Target) -> Result<Arc<dyn Device>> {
    Err(backend_missing())
}

#[cfg(not(feature = "frida"))]
fn backend_missing() -> AppError {
    AppError::Device(
        "this build does not include an instrumentation backend; rebuild with --features frida"
            .into(),
    )
}
