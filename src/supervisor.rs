//! Hook supervisor — the re-attach state machine.
//!
//! Owns one [`MonitoredPackage`] slot per config entry. On each tick the
//! supervisor drains teardown notifications, then matches every un-hooked
//! package against the latest process snapshot and attaches to the first
//! matching pid. A monitored application that crashes and restarts is
//! re-instrumented automatically, bounded by [`TICK_INTERVAL`] as the
//! worst-case detection latency.
//!
//! All package state is mutated on the supervisor loop only; teardown
//! notifications cross over from the backend's execution context via an
//! unbounded mpsc channel, so no per-package locking is needed.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::PackageSpec;
use crate::device::{Device, HookSession, Pid, ProcessInfo, ProcessSnapshot, TeardownCallback};

/// Interval between supervision ticks.
pub const TICK_INTERVAL: Duration = Duration::from_millis(500);

/// Identity of one attach session, assigned by the supervisor.
///
/// Teardown events carry the id they were registered against; a stale event
/// whose id no longer matches the active handle is ignored rather than
/// clearing a newer hook.
pub type HookId = u64;

/// Hook lifecycle state of one monitored package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookStatus {
    /// No live hook; the next tick scans the snapshot for a match.
    Unhooked,
    /// Attach attempt in progress.
    Hooking,
    /// Script loaded and live.
    Hooked,
}

/// One attach session's lifetime. Discarded whole at teardown; a new
/// attach always creates a new handle, never reuses one.
pub struct HookHandle {
    id: HookId,
    pid: Pid,
    live: bool,
    _session: Box<dyn HookSession>,
}

impl HookHandle {
    /// Supervisor-assigned identity of this attach session.
    #[must_use]
    pub fn id(&self) -> HookId {
        self.id
    }

    /// The pid this hook was attached to at creation time.
    #[must_use]
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// True from successful script load until teardown fires.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.live
    }
}

/// Supervision slot for one config entry.
///
/// Duplicate package names in the config produce independent slots.
pub struct MonitoredPackage {
    name: String,
    script: Arc<str>,
    status: HookStatus,
    active: Option<HookHandle>,
}

impl MonitoredPackage {
    /// Package identifier this slot matches process names against.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current hook lifecycle state.
    #[must_use]
    pub fn status(&self) -> HookStatus {
        self.status
    }

    /// The live hook handle, if any. At most one exists per slot.
    #[must_use]
    pub fn active_handle(&self) -> Option<&HookHandle> {
        self.active.as_ref()
    }
}

/// Teardown notification delivered from the backend context into the
/// supervisor loop.
#[derive(Debug, Clone, Copy)]
struct TeardownEvent {
    slot: usize,
    hook: HookId,
}

/// The core state machine driving (re-)attachment.
pub struct Supervisor {
    packages: Vec<MonitoredPackage>,
    device: Arc<dyn Device>,
    teardown_tx: mpsc::UnboundedSender<TeardownEvent>,
    teardown_rx: mpsc::UnboundedReceiver<TeardownEvent>,
    next_hook_id: HookId,
}

impl Supervisor {
    /// Build a supervisor from the loaded package specifications.
    #[must_use]
    pub fn new(specs: Vec<PackageSpec>, device: Arc<dyn Device>) -> Self {
        let (teardown_tx, teardown_rx) = mpsc::unbounded_channel();
        let packages = specs
            .into_iter()
            .map(|spec| MonitoredPackage {
                name: spec.name,
                script: spec.script,
                status: HookStatus::Unhooked,
                active: None,
            })
            .collect();
        Self {
            packages,
            device,
            teardown_tx,
            teardown_rx,
            next_hook_id: 0,
        }
    }

    /// All supervision slots, in config-file order.
    #[must_use]
    pub fn packages(&self) -> &[MonitoredPackage] {
        &self.packages
    }

    /// Apply every teardown notification queued since the last drain.
    pub fn drain_teardowns(&mut self) {
        while let Ok(event) = self.teardown_rx.try_recv() {
            self.apply_teardown(event);
        }
    }

    /// One supervision pass over `snapshot`: every slot that is not Hooked
    /// is matched against the snapshot in order, and at most one attach is
    /// attempted per slot.
    pub fn tick(&mut self, snapshot: &[ProcessInfo]) {
        for slot in 0..self.packages.len() {
            if self.packages[slot].status == HookStatus::Hooked {
                continue;
            }
            let name = &self.packages[slot].name;
            let target = snapshot.iter().find(|p| &p.name == name).map(|p| p.pid);
            let Some(pid) = target else { continue };
            self.attach_slot(slot, pid);
        }
    }

    /// Timed supervision loop. Runs until `cancel` fires, then returns the
    /// supervisor so callers can inspect final state.
    pub async fn run(
        mut self,
        mut snapshot_rx: watch::Receiver<Arc<ProcessSnapshot>>,
        cancel: CancellationToken,
    ) -> Self {
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!("hook supervisor shutting down");
                    break;
                }
                () = tokio::time::sleep(TICK_INTERVAL) => {}
            }

            self.drain_teardowns();
            let snapshot = Arc::clone(&*snapshot_rx.borrow_and_update());
            self.tick(&snapshot);
        }
        self
    }

    fn attach_slot(&mut self, slot: usize, pid: Pid) {
        let hook = self.next_hook_id;
        self.next_hook_id += 1;

        let (name, script) = {
            let pkg = &mut self.packages[slot];
            pkg.status = HookStatus::Hooking;
            (pkg.name.clone(), Arc::clone(&pkg.script))
        };
        info!(package = %name, pid, "hooking");

        let tx = self.teardown_tx.clone();
        let on_teardown: TeardownCallback = Box::new(move || {
            // The supervisor may already be gone during shutdown.
            let _ = tx.send(TeardownEvent { slot, hook });
        });

        match self.device.attach(pid, &script, on_teardown) {
            Ok(session) => {
                let pkg = &mut self.packages[slot];
                pkg.status = HookStatus::Hooked;
                pkg.active = Some(HookHandle {
                    id: hook,
                    pid,
                    live: true,
                    _session: session,
                });
            }
            Err(err) => {
                warn!(package = %name, pid, %err, "unable to hook; retrying on a later tick");
                self.packages[slot].status = HookStatus::Unhooked;
            }
        }
    }

    /// Teardown only ever moves Hooked to Unhooked, and only for the handle
    /// the event was registered against.
    fn apply_teardown(&mut self, event: TeardownEvent) {
        let Some(pkg) = self.packages.get_mut(event.slot) else {
            return;
        };

        let is_current = pkg.active.as_ref().is_some_and(|a| a.id == event.hook);
        if is_current {
            // The handle is terminal; discarding it releases the session.
            drop(pkg.active.take());
            pkg.status = HookStatus::Unhooked;
            info!(package = %pkg.name, "hook destroyed, scanning for new process");
        } else {
            debug!(
                package = %pkg.name,
                hook = event.hook,
                "stale teardown for a replaced hook, ignoring"
            );
        }
    }
}
