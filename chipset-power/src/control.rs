//! Shared entry points into the power task.
//!
//! [`PowerControl`] lives in a `static` and is the only thing other tasks,
//! or interrupt handlers, touch. Every setter is a single atomic store
//! followed by a wake; the chipset task drains the requests at the top of
//! each step, which keeps it the sole writer of its own flags.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::Duration;
use portable_atomic::{AtomicBool, AtomicU8, AtomicU32, Ordering};

use crate::config::FORCED_SHUTDOWN_DELAY;
use crate::deferred::DeferredCall;
use crate::state::{ChipsetStateMask, PowerState, StateClass};

const RESET_NONE: u8 = 0;
const RESET_WARM: u8 = 1;
const RESET_COLD: u8 = 2;

pub struct PowerControl {
    state: AtomicU8,
    force_shutdown: AtomicBool,
    exit_hard_off: AtomicBool,
    reset: AtomicU8,
    power_up_inhibited: AtomicBool,
    long_press_ms: AtomicU32,
    wake: Signal<CriticalSectionRawMutex, ()>,
    /// Fires a forced shutdown when the power button is held.
    pub shutdown_timer: DeferredCall,
}

impl Default for PowerControl {
    fn default() -> Self {
        Self::new()
    }
}

impl PowerControl {
    pub const fn new() -> Self {
        PowerControl {
            state: AtomicU8::new(PowerState::G3 as u8),
            force_shutdown: AtomicBool::new(false),
            exit_hard_off: AtomicBool::new(false),
            reset: AtomicU8::new(RESET_NONE),
            power_up_inhibited: AtomicBool::new(false),
            long_press_ms: AtomicU32::new(FORCED_SHUTDOWN_DELAY.as_millis() as u32),
            wake: Signal::new(),
            shutdown_timer: DeferredCall::new(),
        }
    }

    /// Drive the AP to G3 from wherever it is. Idempotent; the request is
    /// cleared once the machine leaves G3 again.
    pub fn force_shutdown(&self) {
        info!("force shutdown requested");
        self.force_shutdown.store(true, Ordering::Release);
        self.wake();
    }

    /// Ask to leave hard-off. Ignored unless the AP is in, or headed for,
    /// G3.
    pub fn exit_hard_off(&self) {
        if !matches!(self.state(), PowerState::G3 | PowerState::S5G3) {
            return;
        }
        debug!("exit hard off requested");
        self.exit_hard_off.store(true, Ordering::Release);
        self.wake();
    }

    /// Ask the power task to pulse `SYS_RST_L`.
    pub fn request_reset(&self, cold: bool) {
        let kind = if cold { RESET_COLD } else { RESET_WARM };
        self.reset.store(kind, Ordering::Release);
        self.wake();
    }

    /// Power button edge.
    ///
    /// A press powers up from off and starts the long-press timer; a release
    /// cancels the timer.
    pub fn on_power_button(&self, pressed: bool) {
        debug!("power button {}", pressed);
        if pressed {
            if self.in_state(ChipsetStateMask::ANY_OFF) {
                self.exit_hard_off();
            }
            self.shutdown_timer.schedule(self.long_press());
        } else {
            self.shutdown_timer.cancel();
        }
    }

    /// Lid edge. Opening the lid powers up from off.
    pub fn on_lid(&self, open: bool) {
        debug!("lid open {}", open);
        if open && self.in_state(ChipsetStateMask::ANY_OFF) {
            self.exit_hard_off();
        }
    }

    /// Run the forced-shutdown timer. Spawn this from a task of its own.
    pub async fn run_shutdown_timer(&self) {
        self.shutdown_timer
            .run(|| {
                warn!("power button held, forcing shutdown");
                self.force_shutdown();
            })
            .await
    }

    pub fn state(&self) -> PowerState {
        PowerState::from_u8(self.state.load(Ordering::Acquire)).unwrap_or(PowerState::G3)
    }

    pub fn state_class(&self) -> StateClass {
        self.state().class()
    }

    pub fn in_state(&self, mask: ChipsetStateMask) -> bool {
        self.state().in_state(mask)
    }

    /// The last power-on attempt was refused by the charger.
    pub fn power_up_inhibited(&self) -> bool {
        self.power_up_inhibited.load(Ordering::Acquire)
    }

    pub fn long_press(&self) -> Duration {
        Duration::from_millis(self.long_press_ms.load(Ordering::Relaxed) as u64)
    }

    pub fn set_long_press(&self, hold: Duration) {
        self.long_press_ms
            .store(hold.as_millis() as u32, Ordering::Relaxed);
    }

    /// Wake the power task, e.g. after an input line changed.
    pub fn wake(&self) {
        self.wake.signal(());
    }

    pub(crate) async fn wait_wake(&self) {
        self.wake.wait().await
    }

    pub(crate) fn publish(&self, state: PowerState) {
        self.state.store(state as u8, Ordering::Release);
    }

    pub(crate) fn take_force_shutdown(&self) -> bool {
        self.force_shutdown.swap(false, Ordering::AcqRel)
    }

    /// Peek at a force-shutdown request without consuming it.
    pub(crate) fn shutdown_pending(&self) -> bool {
        self.force_shutdown.load(Ordering::Acquire)
    }

    pub(crate) fn take_exit_hard_off(&self) -> bool {
        self.exit_hard_off.swap(false, Ordering::AcqRel)
    }

    /// `Some(cold)` if a reset was requested.
    pub(crate) fn take_reset(&self) -> Option<bool> {
        match self.reset.swap(RESET_NONE, Ordering::AcqRel) {
            RESET_WARM => Some(false),
            RESET_COLD => Some(true),
            _ => None,
        }
    }

    pub(crate) fn set_power_up_inhibited(&self, inhibited: bool) {
        self.power_up_inhibited.store(inhibited, Ordering::Release);
    }
}
