//! The AP power state machine.

use embedded_hal::digital::PinState;
use embedded_hal_async::delay::DelayNs;

use crate::board::{Board, Charger, Platform};
use crate::config::{
    CHARGER_INITIALIZED_DELAY, CHARGER_INITIALIZED_TRIES, PGOOD_AP_DEBOUNCE_TIMEOUT,
    SUSPEND_PRE_DELAY_MS, SYS_RST_RELEASE_DELAY_MS, SequencingConfig,
};
use crate::control::PowerControl;
use crate::error::Error;
use crate::hooks::{HookEvent, Hooks};
use crate::rails::{self, Rail, RailDriver};
use crate::sequence::{self, RunOutcome, SequenceOp};
use crate::signals::{PowerSignals, SignalMask};
use crate::state::PowerState;

/// What the controller knows about how it came out of reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BootInfo {
    /// The controller restarted in place (firmware jump or warm restart)
    /// and the AP may still be running.
    pub jumped_to_image: bool,
    /// The previous shutdown asked for the AP to stay off.
    pub ap_off: bool,
    /// Power the AP on at boot unless told to stay off.
    pub auto_power_on: bool,
}

/// Power state machine context, owned by the power task.
///
/// `forcing_shutdown` and `sys_reset_asserted` are written only here;
/// requests from elsewhere arrive through [`PowerControl`].
pub struct Chipset<'a, B: Board> {
    board: B,
    config: SequencingConfig,
    control: &'a PowerControl,
    hooks: Hooks<'a>,
    forcing_shutdown: bool,
    sys_reset_asserted: bool,
}

impl<'a, B: Board> Chipset<'a, B> {
    pub fn new(
        board: B,
        config: SequencingConfig,
        control: &'a PowerControl,
        hooks: Hooks<'a>,
    ) -> Self {
        Chipset {
            board,
            config,
            control,
            hooks,
            forcing_shutdown: false,
            sys_reset_asserted: false,
        }
    }

    pub fn board(&self) -> &B {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut B {
        &mut self.board
    }

    pub fn config(&self) -> &SequencingConfig {
        &self.config
    }

    pub fn forcing_shutdown(&self) -> bool {
        self.forcing_shutdown
    }

    pub fn sys_reset_asserted(&self) -> bool {
        self.sys_reset_asserted
    }

    /// Pick the starting state.
    ///
    /// After an in-place restart with every S0 input already good, skip
    /// sequencing and resume in S0 so rails on a running AP are never
    /// toggled. Otherwise start in G3, asking to leave it straight away when
    /// auto power-on applies.
    pub fn init(&mut self, boot: BootInfo) -> PowerState {
        let mut state = PowerState::G3;
        self.control.publish(state);

        if boot.jumped_to_image {
            if self.board.has_all(self.config.all_s0()) {
                self.board.set_low_power_idle(false);
                info!("already in S0");
                state = PowerState::S0;
            }
        } else if !boot.ap_off && boot.auto_power_on {
            info!("auto power on");
            self.control.exit_hard_off();
        }

        self.control.publish(state);
        state
    }

    /// Force power off from inside the state machine. Holds until the next
    /// G3S5.
    fn force_shutdown(&mut self) {
        info!("chipset force shutdown");
        self.forcing_shutdown = true;
    }

    fn drain_requests(&mut self) {
        if self.control.take_force_shutdown() {
            self.forcing_shutdown = true;
        }
    }

    /// Run one iteration of the state machine and return the next state.
    pub async fn step(&mut self, state: PowerState) -> PowerState {
        self.drain_requests();

        match state {
            PowerState::G3 => {
                if self.control.take_exit_hard_off() {
                    PowerState::G3S5
                } else {
                    PowerState::G3
                }
            }

            PowerState::S5 => {
                if self.forcing_shutdown {
                    PowerState::S5G3
                } else {
                    PowerState::S5S3
                }
            }

            PowerState::S3 => {
                if !self.board.has_all(self.config.pgood_s3) || self.forcing_shutdown {
                    PowerState::S3S5
                } else if self.board.has_all(SignalMask::SUSPEND_DEASSERTED) {
                    PowerState::S3S0
                } else {
                    PowerState::S3
                }
            }

            PowerState::S0 => self.handle_s0().await,
            PowerState::G3S5 => self.handle_g3s5().await,
            PowerState::S5S3 => self.handle_s5s3().await,
            PowerState::S3S0 => self.handle_s3s0().await,
            PowerState::S0S3 => self.handle_s0s3().await,

            PowerState::S3S5 => {
                // Hooks go first so nobody sees the rails half down.
                self.hooks.notify(HookEvent::Shutdown);
                self.run_table(self.config.tables.s3s5).await;
                PowerState::S5
            }

            PowerState::S5G3 => PowerState::G3,
        }
    }

    fn s0_exit_wanted(&self) -> bool {
        !self.board.has_all(self.config.pgood_s3)
            || self.forcing_shutdown
            || !self.board.has_all(SignalMask::SUSPEND_DEASSERTED)
    }

    async fn handle_s0(&mut self) -> PowerState {
        if self.s0_exit_wanted() {
            return PowerState::S0S3;
        }

        // AP and SYS power good can glitch on output voltage transitions;
        // give them a window to come back before dropping to S3.
        if let Some(debounce) = self.config.ap_pgood_debounce {
            if let Err(e) = self
                .board
                .wait_all_timeout(debounce, PGOOD_AP_DEBOUNCE_TIMEOUT)
                .await
            {
                warn!("S0 power good lost: {}", e);
                return PowerState::S0S3;
            }

            // The wait can block and swallow wake events, so look again.
            self.drain_requests();
            if self.s0_exit_wanted() {
                return PowerState::S0S3;
            }
        }

        PowerState::S0
    }

    /// Poll the charger until it lets us power on, within the retry budget.
    async fn wait_for_charger(&mut self) -> Result<(), Error> {
        let mut tries = 0;
        while self.board.prevent_power_on() {
            let attempt = tries;
            tries += 1;
            if attempt >= CHARGER_INITIALIZED_TRIES {
                break;
            }
            self.board
                .delay_ms(CHARGER_INITIALIZED_DELAY.as_millis() as u32)
                .await;
        }

        if self.board.wants_shutdown() || tries > CHARGER_INITIALIZED_TRIES {
            return Err(Error::ChargerInhibited);
        }
        Ok(())
    }

    async fn handle_g3s5(&mut self) -> PowerState {
        self.forcing_shutdown = false;

        // Allow time for the charger to initialise, in case we are booting
        // with no battery.
        match self.wait_for_charger().await {
            Ok(()) => {
                self.control.set_power_up_inhibited(false);
                PowerState::S5
            }
            Err(e) => {
                error!("power-up inhibited: {}", e);
                self.control.set_power_up_inhibited(true);
                self.force_shutdown();
                PowerState::G3
            }
        }
    }

    async fn handle_s5s3(&mut self) -> PowerState {
        self.run_table(self.config.tables.s5s3).await;

        // SYS_RST stays asserted until S3S0 so the TPM is not reset right
        // after power-on.
        self.sys_reset_asserted = true;

        if let Err(e) = self.board.wait_all(self.config.pgood_s3).await {
            error!("S3 rails did not come up: {}", e);
            self.force_shutdown();
            return PowerState::S3S5;
        }

        self.hooks.notify(HookEvent::Startup);
        PowerState::S3
    }

    async fn handle_s3s0(&mut self) -> PowerState {
        self.run_table(self.config.tables.s3s0).await;

        if self.sys_reset_asserted {
            self.board.delay_ms(SYS_RST_RELEASE_DELAY_MS).await;
            self.board.set(Rail::SysRstL, PinState::High);
            self.sys_reset_asserted = false;
        }

        if let Err(e) = self.board.wait_all(self.config.pgood_s0).await {
            error!("S0 rails did not come up: {}", e);
            self.force_shutdown();
            return PowerState::S3S0;
        }

        self.hooks.notify(HookEvent::Resume);

        // No deep idle while the AP runs.
        self.board.set_low_power_idle(false);
        PowerState::S0
    }

    async fn handle_s0s3(&mut self) -> PowerState {
        self.hooks.notify(HookEvent::Suspend);

        // Latency from the AP cancelling its suspend to rails coming back
        // must stay small, so check for it all the way down.
        let forcing = self.forcing_shutdown;
        let control = self.control;
        let abort = move |signals: SignalMask| {
            !forcing && !control.shutdown_pending() && signals.contains(SignalMask::SUSPEND_DEASSERTED)
        };

        if sequence::sleep_abortable(&mut self.board, SUSPEND_PRE_DELAY_MS, &abort).await
            == RunOutcome::Aborted
        {
            return PowerState::S3S0;
        }
        if sequence::run(&mut self.board, self.config.tables.s0s3, Some(&abort)).await
            == RunOutcome::Aborted
        {
            return PowerState::S3S0;
        }

        self.board.set_low_power_idle(true);

        // The button may be held waiting on the long-press timer; now that
        // we are in S3, power off right away.
        if self.board.power_button_pressed() {
            self.forcing_shutdown = true;
            self.control.shutdown_timer.cancel();
        }

        PowerState::S3
    }

    async fn run_table(&mut self, table: &'static [SequenceOp]) {
        sequence::run(&mut self.board, table, None::<&fn(SignalMask) -> bool>).await;
    }

    /// Pulse `SYS_RST_L`. Cold and warm resets are handled alike.
    pub async fn reset(&mut self, cold: bool) {
        info!("chipset reset (cold {})", cold);
        rails::pulse_reset(&mut self.board).await;
    }

    /// Like [`reset`](Self::reset), for callers that cannot await.
    pub fn reset_blocking<D: embedded_hal::delay::DelayNs>(&mut self, delay: &mut D) {
        info!("chipset reset (blocking)");
        rails::pulse_reset_blocking(&mut self.board, delay);
    }

    /// The scheduling loop. Never returns.
    ///
    /// Stable states that did not change wait for a wake before the next
    /// step: an input edge, or a request through [`PowerControl`].
    pub async fn run(&mut self, initial: PowerState) {
        let mut state = initial;
        self.control.publish(state);
        info!("power state {}", state);

        loop {
            if let Some(cold) = self.control.take_reset() {
                self.reset(cold).await;
            }

            let next = self.step(state).await;
            if next != state {
                info!("power state {} -> {}", state, next);
                self.control.publish(next);
            } else if next.is_stable() {
                trace!("power state {} waiting", next);
                self.control.wait_wake().await;
            }
            state = next;
        }
    }
}
