#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use chipset_power::signals::missing;
use chipset_power::{
    Board, Charger, Chipset, Error, HookEvent, Platform, PowerSeqVersion, PowerSignals,
    PowerState, Rail, RailDriver, SignalMask,
};
use embassy_futures::block_on;
use embassy_time::Duration;
use embedded_hal::digital::PinState;
use embedded_hal_async::delay::DelayNs;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Rail(Rail, PinState),
    Hook(HookEvent),
    Idle(bool),
}

pub type Log = Rc<RefCell<Vec<Event>>>;

/// A hook subscriber that appends to `log`.
pub fn recorder(log: &Log) -> impl Fn(HookEvent) + use<> {
    let log = log.clone();
    move |event| log.borrow_mut().push(Event::Hook(event))
}

/// Simulated board on a virtual clock.
///
/// Power-good lines follow the enables that feed them. The AP suspend line
/// follows a time script, and lines can be held low outright or for a
/// window to model broken or glitching supplies.
pub struct Sim {
    pub version: PowerSeqVersion,
    pub now_us: u64,
    pub levels: [Option<PinState>; Rail::COUNT],
    pub log: Log,
    /// Suspend line level from time zero.
    pub suspend_deasserted: bool,
    /// `(at_ms, deasserted)` edges of the suspend line.
    pub suspend_script: Vec<(u64, bool)>,
    pub stuck_low: SignalMask,
    /// `(from_ms, to_ms, lines)` held low in the window.
    pub glitch: Option<(u64, u64, SignalMask)>,
    /// Polls for which the charger keeps power-on inhibited.
    pub charger_busy_polls: u32,
    pub charger_polls: u32,
    pub charger_wants_shutdown: bool,
    pub button_pressed: bool,
    pub idle_allowed: Option<bool>,
    /// `(at_ms, action)` run once when the clock reaches `at_ms`.
    pub timed: Vec<(u64, Box<dyn FnOnce()>)>,
}

impl Sim {
    pub fn new(version: PowerSeqVersion, log: Log) -> Self {
        Sim {
            version,
            now_us: 0,
            levels: [None; Rail::COUNT],
            log,
            suspend_deasserted: true,
            suspend_script: Vec::new(),
            stuck_low: SignalMask::empty(),
            glitch: None,
            charger_busy_polls: 0,
            charger_polls: 0,
            charger_wants_shutdown: false,
            button_pressed: false,
            idle_allowed: None,
            timed: Vec::new(),
        }
    }

    /// A board whose AP is already up in S0, with an empty log.
    pub fn powered_on(version: PowerSeqVersion, log: Log) -> Self {
        let mut sim = Sim::new(version, log);
        let tables = version.config().tables;
        for step in tables.s5s3.iter().chain(tables.s3s0) {
            sim.set(step.rail, step.level);
        }
        sim.set(Rail::SysRstL, PinState::High);
        sim.log.borrow_mut().clear();
        sim
    }

    pub fn now_ms(&self) -> u64 {
        self.now_us / 1000
    }

    pub fn level(&self, rail: Rail) -> Option<PinState> {
        self.levels[rail.index()]
    }

    fn high(&self, rail: Rail) -> bool {
        self.level(rail) == Some(PinState::High)
    }

    fn low(&self, rail: Rail) -> bool {
        self.level(rail) == Some(PinState::Low)
    }

    fn supplies(&self) -> SignalMask {
        let mut good = SignalMask::empty();
        match self.version {
            PowerSeqVersion::V0 | PowerSeqVersion::V1 => {
                good.set(SignalMask::PP5000_PWR_GOOD, self.high(Rail::Pp5000En));
                good.set(SignalMask::AP_PWR_GOOD, self.high(Rail::ApCoreEn));
                good.set(SignalMask::SYS_PWR_GOOD, self.low(Rail::Pp3300S0EnL));
            }
            PowerSeqVersion::V2 => {
                good.set(SignalMask::PP1250_S3_PWR_GOOD, self.high(Rail::Pp1250S3En));
                good.set(SignalMask::PP900_S0_PWR_GOOD, self.high(Rail::Pp900S0En));
                good.set(SignalMask::AP_PWR_GOOD, self.high(Rail::Pp1800S0En));
            }
        }
        good
    }

    fn suspend_line(&self) -> bool {
        let now = self.now_ms();
        self.suspend_script
            .iter()
            .filter(|(at, _)| *at <= now)
            .last()
            .map_or(self.suspend_deasserted, |(_, level)| *level)
    }

    fn advance_us(&mut self, us: u64) {
        self.now_us += us;
        let now = self.now_ms();
        let mut i = 0;
        while i < self.timed.len() {
            if self.timed[i].0 <= now {
                let (_, action) = self.timed.remove(i);
                action();
            } else {
                i += 1;
            }
        }
    }
}

impl RailDriver for Sim {
    fn set(&mut self, rail: Rail, level: PinState) {
        self.levels[rail.index()] = Some(level);
        self.log.borrow_mut().push(Event::Rail(rail, level));
    }
}

impl PowerSignals for Sim {
    fn current(&self) -> SignalMask {
        let mut signals = self.supplies() - self.stuck_low;
        if let Some((from, to, lines)) = self.glitch {
            let now = self.now_ms();
            if now >= from && now < to {
                signals -= lines;
            }
        }
        signals.set(SignalMask::SUSPEND_DEASSERTED, self.suspend_line());
        signals
    }

    async fn wait_all_timeout(&mut self, mask: SignalMask, timeout: Duration) -> Result<(), Error> {
        let mut waited = 0;
        loop {
            if self.has_all(mask) {
                return Ok(());
            }
            if waited >= timeout.as_millis() {
                return Err(Error::SignalTimeout {
                    missing: missing(mask, self.current()),
                });
            }
            self.advance_us(1000);
            waited += 1;
        }
    }
}

impl DelayNs for Sim {
    async fn delay_ns(&mut self, ns: u32) {
        self.advance_us(u64::from(ns).div_ceil(1000));
    }
}

impl Charger for Sim {
    fn prevent_power_on(&mut self) -> bool {
        self.charger_polls += 1;
        self.charger_polls <= self.charger_busy_polls
    }

    fn wants_shutdown(&mut self) -> bool {
        self.charger_wants_shutdown
    }
}

impl Platform for Sim {
    fn power_button_pressed(&self) -> bool {
        self.button_pressed
    }

    fn set_low_power_idle(&mut self, allowed: bool) {
        self.idle_allowed = Some(allowed);
        self.log.borrow_mut().push(Event::Idle(allowed));
    }
}

/// Step from `state` until `done` holds or `max_steps` run out. Returns the
/// states entered, `state` first.
pub fn drive<B: Board>(
    chipset: &mut Chipset<'_, B>,
    state: PowerState,
    done: impl Fn(PowerState) -> bool,
    max_steps: usize,
) -> Vec<PowerState> {
    let mut path = vec![state];
    let mut state = state;
    for _ in 0..max_steps {
        if done(state) {
            break;
        }
        state = block_on(chipset.step(state));
        path.push(state);
    }
    path
}

/// Step until `target` is entered.
pub fn drive_to<B: Board>(
    chipset: &mut Chipset<'_, B>,
    state: PowerState,
    target: PowerState,
) -> Vec<PowerState> {
    drive(chipset, state, |s| s == target, 64)
}

/// The rail writes in `log`, in order.
pub fn rail_writes(log: &Log) -> Vec<(Rail, PinState)> {
    log.borrow()
        .iter()
        .filter_map(|e| match *e {
            Event::Rail(rail, level) => Some((rail, level)),
            _ => None,
        })
        .collect()
}

pub fn hooks_fired(log: &Log) -> Vec<HookEvent> {
    log.borrow()
        .iter()
        .filter_map(|e| match *e {
            Event::Hook(event) => Some(event),
            _ => None,
        })
        .collect()
}
