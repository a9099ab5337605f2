use chipset_power::{
    BootInfo, Charger, Chipset, Error, Hooks, Platform, PowerControl, PowerSeqVersion,
    PowerSignals, Rail, RailDriver, SignalMask,
};
use defmt::*;
use embassy_executor::task;
use embassy_rp::gpio::{AnyPin, Level, Output, Pin};
use embassy_time::{Delay, Duration};
use embedded_hal::digital::PinState;
use embedded_hal_async::delay::DelayNs;
use portable_atomic::{AtomicBool, Ordering};

use crate::config::VIN_CRITICAL_THRESHOLD;
use crate::config_resources::{RailOutputResources, UsbPowerResources};
use crate::tasks::config_manager::{
    get_hardware_version, get_long_press_ms, get_vin_power_threshold,
};
use crate::tasks::power_signals::{self, SignalReader};
use crate::usb_power::UsbPower;

/// Entry point into the power state machine for every other task.
pub static POWER_CONTROL: PowerControl = PowerControl::new();

static LOW_POWER_IDLE: AtomicBool = AtomicBool::new(true);

pub fn low_power_idle_allowed() -> bool {
    LOW_POWER_IDLE.load(Ordering::Relaxed)
}

fn level(state: PinState) -> Level {
    match state {
        PinState::Low => Level::Low,
        PinState::High => Level::High,
    }
}

/// Rails with a pin on this board: the simplified tree plus the AP core
/// enable and reset line.
const WIRED_RAILS: [Rail; 10] = [
    Rail::SysRstL,
    Rail::ApCoreEn,
    Rail::Pp900S3En,
    Rail::Pp3300S3En,
    Rail::Pp1800S3En,
    Rail::Pp1250S3En,
    Rail::Pp900S0En,
    Rail::Pp1800UsbEn,
    Rail::Pp3300S0En,
    Rail::Pp1800S0En,
];

/// The sequencing version for a stored hardware version, if this board can
/// drive every rail it needs.
pub fn board_sequencing(hardware_version: u8) -> Option<PowerSeqVersion> {
    PowerSeqVersion::from_u8(hardware_version)
        .filter(|version| version.config().tables.drives_only(&WIRED_RAILS))
}

/// Rail enable outputs. Rails not wired on this board are `None`.
pub struct Outputs {
    rails: [Option<Output<'static>>; Rail::COUNT],
}

impl Outputs {
    /// Take the pins and drive each rail to `initial` right away.
    fn new(resources: RailOutputResources, initial: &[PinState; Rail::COUNT]) -> Self {
        let mut rails: [Option<Output<'static>>; Rail::COUNT] = [const { None }; Rail::COUNT];
        let mut wire = |rail: Rail, pin: AnyPin| {
            rails[rail.index()] = Some(Output::new(pin, level(initial[rail.index()])));
        };

        wire(Rail::SysRstL, resources.sys_rst_l.degrade());
        wire(Rail::ApCoreEn, resources.ap_core_en.degrade());
        wire(Rail::Pp900S3En, resources.pp900_s3_en.degrade());
        wire(Rail::Pp3300S3En, resources.pp3300_s3_en.degrade());
        wire(Rail::Pp1800S3En, resources.pp1800_s3_en.degrade());
        wire(Rail::Pp1250S3En, resources.pp1250_s3_en.degrade());
        wire(Rail::Pp900S0En, resources.pp900_s0_en.degrade());
        wire(Rail::Pp1800UsbEn, resources.pp1800_usb_en.degrade());
        wire(Rail::Pp3300S0En, resources.pp3300_s0_en.degrade());
        wire(Rail::Pp1800S0En, resources.pp1800_s0_en.degrade());

        Outputs { rails }
    }
}

impl RailDriver for Outputs {
    fn set(&mut self, rail: Rail, state: PinState) {
        match &mut self.rails[rail.index()] {
            Some(output) => output.set_level(level(state)),
            None => warn!("{} is not wired on this board", rail.name()),
        }
    }
}

/// Input voltage gates power-on in place of a battery charger.
struct VinCharger {
    power_threshold: f32,
}

impl Charger for VinCharger {
    fn prevent_power_on(&mut self) -> bool {
        power_signals::vin() < self.power_threshold
    }

    fn wants_shutdown(&mut self) -> bool {
        power_signals::vin() < VIN_CRITICAL_THRESHOLD
    }
}

/// The hardware behind the state machine.
pub struct EcBoard {
    outputs: Outputs,
    signals: SignalReader,
    delay: Delay,
    charger: VinCharger,
}

impl RailDriver for EcBoard {
    fn set(&mut self, rail: Rail, state: PinState) {
        self.outputs.set(rail, state);
    }
}

impl PowerSignals for EcBoard {
    fn current(&self) -> SignalMask {
        self.signals.current()
    }

    async fn wait_all_timeout(&mut self, mask: SignalMask, timeout: Duration) -> Result<(), Error> {
        self.signals.wait_all_timeout(mask, timeout).await
    }
}

impl DelayNs for EcBoard {
    async fn delay_ns(&mut self, ns: u32) {
        self.delay.delay_ns(ns).await;
    }

    async fn delay_us(&mut self, us: u32) {
        self.delay.delay_us(us).await;
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms).await;
    }
}

impl Charger for EcBoard {
    fn prevent_power_on(&mut self) -> bool {
        self.charger.prevent_power_on()
    }

    fn wants_shutdown(&mut self) -> bool {
        self.charger.wants_shutdown()
    }
}

impl Platform for EcBoard {
    fn power_button_pressed(&self) -> bool {
        power_signals::power_button_pressed()
    }

    // This board has no deep-idle mode to gate; the flag only shows up in
    // the status log.
    fn set_low_power_idle(&mut self, allowed: bool) {
        debug!("low power idle allowed: {}", allowed);
        LOW_POWER_IDLE.store(allowed, Ordering::Relaxed);
    }
}

#[task]
pub async fn chipset_task(
    rail_resources: RailOutputResources,
    usb_resources: UsbPowerResources,
    boot: BootInfo,
) {
    info!("Starting chipset task");

    let hardware_version = get_hardware_version().await;
    let version = board_sequencing(hardware_version).unwrap_or_else(|| {
        warn!("Hardware version {} not supported, using V2", hardware_version);
        PowerSeqVersion::V2
    });
    let config = version.config();
    info!("Power sequencing {}", version);

    POWER_CONTROL.set_long_press(Duration::from_millis(get_long_press_ms().await as u64));

    // Keep the rails of a running AP where they are across a warm restart.
    power_signals::wait_ready().await;
    let resume = boot.jumped_to_image && power_signals::signals().contains(config.all_s0());
    let outputs = Outputs::new(rail_resources, &config.tables.resting_levels(resume));
    let usb_power = UsbPower::new(usb_resources, resume);

    let mut hooks = Hooks::new();
    hooks.register(&usb_power);

    let board = EcBoard {
        outputs,
        signals: SignalReader,
        delay: Delay,
        charger: VinCharger {
            power_threshold: get_vin_power_threshold().await,
        },
    };

    let mut chipset = Chipset::new(board, config, &POWER_CONTROL, hooks);

    info!("Chipset task initialized");

    let state = chipset.init(boot);
    chipset.run(state).await;
}

#[task]
pub async fn shutdown_timer_task() {
    info!("Starting shutdown timer task");
    POWER_CONTROL.run_shutdown_timer().await;
}
