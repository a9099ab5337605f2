use chipset_power::signals::missing;
use chipset_power::{Error, PowerSignals, SignalMask};
use defmt::*;
use embassy_executor::task;
use embassy_rp::{
    adc::{Adc, Channel, Config, InterruptHandler},
    bind_interrupts,
    gpio::{Input, Pull},
};
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, signal::Signal};
use embassy_time::{Duration, Instant, Ticker, Timer, with_deadline};
use portable_atomic::{AtomicBool, AtomicU32, Ordering};

use crate::{
    config::{
        DEFAULT_VIN_CORRECTION_SCALE, SIGNAL_SAMPLE_INTERVAL, SWITCH_DEBOUNCE, VIN_MAX_VALUE,
    },
    config_resources::{
        AnalogInputResources, LidInputResources, PowerButtonInputResources, PowerSignalResources,
    },
    tasks::chipset::POWER_CONTROL,
};

/// Latest sampled power-good and suspend lines.
static SIGNALS: AtomicU32 = AtomicU32::new(0);

/// Raised whenever [`SIGNALS`] changes.
static SIGNALS_CHANGED: Signal<CriticalSectionRawMutex, SignalMask> = Signal::new();

/// Raised once the first sample has been taken.
static SIGNALS_READY: Signal<CriticalSectionRawMutex, ()> = Signal::new();

static POWER_BUTTON_PRESSED: AtomicBool = AtomicBool::new(false);

/// Averaged input voltage in millivolts.
static VIN_MV: AtomicU32 = AtomicU32::new(0);

pub fn signals() -> SignalMask {
    SignalMask::from_bits_truncate(SIGNALS.load(Ordering::Acquire))
}

pub fn power_button_pressed() -> bool {
    POWER_BUTTON_PRESSED.load(Ordering::Relaxed)
}

pub fn vin() -> f32 {
    VIN_MV.load(Ordering::Relaxed) as f32 / 1000.0
}

/// Wait until the input lines have been sampled at least once.
pub async fn wait_ready() {
    SIGNALS_READY.wait().await;
    // Leave it raised for anybody else.
    SIGNALS_READY.signal(());
}

/// [`PowerSignals`] on top of the sampling task.
///
/// Only the chipset task waits on the change signal.
pub struct SignalReader;

impl PowerSignals for SignalReader {
    fn current(&self) -> SignalMask {
        signals()
    }

    async fn wait_all_timeout(&mut self, mask: SignalMask, timeout: Duration) -> Result<(), Error> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.has_all(mask) {
                return Ok(());
            }
            if with_deadline(deadline, SIGNALS_CHANGED.wait()).await.is_err() {
                let missing = missing(mask, self.current());
                warn!("power signal timeout, missing {}", missing);
                return Err(Error::SignalTimeout { missing });
            }
        }
    }
}

#[task]
pub async fn power_signal_task(r: PowerSignalResources) {
    info!("Starting power signal task");

    let lines = [
        (Input::new(r.pp5000_pg, Pull::Down), SignalMask::PP5000_PWR_GOOD),
        (Input::new(r.sys_pg, Pull::Down), SignalMask::SYS_PWR_GOOD),
        (Input::new(r.pp1250_s3_pg, Pull::Down), SignalMask::PP1250_S3_PWR_GOOD),
        (Input::new(r.pp900_s0_pg, Pull::Down), SignalMask::PP900_S0_PWR_GOOD),
        (Input::new(r.ap_core_pg, Pull::Down), SignalMask::AP_PWR_GOOD),
        // High means the AP is not asking to suspend.
        (Input::new(r.ap_ec_s3_s0_l, Pull::Down), SignalMask::SUSPEND_DEASSERTED),
    ];

    let mut ticker = Ticker::every(SIGNAL_SAMPLE_INTERVAL);
    let mut last: Option<SignalMask> = None;

    info!("Power signal task initialized");

    loop {
        let mut mask = SignalMask::empty();
        for (input, bit) in &lines {
            mask.set(*bit, input.is_high());
        }

        if last != Some(mask) {
            debug!("power signals: {}", mask);
            SIGNALS.store(mask.bits(), Ordering::Release);
            SIGNALS_CHANGED.signal(mask);
            POWER_CONTROL.wake();
            if last.is_none() {
                SIGNALS_READY.signal(());
            }
            last = Some(mask);
        }

        ticker.next().await;
    }
}

/// Wait for a debounced level change on `input`.
async fn debounced_edge(input: &mut Input<'static>, last: bool) -> bool {
    loop {
        input.wait_for_any_edge().await;
        Timer::after(SWITCH_DEBOUNCE).await;
        let level = input.is_high();
        if level != last {
            return level;
        }
    }
}

#[task]
pub async fn power_button_input_task(r: PowerButtonInputResources) {
    info!("Starting power button input task");

    let mut button = Input::new(r.pin, Pull::Up);
    let mut released = button.is_high();

    info!("Power button input task initialized");

    loop {
        released = debounced_edge(&mut button, released).await;
        debug!("Power button event detected");
        POWER_BUTTON_PRESSED.store(!released, Ordering::Relaxed);
        POWER_CONTROL.on_power_button(!released);
    }
}

#[task]
pub async fn lid_input_task(r: LidInputResources) {
    info!("Starting lid input task");

    let mut lid = Input::new(r.pin, Pull::Up);
    let mut open = lid.is_high();

    info!("Lid input task initialized");

    loop {
        open = debounced_edge(&mut lid, open).await;
        debug!("Lid event detected");
        POWER_CONTROL.on_lid(open);
    }
}

const AVERAGE_SAMPLES: usize = 10;

struct AveragedInput {
    samples: [f32; AVERAGE_SAMPLES],
    index: usize,
    sum: f32,
    count: usize,
}

impl AveragedInput {
    fn new() -> Self {
        Self {
            samples: [0.0; AVERAGE_SAMPLES],
            index: 0,
            sum: 0.0,
            count: 0,
        }
    }

    fn add_sample(&mut self, value: f32) {
        if self.count < AVERAGE_SAMPLES {
            self.count += 1;
        } else {
            self.sum -= self.samples[self.index];
        }
        self.samples[self.index] = value;
        self.sum += value;
        self.index = (self.index + 1) % AVERAGE_SAMPLES;
    }

    fn average(&self) -> f32 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f32
        }
    }
}

const VIN_ADC_SCALE: f32 = VIN_MAX_VALUE / 4096.0; // Scale factor for Vin readings

bind_interrupts!(struct Irqs {
    ADC_IRQ_FIFO => InterruptHandler;
});

#[task]
pub async fn analog_input_task(r: AnalogInputResources) {
    info!("Starting analog input task");

    let mut adc = Adc::new(r.adc, Irqs, Config::default());
    let mut vin_s = Channel::new_pin(r.vin_s, Pull::None);

    let mut ticker = Ticker::every(Duration::from_millis(20));
    let mut vin_avg = AveragedInput::new();
    let vin_adc_scale = DEFAULT_VIN_CORRECTION_SCALE * VIN_ADC_SCALE;

    info!("Analog input task initialized");

    loop {
        ticker.next().await;

        match adc.read(&mut vin_s).await {
            Ok(raw) => vin_avg.add_sample(raw as f32 * vin_adc_scale),
            Err(e) => {
                warn!("VIN read failed: {}", e);
                continue;
            }
        }

        let vin = vin_avg.average();
        VIN_MV.store((vin * 1000.0) as u32, Ordering::Relaxed);
        trace!("VIN: {}", vin);
    }
}
