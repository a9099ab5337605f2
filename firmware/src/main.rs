#![no_std]
#![no_main]

extern crate alloc;

use config::FLASH_SIZE;
use embassy_rp::{flash::Async, watchdog::Watchdog};
use embassy_sync::{
    blocking_mutex::raw::CriticalSectionRawMutex, mutex::Mutex, once_lock::OnceLock,
};
use embedded_alloc::LlffHeap as Heap;

#[global_allocator]
static HEAP: Heap = Heap::empty();
const HEAP_SIZE: usize = 4096; // Only the hook registry lives here

use defmt::{error, info};
use embassy_executor::Spawner;
use {defmt_rtt as _, panic_probe as _};

mod config;
mod config_resources;
mod flash_layout;
mod reset_flags;
mod tasks;
mod usb_power;

use crate::config_resources::{
    AnalogInputResources, AssignedResources, I2CSecondaryResources, LidInputResources,
    PowerButtonInputResources, PowerSignalResources, RailOutputResources, UsbPowerResources,
};
use crate::tasks::config_manager::{get_auto_power_on, init_config_manager};

pub type FlashType<'a> =
    embassy_rp::flash::Flash<'a, embassy_rp::peripherals::FLASH, Async, FLASH_SIZE>;
pub type MFlashType<'a> = Mutex<CriticalSectionRawMutex, FlashType<'a>>;
pub static OM_FLASH: OnceLock<MFlashType<'static>> = OnceLock::new();

pub static OM_WATCHDOG: OnceLock<Mutex<CriticalSectionRawMutex, Watchdog>> = OnceLock::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    // Initialize the allocator BEFORE you use it
    {
        use core::mem::MaybeUninit;
        static mut HEAP_MEM: [MaybeUninit<u8>; HEAP_SIZE] = [MaybeUninit::uninit(); HEAP_SIZE];
        unsafe { HEAP.init(&raw mut HEAP_MEM as usize, HEAP_SIZE) }
    }

    let p = embassy_rp::init(Default::default());
    let r = split_resources!(p);

    info!("Starting up...");

    let flash = FlashType::new(p.FLASH, p.DMA_CH1);
    if OM_FLASH.init(Mutex::new(flash)).is_err() {
        error!("Failed to initialize flash");
        return;
    }

    info!("Initializing config manager...");

    init_config_manager().await;

    info!("Config manager initialized.");

    let mut watchdog = Watchdog::new(p.WATCHDOG);
    let boot = reset_flags::take_boot_info(&mut watchdog, get_auto_power_on().await);
    watchdog.start(config::WATCHDOG_TIMEOUT);
    if OM_WATCHDOG.init(Mutex::new(watchdog)).is_err() {
        error!("Failed to initialize watchdog");
        return;
    }

    // Spawn the async tasks
    spawner
        .spawn(tasks::watchdog_feeder::watchdog_feeder_task())
        .unwrap();

    spawner
        .spawn(tasks::config_manager::config_manager_task())
        .unwrap();

    spawner
        .spawn(tasks::power_signals::power_signal_task(r.power_signals))
        .unwrap();

    spawner
        .spawn(tasks::power_signals::analog_input_task(r.analog_inputs))
        .unwrap();

    spawner
        .spawn(tasks::power_signals::power_button_input_task(
            r.power_button_input,
        ))
        .unwrap();

    spawner
        .spawn(tasks::power_signals::lid_input_task(r.lid_input))
        .unwrap();

    spawner
        .spawn(tasks::chipset::shutdown_timer_task())
        .unwrap();

    spawner
        .spawn(tasks::chipset::chipset_task(
            r.rail_outputs,
            r.usb_power,
            boot,
        ))
        .unwrap();

    spawner
        .spawn(tasks::i2c_secondary::i2c_secondary_task(r.i2cs))
        .unwrap();
}
