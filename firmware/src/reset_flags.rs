//! Boot information carried across controller resets in the watchdog
//! scratch registers, which survive everything short of a power cycle.

use chipset_power::BootInfo;
use defmt::{debug, info};
use embassy_rp::watchdog::{ResetReason, Watchdog};

const JUMP_MAGIC_SCRATCH: usize = 0;
const FLAGS_SCRATCH: usize = 1;

/// Marks a restart the firmware asked for itself with the AP left running.
const JUMP_MAGIC: u32 = 0x4543_4a4d;

const FLAG_AP_OFF: u32 = 1 << 0;

/// Read and clear what the previous run left behind.
pub fn take_boot_info(watchdog: &mut Watchdog, auto_power_on: bool) -> BootInfo {
    let forced = matches!(watchdog.reset_reason(), Some(ResetReason::Forced));
    let magic = watchdog.get_scratch(JUMP_MAGIC_SCRATCH);
    let flags = watchdog.get_scratch(FLAGS_SCRATCH);
    watchdog.set_scratch(JUMP_MAGIC_SCRATCH, 0);
    watchdog.set_scratch(FLAGS_SCRATCH, 0);

    let boot = BootInfo {
        jumped_to_image: forced && magic == JUMP_MAGIC,
        ap_off: forced && flags & FLAG_AP_OFF != 0,
        auto_power_on,
    };
    debug!("boot info: {}", boot);
    boot
}

/// Restart the controller, leaving the AP running.
pub fn warm_restart(watchdog: &mut Watchdog) -> ! {
    info!("Warm restart");
    watchdog.set_scratch(JUMP_MAGIC_SCRATCH, JUMP_MAGIC);
    watchdog.set_scratch(FLAGS_SCRATCH, 0);
    restart(watchdog)
}

/// Restart the controller and keep the AP off afterwards.
pub fn reboot_ap_off(watchdog: &mut Watchdog) -> ! {
    info!("Reboot with AP off");
    watchdog.set_scratch(JUMP_MAGIC_SCRATCH, 0);
    watchdog.set_scratch(FLAGS_SCRATCH, FLAG_AP_OFF);
    restart(watchdog)
}

fn restart(watchdog: &mut Watchdog) -> ! {
    watchdog.trigger_reset();
    loop {
        cortex_m::asm::nop();
    }
}
