use defmt::debug;
use embassy_time::Timer;

use crate::OM_WATCHDOG;
use crate::config::WATCHDOG_FEED_INTERVAL;
use crate::tasks::chipset::{POWER_CONTROL, low_power_idle_allowed};
use crate::tasks::power_signals;

#[embassy_executor::task]
pub async fn watchdog_feeder_task() {
    loop {
        Timer::after(WATCHDOG_FEED_INTERVAL).await;
        OM_WATCHDOG.get().await.lock().await.feed();

        debug!(
            "state: {} | signals: {} | vin: {} | inhibited: {} | idle: {}",
            POWER_CONTROL.state(),
            power_signals::signals(),
            power_signals::vin(),
            POWER_CONTROL.power_up_inhibited(),
            low_power_idle_allowed()
        );
    }
}
