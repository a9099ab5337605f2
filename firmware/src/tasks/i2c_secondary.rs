use chipset_power::PowerState;
use defmt::{debug, error, info};
use embassy_executor::task;
use embassy_rp::peripherals::I2C1;
use embassy_rp::{bind_interrupts, i2c, i2c_slave};
use embassy_time::Duration;

use crate::OM_WATCHDOG;
use crate::config::{FW_VERSION, I2C_ADDR, VIN_MAX_VALUE};
use crate::config_resources::I2CSecondaryResources;
use crate::reset_flags;
use crate::tasks::chipset::{POWER_CONTROL, board_sequencing};
use crate::tasks::config_manager::{
    get_auto_power_on, get_hardware_version, get_long_press_ms, get_vin_power_threshold,
    set_auto_power_on, set_hardware_version, set_long_press_ms, set_vin_power_threshold,
};
use crate::tasks::power_signals;

// Following commands are supported by the I2C secondary interface:
// - Read 0x03: Query hardware version (power sequencing revision)
// - Write 0x03 [NN]: Set hardware version, applied on the next boot; versions
//   whose rails this board cannot drive are rejected
// - Read 0x04: Query firmware version
// - Read 0x10: Query AP power state
// - Read 0x11: Query AP power state class (0 off, 1 suspend, 2 on)
// - Read 0x12: Query power signal mask (4 bytes)
// - Read 0x13: Query power-up inhibited flag
// - Read 0x14: Query auto power-on setting
// - Write 0x14 [00|01]: Set auto power-on
// - Read 0x15: Query long-press shutdown duration in ms (2 bytes)
// - Write 0x15 [NNNN]: Set long-press shutdown duration to NNNN ms
// - Read 0x16: Query DC IN power-on threshold voltage
// - Write 0x16 [NNNN]: Set DC IN power-on threshold voltage to 0.01*NNNN V
// - Read 0x20: Query DC IN voltage
// - Write 0x30 [ANY]: Power the AP on
// - Write 0x31 [ANY]: Force the AP off
// - Write 0x32 [00|01]: Reset the AP, warm or cold
// - Write 0x40 [ANY]: Restart the controller, leaving the AP running
// - Write 0x41 [ANY]: Restart the controller and keep the AP off

bind_interrupts!(struct Irqs {
    I2C1_IRQ => i2c::InterruptHandler<I2C1>;
});

async fn respond(device: &mut i2c_slave::I2cSlave<'_, I2C1>, data: &[u8]) {
    if let Err(e) = device.respond_and_fill(data, 0x00).await {
        error!("error while responding {}", e)
    }
}

async fn handle_write(command: u8, args: &[u8]) {
    match (command, args) {
        (0x03, &[version]) => {
            if board_sequencing(version).is_some() {
                info!("Setting hardware version to {}", version);
                set_hardware_version(version).await;
            } else {
                error!("Hardware version {} not supported on this board", version);
            }
        }
        (0x14, &[enabled]) => {
            info!("Setting auto power on to {}", enabled != 0);
            set_auto_power_on(enabled != 0).await;
        }
        (0x15, &[msb, lsb]) => {
            let ms = u16::from_be_bytes([msb, lsb]) as u32;
            info!("Setting long press duration to {} ms", ms);
            POWER_CONTROL.set_long_press(Duration::from_millis(ms as u64));
            set_long_press_ms(ms).await;
        }
        (0x16, &[msb, lsb]) => {
            let threshold = u16::from_be_bytes([msb, lsb]) as f32 / 100.0;
            info!("Setting power-on threshold to {} V", threshold);
            set_vin_power_threshold(threshold).await;
        }
        (0x30, _) => {
            info!("Host requested power on");
            POWER_CONTROL.exit_hard_off();
        }
        (0x31, _) => {
            info!("Host requested forced shutdown");
            POWER_CONTROL.force_shutdown();
        }
        (0x32, &[cold]) => {
            info!("Host requested AP reset");
            POWER_CONTROL.request_reset(cold != 0);
        }
        (0x40, _) => reset_flags::warm_restart(&mut *OM_WATCHDOG.get().await.lock().await),
        (0x41, _) => reset_flags::reboot_ap_off(&mut *OM_WATCHDOG.get().await.lock().await),
        (x, _) => error!("Invalid Write command: {:02x} ({} bytes)", x, args.len()),
    }
}

async fn handle_read(device: &mut i2c_slave::I2cSlave<'_, I2C1>, command: u8) {
    match command {
        // Query hardware version
        0x03 => respond(device, &[get_hardware_version().await]).await,
        // Query firmware version
        0x04 => respond(device, &FW_VERSION).await,
        // Query AP power state
        0x10 => {
            let state: PowerState = POWER_CONTROL.state();
            respond(device, &[state as u8]).await
        }
        // Query AP power state class
        0x11 => respond(device, &[POWER_CONTROL.state_class() as u8]).await,
        // Query power signal mask
        0x12 => respond(device, &power_signals::signals().bits().to_be_bytes()).await,
        // Query power-up inhibited flag
        0x13 => respond(device, &[POWER_CONTROL.power_up_inhibited() as u8]).await,
        // Query auto power-on setting
        0x14 => respond(device, &[get_auto_power_on().await as u8]).await,
        // Query long-press duration
        0x15 => {
            let ms = get_long_press_ms().await.min(u16::MAX as u32) as u16;
            respond(device, &ms.to_be_bytes()).await
        }
        // Query DC IN power-on threshold voltage
        0x16 => {
            let threshold_centi = (100.0 * get_vin_power_threshold().await) as u16;
            respond(device, &threshold_centi.to_be_bytes()).await
        }
        // Query DC IN voltage
        0x20 => {
            let voltage = power_signals::vin();
            let voltage_bytes = ((65535.0 * voltage / VIN_MAX_VALUE) as u16).to_be_bytes();
            respond(device, &voltage_bytes).await
        }
        x => error!("Invalid Write Read command: 0x{:02x}", x),
    }
}

#[task]
pub async fn i2c_secondary_task(r: I2CSecondaryResources) {
    info!("Starting I2C secondary task");
    let mut config = i2c_slave::Config::default();
    config.addr = I2C_ADDR as u16;
    let mut device = i2c_slave::I2cSlave::new(r.i2c, r.scl, r.sda, Irqs, config);

    info!("I2C secondary task initialized");

    loop {
        let mut buf = [0u8; 16];
        match device.listen(&mut buf).await {
            Ok(i2c_slave::Command::GeneralCall(len)) => {
                error!("General call write received: {}", buf[..len]);
            }
            Ok(i2c_slave::Command::Read) => loop {
                // Bare reads return the AP power state.
                match device.respond_to_read(&[POWER_CONTROL.state() as u8]).await {
                    Ok(i2c_slave::ReadStatus::Done) => break,
                    Ok(i2c_slave::ReadStatus::NeedMoreBytes) => (),
                    Ok(i2c_slave::ReadStatus::LeftoverBytes(x)) => {
                        info!("Left over bytes: {:?}", x);
                        break;
                    }
                    Err(e) => {
                        error!("Error responding to read: {:?}", e);
                        break;
                    }
                }
            },
            Ok(i2c_slave::Command::Write(len)) => {
                if len == 0 {
                    error!("Empty write command");
                    continue;
                }
                debug!("Write command {:02x}", buf[0]);
                handle_write(buf[0], &buf[1..len]).await;
            }
            Ok(i2c_slave::Command::WriteRead(len)) => {
                if len == 0 {
                    error!("Empty write read command");
                    continue;
                }
                handle_read(&mut device, buf[0]).await;
            }
            Err(e) => error!("{}", e),
        }
    }
}
