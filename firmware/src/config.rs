use embassy_time::Duration;

pub const I2C_ADDR: u8 = 0x6d; // I2C address for the host secondary interface

pub const FLASH_SIZE: usize = 2 * 1024 * 1024;
pub const CONFIG_FLASH_SIZE: u32 = 64 * 1024; // Last 64 kB of flash hold the config map

// Power-good and suspend lines are sampled this often.
pub const SIGNAL_SAMPLE_INTERVAL: Duration = Duration::from_millis(1);

// Power button and lid switch settle time.
pub const SWITCH_DEBOUNCE: Duration = Duration::from_millis(30);

pub const WATCHDOG_TIMEOUT: Duration = Duration::from_secs(8);
pub const WATCHDOG_FEED_INTERVAL: Duration = Duration::from_secs(1);

pub const AUTO_POWER_ON_CONFIG_KEY: u16 = 0x1001;
pub const DEFAULT_AUTO_POWER_ON: bool = true; // Default: power the AP on at boot

pub const LONG_PRESS_CONFIG_KEY: u16 = 0x1002;
pub const DEFAULT_LONG_PRESS_MS: u32 = 8_000; // Hold time for a forced shutdown

pub const VIN_POWER_THRESHOLD_CONFIG_KEY: u16 = 0x1004;
pub const DEFAULT_VIN_POWER_THRESHOLD: f32 = 9.0; // V; below this the AP may not power on
pub const VIN_CRITICAL_THRESHOLD: f32 = 6.0; // V; below this the AP must stay off

pub const VIN_MAX_VALUE: f32 = 40.0; // V; full scale of the scaled VIN input
pub const DEFAULT_VIN_CORRECTION_SCALE: f32 = 1.015;

pub const HARDWARE_VERSION_CONFIG_KEY: u16 = 0x100c;
pub const DEFAULT_HARDWARE_VERSION: u8 = 2; // Selects the power sequencing version

pub const FW_VERSION_STR: &str = "0.1.0";

// Parse version strings into byte arrays
// The version format is [major, minor, patch, alpha], where alpha is 0xff
// for stable releases and a running number for alpha releases.

macro_rules! parse_version {
    ($ver:expr) => {{
        // Accepts "x.y.z" or "x.y.z-aN"
        const fn parse(ver: &str) -> [u8; 4] {
            let bytes = ver.as_bytes();
            let mut fields = [0u8, 0, 0, 0xff];
            let mut field = 0;
            let mut i = 0;
            while i < bytes.len() {
                match bytes[i] {
                    b'.' => field += 1,
                    b'-' => {
                        field = 3;
                        fields[3] = 0;
                        i += 1; // skip 'a'
                    }
                    digit => fields[field] = fields[field] * 10 + (digit - b'0'),
                }
                i += 1;
            }
            fields
        }
        parse($ver)
    }};
}

pub const FW_VERSION: [u8; 4] = parse_version!(FW_VERSION_STR);
