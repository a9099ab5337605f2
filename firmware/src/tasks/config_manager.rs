use defmt::{debug, error, info};
use embassy_executor::task;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel;
use embassy_sync::mutex::Mutex;
use sequential_storage::cache::NoCache;
use sequential_storage::map::{SerializationError, fetch_item, store_item};
use serde::{Deserialize, Serialize};

use crate::flash_layout::get_config_range;
use crate::{OM_FLASH, config::*};

#[derive(Debug, defmt::Format)]
pub enum ConfigError {
    // Flash operation errors
    Flash(embassy_rp::flash::Error),
    // Other storage errors
    Storage,
}

impl From<embassy_rp::flash::Error> for ConfigError {
    fn from(error: embassy_rp::flash::Error) -> Self {
        ConfigError::Flash(error)
    }
}

impl From<sequential_storage::Error<embassy_rp::flash::Error>> for ConfigError {
    fn from(error: sequential_storage::Error<embassy_rp::flash::Error>) -> Self {
        match error {
            sequential_storage::Error::Storage { value, .. } => ConfigError::Flash(value),
            _ => ConfigError::Storage,
        }
    }
}

impl From<SerializationError> for ConfigError {
    fn from(_: SerializationError) -> Self {
        ConfigError::Storage
    }
}

#[derive(defmt::Format)]
pub enum ConfigManagerEvents {
    AutoPowerOn(bool),
    LongPressMs(u32),
    VinPowerThreshold(f32),
    HardwareVersion(u8),
}

pub type ConfigManagerChannelType =
    channel::Channel<CriticalSectionRawMutex, ConfigManagerEvents, 8>;
pub static CONFIG_MANAGER_EVENT_CHANNEL: ConfigManagerChannelType = channel::Channel::new();

// Configuration store on top of a sequential-storage map
pub struct ConfigManager {
    data_buffer: [u8; 128],
}

impl ConfigManager {
    const fn new() -> Self {
        Self {
            data_buffer: [0u8; 128],
        }
    }

    /// Store a serializable value
    pub async fn set<T>(&mut self, key: u16, value: &T) -> Result<(), ConfigError>
    where
        T: for<'de> Deserialize<'de> + Serialize + for<'b> sequential_storage::map::Value<'b>,
    {
        debug!("Storing item with key: {}", key);

        let mut flash = OM_FLASH.get().await.lock().await;

        store_item(
            &mut *flash,
            get_config_range(),
            &mut NoCache::new(),
            &mut self.data_buffer,
            &key,
            value,
        )
        .await?;

        debug!("Item stored successfully with key: {}", key);
        Ok(())
    }

    /// Retrieve a value, or None if it was never stored
    pub async fn get<T>(&mut self, key: u16) -> Result<Option<T>, ConfigError>
    where
        T: for<'de> Deserialize<'de> + Serialize + for<'b> sequential_storage::map::Value<'b>,
    {
        debug!("Fetching item with key: {}", key);

        let mut flash = OM_FLASH.get().await.lock().await;

        let value = fetch_item(
            &mut *flash,
            get_config_range(),
            &mut NoCache::new(),
            &mut self.data_buffer,
            &key,
        )
        .await?;

        if value.is_none() {
            debug!("No item found with key: {}", key);
        }
        Ok(value)
    }

    async fn get_or<T>(&mut self, key: u16, default: T) -> T
    where
        T: for<'de> Deserialize<'de> + Serialize + for<'b> sequential_storage::map::Value<'b>,
    {
        match self.get(key).await {
            Ok(value) => value.unwrap_or(default),
            Err(e) => {
                error!("Failed to fetch item with key {}: {}", key, e);
                default
            }
        }
    }
}

static CONFIG_MANAGER: Mutex<CriticalSectionRawMutex, ConfigManager> =
    Mutex::new(ConfigManager::new());

/// Runtime configuration values, read from the flash storage and stored here
/// to prevent multiple reads from the flash.
struct RuntimeConfig {
    pub auto_power_on: bool,
    pub long_press_ms: u32,
    pub vin_power_threshold: f32,
    pub hardware_version: u8,
}

impl RuntimeConfig {
    const fn new() -> Self {
        RuntimeConfig {
            auto_power_on: DEFAULT_AUTO_POWER_ON,
            long_press_ms: DEFAULT_LONG_PRESS_MS,
            vin_power_threshold: DEFAULT_VIN_POWER_THRESHOLD,
            hardware_version: DEFAULT_HARDWARE_VERSION,
        }
    }
}

static RUNTIME_CONFIG: Mutex<CriticalSectionRawMutex, RuntimeConfig> =
    Mutex::new(RuntimeConfig::new());

pub async fn get_auto_power_on() -> bool {
    RUNTIME_CONFIG.lock().await.auto_power_on
}
pub async fn get_long_press_ms() -> u32 {
    RUNTIME_CONFIG.lock().await.long_press_ms
}
pub async fn get_vin_power_threshold() -> f32 {
    RUNTIME_CONFIG.lock().await.vin_power_threshold
}
pub async fn get_hardware_version() -> u8 {
    RUNTIME_CONFIG.lock().await.hardware_version
}

pub async fn set_auto_power_on(value: bool) {
    RUNTIME_CONFIG.lock().await.auto_power_on = value;
    CONFIG_MANAGER_EVENT_CHANNEL
        .send(ConfigManagerEvents::AutoPowerOn(value))
        .await;
}
pub async fn set_long_press_ms(value: u32) {
    RUNTIME_CONFIG.lock().await.long_press_ms = value;
    CONFIG_MANAGER_EVENT_CHANNEL
        .send(ConfigManagerEvents::LongPressMs(value))
        .await;
}
pub async fn set_vin_power_threshold(value: f32) {
    RUNTIME_CONFIG.lock().await.vin_power_threshold = value;
    CONFIG_MANAGER_EVENT_CHANNEL
        .send(ConfigManagerEvents::VinPowerThreshold(value))
        .await;
}
pub async fn set_hardware_version(value: u8) {
    RUNTIME_CONFIG.lock().await.hardware_version = value;
    CONFIG_MANAGER_EVENT_CHANNEL
        .send(ConfigManagerEvents::HardwareVersion(value))
        .await;
}

/// Load the stored configuration into [`RUNTIME_CONFIG`]. Missing or
/// unreadable entries keep their defaults.
pub async fn init_config_manager() {
    let mut config_manager = CONFIG_MANAGER.lock().await;

    let auto_power_on = config_manager
        .get_or(AUTO_POWER_ON_CONFIG_KEY, DEFAULT_AUTO_POWER_ON)
        .await;
    debug!("Received auto power on: {}", auto_power_on);
    let long_press_ms = config_manager
        .get_or(LONG_PRESS_CONFIG_KEY, DEFAULT_LONG_PRESS_MS)
        .await;
    debug!("Received long press duration: {}", long_press_ms);
    let vin_power_threshold = config_manager
        .get_or(VIN_POWER_THRESHOLD_CONFIG_KEY, DEFAULT_VIN_POWER_THRESHOLD)
        .await;
    debug!("Received vin power threshold: {}", vin_power_threshold);
    let hardware_version = config_manager
        .get_or(HARDWARE_VERSION_CONFIG_KEY, DEFAULT_HARDWARE_VERSION)
        .await;
    debug!("Received hardware version: {}", hardware_version);

    let mut runtime_config = RUNTIME_CONFIG.lock().await;
    runtime_config.auto_power_on = auto_power_on;
    runtime_config.long_press_ms = long_press_ms;
    runtime_config.vin_power_threshold = vin_power_threshold;
    runtime_config.hardware_version = hardware_version;

    info!("Runtime configuration updated");
}

#[task]
pub async fn config_manager_task() {
    info!("Config manager task started");

    let receiver = CONFIG_MANAGER_EVENT_CHANNEL.receiver();

    loop {
        let event = receiver.receive().await;
        debug!("Received config manager event: {:?}", event);

        let mut config_manager = CONFIG_MANAGER.lock().await;

        let result = match event {
            ConfigManagerEvents::AutoPowerOn(value) => {
                config_manager.set(AUTO_POWER_ON_CONFIG_KEY, &value).await
            }
            ConfigManagerEvents::LongPressMs(value) => {
                config_manager.set(LONG_PRESS_CONFIG_KEY, &value).await
            }
            ConfigManagerEvents::VinPowerThreshold(value) => {
                config_manager
                    .set(VIN_POWER_THRESHOLD_CONFIG_KEY, &value)
                    .await
            }
            ConfigManagerEvents::HardwareVersion(value) => {
                config_manager.set(HARDWARE_VERSION_CONFIG_KEY, &value).await
            }
        };

        if let Err(e) = result {
            error!("Failed to store configuration: {}", e);
        }
    }
}
