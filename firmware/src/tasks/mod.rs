pub(crate) mod chipset;
pub(crate) mod config_manager;
pub(crate) mod i2c_secondary;
pub(crate) mod power_signals;
pub(crate) mod watchdog_feeder;
