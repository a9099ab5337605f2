//! Sequencing versions and timing constants.

use embassy_time::Duration;

use crate::sequence::{self, SequenceTables};
use crate::signals::SignalMask;

/// Hold time on the power button before a forced shutdown.
pub const FORCED_SHUTDOWN_DELAY: Duration = Duration::from_secs(8);

/// Backoff between charger readiness polls in G3S5.
pub const CHARGER_INITIALIZED_DELAY: Duration = Duration::from_millis(100);
/// Charger readiness polls before power-up is given up.
pub const CHARGER_INITIALIZED_TRIES: u32 = 40;

/// How long AP/SYS power good may glitch in S0 before we drop to S3.
pub const PGOOD_AP_DEBOUNCE_TIMEOUT: Duration = Duration::from_millis(100);

/// Granularity of the suspend-abort check.
pub const SLEEP_INTERVAL_MS: u32 = 5;

/// Settle time after the suspend hooks, before S0 rails start to drop.
pub const SUSPEND_PRE_DELAY_MS: u32 = 20;

/// Delay between the S3->S0 rails and releasing a held `SYS_RST_L`.
pub const SYS_RST_RELEASE_DELAY_MS: u32 = 10;

/// Minimum `SYS_RST_L` pulse width.
pub const SYS_RST_HOLD: Duration = Duration::from_millis(1);

/// Bound on a plain [`wait_all`](crate::PowerSignals::wait_all).
pub const DEFAULT_SIGNAL_TIMEOUT: Duration = Duration::from_secs(1);

/// Power tree revision of the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerSeqVersion {
    /// Initial revision.
    V0,
    /// PP900_PLL_EN and PP900_PMU_EN merged into PP900_USB_EN.
    V1,
    /// Simplified power tree, fewer control signals.
    V2,
}

impl PowerSeqVersion {
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(PowerSeqVersion::V0),
            1 => Some(PowerSeqVersion::V1),
            2 => Some(PowerSeqVersion::V2),
            _ => None,
        }
    }

    pub const fn config(self) -> SequencingConfig {
        SequencingConfig::new(self)
    }
}

/// Everything about the power tree that differs between board revisions.
///
/// Chosen once at startup and never changed while the machine runs.
#[derive(Debug, Clone, Copy)]
pub struct SequencingConfig {
    pub version: PowerSeqVersion,
    /// Rails required for S3.
    pub pgood_s3: SignalMask,
    /// Rails required for S0, a superset of `pgood_s3`.
    pub pgood_s0: SignalMask,
    /// Lines debounced in S0 before giving up on them. `None` disables the
    /// debounce.
    pub ap_pgood_debounce: Option<SignalMask>,
    pub tables: SequenceTables,
}

impl SequencingConfig {
    pub const fn new(version: PowerSeqVersion) -> Self {
        match version {
            PowerSeqVersion::V0 | PowerSeqVersion::V1 => {
                let pgood_s3 = SignalMask::PP5000_PWR_GOOD;
                SequencingConfig {
                    version,
                    pgood_s3,
                    pgood_s0: pgood_s3
                        .union(SignalMask::AP_PWR_GOOD)
                        .union(SignalMask::SYS_PWR_GOOD),
                    ap_pgood_debounce: Some(
                        SignalMask::AP_PWR_GOOD.union(SignalMask::SYS_PWR_GOOD),
                    ),
                    tables: if matches!(version, PowerSeqVersion::V0) {
                        sequence::V0_TABLES
                    } else {
                        sequence::V1_TABLES
                    },
                }
            }
            PowerSeqVersion::V2 => {
                let pgood_s3 = SignalMask::PP1250_S3_PWR_GOOD;
                SequencingConfig {
                    version,
                    pgood_s3,
                    pgood_s0: pgood_s3
                        .union(SignalMask::PP900_S0_PWR_GOOD)
                        .union(SignalMask::AP_PWR_GOOD),
                    ap_pgood_debounce: None,
                    tables: sequence::V2_TABLES,
                }
            }
        }
    }

    /// Override the S0 debounce toggle.
    pub const fn with_ap_pgood_debounce(mut self, debounce: Option<SignalMask>) -> Self {
        self.ap_pgood_debounce = debounce;
        self
    }

    /// Every input in the right state for S0.
    pub const fn all_s0(&self) -> SignalMask {
        self.pgood_s0.union(SignalMask::SUSPEND_DEASSERTED)
    }
}
