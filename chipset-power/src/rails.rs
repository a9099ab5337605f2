//! Rail enable outputs.

use embedded_hal::digital::PinState;

use crate::config::SYS_RST_HOLD;

/// Every output line a sequencing table can drive.
///
/// Names ending in `L` are active low. Which lines a board actually wires
/// up depends on its [`PowerSeqVersion`](crate::PowerSeqVersion).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Rail {
    SysRstL,
    ApCoreEn,
    // V0 and V1 topology
    PpvarLogicEn,
    Pp900ApEn,
    Pp900PcieEn,
    Pp900PmuEn,
    Pp900PllEn,
    Pp900UsbEn,
    Pp1800PmuEnL,
    LpddrPwrEn,
    Pp1800UsbEnL,
    Pp3300UsbEnL,
    Pp5000En,
    Pp3300TrackpadEnL,
    Pp1800LidEnL,
    Pp1800SixaxisEnL,
    Pp1800SensorEnL,
    PpvarClogicEn,
    Pp900DdrpllEn,
    Pp1800ApAvddEnL,
    Pp1800S0EnL,
    Pp3300S0EnL,
    // V2 topology
    Pp900S3En,
    Pp3300S3En,
    Pp1800S3En,
    Pp1250S3En,
    Pp900S0En,
    Pp1800UsbEn,
    Pp3300S0En,
    Pp1800S0En,
}

impl Rail {
    /// Number of distinct rails.
    pub const COUNT: usize = Rail::Pp1800S0En as usize + 1;

    pub const fn index(self) -> usize {
        self as usize
    }

    /// Schematic net name, for logs and host queries.
    pub const fn name(self) -> &'static str {
        match self {
            Rail::SysRstL => "SYS_RST_L",
            Rail::ApCoreEn => "AP_CORE_EN",
            Rail::PpvarLogicEn => "PPVAR_LOGIC_EN",
            Rail::Pp900ApEn => "PP900_AP_EN",
            Rail::Pp900PcieEn => "PP900_PCIE_EN",
            Rail::Pp900PmuEn => "PP900_PMU_EN",
            Rail::Pp900PllEn => "PP900_PLL_EN",
            Rail::Pp900UsbEn => "PP900_USB_EN",
            Rail::Pp1800PmuEnL => "PP1800_PMU_EN_L",
            Rail::LpddrPwrEn => "LPDDR_PWR_EN",
            Rail::Pp1800UsbEnL => "PP1800_USB_EN_L",
            Rail::Pp3300UsbEnL => "PP3300_USB_EN_L",
            Rail::Pp5000En => "PP5000_EN",
            Rail::Pp3300TrackpadEnL => "PP3300_TRACKPAD_EN_L",
            Rail::Pp1800LidEnL => "PP1800_LID_EN_L",
            Rail::Pp1800SixaxisEnL => "PP1800_SIXAXIS_EN_L",
            Rail::Pp1800SensorEnL => "PP1800_SENSOR_EN_L",
            Rail::PpvarClogicEn => "PPVAR_CLOGIC_EN",
            Rail::Pp900DdrpllEn => "PP900_DDRPLL_EN",
            Rail::Pp1800ApAvddEnL => "PP1800_AP_AVDD_EN_L",
            Rail::Pp1800S0EnL => "PP1800_S0_EN_L",
            Rail::Pp3300S0EnL => "PP3300_S0_EN_L",
            Rail::Pp900S3En => "PP900_S3_EN",
            Rail::Pp3300S3En => "PP3300_S3_EN",
            Rail::Pp1800S3En => "PP1800_S3_EN",
            Rail::Pp1250S3En => "PP1250_S3_EN",
            Rail::Pp900S0En => "PP900_S0_EN",
            Rail::Pp1800UsbEn => "PP1800_USB_EN",
            Rail::Pp3300S0En => "PP3300_S0_EN",
            Rail::Pp1800S0En => "PP1800_S0_EN",
        }
    }
}

/// Drives a single output line.
///
/// The write is assumed to succeed. It says nothing about whether the
/// physical rail responded; that is what the power-good inputs are for.
pub trait RailDriver {
    fn set(&mut self, rail: Rail, level: PinState);
}

/// Pulse `SYS_RST_L` low for [`SYS_RST_HOLD`] from task context.
pub async fn pulse_reset<B>(board: &mut B)
where
    B: RailDriver + embedded_hal_async::delay::DelayNs,
{
    board.set(Rail::SysRstL, PinState::Low);
    board.delay_us(SYS_RST_HOLD.as_micros() as u32).await;
    board.set(Rail::SysRstL, PinState::High);
}

/// Pulse `SYS_RST_L` low with a busy-wait, for interrupt context.
pub fn pulse_reset_blocking<R, D>(rails: &mut R, delay: &mut D)
where
    R: RailDriver,
    D: embedded_hal::delay::DelayNs,
{
    rails.set(Rail::SysRstL, PinState::Low);
    delay.delay_us(SYS_RST_HOLD.as_micros() as u32);
    rails.set(Rail::SysRstL, PinState::High);
}
