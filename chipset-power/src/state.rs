//! Power states and the classes other subsystems branch on.

use bitflags::bitflags;

/// AP power state.
///
/// `G3`, `S5`, `S3` and `S0` are stable: they are polled repeatedly and may
/// stay put indefinitely. The others are transitions that do their work
/// once and always advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum PowerState {
    /// Hard off.
    G3 = 0,
    /// Soft off.
    S5,
    /// Suspend to RAM.
    S3,
    /// Fully on.
    S0,
    G3S5,
    S5S3,
    S3S0,
    S0S3,
    S3S5,
    S5G3,
}

impl PowerState {
    pub const ALL: [PowerState; 10] = [
        PowerState::G3,
        PowerState::S5,
        PowerState::S3,
        PowerState::S0,
        PowerState::G3S5,
        PowerState::S5S3,
        PowerState::S3S0,
        PowerState::S0S3,
        PowerState::S3S5,
        PowerState::S5G3,
    ];

    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(PowerState::G3),
            1 => Some(PowerState::S5),
            2 => Some(PowerState::S3),
            3 => Some(PowerState::S0),
            4 => Some(PowerState::G3S5),
            5 => Some(PowerState::S5S3),
            6 => Some(PowerState::S3S0),
            7 => Some(PowerState::S0S3),
            8 => Some(PowerState::S3S5),
            9 => Some(PowerState::S5G3),
            _ => None,
        }
    }

    pub const fn is_stable(self) -> bool {
        matches!(
            self,
            PowerState::G3 | PowerState::S5 | PowerState::S3 | PowerState::S0
        )
    }

    /// Every state a single step may return from `self`.
    pub const fn successors(self) -> &'static [PowerState] {
        match self {
            PowerState::G3 => &[PowerState::G3, PowerState::G3S5],
            PowerState::S5 => &[PowerState::S5G3, PowerState::S5S3],
            PowerState::S3 => &[PowerState::S3, PowerState::S3S5, PowerState::S3S0],
            PowerState::S0 => &[PowerState::S0, PowerState::S0S3],
            PowerState::G3S5 => &[PowerState::G3, PowerState::S5],
            PowerState::S5S3 => &[PowerState::S3, PowerState::S3S5],
            PowerState::S3S0 => &[PowerState::S0, PowerState::S3S0],
            PowerState::S0S3 => &[PowerState::S3, PowerState::S3S0],
            PowerState::S3S5 => &[PowerState::S5],
            PowerState::S5G3 => &[PowerState::G3],
        }
    }

    /// Class bits a caller's mask must cover for this state to match.
    ///
    /// Transition states sit between two classes and need both.
    pub const fn required_mask(self) -> ChipsetStateMask {
        match self {
            PowerState::G3 => ChipsetStateMask::HARD_OFF,
            PowerState::G3S5 | PowerState::S5G3 => {
                ChipsetStateMask::HARD_OFF.union(ChipsetStateMask::SOFT_OFF)
            }
            PowerState::S5 => ChipsetStateMask::SOFT_OFF,
            PowerState::S5S3 | PowerState::S3S5 => {
                ChipsetStateMask::SOFT_OFF.union(ChipsetStateMask::SUSPEND)
            }
            PowerState::S3 => ChipsetStateMask::SUSPEND,
            PowerState::S3S0 | PowerState::S0S3 => {
                ChipsetStateMask::SUSPEND.union(ChipsetStateMask::ON)
            }
            PowerState::S0 => ChipsetStateMask::ON,
        }
    }

    /// True when `mask` covers every class this state belongs to.
    pub const fn in_state(self, mask: ChipsetStateMask) -> bool {
        mask.contains(self.required_mask())
    }

    pub const fn class(self) -> StateClass {
        match self {
            PowerState::G3 | PowerState::G3S5 | PowerState::S5 | PowerState::S5G3 => {
                StateClass::AnyOff
            }
            PowerState::S0 => StateClass::On,
            _ => StateClass::AnySuspend,
        }
    }
}

bitflags! {
    /// Coarse chipset state classes, combinable into query masks.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ChipsetStateMask: u8 {
        const HARD_OFF = 1 << 0;
        const SOFT_OFF = 1 << 1;
        const SUSPEND = 1 << 2;
        const ON = 1 << 3;
        const ANY_OFF = Self::HARD_OFF.bits() | Self::SOFT_OFF.bits();
        const ANY_SUSPEND = Self::SUSPEND.bits();
    }
}

/// Single-valued view of the power state for subsystems that only care
/// whether the AP is off, suspended or running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum StateClass {
    AnyOff = 0,
    AnySuspend = 1,
    On = 2,
}
