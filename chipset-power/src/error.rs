use crate::signals::SignalMask;

/// Failures the power sequencer recovers from locally.
///
/// None of these is fatal: every one maps to a defined next state, and G3
/// is always reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// A required set of input lines did not appear within its bound.
    SignalTimeout {
        /// Lines that were still missing when the wait gave up.
        missing: SignalMask,
    },
    /// The charger kept power-on inhibited past the retry budget, or asked
    /// for shutdown outright.
    ChargerInhibited,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::SignalTimeout { missing } => {
                write!(f, "power signal timeout (missing {:#06x})", missing.bits())
            }
            Error::ChargerInhibited => f.write_str("power-up inhibited by charger"),
        }
    }
}
