//! Power-good and suspend input lines.

use bitflags::bitflags;
use embassy_time::Duration;

use crate::config::DEFAULT_SIGNAL_TIMEOUT;
use crate::error::Error;

bitflags! {
    /// Snapshot of the monitored hardware input lines, one bit per line.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SignalMask: u32 {
        /// 5 V rail power good (V0/V1 S3 rail).
        const PP5000_PWR_GOOD = 1 << 0;
        /// System power good (V0/V1).
        const SYS_PWR_GOOD = 1 << 1;
        /// 1.25 V S3 rail power good (V2).
        const PP1250_S3_PWR_GOOD = 1 << 2;
        /// 0.9 V S0 rail power good (V2).
        const PP900_S0_PWR_GOOD = 1 << 3;
        /// AP core power good.
        const AP_PWR_GOOD = 1 << 4;
        /// The AP is not requesting suspend.
        const SUSPEND_DEASSERTED = 1 << 5;
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for SignalMask {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{=u32:#06x}", self.bits())
    }
}

/// Read access to the power input lines.
///
/// Implementations must never panic on a timeout: a rail that does not come
/// up is an expected outcome, reported as [`Error::SignalTimeout`].
#[allow(async_fn_in_trait)]
pub trait PowerSignals {
    /// Non-blocking snapshot of every monitored line.
    fn current(&self) -> SignalMask;

    /// True when every line in `mask` is currently asserted.
    fn has_all(&self, mask: SignalMask) -> bool {
        self.current().contains(mask)
    }

    /// Wait until every line in `mask` is asserted, or `timeout` elapses.
    async fn wait_all_timeout(&mut self, mask: SignalMask, timeout: Duration) -> Result<(), Error>;

    /// [`PowerSignals::wait_all_timeout`] with the default bound.
    async fn wait_all(&mut self, mask: SignalMask) -> Result<(), Error> {
        self.wait_all_timeout(mask, DEFAULT_SIGNAL_TIMEOUT).await
    }
}

/// Lines of `want` that are not asserted in `have`.
pub fn missing(want: SignalMask, have: SignalMask) -> SignalMask {
    want.difference(have)
}
