//! Rail sequencing tables and the runner that replays them.
//!
//! Each table is handled strictly top to bottom. Later rails may depend
//! electrically on earlier ones having settled, so entries are never
//! reordered, skipped or run concurrently.

use embedded_hal::digital::PinState;
use embedded_hal_async::delay::DelayNs;

use crate::config::SLEEP_INTERVAL_MS;
use crate::rails::{Rail, RailDriver};
use crate::signals::{PowerSignals, SignalMask};

/// One GPIO operation of a power sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SequenceOp {
    pub rail: Rail,
    pub level: PinState,
    /// Milliseconds to wait after setting `rail` to `level`.
    pub delay_ms: u8,
}

const fn op(rail: Rail, level: u8, delay_ms: u8) -> SequenceOp {
    SequenceOp {
        rail,
        level: if level == 0 { PinState::Low } else { PinState::High },
        delay_ms,
    }
}

/// The four table-driven transition edges.
#[derive(Debug, Clone, Copy)]
pub struct SequenceTables {
    pub s5s3: &'static [SequenceOp],
    pub s3s0: &'static [SequenceOp],
    pub s0s3: &'static [SequenceOp],
    pub s3s5: &'static [SequenceOp],
}

impl SequenceTables {
    /// Level every rail settles at once the tables have run: the AP in S0
    /// when `powered`, in G3 otherwise.
    ///
    /// Rails no table touches rest low. `SYS_RST_L` is released when
    /// powered and asserted otherwise.
    pub fn resting_levels(&self, powered: bool) -> [PinState; Rail::COUNT] {
        let edges: [&[SequenceOp]; 2] = if powered {
            [self.s5s3, self.s3s0]
        } else {
            [self.s0s3, self.s3s5]
        };

        let mut levels = [PinState::Low; Rail::COUNT];
        for step in edges.into_iter().flatten() {
            levels[step.rail.index()] = step.level;
        }
        levels[Rail::SysRstL.index()] = PinState::from(powered);
        levels
    }

    /// Whether every rail the tables write is in `wired`. `SYS_RST_L` is
    /// always driven, so it must be wired too.
    pub fn drives_only(&self, wired: &[Rail]) -> bool {
        wired.contains(&Rail::SysRstL)
            && [self.s5s3, self.s3s0, self.s0s3, self.s3s5]
                .into_iter()
                .flatten()
                .all(|step| wired.contains(&step.rail))
    }
}

/// Result of replaying a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RunOutcome {
    Completed,
    /// The AP deasserted suspend mid-sequence.
    Aborted,
}

static V0_S5S3: [SequenceOp; 16] = [
    op(Rail::PpvarLogicEn, 1, 0),
    op(Rail::Pp900ApEn, 1, 0),
    op(Rail::Pp900PcieEn, 1, 2),
    op(Rail::Pp900PmuEn, 1, 0),
    op(Rail::Pp900PllEn, 1, 0),
    op(Rail::Pp900UsbEn, 1, 2),
    op(Rail::SysRstL, 0, 0),
    op(Rail::Pp1800PmuEnL, 0, 2),
    op(Rail::LpddrPwrEn, 1, 2),
    op(Rail::Pp1800UsbEnL, 0, 2),
    op(Rail::Pp3300UsbEnL, 0, 0),
    op(Rail::Pp5000En, 1, 0),
    op(Rail::Pp3300TrackpadEnL, 0, 1),
    op(Rail::Pp1800LidEnL, 0, 0),
    op(Rail::Pp1800SixaxisEnL, 0, 2),
    op(Rail::Pp1800SensorEnL, 0, 0),
];

static V1_S5S3: [SequenceOp; 14] = [
    op(Rail::PpvarLogicEn, 1, 0),
    op(Rail::Pp900ApEn, 1, 0),
    op(Rail::Pp900PcieEn, 1, 2),
    op(Rail::Pp900UsbEn, 1, 2),
    op(Rail::SysRstL, 0, 0),
    op(Rail::Pp1800PmuEnL, 0, 2),
    op(Rail::LpddrPwrEn, 1, 2),
    op(Rail::Pp1800UsbEnL, 0, 2),
    op(Rail::Pp3300UsbEnL, 0, 0),
    op(Rail::Pp5000En, 1, 0),
    op(Rail::Pp3300TrackpadEnL, 0, 1),
    op(Rail::Pp1800LidEnL, 0, 0),
    op(Rail::Pp1800SixaxisEnL, 0, 2),
    op(Rail::Pp1800SensorEnL, 0, 0),
];

static V01_S3S0: [SequenceOp; 6] = [
    op(Rail::PpvarClogicEn, 1, 2),
    op(Rail::Pp900DdrpllEn, 1, 2),
    op(Rail::Pp1800ApAvddEnL, 0, 2),
    op(Rail::ApCoreEn, 1, 2),
    op(Rail::Pp1800S0EnL, 0, 2),
    op(Rail::Pp3300S0EnL, 0, 0),
];

static V01_S0S3: [SequenceOp; 6] = [
    op(Rail::Pp3300S0EnL, 1, 20),
    op(Rail::Pp1800S0EnL, 1, 1),
    op(Rail::ApCoreEn, 0, 20),
    op(Rail::Pp1800ApAvddEnL, 1, 1),
    op(Rail::Pp900DdrpllEn, 0, 1),
    op(Rail::PpvarClogicEn, 0, 0),
];

static V0_S3S5: [SequenceOp; 15] = [
    op(Rail::Pp1800SensorEnL, 1, 0),
    op(Rail::Pp1800SixaxisEnL, 1, 0),
    op(Rail::Pp1800LidEnL, 1, 0),
    op(Rail::Pp3300TrackpadEnL, 1, 0),
    op(Rail::Pp5000En, 0, 0),
    op(Rail::Pp3300UsbEnL, 1, 20),
    op(Rail::Pp1800UsbEnL, 1, 10),
    op(Rail::LpddrPwrEn, 0, 20),
    op(Rail::Pp1800PmuEnL, 1, 2),
    op(Rail::Pp900PllEn, 0, 0),
    op(Rail::Pp900PmuEn, 0, 0),
    op(Rail::Pp900UsbEn, 0, 6),
    op(Rail::Pp900PcieEn, 0, 0),
    op(Rail::Pp900ApEn, 0, 0),
    op(Rail::PpvarLogicEn, 0, 0),
];

static V1_S3S5: [SequenceOp; 13] = [
    op(Rail::Pp1800SensorEnL, 1, 0),
    op(Rail::Pp1800SixaxisEnL, 1, 0),
    op(Rail::Pp1800LidEnL, 1, 0),
    op(Rail::Pp3300TrackpadEnL, 1, 0),
    op(Rail::Pp5000En, 0, 0),
    op(Rail::Pp3300UsbEnL, 1, 20),
    op(Rail::Pp1800UsbEnL, 1, 10),
    op(Rail::LpddrPwrEn, 0, 20),
    op(Rail::Pp1800PmuEnL, 1, 2),
    op(Rail::Pp900UsbEn, 0, 6),
    op(Rail::Pp900PcieEn, 0, 0),
    op(Rail::Pp900ApEn, 0, 0),
    op(Rail::PpvarLogicEn, 0, 0),
];

static V2_S5S3: [SequenceOp; 5] = [
    op(Rail::Pp900S3En, 1, 2),
    op(Rail::SysRstL, 1, 0),
    op(Rail::Pp3300S3En, 1, 2),
    op(Rail::Pp1800S3En, 1, 2),
    op(Rail::Pp1250S3En, 1, 2),
];

static V2_S3S0: [SequenceOp; 5] = [
    op(Rail::Pp900S0En, 1, 2),
    op(Rail::Pp1800UsbEn, 1, 2),
    op(Rail::Pp3300S0En, 1, 2),
    op(Rail::ApCoreEn, 1, 2),
    op(Rail::Pp1800S0En, 1, 0),
];

static V2_S0S3: [SequenceOp; 5] = [
    op(Rail::Pp1800S0En, 0, 1),
    op(Rail::ApCoreEn, 0, 20),
    op(Rail::Pp3300S0En, 0, 20),
    op(Rail::Pp1800UsbEn, 0, 1),
    op(Rail::Pp900S0En, 0, 1),
];

static V2_S3S5: [SequenceOp; 4] = [
    op(Rail::Pp1250S3En, 0, 2),
    op(Rail::Pp1800S3En, 0, 2),
    op(Rail::Pp3300S3En, 0, 2),
    op(Rail::Pp900S3En, 0, 0),
];

pub const V0_TABLES: SequenceTables = SequenceTables {
    s5s3: &V0_S5S3,
    s3s0: &V01_S3S0,
    s0s3: &V01_S0S3,
    s3s5: &V0_S3S5,
};

pub const V1_TABLES: SequenceTables = SequenceTables {
    s5s3: &V1_S5S3,
    s3s0: &V01_S3S0,
    s0s3: &V01_S0S3,
    s3s5: &V1_S3S5,
};

pub const V2_TABLES: SequenceTables = SequenceTables {
    s5s3: &V2_S5S3,
    s3s0: &V2_S3S0,
    s0s3: &V2_S0S3,
    s3s5: &V2_S3S5,
};

/// Sleep `ms`, checking `abort` against the inputs every
/// [`SLEEP_INTERVAL_MS`].
///
/// This is a cooperative check-and-sleep loop: the abort condition is only
/// noticed at slice boundaries, never mid-slice.
pub async fn sleep_abortable<B, F>(board: &mut B, ms: u32, abort: &F) -> RunOutcome
where
    B: PowerSignals + DelayNs,
    F: Fn(SignalMask) -> bool,
{
    let mut remaining = ms;
    loop {
        board.delay_ms(remaining.min(SLEEP_INTERVAL_MS)).await;
        remaining = remaining.saturating_sub(SLEEP_INTERVAL_MS);
        if abort(board.current()) {
            info!("suspend aborted");
            return RunOutcome::Aborted;
        }
        if remaining == 0 {
            return RunOutcome::Completed;
        }
    }
}

/// Replay `table` in order.
///
/// With `abort` set, every post-delay becomes a [`sleep_abortable`] and the
/// run stops as soon as the condition holds. Without it, delays always run
/// to completion.
pub async fn run<B, F>(board: &mut B, table: &[SequenceOp], abort: Option<&F>) -> RunOutcome
where
    B: RailDriver + PowerSignals + DelayNs,
    F: Fn(SignalMask) -> bool,
{
    for step in table {
        trace!("seq {} -> {}", step.rail.name(), step.level == PinState::High);
        board.set(step.rail, step.level);
        if step.delay_ms == 0 {
            continue;
        }
        match abort {
            Some(abort) => {
                if sleep_abortable(board, step.delay_ms as u32, abort).await == RunOutcome::Aborted {
                    return RunOutcome::Aborted;
                }
            }
            None => board.delay_ms(step.delay_ms as u32).await,
        }
    }
    RunOutcome::Completed
}
