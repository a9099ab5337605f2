//! Hardware and subsystem collaborators of the state machine.

use embedded_hal_async::delay::DelayNs;

use crate::rails::RailDriver;
use crate::signals::PowerSignals;

/// Charger decisions that gate power-on.
pub trait Charger {
    /// Power-on must wait, e.g. the charger is still initialising with no
    /// battery attached.
    fn prevent_power_on(&mut self) -> bool;

    /// Battery or input is too low to run the AP at all.
    fn wants_shutdown(&mut self) -> bool;
}

/// Odds and ends of the surrounding firmware.
pub trait Platform {
    fn power_button_pressed(&self) -> bool;

    /// Allow or forbid the low-power idle mode. Forbidden while the AP is
    /// in S0.
    fn set_low_power_idle(&mut self, allowed: bool);
}

/// Everything the state machine drives, behind one handle.
pub trait Board: RailDriver + PowerSignals + DelayNs + Charger + Platform {}

impl<T> Board for T where T: RailDriver + PowerSignals + DelayNs + Charger + Platform {}
