mod common;

use chipset_power::{
    BootInfo, Chipset, HookEvent, Hooks, PowerControl, PowerSeqVersion, PowerState, Rail,
    SignalMask, StateClass,
};
use common::{Event, Log, Sim, drive, drive_to, hooks_fired, rail_writes, recorder};
use embassy_futures::block_on;
use embassy_futures::select::select;
use embassy_time::{Duration, Timer};
use embedded_hal::digital::PinState;

use PowerState::*;

const AUTO_POWER_ON: BootInfo = BootInfo {
    jumped_to_image: false,
    ap_off: false,
    auto_power_on: true,
};

const WARM_JUMP: BootInfo = BootInfo {
    jumped_to_image: true,
    ap_off: false,
    auto_power_on: false,
};

fn table_writes(table: &[chipset_power::SequenceOp]) -> Vec<(Rail, PinState)> {
    table.iter().map(|op| (op.rail, op.level)).collect()
}

#[test]
fn cold_boot_walks_up_to_s0() {
    let log = Log::default();
    let control = PowerControl::new();
    let hook = recorder(&log);
    let mut hooks = Hooks::new();
    hooks.register(&hook);
    let version = PowerSeqVersion::V1;
    let mut chipset = Chipset::new(
        Sim::new(version, log.clone()),
        version.config(),
        &control,
        hooks,
    );

    let state = chipset.init(AUTO_POWER_ON);
    assert_eq!(state, G3);

    let path = drive_to(&mut chipset, state, S0);
    assert_eq!(path, [G3, G3S5, S5, S5S3, S3, S3S0, S0]);

    let tables = version.config().tables;
    let mut expected = table_writes(tables.s5s3);
    expected.extend(table_writes(tables.s3s0));
    expected.push((Rail::SysRstL, PinState::High));
    assert_eq!(rail_writes(&log), expected);
    assert_eq!(hooks_fired(&log), [HookEvent::Startup, HookEvent::Resume]);
    assert_eq!(chipset.board().idle_allowed, Some(false));
    assert!(!chipset.sys_reset_asserted());
    assert!(!control.power_up_inhibited());
}

#[test]
fn suspend_notifies_before_touching_rails() {
    let log = Log::default();
    let control = PowerControl::new();
    let hook = recorder(&log);
    let mut hooks = Hooks::new();
    hooks.register(&hook);
    let version = PowerSeqVersion::V2;
    let mut chipset = Chipset::new(
        Sim::powered_on(version, log.clone()),
        version.config(),
        &control,
        hooks,
    );
    assert_eq!(chipset.init(WARM_JUMP), S0);
    log.borrow_mut().clear();

    let now = chipset.board().now_ms();
    chipset.board_mut().suspend_script.push((now, false));

    let path = drive_to(&mut chipset, S0, S3);
    assert_eq!(path, [S0, S0S3, S3]);

    let events = log.borrow().clone();
    assert_eq!(events[0], Event::Hook(HookEvent::Suspend));
    assert_eq!(
        rail_writes(&log),
        table_writes(version.config().tables.s0s3)
    );
    assert_eq!(chipset.board().idle_allowed, Some(true));

    // Nothing else wants S3 left.
    assert_eq!(block_on(chipset.step(S3)), S3);
}

#[test]
fn suspend_aborts_when_ap_resumes_mid_sequence() {
    let log = Log::default();
    let control = PowerControl::new();
    let hook = recorder(&log);
    let mut hooks = Hooks::new();
    hooks.register(&hook);
    let version = PowerSeqVersion::V2;
    let mut chipset = Chipset::new(
        Sim::powered_on(version, log.clone()),
        version.config(),
        &control,
        hooks,
    );
    assert_eq!(chipset.init(WARM_JUMP), S0);

    // Suspend for 25 ms: past the pre-delay and into the AP core ramp.
    let now = chipset.board().now_ms();
    chipset.board_mut().suspend_script.extend([(now, false), (now + 25, true)]);

    assert_eq!(block_on(chipset.step(S0)), S0S3);
    assert_eq!(block_on(chipset.step(S0S3)), S3S0);
    assert_eq!(
        rail_writes(&log),
        [
            (Rail::Pp1800S0En, PinState::Low),
            (Rail::ApCoreEn, PinState::Low),
        ]
    );
    // The abort is seen at the first slice boundary after the edge.
    assert_eq!(chipset.board().now_ms(), now + 26);
    assert_eq!(chipset.board().idle_allowed, Some(false));

    // Rerunning the whole power-up table over half-on rails is fine.
    log.borrow_mut().clear();
    assert_eq!(block_on(chipset.step(S3S0)), S0);
    assert_eq!(
        rail_writes(&log),
        table_writes(version.config().tables.s3s0)
    );
    assert_eq!(hooks_fired(&log), [HookEvent::Resume]);
}

#[test]
fn shutdown_requested_during_suspend_blocks_the_abort() {
    static CONTROL: PowerControl = PowerControl::new();

    let log = Log::default();
    let version = PowerSeqVersion::V2;
    let mut chipset = Chipset::new(
        Sim::powered_on(version, log.clone()),
        version.config(),
        &CONTROL,
        Hooks::new(),
    );
    assert_eq!(chipset.init(WARM_JUMP), S0);
    log.borrow_mut().clear();

    // The shutdown lands inside the pre-delay, the AP resumes after it.
    let now = chipset.board().now_ms();
    let sim = chipset.board_mut();
    sim.suspend_script.extend([(now, false), (now + 25, true)]);
    sim.timed.push((now + 10, Box::new(|| CONTROL.force_shutdown())));

    assert_eq!(block_on(chipset.step(S0)), S0S3);
    assert!(!chipset.forcing_shutdown());
    assert_eq!(block_on(chipset.step(S0S3)), S3);
    assert_eq!(
        rail_writes(&log),
        table_writes(version.config().tables.s0s3)
    );

    let path = drive_to(&mut chipset, S3, G3);
    assert_eq!(path, [S3, S3S5, S5, S5G3, G3]);
    assert!(chipset.forcing_shutdown());
}

#[test]
fn long_press_forces_shutdown_to_g3() {
    let log = Log::default();
    let control = PowerControl::new();
    let hook = recorder(&log);
    let mut hooks = Hooks::new();
    hooks.register(&hook);
    let version = PowerSeqVersion::V2;
    let mut chipset = Chipset::new(
        Sim::powered_on(version, log.clone()),
        version.config(),
        &control,
        hooks,
    );
    assert_eq!(chipset.init(WARM_JUMP), S0);

    control.set_long_press(Duration::from_millis(10));
    control.on_power_button(true);
    chipset.board_mut().button_pressed = true;
    block_on(select(control.run_shutdown_timer(), Timer::after_millis(100)));

    // The AP never asks to suspend; the forced shutdown wins anyway.
    let path = drive_to(&mut chipset, S0, G3);
    assert_eq!(path, [S0, S0S3, S3, S3S5, S5, S5G3, G3]);
    assert!(chipset.forcing_shutdown());
    assert!(chipset.board().suspend_deasserted);
    assert_eq!(
        hooks_fired(&log),
        [HookEvent::Suspend, HookEvent::Shutdown]
    );

    // And it stays off.
    assert_eq!(block_on(chipset.step(G3)), G3);
}

#[test]
fn charger_inhibit_keeps_ap_off() {
    let log = Log::default();
    let control = PowerControl::new();
    let version = PowerSeqVersion::V1;
    let mut sim = Sim::new(version, log.clone());
    sim.charger_busy_polls = u32::MAX;
    let mut chipset = Chipset::new(sim, version.config(), &control, Hooks::new());

    let state = chipset.init(AUTO_POWER_ON);
    let path = drive(&mut chipset, state, |_| false, 2);
    assert_eq!(path, [G3, G3S5, G3]);

    assert!(control.power_up_inhibited());
    assert!(chipset.forcing_shutdown());
    assert!(rail_writes(&log).is_empty());
    // One poll per try plus the one that ran out of budget.
    assert_eq!(chipset.board().charger_polls, 41);
    assert_eq!(chipset.board().now_ms(), 4000);

    assert_eq!(block_on(chipset.step(G3)), G3);
}

#[test]
fn charger_that_settles_lets_power_on_continue() {
    let log = Log::default();
    let control = PowerControl::new();
    let version = PowerSeqVersion::V1;
    let mut sim = Sim::new(version, log.clone());
    sim.charger_busy_polls = 3;
    let mut chipset = Chipset::new(sim, version.config(), &control, Hooks::new());

    let state = chipset.init(AUTO_POWER_ON);
    let path = drive(&mut chipset, state, |_| false, 2);
    assert_eq!(path, [G3, G3S5, S5]);
    assert!(!control.power_up_inhibited());
    assert_eq!(chipset.board().now_ms(), 300);
}

#[test]
fn charger_asking_for_shutdown_inhibits_at_once() {
    let log = Log::default();
    let control = PowerControl::new();
    let version = PowerSeqVersion::V2;
    let mut sim = Sim::new(version, log.clone());
    sim.charger_wants_shutdown = true;
    let mut chipset = Chipset::new(sim, version.config(), &control, Hooks::new());

    let state = chipset.init(AUTO_POWER_ON);
    assert_eq!(drive(&mut chipset, state, |_| false, 2), [G3, G3S5, G3]);
    assert!(control.power_up_inhibited());
}

#[test]
fn s3_rail_failure_backs_out_to_g3() {
    let log = Log::default();
    let control = PowerControl::new();
    let hook = recorder(&log);
    let mut hooks = Hooks::new();
    hooks.register(&hook);
    let version = PowerSeqVersion::V2;
    let mut sim = Sim::new(version, log.clone());
    sim.stuck_low = SignalMask::PP1250_S3_PWR_GOOD;
    let mut chipset = Chipset::new(sim, version.config(), &control, hooks);

    let state = chipset.init(AUTO_POWER_ON);
    let path = drive(&mut chipset, state, |_| false, 7);
    assert_eq!(path, [G3, G3S5, S5, S5S3, S3S5, S5, S5G3, G3]);
    assert!(chipset.forcing_shutdown());
    // Startup never fires for rails that did not come up.
    assert_eq!(hooks_fired(&log), [HookEvent::Shutdown]);

    let tables = version.config().tables;
    let mut expected = table_writes(tables.s5s3);
    expected.extend(table_writes(tables.s3s5));
    assert_eq!(rail_writes(&log), expected);
}

#[test]
fn s0_rail_failure_retries_then_shuts_down() {
    let log = Log::default();
    let control = PowerControl::new();
    let version = PowerSeqVersion::V2;
    let mut sim = Sim::new(version, log.clone());
    sim.stuck_low = SignalMask::AP_PWR_GOOD;
    let mut chipset = Chipset::new(sim, version.config(), &control, Hooks::new());

    let state = chipset.init(AUTO_POWER_ON);
    let path = drive_to(&mut chipset, state, S3S0);
    assert_eq!(path, [G3, G3S5, S5, S5S3, S3, S3S0]);

    assert_eq!(block_on(chipset.step(S3S0)), S3S0);
    assert!(chipset.forcing_shutdown());
    assert_eq!(block_on(chipset.step(S3S0)), S3S0);

    // Once the rail recovers the pending shutdown takes the AP down.
    chipset.board_mut().stuck_low = SignalMask::empty();
    let path = drive_to(&mut chipset, S3S0, G3);
    assert_eq!(path, [S3S0, S0, S0S3, S3, S3S5, S5, S5G3, G3]);
}

#[test]
fn pgood_glitch_inside_debounce_window_keeps_s0() {
    let log = Log::default();
    let control = PowerControl::new();
    let version = PowerSeqVersion::V1;
    let mut chipset = Chipset::new(
        Sim::powered_on(version, log.clone()),
        version.config(),
        &control,
        Hooks::new(),
    );
    assert_eq!(chipset.init(WARM_JUMP), S0);

    let now = chipset.board().now_ms();
    chipset.board_mut().glitch = Some((now, now + 50, SignalMask::SYS_PWR_GOOD));
    assert_eq!(block_on(chipset.step(S0)), S0);
    assert_eq!(chipset.board().now_ms(), now + 50);

    let now = chipset.board().now_ms();
    chipset.board_mut().glitch = Some((now, now + 500, SignalMask::SYS_PWR_GOOD));
    assert_eq!(block_on(chipset.step(S0)), S0S3);
    assert_eq!(chipset.board().now_ms(), now + 100);
}

#[test]
fn without_debounce_s0_ignores_ap_pgood() {
    let log = Log::default();
    let control = PowerControl::new();
    let version = PowerSeqVersion::V1;
    let config = version.config().with_ap_pgood_debounce(None);
    let mut chipset = Chipset::new(
        Sim::powered_on(version, log.clone()),
        config,
        &control,
        Hooks::new(),
    );
    assert_eq!(chipset.init(WARM_JUMP), S0);

    let now = chipset.board().now_ms();
    chipset.board_mut().glitch = Some((now, now + 500, SignalMask::SYS_PWR_GOOD));
    assert_eq!(block_on(chipset.step(S0)), S0);
    assert_eq!(chipset.board().now_ms(), now);
}

#[test]
fn warm_jump_with_ap_down_waits_in_g3() {
    let log = Log::default();
    let control = PowerControl::new();
    let version = PowerSeqVersion::V2;
    let mut chipset = Chipset::new(
        Sim::new(version, log.clone()),
        version.config(),
        &control,
        Hooks::new(),
    );

    let boot = BootInfo {
        auto_power_on: true,
        ..WARM_JUMP
    };
    assert_eq!(chipset.init(boot), G3);
    assert_eq!(block_on(chipset.step(G3)), G3);
    assert_eq!(chipset.board().idle_allowed, None);
}

#[test]
fn warm_jump_into_running_ap_touches_nothing() {
    let log = Log::default();
    let control = PowerControl::new();
    let version = PowerSeqVersion::V0;
    let mut chipset = Chipset::new(
        Sim::powered_on(version, log.clone()),
        version.config(),
        &control,
        Hooks::new(),
    );

    assert_eq!(chipset.init(WARM_JUMP), S0);
    assert_eq!(control.state(), S0);
    assert_eq!(control.state_class(), StateClass::On);
    assert_eq!(log.borrow().as_slice(), [Event::Idle(false)]);
}

#[test]
fn ap_off_flag_suppresses_auto_power_on() {
    let log = Log::default();
    let control = PowerControl::new();
    let version = PowerSeqVersion::V2;
    let mut chipset = Chipset::new(
        Sim::new(version, log.clone()),
        version.config(),
        &control,
        Hooks::new(),
    );

    let boot = BootInfo {
        ap_off: true,
        ..AUTO_POWER_ON
    };
    assert_eq!(chipset.init(boot), G3);
    assert_eq!(block_on(chipset.step(G3)), G3);

    // A later request still powers up.
    control.exit_hard_off();
    assert_eq!(block_on(chipset.step(G3)), G3S5);
}

#[test]
fn button_held_through_suspend_powers_off() {
    let log = Log::default();
    let control = PowerControl::new();
    let version = PowerSeqVersion::V2;
    let mut chipset = Chipset::new(
        Sim::powered_on(version, log.clone()),
        version.config(),
        &control,
        Hooks::new(),
    );
    assert_eq!(chipset.init(WARM_JUMP), S0);

    let now = chipset.board().now_ms();
    chipset.board_mut().suspend_script.push((now, false));
    chipset.board_mut().button_pressed = true;

    assert_eq!(drive_to(&mut chipset, S0, S3), [S0, S0S3, S3]);
    assert!(chipset.forcing_shutdown());
    assert_eq!(block_on(chipset.step(S3)), S3S5);
}

#[test]
fn every_step_lands_in_a_successor() {
    for version in [PowerSeqVersion::V0, PowerSeqVersion::V1, PowerSeqVersion::V2] {
        for powered in [false, true] {
            for suspend_deasserted in [false, true] {
                for forced in [false, true] {
                    for state in PowerState::ALL {
                        let log = Log::default();
                        let control = PowerControl::new();
                        let mut sim = if powered {
                            Sim::powered_on(version, log.clone())
                        } else {
                            Sim::new(version, log.clone())
                        };
                        sim.suspend_deasserted = suspend_deasserted;
                        let mut chipset =
                            Chipset::new(sim, version.config(), &control, Hooks::new());
                        control.exit_hard_off();
                        if forced {
                            control.force_shutdown();
                        }

                        let next = block_on(chipset.step(state));
                        assert!(
                            state.successors().contains(&next),
                            "{state:?} -> {next:?} ({version:?}, powered {powered}, \
                             suspend deasserted {suspend_deasserted}, forced {forced})"
                        );
                    }
                }
            }
        }
    }
}

#[test]
fn forced_shutdown_reaches_g3_from_anywhere() {
    // G3S5 starts a fresh power-up and clears any earlier request.
    for state in PowerState::ALL.into_iter().filter(|s| *s != G3S5) {
        let log = Log::default();
        let control = PowerControl::new();
        let version = PowerSeqVersion::V1;
        let mut chipset = Chipset::new(
            Sim::powered_on(version, log.clone()),
            version.config(),
            &control,
            Hooks::new(),
        );
        control.force_shutdown();

        let path = drive_to(&mut chipset, state, G3);
        assert_eq!(path.last(), Some(&G3), "stuck from {state:?}: {path:?}");
        assert!(path.len() <= 8, "{path:?}");
    }
}

#[test]
fn reset_pulses_sys_rst() {
    let log = Log::default();
    let control = PowerControl::new();
    let version = PowerSeqVersion::V2;
    let mut chipset = Chipset::new(
        Sim::powered_on(version, log.clone()),
        version.config(),
        &control,
        Hooks::new(),
    );

    block_on(chipset.reset(true));
    assert_eq!(
        rail_writes(&log),
        [
            (Rail::SysRstL, PinState::Low),
            (Rail::SysRstL, PinState::High),
        ]
    );
    assert!(chipset.board().now_us >= 1000);
}

#[test]
fn blocking_reset_uses_the_given_delay() {
    struct Spin(u32);

    impl embedded_hal::delay::DelayNs for Spin {
        fn delay_ns(&mut self, ns: u32) {
            self.0 += ns;
        }
    }

    let log = Log::default();
    let control = PowerControl::new();
    let version = PowerSeqVersion::V1;
    let mut chipset = Chipset::new(
        Sim::powered_on(version, log.clone()),
        version.config(),
        &control,
        Hooks::new(),
    );

    let mut spin = Spin(0);
    chipset.reset_blocking(&mut spin);
    assert_eq!(rail_writes(&log).len(), 2);
    assert!(spin.0 >= 1_000_000);
    assert_eq!(chipset.board().now_us, 0);
}

#[test]
fn run_loop_publishes_and_parks_in_stable_state() {
    let log = Log::default();
    let control = PowerControl::new();
    let version = PowerSeqVersion::V2;
    let mut chipset = Chipset::new(
        Sim::new(version, log.clone()),
        version.config(),
        &control,
        Hooks::new(),
    );
    let state = chipset.init(AUTO_POWER_ON);
    control.request_reset(false);

    // `run` never returns; it yields only once parked waiting for a wake.
    block_on(select(chipset.run(state), core::future::ready(())));

    assert_eq!(control.state(), S0);
    assert_eq!(
        rail_writes(&log)[..2],
        [
            (Rail::SysRstL, PinState::Low),
            (Rail::SysRstL, PinState::High),
        ]
    );
}
