//! Chipset transition notifications.

use alloc::vec::Vec;

/// Lifecycle edges other subsystems subscribe to.
///
/// `Startup` and `Resume` fire after the rails are confirmed up; `Suspend`
/// and `Shutdown` fire before any rail is touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HookEvent {
    Startup,
    Resume,
    Suspend,
    Shutdown,
}

/// A chipset hook subscriber.
///
/// Called synchronously from the power task; a slow handler delays the
/// whole transition, so hand real work off to another task.
pub trait HookHandler {
    fn on_chipset_event(&self, event: HookEvent);
}

impl<F: Fn(HookEvent)> HookHandler for F {
    fn on_chipset_event(&self, event: HookEvent) {
        self(event)
    }
}

/// Subscribers, notified in registration order.
#[derive(Default)]
pub struct Hooks<'a> {
    handlers: Vec<&'a dyn HookHandler>,
}

impl<'a> Hooks<'a> {
    pub const fn new() -> Self {
        Hooks {
            handlers: Vec::new(),
        }
    }

    pub fn register(&mut self, handler: &'a dyn HookHandler) {
        self.handlers.push(handler);
    }

    pub fn notify(&self, event: HookEvent) {
        debug!("hook {}", event);
        for handler in &self.handlers {
            handler.on_chipset_event(event);
        }
    }
}
