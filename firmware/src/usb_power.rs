use core::cell::RefCell;

use chipset_power::{HookEvent, HookHandler};
use defmt::info;
use embassy_rp::gpio::{Level, Output};

use crate::config_resources::UsbPowerResources;

/// USB port power switches, on while the AP is up.
pub struct UsbPower {
    ports: RefCell<[Output<'static>; 4]>,
}

impl UsbPower {
    pub fn new(resources: UsbPowerResources, enabled: bool) -> Self {
        let level = Level::from(enabled);
        UsbPower {
            ports: RefCell::new([
                Output::new(resources.usb_en0, level),
                Output::new(resources.usb_en1, level),
                Output::new(resources.usb_en2, level),
                Output::new(resources.usb_en3, level),
            ]),
        }
    }

    fn set_enabled(&self, enabled: bool) {
        info!("USB port power {}", if enabled { "on" } else { "off" });
        for port in self.ports.borrow_mut().iter_mut() {
            port.set_level(Level::from(enabled));
        }
    }
}

impl HookHandler for UsbPower {
    fn on_chipset_event(&self, event: HookEvent) {
        match event {
            HookEvent::Startup => self.set_enabled(true),
            HookEvent::Shutdown => self.set_enabled(false),
            HookEvent::Resume | HookEvent::Suspend => {}
        }
    }
}
