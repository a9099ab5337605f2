use core::ops::Range;

use crate::config::{CONFIG_FLASH_SIZE, FLASH_SIZE};

/// The size of a page in bytes
pub const PAGE_SIZE: u32 = 0x0000_1000;

/// Flash range holding the runtime configuration map, at the very end of
/// flash and well clear of the image.
pub const fn get_config_range() -> Range<u32> {
    let end = FLASH_SIZE as u32;
    (end - CONFIG_FLASH_SIZE)..end
}

const _: () = assert!(CONFIG_FLASH_SIZE % PAGE_SIZE == 0);
