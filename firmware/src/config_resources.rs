// Provide a mapping for the controller GPIO pins

//
//| GPIO # | Name           | Description                                              |
//| ------ | -------------- | -------------------------------------------------------- |
//| 0      | SYS_RST_L      | AP system reset. Active low.                             |
//| 1      | AP_CORE_EN     | AP core regulator enable.                                |
//| 2      | PWR_BTN_L      | Input from the physical power button. Active low.        |
//| 3      | LID_OPEN       | Lid switch. High when open.                              |
//| 4      | PP900_S3_EN    | 0.9 V S3 rail enable.                                    |
//| 5      | PP3300_S3_EN   | 3.3 V S3 rail enable.                                    |
//| 6      | PP1800_S3_EN   | 1.8 V S3 rail enable.                                    |
//| 7      | PP1250_S3_EN   | 1.25 V S3 (DRAM) rail enable.                            |
//| 8      | PP900_S0_EN    | 0.9 V S0 rail enable.                                    |
//| 9      | PP1800_USB_EN  | 1.8 V USB PHY rail enable.                               |
//| 10     | PP3300_S0_EN   | 3.3 V S0 rail enable.                                    |
//| 11     | PP1800_S0_EN   | 1.8 V S0 rail enable.                                    |
//| 12     | N/C            | Not connected.                                           |
//| 13     | N/C            | Not connected.                                           |
//| 14     | I2C1_SDA       | I2C1 data line. Host is primary, EC is secondary.        |
//| 15     | I2C1_SCL       | I2C1 clock line. Host is primary, EC is secondary.       |
//| 16     | PP5000_PG      | 5 V power good. Active high.                             |
//| 17     | SYS_PG         | System power good. Active high.                          |
//| 18     | PP1250_S3_PG   | 1.25 V S3 power good. Active high.                       |
//| 19     | PP900_S0_PG    | 0.9 V S0 power good. Active high.                        |
//| 20     | AP_CORE_PG     | AP core power good. Active high.                         |
//| 21     | AP_EC_S3_S0_L  | AP suspend request. Low while the AP wants to suspend.   |
//| 22     | USB_EN3        | USB port 3 power switch enable. Active high.             |
//| 23     | USB_EN2        | USB port 2 power switch enable. Active high.             |
//| 24     | USB_EN1        | USB port 1 power switch enable. Active high.             |
//| 25     | USB_EN0        | USB port 0 power switch enable. Active high.             |
//| 26     | VinS           | Analog: Scaled input voltage level.                      |
//| 27-29  | N/C            | Not connected.                                           |
//
// The rail enables are those of the simplified power tree. Enables that
// only exist on older trees are not wired on this board.

use assign_resources::assign_resources;
use embassy_rp::peripherals;

assign_resources! {
  i2cs: I2CSecondaryResources {
    sda: PIN_14,
    scl: PIN_15,
    i2c: I2C1,
  },
  rail_outputs: RailOutputResources {
    sys_rst_l: PIN_0,
    ap_core_en: PIN_1,
    pp900_s3_en: PIN_4,
    pp3300_s3_en: PIN_5,
    pp1800_s3_en: PIN_6,
    pp1250_s3_en: PIN_7,
    pp900_s0_en: PIN_8,
    pp1800_usb_en: PIN_9,
    pp3300_s0_en: PIN_10,
    pp1800_s0_en: PIN_11,
  },
  power_signals: PowerSignalResources {
    pp5000_pg: PIN_16,
    sys_pg: PIN_17,
    pp1250_s3_pg: PIN_18,
    pp900_s0_pg: PIN_19,
    ap_core_pg: PIN_20,
    ap_ec_s3_s0_l: PIN_21,
  },
  power_button_input: PowerButtonInputResources {
    pin: PIN_2,
  },
  lid_input: LidInputResources {
    pin: PIN_3,
  },
  analog_inputs: AnalogInputResources {
    adc: ADC,
    vin_s: PIN_26,
  },
  usb_power: UsbPowerResources {
    usb_en3: PIN_22,
    usb_en2: PIN_23,
    usb_en1: PIN_24,
    usb_en0: PIN_25,
  },
}
