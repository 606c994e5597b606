use serde::{Deserialize, Serialize};

/// One monitored parking space and the hardware lines wired to it.
///
/// Pin numbers are BCM line offsets handed to the `GpioLines` backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub id: u32,
    pub trigger_pin: u8,
    pub echo_pin: u8,
    pub free_led_pin: u8,
    pub occupied_led_pin: u8,
}

impl Slot {
    pub fn new(
        id: u32,
        trigger_pin: u8,
        echo_pin: u8,
        free_led_pin: u8,
        occupied_led_pin: u8,
    ) -> Self {
        Self {
            id,
            trigger_pin,
            echo_pin,
            free_led_pin,
            occupied_led_pin,
        }
    }

    pub fn pins(&self) -> [u8; 4] {
        [
            self.trigger_pin,
            self.echo_pin,
            self.free_led_pin,
            self.occupied_led_pin,
        ]
    }

    pub fn output_pins(&self) -> [u8; 3] {
        [self.trigger_pin, self.free_led_pin, self.occupied_led_pin]
    }
}

/// Wiring of the five-bay prototype board.
pub fn default_slots() -> Vec<Slot> {
    vec![
        Slot::new(1, 23, 24, 27, 17),
        Slot::new(2, 5, 6, 13, 22),
        Slot::new(3, 2, 3, 9, 10),
        Slot::new(4, 11, 8, 7, 25),
        Slot::new(5, 20, 21, 16, 12),
    ]
}
