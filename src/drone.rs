use tracing::info;

use crate::error::DeviceFault;
use crate::frame;
use crate::midi::{MidiPort, NOTE_OFF, NOTE_ON};
use crate::serial::{ControlPort, exchange};

/// The ambient note that covers outages and quiet stretches. One drone
/// exists per installation; transitions are idempotent so callers can
/// force a known state without tracking it themselves.
#[derive(Debug)]
pub struct Drone {
    channel: u8,
    note: u8,
    velocity: u8,
    is_on: bool,
}

impl Drone {
    pub fn new(channel: u8, note: u8, velocity: u8) -> Self {
        Self {
            channel,
            note,
            velocity,
            is_on: false,
        }
    }

    pub fn is_on(&self) -> bool {
        self.is_on
    }

    /// No-op when already on. Otherwise the lights hear about the drone
    /// first, and the note only sounds once they acknowledge.
    pub fn on(
        &mut self,
        midi: &mut impl MidiPort,
        serial: &mut impl ControlPort,
    ) -> Result<(), DeviceFault> {
        if self.is_on {
            return Ok(());
        }
        exchange(serial, &frame::drone_frame(true), "drone on")?;
        midi.send([NOTE_ON | self.channel, self.note, self.velocity])
            .map_err(|kind| DeviceFault::new("drone on", kind))?;
        self.is_on = true;
        info!("drone on");
        Ok(())
    }

    /// No-op when already off.
    pub fn off(
        &mut self,
        midi: &mut impl MidiPort,
        serial: &mut impl ControlPort,
    ) -> Result<(), DeviceFault> {
        if !self.is_on {
            return Ok(());
        }
        exchange(serial, &frame::drone_frame(false), "drone off")?;
        midi.send([NOTE_OFF | self.channel, self.note, 0])
            .map_err(|kind| DeviceFault::new("drone off", kind))?;
        self.is_on = false;
        info!("drone off");
        Ok(())
    }
}
