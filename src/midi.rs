use midir::{MidiOutput, MidiOutputConnection};
use tracing::info;

use crate::error::{Error, FaultKind};
use crate::tonerow::PITCH_CLASS_NAMES;

/// Channel voice status bytes; the channel number in 0..=15 is OR'd in.
pub const NOTE_OFF: u8 = 0x80;
pub const NOTE_ON: u8 = 0x90;

pub const N_CHANNELS: u8 = 16;

/// Narrow interface playback and the drone drive. Production wraps a
/// midir connection; tests substitute a recording port.
pub trait MidiPort {
    fn send(&mut self, message: [u8; 3]) -> Result<(), FaultKind>;
}

/// Pitch class of a MIDI note number.
pub fn pitch_class(note: u8) -> u8 {
    note % 12
}

/// Human name for a MIDI note number, e.g. 21 is "A0" and 60 is "C4".
pub fn note_name(note: u8) -> String {
    let name = PITCH_CLASS_NAMES[pitch_class(note) as usize];
    let octave = note as i32 / 12 - 1;
    format!("{name}{octave}")
}

/// The synthesizer connection. Sweeps every note off on open and again
/// on drop: a note-on whose note-off never went out would otherwise
/// sound until someone pulls the synth's plug.
pub struct MidiOut {
    conn: MidiOutputConnection,
}

impl MidiOut {
    /// Opens the synth port. One available port means only the synth is
    /// visible; two means a virtual through port registered first and
    /// the synth is the second. Anything else cannot be disambiguated
    /// and is a setup error.
    pub fn open() -> Result<Self, Error> {
        let output = MidiOutput::new("rowlight").map_err(|e| Error::MidiSetup(e.to_string()))?;
        let ports = output.ports();
        let port = match ports.len() {
            0 => return Err(Error::MidiSetup("no available MIDI ports".into())),
            1 => &ports[0],
            2 => &ports[1],
            n => {
                return Err(Error::MidiSetup(format!(
                    "{n} MIDI ports available, cannot pick the synthesizer"
                )));
            }
        };
        let name = output.port_name(port).unwrap_or_default();
        let conn = output
            .connect(port, "rowlight-out")
            .map_err(|e| Error::MidiSetup(e.to_string()))?;
        info!("midi output open on {name}");

        let mut out = Self { conn };
        out.all_notes_off();
        Ok(out)
    }

    /// Note-off for every pitch on every channel.
    pub fn all_notes_off(&mut self) {
        for channel in 0..N_CHANNELS {
            for note in 0..=127 {
                let _ = self.conn.send(&[NOTE_OFF | channel, note, 0]);
            }
        }
    }
}

impl MidiPort for MidiOut {
    fn send(&mut self, message: [u8; 3]) -> Result<(), FaultKind> {
        self.conn
            .send(&message)
            .map_err(|e| FaultKind::Midi(e.to_string()))
    }
}

impl Drop for MidiOut {
    fn drop(&mut self) {
        self.all_notes_off();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_names() {
        assert_eq!(note_name(21), "A0");
        assert_eq!(note_name(24), "C1");
        assert_eq!(note_name(60), "C4");
        assert_eq!(note_name(61), "Db4");
        assert_eq!(note_name(108), "C8");
    }

    #[test]
    fn pitch_classes_of_the_lowest_keys() {
        assert_eq!(pitch_class(21), 9);
        assert_eq!(pitch_class(22), 10);
        assert_eq!(pitch_class(23), 11);
        assert_eq!(pitch_class(24), 0);
    }
}
