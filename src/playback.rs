use std::time::{Duration, Instant};

use rand::Rng;
use tracing::{error, info};

use crate::composition::Composition;
use crate::drone::Drone;
use crate::error::DeviceFault;
use crate::frame;
use crate::midi::{self, MidiPort, NOTE_OFF, NOTE_ON};
use crate::serial::{ControlPort, exchange};

/// Owns the hardware and everything that plays through it. Playback and
/// drone transitions are methods here, so nothing else can interleave
/// traffic on the ports; the drone is forced off when the player goes
/// out of scope.
pub struct Player<M: MidiPort, S: ControlPort> {
    midi: M,
    serial: S,
    drone: Drone,
    channel: u8,
    velocity: u8,
    bpm: f64,
    last_played: Instant,
}

impl<M: MidiPort, S: ControlPort> Player<M, S> {
    pub fn new(midi: M, serial: S, drone: Drone, channel: u8, velocity: u8, bpm: f64) -> Self {
        Self {
            midi,
            serial,
            drone,
            channel,
            velocity,
            bpm,
            last_played: Instant::now(),
        }
    }

    /// Plays a composition note by note: control frame out, handshake
    /// in, and only then the MIDI note for its full wall-clock duration.
    /// Any serial irregularity aborts before the note ever sounds. A
    /// note that has started always completes its sleep.
    pub fn play(&mut self, comp: &Composition) -> Result<(), DeviceFault> {
        for (&note, &duration) in comp.notes.iter().zip(&comp.durations) {
            info!("({:>7}, {:.3})", midi::note_name(note), duration);

            let message = frame::note_frame(midi::pitch_class(note), duration);
            exchange(&mut self.serial, &message, "note playback")?;

            self.midi
                .send([NOTE_ON | self.channel, note, self.velocity])
                .map_err(|kind| DeviceFault::new("note playback", kind))?;
            std::thread::sleep(Duration::from_secs_f64(duration));
            self.midi
                .send([NOTE_OFF | self.channel, note, 0])
                .map_err(|kind| DeviceFault::new("note playback", kind))?;
        }

        self.last_played = Instant::now();
        Ok(())
    }

    pub fn drone_on(&mut self) -> Result<(), DeviceFault> {
        self.drone.on(&mut self.midi, &mut self.serial)
    }

    pub fn drone_off(&mut self) -> Result<(), DeviceFault> {
        self.drone.off(&mut self.midi, &mut self.serial)
    }

    /// Seconds since a composition last finished; counts from startup
    /// until the first one does. Single source of truth for the
    /// quiet-window predicate.
    pub fn seconds_since_last_played(&self) -> f64 {
        self.last_played.elapsed().as_secs_f64()
    }

    /// True once at least `seconds` have passed without a composition.
    pub fn quiet_for(&self, seconds: f64) -> bool {
        self.seconds_since_last_played() >= seconds
    }

    /// Fills a quiet gallery: drone off, then `n` compositions from
    /// random rows at the player's tempo.
    pub fn play_quiet_window(&mut self, n: u32, rng: &mut impl Rng) -> Result<(), DeviceFault> {
        self.drone_off()?;
        for _ in 0..n {
            let comp = Composition::random(self.bpm, rng);
            self.play(&comp)?;
        }
        Ok(())
    }
}

impl<M: MidiPort, S: ControlPort> Drop for Player<M, S> {
    /// Scope-exit guarantee: the drone never outlives its player. A
    /// fault here has nowhere to propagate, so it is only logged; the
    /// MIDI adapter's own note-off sweep still runs after this.
    fn drop(&mut self) {
        if let Err(fault) = self.drone_off() {
            error!("drone off during teardown failed: {fault}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FaultKind;
    use std::cell::RefCell;
    use std::io;
    use std::rc::Rc;

    #[derive(Clone)]
    struct MockMidi {
        sent: Rc<RefCell<Vec<[u8; 3]>>>,
    }

    impl MidiPort for MockMidi {
        fn send(&mut self, message: [u8; 3]) -> Result<(), FaultKind> {
            self.sent.borrow_mut().push(message);
            Ok(())
        }
    }

    #[derive(Clone)]
    struct MockSerial {
        written: Rc<RefCell<Vec<Vec<u8>>>>,
        write_len: Option<usize>,
        ack: bool,
    }

    impl ControlPort for MockSerial {
        fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
            self.written.borrow_mut().push(bytes.to_vec());
            Ok(self.write_len.unwrap_or(bytes.len()))
        }

        fn read_byte(&mut self) -> io::Result<Option<u8>> {
            Ok(self.ack.then_some(b'k'))
        }
    }

    fn player(ack: bool, write_len: Option<usize>) -> Player<MockMidi, MockSerial> {
        let midi = MockMidi {
            sent: Rc::new(RefCell::new(Vec::new())),
        };
        let serial = MockSerial {
            written: Rc::new(RefCell::new(Vec::new())),
            write_len,
            ack,
        };
        Player::new(midi, serial, Drone::new(1, 24, 60), 0, 63, 102.0)
    }

    #[test]
    fn plays_frame_handshake_then_note() {
        let mut player = player(true, None);
        let sent = player.midi.sent.clone();
        let written = player.serial.written.clone();

        let comp = Composition::from_parts(1, vec![60, 72], vec![0.001, 0.001]);
        player.play(&comp).unwrap();

        assert_eq!(
            *written.borrow(),
            vec![
                frame::note_frame(0, 0.001).to_vec(),
                frame::note_frame(0, 0.001).to_vec(),
            ]
        );
        assert_eq!(
            *sent.borrow(),
            vec![
                [NOTE_ON, 60, 63],
                [NOTE_OFF, 60, 0],
                [NOTE_ON, 72, 63],
                [NOTE_OFF, 72, 0],
            ]
        );
    }

    #[test]
    fn short_write_faults_before_any_midi() {
        let mut player = player(true, Some(8));
        let sent = player.midi.sent.clone();

        let comp = Composition::from_parts(1, vec![60], vec![0.001]);
        let fault = player.play(&comp).unwrap_err();
        assert!(matches!(fault.kind, FaultKind::ShortWrite { written: 8, .. }));
        assert!(sent.borrow().is_empty());
    }

    #[test]
    fn handshake_timeout_faults_before_any_midi() {
        let mut player = player(false, None);
        let sent = player.midi.sent.clone();

        let comp = Composition::from_parts(1, vec![60], vec![0.001]);
        let fault = player.play(&comp).unwrap_err();
        assert!(matches!(fault.kind, FaultKind::NoHandshake));
        assert!(sent.borrow().is_empty());
    }

    #[test]
    fn playing_resets_the_quiet_clock() {
        let mut player = player(true, None);
        let comp = Composition::from_parts(1, vec![60], vec![0.001]);

        std::thread::sleep(Duration::from_millis(20));
        assert!(player.quiet_for(0.01));
        player.play(&comp).unwrap();
        assert!(!player.quiet_for(0.01));
    }

    #[test]
    fn quiet_window_starts_with_the_drone_off() {
        let mut player = player(true, None);
        let written = player.serial.written.clone();
        player.drone_on().unwrap();

        // Tiny tempo-independent check: the first frame after the window
        // opens must be the drone-off frame.
        let before = written.borrow().len();
        player
            .play_quiet_window(0, &mut rand::thread_rng())
            .unwrap();
        assert_eq!(written.borrow()[before], frame::drone_frame(false).to_vec());
    }

    #[test]
    fn dropping_the_player_forces_the_drone_off() {
        let mut player = player(true, None);
        let sent = player.midi.sent.clone();
        let written = player.serial.written.clone();

        player.drone_on().unwrap();
        drop(player);

        assert_eq!(
            written.borrow().last().unwrap(),
            &frame::drone_frame(false).to_vec()
        );
        assert_eq!(sent.borrow().last().unwrap(), &[NOTE_OFF | 1, 24, 0]);
    }
}
