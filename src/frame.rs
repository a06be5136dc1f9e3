//! Control frames for the lighting microcontroller.
//!
//! Every exchange with the controller is one fixed 11-byte frame followed
//! by a 1-byte acknowledgment read back by the caller. Layout:
//! `'%'`, mode byte, pitch class (0..=11), duration as ASCII decimal
//! microseconds (at most 7 digits, unused bytes left zero), `'&'`.
//! Drone frames carry an all-zero pitch/duration field.

/// Length of every control frame.
pub const FRAME_LEN: usize = 11;

const FRAME_START: u8 = b'%';
const FRAME_END: u8 = b'&';

const MODE_DRONE_OFF: u8 = b'0';
const MODE_DRONE_ON: u8 = b'1';
const MODE_NOTE: u8 = b'2';

/// Frame announcing one note and how long its light should hold.
pub fn note_frame(pitch_class: u8, duration_secs: f64) -> [u8; FRAME_LEN] {
    debug_assert!(pitch_class < 12);
    let micros = (duration_secs * 1_000_000.0) as u64;
    // 7 digits of microseconds caps out just above a whole note at 25 bpm.
    debug_assert!(micros < 10_000_000);

    let mut frame = empty_frame(MODE_NOTE);
    frame[2] = pitch_class;
    let digits = micros.to_string();
    frame[3..3 + digits.len()].copy_from_slice(digits.as_bytes());
    frame
}

/// Frame toggling the drone lighting state.
pub fn drone_frame(on: bool) -> [u8; FRAME_LEN] {
    empty_frame(if on { MODE_DRONE_ON } else { MODE_DRONE_OFF })
}

fn empty_frame(mode: u8) -> [u8; FRAME_LEN] {
    let mut frame = [0u8; FRAME_LEN];
    frame[0] = FRAME_START;
    frame[1] = mode;
    frame[FRAME_LEN - 1] = FRAME_END;
    frame
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_frame_layout() {
        // 60/102 s, the quarter note at the installation tempo.
        let frame = note_frame(4, 60.0 / 102.0);
        assert_eq!(
            frame,
            [b'%', b'2', 4, b'5', b'8', b'8', b'2', b'3', b'5', 0, b'&']
        );
    }

    #[test]
    fn note_frame_short_duration_leaves_zeros() {
        let frame = note_frame(0, 0.02);
        assert_eq!(
            frame,
            [b'%', b'2', 0, b'2', b'0', b'0', b'0', b'0', 0, 0, b'&']
        );
    }

    #[test]
    fn note_frame_seven_digit_duration_fills_the_field() {
        // A whole note at 102 bpm: 2352941 microseconds.
        let frame = note_frame(11, 240.0 / 102.0);
        assert_eq!(
            frame,
            [b'%', b'2', 11, b'2', b'3', b'5', b'2', b'9', b'4', b'1', b'&']
        );
    }

    #[test]
    fn drone_frames() {
        assert_eq!(
            drone_frame(true),
            [b'%', b'1', 0, 0, 0, 0, 0, 0, 0, 0, b'&']
        );
        assert_eq!(
            drone_frame(false),
            [b'%', b'0', 0, 0, 0, 0, 0, 0, 0, 0, b'&']
        );
    }
}
