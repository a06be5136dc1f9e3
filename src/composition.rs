//! Expands a tone row into a fully-timed composition.
//!
//! A composition is the row followed by its three variations in shuffled
//! order, 48 notes in all. Pitch classes land on randomly chosen piano
//! keys away from the top of the instrument, the outermost notes are
//! forced into a low register, and durations come from a beat-grouping
//! walk over each 12-note block.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::tonerow::{ROW_LEN, ToneRow};

/// The synthesizer covers the 88 piano keys; key 0 (A0) sounds MIDI 21.
const N_KEYS: u8 = 88;
const LOWEST_PITCH: u8 = 21;

/// Rows per composition: the original plus its three variations.
const N_ROWS: usize = 4;

/// A fully-timed piece ready for playback: MIDI note numbers and their
/// durations in seconds, index-aligned, both length 48. Immutable once
/// generated; played exactly once, then dropped.
#[derive(Debug, Clone)]
pub struct Composition {
    pub id: i64,
    pub notes: Vec<u8>,
    pub durations: Vec<f64>,
}

impl Composition {
    /// Generates a composition from a validated row. The row type
    /// guarantees validity, so generation itself cannot fail.
    pub fn generate(row: &ToneRow, bpm: f64, id: i64, rng: &mut impl Rng) -> Self {
        debug_assert!(bpm > 0.0);
        Self {
            id,
            notes: generate_notes(row, rng),
            durations: generate_durations(bpm, rng),
        }
    }

    /// A composition from a random row, used to fill quiet stretches.
    pub fn random(bpm: f64, rng: &mut impl Rng) -> Self {
        Self::generate(&ToneRow::random(rng), bpm, -1, rng)
    }

    /// A composition defined directly by its notes and durations.
    pub fn from_parts(id: i64, notes: Vec<u8>, durations: Vec<f64>) -> Self {
        Self {
            id,
            notes,
            durations,
        }
    }

    /// The `[notes, durations]` pair serialized for the web service.
    pub fn matrix_payload(&self) -> String {
        serde_json::to_string(&(&self.notes, &self.durations)).unwrap()
    }
}

/// Physical keys sounding pitch class `pc`, lowest first. Pitch class
/// `pc` first occurs at key `(pc + 3) % 12`, so classes starting at keys
/// 0..=3 occur 8 times and the rest 7 times.
fn keys_for(pc: u8) -> Vec<u8> {
    ((pc + 3) % 12..N_KEYS).step_by(ROW_LEN).collect()
}

/// Uniform key choice for a pitch class, keeping clear of the top of the
/// instrument: classes with 7 keys drop the top one, classes with 8 drop
/// the top two, leaving 6 candidates either way.
fn random_key(pc: u8, rng: &mut impl Rng) -> u8 {
    let keys = keys_for(pc);
    let cut = if keys.len() == 7 { 1 } else { 2 };
    *keys[..keys.len() - cut].choose(rng).unwrap()
}

/// Low-register re-draw for the framing notes: the bottom key and the
/// top 3 keys of the class's full range are out.
fn low_register_key(pc: u8, rng: &mut impl Rng) -> u8 {
    let keys = keys_for(pc);
    *keys[1..keys.len() - 3].choose(rng).unwrap()
}

fn key_pitch_class(key: u8) -> u8 {
    // Key 0 is A0, pitch class 9.
    (key + 9) % 12
}

fn generate_notes(row: &ToneRow, rng: &mut impl Rng) -> Vec<u8> {
    let mut variations = row.variations().to_vec();
    variations.shuffle(rng);

    let mut keys: Vec<u8> = Vec::with_capacity(N_ROWS * ROW_LEN);
    for r in std::iter::once(row).chain(variations.iter()) {
        for &pc in r.pitch_classes() {
            keys.push(random_key(pc, rng));
        }
    }

    // The piece opens and closes low.
    keys[0] = low_register_key(key_pitch_class(keys[0]), rng);
    let last = keys.len() - 1;
    keys[last] = low_register_key(key_pitch_class(keys[last]), rng);

    keys.into_iter().map(|k| LOWEST_PITCH + k).collect()
}

fn generate_durations(bpm: f64, rng: &mut impl Rng) -> Vec<f64> {
    let quarter = 60.0 / bpm;
    // Index is the grouping size minus one: one note per beat is a
    // quarter, two are eighths, three are triplet eighths.
    let grouped = [quarter, 30.0 / bpm, 20.0 / bpm];
    let end_of_variation = [120.0 / bpm, quarter];
    let end_of_composition = 240.0 / bpm;

    let mut durations = Vec::with_capacity(N_ROWS * ROW_LEN);
    for block in 0..N_ROWS {
        let mut cur = 0;
        loop {
            let remaining = ROW_LEN - cur;
            // The last note of every block takes a long duration below.
            if remaining == 1 {
                break;
            }

            // The very first note of the piece is a quarter or an eighth;
            // everywhere else the grouping is clamped so exactly one note
            // is left over for the block's long ending.
            let notes_per_beat = if block == 0 && cur == 0 {
                rng.gen_range(1..=2)
            } else {
                rng.gen_range(1..=(remaining - 1).min(grouped.len()))
            };
            for _ in 0..notes_per_beat {
                durations.push(grouped[notes_per_beat - 1]);
            }
            cur += notes_per_beat;
        }

        if block == N_ROWS - 1 {
            durations.push(end_of_composition);
        } else {
            durations.push(*end_of_variation.choose(rng).unwrap());
        }
    }
    durations
}
