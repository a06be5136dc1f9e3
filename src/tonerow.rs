use std::fmt;

use rand::Rng;
use rand::seq::SliceRandom;

use crate::error::Error;

/// Number of pitch classes, and therefore of elements in a row.
pub const ROW_LEN: usize = 12;

pub(crate) const PITCH_CLASS_NAMES: [&str; ROW_LEN] = [
    "C", "Db", "D", "Eb", "E", "F", "Gb", "G", "Ab", "A", "Bb", "B",
];

/// An ordered permutation of the 12 pitch classes — the seed of a
/// composition. Construction validates, so every `ToneRow` in the
/// program is known good; derived forms return new rows and never
/// mutate their input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToneRow([u8; ROW_LEN]);

impl ToneRow {
    /// Validates 12 distinct values in 0..=11. An invalid sequence is
    /// the caller's problem to replace; it is never repaired here.
    pub fn new(values: &[u8]) -> Result<Self, Error> {
        if values.len() != ROW_LEN {
            return Err(Error::InvalidToneRow);
        }
        let mut seen = [false; ROW_LEN];
        for &v in values {
            if v as usize >= ROW_LEN || seen[v as usize] {
                return Err(Error::InvalidToneRow);
            }
            seen[v as usize] = true;
        }
        let mut row = [0u8; ROW_LEN];
        row.copy_from_slice(values);
        Ok(Self(row))
    }

    pub fn random(rng: &mut impl Rng) -> Self {
        let mut row: [u8; ROW_LEN] = std::array::from_fn(|i| i as u8);
        row.shuffle(rng);
        Self(row)
    }

    pub fn pitch_classes(&self) -> &[u8; ROW_LEN] {
        &self.0
    }

    pub fn retrograde(&self) -> Self {
        let mut row = self.0;
        row.reverse();
        Self(row)
    }

    /// Inversion anchored at the row's first element:
    /// `I[0] = P[0]`, `I[i] = (12 - (P[i] - P[0]) + P[0]) mod 12`.
    pub fn inversion(&self) -> Self {
        let first = self.0[0] as i32;
        let n = ROW_LEN as i32;
        Self(std::array::from_fn(|i| {
            let p = self.0[i] as i32;
            ((n - (p - first) + first) % n) as u8
        }))
    }

    pub fn retrograde_inversion(&self) -> Self {
        self.inversion().retrograde()
    }

    /// Retrograde, inversion and retrograde-inversion, in that order.
    /// Callers that shuffle treat the order as insignificant.
    pub fn variations(&self) -> [ToneRow; 3] {
        let inv = self.inversion();
        [self.retrograde(), inv.clone(), inv.retrograde()]
    }

    /// The twelve-tone matrix: each row is a transposition of this row,
    /// with the inversion running down the first column. Display only;
    /// playback never consults it.
    pub fn matrix(&self) -> [[u8; ROW_LEN]; ROW_LEN] {
        let n = ROW_LEN as i32;
        std::array::from_fn(|i| {
            let mut interval = self.0[i] as i32 - self.0[0] as i32;
            if self.0[i] >= self.0[0] {
                interval -= n;
            }
            std::array::from_fn(|j| (self.0[j] as i32 - interval).rem_euclid(n) as u8)
        })
    }
}

impl fmt::Display for ToneRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, pc) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{:<2}", PITCH_CLASS_NAMES[*pc as usize])?;
        }
        Ok(())
    }
}
