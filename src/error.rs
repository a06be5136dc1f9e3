use std::io;

use thiserror::Error;

/// Everything the library can fail with. Only `main` decides which of
/// these end the process.
#[derive(Debug, Error)]
pub enum Error {
    #[error("a tone row is 12 distinct pitch classes in 0..=11")]
    InvalidToneRow,

    #[error(transparent)]
    Device(#[from] DeviceFault),

    #[error("midi setup: {0}")]
    MidiSetup(String),

    #[error("serial setup: {0}")]
    SerialSetup(String),

    #[error("config {path}: {message}")]
    Config { path: String, message: String },
}

/// Unrecoverable hardware fault. Partial state on the wire cannot be
/// disambiguated from this side of the cable, so the hosting process is
/// expected to restart the machine rather than retry.
#[derive(Debug, Error)]
#[error("{op}: {kind}")]
pub struct DeviceFault {
    pub op: &'static str,
    pub kind: FaultKind,
}

impl DeviceFault {
    pub fn new(op: &'static str, kind: FaultKind) -> Self {
        Self { op, kind }
    }
}

#[derive(Debug, Error)]
pub enum FaultKind {
    #[error("wrote {written} of {expected} bytes to the light controller")]
    ShortWrite { written: usize, expected: usize },

    #[error("no handshake byte from the light controller")]
    NoHandshake,

    #[error("serial i/o: {0}")]
    Serial(#[from] io::Error),

    #[error("midi send: {0}")]
    Midi(String),
}
