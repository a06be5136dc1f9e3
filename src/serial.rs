use std::io::{self, Read, Write};
use std::time::Duration;

use serialport::{SerialPort, SerialPortType};
use tracing::info;

use crate::error::{DeviceFault, Error, FaultKind};
use crate::frame::FRAME_LEN;

pub const BAUD_RATE: u32 = 57_600;

/// Read timeout for the one-byte handshake, comfortably above the
/// longest note plus the controller's processing time.
pub const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Byte-level serial interface. `read_byte` distinguishes nothing
/// arriving before the timeout (`Ok(None)`) from a broken port (`Err`).
pub trait ControlPort {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize>;
    fn read_byte(&mut self) -> io::Result<Option<u8>>;
}

/// One control exchange: write the frame, require it fully written, then
/// block for the controller's single acknowledgment byte. The byte's
/// content is not inspected. Anything irregular is a fatal device fault;
/// a half-sent frame cannot be told apart from a dead cable here, so no
/// retry is attempted.
pub fn exchange(
    port: &mut impl ControlPort,
    frame: &[u8; FRAME_LEN],
    op: &'static str,
) -> Result<(), DeviceFault> {
    let written = port
        .write(frame)
        .map_err(|e| DeviceFault::new(op, FaultKind::Serial(e)))?;
    if written < frame.len() {
        return Err(DeviceFault::new(
            op,
            FaultKind::ShortWrite {
                written,
                expected: frame.len(),
            },
        ));
    }
    match port.read_byte() {
        Ok(Some(_)) => Ok(()),
        Ok(None) => Err(DeviceFault::new(op, FaultKind::NoHandshake)),
        Err(e) => Err(DeviceFault::new(op, FaultKind::Serial(e))),
    }
}

/// The USB serial link to the light controller.
pub struct SerialLink {
    port: Box<dyn SerialPort>,
}

impl SerialLink {
    /// Opens the configured path, or discovers the port. The installation
    /// has exactly one USB serial device (the controller's CDC-ACM
    /// profile), so zero or several candidates mean miswired hardware.
    pub fn open(path: Option<&str>) -> Result<Self, Error> {
        let path = match path {
            Some(p) => p.to_string(),
            None => discover()?,
        };
        let port = serialport::new(&path, BAUD_RATE)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(|e| {
                Error::SerialSetup(format!(
                    "{path}: {e}; check the USB cable to the light controller"
                ))
            })?;
        info!("serial link open on {path}");
        Ok(Self { port })
    }
}

fn discover() -> Result<String, Error> {
    let ports = serialport::available_ports().map_err(|e| Error::SerialSetup(e.to_string()))?;
    let mut usb: Vec<String> = ports
        .into_iter()
        .filter(|p| matches!(p.port_type, SerialPortType::UsbPort(_)))
        .map(|p| p.port_name)
        .collect();
    if usb.len() == 1 {
        Ok(usb.remove(0))
    } else {
        Err(Error::SerialSetup(format!(
            "found {} USB serial devices, expected exactly the light controller",
            usb.len()
        )))
    }
}

impl ControlPort for SerialLink {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.port.write(bytes)
    }

    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let mut buf = [0u8; 1];
        match self.port.read(&mut buf) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(buf[0])),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(None),
            Err(e) => Err(e),
        }
    }
}
