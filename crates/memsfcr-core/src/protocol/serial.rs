//! Serial port handling
//!
//! The MEMS diagnostic cable is a USB/FTDI adapter running 9600 baud 8N1.

use serialport::{DataBits, FlowControl, Parity, SerialPort, SerialPortType, StopBits};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info};

use super::{ProtocolError, DEFAULT_BAUD_RATE};

/// FTDI vendor id, used by the common MEMS diagnostic cables
pub const FTDI_VENDOR_ID: u16 = 0x0403;

/// A port a diagnostic cable may be attached to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    /// Port name ("/dev/ttyUSB0", "COM3")
    pub name: String,
    /// USB vendor id
    pub vid: Option<u16>,
    /// USB product id
    pub pid: Option<u16>,
    /// Product string reported by the adapter
    pub product: Option<String>,
}

impl PortInfo {
    fn bare(name: String) -> Self {
        Self {
            name,
            vid: None,
            pid: None,
            product: None,
        }
    }

    /// True for FTDI based adapters
    pub fn is_ftdi(&self) -> bool {
        self.vid == Some(FTDI_VENDOR_ID)
    }

    /// Ordering used when presenting ports: FTDI adapters, other USB serial
    /// devices by number, then anything else by name
    fn rank(&self) -> (u8, usize, String) {
        let base = self.name.rsplit('/').next().unwrap_or(&self.name).to_string();
        let number = base
            .trim_start_matches(|c: char| !c.is_ascii_digit())
            .parse::<usize>()
            .unwrap_or(usize::MAX);

        let class = if self.is_ftdi() {
            0
        } else if base.starts_with("ttyUSB") || base.starts_with("cu.usbserial") {
            1
        } else if base.starts_with("ttyACM") {
            2
        } else {
            3
        };
        (class, number, base)
    }
}

fn port_info(info: serialport::SerialPortInfo) -> PortInfo {
    match info.port_type {
        SerialPortType::UsbPort(usb) => PortInfo {
            name: info.port_name,
            vid: Some(usb.vid),
            pid: Some(usb.pid),
            product: usb.product,
        },
        _ => PortInfo::bare(info.port_name),
    }
}

fn serial_error(e: serialport::Error) -> ProtocolError {
    ProtocolError::SerialError(e.to_string())
}

/// Available serial ports, most likely diagnostic cable first
pub fn list_ports() -> Vec<PortInfo> {
    let mut found: BTreeMap<String, PortInfo> = serialport::available_ports()
        .unwrap_or_default()
        .into_iter()
        .map(|info| {
            let port = port_info(info);
            (port.name.clone(), port)
        })
        .collect();

    // udev can lag behind a freshly plugged cable
    #[cfg(target_os = "linux")]
    if let Ok(entries) = std::fs::read_dir("/dev") {
        for name in entries
            .flatten()
            .filter_map(|e| e.file_name().into_string().ok())
            .filter(|n| n.starts_with("ttyUSB") || n.starts_with("ttyACM"))
        {
            let path = format!("/dev/{}", name);
            found.entry(path.clone()).or_insert_with(|| PortInfo::bare(path));
        }
    }

    let mut ports: Vec<PortInfo> = found.into_values().collect();
    ports.sort_by_key(PortInfo::rank);
    ports
}

/// Open `name`; reads give up after `timeout`
pub fn open_port(
    name: &str,
    baud_rate: Option<u32>,
    timeout: Duration,
) -> Result<Box<dyn SerialPort>, ProtocolError> {
    let baud = baud_rate.unwrap_or(DEFAULT_BAUD_RATE);
    info!(port = name, baud, "opening serial port");

    serialport::new(name, baud)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(timeout)
        .open()
        .map_err(serial_error)
}

/// Re-apply 8N1 without flow control; some drivers ignore the builder settings
pub fn configure_port(port: &mut dyn SerialPort) -> Result<(), ProtocolError> {
    port.set_data_bits(DataBits::Eight).map_err(serial_error)?;
    port.set_parity(Parity::None).map_err(serial_error)?;
    port.set_stop_bits(StopBits::One).map_err(serial_error)?;
    port.set_flow_control(FlowControl::None).map_err(serial_error)?;
    debug!(port = ?port.name(), "serial port configured 8N1");
    Ok(())
}

/// Discard anything left in the driver buffers from a previous session
pub fn clear_buffers(port: &mut dyn SerialPort) -> Result<(), ProtocolError> {
    port.clear(serialport::ClearBuffer::All).map_err(serial_error)
}
