//! Host serial port adapter built on the `serialport` crate.
//!
//! `SerialPortFactory` carries no state. It enumerates the host's ports and
//! opens one with the framing the module is configured for.

use std::io::ErrorKind;
use std::time::Duration;

use serialport::SerialPortType;

use crate::domain::{
    DataBits, Hc12Error, Hc12Result, HostSerial, Parity, SerialFraming, SerialPortInfo, StopBits,
};
use crate::ports::{SerialConnection, SerialFactory};

pub struct SerialPortFactory;

impl SerialFactory for SerialPortFactory {
    fn list_ports() -> Hc12Result<Vec<SerialPortInfo>> {
        let ports = serialport::available_ports()
            .map_err(|e| Hc12Error::Serial(format!("Failed to enumerate ports: {e}")))?;
        log::debug!("found {} serial port(s)", ports.len());
        Ok(ports
            .into_iter()
            .map(|p| SerialPortInfo {
                port_type: describe_port_type(&p.port_type),
                name: p.port_name,
            })
            .collect())
    }

    fn open(settings: &HostSerial) -> Hc12Result<Box<dyn SerialConnection>> {
        let (data_bits, parity, stop_bits) = host_framing(settings.framing)?;
        let device = &settings.device;
        let serial = serialport::new(device, settings.baud_rate)
            .data_bits(data_bits)
            .parity(parity)
            .stop_bits(stop_bits)
            .timeout(Duration::from_millis(settings.read_timeout_ms))
            .open()
            .map_err(|e| Hc12Error::Serial(format!("Failed to open {device}: {e}")))?;
        log::debug!(
            "opened {device} at {} bps {}",
            settings.baud_rate,
            settings.framing
        );

        Ok(Box::new(SerialPortConnection { port: Some(serial) }))
    }
}

/// Short label for a port listing. USB bridges show VID:PID and the
/// product string when the OS reports one, so a CP2102 or CH340 wired to the
/// module stands out.
fn describe_port_type(port_type: &SerialPortType) -> String {
    match port_type {
        SerialPortType::UsbPort(info) => match &info.product {
            Some(product) => format!("USB {:04x}:{:04x} {product}", info.vid, info.pid),
            None => format!("USB {:04x}:{:04x}", info.vid, info.pid),
        },
        SerialPortType::PciPort => "PCI".to_string(),
        SerialPortType::BluetoothPort => "Bluetooth".to_string(),
        SerialPortType::Unknown => "Native".to_string(),
    }
}

/// Translate module framing into the host API's terms. The host side has no
/// 1.5 stop bit setting.
fn host_framing(
    framing: SerialFraming,
) -> Hc12Result<(serialport::DataBits, serialport::Parity, serialport::StopBits)> {
    let data_bits = match framing.data_bits {
        DataBits::Five => serialport::DataBits::Five,
        DataBits::Six => serialport::DataBits::Six,
        DataBits::Seven => serialport::DataBits::Seven,
        DataBits::Eight => serialport::DataBits::Eight,
    };
    let parity = match framing.parity {
        Parity::None => serialport::Parity::None,
        Parity::Odd => serialport::Parity::Odd,
        Parity::Even => serialport::Parity::Even,
    };
    let stop_bits = match framing.stop_bits {
        StopBits::One => serialport::StopBits::One,
        StopBits::Two => serialport::StopBits::Two,
        StopBits::OnePointFive => {
            return Err(Hc12Error::Config(
                "host serial ports do not support 1.5 stop bits".to_string(),
            ))
        }
    };
    Ok((data_bits, parity, stop_bits))
}

/// An open host port. `close` drops the handle, after which every call
/// reports `NotConnected`.
pub struct SerialPortConnection {
    port: Option<Box<dyn serialport::SerialPort>>,
}

impl SerialPortConnection {
    fn port(&mut self) -> Hc12Result<&mut Box<dyn serialport::SerialPort>> {
        self.port.as_mut().ok_or(Hc12Error::NotConnected)
    }
}

impl SerialConnection for SerialPortConnection {
    fn write(&mut self, data: &[u8]) -> Hc12Result<usize> {
        use std::io::Write;
        let port = self.port()?;
        port.write_all(data)
            .map_err(|e| Hc12Error::Serial(format!("Write failed: {e}")))?;
        port.flush()
            .map_err(|e| Hc12Error::Serial(format!("Flush failed: {e}")))?;
        Ok(data.len())
    }

    fn read(&mut self, buffer: &mut [u8]) -> Hc12Result<usize> {
        use std::io::Read;
        match self.port()?.read(buffer) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == ErrorKind::TimedOut => Err(Hc12Error::ReadTimeout),
            Err(e) => Err(Hc12Error::Serial(format!("Read failed: {e}"))),
        }
    }

    fn close(&mut self) -> Hc12Result<()> {
        if let Some(port) = self.port.take() {
            log::debug!("closing {}", port.name().unwrap_or_default());
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.port.is_some()
    }
}
