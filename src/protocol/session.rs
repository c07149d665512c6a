//! AtSession: owns a serial connection and drives AT I/O timing.
//!
//! One `execute` call is one full exchange: gap → write → reply delay →
//! fragment read loop → (drain on error). Line reassembly and echo
//! skipping live here; reply meaning is decided by `decode` and `exchange`.

use std::time::Instant;

use crate::domain::{Hc12Error, Hc12Result, SessionConfig};
use crate::ports::SerialConnection;

use super::{decode_line, AtCommand, ConfigUpdate, Exchange, Outcome, Progress};

/// Owns a serial connection and executes AT commands against the HC-12.
pub struct AtSession {
    serial: Box<dyn SerialConnection>,
    config: SessionConfig,
    last_command_time: Option<Instant>,
}

impl AtSession {
    pub fn new(serial: Box<dyn SerialConnection>, config: SessionConfig) -> Self {
        Self {
            serial,
            config,
            last_command_time: None,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.serial.is_connected()
    }

    /// Close the transport and hand it back.
    pub fn close(mut self) -> Hc12Result<Box<dyn SerialConnection>> {
        self.serial.close()?;
        Ok(self.serial)
    }

    /// Run one command to completion.
    ///
    /// Returns the confirmed values on `Done`. On any failure nothing is
    /// returned for the caller to apply; after a protocol error the
    /// transport is drained so the next command starts clean.
    pub fn execute(&mut self, cmd: &AtCommand) -> Hc12Result<ConfigUpdate> {
        if !self.serial.is_connected() {
            return Err(Hc12Error::NotConnected);
        }
        self.ensure_command_delay();

        let mut exchange = Exchange::new(*cmd);
        let wire = exchange.request();
        let request_line = wire.trim_end();
        log::debug!("AT TX: {request_line}");

        let written = self.write_all(wire.as_bytes());
        if let Err(e) = written {
            self.last_command_time = Some(Instant::now());
            exchange.fail(e);
            return exchange.finish();
        }
        exchange.mark_written();

        if exchange.outcome() == Outcome::Active {
            let delay = self.config.reply_delay();
            if !delay.is_zero() {
                std::thread::sleep(delay);
            }
            if let Err(e) = self.read_replies(&mut exchange, request_line) {
                exchange.fail(e);
            } else {
                // A reply cut short is an error state too and must not
                // leave its tail for the next command.
                exchange.conclude();
                if exchange.is_error() {
                    self.drain();
                }
            }
        }

        // Update timestamp even on error so the next command still respects the gap
        self.last_command_time = Some(Instant::now());
        exchange.finish()
    }

    /// Write the whole request, looping over short writes.
    fn write_all(&mut self, mut data: &[u8]) -> Hc12Result<()> {
        while !data.is_empty() {
            let n = self.serial.write(data)?;
            if n == 0 {
                return Err(Hc12Error::Serial("write accepted no bytes".into()));
            }
            data = &data[n.min(data.len())..];
        }
        Ok(())
    }

    /// Read fragments until the exchange completes or aborts, or the
    /// transport goes quiet. `reply_window` caps a module that never stops
    /// talking.
    ///
    /// Only transport errors other than a timeout are returned; everything
    /// protocol-level lands in `exchange`.
    fn read_replies(&mut self, exchange: &mut Exchange, request_line: &str) -> Hc12Result<()> {
        let deadline = Instant::now() + self.config.reply_window();
        let mut lines = LineBuffer::default();
        let mut chunk = vec![0u8; self.config.read_chunk_size.max(1)];

        loop {
            if Instant::now() >= deadline {
                log::warn!(
                    "{}: reply window elapsed with data still arriving",
                    exchange.command()
                );
                return Ok(());
            }
            let n = match self.serial.read(&mut chunk) {
                Ok(0) | Err(Hc12Error::ReadTimeout) => break,
                Ok(n) => n,
                Err(e) => return Err(e),
            };
            lines.push(&chunk[..n]);
            while let Some(line) = lines.next_line() {
                if feed(exchange, &line, request_line) != Progress::TryMore {
                    return Ok(());
                }
            }
        }

        // Transport is quiet: an unterminated last line still counts
        if let Some(rest) = lines.take_rest() {
            feed(exchange, &rest, request_line);
        }
        Ok(())
    }

    /// Discard whatever the module is still sending, bounded by both a read
    /// count and a wall-clock window.
    fn drain(&mut self) -> usize {
        let deadline = Instant::now() + self.config.drain_window();
        let mut scratch = vec![0u8; self.config.read_chunk_size.max(1)];
        let mut discarded = 0;

        for _ in 0..self.config.drain_max_reads {
            if Instant::now() >= deadline {
                log::warn!("drain window elapsed with data still arriving");
                break;
            }
            match self.serial.read(&mut scratch) {
                Ok(0) | Err(Hc12Error::ReadTimeout) => break,
                Ok(n) => discarded += n,
                Err(e) => {
                    log::warn!("drain stopped: {e}");
                    break;
                }
            }
        }
        log::debug!("drained {discarded} stale byte(s)");
        discarded
    }

    /// Sleep if needed to maintain the minimum inter-command gap.
    fn ensure_command_delay(&self) {
        if let Some(last) = self.last_command_time {
            let elapsed = last.elapsed();
            let min_delay = self.config.command_gap();
            if elapsed < min_delay {
                std::thread::sleep(min_delay - elapsed);
            }
        }
    }
}

/// Hand one reply line to the exchange. Blank lines and the echoed request
/// (some USB-serial adapters loop TX back) are skipped.
fn feed(exchange: &mut Exchange, line: &str, request_line: &str) -> Progress {
    let line = line.trim();
    if line.is_empty() || line == request_line {
        return Progress::TryMore;
    }
    log::debug!("AT RX: {line}");
    exchange.accept(decode_line(line))
}

/// Reassembles reply lines from arbitrary fragments.
#[derive(Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    /// Next complete line, `\r\n` or bare `\n` terminated.
    fn next_line(&mut self) -> Option<String> {
        let end = self.pending.iter().position(|&b| b == b'\n')?;
        let line: Vec<u8> = self.pending.drain(..=end).collect();
        Some(String::from_utf8_lossy(&line).into_owned())
    }

    fn take_rest(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        Some(String::from_utf8_lossy(&rest).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BaudRate, Channel, PowerLevel, TransmissionMode};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    // ---------------------------------------------------------------------------
    // ScriptedSerial: each read() pops one step
    // ---------------------------------------------------------------------------

    enum Step {
        Data(&'static str),
        Quiet,
        Broken,
    }

    struct ScriptedSerial {
        log: Arc<Mutex<Vec<String>>>,
        script: Arc<Mutex<VecDeque<Step>>>,
        connected: bool,
        write_fails: bool,
    }

    impl SerialConnection for ScriptedSerial {
        fn write(&mut self, data: &[u8]) -> Hc12Result<usize> {
            if self.write_fails {
                return Err(Hc12Error::Serial("unplugged".into()));
            }
            self.log
                .lock()
                .unwrap()
                .push(String::from_utf8_lossy(data).into());
            Ok(data.len())
        }
        fn read(&mut self, buf: &mut [u8]) -> Hc12Result<usize> {
            match self.script.lock().unwrap().pop_front() {
                Some(Step::Data(s)) => {
                    let bytes = s.as_bytes();
                    assert!(bytes.len() <= buf.len(), "test step exceeds chunk size");
                    buf[..bytes.len()].copy_from_slice(bytes);
                    Ok(bytes.len())
                }
                Some(Step::Quiet) => Ok(0),
                Some(Step::Broken) => Err(Hc12Error::Serial("device gone".into())),
                None => Err(Hc12Error::ReadTimeout),
            }
        }
        fn close(&mut self) -> Hc12Result<()> {
            Ok(())
        }
        fn is_connected(&self) -> bool {
            self.connected
        }
    }

    struct Rig {
        session: AtSession,
        log: Arc<Mutex<Vec<String>>>,
        script: Arc<Mutex<VecDeque<Step>>>,
    }

    fn rig(steps: Vec<Step>) -> Rig {
        rig_with(steps, true, false)
    }

    fn rig_with(steps: Vec<Step>, connected: bool, write_fails: bool) -> Rig {
        let log = Arc::new(Mutex::new(Vec::new()));
        let script = Arc::new(Mutex::new(VecDeque::from(steps)));
        let serial = ScriptedSerial {
            log: Arc::clone(&log),
            script: Arc::clone(&script),
            connected,
            write_fails,
        };
        let config = SessionConfig {
            reply_delay_ms: 0,
            ..SessionConfig::default()
        };
        Rig {
            session: AtSession::new(Box::new(serial), config),
            log,
            script,
        }
    }

    #[test]
    fn set_channel_confirmed() {
        let mut rig = rig(vec![Step::Data("OK+C021\r\n")]);
        let cmd = AtCommand::set_channel(21).unwrap();
        let update = rig.session.execute(&cmd).unwrap();
        assert_eq!(rig.log.lock().unwrap()[0], "AT+C021\n");
        assert_eq!(update.channel, Some(Channel::new(21).unwrap()));
    }

    #[test]
    fn get_all_split_across_reads() {
        let mut rig = rig(vec![
            Step::Data("OK+B96"),
            Step::Data("00\r\nOK+RC001\r\nOK+R"),
            Step::Data("P:+20dBm\r\nOK+FU3\r\n"),
            Step::Data("leftover"),
        ]);
        let update = rig.session.execute(&AtCommand::GetAll).unwrap();
        assert_eq!(update.baud, Some(BaudRate::B9600));
        assert_eq!(update.channel, Some(Channel::new(1).unwrap()));
        assert_eq!(update.power, Some(PowerLevel::new(8).unwrap()));
        assert_eq!(update.mode, Some(TransmissionMode::Fu3));
        // reading stops as soon as the exchange completes
        assert_eq!(rig.script.lock().unwrap().len(), 1);
    }

    #[test]
    fn silence_is_timeout() {
        let mut rig = rig(vec![]);
        let result = rig.session.execute(&AtCommand::Test);
        assert!(matches!(result, Err(Hc12Error::ReadTimeout)));
    }

    #[test]
    fn quiet_transport_also_ends_the_loop() {
        let mut rig = rig(vec![Step::Quiet, Step::Data("OK\r\n")]);
        let result = rig.session.execute(&AtCommand::Test);
        assert!(matches!(result, Err(Hc12Error::ReadTimeout)));
    }

    #[test]
    fn unterminated_last_line_is_decoded() {
        let mut rig = rig(vec![Step::Data("OK")]);
        assert!(rig.session.execute(&AtCommand::Test).is_ok());
    }

    #[test]
    fn reply_streamed_one_byte_at_a_time() {
        const BANNER: &str = "HC-12_V2.4\r\n";
        let steps = (0..BANNER.len())
            .map(|i| Step::Data(&BANNER[i..i + 1]))
            .collect();
        let mut rig = rig(steps);
        let update = rig.session.execute(&AtCommand::GetVersion).unwrap();
        let version = update.firmware.unwrap();
        assert_eq!((version.major, version.minor), (2, 4));
    }

    #[test]
    fn echoed_request_is_skipped() {
        let mut rig = rig(vec![Step::Data("AT+RB\r\nOK+B9600\r\n")]);
        let update = rig.session.execute(&AtCommand::GetBaud).unwrap();
        assert_eq!(update.baud, Some(BaudRate::B9600));
    }

    #[test]
    fn unrecognized_reply_drains_stale_bytes() {
        let mut rig = rig(vec![
            Step::Data("ERROR\r\n"),
            Step::Data("junk"),
            Step::Data("more junk"),
            Step::Quiet,
            Step::Data("next"),
        ]);
        let result = rig.session.execute(&AtCommand::GetBaud);
        assert!(matches!(result, Err(Hc12Error::Unrecognized(_))));
        // drain consumed up to the quiet read and left the rest alone
        assert_eq!(rig.script.lock().unwrap().len(), 1);
    }

    #[test]
    fn drain_is_bounded_by_read_count() {
        let mut steps = vec![Step::Data("ERROR\r\n")];
        steps.extend((0..100).map(|_| Step::Data("noise")));
        let mut rig = rig(steps);
        assert!(rig.session.execute(&AtCommand::Test).is_err());
        let drained = 100 - rig.script.lock().unwrap().len();
        assert_eq!(drained, SessionConfig::default().drain_max_reads);
    }

    #[test]
    fn get_all_one_byte_per_read() {
        const REPLY: &str = "OK+B9600\r\nOK+RC001\r\nOK+RP:+20dBm\r\nOK+FU3\r\n";
        let mut steps: Vec<Step> = (0..REPLY.len())
            .map(|i| Step::Data(&REPLY[i..i + 1]))
            .collect();
        steps.push(Step::Data("OK\r\n"));
        let mut rig = rig(steps);

        let update = rig.session.execute(&AtCommand::GetAll).unwrap();
        assert_eq!(update.mode, Some(TransmissionMode::Fu3));
        rig.session.execute(&AtCommand::Test).unwrap();
        assert!(rig.script.lock().unwrap().is_empty());
    }

    #[test]
    fn reply_cut_short_is_drained() {
        let mut rig = rig(vec![
            Step::Data("OK+B9600\r\nOK+RC001\r\n"),
            Step::Quiet,
            Step::Data("OK+RP:+20dBm\r\n"),
            Step::Data("OK+FU3\r\n"),
            Step::Quiet,
            Step::Data("OK\r\n"),
        ]);
        assert!(matches!(
            rig.session.execute(&AtCommand::GetAll),
            Err(Hc12Error::FieldCount { decoded: 2, .. })
        ));
        // the late tail went to the drain, not to the next command
        rig.session.execute(&AtCommand::Test).unwrap();
    }

    #[test]
    fn reply_window_caps_reading() {
        let mut rig = rig((0..64).map(|_| Step::Data("x")).collect());
        rig.session.config.reply_window_ms = 0;
        assert!(matches!(
            rig.session.execute(&AtCommand::Test),
            Err(Hc12Error::ReadTimeout)
        ));
        let left = rig.script.lock().unwrap().len();
        assert_eq!(64 - left, SessionConfig::default().drain_max_reads);
    }

    #[test]
    fn baud_mismatch_fails() {
        let mut rig = rig(vec![Step::Data("OK+B19200\r\n")]);
        let cmd = AtCommand::set_baud(9600).unwrap();
        assert!(matches!(
            rig.session.execute(&cmd),
            Err(Hc12Error::Mismatch { .. })
        ));
    }

    #[test]
    fn firmware_update_does_not_read() {
        let mut rig = rig(vec![Step::Data("anything")]);
        rig.session.execute(&AtCommand::FirmwareUpdate).unwrap();
        assert_eq!(rig.log.lock().unwrap()[0], "AT+UPDATE\n");
        assert_eq!(rig.script.lock().unwrap().len(), 1);
    }

    #[test]
    fn read_error_propagates() {
        let mut rig = rig(vec![Step::Broken]);
        assert!(matches!(
            rig.session.execute(&AtCommand::Test),
            Err(Hc12Error::Serial(_))
        ));
    }

    #[test]
    fn write_error_propagates() {
        let mut rig = rig_with(vec![Step::Data("OK\r\n")], true, true);
        assert!(matches!(
            rig.session.execute(&AtCommand::Test),
            Err(Hc12Error::Serial(_))
        ));
    }

    #[test]
    fn disconnected_port_is_rejected_before_write() {
        let mut rig = rig_with(vec![], false, false);
        assert!(matches!(
            rig.session.execute(&AtCommand::Test),
            Err(Hc12Error::NotConnected)
        ));
        assert!(rig.log.lock().unwrap().is_empty());
    }

    #[test]
    fn line_buffer_handles_both_terminators() {
        let mut lines = LineBuffer::default();
        lines.push(b"OK+B9600\r\nOK+RC0");
        assert_eq!(lines.next_line().as_deref(), Some("OK+B9600\r\n"));
        assert_eq!(lines.next_line(), None);
        lines.push(b"01\nOK");
        assert_eq!(lines.next_line().as_deref(), Some("OK+RC001\n"));
        assert_eq!(lines.take_rest().as_deref(), Some("OK"));
        assert_eq!(lines.take_rest(), None);
    }
}
