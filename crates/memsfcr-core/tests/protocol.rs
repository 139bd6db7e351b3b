use memsfcr_core::protocol::{
    CommunicationChannel, ConnectionConfig, ConnectionState, EcuTransport, MemsTransport,
    ProtocolError, ResponseTable, Transport, TransportKind, SAMPLE_DATAFRAME_80,
};
use pretty_assertions::assert_eq;
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Simulated ECU on the far end of a byte channel
struct SimulatedEcu {
    responses: ResponseTable,
    pending: VecDeque<u8>,
    sent: Arc<Mutex<Vec<u8>>>,
    /// Replace the echo of every response with this byte
    corrupt_echo: Option<u8>,
    /// Drop bytes past this length from every response
    truncate: Option<usize>,
    /// Answer every read with a single byte at a time
    trickle: bool,
}

impl SimulatedEcu {
    fn new(sent: Arc<Mutex<Vec<u8>>>) -> Self {
        Self {
            responses: ResponseTable::mems(),
            pending: VecDeque::new(),
            sent,
            corrupt_echo: None,
            truncate: None,
            trickle: false,
        }
    }
}

impl Read for SimulatedEcu {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pending.is_empty() {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "no data"));
        }
        let limit = if self.trickle { 1 } else { buf.len() };
        let mut n = 0;
        while n < limit.min(buf.len()) {
            match self.pending.pop_front() {
                Some(b) => {
                    buf[n] = b;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }
}

impl Write for SimulatedEcu {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for &command in buf {
            self.sent.lock().unwrap().push(command);
            let mut response = self.responses.respond(command);
            if let Some(echo) = self.corrupt_echo {
                response[0] = echo;
            }
            if let Some(len) = self.truncate {
                response.truncate(len);
            }
            self.pending.extend(response);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl CommunicationChannel for SimulatedEcu {
    fn set_timeout(&mut self, _timeout: Duration) -> io::Result<()> {
        Ok(())
    }

    fn clear_buffers(&mut self) -> io::Result<()> {
        self.pending.clear();
        Ok(())
    }
}

fn transport_with(
    configure: impl Fn(&mut SimulatedEcu) + Send + 'static,
) -> (MemsTransport<SimulatedEcu>, Arc<Mutex<Vec<u8>>>) {
    let sent = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&sent);
    let config = ConnectionConfig {
        port_name: "sim".to_string(),
        ..ConnectionConfig::default()
    };
    let transport = MemsTransport::with_connector(
        config,
        ResponseTable::shared(),
        Box::new(move |_: &ConnectionConfig| {
            let mut ecu = SimulatedEcu::new(Arc::clone(&log));
            configure(&mut ecu);
            Ok(ecu)
        }),
    );
    (transport, sent)
}

#[test]
fn test_initialisation_sequence() {
    let (mut transport, sent) = transport_with(|_| {});
    assert!(transport.connect().unwrap());
    assert_eq!(transport.state(), ConnectionState::Connected);
    assert_eq!(*sent.lock().unwrap(), vec![0xca, 0x75, 0xf4, 0xd0, 0xfb]);
}

#[test]
fn test_dataframe_exchange() {
    let (mut transport, _) = transport_with(|ecu| ecu.trickle = true);
    transport.connect().unwrap();

    let frame = transport.send_and_receive(&[0x80]).unwrap();
    assert_eq!(frame, SAMPLE_DATAFRAME_80.to_vec());

    let frame = transport.send_and_receive(&[0x7d]).unwrap();
    assert_eq!(frame.len(), 33);

    let (tx, rx) = transport.counters();
    assert_eq!(tx, 7);
    // CA 75 F4 D0 FB, then both dataframes
    assert_eq!(rx, 1 + 1 + 2 + 5 + 2 + 29 + 33);
}

#[test]
fn test_short_response_times_out_with_partial_data() {
    let (mut transport, _) = transport_with(|ecu| ecu.truncate = Some(10));
    // every init response fits in 10 bytes
    transport.connect().unwrap();

    match transport.send_and_receive(&[0x80]) {
        Err(ProtocolError::Timeout { expected, received }) => {
            assert_eq!(expected, 29);
            assert_eq!(received, SAMPLE_DATAFRAME_80[..10].to_vec());
        }
        other => panic!("expected timeout, got {:?}", other),
    }
}

#[test]
fn test_unechoed_initialisation_is_not_an_ecu() {
    let (mut transport, _) = transport_with(|ecu| ecu.corrupt_echo = Some(0x00));
    assert!(!transport.connect().unwrap());
    assert_eq!(transport.state(), ConnectionState::Disconnected);
    assert!(!transport.is_connected());
}

#[test]
fn test_send_requires_connection() {
    let (mut transport, sent) = transport_with(|_| {});
    assert!(matches!(
        transport.send_and_receive(&[0x80]),
        Err(ProtocolError::NotConnected)
    ));
    assert!(sent.lock().unwrap().is_empty());

    transport.connect().unwrap();
    transport.disconnect().unwrap();
    transport.disconnect().unwrap();
    assert!(matches!(
        transport.send_and_receive(&[0x80]),
        Err(ProtocolError::NotConnected)
    ));
}

#[test]
fn test_protocol_error_recoverability() {
    let timeout = ProtocolError::Timeout {
        expected: 29,
        received: vec![0x80],
    };
    assert!(timeout.is_recoverable());
    assert_eq!(timeout.partial_response(), Some(&[0x80][..]));
    assert!(!ProtocolError::NotConnected.is_recoverable());
    assert!(!ProtocolError::ConnectionFailed("gone".into()).is_recoverable());
}

#[test]
fn test_loopback_descriptor() {
    let config = memsfcr_core::config::MemsConfig::default();
    let mut transport = EcuTransport::from_descriptor("Loopback", &config);
    assert_eq!(transport.kind(), TransportKind::Loopback);
    assert!(transport.connect().unwrap());
    assert_eq!(transport.send_and_receive(&[0xfb]).unwrap(), vec![0xfb, 0x80]);
}
