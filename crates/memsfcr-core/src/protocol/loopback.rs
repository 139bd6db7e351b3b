//! Synthetic ECU
//!
//! Answers every command from the response table without any hardware attached.

use std::sync::Arc;

use tracing::{debug, info};

use super::{ProtocolError, ResponseTable, Transport};

/// Transport that replies with recorded responses
#[derive(Debug, Clone)]
pub struct LoopbackTransport {
    responses: Arc<ResponseTable>,
    connected: bool,
}

impl LoopbackTransport {
    /// Answer from `responses`
    pub fn new(responses: Arc<ResponseTable>) -> Self {
        Self {
            responses,
            connected: false,
        }
    }
}

impl Default for LoopbackTransport {
    fn default() -> Self {
        Self::new(ResponseTable::shared())
    }
}

impl Transport for LoopbackTransport {
    fn connect(&mut self) -> Result<bool, ProtocolError> {
        info!("connected to loopback ECU");
        self.connected = true;
        Ok(true)
    }

    fn send_and_receive(&mut self, command: &[u8]) -> Result<Vec<u8>, ProtocolError> {
        if !self.connected {
            return Err(ProtocolError::NotConnected);
        }
        let code = command.first().copied().ok_or(ProtocolError::EmptyCommand)?;

        let response = self.responses.respond(code);
        debug!(
            command = %format!("{:02X}", code),
            response = %hex::encode_upper(&response),
            "loopback response"
        );
        Ok(response)
    }

    fn disconnect(&mut self) -> Result<(), ProtocolError> {
        if self.connected {
            info!("disconnected from loopback ECU");
        }
        self.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_connect() {
        let mut transport = LoopbackTransport::default();
        assert!(matches!(
            transport.send_and_receive(&[0x80]),
            Err(ProtocolError::NotConnected)
        ));
    }

    #[test]
    fn test_echo_and_default_responses() {
        let mut transport = LoopbackTransport::default();
        transport.connect().unwrap();
        assert_eq!(transport.send_and_receive(&[0x0a]).unwrap(), vec![0x0a]);
        assert_eq!(
            transport.send_and_receive(&[0x20]).unwrap(),
            vec![0x20, 0x00]
        );
        assert_eq!(transport.send_and_receive(&[0x80]).unwrap().len(), 29);
    }
}
