//! Response table
//!
//! Maps each command byte to the response a real ECU gives for it. The table sizes
//! reads on the live link and supplies the synthetic answers for the loopback and
//! playback transports.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

/// Response length used for commands that are not in the table: echo plus one value byte
pub const DEFAULT_RESPONSE_SIZE: usize = 2;

/// Recorded 0x80 dataframe (echo, length 0x1c, 28 data bytes)
pub const SAMPLE_DATAFRAME_80: [u8; 29] = [
    0x80, 0x1c, 0x04, 0xa5, 0x4b, 0xff, 0x4c, 0xff, 0x31, 0x82, 0x22, 0x00, 0x20, 0x01, 0x00,
    0x00, 0x00, 0x20, 0x84, 0x78, 0x00, 0x1d, 0x00, 0x44, 0x06, 0x59, 0x10, 0x00, 0x00,
];

/// Recorded 0x7D dataframe (echo, length 0x20, 32 data bytes)
pub const SAMPLE_DATAFRAME_7D: [u8; 33] = [
    0x7d, 0x20, 0x10, 0x14, 0xff, 0x92, 0x40, 0x57, 0xff, 0xff, 0x01, 0x00, 0x80, 0x64, 0x00,
    0xff, 0x64, 0xff, 0xff, 0x30, 0x80, 0x80, 0x0e, 0xff, 0x16, 0x80, 0x1b, 0x00, 0x22, 0x00,
    0x31, 0xc0, 0x1f,
];

/// Immutable command to response lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseTable {
    responses: HashMap<u8, Vec<u8>>,
}

impl ResponseTable {
    /// Create a table from explicit entries
    pub fn new(entries: impl IntoIterator<Item = (u8, Vec<u8>)>) -> Self {
        Self {
            responses: entries.into_iter().collect(),
        }
    }

    /// The responses captured from a MEMS 1.6 ECU
    pub fn mems() -> Self {
        let mut entries: Vec<(u8, Vec<u8>)> = vec![
            // initialisation and echo-only responses
            (0x0a, vec![0x0a]),
            (0xca, vec![0xca]),
            (0x75, vec![0x75]),
            // dataframes
            (0x80, SAMPLE_DATAFRAME_80.to_vec()),
            (0x7d, SAMPLE_DATAFRAME_7D.to_vec()),
            // identity
            (0xd0, vec![0xd0, 0x99, 0x00, 0x03, 0x03]),
            (
                0xd1,
                vec![
                    0xd1, 0x41, 0x42, 0x4e, 0x4d, 0x50, 0x30, 0x30, 0x33, 0x99, 0x00, 0x03, 0x03,
                ],
            ),
            (0xf4, vec![0xf4, 0x00]),
            // adjustments, one step from the default
            (0x79, vec![0x79, 0x8b]),
            (0x7a, vec![0x7a, 0x89]),
            (0x7b, vec![0x7b, 0x1f]),
            (0x7c, vec![0x7c, 0x1d]),
            (0x89, vec![0x89, 0x24]),
            (0x8a, vec![0x8a, 0x22]),
            (0x91, vec![0x91, 0x81]),
            (0x92, vec![0x92, 0x7f]),
            (0x93, vec![0x93, 0x81]),
            (0x94, vec![0x94, 0x7f]),
            (0xfd, vec![0xfd, 0x81]),
            (0xfe, vec![0xfe, 0x7f]),
            // resets
            (0x0f, vec![0x0f, 0x00]),
            (0xcc, vec![0xcc, 0x00]),
            (0xfa, vec![0xfa, 0x00]),
            (0xfb, vec![0xfb, 0x80]),
            // fans only echo when switched on
            (0x1d, vec![0x1d]),
            (0x1e, vec![0x1e]),
            // test commands
            (0xef, vec![0xef, 0x03]),
            (0xf7, vec![0xf7, 0x03]),
            (0xf8, vec![0xf8, 0x02]),
            // purpose unknown, captured from a live ECU
            (0x7e, vec![0x7e, 0x08]),
            (0x7f, vec![0x7f, 0x05]),
            (
                0x82,
                vec![0x82, 0x09, 0x9e, 0x1d, 0x00, 0x00, 0x60, 0x05, 0xff, 0xff],
            ),
            (0xcd, vec![0xcd, 0x01]),
            (0xd2, vec![0xd2, 0x02, 0x01, 0x00, 0x01]),
            (0xd3, vec![0xd3, 0x02, 0x01, 0x00, 0x02]),
            (0xe7, vec![0xe7, 0x02]),
            (0xe8, vec![0xe8, 0x05, 0x26, 0x01, 0x00, 0x01]),
            (0xf0, vec![0xf0, 0x05]),
            // generic
            (0x00, vec![0x00, 0x00]),
        ];

        // actuators and the remaining captured commands answer [command, 0x00]
        let zero_valued = [
            0x11, 0x01, 0x12, 0x02, 0x13, 0x03, 0x18, 0x08, 0x19, 0x09, 0x1b, 0x0b, 0x0d, 0x0e,
            0x65, 0x6d, 0xcb, 0xed, 0xee, 0xf3, 0xf5, 0xf6, 0xfc,
        ];
        entries.extend(zero_valued.iter().map(|&cmd| (cmd, vec![cmd, 0x00])));

        Self::new(entries)
    }

    /// Shared handle for transports built from the same table
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::mems())
    }

    /// Look up the recorded response for a command
    pub fn get(&self, command: u8) -> Option<&[u8]> {
        self.responses.get(&command).map(Vec::as_slice)
    }

    /// Number of bytes to read back after sending `command`
    pub fn response_size(&self, command: u8) -> usize {
        match self.get(command) {
            Some(response) => {
                debug!(
                    command = %format!("{:02X}", command),
                    size = response.len(),
                    "mapped command to response size"
                );
                response.len()
            }
            None => {
                warn!(
                    command = %format!("{:02X}", command),
                    "no response mapped for command, expecting {} bytes",
                    DEFAULT_RESPONSE_SIZE
                );
                DEFAULT_RESPONSE_SIZE
            }
        }
    }

    /// Synthetic response for a command: the recorded bytes, or `[command, 0x00]`
    pub fn respond(&self, command: u8) -> Vec<u8> {
        match self.get(command) {
            Some(response) => response.to_vec(),
            None => {
                warn!(
                    command = %format!("{:02X}", command),
                    "unmapped command, generating default response"
                );
                vec![command, 0x00]
            }
        }
    }

    /// Number of mapped commands
    pub fn len(&self) -> usize {
        self.responses.len()
    }

    /// Check if the table has no entries
    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }
}

impl Default for ResponseTable {
    fn default() -> Self {
        Self::mems()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_sizes() {
        let table = ResponseTable::mems();
        assert_eq!(table.response_size(0x80), 29);
        assert_eq!(table.response_size(0x7d), 33);
        assert_eq!(table.response_size(0xca), 1);
        assert_eq!(table.response_size(0xd0), 5);
        assert_eq!(table.response_size(0x1d), 1);
    }

    #[test]
    fn test_unmapped_command_defaults() {
        let table = ResponseTable::mems();
        assert!(table.get(0x20).is_none());
        assert_eq!(table.response_size(0x20), DEFAULT_RESPONSE_SIZE);
        assert_eq!(table.respond(0x20), vec![0x20, 0x00]);
    }

    #[test]
    fn test_actuator_responses() {
        let table = ResponseTable::mems();
        assert_eq!(table.respond(0x11), vec![0x11, 0x00]);
        assert_eq!(table.respond(0x0b), vec![0x0b, 0x00]);
        assert_eq!(table.respond(0xfb), vec![0xfb, 0x80]);
    }

    #[test]
    fn test_custom_table_is_independent() {
        let table = ResponseTable::new([(0x80, vec![0x80, 0x00])]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.response_size(0x80), 2);
        assert_eq!(ResponseTable::mems().response_size(0x80), 29);
    }
}
