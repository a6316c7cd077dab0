use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const BOUNCEABLE_TAG: u8 = 0x11;
const NON_BOUNCEABLE_TAG: u8 = 0x51;
const TESTNET_FLAG: u8 = 0x80;

/// Length of the user-friendly form: 36 bytes base64-encoded without padding.
const FRIENDLY_LEN: usize = 48;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    pub fn is_testnet(&self) -> bool {
        matches!(self, Network::Testnet)
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Mainnet => write!(f, "mainnet"),
            Network::Testnet => write!(f, "testnet"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("address is neither raw nor user-friendly form: {0}")]
    Malformed(String),
    #[error("unsupported workchain {0}")]
    UnsupportedWorkchain(i32),
    #[error("user-friendly address checksum mismatch")]
    BadChecksum,
    #[error("unknown address tag byte {0:#04x}")]
    UnknownTag(u8),
}

/// A TON account address: workchain plus the 32-byte account hash.
///
/// Parses from the raw form (`0:abc...`) and from the 48-character
/// user-friendly form in either base64 alphabet. The user-friendly rendering
/// always takes an explicit `(bounceable, network)` pair; there is no
/// default encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TonAddress {
    workchain: i8,
    hash: [u8; 32],
}

impl TonAddress {
    pub fn new(workchain: i8, hash: [u8; 32]) -> Self {
        Self { workchain, hash }
    }

    pub fn workchain(&self) -> i8 {
        self.workchain
    }

    pub fn hash(&self) -> &[u8; 32] {
        &self.hash
    }

    pub fn to_raw(&self) -> String {
        format!("{}:{}", self.workchain, hex::encode(self.hash))
    }

    pub fn to_friendly(&self, bounceable: bool, network: Network) -> String {
        let mut tag = if bounceable {
            BOUNCEABLE_TAG
        } else {
            NON_BOUNCEABLE_TAG
        };
        if network.is_testnet() {
            tag |= TESTNET_FLAG;
        }

        let mut bytes = [0u8; 36];
        bytes[0] = tag;
        bytes[1] = self.workchain as u8;
        bytes[2..34].copy_from_slice(&self.hash);
        let checksum = crc16(&bytes[..34]);
        bytes[34] = (checksum >> 8) as u8;
        bytes[35] = (checksum & 0xff) as u8;

        URL_SAFE_NO_PAD.encode(bytes)
    }

    fn from_raw(text: &str) -> Result<Self, AddressError> {
        let (workchain, hash) = text
            .split_once(':')
            .ok_or_else(|| AddressError::Malformed(text.to_string()))?;

        let workchain = workchain
            .parse::<i32>()
            .map_err(|_| AddressError::Malformed(text.to_string()))?;
        if workchain != 0 && workchain != -1 {
            return Err(AddressError::UnsupportedWorkchain(workchain));
        }

        let hash = hex::decode(hash).map_err(|_| AddressError::Malformed(text.to_string()))?;
        let hash: [u8; 32] = hash
            .try_into()
            .map_err(|_| AddressError::Malformed(text.to_string()))?;

        Ok(Self {
            workchain: workchain as i8,
            hash,
        })
    }

    fn from_friendly(text: &str) -> Result<Self, AddressError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(text)
            .or_else(|_| STANDARD_NO_PAD.decode(text))
            .map_err(|_| AddressError::Malformed(text.to_string()))?;
        let bytes: [u8; 36] = bytes
            .try_into()
            .map_err(|_| AddressError::Malformed(text.to_string()))?;

        let expected = crc16(&bytes[..34]);
        let found = u16::from_be_bytes([bytes[34], bytes[35]]);
        if expected != found {
            return Err(AddressError::BadChecksum);
        }

        let tag = bytes[0] & !TESTNET_FLAG;
        if tag != BOUNCEABLE_TAG && tag != NON_BOUNCEABLE_TAG {
            return Err(AddressError::UnknownTag(bytes[0]));
        }

        let workchain = match bytes[1] {
            0x00 => 0,
            0xff => -1,
            other => return Err(AddressError::UnsupportedWorkchain(other as i32)),
        };

        let mut hash = [0u8; 32];
        hash.copy_from_slice(&bytes[2..34]);

        Ok(Self { workchain, hash })
    }
}

impl FromStr for TonAddress {
    type Err = AddressError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        if text.contains(':') {
            Self::from_raw(text)
        } else if text.len() == FRIENDLY_LEN {
            Self::from_friendly(text)
        } else {
            Err(AddressError::Malformed(text.to_string()))
        }
    }
}

impl fmt::Display for TonAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_raw())
    }
}

/// CRC-16/XMODEM over the tag, workchain and hash bytes.
fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for &byte in data {
        crc ^= (byte as u16) << 8;
        for _ in 0..8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ 0x1021;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}
