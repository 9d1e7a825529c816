use std::num::ParseIntError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TsError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("codec error: {0}")]
    Codec(String),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("sync byte mismatch: 0x{0:02x}")]
    SyncByte(u8),

    #[error("invalid PES start code prefix 0x{0:06x}")]
    PesStartCode(u32),

    #[error("PES header error: {0}")]
    PesHeader(String),

    #[error("CRC mismatch in table 0x{table_id:02x}: expected 0x{expected:08x}, got 0x{actual:08x}")]
    CrcMismatch {
        table_id: u8,
        expected: u32,
        actual: u32,
    },

    #[error("truncated {what}: need {needed} bytes, have {available}")]
    Truncated {
        what: &'static str,
        needed: usize,
        available: usize,
    },

    #[error("parse int error: {0}")]
    ParseInt(#[from] ParseIntError),
}

pub type Result<T> = std::result::Result<T, TsError>;
