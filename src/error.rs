// SPDX-FileCopyrightText: Copyright (c) 2018-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

use core::fmt;

/// modbus-slave-core Error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Invalid coil value
    CoilValue(u16),
    /// Invalid buffer size
    BufferSize,
    /// Invalid function code
    FnCode(u8),
    /// Invalid byte count
    ByteCount(u8),
    /// Invalid CRC
    Crc(u16, u16),
    /// Frame addressed to another slave
    SlaveId(u8, u8),
    /// Register index outside of the bank
    RegisterIndex(usize),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use Error::*;

        match self {
            CoilValue(v) => write!(f, "Invalid coil value: 0x{v:0>4X}"),
            BufferSize => write!(f, "Invalid buffer size"),
            FnCode(fn_code) => write!(f, "Invalid function code: 0x{fn_code:0>2X}"),
            ByteCount(cnt) => write!(f, "Invalid byte count: {cnt}"),
            Crc(expected, actual) => write!(
                f,
                "Invalid CRC: expected = 0x{expected:0>4X}, actual = 0x{actual:0>4X}"
            ),
            SlaveId(expected, actual) => write!(
                f,
                "Slave mismatch: expected = 0x{expected:0>2X}, actual = 0x{actual:0>2X}"
            ),
            RegisterIndex(idx) => write!(f, "Register index out of range: {idx}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}
