// SPDX-FileCopyrightText: Copyright (c) 2018-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{error::*, frame::*};
use byteorder::{BigEndian, ByteOrder};

pub mod rtu;

type Result<T> = core::result::Result<T, Error>;

impl From<ExceptionResponse> for [u8; 2] {
    fn from(ex: ExceptionResponse) -> [u8; 2] {
        [ex.function.value() | 0x80, ex.exception as u8]
    }
}

impl From<Error> for Exception {
    /// The exception that answers a request PDU which failed to decode.
    fn from(err: Error) -> Self {
        match err {
            Error::FnCode(_) => Self::IllegalFunction,
            _ => Self::IllegalDataValue,
        }
    }
}

impl<'r> TryFrom<&'r [u8]> for Request<'r> {
    type Error = Error;

    fn try_from(bytes: &'r [u8]) -> Result<Self> {
        let Some(&fn_code) = bytes.first() else {
            return Err(Error::BufferSize);
        };
        let function = FunctionCode::new(fn_code);
        if !function.is_supported() {
            return Err(Error::FnCode(fn_code));
        }
        if bytes.len() < min_request_pdu_len(function) {
            return Err(Error::BufferSize);
        }

        use crate::frame::Request::*;
        use FunctionCode as f;

        let addr = BigEndian::read_u16(&bytes[1..3]);
        let payload = BigEndian::read_u16(&bytes[3..5]);

        let req = match function {
            f::ReadCoils => ReadCoils(addr, payload),
            f::ReadDiscreteInputs => ReadDiscreteInputs(addr, payload),
            f::ReadHoldingRegisters => ReadHoldingRegisters(addr, payload),
            f::ReadInputRegisters => ReadInputRegisters(addr, payload),
            f::WriteSingleCoil => WriteSingleCoil(addr, u16_coil_to_bool(payload)?),
            f::WriteSingleRegister => WriteSingleRegister(addr, payload),
            f::WriteMultipleCoils => {
                let quantity = usize::from(payload);
                let data = payload_data(bytes);
                WriteMultipleCoils(addr, Coils { quantity, data })
            }
            f::WriteMultipleRegisters => {
                let quantity = usize::from(payload);
                let byte_count = bytes[5];
                if usize::from(byte_count) != quantity * 2 {
                    return Err(Error::ByteCount(byte_count));
                }
                let data = payload_data(bytes);
                WriteMultipleRegisters(addr, Words { quantity, data })
            }
            f::Custom(code) => return Err(Error::FnCode(code)),
        };
        Ok(req)
    }
}

/// The data bytes of a multi-write PDU, limited by both the declared
/// byte count and the bytes actually received.
fn payload_data(bytes: &[u8]) -> &[u8] {
    let declared = 6 + usize::from(bytes[5]);
    &bytes[6..declared.min(bytes.len())]
}

impl Response<'_> {
    /// Serialize the PDU into `buf`, returning the number of bytes written.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize> {
        let len = self.pdu_len();
        if buf.len() < len {
            return Err(Error::BufferSize);
        }
        buf[0] = FunctionCode::from(*self).value();

        use crate::frame::Response::*;

        match *self {
            ReadCoils(coils) | ReadDiscreteInputs(coils) => {
                buf[1] = u8::try_from(len - 2).map_err(|_| Error::BufferSize)?;
                let data = &mut buf[2..len];
                data.fill(0);
                pack_coils(coils, data)?;
            }
            ReadHoldingRegisters(words) | ReadInputRegisters(words) => {
                buf[1] = u8::try_from(words.len() * 2).map_err(|_| Error::BufferSize)?;
                for (word, chunk) in words.iter().zip(buf[2..len].chunks_exact_mut(2)) {
                    BigEndian::write_u16(chunk, *word);
                }
            }
            WriteSingleCoil(addr, coil) => {
                BigEndian::write_u16(&mut buf[1..3], addr);
                BigEndian::write_u16(&mut buf[3..5], bool_to_u16_coil(coil));
            }
            WriteSingleRegister(addr, payload)
            | WriteMultipleCoils(addr, payload)
            | WriteMultipleRegisters(addr, payload) => {
                BigEndian::write_u16(&mut buf[1..3], addr);
                BigEndian::write_u16(&mut buf[3..5], payload);
            }
        }
        Ok(len)
    }
}

impl ResponsePdu<'_> {
    /// Serialize the PDU into `buf`, returning the number of bytes written.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize> {
        match self.0 {
            Ok(rsp) => rsp.encode(buf),
            Err(ex) => {
                if buf.len() < 2 {
                    return Err(Error::BufferSize);
                }
                let data: [u8; 2] = ex.into();
                buf[..2].copy_from_slice(&data);
                Ok(2)
            }
        }
    }
}

const fn min_request_pdu_len(fn_code: FunctionCode) -> usize {
    use FunctionCode::*;
    match fn_code {
        ReadCoils | ReadDiscreteInputs | ReadHoldingRegisters | ReadInputRegisters
        | WriteSingleCoil | WriteSingleRegister => 5,
        WriteMultipleCoils | WriteMultipleRegisters => 6,
        Custom(_) => 1,
    }
}
