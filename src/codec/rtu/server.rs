// SPDX-FileCopyrightText: Copyright (c) 2018-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Modbus RTU server (slave) specific functions.
use super::*;

/// Decode an RTU request addressed to `slave`.
///
/// The outer result fails for frames that must be dropped silently
/// (wrong slave, bad CRC, truncated). The inner result carries the
/// exception that answers a PDU which could not be decoded.
pub fn decode_request(
    slave: SlaveId,
    buf: &[u8],
) -> Result<core::result::Result<RequestAdu<'_>, ExceptionResponse>> {
    let DecodedFrame { slave, pdu } = extract_frame(slave, buf)?;
    let hdr = Header { slave };
    // The frame's bytes have already been verified with the CRC,
    // a PDU that fails to decode is answered, not dropped.
    let adu = Request::try_from(pdu)
        .map(|pdu| RequestAdu { hdr, pdu })
        .map_err(|err| {
            #[cfg(feature = "log")]
            log::debug!("Failed to decode request PDU: {err}");
            ExceptionResponse {
                function: FunctionCode::new(pdu[0]),
                exception: err.into(),
            }
        });
    Ok(adu)
}

/// Encode an RTU response.
///
/// The two trailing CRC bytes are reserved and zeroed,
/// [`seal`] fills them in.
pub fn encode_response(adu: ResponseAdu<'_>, buf: &mut [u8]) -> Result<usize> {
    let ResponseAdu { hdr, pdu } = adu;
    if buf.len() < 2 {
        return Err(Error::BufferSize);
    }
    let len = pdu.encode(&mut buf[1..])?;
    if buf.len() < len + 1 + CRC_LEN {
        return Err(Error::BufferSize);
    }
    buf[0] = hdr.slave;
    buf[len + 1..len + 1 + CRC_LEN].fill(0);
    Ok(len + 1 + CRC_LEN)
}
