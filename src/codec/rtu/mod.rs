// SPDX-FileCopyrightText: Copyright (c) 2018-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Modbus RTU

use super::*;
use crate::SlaveId;

pub mod server;
pub use crate::frame::rtu::*;

// [MODBUS over Serial Line Specification and Implementation Guide V1.02](http://modbus.org/docs/Modbus_over_serial_line_V1_02.pdf), page 13
// "The maximum size of a MODBUS RTU frame is 256 bytes."
pub const MAX_FRAME_LEN: usize = 256;

/// Slave address, function code and the two CRC bytes.
pub const MIN_FRAME_LEN: usize = 4;

/// Number of trailing bytes occupied by the CRC.
pub const CRC_LEN: usize = 2;

/// An extracted RTU PDU frame.
#[cfg_attr(all(feature = "defmt", target_os = "none"), derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedFrame<'a> {
    pub slave: SlaveId,
    pub pdu: &'a [u8],
}

/// Extract the PDU of a complete RTU frame addressed to `slave`.
///
/// The slave address is checked before the CRC, a frame for
/// another device is rejected without looking at its checksum.
#[allow(clippy::similar_names)]
pub fn extract_frame(slave: SlaveId, buf: &[u8]) -> Result<DecodedFrame<'_>> {
    if buf.len() < MIN_FRAME_LEN {
        return Err(Error::BufferSize);
    }
    let (adu_buf, crc_buf) = buf.split_at(buf.len() - CRC_LEN);
    let (slave_id, pdu) = adu_buf.split_at(1);
    let slave_id = slave_id[0];
    if slave_id != slave {
        return Err(Error::SlaveId(slave, slave_id));
    }
    // Read trailing CRC and verify ADU
    let expected_crc = BigEndian::read_u16(crc_buf);
    let actual_crc = crc16(adu_buf);
    if expected_crc != actual_crc {
        return Err(Error::Crc(expected_crc, actual_crc));
    }
    Ok(DecodedFrame {
        slave: slave_id,
        pdu,
    })
}

/// Calculate the CRC (Cyclic Redundancy Check) sum.
///
/// The result is byte swapped: written big-endian it
/// yields the low byte first as required on the wire.
#[must_use]
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc = 0xFFFF;
    for x in data {
        crc ^= u16::from(*x);
        for _ in 0..8 {
            // if we followed clippy's suggestion to move out the crc >>= 1, the condition may not be met any more
            // the recommended action therefore makes no sense and it is better to allow this lint
            #[allow(clippy::branches_sharing_code)]
            if (crc & 0x0001) != 0 {
                crc >>= 1;
                crc ^= 0xA001;
            } else {
                crc >>= 1;
            }
        }
    }
    crc.rotate_right(8)
}

/// The CRC of the first `len` bytes of `buf` as `[low, high]`.
pub fn checksum(buf: &[u8], len: usize) -> Result<[u8; 2]> {
    let data = buf.get(..len).ok_or(Error::BufferSize)?;
    Ok(crc16(data).to_be_bytes())
}

/// Write the CRC of a response frame into its last two bytes.
///
/// An empty frame means "nothing to transmit" and is left untouched.
pub fn seal(frame: &mut [u8]) -> Result<()> {
    if frame.is_empty() {
        return Ok(());
    }
    let Some(len) = frame.len().checked_sub(CRC_LEN) else {
        return Err(Error::BufferSize);
    };
    let crc = checksum(frame, len)?;
    frame[len..].copy_from_slice(&crc);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calc_crc16() {
        let msg = &[0x01, 0x03, 0x08, 0x2B, 0x00, 0x02];
        assert_eq!(crc16(msg), 0xB663);

        let msg = &[0x01, 0x03, 0x04, 0x00, 0x20, 0x00, 0x00];
        assert_eq!(crc16(msg), 0xFBF9);
    }

    #[test]
    fn checksum_is_low_byte_first() {
        let msg = &[0x12, 0x06, 0x22, 0x22, 0xAB, 0xCD, 0x00, 0x00];
        assert_eq!(checksum(msg, 6).unwrap(), [0x9F, 0xBE]);
        assert_eq!(checksum(msg, 9).err(), Some(Error::BufferSize));
        assert_eq!(checksum(&[], 0).unwrap(), [0xFF, 0xFF]);
    }

    #[test]
    fn seal_frames() {
        let frame = &mut [0x12, 0x06, 0x22, 0x22, 0xAB, 0xCD, 0x00, 0x00];
        seal(frame).unwrap();
        assert_eq!(&frame[6..], &[0x9F, 0xBE]);

        let empty: &mut [u8] = &mut [];
        assert!(seal(empty).is_ok());

        assert_eq!(seal(&mut [0x01]).err(), Some(Error::BufferSize));
    }

    #[test]
    fn sealed_frames_pass_validation() {
        let mut seed: u32 = 0x1234_5678;
        let buf = &mut [0_u8; 64];
        for len in MIN_FRAME_LEN..buf.len() {
            for byte in buf[..len].iter_mut() {
                seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                *byte = (seed >> 16) as u8;
            }
            let frame = &mut buf[..len];
            seal(frame).unwrap();
            let slave = frame[0];
            let decoded = extract_frame(slave, frame).unwrap();
            assert_eq!(decoded.slave, slave);
            assert_eq!(decoded.pdu, &frame[1..len - CRC_LEN]);
        }
    }

    mod frame_validation {

        use super::*;

        const FRAME: &[u8] = &[
            0x01, // slave address
            0x03, // function code
            0x04, // byte count
            0x89, //
            0x02, //
            0x42, //
            0xC7, //
            0x00, // crc
            0x9D, // crc
        ];

        #[test]
        fn extract_usual_rtu_frame() {
            let DecodedFrame { slave, pdu } = extract_frame(0x01, FRAME).unwrap();
            assert_eq!(slave, 0x01);
            assert_eq!(pdu, &[0x03, 0x04, 0x89, 0x02, 0x42, 0xC7]);
        }

        #[test]
        fn reject_frame_for_another_slave() {
            assert_eq!(
                extract_frame(0x02, FRAME).err(),
                Some(Error::SlaveId(0x02, 0x01))
            );
        }

        #[test]
        fn slave_is_checked_before_crc() {
            let buf = &[0x05, 0x03, 0x00, 0x00];
            assert_eq!(
                extract_frame(0x01, buf).err(),
                Some(Error::SlaveId(0x01, 0x05))
            );
        }

        #[test]
        fn reject_corrupted_crc() {
            let buf = &mut [0; 9];
            buf.copy_from_slice(FRAME);
            buf[8] ^= 0x01;
            assert_eq!(
                extract_frame(0x01, buf).err(),
                Some(Error::Crc(0x009C, 0x009D))
            );
        }

        #[test]
        fn reject_truncated_frames() {
            assert_eq!(extract_frame(0x01, &[]).err(), Some(Error::BufferSize));
            assert_eq!(
                extract_frame(0x01, &[0x01, 0x03, 0x00]).err(),
                Some(Error::BufferSize)
            );
        }
    }
}
