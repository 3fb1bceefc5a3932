//! OTP command frames and feature report layout

use super::{Report, REPORT_SIZE};
use crate::{Error, Result};

/// Data bytes carried by each report
pub const REPORT_DATA_SIZE: usize = REPORT_SIZE - 1;

/// Size of a command payload
pub const SLOT_DATA_SIZE: usize = 64;

/// Payload, slot, CRC and three reserved bytes
pub const FRAME_SIZE: usize = SLOT_DATA_SIZE + 6;

/// Number of reports a frame is split into
pub const CHUNK_COUNT: usize = FRAME_SIZE / REPORT_DATA_SIZE;

/// Report carries response data
pub const RESP_PENDING_FLAG: u8 = 0x40;

/// Device is busy consuming a written report
pub const SLOT_WRITE_FLAG: u8 = 0x80;

/// Device is waiting for the user to touch it
pub const RESP_TIMEOUT_WAIT_FLAG: u8 = 0x20;

/// Sequence number bits of the status byte
pub const SEQUENCE_MASK: u8 = 0x1f;

/// Offset of the status byte within a report
pub const STATUS_OFFSET: usize = REPORT_DATA_SIZE;

/// Offset of the programming sequence counter within a status report
pub const STATUS_OFFSET_PROG_SEQ: usize = 4;

/// Offset of the touch level (low byte) within a status report
pub const STATUS_OFFSET_TOUCH_LOW: usize = 5;

/// Bits of the touch level byte telling which slots hold a configuration
pub const CONFIG_SLOTS_PROGRAMMED_MASK: u8 = 0b0000_0011;

/// CRC over data followed by its checksum
pub const CRC_OK_RESIDUAL: u16 = 0xf0b8;

/// Report written to reset the device's read state
pub const DUMMY_REPORT: Report = [0, 0, 0, 0, 0, 0, 0, 0xff];

/// CRC-16 (polynomial 0x8408 reflected, initial value 0xffff, no final XOR)
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xffff;

    for &byte in data {
        crc ^= u16::from(byte);

        for _ in 0..8 {
            let lsb = crc & 1;
            crc >>= 1;

            if lsb == 1 {
                crc ^= 0x8408;
            }
        }
    }

    crc
}

/// Check data followed by the one's complement of its CRC (little endian),
/// as appended to device responses.
pub fn check_crc(data: &[u8]) -> bool {
    crc16(data) == CRC_OK_RESIDUAL
}

/// Build the frame for a command: zero-padded payload, slot, little endian
/// CRC of the padded payload and three reserved bytes.
pub fn format_frame(slot: u8, payload: &[u8]) -> Result<[u8; FRAME_SIZE]> {
    if payload.len() > SLOT_DATA_SIZE {
        return Err(Error::SizeError);
    }

    let mut frame = [0u8; FRAME_SIZE];
    frame[..payload.len()].copy_from_slice(payload);

    let crc = crc16(&frame[..SLOT_DATA_SIZE]);
    frame[SLOT_DATA_SIZE] = slot;
    frame[SLOT_DATA_SIZE + 1..SLOT_DATA_SIZE + 3].copy_from_slice(&crc.to_le_bytes());

    Ok(frame)
}

/// Should the chunk at `index` be written?
///
/// The first and last chunks always are; the device ignores skipped
/// all-zero chunks in between.
pub fn should_send(chunk: &[u8], index: usize) -> bool {
    index == 0 || index == CHUNK_COUNT - 1 || chunk.iter().any(|&b| b != 0)
}

/// Reports to write for a frame, in order
pub fn frame_reports(frame: &[u8; FRAME_SIZE]) -> impl Iterator<Item = Report> + '_ {
    frame
        .chunks(REPORT_DATA_SIZE)
        .enumerate()
        .filter(|(index, chunk)| should_send(chunk, *index))
        .map(|(index, chunk)| {
            let mut report = [0u8; REPORT_SIZE];
            report[..REPORT_DATA_SIZE].copy_from_slice(chunk);
            report[STATUS_OFFSET] = SLOT_WRITE_FLAG | index as u8;
            report
        })
}

/// Has the programming sequence advanced past `prev_seq`?
///
/// Besides a plain increment, the counter drops to zero when the last
/// configured slot has been deleted.
pub fn is_sequence_updated(report: &Report, prev_seq: u8) -> bool {
    let next_seq = report[STATUS_OFFSET_PROG_SEQ];
    let empty = report[STATUS_OFFSET_TOUCH_LOW] & CONFIG_SLOTS_PROGRAMMED_MASK == 0;
    next_seq == prev_seq.wrapping_add(1) || (next_seq == 0 && prev_seq > 0 && empty)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc_residual() {
        for data in [&b""[..], &b"123456789"[..], &[0u8; 64][..], &[0xa5; 13][..]] {
            let mut buffer = data.to_vec();
            buffer.extend_from_slice(&(!crc16(data)).to_le_bytes());
            assert!(check_crc(&buffer));

            let last = buffer.len() - 1;
            buffer[last] ^= 0x01;
            assert!(!check_crc(&buffer));
        }
    }

    #[test]
    fn crc_check_value() {
        // CRC-16/X-25 check value is the complement of the register
        assert_eq!(!crc16(b"123456789"), 0x906e);
    }

    #[test]
    fn frame_layout() {
        let frame = format_frame(0x30, b"challenge").unwrap();
        assert_eq!(&frame[..9], b"challenge");
        assert!(frame[9..SLOT_DATA_SIZE].iter().all(|&b| b == 0));
        assert_eq!(frame[64], 0x30);

        let crc = crc16(&frame[..SLOT_DATA_SIZE]);
        assert_eq!(frame[65..67], crc.to_le_bytes());
        assert_eq!(frame[67..], [0, 0, 0]);

        assert_eq!(format_frame(0x30, &[0; 65]), Err(Error::SizeError));
    }

    #[test]
    fn chunk_skipping() {
        let zeros = [0u8; REPORT_DATA_SIZE];
        assert!(should_send(&zeros, 0));
        assert!(should_send(&zeros, CHUNK_COUNT - 1));

        for index in 1..CHUNK_COUNT - 1 {
            assert!(!should_send(&zeros, index));
            assert!(should_send(&[0, 0, 0, 1, 0, 0, 0], index));
        }
    }

    #[test]
    fn reports_for_empty_payload() {
        let frame = format_frame(0x10, &[]).unwrap();
        let reports: Vec<_> = frame_reports(&frame).collect();
        let crc = crc16(&[0; SLOT_DATA_SIZE]).to_le_bytes();

        assert_eq!(
            reports,
            [
                [0, 0, 0, 0, 0, 0, 0, 0x80],
                [0, 0x10, crc[0], crc[1], 0, 0, 0, 0x89],
            ]
        );
    }

    #[test]
    fn sequence_progression() {
        let report = |seq: u8, touch_low: u8| [0, 5, 4, 3, seq, touch_low, 0, 0];

        assert!(is_sequence_updated(&report(6, 0x03), 5));
        assert!(!is_sequence_updated(&report(5, 0x03), 5));
        assert!(!is_sequence_updated(&report(7, 0x03), 5));

        // reset to zero once no slots are configured
        assert!(is_sequence_updated(&report(0, 0x00), 5));
        assert!(!is_sequence_updated(&report(0, 0x01), 5));
        assert!(!is_sequence_updated(&report(0, 0x00), 0));

        assert!(is_sequence_updated(&report(0, 0x02), 0xff));
    }
}
