//! `.splat` record decoding
//!
//! A `.splat` body is a flat run of 32-byte little-endian records:
//! position (3 x f32), scale (3 x f32), RGBA (4 x u8), rotation (4 x u8).
//! Only position and color are kept.

use glam::Vec3;

use crate::error::SourceError;

/// Size of one packed record in bytes
pub const RECORD_SIZE: usize = 32;

/// A decoded splat element
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplatPoint {
    pub position: Vec3,
    pub color: [u8; 4],
}

impl SplatPoint {
    pub fn new(position: Vec3, color: [u8; 4]) -> Self {
        Self { position, color }
    }

    /// Encode into a record (scale and rotation zeroed)
    pub fn to_record(&self) -> [u8; RECORD_SIZE] {
        let mut record = [0u8; RECORD_SIZE];
        for (i, value) in self.position.to_array().iter().enumerate() {
            record[i * 4..i * 4 + 4].copy_from_slice(&value.to_le_bytes());
        }
        record[24..28].copy_from_slice(&self.color);
        record
    }
}

fn read_f32(bytes: &[u8], offset: usize) -> f32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[offset..offset + 4]);
    f32::from_le_bytes(raw)
}

/// Decode one record, `None` if `bytes` is shorter than [`RECORD_SIZE`]
fn decode_record(bytes: &[u8]) -> Option<SplatPoint> {
    let record = bytes.get(..RECORD_SIZE)?;
    let position = Vec3::new(read_f32(record, 0), read_f32(record, 4), read_f32(record, 8));
    let mut color = [0u8; 4];
    color.copy_from_slice(&record[24..28]);
    Some(SplatPoint { position, color })
}

/// Decode a complete body in one go
pub fn decode_all(bytes: &[u8]) -> Result<Vec<SplatPoint>, SourceError> {
    let mut assembler = RecordAssembler::default();
    let points = assembler.push(bytes);
    assembler.finish()?;
    Ok(points)
}

/// Reassembles records from arbitrarily sized chunks
#[derive(Debug, Default)]
pub struct RecordAssembler {
    carry: Vec<u8>,
}

impl RecordAssembler {
    /// Decode every complete record available after appending `chunk`
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SplatPoint> {
        let mut points = Vec::new();
        let mut rest = chunk;

        if !self.carry.is_empty() {
            let needed = RECORD_SIZE - self.carry.len();
            let take = needed.min(rest.len());
            self.carry.extend_from_slice(&rest[..take]);
            rest = &rest[take..];
            if self.carry.len() < RECORD_SIZE {
                return points;
            }
            points.extend(decode_record(&self.carry));
            self.carry.clear();
        }

        let mut records = rest.chunks_exact(RECORD_SIZE);
        points.extend(records.by_ref().filter_map(decode_record));
        self.carry.extend_from_slice(records.remainder());
        points
    }

    /// Bytes waiting for the rest of their record
    pub fn pending(&self) -> usize {
        self.carry.len()
    }

    /// End of stream; a dangling partial record is an error
    pub fn finish(self) -> Result<(), SourceError> {
        if self.carry.is_empty() {
            Ok(())
        } else {
            Err(SourceError::Decode(format!(
                "truncated record: {} trailing bytes",
                self.carry.len()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(points: &[SplatPoint]) -> Vec<u8> {
        points.iter().flat_map(|p| p.to_record()).collect()
    }

    fn sample() -> Vec<SplatPoint> {
        vec![
            SplatPoint::new(Vec3::new(1.0, -2.0, 0.5), [255, 0, 0, 255]),
            SplatPoint::new(Vec3::new(-4.0, 3.25, 9.0), [0, 128, 64, 200]),
            SplatPoint::new(Vec3::ZERO, [1, 2, 3, 4]),
        ]
    }

    #[test]
    fn test_decode_record_reads_position_and_color() {
        let mut record = [0u8; RECORD_SIZE];
        record[0..4].copy_from_slice(&1.5f32.to_le_bytes());
        record[4..8].copy_from_slice(&(-2.0f32).to_le_bytes());
        record[8..12].copy_from_slice(&8.0f32.to_le_bytes());
        // scale is ignored
        record[12..16].copy_from_slice(&99.0f32.to_le_bytes());
        record[24..28].copy_from_slice(&[10, 20, 30, 40]);

        let point = decode_record(&record).unwrap();
        assert_eq!(point.position, Vec3::new(1.5, -2.0, 8.0));
        assert_eq!(point.color, [10, 20, 30, 40]);
    }

    #[test]
    fn test_short_record_decodes_to_none() {
        let record = sample()[0].to_record();
        assert_eq!(decode_record(&record[..RECORD_SIZE - 1]), None);
        assert_eq!(decode_record(&[]), None);
        assert_eq!(decode_record(&record), Some(sample()[0]));
    }

    #[test]
    fn test_assembler_handles_split_records() {
        let points = sample();
        let bytes = body(&points);
        let mut assembler = RecordAssembler::default();

        let mut decoded = Vec::new();
        for chunk in bytes.chunks(7) {
            decoded.extend(assembler.push(chunk));
        }

        assert_eq!(decoded, points);
        assert_eq!(assembler.pending(), 0);
        assert!(assembler.finish().is_ok());
    }

    #[test]
    fn test_truncated_body_is_rejected() {
        let mut bytes = body(&sample());
        bytes.truncate(bytes.len() - 5);

        let result = decode_all(&bytes);
        assert!(matches!(result, Err(SourceError::Decode(_))));
    }

    #[test]
    fn test_empty_body_decodes_to_nothing() {
        assert!(decode_all(&[]).unwrap().is_empty());
    }
}
