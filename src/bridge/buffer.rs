//! Checked reader for raw report buffers.

use crate::bridge::{BridgeError, BridgeResult};

/// Little-endian `f32` reader over a raw report buffer.
///
/// Unlike a lenient packet parser, a short read here is a protocol
/// violation: report records are fixed-stride, so truncation is an error
/// rather than a zero-padded field.
pub struct ReportBuffer<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> ReportBuffer<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    pub fn has_remaining(&self) -> bool {
        self.position < self.data.len()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn check_remaining(&self, n: usize) -> BridgeResult<()> {
        if self.remaining() < n {
            Err(BridgeError::ReportDecode {
                reason: format!("not enough data: need {}, have {}", n, self.remaining()),
            })
        } else {
            Ok(())
        }
    }

    pub fn get_f32(&mut self) -> BridgeResult<f32> {
        self.check_remaining(4)?;
        let bytes = [
            self.data[self.position],
            self.data[self.position + 1],
            self.data[self.position + 2],
            self.data[self.position + 3],
        ];
        self.position += 4;
        Ok(f32::from_le_bytes(bytes))
    }
}

/// Decode a whole binary report buffer into its `f32` values.
pub fn decode_values(data: &[u8]) -> BridgeResult<Vec<f32>> {
    if data.len() % 4 != 0 {
        return Err(BridgeError::ReportDecode {
            reason: format!("binary report length {} is not a multiple of 4", data.len()),
        });
    }

    let mut buffer = ReportBuffer::new(data);
    let mut values = Vec::with_capacity(data.len() / 4);
    while buffer.has_remaining() {
        values.push(buffer.get_f32()?);
    }
    Ok(values)
}
