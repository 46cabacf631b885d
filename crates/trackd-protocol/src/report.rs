//! Little-endian record parsing and building

use trackd_errors::{ProtocolError, ProtocolResult};

/// Cursor over a borrowed record buffer.
pub struct ReportParser<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> ReportParser<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn read_u8(&mut self) -> ProtocolResult<u8> {
        let value = *self
            .buffer
            .get(self.position)
            .ok_or(ProtocolError::UnexpectedEnd)?;
        self.position += 1;
        Ok(value)
    }

    pub fn read_bytes(&mut self, count: usize) -> ProtocolResult<&'a [u8]> {
        let end = self
            .position
            .checked_add(count)
            .ok_or(ProtocolError::UnexpectedEnd)?;
        let bytes = self
            .buffer
            .get(self.position..end)
            .ok_or(ProtocolError::UnexpectedEnd)?;
        self.position = end;
        Ok(bytes)
    }

    fn read_array<const N: usize>(&mut self) -> ProtocolResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_i16_le(&mut self) -> ProtocolResult<i16> {
        Ok(i16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32_le(&mut self) -> ProtocolResult<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    /// Wire floats are little-endian regardless of host byte order.
    pub fn read_f32_le(&mut self) -> ProtocolResult<f32> {
        Ok(f32::from_le_bytes(self.read_array()?))
    }

    /// Three consecutive floats that must all be finite.
    pub fn read_vec3_finite(&mut self, field: &'static str) -> ProtocolResult<[f32; 3]> {
        let v = [self.read_f32_le()?, self.read_f32_le()?, self.read_f32_le()?];
        if v.iter().all(|c| c.is_finite()) {
            Ok(v)
        } else {
            Err(ProtocolError::NonFinite(field))
        }
    }

    pub fn skip(&mut self, count: usize) -> ProtocolResult<()> {
        self.read_bytes(count).map(|_| ())
    }
}

/// Growable little-endian record writer.
#[derive(Debug, Clone, Default)]
pub struct ReportBuilder {
    buffer: Vec<u8>,
}

impl ReportBuilder {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    pub fn write_u8(&mut self, value: u8) -> &mut Self {
        self.buffer.push(value);
        self
    }

    pub fn write_bytes(&mut self, data: &[u8]) -> &mut Self {
        self.buffer.extend_from_slice(data);
        self
    }

    pub fn write_i16_le(&mut self, value: i16) -> &mut Self {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_u32_le(&mut self, value: u32) -> &mut Self {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_f32_le(&mut self, value: f32) -> &mut Self {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_vec3(&mut self, v: [f32; 3]) -> &mut Self {
        for c in v {
            self.write_f32_le(c);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buffer
    }
}
