use tracing::warn;

use crate::error::{ClassFileError, ClassFileResult};

pub struct ClassReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ClassReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    pub fn position(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.offset)
    }

    fn take(&mut self, len: usize) -> ClassFileResult<&'a [u8]> {
        let available = self.remaining();
        if available < len {
            return Err(ClassFileError::Truncated {
                offset: self.offset,
                needed: len,
                available,
            });
        }
        let bytes = &self.data[self.offset..self.offset + len];
        self.offset += len;
        Ok(bytes)
    }

    fn take_array<const N: usize>(&mut self) -> ClassFileResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn read_u1(&mut self) -> ClassFileResult<u8> {
        Ok(self.take_array::<1>()?[0])
    }

    pub fn read_u2(&mut self) -> ClassFileResult<u16> {
        Ok(u16::from_be_bytes(self.take_array()?))
    }

    pub fn read_u4(&mut self) -> ClassFileResult<u32> {
        Ok(u32::from_be_bytes(self.take_array()?))
    }

    pub fn read_i4(&mut self) -> ClassFileResult<i32> {
        Ok(i32::from_be_bytes(self.take_array()?))
    }

    pub fn skip(&mut self, len: usize) -> ClassFileResult<()> {
        self.take(len).map(|_| ())
    }

    /// Reads a u2 length followed by that many modified-UTF8 bytes.
    ///
    /// Running out of data is an error. A payload that is present but
    /// cannot be decoded is logged and yields `None`; the reader is still
    /// positioned after it so the caller can carry on.
    pub fn read_utf8(&mut self) -> ClassFileResult<Option<String>> {
        let len = usize::from(self.read_u2()?);
        let start = self.offset;
        let bytes = self.take(len)?;
        match decode_modified_utf8(bytes) {
            Ok(text) => Ok(Some(text)),
            Err(err) => {
                warn!(offset = start, len, error = %err, "dropping undecodable constant pool string");
                Ok(None)
            }
        }
    }
}

/// Unpaired surrogates become U+FFFD.
pub fn decode_modified_utf8(input: &[u8]) -> ClassFileResult<String> {
    let mut units: Vec<u16> = Vec::with_capacity(input.len());
    let mut index = 0;

    let continuation = |at: usize| -> ClassFileResult<u16> {
        match input.get(at) {
            Some(b) if b & 0xc0 == 0x80 => Ok(u16::from(b & 0x3f)),
            Some(_) => Err(ClassFileError::MalformedString {
                offset: at,
                reason: "expected continuation byte",
            }),
            None => Err(ClassFileError::MalformedString {
                offset: at,
                reason: "truncated multi-byte sequence",
            }),
        }
    };

    while index < input.len() {
        let byte = input[index];
        match byte {
            0x00..=0x7f => {
                units.push(u16::from(byte));
                index += 1;
            }
            0xc0..=0xdf => {
                let b2 = continuation(index + 1)?;
                units.push((u16::from(byte & 0x1f) << 6) | b2);
                index += 2;
            }
            0xe0..=0xef => {
                let b2 = continuation(index + 1)?;
                let b3 = continuation(index + 2)?;
                units.push((u16::from(byte & 0x0f) << 12) | (b2 << 6) | b3);
                index += 3;
            }
            _ => {
                return Err(ClassFileError::MalformedString {
                    offset: index,
                    reason: "invalid leading byte",
                });
            }
        }
    }

    Ok(String::from_utf16_lossy(&units))
}
