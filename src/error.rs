use thiserror::Error;

pub type ClassFileResult<T> = Result<T, ClassFileError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassFileError {
    #[error("bad magic number {found:#010x}, not a compiled class file")]
    BadMagic { found: u32 },

    #[error("unexpected end of class data at byte {offset}: needed {needed}, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// A modified-UTF8 string could not be decoded. Offsets are relative to
    /// the start of the string payload.
    #[error("malformed modified UTF-8 at byte {offset}: {reason}")]
    MalformedString { offset: usize, reason: &'static str },

    #[error("unknown constant pool tag {tag} at pool index {index} (byte {offset})")]
    UnknownTag { tag: u8, index: u16, offset: usize },
}

impl ClassFileError {
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::BadMagic { .. } | Self::UnknownTag { .. })
    }
}
