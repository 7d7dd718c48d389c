use tracing::debug;

use crate::descriptor::{ClassDescriptor, MemberDescriptor};
use crate::error::{ClassFileError, ClassFileResult};
use crate::reader::ClassReader;

pub const CLASS_MAGIC: u32 = 0xCAFE_BABE;

/// Result of one parse. The descriptor holds whatever was read before a
/// failure; callers must check `error` before trusting it.
#[derive(Debug)]
pub struct ParseOutcome {
    pub descriptor: ClassDescriptor,
    pub error: Option<ClassFileError>,
}

impl ParseOutcome {
    pub fn is_complete(&self) -> bool {
        self.error.is_none() && self.descriptor.is_valid()
    }

    pub fn into_result(self) -> ClassFileResult<ClassDescriptor> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.descriptor),
        }
    }
}

pub fn parse_class(bytes: &[u8]) -> ParseOutcome {
    let mut descriptor = ClassDescriptor::default();
    let mut reader = ClassReader::new(bytes);
    let error = read_class(&mut reader, &mut descriptor).err();

    match &error {
        Some(err) => debug!(error = %err, "class parse stopped early"),
        None if reader.remaining() > 0 => {
            debug!(trailing = reader.remaining(), "ignoring bytes after class attributes")
        }
        None => {}
    }

    ParseOutcome { descriptor, error }
}

fn read_class(reader: &mut ClassReader<'_>, class: &mut ClassDescriptor) -> ClassFileResult<()> {
    let magic = reader.read_u4()?;
    if magic != CLASS_MAGIC {
        return Err(ClassFileError::BadMagic { found: magic });
    }
    class.valid = true;

    class.minor_version = reader.read_u2()?;
    class.major_version = reader.read_u2()?;

    let pool_count = reader.read_u2()?;
    class.pool.read_entries(reader, pool_count)?;

    class.access_flags = reader.read_u2()?;
    class.this_class = reader.read_u2()?;
    class.super_class = reader.read_u2()?;

    let interface_count = reader.read_u2()?;
    for _ in 0..interface_count {
        class.interface_indices.push(reader.read_u2()?);
    }

    read_members(reader, &mut class.fields)?;
    read_members(reader, &mut class.methods)?;
    skip_attributes(reader)
}

fn read_members(reader: &mut ClassReader<'_>, out: &mut Vec<MemberDescriptor>) -> ClassFileResult<()> {
    let count = reader.read_u2()?;
    out.reserve(usize::from(count));
    for _ in 0..count {
        let member = MemberDescriptor {
            access_flags: reader.read_u2()?,
            name_index: reader.read_u2()?,
            descriptor_index: reader.read_u2()?,
        };
        skip_attributes(reader)?;
        out.push(member);
    }
    Ok(())
}

fn skip_attributes(reader: &mut ClassReader<'_>) -> ClassFileResult<()> {
    let count = reader.read_u2()?;
    for _ in 0..count {
        let _name_index = reader.read_u2()?;
        let len = reader.read_u4()?;
        reader.skip(len as usize)?;
    }
    Ok(())
}
