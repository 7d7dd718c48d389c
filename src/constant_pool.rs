use serde::Serialize;

use crate::error::{ClassFileError, ClassFileResult};
use crate::reader::ClassReader;

pub const TAG_UTF8: u8 = 1;
pub const TAG_INTEGER: u8 = 3;
pub const TAG_FLOAT: u8 = 4;
pub const TAG_LONG: u8 = 5;
pub const TAG_DOUBLE: u8 = 6;
pub const TAG_CLASS: u8 = 7;
pub const TAG_STRING: u8 = 8;
pub const TAG_FIELD_REF: u8 = 9;
pub const TAG_METHOD_REF: u8 = 10;
pub const TAG_INTERFACE_METHOD_REF: u8 = 11;
pub const TAG_NAME_AND_TYPE: u8 = 12;
pub const TAG_METHOD_HANDLE: u8 = 15;
pub const TAG_METHOD_TYPE: u8 = 16;
pub const TAG_DYNAMIC: u8 = 17;
pub const TAG_INVOKE_DYNAMIC: u8 = 18;
pub const TAG_MODULE: u8 = 19;
pub const TAG_PACKAGE: u8 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemberRef {
    pub class_index: u16,
    pub name_and_type_index: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NameAndType {
    pub name_index: u16,
    pub descriptor_index: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConstantPoolEntry {
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    ClassRef(u16),
    StringRef(u16),
    FieldRef(MemberRef),
    MethodRef(MemberRef),
    InterfaceMethodRef(MemberRef),
    NameAndType(NameAndType),
    MethodHandle { kind: u8, reference_index: u16 },
    MethodType { descriptor_index: u16 },
    Dynamic { bootstrap_index: u16, name_and_type_index: u16 },
    InvokeDynamic { bootstrap_index: u16, name_and_type_index: u16 },
    Module { name_index: u16 },
    Package { name_index: u16 },
}

impl ConstantPoolEntry {
    /// `Ok(None)` is an undecodable utf8 entry; its slot stays empty.
    pub fn read(reader: &mut ClassReader<'_>, index: u16) -> ClassFileResult<Option<Self>> {
        let offset = reader.position();
        let tag = reader.read_u1()?;
        let entry = match tag {
            TAG_UTF8 => match reader.read_utf8()? {
                Some(text) => Self::Utf8(text),
                None => return Ok(None),
            },
            TAG_INTEGER => Self::Integer(reader.read_i4()?),
            TAG_FLOAT => Self::Float(f32::from_bits(reader.read_u4()?)),
            TAG_LONG => Self::Long(read_wide(reader)? as i64),
            TAG_DOUBLE => Self::Double(f64::from_bits(read_wide(reader)?)),
            TAG_CLASS => Self::ClassRef(reader.read_u2()?),
            TAG_STRING => Self::StringRef(reader.read_u2()?),
            TAG_FIELD_REF => Self::FieldRef(read_member_ref(reader)?),
            TAG_METHOD_REF => Self::MethodRef(read_member_ref(reader)?),
            TAG_INTERFACE_METHOD_REF => Self::InterfaceMethodRef(read_member_ref(reader)?),
            TAG_NAME_AND_TYPE => Self::NameAndType(NameAndType {
                name_index: reader.read_u2()?,
                descriptor_index: reader.read_u2()?,
            }),
            TAG_METHOD_HANDLE => Self::MethodHandle {
                kind: reader.read_u1()?,
                reference_index: reader.read_u2()?,
            },
            TAG_METHOD_TYPE => Self::MethodType {
                descriptor_index: reader.read_u2()?,
            },
            TAG_DYNAMIC => Self::Dynamic {
                bootstrap_index: reader.read_u2()?,
                name_and_type_index: reader.read_u2()?,
            },
            TAG_INVOKE_DYNAMIC => Self::InvokeDynamic {
                bootstrap_index: reader.read_u2()?,
                name_and_type_index: reader.read_u2()?,
            },
            TAG_MODULE => Self::Module {
                name_index: reader.read_u2()?,
            },
            TAG_PACKAGE => Self::Package {
                name_index: reader.read_u2()?,
            },
            _ => return Err(ClassFileError::UnknownTag { tag, index, offset }),
        };
        Ok(Some(entry))
    }

    pub fn is_wide(&self) -> bool {
        matches!(self, Self::Long(_) | Self::Double(_))
    }
}

fn read_wide(reader: &mut ClassReader<'_>) -> ClassFileResult<u64> {
    let high = reader.read_u4()?;
    let low = reader.read_u4()?;
    Ok((u64::from(high) << 32) | u64::from(low))
}

fn read_member_ref(reader: &mut ClassReader<'_>) -> ClassFileResult<MemberRef> {
    Ok(MemberRef {
        class_index: reader.read_u2()?,
        name_and_type_index: reader.read_u2()?,
    })
}

#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    slots: Vec<Option<ConstantPoolEntry>>,
}

impl ConstantPool {
    /// On error the entries decoded so far stay in the pool.
    pub fn read_entries(&mut self, reader: &mut ClassReader<'_>, count: u16) -> ClassFileResult<()> {
        self.slots.reserve(usize::from(count));
        let mut index = 1u32;
        while index < u32::from(count) {
            let slot = index as u16;
            let entry = ConstantPoolEntry::read(reader, slot)?;
            let width = match &entry {
                Some(e) if e.is_wide() => 2,
                _ => 1,
            };
            if let Some(entry) = entry {
                self.insert(slot, entry);
            }
            index += width;
        }
        Ok(())
    }

    pub fn insert(&mut self, index: u16, entry: ConstantPoolEntry) {
        let at = usize::from(index);
        if self.slots.len() <= at {
            self.slots.resize(at + 1, None);
        }
        self.slots[at] = Some(entry);
    }

    /// Entry at a 1-based index. Index 0, wide-entry shadow slots and
    /// anything out of range are absent.
    pub fn get(&self, index: u16) -> Option<&ConstantPoolEntry> {
        self.slots.get(usize::from(index)).and_then(Option::as_ref)
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (u16, &ConstantPoolEntry)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|e| (i as u16, e)))
    }

    pub fn utf8(&self, index: u16) -> Option<&str> {
        match self.get(index)? {
            ConstantPoolEntry::Utf8(text) => Some(text),
            _ => None,
        }
    }

    pub fn class_name(&self, index: u16) -> Option<&str> {
        match self.get(index)? {
            ConstantPoolEntry::ClassRef(name_index) => self.utf8(*name_index),
            _ => None,
        }
    }

    pub fn name_and_type(&self, index: u16) -> Option<NameAndType> {
        match self.get(index)? {
            ConstantPoolEntry::NameAndType(nat) => Some(*nat),
            _ => None,
        }
    }

    pub fn member(&self, member: MemberRef) -> Option<(&str, &str, &str)> {
        let class = self.class_name(member.class_index)?;
        let nat = self.name_and_type(member.name_and_type_index)?;
        Some((
            class,
            self.utf8(nat.name_index)?,
            self.utf8(nat.descriptor_index)?,
        ))
    }
}
