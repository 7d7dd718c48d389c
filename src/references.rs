//! Lightweight reference scan over a class image.
//!
//! Only the constant pool is decoded. Utf8 strings are kept by index, class
//! refs and (for pre-Java-6 classes) name-and-type descriptors are noted, and
//! everything else is read just to stay aligned with the stream. Names are
//! resolved after the pool has been consumed.

use std::collections::{BTreeSet, HashMap};
use tracing::debug;

use crate::class_file::CLASS_MAGIC;
use crate::constant_pool::ConstantPoolEntry;
use crate::error::{ClassFileError, ClassFileResult};
use crate::reader::ClassReader;

/// First major version whose descriptors are not scanned for embedded
/// class names.
pub const JAVA_6_MAJOR: u16 = 50;

const DESCRIPTOR_PREFIXES: &[u8] = b"()[;BCDFIJSZ";

#[derive(Default)]
struct ReferenceScanner {
    strings: HashMap<u16, String>,
    class_name_indices: BTreeSet<u16>,
    descriptor_indices: BTreeSet<u16>,
    legacy_descriptors: bool,
}

impl ReferenceScanner {
    fn scan_pool(&mut self, reader: &mut ClassReader<'_>) -> ClassFileResult<()> {
        let count = reader.read_u2()?;
        let mut index = 1u32;
        while index < u32::from(count) {
            let slot = index as u16;
            index += 1;
            let Some(entry) = ConstantPoolEntry::read(reader, slot)? else {
                continue;
            };
            if entry.is_wide() {
                index += 1;
            }
            match entry {
                ConstantPoolEntry::Utf8(text) => {
                    self.strings.insert(slot, text);
                }
                ConstantPoolEntry::ClassRef(name_index) => {
                    self.class_name_indices.insert(name_index);
                }
                ConstantPoolEntry::NameAndType(nat) if self.legacy_descriptors => {
                    self.descriptor_indices.insert(nat.descriptor_index);
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn into_names(self) -> Vec<String> {
        let mut names = Vec::new();
        for index in &self.class_name_indices {
            if let Some(name) = self.strings.get(index).and_then(|s| clean_class_name(s)) {
                names.push(name.to_string());
            }
        }
        for index in &self.descriptor_indices {
            if let Some(descriptor) = self.strings.get(index) {
                names.extend(descriptor_class_names(descriptor).into_iter().map(str::to_string));
            }
        }
        names
    }
}

/// Class names referenced by a compiled class.
///
/// The result is not deduplicated: a name found both through a class ref and
/// through a descriptor appears twice. A wrong magic number is an error, as
/// is any truncation or unknown tag inside the pool.
pub fn extract_references(bytes: &[u8]) -> ClassFileResult<Vec<String>> {
    let mut reader = ClassReader::new(bytes);
    let magic = reader.read_u4()?;
    if magic != CLASS_MAGIC {
        return Err(ClassFileError::BadMagic { found: magic });
    }
    let _minor = reader.read_u2()?;
    let major = reader.read_u2()?;

    let mut scanner = ReferenceScanner {
        legacy_descriptors: major < JAVA_6_MAJOR,
        ..ReferenceScanner::default()
    };
    scanner.scan_pool(&mut reader)?;
    Ok(scanner.into_names())
}

/// Strips array wrapping from a class-ref name.
///
/// `[[Lcom/foo/Bar;` becomes `com/foo/Bar`; primitive arrays such as `[I`
/// and malformed array names yield `None`. Plain names pass through.
pub fn clean_class_name(name: &str) -> Option<&str> {
    if name.is_empty() {
        return None;
    }
    let Some(open) = name.rfind('[') else {
        return Some(name);
    };
    let rest = name[open + 1..].strip_prefix('L')?;
    let end = rest.find(';')?;
    Some(&rest[..end]).filter(|n| !n.is_empty())
}

/// Every `L<name>;` embedded in a field or method descriptor.
///
/// An `L` that is not at the start of the string counts only when the
/// character before it is descriptor syntax or a primitive type code.
/// Anything else is logged and skipped.
pub fn descriptor_class_names(descriptor: &str) -> Vec<&str> {
    let bytes = descriptor.as_bytes();
    let mut names = Vec::new();
    let mut from = 0;

    while let Some(found) = descriptor[from..].find('L') {
        let start = from + found;
        let Some(len) = descriptor[start + 1..].find(';') else {
            break;
        };
        let end = start + 1 + len;

        if start == 0 || DESCRIPTOR_PREFIXES.contains(&bytes[start - 1]) {
            names.push(&descriptor[start + 1..end]);
        } else {
            debug!(
                descriptor,
                preceding = %char::from(bytes[start - 1]),
                "skipping class name embedded after unexpected character"
            );
        }
        from = end + 1;
    }

    names
}
