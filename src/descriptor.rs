use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use crate::constant_pool::{ConstantPool, ConstantPoolEntry, MemberRef, NameAndType};

/// Internal name used as the parent of a class whose super index is 0.
pub const ROOT_CLASS_NAME: &str = "java/lang/Object";

pub const PLATFORM_VERSION_OFFSET: i32 = 44;

pub const ACC_PUBLIC: u16 = 0x0001;
pub const ACC_PRIVATE: u16 = 0x0002;
pub const ACC_PROTECTED: u16 = 0x0004;
pub const ACC_STATIC: u16 = 0x0008;
pub const ACC_FINAL: u16 = 0x0010;
pub const ACC_SUPER: u16 = 0x0020;
pub const ACC_SYNCHRONIZED: u16 = 0x0020;
pub const ACC_VOLATILE: u16 = 0x0040;
pub const ACC_TRANSIENT: u16 = 0x0080;
pub const ACC_NATIVE: u16 = 0x0100;
pub const ACC_INTERFACE: u16 = 0x0200;
pub const ACC_ABSTRACT: u16 = 0x0400;
pub const ACC_STRICT: u16 = 0x0800;

const CLASS_FLAG_LABELS: [(u16, &str); 5] = [
    (ACC_PUBLIC, "Public"),
    (ACC_FINAL, "Final"),
    (ACC_SUPER, "Super"),
    (ACC_INTERFACE, "Interface"),
    (ACC_ABSTRACT, "Abstract"),
];

const MEMBER_FLAG_LABELS: [(u16, &str); 12] = [
    (ACC_PUBLIC, "public"),
    (ACC_PRIVATE, "private"),
    (ACC_PROTECTED, "protected"),
    (ACC_STATIC, "static"),
    (ACC_FINAL, "final"),
    (ACC_SYNCHRONIZED, "synchronized"),
    (ACC_VOLATILE, "volatile"),
    (ACC_TRANSIENT, "transient"),
    (ACC_NATIVE, "native"),
    (ACC_INTERFACE, "interface"),
    (ACC_ABSTRACT, "abstract"),
    (ACC_STRICT, "strict"),
];

fn flag_labels<'a>(flags: u16, table: &'a [(u16, &'a str)]) -> Vec<&'a str> {
    table
        .iter()
        .filter(|(bit, _)| flags & bit != 0)
        .map(|(_, label)| *label)
        .collect()
}

pub fn class_access_label(flags: u16) -> String {
    if flags == 0 {
        return "(None)".to_string();
    }
    let labels = flag_labels(flags, &CLASS_FLAG_LABELS);
    if labels.is_empty() {
        return "(Unknown)".to_string();
    }
    labels.join(", ")
}

pub fn member_access_label(flags: u16) -> String {
    flag_labels(flags, &MEMBER_FLAG_LABELS).join(" ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemberDescriptor {
    pub access_flags: u16,
    pub name_index: u16,
    pub descriptor_index: u16,
}

impl MemberDescriptor {
    pub fn name<'p>(&self, pool: &'p ConstantPool) -> Option<&'p str> {
        pool.utf8(self.name_index)
    }

    pub fn type_descriptor<'p>(&self, pool: &'p ConstantPool) -> Option<&'p str> {
        pool.utf8(self.descriptor_index)
    }

    pub fn access_label(&self) -> String {
        member_access_label(self.access_flags)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClassDescriptor {
    pub(crate) valid: bool,
    pub(crate) minor_version: u16,
    pub(crate) major_version: u16,
    pub(crate) access_flags: u16,
    pub(crate) this_class: u16,
    pub(crate) super_class: u16,
    pub(crate) interface_indices: Vec<u16>,
    pub(crate) fields: Vec<MemberDescriptor>,
    pub(crate) methods: Vec<MemberDescriptor>,
    pub(crate) pool: ConstantPool,
}

impl ClassDescriptor {
    /// True once the magic number has been checked. Says nothing about
    /// whether the rest of the image parsed.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn major_version(&self) -> u16 {
        self.major_version
    }

    pub fn minor_version(&self) -> u16 {
        self.minor_version
    }

    pub fn platform_version(&self) -> i32 {
        i32::from(self.major_version) - PLATFORM_VERSION_OFFSET
    }

    pub fn version_string(&self) -> String {
        format!(
            "{}.{}  (Java {})",
            self.major_version,
            self.minor_version,
            self.platform_version()
        )
    }

    pub fn access_flags(&self) -> u16 {
        self.access_flags
    }

    pub fn access_label(&self) -> String {
        class_access_label(self.access_flags)
    }

    pub fn constant_pool(&self) -> &ConstantPool {
        &self.pool
    }

    pub fn class_name(&self) -> Option<&str> {
        self.pool.class_name(self.this_class)
    }

    pub fn parent_name(&self) -> Option<&str> {
        if self.super_class == 0 {
            return Some(ROOT_CLASS_NAME);
        }
        self.pool.class_name(self.super_class)
    }

    pub fn interfaces(&self) -> Vec<&str> {
        self.interface_indices
            .iter()
            .filter_map(|&i| self.pool.class_name(i))
            .collect()
    }

    pub fn fields(&self) -> &[MemberDescriptor] {
        &self.fields
    }

    pub fn methods(&self) -> &[MemberDescriptor] {
        &self.methods
    }

    pub fn integers(&self) -> Vec<i32> {
        self.pool
            .iter()
            .filter_map(|(_, e)| match e {
                ConstantPoolEntry::Integer(v) => Some(*v),
                _ => None,
            })
            .collect()
    }

    pub fn floats(&self) -> Vec<f32> {
        self.pool
            .iter()
            .filter_map(|(_, e)| match e {
                ConstantPoolEntry::Float(v) => Some(*v),
                _ => None,
            })
            .collect()
    }

    pub fn longs(&self) -> Vec<i64> {
        self.pool
            .iter()
            .filter_map(|(_, e)| match e {
                ConstantPoolEntry::Long(v) => Some(*v),
                _ => None,
            })
            .collect()
    }

    pub fn doubles(&self) -> Vec<f64> {
        self.pool
            .iter()
            .filter_map(|(_, e)| match e {
                ConstantPoolEntry::Double(v) => Some(*v),
                _ => None,
            })
            .collect()
    }

    pub fn class_refs(&self) -> BTreeMap<u16, u16> {
        self.pool
            .iter()
            .filter_map(|(i, e)| match e {
                ConstantPoolEntry::ClassRef(name) => Some((i, *name)),
                _ => None,
            })
            .collect()
    }

    pub fn string_refs(&self) -> Vec<u16> {
        self.pool
            .iter()
            .filter_map(|(_, e)| match e {
                ConstantPoolEntry::StringRef(utf8) => Some(*utf8),
                _ => None,
            })
            .collect()
    }

    pub fn field_refs(&self) -> Vec<MemberRef> {
        self.member_refs(|e| match e {
            ConstantPoolEntry::FieldRef(m) => Some(*m),
            _ => None,
        })
    }

    pub fn method_refs(&self) -> Vec<MemberRef> {
        self.member_refs(|e| match e {
            ConstantPoolEntry::MethodRef(m) => Some(*m),
            _ => None,
        })
    }

    pub fn interface_method_refs(&self) -> Vec<MemberRef> {
        self.member_refs(|e| match e {
            ConstantPoolEntry::InterfaceMethodRef(m) => Some(*m),
            _ => None,
        })
    }

    fn member_refs(&self, pick: impl Fn(&ConstantPoolEntry) -> Option<MemberRef>) -> Vec<MemberRef> {
        self.pool.iter().filter_map(|(_, e)| pick(e)).collect()
    }

    pub fn name_and_types(&self) -> BTreeMap<u16, NameAndType> {
        self.pool
            .iter()
            .filter_map(|(i, e)| match e {
                ConstantPoolEntry::NameAndType(nat) => Some((i, *nat)),
                _ => None,
            })
            .collect()
    }

    pub fn referenced_class_names(&self) -> BTreeSet<String> {
        self.class_refs()
            .values()
            .filter_map(|&name| self.pool.utf8(name))
            .map(str::to_string)
            .collect()
    }

    fn member_summary(&self, member: &MemberDescriptor) -> MemberSummary {
        MemberSummary {
            name: member.name(&self.pool).map(str::to_string),
            descriptor: member.type_descriptor(&self.pool).map(str::to_string),
            access_flags: member.access_flags,
            access: member.access_label(),
        }
    }

    fn member_ref_labels(&self, refs: &[MemberRef]) -> Vec<String> {
        refs.iter()
            .map(|r| match self.pool.member(*r) {
                Some((class, name, descriptor)) => format!("{class}.{name}: {descriptor}"),
                None => format!("<unresolved #{}.#{}>", r.class_index, r.name_and_type_index),
            })
            .collect()
    }

    pub fn summary(&self) -> ClassSummary {
        ClassSummary {
            valid: self.valid,
            class_name: self.class_name().map(str::to_string),
            parent_name: self.parent_name().map(str::to_string),
            access_flags: self.access_flags,
            access: self.access_label(),
            major_version: self.major_version,
            minor_version: self.minor_version,
            platform_version: self.platform_version(),
            interfaces: self.interfaces().into_iter().map(str::to_string).collect(),
            fields: self.fields.iter().map(|m| self.member_summary(m)).collect(),
            methods: self.methods.iter().map(|m| self.member_summary(m)).collect(),
            integers: self.integers(),
            floats: self.floats(),
            longs: self.longs(),
            doubles: self.doubles(),
            classes: self.referenced_class_names().into_iter().collect(),
            strings: self
                .string_refs()
                .into_iter()
                .filter_map(|i| self.pool.utf8(i))
                .map(str::to_string)
                .collect(),
            field_refs: self.member_ref_labels(&self.field_refs()),
            method_refs: self.member_ref_labels(&self.method_refs()),
            interface_method_refs: self.member_ref_labels(&self.interface_method_refs()),
        }
    }

    pub fn render_text(&self) -> String {
        if !self.valid {
            return "Invalid class\n".to_string();
        }

        let summary = self.summary();
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Class {} extending {}",
            summary.class_name.as_deref().unwrap_or("<unresolved>"),
            summary.parent_name.as_deref().unwrap_or(ROOT_CLASS_NAME)
        );
        let _ = writeln!(out, "Access Flag ({}): {}", self.access_flags, summary.access);
        let _ = writeln!(out, "Version {}", self.version_string());

        section(&mut out, "Integers", "No integers were found", &summary.integers);
        section(&mut out, "Floats", "No floats were found", &summary.floats);
        section(&mut out, "Longs", "No longs were found", &summary.longs);
        section(&mut out, "Doubles", "No doubles were found", &summary.doubles);
        section(&mut out, "Classes", "No class references were found", &summary.classes);
        section(&mut out, "Strings", "No string references were found", &summary.strings);
        section(&mut out, "Field data", "Field data not found", &summary.field_refs);
        section(&mut out, "Method data", "Method data not found", &summary.method_refs);
        section(
            &mut out,
            "Interface Method data",
            "Interface Method data not found",
            &summary.interface_method_refs,
        );
        section(&mut out, "Interfaces", "No interfaces were found", &summary.interfaces);

        let members = |list: &[MemberSummary]| -> Vec<String> {
            list.iter()
                .map(|m| format!("{} ({})", m.name.as_deref().unwrap_or("<unresolved>"), m.access))
                .collect()
        };
        section(&mut out, "Fields", "No fields were found", &members(&summary.fields));
        section(&mut out, "Methods", "No methods were found", &members(&summary.methods));
        out
    }
}

fn section<T: std::fmt::Display>(out: &mut String, title: &str, empty: &str, items: &[T]) {
    if items.is_empty() {
        let _ = writeln!(out, "{empty}");
        return;
    }
    let _ = writeln!(out, "{title}:");
    for item in items {
        let _ = writeln!(out, "  {item}");
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberSummary {
    pub name: Option<String>,
    pub descriptor: Option<String>,
    pub access_flags: u16,
    pub access: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassSummary {
    pub valid: bool,
    pub class_name: Option<String>,
    pub parent_name: Option<String>,
    pub access_flags: u16,
    pub access: String,
    pub major_version: u16,
    pub minor_version: u16,
    pub platform_version: i32,
    pub interfaces: Vec<String>,
    pub fields: Vec<MemberSummary>,
    pub methods: Vec<MemberSummary>,
    pub integers: Vec<i32>,
    pub floats: Vec<f32>,
    pub longs: Vec<i64>,
    pub doubles: Vec<f64>,
    pub classes: Vec<String>,
    pub strings: Vec<String>,
    pub field_refs: Vec<String>,
    pub method_refs: Vec<String>,
    pub interface_method_refs: Vec<String>,
}
