use anyhow::Result;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use zip::write::FileOptions;

use crate::constant_pool::{
    TAG_CLASS, TAG_DOUBLE, TAG_FIELD_REF, TAG_FLOAT, TAG_INTEGER, TAG_INTERFACE_METHOD_REF,
    TAG_LONG, TAG_METHOD_REF, TAG_NAME_AND_TYPE, TAG_STRING, TAG_UTF8,
};

static COUNTER: AtomicU64 = AtomicU64::new(0);

pub(crate) fn temp_path(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!(
        "class_deps_test_{}_{}_{}_{}",
        std::process::id(),
        nanos,
        n,
        name
    ))
}

pub(crate) fn write_jar(path: &Path, entries: &[(&str, &[u8])]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    let mut zip = zip::ZipWriter::new(file);
    let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for (name, content) in entries {
        zip.start_file(*name, options)?;
        zip.write_all(content)?;
    }

    zip.finish()?;
    Ok(())
}

pub(crate) struct ClassBuilder {
    minor: u16,
    major: u16,
    pool: Vec<u8>,
    pool_count: u16,
    access_flags: u16,
    this_class: u16,
    super_class: u16,
    interfaces: Vec<u16>,
    fields: Vec<u8>,
    field_count: u16,
    methods: Vec<u8>,
    method_count: u16,
    attributes: Vec<u8>,
    attribute_count: u16,
}

impl ClassBuilder {
    pub(crate) fn new(major: u16) -> Self {
        Self {
            minor: 0,
            major,
            pool: Vec::new(),
            pool_count: 1,
            access_flags: 0x0021,
            this_class: 0,
            super_class: 0,
            interfaces: Vec::new(),
            fields: Vec::new(),
            field_count: 0,
            methods: Vec::new(),
            method_count: 0,
            attributes: Vec::new(),
            attribute_count: 0,
        }
    }

    pub(crate) fn named(major: u16, name: &str, parent: &str) -> Self {
        let mut b = Self::new(major);
        let this = b.class(name);
        let parent = b.class(parent);
        b.set_this(this);
        b.set_super(parent);
        b
    }

    pub(crate) fn pool_count(&self) -> u16 {
        self.pool_count
    }

    pub(crate) fn pool_bytes(&self) -> &[u8] {
        &self.pool
    }

    fn push_entry(&mut self, bytes: &[u8], slots: u16) -> u16 {
        let index = self.pool_count;
        self.pool.extend_from_slice(bytes);
        self.pool_count += slots;
        index
    }

    pub(crate) fn raw_entry(&mut self, bytes: &[u8]) -> u16 {
        self.push_entry(bytes, 1)
    }

    pub(crate) fn raw_utf8(&mut self, payload: &[u8]) -> u16 {
        let mut bytes = vec![TAG_UTF8];
        bytes.extend_from_slice(&(payload.len() as u16).to_be_bytes());
        bytes.extend_from_slice(payload);
        self.push_entry(&bytes, 1)
    }

    pub(crate) fn utf8(&mut self, text: &str) -> u16 {
        self.raw_utf8(text.as_bytes())
    }

    pub(crate) fn class(&mut self, name: &str) -> u16 {
        let name_index = self.utf8(name);
        self.class_at(name_index)
    }

    pub(crate) fn class_at(&mut self, name_index: u16) -> u16 {
        let mut bytes = vec![TAG_CLASS];
        bytes.extend_from_slice(&name_index.to_be_bytes());
        self.push_entry(&bytes, 1)
    }

    pub(crate) fn string(&mut self, text: &str) -> u16 {
        let utf8 = self.utf8(text);
        let mut bytes = vec![TAG_STRING];
        bytes.extend_from_slice(&utf8.to_be_bytes());
        self.push_entry(&bytes, 1)
    }

    pub(crate) fn integer(&mut self, value: i32) -> u16 {
        let mut bytes = vec![TAG_INTEGER];
        bytes.extend_from_slice(&value.to_be_bytes());
        self.push_entry(&bytes, 1)
    }

    pub(crate) fn float(&mut self, value: f32) -> u16 {
        let mut bytes = vec![TAG_FLOAT];
        bytes.extend_from_slice(&value.to_bits().to_be_bytes());
        self.push_entry(&bytes, 1)
    }

    pub(crate) fn long(&mut self, value: i64) -> u16 {
        let mut bytes = vec![TAG_LONG];
        bytes.extend_from_slice(&value.to_be_bytes());
        self.push_entry(&bytes, 2)
    }

    pub(crate) fn double(&mut self, value: f64) -> u16 {
        let mut bytes = vec![TAG_DOUBLE];
        bytes.extend_from_slice(&value.to_bits().to_be_bytes());
        self.push_entry(&bytes, 2)
    }

    pub(crate) fn name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let name_index = self.utf8(name);
        let descriptor_index = self.utf8(descriptor);
        let mut bytes = vec![TAG_NAME_AND_TYPE];
        bytes.extend_from_slice(&name_index.to_be_bytes());
        bytes.extend_from_slice(&descriptor_index.to_be_bytes());
        self.push_entry(&bytes, 1)
    }

    fn member_ref(&mut self, tag: u8, class: &str, name: &str, descriptor: &str) -> u16 {
        let class_index = self.class(class);
        let nat = self.name_and_type(name, descriptor);
        let mut bytes = vec![tag];
        bytes.extend_from_slice(&class_index.to_be_bytes());
        bytes.extend_from_slice(&nat.to_be_bytes());
        self.push_entry(&bytes, 1)
    }

    pub(crate) fn field_ref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        self.member_ref(TAG_FIELD_REF, class, name, descriptor)
    }

    pub(crate) fn method_ref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        self.member_ref(TAG_METHOD_REF, class, name, descriptor)
    }

    pub(crate) fn interface_method_ref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        self.member_ref(TAG_INTERFACE_METHOD_REF, class, name, descriptor)
    }

    pub(crate) fn set_minor(&mut self, minor: u16) {
        self.minor = minor;
    }

    pub(crate) fn set_access(&mut self, flags: u16) {
        self.access_flags = flags;
    }

    pub(crate) fn set_this(&mut self, index: u16) {
        self.this_class = index;
    }

    pub(crate) fn set_super(&mut self, index: u16) {
        self.super_class = index;
    }

    pub(crate) fn add_interface(&mut self, name: &str) {
        let index = self.class(name);
        self.interfaces.push(index);
    }

    fn encode_member(&mut self, access: u16, name: &str, descriptor: &str, attributes: &[&[u8]]) -> Vec<u8> {
        let name_index = self.utf8(name);
        let descriptor_index = self.utf8(descriptor);
        let mut out = Vec::new();
        out.extend_from_slice(&access.to_be_bytes());
        out.extend_from_slice(&name_index.to_be_bytes());
        out.extend_from_slice(&descriptor_index.to_be_bytes());
        out.extend_from_slice(&self.encode_attributes(attributes));
        out
    }

    fn encode_attributes(&mut self, attributes: &[&[u8]]) -> Vec<u8> {
        let mut out = (attributes.len() as u16).to_be_bytes().to_vec();
        for payload in attributes {
            let name_index = self.utf8("Attr");
            out.extend_from_slice(&name_index.to_be_bytes());
            out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
            out.extend_from_slice(payload);
        }
        out
    }

    pub(crate) fn add_field(&mut self, access: u16, name: &str, descriptor: &str, attributes: &[&[u8]]) {
        let bytes = self.encode_member(access, name, descriptor, attributes);
        self.fields.extend_from_slice(&bytes);
        self.field_count += 1;
    }

    pub(crate) fn add_method(&mut self, access: u16, name: &str, descriptor: &str, attributes: &[&[u8]]) {
        let bytes = self.encode_member(access, name, descriptor, attributes);
        self.methods.extend_from_slice(&bytes);
        self.method_count += 1;
    }

    pub(crate) fn add_class_attribute(&mut self, payload: &[u8]) {
        let name_index = self.utf8("SourceFile");
        self.attributes.extend_from_slice(&name_index.to_be_bytes());
        self.attributes
            .extend_from_slice(&(payload.len() as u32).to_be_bytes());
        self.attributes.extend_from_slice(payload);
        self.attribute_count += 1;
    }

    pub(crate) fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&0xCAFE_BABEu32.to_be_bytes());
        out.extend_from_slice(&self.minor.to_be_bytes());
        out.extend_from_slice(&self.major.to_be_bytes());
        out.extend_from_slice(&self.pool_count.to_be_bytes());
        out.extend_from_slice(&self.pool);
        out.extend_from_slice(&self.access_flags.to_be_bytes());
        out.extend_from_slice(&self.this_class.to_be_bytes());
        out.extend_from_slice(&self.super_class.to_be_bytes());
        out.extend_from_slice(&(self.interfaces.len() as u16).to_be_bytes());
        for index in &self.interfaces {
            out.extend_from_slice(&index.to_be_bytes());
        }
        out.extend_from_slice(&self.field_count.to_be_bytes());
        out.extend_from_slice(&self.fields);
        out.extend_from_slice(&self.method_count.to_be_bytes());
        out.extend_from_slice(&self.methods);
        out.extend_from_slice(&self.attribute_count.to_be_bytes());
        out.extend_from_slice(&self.attributes);
        out
    }
}
