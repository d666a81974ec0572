//! Class file reader.
//!
//! Parses just enough of a JVM class file to drive the sealing pass: the
//! constant pool, the class-level access flags, this/super/interfaces and
//! the `PermittedSubclasses` attribute. Fields and methods are skipped
//! over without being decoded. The byte offsets of the regions the
//! rewriter touches are remembered in [`ClassLayout`] so that a rewrite
//! never has to re-encode anything it did not change.

use bitflags::bitflags;
use serde::Serialize;
use thiserror::Error;

pub const MAGIC: u32 = 0xCAFE_BABE;
pub const PERMITTED_SUBCLASSES: &str = "PermittedSubclasses";

const TAG_UTF8: u8 = 1;
const TAG_CLASS: u8 = 7;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
    pub struct AccessFlags: u16 {
        const PUBLIC = 0x0001;
        const FINAL = 0x0010;
        const SUPER = 0x0020;
        const INTERFACE = 0x0200;
        const ABSTRACT = 0x0400;
        const SYNTHETIC = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM = 0x4000;
        const MODULE = 0x8000;
    }
}

#[derive(Debug, Error)]
pub enum ClassFileError {
    #[error("truncated class file: needed {needed} bytes at offset {offset}")]
    Truncated { offset: usize, needed: usize },
    #[error("bad magic number {0:#010x}")]
    BadMagic(u32),
    #[error("unknown constant pool tag {tag} at index {index}")]
    UnknownConstantTag { tag: u8, index: usize },
    #[error("constant pool index {index} is not a {expected} entry")]
    BadConstantIndex { index: u16, expected: &'static str },
    #[error("malformed {0} attribute")]
    MalformedAttribute(&'static str),
    #[error("{0} trailing bytes after class attributes")]
    TrailingBytes(usize),
    #[error("constant pool would grow to {0} entries")]
    ConstantPoolOverflow(usize),
    #[error("class attribute table is full")]
    AttributeOverflow,
    #[error("name of {0} bytes does not fit in a constant")]
    NameTooLong(usize),
    #[error("constant pool entry {0} is not valid modified UTF-8")]
    BadModifiedUtf8(u16),
    #[error("class file is {actual} bytes but was parsed from {expected} bytes")]
    LayoutMismatch { expected: usize, actual: usize },
}

#[derive(Debug, Clone)]
pub(crate) enum Constant {
    Utf8(Vec<u8>),
    Class(u16),
    Other,
    /// Index 0 and the upper half of `Long`/`Double` constants.
    Unusable,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ConstantPool {
    entries: Vec<Constant>,
}

impl ConstantPool {
    fn read(reader: &mut ByteReader<'_>) -> Result<Self, ClassFileError> {
        let count = reader.u16()? as usize;
        let mut entries = Vec::with_capacity(count.max(1));
        entries.push(Constant::Unusable);

        while entries.len() < count {
            let index = entries.len();
            let tag = reader.u8()?;
            let (constant, slots) = match tag {
                TAG_UTF8 => {
                    let len = reader.u16()? as usize;
                    (Constant::Utf8(reader.take(len)?.to_vec()), 1)
                }
                TAG_CLASS => (Constant::Class(reader.u16()?), 1),
                // Integer, Float
                3 | 4 => {
                    reader.skip(4)?;
                    (Constant::Other, 1)
                }
                // Long, Double
                5 | 6 => {
                    reader.skip(8)?;
                    (Constant::Other, 2)
                }
                // String, MethodType, Module, Package
                8 | 16 | 19 | 20 => {
                    reader.skip(2)?;
                    (Constant::Other, 1)
                }
                // Fieldref, Methodref, InterfaceMethodref, NameAndType, Dynamic, InvokeDynamic
                9 | 10 | 11 | 12 | 17 | 18 => {
                    reader.skip(4)?;
                    (Constant::Other, 1)
                }
                // MethodHandle
                15 => {
                    reader.skip(3)?;
                    (Constant::Other, 1)
                }
                _ => return Err(ClassFileError::UnknownConstantTag { tag, index }),
            };
            entries.push(constant);
            if slots == 2 {
                entries.push(Constant::Unusable);
            }
        }

        Ok(Self { entries })
    }

    /// Value written to `constant_pool_count`.
    pub(crate) fn count(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn utf8(&self, index: u16) -> Result<&[u8], ClassFileError> {
        match self.entries.get(index as usize) {
            Some(Constant::Utf8(bytes)) => Ok(bytes),
            _ => Err(ClassFileError::BadConstantIndex {
                index,
                expected: "Utf8",
            }),
        }
    }

    pub(crate) fn class_name(&self, index: u16) -> Result<String, ClassFileError> {
        match self.entries.get(index as usize) {
            Some(Constant::Class(name_index)) => decode_name(self.utf8(*name_index)?)
                .ok_or(ClassFileError::BadModifiedUtf8(*name_index)),
            _ => Err(ClassFileError::BadConstantIndex {
                index,
                expected: "Class",
            }),
        }
    }

    pub(crate) fn find_utf8(&self, value: &[u8]) -> Option<u16> {
        self.entries
            .iter()
            .position(|c| matches!(c, Constant::Utf8(v) if v == value))
            .and_then(|i| u16::try_from(i).ok())
    }

    pub(crate) fn find_class(&self, name: &[u8]) -> Option<u16> {
        self.entries
            .iter()
            .position(|c| match c {
                Constant::Class(name_index) => self.utf8(*name_index).is_ok_and(|v| v == name),
                _ => false,
            })
            .and_then(|i| u16::try_from(i).ok())
    }
}

/// Byte offsets recorded while parsing.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ClassLayout {
    /// End of the constant pool, which is also where `access_flags` starts.
    pub pool_end: usize,
    pub attributes_count_offset: usize,
    /// Span of an existing `PermittedSubclasses` attribute, header included.
    pub permitted_attribute: Option<(usize, usize)>,
    pub len: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassFile {
    pub minor_version: u16,
    pub major_version: u16,
    pub access: AccessFlags,
    pub this_name: String,
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
    pub permitted_subclasses: Option<Vec<String>>,
    #[serde(skip)]
    pub(crate) pool: ConstantPool,
    #[serde(skip)]
    pub(crate) layout: ClassLayout,
}

impl ClassFile {
    pub fn parse(bytes: &[u8]) -> Result<Self, ClassFileError> {
        let mut reader = ByteReader::new(bytes);

        let magic = reader.u32()?;
        if magic != MAGIC {
            return Err(ClassFileError::BadMagic(magic));
        }
        let minor_version = reader.u16()?;
        let major_version = reader.u16()?;

        let pool = ConstantPool::read(&mut reader)?;
        let pool_end = reader.position();

        let access = AccessFlags::from_bits_retain(reader.u16()?);
        let this_class = reader.u16()?;
        let super_class = reader.u16()?;

        let interfaces_count = reader.u16()?;
        let mut interfaces = Vec::with_capacity(interfaces_count as usize);
        for _ in 0..interfaces_count {
            interfaces.push(pool.class_name(reader.u16()?)?);
        }

        skip_members(&mut reader)?; // fields
        skip_members(&mut reader)?; // methods

        let attributes_count_offset = reader.position();
        let attributes_count = reader.u16()?;
        let mut permitted_subclasses = None;
        let mut permitted_attribute = None;
        for _ in 0..attributes_count {
            let start = reader.position();
            let name_index = reader.u16()?;
            let len = reader.u32()? as usize;
            let body = reader.take(len)?;
            if pool.utf8(name_index)? == PERMITTED_SUBCLASSES.as_bytes() {
                permitted_subclasses = Some(read_permitted_subclasses(&pool, body)?);
                permitted_attribute = Some((start, reader.position()));
            }
        }

        if reader.remaining() != 0 {
            return Err(ClassFileError::TrailingBytes(reader.remaining()));
        }

        let this_name = pool.class_name(this_class)?;
        let super_name = match super_class {
            0 => None,
            index => Some(pool.class_name(index)?),
        };

        Ok(Self {
            minor_version,
            major_version,
            access,
            this_name,
            super_name,
            interfaces,
            permitted_subclasses,
            pool,
            layout: ClassLayout {
                pool_end,
                attributes_count_offset,
                permitted_attribute,
                len: bytes.len(),
            },
        })
    }

    pub fn is_interface(&self) -> bool {
        self.access.contains(AccessFlags::INTERFACE)
    }

    pub fn is_final(&self) -> bool {
        self.access.contains(AccessFlags::FINAL)
    }

    pub fn is_public(&self) -> bool {
        self.access.contains(AccessFlags::PUBLIC)
    }

    /// True when the class already lists at least one permitted subclass.
    pub fn is_sealed(&self) -> bool {
        self.permitted_subclasses
            .as_ref()
            .is_some_and(|names| !names.is_empty())
    }
}

fn read_permitted_subclasses(pool: &ConstantPool, body: &[u8]) -> Result<Vec<String>, ClassFileError> {
    let mut reader = ByteReader::new(body);
    let count = reader
        .u16()
        .map_err(|_| ClassFileError::MalformedAttribute(PERMITTED_SUBCLASSES))?;
    if body.len() != 2 + 2 * count as usize {
        return Err(ClassFileError::MalformedAttribute(PERMITTED_SUBCLASSES));
    }
    let mut names = Vec::with_capacity(count as usize);
    for _ in 0..count {
        names.push(pool.class_name(reader.u16()?)?);
    }
    Ok(names)
}

fn skip_members(reader: &mut ByteReader<'_>) -> Result<(), ClassFileError> {
    let count = reader.u16()?;
    for _ in 0..count {
        // access_flags, name_index, descriptor_index
        reader.skip(6)?;
        skip_attributes(reader)?;
    }
    Ok(())
}

fn skip_attributes(reader: &mut ByteReader<'_>) -> Result<(), ClassFileError> {
    let count = reader.u16()?;
    for _ in 0..count {
        reader.skip(2)?;
        let len = reader.u32()? as usize;
        reader.skip(len)?;
    }
    Ok(())
}

/// Decodes a modified UTF-8 constant: NUL is `C0 80` and supplementary
/// characters are stored as two 3-byte surrogates.
pub(crate) fn decode_name(bytes: &[u8]) -> Option<String> {
    let mut units = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        let (unit, width) = match b {
            0x01..=0x7F => (u16::from(b), 1),
            0xC0..=0xDF => {
                let b1 = continuation(bytes.get(i + 1))?;
                ((u16::from(b & 0x1F) << 6) | b1, 2)
            }
            0xE0..=0xEF => {
                let b1 = continuation(bytes.get(i + 1))?;
                let b2 = continuation(bytes.get(i + 2))?;
                ((u16::from(b & 0x0F) << 12) | (b1 << 6) | b2, 3)
            }
            _ => return None,
        };
        units.push(unit);
        i += width;
    }
    String::from_utf16(&units).ok()
}

fn continuation(byte: Option<&u8>) -> Option<u16> {
    byte.filter(|b| *b & 0xC0 == 0x80).map(|b| u16::from(b & 0x3F))
}

/// Inverse of [`decode_name`].
pub(crate) fn encode_name(name: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(name.len());
    for unit in name.encode_utf16() {
        match unit {
            0x0001..=0x007F => out.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                out.push(0xC0 | (unit >> 6) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                out.push(0xE0 | (unit >> 12) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
    out
}

pub(crate) struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub(crate) fn take(&mut self, n: usize) -> Result<&'a [u8], ClassFileError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(ClassFileError::Truncated {
                offset: self.pos,
                needed: n,
            })?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn skip(&mut self, n: usize) -> Result<(), ClassFileError> {
        self.take(n).map(|_| ())
    }

    fn u8(&mut self) -> Result<u8, ClassFileError> {
        Ok(self.take(1)?[0])
    }

    pub(crate) fn u16(&mut self) -> Result<u16, ClassFileError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32, ClassFileError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }
}
