//! Applies a [`Decision`] to the raw bytes of a class file.
//!
//! Only the bytes a decision needs are touched: `MarkFinal` flips one bit
//! of `access_flags`; `Seal` appends the constants it cannot reuse to the
//! end of the constant pool and writes a `PermittedSubclasses` attribute.

use std::collections::{BTreeSet, HashMap};

use crate::classfile::{
    AccessFlags, ByteReader, ClassFile, ClassFileError, ConstantPool, PERMITTED_SUBCLASSES,
    encode_name,
};
use crate::classify::Decision;

const MAX_POOL_COUNT: usize = u16::MAX as usize;

pub fn apply(decision: &Decision, class: &ClassFile, bytes: &[u8]) -> Result<Vec<u8>, ClassFileError> {
    if bytes.len() != class.layout.len {
        return Err(ClassFileError::LayoutMismatch {
            expected: class.layout.len,
            actual: bytes.len(),
        });
    }
    match decision {
        Decision::NoOp => Ok(bytes.to_vec()),
        Decision::MarkFinal => Ok(mark_final(class, bytes)),
        Decision::Seal(subtypes) => seal(class, bytes, subtypes),
    }
}

fn mark_final(class: &ClassFile, bytes: &[u8]) -> Vec<u8> {
    let offset = class.layout.pool_end;
    let flags = class.access | AccessFlags::FINAL;
    let mut out = bytes.to_vec();
    out[offset..offset + 2].copy_from_slice(&flags.bits().to_be_bytes());
    out
}

fn seal(class: &ClassFile, bytes: &[u8], subtypes: &BTreeSet<String>) -> Result<Vec<u8>, ClassFileError> {
    let mut appender = PoolAppender::new(&class.pool);
    let attribute_name = appender.utf8(PERMITTED_SUBCLASSES.as_bytes())?;
    let mut class_indexes = Vec::with_capacity(subtypes.len());
    for name in subtypes {
        class_indexes.push(appender.class(&encode_name(name))?);
    }
    let (pool_count, appended) = appender.finish();

    let number_of_classes =
        u16::try_from(class_indexes.len()).map_err(|_| ClassFileError::AttributeOverflow)?;
    let mut attribute = Vec::with_capacity(8 + 2 * class_indexes.len());
    attribute.extend(attribute_name.to_be_bytes());
    attribute.extend((2 + 2 * u32::from(number_of_classes)).to_be_bytes());
    attribute.extend(number_of_classes.to_be_bytes());
    for index in class_indexes {
        attribute.extend(index.to_be_bytes());
    }

    let layout = class.layout;
    let mut out = Vec::with_capacity(bytes.len() + appended.len() + attribute.len());
    out.extend_from_slice(&bytes[..8]);
    out.extend(pool_count.to_be_bytes());
    out.extend_from_slice(&bytes[10..layout.pool_end]);
    out.extend_from_slice(&appended);

    match layout.permitted_attribute {
        Some((start, end)) => {
            out.extend_from_slice(&bytes[layout.pool_end..start]);
            out.extend_from_slice(&attribute);
            out.extend_from_slice(&bytes[end..]);
        }
        None => {
            let count_offset = layout.attributes_count_offset;
            let count = ByteReader::new(&bytes[count_offset..]).u16()?;
            let count = count.checked_add(1).ok_or(ClassFileError::AttributeOverflow)?;
            out.extend_from_slice(&bytes[layout.pool_end..count_offset]);
            out.extend(count.to_be_bytes());
            out.extend_from_slice(&bytes[count_offset + 2..]);
            out.extend_from_slice(&attribute);
        }
    }

    Ok(out)
}

/// Hands out constant pool indexes, reusing existing entries and
/// encoding new ones past the end of the pool.
struct PoolAppender<'a> {
    pool: &'a ConstantPool,
    next: usize,
    bytes: Vec<u8>,
    utf8: HashMap<Vec<u8>, u16>,
    classes: HashMap<Vec<u8>, u16>,
}

impl<'a> PoolAppender<'a> {
    fn new(pool: &'a ConstantPool) -> Self {
        Self {
            pool,
            next: pool.count(),
            bytes: Vec::new(),
            utf8: HashMap::new(),
            classes: HashMap::new(),
        }
    }

    fn utf8(&mut self, value: &[u8]) -> Result<u16, ClassFileError> {
        if let Some(index) = self.pool.find_utf8(value) {
            return Ok(index);
        }
        if let Some(index) = self.utf8.get(value) {
            return Ok(*index);
        }

        let len = u16::try_from(value.len()).map_err(|_| ClassFileError::NameTooLong(value.len()))?;
        let index = self.reserve()?;
        self.bytes.push(1);
        self.bytes.extend(len.to_be_bytes());
        self.bytes.extend_from_slice(value);
        self.utf8.insert(value.to_vec(), index);
        Ok(index)
    }

    fn class(&mut self, name: &[u8]) -> Result<u16, ClassFileError> {
        if let Some(index) = self.pool.find_class(name) {
            return Ok(index);
        }
        if let Some(index) = self.classes.get(name) {
            return Ok(*index);
        }

        let name_index = self.utf8(name)?;
        let index = self.reserve()?;
        self.bytes.push(7);
        self.bytes.extend(name_index.to_be_bytes());
        self.classes.insert(name.to_vec(), index);
        Ok(index)
    }

    fn reserve(&mut self) -> Result<u16, ClassFileError> {
        // the count itself must fit in a u16, so the last usable index is 65534
        if self.next >= MAX_POOL_COUNT {
            return Err(ClassFileError::ConstantPoolOverflow(self.next + 1));
        }
        let index = self.next as u16;
        self.next += 1;
        Ok(index)
    }

    fn finish(self) -> (u16, Vec<u8>) {
        (self.next as u16, self.bytes)
    }
}
