//! Test-only class file synthesis.

use std::collections::HashMap;

use crate::classfile::encode_name;
use crate::pool::{ResourceEntry, TypeDescriptor, class_path};

pub(crate) struct ClassBuilder {
    name: String,
    super_name: Option<String>,
    interfaces: Vec<String>,
    access: u16,
    permits: Option<Vec<String>>,
    long_constant: bool,
}

impl ClassBuilder {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            super_name: Some("java/lang/Object".to_string()),
            interfaces: Vec::new(),
            access: 0x0020,
            permits: None,
            long_constant: false,
        }
    }

    pub(crate) fn public(mut self) -> Self {
        self.access |= 0x0001;
        self
    }

    pub(crate) fn final_(mut self) -> Self {
        self.access |= 0x0010;
        self
    }

    pub(crate) fn interface(mut self) -> Self {
        self.access = (self.access & !0x0020) | 0x0200 | 0x0400;
        self
    }

    pub(crate) fn extends(mut self, super_name: &str) -> Self {
        self.super_name = Some(super_name.to_string());
        self
    }

    pub(crate) fn no_super(mut self) -> Self {
        self.super_name = None;
        self
    }

    pub(crate) fn implements(mut self, interface: &str) -> Self {
        self.interfaces.push(interface.to_string());
        self
    }

    pub(crate) fn permits(mut self, names: &[&str]) -> Self {
        self.permits = Some(names.iter().map(|n| n.to_string()).collect());
        self
    }

    pub(crate) fn with_long_constant(mut self) -> Self {
        self.long_constant = true;
        self
    }

    pub(crate) fn build(&self) -> Vec<u8> {
        let mut pool = PoolBuilder::default();
        if self.long_constant {
            pool.long(42);
        }
        let this_class = pool.class(&self.name);
        let super_class = self.super_name.as_deref().map(|s| pool.class(s)).unwrap_or(0);
        let interfaces: Vec<u16> = self.interfaces.iter().map(|i| pool.class(i)).collect();

        let field_name = pool.utf8("value");
        let field_desc = pool.utf8("I");
        let synthetic = pool.utf8("Synthetic");
        let source_file = pool.utf8("SourceFile");
        let source_name = pool.utf8("Generated.java");
        let permits = self.permits.as_ref().map(|names| {
            let attr = pool.utf8("PermittedSubclasses");
            let classes: Vec<u16> = names.iter().map(|n| pool.class(n)).collect();
            (attr, classes)
        });

        let mut out = Vec::new();
        out.extend(0xCAFE_BABEu32.to_be_bytes());
        out.extend(0u16.to_be_bytes());
        out.extend(61u16.to_be_bytes());
        out.extend(pool.count.to_be_bytes());
        out.extend(&pool.bytes);
        out.extend(self.access.to_be_bytes());
        out.extend(this_class.to_be_bytes());
        out.extend(super_class.to_be_bytes());
        out.extend((interfaces.len() as u16).to_be_bytes());
        for i in interfaces {
            out.extend(i.to_be_bytes());
        }

        // one private int field carrying a zero-length attribute
        out.extend(1u16.to_be_bytes());
        out.extend(0x0002u16.to_be_bytes());
        out.extend(field_name.to_be_bytes());
        out.extend(field_desc.to_be_bytes());
        out.extend(1u16.to_be_bytes());
        out.extend(synthetic.to_be_bytes());
        out.extend(0u32.to_be_bytes());

        // no methods
        out.extend(0u16.to_be_bytes());

        let attributes = 1 + u16::from(permits.is_some());
        out.extend(attributes.to_be_bytes());
        out.extend(source_file.to_be_bytes());
        out.extend(2u32.to_be_bytes());
        out.extend(source_name.to_be_bytes());
        if let Some((attr, classes)) = permits {
            out.extend(attr.to_be_bytes());
            out.extend((2 + 2 * classes.len() as u32).to_be_bytes());
            out.extend((classes.len() as u16).to_be_bytes());
            for c in classes {
                out.extend(c.to_be_bytes());
            }
        }
        out
    }
}

struct PoolBuilder {
    bytes: Vec<u8>,
    count: u16,
    utf8: HashMap<String, u16>,
    classes: HashMap<String, u16>,
}

impl Default for PoolBuilder {
    fn default() -> Self {
        Self {
            bytes: Vec::new(),
            count: 1,
            utf8: HashMap::new(),
            classes: HashMap::new(),
        }
    }
}

impl PoolBuilder {
    fn utf8(&mut self, value: &str) -> u16 {
        if let Some(index) = self.utf8.get(value) {
            return *index;
        }
        let encoded = encode_name(value);
        let index = self.count;
        self.bytes.push(1);
        self.bytes.extend((encoded.len() as u16).to_be_bytes());
        self.bytes.extend(&encoded);
        self.count += 1;
        self.utf8.insert(value.to_string(), index);
        index
    }

    fn class(&mut self, name: &str) -> u16 {
        if let Some(index) = self.classes.get(name) {
            return *index;
        }
        let name_index = self.utf8(name);
        let index = self.count;
        self.bytes.push(7);
        self.bytes.extend(name_index.to_be_bytes());
        self.count += 1;
        self.classes.insert(name.to_string(), index);
        index
    }

    fn long(&mut self, value: i64) {
        self.bytes.push(5);
        self.bytes.extend(value.to_be_bytes());
        self.count += 2;
    }
}

pub(crate) fn entry(unit: &str, class: &ClassBuilder) -> ResourceEntry {
    ResourceEntry::class_or_resource(class_path(unit, &class.name), class.build())
}

pub(crate) fn descriptor(unit: &str, class: &ClassBuilder) -> TypeDescriptor {
    TypeDescriptor::read(&entry(unit, class)).expect("fixture class must parse")
}
