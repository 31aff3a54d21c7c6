//! Class bytes with a lazily parsed structural view.
//!
//! Supertype analysis elsewhere in the pipeline needs a class's name,
//! superclass, interfaces and access flags. Those are read straight from the
//! classfile header and constant pool, on first structural query only; a
//! `ClassInfo` that is never inspected structurally costs nothing beyond
//! holding its bytes.

use anyhow::{Context, Result, bail};
use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::sync::{Arc, OnceLock};

const ACC_INTERFACE: u16 = 0x0200;
const ACC_ABSTRACT: u16 = 0x0400;

/// One class's binary representation plus lazily derived structure.
/// Immutable once created; at most one instance per class name per provider.
pub struct ClassInfo {
    bytes: Arc<[u8]>,
    meta: OnceLock<Option<ClassMeta>>,
}

#[derive(Debug)]
struct ClassMeta {
    name: String,
    access: u16,
    super_name: Option<String>,
    interfaces: Vec<String>,
}

impl ClassInfo {
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            bytes: bytes.into(),
            meta: OnceLock::new(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// A fresh readable stream over the class bytes.
    pub fn stream(&self) -> impl Read + Send + use<> {
        Cursor::new(Arc::clone(&self.bytes))
    }

    fn meta(&self) -> Option<&ClassMeta> {
        self.meta
            .get_or_init(|| match parse_meta(&self.bytes) {
                Ok(meta) => Some(meta),
                Err(err) => {
                    log::debug!("unparseable classfile ({} bytes): {err:#}", self.bytes.len());
                    None
                }
            })
            .as_ref()
    }

    /// Internal (slash-form) class name, if the bytes parse as a classfile.
    pub fn name(&self) -> Option<&str> {
        self.meta().map(|m| m.name.as_str())
    }

    /// Internal name of the superclass; `None` for `java/lang/Object`
    /// or unparseable bytes.
    pub fn super_name(&self) -> Option<&str> {
        self.meta().and_then(|m| m.super_name.as_deref())
    }

    /// Internal names of directly implemented interfaces.
    pub fn interfaces(&self) -> &[String] {
        self.meta().map(|m| m.interfaces.as_slice()).unwrap_or(&[])
    }

    pub fn access(&self) -> Option<u16> {
        self.meta().map(|m| m.access)
    }

    pub fn is_interface(&self) -> bool {
        self.access().is_some_and(|a| a & ACC_INTERFACE != 0)
    }

    pub fn is_abstract(&self) -> bool {
        self.access().is_some_and(|a| a & ACC_ABSTRACT != 0)
    }
}

/// Reads the classfile header through the interfaces table. Everything past
/// that (fields, methods, attributes) is irrelevant to structural queries.
fn parse_meta(bytes: &[u8]) -> Result<ClassMeta> {
    let mut reader = ByteReader::new(bytes);
    if reader.u32()? != 0xCAFE_BABE {
        bail!("bad classfile magic");
    }
    reader.skip(4)?; // minor + major version

    let pool_count = reader.u16()?;
    let mut utf8: HashMap<u16, String> = HashMap::new();
    let mut class_refs: HashMap<u16, u16> = HashMap::new();
    let mut index = 1u16;
    while index < pool_count {
        let tag = reader.u8()?;
        match tag {
            1 => {
                let len = reader.u16()? as usize;
                let raw = reader.take(len)?;
                utf8.insert(index, String::from_utf8_lossy(raw).into_owned());
            }
            7 => {
                class_refs.insert(index, reader.u16()?);
            }
            8 | 16 | 19 | 20 => reader.skip(2)?,
            15 => reader.skip(3)?,
            3 | 4 | 9 | 10 | 11 | 12 | 17 | 18 => reader.skip(4)?,
            // Long and Double occupy two constant pool slots
            5 | 6 => {
                reader.skip(8)?;
                index += 1;
            }
            other => bail!("unknown constant pool tag {other}"),
        }
        index += 1;
    }

    let class_name = |idx: u16| -> Option<String> {
        class_refs.get(&idx).and_then(|u| utf8.get(u)).cloned()
    };

    let access = reader.u16()?;
    let this_class = reader.u16()?;
    let super_class = reader.u16()?;
    let name = class_name(this_class).context("this_class not resolvable in constant pool")?;
    let super_name = if super_class == 0 {
        None
    } else {
        Some(class_name(super_class).context("super_class not resolvable in constant pool")?)
    };

    let interface_count = reader.u16()?;
    let mut interfaces = Vec::with_capacity(interface_count as usize);
    for _ in 0..interface_count {
        let idx = reader.u16()?;
        interfaces.push(class_name(idx).context("interface not resolvable in constant pool")?);
    }

    Ok(ClassMeta {
        name,
        access,
        super_name,
        interfaces,
    })
}

struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.bytes.len())
            .context("truncated classfile")?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn skip(&mut self, len: usize) -> Result<()> {
        self.take(len).map(|_| ())
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        let raw = self.take(2)?;
        Ok(u16::from_be_bytes([raw[0], raw[1]]))
    }

    fn u32(&mut self) -> Result<u32> {
        let raw = self.take(4)?;
        Ok(u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }
}
