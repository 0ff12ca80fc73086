//! Java class file inspection.
//!
//! Only the header of the class file is read: magic, versions, constant
//! pool, access flags and the class's own name. Nothing is derived; the
//! primary itself is renamed and retyped.

use super::{ArtifactBuilder, DerivedArtifacts};
use crate::error::{IngestError, Result};
use crate::model::{Artifact, ArtifactContent, ArtifactType};

pub const JAVA_CLASS: &str = "JavaClass";
pub const JAVA_INTERFACE: &str = "JavaInterface";
pub const JAVA_ENUM: &str = "JavaEnum";

pub const PACKAGE_NAME: &str = "packageName";
pub const CLASS_NAME: &str = "className";

const MAGIC: u32 = 0xCAFE_BABE;
const ACC_INTERFACE: u16 = 0x0200;
const ACC_ENUM: u16 = 0x4000;

/// What the class file header says about the class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassInfo {
    pub major_version: u16,
    pub minor_version: u16,
    pub access_flags: u16,
    /// Fully qualified, dot separated.
    pub name: String,
}

impl ClassInfo {
    pub fn is_interface(&self) -> bool {
        self.access_flags & ACC_INTERFACE != 0
    }

    pub fn is_enum(&self) -> bool {
        self.access_flags & ACC_ENUM != 0
    }

    pub fn package_name(&self) -> Option<&str> {
        self.name.rsplit_once('.').map(|(package, _)| package)
    }

    pub fn simple_name(&self) -> &str {
        self.name.rsplit_once('.').map_or(self.name.as_str(), |(_, name)| name)
    }

    pub fn extended_type(&self) -> &'static str {
        if self.is_interface() {
            JAVA_INTERFACE
        } else if self.is_enum() {
            JAVA_ENUM
        } else {
            JAVA_CLASS
        }
    }
}

/// Big-endian cursor over class file bytes.
struct ClassReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ClassReader<'a> {
    fn take(&mut self, len: usize) -> std::result::Result<&'a [u8], String> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| format!("Truncated class file at offset {}", self.pos))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u1(&mut self) -> std::result::Result<u8, String> {
        Ok(self.take(1)?[0])
    }

    fn u2(&mut self) -> std::result::Result<u16, String> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u4(&mut self) -> std::result::Result<u32, String> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }
}

#[derive(Debug, Clone)]
enum Constant {
    Utf8(String),
    Class(u16),
    /// Anything the header does not need, and the unusable slot after a
    /// long or double.
    Other,
}

/// Parse the class file header.
pub fn parse_class(bytes: &[u8]) -> std::result::Result<ClassInfo, String> {
    let mut reader = ClassReader { bytes, pos: 0 };
    if reader.u4()? != MAGIC {
        return Err("Not a Java class file".to_string());
    }
    let minor_version = reader.u2()?;
    let major_version = reader.u2()?;

    let count = reader.u2()? as usize;
    let mut pool = vec![Constant::Other; count.max(1)];
    let mut index = 1;
    while index < count {
        let tag = reader.u1()?;
        let mut width = 1;
        pool[index] = match tag {
            1 => {
                let len = reader.u2()? as usize;
                Constant::Utf8(String::from_utf8_lossy(reader.take(len)?).into_owned())
            }
            7 => Constant::Class(reader.u2()?),
            3 | 4 => {
                reader.take(4)?;
                Constant::Other
            }
            5 | 6 => {
                reader.take(8)?;
                width = 2;
                Constant::Other
            }
            8 | 16 | 19 | 20 => {
                reader.take(2)?;
                Constant::Other
            }
            9 | 10 | 11 | 12 | 17 | 18 => {
                reader.take(4)?;
                Constant::Other
            }
            15 => {
                reader.take(3)?;
                Constant::Other
            }
            other => return Err(format!("Unknown constant pool tag {other} at entry {index}")),
        };
        index += width;
    }

    let access_flags = reader.u2()?;
    let this_class = reader.u2()? as usize;
    let name_index = match pool.get(this_class) {
        Some(Constant::Class(name_index)) => *name_index as usize,
        _ => return Err(format!("Invalid this_class index {this_class}")),
    };
    let name = match pool.get(name_index) {
        Some(Constant::Utf8(name)) => name.replace('/', "."),
        _ => return Err(format!("Invalid class name index {name_index}")),
    };

    Ok(ClassInfo {
        major_version,
        minor_version,
        access_flags,
        name,
    })
}

/// Renames and retypes a class file primary from its header.
#[derive(Debug, Default)]
pub struct JavaClassBuilder {
    derived: DerivedArtifacts,
}

impl ArtifactBuilder for JavaClassBuilder {
    fn name(&self) -> &'static str {
        "java-bytecode"
    }

    fn build_artifacts(&mut self, primary: &mut Artifact, content: &ArtifactContent) -> Result<()> {
        let info = parse_class(content.bytes())
            .map_err(|message| IngestError::parse(content.filename(), message))?;

        primary.artifact_type = ArtifactType::extended_document(info.extended_type());
        primary.set_property_opt(PACKAGE_NAME, info.package_name());
        primary.set_property(CLASS_NAME, info.simple_name());
        primary.name = info.name;
        Ok(())
    }

    fn derived_artifacts(&self) -> &DerivedArtifacts {
        &self.derived
    }

    fn derived_artifacts_mut(&mut self) -> &mut DerivedArtifacts {
        &mut self.derived
    }
}
