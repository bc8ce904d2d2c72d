//! Structured views of compiled JVM class files.
//!
//! [`ClassReader`] decodes the binary class-file format into a [`ClassView`]:
//! the class and superclass names, declared fields, and for every method its
//! instruction stream, local-variable table and descriptor. Analyzers consume
//! only these views and never touch raw bytes.

mod descriptor;
mod opcodes;
mod reader;

use std::path::Path;

use thiserror::Error;

use crate::core::{ClassFileSet, Error, Result};

pub use descriptor::{normalize_descriptor, normalize_internal_name, parameter_types};
pub use reader::ClassReader;

/// Name of the module descriptor pseudo-class.
pub const MODULE_INFO: &str = "module-info";

/// `ACC_MODULE` access flag.
pub const ACC_MODULE: u16 = 0x8000;

/// Errors raised while decoding a class file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassFormatError {
    #[error("bad magic number 0x{0:08X}")]
    BadMagic(u32),

    #[error("unexpected end of data at offset {offset}")]
    Truncated { offset: usize },

    #[error("invalid constant pool index {0}")]
    InvalidConstantIndex(u16),

    #[error("8-byte constant at index {0} runs past the end of the constant pool")]
    WideConstantOverflow(u16),

    #[error("unknown constant pool tag {tag} at index {index}")]
    UnknownConstantTag { tag: u8, index: u16 },

    #[error("constant {index} is not a {expected}")]
    UnexpectedConstant { index: u16, expected: &'static str },

    #[error("invalid modified UTF-8 string")]
    InvalidUtf8,

    #[error("invalid descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("invalid opcode 0x{opcode:02x} at pc {pc}")]
    InvalidInstruction { opcode: u8, pc: usize },
}

/// A declared field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    pub name: String,
    pub descriptor: String,
}

impl FieldDecl {
    pub fn new(name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            descriptor: descriptor.into(),
        }
    }
}

/// An entry in a method's local-variable table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalVariable {
    pub name: String,
    pub descriptor: String,
}

impl LocalVariable {
    pub fn new(name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            descriptor: descriptor.into(),
        }
    }
}

/// Dispatch kind of a method-call instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokeKind {
    Virtual,
    Special,
    Static,
    Interface,
}

/// Kind of a field-access instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldAccessKind {
    GetField,
    PutField,
    GetStatic,
    PutStatic,
}

/// One decoded instruction.
///
/// Only calls and field accesses carry operands; `invokedynamic` and every
/// other opcode are kept as [`Instruction::Other`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Invoke {
        kind: InvokeKind,
        owner: String,
        name: String,
        descriptor: String,
    },
    FieldAccess {
        kind: FieldAccessKind,
        owner: String,
        name: String,
        descriptor: String,
    },
    Other(u8),
}

impl Instruction {
    /// An `invokevirtual` call.
    pub fn call(
        owner: impl Into<String>,
        name: impl Into<String>,
        descriptor: impl Into<String>,
    ) -> Self {
        Self::Invoke {
            kind: InvokeKind::Virtual,
            owner: owner.into(),
            name: name.into(),
            descriptor: descriptor.into(),
        }
    }

    /// A `getfield` access.
    pub fn get_field(
        owner: impl Into<String>,
        name: impl Into<String>,
        descriptor: impl Into<String>,
    ) -> Self {
        Self::FieldAccess {
            kind: FieldAccessKind::GetField,
            owner: owner.into(),
            name: name.into(),
            descriptor: descriptor.into(),
        }
    }

    /// A `putfield` access.
    pub fn put_field(
        owner: impl Into<String>,
        name: impl Into<String>,
        descriptor: impl Into<String>,
    ) -> Self {
        Self::FieldAccess {
            kind: FieldAccessKind::PutField,
            owner: owner.into(),
            name: name.into(),
            descriptor: descriptor.into(),
        }
    }
}

/// A declared method with its decoded body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDecl {
    pub name: String,
    pub descriptor: String,
    pub instructions: Vec<Instruction>,
    pub local_variables: Vec<LocalVariable>,
}

impl MethodDecl {
    pub fn new(name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            descriptor: descriptor.into(),
            instructions: Vec::new(),
            local_variables: Vec::new(),
        }
    }

    pub fn with_instruction(mut self, instruction: Instruction) -> Self {
        self.instructions.push(instruction);
        self
    }

    pub fn with_local(mut self, name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        self.local_variables.push(LocalVariable::new(name, descriptor));
        self
    }

    /// Raw type descriptors of the formal parameters.
    pub fn parameter_types(&self) -> std::result::Result<Vec<String>, ClassFormatError> {
        parameter_types(&self.descriptor)
    }
}

/// Structured view of one class file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClassView {
    /// Internal name as stored in the class file (`com/acme/Foo$Bar`).
    pub name: String,
    /// Internal name of the superclass, `None` for `java/lang/Object` itself.
    pub super_name: Option<String>,
    pub access_flags: u16,
    pub fields: Vec<FieldDecl>,
    pub methods: Vec<MethodDecl>,
}

impl ClassView {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_super(mut self, super_name: impl Into<String>) -> Self {
        self.super_name = Some(super_name.into());
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        self.fields.push(FieldDecl::new(name, descriptor));
        self
    }

    pub fn with_method(mut self, method: MethodDecl) -> Self {
        self.methods.push(method);
        self
    }

    /// Canonical class name used as graph vertex key.
    pub fn normalized_name(&self) -> String {
        normalize_internal_name(&self.name)
    }

    /// Whether this is a `module-info` pseudo-class.
    pub fn is_module_descriptor(&self) -> bool {
        self.name == MODULE_INFO || self.access_flags & ACC_MODULE != 0
    }
}

/// Reads and decodes a single class file.
pub fn read_class_file(path: &Path) -> Result<ClassView> {
    let bytes = std::fs::read(path).map_err(|e| Error::read(path, e))?;
    ClassReader::parse(&bytes).map_err(|e| Error::parse(path, e.to_string()))
}

/// Reads every class file in the set, failing on the first bad file.
pub fn read_class_files(files: &ClassFileSet) -> Result<Vec<ClassView>> {
    files.iter().map(|path| read_class_file(path)).collect()
}
