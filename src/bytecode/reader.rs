//! Binary class-file decoder.

use super::opcodes::{self, instruction_length};
use super::{
    ClassFormatError, ClassView, FieldAccessKind, FieldDecl, Instruction, InvokeKind,
    LocalVariable, MethodDecl,
};

const MAGIC: u32 = 0xCAFE_BABE;

const TAG_UTF8: u8 = 1;
const TAG_INTEGER: u8 = 3;
const TAG_FLOAT: u8 = 4;
const TAG_LONG: u8 = 5;
const TAG_DOUBLE: u8 = 6;
const TAG_CLASS: u8 = 7;
const TAG_STRING: u8 = 8;
const TAG_FIELDREF: u8 = 9;
const TAG_METHODREF: u8 = 10;
const TAG_INTERFACE_METHODREF: u8 = 11;
const TAG_NAME_AND_TYPE: u8 = 12;
const TAG_METHOD_HANDLE: u8 = 15;
const TAG_METHOD_TYPE: u8 = 16;
const TAG_DYNAMIC: u8 = 17;
const TAG_INVOKE_DYNAMIC: u8 = 18;
const TAG_MODULE: u8 = 19;
const TAG_PACKAGE: u8 = 20;

const ATTR_CODE: &str = "Code";
const ATTR_LOCAL_VARIABLE_TABLE: &str = "LocalVariableTable";

type ParseResult<T> = Result<T, ClassFormatError>;

#[derive(Debug, Clone)]
enum Constant {
    /// Index 0 and the second slot of long/double entries.
    Unusable,
    Utf8(String),
    Class { name: u16 },
    MemberRef { class: u16, name_and_type: u16 },
    NameAndType { name: u16, descriptor: u16 },
    Other,
}

struct ConstantPool {
    entries: Vec<Constant>,
}

impl ConstantPool {
    fn get(&self, index: u16) -> ParseResult<&Constant> {
        match self.entries.get(usize::from(index)) {
            Some(Constant::Unusable) | None => Err(ClassFormatError::InvalidConstantIndex(index)),
            Some(constant) => Ok(constant),
        }
    }

    fn utf8(&self, index: u16) -> ParseResult<&str> {
        match self.get(index)? {
            Constant::Utf8(s) => Ok(s),
            _ => Err(ClassFormatError::UnexpectedConstant {
                index,
                expected: "Utf8",
            }),
        }
    }

    fn class_name(&self, index: u16) -> ParseResult<&str> {
        match self.get(index)? {
            Constant::Class { name } => self.utf8(*name),
            _ => Err(ClassFormatError::UnexpectedConstant {
                index,
                expected: "Class",
            }),
        }
    }

    /// Resolves a field/method reference to `(owner, name, descriptor)`.
    fn member_ref(&self, index: u16) -> ParseResult<(String, String, String)> {
        let (class, name_and_type) = match self.get(index)? {
            Constant::MemberRef {
                class,
                name_and_type,
            } => (*class, *name_and_type),
            _ => {
                return Err(ClassFormatError::UnexpectedConstant {
                    index,
                    expected: "member reference",
                })
            }
        };
        let (name, descriptor) = match self.get(name_and_type)? {
            Constant::NameAndType { name, descriptor } => (*name, *descriptor),
            _ => {
                return Err(ClassFormatError::UnexpectedConstant {
                    index: name_and_type,
                    expected: "NameAndType",
                })
            }
        };
        Ok((
            self.class_name(class)?.to_string(),
            self.utf8(name)?.to_string(),
            self.utf8(descriptor)?.to_string(),
        ))
    }
}

/// Big-endian cursor over class-file bytes.
pub struct ClassReader<'a> {
    bytes: &'a [u8],
    pos: usize,
    /// Absolute offset of `bytes[0]`, for error messages.
    base: usize,
}

impl<'a> ClassReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            pos: 0,
            base: 0,
        }
    }

    /// Decodes a complete class file.
    pub fn parse(bytes: &[u8]) -> ParseResult<ClassView> {
        ClassReader::new(bytes).read_class()
    }

    fn read_class(&mut self) -> ParseResult<ClassView> {
        let magic = self.u32()?;
        if magic != MAGIC {
            return Err(ClassFormatError::BadMagic(magic));
        }
        let _minor = self.u16()?;
        let _major = self.u16()?;

        let pool = self.read_constant_pool()?;

        let access_flags = self.u16()?;
        let this_class = self.u16()?;
        let name = pool.class_name(this_class)?.to_string();
        let super_class = self.u16()?;
        let super_name = if super_class == 0 {
            None
        } else {
            Some(pool.class_name(super_class)?.to_string())
        };

        let interfaces = self.u16()?;
        self.skip(usize::from(interfaces) * 2)?;

        let field_count = self.u16()?;
        let mut fields = Vec::with_capacity(usize::from(field_count));
        for _ in 0..field_count {
            let _access = self.u16()?;
            let name = pool.utf8(self.u16()?)?.to_string();
            let descriptor = pool.utf8(self.u16()?)?.to_string();
            self.skip_attributes()?;
            fields.push(FieldDecl { name, descriptor });
        }

        let method_count = self.u16()?;
        let mut methods = Vec::with_capacity(usize::from(method_count));
        for _ in 0..method_count {
            methods.push(self.read_method(&pool)?);
        }

        // Class-level attributes carry nothing the analyzers use.
        self.skip_attributes()?;

        Ok(ClassView {
            name,
            super_name,
            access_flags,
            fields,
            methods,
        })
    }

    fn read_constant_pool(&mut self) -> ParseResult<ConstantPool> {
        let count = self.u16()?;
        let mut entries = Vec::with_capacity(usize::from(count));
        entries.push(Constant::Unusable);

        let mut index: u16 = 1;
        while index < count {
            let tag = self.u8()?;
            let constant = match tag {
                TAG_UTF8 => {
                    let len = self.u16()?;
                    let raw = self.take(usize::from(len))?;
                    Constant::Utf8(decode_modified_utf8(raw)?)
                }
                TAG_INTEGER | TAG_FLOAT => {
                    self.skip(4)?;
                    Constant::Other
                }
                TAG_LONG | TAG_DOUBLE => {
                    // Takes this slot and the next; both must lie inside the pool.
                    if index >= count - 1 {
                        return Err(ClassFormatError::WideConstantOverflow(index));
                    }
                    self.skip(8)?;
                    entries.push(Constant::Other);
                    entries.push(Constant::Unusable);
                    index += 2;
                    continue;
                }
                TAG_CLASS => Constant::Class { name: self.u16()? },
                TAG_STRING | TAG_METHOD_TYPE | TAG_MODULE | TAG_PACKAGE => {
                    self.skip(2)?;
                    Constant::Other
                }
                TAG_FIELDREF | TAG_METHODREF | TAG_INTERFACE_METHODREF => Constant::MemberRef {
                    class: self.u16()?,
                    name_and_type: self.u16()?,
                },
                TAG_NAME_AND_TYPE => Constant::NameAndType {
                    name: self.u16()?,
                    descriptor: self.u16()?,
                },
                TAG_METHOD_HANDLE => {
                    self.skip(3)?;
                    Constant::Other
                }
                TAG_DYNAMIC | TAG_INVOKE_DYNAMIC => {
                    self.skip(4)?;
                    Constant::Other
                }
                _ => return Err(ClassFormatError::UnknownConstantTag { tag, index }),
            };
            entries.push(constant);
            index += 1;
        }

        Ok(ConstantPool { entries })
    }

    fn read_method(&mut self, pool: &ConstantPool) -> ParseResult<MethodDecl> {
        let _access = self.u16()?;
        let name = pool.utf8(self.u16()?)?.to_string();
        let descriptor = pool.utf8(self.u16()?)?.to_string();
        let mut method = MethodDecl::new(name, descriptor);

        let attributes = self.u16()?;
        for _ in 0..attributes {
            let attr_name = pool.utf8(self.u16()?)?;
            let len = self.u32()? as usize;
            let offset = self.base + self.pos;
            let body = self.take(len)?;
            if attr_name == ATTR_CODE {
                let mut code = ClassReader {
                    bytes: body,
                    pos: 0,
                    base: offset,
                };
                code.read_code(pool, &mut method)?;
            }
        }
        Ok(method)
    }

    fn read_code(&mut self, pool: &ConstantPool, method: &mut MethodDecl) -> ParseResult<()> {
        let _max_stack = self.u16()?;
        let _max_locals = self.u16()?;
        let code_len = self.u32()? as usize;
        let code = self.take(code_len)?;
        method.instructions = decode_instructions(code, pool)?;

        let exception_entries = self.u16()?;
        self.skip(usize::from(exception_entries) * 8)?;

        let attributes = self.u16()?;
        for _ in 0..attributes {
            let attr_name = pool.utf8(self.u16()?)?;
            let len = self.u32()? as usize;
            if attr_name != ATTR_LOCAL_VARIABLE_TABLE {
                self.skip(len)?;
                continue;
            }
            let entries = self.u16()?;
            for _ in 0..entries {
                let _start_pc = self.u16()?;
                let _length = self.u16()?;
                let name = pool.utf8(self.u16()?)?.to_string();
                let descriptor = pool.utf8(self.u16()?)?.to_string();
                let _slot = self.u16()?;
                method
                    .local_variables
                    .push(LocalVariable { name, descriptor });
            }
        }
        Ok(())
    }

    fn skip_attributes(&mut self) -> ParseResult<()> {
        let count = self.u16()?;
        for _ in 0..count {
            let _name = self.u16()?;
            let len = self.u32()? as usize;
            self.skip(len)?;
        }
        Ok(())
    }

    fn take(&mut self, len: usize) -> ParseResult<&'a [u8]> {
        let end = self.pos + len;
        let slice = self
            .bytes
            .get(self.pos..end)
            .ok_or(ClassFormatError::Truncated {
                offset: self.base + end,
            })?;
        self.pos = end;
        Ok(slice)
    }

    fn skip(&mut self, len: usize) -> ParseResult<()> {
        self.take(len).map(|_| ())
    }

    fn u8(&mut self) -> ParseResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> ParseResult<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> ParseResult<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }
}

fn decode_instructions(code: &[u8], pool: &ConstantPool) -> ParseResult<Vec<Instruction>> {
    let mut instructions = Vec::new();
    let mut pc = 0;

    while pc < code.len() {
        let opcode = code[pc];
        let len = instruction_length(code, pc)?;

        let instruction = match opcode {
            opcodes::GETSTATIC..=opcodes::PUTFIELD => {
                let (owner, name, descriptor) = pool.member_ref(operand_u16(code, pc))?;
                let kind = match opcode {
                    opcodes::GETSTATIC => FieldAccessKind::GetStatic,
                    opcodes::PUTSTATIC => FieldAccessKind::PutStatic,
                    opcodes::GETFIELD => FieldAccessKind::GetField,
                    _ => FieldAccessKind::PutField,
                };
                Instruction::FieldAccess {
                    kind,
                    owner,
                    name,
                    descriptor,
                }
            }
            opcodes::INVOKEVIRTUAL..=opcodes::INVOKEINTERFACE => {
                let (owner, name, descriptor) = pool.member_ref(operand_u16(code, pc))?;
                let kind = match opcode {
                    opcodes::INVOKEVIRTUAL => InvokeKind::Virtual,
                    opcodes::INVOKESPECIAL => InvokeKind::Special,
                    opcodes::INVOKESTATIC => InvokeKind::Static,
                    _ => InvokeKind::Interface,
                };
                Instruction::Invoke {
                    kind,
                    owner,
                    name,
                    descriptor,
                }
            }
            _ => Instruction::Other(opcode),
        };

        instructions.push(instruction);
        pc += len;
    }

    Ok(instructions)
}

/// Reads the constant-pool index that follows a field or invoke opcode.
/// `instruction_length` has already checked the operand bytes exist.
fn operand_u16(code: &[u8], pc: usize) -> u16 {
    u16::from_be_bytes([code[pc + 1], code[pc + 2]])
}

/// Decodes the JVM's modified UTF-8 (two-byte NUL, surrogate pairs encoded
/// as two three-byte sequences).
fn decode_modified_utf8(bytes: &[u8]) -> ParseResult<String> {
    if let Ok(s) = std::str::from_utf8(bytes) {
        return Ok(s.to_string());
    }

    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b & 0x80 == 0 {
            units.push(u16::from(b));
            i += 1;
        } else if b & 0xE0 == 0xC0 {
            let b2 = *bytes.get(i + 1).ok_or(ClassFormatError::InvalidUtf8)?;
            units.push((u16::from(b & 0x1F) << 6) | u16::from(b2 & 0x3F));
            i += 2;
        } else if b & 0xF0 == 0xE0 {
            let b2 = *bytes.get(i + 1).ok_or(ClassFormatError::InvalidUtf8)?;
            let b3 = *bytes.get(i + 2).ok_or(ClassFormatError::InvalidUtf8)?;
            units.push(
                (u16::from(b & 0x0F) << 12) | (u16::from(b2 & 0x3F) << 6) | u16::from(b3 & 0x3F),
            );
            i += 3;
        } else {
            return Err(ClassFormatError::InvalidUtf8);
        }
    }
    String::from_utf16(&units).map_err(|_| ClassFormatError::InvalidUtf8)
}
