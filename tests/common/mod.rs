//! Test-only class-file writer.
//!
//! Assembles just enough of the class-file format for the reader: the
//! constant pool, fields, and methods with a `Code` attribute and an optional
//! `LocalVariableTable`.

#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

const MAGIC: u32 = 0xCAFE_BABE;
const MAJOR_VERSION: u16 = 52;

const TAG_UTF8: u8 = 1;
const TAG_CLASS: u8 = 7;
const TAG_FIELDREF: u8 = 9;
const TAG_METHODREF: u8 = 10;
const TAG_INTERFACE_METHODREF: u8 = 11;
const TAG_NAME_AND_TYPE: u8 = 12;

pub const ACC_PUBLIC: u16 = 0x0001;
pub const ACC_ABSTRACT: u16 = 0x0400;
pub const ACC_MODULE: u16 = 0x8000;

/// One bytecode instruction the writer can emit.
#[derive(Debug, Clone)]
pub enum Op {
    Aload0,
    AconstNull,
    Return,
    GetField(String, String, String),
    PutField(String, String, String),
    GetStatic(String, String, String),
    InvokeVirtual(String, String, String),
    InvokeSpecial(String, String, String),
    InvokeStatic(String, String, String),
    InvokeInterface(String, String, String),
}

pub fn get_field(owner: &str, name: &str, descriptor: &str) -> Op {
    Op::GetField(owner.into(), name.into(), descriptor.into())
}

pub fn put_field(owner: &str, name: &str, descriptor: &str) -> Op {
    Op::PutField(owner.into(), name.into(), descriptor.into())
}

pub fn get_static(owner: &str, name: &str, descriptor: &str) -> Op {
    Op::GetStatic(owner.into(), name.into(), descriptor.into())
}

pub fn invoke_virtual(owner: &str, name: &str, descriptor: &str) -> Op {
    Op::InvokeVirtual(owner.into(), name.into(), descriptor.into())
}

pub fn invoke_special(owner: &str, name: &str, descriptor: &str) -> Op {
    Op::InvokeSpecial(owner.into(), name.into(), descriptor.into())
}

pub fn invoke_static(owner: &str, name: &str, descriptor: &str) -> Op {
    Op::InvokeStatic(owner.into(), name.into(), descriptor.into())
}

pub fn invoke_interface(owner: &str, name: &str, descriptor: &str) -> Op {
    Op::InvokeInterface(owner.into(), name.into(), descriptor.into())
}

#[derive(Debug, Clone)]
pub struct MethodSpec {
    name: String,
    descriptor: String,
    code: Vec<Op>,
    locals: Vec<(String, String)>,
}

impl MethodSpec {
    pub fn new(name: &str, descriptor: &str) -> Self {
        Self {
            name: name.into(),
            descriptor: descriptor.into(),
            code: Vec::new(),
            locals: Vec::new(),
        }
    }

    pub fn op(mut self, op: Op) -> Self {
        self.code.push(op);
        self
    }

    pub fn local(mut self, name: &str, descriptor: &str) -> Self {
        self.locals.push((name.into(), descriptor.into()));
        self
    }

    /// Calls the root constructor and returns.
    pub fn constructor() -> Self {
        Self::new("<init>", "()V")
            .op(Op::Aload0)
            .op(invoke_special("java/lang/Object", "<init>", "()V"))
    }
}

/// A class to assemble.
#[derive(Debug, Clone)]
pub struct ClassSpec {
    name: String,
    super_name: Option<String>,
    access: u16,
    fields: Vec<(String, String)>,
    methods: Vec<MethodSpec>,
}

impl ClassSpec {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            super_name: Some("java/lang/Object".into()),
            access: ACC_PUBLIC,
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn extends(mut self, super_name: &str) -> Self {
        self.super_name = Some(super_name.into());
        self
    }

    pub fn access(mut self, access: u16) -> Self {
        self.access = access;
        self
    }

    pub fn field(mut self, name: &str, descriptor: &str) -> Self {
        self.fields.push((name.into(), descriptor.into()));
        self
    }

    pub fn method(mut self, method: MethodSpec) -> Self {
        self.methods.push(method);
        self
    }

    /// Serializes the class file.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut pool = Pool::default();
        let mut body = Vec::new();

        put_u16(&mut body, self.access);
        put_u16(&mut body, pool.class(&self.name));
        let super_index = self.super_name.as_deref().map_or(0, |s| pool.class(s));
        put_u16(&mut body, super_index);
        put_u16(&mut body, 0);

        put_u16(&mut body, self.fields.len() as u16);
        for (name, descriptor) in &self.fields {
            put_u16(&mut body, ACC_PUBLIC);
            put_u16(&mut body, pool.utf8(name));
            put_u16(&mut body, pool.utf8(descriptor));
            put_u16(&mut body, 0);
        }

        put_u16(&mut body, self.methods.len() as u16);
        for method in &self.methods {
            write_method(&mut body, &mut pool, method);
        }
        put_u16(&mut body, 0);

        let mut out = Vec::new();
        out.extend_from_slice(&MAGIC.to_be_bytes());
        put_u16(&mut out, 0);
        put_u16(&mut out, MAJOR_VERSION);
        put_u16(&mut out, pool.count);
        out.extend_from_slice(&pool.bytes);
        out.extend_from_slice(&body);
        out
    }

    /// Writes `<dir>/<internal name>.class`, creating package directories.
    pub fn write_to(&self, dir: &Path) -> PathBuf {
        let path = dir.join(format!("{}.class", self.name));
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, self.to_bytes()).unwrap();
        path
    }
}

fn write_method(body: &mut Vec<u8>, pool: &mut Pool, method: &MethodSpec) {
    let has_code = !method.code.is_empty() || !method.locals.is_empty();
    put_u16(body, if has_code { ACC_PUBLIC } else { ACC_PUBLIC | ACC_ABSTRACT });
    put_u16(body, pool.utf8(&method.name));
    put_u16(body, pool.utf8(&method.descriptor));
    if !has_code {
        put_u16(body, 0);
        return;
    }
    put_u16(body, 1);

    let mut code = Vec::new();
    for op in &method.code {
        encode_op(&mut code, pool, op);
    }
    code.push(0xB1);

    let mut attr = Vec::new();
    put_u16(&mut attr, 8);
    put_u16(&mut attr, 8);
    attr.extend_from_slice(&(code.len() as u32).to_be_bytes());
    attr.extend_from_slice(&code);
    put_u16(&mut attr, 0);
    if method.locals.is_empty() {
        put_u16(&mut attr, 0);
    } else {
        put_u16(&mut attr, 1);
        put_u16(&mut attr, pool.utf8("LocalVariableTable"));
        let len = 2 + 10 * method.locals.len() as u32;
        attr.extend_from_slice(&len.to_be_bytes());
        put_u16(&mut attr, method.locals.len() as u16);
        for (slot, (name, descriptor)) in method.locals.iter().enumerate() {
            put_u16(&mut attr, 0);
            put_u16(&mut attr, code.len() as u16);
            put_u16(&mut attr, pool.utf8(name));
            put_u16(&mut attr, pool.utf8(descriptor));
            put_u16(&mut attr, slot as u16);
        }
    }

    put_u16(body, pool.utf8("Code"));
    body.extend_from_slice(&(attr.len() as u32).to_be_bytes());
    body.extend_from_slice(&attr);
}

fn encode_op(code: &mut Vec<u8>, pool: &mut Pool, op: &Op) {
    let (opcode, index) = match op {
        Op::Aload0 => return code.push(0x2A),
        Op::AconstNull => return code.push(0x01),
        Op::Return => return code.push(0xB1),
        Op::GetStatic(o, n, d) => (0xB2, pool.member(TAG_FIELDREF, o, n, d)),
        Op::GetField(o, n, d) => (0xB4, pool.member(TAG_FIELDREF, o, n, d)),
        Op::PutField(o, n, d) => (0xB5, pool.member(TAG_FIELDREF, o, n, d)),
        Op::InvokeVirtual(o, n, d) => (0xB6, pool.member(TAG_METHODREF, o, n, d)),
        Op::InvokeSpecial(o, n, d) => (0xB7, pool.member(TAG_METHODREF, o, n, d)),
        Op::InvokeStatic(o, n, d) => (0xB8, pool.member(TAG_METHODREF, o, n, d)),
        Op::InvokeInterface(o, n, d) => {
            let index = pool.member(TAG_INTERFACE_METHODREF, o, n, d);
            code.push(0xB9);
            put_u16(code, index);
            code.extend_from_slice(&[1, 0]);
            return;
        }
    };
    code.push(opcode);
    put_u16(code, index);
}

#[derive(Default)]
struct Pool {
    bytes: Vec<u8>,
    count: u16,
    seen: HashMap<(u8, Vec<u16>, String), u16>,
}

impl Pool {
    fn next(&mut self) -> u16 {
        if self.count == 0 {
            self.count = 1;
        }
        let index = self.count;
        self.count += 1;
        index
    }

    fn intern(&mut self, key: (u8, Vec<u16>, String), write: impl FnOnce(&mut Vec<u8>)) -> u16 {
        if let Some(index) = self.seen.get(&key) {
            return *index;
        }
        let index = self.next();
        write(&mut self.bytes);
        self.seen.insert(key, index);
        index
    }

    fn utf8(&mut self, value: &str) -> u16 {
        let owned = value.to_string();
        self.intern((TAG_UTF8, Vec::new(), owned), |out| {
            out.push(TAG_UTF8);
            put_u16(out, value.len() as u16);
            out.extend_from_slice(value.as_bytes());
        })
    }

    fn class(&mut self, name: &str) -> u16 {
        let name_index = self.utf8(name);
        self.intern((TAG_CLASS, vec![name_index], String::new()), |out| {
            out.push(TAG_CLASS);
            put_u16(out, name_index);
        })
    }

    fn name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let name_index = self.utf8(name);
        let descriptor_index = self.utf8(descriptor);
        let key = (TAG_NAME_AND_TYPE, vec![name_index, descriptor_index], String::new());
        self.intern(key, |out| {
            out.push(TAG_NAME_AND_TYPE);
            put_u16(out, name_index);
            put_u16(out, descriptor_index);
        })
    }

    fn member(&mut self, tag: u8, owner: &str, name: &str, descriptor: &str) -> u16 {
        let class_index = self.class(owner);
        let nat_index = self.name_and_type(name, descriptor);
        self.intern((tag, vec![class_index, nat_index], String::new()), |out| {
            out.push(tag);
            put_u16(out, class_index);
            put_u16(out, nat_index);
        })
    }
}

fn put_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

/// A small service layer:
///
/// - `Service` holds a `Repository`, calls it, and takes a `Request`.
/// - `Repository` has two methods sharing a field and an unrelated constructor.
/// - `Request` and `Entity` are plain data classes.
pub fn sample_classes() -> Vec<ClassSpec> {
    vec![
        ClassSpec::new("com/acme/Repository")
            .field("items", "Ljava/util/List;")
            .method(MethodSpec::constructor())
            .method(
                MethodSpec::new("find", "(Ljava/lang/String;)Lcom/acme/Entity;")
                    .op(Op::Aload0)
                    .op(get_field("com/acme/Repository", "items", "Ljava/util/List;"))
                    .local("this", "Lcom/acme/Repository;")
                    .local("id", "Ljava/lang/String;"),
            )
            .method(
                MethodSpec::new("size", "()I")
                    .op(Op::Aload0)
                    .op(get_field("com/acme/Repository", "items", "Ljava/util/List;")),
            ),
        ClassSpec::new("com/acme/Service")
            .field("repo", "Lcom/acme/Repository;")
            .method(
                MethodSpec::constructor()
                    .op(Op::Aload0)
                    .op(Op::AconstNull)
                    .op(put_field("com/acme/Service", "repo", "Lcom/acme/Repository;")),
            )
            .method(
                MethodSpec::new("handle", "(Lcom/acme/Request;)V")
                    .op(Op::Aload0)
                    .op(get_field("com/acme/Service", "repo", "Lcom/acme/Repository;"))
                    .op(invoke_virtual(
                        "com/acme/Repository",
                        "find",
                        "(Ljava/lang/String;)Lcom/acme/Entity;",
                    ))
                    .local("this", "Lcom/acme/Service;")
                    .local("request", "Lcom/acme/Request;"),
            ),
        ClassSpec::new("com/acme/Request").field("id", "Ljava/lang/String;"),
        ClassSpec::new("com/acme/Entity"),
    ]
}

/// Writes [`sample_classes`] below `dir`.
pub fn write_sample_classes(dir: &Path) {
    for class in sample_classes() {
        class.write_to(dir);
    }
}
