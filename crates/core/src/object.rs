//! navm object-file container
//!
//! Serializes a compiled program (string-literal pool, global symbols,
//! functions) into the big-endian binary layout the VM loads:
//!
//! ```text
//! magic              u32 = 0x72303b3e
//! version            u32 = 0x00000001
//! string literals    per literal: is_const u8, length u32, ASCII bytes
//! global count       u32 = literals + declared globals + functions
//! global symbols     variables: is_const u8, length u32 = 8, 8 zero bytes
//!                    functions: is_const u8 = 1, name length u32, name bytes
//! function count     u32 (functions with empty bodies are not serialized)
//! functions          name offset, rets, args, locals, body length (all u32),
//!                    then the encoded instructions
//! ```
//!
//! The writer can record one human-readable note per emitted field, so a
//! verbose build can print the object as an annotated hex listing without
//! changing a single byte of output.

use std::fmt;

use crate::instruction::Instruction;

/// First four bytes of every object file.
pub const MAGIC: u32 = 0x7230_3b3e;
/// Container format version.
pub const VERSION: u32 = 0x0000_0001;

/// A global symbol declared after the string-literal slots.
#[derive(Debug, Clone, PartialEq)]
pub enum GlobalSymbol {
    /// An 8-byte, zero-initialized variable slot.
    Variable { is_const: bool },
    /// A function entry; the slot's content is the function's name, which is
    /// how `callname` resolves its callee.
    Function { name: String },
}

/// One function record.
///
/// `name_offset` is the function's own index in the global symbol list
/// (string-literal slots included). The `name` field is carried for
/// listings only and never serialized.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub name_offset: u32,
    pub num_return_values: u32,
    pub num_args: u32,
    pub num_local_vars: u32,
    pub body: Vec<Instruction>,
}

/// Everything the object writer needs, in emission order.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectProgram {
    /// Decoded string literals; index doubles as the global-symbol offset.
    pub string_literals: Vec<String>,
    /// Declared globals and functions, in declaration order.
    pub globals: Vec<GlobalSymbol>,
    /// All functions in declaration order; empty bodies (builtins) are
    /// skipped during serialization but still occupy their global slot.
    pub functions: Vec<FunctionDef>,
}

impl ObjectProgram {
    /// Serialize to the byte stream.
    pub fn to_bytes(&self) -> Vec<u8> {
        let (bytes, _) = self.write(false);
        bytes
    }

    /// Serialize and also return one note per emitted field, for verbose
    /// hex listings. The bytes are identical to [`ObjectProgram::to_bytes`].
    pub fn to_bytes_annotated(&self) -> (Vec<u8>, Vec<String>) {
        self.write(true)
    }

    fn write(&self, annotate: bool) -> (Vec<u8>, Vec<String>) {
        let mut w = ObjectWriter::new(annotate);
        w.put_u32(MAGIC, "magic");
        w.put_u32(VERSION, "version");

        for s in &self.string_literals {
            w.put_u8(1, "const");
            w.put_u32(s.len() as u32, "len(str lit)");
            w.put_str(s, "str lit");
        }

        w.put_u32(
            (self.string_literals.len() + self.globals.len()) as u32,
            "num globals",
        );
        for symbol in &self.globals {
            match symbol {
                GlobalSymbol::Variable { is_const } => {
                    w.put_u8(u8::from(*is_const), "const");
                    w.put_u32(8, "len(gvar)");
                    w.put_bytes(&[0u8; 8], "gvar value");
                }
                GlobalSymbol::Function { name } => {
                    w.put_u8(1, "const");
                    w.put_u32(name.len() as u32, "len(fn name)");
                    w.put_str(name, "fn name");
                }
            }
        }

        let serialized: Vec<&FunctionDef> =
            self.functions.iter().filter(|f| !f.body.is_empty()).collect();
        w.put_u32(serialized.len() as u32, "num funcs");
        for func in serialized {
            w.put_u32(func.name_offset, "fn idx");
            w.put_u32(func.num_return_values, "num rets");
            w.put_u32(func.num_args, "num args");
            w.put_u32(func.num_local_vars, "num locals");
            w.put_u32(func.body.len() as u32, "num instrs");
            for instr in &func.body {
                w.put_instruction(instr);
            }
        }

        w.finish()
    }
}

impl fmt::Display for FunctionDef {
    /// Human-readable listing, one instruction per line with its ip.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "fn {} [{}] args={} locals={} rets={} {{",
            self.name, self.name_offset, self.num_args, self.num_local_vars, self.num_return_values
        )?;
        for instr in &self.body {
            writeln!(f, "    {}: {}", instr.ip, instr)?;
        }
        write!(f, "}}")
    }
}

/// Byte-stream builder with optional per-field notes.
struct ObjectWriter {
    buf: Vec<u8>,
    notes: Option<Vec<String>>,
}

impl ObjectWriter {
    fn new(annotate: bool) -> Self {
        ObjectWriter {
            buf: Vec::new(),
            notes: annotate.then(Vec::new),
        }
    }

    fn note(&mut self, label: &str, rendered: String) {
        if let Some(notes) = &mut self.notes {
            notes.push(format!("{label:<17}: {rendered}"));
        }
    }

    fn put_u8(&mut self, value: u8, label: &str) {
        self.buf.push(value);
        self.note(label, format!("{value:02x}"));
    }

    fn put_u32(&mut self, value: u32, label: &str) {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self.note(label, hex(&value.to_be_bytes()));
    }

    fn put_bytes(&mut self, bytes: &[u8], label: &str) {
        self.buf.extend_from_slice(bytes);
        self.note(label, hex(bytes));
    }

    fn put_str(&mut self, s: &str, label: &str) {
        self.buf.extend_from_slice(s.as_bytes());
        self.note(label, s.to_string());
    }

    fn put_instruction(&mut self, instr: &Instruction) {
        let before = self.buf.len();
        instr.encode_into(&mut self.buf);
        if self.notes.is_some() {
            let rendered = format!("{} [{}]", instr, hex(&self.buf[before..]));
            self.note("instr", rendered);
        }
    }

    fn finish(self) -> (Vec<u8>, Vec<String>) {
        (self.buf, self.notes.unwrap_or_default())
    }
}

fn hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&format!("{b:02x}"));
    }
    out
}
