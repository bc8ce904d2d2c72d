//! JVM opcode constants and instruction lengths.

use super::ClassFormatError;

pub const GETSTATIC: u8 = 0xb2;
pub const PUTSTATIC: u8 = 0xb3;
pub const GETFIELD: u8 = 0xb4;
pub const PUTFIELD: u8 = 0xb5;
pub const INVOKEVIRTUAL: u8 = 0xb6;
pub const INVOKESPECIAL: u8 = 0xb7;
pub const INVOKESTATIC: u8 = 0xb8;
pub const INVOKEINTERFACE: u8 = 0xb9;
pub const INVOKEDYNAMIC: u8 = 0xba;

const IINC: u8 = 0x84;
const TABLESWITCH: u8 = 0xaa;
const LOOKUPSWITCH: u8 = 0xab;
const WIDE: u8 = 0xc4;

/// Returns the encoded length in bytes of the instruction starting at `pc`.
///
/// Switch instructions are padded so their operands start on a 4-byte
/// boundary relative to the start of the code array.
pub fn instruction_length(code: &[u8], pc: usize) -> Result<usize, ClassFormatError> {
    let opcode = code[pc];
    let len = match opcode {
        0x00..=0x0f => 1,
        0x10 => 2,
        0x11 => 3,
        0x12 => 2,
        0x13 | 0x14 => 3,
        0x15..=0x19 => 2,
        0x1a..=0x35 => 1,
        0x36..=0x3a => 2,
        0x3b..=0x83 => 1,
        IINC => 3,
        0x85..=0x98 => 1,
        0x99..=0xa8 => 3,
        0xa9 => 2,
        TABLESWITCH => {
            let base = pc + 1 + switch_padding(pc);
            let low = read_i32(code, base + 4)?;
            let high = read_i32(code, base + 8)?;
            if high < low {
                return Err(ClassFormatError::InvalidInstruction { opcode, pc });
            }
            let entries = (i64::from(high) - i64::from(low) + 1) as usize;
            base - pc + 12 + entries * 4
        }
        LOOKUPSWITCH => {
            let base = pc + 1 + switch_padding(pc);
            let pairs = read_i32(code, base + 4)?;
            if pairs < 0 {
                return Err(ClassFormatError::InvalidInstruction { opcode, pc });
            }
            base - pc + 8 + pairs as usize * 8
        }
        0xac..=0xb1 => 1,
        GETSTATIC..=INVOKESTATIC => 3,
        INVOKEINTERFACE | INVOKEDYNAMIC => 5,
        0xbb => 3,
        0xbc => 2,
        0xbd => 3,
        0xbe | 0xbf => 1,
        0xc0 | 0xc1 => 3,
        0xc2 | 0xc3 => 1,
        WIDE => match code.get(pc + 1) {
            Some(&IINC) => 6,
            Some(_) => 4,
            None => return Err(ClassFormatError::Truncated { offset: pc + 1 }),
        },
        0xc5 => 4,
        0xc6 | 0xc7 => 3,
        0xc8 | 0xc9 => 5,
        0xca | 0xfe | 0xff => 1,
        _ => return Err(ClassFormatError::InvalidInstruction { opcode, pc }),
    };

    if pc + len > code.len() {
        return Err(ClassFormatError::Truncated { offset: pc + len });
    }
    Ok(len)
}

fn switch_padding(pc: usize) -> usize {
    (4 - (pc + 1) % 4) % 4
}

fn read_i32(code: &[u8], at: usize) -> Result<i32, ClassFormatError> {
    code.get(at..at + 4)
        .map(|b| i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or(ClassFormatError::Truncated { offset: at + 4 })
}
