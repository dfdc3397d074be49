//! Stack machine instructions and their WebAssembly text rendering.

use std::fmt::Display;

/// One instruction of the target stack machine. Values are i64 words;
/// addresses and conditions are i32.
#[derive(Debug, Clone, PartialEq)]
pub enum Instr {
    I64Const(i64),
    I32Const(i32),
    LocalGet(String),
    LocalSet(String),

    /// Pops an i32 address, pushes the word at `address + offset`.
    I64Load { offset: u32 },
    /// Pops an i64 value and an i32 address.
    I64Store { offset: u32 },
    /// Pops an i32 byte value and an i32 address.
    I32Store8 { offset: u32 },
    I32WrapI64,
    I64ExtendI32U,

    I64Add,
    I64Sub,
    I64Mul,
    I64DivS,
    I64RemS,
    I64And,
    I64Or,
    I64Xor,

    I64Eq,
    I64Ne,
    I64LtS,
    I64LeS,
    I64GtS,
    I64GeS,
    I32Eqz,

    Call(String),
    Drop,
    Return,

    /// Pops an i32 condition. `result` marks an i64-valued if.
    If {
        result: bool,
        then: Vec<Instr>,
        otherwise: Vec<Instr>,
    },
    Block(Vec<Instr>),
    Loop(Vec<Instr>),
    Br(u32),
    BrIf(u32),
}

impl Instr {
    fn mnemonic(&self) -> String {
        match self {
            Instr::I64Const(value) => format!("i64.const {}", value),
            Instr::I32Const(value) => format!("i32.const {}", value),
            Instr::LocalGet(name) => format!("local.get ${}", name),
            Instr::LocalSet(name) => format!("local.set ${}", name),
            Instr::I64Load { offset } => with_offset("i64.load", *offset),
            Instr::I64Store { offset } => with_offset("i64.store", *offset),
            Instr::I32Store8 { offset } => with_offset("i32.store8", *offset),
            Instr::I32WrapI64 => String::from("i32.wrap_i64"),
            Instr::I64ExtendI32U => String::from("i64.extend_i32_u"),
            Instr::I64Add => String::from("i64.add"),
            Instr::I64Sub => String::from("i64.sub"),
            Instr::I64Mul => String::from("i64.mul"),
            Instr::I64DivS => String::from("i64.div_s"),
            Instr::I64RemS => String::from("i64.rem_s"),
            Instr::I64And => String::from("i64.and"),
            Instr::I64Or => String::from("i64.or"),
            Instr::I64Xor => String::from("i64.xor"),
            Instr::I64Eq => String::from("i64.eq"),
            Instr::I64Ne => String::from("i64.ne"),
            Instr::I64LtS => String::from("i64.lt_s"),
            Instr::I64LeS => String::from("i64.le_s"),
            Instr::I64GtS => String::from("i64.gt_s"),
            Instr::I64GeS => String::from("i64.ge_s"),
            Instr::I32Eqz => String::from("i32.eqz"),
            Instr::Call(name) => format!("call ${}", name),
            Instr::Drop => String::from("drop"),
            Instr::Return => String::from("return"),
            Instr::If { result: true, .. } => String::from("(if (result i64)"),
            Instr::If { result: false, .. } => String::from("(if"),
            Instr::Block(_) => String::from("(block"),
            Instr::Loop(_) => String::from("(loop"),
            Instr::Br(depth) => format!("br {}", depth),
            Instr::BrIf(depth) => format!("br_if {}", depth),
        }
    }

    /// Appends this instruction to `out`, one instruction per line.
    pub fn render(&self, indent: usize, out: &mut Vec<String>) {
        let pad = "  ".repeat(indent);

        match self {
            Instr::If {
                then, otherwise, ..
            } => {
                out.push(format!("{}{}", pad, self.mnemonic()));
                out.push(format!("{}  (then", pad));
                render_all(then, indent + 2, out);
                out.push(format!("{}  )", pad));
                if !otherwise.is_empty() {
                    out.push(format!("{}  (else", pad));
                    render_all(otherwise, indent + 2, out);
                    out.push(format!("{}  )", pad));
                }
                out.push(format!("{})", pad));
            }
            Instr::Block(body) | Instr::Loop(body) => {
                out.push(format!("{}{}", pad, self.mnemonic()));
                render_all(body, indent + 1, out);
                out.push(format!("{})", pad));
            }
            _ => out.push(format!("{}{}", pad, self.mnemonic())),
        }
    }
}

fn with_offset(mnemonic: &str, offset: u32) -> String {
    if offset == 0 {
        mnemonic.to_string()
    } else {
        format!("{} offset={}", mnemonic, offset)
    }
}

pub fn render_all(instrs: &[Instr], indent: usize, out: &mut Vec<String>) {
    for instr in instrs {
        instr.render(indent, out);
    }
}

impl Display for Instr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut lines = vec![];
        self.render(0, &mut lines);
        write!(f, "{}", lines.join("\n"))
    }
}
