//! Binary instruction-stream encoder.
//!
//! Serializes the IR into the length-variable byte format. Jump targets and
//! method constants are symbolic: a reference to an already-bound symbol
//! emits its minimal self-consistent encoding immediately, a forward
//! reference reserves the pessimistic 9-byte form. Once every symbol is
//! bound, a fixup pass shrinks references to their minimal width, shifting
//! later symbols and references down, until a fixed point.

use indexmap::IndexMap;
use umber_bytecode::{opcode, strings, varint, Instr, Module};

use super::EmitError;

/// An encoded reference site: `width` bytes at `at` holding the
/// displacement to `name`.
#[derive(Debug, Clone)]
pub struct RefSite {
    pub at: usize,
    pub width: usize,
    pub name: String,
}

/// A line of the human-readable listing.
#[derive(Debug, Clone)]
pub enum ListingEntry {
    FuncHeader(String),
    Label(String),
    Instr {
        text: String,
        ofs: usize,
        len: usize,
    },
}

/// Encoder output: the byte stream plus the symbol/reference tables and
/// listing needed to render it.
#[derive(Debug)]
pub struct EncodedModule {
    pub code: Vec<u8>,
    pub symbols: IndexMap<String, usize>,
    pub refs: Vec<RefSite>,
    pub listing: Vec<ListingEntry>,
}

/// Encode a module into its binary instruction stream.
pub fn encode(module: &Module) -> Result<EncodedModule, EmitError> {
    let mut enc = Encoder::default();
    for f in &module.funcs {
        enc.bind_symbol(&f.name)?;
        enc.listing.push(ListingEntry::FuncHeader(f.name.clone()));
        let start = enc.code.len();
        if f.arrayarg {
            enc.code.push(opcode::ARRAY_ARG_PUSH);
            enc.code.extend(varint::encode_uint(f.argc - 1, None));
            enc.note(format!("array_arg_push argc={}", f.argc), start);
        } else {
            enc.code.push(opcode::ARGC_CHK);
            enc.code.extend(varint::encode_uint(f.argc, None));
            enc.note(format!("argc_chk argc={}", f.argc), start);
        }
        for instr in &f.body {
            enc.instr(instr)?;
        }
    }
    enc.fixup()?;
    Ok(EncodedModule {
        code: enc.code,
        symbols: enc.symbols,
        refs: enc.refs,
        listing: enc.listing,
    })
}

#[derive(Default)]
struct Encoder {
    code: Vec<u8>,
    symbols: IndexMap<String, usize>,
    refs: Vec<RefSite>,
    listing: Vec<ListingEntry>,
}

/// Smallest self-consistent reference width: the displacement is measured
/// from the end of the field, so the width chosen must itself cover the
/// displacement it induces.
fn ref_width(target: usize, at: usize) -> usize {
    let mut sh = 4u32;
    for w in 1..=7usize {
        let disp = target as i64 - (at + w) as i64;
        if disp >= -(1i64 << sh) && disp < (1i64 << sh) {
            return w;
        }
        sh += 8;
    }
    varint::EXPLICIT_LEN
}

fn encode_ref(target: usize, at: usize, width: usize) -> Vec<u8> {
    let disp = target as i64 - (at + width) as i64;
    varint::encode_int(disp, Some(width), 5)
}

impl Encoder {
    fn bind_symbol(&mut self, name: &str) -> Result<(), EmitError> {
        let at = self.code.len();
        if self.symbols.insert(name.to_string(), at).is_some() {
            return Err(EmitError::DuplicateSymbol(name.to_string()));
        }
        Ok(())
    }

    fn note(&mut self, text: String, start: usize) {
        self.listing.push(ListingEntry::Instr {
            text,
            ofs: start,
            len: self.code.len() - start,
        });
    }

    /// Emit a reference field for `name` at the current position.
    fn reference(&mut self, name: &str) {
        let at = self.code.len();
        match self.symbols.get(name) {
            Some(&target) => {
                let width = ref_width(target, at);
                self.code.extend(encode_ref(target, at, width));
                self.refs.push(RefSite {
                    at,
                    width,
                    name: name.to_string(),
                });
            }
            None => {
                self.code.push(varint::EXPLICIT);
                self.code.extend([0u8; 8]);
                self.refs.push(RefSite {
                    at,
                    width: varint::EXPLICIT_LEN,
                    name: name.to_string(),
                });
            }
        }
    }

    fn instr(&mut self, instr: &Instr) -> Result<(), EmitError> {
        use Instr::*;

        if let Label { name } = instr {
            self.bind_symbol(name)?;
            self.listing.push(ListingEntry::Label(name.clone()));
            return Ok(());
        }

        let start = self.code.len();
        match instr {
            StackFree { size } => {
                self.code.push(opcode::STACK_FREE);
                self.code.extend(varint::encode_uint(*size, None));
            }
            StackAlloc { size } => {
                self.code.push(opcode::STACK_ALLOC);
                self.code.extend(varint::encode_uint(*size, None));
            }
            StackFreeAlloc {
                size_free,
                size_alloc,
            } => {
                self.code.push(opcode::STACK_FREE_ALLOC);
                self.code.extend(varint::encode_uint(*size_free, None));
                self.code.extend(varint::encode_uint(*size_alloc, None));
            }
            InstAssign { dst, src } => {
                self.code.push(opcode::INST_ASSIGN);
                self.code.extend(dst.encode());
                self.code.extend(src.encode());
            }
            StackPush { src } => {
                self.code.push(opcode::STACK_PUSH);
                self.code.extend(src.encode());
            }
            MethodCall { dst, sel, argc } => {
                self.code.push(opcode::METHOD_CALL);
                self.code.extend(dst.encode());
                self.code.extend(strings::encode_str_hash(sel));
                self.code.extend(varint::encode_uint(*argc, None));
            }
            Ret => self.code.push(opcode::RET),
            Retd => self.code.push(opcode::RETD),
            ExceptPush { var } => {
                self.code.push(opcode::EXCEPT_PUSH);
                self.code.extend(var.encode());
            }
            ExceptRaise { src } => {
                self.code.push(opcode::EXCEPT_RAISE);
                self.code.extend(src.encode());
            }
            ExceptReraise => self.code.push(opcode::EXCEPT_RERAISE),
            ExceptPop { cnt } => {
                if *cnt == 1 {
                    self.code.push(opcode::EXCEPT_POP_1);
                } else {
                    self.code.push(opcode::EXCEPT_POP_N);
                    self.code.extend(varint::encode_uint(*cnt, None));
                }
            }
            Jmp { label } => {
                self.code.push(opcode::JMP);
                self.reference(label);
            }
            Jt { label, .. } => {
                self.code.push(opcode::JT);
                self.reference(label);
            }
            Jf { label, .. } => {
                self.code.push(opcode::JF);
                self.reference(label);
            }
            Jx { label } => {
                self.code.push(opcode::JX);
                self.reference(label);
            }
            Popjt { label } => {
                self.code.push(opcode::POPJT);
                self.reference(label);
            }
            Popjf { label } => {
                self.code.push(opcode::POPJF);
                self.reference(label);
            }
            EnvironAt { dst, name } => {
                self.code.push(opcode::ENVIRON_AT);
                self.code.extend(dst.encode());
                self.code.extend(strings::encode_str_hash(name));
            }
            EnvironAtPush { name } => {
                self.code.push(opcode::ENVIRON_AT_PUSH);
                self.code.extend(strings::encode_str_hash(name));
            }
            NilAssign { dst } => {
                self.code.push(opcode::NIL_ASSIGN);
                self.code.extend(dst.encode());
            }
            NilPush => self.code.push(opcode::NIL_PUSH),
            BoolNewc { dst, val } => {
                self.code.push(if *val {
                    opcode::BOOL_NEWC_TRUE
                } else {
                    opcode::BOOL_NEWC_FALSE
                });
                self.code.extend(dst.encode());
            }
            BoolPushc { val } => {
                self.code.push(if *val {
                    opcode::BOOL_PUSHC_TRUE
                } else {
                    opcode::BOOL_PUSHC_FALSE
                });
            }
            IntNewc { dst, val } => {
                self.code.push(opcode::INT_NEWC);
                self.code.extend(dst.encode());
                self.code.extend(varint::encode_int(*val, None, 5));
            }
            IntPushc { val } => {
                self.code.push(opcode::INT_PUSHC);
                self.code.extend(varint::encode_int(*val, None, 5));
            }
            FloatNewc { dst, val } => {
                self.code.push(opcode::FLOAT_NEWC);
                self.code.extend(dst.encode());
                self.code.extend(strings::encode_float(*val));
            }
            FloatPushc { val } => {
                self.code.push(opcode::FLOAT_PUSHC);
                self.code.extend(strings::encode_float(*val));
            }
            MethodNewc { dst, func } => {
                self.code.push(opcode::METHOD_NEWC);
                self.code.extend(dst.encode());
                self.reference(func);
            }
            MethodPushc { func } => {
                self.code.push(opcode::METHOD_PUSHC);
                self.reference(func);
            }
            StrNewc { dst, val } => {
                self.code.push(opcode::STR_NEWC);
                self.code.extend(dst.encode());
                self.code.extend(strings::encode_str(val));
            }
            StrPushc { val } => {
                self.code.push(opcode::STR_PUSHC);
                self.code.extend(strings::encode_str(val));
            }
            StrNewch { dst, val } => {
                self.code.push(opcode::STR_NEWCH);
                self.code.extend(dst.encode());
                self.code.extend(strings::encode_str_hash(val));
            }
            StrPushch { val } => {
                self.code.push(opcode::STR_PUSHCH);
                self.code.extend(strings::encode_str_hash(val));
            }
            Label { .. } => unreachable!(),
        }
        self.note(instr.to_string(), start);
        Ok(())
    }

    /// Shrink references to their minimal self-consistent width until no
    /// reference shrinks, rewriting every reference each round. Later
    /// references are processed first; shrinking can only reduce an earlier
    /// reference's span, so the loop terminates.
    fn fixup(&mut self) -> Result<(), EmitError> {
        loop {
            let mut shrunk = false;
            for i in (0..self.refs.len()).rev() {
                let RefSite { at, width, .. } = self.refs[i];
                let target = self.target_of(i)?;
                let w = ref_width(target, at);
                if w < width {
                    let save = width - w;
                    self.code.drain(at + w..at + width);
                    for v in self.symbols.values_mut() {
                        if *v > at {
                            *v -= save;
                        }
                    }
                    for r in &mut self.refs {
                        if r.at > at {
                            r.at -= save;
                        }
                    }
                    self.refs[i].width = w;
                    for e in &mut self.listing {
                        if let ListingEntry::Instr { ofs, len, .. } = e {
                            if *ofs > at {
                                *ofs -= save;
                            } else if at < *ofs + *len {
                                *len -= save;
                            }
                        }
                    }
                    shrunk = true;
                }
            }
            for i in 0..self.refs.len() {
                let target = self.target_of(i)?;
                let RefSite { at, width, .. } = self.refs[i];
                let bytes = encode_ref(target, at, width);
                self.code[at..at + width].copy_from_slice(&bytes);
            }
            if !shrunk {
                return Ok(());
            }
        }
    }

    fn target_of(&self, i: usize) -> Result<usize, EmitError> {
        let name = &self.refs[i].name;
        self.symbols
            .get(name)
            .copied()
            .ok_or_else(|| EmitError::UndefinedSymbol(name.clone()))
    }
}
