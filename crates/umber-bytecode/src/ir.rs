//! The stack-machine IR emitted by the generator.
//!
//! A module is a flat list of functions; a function body is a flat list of
//! instructions with symbolic labels. Instruction order is load-bearing:
//! the generator's traversal order defines stack-machine correctness.

use crate::loc::Loc;

/// A single IR instruction.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Instr {
    StackAlloc { size: u64 },
    StackFree { size: u64 },
    StackFreeAlloc { size_free: u64, size_alloc: u64 },
    InstAssign { dst: Loc, src: Loc },
    StackPush { src: Loc },
    MethodCall { dst: Loc, sel: String, argc: u64 },
    Ret,
    Retd,
    ExceptPush { var: Loc },
    ExceptRaise { src: Loc },
    ExceptReraise,
    ExceptPop { cnt: u64 },
    Jmp { label: String },
    Jt { src: Loc, label: String },
    Jf { src: Loc, label: String },
    Jx { label: String },
    Popjt { label: String },
    Popjf { label: String },
    EnvironAt { dst: Loc, name: String },
    EnvironAtPush { name: String },
    NilAssign { dst: Loc },
    NilPush,
    BoolNewc { dst: Loc, val: bool },
    BoolPushc { val: bool },
    IntNewc { dst: Loc, val: i64 },
    IntPushc { val: i64 },
    FloatNewc { dst: Loc, val: f64 },
    FloatPushc { val: f64 },
    MethodNewc { dst: Loc, func: String },
    MethodPushc { func: String },
    StrNewc { dst: Loc, val: String },
    StrPushc { val: String },
    StrNewch { dst: Loc, val: String },
    StrPushch { val: String },
    Label { name: String },
}

impl Instr {
    pub fn is_label(&self) -> bool {
        matches!(self, Instr::Label { .. })
    }
}

impl std::fmt::Display for Instr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use Instr::*;
        match self {
            StackAlloc { size } => write!(f, "stack_alloc size={size}"),
            StackFree { size } => write!(f, "stack_free size={size}"),
            StackFreeAlloc { size_free, size_alloc } => {
                write!(f, "stack_free_alloc size_free={size_free} size_alloc={size_alloc}")
            }
            InstAssign { dst, src } => write!(f, "inst_assign dst={dst} src={src}"),
            StackPush { src } => write!(f, "stack_push src={src}"),
            MethodCall { dst, sel, argc } => {
                write!(f, "method_call dst={dst} sel={sel} argc={argc}")
            }
            Ret => write!(f, "ret"),
            Retd => write!(f, "retd"),
            ExceptPush { var } => write!(f, "except_push var={var}"),
            ExceptRaise { src } => write!(f, "except_raise src={src}"),
            ExceptReraise => write!(f, "except_reraise"),
            ExceptPop { cnt } => write!(f, "except_pop cnt={cnt}"),
            Jmp { label } => write!(f, "jmp label={label}"),
            Jt { src, label } => write!(f, "jt src={src} label={label}"),
            Jf { src, label } => write!(f, "jf src={src} label={label}"),
            Jx { label } => write!(f, "jx label={label}"),
            Popjt { label } => write!(f, "popjt label={label}"),
            Popjf { label } => write!(f, "popjf label={label}"),
            EnvironAt { dst, name } => write!(f, "environ_at dst={dst} name={name}"),
            EnvironAtPush { name } => write!(f, "environ_at_push name={name}"),
            NilAssign { dst } => write!(f, "nil_assign dst={dst}"),
            NilPush => write!(f, "nil_push"),
            BoolNewc { dst, val } => write!(f, "bool_newc dst={dst} val={val}"),
            BoolPushc { val } => write!(f, "bool_pushc val={val}"),
            IntNewc { dst, val } => write!(f, "int_newc dst={dst} val={val}"),
            IntPushc { val } => write!(f, "int_pushc val={val}"),
            FloatNewc { dst, val } => write!(f, "float_newc dst={dst} val={val}"),
            FloatPushc { val } => write!(f, "float_pushc val={val}"),
            MethodNewc { dst, func } => write!(f, "method_newc dst={dst} func={func}"),
            MethodPushc { func } => write!(f, "method_pushc func={func}"),
            StrNewc { dst, val } => write!(f, "str_newc dst={dst} val={val}"),
            StrPushc { val } => write!(f, "str_pushc val={val}"),
            StrNewch { dst, val } => write!(f, "str_newch dst={dst} val={val}"),
            StrPushch { val } => write!(f, "str_pushch val={val}"),
            Label { name } => write!(f, "{name}:"),
        }
    }
}

/// Function visibility in the emitted module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Visibility {
    Public,
    Private,
}

/// A compiled function: prologue parameters plus a flat instruction body.
///
/// `arrayarg` marks a trailing array-rest parameter; the encoder and the C
/// back-end synthesize the matching prologue (`argc_chk` or
/// `array_arg_push`).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Func {
    pub name: String,
    pub argc: u64,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub arrayarg: bool,
    pub visibility: Visibility,
    pub body: Vec<Instr>,
}

/// A compiled module: anonymous-function bodies, method bodies, then the
/// module init function, in emission order.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Module {
    pub name: String,
    pub funcs: Vec<Func>,
}
