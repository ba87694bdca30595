//! One-byte opcodes for the encoded instruction stream.

pub const STACK_FREE: u8 = 0x01;
pub const STACK_ALLOC: u8 = 0x02;
pub const STACK_FREE_ALLOC: u8 = 0x03;
pub const INST_ASSIGN: u8 = 0x04;
pub const STACK_PUSH: u8 = 0x05;
pub const METHOD_CALL: u8 = 0x06;
pub const RET: u8 = 0x07;
pub const RETD: u8 = 0x08;
pub const EXCEPT_PUSH: u8 = 0x09;
pub const EXCEPT_RAISE: u8 = 0x0a;
pub const EXCEPT_RERAISE: u8 = 0x0b;
pub const EXCEPT_POP_1: u8 = 0x0c;
pub const EXCEPT_POP_N: u8 = 0x0d;
pub const JMP: u8 = 0x0e;
pub const JT: u8 = 0x0f;
pub const JF: u8 = 0x10;
pub const JX: u8 = 0x11;
pub const POPJT: u8 = 0x12;
pub const POPJF: u8 = 0x13;
pub const ENVIRON_AT: u8 = 0x14;
pub const ENVIRON_AT_PUSH: u8 = 0x15;
pub const NIL_ASSIGN: u8 = 0x16;
pub const NIL_PUSH: u8 = 0x17;
pub const BOOL_NEWC_FALSE: u8 = 0x18;
pub const BOOL_NEWC_TRUE: u8 = 0x19;
pub const BOOL_PUSHC_FALSE: u8 = 0x1a;
pub const BOOL_PUSHC_TRUE: u8 = 0x1b;
pub const INT_NEWC: u8 = 0x1c;
pub const INT_PUSHC: u8 = 0x1d;
pub const FLOAT_NEWC: u8 = 0x1e;
pub const FLOAT_PUSHC: u8 = 0x1f;
pub const METHOD_NEWC: u8 = 0x20;
pub const METHOD_PUSHC: u8 = 0x21;
pub const STR_NEWC: u8 = 0x22;
pub const STR_PUSHC: u8 = 0x23;
pub const STR_NEWCH: u8 = 0x24;
pub const STR_PUSHCH: u8 = 0x25;
pub const ARGC_CHK: u8 = 0x26;
pub const ARRAY_ARG_PUSH: u8 = 0x27;
