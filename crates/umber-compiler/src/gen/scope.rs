//! The compile stack: lexical and control-flow scope frames.
//!
//! Frames are pushed on entry to the corresponding syntactic construct and
//! popped in reverse order; `pop` asserts the frame identity. Searches walk
//! from the top; block and variable searches stop at a Method frame because
//! scopes do not cross method boundaries.

use indexmap::IndexMap;
use umber_core::Node;

/// Definition state of a block variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum VarState {
    /// Declared by block scan; reads still fall back to the environment.
    Declared = 1,
    /// Carries a value; reads hit the local slot.
    Defined = 2,
}

#[derive(Debug, Clone)]
pub struct VarSlot {
    pub ofs: i64,
    pub state: VarState,
}

#[derive(Debug, Clone, Default)]
pub struct BlockFrame {
    /// Offset of the next slot relative to the enclosing method's base.
    pub ofs: i64,
    /// Slots this block owns.
    pub size: u64,
    pub vars: IndexMap<String, VarSlot>,
}

#[derive(Debug, Clone)]
pub struct MethodFrame {
    pub funcname: String,
}

#[derive(Debug, Clone)]
pub struct ClassFrame {
    pub name: String,
    /// Parent expression, re-lowered at `parent` use sites.
    pub parent: Node,
}

#[derive(Debug, Clone)]
pub struct NsFrame {
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct BreakFrame {
    pub subtype: &'static str,
    pub exit_label: String,
    pub used: bool,
}

#[derive(Debug, Clone)]
pub struct LoopFrame {
    pub subtype: &'static str,
    pub continue_label: String,
    pub used: bool,
}

#[derive(Debug, Clone)]
pub enum Frame {
    Block(BlockFrame),
    Method(MethodFrame),
    Class(ClassFrame),
    Ns(NsFrame),
    Except,
    Break(BreakFrame),
    Loop(LoopFrame),
}

/// Token for a pushed frame; pops must match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameId(usize);

#[derive(Debug, Default)]
pub struct CompileStack {
    frames: Vec<Frame>,
}

impl CompileStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames, bottom first; the top of the stack is the last element.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn frame_mut(&mut self, i: usize) -> &mut Frame {
        &mut self.frames[i]
    }

    fn push(&mut self, f: Frame) -> FrameId {
        self.frames.push(f);
        FrameId(self.frames.len() - 1)
    }

    pub fn pop(&mut self, id: FrameId) {
        assert_eq!(
            id.0,
            self.frames.len() - 1,
            "compile stack popped out of order"
        );
        self.frames.pop();
    }

    pub fn push_block(&mut self) -> FrameId {
        let ofs = self
            .block_current()
            .map(|b| b.ofs - b.size as i64)
            .unwrap_or(0);
        self.push(Frame::Block(BlockFrame {
            ofs,
            size: 0,
            vars: IndexMap::new(),
        }))
    }

    pub fn push_method(&mut self, funcname: &str) -> FrameId {
        self.push(Frame::Method(MethodFrame {
            funcname: funcname.to_string(),
        }))
    }

    pub fn push_class(&mut self, name: &str, parent: Node) -> FrameId {
        self.push(Frame::Class(ClassFrame {
            name: name.to_string(),
            parent,
        }))
    }

    pub fn push_ns(&mut self, name: &str) -> FrameId {
        self.push(Frame::Ns(NsFrame {
            name: name.to_string(),
        }))
    }

    pub fn push_except(&mut self) -> FrameId {
        self.push(Frame::Except)
    }

    pub fn push_break(&mut self, subtype: &'static str, exit_label: String) -> FrameId {
        self.push(Frame::Break(BreakFrame {
            subtype,
            exit_label,
            used: false,
        }))
    }

    pub fn push_loop(&mut self, subtype: &'static str, continue_label: String) -> FrameId {
        self.push(Frame::Loop(LoopFrame {
            subtype,
            continue_label,
            used: false,
        }))
    }

    /// Innermost block, not crossing a Method frame.
    pub fn block_current(&self) -> Option<&BlockFrame> {
        for f in self.frames.iter().rev() {
            match f {
                Frame::Block(b) => return Some(b),
                Frame::Method(_) => return None,
                _ => {}
            }
        }
        None
    }

    fn block_current_mut(&mut self) -> Option<&mut BlockFrame> {
        for f in self.frames.iter_mut().rev() {
            match f {
                Frame::Block(b) => return Some(b),
                Frame::Method(_) => return None,
                _ => {}
            }
        }
        None
    }

    pub fn block_frame_mut(&mut self, id: FrameId) -> &mut BlockFrame {
        match &mut self.frames[id.0] {
            Frame::Block(b) => b,
            _ => panic!("frame is not a block"),
        }
    }

    pub fn break_frame(&self, id: FrameId) -> &BreakFrame {
        match &self.frames[id.0] {
            Frame::Break(b) => b,
            _ => panic!("frame is not a break"),
        }
    }

    pub fn loop_frame(&self, id: FrameId) -> &LoopFrame {
        match &self.frames[id.0] {
            Frame::Loop(l) => l,
            _ => panic!("frame is not a loop"),
        }
    }

    fn add_var(&mut self, name: &str, state: VarState) -> i64 {
        let b = self.block_current_mut().expect("no enclosing block");
        b.size += 1;
        let ofs = b.ofs - b.size as i64;
        b.vars.insert(name.to_string(), VarSlot { ofs, state });
        ofs
    }

    /// Register a parameter slot in the current block without consuming a
    /// local slot.
    pub fn param_add(&mut self, name: &str, ofs: i64) {
        let b = self.block_current_mut().expect("no enclosing block");
        b.vars.insert(
            name.to_string(),
            VarSlot {
                ofs,
                state: VarState::Defined,
            },
        );
    }

    fn var_find(&self, name: &str) -> Option<&VarSlot> {
        for f in self.frames.iter().rev() {
            match f {
                Frame::Block(b) => {
                    if let Some(v) = b.vars.get(name) {
                        return Some(v);
                    }
                }
                Frame::Method(_) => return None,
                _ => {}
            }
        }
        None
    }

    fn var_find_mut(&mut self, name: &str) -> Option<&mut VarSlot> {
        for f in self.frames.iter_mut().rev() {
            match f {
                Frame::Block(b) => {
                    if let Some(v) = b.vars.get_mut(name) {
                        return Some(v);
                    }
                }
                Frame::Method(_) => return None,
                _ => {}
            }
        }
        None
    }

    /// Declare a simple-assignment target unless already visible.
    pub fn var_add_soft(&mut self, name: &str) -> bool {
        if self.var_find(name).is_some() {
            return false;
        }
        self.add_var(name, VarState::Declared);
        true
    }

    /// Declare a `var` binding in the current block, shadowing any outer one.
    pub fn var_add_hard(&mut self, name: &str) {
        self.add_var(name, VarState::Defined);
    }

    /// Declare a `for`/`try` binder unless already visible. The binder
    /// itself produces the value, so the slot is Defined from the start.
    pub fn var_add_binder(&mut self, name: &str) -> bool {
        if self.var_find(name).is_some() {
            return false;
        }
        self.add_var(name, VarState::Defined);
        true
    }

    pub fn var_is_declared(&self, name: &str) -> bool {
        self.var_find(name).is_some()
    }

    pub fn var_mark_defined(&mut self, name: &str) -> i64 {
        let v = self
            .var_find_mut(name)
            .unwrap_or_else(|| panic!("variable {name} not declared"));
        v.state = VarState::Defined;
        v.ofs
    }

    /// Slot offset of a variable at or above `min` state.
    pub fn var_lookup(&self, name: &str, min: VarState) -> Option<i64> {
        self.var_find(name)
            .filter(|v| v.state >= min)
            .map(|v| v.ofs)
    }

    pub fn method_current(&self) -> Option<&MethodFrame> {
        self.frames.iter().rev().find_map(|f| match f {
            Frame::Method(m) => Some(m),
            _ => None,
        })
    }

    pub fn class_current(&self) -> Option<&ClassFrame> {
        self.frames.iter().rev().find_map(|f| match f {
            Frame::Class(c) => Some(c),
            _ => None,
        })
    }

    pub fn ns_current(&self) -> Option<&NsFrame> {
        self.frames.iter().rev().find_map(|f| match f {
            Frame::Ns(n) => Some(n),
            _ => None,
        })
    }

    /// Compose a fully qualified method name by walking the stack from the
    /// top: class/namespace names accumulate with `$`; an enclosing Method
    /// frame terminates the walk (methods nest lexically), otherwise the
    /// module name prefixes the result.
    pub fn func_name(&self, name: &str, modname: &str) -> String {
        let mut result = name.to_string();
        for f in self.frames.iter().rev() {
            let part = match f {
                Frame::Class(c) => Some(c.name.as_str()),
                Frame::Ns(n) => Some(n.name.as_str()),
                Frame::Method(m) => Some(m.funcname.as_str()),
                _ => None,
            };
            if let Some(p) = part {
                if result.is_empty() {
                    result = p.to_string();
                } else {
                    result = format!("{p}${result}");
                }
            }
            if matches!(f, Frame::Method(_)) {
                return result;
            }
        }
        format!("{modname}${result}")
    }
}
