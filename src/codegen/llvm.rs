use std::fmt;

use crate::{
    codegen::interface::{ArithOp, Backend, CompareOp},
    types::Ty,
};

/// The IR-level type of a value. Addresses (globals and stack slots) are
/// opaque pointers.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Type {
    Ty(Ty),
    Ptr,
}

impl From<Ty> for Type {
    fn from(ty: Ty) -> Self {
        Type::Ty(ty)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Type::Ty(Ty::Int) => "i32",
            Type::Ty(Ty::Float) => "float",
            Type::Ty(Ty::Bool) => "i1",
            Type::Ptr => "ptr",
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Operand {
    Int(i32),
    Float(f32),
    Bool(bool),
    /// Index into [`Module::globals`].
    Global(usize),
    Register(u32),
    Param(usize),
    /// Produced when no block is positioned.
    Undef,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Value {
    pub ty: Type,
    pub operand: Operand,
}

impl Value {
    fn new(ty: impl Into<Type>, operand: Operand) -> Value {
        Value {
            ty: ty.into(),
            operand,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FunctionId(usize);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BlockId {
    function: usize,
    index: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Instruction {
    Alloca {
        dst: u32,
        ty: Ty,
    },
    Store {
        value: Value,
        ptr: Value,
    },
    Load {
        dst: u32,
        ty: Ty,
        ptr: Value,
    },
    Arith {
        dst: u32,
        op: ArithOp,
        ty: Ty,
        lhs: Value,
        rhs: Value,
    },
    Compare {
        dst: u32,
        op: CompareOp,
        ty: Ty,
        lhs: Value,
        rhs: Value,
    },
    Call {
        dst: u32,
        function: FunctionId,
        args: Vec<Value>,
    },
}

/// Block targets are indices into [`Function::blocks`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Terminator {
    Branch(usize),
    CondBranch {
        cond: Value,
        then: usize,
        otherwise: usize,
    },
    Return(Value),
    Unreachable,
}

#[derive(Clone, Debug, PartialEq)]
pub enum GlobalKind {
    Constant(Value),
    Variable,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Global {
    pub name: String,
    pub ty: Ty,
    pub kind: GlobalKind,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub label: String,
    pub instructions: Vec<Instruction>,
    pub terminator: Option<Terminator>,
    /// Number of branches targeting this block.
    pub predecessors: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Function {
    pub name: String,
    pub params: Vec<Ty>,
    pub return_ty: Ty,
    pub blocks: Vec<Block>,
    registers: u32,
    /// Stack slots are grouped at the start of the first block.
    allocas: usize,
}

impl Function {
    pub fn block(&self, label: &str) -> Option<&Block> {
        self.blocks.iter().find(|block| block.label == label)
    }

    pub fn instructions(&self) -> impl Iterator<Item = &Instruction> {
        self.blocks.iter().flat_map(|block| &block.instructions)
    }

    fn unique_label(&self, base: &str) -> String {
        let taken = |label: &str| self.blocks.iter().any(|block| block.label == label);
        if !taken(base) {
            return base.to_owned();
        }
        (1..)
            .map(|n| format!("{base}{n}"))
            .find(|label| !taken(label))
            .unwrap_or_default()
    }
}

/// An in-memory module, printed as textual LLVM IR through [`fmt::Display`].
#[derive(Clone, Debug, PartialEq)]
pub struct Module {
    pub name: String,
    pub globals: Vec<Global>,
    pub functions: Vec<Function>,
}

impl Module {
    pub fn new(name: &str) -> Module {
        Module {
            name: name.to_owned(),
            globals: Vec::new(),
            functions: Vec::new(),
        }
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|function| function.name == name)
    }

    pub fn global(&self, name: &str) -> Option<&Global> {
        self.globals.iter().find(|global| global.name == name)
    }

    fn name_taken(&self, name: &str) -> bool {
        self.globals.iter().any(|global| global.name == name)
            || self.functions.iter().any(|function| function.name == name)
    }

    /// Globals and functions share a namespace; globals give way.
    fn unique_global_name(&self, base: &str) -> String {
        if !self.name_taken(base) {
            return base.to_owned();
        }
        (1..)
            .map(|n| format!("{base}.{n}"))
            .find(|name| !self.name_taken(name))
            .unwrap_or_default()
    }

    fn add_global(&mut self, name: &str, ty: Ty, kind: GlobalKind) -> Value {
        let name = self.unique_global_name(name);
        self.globals.push(Global { name, ty, kind });
        Value::new(Type::Ptr, Operand::Global(self.globals.len() - 1))
    }
}

/// Implements [`Backend`] by recording into a [`Module`].
pub struct Builder {
    module: Module,
    cursor: Option<BlockId>,
}

impl Builder {
    pub fn new(module_name: &str) -> Builder {
        Builder {
            module: Module::new(module_name),
            cursor: None,
        }
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn finish(self) -> Module {
        self.module
    }

    fn current_function_mut(&mut self) -> Option<&mut Function> {
        let cursor = self.cursor?;
        self.module.functions.get_mut(cursor.function)
    }

    fn current_block(&self) -> Option<&Block> {
        let cursor = self.cursor?;
        self.module.functions[cursor.function]
            .blocks
            .get(cursor.index)
    }

    /// Appends an instruction which defines a fresh register.
    fn emit_with_result(
        &mut self,
        ty: impl Into<Type>,
        instruction: impl FnOnce(u32) -> Instruction,
    ) -> Value {
        let Some(cursor) = self.cursor else {
            return Value::new(ty, Operand::Undef);
        };
        let function = &mut self.module.functions[cursor.function];
        let dst = function.registers;
        function.registers += 1;
        function.blocks[cursor.index]
            .instructions
            .push(instruction(dst));
        Value::new(ty, Operand::Register(dst))
    }

    fn emit(&mut self, instruction: Instruction) {
        if let Some(cursor) = self.cursor {
            self.module.functions[cursor.function].blocks[cursor.index]
                .instructions
                .push(instruction);
        }
    }

    /// Sets the terminator of the current block, unless it already has one.
    /// Branch targets gain a predecessor.
    fn terminate(&mut self, terminator: Terminator) {
        let Some(cursor) = self.cursor else {
            return;
        };
        let function = &mut self.module.functions[cursor.function];
        if function.blocks[cursor.index].terminator.is_some() {
            return;
        }
        function.blocks[cursor.index].terminator = Some(terminator);
        match terminator {
            Terminator::Branch(target) => function.blocks[target].predecessors += 1,
            Terminator::CondBranch { then, otherwise, .. } => {
                function.blocks[then].predecessors += 1;
                function.blocks[otherwise].predecessors += 1;
            }
            Terminator::Return(_) | Terminator::Unreachable => {}
        }
    }
}

impl Backend for Builder {
    type Value = Value;
    type Function = FunctionId;
    type Block = BlockId;
    type Cursor = Option<BlockId>;

    fn const_int(&mut self, value: i32) -> Value {
        Value::new(Ty::Int, Operand::Int(value))
    }

    fn const_float(&mut self, value: f32) -> Value {
        Value::new(Ty::Float, Operand::Float(value))
    }

    fn const_bool(&mut self, value: bool) -> Value {
        Value::new(Ty::Bool, Operand::Bool(value))
    }

    fn global_constant(&mut self, name: &str, ty: Ty, init: Value) -> Value {
        self.module.add_global(name, ty, GlobalKind::Constant(init))
    }

    fn global_variable(&mut self, name: &str, ty: Ty) -> Value {
        self.module.add_global(name, ty, GlobalKind::Variable)
    }

    fn alloca(&mut self, ty: Ty) -> Value {
        let Some(function) = self.current_function_mut() else {
            return Value::new(Type::Ptr, Operand::Undef);
        };
        let dst = function.registers;
        function.registers += 1;
        let at = function.allocas;
        function.allocas += 1;
        if let Some(entry) = function.blocks.first_mut() {
            entry.instructions.insert(at, Instruction::Alloca { dst, ty });
        }
        Value::new(Type::Ptr, Operand::Register(dst))
    }

    fn store(&mut self, value: Value, ptr: Value) {
        self.emit(Instruction::Store { value, ptr });
    }

    fn load(&mut self, ty: Ty, ptr: Value) -> Value {
        self.emit_with_result(ty, |dst| Instruction::Load { dst, ty, ptr })
    }

    fn int_arith(&mut self, op: ArithOp, lhs: Value, rhs: Value) -> Value {
        let ty = Ty::Int;
        self.emit_with_result(ty, |dst| Instruction::Arith {
            dst,
            op,
            ty,
            lhs,
            rhs,
        })
    }

    fn float_arith(&mut self, op: ArithOp, lhs: Value, rhs: Value) -> Value {
        let ty = Ty::Float;
        self.emit_with_result(ty, |dst| Instruction::Arith {
            dst,
            op,
            ty,
            lhs,
            rhs,
        })
    }

    fn int_compare(&mut self, op: CompareOp, lhs: Value, rhs: Value) -> Value {
        let ty = Ty::Int;
        self.emit_with_result(Ty::Bool, |dst| Instruction::Compare {
            dst,
            op,
            ty,
            lhs,
            rhs,
        })
    }

    fn float_compare(&mut self, op: CompareOp, lhs: Value, rhs: Value) -> Value {
        let ty = Ty::Float;
        self.emit_with_result(Ty::Bool, |dst| Instruction::Compare {
            dst,
            op,
            ty,
            lhs,
            rhs,
        })
    }

    fn declare_function(&mut self, name: &str, params: &[Ty], ret: Ty) -> Option<FunctionId> {
        if self.module.function(name).is_some() {
            return None;
        }
        // A global may already hold the name.
        if let Some(index) = self.module.globals.iter().position(|g| g.name == name) {
            let renamed = self.module.unique_global_name(name);
            self.module.globals[index].name = renamed;
        }
        self.module.functions.push(Function {
            name: name.to_owned(),
            params: params.to_vec(),
            return_ty: ret,
            blocks: Vec::new(),
            registers: 0,
            allocas: 0,
        });
        Some(FunctionId(self.module.functions.len() - 1))
    }

    fn param(&self, function: FunctionId, index: usize) -> Value {
        let ty = self.module.functions[function.0].params[index];
        Value::new(ty, Operand::Param(index))
    }

    fn append_block(&mut self, function: FunctionId, name: &str) -> BlockId {
        let f = &mut self.module.functions[function.0];
        let label = f.unique_label(name);
        f.blocks.push(Block {
            label,
            instructions: Vec::new(),
            terminator: None,
            predecessors: 0,
        });
        BlockId {
            function: function.0,
            index: f.blocks.len() - 1,
        }
    }

    fn position_at_end(&mut self, block: BlockId) {
        self.cursor = Some(block);
    }

    fn is_terminated(&self) -> bool {
        self.current_block()
            .map_or(true, |block| block.terminator.is_some())
    }

    fn branch(&mut self, target: BlockId) {
        self.terminate(Terminator::Branch(target.index));
    }

    fn cond_branch(&mut self, cond: Value, then: BlockId, otherwise: BlockId) {
        self.terminate(Terminator::CondBranch {
            cond,
            then: then.index,
            otherwise: otherwise.index,
        });
    }

    fn call(&mut self, function: FunctionId, args: &[Value]) -> Value {
        let ty = self.module.functions[function.0].return_ty;
        let args = args.to_vec();
        self.emit_with_result(ty, |dst| Instruction::Call {
            dst,
            function,
            args,
        })
    }

    fn ret(&mut self, value: Value) {
        self.terminate(Terminator::Return(value));
    }

    fn unreachable(&mut self) {
        self.terminate(Terminator::Unreachable);
    }

    fn save_cursor(&self) -> Option<BlockId> {
        self.cursor
    }

    fn restore_cursor(&mut self, cursor: Option<BlockId>) {
        self.cursor = cursor;
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "; ModuleID = '{}'", self.name)?;
        writeln!(f, "source_filename = \"{}\"", self.name)?;

        if !self.globals.is_empty() {
            writeln!(f)?;
        }
        for global in &self.globals {
            let ty = Type::from(global.ty);
            match global.kind {
                GlobalKind::Constant(init) => {
                    writeln!(f, "@{} = constant {ty} {}", global.name, self.op(init))?;
                }
                GlobalKind::Variable => {
                    writeln!(f, "@{} = global {ty} {}", global.name, zero(global.ty))?;
                }
            }
        }

        for function in &self.functions {
            writeln!(f)?;
            self.fmt_function(f, function)?;
        }
        Ok(())
    }
}

impl Module {
    fn fmt_function(&self, f: &mut fmt::Formatter<'_>, function: &Function) -> fmt::Result {
        let keyword = if function.blocks.is_empty() {
            "declare"
        } else {
            "define"
        };
        let ret = Type::from(function.return_ty);
        write!(f, "{keyword} {ret} @{}(", function.name)?;
        for (index, &param) in function.params.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} %p{index}", Type::from(param))?;
        }
        write!(f, ")")?;

        if function.blocks.is_empty() {
            return writeln!(f);
        }

        writeln!(f, " {{")?;
        for (index, block) in function.blocks.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            writeln!(f, "{}:", block.label)?;
            for instruction in &block.instructions {
                write!(f, "  ")?;
                self.fmt_instruction(f, instruction)?;
                writeln!(f)?;
            }
            if let Some(terminator) = block.terminator {
                write!(f, "  ")?;
                self.fmt_terminator(f, function, terminator)?;
                writeln!(f)?;
            }
        }
        writeln!(f, "}}")
    }

    fn fmt_instruction(
        &self,
        f: &mut fmt::Formatter<'_>,
        instruction: &Instruction,
    ) -> fmt::Result {
        match instruction {
            Instruction::Alloca { dst, ty } => write!(f, "%t{dst} = alloca {}", Type::from(*ty)),
            Instruction::Store { value, ptr } => {
                write!(f, "store {}, {}", self.typed(*value), self.typed(*ptr))
            }
            Instruction::Load { dst, ty, ptr } => {
                let ty = Type::from(*ty);
                write!(f, "%t{dst} = load {ty}, {}", self.typed(*ptr))
            }
            Instruction::Arith {
                dst,
                op,
                ty,
                lhs,
                rhs,
            } => {
                let name = arith_name(*op, *ty);
                let ty = Type::from(*ty);
                write!(f, "%t{dst} = {name} {ty} {}, {}", self.op(*lhs), self.op(*rhs))
            }
            Instruction::Compare {
                dst,
                op,
                ty,
                lhs,
                rhs,
            } => {
                let (inst, pred) = compare_name(*op, *ty);
                let ty = Type::from(*ty);
                write!(
                    f,
                    "%t{dst} = {inst} {pred} {ty} {}, {}",
                    self.op(*lhs),
                    self.op(*rhs)
                )
            }
            Instruction::Call {
                dst,
                function,
                args,
            } => {
                let callee = &self.functions[function.0];
                let ret = Type::from(callee.return_ty);
                write!(f, "%t{dst} = call {ret} @{}(", callee.name)?;
                for (index, arg) in args.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", self.typed(*arg))?;
                }
                write!(f, ")")
            }
        }
    }

    fn fmt_terminator(
        &self,
        f: &mut fmt::Formatter<'_>,
        function: &Function,
        terminator: Terminator,
    ) -> fmt::Result {
        let label = |index: usize| &function.blocks[index].label;
        match terminator {
            Terminator::Branch(target) => write!(f, "br label %{}", label(target)),
            Terminator::CondBranch {
                cond,
                then,
                otherwise,
            } => write!(
                f,
                "br {}, label %{}, label %{}",
                self.typed(cond),
                label(then),
                label(otherwise)
            ),
            Terminator::Return(value) => write!(f, "ret {}", self.typed(value)),
            Terminator::Unreachable => write!(f, "unreachable"),
        }
    }

    fn op(&self, value: Value) -> Op<'_> {
        Op {
            module: self,
            value,
            typed: false,
        }
    }

    fn typed(&self, value: Value) -> Op<'_> {
        Op {
            module: self,
            value,
            typed: true,
        }
    }
}

/// Displays an operand, optionally prefixed by its type.
struct Op<'m> {
    module: &'m Module,
    value: Value,
    typed: bool,
}

impl fmt::Display for Op<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.typed {
            write!(f, "{} ", self.value.ty)?;
        }
        match self.value.operand {
            Operand::Int(int) => write!(f, "{int}"),
            // LLVM spells float constants as the hex bits of the equivalent
            // double.
            Operand::Float(float) => write!(f, "0x{:016X}", f64::from(float).to_bits()),
            Operand::Bool(bool) => write!(f, "{bool}"),
            Operand::Global(index) => write!(f, "@{}", self.module.globals[index].name),
            Operand::Register(register) => write!(f, "%t{register}"),
            Operand::Param(index) => write!(f, "%p{index}"),
            Operand::Undef => write!(f, "undef"),
        }
    }
}

fn zero(ty: Ty) -> &'static str {
    match ty {
        Ty::Int => "0",
        Ty::Float => "0.0",
        Ty::Bool => "false",
    }
}

fn arith_name(op: ArithOp, ty: Ty) -> &'static str {
    match (ty, op) {
        (Ty::Float, ArithOp::Add) => "fadd",
        (Ty::Float, ArithOp::Sub) => "fsub",
        (Ty::Float, ArithOp::Mul) => "fmul",
        (Ty::Float, ArithOp::Div) => "fdiv",
        (Ty::Float, ArithOp::Rem) => "frem",
        (_, ArithOp::Add) => "add",
        (_, ArithOp::Sub) => "sub",
        (_, ArithOp::Mul) => "mul",
        (_, ArithOp::Div) => "sdiv",
        (_, ArithOp::Rem) => "srem",
    }
}

fn compare_name(op: CompareOp, ty: Ty) -> (&'static str, &'static str) {
    let float = ty == Ty::Float;
    let pred = match (float, op) {
        (false, CompareOp::Lt) => "slt",
        (false, CompareOp::Gt) => "sgt",
        (false, CompareOp::Le) => "sle",
        (false, CompareOp::Ge) => "sge",
        (false, CompareOp::Eq) => "eq",
        (false, CompareOp::Ne) => "ne",
        (true, CompareOp::Lt) => "olt",
        (true, CompareOp::Gt) => "ogt",
        (true, CompareOp::Le) => "ole",
        (true, CompareOp::Ge) => "oge",
        (true, CompareOp::Eq) => "oeq",
        (true, CompareOp::Ne) => "one",
    };
    (if float { "fcmp" } else { "icmp" }, pred)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_float_constants_are_printed_as_double_bits() {
        let module = Module::new("m");
        let half = Value::new(Ty::Float, Operand::Float(0.5));
        assert_eq!(module.typed(half).to_string(), "float 0x3FE0000000000000");
        let one_and_half = Value::new(Ty::Float, Operand::Float(1.5));
        assert_eq!(module.op(one_and_half).to_string(), "0x3FF8000000000000");
    }

    #[test]
    fn test_labels_are_unique_per_function() {
        let mut b = Builder::new("m");
        let f = b.declare_function("f", &[], Ty::Int).unwrap();
        let first = b.append_block(f, "then");
        let second = b.append_block(f, "then");
        let third = b.append_block(f, "then");
        assert_ne!(first, second);
        let labels: Vec<_> = b.module().functions[0]
            .blocks
            .iter()
            .map(|block| block.label.as_str())
            .collect();
        assert_eq!(labels, ["then", "then1", "then2"]);
        assert_ne!(second, third);
    }

    #[test]
    fn test_functions_take_names_from_globals() {
        let mut b = Builder::new("m");
        b.global_variable("f", Ty::Int);
        assert!(b.declare_function("f", &[], Ty::Int).is_some());
        assert!(b.declare_function("f", &[Ty::Int], Ty::Int).is_none());
        assert_eq!(b.module().globals[0].name, "f.1");
        b.global_variable("f", Ty::Float);
        assert_eq!(b.module().globals[1].name, "f.2");
    }

    #[test]
    fn test_allocas_are_hoisted_to_the_first_block() {
        let mut b = Builder::new("m");
        let f = b.declare_function("f", &[Ty::Int], Ty::Int).unwrap();
        let entry = b.append_block(f, "entry");
        let body = b.append_block(f, "body");
        b.position_at_end(entry);
        let slot = b.alloca(Ty::Int);
        let incoming = b.param(f, 0);
        b.store(incoming, slot);
        b.branch(body);

        b.position_at_end(body);
        let late = b.alloca(Ty::Float);
        let loaded = b.load(Ty::Int, slot);
        b.ret(loaded);
        assert!(b.is_terminated());

        let function = &b.module().functions[0];
        assert_eq!(
            function.blocks[0].instructions[..2],
            [
                Instruction::Alloca {
                    dst: 0,
                    ty: Ty::Int
                },
                Instruction::Alloca {
                    dst: 1,
                    ty: Ty::Float
                },
            ]
        );
        assert_eq!(late.operand, Operand::Register(1));
        assert_eq!(function.blocks[1].predecessors, 1);
        assert_eq!(loaded.ty, Type::Ty(Ty::Int));
    }

    #[test]
    fn test_a_block_keeps_its_first_terminator() {
        let mut b = Builder::new("m");
        let f = b.declare_function("f", &[], Ty::Int).unwrap();
        let entry = b.append_block(f, "entry");
        b.position_at_end(entry);
        let one = b.const_int(1);
        b.ret(one);
        b.unreachable();
        assert_eq!(
            b.module().functions[0].blocks[0].terminator,
            Some(Terminator::Return(one))
        );
    }

    #[test]
    fn test_emission_without_cursor_is_dropped() {
        let mut b = Builder::new("m");
        let one = b.const_int(1);
        let sum = b.int_arith(ArithOp::Add, one, one);
        assert_eq!(sum.operand, Operand::Undef);
        assert!(b.is_terminated());
    }
}
