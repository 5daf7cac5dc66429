use crate::{
    ast::Program,
    codegen::generator::{Error, Generator},
    token::Spanned,
    types::Ty,
    Options,
};

/// Compiles `program` into `backend`. Top-level statements are placed in a
/// synthesized function named after [`Options::entry_point`].
///
/// On failure the backend still holds the (partial) module.
pub fn generate<B>(
    backend: &mut B,
    program: &Program,
    options: &Options,
) -> Result<(), Vec<Spanned<Error>>>
where
    B: Backend,
{
    let mut generator = Generator::new(backend, &options.entry_point)?;
    generator.program(program);
    generator.finish()
}

/// The IR builder the code generator emits into.
///
/// Values and blocks are opaque handles; the generator never looks into them.
/// Every instruction is appended at the insertion cursor, which is moved with
/// [`Backend::position_at_end`] and can be saved and restored.
pub trait Backend {
    type Value: Copy;
    type Function: Copy + PartialEq;
    type Block: Copy + PartialEq;
    type Cursor;

    fn const_int(&mut self, value: i32) -> Self::Value;
    fn const_float(&mut self, value: f32) -> Self::Value;
    fn const_bool(&mut self, value: bool) -> Self::Value;

    /// Declares an immutable module-level constant, returning its address.
    fn global_constant(&mut self, name: &str, ty: Ty, init: Self::Value) -> Self::Value;
    /// Declares a zero-initialized module-level variable, returning its address.
    fn global_variable(&mut self, name: &str, ty: Ty) -> Self::Value;

    /// Allocates a stack slot in the current function.
    fn alloca(&mut self, ty: Ty) -> Self::Value;
    fn store(&mut self, value: Self::Value, ptr: Self::Value);
    fn load(&mut self, ty: Ty, ptr: Self::Value) -> Self::Value;

    fn int_arith(&mut self, op: ArithOp, lhs: Self::Value, rhs: Self::Value) -> Self::Value;
    fn float_arith(&mut self, op: ArithOp, lhs: Self::Value, rhs: Self::Value) -> Self::Value;
    /// Produces a `bool` value.
    fn int_compare(&mut self, op: CompareOp, lhs: Self::Value, rhs: Self::Value) -> Self::Value;
    /// Produces a `bool` value.
    fn float_compare(&mut self, op: CompareOp, lhs: Self::Value, rhs: Self::Value)
        -> Self::Value;

    /// Declares a module-level function. Returns `None` if a function of the
    /// same name already exists.
    fn declare_function(&mut self, name: &str, params: &[Ty], ret: Ty) -> Option<Self::Function>;
    /// The incoming value of the parameter at `index`.
    fn param(&self, function: Self::Function, index: usize) -> Self::Value;

    fn append_block(&mut self, function: Self::Function, name: &str) -> Self::Block;
    fn position_at_end(&mut self, block: Self::Block);
    /// Whether the block at the cursor already ends with a terminator.
    fn is_terminated(&self) -> bool;

    fn branch(&mut self, target: Self::Block);
    fn cond_branch(&mut self, cond: Self::Value, then: Self::Block, otherwise: Self::Block);
    fn call(&mut self, function: Self::Function, args: &[Self::Value]) -> Self::Value;
    fn ret(&mut self, value: Self::Value);
    fn unreachable(&mut self);

    fn save_cursor(&self) -> Self::Cursor;
    fn restore_cursor(&mut self, cursor: Self::Cursor);
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
}
