use crate::{
    ast::{BinaryOperator, Block, Expr, ExprKind, Function, Ident, Program, Stmt, StmtKind},
    codegen::interface::{ArithOp, Backend, CompareOp},
    environment::{Binding, Environment, ScopeId},
    token::{Span, Spanned},
    types::Ty,
};

type Result<T, E = ()> = std::result::Result<T, E>;

/// Functions provided by the compiler itself. These are resolved before any
/// user-defined symbol.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Builtin {
    /// Evaluates its arguments and produces no value. Nothing is printed yet.
    Print,
}

impl Builtin {
    pub const ALL: &'static [Builtin] = &[Builtin::Print];

    pub const fn name(self) -> &'static str {
        match self {
            Builtin::Print => "print",
        }
    }

    pub fn from_name(name: &str) -> Option<Builtin> {
        Builtin::ALL.iter().copied().find(|b| b.name() == name)
    }
}

#[derive(Clone, Debug)]
pub enum Symbol<V, F> {
    /// A storage location. Locals are owned by the function which allocated
    /// them; globals have no owner.
    Variable { ptr: V, owner: Option<F> },
    Function { function: F, params: Box<[Ty]> },
}

#[derive(Copy, Clone, Debug)]
struct Typed<V> {
    value: V,
    ty: Ty,
}

struct FunctionContext<F> {
    function: F,
    return_ty: Ty,
    /// Whether the cursor can be reached from the function entry.
    reachable: bool,
    /// Lets in the entry function define module globals.
    is_entry: bool,
}

pub struct Generator<'b, B: Backend> {
    backend: &'b mut B,
    env: Environment<Symbol<B::Value, B::Function>>,
    scope: ScopeId,
    function: FunctionContext<B::Function>,
    errors: Vec<Spanned<Error>>,
}

impl<'b, B: Backend> Generator<'b, B> {
    /// Sets up the root scope (holding `true` and `false`), the program scope
    /// below it and the entry function, leaving the cursor at its first block.
    pub fn new(backend: &'b mut B, entry_point: &str) -> Result<Self, Vec<Spanned<Error>>> {
        let mut env = Environment::new();
        for value in [true, false] {
            let init = backend.const_bool(value);
            let name = if value { "true" } else { "false" };
            let ptr = backend.global_constant(name, Ty::Bool, init);
            let symbol = Symbol::Variable { ptr, owner: None };
            env.define(ScopeId::GLOBAL, name, symbol, Ty::Bool);
        }

        let Some(main) = backend.declare_function(entry_point, &[], Ty::Int) else {
            let span = Span::new(0, 0, 1, 1);
            return Err(vec![span.wrap(Error::DuplicateFunction(entry_point.into()))]);
        };
        let entry = backend.append_block(main, "entry");
        backend.position_at_end(entry);
        let scope = env.child(ScopeId::GLOBAL);

        Ok(Generator {
            backend,
            env,
            scope,
            function: FunctionContext {
                function: main,
                return_ty: Ty::Int,
                reachable: true,
                is_entry: true,
            },
            errors: Vec::with_capacity(8),
        })
    }

    pub fn program(&mut self, program: &Program) {
        self.stmts(&program.statements);
        if !self.backend.is_terminated() {
            let zero = self.backend.const_int(0);
            self.backend.ret(zero);
        }
    }

    pub fn finish(self) -> Result<(), Vec<Spanned<Error>>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

/// Statements.
impl<B: Backend> Generator<'_, B> {
    fn stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.stmt(stmt);
        }
    }

    fn stmt(&mut self, stmt: &Stmt) {
        if !matches!(stmt.kind, StmtKind::Function(_)) {
            self.ensure_open_block();
        }
        _ = match &stmt.kind {
            StmtKind::Expr(expr) => self.expr_stmt(expr),
            StmtKind::Let { name, ty, value } => self.let_stmt(name, ty.ty, value),
            StmtKind::Block(block) => {
                self.stmts(&block.statements);
                Ok(())
            }
            StmtKind::Function(function) => self.function(function),
            StmtKind::Return(value) => self.return_stmt(value),
            StmtKind::Assign { target, value } => self.assign(target, value),
            StmtKind::If {
                condition,
                consequence,
                alternative,
            } => {
                self.if_stmt(condition, consequence, alternative.as_ref());
                Ok(())
            }
        };
    }

    fn expr_stmt(&mut self, expr: &Expr) -> Result<()> {
        // A call may legitimately produce no value here.
        if let ExprKind::Call { callee, args } = &expr.kind {
            self.call(callee, args)?;
        } else {
            self.expr(expr)?;
        }
        Ok(())
    }

    fn let_stmt(&mut self, name: &Ident, ty: Ty, value_expr: &Expr) -> Result<()> {
        let value = self.expr(value_expr);

        let ptr = match self.env.lookup(self.scope, name.as_str()).cloned() {
            // Re-binding stores into the existing location.
            Some(Binding {
                handle: Symbol::Variable { ptr, owner },
                ty: bound,
            }) => {
                self.check_capture(owner, name)?;
                if bound != ty {
                    let error = Error::TypeMismatch {
                        expected: bound,
                        actual: ty,
                    };
                    self.error(name.span.wrap(error));
                    return Err(());
                }
                ptr
            }
            Some(Binding {
                handle: Symbol::Function { .. },
                ..
            }) => {
                self.error(name.span.wrap(Error::NotAVariable(name.name.clone())));
                return Err(());
            }
            None => {
                let (ptr, owner) = if self.function.is_entry {
                    (self.backend.global_variable(name.as_str(), ty), None)
                } else {
                    (self.backend.alloca(ty), Some(self.function.function))
                };
                let symbol = Symbol::Variable { ptr, owner };
                self.env.define(self.scope, name.as_str(), symbol, ty);
                ptr
            }
        };

        let value = value?;
        self.expect_type(ty, value.ty, value_expr.span)?;
        self.backend.store(value.value, ptr);
        Ok(())
    }

    fn assign(&mut self, target: &Ident, value_expr: &Expr) -> Result<()> {
        let value = self.expr(value_expr);

        let (ptr, ty) = match self.env.lookup(self.scope, target.as_str()).cloned() {
            Some(Binding {
                handle: Symbol::Variable { ptr, owner },
                ty,
            }) => {
                self.check_capture(owner, target)?;
                (ptr, ty)
            }
            Some(Binding {
                handle: Symbol::Function { .. },
                ..
            }) => {
                self.error(target.span.wrap(Error::NotAVariable(target.name.clone())));
                return Err(());
            }
            None => {
                let error = Error::AssignToUndefined(target.name.clone());
                self.error(target.span.wrap(error));
                return Err(());
            }
        };

        let value = value?;
        self.expect_type(ty, value.ty, value_expr.span)?;
        self.backend.store(value.value, ptr);
        Ok(())
    }

    fn return_stmt(&mut self, value_expr: &Expr) -> Result<()> {
        let value = match self.expr(value_expr) {
            Ok(value) => self
                .expect_type(self.function.return_ty, value.ty, value_expr.span)
                .map(|()| value),
            Err(()) => Err(()),
        };
        self.function.reachable = false;
        match value {
            Ok(value) => {
                self.backend.ret(value.value);
                Ok(())
            }
            // Still ends the block, so that no missing return is reported.
            Err(()) => {
                self.backend.unreachable();
                Err(())
            }
        }
    }

    fn function(&mut self, f: &Function) -> Result<()> {
        let name = f.name.as_str();
        let params: Box<[Ty]> = f.params.iter().map(|param| param.ty.ty).collect();
        let return_ty = f.return_ty.ty;

        let Some(function) = self.backend.declare_function(name, &params, return_ty) else {
            self.error(f.name.span.wrap(Error::DuplicateFunction(name.into())));
            return Err(());
        };
        let symbol = Symbol::Function { function, params };

        self.within_function(function, return_ty, |this| {
            let entry = this.backend.append_block(function, "entry");
            this.backend.position_at_end(entry);

            // The body sees a copy of the enclosing scope, plus the function
            // itself (for recursion) and its parameters.
            let body_scope = this.env.snapshot(this.scope);
            this.scope = body_scope;
            this.env.define(body_scope, name, symbol.clone(), return_ty);
            for (index, param) in f.params.iter().enumerate() {
                let ty = param.ty.ty;
                let ptr = this.backend.alloca(ty);
                let incoming = this.backend.param(function, index);
                this.backend.store(incoming, ptr);
                let local = Symbol::Variable {
                    ptr,
                    owner: Some(function),
                };
                this.env.define(body_scope, param.name.as_str(), local, ty);
            }

            this.stmts(&f.body.statements);

            if !this.backend.is_terminated() {
                if this.function.reachable {
                    let error = Error::MissingReturn(name.into());
                    this.error(f.name.span.wrap(error));
                }
                this.backend.unreachable();
            }
            this.env.discard(body_scope);
        });

        self.env.define(self.scope, name, symbol, return_ty);
        Ok(())
    }

    fn if_stmt(&mut self, condition: &Expr, consequence: &Block, alternative: Option<&Block>) {
        // An ill-typed condition is replaced, so that both arms are still
        // compiled and checked.
        let cond = match self.expr(condition) {
            Ok(Typed {
                value,
                ty: Ty::Bool,
            }) => value,
            Ok(Typed { ty, .. }) => {
                self.error(condition.span.wrap(Error::NonBooleanCondition(ty)));
                self.backend.const_bool(false)
            }
            Err(()) => self.backend.const_bool(false),
        };

        let function = self.function.function;
        let then_block = self.backend.append_block(function, "then");
        let else_block = self.backend.append_block(function, "else");
        let merge_block = self.backend.append_block(function, "merge");
        self.backend.cond_branch(cond, then_block, else_block);
        let reachable = self.function.reachable;

        self.backend.position_at_end(then_block);
        self.function.reachable = reachable;
        self.stmts(&consequence.statements);
        let then_falls_through = self.close_arm(merge_block);

        // Without an `else`, the block stays empty and just jumps to merge.
        self.backend.position_at_end(else_block);
        self.function.reachable = reachable;
        if let Some(alternative) = alternative {
            self.stmts(&alternative.statements);
        }
        let else_falls_through = self.close_arm(merge_block);

        self.backend.position_at_end(merge_block);
        self.function.reachable = then_falls_through || else_falls_through;
    }

    /// Jumps to `merge` unless the arm already ended with a terminator.
    /// Returns whether `merge` is reachable through this arm.
    fn close_arm(&mut self, merge: B::Block) -> bool {
        if self.backend.is_terminated() {
            return false;
        }
        self.backend.branch(merge);
        self.function.reachable
    }

    /// Statements following a terminator are placed in a fresh block, which
    /// no branch targets.
    fn ensure_open_block(&mut self) {
        if self.backend.is_terminated() {
            let dead = self.backend.append_block(self.function.function, "dead");
            self.backend.position_at_end(dead);
            self.function.reachable = false;
        }
    }

    /// Runs `f` as the body of `function`. The cursor, the active scope and the
    /// function context are restored afterwards, regardless of how `f` ends.
    fn within_function<T>(
        &mut self,
        function: B::Function,
        return_ty: Ty,
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        let cursor = self.backend.save_cursor();
        let scope = self.scope;
        let context = std::mem::replace(
            &mut self.function,
            FunctionContext {
                function,
                return_ty,
                reachable: true,
                is_entry: false,
            },
        );

        let result = f(self);

        self.function = context;
        self.scope = scope;
        self.backend.restore_cursor(cursor);
        result
    }
}

/// Expressions.
impl<B: Backend> Generator<'_, B> {
    fn expr(&mut self, expr: &Expr) -> Result<Typed<B::Value>> {
        match &expr.kind {
            ExprKind::Int(int) => Ok(Typed {
                value: self.backend.const_int(*int),
                ty: Ty::Int,
            }),
            ExprKind::Float(float) => Ok(Typed {
                value: self.backend.const_float(*float),
                ty: Ty::Float,
            }),
            ExprKind::Bool(bool) => Ok(Typed {
                value: self.backend.const_bool(*bool),
                ty: Ty::Bool,
            }),
            ExprKind::Ident(ident) => self.ident(ident),
            ExprKind::Infix { op, lhs, rhs } => self.infix(*op, lhs, rhs, expr.span),
            ExprKind::Call { callee, args } => {
                let Some(value) = self.call(callee, args)? else {
                    self.error(expr.span.wrap(Error::VoidValue(callee.name.clone())));
                    return Err(());
                };
                Ok(value)
            }
        }
    }

    fn ident(&mut self, ident: &Ident) -> Result<Typed<B::Value>> {
        match self.env.lookup(self.scope, ident.as_str()).cloned() {
            Some(Binding {
                handle: Symbol::Variable { ptr, owner },
                ty,
            }) => {
                self.check_capture(owner, ident)?;
                Ok(Typed {
                    value: self.backend.load(ty, ptr),
                    ty,
                })
            }
            Some(Binding {
                handle: Symbol::Function { .. },
                ..
            }) => {
                self.error(ident.span.wrap(Error::NotAVariable(ident.name.clone())));
                Err(())
            }
            None => {
                self.error(ident.span.wrap(Error::UndefinedName(ident.name.clone())));
                Err(())
            }
        }
    }

    fn infix(
        &mut self,
        op: BinaryOperator,
        lhs: &Expr,
        rhs: &Expr,
        span: Span,
    ) -> Result<Typed<B::Value>> {
        // Both sides are compiled before bailing out, for their diagnostics.
        let lhs = self.expr(lhs);
        let rhs = self.expr(rhs);
        let (lhs, rhs) = (lhs?, rhs?);

        if lhs.ty != rhs.ty {
            let error = Error::OperandMismatch {
                op,
                lhs: lhs.ty,
                rhs: rhs.ty,
            };
            self.error(span.wrap(error));
            return Err(());
        }

        let ty = lhs.ty;
        let Some(lowered) = lower(op).filter(|_| ty.is_numeric()) else {
            self.error(span.wrap(Error::UnsupportedOperator { op, ty }));
            return Err(());
        };

        let (l, r) = (lhs.value, rhs.value);
        let float = ty == Ty::Float;
        let typed = match lowered {
            Lowered::Arith(op) if float => Typed {
                value: self.backend.float_arith(op, l, r),
                ty,
            },
            Lowered::Arith(op) => Typed {
                value: self.backend.int_arith(op, l, r),
                ty,
            },
            Lowered::Compare(op) if float => Typed {
                value: self.backend.float_compare(op, l, r),
                ty: Ty::Bool,
            },
            Lowered::Compare(op) => Typed {
                value: self.backend.int_compare(op, l, r),
                ty: Ty::Bool,
            },
        };
        Ok(typed)
    }

    /// Returns `None` for calls which produce no value.
    fn call(&mut self, callee: &Ident, args: &[Expr]) -> Result<Option<Typed<B::Value>>> {
        if let Some(builtin) = Builtin::from_name(callee.as_str()) {
            let mut failed = false;
            for arg in args {
                failed |= self.expr(arg).is_err();
            }
            if failed {
                return Err(());
            }
            return match builtin {
                Builtin::Print => Ok(None),
            };
        }

        let lookup = self.env.lookup(self.scope, callee.as_str()).cloned();
        let (function, params, return_ty) = match lookup {
            Some(Binding {
                handle: Symbol::Function { function, params },
                ty,
            }) => (function, params, ty),
            Some(_) => {
                self.error(callee.span.wrap(Error::NotAFunction(callee.name.clone())));
                return Err(());
            }
            None => {
                let error = Error::UndefinedFunction(callee.name.clone());
                self.error(callee.span.wrap(error));
                return Err(());
            }
        };

        let mut values = Vec::with_capacity(args.len());
        let mut failed = false;
        for arg in args {
            match self.expr(arg) {
                Ok(value) => values.push((value, arg.span)),
                Err(()) => failed = true,
            }
        }

        if args.len() != params.len() {
            let error = Error::ArgumentCount {
                name: callee.name.clone(),
                expected: params.len(),
                actual: args.len(),
            };
            self.error(callee.span.wrap(error));
            return Err(());
        }
        if failed {
            return Err(());
        }
        for (&(value, span), &expected) in values.iter().zip(params.iter()) {
            failed |= self.expect_type(expected, value.ty, span).is_err();
        }
        if failed {
            return Err(());
        }

        let args: Vec<_> = values.iter().map(|(typed, _)| typed.value).collect();
        Ok(Some(Typed {
            value: self.backend.call(function, &args),
            ty: return_ty,
        }))
    }
}

/// Utility functions.
impl<B: Backend> Generator<'_, B> {
    fn error(&mut self, error: Spanned<Error>) {
        self.errors.push(error);
    }

    fn expect_type(&mut self, expected: Ty, actual: Ty, span: Span) -> Result<()> {
        if expected == actual {
            Ok(())
        } else {
            self.error(span.wrap(Error::TypeMismatch { expected, actual }));
            Err(())
        }
    }

    /// Locals of an enclosing function can't be reached from a nested one.
    fn check_capture(&mut self, owner: Option<B::Function>, ident: &Ident) -> Result<()> {
        match owner {
            Some(owner) if owner != self.function.function => {
                self.error(ident.span.wrap(Error::CaptureOfLocal(ident.name.clone())));
                Err(())
            }
            _ => Ok(()),
        }
    }
}

enum Lowered {
    Arith(ArithOp),
    Compare(CompareOp),
}

/// Maps a source operator to its instruction. `^` has none.
fn lower(op: BinaryOperator) -> Option<Lowered> {
    use BinaryOperator::*;
    let lowered = match op {
        Add => Lowered::Arith(ArithOp::Add),
        Sub => Lowered::Arith(ArithOp::Sub),
        Mul => Lowered::Arith(ArithOp::Mul),
        Div => Lowered::Arith(ArithOp::Div),
        Rem => Lowered::Arith(ArithOp::Rem),
        Pow => return None,
        Lt => Lowered::Compare(CompareOp::Lt),
        Gt => Lowered::Compare(CompareOp::Gt),
        Le => Lowered::Compare(CompareOp::Le),
        Ge => Lowered::Compare(CompareOp::Ge),
        Eq => Lowered::Compare(CompareOp::Eq),
        Ne => Lowered::Compare(CompareOp::Ne),
    };
    Some(lowered)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    UndefinedName(Box<str>),
    AssignToUndefined(Box<str>),
    UndefinedFunction(Box<str>),
    /// A function used where a variable is expected.
    NotAVariable(Box<str>),
    NotAFunction(Box<str>),
    TypeMismatch {
        expected: Ty,
        actual: Ty,
    },
    OperandMismatch {
        op: BinaryOperator,
        lhs: Ty,
        rhs: Ty,
    },
    UnsupportedOperator {
        op: BinaryOperator,
        ty: Ty,
    },
    NonBooleanCondition(Ty),
    ArgumentCount {
        name: Box<str>,
        expected: usize,
        actual: usize,
    },
    /// The value of a call which produces none was used.
    VoidValue(Box<str>),
    DuplicateFunction(Box<str>),
    MissingReturn(Box<str>),
    CaptureOfLocal(Box<str>),
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::{
        codegen::{
            generate,
            llvm::{Builder, Instruction, Module, Terminator, Type},
        },
        parser,
        types::Ty,
        util::test_utils::tree_tests,
        Options,
    };

    tree_tests!(
        use codegen;

        fn test_globals_in_the_entry_function() {
            let program = "let x: int = 2 + 3; x = x * 2;";
            let tree_ok = "
                ; ModuleID = 'main'
                source_filename = \"main\"

                @true = constant i1 true
                @false = constant i1 false
                @x = global i32 0

                define i32 @main() {
                entry:
                  %t0 = add i32 2, 3
                  store i32 %t0, ptr @x
                  %t1 = load i32, ptr @x
                  %t2 = mul i32 %t1, 2
                  store i32 %t2, ptr @x
                  ret i32 0
                }
            ";
        }

        fn test_function_definition_and_call() {
            let program = "def add(a: int, b: int) -> int { return a + b; }\nlet r: int = add(2, 3);";
            let tree_ok = "
                ; ModuleID = 'main'
                source_filename = \"main\"

                @true = constant i1 true
                @false = constant i1 false
                @r = global i32 0

                define i32 @main() {
                entry:
                  %t0 = call i32 @add(i32 2, i32 3)
                  store i32 %t0, ptr @r
                  ret i32 0
                }

                define i32 @add(i32 %p0, i32 %p1) {
                entry:
                  %t0 = alloca i32
                  %t1 = alloca i32
                  store i32 %p0, ptr %t0
                  store i32 %p1, ptr %t1
                  %t2 = load i32, ptr %t0
                  %t3 = load i32, ptr %t1
                  %t4 = add i32 %t2, %t3
                  ret i32 %t4
                }
            ";
        }

        fn test_if_without_else() {
            let program = "let b: bool = 1 < 2; if b do { b = false; }";
            let tree_ok = "
                ; ModuleID = 'main'
                source_filename = \"main\"

                @true = constant i1 true
                @false = constant i1 false
                @b = global i1 false

                define i32 @main() {
                entry:
                  %t0 = icmp slt i32 1, 2
                  store i1 %t0, ptr @b
                  %t1 = load i1, ptr @b
                  br i1 %t1, label %then, label %else

                then:
                  store i1 false, ptr @b
                  br label %merge

                else:
                  br label %merge

                merge:
                  ret i32 0
                }
            ";
        }

        fn test_float_arithmetic() {
            let program = "let f: float = 1.5 * 2.0;";
            let tree_ok = "
                ; ModuleID = 'main'
                source_filename = \"main\"

                @true = constant i1 true
                @false = constant i1 false
                @f = global float 0.0

                define i32 @main() {
                entry:
                  %t0 = fmul float 0x3FF8000000000000, 0x4000000000000000
                  store float %t0, ptr @f
                  ret i32 0
                }
            ";
        }

        fn test_statements_after_return_go_to_a_dead_block() {
            let program = "def f() -> int { return 1; let x: int = 2; }";
            let tree_ok = "
                ; ModuleID = 'main'
                source_filename = \"main\"

                @true = constant i1 true
                @false = constant i1 false

                define i32 @main() {
                entry:
                  ret i32 0
                }

                define i32 @f() {
                entry:
                  %t0 = alloca i32
                  ret i32 1

                dead:
                  store i32 2, ptr %t0
                  unreachable
                }
            ";
        }

        fn test_recursion_needs_no_forward_declaration() {
            let program = "def fact(n: int) -> int { if n < 2 do { return 1; } return n * fact(n - 1); }";
            let expected_errors = &[];
        }

        fn test_return_on_every_path() {
            let program = "def sign(a: int) -> int { if a < 0 do { return 0; } else { return 1; } }";
            let expected_errors = &[];
        }

        fn test_return_type_mismatch() {
            let program = "def f() -> int { return 1.0; }";
            let expected_errors = &["1:25: expected type int, but got float"];
        }

        fn test_assignment_type_mismatch() {
            let program = "let x: int = 1; x = true;";
            let expected_errors = &["1:21: expected type int, but got bool"];
        }

        fn test_assign_before_definition() {
            let program = "x = 5;";
            let expected_errors = &["1:1: cannot assign to x before its definition"];
        }

        fn test_mixed_operand_types() {
            let program = "let a: int = 1; let b: float = 2.0; let c: int = a + b;";
            let expected_errors = &["1:50: mismatched operand types for +: int and float"];
        }

        fn test_exponent_is_not_supported() {
            let program = "let x: int = 2 ^ 3;";
            let expected_errors = &["1:14: operator ^ is not supported for type int"];
        }

        fn test_arithmetic_on_bool_is_not_supported() {
            let program = "let b: bool = true + false;";
            let expected_errors = &["1:15: operator + is not supported for type bool"];
        }

        fn test_condition_must_be_bool() {
            let program = "if 1 do { }";
            let expected_errors = &["1:4: condition must be of type bool, but got int"];
        }

        fn test_call_arity_and_argument_types() {
            let program = "def f(a: int) -> int { return a; } f(1, 2); f(true);";
            let expected_errors = &[
                "1:36: function f expects 1 arguments, but got 2",
                "1:47: expected type int, but got bool",
            ];
        }

        fn test_missing_return_on_some_path() {
            let program = "def f(a: int) -> int { if a < 0 do { return 0; } }";
            let expected_errors = &["1:5: function f may end without returning a value"];
        }

        fn test_nested_function_cannot_capture() {
            let program = "def outer(a: int) -> int { def inner() -> int { return a; } return inner(); }";
            let expected_errors = &["1:56: a belongs to an enclosing function and can't be captured"];
        }

        fn test_undefined_name() {
            let program = "let y: int = z + 1;";
            let expected_errors = &["1:14: z is not defined"];
        }

        fn test_duplicate_function() {
            let program = "def f() -> int { return 1; } def f() -> int { return 2; }";
            let expected_errors = &["1:34: function f is already defined"];
        }

        fn test_print_produces_no_value() {
            let program = "print(1, 2.0); let x: int = print(1);";
            let expected_errors = &["1:29: print does not produce a value"];
        }

        fn test_calling_a_variable() {
            let program = "let x: int = 1; x(2);";
            let expected_errors = &["1:17: x is not a function"];
        }

        fn test_reading_a_function_as_a_variable() {
            let program = "def f() -> int { return 1; } let y: int = f;";
            let expected_errors = &["1:43: f is a function, not a variable"];
        }

        fn test_rebinding_keeps_the_declared_type() {
            let program = "let x: int = 1; let x: float = 2.0;";
            let expected_errors = &["1:21: expected type int, but got float"];
        }
    );

    fn compile(src: &str) -> (Module, usize) {
        let program = parser::parse_program(src).unwrap();
        let options = Options::default();
        let mut builder = Builder::new(&options.module_name);
        let errors = generate(&mut builder, &program, &options).err().unwrap_or_default();
        (builder.finish(), errors.len())
    }

    #[test]
    fn test_failed_assignment_emits_no_store() {
        let (module, errors) = compile("y = 1 + 2;");
        assert_eq!(errors, 1);
        let main = module.function("main").unwrap();
        assert!(!main
            .instructions()
            .any(|inst| matches!(inst, Instruction::Store { .. })));
    }

    #[test]
    fn test_call_result_has_the_return_type() {
        let (module, errors) =
            compile("def half(x: float) -> float { return x / 2.0; } half(3.0);");
        assert_eq!(errors, 0);
        let main = module.function("main").unwrap();
        let call = main
            .instructions()
            .find(|inst| matches!(inst, Instruction::Call { .. }));
        assert!(call.is_some());
        let half = module.function("half").unwrap();
        assert_eq!((half.params.as_slice(), half.return_ty), (&[Ty::Float][..], Ty::Float));
    }

    #[test]
    fn test_merge_block_counts_both_arms() {
        let (module, errors) = compile("let b: bool = true; if b do { b = false; }");
        assert_eq!(errors, 0);
        let main = module.function("main").unwrap();
        assert_eq!(main.block("merge").unwrap().predecessors, 2);
        assert_eq!(main.block("then").unwrap().predecessors, 1);
        assert!(main.block("else").unwrap().instructions.is_empty());
    }

    #[test]
    fn test_locals_live_on_the_stack() {
        let (module, errors) =
            compile("def f() -> bool { let u: bool = 1 < 2; let t: bool = u; return t; }");
        assert_eq!(errors, 0);
        assert!(module.global("t").is_none() && module.global("u").is_none());
        let f = module.function("f").unwrap();
        let entry = &f.blocks[0];
        // Each slot is numbered after the value it is initialized with.
        assert_eq!(
            entry.instructions[..2],
            [
                Instruction::Alloca {
                    dst: 1,
                    ty: Ty::Bool
                },
                Instruction::Alloca {
                    dst: 3,
                    ty: Ty::Bool
                },
            ]
        );
        assert!(matches!(
            entry.terminator,
            Some(Terminator::Return(value)) if value.ty == Type::Ty(Ty::Bool)
        ));
    }
}
