use std::fmt::{self, Write};

use crate::ast::*;

const INDENT_WIDTH: usize = 2;

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        print_program(f, self)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        print_expr(f, 0, self)
    }
}

pub fn print_program(w: &mut impl Write, program: &Program) -> fmt::Result {
    for stmt in &program.statements {
        print_stmt(w, 0, stmt)?;
    }
    Ok(())
}

fn print_stmt(w: &mut impl Write, i: usize, stmt: &Stmt) -> fmt::Result {
    sp(w, i)?;
    let span = stmt.span;
    match &stmt.kind {
        StmtKind::Expr(expr) => {
            writeln!(w, "expr ({span})")?;
            print_expr(w, i + 1, expr)?;
        }
        StmtKind::Let { name, ty, value } => {
            writeln!(w, "let {}: {} ({span})", name.as_str(), ty.ty)?;
            print_expr(w, i + 1, value)?;
        }
        StmtKind::Block(block) => {
            writeln!(w, "block ({span})")?;
            print_stmts(w, i + 1, &block.statements)?;
        }
        StmtKind::Function(Function {
            name,
            params,
            return_ty,
            body,
        }) => {
            write!(w, "def {}(", name.as_str())?;
            for (idx, param) in params.iter().enumerate() {
                if idx > 0 {
                    write!(w, ", ")?;
                }
                write!(w, "{}: {}", param.name.as_str(), param.ty.ty)?;
            }
            writeln!(w, ") -> {} ({span})", return_ty.ty)?;
            print_stmts(w, i + 1, &body.statements)?;
        }
        StmtKind::Return(value) => {
            writeln!(w, "return ({span})")?;
            print_expr(w, i + 1, value)?;
        }
        StmtKind::Assign { target, value } => {
            writeln!(w, "assign {} ({span})", target.as_str())?;
            print_expr(w, i + 1, value)?;
        }
        StmtKind::If {
            condition,
            consequence,
            alternative,
        } => {
            writeln!(w, "if ({span})")?;
            print_expr(w, i + 1, condition)?;
            print_arm(w, i + 1, "then", consequence)?;
            if let Some(alternative) = alternative {
                print_arm(w, i + 1, "else", alternative)?;
            }
        }
    }
    Ok(())
}

fn print_arm(w: &mut impl Write, i: usize, label: &str, block: &Block) -> fmt::Result {
    sp(w, i)?;
    writeln!(w, "{label} ({})", block.span)?;
    print_stmts(w, i + 1, &block.statements)
}

fn print_stmts(w: &mut impl Write, i: usize, stmts: &[Stmt]) -> fmt::Result {
    for stmt in stmts {
        print_stmt(w, i, stmt)?;
    }
    Ok(())
}

pub fn print_expr(w: &mut impl Write, i: usize, expr: &Expr) -> fmt::Result {
    sp(w, i)?;
    let span = expr.span;
    match &expr.kind {
        ExprKind::Infix { op, lhs, rhs } => {
            writeln!(w, "infix {op} ({span})")?;
            print_expr(w, i + 1, lhs)?;
            print_expr(w, i + 1, rhs)?;
        }
        ExprKind::Call { callee, args } => {
            writeln!(w, "call {} ({span})", callee.as_str())?;
            for arg in args {
                print_expr(w, i + 1, arg)?;
            }
        }
        ExprKind::Ident(ident) => writeln!(w, "ident {} ({span})", ident.as_str())?,
        ExprKind::Int(int) => writeln!(w, "int {int} ({span})")?,
        ExprKind::Float(float) => writeln!(w, "float {float:?} ({span})")?,
        ExprKind::Bool(bool) => writeln!(w, "bool {bool} ({span})")?,
    }
    Ok(())
}

fn sp(w: &mut impl Write, i: usize) -> fmt::Result {
    write!(w, "{:i$}", "", i = i * INDENT_WIDTH)
}
