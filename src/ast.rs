// program ::= stmt*
// stmt ::= let ID ':' TYPE '=' expr ';'
//        | def ID '(' [param (',' param)*] ')' '->' TYPE block
//        | return expr ';'
//        | if expr do block [else block]
//        | ID '=' expr [';']
//        | block
//        | expr [';']
// block ::= '{' stmt* '}'
// param ::= ID ':' TYPE
// expr ::= expr op expr
//        | ID '(' [expr (',' expr)*] ')'
//        | '(' expr ')'
//        | ID
//        | integer
//        | float
//        | true
//        | false

// Precedence
//
// (
// ^
// * / %
// + -
// < > <= >=
// == !=

use std::fmt;

use crate::{token::Span, types::Ty};

#[derive(Debug, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

#[derive(Debug, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, PartialEq)]
pub enum StmtKind {
    Expr(Expr),
    Let {
        name: Ident,
        ty: TypeName,
        value: Expr,
    },
    Block(Block),
    Function(Function),
    Return(Expr),
    Assign {
        target: Ident,
        value: Expr,
    },
    If {
        condition: Expr,
        consequence: Block,
        alternative: Option<Block>,
    },
}

#[derive(Debug, PartialEq)]
pub struct Block {
    pub statements: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, PartialEq)]
pub struct Function {
    pub name: Ident,
    pub params: Vec<Param>,
    pub return_ty: TypeName,
    pub body: Block,
}

#[derive(Debug, PartialEq)]
pub struct Param {
    pub name: Ident,
    pub ty: TypeName,
}

#[derive(Debug, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, PartialEq)]
pub enum ExprKind {
    Infix {
        op: BinaryOperator,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        callee: Ident,
        args: Vec<Expr>,
    },
    Ident(Ident),
    Int(i32),
    Float(f32),
    Bool(bool),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
}

impl BinaryOperator {
    pub const fn symbol(self) -> &'static str {
        use BinaryOperator::*;
        match self {
            Add => "+",
            Sub => "-",
            Mul => "*",
            Div => "/",
            Rem => "%",
            Pow => "^",
            Lt => "<",
            Gt => ">",
            Le => "<=",
            Ge => ">=",
            Eq => "==",
            Ne => "!=",
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ident {
    pub name: Box<str>,
    pub span: Span,
}

impl Ident {
    pub fn as_str(&self) -> &str {
        &self.name
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TypeName {
    pub ty: Ty,
    pub span: Span,
}
