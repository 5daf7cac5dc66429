use std::fmt;

use crate::{codegen::generator, parser, token::Spanned};

impl fmt::Display for Spanned<parser::Error> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Spanned { span, inner: error } = self;

        if f.alternate() {
            write!(f, "{}:{}: ", span.line, span.column)?;
        }

        use parser::Error::*;
        match error {
            Unexpected { actual, expected } => {
                write!(f, "expected token {expected:?}, but got {actual:?}")
            }
            UnexpectedAny { actual, expected } => {
                write!(f, "expected one of {expected:?}, but got {actual:?}")
            }
            UnexpectedTokenInExpr { token } => {
                write!(f, "unexpected token {token:?} in expression")
            }
            InvalidCallee => write!(f, "only identifiers can be called"),
            ParseInt => write!(f, "integer literal out of range"),
            ParseFloat => write!(f, "float literal out of range"),
            Illegal(text) => write!(f, "illegal token {text:?}"),
        }
    }
}

impl fmt::Display for Spanned<generator::Error> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Spanned { span, inner: error } = self;

        if f.alternate() {
            write!(f, "{}:{}: ", span.line, span.column)?;
        }

        use generator::Error::*;
        match error {
            UndefinedName(name) => write!(f, "{name} is not defined"),
            AssignToUndefined(name) => write!(f, "cannot assign to {name} before its definition"),
            UndefinedFunction(name) => write!(f, "function {name} is not defined"),
            NotAVariable(name) => write!(f, "{name} is a function, not a variable"),
            NotAFunction(name) => write!(f, "{name} is not a function"),
            TypeMismatch { expected, actual } => {
                write!(f, "expected type {expected}, but got {actual}")
            }
            OperandMismatch { op, lhs, rhs } => {
                write!(f, "mismatched operand types for {op}: {lhs} and {rhs}")
            }
            UnsupportedOperator { op, ty } => {
                write!(f, "operator {op} is not supported for type {ty}")
            }
            NonBooleanCondition(ty) => {
                write!(f, "condition must be of type bool, but got {ty}")
            }
            ArgumentCount {
                name,
                expected,
                actual,
            } => write!(
                f,
                "function {name} expects {expected} arguments, but got {actual}"
            ),
            VoidValue(name) => write!(f, "{name} does not produce a value"),
            DuplicateFunction(name) => write!(f, "function {name} is already defined"),
            MissingReturn(name) => {
                write!(f, "function {name} may end without returning a value")
            }
            CaptureOfLocal(name) => write!(
                f,
                "{name} belongs to an enclosing function and can't be captured"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{codegen::generator, parser, token::Span, types::Ty};

    #[test]
    fn test_alternate_prefixes_the_position() {
        let error = Span::new(10, 12, 3, 4).wrap(generator::Error::TypeMismatch {
            expected: Ty::Int,
            actual: Ty::Bool,
        });
        assert_eq!(error.to_string(), "expected type int, but got bool");
        assert_eq!(format!("{error:#}"), "3:4: expected type int, but got bool");

        let error = Span::new(0, 1, 1, 1).wrap(parser::Error::InvalidCallee);
        assert_eq!(format!("{error:#}"), "1:1: only identifiers can be called");
    }
}
