use std::fmt;

use crate::{codegen::llvm, token::Spanned};

/// The lexer takes the source input, mapping it into a sequence of tokens.
pub mod lexer;

/// The parser takes a sequence of tokens, mapping it into an AST.
pub mod parser;

/// The code generator walks the AST, emitting IR into a backend.
pub mod codegen {
    pub mod generator;
    pub mod interface;
    pub mod llvm;

    pub use interface::{generate, Backend};
}

pub mod ast;
pub mod environment;
pub mod token;
pub mod types;
pub mod util;

/// Compilation settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Options {
    /// Printed as the IR module identifier.
    pub module_name: String,
    /// Name of the function which holds the top-level statements.
    pub entry_point: String,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            module_name: "main".to_owned(),
            entry_point: "main".to_owned(),
        }
    }
}

/// Parses and compiles `src` into an LLVM module.
///
/// Code generation only runs on a syntactically valid program. Both error
/// variants carry the partial artifact built so far.
pub fn compile(src: &str, options: &Options) -> Result<llvm::Module, CompileError> {
    let program = parser::parse_program(src).map_err(|(program, errors)| CompileError::Syntax {
        diagnostics: Diagnostics(errors),
        program,
    })?;

    let mut builder = llvm::Builder::new(&options.module_name);
    match codegen::generate(&mut builder, &program, options) {
        Ok(()) => Ok(builder.finish()),
        Err(errors) => Err(CompileError::Semantic {
            diagnostics: Diagnostics(errors),
            module: Box::new(builder.finish()),
        }),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("syntax errors:\n{diagnostics}")]
    Syntax {
        diagnostics: Diagnostics<parser::Error>,
        program: ast::Program,
    },
    #[error("semantic errors:\n{diagnostics}")]
    Semantic {
        diagnostics: Diagnostics<codegen::generator::Error>,
        module: Box<llvm::Module>,
    },
}

/// An ordered list of diagnostics, displayed one per line.
#[derive(Debug, PartialEq, Eq)]
pub struct Diagnostics<E>(pub Vec<Spanned<E>>);

impl<E> fmt::Display for Diagnostics<E>
where
    Spanned<E>: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, diagnostic) in self.0.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            write!(f, "{diagnostic:#}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_compile_ok() {
        let module = compile("let x: int = 1;", &Options::default()).unwrap();
        assert_eq!(module.name, "main");
        assert!(module.function("main").is_some());
        assert!(module.global("x").is_some());
    }

    #[test]
    fn test_sample_program_compiles() {
        let module = compile(include_str!("../demos/sample.lm"), &Options::default()).unwrap();
        for name in ["main", "square", "fact", "sign", "average", "between"] {
            assert!(module.function(name).is_some(), "missing function {name}");
        }
        assert!(module.global("scaled").is_some());
    }

    #[test]
    fn test_options_rename_the_module_and_entry_point() {
        let options = Options {
            module_name: "demo".to_owned(),
            entry_point: "start".to_owned(),
        };
        let module = compile("print(1);", &options).unwrap();
        assert!(module.to_string().starts_with("; ModuleID = 'demo'\n"));
        assert!(module.function("start").is_some());
        assert!(module.function("main").is_none());
    }

    #[test]
    fn test_syntax_errors_stop_before_codegen() {
        let error = compile("let x int = 1;\ny = 1;", &Options::default()).unwrap_err();
        let CompileError::Syntax {
            diagnostics,
            program,
        } = &error
        else {
            panic!("expected syntax error, got {error:?}");
        };
        assert_eq!(diagnostics.0.len(), 1);
        // `y = 1;` is kept, although it would fail in codegen.
        assert_eq!(program.statements.len(), 1);
        assert_eq!(
            error.to_string(),
            "syntax errors:\n1:7: expected token Colon, but got Type"
        );
    }

    #[test]
    fn test_semantic_errors_keep_the_module() {
        let error = compile("x = 1;\nlet y: bool = 2;", &Options::default()).unwrap_err();
        let CompileError::Semantic {
            diagnostics,
            module,
        } = &error
        else {
            panic!("expected semantic error, got {error:?}");
        };
        assert_eq!(diagnostics.0.len(), 2);
        assert!(module.global("y").is_some());
        assert_eq!(
            error.to_string(),
            "semantic errors:\n\
            1:1: cannot assign to x before its definition\n\
            2:15: expected type bool, but got int"
        );
    }
}
