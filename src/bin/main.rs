use std::{
    error::Error,
    io::{self, Write},
};

use lumen::{
    compile,
    lexer::Lexer,
    parser,
    token::Token,
    util::BreakableIteratorExt,
    Diagnostics, Options,
};

fn main() {
    if let Err(error) = run() {
        println!("failed to run: {error}");
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let options = Options::default();
    let mut input = String::new();
    loop {
        print!("> ");
        io::stdout().flush()?;

        input.clear();
        let n = io::stdin().read_line(&mut input)?;

        if n == 0 {
            println!("^D");
            return Ok(());
        }

        let line = input.trim();
        if let Some(src) = line.strip_prefix(":lex") {
            let lexed: Vec<_> = Lexer::new(src.trim()).up_to(Token::is_eof).collect();
            println!("{lexed:?}");
        } else if let Some(src) = line.strip_prefix(":ast") {
            match parser::parse_program(src.trim()) {
                Ok(program) => print!("{program}"),
                Err((program, errors)) => {
                    print!("{program}");
                    println!("{}", Diagnostics(errors));
                }
            }
        } else if !line.is_empty() {
            match compile(line, &options) {
                Ok(module) => print!("{module}"),
                Err(error) => println!("{error}"),
            }
        }
    }
}
