//! A parsed script: source text bound to its AST.

use std::rc::Rc;

use crate::errors::Error;
use crate::syntax::{Ast, Lexer, Parser};

/// Parse result bound to the source it came from. The AST is shared so
/// function descriptors registered in a context can outlive the script
/// value itself.
#[derive(Debug)]
pub struct Script {
    source: String,
    ast: Rc<Ast>,
}

impl Script {
    /// Parse `source` into a script. Rejection by the parser is a
    /// `ParseError` with the offending position.
    pub fn parse(source: impl Into<String>) -> Result<Script, Error> {
        let source = source.into();
        let tokens = Lexer::new(&source).lex_all();
        let ast = Parser::new(&tokens).parse()?;
        Ok(Script {
            source,
            ast: Rc::new(ast),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn ast(&self) -> &Rc<Ast> {
        &self.ast
    }
}
