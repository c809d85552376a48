//! Recursive descent parser producing the opaque node tree.
//!
//! The grammar follows the pscript surface: `let` declarations, `fn` and
//! `extern fn` definitions, `struct` definitions, `extern let` bindings,
//! namespaces, imports, `if`/`while`/`for` control flow, and expressions
//! with the operator precedence ladder (low to high, all left-associative):
//!
//! 1. `=  +=  -=  *=  /=`
//! 2. `&&  ||`
//! 3. `==  !=  <=  >=  <  >`
//! 4. `-  +  <<  >>  ^  &  %`
//! 5. `/  *`
//!
//! with the unary prefixes `-  !  ++  --  &` binding tighter than all of
//! them. Parsing stops at the first error.

use crate::errors::{parse_error, Error};

use super::ast::{Ast, Node, NodeId, NodeKind};
use super::token::{Token, TokenKind};

/// Parser state over a lexed token list.
pub struct Parser<'src> {
    tokens: &'src [Token],
    pos: usize,
    nodes: Vec<Node>,
}

impl<'src> Parser<'src> {
    pub fn new(tokens: &'src [Token]) -> Self {
        Parser {
            tokens,
            pos: 0,
            nodes: Vec::with_capacity(tokens.len()),
        }
    }

    /// Parse a complete script.
    pub fn parse(mut self) -> Result<Ast, Error> {
        let start = self.mark();
        let mut items = Vec::new();
        while !self.at_end() {
            items.push(self.parse_item()?);
        }
        let root = self.alloc_at(NodeKind::Script, "", items, start);
        Ok(Ast::new(self.nodes, root))
    }

    // ===== Token access =====

    fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn kind(&self) -> TokenKind {
        self.current().kind
    }

    fn peek(&self, offset: usize) -> TokenKind {
        let idx = (self.pos + offset).min(self.tokens.len() - 1);
        self.tokens[idx].kind
    }

    fn at_end(&self) -> bool {
        self.kind() == TokenKind::Eof
    }

    fn advance(&mut self) -> &Token {
        let idx = self.pos.min(self.tokens.len() - 1);
        if !self.at_end() {
            self.pos += 1;
        }
        &self.tokens[idx]
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.kind() == kind
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume(&mut self, kind: TokenKind, msg: &str) -> Result<&Token, Error> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.error(msg))
        }
    }

    fn error(&self, msg: &str) -> Error {
        let token = self.current();
        parse_error(format!("{msg}, found '{}'", describe(token)))
            .at(token.line, token.column)
    }

    /// Position of the current token, stamped onto the node built from it.
    fn mark(&self) -> (u32, u32) {
        (self.current().line, self.current().column)
    }

    // ===== Node construction =====

    fn alloc_at(
        &mut self,
        kind: NodeKind,
        text: impl Into<String>,
        children: Vec<NodeId>,
        position: (u32, u32),
    ) -> NodeId {
        let id = NodeId::new(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind,
            text: text.into(),
            children,
            line: position.0,
            column: position.1,
        });
        id
    }

    // ===== Items =====

    fn parse_item(&mut self) -> Result<NodeId, Error> {
        match self.kind() {
            TokenKind::Namespace => self.parse_namespace(),
            TokenKind::Fn => self.parse_function(false),
            TokenKind::Struct => self.parse_struct(),
            TokenKind::Extern => match self.peek(1) {
                TokenKind::Fn => self.parse_function(true),
                TokenKind::Let => self.parse_extern_var(),
                _ => Err(self.error("expected 'fn' or 'let' after 'extern'")),
            },
            _ => self.parse_element(),
        }
    }

    fn parse_namespace(&mut self) -> Result<NodeId, Error> {
        let start = self.mark();
        self.consume(TokenKind::Namespace, "expected 'namespace'")?;
        let name = self.parse_ident()?;
        self.consume(TokenKind::LBrace, "expected '{' after namespace name")?;
        let mut items = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.at_end() {
            items.push(self.parse_item()?);
        }
        self.consume(TokenKind::RBrace, "expected '}' to close namespace")?;
        Ok(self.alloc_at(NodeKind::Namespace, name, items, start))
    }

    fn parse_function(&mut self, is_extern: bool) -> Result<NodeId, Error> {
        let start = self.mark();
        if is_extern {
            self.consume(TokenKind::Extern, "expected 'extern'")?;
        }
        self.consume(TokenKind::Fn, "expected 'fn'")?;
        let name = self.parse_ident()?;
        self.consume(TokenKind::LParen, "expected '(' after function name")?;

        let params_start = self.mark();
        let mut params = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                params.push(self.parse_param()?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RParen, "expected ')' after parameter list")?;
        let param_list = self.alloc_at(NodeKind::ParamList, "", params, params_start);

        self.consume(TokenKind::Arrow, "expected '->' before return type")?;
        let return_type = self.parse_typename()?;

        let mut children = vec![param_list, return_type];
        if is_extern {
            self.consume(TokenKind::Semicolon, "expected ';' after extern function")?;
        } else {
            children.push(self.parse_compound()?);
        }
        Ok(self.alloc_at(NodeKind::Function, name, children, start))
    }

    fn parse_param(&mut self) -> Result<NodeId, Error> {
        let start = self.mark();
        let name = self.parse_ident()?;
        self.consume(TokenKind::Colon, "expected ':' after parameter name")?;
        let ty = self.parse_typename()?;
        Ok(self.alloc_at(NodeKind::Param, name, vec![ty], start))
    }

    fn parse_struct(&mut self) -> Result<NodeId, Error> {
        let start = self.mark();
        self.consume(TokenKind::Struct, "expected 'struct'")?;
        let name = self.parse_ident()?;
        self.consume(TokenKind::LBrace, "expected '{' after struct name")?;
        let mut members = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.at_end() {
            members.push(self.parse_struct_member()?);
        }
        self.consume(TokenKind::RBrace, "expected '}' to close struct")?;
        self.consume(TokenKind::Semicolon, "expected ';' after struct definition")?;
        Ok(self.alloc_at(NodeKind::Struct, name, members, start))
    }

    fn parse_struct_member(&mut self) -> Result<NodeId, Error> {
        let start = self.mark();
        let name = self.parse_ident()?;
        self.consume(TokenKind::Colon, "expected ':' after member name")?;
        let ty = self.parse_typename()?;
        let mut children = vec![ty];
        if self.eat(TokenKind::Assign) {
            children.push(self.parse_expression()?);
        }
        self.consume(TokenKind::Semicolon, "expected ';' after struct member")?;
        Ok(self.alloc_at(NodeKind::StructMember, name, children, start))
    }

    fn parse_extern_var(&mut self) -> Result<NodeId, Error> {
        let start = self.mark();
        self.consume(TokenKind::Extern, "expected 'extern'")?;
        self.consume(TokenKind::Let, "expected 'let'")?;
        let name = self.parse_ident()?;
        self.consume(TokenKind::Arrow, "expected '->' before extern variable type")?;
        let ty = self.parse_typename()?;
        self.consume(TokenKind::Semicolon, "expected ';' after extern variable")?;
        Ok(self.alloc_at(NodeKind::ExternVar, name, vec![ty], start))
    }

    /// A type name: optionally `&`-prefixed, a built-in type or a (possibly
    /// namespace-qualified) struct name. The reference marker is kept in
    /// the node text.
    fn parse_typename(&mut self) -> Result<NodeId, Error> {
        let start = self.mark();
        let mut text = String::new();
        if self.eat(TokenKind::Amp) {
            text.push('&');
        }
        if self.kind().is_builtin_type() {
            text.push_str(&self.advance().text);
        } else {
            text.push_str(&self.parse_dotted_name()?);
        }
        Ok(self.alloc_at(NodeKind::TypeName, text, Vec::new(), start))
    }

    // ===== Statements =====

    fn parse_element(&mut self) -> Result<NodeId, Error> {
        match self.kind() {
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::For => self.parse_for(),
            _ => self.parse_statement(),
        }
    }

    fn parse_statement(&mut self) -> Result<NodeId, Error> {
        let start = self.mark();
        let inner = match self.kind() {
            TokenKind::Import => self.parse_import()?,
            TokenKind::Return => self.parse_return()?,
            TokenKind::Let => self.parse_declaration()?,
            _ => self.parse_expression()?,
        };
        self.consume(TokenKind::Semicolon, "expected ';' after statement")?;
        Ok(self.alloc_at(NodeKind::Statement, "", vec![inner], start))
    }

    fn parse_import(&mut self) -> Result<NodeId, Error> {
        let start = self.mark();
        self.consume(TokenKind::Import, "expected 'import'")?;
        let path = self.parse_dotted_name()?;
        Ok(self.alloc_at(NodeKind::Import, path, Vec::new(), start))
    }

    fn parse_return(&mut self) -> Result<NodeId, Error> {
        let start = self.mark();
        self.consume(TokenKind::Return, "expected 'return'")?;
        let mut children = Vec::new();
        if !self.check(TokenKind::Semicolon) {
            children.push(self.parse_expression()?);
        }
        Ok(self.alloc_at(NodeKind::Return, "", children, start))
    }

    fn parse_declaration(&mut self) -> Result<NodeId, Error> {
        let start = self.mark();
        self.consume(TokenKind::Let, "expected 'let'")?;
        let name = self.parse_ident()?;
        self.consume(TokenKind::Assign, "expected '=' in declaration")?;
        let init = self.parse_expression()?;
        Ok(self.alloc_at(NodeKind::Declaration, name, vec![init], start))
    }

    /// A braced block, or a single element promoted to a one-child block.
    fn parse_compound(&mut self) -> Result<NodeId, Error> {
        let start = self.mark();
        if self.eat(TokenKind::LBrace) {
            let mut elements = Vec::new();
            while !self.check(TokenKind::RBrace) && !self.at_end() {
                elements.push(self.parse_element()?);
            }
            self.consume(TokenKind::RBrace, "expected '}' to close block")?;
            Ok(self.alloc_at(NodeKind::Compound, "", elements, start))
        } else {
            let element = self.parse_element()?;
            Ok(self.alloc_at(NodeKind::Compound, "", vec![element], start))
        }
    }

    fn parse_if(&mut self) -> Result<NodeId, Error> {
        let start = self.mark();
        self.consume(TokenKind::If, "expected 'if'")?;
        self.consume(TokenKind::LParen, "expected '(' after 'if'")?;
        let condition = self.parse_expression()?;
        self.consume(TokenKind::RParen, "expected ')' after condition")?;
        let body = self.parse_compound()?;
        let mut children = vec![condition, body];
        if self.check(TokenKind::Else) {
            let else_start = self.mark();
            self.advance();
            let else_body = self.parse_compound()?;
            children.push(self.alloc_at(NodeKind::Else, "", vec![else_body], else_start));
        }
        Ok(self.alloc_at(NodeKind::If, "", children, start))
    }

    fn parse_while(&mut self) -> Result<NodeId, Error> {
        let start = self.mark();
        self.consume(TokenKind::While, "expected 'while'")?;
        self.consume(TokenKind::LParen, "expected '(' after 'while'")?;
        let condition = self.parse_expression()?;
        self.consume(TokenKind::RParen, "expected ')' after condition")?;
        let body = self.parse_compound()?;
        Ok(self.alloc_at(NodeKind::While, "", vec![condition, body], start))
    }

    fn parse_for(&mut self) -> Result<NodeId, Error> {
        let start = self.mark();
        self.consume(TokenKind::For, "expected 'for'")?;
        self.consume(TokenKind::LParen, "expected '(' after 'for'")?;

        // `for (let x : expr)` is a range-for; `for (let ...; cond; step)`
        // is the manual shape.
        if self.check(TokenKind::Let) && self.peek(2) == TokenKind::Colon {
            self.advance();
            let binding = self.parse_ident()?;
            self.consume(TokenKind::Colon, "expected ':' in range-for")?;
            let iterable = self.parse_expression()?;
            self.consume(TokenKind::RParen, "expected ')' after range-for")?;
            let body = self.parse_compound()?;
            return Ok(self.alloc_at(NodeKind::ForEach, binding, vec![iterable, body], start));
        }

        let init = self.parse_declaration()?;
        self.consume(TokenKind::Semicolon, "expected ';' after for initializer")?;
        let condition = self.parse_expression()?;
        self.consume(TokenKind::Semicolon, "expected ';' after for condition")?;
        let step = self.parse_expression()?;
        self.consume(TokenKind::RParen, "expected ')' after for step")?;
        let body = self.parse_compound()?;
        Ok(self.alloc_at(
            NodeKind::ForManual,
            "",
            vec![init, condition, step, body],
            start,
        ))
    }

    // ===== Expressions =====

    fn parse_expression(&mut self) -> Result<NodeId, Error> {
        if self.at_constructor() {
            return self.parse_constructor();
        }
        if self.check(TokenKind::LBracket) {
            return self.parse_list_expr();
        }
        self.parse_op_expr(1)
    }

    /// Lookahead for `Name { …` / `a.b.Name { …` constructor expressions.
    fn at_constructor(&self) -> bool {
        if !(self.check(TokenKind::Ident) || self.kind().is_builtin_type()) {
            return false;
        }
        let mut offset = 1;
        while self.peek(offset) == TokenKind::Dot && self.peek(offset + 1) == TokenKind::Ident {
            offset += 2;
        }
        self.peek(offset) == TokenKind::LBrace
    }

    fn parse_constructor(&mut self) -> Result<NodeId, Error> {
        let start = self.mark();
        let name = if self.kind().is_builtin_type() {
            self.advance().text.clone()
        } else {
            self.parse_dotted_name()?
        };
        self.consume(TokenKind::LBrace, "expected '{' in constructor")?;
        let args = self.parse_arg_list(TokenKind::RBrace, "expected '}' after constructor arguments")?;
        Ok(self.alloc_at(NodeKind::ConstructorExpr, name, vec![args], start))
    }

    fn parse_list_expr(&mut self) -> Result<NodeId, Error> {
        let start = self.mark();
        self.consume(TokenKind::LBracket, "expected '['")?;
        let mut elements = Vec::new();
        if !self.check(TokenKind::RBracket) {
            loop {
                elements.push(self.parse_expression()?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RBracket, "expected ']' after list elements")?;
        let literal = self.alloc_at(NodeKind::ListExpr, "", elements, start);
        self.parse_method_calls(literal, start)
    }

    fn parse_op_expr(&mut self, min_prec: u8) -> Result<NodeId, Error> {
        let start = self.mark();
        let mut lhs = self.parse_atom()?;
        loop {
            let Some(prec) = binary_precedence(self.kind()) else {
                break;
            };
            if prec < min_prec {
                break;
            }
            let op_start = self.mark();
            let symbol = self.advance().kind.symbol();
            let op = self.alloc_at(NodeKind::Operator, symbol, Vec::new(), op_start);
            let rhs = self.parse_op_expr(prec + 1)?;
            lhs = self.alloc_at(NodeKind::OpExpr, "", vec![lhs, op, rhs], start);
        }
        Ok(lhs)
    }

    fn parse_atom(&mut self) -> Result<NodeId, Error> {
        let start = self.mark();
        match self.kind() {
            // Unary prefixes
            TokenKind::Minus
            | TokenKind::Bang
            | TokenKind::PlusPlus
            | TokenKind::MinusMinus
            | TokenKind::Amp => {
                let symbol = self.advance().kind.symbol();
                let operand = self.parse_atom()?;
                Ok(self.alloc_at(NodeKind::UnaryExpr, symbol, vec![operand], start))
            }

            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expression()?;
                self.consume(TokenKind::RParen, "expected ')'")?;
                Ok(inner)
            }

            TokenKind::LBracket => self.parse_list_expr(),

            TokenKind::Int | TokenKind::Uint => {
                let text = self.advance().text.clone();
                Ok(self.alloc_at(NodeKind::Integer, text, Vec::new(), start))
            }
            TokenKind::Real => {
                let text = self.advance().text.clone();
                Ok(self.alloc_at(NodeKind::Real, text, Vec::new(), start))
            }
            TokenKind::True | TokenKind::False => {
                let text = self.advance().text.clone();
                Ok(self.alloc_at(NodeKind::BoolLit, text, Vec::new(), start))
            }
            TokenKind::Str => {
                let text = self.advance().text.clone();
                let literal = self.alloc_at(NodeKind::StringLit, text, Vec::new(), start);
                self.parse_method_calls(literal, start)
            }

            TokenKind::Ident => self.parse_name_expr(),

            _ => Err(self.error("expected an expression")),
        }
    }

    /// Trailing `.method(args)` calls on a literal receiver.
    fn parse_method_calls(&mut self, mut receiver: NodeId, start: (u32, u32)) -> Result<NodeId, Error> {
        while self.check(TokenKind::Dot) && self.peek(1) == TokenKind::Ident && self.peek(2) == TokenKind::LParen
        {
            self.advance();
            let method = self.parse_ident()?;
            self.consume(TokenKind::LParen, "expected '(' after method name")?;
            let args = self.parse_arg_list(TokenKind::RParen, "expected ')' after arguments")?;
            receiver = self.alloc_at(NodeKind::MethodCall, method, vec![receiver, args], start);
        }
        Ok(receiver)
    }

    /// Identifier-led expressions: calls (with dotted names), indexing,
    /// member-access chains, and plain identifiers.
    fn parse_name_expr(&mut self) -> Result<NodeId, Error> {
        let start = self.mark();
        let name = self.parse_dotted_name()?;

        let base = if self.check(TokenKind::LParen) {
            self.advance();
            let args = self.parse_arg_list(TokenKind::RParen, "expected ')' after arguments")?;
            return Ok(self.alloc_at(NodeKind::CallExpr, name, vec![args], start));
        } else if self.check(TokenKind::LBracket) && !name.contains('.') {
            let ident = self.alloc_at(NodeKind::Identifier, name, Vec::new(), start);
            self.advance();
            let index = self.parse_expression()?;
            self.consume(TokenKind::RBracket, "expected ']' after index")?;
            self.alloc_at(NodeKind::IndexExpr, "", vec![ident, index], start)
        } else {
            self.alloc_at(NodeKind::Identifier, name, Vec::new(), start)
        };

        if !self.check(TokenKind::Arrow) {
            return Ok(base);
        }

        let mut children = vec![base];
        while self.eat(TokenKind::Arrow) {
            let step_start = self.mark();
            let field = self.parse_ident()?;
            let ident = self.alloc_at(NodeKind::Identifier, field, Vec::new(), step_start);
            if self.eat(TokenKind::LBracket) {
                let index = self.parse_expression()?;
                self.consume(TokenKind::RBracket, "expected ']' after index")?;
                children.push(self.alloc_at(
                    NodeKind::IndexExpr,
                    "",
                    vec![ident, index],
                    step_start,
                ));
            } else {
                children.push(ident);
            }
        }
        Ok(self.alloc_at(NodeKind::MemberAccess, "", children, start))
    }

    /// Comma-separated expressions up to (and consuming) `close`.
    fn parse_arg_list(&mut self, close: TokenKind, close_msg: &str) -> Result<NodeId, Error> {
        let start = self.mark();
        let mut args = Vec::new();
        if !self.check(close) {
            loop {
                args.push(self.parse_expression()?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(close, close_msg)?;
        Ok(self.alloc_at(NodeKind::ArgList, "", args, start))
    }

    // ===== Names =====

    fn parse_ident(&mut self) -> Result<String, Error> {
        if self.check(TokenKind::Ident) {
            Ok(self.advance().text.clone())
        } else {
            Err(self.error("expected identifier"))
        }
    }

    /// `a`, `a.b`, `a.b.c`, joined with dots.
    fn parse_dotted_name(&mut self) -> Result<String, Error> {
        let mut name = self.parse_ident()?;
        while self.check(TokenKind::Dot) && self.peek(1) == TokenKind::Ident {
            self.advance();
            name.push('.');
            name.push_str(&self.parse_ident()?);
        }
        Ok(name)
    }
}

fn binary_precedence(kind: TokenKind) -> Option<u8> {
    match kind {
        TokenKind::Assign
        | TokenKind::PlusAssign
        | TokenKind::MinusAssign
        | TokenKind::StarAssign
        | TokenKind::SlashAssign => Some(1),
        TokenKind::AmpAmp | TokenKind::PipePipe => Some(2),
        TokenKind::EqEq
        | TokenKind::NotEq
        | TokenKind::LtEq
        | TokenKind::GtEq
        | TokenKind::Lt
        | TokenKind::Gt => Some(3),
        TokenKind::Minus
        | TokenKind::Plus
        | TokenKind::Shl
        | TokenKind::Shr
        | TokenKind::Caret
        | TokenKind::Amp
        | TokenKind::Percent => Some(4),
        TokenKind::Slash | TokenKind::Star => Some(5),
        _ => None,
    }
}

fn describe(token: &Token) -> String {
    if token.kind == TokenKind::Eof {
        "end of input".to_string()
    } else if token.text.is_empty() {
        format!("{:?}", token.kind)
    } else {
        token.text.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::Lexer;

    fn parse(source: &str) -> Ast {
        let tokens = Lexer::new(source).lex_all();
        Parser::new(&tokens).parse().expect("parse failed")
    }

    fn parse_err(source: &str) -> Error {
        let tokens = Lexer::new(source).lex_all();
        Parser::new(&tokens)
            .parse()
            .err()
            .expect("expected parse error")
    }

    #[test]
    fn test_parse_declaration() {
        let ast = parse("let x = 5;");
        let root = ast.root();
        assert_eq!(ast.get(root).kind, NodeKind::Script);
        let stmt = ast.child(root, 0).unwrap();
        assert_eq!(ast.get(stmt).kind, NodeKind::Statement);
        let decl = ast.child(stmt, 0).unwrap();
        assert_eq!(ast.get(decl).kind, NodeKind::Declaration);
        assert_eq!(ast.get(decl).text, "x");
    }

    #[test]
    fn test_parse_precedence_tree() {
        // 2 + 3 * 4 parses as 2 + (3 * 4).
        let ast = parse("let x = 2 + 3 * 4;");
        let stmt = ast.child(ast.root(), 0).unwrap();
        let decl = ast.child(stmt, 0).unwrap();
        let op = ast.child(decl, 0).unwrap();
        assert_eq!(ast.get(op).kind, NodeKind::OpExpr);
        let operator = ast.child(op, 1).unwrap();
        assert_eq!(ast.get(operator).text, "+");
        let rhs = ast.child(op, 2).unwrap();
        assert_eq!(ast.get(rhs).kind, NodeKind::OpExpr);
        assert_eq!(ast.get(ast.child(rhs, 1).unwrap()).text, "*");
    }

    #[test]
    fn test_parse_parenthesized() {
        // (2 + 3) * 4 puts the addition on the left of the multiply.
        let ast = parse("let x = (2 + 3) * 4;");
        let stmt = ast.child(ast.root(), 0).unwrap();
        let decl = ast.child(stmt, 0).unwrap();
        let op = ast.child(decl, 0).unwrap();
        assert_eq!(ast.get(ast.child(op, 1).unwrap()).text, "*");
        let lhs = ast.child(op, 0).unwrap();
        assert_eq!(ast.get(lhs).kind, NodeKind::OpExpr);
    }

    #[test]
    fn test_parse_function() {
        let ast = parse("fn add(a: int, b: int) -> int { return a + b; }");
        let func = ast.child(ast.root(), 0).unwrap();
        assert_eq!(ast.get(func).kind, NodeKind::Function);
        assert_eq!(ast.get(func).text, "add");
        let params = ast.child(func, 0).unwrap();
        assert_eq!(ast.children(params).len(), 2);
        assert!(ast.find_child(func, NodeKind::Compound).is_some());
    }

    #[test]
    fn test_parse_extern_function_has_no_body() {
        let ast = parse("extern fn host(a: int) -> int;");
        let func = ast.child(ast.root(), 0).unwrap();
        assert_eq!(ast.get(func).kind, NodeKind::Function);
        assert!(ast.find_child(func, NodeKind::Compound).is_none());
    }

    #[test]
    fn test_parse_reference_parameter() {
        let ast = parse("fn touch(l: &list) -> int { return 0; }");
        let func = ast.child(ast.root(), 0).unwrap();
        let params = ast.child(func, 0).unwrap();
        let param = ast.child(params, 0).unwrap();
        let ty = ast.child(param, 0).unwrap();
        assert_eq!(ast.get(ty).text, "&list");
    }

    #[test]
    fn test_parse_struct() {
        let ast = parse("struct Point { x: float; y: float = 1.0; };");
        let st = ast.child(ast.root(), 0).unwrap();
        assert_eq!(ast.get(st).kind, NodeKind::Struct);
        assert_eq!(ast.children(st).len(), 2);
        let with_default = ast.child(st, 1).unwrap();
        assert_eq!(ast.children(with_default).len(), 2);
    }

    #[test]
    fn test_parse_constructor() {
        let ast = parse("let p = Point { 1.0, 2.0 };");
        let stmt = ast.child(ast.root(), 0).unwrap();
        let decl = ast.child(stmt, 0).unwrap();
        let ctor = ast.child(decl, 0).unwrap();
        assert_eq!(ast.get(ctor).kind, NodeKind::ConstructorExpr);
        assert_eq!(ast.get(ctor).text, "Point");
    }

    #[test]
    fn test_parse_if_else_chain() {
        let ast = parse("if (a) { x = 1; } else if (b) { x = 2; } else { x = 3; }");
        let if_node = ast.child(ast.root(), 0).unwrap();
        assert_eq!(ast.get(if_node).kind, NodeKind::If);
        let else_node = ast.find_child(if_node, NodeKind::Else).unwrap();
        let inner = ast.child(ast.child(else_node, 0).unwrap(), 0).unwrap();
        assert_eq!(ast.get(inner).kind, NodeKind::If);
    }

    #[test]
    fn test_parse_for_shapes() {
        let ast = parse("for (let i = 0; i < 10; i += 1) { __print(i); }");
        let node = ast.child(ast.root(), 0).unwrap();
        assert_eq!(ast.get(node).kind, NodeKind::ForManual);
        assert_eq!(ast.children(node).len(), 4);

        let ast = parse("for (let x : items) { __print(x); }");
        let node = ast.child(ast.root(), 0).unwrap();
        assert_eq!(ast.get(node).kind, NodeKind::ForEach);
        assert_eq!(ast.get(node).text, "x");
    }

    #[test]
    fn test_parse_member_access() {
        let ast = parse("let v = p->x;");
        let stmt = ast.child(ast.root(), 0).unwrap();
        let decl = ast.child(stmt, 0).unwrap();
        let access = ast.child(decl, 0).unwrap();
        assert_eq!(ast.get(access).kind, NodeKind::MemberAccess);
        assert_eq!(ast.children(access).len(), 2);
    }

    #[test]
    fn test_parse_index_assignment() {
        let ast = parse("x[1] = 3;");
        let stmt = ast.child(ast.root(), 0).unwrap();
        let op = ast.child(stmt, 0).unwrap();
        assert_eq!(ast.get(op).kind, NodeKind::OpExpr);
        let lhs = ast.child(op, 0).unwrap();
        assert_eq!(ast.get(lhs).kind, NodeKind::IndexExpr);
    }

    #[test]
    fn test_parse_namespaced_call() {
        let ast = parse("std.io.print(5);");
        let stmt = ast.child(ast.root(), 0).unwrap();
        let call = ast.child(stmt, 0).unwrap();
        assert_eq!(ast.get(call).kind, NodeKind::CallExpr);
        assert_eq!(ast.get(call).text, "std.io.print");
    }

    #[test]
    fn test_parse_method_on_string_literal() {
        let ast = parse(r#"__print("Hello, {}".format(["pengu"]));"#);
        let stmt = ast.child(ast.root(), 0).unwrap();
        let print_call = ast.child(stmt, 0).unwrap();
        let args = ast.child(print_call, 0).unwrap();
        let method = ast.child(args, 0).unwrap();
        assert_eq!(ast.get(method).kind, NodeKind::MethodCall);
        assert_eq!(ast.get(method).text, "format");
        let receiver = ast.child(method, 0).unwrap();
        assert_eq!(ast.get(receiver).kind, NodeKind::StringLit);
    }

    #[test]
    fn test_parse_import() {
        let ast = parse("import std.io;");
        let stmt = ast.child(ast.root(), 0).unwrap();
        let import = ast.child(stmt, 0).unwrap();
        assert_eq!(ast.get(import).kind, NodeKind::Import);
        assert_eq!(ast.get(import).text, "std.io");
    }

    #[test]
    fn test_parse_namespace() {
        let ast = parse("namespace math { fn sq(x: int) -> int { return x * x; } }");
        let ns = ast.child(ast.root(), 0).unwrap();
        assert_eq!(ast.get(ns).kind, NodeKind::Namespace);
        assert_eq!(ast.get(ns).text, "math");
        assert_eq!(ast.children(ns).len(), 1);
    }

    #[test]
    fn test_parse_unary_chain() {
        let ast = parse("let x = -1;");
        let stmt = ast.child(ast.root(), 0).unwrap();
        let decl = ast.child(stmt, 0).unwrap();
        let unary = ast.child(decl, 0).unwrap();
        assert_eq!(ast.get(unary).kind, NodeKind::UnaryExpr);
        assert_eq!(ast.get(unary).text, "-");
    }

    #[test]
    fn test_parse_error_reports_position() {
        let err = parse_err("let x = ;");
        assert_eq!(err.kind, crate::errors::ErrorKind::Parse);
        assert_eq!(err.line, Some(1));
    }

    #[test]
    fn test_parse_missing_semicolon() {
        let err = parse_err("let x = 5");
        assert!(err.message.contains("';'"));
    }
}
