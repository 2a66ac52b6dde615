//! Recursive-descent parser (§6).
//!
//! Grounded on `original_source/arblang/parser/parser.cpp`'s statement
//! dispatch and precedence-climbing expression parser, rewritten against
//! this workspace's token stream and `arblang_parsed` tree types rather than
//! translated line-for-line.

use std::rc::Rc;

use arblang_diagnostic::{Error, Result};
use arblang_ir::Span;
use arblang_parsed::{
    BinaryOp, ParsedBind, ParsedConstant, ParsedEffect, ParsedEvolve, ParsedExport, ParsedExpr, ParsedFunction,
    ParsedFunctionArg, ParsedInitial, ParsedMechanism, ParsedMechanismKind, ParsedOnEvent, ParsedParameter,
    ParsedRecordAlias, ParsedState, ParsedType, ParsedUnit, QuantityName, TypeOp, UnaryOp, UnitOp,
};

use crate::token::{Token, TokenKind};

pub fn parse(tokens: &[Token]) -> Result<ParsedMechanism> {
    let mut p = Parser { tokens, pos: 0 };
    p.parse_mechanism()
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos].kind
    }

    fn span(&self) -> Span {
        self.tokens[self.pos].span
    }

    fn advance(&mut self) -> &Token {
        let tok = &self.tokens[self.pos];
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<Span> {
        let span = self.span();
        if self.peek() == kind {
            self.advance();
            Ok(span)
        } else {
            Err(Error::ParseError {
                message: format!("expected {kind:?}, found {:?}", self.peek()),
                span,
            })
        }
    }

    fn expect_ident(&mut self) -> Result<(Rc<str>, Span)> {
        let span = self.span();
        match self.peek().clone() {
            TokenKind::Ident(name) => {
                self.advance();
                Ok((name, span))
            }
            other => Err(Error::ParseError { message: format!("expected identifier, found {other:?}"), span }),
        }
    }

    // ---- mechanism ----

    fn parse_mechanism(&mut self) -> Result<ParsedMechanism> {
        let start = self.span();
        let kind = match self.peek() {
            TokenKind::Density => {
                self.advance();
                Some(ParsedMechanismKind::Density)
            }
            TokenKind::Point => {
                self.advance();
                Some(ParsedMechanismKind::Point)
            }
            TokenKind::Concentration => {
                self.advance();
                Some(ParsedMechanismKind::Concentration)
            }
            TokenKind::Junction => {
                self.advance();
                Some(ParsedMechanismKind::Junction)
            }
            _ => None,
        };
        self.expect(&TokenKind::Mechanism)?;
        let (name, _) = self.expect_ident()?;
        self.expect(&TokenKind::LBrace)?;

        let mut mech = ParsedMechanism { name, kind, ..ParsedMechanism::default() };
        while self.peek() != &TokenKind::RBrace {
            self.parse_declaration(&mut mech)?;
        }
        let end = self.expect(&TokenKind::RBrace)?;
        mech.span = start.to(end);
        Ok(mech)
    }

    fn parse_declaration(&mut self, mech: &mut ParsedMechanism) -> Result<()> {
        match self.peek().clone() {
            TokenKind::Record => {
                let alias = self.parse_record_alias()?;
                mech.record_aliases.push(alias);
            }
            TokenKind::Const => {
                let c = self.parse_constant()?;
                mech.constants.push(c);
            }
            TokenKind::Parameter => {
                let p = self.parse_parameter()?;
                mech.parameters.push(p);
            }
            TokenKind::State => {
                let s = self.parse_state()?;
                mech.states.push(s);
            }
            TokenKind::Bind => {
                let b = self.parse_bind()?;
                mech.bindings.push(b);
            }
            TokenKind::Function => {
                let f = self.parse_function()?;
                mech.functions.push(f);
            }
            TokenKind::Initial => {
                let i = self.parse_initial()?;
                mech.initializations.push(i);
            }
            TokenKind::Evolve => {
                let e = self.parse_evolve()?;
                mech.evolutions.push(e);
            }
            TokenKind::Effect => {
                let e = self.parse_effect()?;
                mech.effects.push(e);
            }
            TokenKind::Export => {
                let e = self.parse_export()?;
                mech.exports.push(e);
            }
            TokenKind::OnEvent => {
                let o = self.parse_on_event()?;
                mech.on_events.push(o);
            }
            other => {
                return Err(Error::ParseError {
                    message: format!("expected a declaration, found {other:?}"),
                    span: self.span(),
                })
            }
        }
        Ok(())
    }

    fn parse_record_alias(&mut self) -> Result<ParsedRecordAlias> {
        let start = self.expect(&TokenKind::Record)?;
        let (name, _) = self.expect_ident()?;
        self.expect(&TokenKind::LBrace)?;
        let mut fields = Vec::new();
        while self.peek() != &TokenKind::RBrace {
            let (fname, _) = self.expect_ident()?;
            self.expect(&TokenKind::Colon)?;
            let fty = self.parse_type()?;
            fields.push((fname, fty));
            if self.peek() == &TokenKind::Comma {
                self.advance();
            }
        }
        let end = self.expect(&TokenKind::RBrace)?;
        self.expect(&TokenKind::Semicolon)?;
        Ok(ParsedRecordAlias { name, fields, span: start.to(end) })
    }

    fn parse_opt_type(&mut self) -> Result<Option<ParsedType>> {
        if self.peek() == &TokenKind::Colon {
            self.advance();
            Ok(Some(self.parse_type()?))
        } else {
            Ok(None)
        }
    }

    fn parse_constant(&mut self) -> Result<ParsedConstant> {
        let start = self.expect(&TokenKind::Const)?;
        let (name, _) = self.expect_ident()?;
        let ty = self.parse_opt_type()?;
        self.expect(&TokenKind::Eq)?;
        let value = self.parse_expr()?;
        let end = self.expect(&TokenKind::Semicolon)?;
        Ok(ParsedConstant { name, ty, value, span: start.to(end) })
    }

    fn parse_parameter(&mut self) -> Result<ParsedParameter> {
        let start = self.expect(&TokenKind::Parameter)?;
        let (name, _) = self.expect_ident()?;
        let ty = self.parse_opt_type()?;
        self.expect(&TokenKind::Eq)?;
        let value = self.parse_expr()?;
        let end = self.expect(&TokenKind::Semicolon)?;
        Ok(ParsedParameter { name, ty, value, span: start.to(end) })
    }

    fn parse_state(&mut self) -> Result<ParsedState> {
        let start = self.expect(&TokenKind::State)?;
        let (name, _) = self.expect_ident()?;
        self.expect(&TokenKind::Colon)?;
        let ty = self.parse_type()?;
        let end = self.expect(&TokenKind::Semicolon)?;
        Ok(ParsedState { name, ty, span: start.to(end) })
    }

    fn parse_bind(&mut self) -> Result<ParsedBind> {
        let start = self.expect(&TokenKind::Bind)?;
        let (name, _) = self.expect_ident()?;
        self.expect(&TokenKind::Eq)?;
        let (bind, _) = self.expect_ident()?;
        let ion = if self.peek() == &TokenKind::LParen {
            self.advance();
            let (ion, _) = self.expect_ident()?;
            self.expect(&TokenKind::RParen)?;
            Some(ion)
        } else {
            None
        };
        let ty = self.parse_opt_type()?;
        let end = self.expect(&TokenKind::Semicolon)?;
        Ok(ParsedBind { name, bind, ion, ty, span: start.to(end) })
    }

    fn parse_function(&mut self) -> Result<ParsedFunction> {
        let start = self.expect(&TokenKind::Function)?;
        let (name, _) = self.expect_ident()?;
        self.expect(&TokenKind::LParen)?;
        let mut args = Vec::new();
        while self.peek() != &TokenKind::RParen {
            let (aname, _) = self.expect_ident()?;
            self.expect(&TokenKind::Colon)?;
            let aty = self.parse_type()?;
            args.push(ParsedFunctionArg { name: aname, ty: aty });
            if self.peek() == &TokenKind::Comma {
                self.advance();
            }
        }
        self.expect(&TokenKind::RParen)?;
        let ret = self.parse_opt_type()?;
        self.expect(&TokenKind::LBrace)?;
        let body = self.parse_expr()?;
        let end = self.expect(&TokenKind::RBrace)?;
        Ok(ParsedFunction { name, args, ret, body, span: start.to(end) })
    }

    fn parse_initial(&mut self) -> Result<ParsedInitial> {
        let start = self.expect(&TokenKind::Initial)?;
        let (name, _) = self.expect_ident()?;
        self.expect(&TokenKind::Eq)?;
        let value = self.parse_expr()?;
        let end = self.expect(&TokenKind::Semicolon)?;
        Ok(ParsedInitial { name, value, span: start.to(end) })
    }

    fn parse_evolve(&mut self) -> Result<ParsedEvolve> {
        let start = self.expect(&TokenKind::Evolve)?;
        let (base, _) = self.expect_ident()?;
        self.expect(&TokenKind::Prime)?;
        let name: Rc<str> = Rc::from(format!("{base}'"));
        self.expect(&TokenKind::Eq)?;
        let value = self.parse_expr()?;
        let end = self.expect(&TokenKind::Semicolon)?;
        Ok(ParsedEvolve { name, value, span: start.to(end) })
    }

    fn parse_effect(&mut self) -> Result<ParsedEffect> {
        let start = self.expect(&TokenKind::Effect)?;
        let (effect, _) = self.expect_ident()?;
        let ion = if self.peek() == &TokenKind::LParen {
            self.advance();
            let (ion, _) = self.expect_ident()?;
            self.expect(&TokenKind::RParen)?;
            Some(ion)
        } else {
            None
        };
        self.expect(&TokenKind::Eq)?;
        let value = self.parse_expr()?;
        let end = self.expect(&TokenKind::Semicolon)?;
        Ok(ParsedEffect { effect, ion, value, span: start.to(end) })
    }

    fn parse_export(&mut self) -> Result<ParsedExport> {
        let start = self.expect(&TokenKind::Export)?;
        let (name, _) = self.expect_ident()?;
        let end = self.expect(&TokenKind::Semicolon)?;
        Ok(ParsedExport { name, span: start.to(end) })
    }

    fn parse_on_event(&mut self) -> Result<ParsedOnEvent> {
        let start = self.expect(&TokenKind::OnEvent)?;
        self.expect(&TokenKind::LParen)?;
        let (name, _) = self.expect_ident()?;
        self.expect(&TokenKind::RParen)?;
        self.expect(&TokenKind::Eq)?;
        let value = self.parse_expr()?;
        let end = self.expect(&TokenKind::Semicolon)?;
        Ok(ParsedOnEvent { name, value, span: start.to(end) })
    }

    // ---- types ----

    fn parse_type(&mut self) -> Result<ParsedType> {
        self.parse_type_binary(0)
    }

    fn type_op_prec(op: TypeOp) -> u8 {
        match op {
            TypeOp::Mul | TypeOp::Div => 1,
            TypeOp::Pow => 2,
        }
    }

    fn peek_type_op(&self) -> Option<TypeOp> {
        match self.peek() {
            TokenKind::Star => Some(TypeOp::Mul),
            TokenKind::Slash => Some(TypeOp::Div),
            TokenKind::Caret => Some(TypeOp::Pow),
            _ => None,
        }
    }

    fn parse_type_binary(&mut self, min_prec: u8) -> Result<ParsedType> {
        let mut lhs = self.parse_type_atom()?;
        while let Some(op) = self.peek_type_op() {
            let prec = Self::type_op_prec(op);
            if prec < min_prec {
                break;
            }
            self.advance();
            let rhs = self.parse_type_binary(prec + 1)?;
            lhs = ParsedType::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_type_atom(&mut self) -> Result<ParsedType> {
        let span = self.span();
        match self.peek().clone() {
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_type()?;
                self.expect(&TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::Bool => {
                self.advance();
                Ok(ParsedType::Boolean)
            }
            TokenKind::Int(v) => {
                self.advance();
                Ok(ParsedType::Integer(v as i32))
            }
            TokenKind::Ident(name) => {
                self.advance();
                if let Some(q) = quantity_name(&name) {
                    Ok(ParsedType::Quantity(q))
                } else {
                    Ok(ParsedType::RecordAlias(name))
                }
            }
            other => Err(Error::ParseError { message: format!("expected a type, found {other:?}"), span }),
        }
    }

    // ---- units ----

    fn parse_unit_suffix(&mut self) -> Result<ParsedUnit> {
        if self.peek() != &TokenKind::LBracket {
            return Ok(ParsedUnit::None);
        }
        self.advance();
        let unit = self.parse_unit_binary(0)?;
        self.expect(&TokenKind::RBracket)?;
        Ok(unit)
    }

    fn unit_op_prec(op: UnitOp) -> u8 {
        match op {
            UnitOp::Mul | UnitOp::Div => 1,
            UnitOp::Pow => 2,
        }
    }

    fn peek_unit_op(&self) -> Option<UnitOp> {
        match self.peek() {
            TokenKind::Star => Some(UnitOp::Mul),
            TokenKind::Slash => Some(UnitOp::Div),
            TokenKind::Caret => Some(UnitOp::Pow),
            _ => None,
        }
    }

    fn parse_unit_binary(&mut self, min_prec: u8) -> Result<ParsedUnit> {
        let mut lhs = self.parse_unit_atom()?;
        while let Some(op) = self.peek_unit_op() {
            let prec = Self::unit_op_prec(op);
            if prec < min_prec {
                break;
            }
            self.advance();
            let span = self.span();
            let rhs = self.parse_unit_binary(prec + 1)?;
            lhs = ParsedUnit::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs), span };
        }
        Ok(lhs)
    }

    fn parse_unit_atom(&mut self) -> Result<ParsedUnit> {
        let span = self.span();
        match self.peek().clone() {
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_unit_binary(0)?;
                self.expect(&TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::Int(v) => {
                self.advance();
                Ok(ParsedUnit::Integer { value: v as i32, span })
            }
            TokenKind::Ident(name) => {
                self.advance();
                ParsedUnit::parse_simple(&name, span)
            }
            other => Err(Error::ParseError { message: format!("expected a unit, found {other:?}"), span }),
        }
    }

    // ---- expressions ----

    fn parse_expr(&mut self) -> Result<ParsedExpr> {
        self.parse_binary(0)
    }

    fn peek_binary_op(&self) -> Option<BinaryOp> {
        match self.peek() {
            TokenKind::OrOr => Some(BinaryOp::Or),
            TokenKind::AndAnd => Some(BinaryOp::And),
            TokenKind::EqEq => Some(BinaryOp::Eq),
            TokenKind::Ne => Some(BinaryOp::Ne),
            TokenKind::Lt => Some(BinaryOp::Lt),
            TokenKind::Le => Some(BinaryOp::Le),
            TokenKind::Gt => Some(BinaryOp::Gt),
            TokenKind::Ge => Some(BinaryOp::Ge),
            TokenKind::Plus => Some(BinaryOp::Add),
            TokenKind::Minus => Some(BinaryOp::Sub),
            TokenKind::Star => Some(BinaryOp::Mul),
            TokenKind::Slash => Some(BinaryOp::Div),
            TokenKind::Caret => Some(BinaryOp::Pow),
            _ => None,
        }
    }

    fn binary_prec(op: BinaryOp) -> u8 {
        match op {
            BinaryOp::Or => 0,
            BinaryOp::And => 1,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => 2,
            BinaryOp::Add | BinaryOp::Sub => 3,
            BinaryOp::Mul | BinaryOp::Div => 4,
            BinaryOp::Pow => 5,
            BinaryOp::Min | BinaryOp::Max | BinaryOp::Dot => 6,
        }
    }

    fn parse_binary(&mut self, min_prec: u8) -> Result<ParsedExpr> {
        let mut lhs = self.parse_postfix()?;
        while let Some(op) = self.peek_binary_op() {
            let prec = Self::binary_prec(op);
            if prec < min_prec {
                break;
            }
            self.advance();
            // `^` (pow) is right-associative; everything else is left-associative.
            let next_min = if op == BinaryOp::Pow { prec } else { prec + 1 };
            let rhs = self.parse_binary(next_min)?;
            let span = lhs.span().to(rhs.span());
            lhs = ParsedExpr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs), span };
        }
        Ok(lhs)
    }

    fn parse_postfix(&mut self) -> Result<ParsedExpr> {
        let mut expr = self.parse_unary()?;
        while self.peek() == &TokenKind::Dot {
            self.advance();
            let (field, fspan) = self.expect_ident()?;
            let span = expr.span().to(fspan);
            expr = ParsedExpr::Binary {
                op: BinaryOp::Dot,
                lhs: Box::new(expr),
                rhs: Box::new(ParsedExpr::Identifier { name: field, span: fspan }),
                span,
            };
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> Result<ParsedExpr> {
        let span = self.span();
        match self.peek().clone() {
            TokenKind::Minus => {
                self.advance();
                // Field access binds tighter than a prefix operator: `-s.m` is
                // `-(s.m)`, not `(-s).m`. `parse_postfix` folds any trailing
                // `.field`s into the operand before we wrap it.
                let operand = self.parse_postfix()?;
                let full = span.to(operand.span());
                Ok(ParsedExpr::Unary { op: UnaryOp::Neg, operand: Box::new(operand), span: full })
            }
            TokenKind::Bang => {
                self.advance();
                let operand = self.parse_postfix()?;
                let full = span.to(operand.span());
                Ok(ParsedExpr::Unary { op: UnaryOp::Not, operand: Box::new(operand), span: full })
            }
            TokenKind::Exp | TokenKind::Log | TokenKind::Cos | TokenKind::Sin | TokenKind::Abs | TokenKind::Exprelr => {
                let op = match self.peek() {
                    TokenKind::Exp => UnaryOp::Exp,
                    TokenKind::Log => UnaryOp::Log,
                    TokenKind::Cos => UnaryOp::Cos,
                    TokenKind::Sin => UnaryOp::Sin,
                    TokenKind::Abs => UnaryOp::Abs,
                    _ => UnaryOp::Exprelr,
                };
                self.advance();
                self.expect(&TokenKind::LParen)?;
                let operand = self.parse_expr()?;
                let end = self.expect(&TokenKind::RParen)?;
                Ok(ParsedExpr::Unary { op, operand: Box::new(operand), span: span.to(end) })
            }
            TokenKind::Min | TokenKind::Max => {
                let op = if self.peek() == &TokenKind::Min { BinaryOp::Min } else { BinaryOp::Max };
                self.advance();
                self.expect(&TokenKind::LParen)?;
                let lhs = self.parse_expr()?;
                self.expect(&TokenKind::Comma)?;
                let rhs = self.parse_expr()?;
                let end = self.expect(&TokenKind::RParen)?;
                Ok(ParsedExpr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs), span: span.to(end) })
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<ParsedExpr> {
        let span = self.span();
        match self.peek().clone() {
            TokenKind::Int(value) => {
                self.advance();
                let unit = self.parse_unit_suffix()?;
                let end = self.span_of_last();
                Ok(ParsedExpr::Int { value, unit, span: span.to(end) })
            }
            TokenKind::Float(value) => {
                self.advance();
                let unit = self.parse_unit_suffix()?;
                let end = self.span_of_last();
                Ok(ParsedExpr::Float { value, unit, span: span.to(end) })
            }
            TokenKind::True => {
                self.advance();
                Ok(ParsedExpr::Int { value: 1, unit: ParsedUnit::None, span })
            }
            TokenKind::False => {
                self.advance();
                Ok(ParsedExpr::Int { value: 0, unit: ParsedUnit::None, span })
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(&TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::LBrace => self.parse_object(None, span),
            TokenKind::Let => {
                self.advance();
                let (name, _) = self.expect_ident()?;
                self.expect(&TokenKind::Eq)?;
                let value = self.parse_expr()?;
                self.expect(&TokenKind::Semicolon)?;
                let body = self.parse_expr()?;
                let full = span.to(body.span());
                Ok(ParsedExpr::Let { name, value: Box::new(value), body: Box::new(body), span: full })
            }
            TokenKind::With => {
                self.advance();
                let value = self.parse_expr()?;
                self.expect(&TokenKind::LBrace)?;
                let body = self.parse_expr()?;
                let end = self.expect(&TokenKind::RBrace)?;
                Ok(ParsedExpr::With { value: Box::new(value), body: Box::new(body), span: span.to(end) })
            }
            TokenKind::If => {
                self.advance();
                let cond = self.parse_expr()?;
                self.expect(&TokenKind::Then)?;
                let if_true = self.parse_expr()?;
                self.expect(&TokenKind::Else)?;
                let if_false = self.parse_expr()?;
                let full = span.to(if_false.span());
                Ok(ParsedExpr::Conditional {
                    cond: Box::new(cond),
                    if_true: Box::new(if_true),
                    if_false: Box::new(if_false),
                    span: full,
                })
            }
            TokenKind::Ident(name) => {
                self.advance();
                match self.peek() {
                    TokenKind::LParen => {
                        self.advance();
                        let mut args = Vec::new();
                        while self.peek() != &TokenKind::RParen {
                            args.push(self.parse_expr()?);
                            if self.peek() == &TokenKind::Comma {
                                self.advance();
                            }
                        }
                        let end = self.expect(&TokenKind::RParen)?;
                        Ok(ParsedExpr::Call { function: name, args, span: span.to(end) })
                    }
                    TokenKind::LBrace => self.parse_object(Some(name), span),
                    _ => Ok(ParsedExpr::Identifier { name, span }),
                }
            }
            other => Err(Error::ParseError { message: format!("unexpected token {other:?} in expression"), span }),
        }
    }

    fn span_of_last(&self) -> Span {
        self.tokens[self.pos.saturating_sub(1)].span
    }

    fn parse_object(&mut self, record_name: Option<Rc<str>>, span: Span) -> Result<ParsedExpr> {
        self.expect(&TokenKind::LBrace)?;
        let mut fields = Vec::new();
        while self.peek() != &TokenKind::RBrace {
            let (fname, _) = self.expect_ident()?;
            self.expect(&TokenKind::Eq)?;
            let value = self.parse_expr()?;
            fields.push((fname, value));
            if self.peek() == &TokenKind::Comma {
                self.advance();
            }
        }
        let end = self.expect(&TokenKind::RBrace)?;
        Ok(ParsedExpr::Object { record_name, fields, span: span.to(end) })
    }
}

fn quantity_name(s: &str) -> Option<QuantityName> {
    Some(match s {
        "real" => QuantityName::Real,
        "length" => QuantityName::Length,
        "mass" => QuantityName::Mass,
        "time" => QuantityName::Time,
        "current" => QuantityName::Current,
        "amount" => QuantityName::Amount,
        "temperature" => QuantityName::Temperature,
        "charge" => QuantityName::Charge,
        "frequency" => QuantityName::Frequency,
        "voltage" => QuantityName::Voltage,
        "resistance" => QuantityName::Resistance,
        "conductance" => QuantityName::Conductance,
        "capacitance" => QuantityName::Capacitance,
        "force" => QuantityName::Force,
        "energy" => QuantityName::Energy,
        "power" => QuantityName::Power,
        "area" => QuantityName::Area,
        "volume" => QuantityName::Volume,
        "concentration" => QuantityName::Concentration,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;

    fn parse_str(src: &str) -> Result<ParsedMechanism> {
        let toks = lex(src)?;
        parse(&toks)
    }

    #[test]
    fn parses_minimal_density_mechanism() {
        let mech = parse_str(
            r"
            density mechanism pas {
                parameter g: conductance = 0.001 [S/cm^2];
                bind v = membrane_potential;
                effect current_density = g * v;
            }
            ",
        )
        .unwrap();
        assert_eq!(&*mech.name, "pas");
        assert_eq!(mech.kind, Some(ParsedMechanismKind::Density));
        assert_eq!(mech.parameters.len(), 1);
        assert_eq!(mech.bindings.len(), 1);
        assert_eq!(mech.effects.len(), 1);
    }

    #[test]
    fn parses_let_and_conditional_and_record() {
        let mech = parse_str(
            r"
            point mechanism expsyn {
                record gate { m: real, h: real };
                state s: gate;
                initial s = gate{m=0, h=1};
                evolve s' = with s { gate{m=-m, h=-h} };
                function clamp(x: real): real {
                    if x < 0 then 0 else x
                }
            }
            ",
        )
        .unwrap();
        assert_eq!(mech.record_aliases.len(), 1);
        assert_eq!(mech.functions.len(), 1);
        assert_eq!(mech.evolutions.len(), 1);
    }

    #[test]
    fn parses_ode_kinetics_with_functions_and_pow() {
        let mech = parse_str(
            r"
            density mechanism hh {
                parameter gbar: conductance = 0.12 [S/cm^2];
                state m: real;
                bind v = membrane_potential;
                function alpha_m(v: voltage): frequency {
                    0.1 * exprelr(-(v + 40) / 10)
                }
                initial m = 0.05;
                evolve m' = (alpha_m(v) - m) / 1;
                effect current_density = gbar * m^3;
            }
            ",
        )
        .unwrap();
        assert_eq!(mech.functions.len(), 1);
        assert_eq!(mech.evolutions.len(), 1);
    }

    #[test]
    fn reports_parse_error_on_garbage() {
        assert!(parse_str("density mechanism x { parameter }").is_err());
    }

    #[test]
    fn unary_minus_binds_looser_than_field_access() {
        let mech = parse_str(
            r"
            density mechanism neg_field {
                record gate { m: real };
                parameter s: gate;
                effect current_density = -s.m;
            }
            ",
        )
        .unwrap();
        let body = &mech.effects[0].value;
        match body {
            ParsedExpr::Unary { op: UnaryOp::Neg, operand, .. } => match operand.as_ref() {
                ParsedExpr::Binary { op: BinaryOp::Dot, lhs, rhs, .. } => {
                    assert!(matches!(lhs.as_ref(), ParsedExpr::Identifier { name, .. } if &**name == "s"));
                    assert!(matches!(rhs.as_ref(), ParsedExpr::Identifier { name, .. } if &**name == "m"));
                }
                other => panic!("expected `-` to wrap a field access, got {other:?}"),
            },
            other => panic!("expected a unary negation at the top, got {other:?}"),
        }
    }

    #[test]
    fn unary_not_binds_looser_than_field_access() {
        let mech = parse_str(
            r"
            density mechanism not_field {
                record gate { open: real };
                parameter s: gate;
                effect current_density = if !s.open then 1 else 0;
            }
            ",
        )
        .unwrap();
        let ParsedExpr::Conditional { cond, .. } = &mech.effects[0].value else {
            panic!("expected a conditional effect body");
        };
        match cond.as_ref() {
            ParsedExpr::Unary { op: UnaryOp::Not, operand, .. } => {
                assert!(matches!(operand.as_ref(), ParsedExpr::Binary { op: BinaryOp::Dot, .. }));
            }
            other => panic!("expected `!` to wrap a field access, got {other:?}"),
        }
    }
}
