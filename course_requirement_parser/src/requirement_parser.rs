//! Parser for prerequisite expressions.
//!
//! ```text
//! expr               := parenthesized_only | comma_list | and_list | or_list
//! parenthesized_only := '(' expr ')'
//! comma_list         := course !(and | or) (separator course)+
//! and_list           := course (and course)*
//! or_list            := course (or course)*
//! course             := course_code | '(' expr ')'
//! ```
//!
//! Alternatives are tried in that order. An alternative only wins when the
//! text it consumed is followed by the end of the enclosing expression: the
//! end of the input at the top level, a closing parenthesis inside a group.
//! There is no precedence between `and` and `or`, so mixing them at one level
//! needs parentheses.
//!
//! Every alternative starts by parsing the same `course`, so the outcome of
//! each parenthesized group is cached by offset and parsing stays linear.
//! Groups nest at most [`MAX_NESTING`] deep.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt::{self, Write};

use thiserror::Error;
use tracing::debug;

use crate::requirement::{CourseCode, Requirement};

pub(crate) mod patterns;

use patterns::Connective;

/// How many parenthesized groups may enclose one another.
pub const MAX_NESTING: usize = 64;

/// A grammar rule or terminal, as named in parse errors.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Rule {
    Expr,
    ParenthesizedOnly,
    CommaList,
    AndList,
    OrList,
    CourseCode,
    CloseParen,
    Separator,
    And,
    Or,
    EndOfInput,
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Rule::Expr => "expr",
            Rule::ParenthesizedOnly => "parenthesized_only",
            Rule::CommaList => "comma_list",
            Rule::AndList => "and_list",
            Rule::OrList => "or_list",
            Rule::CourseCode => "course_code",
            Rule::CloseParen => "')'",
            Rule::Separator => "separator",
            Rule::And => "and",
            Rule::Or => "or",
            Rule::EndOfInput => "end_of_input",
        };
        f.write_str(name)
    }
}

impl From<Connective> for Rule {
    fn from(connective: Connective) -> Rule {
        match connective {
            Connective::And => Rule::And,
            Connective::Or => Rule::Or,
            Connective::Separator => Rule::Separator,
        }
    }
}

/// The furthest point any alternative reached before failing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ParseError {
    /// Byte offset into the input.
    pub offset: usize,
    /// The top-level alternative that got furthest.
    pub rule: Rule,
    pub expected: Rule,
    pub message: String,
}

impl ParseError {
    fn empty() -> ParseError {
        ParseError {
            offset: 0,
            rule: Rule::Expr,
            expected: Rule::Expr,
            message: "empty prerequisite expression".to_owned(),
        }
    }

    fn too_deep(offset: usize) -> ParseError {
        ParseError {
            offset,
            rule: Rule::Expr,
            expected: Rule::CourseCode,
            message: format!(
                "parentheses nested more than {MAX_NESTING} deep at offset {offset}"
            ),
        }
    }

    fn from_failure(input: &str, failure: Failure) -> ParseError {
        let mut message = format!("expected {} at offset {}", failure.expected, failure.offset);
        if failure.expected != Rule::CourseCode {
            if let Some(found) = patterns::leading_connective(&input[failure.offset..]) {
                _ = write!(message, ", found {found} (mixed connectives need parentheses)");
            }
        }
        ParseError {
            offset: failure.offset,
            rule: failure.rule,
            expected: failure.expected,
            message,
        }
    }
}

pub fn parse_requirement(s: &str) -> Result<Requirement, ParseError> {
    if s.trim().is_empty() {
        return Err(ParseError::empty());
    }

    let state = ParseState::default();
    let mut parser = Parser {
        input: s,
        pos: 0,
        rule: Rule::Expr,
        depth: 0,
        state: &state,
    };
    parser.skip_whitespace();
    if let Some(requirement) = parser.parse_expr(End::Input) {
        return Ok(requirement);
    }

    if let Some(offset) = state.too_deep.get() {
        debug!(offset, "prerequisite expression nested too deeply");
        return Err(ParseError::too_deep(offset));
    }
    let failure = state.furthest.get().unwrap_or(Failure {
        offset: 0,
        rule: Rule::Expr,
        expected: Rule::Expr,
    });
    let error = ParseError::from_failure(s, failure);
    debug!(
        offset = error.offset,
        rule = %error.rule,
        expected = %error.expected,
        "prerequisite expression did not parse"
    );
    Err(error)
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct Failure {
    offset: usize,
    rule: Rule,
    expected: Rule,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum End {
    Input,
    CloseParen,
}

/// Outcome of parsing a group from just after its `(`, along with the
/// furthest failure seen inside it.
#[derive(Debug, Clone)]
struct Group {
    parsed: Option<(Requirement, usize)>,
    furthest: Option<(usize, Rule)>,
}

/// Shared by every fork of one parse.
#[derive(Default)]
struct ParseState {
    furthest: Cell<Option<Failure>>,
    /// Offset of the first `(` that went past `MAX_NESTING`.
    too_deep: Cell<Option<usize>>,
    groups: RefCell<HashMap<usize, Group>>,
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    rule: Rule,
    depth: usize,
    state: &'a ParseState,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn fork(&self) -> Parser<'a> {
        Parser {
            input: self.input,
            pos: self.pos,
            rule: self.rule,
            depth: self.depth,
            state: self.state,
        }
    }

    fn advance_to(&mut self, fork: &Parser<'a>) {
        self.pos = fork.pos
    }

    /// Records a failure to match `expected` here. Later failures at the same
    /// offset replace earlier ones, so the enclosing expression's terminator
    /// is what gets reported.
    fn expected(&self, expected: Rule) {
        self.expected_at(self.pos, expected);
    }

    fn expected_at(&self, offset: usize, expected: Rule) {
        if matches!(self.state.furthest.get(), Some(failure) if failure.offset > offset) {
            return;
        }
        self.state.furthest.set(Some(Failure {
            offset,
            rule: self.rule,
            expected,
        }));
    }

    fn eat_char(&mut self, c: char) -> bool {
        if self.rest().starts_with(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn eat_connective(&mut self, connective: Connective) -> bool {
        match patterns::connective_len(self.rest(), connective) {
            Some(len) => {
                self.pos += len;
                true
            }
            None => {
                self.expected(connective.into());
                false
            }
        }
    }

    fn at_end(&self, end: End) -> bool {
        let rest = self.rest().trim_start();
        let (found, rule) = match end {
            End::Input => (rest.is_empty(), Rule::EndOfInput),
            End::CloseParen => (rest.starts_with(')'), Rule::CloseParen),
        };
        if !found {
            self.expected(rule);
        }
        found
    }
}

impl<'a> Parser<'a> {
    fn parse_expr(&mut self, end: End) -> Option<Requirement> {
        self.run_parsers(
            end,
            &[
                (Rule::ParenthesizedOnly, Parser::parse_parenthesized_only),
                (Rule::CommaList, Parser::parse_comma_list),
                (Rule::AndList, Parser::parse_and_list),
                (Rule::OrList, Parser::parse_or_list),
            ],
        )
    }

    fn run_parsers(
        &mut self,
        end: End,
        parsers: &[(Rule, fn(&mut Parser<'a>) -> Option<Requirement>)],
    ) -> Option<Requirement> {
        for &(rule, parser) in parsers {
            let mut fork = self.fork();
            if end == End::Input {
                fork.rule = rule;
            }
            if let Some(req) = parser(&mut fork) {
                if fork.at_end(end) {
                    self.advance_to(&fork);
                    return Some(req);
                }
            }
        }
        None
    }

    fn parse_parenthesized_only(&mut self) -> Option<Requirement> {
        if !self.eat_char('(') {
            return None;
        }
        self.parse_group_rest()
    }

    /// Everything after the opening parenthesis of a group.
    fn parse_group_rest(&mut self) -> Option<Requirement> {
        if self.depth >= MAX_NESTING {
            if self.state.too_deep.get().is_none() {
                self.state.too_deep.set(Some(self.pos - 1));
            }
            return None;
        }

        let start = self.pos;
        let cached = self.state.groups.borrow().get(&start).cloned();
        let group = match cached {
            Some(group) => group,
            None => {
                let group = self.parse_group_uncached();
                self.state.groups.borrow_mut().insert(start, group.clone());
                group
            }
        };
        // Replaying only the group's furthest failure leaves the shared state
        // as if every failure inside it had been recorded again.
        if let Some((offset, expected)) = group.furthest {
            self.expected_at(offset, expected);
        }
        let (requirement, end) = group.parsed?;
        self.pos = end;
        Some(requirement)
    }

    fn parse_group_uncached(&self) -> Group {
        let outer = self.state.furthest.take();
        let mut fork = self.fork();
        fork.depth += 1;
        let parsed = fork.parse_group_body().map(|requirement| (requirement, fork.pos));
        let furthest = self.state.furthest.replace(outer);
        Group {
            parsed,
            furthest: furthest.map(|failure| (failure.offset, failure.expected)),
        }
    }

    fn parse_group_body(&mut self) -> Option<Requirement> {
        self.skip_whitespace();
        let inner = self.parse_expr(End::CloseParen)?;
        self.skip_whitespace();
        if !self.eat_char(')') {
            self.expected(Rule::CloseParen);
            return None;
        }
        Some(inner)
    }

    fn parse_comma_list(&mut self) -> Option<Requirement> {
        let first = self.parse_course()?;
        if patterns::at_keyword(self.rest()) {
            return None;
        }
        let children = self.parse_list_tail(first, Connective::Separator);
        if children.len() < 2 {
            return None;
        }
        Some(Requirement::Or {
            children,
            ambiguous: true,
        })
    }

    fn parse_and_list(&mut self) -> Option<Requirement> {
        let first = self.parse_course()?;
        let mut children = self.parse_list_tail(first, Connective::And);
        if children.len() == 1 {
            return children.pop();
        }
        Some(Requirement::all(children))
    }

    fn parse_or_list(&mut self) -> Option<Requirement> {
        let first = self.parse_course()?;
        let mut children = self.parse_list_tail(first, Connective::Or);
        if children.len() == 1 {
            return children.pop();
        }
        Some(Requirement::any(children))
    }

    fn parse_list_tail(&mut self, first: Requirement, connective: Connective) -> Vec<Requirement> {
        let mut children = vec![first];
        loop {
            let mut fork = self.fork();
            if !fork.eat_connective(connective) {
                break;
            }
            let Some(next) = fork.parse_course() else {
                break;
            };
            children.push(next);
            self.advance_to(&fork);
        }
        children
    }

    fn parse_course(&mut self) -> Option<Requirement> {
        if let Some(len) = patterns::course_code_len(self.rest()) {
            let code = CourseCode::new_unchecked(&self.rest()[..len]);
            self.pos += len;
            return Some(Requirement::course(code));
        }
        if self.eat_char('(') {
            return self.parse_group_rest();
        }
        self.expected(Rule::CourseCode);
        None
    }
}
