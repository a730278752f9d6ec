//! # Textual expression grammar
//!
//! A scannerless recursive-descent parser over the input characters.
//! There is no operator precedence: `a = 1 AND b` reads as `a = (1 AND b)`,
//! expressions are nested to the right and authors parenthesize.
//!
//! ```text
//! expression := term (binary-operator expression)?
//! term       := number postfix* | prefix-operator term | primary postfix*
//! primary    := case | #timestamp# | X'hex' | 'string' | true | false | null
//!             | name(expression, ...) | :parameter | path | (expression, ...)
//! ```
//!
//! Each rule returns `Ok(None)` when it does not match and leaves the position
//! where it found it. Errors are reserved for input that started a rule and
//! cannot complete it (an unterminated string, a malformed timestamp).

use chrono::{
    DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone,
};

use super::{
    operators::{OperatorEntry, Operators},
    Error, Result,
};
use crate::{
    data_type::Value,
    expr::{Expr, Identifier, Position},
};

/// The longest dotted path (`datasource.namespace.table.column`)
const MAX_PATH_SEGMENTS: usize = 4;
/// The length of the input excerpt reported in parse errors
const FRAGMENT_LENGTH: usize = 24;

pub fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '@' || c == '#'
}

pub fn is_identifier_part(c: char) -> bool {
    is_identifier_start(c) || c.is_ascii_digit()
}

fn is_parameter_part(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_timestamp_part(c: char) -> bool {
    c.is_ascii_digit() || matches!(c, '-' | ':' | '.' | 'T' | 't' | ' ' | 'Z' | 'z' | '+')
}

/// Parse a complete textual expression
pub fn parse(input: &str, operators: &Operators) -> Result<Expr> {
    let mut parser = Parser::new(input, operators);
    parser.skip_whitespace();
    let expr = parser.expression()?;
    parser.skip_whitespace();
    match expr {
        Some(expr) if parser.is_done() => Ok(expr),
        _ => Err(parser.unexpected()),
    }
}

/// The parser state
pub struct Parser<'a> {
    input: &'a str,
    position: usize,
    operators: &'a Operators,
    unary_tokens: Vec<&'a str>,
    binary_tokens: Vec<&'a str>,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str, operators: &'a Operators) -> Parser<'a> {
        Parser {
            input,
            position: 0,
            operators,
            unary_tokens: operators.unary_tokens(),
            binary_tokens: operators.binary_tokens(),
        }
    }

    fn rest(&self) -> &'a str {
        let input = self.input;
        &input[self.position..]
    }

    fn is_done(&self) -> bool {
        self.position >= self.input.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// A parse error pointing at the current position
    fn unexpected(&self) -> Error {
        self.error_at(self.position)
    }

    fn error_at(&self, offset: usize) -> Error {
        let fragment: String = self.input[offset..].chars().take(FRAGMENT_LENGTH).collect();
        Error::parse(fragment, offset)
    }

    /// Run `rule` and rewind if it does not match
    fn attempt<T, F: FnOnce(&mut Self) -> Result<Option<T>>>(&mut self, rule: F) -> Result<Option<T>> {
        let start = self.position;
        let result = rule(self)?;
        if result.is_none() {
            self.position = start;
        }
        Ok(result)
    }

    /// Consume whitespace, returning the number of characters skipped
    fn skip_whitespace(&mut self) -> usize {
        self.take_while(char::is_whitespace).chars().count()
    }

    /// Consume `c` if it is next
    fn next_is(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.position += c.len_utf8();
            true
        } else {
            false
        }
    }

    /// Consume characters while they satisfy `predicate`
    fn take_while<P: Fn(char) -> bool>(&mut self, predicate: P) -> &'a str {
        let input = self.input;
        let start = self.position;
        let length: usize = self
            .rest()
            .chars()
            .take_while(|c| predicate(*c))
            .map(char::len_utf8)
            .sum();
        self.position += length;
        &input[start..self.position]
    }

    /// Where `token` would end if it is next, case-insensitively.
    /// A space in the token stands for any non empty run of whitespace.
    fn match_token(&self, token: &str) -> Option<usize> {
        let mut rest = self.rest().char_indices().peekable();
        let mut end = 0;
        for expected in token.chars() {
            if expected == ' ' {
                let mut matched = false;
                while let Some((_, c)) = rest.peek() {
                    if !c.is_whitespace() {
                        break;
                    }
                    matched = true;
                    let (index, c) = rest.next()?;
                    end = index + c.len_utf8();
                }
                if !matched {
                    return None;
                }
            } else {
                let (index, c) = rest.next()?;
                if !c.eq_ignore_ascii_case(&expected) {
                    return None;
                }
                end = index + c.len_utf8();
            }
        }
        Some(self.position + end)
    }

    /// Whether a token ending at `end` respects its boundaries
    fn fits(&self, token: &str, end: usize, right: bool) -> bool {
        let next = self.input[end..].chars().next();
        let word_ends = !token.ends_with(|c: char| c.is_ascii_alphabetic())
            || !next.map_or(false, is_identifier_part);
        let spaced = !right || next.map_or(true, char::is_whitespace);
        word_ends && spaced
    }

    /// Consume the keyword `word` if it is next as a whole word
    fn keyword(&mut self, word: &str) -> bool {
        match self.match_token(word) {
            Some(end) if self.fits(word, end, false) => {
                self.position = end;
                true
            }
            _ => false,
        }
    }

    pub fn expression(&mut self) -> Result<Option<Expr>> {
        let Some(left) = self.term()? else {
            return Ok(None);
        };
        let right = self.attempt(|parser| {
            let Some(entry) = parser.binary_operator() else {
                return Ok(None);
            };
            parser.skip_whitespace();
            Ok(parser.expression()?.map(|right| (entry, right)))
        })?;
        match right {
            Some((entry, right)) => Ok(Some((entry.constructor)(vec![left, right])?)),
            None => Ok(Some(left)),
        }
    }

    fn binary_operator(&mut self) -> Option<OperatorEntry> {
        let start = self.position;
        let spaced = self.skip_whitespace() > 0;
        for token in self.binary_tokens.clone() {
            let Some(entry) = self.operators.binary(token).copied() else {
                continue;
            };
            match self.match_token(token) {
                Some(end)
                    if (spaced || !entry.boundary.left)
                        && self.fits(token, end, entry.boundary.right) =>
                {
                    self.position = end;
                    return Some(entry);
                }
                _ => {}
            }
        }
        self.position = start;
        None
    }

    fn term(&mut self) -> Result<Option<Expr>> {
        if let Some(number) = self.attempt(Parser::number)? {
            return self.postfix(number).map(Some);
        }
        if let Some(expr) = self.attempt(Parser::prefix)? {
            return Ok(Some(expr));
        }
        match self.primary()? {
            Some(primary) => self.postfix(primary).map(Some),
            None => Ok(None),
        }
    }

    fn prefix(&mut self) -> Result<Option<Expr>> {
        for token in self.unary_tokens.clone() {
            let Some(entry) = self.operators.unary(token).copied() else {
                continue;
            };
            if entry.position != Position::Prefix {
                continue;
            }
            let Some(end) = self.match_token(token) else {
                continue;
            };
            if !self.fits(token, end, entry.boundary.right) {
                continue;
            }
            let start = self.position;
            self.position = end;
            self.skip_whitespace();
            if let Some(operand) = self.term()? {
                return Ok(Some((entry.constructor)(vec![operand])?));
            }
            self.position = start;
        }
        Ok(None)
    }

    /// Apply the postfix operators following `expr`
    fn postfix(&mut self, mut expr: Expr) -> Result<Expr> {
        loop {
            let applied = self.attempt(|parser| {
                let spaced = parser.skip_whitespace() > 0;
                for token in parser.unary_tokens.clone() {
                    let Some(entry) = parser.operators.unary(token).copied() else {
                        continue;
                    };
                    if entry.position != Position::Postfix || (entry.boundary.left && !spaced) {
                        continue;
                    }
                    if let Some(end) = parser.match_token(token) {
                        if parser.fits(token, end, entry.boundary.right) {
                            parser.position = end;
                            return Ok(Some(entry.constructor));
                        }
                    }
                }
                Ok(None)
            })?;
            match applied {
                Some(constructor) => expr = constructor(vec![expr])?,
                None => return Ok(expr),
            }
        }
    }

    fn primary(&mut self) -> Result<Option<Expr>> {
        let rules: [fn(&mut Self) -> Result<Option<Expr>>; 9] = [
            Parser::case,
            Parser::timestamp,
            Parser::binary,
            Parser::string,
            Parser::constant,
            Parser::function,
            Parser::parameter,
            Parser::path,
            Parser::parenthesis,
        ];
        for rule in rules {
            if let Some(expr) = self.attempt(rule)? {
                return Ok(Some(expr));
            }
        }
        Ok(None)
    }

    fn digits(&mut self) -> &'a str {
        self.take_while(|c| c.is_ascii_digit())
    }

    fn number(&mut self) -> Result<Option<Expr>> {
        let start = self.position;
        let _ = self.next_is('-') || self.next_is('+');
        if self.digits().is_empty() {
            return Ok(None);
        }
        let mut is_float = false;
        let mut has_exponent = false;
        if self.rest().starts_with('.')
            && self.rest()[1..].starts_with(|c: char| c.is_ascii_digit())
        {
            self.position += 1;
            self.digits();
            is_float = true;
        }
        let before_exponent = self.position;
        if self.next_is('e') || self.next_is('E') {
            let _ = self.next_is('-') || self.next_is('+');
            if self.digits().is_empty() {
                self.position = before_exponent;
            } else {
                has_exponent = true;
            }
        }
        if self.peek().map_or(false, is_identifier_part) {
            return Ok(None);
        }
        let text = &self.input[start..self.position];
        let malformed = || Error::parse(text, start);
        let value = if is_float {
            Value::Float(text.parse().map_err(|_| malformed())?)
        } else if has_exponent {
            let float: f64 = text.parse().map_err(|_| malformed())?;
            if float.fract() == 0. && float.abs() < i64::MAX as f64 {
                Value::Integer(float as i64)
            } else {
                Value::Float(float)
            }
        } else {
            match text.parse::<i64>() {
                Ok(integer) => Value::Integer(integer),
                Err(_) => Value::Float(text.parse().map_err(|_| malformed())?),
            }
        };
        Ok(Some(Expr::val(value)))
    }

    fn string(&mut self) -> Result<Option<Expr>> {
        let start = self.position;
        if !self.next_is('\'') {
            return Ok(None);
        }
        let mut text = String::new();
        loop {
            let chunk = self.take_while(|c| c != '\'');
            text.push_str(chunk);
            if !self.next_is('\'') {
                return Err(self.error_at(start));
            }
            if self.next_is('\'') {
                text.push('\'');
            } else {
                return Ok(Some(Expr::val(text)));
            }
        }
    }

    /// A `X'..'` literal holding pairs of hexadecimal digits
    fn binary(&mut self) -> Result<Option<Expr>> {
        let start = self.position;
        if !(self.next_is('X') || self.next_is('x')) || !self.next_is('\'') {
            return Ok(None);
        }
        let digits = self.take_while(|c| c.is_ascii_hexdigit());
        if !self.next_is('\'') || digits.len() % 2 != 0 {
            return Err(self.error_at(start));
        }
        let bytes = (0..digits.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&digits[i..i + 2], 16))
            .collect::<std::result::Result<Vec<u8>, _>>()
            .map_err(|_| self.error_at(start))?;
        Ok(Some(Expr::val(Value::binary(bytes))))
    }

    fn constant(&mut self) -> Result<Option<Expr>> {
        Ok(if self.keyword("true") {
            Some(Expr::val(true))
        } else if self.keyword("false") {
            Some(Expr::val(false))
        } else if self.keyword("null") {
            Some(Expr::null())
        } else {
            None
        })
    }

    fn timestamp(&mut self) -> Result<Option<Expr>> {
        let start = self.position;
        if !self.next_is('#') {
            return Ok(None);
        }
        let content = self.take_while(is_timestamp_part);
        if content.trim().is_empty() || !self.next_is('#') {
            return Ok(None);
        }
        match parse_timestamp(content.trim()) {
            Some(timestamp) => Ok(Some(Expr::val(timestamp))),
            None => Err(self.error_at(start)),
        }
    }

    fn identifier(&mut self) -> Option<&'a str> {
        if !self.peek().map_or(false, is_identifier_start) {
            return None;
        }
        Some(self.take_while(is_identifier_part))
    }

    fn function(&mut self) -> Result<Option<Expr>> {
        let Some(name) = self.identifier() else {
            return Ok(None);
        };
        if !self.next_is('(') {
            return Ok(None);
        }
        let Some(arguments) = self.expression_list()? else {
            return Ok(None);
        };
        Ok(Some(Expr::function(name, arguments)))
    }

    /// Comma separated expressions up to the closing parenthesis
    fn expression_list(&mut self) -> Result<Option<Vec<Expr>>> {
        let mut items = vec![];
        self.skip_whitespace();
        if self.next_is(')') {
            return Ok(Some(items));
        }
        loop {
            self.skip_whitespace();
            let Some(item) = self.expression()? else {
                return Ok(None);
            };
            items.push(item);
            self.skip_whitespace();
            if self.next_is(')') {
                return Ok(Some(items));
            }
            if !self.next_is(',') {
                return Ok(None);
            }
        }
    }

    fn parameter(&mut self) -> Result<Option<Expr>> {
        if !self.next_is(':') {
            return Ok(None);
        }
        let name = self.take_while(is_parameter_part);
        Ok((!name.is_empty()).then(|| Expr::param(name)))
    }

    fn path(&mut self) -> Result<Option<Expr>> {
        let Some(head) = self.identifier() else {
            return Ok(None);
        };
        let mut segments = vec![head];
        while segments.len() < MAX_PATH_SEGMENTS {
            let before = self.position;
            if !self.next_is('.') {
                break;
            }
            match self.identifier() {
                Some(segment) => segments.push(segment),
                None => {
                    self.position = before;
                    break;
                }
            }
        }
        Ok(Some(Expr::col(segments.into_iter().collect::<Identifier>())))
    }

    fn parenthesis(&mut self) -> Result<Option<Expr>> {
        if !self.next_is('(') {
            return Ok(None);
        }
        let Some(mut items) = self.expression_list()? else {
            return Ok(None);
        };
        Ok(Some(if items.len() == 1 {
            Expr::parenthesis(items.remove(0))
        } else {
            Expr::parenthesis(Expr::list(items))
        }))
    }

    fn case(&mut self) -> Result<Option<Expr>> {
        let start = self.position;
        if !self.keyword("case") {
            return Ok(None);
        }
        self.skip_whitespace();
        let subject = if matches!(self.match_token("when"), Some(end) if self.fits("when", end, false)) {
            None
        } else {
            match self.expression()? {
                Some(subject) => Some(subject),
                None => return Ok(None),
            }
        };
        let mut arms = vec![];
        while let Some(arm) = self.attempt(Parser::case_arm)? {
            arms.push(arm);
        }
        if arms.is_empty() {
            return Err(self.error_at(start));
        }
        let else_branch = self.attempt(|parser| {
            parser.skip_whitespace();
            if !parser.keyword("else") {
                return Ok(None);
            }
            parser.skip_whitespace();
            parser.expression()
        })?;
        self.attempt(|parser| {
            parser.skip_whitespace();
            Ok(parser.keyword("end").then_some(()))
        })?;
        Ok(Some(Expr::case(subject, arms, else_branch)))
    }

    fn case_arm(&mut self) -> Result<Option<(Expr, Expr)>> {
        self.skip_whitespace();
        if !self.keyword("when") {
            return Ok(None);
        }
        self.skip_whitespace();
        let Some(when) = self.expression()? else {
            return Err(self.unexpected());
        };
        self.skip_whitespace();
        if !self.keyword("then") {
            return Err(self.unexpected());
        }
        self.skip_whitespace();
        let Some(then) = self.expression()? else {
            return Err(self.unexpected());
        };
        Ok(Some((when, then)))
    }
}

/// Fixed width digits
fn fixed_digits(text: &str, width: usize) -> Option<(u32, &str)> {
    let digits = text.get(..width)?;
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some((digits.parse().ok()?, text.get(width..)?))
}

fn parse_date(text: &str) -> Option<(NaiveDate, &str)> {
    let (year, rest) = fixed_digits(text, 4)?;
    let (month, rest) = fixed_digits(rest.strip_prefix('-')?, 2)?;
    let (day, rest) = fixed_digits(rest.strip_prefix('-')?, 2)?;
    Some((NaiveDate::from_ymd_opt(year as i32, month, day)?, rest))
}

fn parse_time(text: &str) -> Option<(NaiveTime, &str)> {
    let (hour, rest) = fixed_digits(text, 2)?;
    let (minute, mut rest) = fixed_digits(rest.strip_prefix(':')?, 2)?;
    let mut second = 0;
    let mut nano = 0;
    if let Some(seconds) = rest.strip_prefix(':') {
        let (s, after) = fixed_digits(seconds, 2)?;
        second = s;
        rest = after;
        if let Some(fraction) = rest.strip_prefix('.') {
            let digits: String = fraction.chars().take_while(|c| c.is_ascii_digit()).collect();
            if digits.is_empty() || digits.len() > 9 {
                return None;
            }
            nano = format!("{:0<9}", digits).parse().ok()?;
            rest = &fraction[digits.len()..];
        }
    }
    Some((NaiveTime::from_hms_nano_opt(hour, minute, second, nano)?, rest))
}

fn parse_offset(text: &str) -> Option<(FixedOffset, &str)> {
    if let Some(rest) = text.strip_prefix(|c: char| c == 'Z' || c == 'z') {
        return Some((FixedOffset::east_opt(0)?, rest));
    }
    let sign = match text.chars().next()? {
        '+' => 1,
        '-' => -1,
        _ => return None,
    };
    let (hours, rest) = fixed_digits(&text[1..], 2)?;
    let (minutes, rest) = match fixed_digits(rest.strip_prefix(':').unwrap_or(rest), 2) {
        Some(parsed) => parsed,
        None => (0, rest),
    };
    Some((
        FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60) as i32)?,
        rest,
    ))
}

/// Parse the content of a `#...#` literal. Each missing component defaults
/// independently: the date to today, the time to now, the offset to the local one.
pub fn parse_timestamp(text: &str) -> Option<DateTime<FixedOffset>> {
    let now = Local::now();
    let (date, rest) = match parse_date(text) {
        Some((date, rest)) => (Some(date), rest),
        None => (None, text),
    };
    let rest = match date {
        Some(_) => rest
            .strip_prefix(|c: char| c == 'T' || c == 't' || c == ' ')
            .unwrap_or(rest),
        None => rest,
    };
    let (time, rest) = match parse_time(rest) {
        Some((time, rest)) => (Some(time), rest),
        None => (None, rest),
    };
    if date.is_none() && time.is_none() {
        return None;
    }
    let (offset, rest) = match parse_offset(rest) {
        Some((offset, rest)) => (Some(offset), rest),
        None => (None, rest),
    };
    if !rest.is_empty() {
        return None;
    }
    let naive = NaiveDateTime::new(
        date.unwrap_or_else(|| now.date_naive()),
        time.unwrap_or_else(|| now.time()),
    );
    match offset {
        Some(offset) => offset.from_local_datetime(&naive).single(),
        None => Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|local| local.fixed_offset())
            .or_else(|| now.offset().fix().from_local_datetime(&naive).single()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::BinaryOperator;

    fn parse_default(input: &str) -> Result<Expr> {
        parse(input, &Operators::default())
    }

    #[test]
    fn test_literals() {
        assert_eq!(parse_default("42").unwrap(), Expr::val(42));
        assert_eq!(parse_default("-42").unwrap(), Expr::val(-42));
        assert_eq!(parse_default("4.5").unwrap(), Expr::val(4.5));
        assert_eq!(parse_default("1e3").unwrap(), Expr::val(1000));
        assert_eq!(parse_default("1.5e3").unwrap(), Expr::val(1500.));
        assert_eq!(parse_default("1e-3").unwrap(), Expr::val(0.001));
        assert_eq!(parse_default("'it''s'").unwrap(), Expr::val("it's"));
        assert_eq!(parse_default("''").unwrap(), Expr::val(""));
        assert_eq!(parse_default("TRUE").unwrap(), Expr::val(true));
        assert_eq!(parse_default("false").unwrap(), Expr::val(false));
        assert_eq!(parse_default("Null").unwrap(), Expr::null());
        // Keywords prefixing an identifier are paths
        assert_eq!(parse_default("nullable").unwrap(), Expr::col("nullable"));
        assert_eq!(
            parse_default("x'dEaD'").unwrap(),
            Expr::val(Value::binary(vec![0xde, 0xad]))
        );
        assert_eq!(parse_default("X''").unwrap(), Expr::val(Value::binary(Vec::<u8>::new())));
        assert!(parse_default("X'ABC'").is_err());
        assert!(parse_default("X'AZ'").is_err());
        assert_eq!(parse_default("xray").unwrap(), Expr::col("xray"));
    }

    #[test]
    fn test_timestamps() {
        let expr = parse_default("#2024-03-01T12:30:00+02:00#").unwrap();
        assert_eq!(
            expr,
            Expr::val(DateTime::parse_from_rfc3339("2024-03-01T12:30:00+02:00").unwrap())
        );
        let expr = parse_default("#2024-03-01 12:30:00.250Z#").unwrap();
        assert_eq!(
            expr,
            Expr::val(DateTime::parse_from_rfc3339("2024-03-01T12:30:00.250Z").unwrap())
        );
        let date_only = parse_timestamp("2024-03-01").unwrap();
        assert_eq!(date_only.date_naive(), NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        let time_only = parse_timestamp("08:15+01:00").unwrap();
        assert_eq!(time_only.time(), NaiveTime::from_hms_opt(8, 15, 0).unwrap());
        assert_eq!(time_only.offset().local_minus_utc(), 3600);
        assert!(parse_timestamp("2024-13-01").is_none());
        assert!(parse_timestamp("222é-01-01").is_none());
        assert!(parse_timestamp("12:3é").is_none());
        assert!(parse_default("#2024-13-01#").is_err());
    }

    #[test]
    fn test_paths_and_parameters() {
        assert_eq!(
            parse_default("shop.orders.id").unwrap(),
            Expr::col(["shop", "orders", "id"])
        );
        assert_eq!(parse_default(":cid").unwrap(), Expr::param("cid"));
        assert_eq!(parse_default("@user_1").unwrap(), Expr::col("@user_1"));
        assert!(parse_default("a.b.c.d.e").is_err());
    }

    #[test]
    fn test_operators() {
        let expr = parse_default("orders.customer_id = :cid").unwrap();
        assert_eq!(
            expr,
            Expr::eq(Expr::col("orders.customer_id"), Expr::param("cid"))
        );
        // No precedence, nested to the right
        let expr = parse_default("a = 1 AND b").unwrap();
        assert_eq!(expr, Expr::eq(Expr::col("a"), Expr::and(1, Expr::col("b"))));
        let expr = parse_default("(a = 1) and (b <= 2)").unwrap();
        assert_eq!(
            expr,
            Expr::and(
                Expr::parenthesis(Expr::eq(Expr::col("a"), 1)),
                Expr::parenthesis(Expr::lt_eq(Expr::col("b"), 2))
            )
        );
        // Mixed logical operators keep the parsed grouping
        let expr = parse_default("a AND b OR c").unwrap();
        assert_eq!(expr.to_string(), "a AND (b OR c)");
        let expr = parse_default("a * b + 1").unwrap();
        assert_eq!(expr.to_string(), "a * (b + 1)");
        let expr = parse_default("- -5 = orders.id").unwrap();
        assert_eq!(
            expr,
            Expr::eq(Expr::opposite(Expr::val(-5)), Expr::col("orders.id"))
        );
        assert_eq!(expr.to_string(), "-(-5) = orders.id");
        let expr = parse_default("name NOT   LIKE 'a%'").unwrap();
        assert_eq!(expr, Expr::not_like(Expr::col("name"), "a%"));
        let expr = parse_default("a-1").unwrap();
        assert_eq!(expr, Expr::minus(Expr::col("a"), 1));
        let expr = parse_default("a IN (1, 2)").unwrap();
        assert_eq!(
            expr,
            Expr::in_list(Expr::col("a"), Expr::parenthesis(Expr::list(vec![1, 2])))
        );
        // Keyword operators need their boundaries
        assert!(parse_default("a andb").is_err());
        assert!(parse_default("order").is_ok());
        let expr = parse_default("a is nothing").unwrap();
        assert!(matches!(expr, Expr::BinaryOp(ref b) if b.operator() == BinaryOperator::Is));
    }

    #[test]
    fn test_unary() {
        assert_eq!(
            parse_default("NOT a").unwrap(),
            Expr::not(Expr::col("a"))
        );
        assert_eq!(
            parse_default("- a").unwrap(),
            Expr::opposite(Expr::col("a"))
        );
        assert_eq!(
            parse_default("a IS NOT NULL").unwrap(),
            Expr::is_not_null(Expr::col("a"))
        );
        assert_eq!(
            parse_default("a is null = true").unwrap(),
            Expr::eq(Expr::is_null(Expr::col("a")), true)
        );
        assert_eq!(
            parse_default("not a is null").unwrap(),
            Expr::not(Expr::is_null(Expr::col("a")))
        );
    }

    #[test]
    fn test_functions_and_case() {
        assert_eq!(
            parse_default("COALESCE(a, 0)").unwrap(),
            Expr::function("COALESCE", vec![Expr::col("a"), Expr::val(0)])
        );
        assert_eq!(
            parse_default("now()").unwrap(),
            Expr::function("now", Vec::<Expr>::new())
        );
        let expr = parse_default("CASE status WHEN 1 THEN 'new' ELSE 'old' END").unwrap();
        assert_eq!(
            expr,
            Expr::case(
                Some(Expr::col("status")),
                vec![(Expr::val(1), Expr::val("new"))],
                Some(Expr::val("old"))
            )
        );
        let expr = parse_default("case when a then 1 when b then 2").unwrap();
        assert_eq!(
            expr,
            Expr::case(
                None::<Expr>,
                vec![(Expr::col("a"), Expr::val(1)), (Expr::col("b"), Expr::val(2))],
                None::<Expr>
            )
        );
        assert!(parse_default("CASE a END").is_err());
    }

    #[test]
    fn test_errors() {
        let error = parse_default("a = 'open").unwrap_err();
        println!("{error}");
        assert!(matches!(error, Error::Parse { offset: 4, .. }));
        let error = parse_default("a = ").unwrap_err();
        assert!(matches!(error, Error::Parse { offset: 2, .. }));
        assert!(parse_default("").is_err());
        assert!(parse_default("f(a, ").is_err());
    }
}
