//! Linguistic rule parser
//!
//! Parses the textual rule syntax into [`RuleDef`] structures:
//!
//! ```text
//! IF var IS set [AND|OR var IS [NOT] set]* THEN var IS set [AND var IS set]* [WITH weight]
//! ```
//!
//! - keywords are case-insensitive (`IF`, `AND`, `OR`, `NOT`, `IS`,
//!   `THEN`, `WITH`)
//! - negation is written either `var IS NOT set` or `NOT var IS set`
//! - `AND` binds tighter than `OR`; parentheses group explicitly
//! - the optional `WITH w` suffix sets the rule weight, w in [0,1]
//!
//! Parse failures carry the byte offset of the failure point.

use nom::{
    bytes::complete::{tag_no_case, take_while1},
    character::complete::{char, multispace0},
    combinator::{opt, verify},
    number::complete::double,
    sequence::preceded,
    IResult,
};

use crate::error::{ErrorCode, FisError};
use crate::model::{AntecedentDef, ConsequentDef, PropositionDef, RuleDef};

/// Parser error type
#[derive(Debug, Clone, thiserror::Error)]
pub enum RuleParseError {
    #[error("Syntax error at offset {position}: {message}")]
    Syntax { position: usize, message: String },

    #[error("Unexpected end of rule text")]
    UnexpectedEof,

    #[error("Rule weight {value} outside [0,1]")]
    InvalidWeight { value: f64 },
}

impl From<RuleParseError> for FisError {
    fn from(err: RuleParseError) -> Self {
        match err {
            RuleParseError::Syntax { position, ref message } => {
                FisError::rule_syntax(position, message.clone())
            }
            RuleParseError::UnexpectedEof => {
                FisError::new(ErrorCode::UnexpectedEof, err.to_string())
            }
            RuleParseError::InvalidWeight { .. } => {
                FisError::new(ErrorCode::InvalidWeight, err.to_string())
            }
        }
    }
}

const KEYWORDS: [&str; 7] = ["IF", "THEN", "AND", "OR", "NOT", "IS", "WITH"];

/// Parse a single rule.
pub fn parse_rule(input: &str) -> Result<RuleDef, RuleParseError> {
    let original = input;

    let rest = skip_ws(input);
    let rest = expect_keyword(rest, "IF", original)?;
    let (rest, antecedent) = or_expr(rest)
        .map_err(|e| syntax_error(original, &e, "expected a proposition like 'var IS set'"))?;

    let rest = expect_keyword(rest, "THEN", original)?;
    let (rest, consequents) = consequent_list(rest)
        .map_err(|e| syntax_error(original, &e, "expected a consequent like 'var IS set'"))?;

    let rest = skip_ws(rest);
    let (rest, weight) = match keyword("WITH")(rest) {
        Ok((rest, _)) => {
            let (rest, w) = preceded(multispace0, double)(rest)
                .map_err(|e| syntax_error(original, &e, "expected a numeric weight"))?;
            if !(0.0..=1.0).contains(&w) || !w.is_finite() {
                return Err(RuleParseError::InvalidWeight { value: w });
            }
            (rest, w)
        }
        Err(_) => (rest, 1.0),
    };

    let rest = skip_ws(rest);
    if !rest.is_empty() {
        return Err(RuleParseError::Syntax {
            position: offset(original, rest),
            message: format!("unexpected trailing input '{}'", truncate(rest)),
        });
    }

    Ok(RuleDef {
        antecedent,
        consequents,
        weight,
    })
}

/// Parse a batch of rules, one per line; blank lines and `#` comments
/// are skipped. Semicolons also separate rules within a line.
pub fn parse_rules(input: &str) -> Result<Vec<RuleDef>, RuleParseError> {
    let mut rules = Vec::new();
    for line in input.lines() {
        for chunk in line.split(';') {
            let chunk = chunk.trim();
            if chunk.is_empty() || chunk.starts_with('#') {
                continue;
            }
            rules.push(parse_rule(chunk)?);
        }
    }
    Ok(rules)
}

// ============================================================================
// Grammar
// ============================================================================

/// or_expr := and_expr (OR and_expr)*
fn or_expr(input: &str) -> IResult<&str, AntecedentDef> {
    let (mut input, mut acc) = and_expr(input)?;
    loop {
        match preceded(keyword("OR"), and_expr)(input) {
            Ok((rest, rhs)) => {
                acc = AntecedentDef::Or(Box::new(acc), Box::new(rhs));
                input = rest;
            }
            Err(_) => return Ok((input, acc)),
        }
    }
}

/// and_expr := term (AND term)*
fn and_expr(input: &str) -> IResult<&str, AntecedentDef> {
    let (mut input, mut acc) = term(input)?;
    loop {
        match preceded(keyword("AND"), term)(input) {
            Ok((rest, rhs)) => {
                acc = AntecedentDef::And(Box::new(acc), Box::new(rhs));
                input = rest;
            }
            Err(_) => return Ok((input, acc)),
        }
    }
}

/// term := '(' or_expr ')' | [NOT] proposition
fn term(input: &str) -> IResult<&str, AntecedentDef> {
    let input = skip_ws(input);
    if let Ok((rest, _)) = char::<_, nom::error::Error<&str>>('(')(input) {
        let (rest, inner) = or_expr(rest)?;
        let rest = skip_ws(rest);
        let (rest, _) = char(')')(rest)?;
        return Ok((rest, inner));
    }

    // prefix NOT flips the proposition
    let (input, prefix_not) = opt(keyword("NOT"))(input)?;
    let (input, mut prop) = proposition(input)?;
    if prefix_not.is_some() {
        prop.negated = !prop.negated;
    }
    Ok((input, AntecedentDef::Prop(prop)))
}

/// proposition := ident IS [NOT] ident
fn proposition(input: &str) -> IResult<&str, PropositionDef> {
    let input = skip_ws(input);
    let (input, variable) = identifier(input)?;
    let (input, _) = keyword("IS")(input)?;
    let (input, negated) = opt(keyword("NOT"))(input)?;
    let input = skip_ws(input);
    let (input, set) = identifier(input)?;
    Ok((
        input,
        PropositionDef {
            variable: variable.to_string(),
            set: set.to_string(),
            negated: negated.is_some(),
        },
    ))
}

/// consequent_list := consequent (AND consequent)*
fn consequent_list(input: &str) -> IResult<&str, Vec<ConsequentDef>> {
    let (mut input, first) = consequent(input)?;
    let mut out = vec![first];
    loop {
        match preceded(keyword("AND"), consequent)(input) {
            Ok((rest, c)) => {
                out.push(c);
                input = rest;
            }
            Err(_) => return Ok((input, out)),
        }
    }
}

fn consequent(input: &str) -> IResult<&str, ConsequentDef> {
    let (input, p) = proposition(input)?;
    Ok((
        input,
        ConsequentDef {
            variable: p.variable,
            set: p.set,
            negated: p.negated,
        },
    ))
}

// ============================================================================
// Lexical helpers
// ============================================================================

fn skip_ws(input: &str) -> &str {
    input.trim_start()
}

/// A keyword surrounded by whitespace, case-insensitive, not glued to a
/// following identifier character.
fn keyword(kw: &'static str) -> impl Fn(&str) -> IResult<&str, &str> {
    move |input: &str| {
        let input = skip_ws(input);
        let (rest, m) = tag_no_case(kw)(input)?;
        if rest.chars().next().is_some_and(is_ident_char) {
            return Err(nom::Err::Error(nom::error::Error::new(
                input,
                nom::error::ErrorKind::Tag,
            )));
        }
        Ok((rest, m))
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

/// An identifier that is not a keyword.
fn identifier(input: &str) -> IResult<&str, &str> {
    verify(take_while1(is_ident_char), |s: &str| {
        !KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(s))
            && s.chars().next().is_some_and(|c| c.is_alphabetic() || c == '_')
    })(input)
}

// ============================================================================
// Error plumbing
// ============================================================================

fn offset(original: &str, rest: &str) -> usize {
    original.len() - rest.len()
}

fn expect_keyword<'a>(
    input: &'a str,
    kw: &'static str,
    original: &str,
) -> Result<&'a str, RuleParseError> {
    match keyword(kw)(input) {
        Ok((rest, _)) => Ok(rest),
        Err(_) => {
            let at = skip_ws(input);
            if at.is_empty() {
                Err(RuleParseError::UnexpectedEof)
            } else {
                Err(RuleParseError::Syntax {
                    position: offset(original, at),
                    message: format!("expected '{}', found '{}'", kw, truncate(at)),
                })
            }
        }
    }
}

fn syntax_error(
    original: &str,
    err: &nom::Err<nom::error::Error<&str>>,
    message: &str,
) -> RuleParseError {
    match err {
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            let at = skip_ws(e.input);
            if at.is_empty() {
                RuleParseError::UnexpectedEof
            } else {
                RuleParseError::Syntax {
                    position: offset(original, at),
                    message: message.to_string(),
                }
            }
        }
        nom::Err::Incomplete(_) => RuleParseError::UnexpectedEof,
    }
}

fn truncate(s: &str) -> &str {
    let end = s
        .char_indices()
        .nth(20)
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    &s[..end]
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_rule() {
        let rule = parse_rule("IF temperature IS Cold THEN fan IS Low").unwrap();
        match &rule.antecedent {
            AntecedentDef::Prop(p) => {
                assert_eq!(p.variable, "temperature");
                assert_eq!(p.set, "Cold");
                assert!(!p.negated);
            }
            _ => panic!("expected single proposition"),
        }
        assert_eq!(rule.consequents.len(), 1);
        assert_eq!(rule.consequents[0].variable, "fan");
        assert_eq!(rule.consequents[0].set, "Low");
        assert!((rule.weight - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_keywords_case_insensitive() {
        let rule = parse_rule("if temp is Cold then fan is Low with 0.5").unwrap();
        assert!((rule.weight - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let rule = parse_rule("IF a IS x OR b IS y AND c IS z THEN o IS s").unwrap();
        // a OR (b AND c)
        match &rule.antecedent {
            AntecedentDef::Or(l, r) => {
                assert!(matches!(**l, AntecedentDef::Prop(_)));
                assert!(matches!(**r, AntecedentDef::And(_, _)));
            }
            other => panic!("expected OR at root, got {:?}", other),
        }
    }

    #[test]
    fn test_parentheses_group() {
        let rule = parse_rule("IF (a IS x OR b IS y) AND c IS z THEN o IS s").unwrap();
        match &rule.antecedent {
            AntecedentDef::And(l, r) => {
                assert!(matches!(**l, AntecedentDef::Or(_, _)));
                assert!(matches!(**r, AntecedentDef::Prop(_)));
            }
            other => panic!("expected AND at root, got {:?}", other),
        }
    }

    #[test]
    fn test_negation_forms() {
        let a = parse_rule("IF temp IS NOT Cold THEN fan IS High").unwrap();
        let b = parse_rule("IF NOT temp IS Cold THEN fan IS High").unwrap();
        assert_eq!(a.antecedent, b.antecedent);
        match &a.antecedent {
            AntecedentDef::Prop(p) => assert!(p.negated),
            _ => panic!("expected proposition"),
        }
        // double negation cancels
        let c = parse_rule("IF NOT temp IS NOT Cold THEN fan IS High").unwrap();
        match &c.antecedent {
            AntecedentDef::Prop(p) => assert!(!p.negated),
            _ => panic!("expected proposition"),
        }
    }

    #[test]
    fn test_multiple_consequents() {
        let rule =
            parse_rule("IF t IS Hot THEN fan IS High AND heater IS Off WITH 0.9").unwrap();
        assert_eq!(rule.consequents.len(), 2);
        assert_eq!(rule.consequents[1].variable, "heater");
        assert!((rule.weight - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_missing_then_reports_position() {
        let err = parse_rule("IF temp IS Cold fan IS Low").unwrap_err();
        match err {
            RuleParseError::Syntax { position, message } => {
                assert_eq!(position, 16);
                assert!(message.contains("THEN"));
            }
            other => panic!("expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn test_truncated_rule_is_eof() {
        assert!(matches!(
            parse_rule("IF temp IS Cold"),
            Err(RuleParseError::UnexpectedEof)
        ));
        assert!(matches!(
            parse_rule("IF"),
            Err(RuleParseError::UnexpectedEof)
        ));
    }

    #[test]
    fn test_weight_out_of_range() {
        assert!(matches!(
            parse_rule("IF a IS x THEN o IS s WITH 1.5"),
            Err(RuleParseError::InvalidWeight { .. })
        ));
        assert!(matches!(
            parse_rule("IF a IS x THEN o IS s WITH -0.1"),
            Err(RuleParseError::InvalidWeight { .. })
        ));
    }

    #[test]
    fn test_trailing_garbage_rejected() {
        let err = parse_rule("IF a IS x THEN o IS s banana").unwrap_err();
        assert!(matches!(err, RuleParseError::Syntax { .. }));
    }

    #[test]
    fn test_keyword_not_an_identifier() {
        assert!(parse_rule("IF THEN IS x THEN o IS s").is_err());
    }

    #[test]
    fn test_parse_rules_batch() {
        let text = "
            # comfort rules
            IF temp IS Cold THEN fan IS Low
            IF temp IS Hot THEN fan IS High; IF temp IS Mild THEN fan IS Medium
        ";
        let rules = parse_rules(text).unwrap();
        assert_eq!(rules.len(), 3);
    }

    #[test]
    fn test_hyphenated_identifiers() {
        let rule = parse_rule("IF inlet-temp IS very_cold THEN fan-1 IS Low").unwrap();
        match &rule.antecedent {
            AntecedentDef::Prop(p) => {
                assert_eq!(p.variable, "inlet-temp");
                assert_eq!(p.set, "very_cold");
            }
            _ => panic!("expected proposition"),
        }
    }
}
