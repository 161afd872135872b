//! Index query parser
//!
//! Parses the index query language (see `query.pest`) into a [`QueryExpr`]
//! tree that [`IndexStore`](super::IndexStore) evaluates. Syntax errors are
//! reported as [`BackendError::QuerySyntax`] carrying the pest diagnostic.

use super::{BackendError, BackendResult};
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "backend/query.pest"]
struct IndexQueryParser;

/// Parsed index query
#[derive(Debug, Clone, PartialEq)]
pub enum QueryExpr {
    /// `key:word`
    Term { key: String, text: String },
    /// `key:"some words"`
    Phrase { key: String, text: String },
    /// `key:pre*`
    Prefix { key: String, text: String },
    Not(Box<QueryExpr>),
    And(Vec<QueryExpr>),
    Or(Vec<QueryExpr>),
}

impl QueryExpr {
    pub fn term(key: impl Into<String>, text: impl Into<String>) -> Self {
        QueryExpr::Term {
            key: key.into(),
            text: text.into(),
        }
    }

    /// Keys referenced anywhere in the expression
    pub fn keys(&self) -> Vec<&str> {
        let mut keys = Vec::new();
        self.collect_keys(&mut keys);
        keys
    }

    fn collect_keys<'a>(&'a self, keys: &mut Vec<&'a str>) {
        match self {
            QueryExpr::Term { key, .. }
            | QueryExpr::Phrase { key, .. }
            | QueryExpr::Prefix { key, .. } => {
                if !keys.contains(&key.as_str()) {
                    keys.push(key);
                }
            }
            QueryExpr::Not(inner) => inner.collect_keys(keys),
            QueryExpr::And(items) | QueryExpr::Or(items) => {
                for item in items {
                    item.collect_keys(keys);
                }
            }
        }
    }
}

/// Parse an index query expression
pub fn parse_query(input: &str) -> BackendResult<QueryExpr> {
    let mut pairs = IndexQueryParser::parse(Rule::query, input)
        .map_err(|e| BackendError::QuerySyntax(e.to_string()))?;

    let query = pairs
        .next()
        .ok_or_else(|| BackendError::QuerySyntax("empty query".to_string()))?;

    for inner in query.into_inner() {
        if inner.as_rule() == Rule::expr {
            return parse_expr(inner);
        }
    }
    Err(BackendError::QuerySyntax("empty query".to_string()))
}

fn parse_expr(pair: Pair<Rule>) -> BackendResult<QueryExpr> {
    let mut branches = pair
        .into_inner()
        .map(parse_and_expr)
        .collect::<BackendResult<Vec<_>>>()?;
    Ok(collapse(&mut branches, QueryExpr::Or))
}

fn parse_and_expr(pair: Pair<Rule>) -> BackendResult<QueryExpr> {
    let mut clauses = pair
        .into_inner()
        .map(parse_clause)
        .collect::<BackendResult<Vec<_>>>()?;
    Ok(collapse(&mut clauses, QueryExpr::And))
}

fn collapse(items: &mut Vec<QueryExpr>, wrap: fn(Vec<QueryExpr>) -> QueryExpr) -> QueryExpr {
    if items.len() == 1 {
        items.remove(0)
    } else {
        wrap(std::mem::take(items))
    }
}

fn parse_clause(pair: Pair<Rule>) -> BackendResult<QueryExpr> {
    let mut negated = false;
    let mut body = None;

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::not_op => negated = true,
            Rule::group => {
                let expr = inner
                    .into_inner()
                    .next()
                    .ok_or_else(|| BackendError::QuerySyntax("empty group".to_string()))?;
                body = Some(parse_expr(expr)?);
            }
            Rule::field => body = Some(parse_field(inner)?),
            rule => {
                return Err(BackendError::QuerySyntax(format!(
                    "unexpected {:?} in clause",
                    rule
                )))
            }
        }
    }

    let body = body.ok_or_else(|| BackendError::QuerySyntax("missing clause".to_string()))?;
    Ok(if negated {
        QueryExpr::Not(Box::new(body))
    } else {
        body
    })
}

fn parse_field(pair: Pair<Rule>) -> BackendResult<QueryExpr> {
    let mut inner = pair.into_inner();
    let key = inner
        .next()
        .ok_or_else(|| BackendError::QuerySyntax("missing key".to_string()))?
        .as_str()
        .to_string();
    let value = inner
        .next()
        .ok_or_else(|| BackendError::QuerySyntax(format!("missing value for '{}'", key)))?;

    // Phrase and prefix wrap a single text pair.
    let text_of = |pair: Pair<Rule>| {
        pair.into_inner()
            .next()
            .map(|p| p.as_str().to_string())
            .unwrap_or_default()
    };

    Ok(match value.as_rule() {
        Rule::term => QueryExpr::Term {
            key,
            text: value.as_str().to_string(),
        },
        Rule::phrase => QueryExpr::Phrase {
            key,
            text: text_of(value),
        },
        Rule::prefix => QueryExpr::Prefix {
            key,
            text: text_of(value),
        },
        rule => {
            return Err(BackendError::QuerySyntax(format!(
                "unexpected {:?} as value",
                rule
            )))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_term() {
        let expr = parse_query("lifeform:herb").unwrap();
        assert_eq!(expr, QueryExpr::term("lifeform", "herb"));
    }

    #[test]
    fn test_parse_phrase_and_prefix() {
        let expr = parse_query("lifeform:\"Perennial herb\"").unwrap();
        assert_eq!(
            expr,
            QueryExpr::Phrase {
                key: "lifeform".into(),
                text: "Perennial herb".into()
            }
        );

        let expr = parse_query("name:ros*").unwrap();
        assert_eq!(
            expr,
            QueryExpr::Prefix {
                key: "name".into(),
                text: "ros".into()
            }
        );
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let expr = parse_query("a:x OR b:y AND c:z").unwrap();
        assert_eq!(
            expr,
            QueryExpr::Or(vec![
                QueryExpr::term("a", "x"),
                QueryExpr::And(vec![QueryExpr::term("b", "y"), QueryExpr::term("c", "z")]),
            ])
        );
    }

    #[test]
    fn test_juxtaposition_is_or() {
        let expr = parse_query("a:x b:y").unwrap();
        assert_eq!(
            expr,
            QueryExpr::Or(vec![QueryExpr::term("a", "x"), QueryExpr::term("b", "y")])
        );
    }

    #[test]
    fn test_not_and_groups() {
        let expr = parse_query("(a:x || a:y) && NOT b:z").unwrap();
        assert_eq!(
            expr,
            QueryExpr::And(vec![
                QueryExpr::Or(vec![QueryExpr::term("a", "x"), QueryExpr::term("a", "y")]),
                QueryExpr::Not(Box::new(QueryExpr::term("b", "z"))),
            ])
        );
        assert_eq!(expr.keys(), vec!["a", "b"]);
    }

    #[test]
    fn test_keyword_operators_before_words() {
        assert_eq!(
            parse_query("a:x AND b:y").unwrap(),
            QueryExpr::And(vec![QueryExpr::term("a", "x"), QueryExpr::term("b", "y")])
        );
        assert_eq!(
            parse_query("a:x OR b:y").unwrap(),
            QueryExpr::Or(vec![QueryExpr::term("a", "x"), QueryExpr::term("b", "y")])
        );
        assert_eq!(
            parse_query("NOT a:x").unwrap(),
            QueryExpr::Not(Box::new(QueryExpr::term("a", "x")))
        );
        assert_eq!(
            parse_query("lifeform:herb AND NOT lifeform:annual").unwrap(),
            QueryExpr::And(vec![
                QueryExpr::term("lifeform", "herb"),
                QueryExpr::Not(Box::new(QueryExpr::term("lifeform", "annual"))),
            ])
        );
        // Same operators spelled with symbols
        assert_eq!(parse_query("a:x && b:y").unwrap(), parse_query("a:x AND b:y").unwrap());
        assert_eq!(parse_query("!a:x").unwrap(), parse_query("NOT a:x").unwrap());
    }

    #[test]
    fn test_keyword_prefix_is_a_key() {
        let expr = parse_query("a:x ANDROID:y").unwrap();
        assert_eq!(
            expr,
            QueryExpr::Or(vec![QueryExpr::term("a", "x"), QueryExpr::term("ANDROID", "y")])
        );
        assert_eq!(parse_query("NOTE:y").unwrap(), QueryExpr::term("NOTE", "y"));
        assert_eq!(
            parse_query("a:x ORDER:y").unwrap(),
            QueryExpr::Or(vec![QueryExpr::term("a", "x"), QueryExpr::term("ORDER", "y")])
        );
    }

    #[test]
    fn test_syntax_errors() {
        for bad in ["", "lifeform", "lifeform:", "(a:x", "a:x AND", "a:\"open"] {
            match parse_query(bad) {
                Err(BackendError::QuerySyntax(msg)) => assert!(!msg.is_empty(), "{bad}"),
                other => panic!("expected syntax error for {bad:?}, got {other:?}"),
            }
        }
    }
}
