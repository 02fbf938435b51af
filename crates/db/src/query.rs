//! The one-line query grammar the prompt accepts.
//!
//! A query is a whitespace-separated conjunction of terms. Each term is
//! `column`, an operator, and a value: `town="ANG MO KIO"`,
//! `floor_area_sqm>=80`, `month=2015-09..2015-10`. Repeated terms on one
//! column union into that column's interval set; distinct columns
//! intersect.

use anyhow::{anyhow, bail, Result};
use index::{Interval, IntervalSet, KeyType, Predicate};

use crate::schema;

pub fn parse_query(input: &str) -> Result<Vec<Predicate>> {
    let mut predicates: Vec<Predicate> = Vec::new();
    for term in tokenize(input)? {
        let (column, op, value) = split_term(&term)?;
        let key_type = schema::key_type_of(column)
            .ok_or_else(|| anyhow!("unknown column {:?}", column))?;

        let existing = predicates
            .iter_mut()
            .find(|predicate| predicate.column == column);
        match key_type {
            KeyType::Int => {
                let interval = interval_for(op, value, parse_int)?;
                match existing {
                    Some(Predicate {
                        set: IntervalSet::Int(set),
                        ..
                    }) => set.push(interval),
                    Some(_) => bail!("conflicting predicate types for column {:?}", column),
                    None => predicates.push(Predicate {
                        column: column.to_string(),
                        set: IntervalSet::Int(vec![interval]),
                    }),
                }
            }
            KeyType::Real => {
                let interval = interval_for(op, value, parse_real)?;
                match existing {
                    Some(Predicate {
                        set: IntervalSet::Real(set),
                        ..
                    }) => set.push(interval),
                    Some(_) => bail!("conflicting predicate types for column {:?}", column),
                    None => predicates.push(Predicate {
                        column: column.to_string(),
                        set: IntervalSet::Real(vec![interval]),
                    }),
                }
            }
            KeyType::Text => {
                let interval = interval_for(op, value, |text| Ok(text.to_string()))?;
                match existing {
                    Some(Predicate {
                        set: IntervalSet::Text(set),
                        ..
                    }) => set.push(interval),
                    Some(_) => bail!("conflicting predicate types for column {:?}", column),
                    None => predicates.push(Predicate {
                        column: column.to_string(),
                        set: IntervalSet::Text(vec![interval]),
                    }),
                }
            }
        }
    }
    Ok(predicates)
}

/// Splits on whitespace outside double quotes; quotes group but are not
/// kept.
fn tokenize(input: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for ch in input.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if in_quotes {
        bail!("unterminated quote in query");
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    Ok(tokens)
}

fn split_term(term: &str) -> Result<(&str, &str, &str)> {
    for op in ["<=", ">=", "=", "<", ">"] {
        if let Some(at) = term.find(op) {
            let column = &term[..at];
            let value = &term[at + op.len()..];
            if column.is_empty() {
                bail!("term {:?} is missing a column name", term);
            }
            return Ok((column, op, value));
        }
    }
    bail!(
        "term {:?} has no operator (expected =, <, <=, > or >=)",
        term
    )
}

fn interval_for<K: Clone>(
    op: &str,
    value: &str,
    parse: impl Fn(&str) -> Result<K>,
) -> Result<Interval<K>> {
    if op == "=" {
        if let Some((lo, hi)) = value.split_once("..") {
            return Ok(Interval::Closed {
                start: parse(lo)?,
                end: parse(hi)?,
            });
        }
        let exact = parse(value)?;
        return Ok(Interval::Closed {
            start: exact.clone(),
            end: exact,
        });
    }
    let bound = parse(value)?;
    match op {
        "<" => Ok(Interval::UpToOpen { end: bound }),
        "<=" => Ok(Interval::UpTo { end: bound }),
        ">" => Ok(Interval::FromOpen { start: bound }),
        ">=" => Ok(Interval::From { start: bound }),
        other => bail!("unsupported operator {:?}", other),
    }
}

fn parse_int(text: &str) -> Result<i32> {
    text.parse::<i32>()
        .map_err(|_| anyhow!("invalid integer {:?}", text))
}

fn parse_real(text: &str) -> Result<f64> {
    text.parse::<f64>()
        .map_err(|_| anyhow!("invalid number {:?}", text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_term_becomes_a_point_interval() {
        let predicates = parse_query("town=\"ANG MO KIO\"").unwrap();
        assert_eq!(predicates.len(), 1);
        assert_eq!(predicates[0].column, "town");
        match &predicates[0].set {
            IntervalSet::Text(set) => assert_eq!(
                set,
                &vec![Interval::Closed {
                    start: "ANG MO KIO".to_string(),
                    end: "ANG MO KIO".to_string(),
                }]
            ),
            _ => panic!("expected text set"),
        }
    }

    #[test]
    fn comparison_terms_become_unbounded_intervals() {
        let predicates = parse_query("floor_area_sqm>=80 resale_price<500000").unwrap();
        assert_eq!(predicates.len(), 2);
        match &predicates[0].set {
            IntervalSet::Real(set) => assert_eq!(set, &vec![Interval::From { start: 80.0 }]),
            _ => panic!("expected real set"),
        }
        match &predicates[1].set {
            IntervalSet::Real(set) => assert_eq!(set, &vec![Interval::UpToOpen { end: 500000.0 }]),
            _ => panic!("expected real set"),
        }
    }

    #[test]
    fn range_value_becomes_a_closed_interval() {
        let predicates = parse_query("month=2015-09..2015-10").unwrap();
        match &predicates[0].set {
            IntervalSet::Text(set) => assert_eq!(
                set,
                &vec![Interval::Closed {
                    start: "2015-09".to_string(),
                    end: "2015-10".to_string(),
                }]
            ),
            _ => panic!("expected text set"),
        }
    }

    #[test]
    fn repeated_columns_union_into_one_set() {
        let predicates = parse_query("month=2015-09 month=2015-10 town=X").unwrap();
        assert_eq!(predicates.len(), 2);
        match &predicates[0].set {
            IntervalSet::Text(set) => assert_eq!(set.len(), 2),
            _ => panic!("expected text set"),
        }
    }

    #[test]
    fn integer_column_parses_integer_bounds() {
        let predicates = parse_query("lease_commence_date>1990").unwrap();
        match &predicates[0].set {
            IntervalSet::Int(set) => assert_eq!(set, &vec![Interval::FromOpen { start: 1990 }]),
            _ => panic!("expected int set"),
        }
    }

    #[test]
    fn bad_terms_are_rejected() {
        assert!(parse_query("flat_colour=blue").is_err());
        assert!(parse_query("town").is_err());
        assert!(parse_query("lease_commence_date=abc").is_err());
        assert!(parse_query("town=\"unterminated").is_err());
        assert!(parse_query("=X").is_err());
    }

    #[test]
    fn empty_query_means_no_filter() {
        assert!(parse_query("").unwrap().is_empty());
        assert!(parse_query("   ").unwrap().is_empty());
    }
}
