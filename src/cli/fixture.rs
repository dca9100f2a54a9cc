/*!
A minimal line-based `.lra` fixture format, used only to demonstrate the
propagator end-to-end from the command line — the real theory-atom grammar
(guarded sub-expressions, the full continuous-term grammar) is a grounder's
job and out of this crate's scope (spec §1, §6).

One atom per non-comment line:

```text
dom      <pid> <name> <var> <lower> <upper>
sum      <pid> <name> <op> <bound> <coeff> <var> [<coeff> <var> ...]
assert   <pid> <name> <op> <bound> <coeff> <var> [<coeff> <var> ...]
minimize <pid> <name> <weight> <coeff> <var> [<coeff> <var> ...]
maximize <pid> <name> <weight> <coeff> <var> [<coeff> <var> ...]
guess    <name> true|false
```

`<op>` is one of `=`, `<=`, `>=` for `sum`, plus `<`, `>` for `assert`. Every
atom-defining line names itself so later `guess` lines can refer to its
solver literal. Lines starting with `#`, and blank lines, are ignored.
*/

use std::collections::HashMap;
use std::path::Path;

use crate::registry::builder::{AssertOp, Builder};
use crate::registry::AtomRegistry;
use crate::types::err::ParseError;
use crate::types::{AffineExpr, Cid, CondId, Pid, Sense, Sid};

pub struct Fixture {
    pub registry: AtomRegistry,
    pub names: HashMap<String, Sid>,
    pub guesses: Vec<(Sid, bool)>,
}

pub fn parse_fixture(path: &Path) -> Result<Fixture, ParseError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| ParseError::Malformed(format!("could not read {}: {e}", path.display())))?;

    let mut registry = AtomRegistry::new();
    let mut builder = Builder::new(&mut registry);
    let mut names: HashMap<String, Sid> = HashMap::new();
    let mut guesses: Vec<(Sid, bool)> = Vec::new();

    let mut next_cid: i64 = 1;
    let mut next_sid: i32 = 1;

    for (lineno, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut tokens = line.split_whitespace();
        let keyword = tokens.next().unwrap();

        let err = |msg: String| ParseError::Malformed(format!("line {}: {msg}", lineno + 1));

        match keyword {
            "dom" => {
                let pid = next_token(&mut tokens, &err)?;
                let name = next_token(&mut tokens, &err)?;
                let var = next_token(&mut tokens, &err)?;
                let lower = next_f64(&mut tokens, &err)?;
                let upper = next_f64(&mut tokens, &err)?;

                let cid = Cid(next_cid);
                next_cid += 1;
                let sid = Sid(next_sid);
                next_sid += 1;
                builder
                    .dom(cid, sid, Pid::from(pid.as_str()), var.into(), lower, upper)
                    .map_err(|e| err(e.to_string()))?;
                names.insert(name, sid);
            }

            "sum" => {
                let pid = next_token(&mut tokens, &err)?;
                let name = next_token(&mut tokens, &err)?;
                let op = next_token(&mut tokens, &err)?;
                let bound = next_f64(&mut tokens, &err)?;
                let expr = parse_terms(&mut tokens, &err)?;
                let sense = parse_sum_sense(&op)?;

                let cid = Cid(next_cid);
                next_cid += 1;
                let sid = Sid(next_sid);
                next_sid += 1;
                let mut expr_by_condition = HashMap::new();
                expr_by_condition.insert(CondId::TRUE, expr);
                builder
                    .sum(cid, sid, Pid::from(pid.as_str()), sense, bound, expr_by_condition)
                    .map_err(|e| err(e.to_string()))?;
                names.insert(name, sid);
            }

            "assert" => {
                let pid = next_token(&mut tokens, &err)?;
                let name = next_token(&mut tokens, &err)?;
                let op = next_token(&mut tokens, &err)?;
                let bound = next_f64(&mut tokens, &err)?;
                let expr = parse_terms(&mut tokens, &err)?;
                let assert_op = parse_assert_op(&op)?;

                let cid = Cid(next_cid);
                next_cid += 1;
                let sid = Sid(next_sid);
                next_sid += 1;
                let mut expr_by_condition = HashMap::new();
                expr_by_condition.insert(CondId::TRUE, expr);
                builder
                    .assert(cid, sid, Pid::from(pid.as_str()), assert_op, bound, expr_by_condition)
                    .map_err(|e| err(e.to_string()))?;
                names.insert(name, sid);
            }

            "minimize" | "maximize" => {
                let pid = next_token(&mut tokens, &err)?;
                let name = next_token(&mut tokens, &err)?;
                let weight: i64 = next_token(&mut tokens, &err)?
                    .parse()
                    .map_err(|_| ParseError::NonNumericLiteral(name.clone()))?;
                let expr = parse_terms(&mut tokens, &err)?;

                let cid = Cid(next_cid);
                next_cid += 1;
                let sid = Sid(next_sid);
                next_sid += 1;
                let mut expr_by_condition = HashMap::new();
                expr_by_condition.insert(CondId::TRUE, expr);
                builder
                    .objective(cid, sid, Pid::from(pid.as_str()), keyword == "maximize", weight, expr_by_condition)
                    .map_err(|e| err(e.to_string()))?;
                names.insert(name, sid);
            }

            "guess" => {
                let name = next_token(&mut tokens, &err)?;
                let truth = next_token(&mut tokens, &err)?;
                let truth = match truth.as_str() {
                    "true" => true,
                    "false" => false,
                    other => return Err(err(format!("expected true/false, found {other}"))),
                };
                let sid = *names
                    .get(&name)
                    .ok_or_else(|| err(format!("guess of undeclared atom {name}")))?;
                guesses.push((sid, truth));
            }

            other => return Err(err(format!("unknown fixture directive {other}"))),
        }
    }

    Ok(Fixture { registry, names, guesses })
}

fn next_token(
    tokens: &mut std::str::SplitWhitespace,
    err: &impl Fn(String) -> ParseError,
) -> Result<String, ParseError> {
    tokens
        .next()
        .map(str::to_string)
        .ok_or_else(|| err("unexpected end of line".to_string()))
}

fn next_f64(
    tokens: &mut std::str::SplitWhitespace,
    err: &impl Fn(String) -> ParseError,
) -> Result<f64, ParseError> {
    let tok = next_token(tokens, err)?;
    tok.parse().map_err(|_| ParseError::NonNumericLiteral(tok))
}

fn parse_terms(
    tokens: &mut std::str::SplitWhitespace,
    err: &impl Fn(String) -> ParseError,
) -> Result<AffineExpr, ParseError> {
    let mut expr = AffineExpr::new();
    let rest: Vec<&str> = tokens.collect();
    if rest.is_empty() || rest.len() % 2 != 0 {
        return Err(err("expected a non-empty sequence of <coeff> <var> pairs".to_string()));
    }
    for pair in rest.chunks(2) {
        let coeff: f64 = pair[0]
            .parse()
            .map_err(|_| ParseError::NonNumericLiteral(pair[0].to_string()))?;
        expr.push((coeff, pair[1].into()));
    }
    Ok(expr)
}

fn parse_sum_sense(op: &str) -> Result<Sense, ParseError> {
    match op {
        "=" => Ok(Sense::Eq),
        ">=" => Ok(Sense::Ge),
        "<=" => Ok(Sense::Le),
        other => Err(ParseError::UnknownOperator(other.to_string())),
    }
}

fn parse_assert_op(op: &str) -> Result<AssertOp, ParseError> {
    match op {
        "=" => Ok(AssertOp::Eq),
        ">=" => Ok(AssertOp::Ge),
        "<=" => Ok(AssertOp::Le),
        "<" => Ok(AssertOp::Lt),
        ">" => Ok(AssertOp::Gt),
        other => Err(ParseError::UnknownOperator(other.to_string())),
    }
}
