//! Splits template source into text and action items.

use super::{Delimiters, SyntaxError};
use serde_json::{Number, Value};

/// A lexed piece of template source.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Item {
    /// Literal text between actions.
    Text(String),
    /// The tokens of one `{{ ... }}` action.
    Action { tokens: Vec<Token>, line: usize },
}

/// A token inside an action.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    /// `.`
    Dot,
    /// `.a.b`
    Field(Vec<String>),
    /// Keyword or function name.
    Ident(String),
    /// Constant value: string, number, bool or nil.
    Literal(Value),
    /// `|`
    Pipe,
}

pub(crate) fn lex(source: &str, delims: &Delimiters) -> Result<Vec<Item>, SyntaxError> {
    let left = delims.left.as_str();
    let right = delims.right.as_str();

    let mut items = Vec::new();
    let mut rest = source;
    let mut line = 1;
    let mut trim_next = false;

    loop {
        let Some(start) = rest.find(left) else {
            push_text(&mut items, rest, trim_next, false);
            return Ok(items);
        };

        let after = &rest[start + left.len()..];
        let trim_left = has_trim_marker(after);
        push_text(&mut items, &rest[..start], trim_next, trim_left);
        line += rest[..start].matches('\n').count();

        let body = if trim_left { &after[1..] } else { after };
        let action = lex_action(body, right, line)?;
        line += body[..action.consumed].matches('\n').count();

        if !action.tokens.is_empty() || !action.comment {
            items.push(Item::Action {
                tokens: action.tokens,
                line,
            });
        }

        trim_next = action.trim_right;
        rest = &body[action.consumed..];
    }
}

fn push_text(items: &mut Vec<Item>, text: &str, trim_start: bool, trim_end: bool) {
    let mut text = text;
    if trim_start {
        text = text.trim_start();
    }
    if trim_end {
        text = text.trim_end();
    }
    if !text.is_empty() {
        items.push(Item::Text(text.to_string()));
    }
}

/// `{{- ` trims preceding whitespace; the dash must be followed by a space.
fn has_trim_marker(after_left: &str) -> bool {
    let mut chars = after_left.chars();
    chars.next() == Some('-') && chars.next().is_some_and(char::is_whitespace)
}

struct Action {
    tokens: Vec<Token>,
    comment: bool,
    trim_right: bool,
    /// Bytes consumed, including the right delimiter.
    consumed: usize,
}

fn lex_action(body: &str, right: &str, line: usize) -> Result<Action, SyntaxError> {
    let err = |message: String| SyntaxError { line, message };

    let mut tokens = Vec::new();
    let mut comment = false;
    let mut pos = 0;

    loop {
        let rest = &body[pos..];
        let trimmed = rest.trim_start();
        let skipped = rest.len() - trimmed.len();

        if skipped > 0 {
            if let Some(after_dash) = trimmed.strip_prefix('-') {
                if after_dash.starts_with(right) {
                    return Ok(Action {
                        tokens,
                        comment,
                        trim_right: true,
                        consumed: pos + skipped + 1 + right.len(),
                    });
                }
            }
        }
        pos += skipped;
        let rest = &body[pos..];

        if rest.is_empty() {
            return Err(err("unclosed action".into()));
        }
        if rest.starts_with(right) {
            return Ok(Action {
                tokens,
                comment,
                trim_right: false,
                consumed: pos + right.len(),
            });
        }

        if let Some(inner) = rest.strip_prefix("/*") {
            let Some(end) = inner.find("*/") else {
                return Err(err("unclosed comment".into()));
            };
            comment = true;
            pos += 2 + end + 2;
            continue;
        }

        let c = rest.chars().next().unwrap_or_default();
        match c {
            '|' => {
                tokens.push(Token::Pipe);
                pos += 1;
            }
            '"' => {
                let (value, len) = lex_quoted(rest).map_err(err)?;
                tokens.push(Token::Literal(Value::String(value)));
                pos += len;
            }
            '`' => {
                let Some(end) = rest[1..].find('`') else {
                    return Err(err("unterminated raw quoted string".into()));
                };
                tokens.push(Token::Literal(Value::String(rest[1..1 + end].to_string())));
                pos += end + 2;
            }
            '.' => {
                let len = word_len(&rest[1..]);
                if len == 0 {
                    tokens.push(Token::Dot);
                    pos += 1;
                } else {
                    let mut fields = Vec::new();
                    let mut field_pos = 0;
                    while rest[field_pos..].starts_with('.') {
                        let len = word_len(&rest[field_pos + 1..]);
                        if len == 0 {
                            return Err(err("bad field chain".into()));
                        }
                        fields.push(rest[field_pos + 1..field_pos + 1 + len].to_string());
                        field_pos += 1 + len;
                    }
                    tokens.push(Token::Field(fields));
                    pos += field_pos;
                }
            }
            '-' | '0'..='9' => {
                let len = 1 + rest[1..]
                    .find(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '.' || ch == '_'))
                    .unwrap_or(rest.len() - 1);
                let text = &rest[..len];
                tokens.push(Token::Literal(Value::Number(parse_number(text).map_err(err)?)));
                pos += len;
            }
            c if c.is_alphabetic() || c == '_' => {
                let len = word_len(rest);
                let word = &rest[..len];
                tokens.push(match word {
                    "true" => Token::Literal(Value::Bool(true)),
                    "false" => Token::Literal(Value::Bool(false)),
                    "nil" => Token::Literal(Value::Null),
                    _ => Token::Ident(word.to_string()),
                });
                pos += len;
            }
            other => return Err(err(format!("unexpected {:?} in command", other))),
        }
    }
}

fn word_len(s: &str) -> usize {
    s.find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(s.len())
}

fn lex_quoted(s: &str) -> Result<(String, usize), String> {
    let mut value = String::new();
    let mut chars = s.char_indices().skip(1);

    while let Some((idx, c)) = chars.next() {
        match c {
            '"' => return Ok((value, idx + 1)),
            '\\' => match chars.next() {
                Some((_, 'n')) => value.push('\n'),
                Some((_, 't')) => value.push('\t'),
                Some((_, 'r')) => value.push('\r'),
                Some((_, '"')) => value.push('"'),
                Some((_, '\\')) => value.push('\\'),
                Some((_, other)) => return Err(format!("unknown escape sequence \\{}", other)),
                None => break,
            },
            '\n' => break,
            c => value.push(c),
        }
    }
    Err("unterminated quoted string".into())
}

fn parse_number(text: &str) -> Result<Number, String> {
    if let Ok(n) = text.parse::<i64>() {
        return Ok(Number::from(n));
    }
    text.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .ok_or_else(|| format!("bad number syntax: {:?}", text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_default(source: &str) -> Vec<Item> {
        lex(source, &Delimiters::default()).unwrap()
    }

    fn tokens(source: &str) -> Vec<Token> {
        match lex_default(source).into_iter().next() {
            Some(Item::Action { tokens, .. }) => tokens,
            other => panic!("expected action, got {other:?}"),
        }
    }

    #[test]
    fn text_and_actions() {
        let items = lex_default("<p>{{.}}</p>");
        assert_eq!(items.len(), 3);
        assert_eq!(items[0], Item::Text("<p>".into()));
        assert_eq!(
            items[1],
            Item::Action {
                tokens: vec![Token::Dot],
                line: 1
            }
        );
        assert_eq!(items[2], Item::Text("</p>".into()));
    }

    #[test]
    fn field_chains_and_literals() {
        assert_eq!(
            tokens(r#"{{ printf .user.name "x\n" 42 -1.5 true nil }}"#),
            vec![
                Token::Ident("printf".into()),
                Token::Field(vec!["user".into(), "name".into()]),
                Token::Literal(Value::String("x\n".into())),
                Token::Literal(Value::from(42)),
                Token::Literal(Value::from(-1.5)),
                Token::Literal(Value::Bool(true)),
                Token::Literal(Value::Null),
            ]
        );
    }

    #[test]
    fn pipes_and_raw_strings() {
        assert_eq!(
            tokens("{{ `raw \\n` | print }}"),
            vec![
                Token::Literal(Value::String("raw \\n".into())),
                Token::Pipe,
                Token::Ident("print".into()),
            ]
        );
    }

    #[test]
    fn trim_markers_eat_whitespace() {
        let items = lex_default("a  \n {{- .x -}} \n b");
        assert_eq!(items[0], Item::Text("a".into()));
        assert_eq!(items[2], Item::Text("b".into()));
    }

    #[test]
    fn dash_without_space_is_a_number() {
        assert_eq!(tokens("{{-3}}"), vec![Token::Literal(Value::from(-3))]);
    }

    #[test]
    fn comments_are_dropped() {
        let items = lex_default("a{{/* note */}}b");
        assert_eq!(items, vec![Item::Text("a".into()), Item::Text("b".into())]);
    }

    #[test]
    fn lines_are_tracked() {
        let items = lex_default("one\ntwo\n{{.}}");
        match &items[1] {
            Item::Action { line, .. } => assert_eq!(*line, 3),
            other => panic!("expected action, got {other:?}"),
        }
    }

    #[test]
    fn custom_delimiters() {
        let delims = Delimiters::new("<%", "%>").unwrap();
        let items = lex("{{ kept }}<% .x %>", &delims).unwrap();
        assert_eq!(items[0], Item::Text("{{ kept }}".into()));
        assert_eq!(
            items[1],
            Item::Action {
                tokens: vec![Token::Field(vec!["x".into()])],
                line: 1
            }
        );
    }

    #[test]
    fn unclosed_action_fails() {
        let err = lex("{{ .x ", &Delimiters::default()).unwrap_err();
        assert!(err.message.contains("unclosed action"));
    }

    #[test]
    fn unterminated_string_fails() {
        assert!(lex(r#"{{ "abc }}"#, &Delimiters::default()).is_err());
    }
}
