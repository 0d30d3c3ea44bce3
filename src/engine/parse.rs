//! Builds template trees from lexed items.

use super::lexer::{Item, Token};
use super::SyntaxError;
use serde_json::Value;
use std::collections::HashSet;

/// A node of a parsed template.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    Text(String),
    Action(Pipeline),
    If {
        cond: Pipeline,
        then: Vec<Node>,
        otherwise: Vec<Node>,
    },
    Range {
        pipe: Pipeline,
        body: Vec<Node>,
        otherwise: Vec<Node>,
    },
    With {
        pipe: Pipeline,
        body: Vec<Node>,
        otherwise: Vec<Node>,
    },
    Template {
        name: String,
        pipe: Option<Pipeline>,
    },
}

/// Commands joined by `|`; each result feeds the next as its last argument.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Pipeline {
    pub commands: Vec<Command>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Command {
    pub args: Vec<Arg>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Arg {
    Dot,
    Field(Vec<String>),
    Func(String),
    Literal(Value),
}

/// A parsed source: its body plus every `define`/`block` it declared.
#[derive(Debug, Default)]
pub(crate) struct Parsed {
    pub body: Vec<Node>,
    pub defines: Vec<(String, Vec<Node>)>,
}

/// Whether a tree renders nothing but whitespace.
pub(crate) fn is_empty_tree(nodes: &[Node]) -> bool {
    nodes.iter().all(|node| match node {
        Node::Text(text) => text.trim().is_empty(),
        _ => false,
    })
}

/// How a list of nodes ended.
enum Stop {
    Eof,
    End,
    Else,
    ElseIf(Pipeline),
}

struct Parser<'a> {
    items: std::vec::IntoIter<Item>,
    is_func: &'a dyn Fn(&str) -> bool,
    defines: Vec<(String, Vec<Node>)>,
    line: usize,
}

pub(crate) fn parse(items: Vec<Item>, is_func: &dyn Fn(&str) -> bool) -> Result<Parsed, SyntaxError> {
    let mut parser = Parser {
        items: items.into_iter(),
        is_func,
        defines: Vec::new(),
        line: 1,
    };

    let (body, stop) = parser.list(true)?;
    match stop {
        Stop::Eof => {}
        Stop::End => return Err(parser.error("unexpected {{end}}")),
        Stop::Else | Stop::ElseIf(_) => return Err(parser.error("unexpected {{else}}")),
    }

    let mut defined = HashSet::new();
    for (name, body) in &parser.defines {
        if !is_empty_tree(body) && !defined.insert(name.as_str()) {
            return Err(parser.error(&format!("multiple definition of template \"{}\"", name)));
        }
    }

    Ok(Parsed {
        body,
        defines: parser.defines,
    })
}

impl Parser<'_> {
    fn error(&self, message: &str) -> SyntaxError {
        SyntaxError {
            line: self.line,
            message: message.to_string(),
        }
    }

    fn list(&mut self, top: bool) -> Result<(Vec<Node>, Stop), SyntaxError> {
        let mut nodes = Vec::new();

        while let Some(item) = self.items.next() {
            let (tokens, line) = match item {
                Item::Text(text) => {
                    nodes.push(Node::Text(text));
                    continue;
                }
                Item::Action { tokens, line } => (tokens, line),
            };
            self.line = line;

            let keyword = match tokens.first() {
                Some(Token::Ident(word)) => word.as_str(),
                Some(_) => "",
                None => return Err(self.error("missing value for command")),
            };

            match keyword {
                "end" => {
                    self.expect_len(&tokens, 1, "end")?;
                    return Ok((nodes, Stop::End));
                }
                "else" => {
                    return match tokens.get(1) {
                        None => Ok((nodes, Stop::Else)),
                        Some(Token::Ident(word)) if word == "if" => {
                            Ok((nodes, Stop::ElseIf(self.pipeline(&tokens[2..])?)))
                        }
                        Some(_) => Err(self.error("unexpected token after else")),
                    };
                }
                "if" => {
                    let cond = self.pipeline(&tokens[1..])?;
                    nodes.push(self.if_node(cond)?);
                }
                "range" | "with" => {
                    let pipe = self.pipeline(&tokens[1..])?;
                    let (body, otherwise) = self.branches(keyword)?;
                    nodes.push(if keyword == "range" {
                        Node::Range {
                            pipe,
                            body,
                            otherwise,
                        }
                    } else {
                        Node::With {
                            pipe,
                            body,
                            otherwise,
                        }
                    });
                }
                "define" => {
                    if !top {
                        return Err(self.error("define must be at the top level"));
                    }
                    let name = self.template_name(&tokens, "define")?;
                    self.expect_len(&tokens, 2, "define")?;
                    let body = self.block_body("define")?;
                    self.defines.push((name, body));
                }
                "block" => {
                    let name = self.template_name(&tokens, "block")?;
                    let pipe = self.optional_pipeline(&tokens[2..])?;
                    let body = self.block_body("block")?;
                    self.defines.push((name.clone(), body));
                    nodes.push(Node::Template { name, pipe });
                }
                "template" => {
                    let name = self.template_name(&tokens, "template")?;
                    let pipe = self.optional_pipeline(&tokens[2..])?;
                    nodes.push(Node::Template { name, pipe });
                }
                _ => nodes.push(Node::Action(self.pipeline(&tokens)?)),
            }
        }

        Ok((nodes, Stop::Eof))
    }

    fn if_node(&mut self, cond: Pipeline) -> Result<Node, SyntaxError> {
        let (then, stop) = self.list(false)?;
        let otherwise = match stop {
            Stop::End => Vec::new(),
            Stop::Else => {
                let (otherwise, stop) = self.list(false)?;
                match stop {
                    Stop::End => otherwise,
                    _ => return Err(self.error("expected {{end}} after {{else}}")),
                }
            }
            Stop::ElseIf(cond) => vec![self.if_node(cond)?],
            Stop::Eof => return Err(self.error("unexpected EOF in if")),
        };
        Ok(Node::If {
            cond,
            then,
            otherwise,
        })
    }

    fn branches(&mut self, keyword: &str) -> Result<(Vec<Node>, Vec<Node>), SyntaxError> {
        let (body, stop) = self.list(false)?;
        match stop {
            Stop::End => Ok((body, Vec::new())),
            Stop::Else => match self.list(false)? {
                (otherwise, Stop::End) => Ok((body, otherwise)),
                _ => Err(self.error(&format!("expected {{{{end}}}} in {}", keyword))),
            },
            Stop::ElseIf(_) => Err(self.error(&format!("else if is not allowed in {}", keyword))),
            Stop::Eof => Err(self.error(&format!("unexpected EOF in {}", keyword))),
        }
    }

    fn block_body(&mut self, keyword: &str) -> Result<Vec<Node>, SyntaxError> {
        match self.list(false)? {
            (body, Stop::End) => Ok(body),
            (_, Stop::Eof) => Err(self.error(&format!("unexpected EOF in {}", keyword))),
            _ => Err(self.error(&format!("unexpected {{{{else}}}} in {}", keyword))),
        }
    }

    fn template_name(&self, tokens: &[Token], keyword: &str) -> Result<String, SyntaxError> {
        match tokens.get(1) {
            Some(Token::Literal(Value::String(name))) => Ok(name.clone()),
            _ => Err(self.error(&format!("{} requires a quoted template name", keyword))),
        }
    }

    fn expect_len(&self, tokens: &[Token], len: usize, keyword: &str) -> Result<(), SyntaxError> {
        if tokens.len() == len {
            Ok(())
        } else {
            Err(self.error(&format!("unexpected arguments in {}", keyword)))
        }
    }

    fn optional_pipeline(&self, tokens: &[Token]) -> Result<Option<Pipeline>, SyntaxError> {
        if tokens.is_empty() {
            Ok(None)
        } else {
            self.pipeline(tokens).map(Some)
        }
    }

    fn pipeline(&self, tokens: &[Token]) -> Result<Pipeline, SyntaxError> {
        if tokens.is_empty() {
            return Err(self.error("missing value for command"));
        }

        let mut commands = Vec::new();
        for segment in tokens.split(|token| *token == Token::Pipe) {
            if segment.is_empty() {
                return Err(self.error("missing command in pipeline"));
            }
            let args = segment
                .iter()
                .map(|token| self.arg(token))
                .collect::<Result<Vec<_>, _>>()?;
            if args.len() > 1 && !matches!(args[0], Arg::Func(_)) {
                return Err(self.error("can't give argument to non-function"));
            }
            commands.push(Command { args });
        }

        if commands[1..]
            .iter()
            .any(|command| !matches!(command.args[0], Arg::Func(_)))
        {
            return Err(self.error("non-function command in pipeline"));
        }

        Ok(Pipeline { commands })
    }

    fn arg(&self, token: &Token) -> Result<Arg, SyntaxError> {
        match token {
            Token::Dot => Ok(Arg::Dot),
            Token::Field(fields) => Ok(Arg::Field(fields.clone())),
            Token::Literal(value) => Ok(Arg::Literal(value.clone())),
            Token::Ident(name) if (self.is_func)(name) => Ok(Arg::Func(name.clone())),
            Token::Ident(name) => Err(self.error(&format!("function \"{}\" not defined", name))),
            Token::Pipe => Err(self.error("unexpected |")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::lexer::lex;
    use crate::engine::Delimiters;

    fn parse_src(source: &str) -> Result<Parsed, SyntaxError> {
        let items = lex(source, &Delimiters::default())?;
        parse(items, &|name: &str| matches!(name, "upper" | "print"))
    }

    #[test]
    fn define_is_split_from_body() {
        let parsed = parse_src(r#"a{{define "x"}}inner{{end}}b"#).unwrap();
        assert_eq!(
            parsed.body,
            vec![Node::Text("a".into()), Node::Text("b".into())]
        );
        assert_eq!(parsed.defines.len(), 1);
        assert_eq!(parsed.defines[0].0, "x");
    }

    #[test]
    fn block_defines_and_calls() {
        let parsed = parse_src(r#"<{{block "content" .}}default{{end}}>"#).unwrap();
        assert_eq!(parsed.defines[0].0, "content");
        assert!(matches!(
            &parsed.body[1],
            Node::Template { name, pipe: Some(_) } if name == "content"
        ));
    }

    #[test]
    fn else_if_nests() {
        let parsed = parse_src("{{if .a}}A{{else if .b}}B{{else}}C{{end}}").unwrap();
        match &parsed.body[0] {
            Node::If { otherwise, .. } => {
                assert!(matches!(&otherwise[0], Node::If { otherwise, .. } if otherwise.len() == 1))
            }
            other => panic!("expected if, got {other:?}"),
        }
    }

    #[test]
    fn pipelines_require_functions() {
        assert!(parse_src("{{ .name | upper }}").is_ok());
        let err = parse_src("{{ .name | lower }}").unwrap_err();
        assert!(err.message.contains("\"lower\" not defined"));
        assert!(parse_src("{{ .name .other }}").is_err());
    }

    #[test]
    fn nested_define_rejected() {
        let err = parse_src(r#"{{if .}}{{define "x"}}{{end}}{{end}}"#).unwrap_err();
        assert!(err.message.contains("top level"));
    }

    #[test]
    fn stray_end_rejected() {
        assert!(parse_src("{{end}}").is_err());
        assert!(parse_src("{{else}}").is_err());
        assert!(parse_src("{{if .}}never closed").is_err());
    }

    #[test]
    fn duplicate_non_empty_define_rejected() {
        let err =
            parse_src(r#"{{define "x"}}1{{end}}{{define "x"}}2{{end}}"#).unwrap_err();
        assert!(err.message.contains("multiple definition"));
        assert!(parse_src(r#"{{define "x"}}1{{end}}{{define "x"}}{{end}}"#).is_ok());
    }

    #[test]
    fn empty_tree_detection() {
        assert!(is_empty_tree(&[Node::Text(" \n ".into())]));
        assert!(is_empty_tree(&[]));
        assert!(!is_empty_tree(&[Node::Template {
            name: "x".into(),
            pipe: None
        }]));
    }
}
