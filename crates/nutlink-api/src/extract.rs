// Payload extraction.
//
// Every payload line is tokenized first (whitespace separated, double
// quotes group, backslash escapes inside quotes), then the tokens upsd
// echoes from the request are matched and dropped. What remains is the
// payload proper.

use indexmap::IndexMap;

use crate::error::Error;
use crate::grammar::CommandLine;
use crate::models::{ClientList, VarType};

/// One whitespace- or quote-delimited field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    /// `true` when the field was wrapped in double quotes on the wire.
    pub quoted: bool,
}

/// Split a line into tokens.
///
/// An unterminated quote runs to the end of the line.
pub fn tokenize(line: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        let mut text = String::new();
        if c == '"' {
            chars.next();
            while let Some(c) = chars.next() {
                match c {
                    '\\' => {
                        if let Some(escaped) = chars.next() {
                            text.push(escaped);
                        }
                    }
                    '"' => break,
                    _ => text.push(c),
                }
            }
            tokens.push(Token { text, quoted: true });
        } else {
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                text.push(c);
                chars.next();
            }
            tokens.push(Token {
                text,
                quoted: false,
            });
        }
    }
    tokens
}

/// Echo tokens for the lines of a reply to `request`: the sub-command and
/// its parameters, decoded the same way payload lines are.
pub fn echo_of(request: &CommandLine) -> Vec<String> {
    tokenize(&request.echo_tokens().join(" "))
        .into_iter()
        .map(|t| t.text)
        .collect()
}

/// Drop the leading tokens that echo the request.
pub fn strip_echo<'a>(
    request: &CommandLine,
    echo: &[String],
    line: &str,
    tokens: &'a [Token],
) -> Result<&'a [Token], Error> {
    let matches = tokens.len() >= echo.len()
        && tokens
            .iter()
            .zip(echo)
            .all(|(token, expected)| token.text == *expected);
    if matches {
        Ok(&tokens[echo.len()..])
    } else {
        Err(Error::UnexpectedResponse {
            request: request.redacted(),
            raw: line.to_owned(),
        })
    }
}

fn payload(request: &CommandLine, echo: &[String], line: &str) -> Result<Vec<Token>, Error> {
    let tokens = tokenize(line);
    strip_echo(request, echo, line, &tokens).map(<[Token]>::to_vec)
}

fn first_quoted(tokens: &[Token]) -> Option<&str> {
    tokens.iter().find(|t| t.quoted).map(|t| t.text.as_str())
}

// ── Block extractors ────────────────────────────────────────────────

/// `<name> "<value>"` lines into an ordered map (LIST UPS, VAR, RW).
///
/// Lines without a quoted value are skipped.
pub fn key_values(
    request: &CommandLine,
    lines: &[String],
) -> Result<IndexMap<String, String>, Error> {
    let echo = echo_of(request);
    let mut map = IndexMap::with_capacity(lines.len());
    for line in lines {
        let tokens = payload(request, &echo, line)?;
        let Some(value) = first_quoted(&tokens) else {
            continue;
        };
        if let Some(name) = tokens.first().filter(|t| !t.quoted) {
            map.insert(name.text.clone(), value.to_owned());
        }
    }
    Ok(map)
}

/// Bare names, one per line (LIST CMD).
pub fn names(request: &CommandLine, lines: &[String]) -> Result<Vec<String>, Error> {
    let echo = echo_of(request);
    let mut out = Vec::with_capacity(lines.len());
    for line in lines {
        let tokens = payload(request, &echo, line)?;
        if let Some(first) = tokens.into_iter().next() {
            out.push(first.text);
        }
    }
    Ok(out)
}

/// One quoted value per line (LIST ENUM).
pub fn quoted_values(request: &CommandLine, lines: &[String]) -> Result<Vec<String>, Error> {
    let echo = echo_of(request);
    let mut out = Vec::with_capacity(lines.len());
    for line in lines {
        let tokens = payload(request, &echo, line)?;
        if let Some(value) = first_quoted(&tokens) {
            out.push(value.to_owned());
        }
    }
    Ok(out)
}

/// Two quoted values per line (LIST RANGE).
pub fn ranges(request: &CommandLine, lines: &[String]) -> Result<Vec<(String, String)>, Error> {
    let echo = echo_of(request);
    let mut out = Vec::with_capacity(lines.len());
    for line in lines {
        let tokens = payload(request, &echo, line)?;
        let mut quoted = tokens.iter().filter(|t| t.quoted);
        if let (Some(min), Some(max)) = (quoted.next(), quoted.next()) {
            out.push((min.text.clone(), max.text.clone()));
        }
    }
    Ok(out)
}

/// `CLIENT <host> <device>` lines grouped per device (LIST CLIENTS).
pub fn clients(request: &CommandLine, lines: &[String]) -> Result<ClientList, Error> {
    let echo = vec!["CLIENT".to_owned()];
    let mut out = ClientList::new();
    for line in lines {
        let tokens = payload(request, &echo, line)?;
        if let [host, device, ..] = tokens.as_slice() {
            out.entry(device.text.clone())
                .or_default()
                .push(host.text.clone());
        }
    }
    Ok(out)
}

// ── Single-line extractors ──────────────────────────────────────────

/// The quoted value of a `GET` reply.
pub fn single_value(request: &CommandLine, line: &str) -> Result<String, Error> {
    let tokens = payload(request, &echo_of(request), line)?;
    first_quoted(&tokens)
        .map(str::to_owned)
        .ok_or_else(|| Error::MissingQuotedValue {
            line: line.to_owned(),
        })
}

/// The integer field of a `GET NUMLOGINS` reply.
pub fn single_number(request: &CommandLine, line: &str) -> Result<u64, Error> {
    let tokens = payload(request, &echo_of(request), line)?;
    tokens
        .first()
        .and_then(|t| t.text.parse().ok())
        .ok_or_else(|| Error::MalformedNumericField {
            line: line.to_owned(),
        })
}

/// The type words of a `GET TYPE` reply.
pub fn var_type(request: &CommandLine, line: &str) -> Result<VarType, Error> {
    let tokens = payload(request, &echo_of(request), line)?;
    VarType::from_words(tokens.iter().map(|t| t.text.as_str())).map_err(|_| {
        Error::MalformedNumericField {
            line: line.to_owned(),
        }
    })
}

/// The command words of a `HELP` reply (`Commands: HELP VER ...`).
pub fn help_commands(line: &str) -> Vec<String> {
    let body = line
        .trim()
        .strip_prefix("Commands:")
        .unwrap_or(line);
    body.split_whitespace().map(str::to_owned).collect()
}

/// Require a bare `OK` acknowledgement.
pub fn expect_ok(request: &CommandLine, line: &str) -> Result<(), Error> {
    if line.trim() == "OK" {
        Ok(())
    } else {
        Err(Error::UnexpectedResponse {
            request: request.redacted(),
            raw: line.to_owned(),
        })
    }
}
