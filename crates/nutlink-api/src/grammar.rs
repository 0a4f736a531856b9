// Command grammar: which request lines this client is willing to send.
//
// The table is a `static` built at compile time and shared by reference.
// Validation is purely local; nothing here touches the network.

use std::fmt;

use crate::error::Error;

/// Marker used in sub-command patterns for "one trailing parameter".
const PARAM: &str = "%";

/// One top-level command and the sub-command patterns it accepts.
///
/// An empty `subcommands` slice means the command takes no arguments at all.
/// A pattern of `"%"` means the command takes one free parameter directly
/// (`INSTCMD`, `USERNAME`); `"VAR %"` means the `VAR` sub-command followed by
/// a parameter; a bare `"UPS"` is a sub-command with no parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpec {
    pub name: &'static str,
    pub subcommands: &'static [&'static str],
    /// upsd answers this command but leaves it out of its HELP text, so the
    /// server listing is not consulted for it.
    pub unlisted: bool,
}

impl CommandSpec {
    pub const fn new(name: &'static str, subcommands: &'static [&'static str]) -> Self {
        Self {
            name,
            subcommands,
            unlisted: false,
        }
    }

    pub const fn unlisted(name: &'static str) -> Self {
        Self {
            name,
            subcommands: &[],
            unlisted: true,
        }
    }
}

/// The client-side supported command set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grammar {
    commands: &'static [CommandSpec],
}

static STANDARD: Grammar = Grammar {
    commands: &[
        CommandSpec::new("HELP", &[]),
        CommandSpec::new("VER", &[]),
        CommandSpec::unlisted("PROTVER"),
        CommandSpec::unlisted("NETVER"),
        CommandSpec::new("LOGOUT", &[]),
        CommandSpec::new(
            "LIST",
            &[
                "UPS",
                "VAR %",
                "RW %",
                "CMD %",
                "ENUM %",
                "RANGE %",
                "CLIENTS",
                "CLIENTS %",
            ],
        ),
        CommandSpec::new(
            "GET",
            &[
                "VAR %",
                "TYPE %",
                "DESC %",
                "CMDDESC %",
                "UPSDESC %",
                "NUMLOGINS %",
            ],
        ),
        CommandSpec::new("SET", &["VAR %"]),
        CommandSpec::new("INSTCMD", &[PARAM]),
        CommandSpec::new("USERNAME", &[PARAM]),
        CommandSpec::new("PASSWORD", &[PARAM]),
    ],
};

impl Grammar {
    /// The process-wide grammar every client uses unless told otherwise.
    pub fn standard() -> &'static Self {
        &STANDARD
    }

    /// Build a grammar from a custom table.
    pub const fn from_table(commands: &'static [CommandSpec]) -> Self {
        Self { commands }
    }

    pub fn command(&self, name: &str) -> Option<&CommandSpec> {
        self.commands.iter().find(|c| c.name == name)
    }

    pub fn commands(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.commands.iter().map(|c| c.name)
    }

    /// Check a parsed command line.
    ///
    /// `server_commands` is the HELP listing; `None` skips the server check
    /// (used while that listing is itself being fetched).
    pub fn validate(
        &self,
        line: &CommandLine,
        server_commands: Option<&[String]>,
    ) -> Result<(), Error> {
        let main = line.main.as_str();
        let spec = self.command(main);

        if let Some(server) = server_commands {
            let unlisted = spec.is_some_and(|s| s.unlisted);
            if !unlisted && !server.iter().any(|c| c == main) {
                return Err(Error::UnsupportedByServer {
                    command: main.to_owned(),
                });
            }
        }

        let spec = spec.ok_or_else(|| Error::UnsupportedByClient {
            command: main.to_owned(),
        })?;

        let accepted = match (line.sub.as_deref(), line.has_param()) {
            (None, _) => spec.subcommands.is_empty(),
            // A single-word argument is either a bare sub-command or the free
            // parameter of a command like INSTCMD.
            (Some(sub), false) => spec
                .subcommands
                .iter()
                .any(|pattern| *pattern == sub || *pattern == PARAM),
            (Some(sub), true) => spec.subcommands.iter().any(|pattern| {
                *pattern == PARAM
                    || pattern
                        .strip_suffix(PARAM)
                        .and_then(|head| head.strip_suffix(' '))
                        .is_some_and(|head| head == sub)
            }),
        };

        if accepted {
            Ok(())
        } else {
            Err(Error::UnsupportedSubcommand {
                command: main.to_owned(),
                subcommand: line.sub.clone().unwrap_or_default(),
            })
        }
    }
}

/// A request split into `MAIN [SUB [PARAM...]]`.
///
/// `params` holds the already-encoded wire tokens after the sub-command;
/// `SET VAR ups var "a b"` carries two of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub main: String,
    pub sub: Option<String>,
    pub params: Vec<String>,
}

impl CommandLine {
    pub fn new(main: impl Into<String>) -> Self {
        Self {
            main: main.into(),
            sub: None,
            params: Vec::new(),
        }
    }

    #[must_use]
    pub fn sub(mut self, sub: impl Into<String>) -> Self {
        self.sub = Some(sub.into());
        self
    }

    /// Append one argument, quoting it for the wire if needed.
    ///
    /// On a line with no sub-command yet, the first argument takes that
    /// slot, the same way [`parse`](Self::parse) splits `INSTCMD ups cmd`.
    /// Arguments containing CR or LF are refused: they would put a second
    /// request on the wire.
    pub fn arg(mut self, name: &'static str, value: &str) -> Result<Self, Error> {
        let encoded = encode_argument(name, value)?;
        if self.sub.is_none() {
            self.sub = Some(encoded);
        } else {
            self.params.push(encoded);
        }
        Ok(self)
    }

    pub fn has_param(&self) -> bool {
        !self.params.is_empty()
    }

    /// Parse a raw request line. Whitespace-separated, no quoting.
    pub fn parse(raw: &str) -> Result<Self, Error> {
        if raw.contains(['\r', '\n']) {
            return Err(Error::InvalidCommand {
                reason: "embedded line break".into(),
            });
        }
        let mut words = raw.split_whitespace();
        let main = words.next().ok_or_else(|| Error::InvalidCommand {
            reason: "empty command".into(),
        })?;
        Ok(Self {
            main: main.to_owned(),
            sub: words.next().map(str::to_owned),
            params: words.map(str::to_owned).collect(),
        })
    }

    /// The tokens upsd echoes back ahead of each payload line:
    /// the sub-command followed by its parameters.
    pub fn echo_tokens(&self) -> Vec<&str> {
        self.sub
            .iter()
            .chain(self.params.iter())
            .map(String::as_str)
            .collect()
    }

    /// The request text upsd echoes on `BEGIN` / `END` lines.
    pub fn wire(&self) -> String {
        self.to_string()
    }

    /// Same as [`wire`](Self::wire) but safe to log.
    pub fn redacted(&self) -> String {
        if self.main == "PASSWORD" {
            "PASSWORD ********".to_owned()
        } else {
            self.wire()
        }
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.main)?;
        for part in self.echo_tokens() {
            write!(f, " {part}")?;
        }
        Ok(())
    }
}

/// Quote a value for the wire when it contains whitespace, quotes or
/// backslashes; leave plain words alone.
pub fn encode_argument(name: &'static str, value: &str) -> Result<String, Error> {
    if value.contains(['\r', '\n']) {
        return Err(Error::InvalidArgument {
            argument: name,
            reason: "contains a line break".into(),
        });
    }
    if !value.is_empty()
        && !value
            .chars()
            .any(|c| c.is_whitespace() || c == '"' || c == '\\')
    {
        return Ok(value.to_owned());
    }

    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    Ok(quoted)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn check(raw: &str) -> Result<(), Error> {
        Grammar::standard().validate(&CommandLine::parse(raw).unwrap(), None)
    }

    #[test]
    fn accepts_every_table_entry() {
        for raw in [
            "HELP",
            "VER",
            "PROTVER",
            "NETVER",
            "LOGOUT",
            "LIST UPS",
            "LIST VAR ups1",
            "LIST RW ups1",
            "LIST CMD ups1",
            "LIST ENUM ups1 input.transfer.low",
            "LIST RANGE ups1 input.transfer.low",
            "LIST CLIENTS",
            "LIST CLIENTS ups1",
            "GET VAR ups1 battery.charge",
            "GET TYPE ups1 battery.charge",
            "GET DESC ups1 battery.charge",
            "GET CMDDESC ups1 test.battery.start",
            "GET UPSDESC ups1",
            "GET NUMLOGINS ups1",
            "SET VAR ups1 ups.delay.shutdown 120",
            "INSTCMD ups1 test.battery.start",
            "USERNAME admin",
            "PASSWORD secret",
        ] {
            assert!(check(raw).is_ok(), "{raw} should validate");
        }
    }

    #[test]
    fn unknown_subcommand_is_rejected() {
        let err = check("LIST FOO ups1").unwrap_err();
        assert!(matches!(
            err,
            Error::UnsupportedSubcommand { ref command, ref subcommand }
                if command == "LIST" && subcommand == "FOO"
        ));
        assert!(err.is_local_rejection());
    }

    #[test]
    fn parameter_on_bare_subcommand_is_rejected() {
        assert!(matches!(
            check("LIST UPS extra"),
            Err(Error::UnsupportedSubcommand { .. })
        ));
    }

    #[test]
    fn missing_parameter_is_rejected() {
        assert!(matches!(
            check("LIST VAR"),
            Err(Error::UnsupportedSubcommand { .. })
        ));
        assert!(matches!(
            check("GET"),
            Err(Error::UnsupportedSubcommand { .. })
        ));
    }

    #[test]
    fn arguments_on_argless_command_are_rejected() {
        assert!(matches!(
            check("VER now"),
            Err(Error::UnsupportedSubcommand { .. })
        ));
    }

    #[test]
    fn excluded_commands_are_client_rejections() {
        for raw in ["STARTTLS", "FSD ups1", "PRIMARY ups1", "LOGIN ups1"] {
            assert!(
                matches!(check(raw), Err(Error::UnsupportedByClient { .. })),
                "{raw} should be refused by the client"
            );
        }
    }

    #[test]
    fn matching_is_case_sensitive() {
        assert!(matches!(
            check("list UPS"),
            Err(Error::UnsupportedByClient { .. })
        ));
        assert!(matches!(
            check("LIST ups"),
            Err(Error::UnsupportedSubcommand { .. })
        ));
    }

    #[test]
    fn server_listing_is_checked_first() {
        let server = vec!["HELP".to_owned(), "VER".to_owned()];
        let line = CommandLine::parse("STARTTLS").unwrap();
        assert!(matches!(
            Grammar::standard().validate(&line, Some(&server)),
            Err(Error::UnsupportedByServer { .. })
        ));

        let line = CommandLine::parse("VER").unwrap();
        assert!(Grammar::standard().validate(&line, Some(&server)).is_ok());
    }

    #[test]
    fn unlisted_commands_skip_server_listing() {
        let server = vec!["HELP".to_owned(), "VER".to_owned()];
        let line = CommandLine::parse("PROTVER").unwrap();
        assert!(Grammar::standard().validate(&line, Some(&server)).is_ok());

        let line = CommandLine::parse("LIST UPS").unwrap();
        assert!(matches!(
            Grammar::standard().validate(&line, Some(&server)),
            Err(Error::UnsupportedByServer { .. })
        ));
    }

    #[test]
    fn parse_rejects_empty_and_multiline() {
        assert!(matches!(
            CommandLine::parse("   "),
            Err(Error::InvalidCommand { .. })
        ));
        assert!(matches!(
            CommandLine::parse("VER\nLOGOUT"),
            Err(Error::InvalidCommand { .. })
        ));
    }

    #[test]
    fn arguments_are_quoted_when_needed() {
        assert_eq!(encode_argument("value", "120").unwrap(), "120");
        assert_eq!(encode_argument("value", "").unwrap(), "\"\"");
        assert_eq!(
            encode_argument("value", "two words").unwrap(),
            "\"two words\""
        );
        assert_eq!(
            encode_argument("value", r#"say "hi" \o/"#).unwrap(),
            r#""say \"hi\" \\o/""#
        );
        assert!(matches!(
            encode_argument("value", "x\r\nLOGOUT"),
            Err(Error::InvalidArgument { argument: "value", .. })
        ));
    }

    #[test]
    fn wire_form_and_echo() {
        let line = CommandLine::new("SET")
            .sub("VAR")
            .arg("device", "ups1")
            .unwrap()
            .arg("value", "a b")
            .unwrap();
        assert_eq!(line.wire(), "SET VAR ups1 \"a b\"");
        assert_eq!(line.echo_tokens(), vec!["VAR", "ups1", "\"a b\""]);
    }

    #[test]
    fn first_argument_fills_subcommand_slot() {
        let line = CommandLine::new("INSTCMD")
            .arg("device", "ups1")
            .unwrap()
            .arg("command", "beeper.off")
            .unwrap();
        assert_eq!(line, CommandLine::parse("INSTCMD ups1 beeper.off").unwrap());
        assert!(Grammar::standard().validate(&line, None).is_ok());
    }

    #[test]
    fn password_is_redacted() {
        let line = CommandLine::new("PASSWORD").arg("password", "hunter2").unwrap();
        assert_eq!(line.redacted(), "PASSWORD ********");
        assert_eq!(line.wire(), "PASSWORD hunter2");
    }
}
