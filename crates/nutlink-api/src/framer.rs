// Response framing.
//
// `LIST` requests are answered with a `BEGIN <request>` / `END <request>`
// block; everything else is a single line. An `ERR <code>` line in place of
// either shape is a server-reported failure.

use crate::error::Error;
use crate::grammar::CommandLine;

/// Whether `request` is answered with a BEGIN/END block.
pub fn is_block(request: &CommandLine) -> bool {
    request.main == "LIST"
}

/// Build the read stop condition for `request`.
///
/// Blocks stop at the first `END` line, or at an `ERR` before any `BEGIN`.
/// Single-line replies stop at the first non-empty line.
pub fn stop_condition(request: &CommandLine) -> impl FnMut(&str) -> bool + use<> {
    let block = is_block(request);
    let mut begun = false;
    move |line: &str| {
        let first = first_word(line);
        if !block {
            return !line.trim().is_empty();
        }
        match first {
            "BEGIN" => {
                begun = true;
                false
            }
            "END" => true,
            "ERR" => !begun,
            _ => false,
        }
    }
}

/// Turn the raw lines read for `request` into payload lines.
///
/// For blocks, noise before `BEGIN` is discarded and a later `BEGIN` resets
/// whatever was collected; both `BEGIN` and `END` must echo the request
/// exactly. Single-line replies pass through unchanged.
pub fn frame(request: &CommandLine, raw: &[String]) -> Result<Vec<String>, Error> {
    if is_block(request) {
        frame_block(request, raw)
    } else {
        frame_single(request, raw).map(|line| vec![line])
    }
}

/// Frame a reply that must be exactly one line.
pub fn frame_single(request: &CommandLine, raw: &[String]) -> Result<String, Error> {
    let line = raw
        .iter()
        .map(|l| l.trim_end())
        .find(|l| !l.is_empty())
        .ok_or_else(|| unexpected(request, raw))?;

    if first_word(line) == "ERR" {
        return Err(server_error(request, line));
    }
    Ok(line.to_owned())
}

fn frame_block(request: &CommandLine, raw: &[String]) -> Result<Vec<String>, Error> {
    let echo = request.wire();
    let mut payload = Vec::new();
    let mut begun = false;

    for line in raw.iter().map(|l| l.trim_end()) {
        let (first, rest) = split_first(line);
        match first {
            "BEGIN" => {
                if rest != echo {
                    return Err(unexpected(request, raw));
                }
                payload.clear();
                begun = true;
            }
            "END" => {
                if !begun || rest != echo {
                    return Err(unexpected(request, raw));
                }
                return Ok(payload);
            }
            "ERR" if !begun => return Err(server_error(request, line)),
            "" => {}
            _ if begun => payload.push(line.to_owned()),
            _ => {}
        }
    }

    Err(unexpected(request, raw))
}

/// Parse `ERR <code> [detail...]`.
fn server_error(request: &CommandLine, line: &str) -> Error {
    let (_, rest) = split_first(line);
    let (code, detail) = split_first(rest);
    Error::Server {
        code: if code.is_empty() {
            "UNKNOWN".to_owned()
        } else {
            code.to_owned()
        },
        detail: (!detail.is_empty()).then(|| detail.to_owned()),
        request: request.redacted(),
    }
}

fn unexpected(request: &CommandLine, raw: &[String]) -> Error {
    Error::UnexpectedResponse {
        request: request.redacted(),
        raw: raw.join("\n"),
    }
}

fn first_word(line: &str) -> &str {
    split_first(line).0
}

fn split_first(line: &str) -> (&str, &str) {
    let line = line.trim_start();
    match line.split_once(char::is_whitespace) {
        Some((head, tail)) => (head, tail.trim()),
        None => (line, ""),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| (*s).to_owned()).collect()
    }

    fn list(raw: &str) -> CommandLine {
        CommandLine::parse(raw).unwrap()
    }

    #[test]
    fn block_yields_inner_lines() {
        let raw = lines(&["BEGIN LIST UPS", "UPS a \"A\"", "UPS b \"B\"", "END LIST UPS"]);
        assert_eq!(
            frame(&list("LIST UPS"), &raw).unwrap(),
            vec!["UPS a \"A\"", "UPS b \"B\""]
        );
    }

    #[test]
    fn noise_before_begin_is_dropped() {
        let raw = lines(&[
            "stale line",
            "VAR ups1 old \"1\"",
            "BEGIN LIST VAR ups1",
            "VAR ups1 battery.charge \"100\"",
            "END LIST VAR ups1",
        ]);
        assert_eq!(
            frame(&list("LIST VAR ups1"), &raw).unwrap(),
            vec!["VAR ups1 battery.charge \"100\""]
        );
    }

    #[test]
    fn second_begin_resets_payload() {
        let raw = lines(&[
            "BEGIN LIST UPS",
            "UPS partial \"x\"",
            "BEGIN LIST UPS",
            "UPS ups1 \"Test UPS\"",
            "END LIST UPS",
        ]);
        assert_eq!(
            frame(&list("LIST UPS"), &raw).unwrap(),
            vec!["UPS ups1 \"Test UPS\""]
        );
    }

    #[test]
    fn missing_begin_is_unexpected() {
        let raw = lines(&["UPS ups1 \"Test UPS\"", "END LIST UPS"]);
        let err = frame(&list("LIST UPS"), &raw).unwrap_err();
        assert!(matches!(err, Error::UnexpectedResponse { .. }));
        assert_eq!(err.raw(), Some("UPS ups1 \"Test UPS\"\nEND LIST UPS"));
    }

    #[test]
    fn missing_end_is_unexpected() {
        let raw = lines(&["BEGIN LIST UPS", "UPS ups1 \"Test UPS\""]);
        assert!(matches!(
            frame(&list("LIST UPS"), &raw),
            Err(Error::UnexpectedResponse { .. })
        ));
    }

    #[test]
    fn wrong_echo_is_unexpected() {
        let raw = lines(&["BEGIN LIST VAR other", "END LIST VAR other"]);
        assert!(matches!(
            frame(&list("LIST VAR ups1"), &raw),
            Err(Error::UnexpectedResponse { .. })
        ));

        let raw = lines(&["BEGIN LIST VAR ups1", "END LIST VAR other"]);
        assert!(matches!(
            frame(&list("LIST VAR ups1"), &raw),
            Err(Error::UnexpectedResponse { .. })
        ));
    }

    #[test]
    fn empty_reply_is_unexpected() {
        assert!(matches!(
            frame(&list("LIST UPS"), &[]),
            Err(Error::UnexpectedResponse { .. })
        ));
        assert!(matches!(
            frame(&list("VER"), &lines(&[""])),
            Err(Error::UnexpectedResponse { .. })
        ));
    }

    #[test]
    fn err_line_is_server_error() {
        let err = frame(&list("LIST VAR bad"), &lines(&["ERR UNKNOWN-UPS"])).unwrap_err();
        assert_eq!(err.server_code(), Some("UNKNOWN-UPS"));

        let err = frame(
            &list("GET VAR bad x"),
            &lines(&["ERR ACCESS-DENIED not for you"]),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::Server { ref code, detail: Some(ref d), .. }
                if code == "ACCESS-DENIED" && d == "not for you"
        ));
    }

    #[test]
    fn bare_err_gets_placeholder_code() {
        let err = frame(&list("USERNAME x"), &lines(&["ERR"])).unwrap_err();
        assert_eq!(err.server_code(), Some("UNKNOWN"));
    }

    #[test]
    fn single_line_passes_through() {
        let raw = lines(&["NUMLOGINS ups1 3"]);
        assert_eq!(
            frame(&list("GET NUMLOGINS ups1"), &raw).unwrap(),
            vec!["NUMLOGINS ups1 3"]
        );
    }

    #[test]
    fn stop_condition_for_blocks() {
        let mut stop = stop_condition(&list("LIST UPS"));
        assert!(!stop("noise"));
        assert!(!stop("BEGIN LIST UPS"));
        assert!(!stop("ERR inside block is payload"));
        assert!(stop("END LIST UPS"));

        let mut stop = stop_condition(&list("LIST UPS"));
        assert!(stop("ERR UNKNOWN-UPS"));
    }

    #[test]
    fn stop_condition_for_single_line() {
        let mut stop = stop_condition(&list("VER"));
        assert!(!stop(""));
        assert!(stop("Network UPS Tools upsd 2.8.0"));
    }
}
