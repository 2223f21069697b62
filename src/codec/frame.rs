//! Outbound message framing and inbound NUL-delimited command reading.
//!
//! Every outbound message (response, `init`, `stream`, `break`, `status`) is
//! framed as `<decimal-length> "\0" <prolog> <xml> "\0"`. The declared
//! length counts the prolog and the XML document but neither NUL.

use std::io::{self, BufRead, Write};

/// The XML prolog every outbound document is prefixed with.
const PROLOG: &str = "<?xml version=\"1.0\" encoding=\"iso-8859-1\"?>\n";

/// Frame `xml` per the wire format and write it to `output`.
///
/// If `log` is set, the framed document (sans the two NUL separators) is
/// logged prefixed with `-> `, matching the protocol's conventional
/// wire-level trace format.
pub fn write_message<W: Write>(
    output: &mut W,
    xml: &str,
    log: Option<&dyn Fn(&str)>,
) -> io::Result<()> {
    let body = format!("{}{}", PROLOG, xml);
    if let Some(log) = log {
        log(&format!("-> {}", body));
    }
    write!(output, "{}\0{}\0", body.len(), body)?;
    output.flush()
}

/// Read one NUL-delimited command line from `input`.
///
/// Returns `Ok(None)` at a clean end of stream (peer closed the socket
/// between commands).
pub fn read_command_line<R: BufRead>(
    input: &mut R,
    log: Option<&dyn Fn(&str)>,
) -> io::Result<Option<String>> {
    let mut buf = Vec::new();
    let n = input.read_until(0, &mut buf)?;
    if n == 0 {
        return Ok(None);
    }
    if buf.last() == Some(&0) {
        buf.pop();
    }
    let line = String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    if let Some(log) = log {
        log(&format!("<- {}", line));
    }
    Ok(Some(line))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn write_message_framing_matches_the_wire_format() {
        let mut out = Vec::new();
        write_message(&mut out, "<init/>", None).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut parts = text.splitn(2, '\0');
        let len: usize = parts.next().unwrap().parse().unwrap();
        let rest = parts.next().unwrap();
        let body = &rest[..rest.len() - 1]; // trailing NUL
        assert_eq!(len, body.len());
        assert!(body.starts_with(PROLOG));
        assert!(body.ends_with("<init/>"));
    }

    #[test]
    fn read_command_line_reads_up_to_nul() {
        let mut input: &[u8] = b"status -i 1\0run -i 2\0";
        let first = read_command_line(&mut input, None).unwrap().unwrap();
        assert_eq!(first, "status -i 1");
        let second = read_command_line(&mut input, None).unwrap().unwrap();
        assert_eq!(second, "run -i 2");
        assert!(read_command_line(&mut input, None).unwrap().is_none());
    }

    #[test]
    fn read_command_line_on_closed_socket_yields_none() {
        let mut input: &[u8] = b"";
        assert!(read_command_line(&mut input, None).unwrap().is_none());
    }
}
