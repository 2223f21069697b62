//! Builders for the fixed set of outbound XML documents/fragments the
//! wire protocol uses. Element and attribute names are not
//! configurable; they match the protocol verbatim.

use crate::error_code::ErrorCode;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::writer::Writer;
use std::io::Cursor;
use std::io::Write as _;

const XMLNS: &str = "urn:debugger_protocol_v1";
const XMLNS_XDEBUG: &str = "http://xdebug.org/dbgp/xdebug";

fn new_writer() -> Writer<Cursor<Vec<u8>>> {
    Writer::new(Cursor::new(Vec::new()))
}

fn into_string(writer: Writer<Cursor<Vec<u8>>>) -> String {
    String::from_utf8(writer.into_inner().into_inner()).expect("xml writer only emits utf-8")
}

/// `<init engine="..." ...>` sent once on attach.
#[allow(clippy::too_many_arguments)]
pub fn init(
    appid: &str,
    idekey: Option<&str>,
    session: Option<&str>,
    fileuri: &str,
    language: &str,
    protocol_version: &str,
    engine_name: &str,
    engine_version: &str,
    author: &str,
    url: &str,
    copyright: &str,
) -> String {
    let mut w = new_writer();
    let mut start = BytesStart::new("init");
    start.push_attribute(("xmlns", XMLNS));
    start.push_attribute(("xmlns:xdebug", XMLNS_XDEBUG));
    start.push_attribute(("appid", appid));
    if let Some(idekey) = idekey {
        start.push_attribute(("idekey", idekey));
    }
    if let Some(session) = session {
        start.push_attribute(("session", session));
    }
    start.push_attribute(("thread", "1"));
    start.push_attribute(("parent", ""));
    start.push_attribute(("language", language));
    start.push_attribute(("protocol_version", protocol_version));
    start.push_attribute(("fileuri", fileuri));
    w.write_event(Event::Start(start)).unwrap();

    write_leaf(&mut w, "engine", &[("version", engine_version)], engine_name);
    write_leaf(&mut w, "author", &[], author);
    write_leaf(&mut w, "url", &[], url);
    write_leaf(&mut w, "copyright", &[], copyright);

    w.write_event(Event::End(BytesEnd::new("init"))).unwrap();
    into_string(w)
}

fn write_leaf(w: &mut Writer<Cursor<Vec<u8>>>, name: &str, attrs: &[(&str, &str)], text: &str) {
    let mut start = BytesStart::new(name);
    for (k, v) in attrs {
        start.push_attribute((*k, *v));
    }
    w.write_event(Event::Start(start)).unwrap();
    w.write_event(Event::Text(BytesText::new(text))).unwrap();
    w.write_event(Event::End(BytesEnd::new(name))).unwrap();
}

/// Builds the `<response>` open tag shared by every response variant,
/// with its two fixed namespace attributes plus `command`/`transaction_id`.
fn response_start(command: Option<&str>, transaction_id: &str) -> BytesStart<'static> {
    let mut start = BytesStart::new("response");
    start.push_attribute(("xmlns", XMLNS));
    start.push_attribute(("xmlns:xdebug", XMLNS_XDEBUG));
    if let Some(command) = command {
        start.push_attribute(("command", command));
    }
    start.push_attribute(("transaction_id", transaction_id));
    start
}

/// A response whose attributes are entirely caller-supplied beyond the
/// fixed `command`/`transaction_id`/namespaces, with no body.
pub fn response(command: &str, transaction_id: &str, extra_attrs: &[(&str, &str)]) -> String {
    let mut w = new_writer();
    let mut start = response_start(Some(command), transaction_id);
    for (k, v) in extra_attrs {
        start.push_attribute((*k, *v));
    }
    w.write_event(Event::Empty(start)).unwrap();
    into_string(w)
}

/// A response with raw inner XML (a breakpoint/stack/property subtree
/// already rendered).
pub fn response_with_body(
    command: &str,
    transaction_id: &str,
    extra_attrs: &[(&str, &str)],
    inner_xml: &str,
) -> String {
    let mut w = new_writer();
    let mut start = response_start(Some(command), transaction_id);
    for (k, v) in extra_attrs {
        start.push_attribute((*k, *v));
    }
    w.write_event(Event::Start(start)).unwrap();
    w.get_mut().write_all(inner_xml.as_bytes()).unwrap();
    w.write_event(Event::End(BytesEnd::new("response"))).unwrap();
    into_string(w)
}

/// An error response: `command` is omitted when the command name itself
/// could not be recovered from a malformed line (scenario 3).
pub fn error_response(command: Option<&str>, transaction_id: &str, code: ErrorCode) -> String {
    let mut w = new_writer();
    let start = response_start(command, transaction_id);
    w.write_event(Event::Start(start)).unwrap();

    let mut error_start = BytesStart::new("error");
    error_start.push_attribute(("code", code.code().to_string().as_str()));
    w.write_event(Event::Start(error_start)).unwrap();
    write_leaf(&mut w, "message", &[], code.message());
    w.write_event(Event::End(BytesEnd::new("error"))).unwrap();

    w.write_event(Event::End(BytesEnd::new("response"))).unwrap();
    into_string(w)
}

/// `<breakpoint .../>` as returned by `breakpoint_get`.
pub fn breakpoint_element(attrs: &[(&str, &str)]) -> String {
    let mut w = new_writer();
    let mut start = BytesStart::new("breakpoint");
    for (k, v) in attrs {
        start.push_attribute((*k, *v));
    }
    w.write_event(Event::Empty(start)).unwrap();
    into_string(w)
}

/// `<stack .../>` as returned inside `stack_get`.
pub fn stack_element(attrs: &[(&str, &str)]) -> String {
    let mut w = new_writer();
    let mut start = BytesStart::new("stack");
    for (k, v) in attrs {
        start.push_attribute((*k, *v));
    }
    w.write_event(Event::Empty(start)).unwrap();
    into_string(w)
}

/// `<stream type="stdout|stderr">base64</stream>`, the unsolicited
/// message emitted when redirection is active.
pub fn stream_message(stream_type: &str, base64_body: &str) -> String {
    let mut w = new_writer();
    let mut start = BytesStart::new("stream");
    start.push_attribute(("xmlns", XMLNS));
    start.push_attribute(("xmlns:xdebug", XMLNS_XDEBUG));
    start.push_attribute(("type", stream_type));
    w.write_event(Event::Start(start)).unwrap();
    w.write_event(Event::Text(BytesText::new(base64_body))).unwrap();
    w.write_event(Event::End(BytesEnd::new("stream"))).unwrap();
    into_string(w)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn init_carries_both_xmlns_attributes() {
        let xml = init(
            "123", Some("idekey"), None, "file:///a.php", "PHP", "1.0", "adapter", "1.0",
            "author", "url", "copyright",
        );
        assert!(xml.contains(r#"xmlns="urn:debugger_protocol_v1""#));
        assert!(xml.contains(r#"xmlns:xdebug="http://xdebug.org/dbgp/xdebug""#));
        assert!(xml.contains(r#"appid="123""#));
        assert!(xml.contains("<engine version=\"1.0\">adapter</engine>"));
    }

    #[test]
    fn error_response_omits_command_when_none() {
        let xml = error_response(None, "1", ErrorCode::ParseError);
        assert!(!xml.contains("command="));
        assert!(xml.contains(r#"<error code="1">"#));
        assert!(xml.contains("parse error in command") || xml.contains(ErrorCode::ParseError.message()));
    }

    #[test]
    fn breakpoint_element_renders_given_attributes() {
        let xml = breakpoint_element(&[
            ("type", "line"),
            ("filename", "file:///x.src"),
            ("lineno", "10"),
            ("state", "enabled"),
            ("hit_count", "0"),
            ("hit_value", "0"),
        ]);
        assert_eq!(
            xml,
            r#"<breakpoint type="line" filename="file:///x.src" lineno="10" state="enabled" hit_count="0" hit_value="0"/>"#
        );
    }

    #[test]
    fn stream_message_wraps_base64_body() {
        let xml = stream_message("stdout", "aGk=");
        assert_eq!(
            xml,
            r#"<stream xmlns="urn:debugger_protocol_v1" xmlns:xdebug="http://xdebug.org/dbgp/xdebug" type="stdout">aGk=</stream>"#
        );
    }
}
