//! A minimal standalone debuggee: one frame, a handful of locals, no
//! real execution engine behind it. Exercises the full wire protocol
//! end to end against a real IDE.

use std::io;

use dbgp_adapter::config::Config;
use dbgp_adapter::runtime::{EvalError, Frame, RuntimeIntrospector, ValueRenderer};
use dbgp_adapter::session_state::ExportOptions;
use dbgp_adapter::symbol::{Scope, Value};
use dbgp_adapter::{Adapter, Session};
use log::{error, info};

fn init_logger() {
    use log4rs::append::file::FileAppender;
    use log4rs::config::{Appender, Config as LogConfig, Root};
    use log4rs::encode::pattern::PatternEncoder;

    let logfile = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new("{l} - {m}\n")))
        .build("output.log")
        .unwrap();

    let config = LogConfig::builder()
        .appender(Appender::builder().build("logfile", Box::new(logfile)))
        .build(
            Root::builder()
                .appender("logfile")
                .build(log::LevelFilter::Info),
        )
        .unwrap();

    log4rs::init_config(config).unwrap();
}

#[derive(Debug, Clone)]
enum ScalarValue {
    Int(i64),
    Str(String),
}

impl Value for ScalarValue {}

struct Locals {
    vars: Vec<(&'static str, ScalarValue)>,
}

impl Scope for Locals {
    fn local(&self, name: &str) -> Option<&dyn Value> {
        self.vars
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v as &dyn Value)
    }

    fn names(&self) -> Vec<String> {
        self.vars.iter().map(|(n, _)| n.to_string()).collect()
    }
}

struct MockRuntime {
    file: String,
    line: u32,
    locals: Locals,
}

impl MockRuntime {
    fn frame_at(&self) -> Frame<'_> {
        Frame {
            filename: self.file.clone(),
            lineno: self.line,
            function_name: "{main}".to_string(),
            class_name: None,
            this: None,
            locals: &self.locals,
        }
    }
}

impl RuntimeIntrospector for MockRuntime {
    fn current_frame(&self) -> Option<Frame<'_>> {
        Some(self.frame_at())
    }

    fn frame(&self, depth: u32) -> Option<Frame<'_>> {
        if depth == 0 {
            Some(self.frame_at())
        } else {
            None
        }
    }

    fn executed_file(&self) -> String {
        self.file.clone()
    }

    fn executed_line(&self) -> u32 {
        self.line
    }

    fn stack_depth(&self) -> u32 {
        1
    }

    fn evaluate(&mut self, source: &str) -> Result<Box<dyn Value>, EvalError> {
        match source.trim().parse::<i64>() {
            Ok(n) => Ok(Box::new(ScalarValue::Int(n))),
            Err(_) => Ok(Box::new(ScalarValue::Str(source.to_string()))),
        }
    }

    fn open_source(&mut self, url: &str) -> io::Result<Box<dyn io::Read>> {
        if url == self.file {
            Ok(Box::new(io::Cursor::new(b"<?php\necho 1;\n".to_vec())))
        } else {
            Err(io::Error::new(io::ErrorKind::NotFound, "no such file"))
        }
    }

    fn install_stdout_hooks(&mut self) {}
    fn uninstall_stdout_hooks(&mut self) {}
}

struct PlainRenderer;

impl ValueRenderer for PlainRenderer {
    fn render(&self, name: &str, value: &dyn Value, options: &ExportOptions) -> String {
        let _ = options;
        let (type_name, text) = match value.class_name() {
            Some(class) => ("object", class.to_string()),
            None => ("string", format!("<{}>", name)),
        };
        format!(
            r#"<property name="{}" type="{}">{}</property>"#,
            name, type_name, text
        )
    }
}

fn main() {
    init_logger();

    let runtime = MockRuntime {
        file: "file:///mock.php".to_string(),
        line: 2,
        locals: Locals {
            vars: vec![
                ("count", ScalarValue::Int(0)),
                ("label", ScalarValue::Str("ready".to_string())),
            ],
        },
    };

    let mut session = Session::new(
        std::process::id() as u64,
        Config::new("mock-adapter", "1.0"),
        io::empty(),
        io::stdout(),
        runtime,
        PlainRenderer,
    );
    session.set_log(|line| info!("{}", line));

    if let Err(e) = session.send_init("file:///mock.php", false) {
        error!("failed to send init event: {}", e);
        return;
    }

    for line in Adapter::single_session_mode() {
        match line {
            Ok(Some(line)) => {
                if let Err(e) = session.handle_line(&line) {
                    error!("failed to reply to command: {}", e);
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                error!("error reading command: {}", e);
                break;
            }
        }
    }
}
