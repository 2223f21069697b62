//! The session controller: owns every registry, drives the read → parse
//! → dispatch → reply loop, and hosts the command handlers.
//!
//! This is a single-threaded cooperative pump: one
//! call to [`Session::process_one`] reads exactly one command and emits
//! exactly one response (plus, for streaming, any buffered stream
//! events). The embedding runtime decides when to call it again.

use std::io::{self, BufRead, Read, Write};

use base64::Engine;

use crate::args::CommandArgs;
use crate::breakpoint::{Breakpoint, BreakpointKind, BreakpointRegistry, HitCondition};
use crate::codec::{read_command_line, write_message, CommandLine};
use crate::config::Config;
use crate::dispatch;
use crate::error_code::ErrorCode;
use crate::eval_source::EvalSourceRegistry;
use crate::feature::FeatureTable;
use crate::runtime::{RuntimeIntrospector, ValueRenderer};
use crate::session_state::{ExecMode, Reason, SessionState, Status, StreamRedirect};
use crate::stream::StreamKind;
use crate::symbol;
use crate::xml;

const EVAL_MARKER: &str = "eval()'d code";

/// What a command handler contributes to the outgoing `<response>`
/// beyond the fixed `command`/`transaction_id`/namespace attributes,
/// which [`Session::dispatch`] always adds itself.
#[derive(Default)]
struct HandlerResult {
    extra_attrs: Vec<(String, String)>,
    body: Option<String>,
}

impl HandlerResult {
    fn attrs(attrs: Vec<(String, String)>) -> Self {
        HandlerResult {
            extra_attrs: attrs,
            body: None,
        }
    }

    fn body(body: String) -> Self {
        HandlerResult {
            extra_attrs: Vec::new(),
            body: Some(body),
        }
    }
}

/// The full mutable state of one debugger session, parameterized over
/// the transport and the runtime seam it is embedded against.
pub struct Session<R, W, Rt, Vr>
where
    R: BufRead,
    W: Write,
    Rt: RuntimeIntrospector,
    Vr: ValueRenderer,
{
    input: R,
    output: W,
    runtime: Rt,
    renderer: Vr,
    pid: u64,
    config: Config,
    pub state: SessionState,
    pub breakpoints: BreakpointRegistry,
    pub eval_sources: EvalSourceRegistry,
    log: Option<Box<dyn Fn(&str)>>,
}

impl<R, W, Rt, Vr> Session<R, W, Rt, Vr>
where
    R: BufRead,
    W: Write,
    Rt: RuntimeIntrospector,
    Vr: ValueRenderer,
{
    pub fn new(pid: u64, config: Config, input: R, output: W, runtime: Rt, renderer: Vr) -> Self {
        Session {
            input,
            output,
            runtime,
            renderer,
            pid,
            config,
            state: SessionState::new(FeatureTable::new()),
            breakpoints: BreakpointRegistry::new(pid),
            eval_sources: EvalSourceRegistry::new(),
            log: None,
        }
    }

    pub fn set_log(&mut self, log: impl Fn(&str) + 'static) {
        self.log = Some(Box::new(log));
    }

    fn log_fn(&self) -> Option<&dyn Fn(&str)> {
        self.log.as_deref()
    }

    fn send(&mut self, xml: &str) -> io::Result<()> {
        write_message(&mut self.output, xml, self.log_fn())
    }

    /// Emit the `init` event. `fileuri` is `dbgp://stdin` for a `-`
    /// program name, or the URL form of the program path otherwise.
    ///
    /// `post_error` distinguishes a normal attach (enters `starting`)
    /// from an attach that follows a fatal error the runtime already
    /// hit before the debugger connected (enters `break`/`aborted`
    /// directly, per spec.md §4.6).
    pub fn send_init(&mut self, fileuri: &str, post_error: bool) -> io::Result<()> {
        let session_cookie = Config::session_cookie();
        let xml = xml::init(
            &self.pid.to_string(),
            self.config.idekey.as_deref(),
            session_cookie.as_deref(),
            fileuri,
            "PHP",
            "1.0",
            &self.config.engine_name,
            &self.config.engine_version,
            &self.config.author,
            &self.config.url,
            &self.config.copyright,
        );
        if post_error {
            self.state.enter_break(Reason::Aborted);
        } else {
            self.state.status = Status::Starting;
        }
        self.send(&xml)
    }

    /// Read, parse, dispatch and reply to exactly one inbound command.
    ///
    /// Returns `Ok(None)` once the peer has closed the socket. Returns
    /// `Ok(Some(continues))` otherwise, where `continues` tells the
    /// caller whether to hand control back to the runtime before the
    /// next call.
    pub fn process_one(&mut self) -> io::Result<Option<bool>> {
        self.flush_stream_output()?;
        let line = match read_command_line(&mut self.input, self.log_fn())? {
            Some(line) => line,
            None => return Ok(None),
        };
        Ok(Some(self.handle_line(&line)?))
    }

    /// Parse, dispatch and reply to one already-read command line.
    /// Pulled out of [`Self::process_one`] so an embedder reading lines
    /// off an [`crate::adapter::Adapter`] instead of `self.input` can
    /// drive the same dispatch path.
    pub fn handle_line(&mut self, line: &str) -> io::Result<bool> {
        let parsed = CommandLine::parse(line);
        let (command, continues) = match parsed {
            Ok(cmd) => self.dispatch(cmd),
            Err(code) => (xml::error_response(None, "", code), false),
        };
        self.send(&command)?;
        Ok(continues)
    }

    fn dispatch(&mut self, cmd: CommandLine) -> (String, bool) {
        let transaction_id = cmd.args.transaction_id().unwrap_or("").to_string();
        self.state.last_command = Some(cmd.name.clone());
        self.state.last_transaction_id = Some(transaction_id.clone());

        if cmd.args.transaction_id().is_none() {
            return (
                xml::error_response(Some(&cmd.name), &transaction_id, ErrorCode::InvalidOrMissingOptions),
                false,
            );
        }

        let spec = match dispatch::check_available(&cmd.name, self.state.status == Status::Stopping) {
            Ok(spec) => spec,
            Err(code) => return (xml::error_response(Some(&cmd.name), &transaction_id, code), false),
        };

        let result = self.handle(&cmd.name, &cmd.args);
        match result {
            Ok(handled) => {
                if spec.continues {
                    self.state.enter_running();
                }
                let xml = match handled.body {
                    Some(body) => xml::response_with_body(
                        &cmd.name,
                        &transaction_id,
                        &as_str_pairs(&handled.extra_attrs),
                        &body,
                    ),
                    None => xml::response(&cmd.name, &transaction_id, &as_str_pairs(&handled.extra_attrs)),
                };
                (xml, spec.continues)
            }
            Err(code) => (
                xml::error_response(Some(&cmd.name), &transaction_id, code),
                false,
            ),
        }
    }

    fn handle(&mut self, name: &str, args: &CommandArgs) -> Result<HandlerResult, ErrorCode> {
        match name {
            "breakpoint_set" => self.handle_breakpoint_set(args),
            "breakpoint_get" => self.handle_breakpoint_get(args),
            "breakpoint_update" => self.handle_breakpoint_update(args),
            "breakpoint_remove" => self.handle_breakpoint_remove(args),
            "breakpoint_list" => self.handle_breakpoint_list(),
            "run" => self.handle_run_mode(ExecMode::Run),
            "step_into" => self.handle_run_mode(ExecMode::StepInto),
            "step_over" => self.handle_step_over(),
            "step_out" => self.handle_step_out(),
            "stop" => self.handle_stop(),
            "detach" => self.handle_detach(),
            "stack_depth" => self.handle_stack_depth(),
            "stack_get" => self.handle_stack_get(args),
            "context_names" => self.handle_context_names(),
            "context_get" => self.handle_context_get(args),
            "property_get" => self.handle_property_get(args),
            "property_value" => self.handle_property_value(args),
            "property_set" => self.handle_property_set(args),
            "typemap_get" => self.handle_typemap_get(),
            "source" => self.handle_source(args),
            "status" => self.handle_status(),
            "feature_get" => self.handle_feature_get(args),
            "feature_set" => self.handle_feature_set(args),
            "eval" => self.handle_eval(args),
            "stdout" => self.handle_stream(StreamKindArg::Stdout, args),
            "stderr" => self.handle_stream(StreamKindArg::Stderr, args),
            "xcmd_profiler_name_get" => Err(ErrorCode::ProfilerNotStarted),
            "xcmd_get_executable_lines" => self.handle_executable_lines(args),
            _ => Err(ErrorCode::UnimplementedCommand),
        }
    }

    // -- Breakpoints ------------------------------------------------

    fn handle_breakpoint_set(&mut self, args: &CommandArgs) -> Result<HandlerResult, ErrorCode> {
        let raw_type = args.bp_type().ok_or(ErrorCode::InvalidOrMissingOptions)?;
        if raw_type == "watch" {
            return Err(ErrorCode::BreakpointTypeNotSupported);
        }
        let kind = BreakpointKind::parse(raw_type).ok_or(ErrorCode::InvalidOrMissingOptions)?;

        let disabled = match args.state() {
            None | Some("enabled") => false,
            Some("disabled") => true,
            Some(_) => return Err(ErrorCode::InvalidOrMissingOptions),
        };
        let hit_condition = match args.hit_condition() {
            None => HitCondition::Disabled,
            Some(raw) => HitCondition::parse(raw).ok_or(ErrorCode::InvalidOrMissingOptions)?,
        };

        let mut bp = Breakpoint {
            kind,
            file: None,
            lineno: None,
            function: None,
            class: None,
            exception_name: None,
            condition: args.data_text(),
            disabled,
            temporary: args.temporary().unwrap_or(false),
            hit_count: 0,
            hit_value: args.hit_value().unwrap_or(0),
            hit_condition,
        };

        let id = match kind {
            BreakpointKind::Line | BreakpointKind::Conditional => {
                let lineno = args.line().ok_or(ErrorCode::InvalidOrMissingOptions)?;
                let file = args
                    .file()
                    .map(str::to_string)
                    .unwrap_or_else(|| self.runtime.executed_file());
                bp.file = Some(file.clone());
                bp.lineno = Some(lineno);
                self.breakpoints.insert_line(file, lineno, bp)
            }
            BreakpointKind::Call | BreakpointKind::Return => {
                let method = args.method().ok_or(ErrorCode::InvalidOrMissingOptions)?;
                bp.function = Some(method.to_string());
                bp.class = args.class().map(str::to_string);
                self.breakpoints.insert_function(args.class(), method, bp)?
            }
            BreakpointKind::Exception => {
                let name = args.exception_name().ok_or(ErrorCode::InvalidOrMissingOptions)?;
                bp.exception_name = Some(name.to_string());
                self.breakpoints.insert_exception(name, bp)?
            }
        };

        Ok(HandlerResult::attrs(vec![("id".to_string(), id.to_string())]))
    }

    fn handle_breakpoint_get(&mut self, args: &CommandArgs) -> Result<HandlerResult, ErrorCode> {
        let id = args.breakpoint_id().ok_or(ErrorCode::InvalidOrMissingOptions)?;
        let bp = self.breakpoints.get(id).ok_or(ErrorCode::NoSuchBreakpoint)?;
        Ok(HandlerResult::body(breakpoint_xml(id, bp)))
    }

    fn handle_breakpoint_update(&mut self, args: &CommandArgs) -> Result<HandlerResult, ErrorCode> {
        let id = args.breakpoint_id().ok_or(ErrorCode::InvalidOrMissingOptions)?;
        let bp = self.breakpoints.get_mut(id).ok_or(ErrorCode::NoSuchBreakpoint)?;
        if let Some(state) = args.state() {
            bp.disabled = match state {
                "enabled" => false,
                "disabled" => true,
                _ => return Err(ErrorCode::InvalidOrMissingOptions),
            };
        }
        if let Some(lineno) = args.line() {
            bp.lineno = Some(lineno);
        }
        if let Some(hit_value) = args.hit_value() {
            bp.hit_value = hit_value;
        }
        if let Some(raw) = args.hit_condition() {
            bp.hit_condition = HitCondition::parse(raw).ok_or(ErrorCode::InvalidOrMissingOptions)?;
        }
        Ok(HandlerResult::default())
    }

    fn handle_breakpoint_remove(&mut self, args: &CommandArgs) -> Result<HandlerResult, ErrorCode> {
        let id = args.breakpoint_id().ok_or(ErrorCode::InvalidOrMissingOptions)?;
        self.breakpoints.remove(id)?;
        Ok(HandlerResult::default())
    }

    fn handle_breakpoint_list(&mut self) -> Result<HandlerResult, ErrorCode> {
        let mut admins: Vec<_> = self.breakpoints.iter_admin().collect();
        admins.sort_by_key(|admin| admin.id);
        let mut body = String::new();
        for admin in admins {
            if let Some(bp) = self.breakpoints.get(admin.id) {
                body.push_str(&breakpoint_xml(admin.id, bp));
            }
        }
        Ok(HandlerResult::body(body))
    }

    // -- Execution ----------------------------------------------------

    fn handle_run_mode(&mut self, mode: ExecMode) -> Result<HandlerResult, ErrorCode> {
        self.state.exec_mode = mode;
        Ok(HandlerResult::attrs(vec![
            ("status".to_string(), Status::Running.as_str().to_string()),
            ("reason".to_string(), Reason::Ok.as_str().to_string()),
        ]))
    }

    fn handle_step_over(&mut self) -> Result<HandlerResult, ErrorCode> {
        let level = self.runtime.stack_depth();
        self.handle_run_mode(ExecMode::StepOver { level })
    }

    fn handle_step_out(&mut self) -> Result<HandlerResult, ErrorCode> {
        let level = self.runtime.stack_depth();
        self.handle_run_mode(ExecMode::StepOut { level })
    }

    fn handle_stop(&mut self) -> Result<HandlerResult, ErrorCode> {
        self.state.status = Status::Stopped;
        self.state.reason = Reason::Ok;
        Ok(HandlerResult::attrs(vec![(
            "status".to_string(),
            Status::Stopped.as_str().to_string(),
        )]))
    }

    fn handle_detach(&mut self) -> Result<HandlerResult, ErrorCode> {
        self.state.status = Status::Detached;
        self.runtime.uninstall_stdout_hooks();
        Ok(HandlerResult::attrs(vec![(
            "status".to_string(),
            Status::Detached.as_str().to_string(),
        )]))
    }

    // -- Hit evaluation ---------------------------------------------------
    //
    // Called by the embedding runtime at a candidate breakpoint location
    // (a line about to execute, a call/return about to happen, an
    // exception about to propagate). These never run while breakpoints
    // are suppressed (`eval`/`source` in progress), matching the
    // `with_breakpoints_suppressed` guard elsewhere.

    /// A line in `file` is about to execute; evaluate every line/conditional
    /// breakpoint registered there and enter `break` if one fires.
    pub fn notify_line_hit(&mut self, file: &str, lineno: u32) -> Option<u64> {
        if !self.state.breakpoints_allowed() {
            return None;
        }
        let ids: Vec<u64> = self
            .breakpoints
            .line_breakpoints_for(file, lineno)
            .map(|(id, _)| id)
            .collect();
        self.evaluate_candidates(ids)
    }

    /// A call into `function` (optionally a method of `class`) is about
    /// to happen.
    pub fn notify_call_hit(&mut self, class: Option<&str>, function: &str) -> Option<u64> {
        if !self.state.breakpoints_allowed() {
            return None;
        }
        let ids = self
            .breakpoints
            .function_breakpoint(class, function)
            .map(|(id, _)| id)
            .into_iter()
            .collect();
        self.evaluate_candidates(ids)
    }

    /// An exception named `name` is about to propagate.
    pub fn notify_exception_hit(&mut self, name: &str) -> Option<u64> {
        if !self.state.breakpoints_allowed() {
            return None;
        }
        let ids = self
            .breakpoints
            .exception_breakpoint(name)
            .map(|(id, _)| id)
            .into_iter()
            .collect();
        self.evaluate_candidates(ids)
    }

    /// Increment each candidate's hit count, evaluate its condition
    /// expression (if any) in the debuggee, and enter `break` on the
    /// first one whose [`Breakpoint::fires`] returns true.
    fn evaluate_candidates(&mut self, ids: Vec<u64>) -> Option<u64> {
        let mut fired = None;
        for id in ids {
            let condition = match self.breakpoints.get(id) {
                Some(bp) => bp.condition.clone(),
                None => continue,
            };
            let truthy = match condition {
                Some(expr) => {
                    let runtime = &mut self.runtime;
                    let result = self
                        .state
                        .with_breakpoints_suppressed(move |_| runtime.evaluate(&expr));
                    result.map(|v| v.truthy()).unwrap_or(false)
                }
                None => true,
            };
            let Some(bp) = self.breakpoints.get_mut(id) else {
                continue;
            };
            bp.hit_count += 1;
            if bp.fires(truthy) {
                fired = Some(id);
                break;
            }
        }
        if fired.is_some() {
            self.state.enter_break(Reason::Ok);
        }
        fired
    }

    /// Remove `id` if it was set temporary, once the embedder has
    /// finished acting on the break it caused.
    pub fn acknowledge_break(&mut self, id: u64) {
        if matches!(self.breakpoints.get(id), Some(bp) if bp.temporary) {
            let _ = self.breakpoints.remove(id);
        }
    }

    /// Send the unsolicited `<response>` that completes a previously
    /// dispatched `run`/`step_into`/`step_over`/`step_out`, once the
    /// runtime has actually suspended again. Reuses the transaction id
    /// and command name recorded by [`Self::dispatch`].
    pub fn emit_suspend(&mut self) -> io::Result<()> {
        let command = self.state.last_command.clone().unwrap_or_default();
        let transaction_id = self.state.last_transaction_id.clone().unwrap_or_default();
        let mut attrs = vec![
            ("status".to_string(), self.state.status.as_str().to_string()),
            ("reason".to_string(), self.state.reason.as_str().to_string()),
        ];
        if let Some(frame) = self.runtime.current_frame() {
            attrs.push(("filename".to_string(), self.render_filename(&frame.filename)));
            attrs.push(("lineno".to_string(), frame.lineno.to_string()));
        }
        let xml = xml::response(&command, &transaction_id, &as_str_pairs(&attrs));
        self.send(&xml)
    }

    // -- Inspection -----------------------------------------------------

    fn handle_stack_depth(&mut self) -> Result<HandlerResult, ErrorCode> {
        let depth = self.runtime.stack_depth();
        Ok(HandlerResult::attrs(vec![(
            "depth".to_string(),
            depth.to_string(),
        )]))
    }

    fn handle_stack_get(&mut self, args: &CommandArgs) -> Result<HandlerResult, ErrorCode> {
        let depth = args.depth().unwrap_or(0);
        let frame = self.runtime.frame(depth).ok_or(ErrorCode::StackDepthInvalid)?;
        let filename = self.render_filename(&frame.filename);
        let depth_str = depth.to_string();
        let lineno_str = frame.lineno.to_string();
        let body = xml::stack_element(&[
            ("level", depth_str.as_str()),
            ("type", "file"),
            ("filename", filename.as_str()),
            ("lineno", lineno_str.as_str()),
            ("where", frame.function_name.as_str()),
        ]);
        Ok(HandlerResult::body(body))
    }

    fn handle_context_names(&mut self) -> Result<HandlerResult, ErrorCode> {
        let body = concat!(
            r#"<context name="Locals" id="0"/>"#,
            r#"<context name="Superglobals" id="1"/>"#,
        )
        .to_string();
        Ok(HandlerResult::body(body))
    }

    fn handle_context_get(&mut self, args: &CommandArgs) -> Result<HandlerResult, ErrorCode> {
        let depth = args.depth().unwrap_or(0);
        let context_id = args.context_id().unwrap_or(0);
        let frame = self.runtime.frame(depth).ok_or(ErrorCode::StackDepthInvalid)?;

        let scope: &dyn symbol::Scope = match context_id {
            0 => frame.locals,
            1 => self.runtime.globals().ok_or(ErrorCode::ContextInvalid)?,
            _ => return Err(ErrorCode::ContextInvalid),
        };

        let mut body = String::new();
        for name in scope.names() {
            if let Some(value) = scope.local(&name) {
                body.push_str(&self.renderer.render(&name, value, &self.state.options));
            }
        }
        Ok(HandlerResult::body(body))
    }

    fn resolve_symbol(&self, args: &CommandArgs) -> Result<(String, &dyn symbol::Value), ErrorCode> {
        let name = args.name().ok_or(ErrorCode::InvalidOrMissingOptions)?.to_string();
        let depth = args.depth().unwrap_or(0);
        let path = symbol::parse_path(&name)?;
        let frame = self.runtime.frame(depth).ok_or(ErrorCode::StackDepthInvalid)?;
        let value = symbol::resolve(&path, frame.locals)?;
        Ok((name, value))
    }

    fn handle_property_get(&mut self, args: &CommandArgs) -> Result<HandlerResult, ErrorCode> {
        let (name, value) = self.resolve_symbol(args)?;
        let body = self.renderer.render(&name, value, &self.state.options);
        Ok(HandlerResult::body(body))
    }

    fn handle_property_value(&mut self, args: &CommandArgs) -> Result<HandlerResult, ErrorCode> {
        let (name, value) = self.resolve_symbol(args)?;
        let body = self.renderer.render(&name, value, &self.state.options);
        Ok(HandlerResult::body(body))
    }

    fn handle_property_set(&mut self, args: &CommandArgs) -> Result<HandlerResult, ErrorCode> {
        let (_, value) = self.resolve_symbol(args)?;
        let encoded = args.data().ok_or(ErrorCode::InvalidOrMissingOptions)?.map_err(|_| ErrorCode::InvalidExpression)?;
        value.set(&encoded)?;
        Ok(HandlerResult::attrs(vec![(
            "success".to_string(),
            "1".to_string(),
        )]))
    }

    fn handle_typemap_get(&mut self) -> Result<HandlerResult, ErrorCode> {
        const TYPES: &[(&str, &str, &str)] = &[
            ("bool", "BOOL", "xsd:boolean"),
            ("int", "INT", "xsd:long"),
            ("float", "FLOAT", "xsd:double"),
            ("string", "STRING", "xsd:string"),
            ("null", "NULL", ""),
            ("array", "HASH", ""),
            ("object", "OBJECT", ""),
            ("resource", "RESOURCE", ""),
            ("uninitialized", "UNINITIALIZED", ""),
        ];
        let mut body = String::new();
        for (name, type_name, xsi) in TYPES {
            if xsi.is_empty() {
                body.push_str(&format!(
                    r#"<map type="{}" name="{}"/>"#,
                    type_name, name
                ));
            } else {
                body.push_str(&format!(
                    r#"<map type="{}" name="{}" xsi:type="{}"/>"#,
                    type_name, name, xsi
                ));
            }
        }
        Ok(HandlerResult::body(body))
    }

    fn handle_source(&mut self, args: &CommandArgs) -> Result<HandlerResult, ErrorCode> {
        let file = args.file().ok_or(ErrorCode::InvalidOrMissingOptions)?;
        let begin = args.begin_line().unwrap_or(0) as usize;
        let end = args.end_line().map(|e| e as usize);

        let eval_sources = &self.eval_sources;
        let runtime = &mut self.runtime;
        let text = self.state.with_breakpoints_suppressed(|_| {
            Self::read_source_text(eval_sources, runtime, file)
        })?;

        let lines: Vec<&str> = text.split('\n').collect();
        let end = end.unwrap_or(lines.len().saturating_sub(1)).min(lines.len().saturating_sub(1));
        let selected = if begin <= end && begin < lines.len() {
            lines[begin..=end].join("\n")
        } else {
            String::new()
        };

        let encoded = base64::engine::general_purpose::STANDARD.encode(selected);
        Ok(HandlerResult::body(encoded))
    }

    fn read_source_text(
        eval_sources: &EvalSourceRegistry,
        runtime: &mut Rt,
        file: &str,
    ) -> Result<String, ErrorCode> {
        if let Some(suffix) = file.strip_prefix("dbgp://") {
            if suffix.starts_with("phar://") {
                return open_and_read(runtime, suffix);
            }
            let id = EvalSourceRegistry::parse_id(suffix).ok_or(ErrorCode::CannotOpenFile)?;
            let info = eval_sources.get_by_id(id).ok_or(ErrorCode::CannotOpenFile)?;
            return Ok(info.source_text.clone());
        }
        open_and_read(runtime, file)
    }

    /// Rewrite a frame's reported filename into the `dbgp://<id>`
    /// synthetic form when it is an eval'd fragment.
    fn render_filename(&self, filename: &str) -> String {
        if filename.ends_with(EVAL_MARKER) {
            if let Some(info) = self.eval_sources.get_by_filename(filename) {
                return format!("dbgp://{}", EvalSourceRegistry::id_string(info.id));
            }
        }
        filename.to_string()
    }

    // -- Session --------------------------------------------------------

    fn handle_status(&mut self) -> Result<HandlerResult, ErrorCode> {
        Ok(HandlerResult::attrs(vec![
            ("status".to_string(), self.state.status.as_str().to_string()),
            ("reason".to_string(), self.state.reason.as_str().to_string()),
        ]))
    }

    fn handle_feature_get(&mut self, args: &CommandArgs) -> Result<HandlerResult, ErrorCode> {
        let name = args.name().ok_or(ErrorCode::InvalidOrMissingOptions)?;
        let result = self.state.features.get(name, dispatch::is_known_command);
        let mut attrs = vec![(
            "supported".to_string(),
            if result.supported { "1" } else { "0" }.to_string(),
        )];
        attrs.push(("feature".to_string(), name.to_string()));
        let body = result.value;
        Ok(HandlerResult {
            extra_attrs: attrs,
            body,
        })
    }

    fn handle_feature_set(&mut self, args: &CommandArgs) -> Result<HandlerResult, ErrorCode> {
        let name = args.name().ok_or(ErrorCode::InvalidOrMissingOptions)?;
        let value = args.value().ok_or(ErrorCode::InvalidOrMissingOptions)?;
        self.state.features.set(name, value)?;
        match name {
            "max_children" => self.state.options.max_children = self.state.features.max_children(),
            "max_data" => self.state.options.max_data = self.state.features.max_data(),
            "max_depth" => self.state.options.set_max_depth(self.state.features.max_depth()),
            "show_hidden" => self.state.options.show_hidden = self.state.features.show_hidden(),
            _ => {}
        }
        Ok(HandlerResult::attrs(vec![
            ("feature".to_string(), name.to_string()),
            ("success".to_string(), "1".to_string()),
        ]))
    }

    fn handle_eval(&mut self, args: &CommandArgs) -> Result<HandlerResult, ErrorCode> {
        let source = args.data_text().ok_or(ErrorCode::InvalidOrMissingOptions)?;
        let runtime = &mut self.runtime;
        let result = self
            .state
            .with_breakpoints_suppressed(move |_| runtime.evaluate(&source));
        let value = result.map_err(|_| ErrorCode::ErrorEvaluatingCode)?;
        let body = self.renderer.render("", value.as_ref(), &self.state.options);
        Ok(HandlerResult::body(body))
    }

    // -- Streams ----------------------------------------------------

    fn handle_stream(&mut self, kind: StreamKindArg, args: &CommandArgs) -> Result<HandlerResult, ErrorCode> {
        let mode = args.redirect_mode().ok_or(ErrorCode::InvalidOrMissingOptions)?;
        let redirect = StreamRedirect::parse(mode).ok_or(ErrorCode::InvalidOrMissingOptions)?;
        match kind {
            StreamKindArg::Stdout => {
                self.state.stdout_redirect = redirect;
                self.sync_stream_hooks();
                Ok(HandlerResult::attrs(vec![(
                    "success".to_string(),
                    "1".to_string(),
                )]))
            }
            // The engines this protocol was designed around never offer a
            // genuine stderr hook; the command is accepted so IDEs that
            // probe for it don't treat it as unimplemented, but it never
            // reports success.
            StreamKindArg::Stderr => {
                self.state.stderr_redirect = redirect;
                Ok(HandlerResult::attrs(vec![(
                    "success".to_string(),
                    "0".to_string(),
                )]))
            }
        }
    }

    fn sync_stream_hooks(&mut self) {
        if self.state.stdout_redirect != StreamRedirect::Off
            || self.state.stderr_redirect != StreamRedirect::Off
        {
            self.runtime.install_stdout_hooks();
        } else {
            self.runtime.uninstall_stdout_hooks();
        }
    }

    /// Drain any debuggee output the runtime has captured and forward it
    /// as `<stream>` events, skipping channels that are not redirected.
    fn flush_stream_output(&mut self) -> io::Result<()> {
        let chunks = self.runtime.take_stream_output();
        for (kind, bytes) in chunks {
            let redirect = match kind {
                StreamKind::Stdout => self.state.stdout_redirect,
                StreamKind::Stderr => self.state.stderr_redirect,
            };
            if redirect == StreamRedirect::Off {
                continue;
            }
            let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
            let xml = xml::stream_message(kind.as_str(), &encoded);
            self.send(&xml)?;
        }
        Ok(())
    }

    fn handle_executable_lines(&mut self, args: &CommandArgs) -> Result<HandlerResult, ErrorCode> {
        let file = args.file().ok_or(ErrorCode::InvalidOrMissingOptions)?.to_string();
        let text = open_and_read(&mut self.runtime, &file)?;
        let mut body = String::from(r#"<xdebug:lines xmlns:xdebug="http://xdebug.org/dbgp/xdebug">"#);
        for (i, line) in text.split('\n').enumerate() {
            if !line.trim().is_empty() {
                body.push_str(&format!(r#"<xdebug:line lineno="{}"/>"#, i + 1));
            }
        }
        body.push_str("</xdebug:lines>");
        Ok(HandlerResult::body(body))
    }
}

#[derive(Debug, Clone, Copy)]
enum StreamKindArg {
    Stdout,
    Stderr,
}

fn open_and_read<Rt: RuntimeIntrospector>(runtime: &mut Rt, url: &str) -> Result<String, ErrorCode> {
    let mut reader = runtime.open_source(url).map_err(|_| ErrorCode::CannotOpenFile)?;
    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .map_err(|_| ErrorCode::CannotOpenFile)?;
    Ok(text)
}

fn breakpoint_xml(id: u64, bp: &Breakpoint) -> String {
    let state = if bp.disabled { "disabled" } else { "enabled" };
    let mut attrs: Vec<(String, String)> = vec![
        ("type".to_string(), bp.kind.as_str().to_string()),
        ("state".to_string(), state.to_string()),
        ("hit_count".to_string(), bp.hit_count.to_string()),
        ("hit_value".to_string(), bp.hit_value.to_string()),
    ];
    if bp.hit_condition != HitCondition::Disabled {
        attrs.push(("hit_condition".to_string(), bp.hit_condition.as_str().to_string()));
    }
    if let Some(file) = &bp.file {
        attrs.push(("filename".to_string(), file.clone()));
    }
    if let Some(lineno) = bp.lineno {
        attrs.push(("lineno".to_string(), lineno.to_string()));
    }
    if let Some(function) = &bp.function {
        attrs.push(("function".to_string(), function.clone()));
    }
    if let Some(class) = &bp.class {
        attrs.push(("class".to_string(), class.clone()));
    }
    attrs.push(("id".to_string(), id.to_string()));

    let body = bp.condition.as_ref().map(|c| format!("<expression>{}</expression>", c));
    match body {
        Some(body) => {
            let open = xml::breakpoint_element(&as_str_pairs(&attrs));
            // breakpoint_element always emits a self-closed tag; rebuild
            // as an explicit open/close pair when a condition is present.
            let inner = open.trim_end_matches("/>");
            format!("{}>{}</breakpoint>", inner, body)
        }
        None => xml::breakpoint_element(&as_str_pairs(&attrs)),
    }
}

fn as_str_pairs(attrs: &[(String, String)]) -> Vec<(&str, &str)> {
    attrs.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::session_state::ExportOptions;
    use crate::symbol::Value;
    use std::io::Cursor;

    struct NullRenderer;
    impl ValueRenderer for NullRenderer {
        fn render(&self, name: &str, _value: &dyn Value, _options: &ExportOptions) -> String {
            format!("<property name=\"{}\"/>", name)
        }
    }

    #[derive(Default)]
    struct MockRuntime {
        pending: Vec<(crate::stream::StreamKind, Vec<u8>)>,
    }
    impl RuntimeIntrospector for MockRuntime {
        fn current_frame(&self) -> Option<crate::runtime::Frame<'_>> {
            None
        }
        fn frame(&self, _depth: u32) -> Option<crate::runtime::Frame<'_>> {
            None
        }
        fn executed_file(&self) -> String {
            "file:///a.src".to_string()
        }
        fn executed_line(&self) -> u32 {
            1
        }
        fn stack_depth(&self) -> u32 {
            1
        }
        fn evaluate(&mut self, _source: &str) -> Result<Box<dyn Value>, crate::runtime::EvalError> {
            Err(crate::runtime::EvalError("not implemented".to_string()))
        }
        fn open_source(&mut self, url: &str) -> io::Result<Box<dyn Read>> {
            if url.starts_with("phar://") {
                return Ok(Box::new(Cursor::new(format!("{url}\nline two").into_bytes())));
            }
            Err(io::Error::new(io::ErrorKind::NotFound, "no such file"))
        }
        fn install_stdout_hooks(&mut self) {}
        fn uninstall_stdout_hooks(&mut self) {}
        fn take_stream_output(&mut self) -> Vec<(crate::stream::StreamKind, Vec<u8>)> {
            std::mem::take(&mut self.pending)
        }
    }

    fn new_session(input: &'static str) -> Session<Cursor<&'static [u8]>, Vec<u8>, MockRuntime, NullRenderer> {
        Session::new(
            42,
            Config::new("adapter", "1.0"),
            Cursor::new(input.as_bytes()),
            Vec::new(),
            MockRuntime::default(),
            NullRenderer,
        )
    }

    #[test]
    fn breakpoint_set_then_get_round_trips() {
        let mut session = new_session("");
        let mut args = CommandArgs::new();
        args.set(b'i', "1".to_string());
        args.set(b't', "line".to_string());
        args.set(b'f', "file:///x.src".to_string());
        args.set(b'n', "10".to_string());
        let result = session.handle_breakpoint_set(&args).unwrap();
        let id: u64 = result.extra_attrs[0].1.parse().unwrap();

        let mut get_args = CommandArgs::new();
        get_args.set(b'd', id.to_string());
        let got = session.handle_breakpoint_get(&get_args).unwrap();
        let body = got.body.unwrap();
        assert!(body.contains(r#"type="line""#));
        assert!(body.contains(r#"filename="file:///x.src""#));
        assert!(body.contains(r#"lineno="10""#));
        assert!(body.contains(r#"state="enabled""#));
        assert!(body.contains(r#"hit_count="0""#));
        assert!(body.contains(r#"hit_value="0""#));
    }

    #[test]
    fn breakpoint_set_watch_is_unsupported() {
        let mut session = new_session("");
        let mut args = CommandArgs::new();
        args.set(b't', "watch".to_string());
        let err = session.handle_breakpoint_set(&args).unwrap_err();
        assert_eq!(err, ErrorCode::BreakpointTypeNotSupported);
    }

    #[test]
    fn feature_set_then_get_round_trips() {
        let mut session = new_session("");
        let mut set_args = CommandArgs::new();
        set_args.set(b'n', "max_depth".to_string());
        set_args.set(b'v', "4".to_string());
        let set_result = session.handle_feature_set(&set_args).unwrap();
        assert_eq!(set_result.extra_attrs[1], ("success".to_string(), "1".to_string()));
        assert_eq!(session.state.options.max_depth, 4);

        let mut get_args = CommandArgs::new();
        get_args.set(b'n', "max_depth".to_string());
        let got = session.handle_feature_get(&get_args).unwrap();
        assert_eq!(got.body.unwrap(), "4");
    }

    #[test]
    fn stdout_redirect_reports_success_but_stderr_never_does() {
        let mut session = new_session("");
        let mut args = CommandArgs::new();
        args.set(b'c', "1".to_string());
        let out = session.handle_stream(StreamKindArg::Stdout, &args).unwrap();
        assert_eq!(out.extra_attrs, vec![("success".to_string(), "1".to_string())]);
        assert_eq!(session.state.stdout_redirect, StreamRedirect::Copy);

        let err = session.handle_stream(StreamKindArg::Stderr, &args).unwrap();
        assert_eq!(err.extra_attrs, vec![("success".to_string(), "0".to_string())]);
        assert_eq!(session.state.stderr_redirect, StreamRedirect::Copy);
    }

    #[test]
    fn line_breakpoint_fires_once_then_stays_quiet() {
        let mut session = new_session("");
        let mut args = CommandArgs::new();
        args.set(b'i', "1".to_string());
        args.set(b't', "line".to_string());
        args.set(b'f', "file:///x.src".to_string());
        args.set(b'n', "10".to_string());
        let set = session.handle_breakpoint_set(&args).unwrap();
        let id: u64 = set.extra_attrs[0].1.parse().unwrap();

        assert_eq!(session.notify_line_hit("file:///x.src", 10), Some(id));
        assert_eq!(session.state.status, Status::Break);
        assert_eq!(session.breakpoints.get(id).unwrap().hit_count, 1);

        session.state.enter_running();
        assert_eq!(session.notify_line_hit("file:///x.src", 11), None);
    }

    #[test]
    fn temporary_breakpoint_is_removed_after_acknowledge() {
        let mut session = new_session("");
        let mut args = CommandArgs::new();
        args.set(b'i', "1".to_string());
        args.set(b't', "line".to_string());
        args.set(b'f', "file:///x.src".to_string());
        args.set(b'n', "10".to_string());
        args.set(b'r', "1".to_string());
        let set = session.handle_breakpoint_set(&args).unwrap();
        let id: u64 = set.extra_attrs[0].1.parse().unwrap();

        session.notify_line_hit("file:///x.src", 10);
        session.acknowledge_break(id);
        assert!(session.breakpoints.get(id).is_none());
    }

    #[test]
    fn flush_stream_output_skips_channels_that_are_off() {
        let mut session = new_session("");
        session.runtime.pending = vec![(crate::stream::StreamKind::Stdout, b"hi".to_vec())];
        session.flush_stream_output().unwrap();
        let written = String::from_utf8(session.output.clone()).unwrap();
        assert!(written.is_empty());

        session.state.stdout_redirect = StreamRedirect::Copy;
        session.runtime.pending = vec![(crate::stream::StreamKind::Stdout, b"hi".to_vec())];
        session.flush_stream_output().unwrap();
        let written = String::from_utf8(session.output.clone()).unwrap();
        assert!(written.contains(
            r#"<stream xmlns="urn:debugger_protocol_v1" xmlns:xdebug="http://xdebug.org/dbgp/xdebug" type="stdout">"#
        ));
    }

    #[test]
    fn dbgp_phar_url_opens_virtual_fs_path_instead_of_eval_lookup() {
        let mut session = new_session("");
        let text = Session::read_source_text(
            &session.eval_sources,
            &mut session.runtime,
            "dbgp://phar://app.phar/x.php",
        )
        .unwrap();
        assert_eq!(text, "phar://app.phar/x.php\nline two");
    }

    #[test]
    fn send_init_enters_starting_on_normal_attach() {
        let mut session = new_session("");
        session.send_init("file:///a.php", false).unwrap();
        assert_eq!(session.state.status, Status::Starting);
    }

    #[test]
    fn send_init_enters_break_aborted_on_post_error_attach() {
        let mut session = new_session("");
        session.send_init("file:///a.php", true).unwrap();
        assert_eq!(session.state.status, Status::Break);
        assert_eq!(session.state.reason, Reason::Aborted);
    }

    #[test]
    fn status_reports_starting_reason_ok_initially() {
        let mut session = new_session("");
        let result = session.handle_status().unwrap();
        assert!(result.extra_attrs.contains(&("status".to_string(), "starting".to_string())));
        assert!(result.extra_attrs.contains(&("reason".to_string(), "ok".to_string())));
    }

    #[test]
    fn process_one_on_bogus_line_omits_command_attribute() {
        let mut session = new_session("bogus\0");
        let continues = session.process_one().unwrap().unwrap();
        assert!(!continues);
        let written = String::from_utf8(session.output.clone()).unwrap();
        assert!(!written.contains("command="));
        assert!(written.contains(r#"<error code="1">"#));
    }

    #[test]
    fn process_one_on_closed_socket_returns_none() {
        let mut session = new_session("");
        assert!(session.process_one().unwrap().is_none());
    }

    #[test]
    fn missing_transaction_id_is_error_three_but_still_emitted() {
        // the name parses fine (it has an option section), it's just
        // missing the mandatory `-i` that every command must carry.
        let mut session = new_session("status -n 1\0");
        session.process_one().unwrap();
        let written = String::from_utf8(session.output.clone()).unwrap();
        assert!(written.contains(r#"command="status""#));
        assert!(written.contains(r#"<error code="3">"#));
    }
}
