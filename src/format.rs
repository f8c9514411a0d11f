//! Argument parsing and message formatting (spec.md §4.D).
//!
//! Rust's static typing pre-selects which of spec.md's four argument-parsing
//! cases applies at the call site (the compiler, not a runtime type check,
//! picks the [`LogInput`] variant), but all four cases are still reachable
//! through [`LogInput`] and [`build_message`] implements the same
//! resolution rules the spec lays out.
use crate::record::{Context, FormatArg};

/// The parsed shape of a single log call's arguments, corresponding to the
/// four cases in spec.md §4.D:
///
/// 1. [`LogInput::Empty`] — no arguments.
/// 2. [`LogInput::Context`] / [`LogInput::ContextMessage`] — a mapping,
///    optionally followed by a format string and arguments.
/// 3. [`LogInput::Message`] — a format string and positional arguments.
/// 4. [`LogInput::Other`] — anything else, stringified.
#[derive(Debug, Clone)]
pub enum LogInput {
    /// No arguments: an empty message.
    Empty,
    /// A context mapping with no separate message; `context["msg"]` (if
    /// present) becomes the message.
    Context(Context),
    /// A context mapping plus an explicit format string and arguments.
    ContextMessage(Context, String, Vec<FormatArg>),
    /// A format string plus positional arguments.
    Message(String, Vec<FormatArg>),
    /// Anything else; stringified via its `Display`/`Debug` representation
    /// by the caller before being wrapped here.
    Other(String),
}

impl From<&str> for LogInput {
    fn from(s: &str) -> Self {
        LogInput::Message(s.to_string(), Vec::new())
    }
}

impl From<String> for LogInput {
    fn from(s: String) -> Self {
        LogInput::Message(s, Vec::new())
    }
}

impl From<(&str, Vec<FormatArg>)> for LogInput {
    fn from((fmt, args): (&str, Vec<FormatArg>)) -> Self {
        LogInput::Message(fmt.to_string(), args)
    }
}

impl From<Context> for LogInput {
    fn from(ctx: Context) -> Self {
        LogInput::Context(ctx)
    }
}

/// Resolved output of [`build_message`]: the context to attach to the
/// event, the raw `message_fmt` template, its positional args, and the
/// final formatted message.
pub struct BuiltMessage {
    /// Context mapping to attach to the event, if any.
    pub context: Option<Context>,
    /// The raw, unformatted template.
    pub message_fmt: String,
    /// Positional arguments for `message_fmt`.
    pub args: Vec<FormatArg>,
    /// The fully formatted message.
    pub message: String,
}

/// Applies spec.md §4.D's argument-parsing rules to a [`LogInput`].
pub fn build_message(input: LogInput) -> BuiltMessage {
    match input {
        LogInput::Empty => BuiltMessage {
            context: None,
            message_fmt: String::new(),
            args: Vec::new(),
            message: String::new(),
        },
        LogInput::Context(ctx) => {
            let msg = ctx
                .get("msg")
                .map(|v| v.to_string())
                .unwrap_or_default();
            BuiltMessage { context: Some(ctx), message_fmt: msg.clone(), args: Vec::new(), message: msg }
        }
        LogInput::ContextMessage(ctx, fmt, args) => {
            let message = format_message(&fmt, &args);
            BuiltMessage { context: Some(ctx), message_fmt: fmt, args, message }
        }
        LogInput::Message(fmt, args) => {
            let message = format_message(&fmt, &args);
            BuiltMessage { context: None, message_fmt: fmt, args, message }
        }
        LogInput::Other(s) => {
            BuiltMessage { context: None, message_fmt: s.clone(), args: Vec::new(), message: s }
        }
    }
}

/// Applies a POSIX-`printf`-style template (`%s`, `%d`, `%f`, `%%`) to
/// positional arguments. A formatting failure never panics or returns an
/// error to the caller — it yields `"<fmt> [FORMAT ERROR: <detail>]"`
/// exactly as spec.md §4.D specifies.
pub fn format_message(fmt: &str, args: &[FormatArg]) -> String {
    match try_format(fmt, args) {
        Ok(s) => s,
        Err(detail) => format!("{} [FORMAT ERROR: {}]", fmt, detail),
    }
}

fn try_format(fmt: &str, args: &[FormatArg]) -> Result<String, String> {
    let mut out = String::with_capacity(fmt.len());
    let mut chars = fmt.chars().peekable();
    let mut arg_iter = args.iter();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('%') => out.push('%'),
            Some('s') => {
                let arg = arg_iter.next().ok_or("not enough arguments for %s")?;
                out.push_str(&arg.to_string());
            }
            Some('d') => {
                let arg = arg_iter.next().ok_or("not enough arguments for %d")?;
                match arg {
                    FormatArg::Int(i) => out.push_str(&i.to_string()),
                    FormatArg::Float(v) => out.push_str(&(*v as i64).to_string()),
                    FormatArg::Str(s) => {
                        return Err(format!("%d expected a number, got string {:?}", s))
                    }
                }
            }
            Some('f') => {
                let arg = arg_iter.next().ok_or("not enough arguments for %f")?;
                match arg {
                    FormatArg::Float(v) => out.push_str(&v.to_string()),
                    FormatArg::Int(i) => out.push_str(&(*i as f64).to_string()),
                    FormatArg::Str(s) => {
                        return Err(format!("%f expected a number, got string {:?}", s))
                    }
                }
            }
            Some(other) => return Err(format!("unknown format specifier %{}", other)),
            None => return Err("dangling '%' at end of format string".to_string()),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_input_yields_empty_message() {
        let built = build_message(LogInput::Empty);
        assert_eq!(built.message, "");
    }

    #[test]
    fn message_with_args_formats() {
        let built = build_message(LogInput::Message(
            "hello %s, you are %d".to_string(),
            vec![FormatArg::Str("world".to_string()), FormatArg::Int(5)],
        ));
        assert_eq!(built.message, "hello world, you are 5");
    }

    #[test]
    fn format_failure_yields_inline_error() {
        let msg = format_message("need %s", &[]);
        assert!(msg.starts_with("need %s [FORMAT ERROR:"));
    }

    #[test]
    fn context_without_message_uses_msg_key() {
        let mut ctx = Context::new();
        ctx.insert("msg".to_string(), crate::record::ContextValue::Str("hi".to_string()));
        ctx.insert("user".to_string(), crate::record::ContextValue::Str("amy".to_string()));
        let built = build_message(LogInput::Context(ctx));
        assert_eq!(built.message, "hi");
        assert!(built.context.is_some());
    }

    #[test]
    fn percent_percent_is_literal() {
        assert_eq!(format_message("100%%", &[]), "100%");
    }
}
