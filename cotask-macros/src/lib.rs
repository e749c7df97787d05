mod utils;

use proc_macro::{TokenStream, TokenTree};

/// Builds a `cotask::Signal`.
///
/// ```rust,ignore
/// co.signal(signal!(await_time, time = Duration::from_millis(5))).await;
/// co.signal(signal!("double", n = 21)).await;
/// ```
#[proc_macro]
pub fn signal(input: TokenStream) -> TokenStream {
    let args = utils::split_args(input);

    let Some((command, params)) = args.split_first() else {
        return utils::compile_error("signal! expects a command name");
    };

    let command = match command.as_slice() {
        [TokenTree::Ident(id)] => format!("{:?}", id.to_string()),
        [TokenTree::Literal(lit)] => lit.to_string(),
        _ => {
            return utils::compile_error(
                "signal! command must be an identifier or a string literal",
            );
        }
    };

    let mut output = format!("::cotask::Signal::new({command}, ::cotask::Params::new()");

    for param in params {
        let [TokenTree::Ident(name), TokenTree::Punct(eq), value @ ..] = param.as_slice() else {
            return utils::compile_error("signal! parameters must look like `name = value`");
        };

        if eq.as_char() != '=' || value.is_empty() {
            return utils::compile_error("signal! parameters must look like `name = value`");
        }

        let value: TokenStream = value.iter().cloned().collect();
        output.push_str(&format!(".with({:?}, {})", name.to_string(), value));
    }

    output.push(')');

    output.parse().unwrap_or_else(|err| {
        let msg = format!("signal macro error: {err}");
        utils::compile_error(&msg)
    })
}

/// Turns `async fn main(co: Co) { .. }` into a synchronous `main` that
/// drives the body as the entry task of a fresh event loop.
///
/// Options: `drain_on_sleep`, `nested_queue = shared | isolated`.
#[proc_macro_attribute]
pub fn main(attr: TokenStream, item: TokenStream) -> TokenStream {
    let entry = match utils::parse_entry_fn(item) {
        Ok(entry) => entry,
        Err(msg) => return utils::compile_error(&format!("#[cotask::main]: {msg}")),
    };

    let attr_str = attr.to_string();
    let mut builder = String::from("::cotask::EventLoopBuilder::new()");

    for part in attr_str.split(',') {
        let part = part.trim();

        if part.is_empty() {
            continue;
        }

        if part == "drain_on_sleep" {
            builder.push_str(".drain_on_sleep(true)");
        } else if let Some(v) = part.strip_prefix("nested_queue") {
            match v.trim_start().trim_start_matches('=').trim() {
                "shared" => builder.push_str(".nested_queue(::cotask::NestedQueue::Shared)"),
                "isolated" => builder.push_str(".nested_queue(::cotask::NestedQueue::Isolated)"),
                other => {
                    return utils::compile_error(&format!(
                        "#[cotask::main]: unknown nested_queue policy `{other}`"
                    ));
                }
            }
        } else {
            return utils::compile_error(&format!("#[cotask::main]: unknown option `{part}`"));
        }
    }

    builder.push_str(".build()");

    let head: TokenStream = entry.head.into_iter().collect();

    let output = format!(
        "{head}() {{
            let mut event_loop = {builder};
            let entry = ::cotask::Task::named({name:?}, move |{binding}: ::cotask::Co| async move {{
                {body}
            }});
            if let ::core::result::Result::Err(err) = event_loop.run(entry) {{
                ::std::panic!(\"event loop failed: {{}}\", err);
            }}
        }}",
        name = entry.name,
        binding = entry.binding,
        body = entry.body,
    );

    output.parse().unwrap_or_else(|err| {
        let msg = format!("main macro error: {err}");
        utils::compile_error(&msg)
    })
}

/// Turns `async fn name(co: Co) { .. }` into a `#[test]` that drives the
/// body as the entry task of a fresh event loop.
///
/// The test fails if the loop aborts with a fatal error.
#[proc_macro_attribute]
pub fn test(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let entry = match utils::parse_entry_fn(item) {
        Ok(entry) => entry,
        Err(msg) => return utils::compile_error(&format!("#[cotask::test]: {msg}")),
    };

    let head: TokenStream = entry.head.into_iter().collect();

    let output = format!(
        "#[test]
        {head}() {{
            let mut event_loop = ::cotask::EventLoop::new();
            let entry = ::cotask::Task::named({name:?}, move |{binding}: ::cotask::Co| async move {{
                {body}
            }});
            event_loop.run(entry).expect(\"event loop failed\");
        }}",
        name = entry.name,
        binding = entry.binding,
        body = entry.body,
    );

    output.parse().unwrap_or_else(|err| {
        let msg = format!("test macro error: {err}");
        utils::compile_error(&msg)
    })
}
