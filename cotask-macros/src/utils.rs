use proc_macro::{Delimiter, TokenStream, TokenTree};

/// Splits a `TokenStream` into comma-separated arguments.
///
/// Each argument is returned as a `Vec<TokenTree>`.
/// Commas at the top level are used as separators; commas nested in
/// groups belong to the group and are left alone.
pub(crate) fn split_args(input: TokenStream) -> Vec<Vec<TokenTree>> {
    let mut args = Vec::new();
    let mut current = Vec::new();

    for token in input {
        match &token {
            TokenTree::Punct(p) if p.as_char() == ',' => {
                if !current.is_empty() {
                    args.push(current);
                    current = Vec::new();
                }
            }
            _ => current.push(token),
        }
    }

    if !current.is_empty() {
        args.push(current);
    }

    args
}

/// Renders a `compile_error!` invocation carrying `msg`.
pub(crate) fn compile_error(msg: &str) -> TokenStream {
    format!("compile_error!({msg:?});").parse().unwrap()
}

/// The pieces of an `async fn` that the entry-point attributes rewrite.
pub(crate) struct EntryFn {
    /// Everything up to and including the function name, `async` removed.
    pub(crate) head: Vec<TokenTree>,

    /// The function name, reused as the entry task's name.
    pub(crate) name: String,

    /// Name bound to the task's `Co` handle inside the body.
    pub(crate) binding: String,

    /// Source of the function body, without the outer braces.
    pub(crate) body: String,
}

/// Parses `[attrs] [vis] async fn name(co: Co) [-> T] { body }`.
///
/// The parameter list may be empty, in which case the handle is bound to
/// an unused name. Any return type is dropped: the body's value becomes
/// the entry task's result.
pub(crate) fn parse_entry_fn(item: TokenStream) -> Result<EntryFn, String> {
    let mut tokens: Vec<TokenTree> = item.into_iter().collect();

    let Some(async_pos) = tokens
        .iter()
        .position(|t| matches!(t, TokenTree::Ident(id) if id.to_string() == "async"))
    else {
        return Err("the function must be `async`".to_owned());
    };
    tokens.remove(async_pos);

    let Some(fn_pos) = tokens
        .iter()
        .position(|t| matches!(t, TokenTree::Ident(id) if id.to_string() == "fn"))
    else {
        return Err("expected a function".to_owned());
    };

    let name_pos = fn_pos + 1;
    let name = match tokens.get(name_pos) {
        Some(TokenTree::Ident(id)) => id.to_string(),
        _ => return Err("expected a function name".to_owned()),
    };

    let binding = match tokens.get(name_pos + 1) {
        Some(TokenTree::Group(g)) if g.delimiter() == Delimiter::Parenthesis => g
            .stream()
            .into_iter()
            .find_map(|t| match t {
                TokenTree::Ident(id) if id.to_string() != "mut" => Some(id.to_string()),
                _ => None,
            })
            .unwrap_or_else(|| "_co".to_owned()),
        _ => return Err("expected a parameter list".to_owned()),
    };

    let Some(body_pos) = tokens
        .iter()
        .rposition(|t| matches!(t, TokenTree::Group(g) if g.delimiter() == Delimiter::Brace))
    else {
        return Err("expected a function body".to_owned());
    };

    let body = match &tokens[body_pos] {
        TokenTree::Group(g) => g.stream().to_string(),
        _ => unreachable!(),
    };

    tokens.truncate(name_pos + 1);

    Ok(EntryFn {
        head: tokens,
        name,
        binding,
        body,
    })
}
