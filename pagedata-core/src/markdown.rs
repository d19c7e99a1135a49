use std::collections::HashMap;
use std::sync::LazyLock;

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd, html};
use syntect::highlighting::ThemeSet;
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;
use tera::{Filter, Value};

const CODE_THEME: &str = "base16-ocean.dark";

static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
static THEME_SET: LazyLock<ThemeSet> = LazyLock::new(ThemeSet::load_defaults);

/// Convert markdown to HTML, highlighting fenced code blocks.
pub fn render_markdown(source: &str) -> String {
    let events: Vec<Event> = Parser::new_ext(source, Options::all()).collect();
    let mut processed = Vec::with_capacity(events.len());
    let mut events = events.into_iter();

    while let Some(event) = events.next() {
        match event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(lang))) => {
                let mut code = String::new();
                for inner in events.by_ref() {
                    match inner {
                        Event::End(TagEnd::CodeBlock) => break,
                        Event::Text(text) => code.push_str(&text),
                        _ => {}
                    }
                }
                processed.push(Event::Html(highlight(&code, &lang).into()));
            }
            other => processed.push(other),
        }
    }

    let mut out = String::new();
    html::push_html(&mut out, processed.into_iter());
    out
}

fn highlight(code: &str, lang: &str) -> String {
    let plain = || format!("<pre><code>{}</code></pre>", html_escape::encode_text(code));

    let Some(syntax) = SYNTAX_SET.find_syntax_by_token(lang) else {
        return plain();
    };
    let theme = &THEME_SET.themes[CODE_THEME];
    highlighted_html_for_string(code, &SYNTAX_SET, syntax, theme).unwrap_or_else(|_| plain())
}

/// `{{ content.body | markdown }}`
pub struct MarkdownFilter;

impl Filter for MarkdownFilter {
    fn filter(&self, value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
        match value {
            Value::Null => Ok(Value::String(String::new())),
            Value::String(source) => Ok(Value::String(render_markdown(source))),
            other => Err(tera::Error::msg(format!(
                "Filter `markdown` expected a string but got {other}"
            ))),
        }
    }

    fn is_safe(&self) -> bool {
        true
    }
}
