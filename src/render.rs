//! Markdown rendering
//!
//! Replies are markdown written by a model, so they are untrusted. They go
//! through `pulldown-cmark` and then a sanitising pass: raw HTML becomes
//! text and links with a script-capable scheme lose their destination.

use chrono::Local;
use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag};

use crate::knowledge::KnowledgeBase;
use crate::llm::{ChatMessage, Role};

/// Link schemes that must never reach an href or src
const BLOCKED_SCHEMES: &[&str] = &["javascript:", "vbscript:", "data:", "file:"];

/// Render markdown to sanitised HTML.
pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let events = Parser::new_ext(markdown, options).map(sanitize);

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, events);
    out
}

fn sanitize(event: Event<'_>) -> Event<'_> {
    match event {
        // Emitted as text, so the HTML writer escapes it.
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Link {
            link_type,
            dest_url: safe_url(dest_url),
            title,
            id,
        }),
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Image {
            link_type,
            dest_url: safe_url(dest_url),
            title,
            id,
        }),
        other => other,
    }
}

fn safe_url(url: CowStr<'_>) -> CowStr<'_> {
    if is_blocked(&url) {
        CowStr::Borrowed("#")
    } else {
        url
    }
}

fn is_blocked(url: &str) -> bool {
    // Browsers ignore whitespace and control characters inside the scheme.
    let normalized: String = url
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .take(16)
        .collect::<String>()
        .to_ascii_lowercase();

    BLOCKED_SCHEMES.iter().any(|s| normalized.starts_with(s))
}

/// Escape text for use in HTML content or attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    // Writing into a String cannot fail.
    let _ = pulldown_cmark_escape::escape_html(&mut out, text);
    out
}

const EXPORT_STYLE: &str = "body{font-family:system-ui,sans-serif;max-width:48rem;margin:2rem auto;padding:0 1rem;color:#222}\
.msg{border-radius:8px;padding:.75rem 1rem;margin:.75rem 0}\
.user{background:#e8f0fe}\
.assistant{background:#f4f4f4}\
.role{font-size:.75rem;font-weight:600;text-transform:uppercase;color:#666}\
pre{overflow-x:auto;background:#eee;padding:.5rem}";

/// Standalone HTML page of a conversation.
pub fn export_transcript_html(knowledge: &KnowledgeBase, messages: &[ChatMessage]) -> String {
    let mut page = String::new();
    page.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    page.push_str("<title>folio transcript</title>\n");
    page.push_str(&format!("<style>{}</style>\n</head>\n<body>\n", EXPORT_STYLE));

    page.push_str("<h1>Conversation</h1>\n");
    page.push_str(&format!(
        "<p class=\"meta\">Exported {} from {}</p>\n",
        escape_html(&Local::now().format("%Y-%m-%d %H:%M").to_string()),
        escape_html(&knowledge.sources().join(", "))
    ));

    for message in messages {
        let role = match message.role {
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        page.push_str(&format!(
            "<div class=\"msg {role}\" id=\"m-{id}\">\n<div class=\"role\">{role}</div>\n{body}</div>\n",
            role = role,
            id = escape_html(&message.id),
            body = markdown_to_html(&message.content),
        ));
    }

    page.push_str("</body>\n</html>\n");
    page
}
