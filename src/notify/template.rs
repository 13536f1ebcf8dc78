use pulldown_cmark::{html, Event, Options, Parser};
use time::format_description::well_known::Rfc2822;

use crate::{include_res, rooms::Room};

pub(super) struct Mail {
    pub subject: String,
    pub html: String,
}

pub(super) fn winner_mail(room: &Room, winner: &str, description: &str) -> Mail {
    Mail {
        subject: format!("You were picked in {}", room.name),
        html: fill(include_res!(str, "/emails/winner.html"), room, winner, description),
    }
}

pub(super) fn result_mail(room: &Room, winner: &str, description: &str) -> Mail {
    Mail {
        subject: format!("{}: the draw is done", room.name),
        html: fill(include_res!(str, "/emails/result.html"), room, winner, description),
    }
}

/// Room descriptions are Markdown. Raw HTML inside them is shown as text.
pub(super) fn description_html(markdown: &str) -> String {
    if markdown.trim().is_empty() {
        return String::new();
    }

    let parser = Parser::new_ext(markdown, Options::ENABLE_STRIKETHROUGH).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        _ => event,
    });

    let mut out = String::new();
    html::push_html(&mut out, parser);
    out
}

fn fill(template: &str, room: &Room, winner: &str, description: &str) -> String {
    let picked_at = room
        .picked_at
        .and_then(|at| at.format(&Rfc2822).ok())
        .unwrap_or_default();

    let values = [
        ("room_name", escape(&room.name)),
        ("winner", escape(winner)),
        ("participant_count", room.participants.len().to_string()),
        ("picked_at", picked_at),
        ("description", description.to_owned()),
    ];

    // One pass over the template; substituted text is never scanned again.
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open + 1..];
        let hit = values
            .iter()
            .find(|(key, _)| tail.starts_with(key) && tail[key.len()..].starts_with('}'));
        match hit {
            Some((key, value)) => {
                out.push_str(value);
                rest = &tail[key.len() + 1..];
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;
    use uuid::Uuid;

    use super::*;
    use crate::rooms::RoomStatus;

    #[test]
    fn markdown_without_raw_html() {
        let html = description_html("**bring snacks** <script>x</script>");
        assert!(html.contains("<strong>bring snacks</strong>"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert_eq!(description_html("   "), "");
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(escape(r#"<a href="x">Tom & 'Jerry'</a>"#), "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;");
    }

    #[test]
    fn placeholders_in_user_text_stay_literal() {
        let room = Room {
            id: Uuid::now_v7(),
            name: "{description} night".into(),
            description: "{winner}".into(),
            participants: vec!["{picked_at}@y.com".into(), "b@y.com".into()],
            status: RoomStatus::Completed,
            winner: Some("{picked_at}@y.com".into()),
            picked_at: Some(OffsetDateTime::UNIX_EPOCH),
            created_at: OffsetDateTime::UNIX_EPOCH,
        };
        let description = description_html(&room.description);

        let html = fill("<h1>{room_name}</h1>{winner}|{participant_count}|{picked_at}|{description}|{other}", &room, "{picked_at}@y.com", &description);
        assert_eq!(
            html,
            "<h1>{description} night</h1>{picked_at}@y.com|2|Thu, 01 Jan 1970 00:00:00 +0000|<p>{winner}</p>\n|{other}"
        );
    }
}
