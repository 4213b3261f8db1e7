use gpui::prelude::FluentBuilder as _;
use gpui::*;
use gpui_component::{ActiveTheme, label::Label, v_flex};
use sidechat_storage::{Message, Role};

const USER_BUBBLE_MAX_WIDTH: Pixels = px(540.);
const USER_BUBBLE_PADDING_X: Pixels = px(14.);
const USER_BUBBLE_PADDING_Y: Pixels = px(10.);
pub const WAITING_LABEL: &str = "Waiting for response...";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptRow {
    User(String),
    Reply { speaker: String, content: String },
    Pending(String),
    Error(String),
}

/// Flattens the transcript into rows: stored messages first, then the in-flight reply,
/// then the last failure.
pub fn transcript_rows(
    messages: &[Message],
    draft: Option<&str>,
    error: Option<&str>,
) -> Vec<TranscriptRow> {
    let mut rows: Vec<TranscriptRow> = messages
        .iter()
        .map(|message| match &message.role {
            Role::User => TranscriptRow::User(message.content.clone()),
            role => TranscriptRow::Reply {
                speaker: speaker_label(role),
                content: message.content.clone(),
            },
        })
        .collect();

    if let Some(draft) = draft {
        rows.push(TranscriptRow::Pending(draft.to_string()));
    }
    if let Some(error) = error {
        rows.push(TranscriptRow::Error(error.to_string()));
    }
    rows
}

fn speaker_label(role: &Role) -> String {
    match role {
        Role::System => "System".to_string(),
        Role::User => "You".to_string(),
        Role::Assistant => "Assistant".to_string(),
        Role::Other(name) => name.clone(),
    }
}

pub struct MessageList {
    rows: Vec<TranscriptRow>,
    scroll_handle: ScrollHandle,
}

impl MessageList {
    pub fn new(_cx: &mut Context<Self>) -> Self {
        Self {
            rows: Vec::new(),
            scroll_handle: ScrollHandle::new(),
        }
    }

    pub fn set_rows(&mut self, rows: Vec<TranscriptRow>, cx: &mut Context<Self>) {
        if self.rows == rows {
            return;
        }

        self.rows = rows;
        self.scroll_handle.scroll_to_bottom();
        cx.notify();
    }

    fn render_row(&self, row: &TranscriptRow, cx: &Context<Self>) -> AnyElement {
        let theme = cx.theme();

        match row {
            TranscriptRow::User(content) => v_flex()
                .w_full()
                .items_end()
                .child(
                    div()
                        .max_w(USER_BUBBLE_MAX_WIDTH)
                        .px(USER_BUBBLE_PADDING_X)
                        .py(USER_BUBBLE_PADDING_Y)
                        .rounded_lg()
                        .bg(theme.accent)
                        .text_color(theme.accent_foreground)
                        .text_sm()
                        .child(non_empty(content)),
                )
                .into_any_element(),
            TranscriptRow::Reply { speaker, content } => v_flex()
                .w_full()
                .gap_2()
                .child(
                    Label::new(speaker.clone())
                        .text_xs()
                        .text_color(theme.foreground.opacity(0.5)),
                )
                .child(div().text_sm().child(non_empty(content)))
                .into_any_element(),
            TranscriptRow::Pending(draft) => v_flex()
                .w_full()
                .gap_2()
                .child(
                    Label::new("Assistant")
                        .text_xs()
                        .text_color(theme.foreground.opacity(0.5)),
                )
                .when(draft.trim().is_empty(), |column| {
                    column.child(Label::new(WAITING_LABEL).text_sm())
                })
                .when(!draft.trim().is_empty(), |column| {
                    column.child(div().text_sm().child(draft.clone()))
                })
                .into_any_element(),
            TranscriptRow::Error(error) => Label::new(format!("Error: {error}"))
                .text_xs()
                .text_color(theme.danger)
                .into_any_element(),
        }
    }
}

fn non_empty(content: &str) -> String {
    if content.is_empty() {
        " ".to_string()
    } else {
        content.to_string()
    }
}

impl Render for MessageList {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let rows: Vec<AnyElement> = self
            .rows
            .iter()
            .map(|row| self.render_row(row, cx))
            .collect();

        div()
            .id("message-list")
            .size_full()
            .min_h_0()
            .overflow_y_scroll()
            .track_scroll(&self.scroll_handle)
            .child(v_flex().w_full().px_4().py_3().gap_4().children(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sidechat_storage::MessageId;

    #[test]
    fn rows_follow_message_order_then_draft_then_error() {
        let messages = vec![
            Message::user("hi"),
            Message::assistant("hello"),
            Message::new(MessageId::new("t"), Role::Other("tool".to_string()), "{}"),
        ];

        let rows = transcript_rows(&messages, Some("par"), Some("boom"));

        assert_eq!(
            rows,
            vec![
                TranscriptRow::User("hi".to_string()),
                TranscriptRow::Reply {
                    speaker: "Assistant".to_string(),
                    content: "hello".to_string(),
                },
                TranscriptRow::Reply {
                    speaker: "tool".to_string(),
                    content: "{}".to_string(),
                },
                TranscriptRow::Pending("par".to_string()),
                TranscriptRow::Error("boom".to_string()),
            ]
        );
    }

    #[test]
    fn multiline_content_is_kept_verbatim() {
        let rows = transcript_rows(&[Message::user("a\nb")], None, None);
        assert_eq!(rows, vec![TranscriptRow::User("a\nb".to_string())]);
    }
}
