use gpui::*;
use gpui_component::{ActiveTheme, h_flex, label::Label, v_flex};

use crate::chat::ChatView;
use crate::settings::Settings;

gpui::actions!(shell, [Quit]);

pub const RIGHT_PANE_PLACEHOLDER: &str = "Right side content";

/// Two-pane shell: the chat surface on the left, a placeholder pane on the right.
pub struct ChatAppShell {
    chat_view: Entity<ChatView>,
}

impl ChatAppShell {
    pub fn new(settings: &Settings, window: &mut Window, cx: &mut Context<Self>) -> Self {
        let chat_view = cx.new(|cx| ChatView::new(settings, window, cx));
        Self { chat_view }
    }
}

impl Render for ChatAppShell {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let theme = cx.theme();

        h_flex()
            .id("app-shell")
            .size_full()
            .bg(theme.background)
            .text_color(theme.foreground)
            .child(
                div()
                    .id("app-shell-chat")
                    .flex_1()
                    .h_full()
                    .min_w_0()
                    .border_r_1()
                    .border_color(theme.border)
                    .child(self.chat_view.clone()),
            )
            .child(
                v_flex()
                    .id("app-shell-aside")
                    .flex_1()
                    .h_full()
                    .items_center()
                    .justify_center()
                    .child(
                        Label::new(RIGHT_PANE_PLACEHOLDER)
                            .text_color(theme.foreground.opacity(0.6)),
                    ),
            )
    }
}
