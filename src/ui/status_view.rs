use super::render_util::progress_bar_string;
use super::{
    ActiveTheme, AnyElement, AppView, Context, IntoElement, ParentElement, Screen, Styled,
    StyledExt, Tag, Window, div, h_flex, v_flex,
};

impl AppView {
    pub(super) fn render_status(
        &self,
        screen: &Screen,
        window: &mut Window,
        cx: &mut Context<'_, Self>,
    ) -> AnyElement {
        let titlebar = self.render_titlebar(&[], window, cx);
        let theme = cx.theme();

        let mut container = v_flex()
            .gap_3()
            .p_6()
            .min_w(super::px(420.0))
            .rounded_lg()
            .border_1()
            .border_color(theme.border)
            .bg(theme.group_box);

        match screen {
            Screen::Bootstrapping(state) => {
                container = container.child(
                    h_flex()
                        .gap_2()
                        .items_center()
                        .child(
                            div()
                                .text_color(theme.foreground)
                                .font_semibold()
                                .child("⟳ Starting up"),
                        )
                        .child(
                            div()
                                .text_sm()
                                .text_color(theme.muted_foreground)
                                .child("face models and camera"),
                        ),
                );
                for entry in &state.models {
                    container = container.child(
                        h_flex()
                            .gap_3()
                            .items_center()
                            .justify_between()
                            .child(
                                div()
                                    .text_sm()
                                    .text_color(theme.muted_foreground)
                                    .child(entry.model.label()),
                            )
                            .child(
                                div()
                                    .px_2()
                                    .rounded_md()
                                    .bg(theme.muted)
                                    .font_family(theme.mono_font_family.clone())
                                    .text_xs()
                                    .text_color(theme.foreground)
                                    .child(progress_bar_string(
                                        entry.downloaded,
                                        entry.total,
                                        entry.ready,
                                    )),
                            ),
                    );
                }
                container = container.child(
                    div()
                        .text_color(theme.foreground)
                        .child(state.message.clone()),
                );
            }
            Screen::Failed { message } => {
                container = container
                    .child(
                        div()
                            .text_color(gpui::rgb(0xfca5a5))
                            .font_semibold()
                            .child("✗ Startup failed"),
                    )
                    .child(Tag::danger().rounded_full().child(message.clone()))
                    .child(
                        div()
                            .text_sm()
                            .text_color(theme.muted_foreground)
                            .child("Check the camera permission and the models directory, then restart."),
                    );
            }
            Screen::Running => {}
        }

        v_flex()
            .size_full()
            .bg(theme.background)
            .child(titlebar)
            .child(
                v_flex()
                    .flex_1()
                    .items_center()
                    .justify_center()
                    .child(container),
            )
            .into_any_element()
    }
}
