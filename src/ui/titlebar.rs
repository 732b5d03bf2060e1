use super::{
    AnyElement, AppView, Context, Hsla, InteractiveElement, IntoElement, ParentElement, Styled,
    Window, WindowControlArea, div, h_flex, px,
};

#[cfg(target_os = "windows")]
use gpui::SharedString;

pub(super) struct StatusBadge {
    pub icon: &'static str,
    pub text: String,
    pub color: Hsla,
}

impl AppView {
    pub(super) fn render_titlebar(
        &self,
        badges: &[StatusBadge],
        window: &mut Window,
        _cx: &mut Context<'_, Self>,
    ) -> AnyElement {
        #[cfg(target_os = "windows")]
        let controls = windows_controls(window);

        #[cfg(target_os = "macos")]
        let controls = macos_controls(window);

        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        let controls = linux_controls(window);

        let badge_row = badges.iter().fold(
            h_flex().gap_3().pl(px(80.0)).pr_3().h_full().items_center(),
            |row, badge| {
                row.child(
                    div()
                        .px_2()
                        .py_0p5()
                        .rounded_md()
                        .bg(gpui::rgba(0x00000033))
                        .text_xs()
                        .text_color(badge.color)
                        .child(format!("{} {}", badge.icon, badge.text)),
                )
            },
        );

        h_flex()
            .window_control_area(WindowControlArea::Drag)
            .h(px(32.0))
            .w_full()
            .items_center()
            .justify_between()
            .bg(gpui::rgb(0x1a2332))
            .child(badge_row)
            .child(controls)
            .into_any_element()
    }
}

#[cfg(target_os = "windows")]
fn windows_controls(window: &Window) -> AnyElement {
    let hover = gpui::rgb(0x404040);
    let close_hover = gpui::rgb(0xe81120);
    let font_family: SharedString = "Segoe Fluent Icons".into();
    let maximize_glyph = if window.is_maximized() {
        "\u{e923}"
    } else {
        "\u{e922}"
    };

    let button = |id: &'static str, area: WindowControlArea, glyph: &'static str, hover_bg: gpui::Rgba| {
        div()
            .id(id)
            .flex()
            .items_center()
            .justify_center()
            .occlude()
            .w(px(46.0))
            .h_full()
            .text_size(px(10.0))
            .hover(move |s| s.bg(hover_bg))
            .window_control_area(area)
            .child(glyph)
    };

    div()
        .id("windows-window-controls")
        .font_family(font_family)
        .flex()
        .flex_row()
        .max_h(px(32.0))
        .min_h(px(32.0))
        .child(button("minimize", WindowControlArea::Min, "\u{e921}", hover))
        .child(button("maximize-or-restore", WindowControlArea::Max, maximize_glyph, hover))
        .child(button("close", WindowControlArea::Close, "\u{e8bb}", close_hover))
        .into_any_element()
}

#[cfg(target_os = "macos")]
fn macos_controls(_window: &Window) -> AnyElement {
    // Traffic lights are drawn by the system.
    div().into_any_element()
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn linux_controls(_window: &Window) -> AnyElement {
    let icon_color = gpui::rgb(0xc9d1d9);

    let button = |id: &'static str, area: WindowControlArea, path: &'static str, hover_bg: gpui::Rgba| {
        div()
            .id(id)
            .size(px(28.0))
            .flex()
            .items_center()
            .justify_center()
            .rounded_md()
            .cursor_pointer()
            .window_control_area(area)
            .hover(move |s| s.bg(hover_bg))
            .child(
                gpui::svg()
                    .size(px(16.0))
                    .path(path)
                    .text_color(icon_color),
            )
    };

    h_flex()
        .gap_1()
        .px_2()
        .child(button(
            "linux-minimize",
            WindowControlArea::Min,
            "M 4,8 H 12",
            gpui::rgb(0x1f2428),
        ))
        .child(button(
            "linux-maximize",
            WindowControlArea::Max,
            "M 4,4 H 12 V 12 H 4 Z",
            gpui::rgb(0x1f2428),
        ))
        .child(button(
            "linux-close",
            WindowControlArea::Close,
            "M 4,4 L 12,12 M 12,4 L 4,12",
            gpui::rgb(0xe81123),
        ))
        .into_any_element()
}
