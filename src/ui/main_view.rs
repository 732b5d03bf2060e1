use super::render_util::{
    VideoSource, choose_source, color_to_hsla, frame_to_image, place_labels, video_box_size,
};
use super::titlebar::StatusBadge;
use super::{
    ActiveTheme, AnyElement, AppView, Arc, Context, IntoElement, ObjectFit, ParentElement,
    RenderImage, Styled, StyledImage, Window, div, img, px, v_flex,
};
use crate::pipeline::detection_loop::LoopState;

impl AppView {
    pub(super) fn render_main(&mut self, window: &mut Window, cx: &mut Context<'_, Self>) -> AnyElement {
        let mut changed = false;
        while let Ok(overlay) = self.overlay_rx.try_recv() {
            self.latest_overlay = Some(overlay);
            changed = true;
        }

        let mut fresh = None;
        while let Ok(frame) = self.frame_rx.try_recv() {
            fresh = Some(frame);
        }
        if fresh.is_none() && self.latest_image.is_none() {
            // The bootstrap hands over the first frame directly.
            fresh = self.latest_frame.take();
        }
        if let Some(frame) = fresh {
            self.submit_tick(&frame);
            self.latest_frame = Some(frame);
            changed = true;
        }

        if changed {
            let shown = match choose_source(self.latest_overlay.as_ref(), self.latest_frame.as_ref()) {
                Some(VideoSource::Annotated(result)) => Some((
                    frame_to_image(&result.frame, Some(&result.overlay)),
                    result.display,
                    true,
                )),
                Some(VideoSource::Live(frame)) => {
                    Some((frame_to_image(frame, None), frame.display_size(), false))
                }
                None => None,
            };
            if let Some((Some(image), display, annotated)) = shown {
                self.replace_latest_image(image, window, cx);
                self.shown_display = Some(display);
                self.annotated = annotated;
            }
        }

        let (box_w, box_h) = video_box_size(self.shown_display);

        let mut video = div()
            .relative()
            .w(px(box_w))
            .h(px(box_h))
            .overflow_hidden()
            .rounded_lg()
            .bg(gpui::rgb(0x000000));

        video = match &self.latest_image {
            Some(image) => video.child(
                img(image.clone())
                    .size_full()
                    .object_fit(ObjectFit::Contain),
            ),
            None => video.child(
                div()
                    .size_full()
                    .flex()
                    .items_center()
                    .justify_center()
                    .text_sm()
                    .text_color(gpui::rgb(0x8b95a5))
                    .child("Waiting for camera..."),
            ),
        };

        // Text only accompanies the frame its overlay was computed on.
        let labels = match (&self.latest_overlay, self.annotated) {
            (Some(overlay), true) => place_labels(overlay, (box_w, box_h)),
            _ => Vec::new(),
        };
        for label in labels {
            video = video.child(
                div()
                    .absolute()
                    .left(px(label.left))
                    .top(px(label.top))
                    .text_size(px(label.font_size))
                    .line_height(px(label.font_size))
                    .whitespace_nowrap()
                    .text_color(color_to_hsla(label.color))
                    .child(label.text),
            );
        }

        let badges = self.status_badges(cx);
        let titlebar = self.render_titlebar(&badges, window, cx);

        v_flex()
            .size_full()
            .bg(gpui::rgb(0x1a2332))
            .child(titlebar)
            .child(
                v_flex()
                    .flex_1()
                    .p_4()
                    .items_center()
                    .justify_center()
                    .child(video),
            )
            .into_any_element()
    }

    fn status_badges(&self, cx: &mut Context<'_, Self>) -> Vec<StatusBadge> {
        let theme = cx.theme();
        let running = self
            .detection
            .as_ref()
            .is_some_and(|d| d.state() == LoopState::Running);

        let detection = if running {
            StatusBadge {
                icon: "●",
                text: "Detection running".to_string(),
                color: theme.success,
            }
        } else {
            StatusBadge {
                icon: "○",
                text: "Detection idle".to_string(),
                color: theme.muted_foreground,
            }
        };

        let camera = match (&self.camera, &self.latest_frame) {
            (Some(camera), Some(frame)) => StatusBadge {
                icon: "●",
                text: format!("{} {}x{}", camera.label(), frame.width, frame.height),
                color: theme.success,
            },
            _ => StatusBadge {
                icon: "○",
                text: "Waiting for camera".to_string(),
                color: theme.muted_foreground,
            },
        };

        let faces = self.latest_overlay.as_ref().map_or(0, |o| o.faces);
        let summary = StatusBadge {
            icon: "◉",
            text: format!("{faces} face(s), {} skipped ticks", self.skipped_ticks),
            color: theme.foreground,
        };

        vec![detection, camera, summary]
    }

    fn replace_latest_image(
        &mut self,
        new_image: Arc<RenderImage>,
        window: &mut Window,
        cx: &mut Context<'_, Self>,
    ) {
        if let Some(old_image) = self.latest_image.replace(new_image) {
            // Explicitly drop the previous GPU texture; otherwise the sprite atlas keeps
            // every frame and memory will climb rapidly while the camera is running.
            cx.drop_image(old_image, Some(window));
        }
    }
}
