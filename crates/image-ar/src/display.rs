use image_ar_core::{DisplaySize, VideoPlacement, VirtualCamera};

/// The host's display container.
///
/// Methods take `&self`: the container belongs to the host and is mutated
/// through its own handle, the session never owns it.
pub trait DisplaySurface {
    /// Video handle type the container knows how to show.
    type Video;

    /// Current on-screen size of the container.
    fn container_size(&self) -> DisplaySize;

    /// Show `video` in a layer behind all AR content.
    fn insert_video_layer(&self, video: &Self::Video);

    /// Remove the layer previously inserted for `video`.
    fn remove_video_layer(&self, video: &Self::Video);

    /// Size and offset the video layer so it covers the container.
    fn place_video(&self, placement: &VideoPlacement);

    /// Install the projection of the display camera.
    fn apply_camera(&self, camera: &VirtualCamera);

    fn set_loading_visible(&self, visible: bool);
}
