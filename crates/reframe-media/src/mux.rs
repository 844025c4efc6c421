//! Final audio mux and the static center-crop render.

use std::path::Path;
use tracing::info;

use reframe_models::{EncodingConfig, VideoMetadata};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Combine a rendered video-only file with the original audio track.
///
/// The video stream is copied untouched. A source without audio yields a
/// silent output.
pub async fn mux_audio(
    video_only: impl AsRef<Path>,
    original: impl AsRef<Path>,
    output: impl AsRef<Path>,
    encoding: &EncodingConfig,
) -> MediaResult<()> {
    let video_only = video_only.as_ref();
    if !video_only.exists() {
        return Err(MediaError::FileNotFound(video_only.to_path_buf()));
    }

    let cmd = mux_command(video_only, original.as_ref(), output.as_ref(), encoding);
    FfmpegRunner::new().run(&cmd).await?;

    info!("Muxed audio into {}", output.as_ref().display());
    Ok(())
}

fn mux_command(
    video_only: &Path,
    original: &Path,
    output: &Path,
    encoding: &EncodingConfig,
) -> FfmpegCommand {
    FfmpegCommand::new(video_only, output)
        .extra_input(original)
        .map("0:v:0")
        .map("1:a:0?")
        .output_args(["-c:v", "copy"])
        .output_args(encoding.to_audio_args())
        .output_arg("-shortest")
}

/// Render a static 9:16 center crop with audio, no tracking and no zoom.
pub async fn center_crop_reframe(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    meta: &VideoMetadata,
    encoding: &EncodingConfig,
) -> MediaResult<()> {
    let input = input.as_ref();
    if !input.exists() {
        return Err(MediaError::FileNotFound(input.to_path_buf()));
    }

    let cmd = center_crop_command(input, output.as_ref(), meta, encoding);
    FfmpegRunner::new().run(&cmd).await?;

    info!(
        crop_x = meta.center_crop_x(),
        "Center-crop reframe written to {}",
        output.as_ref().display()
    );
    Ok(())
}

/// Crop filter for the center crop; the crop height is clamped to the source.
fn center_crop_filter(meta: &VideoMetadata) -> String {
    let crop_height = meta.target_height.min(meta.height);
    let crop_y = (meta.height - crop_height) / 2;
    format!(
        "crop={}:{}:{}:{},scale={}:{}",
        meta.target_width,
        crop_height,
        meta.center_crop_x(),
        crop_y,
        meta.target_width,
        meta.target_height
    )
}

fn center_crop_command(
    input: &Path,
    output: &Path,
    meta: &VideoMetadata,
    encoding: &EncodingConfig,
) -> FfmpegCommand {
    FfmpegCommand::new(input, output)
        .video_filter(center_crop_filter(meta))
        .map("0:v:0")
        .map("0:a:0?")
        .output_args(encoding.to_ffmpeg_args())
}
