use std::{
    fs::File,
    io::{BufWriter, Write},
};

use camino::{Utf8Path, Utf8PathBuf};
use image::{
    buffer::ConvertBuffer,
    codecs::gif::{GifEncoder, Repeat},
    Delay, Frame, ImageFormat, ImageResult, RgbImage, RgbaImage,
};
use tracing::debug;

use super::{
    config::Style,
    error::{Stage, ThumbnailError},
};

/// Milliseconds each frame of an animated thumbnail stays up.
pub const FRAME_DELAY_MS: u32 = 120;

/// Ids go into file names, so keep them to `[A-Za-z0-9_-]`.
fn file_stem(video_id: &str) -> String {
    video_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Deterministic output location for a video id and style.
pub fn cache_path(dir: &Utf8Path, video_id: &str, style: Style) -> Utf8PathBuf {
    dir.join(format!(
        "{}_{}.{}",
        file_stem(video_id),
        style,
        style.extension()
    ))
}

/// A present file is trusted as-is. It never expires.
pub async fn cached(path: &Utf8Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

/// Encodes into a temp file next to `path` and renames it into place, so
/// readers never see a half-written image and concurrent renders of the same
/// video just replace each other.
fn write_atomically<F>(path: &Utf8Path, encode: F) -> Result<(), ThumbnailError>
where
    F: FnOnce(&mut BufWriter<&mut File>) -> ImageResult<()>,
{
    let failed = |err: std::io::Error| ThumbnailError::render(Stage::Encode, err);
    let dir = path.parent().unwrap_or(Utf8Path::new("."));
    std::fs::create_dir_all(dir).map_err(failed)?;

    let mut file = tempfile::Builder::new()
        .prefix(".render-")
        .tempfile_in(dir)
        .map_err(failed)?;
    {
        let mut writer = BufWriter::new(file.as_file_mut());
        encode(&mut writer).map_err(|err| ThumbnailError::render(Stage::Encode, err))?;
        writer.flush().map_err(failed)?;
    }
    file.persist(path).map_err(|err| failed(err.error))?;
    debug!(%path, "thumbnail written");
    Ok(())
}

/// Thumbnails are full-bleed, so the alpha channel is dropped on the way out.
pub fn write_png(path: &Utf8Path, image: &RgbaImage) -> Result<(), ThumbnailError> {
    let rgb: RgbImage = image.convert();
    write_atomically(path, |writer| rgb.write_to(writer, ImageFormat::Png))
}

/// Stray sub-255 alpha would become transparent palette entries in a GIF.
fn seal(mut frame: RgbaImage) -> RgbaImage {
    for px in frame.pixels_mut() {
        px[3] = 255;
    }
    frame
}

/// Looping GIF, one frame per image.
pub fn write_gif(path: &Utf8Path, frames: Vec<RgbaImage>) -> Result<(), ThumbnailError> {
    write_atomically(path, |writer| {
        let mut encoder = GifEncoder::new_with_speed(writer, 10);
        encoder.set_repeat(Repeat::Infinite)?;
        encoder.encode_frames(frames.into_iter().map(|buffer| {
            Frame::from_parts(seal(buffer), 0, 0, Delay::from_numer_denom_ms(FRAME_DELAY_MS, 1))
        }))
    })
}

#[cfg(test)]
mod tests {
    use std::{fs, io::BufReader};

    use image::{codecs::gif::GifDecoder, AnimationDecoder, Rgba};

    use super::*;
    use crate::thumbnail::config::Gradient;

    fn utf8(dir: &tempfile::TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap()
    }

    #[test]
    fn path_is_keyed_by_id_and_style() {
        let dir = Utf8Path::new("cache");
        assert_eq!(
            cache_path(dir, "dQw4w9WgXcQ", Style::still(Gradient::Diagonal)),
            "cache/dQw4w9WgXcQ_diagonal.png"
        );
        assert_eq!(
            cache_path(dir, "dQw4w9WgXcQ", Style::pulsing(Gradient::Radial)),
            "cache/dQw4w9WgXcQ_radial_pulse.gif"
        );
        assert_eq!(
            cache_path(dir, "../../etc/passwd", Style::default()),
            "cache/______etc_passwd_diagonal.png"
        );
    }

    #[test]
    fn png_lands_without_leftovers() -> color_eyre::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = utf8(&dir).join("thumbs").join("abc_diagonal.png");
        write_png(&path, &RgbaImage::from_pixel(32, 18, Rgba([9, 9, 9, 255])))?;

        assert_eq!(image::image_dimensions(&path)?, (32, 18));
        assert_eq!(image::open(&path)?.color(), image::ColorType::Rgb8);
        let names: Vec<_> = fs::read_dir(path.parent().unwrap())?
            .map(|entry| entry.map(|e| e.file_name()))
            .collect::<Result<_, _>>()?;
        assert_eq!(names, vec!["abc_diagonal.png"]);
        Ok(())
    }

    #[test]
    fn failed_encode_leaves_nothing_behind() -> color_eyre::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = utf8(&dir).join("abc_diagonal.png");
        let err = write_atomically(&path, |writer| {
            writer.write_all(b"half an image")?;
            Err(std::io::Error::other("encoder gave up").into())
        })
        .unwrap_err();

        assert_eq!(err.stage(), Stage::Encode);
        assert_eq!(fs::read_dir(dir.path())?.count(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn gif_loops_every_frame() -> color_eyre::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = utf8(&dir).join("abc_radial_pulse.gif");
        assert!(!cached(&path).await);

        let frames = (0..4)
            .map(|i| RgbaImage::from_pixel(16, 9, Rgba([i * 60, 0, 0, 254])))
            .collect();
        write_gif(&path, frames)?;

        assert!(cached(&path).await);
        let decoder = GifDecoder::new(BufReader::new(File::open(&path)?))?;
        let frames = decoder.into_frames().collect_frames()?;
        assert_eq!(frames.len(), 4);
        assert!(frames
            .iter()
            .all(|frame| frame.buffer().pixels().all(|p| p[3] == 255)));
        Ok(())
    }
}
