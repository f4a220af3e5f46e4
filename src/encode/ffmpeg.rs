use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStderr, Command, Stdio};
use std::thread::JoinHandle;

use crate::error::{Error, Result};
use crate::render::canvas::{Canvas, CHANNELS, FFMPEG_PIX_FMT};
use crate::render::synth::{CanvasSpec, FrameSink};

const STDERR_TAIL_CHARS: usize = 500;

/// Codec settings for the silent intermediate stream.
#[derive(Clone, Debug, PartialEq)]
pub struct IntermediateSettings {
    pub codec: String,
    pub pix_fmt: String,
    pub crf: u32,
    pub preset: String,
}

impl Default for IntermediateSettings {
    fn default() -> Self {
        Self {
            codec: "libx264".into(),
            pix_fmt: "yuv420p".into(),
            crf: 18,
            preset: "medium".into(),
        }
    }
}

/// Raw frames piped into an ffmpeg child that writes a silent video.
///
/// stderr is drained on a separate thread so a chatty encoder can never
/// fill the pipe and stall frame writes.
pub struct FfmpegFrameSink {
    child: Option<Child>,
    stderr: Option<JoinHandle<Vec<u8>>>,
    frame_len: usize,
    path: PathBuf,
}

impl FfmpegFrameSink {
    pub fn open(
        binary: &Path,
        output_path: &Path,
        canvas: CanvasSpec,
        fps: u32,
        settings: &IntermediateSettings,
    ) -> Result<Self> {
        // ffmpeg only notices an unwritable output once frames arrive.
        std::fs::File::create(output_path).map_err(|e| Error::WriterOpen {
            path: output_path.to_path_buf(),
            reason: format!("cannot create intermediate video: {e}"),
        })?;

        let args = intermediate_args(output_path, canvas, fps, settings);
        log::debug!("Frame sink: {} {}", binary.display(), args.join(" "));

        let mut child = Command::new(binary)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::WriterOpen {
                path: output_path.to_path_buf(),
                reason: if e.kind() == ErrorKind::NotFound {
                    format!("ffmpeg not found at '{}'. Is ffmpeg installed?", binary.display())
                } else {
                    format!("failed to spawn '{}': {}", binary.display(), e)
                },
            })?;

        log::info!(
            "Frame sink started: {}x{} @ {}fps, codec={}",
            canvas.width,
            canvas.height,
            fps,
            settings.codec
        );

        let stderr = child.stderr.take().map(drain);

        Ok(Self {
            child: Some(child),
            stderr,
            frame_len: canvas.width as usize * canvas.height as usize * CHANNELS,
            path: output_path.to_path_buf(),
        })
    }

    /// Close stdin, wait, and turn a non-zero exit into `EncodeFailure`.
    fn close(&mut self) -> Result<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        drop(child.stdin.take());

        let status = child
            .wait()
            .map_err(|e| Error::io("Failed to wait for ffmpeg", e))?;
        let stderr = self
            .stderr
            .take()
            .map(|handle| handle.join().unwrap_or_default())
            .unwrap_or_default();

        if !status.success() {
            return Err(Error::EncodeFailure {
                stage: "intermediate",
                status: status.to_string(),
                stderr: stderr_tail(&stderr),
            });
        }
        Ok(())
    }
}

impl FrameSink for FfmpegFrameSink {
    fn write_frame(&mut self, canvas: &Canvas) -> Result<()> {
        let pixels = canvas.as_bytes();
        if pixels.len() != self.frame_len {
            return Err(Error::InvalidSettings(format!(
                "frame is {} bytes, sink expects {}",
                pixels.len(),
                self.frame_len
            )));
        }

        let stdin = self
            .child
            .as_mut()
            .and_then(|c| c.stdin.as_mut())
            .ok_or_else(|| Error::io("FFmpeg stdin not available", ErrorKind::BrokenPipe.into()))?;

        if let Err(write_err) = stdin.write_all(pixels) {
            // ffmpeg usually died first; its stderr says why.
            return match self.close() {
                Err(e @ Error::EncodeFailure { .. }) => Err(e),
                _ => Err(Error::io("Failed to write frame to ffmpeg", write_err)),
            };
        }
        Ok(())
    }

    fn finish(mut self) -> Result<()> {
        self.close()?;
        log::info!("Intermediate encode complete: {}", self.path.display());
        Ok(())
    }
}

impl Drop for FfmpegFrameSink {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            drop(child.stdin.take());
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

fn intermediate_args(output_path: &Path, canvas: CanvasSpec, fps: u32, settings: &IntermediateSettings) -> Vec<String> {
    vec![
        "-hide_banner".into(),
        "-loglevel".into(), "error".into(),
        "-y".into(),
        "-f".into(), "rawvideo".into(),
        "-pixel_format".into(), FFMPEG_PIX_FMT.into(),
        "-video_size".into(), format!("{}x{}", canvas.width, canvas.height),
        "-framerate".into(), fps.to_string(),
        "-i".into(), "pipe:0".into(),
        "-an".into(),
        "-c:v".into(), settings.codec.clone(),
        "-pix_fmt".into(), settings.pix_fmt.clone(),
        "-crf".into(), settings.crf.to_string(),
        "-preset".into(), settings.preset.clone(),
        output_path.to_string_lossy().into_owned(),
    ]
}

fn drain(mut stderr: ChildStderr) -> JoinHandle<Vec<u8>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = stderr.read_to_end(&mut buf);
        buf
    })
}

/// Run ffmpeg to completion with captured output.
///
/// A missing binary is `EncoderMissing`; a non-zero exit is `EncodeFailure`
/// tagged with `stage`.
pub fn run(binary: &Path, args: &[String], stage: &'static str) -> Result<()> {
    log::debug!("{} encode: {} {}", stage, binary.display(), args.join(" "));

    let output = Command::new(binary)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| spawn_error(binary, e))?;

    if !output.status.success() {
        return Err(Error::EncodeFailure {
            stage,
            status: output.status.to_string(),
            stderr: stderr_tail(&output.stderr),
        });
    }
    Ok(())
}

/// Fail fast when the encoder binary cannot be executed.
pub fn probe(binary: &Path) -> Result<()> {
    run(binary, &["-hide_banner".into(), "-version".into()], "probe")
}

fn spawn_error(binary: &Path, e: std::io::Error) -> Error {
    if e.kind() == ErrorKind::NotFound {
        Error::EncoderMissing {
            binary: binary.to_path_buf(),
        }
    } else {
        Error::io(format!("Failed to spawn {}", binary.display()), e)
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let chars: Vec<char> = text.chars().collect();
    let start = chars.len().saturating_sub(STDERR_TAIL_CHARS);
    chars[start..].iter().collect::<String>().trim().to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intermediate_args_describe_raw_input() {
        let canvas = CanvasSpec {
            width: 1080,
            height: 1920,
        };
        let args = intermediate_args(Path::new("/tmp/x.mp4"), canvas, 30, &IntermediateSettings::default());
        let joined = args.join(" ");
        assert!(joined.contains("-f rawvideo -pixel_format rgb24 -video_size 1080x1920 -framerate 30"));
        assert!(joined.contains("-an -c:v libx264 -pix_fmt yuv420p -crf 18"));
        assert_eq!(args.last().map(String::as_str), Some("/tmp/x.mp4"));
    }

    #[test]
    fn missing_binary_is_encoder_missing() {
        let err = run(Path::new("/definitely/not/ffmpeg"), &[], "primary").err().unwrap();
        assert!(matches!(err, Error::EncoderMissing { .. }));
        assert!(err.to_string().contains("Install ffmpeg"));
    }

    #[test]
    fn missing_binary_fails_sink_open() {
        let dir = tempfile::tempdir().unwrap();
        let canvas = CanvasSpec {
            width: 2,
            height: 2,
        };
        let err = FfmpegFrameSink::open(
            Path::new("/definitely/not/ffmpeg"),
            &dir.path().join("silent.mp4"),
            canvas,
            30,
            &IntermediateSettings::default(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, Error::WriterOpen { .. }));
    }

    #[test]
    fn unwritable_output_fails_open_before_spawning() {
        let dir = tempfile::tempdir().unwrap();
        let canvas = CanvasSpec {
            width: 2,
            height: 2,
        };
        for path in [dir.path().join("missing").join("silent.mp4"), dir.path().to_path_buf()] {
            // The binary is never reached, so any name works here.
            let err = FfmpegFrameSink::open(Path::new("ffmpeg"), &path, canvas, 30, &IntermediateSettings::default())
                .err()
                .unwrap();
            match err {
                Error::WriterOpen { path: reported, .. } => assert_eq!(reported, path),
                other => panic!("expected WriterOpen, got {other}"),
            }
        }
        assert!(!dir.path().join("missing").exists());
    }

    #[cfg(unix)]
    #[test]
    fn stderr_is_drained_past_the_pipe_buffer() {
        let mut child = Command::new("sh")
            .args(["-c", "head -c 200000 /dev/zero >&2; exit 3"])
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();
        let handle = drain(child.stderr.take().unwrap());
        let status = child.wait().unwrap();
        assert!(!status.success());
        assert_eq!(handle.join().unwrap().len(), 200_000);
    }

    #[test]
    fn stderr_tail_keeps_the_end() {
        let long = "x".repeat(1000) + "the actual error";
        let tail = stderr_tail(long.as_bytes());
        assert_eq!(tail.chars().count(), STDERR_TAIL_CHARS);
        assert!(tail.ends_with("the actual error"));
    }
}
