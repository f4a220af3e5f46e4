use std::path::{Path, PathBuf};

use super::ffmpeg;
use super::intermediate::IntermediateVideo;
use crate::error::{Error, Result};

/// Containers that can carry a VP9 stream with alpha.
const ALPHA_CONTAINERS: &[&str] = &["webm"];
/// Containers that cannot hold the H.264 intermediate stream copied as-is.
const NO_H264_CONTAINERS: &[&str] = &["webm"];

/// Inputs and staging destination for one encoder attempt.
pub struct EncodeJob<'a> {
    pub video: &'a Path,
    pub audio: &'a Path,
    pub output: &'a Path,
}

/// One way of producing the final video from the silent stream and the audio.
pub trait VideoEncoderPort {
    fn stage(&self) -> EncodeStage;

    /// Final path this encoder writes for a requested output path.
    fn target_path(&self, requested: &Path) -> PathBuf;

    /// Encode `job`. Success means the process exited 0; the assembler
    /// additionally checks that `job.output` exists.
    fn encode(&self, job: &EncodeJob<'_>) -> Result<()>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncodeStage {
    Alpha,
    Fallback,
}

impl EncodeStage {
    fn label(self) -> &'static str {
        match self {
            EncodeStage::Alpha => "alpha",
            EncodeStage::Fallback => "fallback",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssemblyState {
    NotStarted,
    AlphaEncodeAttempted,
    FallbackEncodeAttempted,
    Done,
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Assembled {
    pub path: PathBuf,
    pub stage: EncodeStage,
}

/// Colorkey parameters for turning near-black into transparency.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorKey {
    pub similarity: f32,
    pub blend: f32,
}

impl Default for ColorKey {
    fn default() -> Self {
        Self {
            similarity: 0.1,
            blend: 0.0,
        }
    }
}

/// VP9 with a 4:2:0 alpha plane, near-black keyed out.
pub struct AlphaCapableEncoder {
    binary: PathBuf,
    key: ColorKey,
}

impl AlphaCapableEncoder {
    pub fn new(binary: PathBuf, key: ColorKey) -> Self {
        Self { binary, key }
    }

    fn args(&self, job: &EncodeJob<'_>) -> Vec<String> {
        let filter = format!(
            "colorkey=0x000000:{:.3}:{:.3},format=yuva420p",
            self.key.similarity, self.key.blend
        );
        vec![
            "-hide_banner".into(),
            "-loglevel".into(), "error".into(),
            "-y".into(),
            "-i".into(), job.video.to_string_lossy().into_owned(),
            "-i".into(), job.audio.to_string_lossy().into_owned(),
            "-map".into(), "0:v:0".into(),
            "-map".into(), "1:a:0".into(),
            "-vf".into(), filter,
            "-c:v".into(), "libvpx-vp9".into(),
            "-pix_fmt".into(), "yuva420p".into(),
            "-profile:v".into(), "0".into(),
            "-auto-alt-ref".into(), "0".into(),
            "-b:v".into(), "0".into(),
            "-crf".into(), "30".into(),
            "-c:a".into(), "libopus".into(),
            "-b:a".into(), "192k".into(),
            "-shortest".into(),
            job.output.to_string_lossy().into_owned(),
        ]
    }
}

impl VideoEncoderPort for AlphaCapableEncoder {
    fn stage(&self) -> EncodeStage {
        EncodeStage::Alpha
    }

    fn target_path(&self, requested: &Path) -> PathBuf {
        if has_extension(requested, ALPHA_CONTAINERS) {
            requested.to_path_buf()
        } else {
            substitute_extension(requested, "webm")
        }
    }

    fn encode(&self, job: &EncodeJob<'_>) -> Result<()> {
        ffmpeg::run(&self.binary, &self.args(job), "alpha")
    }
}

/// Opaque mux: video stream copied, audio re-encoded to AAC.
pub struct FallbackEncoder {
    binary: PathBuf,
}

impl FallbackEncoder {
    pub fn new(binary: PathBuf) -> Self {
        Self { binary }
    }

    fn args(&self, job: &EncodeJob<'_>) -> Vec<String> {
        vec![
            "-hide_banner".into(),
            "-loglevel".into(), "error".into(),
            "-y".into(),
            "-i".into(), job.video.to_string_lossy().into_owned(),
            "-i".into(), job.audio.to_string_lossy().into_owned(),
            "-map".into(), "0:v:0".into(),
            "-map".into(), "1:a:0".into(),
            "-c:v".into(), "copy".into(),
            "-c:a".into(), "aac".into(),
            "-b:a".into(), "192k".into(),
            "-shortest".into(),
            job.output.to_string_lossy().into_owned(),
        ]
    }
}

impl VideoEncoderPort for FallbackEncoder {
    fn stage(&self) -> EncodeStage {
        EncodeStage::Fallback
    }

    fn target_path(&self, requested: &Path) -> PathBuf {
        if has_extension(requested, NO_H264_CONTAINERS) || requested.extension().is_none() {
            substitute_extension(requested, "mp4")
        } else {
            requested.to_path_buf()
        }
    }

    fn encode(&self, job: &EncodeJob<'_>) -> Result<()> {
        ffmpeg::run(&self.binary, &self.args(job), "fallback")
    }
}

/// Muxes the silent video with the source audio through a chain of encoders.
///
/// Each encoder writes to a hidden staging file that is renamed onto the
/// final path only after it succeeds, so a partial video is never left at
/// the output path.
pub struct VideoAssembler {
    chain: Vec<Box<dyn VideoEncoderPort>>,
    state: AssemblyState,
}

impl VideoAssembler {
    pub fn new(chain: Vec<Box<dyn VideoEncoderPort>>) -> Self {
        Self {
            chain,
            state: AssemblyState::NotStarted,
        }
    }

    /// Standard chain: alpha attempt first when transparency is requested,
    /// then the opaque fallback.
    pub fn with_ffmpeg(binary: &Path, transparent: bool, key: ColorKey) -> Self {
        let mut chain: Vec<Box<dyn VideoEncoderPort>> = Vec::new();
        if transparent {
            chain.push(Box::new(AlphaCapableEncoder::new(binary.to_path_buf(), key)));
        }
        chain.push(Box::new(FallbackEncoder::new(binary.to_path_buf())));
        Self::new(chain)
    }

    pub fn state(&self) -> AssemblyState {
        self.state
    }

    /// Produce the final video. `intermediate` is consumed and its file is
    /// deleted before this returns, on success and on failure.
    pub fn compose(&mut self, intermediate: IntermediateVideo, audio: &Path, output: &Path) -> Result<Assembled> {
        let result = self.run_chain(intermediate.path(), audio, output);
        drop(intermediate);
        self.transition(if result.is_ok() { AssemblyState::Done } else { AssemblyState::Failed });
        result
    }

    fn run_chain(&mut self, video: &Path, audio: &Path, output: &Path) -> Result<Assembled> {
        let mut last_err = None;

        for i in 0..self.chain.len() {
            let encoder = &self.chain[i];
            let stage = encoder.stage();
            let target = encoder.target_path(output);
            if target != output {
                log::warn!(
                    "{} encode writes {} instead of {}",
                    stage.label(),
                    target.display(),
                    output.display()
                );
            }

            let staging = staging_path(&target);
            let job = EncodeJob {
                video,
                audio,
                output: &staging,
            };

            log::info!("Assembling video ({} encode)...", stage.label());
            let attempt = encoder.encode(&job).and_then(|()| {
                if staging.exists() {
                    Ok(())
                } else {
                    Err(Error::EncodeFailure {
                        stage: stage.label(),
                        status: "exit 0".into(),
                        stderr: format!("no output written to {}", staging.display()),
                    })
                }
            });

            self.transition(match stage {
                EncodeStage::Alpha => AssemblyState::AlphaEncodeAttempted,
                EncodeStage::Fallback => AssemblyState::FallbackEncodeAttempted,
            });

            match attempt {
                Ok(()) => {
                    std::fs::rename(&staging, &target).map_err(|e| {
                        remove_quietly(&staging);
                        Error::io(format!("Failed to move video into place at {}", target.display()), e)
                    })?;
                    log::info!("Video written: {}", target.display());
                    return Ok(Assembled { path: target, stage });
                }
                Err(e) => {
                    remove_quietly(&staging);
                    if !e.is_recoverable_encode() {
                        return Err(e);
                    }
                    if i + 1 < self.chain.len() {
                        log::warn!("{} encode failed, falling back: {}", stage.label(), e);
                    }
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| Error::InvalidSettings("no encoders configured".into())))
    }

    fn transition(&mut self, next: AssemblyState) {
        log::debug!("Assembler: {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

fn has_extension(path: &Path, candidates: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| candidates.iter().any(|c| e.eq_ignore_ascii_case(c)))
        .unwrap_or(false)
}

fn substitute_extension(path: &Path, ext: &str) -> PathBuf {
    path.with_extension(ext)
}

/// Hidden sibling of `target` that keeps its extension, so ffmpeg still picks
/// the right muxer.
fn staging_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("output");
    target.with_file_name(format!(".partial-{}-{}", std::process::id(), name))
}

fn remove_quietly(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            log::warn!("Failed to remove {}: {}", path.display(), e);
        }
    }
}
