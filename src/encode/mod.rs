pub mod assembler;
pub mod ffmpeg;
pub mod intermediate;
