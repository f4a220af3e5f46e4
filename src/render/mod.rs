pub mod canvas;
pub mod color;
pub mod modes;
pub mod particles;
pub mod shapes;
pub mod strategy;
pub mod synth;
