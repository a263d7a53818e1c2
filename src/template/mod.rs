pub mod render;

pub use render::{RenderedPrompt, render_prompt};
