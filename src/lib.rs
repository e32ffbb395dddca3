#![forbid(unsafe_code)]

pub mod apply;
pub mod engine;
pub mod error;
pub mod machine;
pub mod pixel;
pub mod program;

pub use apply::apply;
pub use engine::{EngineFailure, ImageEngine, ImageId, MemoryEngine};
pub use error::{ChanfxError, ChanfxResult};
pub use machine::{MAX_STACK, evaluate};
pub use pixel::{Channel, ChannelMask, Pixel, Quantum, RefColor};
pub use program::{MAX_PROGRAM_STEPS, Program, ProgramBuilder, Step};
