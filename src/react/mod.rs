//! 编排层：工具调用主循环、过程事件、默认 system instruction

pub mod events;
pub mod loop_;
pub mod prompt;

pub use events::ReactEvent;
pub use loop_::{run, run_from, ReactSession, ABORT_MESSAGE, MAX_RETRIES};
pub use prompt::DEFAULT_SYSTEM_INSTRUCTION;
