//! 核心编排层：错误分类、步骤组合子、状态快照、tick 流水线

pub mod deadline;
pub mod error;
pub mod pipeline;
pub mod state;
pub mod step;

pub use deadline::Deadline;
pub use error::AgentError;
pub use pipeline::{Pipeline, TickReport};
pub use step::{Step, StepKind};
