//! 记忆层：学习数据源（互动模式 / 成功话题）与学习上下文混合

pub mod blender;
pub mod learning;

pub use blender::{blend, LearningBlender, LearningContext};
pub use learning::{
    EngagementPattern, FileLearningStore, InMemoryLearningStore, LearningSource, SuccessfulTopic,
};
