//! 平台层：社交平台 API 抽象、REST 实现与内存实现

pub mod client;
pub mod http;
pub mod mock;
pub mod types;

pub use client::SocialPlatform;
pub use http::HttpPlatformClient;
pub use mock::MockPlatform;
pub use types::{
    AccountInfo, Candidate, EngagementMetrics, MutationResult, SearchParams, UserTweets,
};
