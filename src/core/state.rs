//! 系统状态快照：账号、系统健康、市场情绪
//!
//! 每个 tick 重新组装一次，只读；约束闸门与决策服务都基于它工作。

use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::core::Step;
use crate::cycle::CycleStore;
use crate::platform::SocialPlatform;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemState {
    /// 账号子状态；拉取失败时为 None
    pub account: Option<AccountState>,
    pub system: SystemHealth,
    pub market: MarketState,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountState {
    pub follower_count: u64,
    pub posts_today: u32,
    pub last_post_time: Option<chrono::DateTime<Utc>>,
    pub engagement_rate: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiStatus {
    #[default]
    Ok,
    Degraded,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemHealth {
    pub healthy: bool,
    pub api_status: ApiStatus,
    pub rate_limits_ok: bool,
}

impl Default for SystemHealth {
    fn default() -> Self {
        Self {
            healthy: true,
            api_status: ApiStatus::Ok,
            rate_limits_ok: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketState {
    pub sentiment: String,
    pub volatility: f64,
    pub trending_topics: Vec<String>,
}

impl Default for MarketState {
    fn default() -> Self {
        Self {
            sentiment: "neutral".to_string(),
            volatility: 0.0,
            trending_topics: Vec::new(),
        }
    }
}

impl SystemState {
    /// 健康的默认快照，测试中常以此为基础修改单个字段
    pub fn healthy(account: AccountState) -> Self {
        Self {
            account: Some(account),
            system: SystemHealth::default(),
            market: MarketState::default(),
        }
    }
}

/// 从平台账号信息与周期存档组装本次 tick 的快照
///
/// 账号拉取失败不报错：account 置 None、api_status 置 Error，由约束闸门给出 wait。
/// 今日发帖数优先取平台返回值，缺失时统计当天已存档的成功发帖。
pub async fn collect_system_state(
    platform: &dyn SocialPlatform,
    cycles: &dyn CycleStore,
    limit: Duration,
) -> SystemState {
    let info = Step::enrichment("account_info", limit)
        .best_effort(platform.get_account_info())
        .await;

    let Some(info) = info else {
        return SystemState {
            account: None,
            system: SystemHealth {
                api_status: ApiStatus::Error,
                ..SystemHealth::default()
            },
            market: MarketState::default(),
        };
    };

    let posts_today = match info.posts_today {
        Some(n) => n,
        None => Step::persistence("posts_today", limit)
            .best_effort(cycles.posts_on(Utc::now().date_naive()))
            .await
            .unwrap_or(0),
    };

    SystemState {
        account: Some(AccountState {
            follower_count: info.follower_count,
            posts_today,
            last_post_time: info.last_post_time,
            engagement_rate: info.engagement_rate,
        }),
        system: SystemHealth {
            healthy: true,
            api_status: ApiStatus::Ok,
            rate_limits_ok: info.rate_limit_remaining != Some(0),
        },
        market: MarketState::default(),
    }
}
