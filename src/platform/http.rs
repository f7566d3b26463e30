//! 平台 REST 客户端（reqwest）
//!
//! Bearer Token 认证；每个请求带超时。变更接口返回非 2xx 时解析错误体并转为
//! MutationResult { success: false, error }，429 统一为 "Rate limit exceeded"。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use super::{
    AccountInfo, Candidate, EngagementMetrics, MutationResult, SearchParams, SocialPlatform,
    UserTweets,
};

const CONNECT_TIMEOUT_SECS: u64 = 8;

/// 错误响应体：{ "error": "...", "message": "..." }
#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// 列表响应：部分端点返回 { data: [...] }，部分直接返回数组
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListEnvelope<T> {
    Wrapped { data: Vec<T> },
    Bare(Vec<T>),
}

impl<T> ListEnvelope<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            ListEnvelope::Wrapped { data } => data,
            ListEnvelope::Bare(items) => items,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreatedBody {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    data: Option<CreatedData>,
}

#[derive(Debug, Deserialize)]
struct CreatedData {
    #[serde(default)]
    id: Option<String>,
}

#[derive(Clone)]
pub struct HttpPlatformClient {
    base_url: String,
    api_key: Option<String>,
    http: Client,
}

impl HttpPlatformClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, String> {
        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| format!("HTTP client build failed: {}", e))?;
        Ok(Self {
            base_url: base_url.into(),
            api_key,
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    async fn error_message(response: Response) -> String {
        let status = response.status();
        if status.as_u16() == 429 {
            return "Rate limit exceeded".to_string();
        }
        let body = response.text().await.unwrap_or_default();
        let parsed: ApiErrorBody = serde_json::from_str(&body).unwrap_or_default();
        parsed
            .error
            .or(parsed.message)
            .unwrap_or_else(|| format!("HTTP {}: {}", status, body.trim()))
    }

    async fn get_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, String> {
        let response = self
            .authed(builder)
            .send()
            .await
            .map_err(|e| format!("Request failed: {}", e))?;
        if !response.status().is_success() {
            return Err(Self::error_message(response).await);
        }
        response
            .json()
            .await
            .map_err(|e| format!("Decode body: {}", e))
    }

    async fn mutate(&self, builder: RequestBuilder) -> Result<MutationResult, String> {
        let response = self
            .authed(builder)
            .send()
            .await
            .map_err(|e| format!("Request failed: {}", e))?;
        if !response.status().is_success() {
            return Ok(MutationResult::failed(Self::error_message(response).await));
        }
        let body = response.text().await.unwrap_or_default();
        let id = serde_json::from_str::<CreatedBody>(&body)
            .ok()
            .and_then(|b| b.id.or_else(|| b.data.and_then(|d| d.id)));
        Ok(MutationResult::ok(id))
    }
}

#[async_trait]
impl SocialPlatform for HttpPlatformClient {
    async fn search(&self, query: &str, params: &SearchParams) -> Result<Vec<Candidate>, String> {
        let limit = params.max_results.to_string();
        let builder = self
            .http
            .get(self.url("tweets/search"))
            .query(&[("query", query), ("limit", limit.as_str())]);
        let list: ListEnvelope<Candidate> = self.get_json(builder).await?;
        Ok(list.into_vec())
    }

    async fn post(&self, text: &str) -> Result<MutationResult, String> {
        self.mutate(self.http.post(self.url("tweets")).json(&json!({ "text": text })))
            .await
    }

    async fn retweet(&self, tweet_id: &str) -> Result<MutationResult, String> {
        self.mutate(self.http.post(self.url(&format!("tweets/{tweet_id}/retweet"))))
            .await
    }

    async fn like(&self, tweet_id: &str) -> Result<MutationResult, String> {
        self.mutate(self.http.post(self.url(&format!("tweets/{tweet_id}/like"))))
            .await
    }

    async fn quote_tweet(&self, tweet_id: &str, text: &str) -> Result<MutationResult, String> {
        let body = json!({ "text": text, "quoteTweetId": tweet_id });
        self.mutate(self.http.post(self.url("tweets")).json(&body))
            .await
    }

    async fn follow(&self, user_id: &str) -> Result<MutationResult, String> {
        self.mutate(self.http.post(self.url(&format!("users/{user_id}/follow"))))
            .await
    }

    async fn get_account_info(&self) -> Result<AccountInfo, String> {
        self.get_json(self.http.get(self.url("users/me"))).await
    }

    async fn get_batch_user_last_tweets(
        &self,
        usernames: &[String],
        limit: usize,
    ) -> Result<Vec<UserTweets>, String> {
        if usernames.is_empty() {
            return Ok(Vec::new());
        }
        let names = usernames.join(",");
        let limit = limit.to_string();
        let builder = self
            .http
            .get(self.url("users/last_tweets"))
            .query(&[("usernames", names.as_str()), ("limit", limit.as_str())]);
        let list: ListEnvelope<UserTweets> = self.get_json(builder).await?;
        Ok(list.into_vec())
    }

    async fn get_tweet_metrics(&self, tweet_id: &str) -> Result<EngagementMetrics, String> {
        self.get_json(self.http.get(self.url(&format!("tweets/{tweet_id}/metrics"))))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_without_double_slash() {
        let client =
            HttpPlatformClient::new("http://example.test/api/", None, Duration::from_secs(1))
                .unwrap();
        assert_eq!(
            client.url("/tweets/search"),
            "http://example.test/api/tweets/search"
        );
    }

    #[test]
    fn test_list_envelope_accepts_both_shapes() {
        let wrapped: ListEnvelope<Candidate> = serde_json::from_str(
            r#"{"data": [{"id": "1", "authorId": "a", "text": "hi"}]}"#,
        )
        .unwrap();
        let bare: ListEnvelope<Candidate> =
            serde_json::from_str(r#"[{"id": "2", "authorId": "b", "text": "yo"}]"#).unwrap();
        assert_eq!(wrapped.into_vec()[0].id, "1");
        let bare = bare.into_vec();
        assert_eq!(bare[0].author_id, "b");
        assert_eq!(bare[0].engagement_metrics, EngagementMetrics::default());
    }
}
