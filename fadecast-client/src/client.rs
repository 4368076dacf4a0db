//! HTTP client for the sync endpoint

use std::time::Duration;

use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use fadecast_core::models::{
    BroadcastCode, Channel, ChannelId, ChannelSettings, ChannelStateView, OwnerId, Snapshot,
    SyncReceipt, ViewerId,
};

use crate::error::{check_response, ClientError, Result};

const USER_AGENT: &str = concat!("fadecast/", env!("CARGO_PKG_VERSION"));

#[derive(Serialize)]
struct ViewerBody<'a> {
    viewer_id: &'a str,
}

#[derive(Serialize)]
struct CreateChannelBody<'a> {
    owner_id: &'a str,
}

#[derive(Deserialize)]
struct CountBody {
    count: usize,
}

#[derive(Deserialize)]
struct CodeLookupBody {
    hash: ChannelId,
}

/// Cheap to clone; clones share one connection pool
#[derive(Clone)]
pub struct SyncClient {
    base_url: String,
    http: Client,
}

impl SyncClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ClientError::InvalidUrl(base_url));
        }

        let http = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { base_url, http })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let resp = self.http.get(self.url(path)).send().await?;
        Ok(check_response(resp).await?.json().await?)
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let resp = self.http.post(self.url(path)).json(body).send().await?;
        Ok(check_response(resp).await?.json().await?)
    }

    async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let resp = self.http.post(self.url(path)).send().await?;
        Ok(check_response(resp).await?.json().await?)
    }

    /// Poll a channel. `Ok(None)` means the channel does not exist.
    pub async fn fetch_state(&self, channel_id: &ChannelId) -> Result<Option<ChannelStateView>> {
        match self.get_json(&format!("/channel/{channel_id}/state")).await {
            Ok(view) => Ok(Some(view)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn sync(&self, channel_id: &ChannelId, snapshot: &Snapshot) -> Result<SyncReceipt> {
        self.post_json(&format!("/channel/{channel_id}/sync"), snapshot)
            .await
    }

    pub async fn create_channel(&self, owner_id: &OwnerId) -> Result<Channel> {
        self.post_json(
            "/channels",
            &CreateChannelBody {
                owner_id: owner_id.as_str(),
            },
        )
        .await
    }

    pub async fn get_channel(&self, channel_id: &ChannelId) -> Result<Channel> {
        self.get_json(&format!("/channel/{channel_id}")).await
    }

    pub async fn update_settings(&self, channel_id: &ChannelId, settings: &ChannelSettings) -> Result<Channel> {
        self.post_json(&format!("/channel/{channel_id}/settings"), settings)
            .await
    }

    pub async fn start_broadcast(&self, channel_id: &ChannelId) -> Result<Channel> {
        self.post_empty(&format!("/channel/{channel_id}/start-broadcast"))
            .await
    }

    pub async fn stop_broadcast(&self, channel_id: &ChannelId) -> Result<Channel> {
        self.post_empty(&format!("/channel/{channel_id}/stop-broadcast"))
            .await
    }

    /// Resolve a broadcast code. `Ok(None)` when no live channel has it.
    pub async fn lookup_code(&self, code: BroadcastCode) -> Result<Option<ChannelId>> {
        match self
            .get_json::<CodeLookupBody>(&format!("/channel/code/{code}"))
            .await
        {
            Ok(body) => Ok(Some(body.hash)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Heartbeat; returns the live viewer count
    pub async fn ping(&self, channel_id: &ChannelId, viewer_id: &ViewerId) -> Result<usize> {
        let body: CountBody = self
            .post_json(
                &format!("/channel/{channel_id}/viewer/ping"),
                &ViewerBody {
                    viewer_id: viewer_id.as_str(),
                },
            )
            .await?;
        Ok(body.count)
    }

    pub async fn leave(&self, channel_id: &ChannelId, viewer_id: &ViewerId) -> Result<()> {
        let resp = self
            .http
            .post(self.url(&format!("/channel/{channel_id}/viewer/leave")))
            .json(&ViewerBody {
                viewer_id: viewer_id.as_str(),
            })
            .send()
            .await?;
        check_response(resp).await?;
        Ok(())
    }

    pub async fn viewer_count(&self, channel_id: &ChannelId) -> Result<usize> {
        let body: CountBody = self
            .get_json(&format!("/channel/{channel_id}/viewers"))
            .await?;
        Ok(body.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_normalised() {
        let client = SyncClient::new("http://localhost:8080/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080");
        assert_eq!(
            client.url("/channel/abc/state"),
            "http://localhost:8080/channel/abc/state"
        );
    }

    #[test]
    fn test_rejects_non_http_url() {
        assert!(matches!(
            SyncClient::new("localhost:8080"),
            Err(ClientError::InvalidUrl(_))
        ));
    }
}
