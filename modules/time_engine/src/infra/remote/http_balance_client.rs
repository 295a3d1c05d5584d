use anyhow::{anyhow, Context};
use async_trait::async_trait;
use tracing::instrument;
use url::Url;
use uuid::Uuid;

use crate::api::rest::dto::BalanceDto;
use crate::api::rest::extract::USER_ID_HEADER;
use crate::clock::{BalanceSource, ServerSnapshot};

/// Reads confirmed balances from a remote time engine over REST.
pub struct HttpBalanceClient {
    client: reqwest::Client,
    base: Url,
}

impl HttpBalanceClient {
    pub fn new(client: reqwest::Client, base: Url) -> Self {
        Self { client, base }
    }

    fn profile_url(&self, user_id: Uuid) -> anyhow::Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("base URL {} cannot carry a path", self.base))?
            .pop_if_empty()
            .extend(&["profiles", &user_id.to_string()]);
        Ok(url)
    }
}

#[async_trait]
impl BalanceSource for HttpBalanceClient {
    #[instrument(
        name = "time_engine.http.balance.fetch",
        skip_all,
        fields(base = %self.base, user_id = %user_id)
    )]
    async fn fetch(&self, user_id: Uuid) -> anyhow::Result<ServerSnapshot> {
        let url = self.profile_url(user_id)?;
        let response = self
            .client
            .get(url)
            .header(USER_ID_HEADER, user_id.to_string())
            .send()
            .await
            .with_context(|| format!("GET /profiles/{user_id}"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("GET /profiles/{user_id}: HTTP {status}"));
        }

        let dto: BalanceDto = response
            .json()
            .await
            .context("decoding balance payload")?;
        Ok(ServerSnapshot {
            balance_hours: dto.balance,
            synced_at: dto.as_of,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn body(id: Uuid, balance: f64) -> serde_json::Value {
        json!({
            "id": id,
            "username": "ada",
            "avatar_url": null,
            "time_balance": 12,
            "xp_points": 0,
            "level": 1,
            "streak_days": 0,
            "last_active": "2026-01-01T00:00:00Z",
            "created_at": "2026-01-01T00:00:00Z",
            "updated_at": "2026-01-01T00:00:00Z",
            "balance": balance,
            "low_balance": true,
            "is_default": false,
            "as_of": "2026-01-01T01:00:00Z",
        })
    }

    #[tokio::test]
    async fn fetch_parses_balance_and_sends_identity() {
        let server = MockServer::start();
        let id = Uuid::new_v4();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path(format!("/profiles/{id}"))
                .header(USER_ID_HEADER, id.to_string());
            then.status(200).json_body(body(id, 11.5));
        });

        let base = Url::parse(&server.base_url()).unwrap();
        let client = HttpBalanceClient::new(reqwest::Client::new(), base);
        let snap = client.fetch(id).await.unwrap();

        mock.assert();
        assert_eq!(snap.balance_hours, 11.5);
        assert_eq!(snap.synced_at.to_rfc3339(), "2026-01-01T01:00:00+00:00");
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start();
        let _mock = server.mock(|when, then| {
            when.method(GET).path_matches(r"/profiles/[\w-]+");
            then.status(503);
        });

        let base = Url::parse(&server.base_url()).unwrap();
        let client = HttpBalanceClient::new(reqwest::Client::new(), base);
        let err = client.fetch(Uuid::new_v4()).await.unwrap_err();
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn base_path_is_preserved() {
        let base = Url::parse("http://engine.local/api/").unwrap();
        let client = HttpBalanceClient::new(reqwest::Client::new(), base);
        let id = Uuid::nil();
        assert_eq!(
            client.profile_url(id).unwrap().as_str(),
            format!("http://engine.local/api/profiles/{id}")
        );
    }
}
