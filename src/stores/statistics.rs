use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use super::{merge_patch, BackendClient, UpstreamError};
use crate::auth::AuthContext;
use crate::stats::models::{AggregateKey, DateRange, StatisticsAggregate};

pub const STATISTICS_PATH: &str = "/api/v1/user/gameStatistics";

/// Access to rolling aggregates, keyed by (user, date range).
///
/// The backing store offers no transactions: a lookup followed by a create or
/// update is two independent calls.
#[async_trait]
pub trait StatisticsStore: Send + Sync {
    /// Existence lookup: `Ok(None)` when the store answers 404
    async fn get_aggregate(
        &self,
        auth: &AuthContext,
        date_range: &DateRange,
    ) -> Result<Option<StatisticsAggregate>, UpstreamError>;

    async fn create_aggregate(
        &self,
        auth: &AuthContext,
        aggregate: &StatisticsAggregate,
    ) -> Result<(), UpstreamError>;

    async fn update_aggregate(
        &self,
        auth: &AuthContext,
        date_range: &DateRange,
        aggregate: &StatisticsAggregate,
    ) -> Result<(), UpstreamError>;

    /// Creates a record holding only the key; returns the stored record when the store echoes it
    async fn create_key_only(
        &self,
        auth: &AuthContext,
        date_range: &DateRange,
    ) -> Result<Option<StatisticsAggregate>, UpstreamError>;

    /// Forwards an arbitrary patch body, returning the store's response
    async fn patch_aggregate(
        &self,
        auth: &AuthContext,
        date_range: &DateRange,
        patch: &Value,
    ) -> Result<Value, UpstreamError>;
}

/// StatisticsStore backed by the game-statistics HTTP service
pub struct HttpStatisticsStore {
    client: BackendClient,
}

impl HttpStatisticsStore {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }

    fn keyed(&self, method: Method, auth: &AuthContext, date_range: &DateRange) -> reqwest::RequestBuilder {
        self.client
            .request(method, STATISTICS_PATH, auth)
            .query(&[
                ("userID", auth.user_id.clone()),
                ("dateRange", date_range.key()),
            ])
    }
}

#[async_trait]
impl StatisticsStore for HttpStatisticsStore {
    #[instrument(skip(self, auth), fields(user_id = %auth.user_id, date_range = %date_range))]
    async fn get_aggregate(
        &self,
        auth: &AuthContext,
        date_range: &DateRange,
    ) -> Result<Option<StatisticsAggregate>, UpstreamError> {
        let request = self.keyed(Method::GET, auth, date_range);
        let response = match self.client.send_expecting(request, StatusCode::OK).await {
            Ok(response) => response,
            Err(error) if error.is_not_found() => {
                debug!("Aggregate absent");
                return Ok(None);
            }
            Err(error) => return Err(error),
        };

        let aggregates: Vec<StatisticsAggregate> = BackendClient::records(response).await?;
        Ok(aggregates.into_iter().next())
    }

    #[instrument(skip(self, auth, aggregate), fields(user_id = %auth.user_id, date_range = %aggregate.date_range))]
    async fn create_aggregate(
        &self,
        auth: &AuthContext,
        aggregate: &StatisticsAggregate,
    ) -> Result<(), UpstreamError> {
        let request = self
            .client
            .request(Method::POST, STATISTICS_PATH, auth)
            .json(&[aggregate]);
        self.client
            .send_expecting(request, StatusCode::CREATED)
            .await?;
        Ok(())
    }

    #[instrument(skip(self, auth, aggregate), fields(user_id = %auth.user_id, date_range = %date_range))]
    async fn update_aggregate(
        &self,
        auth: &AuthContext,
        date_range: &DateRange,
        aggregate: &StatisticsAggregate,
    ) -> Result<(), UpstreamError> {
        let request = self
            .keyed(Method::PATCH, auth, date_range)
            .json(&[aggregate]);
        self.client.send_expecting(request, StatusCode::OK).await?;
        Ok(())
    }

    #[instrument(skip(self, auth), fields(user_id = %auth.user_id, date_range = %date_range))]
    async fn create_key_only(
        &self,
        auth: &AuthContext,
        date_range: &DateRange,
    ) -> Result<Option<StatisticsAggregate>, UpstreamError> {
        let key = AggregateKey {
            user_id: auth.user_id.clone(),
            date_range: date_range.key(),
        };
        let request = self
            .client
            .request(Method::POST, STATISTICS_PATH, auth)
            .json(&[key]);
        let response = self
            .client
            .send_expecting(request, StatusCode::CREATED)
            .await?;

        let body = BackendClient::body(response).await?;
        if body.is_null() {
            return Ok(None);
        }
        let aggregates: Vec<StatisticsAggregate> =
            serde_json::from_value(body).map_err(|e| UpstreamError::Decode(e.to_string()))?;
        Ok(aggregates.into_iter().next())
    }

    #[instrument(skip(self, auth, patch), fields(user_id = %auth.user_id, date_range = %date_range))]
    async fn patch_aggregate(
        &self,
        auth: &AuthContext,
        date_range: &DateRange,
        patch: &Value,
    ) -> Result<Value, UpstreamError> {
        let request = self.keyed(Method::PATCH, auth, date_range).json(patch);
        let response = self.client.send_expecting(request, StatusCode::OK).await?;
        BackendClient::body(response).await
    }
}

/// Operations recorded and fault-injectable on the in-memory store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatisticsOperation {
    Get,
    Create,
    Update,
    Patch,
}

/// In-memory implementation of StatisticsStore for development and testing
///
/// Like the real store it keeps `strategiesLearned` when an update omits it,
/// and refuses to create a key that already exists.
#[derive(Default)]
pub struct InMemoryStatisticsStore {
    aggregates: RwLock<HashMap<(String, String), StatisticsAggregate>>,
    faults: RwLock<HashMap<(StatisticsOperation, String), UpstreamError>>,
    calls: RwLock<Vec<(StatisticsOperation, String)>>,
}

impl InMemoryStatisticsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, aggregate: StatisticsAggregate) {
        self.aggregates.write().await.insert(
            (aggregate.user_id.clone(), aggregate.date_range.clone()),
            aggregate,
        );
    }

    pub async fn aggregate(&self, user_id: &str, date_range: &DateRange) -> Option<StatisticsAggregate> {
        self.aggregates
            .read()
            .await
            .get(&(user_id.to_string(), date_range.key()))
            .cloned()
    }

    pub async fn aggregate_count(&self) -> usize {
        self.aggregates.read().await.len()
    }

    /// Every later call to `operation` for `date_range` fails with `error`
    pub async fn fail_on(
        &self,
        operation: StatisticsOperation,
        date_range: &DateRange,
        error: UpstreamError,
    ) {
        self.faults
            .write()
            .await
            .insert((operation, date_range.key()), error);
    }

    /// Calls made so far, with the date-range key each touched
    pub async fn calls(&self) -> Vec<(StatisticsOperation, String)> {
        self.calls.read().await.clone()
    }

    async fn enter(
        &self,
        operation: StatisticsOperation,
        date_range: String,
    ) -> Result<(), UpstreamError> {
        self.calls.write().await.push((operation, date_range.clone()));
        match self.faults.read().await.get(&(operation, date_range)) {
            Some(error) => {
                debug!(?operation, %error, "Injected statistics store failure");
                Err(error.clone())
            }
            None => Ok(()),
        }
    }
}

#[async_trait]
impl StatisticsStore for InMemoryStatisticsStore {
    async fn get_aggregate(
        &self,
        auth: &AuthContext,
        date_range: &DateRange,
    ) -> Result<Option<StatisticsAggregate>, UpstreamError> {
        self.enter(StatisticsOperation::Get, date_range.key()).await?;
        Ok(self.aggregate(&auth.user_id, date_range).await)
    }

    async fn create_aggregate(
        &self,
        auth: &AuthContext,
        aggregate: &StatisticsAggregate,
    ) -> Result<(), UpstreamError> {
        self.enter(StatisticsOperation::Create, aggregate.date_range.clone())
            .await?;
        let key = (auth.user_id.clone(), aggregate.date_range.clone());
        let mut aggregates = self.aggregates.write().await;
        if aggregates.contains_key(&key) {
            return Err(UpstreamError::Status(409));
        }
        aggregates.insert(key, aggregate.clone());
        Ok(())
    }

    async fn update_aggregate(
        &self,
        auth: &AuthContext,
        date_range: &DateRange,
        aggregate: &StatisticsAggregate,
    ) -> Result<(), UpstreamError> {
        self.enter(StatisticsOperation::Update, date_range.key()).await?;
        let mut aggregates = self.aggregates.write().await;
        let stored = aggregates
            .get_mut(&(auth.user_id.clone(), date_range.key()))
            .ok_or(UpstreamError::Status(404))?;

        let strategies = stored.strategies_learned.take();
        *stored = aggregate.clone();
        if stored.strategies_learned.is_none() {
            stored.strategies_learned = strategies;
        }
        Ok(())
    }

    async fn create_key_only(
        &self,
        auth: &AuthContext,
        date_range: &DateRange,
    ) -> Result<Option<StatisticsAggregate>, UpstreamError> {
        self.enter(StatisticsOperation::Create, date_range.key()).await?;
        let key = (auth.user_id.clone(), date_range.key());
        let mut aggregates = self.aggregates.write().await;
        if aggregates.contains_key(&key) {
            return Err(UpstreamError::Status(409));
        }

        let aggregate = StatisticsAggregate {
            user_id: auth.user_id.clone(),
            date_range: date_range.key(),
            score: 0,
            average_solve_time: 0.0,
            fastest_solve_time: None,
            total_solve_time: 0.0,
            num_hints_used: 0,
            num_wrong_cells_played: 0,
            num_games_played: 0,
            strategies_learned: None,
        };
        aggregates.insert(key, aggregate.clone());
        Ok(Some(aggregate))
    }

    async fn patch_aggregate(
        &self,
        auth: &AuthContext,
        date_range: &DateRange,
        patch: &Value,
    ) -> Result<Value, UpstreamError> {
        self.enter(StatisticsOperation::Patch, date_range.key()).await?;
        let mut aggregates = self.aggregates.write().await;
        let stored = aggregates
            .get_mut(&(auth.user_id.clone(), date_range.key()))
            .ok_or(UpstreamError::Status(404))?;

        let mut record =
            serde_json::to_value(&*stored).map_err(|e| UpstreamError::Decode(e.to_string()))?;
        merge_patch(&mut record, patch);
        *stored = serde_json::from_value(record.clone())
            .map_err(|e| UpstreamError::Decode(e.to_string()))?;
        Ok(Value::Array(vec![record]))
    }
}
