// Copyright 2022 Zinc Labs Inc. and Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Json, Response,
    },
};
use futures::{stream, Stream};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use slsquery::{
    stream::{self as live, StreamStatus},
    DataQuery, DataSourceSettings, Error, HealthCheckResult, QueryDataResponse, QueryEngine,
};

/// Frames buffered per live connection.
const LIVE_BUFFER: usize = 16;

#[derive(Clone)]
pub struct AppState {
    pub engine: QueryEngine,
    pub settings: Arc<DataSourceSettings>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct QueryDataRequest {
    pub queries: Vec<DataQuery>,
}

/// A batch-level failure.
#[derive(Debug)]
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            Error::Settings(_) | Error::DuplicateRefId(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::error!(error = %self.0, %status, "request failed");
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

pub async fn query(
    State(state): State<AppState>,
    Json(req): Json<QueryDataRequest>,
) -> Result<Json<QueryDataResponse>, ApiError> {
    let start_time = std::time::Instant::now();
    // Cancels the batch if the client goes away before it completes.
    let token = CancellationToken::new();
    let _guard = token.clone().drop_guard();

    let resp = state
        .engine
        .query_data(&state.settings, req.queries, token)
        .await?;
    tracing::info!("execute time: {:?}", start_time.elapsed());
    Ok(Json(resp))
}

pub async fn health(State(state): State<AppState>) -> Result<Json<HealthCheckResult>, ApiError> {
    Ok(Json(state.engine.check_health(&state.settings).await?))
}

pub async fn live(
    Path(path): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, serde_json::Error>>>, StatusCode> {
    if live::subscribe(&path) != StreamStatus::Ok {
        return Err(StatusCode::FORBIDDEN);
    }
    let (tx, rx) = mpsc::channel(LIVE_BUFFER);
    let token = CancellationToken::new();
    tokio::spawn({
        let token = token.clone();
        async move {
            if let Err(error) = live::run(&path, live::DEFAULT_INTERVAL, tx, token).await {
                tracing::error!(%error, path, "stream failed");
            }
        }
    });

    // The guard lives as long as the response stream.
    let events = stream::unfold((rx, token.drop_guard()), |(mut rx, guard)| async move {
        let frame = rx.recv().await?;
        Some((Event::default().json_data(&frame), (rx, guard)))
    });
    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
