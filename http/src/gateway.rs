//! Commit endpoint over HTTP

use crate::client::ApiClient;
use allocation_core::commit::{CommitMode, CommitPayload, CommitReceipt};
use allocation_core::environment::{BoxFuture, CommitGateway};
use allocation_core::error::CommitError;
use reqwest::Method;
use serde::Deserialize;

/// Answer of the allocation endpoint
#[derive(Debug, Deserialize)]
struct CommitResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
}

/// Error body of a non-2xx answer
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// [`CommitGateway`] backed by `POST`/`PUT {base}/allocations`
#[derive(Clone, Debug)]
pub struct HttpCommitGateway {
    client: ApiClient,
}

impl HttpCommitGateway {
    /// Creates a gateway over the given client
    #[must_use]
    pub const fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

fn method_for(mode: CommitMode) -> Method {
    match mode {
        CommitMode::Create => Method::POST,
        CommitMode::Update => Method::PUT,
    }
}

fn transport_error(error: &reqwest::Error) -> CommitError {
    if error.is_timeout() {
        CommitError::Timeout
    } else {
        CommitError::Transport(error.to_string())
    }
}

impl CommitGateway for HttpCommitGateway {
    fn commit(
        &self,
        mode: CommitMode,
        payload: CommitPayload,
    ) -> BoxFuture<Result<CommitReceipt, CommitError>> {
        let request = self
            .client
            .request(method_for(mode), "allocations")
            .json(&payload);

        Box::pin(async move {
            let response = request.send().await.map_err(|e| transport_error(&e))?;
            let status = response.status();
            let body = response.text().await.map_err(|e| transport_error(&e))?;

            if !status.is_success() {
                let message = serde_json::from_str::<ErrorBody>(&body)
                    .ok()
                    .and_then(|body| body.message);
                return Err(CommitError::Status {
                    status: status.as_u16(),
                    message,
                });
            }

            let answer: CommitResponse = serde_json::from_str(&body)
                .map_err(|e| CommitError::Transport(format!("unreadable response: {e}")))?;
            if answer.success {
                Ok(CommitReceipt {
                    message: answer.message,
                })
            } else {
                Err(CommitError::Rejected {
                    message: answer.message,
                })
            }
        })
    }
}
