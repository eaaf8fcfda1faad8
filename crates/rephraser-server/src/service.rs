//! gRPC servicer mapping `Rephrase` calls onto the model wrapper
//!
//! A pure adapter: request fields go to the model unchanged, candidate
//! order comes back unchanged. Generation is CPU-bound and blocking,
//! so each call runs on the blocking pool behind a worker-pool
//! semaphore.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tonic::{Request, Response, Status};
use tracing::warn;

use rephraser_core::{Candidate, Error, Rephraser};

use crate::proto::rephraser_server::Rephraser as RephraserRpc;
use crate::proto::{RephraseReply, RephraseRequest, Sequence};

pub struct RephraserService {
    model: Arc<Rephraser>,
    workers: Arc<Semaphore>,
}

impl RephraserService {
    pub fn new(model: Rephraser, max_workers: usize) -> Self {
        Self {
            model: Arc::new(model),
            workers: Arc::new(Semaphore::new(max_workers)),
        }
    }
}

#[tonic::async_trait]
impl RephraserRpc for RephraserService {
    async fn rephrase(
        &self,
        request: Request<RephraseRequest>,
    ) -> Result<Response<RephraseReply>, Status> {
        let req = request.into_inner();
        let num_sequences = usize::try_from(req.num_sequences)
            .map_err(|_| Status::invalid_argument("num_sequences must be at least 1"))?;

        let permit = self
            .workers
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| Status::unavailable("server is shutting down"))?;

        let model = self.model.clone();
        let temperature = f64::from(req.temperature);
        let candidates = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            model.rephrase(&req.text, temperature, req.sample, num_sequences)
        })
        .await
        .map_err(|e| Status::internal(format!("generation task failed: {e}")))?
        .map_err(status_from_error)?;

        Ok(Response::new(to_reply(candidates)))
    }
}

fn status_from_error(err: Error) -> Status {
    match err {
        Error::InvalidParameter(_) => Status::invalid_argument(err.to_string()),
        _ => {
            warn!("rephrase failed: {err}");
            Status::internal(err.to_string())
        }
    }
}

fn to_reply(candidates: Vec<Candidate>) -> RephraseReply {
    RephraseReply {
        sequences: candidates
            .into_iter()
            .map(|c| Sequence {
                text: c.text,
                score: c.score,
            })
            .collect(),
    }
}
