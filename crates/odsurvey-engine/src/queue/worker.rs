use crate::queue::{TransportError, UpdateRequest, UpdateResponse, UpdateStatus, UpdateTransport};
use odsurvey_core::TransportConfig;
use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Number of updates currently being sent. Shared with whatever renders the
/// busy indicator.
#[derive(Debug, Clone, Default)]
pub struct LoadingState(Rc<Cell<usize>>);

impl LoadingState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.0.get()
    }

    pub fn is_loading(&self) -> bool {
        self.count() > 0
    }

    /// Increments now; the returned guard decrements once when dropped.
    pub fn acquire(&self) -> LoadingGuard {
        self.0.set(self.0.get() + 1);
        LoadingGuard(Rc::clone(&self.0))
    }
}

#[derive(Debug)]
pub struct LoadingGuard(Rc<Cell<usize>>);

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}

/// Outcome of one dequeued request.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub request: UpdateRequest,
    pub attempts: u32,
    pub result: Result<UpdateResponse, TransportError>,
}

/// FIFO of interview updates with at most one request in flight. Sending
/// needs `&mut self`, so a second send cannot start before the first one
/// resolves. Requests are never cancelled; failures are retried up to
/// `max_retries` times and then handed back to the caller.
pub struct UpdateQueue<T> {
    transport: T,
    max_retries: u32,
    pending: VecDeque<UpdateRequest>,
    loading: LoadingState,
}

impl<T: UpdateTransport> UpdateQueue<T> {
    pub fn new(transport: T, config: &TransportConfig) -> Self {
        Self {
            transport,
            max_retries: config.max_retries,
            pending: VecDeque::new(),
            loading: LoadingState::new(),
        }
    }

    pub fn with_loading_state(mut self, loading: LoadingState) -> Self {
        self.loading = loading;
        self
    }

    pub fn loading_state(&self) -> &LoadingState {
        &self.loading
    }

    pub fn enqueue(&mut self, request: UpdateRequest) {
        self.pending.push_back(request);
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Sends the oldest queued request. `None` when the queue is empty.
    pub async fn send_next(&mut self) -> Option<Delivery> {
        let request = self.pending.pop_front()?;
        let _loading = self.loading.acquire();

        let mut attempts = 0u32;
        let result = loop {
            attempts += 1;
            tracing::debug!(
                interview = request.interview_id.as_str(),
                attempt = attempts,
                changes = request.values_by_path.len(),
                unsets = request.unset_paths.len(),
                "sending interview update"
            );
            match self.transport.send(&request).await {
                Ok(response) => break check_interview(&request, response),
                Err(err) if err.is_retryable() && attempts <= self.max_retries => {
                    tracing::warn!(
                        interview = request.interview_id.as_str(),
                        attempt = attempts,
                        error = %err,
                        "interview update failed, retrying"
                    );
                }
                Err(err) => break Err(err),
            }
        };

        if let Err(err) = &result {
            tracing::warn!(
                interview = request.interview_id.as_str(),
                attempts,
                error = %err,
                "interview update abandoned"
            );
        }
        Some(Delivery {
            request,
            attempts,
            result,
        })
    }

    /// Sends every queued request in order.
    pub async fn drain(&mut self) -> Vec<Delivery> {
        let mut deliveries = Vec::with_capacity(self.pending.len());
        while let Some(delivery) = self.send_next().await {
            deliveries.push(delivery);
        }
        deliveries
    }
}

/// Success and invalid answers must name the interview that was sent.
fn check_interview(
    request: &UpdateRequest,
    response: UpdateResponse,
) -> Result<UpdateResponse, TransportError> {
    if response.status == UpdateStatus::Redirect {
        return Ok(response);
    }
    match response.interview_id.as_deref() {
        Some(actual) if actual == request.interview_id => Ok(response),
        Some(actual) => Err(TransportError::InterviewMismatch {
            expected: request.interview_id.clone(),
            actual: actual.to_string(),
        }),
        None => Err(TransportError::MissingInterviewId {
            expected: request.interview_id.clone(),
        }),
    }
}

#[cfg(test)]
#[path = "worker_test.rs"]
mod tests;
