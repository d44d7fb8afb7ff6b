mod transport;
mod worker;

pub use transport::{
    TransportError, UpdateRequest, UpdateResponse, UpdateStatus, UpdateTransport,
};
pub use worker::{Delivery, LoadingGuard, LoadingState, UpdateQueue};
