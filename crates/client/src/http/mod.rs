//! Transport abstraction and the reqwest-backed implementation.

mod transport;

pub use transport::{
    HttpMethod, ReqwestTransport, ReqwestTransportBuilder, Transport, TransportRequest,
    TransportResponse,
};
