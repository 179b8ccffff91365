//! PIX gateway outbound adapter.
//!
//! The gateway authenticates clients twice: mutual TLS with the certificate
//! issued to the marketplace, then an OAuth2 client-credentials bearer token.

mod dto;
mod http_gateway;
mod token_cache;

pub use http_gateway::{PixGatewayConfig, PixHttpGateway};
