//! Core library for the postal-code weather services.
//!
//! This crate defines:
//! - Configuration loading
//! - Request validation and the failure taxonomy
//! - Clients for the resolver, locality and weather upstreams
//! - The gateway and resolver pipelines and their HTTP routers
//!
//! It is used by `weather-service`, which only parses arguments and binds sockets.

pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod provider;
pub mod service;
pub mod telemetry;
pub mod validate;

pub use config::Config;
pub use error::PipelineError;
pub use model::{LocalityResult, PostalCodeRequest, WeatherReport};
pub use pipeline::{GatewayPipeline, ResolverPipeline};
pub use provider::{LocalityProvider, UpstreamId, WeatherProvider};
pub use service::{GatewayState, ResolverState, gateway_router, resolver_router};
