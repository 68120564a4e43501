//! Docker swarm integration module.
//!
//! This module provides all functionality for talking to the Docker Engine
//! API: the HTTP client, the stack observer and the [`SwarmBackend`] the
//! executor applies plans through.

mod client;
mod observer;
mod provisioner;
mod types;

pub use client::{ApiResult, SwarmClient};
pub use observer::{ServiceObserver, observed_entity};
pub use provisioner::SwarmBackend;
pub use types::{
    ContainerSpec, CreateResponse, Endpoint, EndpointSpec, ErrorResponse, GlobalService,
    NAMESPACE_LABEL, Network, NetworkAttachmentConfig, NetworkCreateRequest, PortConfig,
    ReplicatedService, Service, ServiceMode, ServiceSpec, TaskSpec, UpdateConfig, Version,
};
