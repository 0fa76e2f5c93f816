//! Request and Response models for the HTTP API
//!
//! DTOs used for serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

pub use requests::{AttachRequest, ConfigKeysQuery};
pub use responses::{
    AcceptedResponse, ClearedResponse, ConfigResponse, ConfigValuesResponse, HealthResponse,
    NotificationsResponse, StatsResponse, VolumesResponse,
};
