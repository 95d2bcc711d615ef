//! Request execution and response inspection for geospatial REST services.
//!
//! The crate provides the two generic mechanisms a request harness needs to
//! work with every request type without per-type code:
//!
//! - an async [`Executor`] that submits a [`RequestDescriptor`], turns the
//!   backend's "retry after N seconds" hints into a live once-per-second
//!   countdown, and resolves with a single [`Outcome`];
//! - a materializer ([`materialize`]) that converts any response value into
//!   a labeled [`ObjectNode`] tree, with [`TreeView`] tracking which nodes
//!   are expanded.
//!
//! The [`http`] module supplies reqwest-backed descriptors; anything else
//! implementing [`RequestDescriptor`] works the same way.
//!
//! # Example
//!
//! ```ignore
//! use geoprobe::{Executor, ServiceClient, ServiceConfig, Status};
//!
//! let client = ServiceClient::new(ServiceConfig::default().with_api_key(key))?;
//! let request = client.json("Locations").param("q", "Seattle, WA");
//!
//! let (executor, status) = Executor::new();
//! let outcome = executor.run(&request).await;
//! ```

pub mod config;
pub mod countdown;
mod error;
pub mod executor;
pub mod http;
pub mod node;
mod request;
pub mod view;

pub use config::ServiceConfig;
pub use countdown::{Countdown, CountdownHandle, NO_RETRY, format_remaining};
pub use error::{Error, ErrorInfo, ErrorKind, Result};
pub use executor::{ExecutionState, Executor, Outcome, ROOT_LABEL, Status};
pub use http::{BinaryRequest, JsonRequest, ServiceClient};
pub use node::{NodeValue, ObjectNode, ResponseValue, materialize, materialize_serialize};
pub use request::{ExecuteFuture, RequestDescriptor, RetrySignal};
pub use view::{NodePath, Row, TreeView};
