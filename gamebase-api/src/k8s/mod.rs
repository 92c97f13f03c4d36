//! Kubernetes integration for the gamebase API.
//!
//! The rest of the crate depends on the [`K8sClient`] trait only. The default
//! implementation, [`http::HttpK8sClient`], is backed by the [`kube`] crate and talks
//! to the cluster through the ambient configuration (in-cluster service account or
//! the local `~/.kube/config`). Tests substitute an in-memory cluster.
//!
//! See [`base`] for the error type, the client trait and the deadline helper.

mod base;
pub mod http;

pub use base::*;
pub use http::HttpK8sClient;
