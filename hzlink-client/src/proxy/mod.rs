//! Proxies for distributed objects.

mod queue;

pub use queue::IQueue;
