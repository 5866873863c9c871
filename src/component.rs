//! Component Configuration Access
//!
//! Typed views over the receiver, processor, exporter, and pipeline entries
//! of a [`ConfigDocument`](crate::document::ConfigDocument).

mod accessor;
mod filter;
mod id;
mod loadbalancing;
mod otlp;
mod pipeline;

pub use accessor::{ComponentAccessor, ComponentKind};
pub use filter::{FilterProcessorConfig, MetricFilters};
pub use id::ComponentId;
pub use loadbalancing::{
    DnsResolver, ForwardingProtocol, LoadBalancingExporterConfig, ResolverSettings,
    StaticResolver,
};
pub use otlp::{OtlpExporterConfig, OtlpProtocols, OtlpReceiverConfig, ServerSettings, TlsSettings};
pub use pipeline::Pipeline;
