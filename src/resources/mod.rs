//! Custom resource types and their request/view translations.
//!
//! Every kind lives in group `berth.kubeberth.io/v1alpha1`, is namespaced,
//! and implements [`ResourceKind`](crate::gateway::ResourceKind).

pub mod archive;
pub mod cloudinit;
pub mod disk;
pub mod isoimage;
pub mod loadbalancer;
pub mod server;

pub use archive::Archive;
pub use cloudinit::CloudInit;
pub use disk::Disk;
pub use isoimage::ISOImage;
pub use loadbalancer::LoadBalancer;
pub use server::Server;
