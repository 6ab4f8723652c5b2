pub mod registry;

pub use registry::{ProviderFactory, ServiceRegistry, ServiceRegistryBuilder};
