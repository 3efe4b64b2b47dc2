pub mod registry;

pub use registry::TaskRegistry;
