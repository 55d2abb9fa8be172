pub mod linker;
pub mod metrics;
pub mod model_loader;
pub mod pipeline;

pub use linker::EntityLinker;
pub use metrics::{get_metrics, init_metrics};
pub use model_loader::ModelLoader;
