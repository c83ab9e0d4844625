pub mod classifier;
pub mod handler;
pub mod models;
pub mod preprocess;
pub mod sniff;
pub mod storage;

pub use classifier::{OnnxXrayClassifier, XrayClassifier};
pub use handler::create_triage_router;
pub use models::{TriagePrediction, UploadedFile, XrayClass};
pub use sniff::FileKind;
pub use storage::UploadStore;
