pub mod files;
pub mod local;
pub mod settings;
pub mod store;
pub mod wire;

pub use files::{
    atomic_write, ensure_data_dir, init_local_data_dir, log_file, records_file, settings_file,
};
pub use local::LocalStore;
pub use settings::{load_or_init_settings, Settings};
pub use store::{ChangeEvent, ChangeKind, Store, Subscription};
pub use wire::{RecordDocument, RecordPatch};
