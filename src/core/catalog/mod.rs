pub mod naming;
pub mod record;
pub mod variant;

pub use naming::archive_file_name;
pub use record::{DownloadEntry, InstallerFile, TitleId, TitleRecord};
pub use variant::VariantTarget;
