use anyhow::Result;
use std::io::Read;
use std::sync::Arc;

use crate::info::ClassInfo;

/// Callback receiving unresolved-class diagnostics. Reporting is
/// observability only and never alters a resolution outcome.
pub type DiagnosticSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Default sink routing diagnostics through the `log` facade.
pub fn log_sink() -> DiagnosticSink {
    Arc::new(|message| log::warn!("{message}"))
}

/// A source of class binaries keyed by class name.
///
/// All three lookups accept dotted or slash-form names and must observe the
/// same underlying outcome for a given name within one provider instance.
/// "Not found" is `None`, never an error; only `get_class_stream` surfaces
/// I/O failures, when a located source cannot be opened.
pub trait ClassProvider: Send + Sync {
    /// Structural view of the class, memoized per provider.
    fn get_class(&self, class_name: &str) -> Option<Arc<ClassInfo>>;

    /// Raw class bytes.
    fn get_class_bytes(&self, class_name: &str) -> Option<Vec<u8>>;

    /// A readable stream over the class bytes. `Err` means a located
    /// source could not be opened, distinct from `Ok(None)` (absent).
    fn get_class_stream(&self, class_name: &str) -> Result<Option<Box<dyn Read + Send>>>;

    /// Releases owned resources. Idempotent; aggregates underlying close
    /// failures rather than stopping at the first.
    fn close(&self) -> Result<()>;
}

// Providers take &self throughout, so a shared handle is itself a provider.
// Lets one leaf feed several composites while the owner keeps close rights.
impl<T: ClassProvider + ?Sized> ClassProvider for Arc<T> {
    fn get_class(&self, class_name: &str) -> Option<Arc<ClassInfo>> {
        (**self).get_class(class_name)
    }

    fn get_class_bytes(&self, class_name: &str) -> Option<Vec<u8>> {
        (**self).get_class_bytes(class_name)
    }

    fn get_class_stream(&self, class_name: &str) -> Result<Option<Box<dyn Read + Send>>> {
        (**self).get_class_stream(class_name)
    }

    fn close(&self) -> Result<()> {
        (**self).close()
    }
}
