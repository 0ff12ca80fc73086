//! Format integrations layered on the core detector, builder and expansion
//! extension points.
//!
//! | Integration | Archive type                | Entry types                              |
//! |-------------|-----------------------------|------------------------------------------|
//! | Kie         | `ext/KieJarArchive`         | kmodule, BPMN, Drools rules              |
//! | Teiid       | `ext/TeiidVdb`              | VDB manifest, XMI models                 |
//! | SwitchYard  | `ext/SwitchYardApplication` | switchyard.xml, referenced Java classes  |

pub mod kie;
pub mod switchyard;
pub mod teiid;

use std::sync::Arc;

use crate::archive::read_toc;
use crate::derive::ArtifactBuilderFactory;
use crate::detect::ArtifactTypeDetector;
use crate::expand::ExpanderProvider;
use crate::model::ArtifactContent;

/// Priority of integration detectors and providers, above the built-ins.
pub const INTEGRATION_PRIORITY: i32 = 10;

/// Whether the content is a zip containing `path` (case-insensitive).
///
/// Unreadable archives contain nothing.
pub(crate) fn zip_contains(content: &ArtifactContent, path: &str) -> bool {
    if !content.is_zip() {
        return false;
    }
    match read_toc(content.bytes()) {
        Ok(toc) => toc.iter().any(|entry| entry.path.eq_ignore_ascii_case(path)),
        Err(error) => {
            tracing::trace!(file = content.filename(), %error, "unreadable zip");
            false
        }
    }
}

pub fn detectors() -> Vec<Arc<dyn ArtifactTypeDetector>> {
    vec![
        Arc::new(kie::KieDetector),
        Arc::new(teiid::TeiidDetector),
        Arc::new(switchyard::SwitchYardDetector),
    ]
}

pub fn builder_factories() -> Vec<Arc<dyn ArtifactBuilderFactory>> {
    vec![
        Arc::new(teiid::manifest_factory()),
        Arc::new(teiid::model_factory()),
        Arc::new(switchyard::factory()),
    ]
}

pub fn expander_providers() -> Vec<Arc<dyn ExpanderProvider>> {
    vec![
        Arc::new(kie::KieExpanderProvider::default()),
        Arc::new(teiid::TeiidExpanderProvider::default()),
        Arc::new(switchyard::SwitchYardExpanderProvider::default()),
    ]
}
