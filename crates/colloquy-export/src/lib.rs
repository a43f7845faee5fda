//! Export of a user's stored chat history, either as raw records or
//! reshaped for import into the portal.

pub mod bundle;
pub mod error;
pub mod partition;
pub mod portal;
pub mod raw;
pub mod service;

pub use bundle::{assemble, Assembly, ThreadBundle};
pub use error::{ExportError, Result};
pub use partition::{partition_candidates, sha256_hex, PartitionData, PartitionResolver, Resolution};
pub use portal::{to_portal, PortalExport};
pub use raw::{to_raw, RawExport};
pub use service::{ExportDocument, ExportFormat, ExportRequest, ExportService};
