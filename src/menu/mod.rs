pub mod registry;
pub mod router;

pub use registry::{MenuEntry, MenuEvent, MenuListener, MenuRegistry, MenuTag, SEPARATOR};
pub use router::EventRouter;
