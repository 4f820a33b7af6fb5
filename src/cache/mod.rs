//! Session-scoped node cache
//!
//! Everything a session knows about its workspace: materialized `NodeInfo`s,
//! the identity maps behind the API-facing handles, and the pending changes
//! recorded by `NodeEditor`.

pub mod children;
pub mod editor;
pub mod identity;
pub mod ids;
pub mod node_info;
pub mod resolve;
pub mod session_cache;

pub use children::Children;
pub use editor::NodeEditor;
pub use identity::IdentityMap;
pub use ids::{ChildNode, PropertyId};
pub use node_info::{NodeInfo, PropertyInfo};
pub use resolve::PropertyResolver;
pub use session_cache::{CacheOptions, SessionCache};
