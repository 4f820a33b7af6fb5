//! Well-known names used by the cache, the built-in node types and lock records.

use crate::types::Name;

/// Prefix of backend-internal properties that are never exposed to callers
pub const INTERNAL_PREFIX: &str = "dnaint";

pub const RESIDUAL: Name = Name::from_static("*");

pub mod jcr {
    use crate::types::Name;

    pub const PRIMARY_TYPE: Name = Name::from_static("jcr:primaryType");
    pub const MIXIN_TYPES: Name = Name::from_static("jcr:mixinTypes");
    pub const UUID: Name = Name::from_static("jcr:uuid");
    pub const LOCK_OWNER: Name = Name::from_static("jcr:lockOwner");
    pub const LOCK_IS_DEEP: Name = Name::from_static("jcr:lockIsDeep");
    pub const SYSTEM: Name = Name::from_static("jcr:system");
    pub const CREATED: Name = Name::from_static("jcr:created");
    pub const CONTENT: Name = Name::from_static("jcr:content");
    pub const DATA: Name = Name::from_static("jcr:data");
    pub const MIME_TYPE: Name = Name::from_static("jcr:mimeType");
    pub const ENCODING: Name = Name::from_static("jcr:encoding");
    pub const LAST_MODIFIED: Name = Name::from_static("jcr:lastModified");
}

pub mod nt {
    use crate::types::Name;

    pub const BASE: Name = Name::from_static("nt:base");
    pub const UNSTRUCTURED: Name = Name::from_static("nt:unstructured");
    pub const HIERARCHY_NODE: Name = Name::from_static("nt:hierarchyNode");
    pub const FOLDER: Name = Name::from_static("nt:folder");
    pub const FILE: Name = Name::from_static("nt:file");
    pub const RESOURCE: Name = Name::from_static("nt:resource");
}

pub mod mix {
    use crate::types::Name;

    pub const REFERENCEABLE: Name = Name::from_static("mix:referenceable");
    pub const LOCKABLE: Name = Name::from_static("mix:lockable");
}

pub mod dna {
    use crate::types::Name;

    pub const ROOT: Name = Name::from_static("dna:root");
    pub const SYSTEM: Name = Name::from_static("dna:system");
    pub const UUID: Name = Name::from_static("dna:uuid");
    pub const LOCKS: Name = Name::from_static("dna:locks");
    pub const LOCK: Name = Name::from_static("dna:lock");
    pub const LOCKED_UUID: Name = Name::from_static("dna:lockedUuid");
    pub const WORKSPACE: Name = Name::from_static("dna:workspace");
    pub const IS_SESSION_SCOPED: Name = Name::from_static("dna:isSessionScoped");
    pub const IS_HELD_BY_SESSION: Name = Name::from_static("dna:isHeldBySession");
    pub const LOCKING_SESSION: Name = Name::from_static("dna:lockingSession");
    pub const EXPIRATION_DATE: Name = Name::from_static("dna:expirationDate");
}

pub mod dnaint {
    use crate::types::Name;

    pub const NODE_DEFINITION: Name = Name::from_static("dnaint:nodeDefinition");
    pub const MULTI_VALUED_PROPERTIES: Name = Name::from_static("dnaint:multiValuedProperties");
}

/// Whether the name belongs to the backend-internal namespace
pub fn is_internal(name: &Name) -> bool {
    name.prefix() == INTERNAL_PREFIX
}
