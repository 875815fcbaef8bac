use std::fmt;

use crate::error::{Result, RmwError};
use crate::transport::Guid;

pub const GID_STORAGE_SIZE: usize = 24;

/// Global identifier of an entity, comparable across the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Gid {
    pub implementation_identifier: &'static str,
    pub data: [u8; GID_STORAGE_SIZE],
}

impl Gid {
    /// The transport GUID the identifier was derived from.
    pub fn guid_bytes(&self) -> &[u8] {
        &self.data[..16]
    }
}

impl fmt::Display for Gid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.guid_bytes() {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

/// Derives the GID of a transport entity: its GUID, zero padded.
pub fn create_rmw_gid(implementation_identifier: &'static str, guid: Guid) -> Result<Gid> {
    if guid.is_unknown() {
        return Err(RmwError::upstream("cannot derive a GID from an unknown GUID"));
    }
    let mut data = [0u8; GID_STORAGE_SIZE];
    data[..16].copy_from_slice(&guid.to_bytes());
    Ok(Gid {
        implementation_identifier,
        data,
    })
}
