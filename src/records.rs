//! Record vocabulary shared with the resolution subsystem.
//!
//! The supervisor never synthesizes or validates records; these types only
//! give the registration surface and the [`Resolver`](crate::Resolver)
//! contract a common shape to speak.

use std::collections::HashMap;
use std::net::{Ipv4Addr, Ipv6Addr};

/// Payload of a single DNS record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordData {
    /// IPv4 host address.
    A(Ipv4Addr),
    /// IPv6 host address.
    Aaaa(Ipv6Addr),
    /// Service locator.
    Srv {
        /// Target host name.
        target: String,
        /// Target port.
        port: u16,
    },
    /// Free-form text.
    Txt(String),
}

/// One DNS record as the resolution subsystem serves it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Owner domain name.
    pub name: String,
    /// Time to live, in seconds.
    pub ttl: u32,
    /// Record payload.
    pub data: RecordData,
}

/// Records grouped by owner domain, as handed to reload hooks.
pub type RecordSet = HashMap<String, Vec<Record>>;

/// Transform applied to the record set around a reload.
///
/// Preload hooks run before freshly pulled state is installed, postload
/// hooks after. Hooks are registered through the plugin context during
/// initialization only.
pub trait RecordHook: Send + Sync + 'static {
    /// Mutate the record set in place.
    fn on_records(&self, records: &mut RecordSet);
}
