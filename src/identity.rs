//! Local-device identification
//!
//! Decides whether an incoming asset record describes the machine this
//! agent runs on: the record must be a rack-controller device and carry at
//! least one address that is bound to a local network interface.

use std::collections::HashSet;
use std::net::IpAddr;

use sysinfo::Networks;
use tracing::trace;

use crate::{AssetOperation, AssetRecord};

const TYPE_DEVICE: &str = "device";
const SUBTYPE_RACK_CONTROLLER: &str = "rackcontroller";

/// Enumerate the addresses currently bound to local network interfaces.
///
/// Which interface an address belongs to does not matter for matching, so
/// the result is a flat set across all interfaces.
pub fn local_addresses() -> HashSet<IpAddr> {
    let networks = Networks::new_with_refreshed_list();
    let mut addresses = HashSet::new();

    for (interface, data) in &networks {
        for network in data.ip_networks() {
            trace!("local address {} on {interface}", network.addr);
            addresses.insert(network.addr);
        }
    }

    addresses
}

/// Is this record a created/updated rack-controller device?
///
/// Checked before any address enumeration; records failing this gate can
/// never identify the local device.
pub fn is_rack_controller(record: &AssetRecord) -> bool {
    matches!(
        record.operation,
        AssetOperation::Create | AssetOperation::Update
    ) && record.aux_str("type") == Some(TYPE_DEVICE)
        && record.aux_str("subtype") == Some(SUBTYPE_RACK_CONTROLLER)
}

/// Does any address advertised by the record match a local one?
///
/// IPv6 addresses (`ext.ipv6.1..N`) are scanned first, then IPv4
/// (`ext.ip.1..N`); each scan stops at the first missing index. First
/// match wins.
pub fn has_local_address(record: &AssetRecord, local: &HashSet<IpAddr>) -> bool {
    indexed_values(record, "ipv6").any(|candidate| matches_local(candidate, local))
        || indexed_values(record, "ip").any(|candidate| matches_local(candidate, local))
}

fn matches_local(candidate: &str, local: &HashSet<IpAddr>) -> bool {
    parse_candidate(candidate).is_some_and(|addr| local.contains(&addr))
}

/// IPv6 addresses sometimes arrive with a link-local zone suffix
/// (`fe80::1%eth0`); the zone is not part of the address.
fn parse_candidate(raw: &str) -> Option<IpAddr> {
    let bare = raw.split('%').next().unwrap_or(raw);
    bare.parse().ok()
}

fn indexed_values<'a>(
    record: &'a AssetRecord,
    prefix: &'a str,
) -> impl Iterator<Item = &'a str> {
    (1..).map_while(move |index| record.ext_str(&format!("{prefix}.{index}")))
}
