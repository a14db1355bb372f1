use {
    super::variant::Variant,
    crate::{context::ContextValue, serutil::StringList},
    ipnet::IpNet,
    std::net::IpAddr,
};

/// IP address operation names.
pub(super) const IP_ADDRESS_DISPLAY_NAMES: [&str; 4] =
    ["IpAddress", "IpAddressIfExists", "NotIpAddress", "NotIpAddressIfExists"];

/// Each candidate is either a bare address (literal match) or a CIDR block (containment). `NotIpAddress` is true
/// when no candidate matched.
pub(super) fn ip_address_match(allowed: &StringList, value: &ContextValue, variant: Variant) -> bool {
    let value = match value {
        ContextValue::Null => return variant.if_exists(),
        ContextValue::IpAddr(value) => *value,
        ContextValue::String(value) => match value.parse::<IpAddr>() {
            Ok(value) => value,
            Err(_) => return variant.negated(),
        },
        _ => return false,
    };

    let any_match = allowed.iter().any(|el| {
        let parsed = match el.parse::<IpNet>() {
            Ok(net) => Some(net),
            Err(_) => match el.parse::<IpAddr>() {
                Ok(addr) => Some(IpNet::from(addr)),
                Err(_) => None,
            },
        };
        match parsed {
            Some(net) => net.contains(&value),
            None => false,
        }
    });

    any_match != variant.negated()
}
