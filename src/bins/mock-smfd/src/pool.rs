//! UE address pool
//!
//! Draws simulated UE addresses from an IPv4 prefix. The all-zero host part
//! is never handed out, so the first address is network + 1.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::context::{SmfError, SmfResult};

/// An IPv4 prefix UE addresses are drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UePool {
    network: Ipv4Addr,
    prefix_len: u8,
}

impl UePool {
    pub fn new(network: Ipv4Addr, prefix_len: u8) -> Self {
        let mask = if prefix_len == 0 {
            0
        } else {
            u32::MAX << (32 - u32::from(prefix_len))
        };
        Self {
            network: Ipv4Addr::from(u32::from(network) & mask),
            prefix_len,
        }
    }

    /// Number of host values the prefix spans (including the reserved
    /// all-zero host)
    pub fn capacity(&self) -> usize {
        1usize << (32 - u32::from(self.prefix_len))
    }

    /// Draw `count` addresses starting at network + 1
    pub fn addresses(&self, count: usize) -> SmfResult<Vec<Ipv4Addr>> {
        if count >= self.capacity() {
            return Err(SmfError::AddressPoolExhausted {
                requested: count,
                capacity: self.capacity(),
            });
        }
        let base = u32::from(self.network) + 1;
        Ok((0..count as u32).map(|i| Ipv4Addr::from(base + i)).collect())
    }
}

impl fmt::Display for UePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix_len)
    }
}

impl FromStr for UePool {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, len) = s
            .split_once('/')
            .ok_or_else(|| format!("'{s}' is not in prefix/length form"))?;
        let network: Ipv4Addr = addr
            .parse()
            .map_err(|_| format!("'{addr}' is not an IPv4 address"))?;
        let prefix_len: u8 = len
            .parse()
            .map_err(|_| format!("'{len}' is not a prefix length"))?;
        if prefix_len > 32 {
            return Err(format!("prefix length {prefix_len} out of range"));
        }
        Ok(Self::new(network, prefix_len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_address_is_network_plus_one() {
        let pool: UePool = "10.0.0.0/24".parse().unwrap();
        let addrs = pool.addresses(3).unwrap();
        assert_eq!(
            addrs,
            vec![
                Ipv4Addr::new(10, 0, 0, 1),
                Ipv4Addr::new(10, 0, 0, 2),
                Ipv4Addr::new(10, 0, 0, 3),
            ]
        );
    }

    #[test]
    fn host_bits_in_the_prefix_are_masked_off() {
        let pool: UePool = "17.0.0.9/24".parse().unwrap();
        assert_eq!(pool.addresses(1).unwrap()[0], Ipv4Addr::new(17, 0, 0, 1));
    }

    #[test]
    fn pool_exhaustion() {
        let pool: UePool = "10.0.0.0/24".parse().unwrap();
        assert_eq!(pool.addresses(255).unwrap().len(), 255);
        assert!(matches!(
            pool.addresses(256),
            Err(SmfError::AddressPoolExhausted {
                requested: 256,
                capacity: 256
            })
        ));
    }

    #[test]
    fn parse_rejects_malformed_prefixes() {
        assert!("10.0.0.0".parse::<UePool>().is_err());
        assert!("300.0.0.0/24".parse::<UePool>().is_err());
        assert!("10.0.0.0/33".parse::<UePool>().is_err());
    }

    #[test]
    fn display_round_trips() {
        let pool: UePool = "17.0.0.0/24".parse().unwrap();
        assert_eq!(pool.to_string(), "17.0.0.0/24");
    }
}
