use std::collections::HashSet;
use std::net::{Ipv4Addr, TcpListener};
use std::ops::RangeInclusive;

/// Finds free TCP ports inside a fixed range.
///
/// A port is handed out only if it is not in the caller's claimed set *and* a
/// throwaway listener can bind it. The listener is dropped before returning,
/// so the port is free for the child process to take.
#[derive(Debug, Clone)]
pub struct PortAllocator {
    range: RangeInclusive<u16>,
}

impl PortAllocator {
    pub fn new(range: RangeInclusive<u16>) -> Self {
        Self { range }
    }

    pub fn range(&self) -> &RangeInclusive<u16> {
        &self.range
    }

    /// Lowest free, unclaimed port in the range, or `None` when exhausted.
    pub fn allocate(&self, claimed: &HashSet<u16>) -> Option<u16> {
        self.range
            .clone()
            .filter(|port| !claimed.contains(port))
            .find(|&port| is_bindable(port))
    }
}

fn is_bindable(port: u16) -> bool {
    match TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)) {
        Ok(listener) => {
            drop(listener);
            true
        }
        Err(e) => {
            tracing::trace!(port, error = %e, "Port unavailable");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocates_within_range() {
        let allocator = PortAllocator::new(47100..=47119);
        let port = allocator.allocate(&HashSet::new()).expect("a free port");
        assert!((47100..=47119).contains(&port));
    }

    #[test]
    fn test_skips_claimed_ports() {
        let allocator = PortAllocator::new(47120..=47139);
        let first = allocator.allocate(&HashSet::new()).unwrap();
        let claimed: HashSet<u16> = [first].into_iter().collect();
        let second = allocator.allocate(&claimed).unwrap();
        assert_ne!(first, second);
        assert!(second > first);
    }

    #[test]
    fn test_exhausted_when_all_claimed() {
        let allocator = PortAllocator::new(47200..=47204);
        let claimed: HashSet<u16> = (47200..=47204).collect();
        assert_eq!(allocator.allocate(&claimed), None);
    }

    #[test]
    fn test_skips_port_bound_by_another_socket() {
        let probe = PortAllocator::new(47140..=47159);
        let port = probe.allocate(&HashSet::new()).unwrap();
        let _held = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).unwrap();

        let allocator = PortAllocator::new(port..=port);
        assert_eq!(allocator.allocate(&HashSet::new()), None);
    }

    #[test]
    fn test_port_is_released_after_allocation() {
        let allocator = PortAllocator::new(47160..=47179);
        let port = allocator.allocate(&HashSet::new()).unwrap();
        // The probe listener must be gone so the child can bind.
        assert!(TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).is_ok());
    }
}
