use std::fmt;

use serde::{Deserialize, Serialize};

/// 20-byte account or pool address
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    pub const fn new(bytes: [u8; 20]) -> Self {
        Address(bytes)
    }

    /// Address whose low 8 bytes hold `value` big-endian
    pub fn from_low_u64(value: u64) -> Self {
        let mut bytes = [0u8; 20];
        bytes[12..].copy_from_slice(&value.to_be_bytes());
        Address(bytes)
    }

    /// Truncated pool identifier: the low 64 bits of the address
    pub fn pool_id(&self) -> u64 {
        let mut low = [0u8; 8];
        low.copy_from_slice(&self.0[12..]);
        u64::from_be_bytes(low)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_id_is_low_64_bits() {
        let mut bytes = [0xabu8; 20];
        bytes[12..].copy_from_slice(&0x0102_0304_0506_0708u64.to_be_bytes());
        assert_eq!(Address(bytes).pool_id(), 0x0102_0304_0506_0708);
        assert_eq!(Address::from_low_u64(42).pool_id(), 42);
    }

    #[test]
    fn test_display() {
        let shown = Address::from_low_u64(0xff).to_string();
        assert_eq!(shown.len(), 42);
        assert!(shown.ends_with("ff"));
    }
}
