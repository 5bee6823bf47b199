use std::ops::{Add, Sub};

/// プール内のアドレス表現に使われる整数値.
///
/// アドレスの単位は **要素** であり、全セグメントを連結した仮想的な領域の先頭からの位置を表す.
#[derive(Debug, Clone, Copy, PartialOrd, Ord, PartialEq, Eq, Hash)]
pub struct Address(usize);
impl Address {
    /// アドレスの値を返す.
    pub fn as_usize(self) -> usize {
        self.0
    }
}
impl From<usize> for Address {
    fn from(from: usize) -> Self {
        Address(from)
    }
}
impl Add<usize> for Address {
    type Output = Self;
    fn add(self, rhs: usize) -> Self {
        Address(self.0.checked_add(rhs).expect("address overflow"))
    }
}
impl Sub for Address {
    type Output = usize;
    fn sub(self, rhs: Self) -> usize {
        self.0.checked_sub(rhs.0).expect("address underflow")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_works() {
        assert_eq!(Address::from(10) + 2, Address::from(12));
        assert_eq!(Address::from(10) - Address::from(2), 8);
        assert!(Address::from(3) < Address::from(4));
    }

    #[test]
    #[should_panic]
    fn underflow() {
        let _ = Address::from(0) - Address::from(1);
    }
}
