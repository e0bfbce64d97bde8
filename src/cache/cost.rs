//! Cost Module
//!
//! Default cost of a value: byte length for string and byte containers, width
//! for fixed-size numerics. Types outside this set must supply a cost function.

use std::borrow::Cow;
use std::sync::Arc;

/// User-supplied cost function.
pub type CostFn<V> = Arc<dyn Fn(&V) -> i64 + Send + Sync>;

/// Values with a natural cost.
pub trait DefaultCost {
    fn default_cost(&self) -> i64;
}

/// Values whose cost is their length in bytes.
pub trait ByteLength {
    fn byte_len(&self) -> usize;
}

/// Values whose cost is their in-memory width.
pub trait FixedWidth: Sized {
    const WIDTH: i64 = std::mem::size_of::<Self>() as i64;
}

macro_rules! byte_length {
    ($($t:ty),* $(,)?) => {$(
        impl ByteLength for $t {
            fn byte_len(&self) -> usize {
                self.len()
            }
        }

        impl DefaultCost for $t {
            fn default_cost(&self) -> i64 {
                self.byte_len() as i64
            }
        }
    )*};
}

macro_rules! fixed_width {
    ($($t:ty),* $(,)?) => {$(
        impl FixedWidth for $t {}

        impl DefaultCost for $t {
            fn default_cost(&self) -> i64 {
                <$t as FixedWidth>::WIDTH
            }
        }
    )*};
}

byte_length!(String, &str, Vec<u8>, &[u8], Box<str>, Box<[u8]>, Cow<'_, str>);
fixed_width!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64, bool, char);

impl<T: DefaultCost + ?Sized> DefaultCost for Arc<T> {
    fn default_cost(&self) -> i64 {
        (**self).default_cost()
    }
}

/// Cost function backed by `DefaultCost`.
pub fn default_cost_fn<V: DefaultCost>() -> CostFn<V> {
    Arc::new(|value: &V| value.default_cost())
}
