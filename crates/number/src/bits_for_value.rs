/// Returns the number of bits needed to represent the given value, which is at least one.
pub fn bits_for_value(value: usize) -> u8 {
    (usize::BITS - value.leading_zeros()).max(1) as u8
}
