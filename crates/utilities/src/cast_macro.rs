/// Returns the contents of the given single field variant of an enum, and
/// panics when the value is another variant.
///
/// Usage: `cast!(value, Enum::Variant)`.
#[macro_export]
macro_rules! cast {
    ($target: expr, $pat: path) => {{
        match $target {
            $pat(inner) => inner,
            _ => unreachable!("Expected the variant {}", stringify!($pat)),
        }
    }};
}

#[cfg(test)]
mod tests {
    enum Entry {
        Filled(usize),
        Empty(()),
    }

    #[test]
    fn test_cast() {
        let entry = Entry::Filled(3);
        assert_eq!(*cast!(&entry, Entry::Filled), 3);
    }

    #[test]
    #[should_panic(expected = "Expected the variant Entry::Empty")]
    fn test_cast_mismatch() {
        let entry = Entry::Filled(3);
        cast!(entry, Entry::Empty);
    }
}
