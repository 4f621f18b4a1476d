use std::io::Read;
use std::io::Write;

use bitstream_io::BitRead;
use bitstream_io::BitReader;
use bitstream_io::BitWrite;
use bitstream_io::BitWriter;
use bitstream_io::Endianness;
use thiserror::Error;

use merc_utilities::MercError;

/// The maximum number of bytes needed to encode a value of type T in most significant bit encoding.
pub const fn encoding_size<T>() -> usize {
    ((std::mem::size_of::<T>() + 1) * 8) / 7
}

/// Errors that can occur when decoding a variable-length integer.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum VarintError {
    #[error("Variable-length integer does not fit in {bits} bits")]
    Overflow { bits: u32 },

    #[error("Variable-length integer is not terminated within {bytes} bytes")]
    Unterminated { bytes: usize },
}

/// Encodes a given unsigned variable-length integer using the most significant bit (MSB) algorithm.
///
/// # Details
///
/// Every output byte carries seven bits of the value, least significant group
/// first. The high bit of a byte is set when more bytes follow.
///
/// Implementation taken from <https://techoverflow.net/2013/01/25/efficiently-encoding-variable-length-integers-in-cc/>
pub fn write_u64_variablelength<W: Write, E: Endianness>(
    stream: &mut BitWriter<W, E>,
    mut value: u64,
) -> Result<(), MercError> {
    // While more than 7 bits of data are left, occupy the last output byte
    // and set the next byte flag.
    while value > 0b01111111 {
        stream.write::<8, u8>((value as u8 & 0b01111111) | 0b10000000)?;

        // Remove the seven bits we just wrote from value.
        value >>= 7;
    }

    stream.write::<8, u8>(value as u8)?;
    Ok(())
}

/// Decodes an unsigned variable-length integer using the MSB algorithm.
///
/// Fails when the encoding does not fit in a `u64`, or when no terminating
/// byte is found within [encoding_size] bytes. A short read from the
/// underlying source is reported as an I/O error.
pub fn read_u64_variablelength<R: Read, E: Endianness>(stream: &mut BitReader<R, E>) -> Result<u64, MercError> {
    let mut value: u64 = 0;
    for i in 0..encoding_size::<u64>() {
        let byte = stream.read::<8, u8>()?;
        let group = (byte & 0b01111111) as u64;

        // The last group only has room for the remaining bits of the value.
        let shift = 7 * i as u32;
        if shift > 0 && group > (u64::MAX >> shift) {
            return Err(VarintError::Overflow { bits: u64::BITS }.into());
        }

        // Take 7 bits (mask 0x01111111) from byte and shift it before the bits already written to value.
        value |= group << shift;

        if byte & 0b10000000 == 0 {
            // If the next-byte flag is not set then we are finished.
            return Ok(value);
        }
    }

    Err(VarintError::Unterminated {
        bytes: encoding_size::<u64>(),
    }
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;

    use bitstream_io::BigEndian;
    use rand::Rng;

    use merc_utilities::random_test;

    fn encode(value: u64) -> Vec<u8> {
        let mut stream = Vec::new();
        let mut writer = BitWriter::<_, BigEndian>::new(&mut stream);
        write_u64_variablelength(&mut writer, value).unwrap();
        drop(writer);
        stream
    }

    fn decode(bytes: &[u8]) -> Result<u64, MercError> {
        let mut reader = BitReader::<_, BigEndian>::new(bytes);
        read_u64_variablelength(&mut reader)
    }

    #[test]
    fn test_random_integer_encoding() {
        random_test(1000, |rng| {
            let value = rng.random();
            assert_eq!(decode(&encode(value)).unwrap(), value);
        });
    }

    #[test]
    fn test_integer_encoding_bytes() {
        assert_eq!(encode(300), vec![0xAC, 0x02]);
        assert_eq!(decode(&[0xAC, 0x02]).unwrap(), 300);

        assert_eq!(encode(0), vec![0x00]);
        assert_eq!(encode(127), vec![0x7F]);
        assert_eq!(encode(128), vec![0x80, 0x01]);
        assert_eq!(encode(u64::MAX).len(), encoding_size::<u64>());
        assert_eq!(decode(&encode(u64::MAX)).unwrap(), u64::MAX);
    }

    #[test]
    fn test_integer_decoding_overflow() {
        // Nine full groups followed by a tenth group that needs more than one bit.
        let mut bytes = vec![0xFF; 9];
        bytes.push(0x02);

        let error = decode(&bytes).unwrap_err();
        assert_eq!(
            error.downcast_ref::<VarintError>(),
            Some(&VarintError::Overflow { bits: 64 })
        );
    }

    #[test]
    fn test_integer_decoding_unterminated() {
        let bytes = vec![0x81; 10];

        let error = decode(&bytes).unwrap_err();
        assert_eq!(
            error.downcast_ref::<VarintError>(),
            Some(&VarintError::Unterminated { bytes: 10 })
        );
    }

    #[test]
    fn test_integer_decoding_short_read() {
        let error = decode(&[0x80]).unwrap_err();
        assert!(error.downcast_ref::<std::io::Error>().is_some());
    }
}
