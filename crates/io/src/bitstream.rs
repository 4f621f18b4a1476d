use std::io::Read;
use std::io::Write;
use std::io::{self};

use bitstream_io::BigEndian;
use bitstream_io::BitRead;
use bitstream_io::BitReader;
use bitstream_io::BitWrite;
use bitstream_io::BitWriter;
use log::error;
use thiserror::Error;

use merc_number::read_u64_variablelength;
use merc_number::write_u64_variablelength;
use merc_utilities::MercError;

/// The largest number of bytes reserved up front for a string, longer strings
/// grow the buffer as their bytes are actually read.
const STRING_RESERVATION: usize = 4096;

/// Errors caused by using a bit stream incorrectly.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum BitStreamError {
    #[error("Cannot write to a bit stream that has already been flushed")]
    AlreadyFlushed,

    #[error("Cannot transfer {0} bits at once, at most 64 bits are supported")]
    TooManyBits(u8),
}

/// Trait for writing bit-level data.
pub trait BitStreamWrite {
    /// Writes the least significant bits from a u64 value. Any higher bits of
    /// the value are ignored, and writing zero bits does nothing.
    ///
    /// # Preconditions
    /// - number_of_bits must be <= 64
    fn write_bits(&mut self, value: u64, number_of_bits: u8) -> Result<(), MercError>;

    /// Writes a string prefixed with its length as a variable-width integer.
    fn write_string(&mut self, s: &str) -> Result<(), MercError>;

    /// Writes a u64 value using variable-width encoding.
    fn write_integer(&mut self, value: u64) -> Result<(), MercError>;

    /// Pads the last partial byte with zeroes and writes it to the underlying writer.
    fn flush(&mut self) -> Result<(), MercError>;
}

/// Trait for reading bit-level data.
pub trait BitStreamRead {
    /// Reads bits into the least significant bits of a u64.
    ///
    /// # Preconditions
    /// - number_of_bits must be <= 64
    fn read_bits(&mut self, number_of_bits: u8) -> Result<u64, MercError>;

    /// Reads a length-prefixed string.
    fn read_string(&mut self) -> Result<String, MercError>;

    /// Reads a variable-width encoded integer.
    fn read_integer(&mut self) -> Result<u64, MercError>;
}

/// Writer for bit-level output operations using an underlying writer.
///
/// The stream is flushed exactly once, either explicitly or when it is dropped.
pub struct BitStreamWriter<W: Write> {
    writer: BitWriter<W, BigEndian>,
    flushed: bool,
}

impl<W: Write> BitStreamWriter<W> {
    /// Creates a new BitStreamWriter wrapping the provided writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer: BitWriter::new(writer),
            flushed: false,
        }
    }

    /// Returns true iff the stream has already been flushed.
    pub fn is_flushed(&self) -> bool {
        self.flushed
    }

    fn check_writable(&self) -> Result<(), MercError> {
        if self.is_flushed() {
            return Err(BitStreamError::AlreadyFlushed.into());
        }
        Ok(())
    }
}

impl<W: Write> Drop for BitStreamWriter<W> {
    fn drop(&mut self) {
        if !self.is_flushed() && self.flush().is_err() {
            error!("Failed to flush the bit stream when it was dropped!")
        }
    }
}

/// Reader for bit-level input operations from an underlying reader.
pub struct BitStreamReader<R: Read> {
    reader: BitReader<R, BigEndian>,
    text_buffer: Vec<u8>,
}

impl<R: Read> BitStreamReader<R> {
    /// Creates a new BitStreamReader wrapping the provided reader.
    pub fn new(reader: R) -> Self {
        Self {
            reader: BitReader::new(reader),
            text_buffer: Vec::with_capacity(128),
        }
    }
}

impl<W: Write> BitStreamWrite for BitStreamWriter<W> {
    fn write_bits(&mut self, value: u64, number_of_bits: u8) -> Result<(), MercError> {
        self.check_writable()?;
        if number_of_bits > 64 {
            return Err(BitStreamError::TooManyBits(number_of_bits).into());
        }

        if number_of_bits == 0 {
            return Ok(());
        }

        let masked = if number_of_bits == 64 {
            value
        } else {
            value & ((1u64 << number_of_bits) - 1)
        };

        Ok(self.writer.write_var(number_of_bits as u32, masked)?)
    }

    fn write_string(&mut self, s: &str) -> Result<(), MercError> {
        self.write_integer(s.len() as u64)?;
        for byte in s.as_bytes() {
            self.writer.write::<8, u8>(*byte)?;
        }
        Ok(())
    }

    fn write_integer(&mut self, value: u64) -> Result<(), MercError> {
        self.check_writable()?;
        write_u64_variablelength(&mut self.writer, value)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), MercError> {
        self.check_writable()?;
        self.flushed = true;

        self.writer.byte_align()?;
        Ok(self.writer.flush()?)
    }
}

impl<R: Read> BitStreamRead for BitStreamReader<R> {
    fn read_bits(&mut self, number_of_bits: u8) -> Result<u64, MercError> {
        if number_of_bits > 64 {
            return Err(BitStreamError::TooManyBits(number_of_bits).into());
        }

        if number_of_bits == 0 {
            return Ok(0);
        }

        Ok(self.reader.read_var(number_of_bits as u32)?)
    }

    fn read_string(&mut self) -> Result<String, MercError> {
        let length: usize = self.read_integer()?.try_into()?;
        self.text_buffer.clear();
        self.text_buffer.reserve(length.min(STRING_RESERVATION));

        for _ in 0..length {
            let byte = self.reader.read::<8, u8>()?;
            self.text_buffer.push(byte);
        }

        Ok(String::from_utf8(self.text_buffer.clone()).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?)
    }

    fn read_integer(&mut self) -> Result<u64, MercError> {
        read_u64_variablelength(&mut self.reader)
    }
}
