use crate::bin_error::BinaryError;

/// An integer type with a fixed little-endian on-disk encoding.
pub trait LittleEndianInteger: Sized + Copy {
    const SIZE: usize;

    /// Decode `Self` from `bytes`. `bytes` must be exactly `Self::SIZE` long.
    fn from_le(bytes: &[u8]) -> Result<Self, BinaryError>;

    /// Encode `Self` into `target`. `target` must be exactly `Self::SIZE` long.
    fn to_le(self, target: &mut [u8]) -> Result<(), BinaryError>;
}

macro_rules! impl_little_endian_integer {
    ($t:ty) => {
        impl LittleEndianInteger for $t {
            const SIZE: usize = std::mem::size_of::<$t>();

            fn from_le(bytes: &[u8]) -> Result<Self, BinaryError> {
                if bytes.len() != Self::SIZE {
                    return Err(BinaryError::RangeOutOfBounds {
                        expected: Self::SIZE,
                        from_offset: 0,
                    });
                }

                Ok(<$t>::from_le_bytes(bytes.try_into()?))
            }

            fn to_le(self, target: &mut [u8]) -> Result<(), BinaryError> {
                let self_bytes = &self.to_le_bytes();

                if self_bytes.len() != target.len() {
                    return Err(BinaryError::RangeOutOfBounds {
                        expected: Self::SIZE,
                        from_offset: 0,
                    });
                }

                target.copy_from_slice(self_bytes);
                Ok(())
            }
        }
    };
}

impl_little_endian_integer!(i32);
impl_little_endian_integer!(u32);

/// Reads a little-endian integer from `bytes`, starting at `start_offset`.
pub fn read_le<T: LittleEndianInteger>(bytes: &[u8], start_offset: usize) -> Result<T, BinaryError> {
    let Some(slice) = bytes.get(start_offset..start_offset + T::SIZE) else {
        return Err(BinaryError::RangeOutOfBounds {
            expected: T::SIZE,
            from_offset: start_offset,
        });
    };

    T::from_le(slice)
}

/// Converts `value` to little-endian bytes and writes them at `start_offset` in `bytes`.
pub fn write_le<T: LittleEndianInteger>(
    bytes: &mut [u8],
    start_offset: usize,
    value: T,
) -> Result<(), BinaryError> {
    let Some(slice) = bytes.get_mut(start_offset..start_offset + T::SIZE) else {
        return Err(BinaryError::RangeOutOfBounds {
            expected: T::SIZE,
            from_offset: start_offset,
        });
    };

    value.to_le(slice)
}

#[cfg(test)]
mod read_le_tests {
    use super::*;

    #[test]
    fn test_read_le_u32() {
        let bytes = [0x17, 0x00, 0x00, 0x00];
        let result = read_le::<u32>(&bytes, 0).unwrap();
        assert_eq!(result, 23);
    }

    #[test]
    fn test_read_le_u32_larger_array() {
        let bytes = [0x00, 0x00, 0x00, 0x00, 0x17, 0x00, 0x00, 0x00];
        let result = read_le::<u32>(&bytes, 4).unwrap();
        assert_eq!(result, 23);
    }

    #[test]
    fn test_read_le_i32_negative() {
        let bytes = (-42i32).to_le_bytes();
        let result = read_le::<i32>(&bytes, 0).unwrap();
        assert_eq!(result, -42);
    }

    #[test]
    fn test_read_le_out_of_bounds() {
        let bytes = [0x17, 0x00];
        let result = read_le::<u32>(&bytes, 0);
        assert!(matches!(
            result,
            Err(BinaryError::RangeOutOfBounds {
                expected: 4,
                from_offset: 0
            })
        ));
    }
}
