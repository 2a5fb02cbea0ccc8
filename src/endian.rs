//! [Endianness](https://en.wikipedia.org/wiki/Endianness) as a value type.
//!
//! DICOM transfer syntaxes select byte order at runtime (implicit/explicit VR
//! little endian, the retired big endian syntax), so endianness here is data,
//! not a type parameter: sources and targets carry an [`Endian`] and decode
//! through it.

/// Byte order of a stream or buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Endian {
    #[default]
    Little,
    Big,
}

impl Endian {
    /// Byte order of the machine this code runs on.
    #[cfg(target_endian = "little")]
    pub const LOCAL_MACHINE: Endian = Endian::Little;

    /// Byte order of the machine this code runs on.
    #[cfg(target_endian = "big")]
    pub const LOCAL_MACHINE: Endian = Endian::Big;

    /// Network byte order. This is always big endian.
    pub const NETWORK: Endian = Endian::Big;

    /// Whether values of this byte order need swapping on this machine.
    #[inline]
    pub fn is_foreign(&self) -> bool {
        *self != Self::LOCAL_MACHINE
    }
}

impl std::fmt::Display for Endian {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Endian::Little => write!(f, "Little Endian"),
            Endian::Big => write!(f, "Big Endian"),
        }
    }
}

/// Swap bytes in place in sequences of 2.
///
/// A trailing partial sequence is left untouched.
pub fn swap_bytes_2(bytes: &mut [u8]) {
    let l = bytes.len() - bytes.len() % 2;
    for i in (0..l).step_by(2) {
        bytes.swap(i, i + 1);
    }
}

/// Swap bytes in place in sequences of 4.
pub fn swap_bytes_4(bytes: &mut [u8]) {
    let l = bytes.len() - bytes.len() % 4;
    for i in (0..l).step_by(4) {
        bytes.swap(i, i + 3);
        bytes.swap(i + 1, i + 2);
    }
}

/// Swap bytes in place in sequences of 8.
pub fn swap_bytes_8(bytes: &mut [u8]) {
    let l = bytes.len() - bytes.len() % 8;
    for i in (0..l).step_by(8) {
        bytes[i..i + 8].reverse();
    }
}

/// Swap bytes in place in sequences of `unit` bytes.
///
/// `unit == 1` is a no-op. A trailing partial unit is left untouched.
pub fn swap_bytes(unit: usize, bytes: &mut [u8]) {
    match unit {
        0 | 1 => {}
        2 => swap_bytes_2(bytes),
        4 => swap_bytes_4(bytes),
        8 => swap_bytes_8(bytes),
        _ => {
            let l = bytes.len() - bytes.len() % unit;
            for i in (0..l).step_by(unit) {
                bytes[i..i + unit].reverse();
            }
        }
    }
}

macro_rules! impl_endian_codec {
    {
        $(
            $ty:ty : $bytes:expr => $read:ident, $write:ident;
        )*
    } => {
        impl Endian {
            $(
                #[doc = concat!("Decode a `", stringify!($ty), "` from bytes in this byte order.")]
                #[inline]
                pub fn $read(&self, bytes: [u8; $bytes]) -> $ty {
                    match self {
                        Endian::Little => <$ty>::from_le_bytes(bytes),
                        Endian::Big => <$ty>::from_be_bytes(bytes),
                    }
                }

                #[doc = concat!("Encode a `", stringify!($ty), "` to bytes in this byte order.")]
                #[inline]
                pub fn $write(&self, value: $ty) -> [u8; $bytes] {
                    match self {
                        Endian::Little => value.to_le_bytes(),
                        Endian::Big => value.to_be_bytes(),
                    }
                }
            )*
        }
    };
}

impl_endian_codec! {
    i16: 2 => read_i16, write_i16;
    u16: 2 => read_u16, write_u16;
    i32: 4 => read_i32, write_i32;
    u32: 4 => read_u32, write_u32;
    i64: 8 => read_i64, write_i64;
    u64: 8 => read_u64, write_u64;
    f32: 4 => read_f32, write_f32;
    f64: 8 => read_f64, write_f64;
}

macro_rules! impl_swap {
    {
        $(
            $name:ident : $ty:ty;
        )*
    } => {
        $(
            #[doc = concat!("Reverse the byte order of a `", stringify!($ty), "` value.")]
            #[inline]
            pub fn $name(value: $ty) -> $ty {
                value.swap_bytes()
            }
        )*
    };
}

impl_swap! {
    swap_i16: i16;
    swap_u16: u16;
    swap_i32: i32;
    swap_u32: u32;
    swap_i64: i64;
    swap_u64: u64;
}

/// Reverse the byte order of an `f32` value.
#[inline]
pub fn swap_f32(value: f32) -> f32 {
    f32::from_bits(value.to_bits().swap_bytes())
}

/// Reverse the byte order of an `f64` value.
#[inline]
pub fn swap_f64(value: f64) -> f64 {
    f64::from_bits(value.to_bits().swap_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_machine_matches_target_endian() {
        if cfg!(target_endian = "little") {
            assert_eq!(Endian::LOCAL_MACHINE, Endian::Little);
        }
        else {
            assert_eq!(Endian::LOCAL_MACHINE, Endian::Big);
        }
    }

    #[test]
    fn swaps_in_units_of_2() {
        let mut bytes = *b"\x12\x34\x56\x78";
        swap_bytes_2(&mut bytes);
        assert_eq!(bytes, *b"\x34\x12\x78\x56");
    }

    #[test]
    fn swaps_in_units_of_4() {
        let mut bytes = *b"\x12\x34\x56\x78";
        swap_bytes_4(&mut bytes);
        assert_eq!(bytes, *b"\x78\x56\x34\x12");
    }

    #[test]
    fn swaps_in_units_of_8() {
        let mut bytes = *b"\x12\x34\x56\x78\x9a\xbc\xde\xf0";
        swap_bytes_8(&mut bytes);
        assert_eq!(bytes, *b"\xf0\xde\xbc\x9a\x78\x56\x34\x12");
    }

    #[test]
    fn unit_1_is_a_no_op() {
        let mut bytes = *b"\x12\x34\x56";
        swap_bytes(1, &mut bytes);
        assert_eq!(bytes, *b"\x12\x34\x56");
    }

    #[test]
    fn trailing_partial_unit_is_untouched() {
        let mut bytes = *b"\x12\x34\x56";
        swap_bytes(2, &mut bytes);
        assert_eq!(bytes, *b"\x34\x12\x56");
    }

    #[test]
    fn generic_unit_reverses() {
        let mut bytes = *b"\x01\x02\x03\x04\x05\x06";
        swap_bytes(3, &mut bytes);
        assert_eq!(bytes, *b"\x03\x02\x01\x06\x05\x04");
    }

    macro_rules! make_codec_tests {
        {
            $(
                $name:ident : $ty:ty, $read:ident, $write:ident => { $value:expr } == { $be:expr, $le:expr };
            )*
        } => {
            $(
                #[test]
                fn $name() {
                    assert_eq!(Endian::Big.$write($value), *$be);
                    assert_eq!(Endian::Little.$write($value), *$le);
                    assert_eq!(Endian::Big.$read(*$be), $value);
                    assert_eq!(Endian::Little.$read(*$le), $value);
                }
            )*
        };
    }

    make_codec_tests! {
        codec_u16: u16, read_u16, write_u16 => { 0x1234 } == { b"\x12\x34", b"\x34\x12" };
        codec_i16: i16, read_i16, write_i16 => { 0x1234 } == { b"\x12\x34", b"\x34\x12" };
        codec_u32: u32, read_u32, write_u32 => { 0x12345678 } == { b"\x12\x34\x56\x78", b"\x78\x56\x34\x12" };
        codec_i32: i32, read_i32, write_i32 => { 0x12345678 } == { b"\x12\x34\x56\x78", b"\x78\x56\x34\x12" };
        codec_u64: u64, read_u64, write_u64 => { 0x123456789abcdef0 } == {
            b"\x12\x34\x56\x78\x9a\xbc\xde\xf0",
            b"\xf0\xde\xbc\x9a\x78\x56\x34\x12"
        };
        codec_i64: i64, read_i64, write_i64 => { 0x123456789abcdef0 } == {
            b"\x12\x34\x56\x78\x9a\xbc\xde\xf0",
            b"\xf0\xde\xbc\x9a\x78\x56\x34\x12"
        };
    }

    #[test]
    fn scalar_swap_round_trips() {
        assert_eq!(swap_u16(0x1234), 0x3412);
        assert_eq!(swap_u32(0x12345678), 0x78563412);
        assert_eq!(swap_u64(swap_u64(0x123456789abcdef0)), 0x123456789abcdef0);
        assert_eq!(swap_f32(swap_f32(1.5)), 1.5);
        assert_eq!(swap_f64(swap_f64(-2.25)), -2.25);
    }
}
