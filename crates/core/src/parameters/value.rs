//! Parameter value types
//!
//! A parameter value as it travels over the MAVLink parameter protocol.
//! PARAM_VALUE and PARAM_SET carry every value in a single `f32` field
//! together with a type tag; this module converts between the tagged
//! representation and that wire field.

use core::fmt;

/// Parameter type (MAVLink MAV_PARAM_TYPE subset used by autopilots)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamType {
    /// 8-bit unsigned integer
    Uint8,
    /// 8-bit signed integer
    Int8,
    /// 16-bit unsigned integer
    Uint16,
    /// 16-bit signed integer
    Int16,
    /// 32-bit unsigned integer
    Uint32,
    /// 32-bit signed integer
    Int32,
    /// 32-bit floating point
    Float,
}

impl ParamType {
    /// MAV_PARAM_TYPE enum value
    pub const fn mav_id(self) -> u8 {
        match self {
            ParamType::Uint8 => 1,
            ParamType::Int8 => 2,
            ParamType::Uint16 => 3,
            ParamType::Int16 => 4,
            ParamType::Uint32 => 5,
            ParamType::Int32 => 6,
            ParamType::Float => 9,
        }
    }

    /// Parse a MAV_PARAM_TYPE enum value
    ///
    /// Returns None for 64-bit and REAL64 types, which cannot be carried
    /// losslessly in the PARAM_VALUE float field.
    pub const fn from_mav_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(ParamType::Uint8),
            2 => Some(ParamType::Int8),
            3 => Some(ParamType::Uint16),
            4 => Some(ParamType::Int16),
            5 => Some(ParamType::Uint32),
            6 => Some(ParamType::Int32),
            9 => Some(ParamType::Float),
            _ => None,
        }
    }
}

/// Parameter value (tagged union of supported types)
///
/// Equality is exact: a write is only considered acknowledged when the
/// value echoed by the vehicle compares equal to the value that was sent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Uint8(u8),
    Int8(i8),
    Uint16(u16),
    Int16(i16),
    Uint32(u32),
    Int32(i32),
    Float(f32),
}

impl ParamValue {
    /// Get parameter type
    pub fn param_type(&self) -> ParamType {
        match self {
            ParamValue::Uint8(_) => ParamType::Uint8,
            ParamValue::Int8(_) => ParamType::Int8,
            ParamValue::Uint16(_) => ParamType::Uint16,
            ParamValue::Int16(_) => ParamType::Int16,
            ParamValue::Uint32(_) => ParamType::Uint32,
            ParamValue::Int32(_) => ParamType::Int32,
            ParamValue::Float(_) => ParamType::Float,
        }
    }

    /// Convert to the PARAM_VALUE / PARAM_SET float field
    pub fn to_wire(self) -> f32 {
        match self {
            ParamValue::Uint8(v) => v as f32,
            ParamValue::Int8(v) => v as f32,
            ParamValue::Uint16(v) => v as f32,
            ParamValue::Int16(v) => v as f32,
            ParamValue::Uint32(v) => v as f32,
            ParamValue::Int32(v) => v as f32,
            ParamValue::Float(v) => v,
        }
    }

    /// Create parameter value from the wire float field and its type tag
    ///
    /// Integer types saturate at their bounds.
    pub fn from_wire(value: f32, param_type: ParamType) -> Self {
        match param_type {
            ParamType::Uint8 => ParamValue::Uint8(value as u8),
            ParamType::Int8 => ParamValue::Int8(value as i8),
            ParamType::Uint16 => ParamValue::Uint16(value as u16),
            ParamType::Int16 => ParamValue::Int16(value as i16),
            ParamType::Uint32 => ParamValue::Uint32(value as u32),
            ParamType::Int32 => ParamValue::Int32(value as i32),
            ParamType::Float => ParamValue::Float(value),
        }
    }

    /// The float field carries this value without rounding
    ///
    /// 32-bit integers beyond 2^24 lose their low bits in the conversion.
    pub fn is_wire_exact(self) -> bool {
        self.to_wire() as f64 == self.as_f64()
    }

    /// Value as f64, for display and comparison in status text
    pub fn as_f64(&self) -> f64 {
        match *self {
            ParamValue::Uint8(v) => v as f64,
            ParamValue::Int8(v) => v as f64,
            ParamValue::Uint16(v) => v as f64,
            ParamValue::Int16(v) => v as f64,
            ParamValue::Uint32(v) => v as f64,
            ParamValue::Int32(v) => v as f64,
            ParamValue::Float(v) => v as f64,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Uint8(v) => write!(f, "{}", v),
            ParamValue::Int8(v) => write!(f, "{}", v),
            ParamValue::Uint16(v) => write!(f, "{}", v),
            ParamValue::Int16(v) => write!(f, "{}", v),
            ParamValue::Uint32(v) => write!(f, "{}", v),
            ParamValue::Int32(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{}", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mav_id_mapping() {
        for ty in [
            ParamType::Uint8,
            ParamType::Int8,
            ParamType::Uint16,
            ParamType::Int16,
            ParamType::Uint32,
            ParamType::Int32,
            ParamType::Float,
        ] {
            assert_eq!(ParamType::from_mav_id(ty.mav_id()), Some(ty));
        }
        // REAL64 is not representable
        assert_eq!(ParamType::from_mav_id(10), None);
    }

    #[test]
    fn test_integer_wire_conversion() {
        let value = ParamValue::from_wire(42.0, ParamType::Int32);
        assert_eq!(value, ParamValue::Int32(42));
        assert_eq!(value.to_wire(), 42.0);

        // Out of range saturates
        assert_eq!(ParamValue::from_wire(300.0, ParamType::Uint8), ParamValue::Uint8(255));
        assert_eq!(ParamValue::from_wire(-5.0, ParamType::Uint16), ParamValue::Uint16(0));
    }

    #[test]
    fn test_wire_exactness() {
        assert!(ParamValue::Int32(1 << 24).is_wire_exact());
        assert!(ParamValue::Int32(-(1 << 24)).is_wire_exact());
        assert!(!ParamValue::Int32((1 << 24) + 1).is_wire_exact());
        assert!(!ParamValue::Uint32(u32::MAX).is_wire_exact());
        assert!(!ParamValue::Uint32((1 << 24) + 1).is_wire_exact());
        assert!(ParamValue::Uint8(255).is_wire_exact());
        assert!(ParamValue::Float(0.05).is_wire_exact());
    }

    #[test]
    fn test_float_equality_is_exact() {
        let sent = ParamValue::Float(0.05);
        assert_eq!(ParamValue::from_wire(0.05, ParamType::Float), sent);
        assert_ne!(ParamValue::Float(0.050001), sent);
        // Same number, different type tag
        assert_ne!(ParamValue::Int32(1), ParamValue::Uint32(1));
    }
}
