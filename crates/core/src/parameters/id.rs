//! MAVLink parameter id encoding
//!
//! Parameter names travel as a fixed 16-byte field. Names shorter than 16
//! bytes are NUL-terminated; a 16-byte name has no terminator.

use super::error::ParameterError;

/// Length of the MAVLink param_id field
pub const PARAM_ID_LEN: usize = 16;

/// Encode a parameter name into the fixed-size param_id field
pub fn encode_param_id(name: &str) -> Result<[u8; PARAM_ID_LEN], ParameterError> {
    let bytes = name.as_bytes();
    if bytes.is_empty() {
        return Err(ParameterError::InvalidName);
    }
    if bytes.len() > PARAM_ID_LEN {
        return Err(ParameterError::NameTooLong);
    }

    let mut param_id = [0u8; PARAM_ID_LEN];
    param_id[..bytes.len()].copy_from_slice(bytes);
    Ok(param_id)
}

/// Decode a param_id field into a name
///
/// Everything after the first NUL is ignored.
pub fn decode_param_id(param_id: &[u8; PARAM_ID_LEN]) -> Result<&str, ParameterError> {
    let len = param_id
        .iter()
        .position(|&b| b == 0)
        .unwrap_or(PARAM_ID_LEN);
    if len == 0 {
        return Err(ParameterError::InvalidName);
    }
    core::str::from_utf8(&param_id[..len]).map_err(|_| ParameterError::InvalidName)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_short_name() {
        let id = encode_param_id("THR_MIN").unwrap();
        assert_eq!(&id[..7], b"THR_MIN");
        assert!(id[7..].iter().all(|&b| b == 0));
        assert_eq!(decode_param_id(&id), Ok("THR_MIN"));
    }

    #[test]
    fn test_full_length_name_has_no_terminator() {
        let id = encode_param_id("SR_EXTRA1_RATE_X").unwrap();
        assert_eq!(decode_param_id(&id), Ok("SR_EXTRA1_RATE_X"));
    }

    #[test]
    fn test_name_too_long() {
        assert_eq!(
            encode_param_id("THIS_NAME_IS_TOO_LONG"),
            Err(ParameterError::NameTooLong)
        );
    }

    #[test]
    fn test_trailing_garbage_ignored() {
        let mut id = [0u8; PARAM_ID_LEN];
        id[..6].copy_from_slice(b"RC1_MI");
        id[7] = b'X';
        assert_eq!(decode_param_id(&id), Ok("RC1_MI"));
    }

    #[test]
    fn test_empty_and_invalid() {
        assert_eq!(encode_param_id(""), Err(ParameterError::InvalidName));
        assert_eq!(decode_param_id(&[0u8; PARAM_ID_LEN]), Err(ParameterError::InvalidName));

        let mut id = [0u8; PARAM_ID_LEN];
        id[0] = 0xFF;
        assert_eq!(decode_param_id(&id), Err(ParameterError::InvalidName));
    }
}
