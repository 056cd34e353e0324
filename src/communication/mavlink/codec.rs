//! MAVLink parameter protocol messages
//!
//! Builds the ground-side requests and decodes PARAM_VALUE replies:
//!
//! - **PARAM_REQUEST_LIST**: whole table of one component
//! - **PARAM_REQUEST_READ**: one parameter, by index or by name (index -1)
//! - **PARAM_SET**: write a value
//! - **COMMAND_LONG(MAV_CMD_PREFLIGHT_STORAGE)**: copy parameters to flash
//! - **PARAM_VALUE**: reply to all of the above

use mavlink::common::{
    MavCmd, MavMessage, MavParamType, COMMAND_LONG_DATA, PARAM_REQUEST_LIST_DATA,
    PARAM_REQUEST_READ_DATA, PARAM_SET_DATA, PARAM_VALUE_DATA,
};
use mavlink::MavHeader;

use crate::communication::link::IncomingParamValue;
use crate::error::LinkError;
use crate::parameters::{
    decode_param_id, encode_param_id, ComponentId, ParamRef, ParamType, ParamValue,
    ParameterError, PARAM_ID_LEN,
};

/// PREFLIGHT_STORAGE param1: write parameters to persistent storage
const STORAGE_WRITE: f32 = 1.0;

/// Map a value type to MAV_PARAM_TYPE
pub fn to_mav_param_type(param_type: ParamType) -> MavParamType {
    match param_type {
        ParamType::Uint8 => MavParamType::MAV_PARAM_TYPE_UINT8,
        ParamType::Int8 => MavParamType::MAV_PARAM_TYPE_INT8,
        ParamType::Uint16 => MavParamType::MAV_PARAM_TYPE_UINT16,
        ParamType::Int16 => MavParamType::MAV_PARAM_TYPE_INT16,
        ParamType::Uint32 => MavParamType::MAV_PARAM_TYPE_UINT32,
        ParamType::Int32 => MavParamType::MAV_PARAM_TYPE_INT32,
        ParamType::Float => MavParamType::MAV_PARAM_TYPE_REAL32,
    }
}

/// Map MAV_PARAM_TYPE to a value type
///
/// 64-bit types cannot travel in the float field and are rejected.
pub fn from_mav_param_type(mav_type: MavParamType) -> Result<ParamType, ParameterError> {
    match mav_type {
        MavParamType::MAV_PARAM_TYPE_UINT8 => Ok(ParamType::Uint8),
        MavParamType::MAV_PARAM_TYPE_INT8 => Ok(ParamType::Int8),
        MavParamType::MAV_PARAM_TYPE_UINT16 => Ok(ParamType::Uint16),
        MavParamType::MAV_PARAM_TYPE_INT16 => Ok(ParamType::Int16),
        MavParamType::MAV_PARAM_TYPE_UINT32 => Ok(ParamType::Uint32),
        MavParamType::MAV_PARAM_TYPE_INT32 => Ok(ParamType::Int32),
        MavParamType::MAV_PARAM_TYPE_REAL32 => Ok(ParamType::Float),
        other => Err(ParameterError::UnsupportedType(other as u8)),
    }
}

/// PARAM_REQUEST_LIST for one component
pub fn param_request_list(target_system: u8, target_component: ComponentId) -> MavMessage {
    MavMessage::PARAM_REQUEST_LIST(PARAM_REQUEST_LIST_DATA {
        target_system,
        target_component,
    })
}

/// PARAM_REQUEST_READ by index or by name
pub fn param_request_read(
    target_system: u8,
    target_component: ComponentId,
    target: &ParamRef,
) -> Result<MavMessage, LinkError> {
    let (param_index, param_id) = match target {
        ParamRef::Index(index) => {
            let index = i16::try_from(*index)
                .map_err(|_| LinkError::Encode(format!("index {} exceeds i16", index)))?;
            (index, [0u8; PARAM_ID_LEN])
        }
        ParamRef::Name(name) => (-1, encode_param_id(name)?),
    };

    Ok(MavMessage::PARAM_REQUEST_READ(PARAM_REQUEST_READ_DATA {
        param_index,
        target_system,
        target_component,
        param_id,
    }))
}

/// PARAM_SET with the value in the float field
///
/// Integers the float field would round are rejected.
pub fn param_set(
    target_system: u8,
    target_component: ComponentId,
    name: &str,
    value: &ParamValue,
) -> Result<MavMessage, LinkError> {
    if !value.is_wire_exact() {
        return Err(ParameterError::InexactValue.into());
    }
    Ok(MavMessage::PARAM_SET(PARAM_SET_DATA {
        param_value: value.to_wire(),
        target_system,
        target_component,
        param_id: encode_param_id(name)?,
        param_type: to_mav_param_type(value.param_type()),
    }))
}

/// COMMAND_LONG asking the autopilot to write parameters to storage
pub fn preflight_storage_write(target_system: u8, target_component: ComponentId) -> MavMessage {
    MavMessage::COMMAND_LONG(COMMAND_LONG_DATA {
        param1: STORAGE_WRITE,
        param2: 0.0,
        param3: 0.0,
        param4: 0.0,
        param5: 0.0,
        param6: 0.0,
        param7: 0.0,
        command: MavCmd::MAV_CMD_PREFLIGHT_STORAGE,
        target_system,
        target_component,
        confirmation: 0,
    })
}

/// Decode a PARAM_VALUE received with `header`
pub fn decode_param_value(
    header: &MavHeader,
    data: &PARAM_VALUE_DATA,
) -> Result<IncomingParamValue, LinkError> {
    let name = decode_param_id(&data.param_id)?;
    let param_type = from_mav_param_type(data.param_type)?;

    Ok(IncomingParamValue {
        uas: header.system_id,
        component: header.component_id,
        total_count: data.param_count,
        index: data.param_index,
        name: name.to_string(),
        value: ParamValue::from_wire(data.param_value, param_type),
    })
}
