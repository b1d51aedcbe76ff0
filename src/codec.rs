// Copyright 2025 coScene
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

/// Record codec for app-install log lines
///
/// Turns one tab-separated input line into a [`DeviceRecord`] and encodes the
/// record into the protobuf [`UserApps`] payload stored in memcached.
///
/// # Line Format
///
/// ```text
/// <device_type>\t<device_id>\t<lat>\t<lon>\t<app>,<app>,...
/// ```
///
/// App ids that are not valid `u32` values are dropped one by one; a line
/// with the wrong field count or an unparseable coordinate is rejected whole.
use bytes::{Bytes, BytesMut};
use prost::Message;
use thiserror::Error;

use crate::protocol::{DeviceRecord, UserApps};

const FIELD_COUNT: usize = 5;

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("expected 5 tab-separated fields, found {found}: `{line}`")]
    FieldCount { found: usize, line: String },

    #[error("empty {field} in line `{line}`")]
    MissingField { field: &'static str, line: String },

    #[error("invalid {field} `{value}` in line `{line}`")]
    InvalidCoordinate {
        field: &'static str,
        value: String,
        line: String,
    },
}

#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("failed to encode UserApps: {0}")]
    Encode(#[from] prost::EncodeError),

    #[error("failed to decode UserApps: {0}")]
    Decode(#[from] prost::DecodeError),
}

/// Parse an already trimmed line into a record
pub fn parse_line(line: &str) -> Result<DeviceRecord, ParseError> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() != FIELD_COUNT {
        return Err(ParseError::FieldCount {
            found: fields.len(),
            line: line.to_string(),
        });
    }

    let (device_type, device_id) = (fields[0], fields[1]);
    if device_type.is_empty() {
        return Err(ParseError::MissingField {
            field: "device type",
            line: line.to_string(),
        });
    }
    if device_id.is_empty() {
        return Err(ParseError::MissingField {
            field: "device id",
            line: line.to_string(),
        });
    }

    let latitude = parse_coordinate("latitude", fields[2], line)?;
    let longitude = parse_coordinate("longitude", fields[3], line)?;

    let app_ids = fields[4]
        .split(',')
        .filter_map(parse_app_id)
        .collect();

    Ok(DeviceRecord {
        device_type: device_type.to_string(),
        device_id: device_id.to_string(),
        latitude,
        longitude,
        app_ids,
    })
}

/// Unsigned decimal only; `str::parse` would also take a leading `+`
fn parse_app_id(token: &str) -> Option<u32> {
    let token = token.trim();
    if token.starts_with('+') {
        return None;
    }
    token.parse().ok()
}

fn parse_coordinate(field: &'static str, value: &str, line: &str) -> Result<f64, ParseError> {
    value
        .parse::<f64>()
        .map_err(|_| ParseError::InvalidCoordinate {
            field,
            value: value.to_string(),
            line: line.to_string(),
        })
}

/// Encode a record into its stored payload
pub fn serialize(record: &DeviceRecord) -> Result<Bytes, SerializeError> {
    let message = UserApps {
        apps: record.app_ids.clone(),
        lat: Some(record.latitude),
        lon: Some(record.longitude),
    };

    let mut buf = BytesMut::with_capacity(message.encoded_len());
    message.encode(&mut buf)?;
    Ok(buf.freeze())
}

/// Decode a stored payload
pub fn deserialize(payload: &[u8]) -> Result<UserApps, SerializeError> {
    Ok(UserApps::decode(payload)?)
}
