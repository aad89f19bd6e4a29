//! Interchange encoding for connection profiles.
//!
//! A profile travels as a flat JSON object: `name`, `uuid`, `imp` (the
//! transport tag), plus `btAddr` for Bluetooth or `tcpIp`/`tcpPort` for TCP.
//! Unknown keys are ignored on read; a field required by the declared `imp`
//! that is absent fails the decode outright, never reconstructing a partial
//! profile. USB profiles have no interchange form.

use crate::connection::ConnectionId;
use crate::error::{Error, Result};
use crate::profile::{BtAddress, ConnectionProfile, Endpoint, TransportKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const IMP_BLUETOOTH: &str = "impBt";
const IMP_TCP: &str = "impTcp";

/// The flat shape on the wire. Kind-specific fields stay optional here;
/// `try_from` enforces which ones the declared tag requires.
#[derive(Debug, Serialize, Deserialize)]
struct WireProfile {
    name: String,
    /// Absent in records produced by older peers; a fresh identity is
    /// minted on decode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    uuid: Option<Uuid>,
    imp: String,
    #[serde(rename = "btAddr", default, skip_serializing_if = "Option::is_none")]
    bt_addr: Option<BtAddress>,
    #[serde(rename = "tcpIp", default, skip_serializing_if = "Option::is_none")]
    tcp_ip: Option<String>,
    #[serde(rename = "tcpPort", default, skip_serializing_if = "Option::is_none")]
    tcp_port: Option<u16>,
}

impl TryFrom<&ConnectionProfile> for WireProfile {
    type Error = Error;

    fn try_from(profile: &ConnectionProfile) -> Result<Self> {
        let mut wire = WireProfile {
            name: profile.name.clone(),
            uuid: Some(profile.id.as_uuid()),
            imp: String::new(),
            bt_addr: None,
            tcp_ip: None,
            tcp_port: None,
        };
        match &profile.endpoint {
            Endpoint::Bluetooth { address } => {
                wire.imp = IMP_BLUETOOTH.into();
                wire.bt_addr = Some(*address);
            }
            Endpoint::Tcp { host, port } => {
                wire.imp = IMP_TCP.into();
                wire.tcp_ip = Some(host.clone());
                wire.tcp_port = Some(*port);
            }
            Endpoint::Usb { .. } => {
                return Err(Error::NoInterchangeForm(TransportKind::Usb));
            }
        }
        Ok(wire)
    }
}

impl TryFrom<WireProfile> for ConnectionProfile {
    type Error = Error;

    fn try_from(wire: WireProfile) -> Result<Self> {
        let endpoint = match wire.imp.as_str() {
            IMP_BLUETOOTH => Endpoint::Bluetooth {
                address: wire.bt_addr.ok_or(Error::MissingField("btAddr"))?,
            },
            IMP_TCP => Endpoint::Tcp {
                host: wire.tcp_ip.ok_or(Error::MissingField("tcpIp"))?,
                port: wire.tcp_port.ok_or(Error::MissingField("tcpPort"))?,
            },
            _ => return Err(Error::UnknownTransportTag(wire.imp)),
        };
        Ok(ConnectionProfile {
            id: wire.uuid.map(ConnectionId::from).unwrap_or_default(),
            name: wire.name,
            endpoint,
        })
    }
}

/// Encodes a profile into its interchange form.
pub fn encode(profile: &ConnectionProfile) -> Result<String> {
    let wire = WireProfile::try_from(profile)?;
    Ok(serde_json::to_string(&wire)?)
}

/// Decodes a profile from its interchange form.
pub fn decode(json: &str) -> Result<ConnectionProfile> {
    let wire: WireProfile = serde_json::from_str(json)?;
    wire.try_into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tcp_profile() -> ConnectionProfile {
        ConnectionProfile::new(
            "bench rig",
            Endpoint::Tcp {
                host: "10.0.0.5".into(),
                port: 9000,
            },
        )
        .expect("profile")
    }

    #[test]
    fn test_tcp_roundtrip() {
        let profile = tcp_profile();
        let json = encode(&profile).expect("encode");
        let back = decode(&json).expect("decode");
        assert_eq!(back, profile);
    }

    #[test]
    fn test_bluetooth_roundtrip() {
        let profile = ConnectionProfile::new(
            "probe",
            Endpoint::Bluetooth {
                address: "AA:BB:CC:DD:EE:FF".parse().expect("address"),
            },
        )
        .expect("profile");

        let json = encode(&profile).expect("encode");
        let value: serde_json::Value = serde_json::from_str(&json).expect("json");
        assert_eq!(value["imp"], "impBt");
        assert_eq!(value["btAddr"], "AA:BB:CC:DD:EE:FF");

        let back = decode(&json).expect("decode");
        assert_eq!(back, profile);
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let json = r#"{
            "name": "probe",
            "imp": "impTcp",
            "tcpIp": "10.0.0.5",
            "tcpPort": 9000,
            "color": "green",
            "favorite": true
        }"#;
        let profile = decode(json).expect("decode");
        assert_eq!(
            profile.endpoint,
            Endpoint::Tcp {
                host: "10.0.0.5".into(),
                port: 9000
            }
        );
    }

    #[test]
    fn test_missing_uuid_mints_identity() {
        let json = r#"{"name":"a","imp":"impBt","btAddr":"AA:BB:CC:DD:EE:FF"}"#;
        let first = decode(json).expect("decode");
        let second = decode(json).expect("decode");
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn test_missing_required_field_fails_hard() {
        let no_addr = r#"{"name":"a","imp":"impBt"}"#;
        assert!(matches!(decode(no_addr), Err(Error::MissingField("btAddr"))));

        let no_port = r#"{"name":"a","imp":"impTcp","tcpIp":"10.0.0.5"}"#;
        assert!(matches!(
            decode(no_port),
            Err(Error::MissingField("tcpPort"))
        ));

        let no_name = r#"{"imp":"impTcp","tcpIp":"10.0.0.5","tcpPort":9000}"#;
        assert!(matches!(decode(no_name), Err(Error::Json(_))));
    }

    #[test]
    fn test_unknown_tag_rejected() {
        let json = r#"{"name":"a","imp":"impZigbee"}"#;
        assert!(matches!(decode(json), Err(Error::UnknownTransportTag(_))));
    }

    #[test]
    fn test_usb_has_no_interchange_form() {
        let profile = ConnectionProfile::new(
            "widget",
            Endpoint::Usb {
                device: "/dev/ttyUSB0".into(),
            },
        )
        .expect("profile");
        assert!(matches!(
            encode(&profile),
            Err(Error::NoInterchangeForm(TransportKind::Usb))
        ));
    }
}
