use serde::{Deserialize, Serialize};

/// The download-engine backends the daemon can front.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientKind {
    QBittorrent,
    RTorrent,
    Transmission,
}

/// Fixed picker order.
pub const SUPPORTED_CLIENTS: [ClientKind; 3] = [
    ClientKind::QBittorrent,
    ClientKind::RTorrent,
    ClientKind::Transmission,
];

/// Backend mounted before the user touches the picker.
pub const DEFAULT_CLIENT: ClientKind = ClientKind::RTorrent;

impl ClientKind {
    pub fn label_key(self) -> &'static str {
        match self {
            ClientKind::QBittorrent => "connection.settings.qbittorrent",
            ClientKind::RTorrent => "connection.settings.rtorrent",
            ClientKind::Transmission => "connection.settings.transmission",
        }
    }
}

/// rTorrent speaks XML-RPC either over a local socket or over TCP; the
/// two transports share no fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RTorrentConnection {
    Socket { path: String },
    Tcp { host: String, port: u16 },
}

/// Connection configuration for one backend, tagged by `client` on the
/// wire. Exhaustive over [`ClientKind`]; an unknown backend is not
/// representable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "client")]
pub enum ConnectionSettings {
    #[serde(rename = "qBittorrent")]
    QBittorrent {
        url: String,
        username: String,
        password: String,
    },
    #[serde(rename = "rTorrent")]
    RTorrent {
        #[serde(flatten)]
        connection: RTorrentConnection,
    },
    Transmission {
        url: String,
        username: String,
        password: String,
    },
}

impl ConnectionSettings {
    pub fn client_kind(&self) -> ClientKind {
        match self {
            ConnectionSettings::QBittorrent { .. } => ClientKind::QBittorrent,
            ConnectionSettings::RTorrent { .. } => ClientKind::RTorrent,
            ConnectionSettings::Transmission { .. } => ClientKind::Transmission,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tag_matches_client_kind() {
        let settings = ConnectionSettings::QBittorrent {
            url: "http://localhost:8080".to_string(),
            username: String::new(),
            password: String::new(),
        };
        assert_eq!(settings.client_kind(), ClientKind::QBittorrent);

        let settings = ConnectionSettings::RTorrent {
            connection: RTorrentConnection::Socket {
                path: "/tmp/rtorrent.sock".to_string(),
            },
        };
        assert_eq!(settings.client_kind(), ClientKind::RTorrent);
    }

    #[test]
    fn serializes_with_client_tag() {
        let settings = ConnectionSettings::RTorrent {
            connection: RTorrentConnection::Tcp {
                host: "localhost".to_string(),
                port: 5000,
            },
        };
        let value = serde_json::to_value(&settings).unwrap();
        assert_eq!(
            value,
            json!({
                "client": "rTorrent",
                "type": "tcp",
                "host": "localhost",
                "port": 5000,
            })
        );
    }

    #[test]
    fn deserializes_transmission_settings() {
        let value = json!({
            "client": "Transmission",
            "url": "http://localhost:9091/transmission/rpc",
            "username": "admin",
            "password": "secret",
        });
        let settings: ConnectionSettings = serde_json::from_value(value).unwrap();
        assert_eq!(settings.client_kind(), ClientKind::Transmission);
    }

    #[test]
    fn picker_order_is_fixed() {
        assert_eq!(
            SUPPORTED_CLIENTS,
            [
                ClientKind::QBittorrent,
                ClientKind::RTorrent,
                ClientKind::Transmission,
            ]
        );
        assert_eq!(DEFAULT_CLIENT, ClientKind::RTorrent);
    }
}
