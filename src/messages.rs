/// Label table for the UI, keyed the same way the daemon's web client
/// keys its translations. Unknown keys echo back so a missing entry is
/// visible instead of blank.
pub fn lookup(key: &str) -> &str {
    match key {
        "connection.settings.client.select" => "Client",
        "connection.settings.qbittorrent" => "qBittorrent",
        "connection.settings.qbittorrent.url" => "Web UI URL",
        "connection.settings.qbittorrent.username" => "Web UI username",
        "connection.settings.qbittorrent.password" => "Web UI password",
        "connection.settings.rtorrent" => "rTorrent",
        "connection.settings.rtorrent.type" => "Connection type",
        "connection.settings.rtorrent.type.socket" => "Unix socket",
        "connection.settings.rtorrent.type.tcp" => "TCP",
        "connection.settings.rtorrent.socket" => "Socket path",
        "connection.settings.rtorrent.host" => "Host",
        "connection.settings.rtorrent.port" => "Port",
        "connection.settings.transmission" => "Transmission",
        "connection.settings.transmission.url" => "RPC URL",
        "connection.settings.transmission.username" => "RPC username",
        "connection.settings.transmission.password" => "RPC password",
        "torrents.create.source.path.label" => "Source path",
        "torrents.create.source.path.missing" => "A source path is required",
        "torrents.create.trackers.label" => "Trackers",
        "torrents.create.base.name.label" => "Name",
        "torrents.create.comment.label" => "Comment",
        "torrents.create.info.source.label" => "Info source",
        "torrents.create.is.private.label" => "Private torrent",
        "torrents.create.start.label" => "Start when created",
        "torrents.add.tags" => "Tags",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::lookup;

    #[test]
    fn known_keys_resolve_to_labels() {
        assert_eq!(lookup("connection.settings.rtorrent"), "rTorrent");
        assert_eq!(lookup("torrents.create.source.path.label"), "Source path");
    }

    #[test]
    fn unknown_keys_echo_back() {
        assert_eq!(lookup("no.such.key"), "no.such.key");
    }
}
