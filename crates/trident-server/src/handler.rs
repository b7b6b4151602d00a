//! Packet handlers, executed as tasks on the server thread.

use serde_json::json;
use tracing::{debug, info};
use trident_protocol::packets::{
    ClickWindow, Handshake, LoginDisconnect, LoginStart, LoginSuccess, Ping, Pong, StatusResponse,
    offline_uuid,
};
use trident_protocol::{ConnectionStage, InboundPacket};

use crate::connection::Connection;
use crate::server::Server;
use crate::tasks::TaskResult;

/// Version name reported in status responses.
pub const VERSION_NAME: &str = "1.8";

/// Protocol version reported in status responses.
pub const PROTOCOL_VERSION: i32 = 47;

/// Handle one decoded packet for `connection`.
pub(crate) fn handle(
    server: &Server,
    connection: &Connection,
    packet: InboundPacket,
) -> TaskResult {
    match packet {
        InboundPacket::Handshake(handshake) => handle_handshake(connection, &handshake),
        InboundPacket::StatusRequest(_) => handle_status_request(server, connection),
        InboundPacket::Ping(ping) => handle_ping(server, connection, &ping),
        InboundPacket::LoginStart(login) => handle_login_start(server, connection, &login),
        InboundPacket::ClickWindow(click) => {
            handle_click_window(connection, &click);
            Ok(())
        }
    }
}

fn handle_handshake(connection: &Connection, handshake: &Handshake) -> TaskResult {
    debug!(
        addr = %connection.address(),
        protocol = handshake.protocol_version,
        address = %handshake.server_address,
        port = handshake.server_port,
        next_state = ?handshake.next_state,
        "Received handshake"
    );

    connection.set_stage(handshake.next_state.stage())?;
    Ok(())
}

fn handle_status_request(server: &Server, connection: &Connection) -> TaskResult {
    let config = server.config();
    let status = json!({
        "version": {
            "name": VERSION_NAME,
            "protocol": PROTOCOL_VERSION
        },
        "players": {
            "max": config.max_players,
            "online": server.connections().count_in_stage(ConnectionStage::Play),
            "sample": []
        },
        "description": {
            "text": config.motd
        }
    });

    connection.send(&StatusResponse::new(status.to_string()))?;
    Ok(())
}

fn handle_ping(server: &Server, connection: &Connection, ping: &Ping) -> TaskResult {
    connection.send(&Pong::new(ping.payload))?;

    // The pong ends the status exchange; queued frames are flushed first.
    server.connections().logout(connection);
    Ok(())
}

fn handle_login_start(
    server: &Server,
    connection: &Connection,
    login: &LoginStart,
) -> TaskResult {
    let online = server.connections().count_in_stage(ConnectionStage::Play);
    let max_players = usize::try_from(server.config().max_players).unwrap_or(usize::MAX);

    if online >= max_players {
        info!(name = %login.name, online, "Rejected login: server is full");
        let reason = json!({ "text": "The server is full" });
        connection.send(&LoginDisconnect::new(reason.to_string()))?;
        server.connections().logout(connection);
        return Ok(());
    }

    let uuid = offline_uuid(&login.name);
    connection.set_stage(ConnectionStage::Play)?;
    connection.send(&LoginSuccess::new(uuid, &login.name))?;

    info!(
        name = %login.name,
        %uuid,
        addr = %connection.address(),
        "Player logged in"
    );
    Ok(())
}

fn handle_click_window(connection: &Connection, click: &ClickWindow) {
    debug!(
        addr = %connection.address(),
        window = click.window_id,
        slot = click.clicked_slot,
        button = click.clicked_button,
        action = click.action_number,
        mode = click.mode,
        "Window click"
    );
}
