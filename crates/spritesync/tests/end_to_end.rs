//! End-to-end sessions against a scripted peer.

use std::io::Write;

use bytes::Bytes;
use spritesync::core::{
    ColorMode, InboundMessage, NewSpritePayload, OutboundMessage, SyncFlags, WireMessage,
};
use spritesync::host::{DocumentHost, MemoryHost, NewDocument};
use spritesync::sync::{
    channel, ConnectionState, Endpoint, MemoryTransport, SocketEvent, TransportCommand,
};
use spritesync::{SessionConfig, SessionLauncher};
use spritesync_testkit::fixtures::{EngineFixture, FakePeer};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

fn config_file(json: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();
    file
}

fn new_sprite(name: &str, flags: SyncFlags) -> InboundMessage {
    InboundMessage::NewSprite(NewSpritePayload {
        color_mode: ColorMode::Rgb,
        width: 4,
        height: 4,
        flags,
        name: name.into(),
    })
}

fn flatten(messages: Vec<OutboundMessage>) -> Vec<OutboundMessage> {
    messages
        .into_iter()
        .flat_map(|message| match message {
            OutboundMessage::Batch(inner) => flatten(inner),
            other => vec![other],
        })
        .collect()
}

#[test]
fn test_session_from_config_file() {
    init_tracing();

    let file = config_file(r#"{"port": 40001, "autostart": true}"#);
    let config = SessionConfig::load(file.path()).unwrap();

    let mut launcher = SessionLauncher::new();
    let session = launcher
        .start(MemoryHost::new(), MemoryTransport::new(), config)
        .unwrap();
    assert_eq!(session.state(), ConnectionState::Connecting);
    assert_eq!(
        session.engine().transport().endpoint(),
        Some(&Endpoint::new("localhost", 40001))
    );

    session.on_socket_event(SocketEvent::Opened).unwrap();
    let greeting = session.engine_mut().transport_mut().take_messages().unwrap();
    assert_eq!(
        greeting,
        vec![OutboundMessage::ActiveSprite {
            name: String::new()
        }]
    );

    // The peer creates a sprite and declares its texture list in one batch.
    let mut peer = FakePeer::with_token("/blend/scene.blend");
    peer.track("hero", SyncFlags::ANIMATED);
    let frame = peer
        .batch(vec![new_sprite("hero", SyncFlags::ANIMATED), peer.texture_list()])
        .unwrap();
    session.on_socket_event(SocketEvent::Binary(frame)).unwrap();

    let messages = flatten(session.engine_mut().transport_mut().take_messages().unwrap());
    assert!(messages
        .iter()
        .any(|m| matches!(m, OutboundMessage::Spritesheet(sheet) if sheet.name == "hero")));
    assert_eq!(
        messages.last(),
        Some(&OutboundMessage::ActiveSprite {
            name: "hero".into()
        })
    );
    let status = session.status();
    assert_eq!(status.session_token, "/blend/scene.blend");
    assert_eq!(status.tracked_textures, 1);
    assert_eq!(status.bound_documents, 1);

    // A local edit goes out as a fresh spritesheet.
    let doc = session.engine().host().find_by_name("hero").unwrap();
    session
        .engine_mut()
        .host_mut()
        .paint_pixel(&doc, 1, 0, 0, [255, 0, 0, 255])
        .unwrap();
    assert_eq!(session.pump(), 1);
    let messages = session.engine_mut().transport_mut().take_messages().unwrap();
    let [OutboundMessage::Spritesheet(sheet)] = messages.as_slice() else {
        panic!("expected one spritesheet, got {messages:?}");
    };
    assert_eq!(&sheet.frames[0].pixels[..4], &[255, 0, 0, 255]);

    // A rename is announced and the peer follows it.
    session.engine_mut().host_mut().set_name(&doc, "villain").unwrap();
    session.pump();
    let messages = session.engine_mut().transport_mut().take_messages().unwrap();
    assert_eq!(
        messages.first(),
        Some(&OutboundMessage::ChangeName {
            from: "hero".into(),
            to: "villain".into()
        })
    );
    peer.observe(&messages).unwrap();
    assert_eq!(peer.textures()[0].name, "villain");

    let (host, transport) = launcher.stop().unwrap();
    assert_eq!(host.document_count(), 1);
    assert_eq!(transport.close_count(), 1);
}

#[test]
fn test_new_peer_file_invalidates_tracking() {
    init_tracing();

    let mut fixture = EngineFixture::new().unwrap();
    let doc = fixture.open_document("grass", 2, 2).unwrap();
    fixture.sent().unwrap();

    let mut peer = FakePeer::new();
    peer.track("grass", SyncFlags::empty());
    fixture.deliver_message(&peer.texture_list()).unwrap();
    assert!(fixture.engine.tracked_flags(&doc).is_some());
    fixture.sent().unwrap();

    // The peer switches to another file that does not use this texture.
    peer.switch_session("/blend/other.blend");
    peer.untrack("grass");
    fixture.deliver_message(&peer.texture_list()).unwrap();
    assert_eq!(fixture.engine.tracked_flags(&doc), None);
    assert_eq!(
        fixture.sent().unwrap(),
        vec![OutboundMessage::ActiveSprite {
            name: String::new()
        }]
    );

    // Local edits are no longer sent.
    fixture
        .host_mut()
        .paint_pixel(&doc, 1, 1, 1, [0, 0, 255, 255])
        .unwrap();
    fixture.pump();
    assert!(fixture.sent().unwrap().is_empty());
}

#[test]
fn test_overlay_and_image_from_peer() {
    init_tracing();

    let mut fixture = EngineFixture::new().unwrap();
    let mut peer = FakePeer::with_token("/blend/scene.blend");
    peer.track("stone", SyncFlags::SHOW_UV);

    let frame = peer
        .batch(vec![
            peer.image("stone", 2, 2, [10, 20, 30, 255]),
            peer.texture_list(),
        ])
        .unwrap();
    fixture.deliver(frame).unwrap();
    let messages = fixture.sent().unwrap();
    assert_eq!(
        messages.last(),
        Some(&OutboundMessage::ActiveSprite {
            name: "stone".into()
        })
    );

    fixture
        .deliver_message(&peer.overlay("stone", 2, 2, [0, 255, 0]))
        .unwrap();
    let doc = fixture.host().find_by_name("stone").unwrap();
    let layers = fixture.host().layers(&doc).unwrap();
    assert!(layers.iter().any(|layer| layer.name == "UVMap" && layer.reference));

    // The overlay itself is never echoed back.
    assert!(fixture.sent().unwrap().is_empty());
}

#[test]
fn test_garbage_frame_is_harmless() {
    init_tracing();

    let mut fixture = EngineFixture::new().unwrap();
    fixture.deliver(Bytes::from_static(&[0xff, 0x00, 0x01])).unwrap();
    fixture.deliver(Bytes::new()).unwrap();
    assert!(fixture.sent().unwrap().is_empty());
    assert_eq!(fixture.host().document_count(), 0);
}

#[test]
fn test_request_new_texture_for_saved_document() {
    init_tracing();

    let mut host = MemoryHost::new();
    host.create_document(&NewDocument::rgb("/art/tree.aseprite", 8, 8))
        .unwrap();
    let mut fixture = EngineFixture::with_host(host).unwrap();

    fixture.engine.request_new_texture().unwrap();
    let messages = fixture.sent().unwrap();
    let [OutboundMessage::NewTexture(request)] = messages.as_slice() else {
        panic!("expected a texture request, got {messages:?}");
    };
    assert_eq!(request.path(), "/art/tree.aseprite");
    assert_eq!(request.name(), "");
}

#[tokio::test]
async fn test_channel_transport_session() {
    init_tracing();

    let (transport, mut commands) = channel();
    let config = SessionConfig {
        autostart: true,
        ..SessionConfig::default()
    };
    let mut launcher = SessionLauncher::new();
    let session = launcher.start(MemoryHost::new(), transport, config).unwrap();

    assert_eq!(
        commands.recv().await,
        Some(TransportCommand::Connect(Endpoint::new("localhost", 34613)))
    );

    // A socket task that collects frames until the session closes it.
    let socket = tokio::spawn(async move {
        let mut frames = Vec::new();
        while let Some(command) = commands.recv().await {
            match command {
                TransportCommand::Frame(frame) => frames.push(frame),
                TransportCommand::Close => break,
                TransportCommand::Connect(_) => {}
            }
        }
        frames
    });

    session.on_socket_event(SocketEvent::Opened).unwrap();
    session
        .on_socket_event(SocketEvent::Binary(
            new_sprite("leaf", SyncFlags::empty()).encode().unwrap(),
        ))
        .unwrap();
    launcher.stop().unwrap();

    let frames = socket.await.unwrap();
    let decoded: Vec<OutboundMessage> = frames
        .iter()
        .map(|frame| OutboundMessage::decode(frame).unwrap())
        .collect();
    assert_eq!(
        decoded.first(),
        Some(&OutboundMessage::ActiveSprite {
            name: String::new()
        })
    );
    assert!(decoded
        .iter()
        .any(|m| matches!(m, OutboundMessage::Image(image) if image.name == "leaf")));
    assert_eq!(
        decoded.last(),
        Some(&OutboundMessage::ActiveSprite {
            name: "leaf".into()
        })
    );
}
