use mockito::{Matcher, Server, ServerGuard};
use soundtouch_bridge::{
    device_from_api, AccessoryConfig, BridgeError, DeviceApi, GlobalConfig, PresetConfig,
    SoundTouchClient,
};
use std::sync::Arc;

const INFO_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" ?>
<info deviceID="689E19B8BB8A">
  <name>Living Room</name>
  <type>SoundTouch 10</type>
  <components>
    <component>
      <componentCategory>SCM</componentCategory>
      <softwareVersion>27.0.6.46330.5043500</softwareVersion>
      <serialNumber>689E19B8BB8A</serialNumber>
    </component>
  </components>
</info>"#;

const PRESETS_XML: &str = r#"<presets>
  <preset id="1">
    <ContentItem source="TUNEIN" location="/v1/playback/station/s33828" sourceAccount="">
      <itemName>Radio</itemName>
    </ContentItem>
  </preset>
  <preset id="2">
    <ContentItem source="SPOTIFY" location="spotify:playlist:abc" sourceAccount="me">
      <itemName>Jazz</itemName>
    </ContentItem>
  </preset>
</presets>"#;

const SOURCES_XML: &str = r#"<sources deviceID="689E19B8BB8A">
  <sourceItem source="AUX" sourceAccount="AUX" status="READY" isLocal="true">AUX IN</sourceItem>
  <sourceItem source="BLUETOOTH" status="UNAVAILABLE" isLocal="true" />
  <sourceItem source="SPOTIFY" sourceAccount="me" status="READY" isLocal="false">me</sourceItem>
</sources>"#;

fn client_for(server: &ServerGuard) -> SoundTouchClient {
    let address = server.host_with_port();
    let (host, port) = address.rsplit_once(':').unwrap();
    SoundTouchClient::new(host, port.parse().unwrap()).unwrap()
}

#[tokio::test]
async fn test_device_resolved_over_http() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/info")
        .with_body(INFO_XML)
        .create_async()
        .await;
    server
        .mock("GET", "/presets")
        .with_body(PRESETS_XML)
        .create_async()
        .await;
    server
        .mock("GET", "/sources")
        .with_body(SOURCES_XML)
        .create_async()
        .await;

    let api: Arc<dyn DeviceApi> = Arc::new(client_for(&server));
    let global = GlobalConfig {
        presets: Some(vec![PresetConfig {
            index: 2,
            name: None,
            enabled: false,
        }]),
        ..Default::default()
    };
    let device = device_from_api(api, &global, &AccessoryConfig::default())
        .await
        .unwrap();

    let resolved = &device.resolved;
    assert_eq!(resolved.id, "689E19B8BB8A");
    assert_eq!(resolved.name, "Living Room");
    assert_eq!(resolved.version.as_deref(), Some("27.0.6.46330.5043500"));
    assert_eq!(resolved.presets.len(), 1);
    assert_eq!(resolved.presets[0].name, "Radio");

    let names: Vec<&str> = resolved.sources.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Living Room AUX IN", "Living Room Bluetooth"]);
}

#[tokio::test]
async fn test_key_is_pressed_then_released() {
    let mut server = Server::new_async().await;
    let press = server
        .mock("POST", "/key")
        .match_body(Matcher::Exact(
            r#"<key state="press" sender="Gabbo">PRESET_3</key>"#.to_string(),
        ))
        .create_async()
        .await;
    let release = server
        .mock("POST", "/key")
        .match_body(Matcher::Exact(
            r#"<key state="release" sender="Gabbo">PRESET_3</key>"#.to_string(),
        ))
        .create_async()
        .await;

    let client = client_for(&server);
    client.select_preset(3).await.unwrap();

    press.assert_async().await;
    release.assert_async().await;
}

#[tokio::test]
async fn test_set_volume_posts_value() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/volume")
        .match_body(Matcher::Exact("<volume>42</volume>".to_string()))
        .create_async()
        .await;

    client_for(&server).set_volume(42).await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn test_select_source_posts_content_item() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/select")
        .match_body(Matcher::Exact(
            r#"<ContentItem source="AUX" sourceAccount="AUX"></ContentItem>"#.to_string(),
        ))
        .create_async()
        .await;

    client_for(&server)
        .select_source("AUX", Some("AUX"))
        .await
        .unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn test_error_status_is_reported() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/volume")
        .with_status(500)
        .create_async()
        .await;

    let result = client_for(&server).volume().await;
    match result {
        Err(BridgeError::HttpStatus { status, url }) => {
            assert_eq!(status, 500);
            assert!(url.ends_with("/volume"));
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_malformed_xml_is_an_error() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/info")
        .with_body("<info deviceID=")
        .create_async()
        .await;

    assert!(client_for(&server).info().await.is_err());
}
